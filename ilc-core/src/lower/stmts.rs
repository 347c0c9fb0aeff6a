//! Statement lowering (spec §4.8): turns an AST [`Block`] into IL basic
//! blocks, tracking the enclosing loop's exit block (for `break`) and the
//! active handler stack (for `raise`/try unwinding) the way the original's
//! statement lowerer threads control-flow context through recursive calls.

use crate::ast::{Block, Expr, MethodDecl, ProcDecl, Stmt};
use crate::il::builder::IrBuilder;
use crate::il::instr::{BlockId, Opcode, Predicate, Value};
use crate::il::types::IlType;
use crate::lower::exceptions;
use crate::lower::exprs::{lower_expr, static_class_of, VarSlots};
use crate::lower::oop;
use crate::lower::{builtins, Lowerer};
use crate::sem::class::ClassDef;

pub(crate) struct LoopCtx {
	exit_block: BlockId,
}

pub fn lower_procedure<'a, 'l>(proc: &ProcDecl, ctx: &Lowerer<'a, 'l>) -> crate::il::function::Function {
	let return_ty = proc.sig.return_ty.as_ref().map(|_| IlType::I32).unwrap_or(IlType::Void);
	let param_types = vec![IlType::Ref; proc.sig.params.len()];
	let mut builder = IrBuilder::new(proc.sig.name.clone(), param_types, return_ty);
	let mut vars = VarSlots::default();
	for (i, param) in proc.sig.params.iter().enumerate() {
		vars.insert(param.name.clone(), Value::Temp(crate::il::instr::TempId(i as u32)), IlType::Ref, None);
	}
	let mut loops: Vec<LoopCtx> = Vec::new();
	lower_block(&mut builder, &proc.body, &mut vars, &mut loops, ctx);
	ensure_terminated(&mut builder, return_ty);
	builder.finish()
}

pub fn lower_method_body<'a, 'l>(
	mangled_name: &str,
	method: &MethodDecl,
	body: &Block,
	ctx: &Lowerer<'a, 'l>,
	current_class: Option<&'l ClassDef<'l>>,
) -> crate::il::function::Function {
	let return_ty = method.sig.return_ty.as_ref().map(|_| IlType::Ref).unwrap_or(IlType::Void);
	let mut param_types = vec![IlType::Ref]; // `this`
	param_types.extend(std::iter::repeat(IlType::Ref).take(method.sig.params.len()));
	let mut builder = IrBuilder::new(mangled_name.to_string(), param_types, return_ty);
	let mut vars = VarSlots::default();
	vars.insert("this".to_string(), Value::Temp(crate::il::instr::TempId(0)), IlType::Ref, current_class);
	vars.current_method = Some(method.sig.name.clone());
	for (i, param) in method.sig.params.iter().enumerate() {
		vars.insert(param.name.clone(), Value::Temp(crate::il::instr::TempId(i as u32 + 1)), IlType::Ref, None);
	}
	let mut loops: Vec<LoopCtx> = Vec::new();
	lower_block(&mut builder, body, &mut vars, &mut loops, ctx);
	ensure_terminated(&mut builder, return_ty);
	builder.finish()
}

fn ensure_terminated(builder: &mut IrBuilder, return_ty: IlType) {
	if !builder.current_is_terminated() {
		if return_ty == IlType::Void {
			builder.ret(None);
		} else {
			builder.ret(Some(Value::ConstInt(0)));
		}
	}
}

fn lower_block<'a, 'l>(builder: &mut IrBuilder, block: &Block, vars: &mut VarSlots<'l>, loops: &mut Vec<LoopCtx>, ctx: &Lowerer<'a, 'l>) {
	for stmt in block {
		lower_stmt(builder, stmt, vars, loops, ctx);
	}
}

pub(crate) fn lower_block_pub<'a, 'l>(builder: &mut IrBuilder, block: &Block, vars: &mut VarSlots<'l>, loops: &mut Vec<LoopCtx>, ctx: &Lowerer<'a, 'l>) {
	lower_block(builder, block, vars, loops, ctx);
}

fn lower_stmt<'a, 'l>(builder: &mut IrBuilder, stmt: &Stmt, vars: &mut VarSlots<'l>, loops: &mut Vec<LoopCtx>, ctx: &Lowerer<'a, 'l>) {
	match stmt {
		Stmt::Expr(expr) => {
			lower_expr(builder, expr, vars, ctx);
		}
		Stmt::VarDecl { name, init, .. } => {
			let (value, ty, class) = match init {
				Some(init) => {
					let (v, t) = lower_expr(builder, init, vars, ctx);
					(v, t, static_class_of(init, vars, ctx))
				}
				None => (Value::Null, IlType::Ref, None),
			};
			vars.insert(name.clone(), value, ty, class);
		}
		Stmt::Assign { target, value, .. } => {
			let (v, ty) = lower_expr(builder, value, vars, ctx);
			if let Expr::Ident(name, _) = target {
				let class = static_class_of(value, vars, ctx);
				vars.insert(name.clone(), v, ty, class);
			}
		}
		Stmt::If { cond, then_branch, else_branch, .. } => {
			let (cond_val, _) = lower_expr(builder, cond, vars, ctx);
			let then_block = builder.create_block();
			let else_block = builder.create_block();
			let join_block = builder.create_block();
			builder.br_cond(cond_val, then_block, vec![], else_block, vec![]);

			builder.switch_to_block(then_block);
			lower_block(builder, then_branch, vars, loops, ctx);
			if !builder.current_is_terminated() {
				builder.br(join_block, vec![]);
			}

			builder.switch_to_block(else_block);
			if let Some(else_branch) = else_branch {
				lower_block(builder, else_branch, vars, loops, ctx);
			}
			if !builder.current_is_terminated() {
				builder.br(join_block, vec![]);
			}

			builder.switch_to_block(join_block);
		}
		Stmt::While { cond, body, .. } => {
			let header = builder.create_block();
			let loop_body = builder.create_block();
			let exit = builder.create_block();
			builder.br(header, vec![]);

			builder.switch_to_block(header);
			let (cond_val, _) = lower_expr(builder, cond, vars, ctx);
			builder.br_cond(cond_val, loop_body, vec![], exit, vec![]);

			builder.switch_to_block(loop_body);
			loops.push(LoopCtx { exit_block: exit });
			lower_block(builder, body, vars, loops, ctx);
			loops.pop();
			if !builder.current_is_terminated() {
				builder.br(header, vec![]);
			}

			builder.switch_to_block(exit);
		}
		Stmt::For { var, start, end, step, body, .. } => {
			let (start_val, start_ty) = lower_expr(builder, start, vars, ctx);
			let (end_val, _) = lower_expr(builder, end, vars, ctx);
			let step_val = step.as_ref().map(|s| lower_expr(builder, s, vars, ctx).0).unwrap_or(Value::ConstInt(1));

			let header = builder.create_block();
			let counter = builder.add_block_param(header, start_ty);
			let loop_body = builder.create_block();
			let exit = builder.create_block();
			builder.br(header, vec![start_val]);

			builder.switch_to_block(header);
			let cmp = builder.icmp(Predicate::Le, Value::Temp(counter), end_val);
			builder.br_cond(Value::Temp(cmp), loop_body, vec![], exit, vec![]);

			builder.switch_to_block(loop_body);
			vars.insert(var.clone(), Value::Temp(counter), start_ty, None);
			loops.push(LoopCtx { exit_block: exit });
			lower_block(builder, body, vars, loops, ctx);
			loops.pop();
			let incr_op = if start_ty.is_float() { Opcode::FAdd } else { Opcode::IAddOvf };
			let next = builder.binary(incr_op, start_ty, Value::Temp(counter), step_val);
			if !builder.current_is_terminated() {
				builder.br(header, vec![Value::Temp(next)]);
			}

			builder.switch_to_block(exit);
		}
		Stmt::ForIn { var, iterable, body, .. } => {
			lower_for_in(builder, var, iterable, body, vars, loops, ctx);
		}
		Stmt::Break { .. } => {
			if let Some(ctx) = loops.last() {
				builder.br(ctx.exit_block, vec![]);
				let unreachable = builder.create_block();
				builder.switch_to_block(unreachable);
			}
		}
		Stmt::Return { value, .. } => {
			let lowered = value.as_ref().map(|v| lower_expr(builder, v, vars, ctx).0);
			builder.ret(lowered);
			let unreachable = builder.create_block();
			builder.switch_to_block(unreachable);
		}
		Stmt::Raise { exception, .. } => {
			lower_raise(builder, exception, vars, ctx);
		}
		Stmt::Try { body, handlers, else_clause, .. } => {
			exceptions::lower_try(builder, body, handlers, else_clause, vars, loops, ctx);
		}
		Stmt::Case { scrutinee, arms, default, .. } => {
			lower_case(builder, scrutinee, arms, default, vars, loops, ctx);
		}
		Stmt::With { receiver, body, .. } => {
			let (recv_val, _) = lower_expr(builder, receiver, vars, ctx);
			let recv_class = static_class_of(receiver, vars, ctx);
			if let Some(class) = recv_class {
				vars.with_stack.push((recv_val, class));
			}
			lower_block(builder, body, vars, loops, ctx);
			if recv_class.is_some() {
				vars.with_stack.pop();
			}
		}
		Stmt::Inherited { method, args, .. } => {
			lower_inherited(builder, method, args, vars, ctx);
		}
	}
}

/// A bare `raise;` re-raising the handler's own bound exception resumes the
/// in-flight unwind at the instruction after the one that raised
/// (`resume.same`, spec §4.9); any other raise expression throws normally.
/// The re-raise idiom is detected syntactically: `exception` is exactly the
/// `Ident` bound by the innermost enclosing handler (see
/// `exceptions::lower_try`, which records it as `vars.current_handler_tok`).
fn lower_raise<'a, 'l>(builder: &mut IrBuilder, exception: &Expr, vars: &mut VarSlots<'l>, ctx: &Lowerer<'a, 'l>) {
	if let Expr::Ident(name, _) = exception {
		if let Some((binding, tok)) = &vars.current_handler.clone() {
			if binding == name {
				builder.resume_same(*tok);
				let unreachable = builder.create_block();
				builder.switch_to_block(unreachable);
				return;
			}
		}
	}
	let (exc_val, _) = lower_expr(builder, exception, vars, ctx);
	builder.raise(exc_val);
	let unreachable = builder.create_block();
	builder.switch_to_block(unreachable);
}

fn lower_for_in<'a, 'l>(
	builder: &mut IrBuilder,
	var: &str,
	iterable: &Expr,
	body: &Block,
	vars: &mut VarSlots<'l>,
	loops: &mut Vec<LoopCtx>,
	ctx: &Lowerer<'a, 'l>,
) {
	let (iter_val, _) = lower_expr(builder, iterable, vars, ctx);
	let is_string = matches!(iterable, Expr::StringLit(_, _));
	let len_symbol = if is_string { builtins::RT_LEN } else { builtins::RT_ARR_I64_LEN };
	let len = builder.call_direct(len_symbol, vec![iter_val], Some(IlType::I64));

	let header = builder.create_block();
	let index = builder.add_block_param(header, IlType::I64);
	let loop_body = builder.create_block();
	let exit = builder.create_block();
	builder.br(header, vec![Value::ConstInt(0)]);

	builder.switch_to_block(header);
	let cmp = builder.icmp(Predicate::Lt, Value::Temp(index), len.map(Value::Temp).unwrap_or(Value::ConstInt(0)));
	builder.br_cond(Value::Temp(cmp), loop_body, vec![], exit, vec![]);

	builder.switch_to_block(loop_body);
	let (elem_val, elem_ty) = if is_string {
		let dst = builder.call_direct(builtins::RT_SUBSTR, vec![iter_val, Value::Temp(index), Value::ConstInt(1)], Some(IlType::Ref));
		(dst.map(Value::Temp).unwrap_or(Value::Null), IlType::Ref)
	} else {
		let dst = builder.call_direct(builtins::RT_ARR_I64_GET, vec![iter_val, Value::Temp(index)], Some(IlType::I64));
		(dst.map(Value::Temp).unwrap_or(Value::Null), IlType::I64)
	};
	vars.insert(var.to_string(), elem_val, elem_ty, None);
	loops.push(LoopCtx { exit_block: exit });
	lower_block(builder, body, vars, loops, ctx);
	loops.pop();
	let next = builder.binary(Opcode::IAddOvf, IlType::I64, Value::Temp(index), Value::ConstInt(1));
	if !builder.current_is_terminated() {
		builder.br(header, vec![Value::Temp(next)]);
	}

	builder.switch_to_block(exit);
}

/// Each arm's labels are tested in order with an `icmp Eq` + `br_cond`
/// chain; the last label of an arm falls through to the next arm (or the
/// default block) on mismatch, earlier labels fall through to a fresh
/// intermediate block that tests the next label.
fn lower_case<'a, 'l>(
	builder: &mut IrBuilder,
	scrutinee: &Expr,
	arms: &[crate::ast::CaseArm],
	default: &Option<Block>,
	vars: &mut VarSlots<'l>,
	loops: &mut Vec<LoopCtx>,
	ctx: &Lowerer<'a, 'l>,
) {
	let (scrut_val, _) = lower_expr(builder, scrutinee, vars, ctx);
	let exit = builder.create_block();

	let mut current_test_block = builder.current_block();
	for arm in arms {
		if arm.labels.is_empty() {
			continue;
		}
		let arm_body = builder.create_block();
		let next_arm = builder.create_block();

		builder.switch_to_block(current_test_block);
		let last = arm.labels.len() - 1;
		for (i, label) in arm.labels.iter().enumerate() {
			let (label_val, _) = lower_expr(builder, label, vars, ctx);
			let eq = builder.icmp(Predicate::Eq, scrut_val, label_val);
			if i == last {
				builder.br_cond(Value::Temp(eq), arm_body, vec![], next_arm, vec![]);
			} else {
				let next_label_block = builder.create_block();
				builder.br_cond(Value::Temp(eq), arm_body, vec![], next_label_block, vec![]);
				builder.switch_to_block(next_label_block);
			}
		}

		builder.switch_to_block(arm_body);
		lower_block(builder, &arm.body, vars, loops, ctx);
		if !builder.current_is_terminated() {
			builder.br(exit, vec![]);
		}

		current_test_block = next_arm;
	}

	builder.switch_to_block(current_test_block);
	if let Some(default) = default {
		lower_block(builder, default, vars, loops, ctx);
	}
	if !builder.current_is_terminated() {
		builder.br(exit, vec![]);
	}

	builder.switch_to_block(exit);
}

fn lower_inherited<'a, 'l>(builder: &mut IrBuilder, method: &Option<String>, args: &[Expr], vars: &mut VarSlots<'l>, ctx: &Lowerer<'a, 'l>) {
	let Some(this_slot) = vars.get("this").cloned() else { return };
	let Some(this_class) = this_slot.class else { return };
	let Some(base) = this_class.base.get() else { return };
	let method_name = method.clone().or_else(|| vars.current_method.clone());
	let Some(method_name) = method_name else { return };

	let lowered_args: Vec<Value> = args.iter().map(|a| lower_expr(builder, a, vars, ctx).0).collect();
	let owner = ctx.owning_class(base, &method_name).unwrap_or(base);
	let mangled = oop::mangle_method(owner.qualified_name(), &method_name);
	let mut call_args = vec![this_slot.value];
	call_args.extend(lowered_args);
	builder.call_direct(mangled, call_args, Some(IlType::Ref));
}
