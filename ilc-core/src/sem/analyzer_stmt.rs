//! Pass 2 of the semantic analyzer (spec §4.6): statement-level checking —
//! control-flow validity (`break`, `raise`, `return`), definite assignment,
//! and the loop-variable/function-name assignment restrictions.

use crate::ast::{Block, ExceptHandler, Expr, Stmt, TypeRef};
use crate::diagnostics::{DiagnosticSink, ErrorKind};
use crate::sem::analyzer_expr::{fold_const, infer, is_const_zero_divisor, ConstValue, TypeCtx};
use crate::sem::class::ClassDef;
use crate::sem::symbols::{Symbol, SymbolTable};
use crate::sem::types::{Primitive, Type};

/// Threads the handful of ambient facts pass 2 needs beyond the symbol
/// table: how deep inside loops/handlers the current statement is, the
/// enclosing procedure's declared return type (for `return`/`exit` value
/// checks), and — inside a method body — the enclosing class and method
/// name (for `inherited`).
pub struct StmtContext<'l> {
	loop_depth: u32,
	handler_depth: u32,
	returns_value: bool,
	current_class: Option<&'l ClassDef<'l>>,
	current_method: Option<String>,
}

impl<'l> StmtContext<'l> {
	pub fn new(returns_value: bool) -> Self {
		StmtContext { loop_depth: 0, handler_depth: 0, returns_value, current_class: None, current_method: None }
	}

	/// Builds a context for checking a method body: `inherited` resolves
	/// against `class`'s base chain, defaulting to `method_name` when used
	/// bare.
	pub fn for_method(returns_value: bool, class: &'l ClassDef<'l>, method_name: impl Into<String>) -> Self {
		StmtContext { loop_depth: 0, handler_depth: 0, returns_value, current_class: Some(class), current_method: Some(method_name.into()) }
	}

	/// Builds a context for checking a free procedure's body: no enclosing
	/// class, but `name` is still tracked so an assignment to the procedure's
	/// own name (the function-result idiom) can be flagged when it has no
	/// return value to assign.
	pub fn for_procedure(returns_value: bool, name: impl Into<String>) -> Self {
		StmtContext { loop_depth: 0, handler_depth: 0, returns_value, current_class: None, current_method: Some(name.into()) }
	}
}

pub fn check_block<'c, 'l>(block: &Block, symbols: &mut SymbolTable<'l>, ctx: &mut StmtContext<'l>, tyctx: &TypeCtx<'c, 'l>, diags: &mut DiagnosticSink) {
	symbols.push_scope();
	for stmt in block {
		check_stmt(stmt, symbols, ctx, tyctx, diags);
	}
	symbols.pop_scope();
}

fn check_stmt<'c, 'l>(stmt: &Stmt, symbols: &mut SymbolTable<'l>, ctx: &mut StmtContext<'l>, tyctx: &TypeCtx<'c, 'l>, diags: &mut DiagnosticSink) {
	match stmt {
		Stmt::Expr(expr) => {
			check_reads(expr, symbols, diags);
		}
		Stmt::VarDecl { name, init, loc, .. } => {
			if let Some(init) = init {
				check_reads(init, symbols, diags);
			}
			symbols.declare(Symbol { name: name.clone(), ty: Type::Primitive(Primitive::Object), is_const: false, is_loop_var: false });
			if init.is_some() {
				symbols.mark_assigned(name);
			}
			let _ = loc;
		}
		Stmt::Assign { target, value, loc } => {
			check_reads(value, symbols, diags);
			check_assignment_target(target, symbols, ctx, *loc, diags);
		}
		Stmt::If { cond, then_branch, else_branch, loc } => {
			check_reads(cond, symbols, diags);
			if !matches!(infer(cond, symbols, tyctx, diags), Type::Primitive(Primitive::Bool)) {
				diags.error(ErrorKind::NonBooleanCondition, *loc, 1, "condition must be boolean");
			}
			// Testable Property 6: a then-only assignment must not survive
			// past the `if`; an if/else assignment survives only where both
			// branches definitely assign it.
			let pre_assigned = symbols.snapshot_assigned();
			symbols.push_narrowing();
			if let Expr::IsNotNil { operand, .. } = cond {
				if let Expr::Ident(name, _) = operand.as_ref() {
					if let Some(Type::Optional(inner)) = symbols.effective_type(name) {
						symbols.narrow(name, *inner);
					}
				}
			}
			check_block(then_branch, symbols, ctx, tyctx, diags);
			symbols.pop_narrowing();
			match else_branch {
				Some(else_branch) => {
					let then_assigned = symbols.snapshot_assigned();
					symbols.restore_assigned(pre_assigned);
					check_block(else_branch, symbols, ctx, tyctx, diags);
					let else_assigned = symbols.snapshot_assigned();
					symbols.restore_assigned_intersection(then_assigned, else_assigned);
				}
				None => {
					symbols.restore_assigned(pre_assigned);
				}
			}
		}
		Stmt::While { cond, body, loc } => {
			check_reads(cond, symbols, diags);
			if !matches!(infer(cond, symbols, tyctx, diags), Type::Primitive(Primitive::Bool)) {
				diags.error(ErrorKind::NonBooleanCondition, *loc, 1, "condition must be boolean");
			}
			ctx.loop_depth += 1;
			check_block(body, symbols, ctx, tyctx, diags);
			ctx.loop_depth -= 1;
		}
		Stmt::For { var, start, end, step, body, loc } => {
			check_reads(start, symbols, diags);
			check_reads(end, symbols, diags);
			if let Some(step) = step {
				check_reads(step, symbols, diags);
			}
			let counter_ty = infer(start, symbols, tyctx, diags);
			if !counter_ty.is_ordinal() {
				diags.error(ErrorKind::NonOrdinalForVar, *loc, var.len() as u32, format!("loop variable '{var}' must be an ordinal type"));
			}
			symbols.push_scope();
			symbols.declare(Symbol { name: var.clone(), ty: counter_ty, is_const: false, is_loop_var: true });
			symbols.mark_assigned(var);
			ctx.loop_depth += 1;
			for stmt in body {
				check_stmt(stmt, symbols, ctx, tyctx, diags);
			}
			ctx.loop_depth -= 1;
			symbols.pop_scope();
		}
		Stmt::Break { loc } => {
			if ctx.loop_depth == 0 {
				diags.error(ErrorKind::BreakOutsideLoop, *loc, 5, "'break' outside a loop");
			}
		}
		Stmt::Return { value, loc } => {
			if let Some(value) = value {
				check_reads(value, symbols, diags);
				if !ctx.returns_value {
					diags.error(ErrorKind::ExitWithValueInSub, *loc, 1, "returning a value from a procedure with no return type");
				}
			}
		}
		Stmt::Raise { exception, loc } => {
			check_reads(exception, symbols, diags);
			let _ = ctx.handler_depth;
			let _ = loc;
		}
		Stmt::Try { body, handlers, else_clause, loc } => {
			check_block(body, symbols, ctx, tyctx, diags);
			ctx.handler_depth += 1;
			for handler in handlers {
				check_handler(handler, symbols, ctx, tyctx, diags);
			}
			ctx.handler_depth -= 1;
			if let Some(else_clause) = else_clause {
				if handlers.is_empty() {
					diags.error(ErrorKind::ExceptElseUnsupported, *loc, 1, "'else' clause requires at least one handler");
				}
				check_block(else_clause, symbols, ctx, tyctx, diags);
			}
		}
		Stmt::ForIn { var, iterable, body, loc } => {
			check_reads(iterable, symbols, diags);
			let iterable_ty = infer(iterable, symbols, tyctx, diags);
			let elem_ty = match iterable_ty {
				Type::Array(elem) => *elem,
				Type::Set(elem) => *elem,
				other => {
					diags.error(ErrorKind::NonOrdinalForVar, *loc, var.len() as u32, format!("'{var}' cannot iterate over non-iterable type '{other}'"));
					Type::Primitive(Primitive::Object)
				}
			};
			symbols.push_scope();
			symbols.declare(Symbol { name: var.clone(), ty: elem_ty, is_const: false, is_loop_var: true });
			symbols.mark_assigned(var);
			ctx.loop_depth += 1;
			for stmt in body {
				check_stmt(stmt, symbols, ctx, tyctx, diags);
			}
			ctx.loop_depth -= 1;
			symbols.pop_scope();
		}
		Stmt::Case { scrutinee, arms, default, loc } => {
			check_reads(scrutinee, symbols, diags);
			let scrutinee_ty = infer(scrutinee, symbols, tyctx, diags);
			if !scrutinee_ty.is_ordinal() {
				diags.error(ErrorKind::NonOrdinalIndex, *loc, 1, format!("'case' scrutinee must be an ordinal type, found '{scrutinee_ty}'"));
			}
			let mut seen_labels: Vec<ConstValue> = Vec::new();
			for arm in arms {
				for label in &arm.labels {
					check_reads(label, symbols, diags);
					if let Some(value) = fold_const(label) {
						if seen_labels.contains(&value) {
							diags.error(ErrorKind::NonConstantInitializer, label.loc(), 1, "duplicate 'case' label");
						} else {
							seen_labels.push(value);
						}
					}
				}
				check_block(&arm.body, symbols, ctx, tyctx, diags);
			}
			if let Some(default) = default {
				check_block(default, symbols, ctx, tyctx, diags);
			}
		}
		Stmt::With { receiver, body, loc } => {
			check_reads(receiver, symbols, diags);
			let receiver_ty = infer(receiver, symbols, tyctx, diags);
			if !matches!(receiver_ty, Type::Class(_)) {
				diags.error(ErrorKind::AssignmentTypeMismatch, *loc, 1, format!("'with' receiver must be a class instance, found '{receiver_ty}'"));
			}
			symbols.push_with(receiver_ty);
			check_block(body, symbols, ctx, tyctx, diags);
			symbols.pop_with();
		}
		Stmt::Inherited { method, args, loc } => {
			for arg in args {
				check_reads(arg, symbols, diags);
			}
			match ctx.current_class.and_then(|c| c.base.get()) {
				Some(base) => {
					let name = method.clone().or_else(|| ctx.current_method.clone());
					match name {
						Some(name) => {
							if base.find_virtual(&name).is_none() && !base.methods.get().iter().any(|m| m.name.eq_ignore_ascii_case(&name)) {
								diags.error(ErrorKind::UndefinedProcedure, *loc, name.len() as u32, format!("'inherited {name}' has no matching method in the base class"));
							}
						}
						None => {
							diags.error(ErrorKind::UndefinedProcedure, *loc, 9, "'inherited' with no method name requires an enclosing named method");
						}
					}
				}
				None => {
					diags.error(ErrorKind::UndefinedProcedure, *loc, 9, "'inherited' used outside a method with a base class");
				}
			}
		}
	}
}

fn check_handler<'c, 'l>(handler: &ExceptHandler, symbols: &mut SymbolTable<'l>, ctx: &mut StmtContext<'l>, tyctx: &TypeCtx<'c, 'l>, diags: &mut DiagnosticSink) {
	if let Some(TypeRef::Named(name)) = &handler.exception_ty {
		if tyctx.find_class(name).is_none() {
			diags.error(ErrorKind::UnknownExceptionType, handler.loc, name.len() as u32, format!("unknown exception type '{name}'"));
		}
	}
	symbols.push_scope();
	if let Some(binding) = &handler.binding {
		symbols.declare(Symbol { name: binding.clone(), ty: Type::Primitive(Primitive::Object), is_const: false, is_loop_var: false });
		symbols.mark_assigned(binding);
	}
	for stmt in &handler.body {
		check_stmt(stmt, symbols, ctx, tyctx, diags);
	}
	symbols.pop_scope();
}

fn check_assignment_target<'l>(target: &Expr, symbols: &mut SymbolTable<'l>, ctx: &StmtContext<'l>, loc: crate::diagnostics::SourceLoc, diags: &mut DiagnosticSink) {
	if let Expr::Ident(name, _) = target {
		if let Some(symbol) = symbols.lookup(name) {
			if symbol.is_loop_var {
				diags.error(ErrorKind::AssignmentToLoopVar, loc, name.len() as u32, format!("cannot assign to loop variable '{name}'"));
				return;
			}
			if symbol.is_const {
				diags.error(ErrorKind::AssignmentTypeMismatch, loc, name.len() as u32, format!("cannot assign to constant '{name}'"));
				return;
			}
		} else if !ctx.returns_value {
			// The function-result idiom (`Name := value;` inside a routine
			// named `Name`) only makes sense when `Name` has a return value;
			// a bare identifier with no declared symbol that happens to match
			// a void routine's own name is never a valid assignment target.
			if let Some(current) = &ctx.current_method {
				if current.eq_ignore_ascii_case(name) {
					diags.error(ErrorKind::AssignmentToFunctionName, loc, name.len() as u32, format!("cannot assign to '{name}': it has no return value"));
					return;
				}
			}
		}
		symbols.mark_assigned(name);
		// Testable Property 7: any assignment to a narrowed variable
		// invalidates the narrowing in every active scope, not just the
		// innermost one.
		symbols.invalidate(name);
	}
}

/// Reports `ErrorKind::ReadOfUnassigned` for a bare identifier read before
/// any assignment reaches it, and `ErrorKind::ConstDivisionByZero` for a
/// division whose divisor folds to a compile-time zero.
fn check_reads<'l>(expr: &Expr, symbols: &SymbolTable<'l>, diags: &mut DiagnosticSink) {
	match expr {
		Expr::Ident(name, loc) => {
			if symbols.lookup(name).is_some() && !symbols.is_assigned(name) {
				diags.error(ErrorKind::ReadOfUnassigned, *loc, name.len() as u32, format!("'{name}' read before being assigned"));
			}
		}
		Expr::Binary { op, lhs, rhs, loc } => {
			check_reads(lhs, symbols, diags);
			check_reads(rhs, symbols, diags);
			if matches!(op, crate::ast::BinOp::Div | crate::ast::BinOp::Mod) && is_const_zero_divisor(rhs) {
				diags.error(ErrorKind::ConstDivisionByZero, *loc, 1, "division by a constant zero");
			}
		}
		Expr::Unary { operand, .. } => check_reads(operand, symbols, diags),
		Expr::Call { callee, args, .. } => {
			check_reads(callee, symbols, diags);
			for arg in args {
				check_reads(arg, symbols, diags);
			}
		}
		Expr::FieldAccess { base, .. } => check_reads(base, symbols, diags),
		Expr::Index { base, index, .. } => {
			check_reads(base, symbols, diags);
			check_reads(index, symbols, diags);
		}
		Expr::New { args, .. } => {
			for arg in args {
				check_reads(arg, symbols, diags);
			}
		}
		Expr::IsNotNil { operand, .. } => check_reads(operand, symbols, diags),
		Expr::IntLit(..) | Expr::FloatLit(..) | Expr::BoolLit(..) | Expr::StringLit(..) | Expr::NilLit(..) => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostics::{CollectingEmitter, SourceLoc};
	use fxhash::FxHashMap;

	fn run(block: &Block, returns_value: bool) -> CollectingEmitter {
		let mut emitter = CollectingEmitter::default();
		let mut sink = DiagnosticSink::new(&mut emitter);
		let mut symbols = SymbolTable::new();
		let mut ctx = StmtContext::new(returns_value);
		let classes = FxHashMap::default();
		let ifaces = FxHashMap::default();
		let procedures = FxHashMap::default();
		let tyctx = TypeCtx::new(&classes, &ifaces, &procedures);
		check_block(block, &mut symbols, &mut ctx, &tyctx, &mut sink);
		emitter
	}

	fn run_as_procedure(block: &Block, returns_value: bool, name: &str) -> CollectingEmitter {
		let mut emitter = CollectingEmitter::default();
		let mut sink = DiagnosticSink::new(&mut emitter);
		let mut symbols = SymbolTable::new();
		let mut ctx = StmtContext::for_procedure(returns_value, name);
		let classes = FxHashMap::default();
		let ifaces = FxHashMap::default();
		let procedures = FxHashMap::default();
		let tyctx = TypeCtx::new(&classes, &ifaces, &procedures);
		check_block(block, &mut symbols, &mut ctx, &tyctx, &mut sink);
		emitter
	}

	#[test]
	fn break_outside_loop_is_reported() {
		let block = vec![Stmt::Break { loc: SourceLoc::default() }];
		let emitter = run(&block, false);
		assert_eq!(emitter.diagnostics.len(), 1);
		assert_eq!(emitter.diagnostics[0].kind, ErrorKind::BreakOutsideLoop);
	}

	#[test]
	fn break_inside_while_is_accepted() {
		let block = vec![Stmt::While {
			cond: Expr::BoolLit(true, SourceLoc::default()),
			body: vec![Stmt::Break { loc: SourceLoc::default() }],
			loc: SourceLoc::default(),
		}];
		let emitter = run(&block, false);
		assert!(emitter.diagnostics.is_empty());
	}

	#[test]
	fn read_before_assignment_is_reported() {
		let loc = SourceLoc::default();
		let block = vec![
			Stmt::VarDecl { name: "x".into(), ty: None, init: None, loc },
			Stmt::Expr(Expr::Ident("x".into(), loc)),
		];
		let emitter = run(&block, false);
		assert!(emitter.diagnostics.iter().any(|d| d.kind == ErrorKind::ReadOfUnassigned));
	}

	#[test]
	fn assignment_to_loop_variable_is_rejected() {
		let loc = SourceLoc::default();
		let block = vec![Stmt::For {
			var: "i".into(),
			start: Expr::IntLit(0, loc),
			end: Expr::IntLit(10, loc),
			step: None,
			body: vec![Stmt::Assign { target: Expr::Ident("i".into(), loc), value: Expr::IntLit(5, loc), loc }],
			loc,
		}];
		let emitter = run(&block, false);
		assert!(emitter.diagnostics.iter().any(|d| d.kind == ErrorKind::AssignmentToLoopVar));
	}

	#[test]
	fn handler_naming_unknown_exception_type_is_reported() {
		let loc = SourceLoc::default();
		let block = vec![Stmt::Try {
			body: vec![],
			handlers: vec![ExceptHandler { exception_ty: Some(TypeRef::Named("NoSuchError".into())), binding: None, body: vec![], loc }],
			else_clause: None,
			loc,
		}];
		let emitter = run(&block, false);
		assert!(emitter.diagnostics.iter().any(|d| d.kind == ErrorKind::UnknownExceptionType));
	}

	#[test]
	fn assigning_to_void_procedures_own_name_is_rejected() {
		let loc = SourceLoc::default();
		let block = vec![Stmt::Assign { target: Expr::Ident("Foo".into(), loc), value: Expr::IntLit(1, loc), loc }];
		let emitter = run_as_procedure(&block, false, "Foo");
		assert!(emitter.diagnostics.iter().any(|d| d.kind == ErrorKind::AssignmentToFunctionName));
	}

	#[test]
	fn assigning_to_function_name_with_return_value_is_accepted() {
		let loc = SourceLoc::default();
		let block = vec![Stmt::Assign { target: Expr::Ident("Foo".into(), loc), value: Expr::IntLit(1, loc), loc }];
		let emitter = run_as_procedure(&block, true, "Foo");
		assert!(!emitter.diagnostics.iter().any(|d| d.kind == ErrorKind::AssignmentToFunctionName));
	}
}
