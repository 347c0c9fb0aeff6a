//! Expression lowering (spec §4.8): walks an [`Expr`] tree emitting IL
//! instructions through an [`IrBuilder`], returning the IL value and type
//! the expression evaluates to.

use crate::ast::{BinOp, Expr, UnOp};
use crate::il::builder::IrBuilder;
use crate::il::instr::{Opcode, Predicate, Value};
use crate::il::types::IlType;
use crate::lower::calls;
use crate::lower::Lowerer;
use crate::sem::class::ClassDef;
use fxhash::FxHashMap;

/// One local's IL value, type, and (for reference-typed locals) static
/// class — the class is threaded through so field access, virtual
/// dispatch and interface casts can resolve against a real layout instead
/// of a placeholder offset.
#[derive(Clone)]
pub struct VarSlot<'l> {
	pub value: Value,
	pub ty: IlType,
	pub class: Option<&'l ClassDef<'l>>,
}

/// Lowering-time local-variable environment. `with_stack` holds the
/// receiver `(value, class)` pairs pushed by an enclosing `with` statement,
/// innermost last, consulted by [`lower_expr`]'s `Ident` arm once a plain
/// local lookup misses.
#[derive(Default)]
pub struct VarSlots<'l> {
	vars: FxHashMap<String, VarSlot<'l>>,
	pub with_stack: Vec<(Value, &'l ClassDef<'l>)>,
	/// Name of the method body currently being lowered, consulted by
	/// `Stmt::Inherited` to find the same-named base-class method.
	pub current_method: Option<String>,
	/// `(binding name, resume token)` of the innermost enclosing handler
	/// block, set by `exceptions::lower_try` while lowering a handler body.
	/// A bare `raise <binding>;` referencing this exact name lowers to
	/// `resume.same` instead of a fresh throw.
	pub current_handler: Option<(String, Value)>,
}

impl<'l> VarSlots<'l> {
	pub fn insert(&mut self, name: String, value: Value, ty: IlType, class: Option<&'l ClassDef<'l>>) {
		self.vars.insert(name, VarSlot { value, ty, class });
	}

	pub fn get(&self, name: &str) -> Option<&VarSlot<'l>> {
		self.vars.get(name)
	}

	/// `this`'s own class, i.e. the class whose method body is being
	/// lowered, or `None` inside a free procedure.
	pub fn this_class(&self) -> Option<&'l ClassDef<'l>> {
		self.vars.get("this").and_then(|s| s.class)
	}
}

/// Resolves the static class of a receiver expression by walking
/// `Ident`/`FieldAccess`/`New` forms against the current locals/with-stack
/// and the class layout table. Returns `None` for forms with no
/// statically-known class (e.g. the result of an arbitrary method call, or
/// a dynamically-typed expression) — callers fall back to a best-effort
/// direct call in that case rather than fabricating one.
pub fn static_class_of<'a, 'l>(expr: &Expr, vars: &VarSlots<'l>, ctx: &Lowerer<'a, 'l>) -> Option<&'l ClassDef<'l>> {
	match expr {
		Expr::Ident(name, _) => vars.get(name).and_then(|s| s.class).or_else(|| {
			vars.with_stack.iter().rev().find_map(|(_, class)| class.find_field(name).and_then(|f| Lowerer::class_of_type(&f.ty)))
		}),
		Expr::FieldAccess { base, field, .. } => {
			let base_class = static_class_of(base, vars, ctx)?;
			let f = base_class.find_field(field)?;
			Lowerer::class_of_type(&f.ty)
		}
		Expr::New { class_name, .. } => ctx.find_class(class_name),
		_ => None,
	}
}

pub fn lower_expr<'a, 'l>(builder: &mut IrBuilder, expr: &Expr, vars: &mut VarSlots<'l>, ctx: &Lowerer<'a, 'l>) -> (Value, IlType) {
	match expr {
		Expr::IntLit(v, _) => (Value::ConstInt(*v), IlType::I32),
		Expr::FloatLit(v, _) => (Value::ConstFloat(*v), IlType::F64),
		Expr::BoolLit(v, _) => (Value::ConstBool(*v), IlType::Bool),
		Expr::StringLit(s, _) => {
			let idx = builder.intern_string(s);
			(Value::StringConst(idx), IlType::Ref)
		}
		Expr::NilLit(_) => (Value::Null, IlType::Ref),
		Expr::Ident(name, _) => lower_ident(builder, name, vars),
		Expr::Unary { op, operand, .. } => lower_unary(builder, *op, operand, vars, ctx),
		Expr::Binary { op, lhs, rhs, .. } => lower_binary(builder, *op, lhs, rhs, vars, ctx),
		Expr::IsNotNil { operand, .. } => {
			let (v, _) = lower_expr(builder, operand, vars, ctx);
			let temp = builder.icmp(Predicate::Ne, v, Value::Null);
			(Value::Temp(temp), IlType::Bool)
		}
		Expr::Call { callee, args, .. } => calls::lower_call(builder, callee, args, vars, ctx),
		Expr::FieldAccess { base, field, .. } => {
			let (base_val, _) = lower_expr(builder, base, vars, ctx);
			let base_class = static_class_of(base, vars, ctx);
			match base_class.and_then(|c| c.find_field(field)) {
				Some(f) => {
					let ty = ctx_type_of(&f.ty);
					let temp = builder.load(ty, base_val, f.offset.get());
					(Value::Temp(temp), ty)
				}
				// Static class not known at lowering time (e.g. the base is
				// itself the result of a call whose return type isn't
				// tracked here) — load at offset 0 as a last resort so the
				// function stays well-formed.
				None => {
					let temp = builder.load(IlType::Ref, base_val, 0);
					(Value::Temp(temp), IlType::Ref)
				}
			}
		}
		Expr::Index { base, index, .. } => {
			let (base_val, _) = lower_expr(builder, base, vars, ctx);
			let (index_val, _) = lower_expr(builder, index, vars, ctx);
			let offset_temp = builder.binary(Opcode::IMulOvf, IlType::I64, index_val, Value::ConstInt(8));
			let elem_ptr = builder.binary(Opcode::IAddOvf, IlType::I64, base_val, Value::Temp(offset_temp));
			let temp = builder.load(IlType::Ref, Value::Temp(elem_ptr), 0);
			(Value::Temp(temp), IlType::Ref)
		}
		Expr::New { class_name, args, .. } => calls::lower_new(builder, class_name, args, vars, ctx),
	}
}

fn lower_ident<'l>(builder: &mut IrBuilder, name: &str, vars: &VarSlots<'l>) -> (Value, IlType) {
	if let Some(slot) = vars.get(name) {
		return (slot.value, slot.ty);
	}
	// Not a local: fall back to the innermost `with` receiver that declares
	// a field of this name (spec §4.6 `with` scoping).
	for (receiver, class) in vars.with_stack.iter().rev() {
		if let Some(f) = class.find_field(name) {
			let ty = ctx_type_of(&f.ty);
			let temp = builder.load(ty, *receiver, f.offset.get());
			return (Value::Temp(temp), ty);
		}
	}
	(Value::Null, IlType::Ref)
}

fn ctx_type_of(ty: &crate::sem::types::Type) -> IlType {
	Lowerer::il_type_of(ty)
}

fn lower_unary<'a, 'l>(builder: &mut IrBuilder, op: UnOp, operand: &Expr, vars: &mut VarSlots<'l>, ctx: &Lowerer<'a, 'l>) -> (Value, IlType) {
	let (v, ty) = lower_expr(builder, operand, vars, ctx);
	match op {
		UnOp::Neg => (Value::Temp(builder.unary(Opcode::Neg, ty, v)), ty),
		UnOp::Not => (Value::Temp(builder.unary(Opcode::Not, IlType::Bool, v)), IlType::Bool),
	}
}

fn lower_binary<'a, 'l>(builder: &mut IrBuilder, op: BinOp, lhs: &Expr, rhs: &Expr, vars: &mut VarSlots<'l>, ctx: &Lowerer<'a, 'l>) -> (Value, IlType) {
	match op {
		// Short-circuit forms evaluate the right side only when needed, so
		// they can't share the straight-line `lower_expr` both sides first
		// shape the arithmetic/comparison arms below use.
		BinOp::And => return lower_and_or(builder, true, lhs, rhs, vars, ctx),
		BinOp::Or => return lower_and_or(builder, false, lhs, rhs, vars, ctx),
		BinOp::Coalesce => return lower_coalesce(builder, lhs, rhs, vars, ctx),
		_ => {}
	}

	let (lv, lty) = lower_expr(builder, lhs, vars, ctx);
	let (rv, rty) = lower_expr(builder, rhs, vars, ctx);
	let is_float = lty.is_float() || rty.is_float();
	let result_ty = if is_float { IlType::F64 } else { lty };
	match op {
		BinOp::Add if is_float => (Value::Temp(builder.binary(Opcode::FAdd, result_ty, lv, rv)), result_ty),
		BinOp::Sub if is_float => (Value::Temp(builder.binary(Opcode::FSub, result_ty, lv, rv)), result_ty),
		BinOp::Mul if is_float => (Value::Temp(builder.binary(Opcode::FMul, result_ty, lv, rv)), result_ty),
		BinOp::Div => (Value::Temp(builder.binary(Opcode::FDiv, IlType::F64, lv, rv)), IlType::F64),
		BinOp::Add => (Value::Temp(builder.binary(Opcode::IAddOvf, result_ty, lv, rv)), result_ty),
		BinOp::Sub => (Value::Temp(builder.binary(Opcode::ISubOvf, result_ty, lv, rv)), result_ty),
		BinOp::Mul => (Value::Temp(builder.binary(Opcode::IMulOvf, result_ty, lv, rv)), result_ty),
		BinOp::Mod => (Value::Temp(builder.binary(Opcode::SRemChk0, result_ty, lv, rv)), result_ty),
		BinOp::Eq => (Value::Temp(builder.icmp(Predicate::Eq, lv, rv)), IlType::Bool),
		BinOp::Ne => (Value::Temp(builder.icmp(Predicate::Ne, lv, rv)), IlType::Bool),
		BinOp::Lt => (Value::Temp(builder.icmp(Predicate::Lt, lv, rv)), IlType::Bool),
		BinOp::Le => (Value::Temp(builder.icmp(Predicate::Le, lv, rv)), IlType::Bool),
		BinOp::Gt => (Value::Temp(builder.icmp(Predicate::Gt, lv, rv)), IlType::Bool),
		BinOp::Ge => (Value::Temp(builder.icmp(Predicate::Ge, lv, rv)), IlType::Bool),
		BinOp::And | BinOp::Or | BinOp::Coalesce => unreachable!("handled above"),
	}
}

/// `a and b` / `a or b`: a diamond with a 1-byte (`Bool`) result slot.
/// `and` skips evaluating `b` once `a` is false; `or` skips it once `a` is
/// true — the right operand may have side effects, so it must not be
/// evaluated unconditionally (spec §4.8).
fn lower_and_or<'a, 'l>(builder: &mut IrBuilder, is_and: bool, lhs: &Expr, rhs: &Expr, vars: &mut VarSlots<'l>, ctx: &Lowerer<'a, 'l>) -> (Value, IlType) {
	let (lv, _) = lower_expr(builder, lhs, vars, ctx);

	let rhs_block = builder.create_block();
	let join_block = builder.create_block();
	let result = builder.add_block_param(join_block, IlType::Bool);

	if is_and {
		builder.br_cond(lv, rhs_block, vec![], join_block, vec![Value::ConstBool(false)]);
	} else {
		builder.br_cond(lv, join_block, vec![Value::ConstBool(true)], rhs_block, vec![]);
	}

	builder.switch_to_block(rhs_block);
	let (rv, _) = lower_expr(builder, rhs, vars, ctx);
	builder.br(join_block, vec![rv]);

	builder.switch_to_block(join_block);
	(Value::Temp(result), IlType::Bool)
}

/// `a ?? b`: evaluate `a`; if non-null, its value is the result, otherwise
/// evaluate and use `b` (spec: "lowers to a null-check diamond").
fn lower_coalesce<'a, 'l>(builder: &mut IrBuilder, lhs: &Expr, rhs: &Expr, vars: &mut VarSlots<'l>, ctx: &Lowerer<'a, 'l>) -> (Value, IlType) {
	let (lv, lty) = lower_expr(builder, lhs, vars, ctx);
	let is_null = builder.icmp(Predicate::Eq, lv, Value::Null);

	let rhs_block = builder.create_block();
	let join_block = builder.create_block();
	let result = builder.add_block_param(join_block, lty);

	builder.br_cond(Value::Temp(is_null), rhs_block, vec![], join_block, vec![lv]);

	builder.switch_to_block(rhs_block);
	let (rv, _) = lower_expr(builder, rhs, vars, ctx);
	builder.br(join_block, vec![rv]);

	builder.switch_to_block(join_block);
	(Value::Temp(result), lty)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostics::SourceLoc;
	use crate::layout::ClassLayoutComputer;

	#[test]
	fn lowering_integer_add_emits_one_binary_instr() {
		let layout = ClassLayoutComputer::new();
		let ctx = Lowerer::new(&layout, std::iter::empty());
		let mut builder = IrBuilder::new("f", vec![], IlType::I32);
		let mut vars = VarSlots::default();
		let expr = Expr::Binary {
			op: BinOp::Add,
			lhs: Box::new(Expr::IntLit(1, SourceLoc::default())),
			rhs: Box::new(Expr::IntLit(2, SourceLoc::default())),
			loc: SourceLoc::default(),
		};
		let (value, ty) = lower_expr(&mut builder, &expr, &mut vars, &ctx);
		assert_eq!(ty, IlType::I32);
		assert!(matches!(value, Value::Temp(_)));
	}

	#[test]
	fn coalesce_produces_a_join_block_with_a_bool_sized_result() {
		let layout = ClassLayoutComputer::new();
		let ctx = Lowerer::new(&layout, std::iter::empty());
		let mut builder = IrBuilder::new("f", vec![], IlType::Ref);
		let mut vars = VarSlots::default();
		let expr = Expr::Binary {
			op: BinOp::Coalesce,
			lhs: Box::new(Expr::NilLit(SourceLoc::default())),
			rhs: Box::new(Expr::IntLit(5, SourceLoc::default())),
			loc: SourceLoc::default(),
		};
		let (value, _) = lower_expr(&mut builder, &expr, &mut vars, &ctx);
		assert!(matches!(value, Value::Temp(_)));
	}
}
