//! Expression typing, assignability checks and constant folding (spec
//! §4.6), grounded on the original's expression-checking visitor. Constant
//! folding here backs both `const` declaration checking and `case` label
//! overflow bounds (spec Open Question: case labels are bounded to 64-bit
//! ordinal range).

use crate::ast::{BinOp, Expr, UnOp};
use crate::diagnostics::{DiagnosticSink, ErrorKind, SourceLoc};
use crate::sem::class::{ClassDef, InterfaceDef, Method};
use crate::sem::symbols::SymbolTable;
use crate::sem::types::{Primitive, Type};
use fxhash::FxHashMap;

/// A free function's resolved parameter/return types, built once per
/// compilation unit so call-shape (a) ("free function by simple name") can
/// be checked against real arity/assignability instead of always recovering
/// to `Object`.
#[derive(Debug, Clone)]
pub struct ProcSignature<'l> {
	pub params: Vec<Type<'l>>,
	pub return_ty: Type<'l>,
}

/// The lookup tables `infer` needs to resolve the spec's four `Call` shapes:
/// free function, method call, type-cast, and constructor call. Borrowed
/// from the analyzer for the duration of one unit's body-checking pass.
pub struct TypeCtx<'c, 'l> {
	pub classes: &'c FxHashMap<String, &'l ClassDef<'l>>,
	pub ifaces: &'c FxHashMap<String, &'l InterfaceDef<'l>>,
	pub procedures: &'c FxHashMap<String, ProcSignature<'l>>,
}

impl<'c, 'l> TypeCtx<'c, 'l> {
	pub fn new(classes: &'c FxHashMap<String, &'l ClassDef<'l>>, ifaces: &'c FxHashMap<String, &'l InterfaceDef<'l>>, procedures: &'c FxHashMap<String, ProcSignature<'l>>) -> Self {
		TypeCtx { classes, ifaces, procedures }
	}

	/// Classes/interfaces are keyed by qualified name; callers write the
	/// simple name, so fall back to a case-insensitive scan over the
	/// declared simple names when an exact qualified match misses.
	pub(crate) fn find_class(&self, name: &str) -> Option<&'l ClassDef<'l>> {
		self.classes.get(name).copied().or_else(|| self.classes.values().copied().find(|c| c.name.eq_ignore_ascii_case(name)))
	}

	fn find_procedure(&self, name: &str) -> Option<&ProcSignature<'l>> {
		self.procedures.get(name).or_else(|| self.procedures.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v))
	}
}

pub(crate) fn find_method<'l>(class: &'l ClassDef<'l>, name: &str) -> Option<&'l Method<'l>> {
	class.methods.get().iter().find(|m| m.name.eq_ignore_ascii_case(name)).or_else(|| class.base.get().and_then(|base| find_method(base, name)))
}

/// A folded constant value, used for `const` initializers and compile-time
/// divide-by-zero detection. Only the subset of literal forms frontends
/// actually declare as constants needs representation here.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ConstValue {
	Int(i64),
	Float(f64),
	Bool(bool),
}

/// Attempts to fold `expr` to a compile-time constant. Returns `None` for
/// anything not foldable (identifiers referring to non-const symbols,
/// calls, field access, `new`); the caller reports
/// `ErrorKind::NonConstantInitializer` when folding a `const` initializer
/// fails.
pub fn fold_const(expr: &Expr) -> Option<ConstValue> {
	match expr {
		Expr::IntLit(v, _) => Some(ConstValue::Int(*v)),
		Expr::FloatLit(v, _) => Some(ConstValue::Float(*v)),
		Expr::BoolLit(v, _) => Some(ConstValue::Bool(*v)),
		Expr::Unary { op, operand, .. } => {
			let v = fold_const(operand)?;
			match (op, v) {
				(UnOp::Neg, ConstValue::Int(i)) => Some(ConstValue::Int(-i)),
				(UnOp::Neg, ConstValue::Float(f)) => Some(ConstValue::Float(-f)),
				(UnOp::Not, ConstValue::Bool(b)) => Some(ConstValue::Bool(!b)),
				_ => None,
			}
		}
		Expr::Binary { op, lhs, rhs, .. } => {
			let l = fold_const(lhs)?;
			let r = fold_const(rhs)?;
			fold_binary(*op, l, r)
		}
		_ => None,
	}
}

fn fold_binary(op: BinOp, l: ConstValue, r: ConstValue) -> Option<ConstValue> {
	use ConstValue::*;
	match (l, r) {
		(Int(a), Int(b)) => match op {
			BinOp::Add => a.checked_add(b).map(Int),
			BinOp::Sub => a.checked_sub(b).map(Int),
			BinOp::Mul => a.checked_mul(b).map(Int),
			BinOp::Div if b != 0 => a.checked_div(b).map(Int),
			BinOp::Mod if b != 0 => a.checked_rem(b).map(Int),
			BinOp::Eq => Some(Bool(a == b)),
			BinOp::Ne => Some(Bool(a != b)),
			BinOp::Lt => Some(Bool(a < b)),
			BinOp::Le => Some(Bool(a <= b)),
			BinOp::Gt => Some(Bool(a > b)),
			BinOp::Ge => Some(Bool(a >= b)),
			_ => None,
		},
		(Float(a), Float(b)) => match op {
			BinOp::Add => Some(Float(a + b)),
			BinOp::Sub => Some(Float(a - b)),
			BinOp::Mul => Some(Float(a * b)),
			BinOp::Div => Some(Float(a / b)),
			BinOp::Eq => Some(Bool(a == b)),
			BinOp::Ne => Some(Bool(a != b)),
			BinOp::Lt => Some(Bool(a < b)),
			BinOp::Le => Some(Bool(a <= b)),
			BinOp::Gt => Some(Bool(a > b)),
			BinOp::Ge => Some(Bool(a >= b)),
			_ => None,
		},
		(Bool(a), Bool(b)) => match op {
			BinOp::And => Some(Bool(a && b)),
			BinOp::Or => Some(Bool(a || b)),
			BinOp::Eq => Some(Bool(a == b)),
			BinOp::Ne => Some(Bool(a != b)),
			_ => None,
		},
		_ => None,
	}
}

/// Whether constant-folding `expr` as a divisor hits literal zero. Used to
/// raise `ErrorKind::ConstDivisionByZero` ahead of runtime, for the subset
/// of divisions whose divisor is itself a compile-time constant.
pub fn is_const_zero_divisor(divisor: &Expr) -> bool {
	match fold_const(divisor) {
		Some(ConstValue::Int(0)) => true,
		Some(ConstValue::Float(f)) => f == 0.0,
		_ => false,
	}
}

/// Infers the type of `expr` against the current symbol table, reporting
/// type errors through `diags`. Returns `Type::Primitive(Primitive::Object)`
/// as a recovery type after any error so callers can keep checking without
/// cascading failures.
pub fn infer<'c, 'l>(expr: &Expr, symbols: &SymbolTable<'l>, tyctx: &TypeCtx<'c, 'l>, diags: &mut DiagnosticSink) -> Type<'l> {
	match expr {
		Expr::IntLit(..) => Type::Primitive(Primitive::Int32),
		Expr::FloatLit(..) => Type::Primitive(Primitive::Float64),
		Expr::BoolLit(..) => Type::Primitive(Primitive::Bool),
		Expr::StringLit(..) => Type::Primitive(Primitive::Str),
		Expr::NilLit(..) => Type::Primitive(Primitive::Object),
		Expr::Ident(name, loc) => match symbols.effective_type(name).or_else(|| symbols.resolve_with_field(name)) {
			Some(ty) => ty,
			None => {
				diags.error(ErrorKind::UndefinedIdentifier, *loc, name.len() as u32, format!("undefined identifier '{name}'"));
				Type::Primitive(Primitive::Object)
			}
		},
		Expr::Unary { operand, .. } => infer(operand, symbols, tyctx, diags),
		Expr::Binary { op, lhs, rhs, loc } => infer_binary(*op, lhs, rhs, *loc, symbols, tyctx, diags),
		Expr::IsNotNil { .. } => Type::Primitive(Primitive::Bool),
		Expr::FieldAccess { base, field, loc } => infer_field(base, field, *loc, symbols, tyctx, diags),
		Expr::Index { base, .. } => match infer(base, symbols, tyctx, diags) {
			Type::Array(elem) => *elem,
			_ => Type::Primitive(Primitive::Object),
		},
		Expr::Call { callee, args, loc } => infer_call(callee, args, *loc, symbols, tyctx, diags),
		Expr::New { class_name, args, loc } => {
			for arg in args {
				infer(arg, symbols, tyctx, diags);
			}
			match tyctx.find_class(class_name) {
				Some(class) => {
					if class.is_abstract {
						diags.error(ErrorKind::CannotInstantiateAbstract, *loc, class_name.len() as u32, format!("cannot instantiate abstract class '{class_name}'"));
					}
					Type::Class(class)
				}
				None => {
					diags.error(ErrorKind::UndefinedType, *loc, class_name.len() as u32, format!("undefined class '{class_name}'"));
					Type::Primitive(Primitive::Object)
				}
			}
		}
	}
}

/// Resolves the spec's four `Call` shapes: (a) a free function by simple
/// name, (b) `receiver.name(args)`, (c) `TypeName(expr)` as a type cast, and
/// (d) `ClassName.Create(args)` as a constructor call (rejected when
/// `ClassName` is abstract).
fn infer_call<'c, 'l>(callee: &Expr, args: &[Expr], loc: SourceLoc, symbols: &SymbolTable<'l>, tyctx: &TypeCtx<'c, 'l>, diags: &mut DiagnosticSink) -> Type<'l> {
	match callee {
		Expr::FieldAccess { base, field, .. } => {
			if let Expr::Ident(base_name, _) = base.as_ref() {
				// A bare identifier that names a class (and isn't shadowed by
				// a local variable) is a static reference: `.Create(...)` is
				// shape (d), anything else a static method call.
				if symbols.lookup(base_name).is_none() {
					if let Some(class) = tyctx.find_class(base_name) {
						for arg in args {
							infer(arg, symbols, tyctx, diags);
						}
						if field.eq_ignore_ascii_case("Create") {
							if class.is_abstract {
								diags.error(ErrorKind::CannotInstantiateAbstract, loc, base_name.len() as u32, format!("cannot instantiate abstract class '{base_name}'"));
							}
							return Type::Class(class);
						}
						return dispatch_method(class, field, loc, diags);
					}
				}
			}
			let recv_ty = infer(base, symbols, tyctx, diags);
			for arg in args {
				infer(arg, symbols, tyctx, diags);
			}
			match recv_ty {
				Type::Class(class) => dispatch_method(class, field, loc, diags),
				_ => Type::Primitive(Primitive::Object),
			}
		}
		Expr::Ident(name, ident_loc) => {
			if let Some(class) = tyctx.find_class(name) {
				// (c) type-cast form: `TypeName(expr)`.
				for arg in args {
					infer(arg, symbols, tyctx, diags);
				}
				if args.len() != 1 {
					diags.error(ErrorKind::UndefinedProcedure, loc, name.len() as u32, format!("cast '{name}(...)' takes exactly one argument, found {}", args.len()));
				}
				return Type::Class(class);
			}
			match tyctx.find_procedure(name) {
				Some(sig) => {
					for (arg, expected) in args.iter().zip(sig.params.iter()) {
						let actual = infer(arg, symbols, tyctx, diags);
						if !expected.is_assignable_from(&actual) {
							diags.error(ErrorKind::AssignmentTypeMismatch, arg.loc(), 1, format!("argument type '{actual}' is not assignable to parameter type '{expected}'"));
						}
					}
					if args.len() != sig.params.len() {
						diags.error(ErrorKind::UndefinedProcedure, loc, name.len() as u32, format!("'{name}' expects {} argument(s), found {}", sig.params.len(), args.len()));
					}
					sig.return_ty
				}
				None => {
					diags.error(ErrorKind::UndefinedProcedure, *ident_loc, name.len() as u32, format!("undefined procedure '{name}'"));
					for arg in args {
						infer(arg, symbols, tyctx, diags);
					}
					Type::Primitive(Primitive::Object)
				}
			}
		}
		_ => {
			infer(callee, symbols, tyctx, diags);
			for arg in args {
				infer(arg, symbols, tyctx, diags);
			}
			Type::Primitive(Primitive::Object)
		}
	}
}

fn dispatch_method<'l>(class: &'l ClassDef<'l>, name: &str, loc: SourceLoc, diags: &mut DiagnosticSink) -> Type<'l> {
	match find_method(class, name) {
		Some(m) => {
			if m.is_abstract {
				diags.error(ErrorKind::AbstractMethodInvocation, loc, name.len() as u32, format!("cannot call abstract method '{name}' directly"));
			}
			m.return_ty
		}
		None => {
			diags.error(ErrorKind::UndefinedIdentifier, loc, name.len() as u32, format!("no method '{name}' on '{}'", class.qualified_name()));
			Type::Primitive(Primitive::Object)
		}
	}
}

fn infer_binary<'c, 'l>(op: BinOp, lhs: &Expr, rhs: &Expr, loc: SourceLoc, symbols: &SymbolTable<'l>, tyctx: &TypeCtx<'c, 'l>, diags: &mut DiagnosticSink) -> Type<'l> {
	let lt = infer(lhs, symbols, tyctx, diags);
	let rt = infer(rhs, symbols, tyctx, diags);
	match op {
		BinOp::Eq | BinOp::Ne => {
			if matches!(lhs, Expr::NilLit(_)) && !(rt.is_optional() || rt.is_reference_type()) {
				diags.error(ErrorKind::NilComparedWithNonOptional, loc, 3, format!("'nil' compared against non-optional type '{rt}'"));
			} else if matches!(rhs, Expr::NilLit(_)) && !(lt.is_optional() || lt.is_reference_type()) {
				diags.error(ErrorKind::NilComparedWithNonOptional, loc, 3, format!("'nil' compared against non-optional type '{lt}'"));
			}
			Type::Primitive(Primitive::Bool)
		}
		BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::And | BinOp::Or => {
			Type::Primitive(Primitive::Bool)
		}
		// `??` requires type-compatible unwrapped operands and yields the
		// unwrapped type (spec §4.6).
		BinOp::Coalesce => {
			let unwrapped_l = match lt {
				Type::Optional(inner) => *inner,
				other => other,
			};
			let unwrapped_r = match rt {
				Type::Optional(inner) => *inner,
				other => other,
			};
			if !types_compatible(&unwrapped_l, &unwrapped_r) {
				diags.error(ErrorKind::OperatorTypeMismatch, loc, 2, format!("'??' operands have incompatible types {unwrapped_l} and {unwrapped_r}"));
			}
			unwrapped_l
		}
		// `/` always yields a float (spec §4.6), regardless of operand types.
		BinOp::Div => {
			if !types_compatible(&lt, &rt) {
				diags.error(ErrorKind::OperatorTypeMismatch, loc, 1, format!("operator applied to incompatible types {lt} and {rt}"));
			}
			Type::Primitive(Primitive::Float64)
		}
		_ => {
			if !types_compatible(&lt, &rt) {
				diags.error(ErrorKind::OperatorTypeMismatch, loc, 1, format!("operator applied to incompatible types {lt} and {rt}"));
			}
			// Arithmetic promotes int -> float when either side is float.
			match (lt, rt) {
				(Type::Primitive(a), Type::Primitive(b)) if a.is_float() || b.is_float() => Type::Primitive(Primitive::Float64),
				_ => lt,
			}
		}
	}
}

fn types_compatible<'l>(a: &Type<'l>, b: &Type<'l>) -> bool {
	matches!(
		(a, b),
		(Type::Primitive(x), Type::Primitive(y)) if x.is_numeric() == y.is_numeric() && (x == y || (x.is_numeric() && y.is_numeric()))
	)
}

fn infer_field<'c, 'l>(base: &Expr, field: &str, loc: SourceLoc, symbols: &SymbolTable<'l>, tyctx: &TypeCtx<'c, 'l>, diags: &mut DiagnosticSink) -> Type<'l> {
	let base_ty = infer(base, symbols, tyctx, diags);
	match base_ty {
		Type::Class(class) => match find_field_type(class, field) {
			Some(ty) => ty,
			None => {
				diags.error(ErrorKind::UndefinedIdentifier, loc, field.len() as u32, format!("no field '{field}' on '{}'", class.qualified_name()));
				Type::Primitive(Primitive::Object)
			}
		},
		_ => Type::Primitive(Primitive::Object),
	}
}

fn find_field_type<'l>(class: &'l ClassDef<'l>, name: &str) -> Option<Type<'l>> {
	class.find_field(name).map(|f| f.ty)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostics::CollectingEmitter;

	#[test]
	fn folds_nested_arithmetic() {
		let loc = Default::default();
		let expr = Expr::Binary {
			op: BinOp::Add,
			lhs: Box::new(Expr::IntLit(2, loc)),
			rhs: Box::new(Expr::Binary { op: BinOp::Mul, lhs: Box::new(Expr::IntLit(3, loc)), rhs: Box::new(Expr::IntLit(4, loc)), loc }),
			loc,
		};
		assert_eq!(fold_const(&expr), Some(ConstValue::Int(14)));
	}

	#[test]
	fn division_by_nonzero_folds_cleanly() {
		let loc = Default::default();
		let expr = Expr::Binary { op: BinOp::Div, lhs: Box::new(Expr::IntLit(10, loc)), rhs: Box::new(Expr::IntLit(2, loc)), loc };
		assert_eq!(fold_const(&expr), Some(ConstValue::Int(5)));
	}

	#[test]
	fn division_by_const_zero_does_not_fold() {
		let loc = Default::default();
		let expr = Expr::Binary { op: BinOp::Div, lhs: Box::new(Expr::IntLit(10, loc)), rhs: Box::new(Expr::IntLit(0, loc)), loc };
		assert_eq!(fold_const(&expr), None);
		assert!(is_const_zero_divisor(&Expr::IntLit(0, loc)));
	}

	#[test]
	fn undefined_identifier_reports_and_recovers_as_object() {
		let mut emitter = CollectingEmitter::default();
		let mut sink = crate::diagnostics::DiagnosticSink::new(&mut emitter);
		let symbols = SymbolTable::new();
		let classes = FxHashMap::default();
		let ifaces = FxHashMap::default();
		let procedures = FxHashMap::default();
		let tyctx = TypeCtx::new(&classes, &ifaces, &procedures);
		let ty = infer(&Expr::Ident("missing".into(), Default::default()), &symbols, &tyctx, &mut sink);
		assert!(matches!(ty, Type::Primitive(Primitive::Object)));
		assert_eq!(sink.error_count(), 1);
	}

	#[test]
	fn nil_compared_with_plain_int_is_rejected() {
		let mut emitter = CollectingEmitter::default();
		let mut sink = crate::diagnostics::DiagnosticSink::new(&mut emitter);
		let symbols = SymbolTable::new();
		let classes = FxHashMap::default();
		let ifaces = FxHashMap::default();
		let procedures = FxHashMap::default();
		let tyctx = TypeCtx::new(&classes, &ifaces, &procedures);
		let loc = Default::default();
		let expr = Expr::Binary { op: BinOp::Eq, lhs: Box::new(Expr::IntLit(1, loc)), rhs: Box::new(Expr::NilLit(loc)), loc };
		infer(&expr, &symbols, &tyctx, &mut sink);
		assert_eq!(sink.error_count(), 1);
	}

	#[test]
	fn nil_compared_with_object_is_accepted() {
		let mut emitter = CollectingEmitter::default();
		let mut sink = crate::diagnostics::DiagnosticSink::new(&mut emitter);
		let mut symbols = SymbolTable::new();
		symbols.declare(crate::sem::symbols::Symbol { name: "x".into(), ty: Type::Primitive(Primitive::Object), is_const: false, is_loop_var: false });
		let classes = FxHashMap::default();
		let ifaces = FxHashMap::default();
		let procedures = FxHashMap::default();
		let tyctx = TypeCtx::new(&classes, &ifaces, &procedures);
		let loc = Default::default();
		let expr = Expr::Binary { op: BinOp::Ne, lhs: Box::new(Expr::Ident("x".into(), loc)), rhs: Box::new(Expr::NilLit(loc)), loc };
		infer(&expr, &symbols, &tyctx, &mut sink);
		assert_eq!(sink.error_count(), 0);
	}
}
