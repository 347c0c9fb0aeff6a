//! AST-to-IL lowering (spec §4.8), grounded on the original's
//! `Lowerer_OOP.cpp` for the object-model-specific pieces (mangling,
//! vtable/module-init emission) and on the statement/expression visitors
//! for everything else.

pub mod builtins;
pub mod calls;
pub mod exceptions;
pub mod exprs;
pub mod oop;
pub mod stmts;

use crate::ast::{CompilationUnit, Decl};
use crate::il::module::Module;
use crate::il::types::IlType;
use crate::layout::ClassLayoutComputer;
use crate::sem::class::{ClassDef, InterfaceDef};
use crate::sem::types::{Primitive, Type};
use fxhash::FxHashMap;

/// Per-compilation lowering state: the class-layout table (read-only at
/// this point, populated by a prior call to
/// [`crate::layout::ClassLayoutComputer::compute_all`]) plus name-keyed
/// lookup tables so call/field/cast lowering can resolve an expression's
/// static class the way [`crate::sem::analyzer_expr::TypeCtx`] does on the
/// semantic-analysis side.
pub struct Lowerer<'a, 'l> {
	pub layout: &'a ClassLayoutComputer<'l>,
	classes: FxHashMap<String, &'l ClassDef<'l>>,
	ifaces: FxHashMap<String, &'l InterfaceDef<'l>>,
}

impl<'a, 'l> Lowerer<'a, 'l> {
	pub fn new(
		layout: &'a ClassLayoutComputer<'l>,
		ifaces: impl IntoIterator<Item = &'l InterfaceDef<'l>>,
	) -> Self {
		let classes = layout.registration_order().iter().map(|c| (c.qualified_name().to_string(), *c)).collect();
		let ifaces = ifaces.into_iter().map(|i| (i.qualified_name().to_string(), i)).collect();
		Lowerer { layout, classes, ifaces }
	}

	/// Qualified-name exact match, falling back to a case-insensitive scan by
	/// simple (unqualified) name — mirrors `TypeCtx::find_class`.
	pub fn find_class(&self, name: &str) -> Option<&'l ClassDef<'l>> {
		if let Some(c) = self.classes.get(name) {
			return Some(*c);
		}
		self.classes.values().find(|c| simple_name(c.qualified_name()).eq_ignore_ascii_case(name)).copied()
	}

	pub fn find_iface(&self, name: &str) -> Option<&'l InterfaceDef<'l>> {
		if let Some(i) = self.ifaces.get(name) {
			return Some(*i);
		}
		self.ifaces.values().find(|i| simple_name(i.qualified_name()).eq_ignore_ascii_case(name)).copied()
	}

	/// The class declaring (or inheriting unmodified) `method_name`,
	/// walking the base chain so a non-overridden inherited method mangles
	/// to the name of the class that actually owns its body.
	pub fn owning_class(&self, class: &'l ClassDef<'l>, method_name: &str) -> Option<&'l ClassDef<'l>> {
		if class.methods.get().iter().any(|m| m.name.eq_ignore_ascii_case(method_name)) {
			return Some(class);
		}
		class.base.get().and_then(|base| self.owning_class(base, method_name))
	}

	pub fn lower_unit(&mut self, unit: &CompilationUnit, module: &mut Module) {
		for decl in &unit.decls {
			match decl {
				Decl::Procedure(proc) => {
					let function = stmts::lower_procedure(proc, self);
					module.push_function(function);
				}
				Decl::Class(class_decl) => {
					let qname = ClassDef::qualified_name_into(&unit.namespace, &class_decl.name);
					let class_def = self.classes.get(&qname).copied();
					for method in &class_decl.methods {
						if let Some(body) = &method.body {
							let mangled = if method.is_constructor {
								oop::mangle_constructor(&class_decl.name)
							} else if method.is_destructor {
								oop::mangle_destructor(&class_decl.name)
							} else {
								oop::mangle_method(&class_decl.name, &method.sig.name)
							};
							let function = stmts::lower_method_body(&mangled, method, body, self, class_def);
							module.push_function(function);
						}
					}
				}
				_ => {}
			}
		}

		for class in self.layout.registration_order() {
			module.class_registrations.push(oop::build_registration(class, self.layout));
		}
	}

	pub fn il_type_of(ty: &Type) -> IlType {
		match ty {
			Type::Primitive(Primitive::Void) => IlType::Void,
			Type::Primitive(Primitive::Bool) => IlType::Bool,
			Type::Primitive(Primitive::Char) => IlType::U16,
			Type::Primitive(Primitive::Int8) => IlType::I8,
			Type::Primitive(Primitive::Int16) => IlType::I16,
			Type::Primitive(Primitive::Int32) => IlType::I32,
			Type::Primitive(Primitive::Int64) => IlType::I64,
			Type::Primitive(Primitive::UInt8) => IlType::U8,
			Type::Primitive(Primitive::UInt16) => IlType::U16,
			Type::Primitive(Primitive::UInt32) => IlType::U32,
			Type::Primitive(Primitive::UInt64) => IlType::U64,
			Type::Primitive(Primitive::Float32) => IlType::F32,
			Type::Primitive(Primitive::Float64) => IlType::F64,
			Type::Primitive(Primitive::Str | Primitive::Object) => IlType::Ref,
			Type::Class(_) | Type::Array(_) => IlType::Ref,
			Type::Interface(_) => IlType::InterfaceRef,
			Type::Optional(inner) => Self::il_type_of(inner),
			// Records and sets carry no identity of their own; until
			// record/set-valued locals are lowered as inline aggregates they
			// are only ever handled as field containers, never a standalone
			// slot, so a pointer-sized ref is a safe placeholder.
			Type::Record(_) | Type::Set(_) => IlType::Ref,
			// A range value is carried as its ordinal base type.
			Type::Range(elem) => Self::il_type_of(elem),
			// Procedure-typed values are always a pointer-sized ref.
			Type::Function { .. } => IlType::Ref,
			// Enum members are represented by their ordinal, matching
			// `EnumDef::ordinal_of`'s return type.
			Type::Enum(_) => IlType::I64,
		}
	}

	/// The class a value of `ty` statically belongs to, if any — used by
	/// [`exprs::static_class_of`] to follow a field-access chain through an
	/// intermediate class-typed field.
	pub fn class_of_type(ty: &Type<'l>) -> Option<&'l ClassDef<'l>> {
		match ty {
			Type::Class(c) => Some(*c),
			Type::Optional(inner) => Self::class_of_type(inner),
			_ => None,
		}
	}
}

fn simple_name(qualified: &str) -> &str {
	qualified.rsplit('.').next().unwrap_or(qualified)
}
