//! Pass 1 of the semantic analyzer (spec §4.6): registers every namespace,
//! class and interface declared in a compilation unit before any method
//! body is checked, so forward references and mutual recursion between
//! classes resolve correctly in pass 2.

use crate::ast::{ClassDecl, CompilationUnit, Decl, HeritageEntry, InterfaceDecl, MethodDecl, MethodSignature, ParamDecl};
use crate::diagnostics::{DiagnosticSink, ErrorKind};
use crate::sem::class::{AccessorKind, ClassDef, Field, InterfaceDef, Method, Param, Property, Visibility};
use crate::sem::namespace::NamespaceRegistry;
use crate::sem::resolver::{self, Kind};
use crate::sem::types::{Primitive, Type};
use crate::sem::using_ctx::UsingContext;
use bumpalo::Bump;
use std::cell::Cell;

/// Outcome of disambiguating a class's heritage clause (grounded on the
/// original's `checkClassInfo`): the first entry is the base class only if
/// it resolves to a registered class; everything else (and the first entry,
/// if it didn't resolve to a class) is treated as an interface reference.
pub struct Heritage {
	pub base_name: Option<String>,
	pub interface_names: Vec<String>,
}

pub fn classify_heritage(
	registry: &NamespaceRegistry,
	using_ctx: &UsingContext,
	current_ns: &str,
	entries: &[HeritageEntry],
	diags: &mut DiagnosticSink,
) -> Heritage {
	let mut base_name = None;
	let mut interface_names = Vec::new();

	for (i, entry) in entries.iter().enumerate() {
		let result = resolver::resolve(registry, using_ctx, current_ns, &entry.name);
		if !result.found {
			diags.error(
				ErrorKind::UndefinedType,
				entry.loc,
				entry.name.len() as u32,
				format!("undefined type '{}' in heritage clause", entry.name),
			);
			continue;
		}
		if i == 0 && result.kind == Kind::Class {
			base_name = Some(result.qname);
		} else if result.kind == Kind::Interface {
			interface_names.push(result.qname);
		} else {
			diags.error(
				ErrorKind::UnknownInterface,
				entry.loc,
				entry.name.len() as u32,
				format!("'{}' is not an interface", entry.name),
			);
		}
	}

	Heritage { base_name, interface_names }
}

/// Registers the class and interface skeletons for one compilation unit:
/// names, namespaces, and empty member slots. Member lists and base/
/// interface links are filled in by a later call to
/// [`link_class_bodies`] once every class in the unit has a skeleton, so
/// that classes may reference each other regardless of declaration order.
pub fn declare_skeletons<'l, 'u>(
	bump: &'l Bump,
	registry: &mut NamespaceRegistry,
	unit: &'u CompilationUnit,
) -> Vec<(&'l ClassDef<'l>, &'u ClassDecl)> {
	let mut out = Vec::new();
	for decl in &unit.decls {
		match decl {
			Decl::Class(class_decl) => {
				registry.register_class(&unit.namespace, &class_decl.name);
				let qname = if unit.namespace.is_empty() {
					class_decl.name.clone()
				} else {
					format!("{}.{}", unit.namespace, class_decl.name)
				};
				let name: &'l str = bump.alloc_str(&qname);
				let def = bump.alloc(ClassDef {
					name,
					namespace: bump.alloc_str(&unit.namespace),
					base: Cell::new(None),
					interfaces: Cell::new(&[]),
					fields: Cell::new(&[]),
					methods: Cell::new(&[]),
					properties: Cell::new(&[]),
					is_abstract: class_decl.is_abstract,
					has_constructor: Cell::new(false),
					has_destructor: Cell::new(false),
					class_id: Cell::new(u32::MAX),
					instance_size: Cell::new(0),
				});
				out.push((&*def, class_decl));
			}
			Decl::Interface(iface_decl) => {
				registry.register_interface(&unit.namespace, &iface_decl.name);
			}
			_ => {}
		}
	}
	out
}

pub fn declare_interface_skeletons<'l, 'u>(
	bump: &'l Bump,
	unit: &'u CompilationUnit,
) -> Vec<(&'l InterfaceDef<'l>, &'u InterfaceDecl)> {
	let mut out = Vec::new();
	for decl in &unit.decls {
		if let Decl::Interface(iface_decl) = decl {
			let qname = if unit.namespace.is_empty() {
				iface_decl.name.clone()
			} else {
				format!("{}.{}", unit.namespace, iface_decl.name)
			};
			let name: &'l str = bump.alloc_str(&qname);
			let def = bump.alloc(InterfaceDef { name, namespace: bump.alloc_str(&unit.namespace), methods: Cell::new(&[]), id: Cell::new(u32::MAX) });
			out.push((&*def, iface_decl));
		}
	}
	out
}

pub fn resolve_type_ref<'l>(
	bump: &'l Bump,
	registry: &NamespaceRegistry,
	using_ctx: &UsingContext,
	current_ns: &str,
	classes_by_qname: &fxhash::FxHashMap<String, &'l ClassDef<'l>>,
	ifaces_by_qname: &fxhash::FxHashMap<String, &'l InterfaceDef<'l>>,
	ty: &crate::ast::TypeRef,
	diags: &mut DiagnosticSink,
	loc: crate::diagnostics::SourceLoc,
) -> Type<'l> {
	use crate::ast::TypeRef;
	match ty {
		TypeRef::Array(inner) => {
			let inner_ty = resolve_type_ref(bump, registry, using_ctx, current_ns, classes_by_qname, ifaces_by_qname, inner, diags, loc);
			Type::Array(bump.alloc(inner_ty))
		}
		TypeRef::Optional(inner) => {
			let inner_ty = resolve_type_ref(bump, registry, using_ctx, current_ns, classes_by_qname, ifaces_by_qname, inner, diags, loc);
			if let Type::Optional(_) = inner_ty {
				diags.error(ErrorKind::DoubleOptionalRejected, loc, 1, "nested optional types are not allowed");
				return inner_ty;
			}
			Type::Optional(bump.alloc(inner_ty))
		}
		TypeRef::Named(name) => {
			if let Some(primitive) = primitive_from_name(name) {
				return Type::Primitive(primitive);
			}
			let result = resolver::resolve(registry, using_ctx, current_ns, name);
			if !result.found {
				if result.contenders.is_empty() {
					diags.error(ErrorKind::UndefinedType, loc, name.len() as u32, format!("undefined type '{name}'"));
				} else {
					diags.error(ErrorKind::AmbiguousType, loc, name.len() as u32, format!("ambiguous type '{name}': {}", result.contenders.join(", ")));
				}
				return Type::Primitive(Primitive::Object);
			}
			match result.kind {
				Kind::Class => classes_by_qname.get(&result.qname).map(|c| Type::Class(*c)).unwrap_or(Type::Primitive(Primitive::Object)),
				Kind::Interface => ifaces_by_qname.get(&result.qname).map(|i| Type::Interface(*i)).unwrap_or(Type::Primitive(Primitive::Object)),
				Kind::Unknown => Type::Primitive(Primitive::Object),
			}
		}
	}
}

fn primitive_from_name(name: &str) -> Option<Primitive> {
	Some(match name {
		"Void" | "void" => Primitive::Void,
		"Boolean" | "Bool" | "bool" => Primitive::Bool,
		"Char" | "char" => Primitive::Char,
		"Int8" | "SByte" => Primitive::Int8,
		"Int16" | "Short" => Primitive::Int16,
		"Int32" | "Integer" | "int" => Primitive::Int32,
		"Int64" | "Long" => Primitive::Int64,
		"UInt8" | "Byte" => Primitive::UInt8,
		"UInt16" | "UShort" => Primitive::UInt16,
		"UInt32" | "UInteger" => Primitive::UInt32,
		"UInt64" | "ULong" => Primitive::UInt64,
		"Float32" | "Single" | "float" => Primitive::Float32,
		"Float64" | "Double" | "double" => Primitive::Float64,
		"String" => Primitive::Str,
		"Object" => Primitive::Object,
		_ => return None,
	})
}

/// Pass-1b: fill in each class's base/interfaces/fields/methods slices once
/// every class and interface in the unit has a skeleton to reference.
/// Performs the override/signature checks grounded on the original's
/// `checkOverridesWithBase`.
#[allow(clippy::too_many_arguments)]
pub fn link_class_bodies<'l>(
	bump: &'l Bump,
	registry: &NamespaceRegistry,
	using_ctx: &UsingContext,
	namespace: &str,
	class_def: &'l ClassDef<'l>,
	class_decl: &ClassDecl,
	classes_by_qname: &fxhash::FxHashMap<String, &'l ClassDef<'l>>,
	ifaces_by_qname: &fxhash::FxHashMap<String, &'l InterfaceDef<'l>>,
	diags: &mut DiagnosticSink,
) {
	let heritage = classify_heritage(registry, using_ctx, namespace, &class_decl.heritage, diags);
	if let Some(base_name) = &heritage.base_name {
		if let Some(base) = classes_by_qname.get(base_name) {
			class_def.base.set(Some(*base));
		}
	}

	let interfaces: Vec<&'l InterfaceDef<'l>> =
		heritage.interface_names.iter().filter_map(|n| ifaces_by_qname.get(n).copied()).collect();
	class_def.interfaces.set(bump.alloc_slice_copy(&interfaces));

	let fields: Vec<Field<'l>> = class_decl
		.fields
		.iter()
		.map(|f| {
			let ty = resolve_type_ref(bump, registry, using_ctx, namespace, classes_by_qname, ifaces_by_qname, &f.ty, diags, f.loc);
			if f.is_weak && !ty.is_reference_type() {
				diags.error(ErrorKind::WeakOnNonReference, f.loc, f.name.len() as u32, format!("'weak' is only valid on a reference-typed field, but '{}' has type '{ty}'", f.name));
			}
			Field {
				name: bump.alloc_str(&f.name),
				ty,
				visibility: if f.is_public { Visibility::Public } else { Visibility::Private },
				is_weak: f.is_weak,
				offset: Cell::new(0),
			}
		})
		.collect();
	class_def.fields.set(bump.alloc_slice_fill_iter(fields));

	let mut seen_signatures: Vec<(String, usize)> = Vec::new();
	let methods: Vec<Method<'l>> = class_decl
		.methods
		.iter()
		.map(|m| build_method(bump, registry, using_ctx, namespace, classes_by_qname, ifaces_by_qname, m, diags))
		.filter(|m| {
			let key = (m.name.to_ascii_lowercase(), m.params.get().len());
			if seen_signatures.contains(&key) {
				diags.error(ErrorKind::DuplicateOverload, Default::default(), m.name.len() as u32, format!("duplicate overload of '{}'", m.name));
				false
			} else {
				seen_signatures.push(key);
				true
			}
		})
		.collect();
	class_def.has_constructor.set(class_decl.methods.iter().any(|m| m.is_constructor));
	class_def.has_destructor.set(class_decl.methods.iter().any(|m| m.is_destructor));
	class_def.methods.set(bump.alloc_slice_fill_iter(methods));

	let properties: Vec<Property<'l>> = class_decl
		.properties
		.iter()
		.filter_map(|p| build_property(bump, registry, using_ctx, namespace, classes_by_qname, ifaces_by_qname, class_def, p, diags))
		.collect();
	class_def.properties.set(bump.alloc_slice_fill_iter(properties));

	check_overrides(class_def, diags);
	check_interface_implementations(class_def, diags);
}

/// Resolves a property declaration's read/write accessors against the
/// class's own fields and methods (spec §3: read accessor is a field or a
/// zero-arg method; write accessor, if present, is a one-arg method or a
/// field).
#[allow(clippy::too_many_arguments)]
fn build_property<'l>(
	bump: &'l Bump,
	registry: &NamespaceRegistry,
	using_ctx: &UsingContext,
	namespace: &str,
	classes_by_qname: &fxhash::FxHashMap<String, &'l ClassDef<'l>>,
	ifaces_by_qname: &fxhash::FxHashMap<String, &'l InterfaceDef<'l>>,
	class_def: &'l ClassDef<'l>,
	decl: &crate::ast::PropertyDecl,
	diags: &mut DiagnosticSink,
) -> Option<Property<'l>> {
	let ty = resolve_type_ref(bump, registry, using_ctx, namespace, classes_by_qname, ifaces_by_qname, &decl.ty, diags, decl.loc);

	let getter_kind = if class_def.fields.get().iter().any(|f| f.name.eq_ignore_ascii_case(&decl.getter)) {
		AccessorKind::Field
	} else if class_def.methods.get().iter().any(|m| m.name.eq_ignore_ascii_case(&decl.getter) && m.params.get().is_empty()) {
		AccessorKind::Method
	} else {
		diags.error(ErrorKind::UndefinedIdentifier, decl.loc, decl.getter.len() as u32, format!("property '{}' read accessor '{}' is not a field or zero-arg method", decl.name, decl.getter));
		return None;
	};

	let (setter_name, setter_kind) = match &decl.setter {
		None => (None, None),
		Some(setter) => {
			if class_def.fields.get().iter().any(|f| f.name.eq_ignore_ascii_case(setter)) {
				(Some(bump.alloc_str(setter) as &str), Some(AccessorKind::Field))
			} else if class_def.methods.get().iter().any(|m| m.name.eq_ignore_ascii_case(setter) && m.params.get().len() == 1) {
				(Some(bump.alloc_str(setter) as &str), Some(AccessorKind::Method))
			} else {
				diags.error(ErrorKind::UndefinedIdentifier, decl.loc, setter.len() as u32, format!("property '{}' write accessor '{}' is not a field or one-arg method", decl.name, setter));
				(None, None)
			}
		}
	};

	Some(Property {
		name: bump.alloc_str(&decl.name),
		ty,
		getter_name: bump.alloc_str(&decl.getter),
		getter_kind,
		setter_name,
		setter_kind,
		visibility: if decl.is_public { Visibility::Public } else { Visibility::Private },
	})
}

fn build_method<'l>(
	bump: &'l Bump,
	registry: &NamespaceRegistry,
	using_ctx: &UsingContext,
	namespace: &str,
	classes_by_qname: &fxhash::FxHashMap<String, &'l ClassDef<'l>>,
	ifaces_by_qname: &fxhash::FxHashMap<String, &'l InterfaceDef<'l>>,
	decl: &MethodDecl,
	diags: &mut DiagnosticSink,
) -> Method<'l> {
	let params = build_params(bump, registry, using_ctx, namespace, classes_by_qname, ifaces_by_qname, &decl.sig, diags);
	let return_ty = decl
		.sig
		.return_ty
		.as_ref()
		.map(|t| resolve_type_ref(bump, registry, using_ctx, namespace, classes_by_qname, ifaces_by_qname, t, diags, decl.sig.loc))
		.unwrap_or(Type::Primitive(Primitive::Void));
	Method {
		name: bump.alloc_str(&decl.sig.name),
		params: Cell::new(params),
		return_ty,
		visibility: if decl.is_public { Visibility::Public } else { Visibility::Private },
		is_virtual: decl.is_virtual,
		is_abstract: decl.is_abstract,
		is_override: decl.is_override,
		is_static: decl.is_static,
		is_constructor: decl.is_constructor,
		is_destructor: decl.is_destructor,
		vtable_slot: Cell::new(None),
	}
}

/// Public variant of [`build_params`] for interface method signatures, which
/// have no enclosing `MethodDecl` to borrow flags from.
#[allow(clippy::too_many_arguments)]
pub fn resolve_type_ref_params<'l>(
	bump: &'l Bump,
	registry: &NamespaceRegistry,
	using_ctx: &UsingContext,
	namespace: &str,
	classes_by_qname: &fxhash::FxHashMap<String, &'l ClassDef<'l>>,
	ifaces_by_qname: &fxhash::FxHashMap<String, &'l InterfaceDef<'l>>,
	sig: &MethodSignature,
	diags: &mut DiagnosticSink,
) -> &'l [Param<'l>] {
	build_params(bump, registry, using_ctx, namespace, classes_by_qname, ifaces_by_qname, sig, diags)
}

fn build_params<'l>(
	bump: &'l Bump,
	registry: &NamespaceRegistry,
	using_ctx: &UsingContext,
	namespace: &str,
	classes_by_qname: &fxhash::FxHashMap<String, &'l ClassDef<'l>>,
	ifaces_by_qname: &fxhash::FxHashMap<String, &'l InterfaceDef<'l>>,
	sig: &MethodSignature,
	diags: &mut DiagnosticSink,
) -> &'l [Param<'l>] {
	let params: Vec<Param<'l>> = sig
		.params
		.iter()
		.map(|p: &ParamDecl| Param {
			name: bump.alloc_str(&p.name),
			ty: resolve_type_ref(bump, registry, using_ctx, namespace, classes_by_qname, ifaces_by_qname, &p.ty, diags, sig.loc),
			is_var: p.is_var,
			is_out: p.is_out,
		})
		.collect();
	bump.alloc_slice_fill_iter(params)
}

/// Grounded on `checkOverridesWithBase`: an `override` method must name a
/// virtual/abstract method in the base chain with a matching signature; a
/// new (non-override) virtual method never conflicts with one already
/// present since it gets its own slot.
fn check_overrides<'l>(class: &'l ClassDef<'l>, diags: &mut DiagnosticSink) {
	for method in class.methods.get() {
		if !method.is_override {
			continue;
		}
		let Some(base) = class.base.get() else {
			diags.error(ErrorKind::OverrideWithoutVirtualBase, Default::default(), method.name.len() as u32, format!("'{}' marked override but class has no base", method.name));
			continue;
		};
		match base.find_virtual(method.name) {
			Some(base_method) if method.signature_matches(base_method) => {}
			Some(_) => {
				diags.error(ErrorKind::SignatureMismatch, Default::default(), method.name.len() as u32, format!("'{}' does not match base signature", method.name));
			}
			None => {
				diags.error(ErrorKind::OverrideWithoutVirtualBase, Default::default(), method.name.len() as u32, format!("no virtual method '{}' found in base chain", method.name));
			}
		}
	}
}

/// Grounded on `checkInterfaceImplementationWith`/`collectInterfaceMethods`:
/// every method an implemented interface declares must have a matching
/// public method reachable through the class's own members or its base
/// chain.
fn check_interface_implementations<'l>(class: &'l ClassDef<'l>, diags: &mut DiagnosticSink) {
	for iface in class.interfaces.get() {
		for iface_method in iface.methods.get() {
			let implemented = class
				.methods
				.get()
				.iter()
				.chain(class.base.get().into_iter().flat_map(|b| b.methods.get().iter()))
				.any(|m| m.name.eq_ignore_ascii_case(iface_method.name) && m.signature_matches(iface_method));
			if !implemented {
				diags.error(
					ErrorKind::InterfaceNotImplemented,
					Default::default(),
					iface_method.name.len() as u32,
					format!("'{}' does not implement '{}.{}'", class.qualified_name(), iface.qualified_name(), iface_method.name),
				);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostics::{CollectingEmitter, SourceLoc};

	#[test]
	fn first_heritage_entry_resolving_to_class_becomes_base() {
		let bump = Bump::new();
		let mut registry = NamespaceRegistry::new();
		registry.register_class("", "Animal");
		registry.register_interface("", "Comparable");
		let using = UsingContext::new();
		let mut emitter = CollectingEmitter::default();
		let mut sink = DiagnosticSink::new(&mut emitter);
		let entries = vec![
			HeritageEntry { name: "Animal".into(), loc: SourceLoc::default() },
			HeritageEntry { name: "Comparable".into(), loc: SourceLoc::default() },
		];
		let heritage = classify_heritage(&registry, &using, "", &entries, &mut sink);
		assert_eq!(heritage.base_name.as_deref(), Some("Animal"));
		assert_eq!(heritage.interface_names, vec!["Comparable".to_string()]);
		let _ = bump;
	}

	#[test]
	fn heritage_entry_that_is_neither_class_nor_interface_is_reported() {
		let bump = Bump::new();
		let registry = NamespaceRegistry::new();
		let using = UsingContext::new();
		let mut emitter = CollectingEmitter::default();
        let mut sink = DiagnosticSink::new(&mut emitter);
		let entries = vec![HeritageEntry { name: "Nope".into(), loc: SourceLoc::default() }];
		let heritage = classify_heritage(&registry, &using, "", &entries, &mut sink);
		assert!(heritage.base_name.is_none());
		assert!(heritage.interface_names.is_empty());
		assert_eq!(sink.error_count(), 1);
		let _ = bump;
	}
}
