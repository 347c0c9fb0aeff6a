//! Class and interface records (spec §4.6, §4.7), grounded on the teacher's
//! `structured::types::{Class, Interface}`: arena-allocated nodes whose
//! member lists are populated after construction via `Cell<&[T]>`, so a
//! class and its own methods can cross-reference each other without a
//! second allocation pass.

use crate::sem::types::Type;
use crate::utilities::fmt_debug_cell;
use derivative::Derivative;
use std::cell::Cell;
use std::fmt::Formatter;
use std::hash::{Hash, Hasher};

/// Gives a `'l`-allocated node identity-based `Eq`/`Hash`: two references are
/// equal only if they point at the same arena slot, matching how the
/// analyzer and lowerer key maps by declared class/method/field identity
/// rather than by name (names may be ambiguous across namespaces).
macro_rules! impl_identity {
	($ty:ident) => {
		impl<'l> PartialEq for $ty<'l> {
			fn eq(&self, other: &Self) -> bool {
				std::ptr::eq(self, other)
			}
		}
		impl<'l> Eq for $ty<'l> {}
		impl<'l> Hash for $ty<'l> {
			fn hash<H: Hasher>(&self, state: &mut H) {
				(self as *const Self).hash(state)
			}
		}
	};
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Visibility {
	Public,
	Private,
	Protected,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Field<'l> {
	pub name: &'l str,
	pub ty: Type<'l>,
	pub visibility: Visibility,
	/// `weak` modifier: legal only on reference-typed fields
	/// (`ErrorKind::WeakOnNonReference` otherwise). The runtime has no weak-
	/// reference primitive in this port (see DESIGN.md); the flag is
	/// recorded and validated but no weak-release path is lowered.
	pub is_weak: bool,
	/// Byte offset within the owning class's instance layout; filled in by
	/// [`crate::layout`] after all classes are registered.
	pub offset: Cell<u32>,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Param<'l> {
	pub name: &'l str,
	pub ty: Type<'l>,
	pub is_var: bool,
	pub is_out: bool,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Method<'l> {
	pub name: &'l str,
	#[derivative(Debug(format_with = "fmt_debug_cell"))]
	pub params: Cell<&'l [Param<'l>]>,
	pub return_ty: Type<'l>,
	pub visibility: Visibility,
	pub is_virtual: bool,
	pub is_abstract: bool,
	pub is_override: bool,
	pub is_static: bool,
	/// Constructors are invoked through `ClassName.Create(args)`/`new
	/// ClassName(args)` rather than ordinary dispatch; destructors are
	/// implicitly virtual (spec §4.7).
	pub is_constructor: bool,
	pub is_destructor: bool,
	/// Assigned vtable slot, or `None` for non-virtual methods and for
	/// interface methods (whose slot lives in the itable instead).
	pub vtable_slot: Cell<Option<u32>>,
}

impl<'l> Method<'l> {
	pub fn signature_matches(&self, other: &Method<'l>) -> bool {
		let a = self.params.get();
		let b = other.params.get();
		if a.len() != b.len() {
			return false;
		}
		if !self.return_ty.is_assignable_from(&other.return_ty) && !other.return_ty.is_assignable_from(&self.return_ty)
		{
			return false;
		}
		a.iter().zip(b.iter()).all(|(pa, pb)| {
			pa.is_var == pb.is_var
				&& pa.is_out == pb.is_out
				&& (pa.ty.is_assignable_from(&pb.ty) || pb.ty.is_assignable_from(&pa.ty))
		})
	}
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct ClassDef<'l> {
	pub name: &'l str,
	pub namespace: &'l str,
	pub base: Cell<Option<&'l ClassDef<'l>>>,
	#[derivative(Debug(format_with = "fmt_debug_cell"))]
	pub interfaces: Cell<&'l [&'l InterfaceDef<'l>]>,
	#[derivative(Debug(format_with = "fmt_debug_cell"))]
	pub fields: Cell<&'l [Field<'l>]>,
	#[derivative(Debug(format_with = "fmt_debug_cell"))]
	pub methods: Cell<&'l [Method<'l>]>,
	#[derivative(Debug(format_with = "fmt_debug_cell"))]
	pub properties: Cell<&'l [Property<'l>]>,
	pub is_abstract: bool,
	/// Whether any declared method is marked as this class's constructor
	/// (spec §3 `hasConstructor`).
	pub has_constructor: Cell<bool>,
	/// Spec §3 `hasDestructor`.
	pub has_destructor: Cell<bool>,
	/// Monotonically assigned during [`crate::layout`]'s topological class
	/// ordering; `u32::MAX` until then.
	pub class_id: Cell<u32>,
	/// Total instance size in bytes including the leading vtable pointer;
	/// `0` until layout has run.
	pub instance_size: Cell<u32>,
}

/// One entry of a class's properties map (spec §3): a read accessor (a
/// field or a zero-arg method) and an optional write accessor (a field or a
/// one-arg method).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AccessorKind {
	Field,
	Method,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Property<'l> {
	pub name: &'l str,
	pub ty: Type<'l>,
	pub getter_name: &'l str,
	pub getter_kind: AccessorKind,
	pub setter_name: Option<&'l str>,
	pub setter_kind: Option<AccessorKind>,
	pub visibility: Visibility,
}

impl<'l> ClassDef<'l> {
	pub fn qualified_name_into(namespace: &str, name: &str) -> String {
		if namespace.is_empty() {
			name.to_string()
		} else {
			format!("{namespace}.{name}")
		}
	}

	pub fn is_subclass_of(&self, base: &ClassDef<'l>) -> bool {
		let mut current = self.base.get();
		while let Some(c) = current {
			if std::ptr::eq(c, base) {
				return true;
			}
			current = c.base.get();
		}
		false
	}

	pub fn implements(&self, iface: &InterfaceDef<'l>) -> bool {
		if self.interfaces.get().iter().any(|i| std::ptr::eq(*i, iface)) {
			return true;
		}
		match self.base.get() {
			Some(base) => base.implements(iface),
			None => false,
		}
	}

	/// Searches this class then its base chain for a virtual/abstract method
	/// named `name`, matching the original's `findVirtualInBase`.
	pub fn find_virtual(&self, name: &str) -> Option<&Method<'l>> {
		if let Some(m) = self.methods.get().iter().find(|m| m.name.eq_ignore_ascii_case(name) && (m.is_virtual || m.is_abstract)) {
			return Some(m);
		}
		self.base.get().and_then(|base| base.find_virtual(name))
	}

	pub fn find_field(&self, name: &str) -> Option<&Field<'l>> {
		if let Some(f) = self.fields.get().iter().find(|f| f.name.eq_ignore_ascii_case(name)) {
			return Some(f);
		}
		self.base.get().and_then(|base| base.find_field(name))
	}
}

impl<'l> ClassDef<'l> {
	pub fn qualified_name(&self) -> &str {
		// Leaked once per class at construction time by the owning
		// registry, so this can return a `&str` borrowed from `self`.
		self.name
	}
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct InterfaceDef<'l> {
	pub name: &'l str,
	pub namespace: &'l str,
	#[derivative(Debug(format_with = "fmt_debug_cell"))]
	pub methods: Cell<&'l [Method<'l>]>,
	/// Assigned by [`crate::sem::analyzer::SemanticAnalyzer`] once every
	/// interface in the compilation is known; identifies this interface to
	/// `rt_get_interface_impl`/`rt_cast_as_iface`. `u32::MAX` until then.
	pub id: Cell<u32>,
}

impl<'l> InterfaceDef<'l> {
	pub fn qualified_name(&self) -> &str {
		self.name
	}
}

impl_identity!(ClassDef);
impl_identity!(InterfaceDef);
impl_identity!(Method);

#[cfg(test)]
mod tests {
	use super::*;
	use bumpalo::Bump;

	fn leaf_class<'l>(bump: &'l Bump, name: &'l str) -> &'l ClassDef<'l> {
		bump.alloc(ClassDef {
			name,
			namespace: "",
			base: Cell::new(None),
			interfaces: Cell::new(&[]),
			fields: Cell::new(&[]),
			methods: Cell::new(&[]),
			properties: Cell::new(&[]),
			is_abstract: false,
			has_constructor: Cell::new(false),
			has_destructor: Cell::new(false),
			class_id: Cell::new(u32::MAX),
			instance_size: Cell::new(0),
		})
	}

	#[test]
	fn identity_equality_distinguishes_same_named_classes() {
		let bump = Bump::new();
		let a = leaf_class(&bump, "Widget");
		let b = leaf_class(&bump, "Widget");
		assert_ne!(a, b);
		assert_eq!(a, a);
	}

	#[test]
	fn subclass_walk_follows_base_chain() {
		let bump = Bump::new();
		let base = leaf_class(&bump, "Base");
		let derived = leaf_class(&bump, "Derived");
		derived.base.set(Some(base));
		assert!(derived.is_subclass_of(base));
		assert!(!base.is_subclass_of(derived));
	}
}
