//! Object-model layout (spec §4.7), grounded on the original's
//! `Lowerer_OOP.cpp`: topological class ordering, instance field layout
//! with a leading vtable pointer, and vtable-slot assignment where an
//! `override` updates the implementing class on an existing slot without
//! ever changing its index.

use crate::sem::class::{ClassDef, Method};
use nohash_hasher::BuildNoHashHasher;
use std::cell::Cell;
use std::collections::HashMap;

const PTR_SIZE: u32 = 8;

#[derive(Debug, Clone)]
pub struct VtableSlot<'l> {
	pub slot: u32,
	pub name: String,
	/// The most-derived class whose method body currently occupies this
	/// slot; updated in place when a subclass overrides it.
	pub impl_class: &'l ClassDef<'l>,
}

#[derive(Debug, Default)]
pub struct VtableLayout<'l> {
	pub slots: Vec<VtableSlot<'l>>,
}

/// Computes and caches instance/vtable layout for every class reachable
/// from a registered set, in the original's scan-then-layout order.
pub struct ClassLayoutComputer<'l> {
	order: Vec<&'l ClassDef<'l>>,
	/// Keyed by class identity pointer; no-op hashing of the raw address
	/// (teacher's `schema::type::TypeContext` idiom for pointer-keyed caches).
	vtables: HashMap<*const ClassDef<'l>, VtableLayout<'l>, BuildNoHashHasher<usize>>,
}

impl<'l> ClassLayoutComputer<'l> {
	pub fn new() -> Self {
		ClassLayoutComputer { order: Vec::new(), vtables: HashMap::default() }
	}

	/// Depth-first topological scan: a class's base is ordered before it.
	/// Grounded on `scanClasses`'s visited-set DFS.
	pub fn scan_classes(&mut self, classes: impl IntoIterator<Item = &'l ClassDef<'l>>) {
		let mut visited: HashMap<*const ClassDef<'l>, bool, BuildNoHashHasher<usize>> = HashMap::default();
		for class in classes {
			self.scan_one(class, &mut visited);
		}
	}

	fn scan_one(&mut self, class: &'l ClassDef<'l>, visited: &mut HashMap<*const ClassDef<'l>, bool, BuildNoHashHasher<usize>>) {
		let key = class as *const ClassDef<'l>;
		if visited.contains_key(&key) {
			return;
		}
		visited.insert(key, true);
		if let Some(base) = class.base.get() {
			self.scan_one(base, visited);
		}
		self.order.push(class);
	}

	pub fn registration_order(&self) -> &[&'l ClassDef<'l>] {
		&self.order
	}

	/// Lays out instance fields and assigns `class_id`/`instance_size` in
	/// registration order, then computes every class's vtable. Must run
	/// after [`Self::scan_classes`].
	pub fn compute_all(&mut self) {
		for (i, class) in self.order.clone().into_iter().enumerate() {
			self.compute_instance_layout(class, i as u32);
		}
		for class in self.order.clone() {
			self.compute_vtable_layout(class);
		}
	}

	/// Base fields are inherited verbatim at their existing offsets; own
	/// fields are appended 8-byte aligned after them. Size is rounded up to
	/// 8 bytes and is never smaller than the leading vtable pointer.
	fn compute_instance_layout(&self, class: &'l ClassDef<'l>, class_id: u32) {
		class.class_id.set(class_id);
		let mut offset = match class.base.get() {
			Some(base) => base.instance_size.get(),
			None => PTR_SIZE,
		};
		for field in class.fields.get() {
			offset = align_up(offset, 8);
			field.offset.set(offset);
			offset += field_size(field);
		}
		class.instance_size.set(align_up(offset, 8).max(PTR_SIZE));
	}

	/// Base vtable slots are copied in; an `override` method updates the
	/// `impl_class` of the slot whose name it matches without touching the
	/// slot index, and a new (non-override) virtual method is appended.
	/// Grounded on `computeVtableLayout`.
	fn compute_vtable_layout(&mut self, class: &'l ClassDef<'l>) {
		let mut layout = match class.base.get() {
			Some(base) => self.vtables.get(&(base as *const ClassDef<'l>)).cloned_for(base),
			None => VtableLayout::default(),
		};

		for method in class.methods.get() {
			if !method.is_virtual && !method.is_override {
				continue;
			}
			if method.is_override {
				if let Some(slot) = layout.slots.iter_mut().find(|s| s.name.eq_ignore_ascii_case(method.name)) {
					slot.impl_class = class;
					method.vtable_slot.set(Some(slot.slot));
					continue;
				}
			}
			let slot_index = layout.slots.len() as u32;
			layout.slots.push(VtableSlot { slot: slot_index, name: method.name.to_string(), impl_class: class });
			method.vtable_slot.set(Some(slot_index));
		}

		self.vtables.insert(class as *const ClassDef<'l>, layout);
	}

	pub fn vtable_of(&self, class: &'l ClassDef<'l>) -> Option<&VtableLayout<'l>> {
		self.vtables.get(&(class as *const ClassDef<'l>))
	}

	pub fn virtual_slot(&self, class: &'l ClassDef<'l>, method_name: &str) -> Option<u32> {
		self.vtable_of(class)?.slots.iter().find(|s| s.name.eq_ignore_ascii_case(method_name)).map(|s| s.slot)
	}
}

impl<'l> Default for ClassLayoutComputer<'l> {
	fn default() -> Self {
		Self::new()
	}
}

/// Local helper trait so a base class's cached `VtableLayout` can be cloned
/// into a derived class's working copy without borrowing the map mutably
/// while we're about to insert into it.
trait CloneForDerived<'l> {
	fn cloned_for(self, base: &'l ClassDef<'l>) -> VtableLayout<'l>;
}

impl<'l> CloneForDerived<'l> for Option<&VtableLayout<'l>> {
	fn cloned_for(self, _base: &'l ClassDef<'l>) -> VtableLayout<'l> {
		match self {
			Some(layout) => VtableLayout { slots: layout.slots.clone() },
			None => VtableLayout::default(),
		}
	}
}

fn align_up(offset: u32, align: u32) -> u32 {
	(offset + align - 1) / align * align
}

fn field_size(field: &crate::sem::class::Field) -> u32 {
	use crate::sem::types::{Primitive, Type};
	match &field.ty {
		Type::Primitive(Primitive::Bool) | Type::Primitive(Primitive::Int8) | Type::Primitive(Primitive::UInt8) => 1,
		Type::Primitive(Primitive::Int16) | Type::Primitive(Primitive::UInt16) | Type::Primitive(Primitive::Char) => 2,
		Type::Primitive(Primitive::Int32) | Type::Primitive(Primitive::UInt32) | Type::Primitive(Primitive::Float32) => 4,
		Type::Primitive(Primitive::Int64) | Type::Primitive(Primitive::UInt64) | Type::Primitive(Primitive::Float64) => 8,
		Type::Primitive(Primitive::Void) => 0,
		// Reference types (including boxed String/Object, class refs,
		// interface fat pointers, arrays, optionals of reference types):
		// a single 8-byte slot. Interface values use a 16-byte fat pointer
		// {obj, itable} when the field's static type is an interface.
		Type::Interface(_) => 16,
		_ => PTR_SIZE,
	}
}

impl<'l> Method<'l> {
	pub fn assigned_slot(&self) -> Option<u32> {
		self.vtable_slot.get()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sem::class::{Field, Visibility};
	use crate::sem::types::{Primitive, Type};
	use bumpalo::Bump;

	fn make_class<'l>(bump: &'l Bump, name: &'static str) -> &'l ClassDef<'l> {
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
	fn base_fields_are_inherited_before_own_fields() {
		let bump = Bump::new();
		let base = make_class(&bump, "Base");
		let fields = bump.alloc_slice_fill_iter([Field { name: "x", ty: Type::Primitive(Primitive::Int32), visibility: Visibility::Public, is_weak: false, offset: Cell::new(0) }]);
		base.fields.set(fields);

		let derived = make_class(&bump, "Derived");
		derived.base.set(Some(base));
		let derived_fields = bump.alloc_slice_fill_iter([Field { name: "y", ty: Type::Primitive(Primitive::Int64), visibility: Visibility::Public, is_weak: false, offset: Cell::new(0) }]);
		derived.fields.set(derived_fields);

		let mut computer = ClassLayoutComputer::new();
		computer.scan_classes([derived]);
		computer.compute_all();

		assert_eq!(base.fields.get()[0].offset.get(), 8);
		assert_eq!(derived.fields.get()[0].offset.get(), 16);
		assert!(derived.instance_size.get() >= 24);
	}

	#[test]
	fn override_reuses_base_slot_index() {
		let bump = Bump::new();
		let base = make_class(&bump, "Shape");
		let base_methods = bump.alloc_slice_fill_iter([Method {
			name: "area",
			params: Cell::new(&[]),
			return_ty: Type::Primitive(Primitive::Float64),
			visibility: Visibility::Public,
			is_virtual: true,
			is_abstract: false,
			is_override: false,
			is_static: false,
			is_constructor: false,
			is_destructor: false,
			vtable_slot: Cell::new(None),
		}]);
		base.methods.set(base_methods);

		let derived = make_class(&bump, "Circle");
		derived.base.set(Some(base));
		let derived_methods = bump.alloc_slice_fill_iter([Method {
			name: "area",
			params: Cell::new(&[]),
			return_ty: Type::Primitive(Primitive::Float64),
			visibility: Visibility::Public,
			is_virtual: true,
			is_abstract: false,
			is_override: true,
			is_static: false,
			is_constructor: false,
			is_destructor: false,
			vtable_slot: Cell::new(None),
		}]);
		derived.methods.set(derived_methods);

		let mut computer = ClassLayoutComputer::new();
		computer.scan_classes([derived]);
		computer.compute_all();

		assert_eq!(computer.virtual_slot(base, "area"), Some(0));
		assert_eq!(computer.virtual_slot(derived, "area"), Some(0));
		assert!(std::ptr::eq(computer.vtable_of(derived).unwrap().slots[0].impl_class, derived));
	}
}
