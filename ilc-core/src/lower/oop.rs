//! Object-model lowering specifics (spec §4.7/§4.8), grounded directly on
//! the original's `mangleMethod`/`mangleConstructor`/`mangleDestructor` and
//! `emitVtableRegistration`.

use crate::il::module::ClassRegistration;
use crate::layout::ClassLayoutComputer;
use crate::sem::class::ClassDef;

pub fn mangle_method(class_name: &str, method_name: &str) -> String {
	format!("{class_name}.{method_name}")
}

pub fn mangle_constructor(class_name: &str) -> String {
	format!("{class_name}.ctor")
}

pub fn mangle_destructor(class_name: &str) -> String {
	format!("{class_name}.dtor")
}

/// Builds the registration record a module-init function (the original's
/// `__pas_oop_init` equivalent) would walk to call `rt_register_class_with_base`
/// once per class, in topological order so a base is always registered
/// before anything deriving from it.
pub fn build_registration<'l>(class: &'l ClassDef<'l>, layout: &ClassLayoutComputer<'l>) -> ClassRegistration {
	ClassRegistration {
		class_id: class.class_id.get(),
		base_class_id: class.base.get().map(|b| b.class_id.get()),
		qualified_name: class.qualified_name().to_string(),
		instance_size: class.instance_size.get(),
		vtable_slot_count: layout.vtable_of(class).map(|v| v.slots.len() as u32).unwrap_or(0),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mangled_names_join_class_and_member() {
		assert_eq!(mangle_method("Shape", "area"), "Shape.area");
		assert_eq!(mangle_constructor("Shape"), "Shape.ctor");
		assert_eq!(mangle_destructor("Shape"), "Shape.dtor");
	}
}
