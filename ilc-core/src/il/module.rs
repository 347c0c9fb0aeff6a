//! An IL module: every function lowered from one compilation, plus the
//! class layout and registration data [`crate::layout::ClassLayoutComputer`]
//! produced, kept alongside so a backend can emit `__<frontend>_oop_init`
//! without recomputing layout.

use crate::il::function::Function;

#[derive(Debug, Clone)]
pub struct ClassRegistration {
	pub class_id: u32,
	pub base_class_id: Option<u32>,
	pub qualified_name: String,
	pub instance_size: u32,
	pub vtable_slot_count: u32,
}

#[derive(Debug, Default)]
pub struct Module {
	pub functions: Vec<Function>,
	pub class_registrations: Vec<ClassRegistration>,
}

impl Module {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push_function(&mut self, function: Function) {
		self.functions.push(function);
	}

	pub fn find_function(&self, name: &str) -> Option<&Function> {
		self.functions.iter().find(|f| f.name == name)
	}
}
