//! Runtime class catalog (spec §4.2): the fixed set of built-in classes every
//! frontend's namespace registry is pre-seeded with.

pub mod catalog;

pub use catalog::{
	is_runtime_class, find_class, find_method, find_property, RuntimeClass, RuntimeKind, RuntimeMethod, RuntimeProcedure, RuntimeProperty,
	RUNTIME_CLASSES, RUNTIME_PROCEDURES,
};
