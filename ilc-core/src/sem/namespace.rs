//! Namespace registry (spec §4.3), grounded on the original's
//! `NamespaceRegistry`: tracks every declared namespace and the classes and
//! interfaces registered inside it, keyed case-insensitively but remembering
//! the first-seen spelling for display and codegen.

use crate::runtime::catalog::{RuntimeKind, RUNTIME_CLASSES, RUNTIME_PROCEDURES};
use crate::utilities::{join_qualified, lower_key, split_qualified};
use fxhash::{FxHashMap, FxHashSet};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TypeKind {
	None,
	Class,
	Interface,
}

#[derive(Debug, Default)]
struct NamespaceInfo {
	/// First-seen spelling of the namespace's full dotted name.
	full: String,
	classes: FxHashSet<String>,
	interfaces: FxHashSet<String>,
}

/// Registry of namespaces and the types declared in them. A single instance
/// is shared by every frontend compiling into the same module (§5 "Single-
/// threaded per compilation unit").
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
	namespaces: FxHashMap<String, NamespaceInfo>,
}

impl NamespaceRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a registry pre-seeded with every runtime builtin's namespace
	/// chain, mirroring the original's `seedFromRuntimeBuiltins` and
	/// `seedRuntimeClassNamespaces` siblings (spec §4.3): each dotted runtime
	/// class name registers every namespace prefix up to (but not including)
	/// the class's own final segment, and each builtin extern procedure
	/// registers its namespace prefix without itself becoming a class or
	/// interface entry.
	pub fn with_runtime_builtins() -> Self {
		let mut registry = Self::new();
		registry.seed_runtime_class_namespaces();
		registry.seed_runtime_procedure_namespaces();
		registry
	}

    pub fn seed_runtime_class_namespaces(&mut self) {
        for class in RUNTIME_CLASSES {
            let segments = split_qualified(class.qualified_name);
            if segments.len() < 2 {
                continue;
            }
            let ns_segments = &segments[..segments.len() - 1];
            let ns = join_qualified(ns_segments);
            match class.kind {
                RuntimeKind::Class => self.register_class(&ns, segments[segments.len() - 1]),
                RuntimeKind::Interface => self.register_interface(&ns, segments[segments.len() - 1]),
            }
        }
    }

    /// `seedFromRuntimeBuiltins(descs)`: for each builtin extern procedure's
    /// dotted name, register every namespace prefix so `USING Viper.Console`
    /// resolves — the procedure name itself is not a type and is never
    /// registered as a class or interface.
    pub fn seed_runtime_procedure_namespaces(&mut self) {
        for proc in RUNTIME_PROCEDURES {
            let segments = split_qualified(proc.qualified_name);
            if segments.len() < 2 {
                continue;
            }
            let ns_segments = &segments[..segments.len() - 1];
            self.register_namespace(&join_qualified(ns_segments));
        }
    }

	/// Idempotent: registering an already-known namespace is a no-op and
	/// keeps the spelling recorded on first registration.
	pub fn register_namespace(&mut self, full: &str) {
		let key = lower_key(full);
		self.namespaces.entry(key).or_insert_with(|| NamespaceInfo { full: full.to_string(), ..Default::default() });
	}

	/// Registers `name` as a class inside namespace `ns` (empty for the
	/// global namespace). Implicitly registers `ns` first if unseen.
	pub fn register_class(&mut self, ns: &str, name: &str) {
		self.register_namespace(ns);
		let key = lower_key(ns);
		if let Some(info) = self.namespaces.get_mut(&key) {
			info.classes.insert(lower_key(name));
		}
	}

	pub fn register_interface(&mut self, ns: &str, name: &str) {
		self.register_namespace(ns);
		let key = lower_key(ns);
		if let Some(info) = self.namespaces.get_mut(&key) {
			info.interfaces.insert(lower_key(name));
		}
	}

	pub fn namespace_exists(&self, full: &str) -> bool {
		self.namespaces.contains_key(&lower_key(full))
	}

	/// Whether `name` was registered as a class or interface inside `ns`.
	pub fn type_exists(&self, ns: &str, name: &str) -> bool {
		self.get_type_kind(ns, name) != TypeKind::None
	}

	pub fn get_type_kind(&self, ns: &str, name: &str) -> TypeKind {
		let Some(info) = self.namespaces.get(&lower_key(ns)) else {
			return TypeKind::None;
		};
		let key = lower_key(name);
		if info.classes.contains(&key) {
			TypeKind::Class
		} else if info.interfaces.contains(&key) {
			TypeKind::Interface
		} else {
			TypeKind::None
		}
	}

	/// The canonical (first-seen) spelling of a registered namespace, if any.
	pub fn canonical_name(&self, full: &str) -> Option<&str> {
		self.namespaces.get(&lower_key(full)).map(|info| info.full.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registration_is_idempotent_and_keeps_first_spelling() {
		let mut reg = NamespaceRegistry::new();
		reg.register_namespace("Viper.IO");
		reg.register_namespace("VIPER.io");
		assert_eq!(reg.canonical_name("viper.io"), Some("Viper.IO"));
	}

	#[test]
	fn class_lookup_is_case_insensitive() {
		let mut reg = NamespaceRegistry::new();
		reg.register_class("Viper.Collections", "List");
		assert_eq!(reg.get_type_kind("viper.COLLECTIONS", "list"), TypeKind::Class);
		assert_eq!(reg.get_type_kind("viper.collections", "Map"), TypeKind::None);
	}

	#[test]
	fn global_namespace_registers_with_empty_key() {
		let mut reg = NamespaceRegistry::new();
		reg.register_class("", "Program");
		assert!(reg.type_exists("", "Program"));
	}

	#[test]
	fn runtime_builtins_seed_their_namespace_chain() {
		let reg = NamespaceRegistry::with_runtime_builtins();
		assert!(reg.namespace_exists("Viper.Text"));
		assert_eq!(reg.get_type_kind("Viper.Text", "StringBuilder"), TypeKind::Class);
		assert_eq!(reg.get_type_kind("Viper", "String"), TypeKind::Class);
	}

	#[test]
	fn runtime_procedures_seed_their_namespace_but_not_a_type() {
		let reg = NamespaceRegistry::with_runtime_builtins();
		assert!(reg.namespace_exists("Viper.Console"));
		assert_eq!(reg.get_type_kind("Viper.Console", "PrintI64"), TypeKind::None);
	}
}
