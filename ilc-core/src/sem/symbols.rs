//! Symbol table, definite-assignment tracking and type-narrowing stack used
//! by the two-pass analyzer (spec §4.6). Scopes nest lexically; each carries
//! its own definite-assignment set so an inner block's reads don't leak
//! "assigned" status back out once it closes.

use crate::sem::types::Type;
use crate::utilities::lower_key;
use fxhash::FxHashMap;

#[derive(Debug, Clone)]
pub struct Symbol<'l> {
	pub name: String,
	pub ty: Type<'l>,
	pub is_const: bool,
	pub is_loop_var: bool,
}

struct Scope<'l> {
	symbols: FxHashMap<String, Symbol<'l>>,
	assigned: std::collections::HashSet<String>,
}

impl<'l> Scope<'l> {
	fn new() -> Self {
		Scope { symbols: FxHashMap::default(), assigned: Default::default() }
	}
}

/// A stack of lexical scopes plus the definite-assignment and narrowing
/// state threaded through the analyzer's statement pass.
pub struct SymbolTable<'l> {
	scopes: Vec<Scope<'l>>,
	/// Narrowed types from `if x is not nil` / pattern checks, keyed by
	/// symbol name; popped when the narrowing scope (the `then` branch)
	/// ends.
	narrowing: Vec<FxHashMap<String, Type<'l>>>,
	/// `with receiver do ...` target stack; innermost (last) entry wins on
	/// a bare identifier that isn't a local symbol.
	with_stack: Vec<Type<'l>>,
}

impl<'l> SymbolTable<'l> {
	pub fn new() -> Self {
		SymbolTable { scopes: vec![Scope::new()], narrowing: Vec::new(), with_stack: Vec::new() }
	}

	pub fn push_with(&mut self, ty: Type<'l>) {
		self.with_stack.push(ty);
	}

	pub fn pop_with(&mut self) {
		self.with_stack.pop();
	}

	/// Resolves a bare identifier against the innermost active `with`
	/// target's fields, for use once a plain local-symbol lookup has failed.
	pub fn resolve_with_field(&self, name: &str) -> Option<Type<'l>> {
		self.with_stack.iter().rev().find_map(|ty| match ty {
			Type::Class(class) => class.find_field(name).map(|f| f.ty),
			_ => None,
		})
	}

	pub fn push_scope(&mut self) {
		self.scopes.push(Scope::new());
	}

	pub fn pop_scope(&mut self) {
		self.scopes.pop();
	}

	pub fn declare(&mut self, symbol: Symbol<'l>) {
		let key = lower_key(&symbol.name);
		self.scopes.last_mut().expect("at least one scope").symbols.insert(key, symbol);
	}

	pub fn lookup(&self, name: &str) -> Option<&Symbol<'l>> {
		let key = lower_key(name);
		self.scopes.iter().rev().find_map(|scope| scope.symbols.get(&key))
	}

	/// The symbol's narrowed type if one is in effect, else its declared
	/// type (spec `NilComparedWithNonOptional`/optional-narrowing rules).
	pub fn effective_type(&self, name: &str) -> Option<Type<'l>> {
        let key = lower_key(name);
        for frame in self.narrowing.iter().rev() {
            if let Some(ty) = frame.get(&key) {
                return Some(*ty);
            }
        }
        self.lookup(name).map(|s| s.ty)
	}

	pub fn mark_assigned(&mut self, name: &str) {
		let key = lower_key(name);
		if let Some(scope) = self.scopes.iter_mut().rev().find(|scope| scope.symbols.contains_key(&key)) {
			scope.assigned.insert(key);
		}
	}

	pub fn is_assigned(&self, name: &str) -> bool {
		let key = lower_key(name);
		self.scopes.iter().rev().any(|scope| scope.assigned.contains(&key))
	}

	pub fn push_narrowing(&mut self) {
		self.narrowing.push(FxHashMap::default());
	}

	pub fn pop_narrowing(&mut self) {
		self.narrowing.pop();
	}

	pub fn narrow(&mut self, name: &str, ty: Type<'l>) {
		if let Some(frame) = self.narrowing.last_mut() {
			frame.insert(lower_key(name), ty);
		}
	}

	/// Removes any narrowing of `name` from every active scope (spec
	/// Testable Property 7): an assignment to a narrowed variable must
	/// invalidate the narrowing everywhere it's in effect, not just in the
	/// innermost frame.
	pub fn invalidate(&mut self, name: &str) {
		let key = lower_key(name);
		for frame in &mut self.narrowing {
			frame.remove(&key);
		}
	}

	/// Captures the per-scope definite-assignment sets so a branch can be
	/// checked against a throwaway copy and later merged (spec Testable
	/// Property 6). The scope stack's shape (count and nesting) must be
	/// unchanged between snapshot and restore/merge.
	pub fn snapshot_assigned(&self) -> Vec<std::collections::HashSet<String>> {
		self.scopes.iter().map(|s| s.assigned.clone()).collect()
	}

	pub fn restore_assigned(&mut self, snapshot: Vec<std::collections::HashSet<String>>) {
		for (scope, snap) in self.scopes.iter_mut().zip(snapshot) {
			scope.assigned = snap;
		}
	}

	/// Sets each scope's assigned set to the intersection of the two given
	/// snapshots at the same scope depth: a name is definitely assigned
	/// after an if/else only if both branches assigned it.
	pub fn restore_assigned_intersection(&mut self, a: Vec<std::collections::HashSet<String>>, b: Vec<std::collections::HashSet<String>>) {
		for ((scope, a), b) in self.scopes.iter_mut().zip(a).zip(b) {
			scope.assigned = a.intersection(&b).cloned().collect();
		}
	}
}

impl<'l> Default for SymbolTable<'l> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sem::types::Primitive;

	#[test]
	fn inner_scope_assignment_does_not_leak_out() {
		let mut table = SymbolTable::new();
		table.declare(Symbol { name: "x".into(), ty: Type::Primitive(Primitive::Int32), is_const: false, is_loop_var: false });
		table.push_scope();
		table.declare(Symbol { name: "y".into(), ty: Type::Primitive(Primitive::Int32), is_const: false, is_loop_var: false });
		table.mark_assigned("y");
		assert!(table.is_assigned("y"));
		table.pop_scope();
		assert!(!table.is_assigned("y"));
	}

	#[test]
	fn narrowing_overrides_declared_type_until_popped() {
		let mut table = SymbolTable::new();
		let inner = Type::Primitive(Primitive::Int32);
		let opt = Type::Optional(&inner);
		table.declare(Symbol { name: "x".into(), ty: opt, is_const: false, is_loop_var: false });
		table.push_narrowing();
		table.narrow("x", inner);
		assert!(!table.effective_type("x").unwrap().is_optional());
		table.pop_narrowing();
		assert!(table.effective_type("x").unwrap().is_optional());
	}

	#[test]
	fn lookup_is_case_insensitive() {
		let mut table = SymbolTable::new();
		table.declare(Symbol { name: "Count".into(), ty: Type::Primitive(Primitive::Int32), is_const: false, is_loop_var: false });
		assert!(table.lookup("count").is_some());
	}
}
