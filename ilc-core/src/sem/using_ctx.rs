//! USING-directive tracking (spec §4.4), grounded on the original's
//! `UsingContext`: a per-file list of imported namespaces in declaration
//! order, plus a separate case-insensitive alias table.

use crate::diagnostics::SourceLoc;
use crate::utilities::lower_key;
use fxhash::FxHashMap;

#[derive(Debug, Clone)]
pub struct Import {
	pub ns: String,
	pub alias: Option<String>,
	pub loc: SourceLoc,
}

/// Tracks `using`/`uses` directives for one compilation unit. Resolution
/// order in [`crate::sem::resolver`] depends on `imports` retaining
/// declaration order, so insertion order is never reshuffled.
#[derive(Debug, Default)]
pub struct UsingContext {
	imports: Vec<Import>,
	aliases: FxHashMap<String, String>,
}

impl UsingContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, ns: impl Into<String>, alias: Option<String>, loc: SourceLoc) {
		let ns = ns.into();
		if let Some(alias) = &alias {
			self.aliases.insert(lower_key(alias), ns.clone());
		}
		self.imports.push(Import { ns, alias, loc });
	}

	pub fn imports(&self) -> &[Import] {
		&self.imports
	}

	pub fn has_alias(&self, name: &str) -> bool {
		self.aliases.contains_key(&lower_key(name))
	}

	pub fn resolve_alias(&self, name: &str) -> Option<&str> {
		self.aliases.get(&lower_key(name)).map(String::as_str)
	}

	pub fn clear(&mut self) {
		self.imports.clear();
		self.aliases.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn declaration_order_is_preserved() {
		let mut ctx = UsingContext::new();
		ctx.add("Viper.IO", None, SourceLoc::default());
		ctx.add("Viper.Collections", None, SourceLoc::default());
		let names: Vec<_> = ctx.imports().iter().map(|i| i.ns.as_str()).collect();
		assert_eq!(names, vec!["Viper.IO", "Viper.Collections"]);
	}

	#[test]
	fn alias_lookup_is_case_insensitive() {
		let mut ctx = UsingContext::new();
		ctx.add("Viper.Collections", Some("Coll".to_string()), SourceLoc::default());
		assert!(ctx.has_alias("COLL"));
		assert_eq!(ctx.resolve_alias("coll"), Some("Viper.Collections"));
	}

	#[test]
	fn clear_drops_imports_and_aliases() {
		let mut ctx = UsingContext::new();
		ctx.add("Viper.IO", Some("IO".to_string()), SourceLoc::default());
		ctx.clear();
		assert!(ctx.imports().is_empty());
		assert!(!ctx.has_alias("IO"));
	}
}
