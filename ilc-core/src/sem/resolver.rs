//! Type-name resolution (spec §4.5), grounded on the original's
//! `TypeResolver`: resolves a possibly-dotted type name to a fully-qualified
//! name, walking the enclosing namespace chain before falling back to
//! `using` imports, and reporting ambiguity when more than one import
//! supplies a match.

use crate::sem::namespace::{NamespaceRegistry, TypeKind};
use crate::sem::using_ctx::UsingContext;
use crate::utilities::{join_qualified, lower_key, split_qualified};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Kind {
	Unknown,
	Class,
	Interface,
}

impl From<TypeKind> for Kind {
	fn from(kind: TypeKind) -> Self {
		match kind {
			TypeKind::None => Kind::Unknown,
			TypeKind::Class => Kind::Class,
			TypeKind::Interface => Kind::Interface,
		}
	}
}

#[derive(Debug, Clone)]
pub struct ResolveResult {
	pub found: bool,
	pub qname: String,
	pub kind: Kind,
	/// Every fully-qualified candidate considered when resolution was
	/// ambiguous, sorted case-insensitively. Empty unless `found` is false
	/// and the cause was ambiguity rather than a plain miss.
	pub contenders: Vec<String>,
}

impl ResolveResult {
	fn not_found() -> Self {
		ResolveResult { found: false, qname: String::new(), kind: Kind::Unknown, contenders: Vec::new() }
	}

	fn ok(qname: String, kind: Kind) -> Self {
		ResolveResult { found: true, qname, kind, contenders: Vec::new() }
	}

	fn ambiguous(contenders: Vec<String>) -> Self {
		ResolveResult { found: false, qname: String::new(), kind: Kind::Unknown, contenders }
	}
}

/// Resolves `name` seen while compiling a unit whose innermost enclosing
/// namespace is `current_ns` (e.g. `"Foo.Bar"`); `current_ns` may be empty
/// for the global namespace.
pub fn resolve(
	registry: &NamespaceRegistry,
	using_ctx: &UsingContext,
	current_ns: &str,
	name: &str,
) -> ResolveResult {
	let segments = split_qualified(name);
	if segments.len() > 1 {
		return resolve_dotted(registry, using_ctx, &segments);
	}

	if let Some(result) = try_namespace_chain(registry, current_ns, name) {
		return result;
	}

	resolve_via_imports(registry, using_ctx, name)
}

/// A dotted name either names a fully-qualified type directly, or its first
/// segment is a `using` alias that expands before the rest is appended.
fn resolve_dotted(registry: &NamespaceRegistry, using_ctx: &UsingContext, segments: &[&str]) -> ResolveResult {
	if let Some(expanded) = using_ctx.resolve_alias(segments[0]) {
		let mut full_segments: Vec<&str> = split_qualified(expanded);
		full_segments.extend_from_slice(&segments[1..]);
		return lookup_fully_qualified(registry, &full_segments);
	}
	lookup_fully_qualified(registry, segments)
}

fn lookup_fully_qualified(registry: &NamespaceRegistry, segments: &[&str]) -> ResolveResult {
	if segments.len() < 2 {
		return ResolveResult::not_found();
	}
	let ns = join_qualified(&segments[..segments.len() - 1]);
	let name = segments[segments.len() - 1];
	match registry.get_type_kind(&ns, name) {
		TypeKind::None => ResolveResult::not_found(),
		kind => ResolveResult::ok(format!("{ns}.{name}"), kind.into()),
	}
}

/// Walks the enclosing namespace chain from most specific to the global
/// namespace (`"Foo.Bar"`, then `"Foo"`, then `""`), returning on the first
/// hit. Matches the original's `tryResolveInNamespace` walk order.
fn try_namespace_chain(registry: &NamespaceRegistry, current_ns: &str, name: &str) -> Option<ResolveResult> {
	let segments = split_qualified(current_ns);
	for depth in (0..=segments.len()).rev() {
		let ns = join_qualified(&segments[..depth]);
		match registry.get_type_kind(&ns, name) {
			TypeKind::None => continue,
			kind => {
				let qname = if ns.is_empty() { name.to_string() } else { format!("{ns}.{name}") };
				return Some(ResolveResult::ok(qname, kind.into()));
			}
		}
	}
	None
}

/// Scans `using` imports in declaration order, collecting every namespace
/// that declares `name`. Zero candidates is a miss, one is a hit, two or
/// more is ambiguous — contenders are reported sorted case-insensitively,
/// mirroring the original's `std::sort` with a case-insensitive comparator.
fn resolve_via_imports(registry: &NamespaceRegistry, using_ctx: &UsingContext, name: &str) -> ResolveResult {
	let mut candidates: Vec<(String, Kind)> = Vec::new();
	for import in using_ctx.imports() {
		match registry.get_type_kind(&import.ns, name) {
			TypeKind::None => continue,
			kind => {
				let qname = format!("{}.{name}", import.ns);
				if !candidates.iter().any(|(q, _)| lower_key(q) == lower_key(&qname)) {
					candidates.push((qname, kind.into()));
				}
			}
		}
	}

	match candidates.len() {
		0 => ResolveResult::not_found(),
		1 => {
			let (qname, kind) = candidates.into_iter().next().unwrap();
			ResolveResult::ok(qname, kind)
		}
		_ => {
			let mut names: Vec<String> = candidates.into_iter().map(|(q, _)| q).collect();
			names.sort_by(|a, b| lower_key(a).cmp(&lower_key(b)));
			ResolveResult::ambiguous(names)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::diagnostics::SourceLoc;

	fn registry_with(ns_types: &[(&str, &str)]) -> NamespaceRegistry {
		let mut reg = NamespaceRegistry::new();
		for (ns, name) in ns_types {
			reg.register_class(ns, name);
		}
		reg
	}

	#[test]
	fn walks_namespace_chain_from_most_specific_to_global() {
		let reg = registry_with(&[("Foo", "Widget"), ("", "Widget")]);
		let using = UsingContext::new();
		let result = resolve(&reg, &using, "Foo.Bar", "Widget");
        assert!(result.found);
        assert_eq!(result.qname, "Foo.Widget");
	}

	#[test]
	fn ambiguous_when_two_imports_both_declare_the_name() {
		let reg = registry_with(&[("Alpha", "Thing"), ("Beta", "Thing")]);
		let mut using = UsingContext::new();
		using.add("Alpha", None, SourceLoc::default());
		using.add("Beta", None, SourceLoc::default());
		let result = resolve(&reg, &using, "", "Thing");
		assert!(!result.found);
		assert_eq!(result.contenders, vec!["Alpha.Thing", "Beta.Thing"]);
	}

	#[test]
	fn dotted_alias_expands_before_lookup() {
		let reg = registry_with(&[("Viper.Collections", "List")]);
		let mut using = UsingContext::new();
		using.add("Viper.Collections", Some("Coll".to_string()), SourceLoc::default());
		let result = resolve(&reg, &using, "", "Coll.List");
		assert!(result.found);
		assert_eq!(result.qname, "Viper.Collections.List");
	}

	#[test]
	fn plain_miss_reports_no_contenders() {
		let reg = NamespaceRegistry::new();
		let using = UsingContext::new();
		let result = resolve(&reg, &using, "", "Nope");
		assert!(!result.found);
		assert!(result.contenders.is_empty());
	}
}
