use std::cell::Cell;
use std::fmt::{Debug, Formatter};

/// Lowercases an identifier for use as a case-insensitive map key.
///
/// Every name-keyed table in this crate (namespaces, types, symbols, USING
/// aliases) stores the first-seen spelling separately and uses this for the
/// actual map key, matching the canonical-spelling invariant of §3.
#[inline]
pub(crate) fn lower_key(name: &str) -> String {
	name.chars().flat_map(char::to_lowercase).collect()
}

/// Splits a dot-separated qualified name into its segments, dropping empty
/// segments produced by leading/trailing/doubled dots.
pub(crate) fn split_qualified(name: &str) -> Vec<&str> {
	name.split('.').filter(|s| !s.is_empty()).collect()
}

pub(crate) fn join_qualified(segments: &[&str]) -> String {
	segments.join(".")
}

/// `derivative`-compatible formatter for `Cell<&[T]>` fields, mirroring the
/// teacher's `fmt_debug_cell` used on `Class`/`Interface` member slices.
pub(crate) fn fmt_debug_cell<T: Debug>(value: &Cell<&[T]>, fmt: &mut Formatter) -> std::fmt::Result {
	// Single-threaded analyzer/lowerer (§5): no concurrent mutation during Debug.
	let slice: &[T] = value.get();
	fmt.debug_list().entries(slice.iter()).finish()
}

pub(crate) fn fmt_debug_map<K: Debug, V: Debug>(
	map: &fxhash::FxHashMap<K, V>,
	fmt: &mut Formatter,
) -> std::fmt::Result {
	let mut dbg = fmt.debug_map();
	for (k, v) in map {
		dbg.entry(k, v);
	}
	dbg.finish()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lower_key_is_case_insensitive() {
		assert_eq!(lower_key("Viper.Console"), lower_key("viper.CONSOLE"));
	}

	#[test]
	fn split_qualified_drops_empty_segments() {
		assert_eq!(split_qualified("A.B.C"), vec!["A", "B", "C"]);
		assert_eq!(split_qualified(""), Vec::<&str>::new());
		assert_eq!(split_qualified("A..B"), vec!["A", "B"]);
	}
}
