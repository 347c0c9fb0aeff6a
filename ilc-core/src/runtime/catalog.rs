//! Runtime class catalog (spec §4.2), grounded on the original's
//! `RuntimeClassNames.hpp`/`RuntimeDescriptors.hpp`: a static, build-time
//! descriptor table enumerating every built-in type (its category,
//! properties and methods) plus the set of builtin extern procedure names
//! used to seed namespace prefixes so `USING Viper.Console` resolves
//! unqualified calls. Immutable after initialization (spec §5 "Global
//! state"); safe to read concurrently since nothing here is ever mutated.

/// Whether a runtime descriptor names a class or an interface (spec §4.2:
/// "the category (class/interface)"). Every descriptor currently declared is
/// a class; the variant exists so a future runtime interface (e.g. an
/// `IComparable`-style builtin) doesn't need a catalog shape change.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RuntimeKind {
	Class,
	Interface,
}

/// A runtime class's property: its name, declared type (by name, since this
/// module sits below `sem` and cannot reference [`crate::sem::types::Type`]
/// directly), whether it's read-only, and the runtime symbol its getter
/// lowers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RuntimeProperty {
	pub name: &'static str,
	pub ty: &'static str,
	pub read_only: bool,
	pub getter_symbol: &'static str,
}

/// A runtime class's method: name, parameter types (by name), return type,
/// and the runtime symbol it lowers to. Arity is `params.len()`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RuntimeMethod {
	pub name: &'static str,
	pub params: &'static [&'static str],
	pub return_ty: &'static str,
	pub symbol: &'static str,
}

/// One builtin runtime class, identified by its canonical fully-qualified
/// name. `RTCLASS_CONSOLE` in the original is a deprecated alias for
/// `Viper.Terminal`; it is kept here for the same backward-compatibility
/// reason, resolving to the same namespace/class pair and member tables.
#[derive(Debug, Copy, Clone)]
pub struct RuntimeClass {
	pub qualified_name: &'static str,
	pub kind: RuntimeKind,
	pub properties: &'static [RuntimeProperty],
	pub methods: &'static [RuntimeMethod],
}

/// A builtin extern procedure (spec §4.2: "the set of builtin extern
/// procedure names ... used to seed namespace prefixes"), e.g.
/// `Viper.Console.PrintI64`. Distinct from [`RuntimeClass`]: a procedure is
/// not itself a type, so only its namespace prefix is registered, never the
/// procedure name as a class or interface (see
/// `NamespaceRegistry::seed_runtime_procedure_namespaces`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RuntimeProcedure {
	pub qualified_name: &'static str,
	pub params: &'static [&'static str],
	pub return_ty: &'static str,
	pub symbol: &'static str,
}

const NO_PROPERTIES: &[RuntimeProperty] = &[];
const NO_METHODS: &[RuntimeMethod] = &[];

pub const RTCLASS_STRING: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.String",
	kind: RuntimeKind::Class,
	properties: &[RuntimeProperty { name: "Length", ty: "Int64", read_only: true, getter_symbol: "rt_len" }],
	methods: &[
		RuntimeMethod { name: "Substring", params: &["Int64", "Int64"], return_ty: "Viper.String", symbol: "rt_substr" },
		RuntimeMethod { name: "IndexOf", params: &["Viper.String"], return_ty: "Int64", symbol: "rt_str_index_of" },
		RuntimeMethod { name: "ToUpper", params: &[], return_ty: "Viper.String", symbol: "rt_str_to_upper" },
		RuntimeMethod { name: "ToLower", params: &[], return_ty: "Viper.String", symbol: "rt_str_to_lower" },
	],
};

pub const RTCLASS_OBJECT: RuntimeClass =
	RuntimeClass { qualified_name: "Viper.Object", kind: RuntimeKind::Class, properties: NO_PROPERTIES, methods: NO_METHODS };

pub const RTCLASS_STRING_BUILDER: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.Text.StringBuilder",
	kind: RuntimeKind::Class,
	properties: &[RuntimeProperty { name: "Length", ty: "Int64", read_only: true, getter_symbol: "rt_sb_length" }],
	methods: &[
		RuntimeMethod { name: "Append", params: &["Viper.String"], return_ty: "Viper.Text.StringBuilder", symbol: "rt_sb_append" },
		RuntimeMethod { name: "Clear", params: &[], return_ty: "Void", symbol: "rt_sb_clear" },
		RuntimeMethod { name: "ToString", params: &[], return_ty: "Viper.String", symbol: "rt_sb_to_string" },
	],
};

pub const RTCLASS_FILE: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.IO.File",
	kind: RuntimeKind::Class,
	properties: NO_PROPERTIES,
	methods: &[
		RuntimeMethod { name: "ReadAllText", params: &["Viper.String"], return_ty: "Viper.String", symbol: "rt_file_read_all_text" },
		RuntimeMethod { name: "WriteAllText", params: &["Viper.String", "Viper.String"], return_ty: "Void", symbol: "rt_file_write_all_text" },
		RuntimeMethod { name: "Exists", params: &["Viper.String"], return_ty: "Bool", symbol: "rt_file_exists" },
	],
};

pub const RTCLASS_LIST: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.Collections.List",
	kind: RuntimeKind::Class,
	properties: &[RuntimeProperty { name: "Length", ty: "Int64", read_only: true, getter_symbol: "rt_arr_i64_len" }],
	methods: &[
		RuntimeMethod { name: "Get", params: &["Int64"], return_ty: "Int64", symbol: "rt_arr_i64_get" },
		RuntimeMethod { name: "Add", params: &["Int64"], return_ty: "Void", symbol: "rt_list_add" },
	],
};

pub const RTCLASS_MAP: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.Collections.Map",
	kind: RuntimeKind::Class,
	properties: &[RuntimeProperty { name: "Length", ty: "Int64", read_only: true, getter_symbol: "rt_map_count" }],
	methods: &[
		RuntimeMethod { name: "Get", params: &["Viper.String"], return_ty: "Int64", symbol: "rt_map_get" },
		RuntimeMethod { name: "Set", params: &["Viper.String", "Int64"], return_ty: "Void", symbol: "rt_map_set" },
		RuntimeMethod { name: "ContainsKey", params: &["Viper.String"], return_ty: "Bool", symbol: "rt_map_contains_key" },
	],
};

pub const RTCLASS_MATH: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.Math",
	kind: RuntimeKind::Class,
	properties: NO_PROPERTIES,
	methods: &[
		RuntimeMethod { name: "Sqrt", params: &["Float64"], return_ty: "Float64", symbol: "rt_math_sqrt" },
		RuntimeMethod { name: "Abs", params: &["Float64"], return_ty: "Float64", symbol: "rt_math_abs" },
		RuntimeMethod { name: "Pow", params: &["Float64", "Float64"], return_ty: "Float64", symbol: "rt_math_pow" },
	],
};

const TERMINAL_METHODS: &[RuntimeMethod] = &[
	RuntimeMethod { name: "GotoXy", params: &["Int64", "Int64"], return_ty: "Void", symbol: "rt_term_locate" },
	RuntimeMethod { name: "Clear", params: &[], return_ty: "Void", symbol: "rt_term_clear" },
];

pub const RTCLASS_TERMINAL: RuntimeClass =
	RuntimeClass { qualified_name: "Viper.Terminal", kind: RuntimeKind::Class, properties: NO_PROPERTIES, methods: TERMINAL_METHODS };

/// Deprecated alias, kept for source compatibility with code still
/// referencing the old name; resolves to the same members as `Viper.Terminal`.
pub const RTCLASS_CONSOLE: RuntimeClass =
	RuntimeClass { qualified_name: "Viper.Terminal", kind: RuntimeKind::Class, properties: NO_PROPERTIES, methods: TERMINAL_METHODS };

pub const RTCLASS_CONVERT: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.Convert",
	kind: RuntimeKind::Class,
	properties: NO_PROPERTIES,
	methods: &[
		RuntimeMethod { name: "ToString", params: &["Int64"], return_ty: "Viper.String", symbol: "rt_convert_to_string" },
		RuntimeMethod { name: "ToInt64", params: &["Viper.String"], return_ty: "Int64", symbol: "rt_convert_to_int64" },
	],
};

pub const RTCLASS_RANDOM: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.Random",
	kind: RuntimeKind::Class,
	properties: NO_PROPERTIES,
	methods: &[RuntimeMethod { name: "Next", params: &["Int64"], return_ty: "Int64", symbol: "rt_random_next" }],
};

pub const RTCLASS_ENVIRONMENT: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.Environment",
	kind: RuntimeKind::Class,
	properties: NO_PROPERTIES,
	methods: &[RuntimeMethod { name: "GetVariable", params: &["Viper.String"], return_ty: "Viper.String", symbol: "rt_env_get_variable" }],
};

pub const RTCLASS_DATETIME: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.DateTime",
	kind: RuntimeKind::Class,
	properties: NO_PROPERTIES,
	methods: &[RuntimeMethod { name: "Now", params: &[], return_ty: "Viper.DateTime", symbol: "rt_datetime_now" }],
};

pub const RTCLASS_WINDOW: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.Graphics.Window",
	kind: RuntimeKind::Class,
	properties: NO_PROPERTIES,
	methods: &[
		RuntimeMethod { name: "SetTitle", params: &["Viper.String"], return_ty: "Void", symbol: "rt_window_set_title" },
		RuntimeMethod { name: "Close", params: &[], return_ty: "Void", symbol: "rt_window_close" },
	],
};

pub const RTCLASS_COLOR: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.Graphics.Color",
	kind: RuntimeKind::Class,
	properties: &[
		RuntimeProperty { name: "R", ty: "Int64", read_only: true, getter_symbol: "rt_color_r" },
		RuntimeProperty { name: "G", ty: "Int64", read_only: true, getter_symbol: "rt_color_g" },
		RuntimeProperty { name: "B", ty: "Int64", read_only: true, getter_symbol: "rt_color_b" },
	],
	methods: NO_METHODS,
};

pub const RTCLASS_TIME: RuntimeClass =
	RuntimeClass { qualified_name: "Viper.Time", kind: RuntimeKind::Class, properties: NO_PROPERTIES, methods: NO_METHODS };

pub const RTCLASS_CLOCK: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.Time.Clock",
	kind: RuntimeKind::Class,
	properties: NO_PROPERTIES,
	methods: &[RuntimeMethod { name: "NowMillis", params: &[], return_ty: "Int64", symbol: "rt_clock_now_millis" }],
};

pub const RTCLASS_STOPWATCH: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.Diagnostics.Stopwatch",
	kind: RuntimeKind::Class,
	properties: NO_PROPERTIES,
	methods: &[
		RuntimeMethod { name: "Start", params: &[], return_ty: "Void", symbol: "rt_stopwatch_start" },
		RuntimeMethod { name: "Stop", params: &[], return_ty: "Void", symbol: "rt_stopwatch_stop" },
		RuntimeMethod { name: "ElapsedMillis", params: &[], return_ty: "Int64", symbol: "rt_stopwatch_elapsed_millis" },
	],
};

pub const RTCLASS_GUID: RuntimeClass = RuntimeClass {
	qualified_name: "Viper.Text.Guid",
	kind: RuntimeKind::Class,
	properties: NO_PROPERTIES,
	methods: &[RuntimeMethod { name: "NewGuid", params: &[], return_ty: "Viper.String", symbol: "rt_guid_new" }],
};

pub const RUNTIME_CLASSES: &[RuntimeClass] = &[
	RTCLASS_STRING,
	RTCLASS_OBJECT,
	RTCLASS_STRING_BUILDER,
	RTCLASS_FILE,
	RTCLASS_LIST,
	RTCLASS_MAP,
	RTCLASS_MATH,
	RTCLASS_TERMINAL,
	RTCLASS_CONSOLE,
	RTCLASS_CONVERT,
	RTCLASS_RANDOM,
	RTCLASS_ENVIRONMENT,
	RTCLASS_DATETIME,
	RTCLASS_WINDOW,
	RTCLASS_COLOR,
	RTCLASS_TIME,
	RTCLASS_CLOCK,
	RTCLASS_STOPWATCH,
	RTCLASS_GUID,
];

/// Builtin extern procedures (spec §4.2), seeded into the namespace registry
/// as prefixes only — see `NamespaceRegistry::seed_runtime_procedure_namespaces`.
pub const RUNTIME_PROCEDURES: &[RuntimeProcedure] = &[
	RuntimeProcedure { qualified_name: "Viper.Console.PrintI64", params: &["Int64"], return_ty: "Void", symbol: "rt_print_i64" },
	RuntimeProcedure { qualified_name: "Viper.Console.PrintF64", params: &["Float64"], return_ty: "Void", symbol: "rt_print_f64" },
	RuntimeProcedure { qualified_name: "Viper.Console.PrintStr", params: &["Viper.String"], return_ty: "Void", symbol: "rt_print_str" },
	RuntimeProcedure { qualified_name: "Viper.Console.PrintBool", params: &["Bool"], return_ty: "Void", symbol: "rt_print_i1" },
	RuntimeProcedure { qualified_name: "Viper.Console.ReadLine", params: &[], return_ty: "Viper.String", symbol: "rt_input_line" },
];

/// Whether `qualified_name` (case-sensitive; runtime class names are always
/// written in canonical casing by the lowerer) names a builtin class.
pub fn is_runtime_class(qualified_name: &str) -> bool {
	RUNTIME_CLASSES.iter().any(|c| c.qualified_name == qualified_name)
}

pub fn find_class(qualified_name: &str) -> Option<&'static RuntimeClass> {
	RUNTIME_CLASSES.iter().find(|c| c.qualified_name == qualified_name)
}

pub fn find_property(qualified_name: &str, property_name: &str) -> Option<&'static RuntimeProperty> {
	find_class(qualified_name)?.properties.iter().find(|p| p.name.eq_ignore_ascii_case(property_name))
}

pub fn find_method(qualified_name: &str, method_name: &str) -> Option<&'static RuntimeMethod> {
	find_class(qualified_name)?.methods.iter().find(|m| m.name.eq_ignore_ascii_case(method_name))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn console_alias_resolves_to_terminal() {
		assert_eq!(RTCLASS_CONSOLE.qualified_name, RTCLASS_TERMINAL.qualified_name);
	}

	#[test]
	fn every_declared_constant_is_recognized() {
		for class in RUNTIME_CLASSES {
			assert!(is_runtime_class(class.qualified_name));
		}
		assert!(!is_runtime_class("Viper.DoesNotExist"));
	}

	#[test]
	fn string_length_is_a_read_only_property() {
		let prop = find_property("Viper.String", "length").expect("Length property");
		assert!(prop.read_only);
		assert_eq!(prop.getter_symbol, "rt_len");
	}

	#[test]
	fn list_get_method_is_found_case_insensitively() {
		let method = find_method("Viper.Collections.List", "GET").expect("Get method");
		assert_eq!(method.symbol, "rt_arr_i64_get");
		assert_eq!(method.params.len(), 1);
	}

	#[test]
	fn unknown_member_is_none() {
		assert!(find_method("Viper.String", "DoesNotExist").is_none());
		assert!(find_property("Viper.DoesNotExist", "Length").is_none());
	}
}
