//! Semantic analysis: namespace/type resolution (§4.3-§4.5), the type
//! system and class model (§4.6-§4.7), symbol tracking, and the two-pass
//! analyzer itself (§4.6).

pub mod analyzer;
pub mod analyzer_decl;
pub mod analyzer_expr;
pub mod analyzer_stmt;
pub mod class;
pub mod namespace;
pub mod resolver;
pub mod symbols;
pub mod types;
pub mod using_ctx;

pub use analyzer::SemanticAnalyzer;
