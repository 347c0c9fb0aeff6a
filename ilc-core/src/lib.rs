//! Shared name resolution, typed IL, object-model layout and lowering
//! infrastructure for the BASIC/Pascal/Zia frontends.
//!
//! A [`CompileContext`] owns the arena every declared class, interface and
//! type is allocated into for the lifetime of one compilation, mirroring
//! the teacher's own `Context<'l>`: frontends feed it [`ast::CompilationUnit`]
//! values one at a time, then call [`CompileContext::finish`] once every
//! unit has been analyzed to run layout and lowering over the whole
//! program.

pub mod ast;
pub mod diagnostics;
pub mod il;
pub mod layout;
pub mod lower;
pub mod pool;
pub mod runtime;
pub mod sem;
mod utilities;

use ast::CompilationUnit;
use bumpalo::Bump;
use diagnostics::DiagnosticSink;
use il::module::Module;
use layout::ClassLayoutComputer;
use sem::analyzer::SemanticAnalyzer;
use std::pin::Pin;

/// Top-level compilation context. Pinned because [`SemanticAnalyzer`] hands
/// out references borrowed from `bump` with a lifetime tied to this
/// context's address; moving the context after analysis has started would
/// invalidate them.
pub struct CompileContext {
	bump: Pin<Box<Bump>>,
}

impl CompileContext {
	pub fn new() -> Self {
		CompileContext { bump: Box::pin(Bump::new()) }
	}

	/// Extends the arena's borrow to `'static` for the duration this
	/// context is alive, the same trick the teacher's `Context::bump`
	/// uses to let an analyzer built from `&self` outlive a single method
	/// call without self-referential struct gymnastics.
	fn bump(&self) -> &'static Bump {
		unsafe { std::mem::transmute::<&Bump, &'static Bump>(&self.bump) }
	}

	/// Analyzes every unit in `units` against a single shared namespace
	/// registry (so cross-file class references resolve), then computes
	/// layout and lowers every unit to IL. Returns the finished module and
	/// the total diagnostic counts.
	pub fn compile(&self, units: &[CompilationUnit], diags: &mut DiagnosticSink) -> Module {
		let bump = self.bump();
		let mut analyzer = SemanticAnalyzer::new(bump);
		for unit in units {
			analyzer.analyze(unit, diags);
		}

		let mut layout = ClassLayoutComputer::new();
		layout.scan_classes(analyzer.classes());
		layout.compute_all();

		let mut module = Module::new();
		let mut lowerer = lower::Lowerer::new(&layout, analyzer.interfaces());
		for unit in units {
			lowerer.lower_unit(unit, &mut module);
		}
		module
	}
}

impl Default for CompileContext {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ast::*;
	use crate::diagnostics::CollectingEmitter;

	#[test]
	fn compiling_a_single_procedure_produces_one_function() {
		let ctx = CompileContext::new();
		let mut emitter = CollectingEmitter::default();
        let mut sink = DiagnosticSink::new(&mut emitter);
		let unit = CompilationUnit {
			namespace: "".into(),
			uses: vec![],
			decls: vec![Decl::Procedure(ProcDecl {
				sig: MethodSignature { name: "Main".into(), params: vec![], return_ty: None, loc: SourceLoc::default() },
				body: vec![Stmt::Return { value: None, loc: SourceLoc::default() }],
			})],
		};
		let module = ctx.compile(&[unit], &mut sink);
		assert_eq!(module.functions.len(), 1);
		assert_eq!(module.functions[0].name, "Main");
	}
}
