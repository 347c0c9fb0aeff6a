//! Two-pass semantic analyzer entry point (spec §4.6): wires namespace
//! registration, heritage/override/interface checks (pass 1) and statement-
//! level checking (pass 2) into a single per-unit `analyze` call.

use crate::ast::{CompilationUnit, Decl, ProcDecl};
use crate::diagnostics::{DiagnosticSink, ErrorKind};
use crate::sem::analyzer_decl::{self, link_class_bodies};
use crate::sem::analyzer_expr::{fold_const, ProcSignature, TypeCtx};
use crate::sem::analyzer_stmt::{check_block, StmtContext};
use crate::sem::class::{ClassDef, InterfaceDef};
use crate::sem::namespace::NamespaceRegistry;
use crate::sem::symbols::{Symbol, SymbolTable};
use crate::sem::types::Type;
use crate::sem::using_ctx::UsingContext;
use bumpalo::Bump;
use fxhash::FxHashMap;

/// Owns the arena every declared class/interface/type is allocated into, the
/// shared namespace registry, and per-unit `using` state. One analyzer
/// instance is built per compilation (all frontends share it when compiling
/// a multi-file program), matching the original's single-pass-per-program
/// structure.
pub struct SemanticAnalyzer<'l> {
	bump: &'l Bump,
	pub registry: NamespaceRegistry,
	classes_by_qname: FxHashMap<String, &'l ClassDef<'l>>,
	ifaces_by_qname: FxHashMap<String, &'l InterfaceDef<'l>>,
}

impl<'l> SemanticAnalyzer<'l> {
	pub fn new(bump: &'l Bump) -> Self {
		SemanticAnalyzer {
			bump,
			registry: NamespaceRegistry::with_runtime_builtins(),
			classes_by_qname: FxHashMap::default(),
			ifaces_by_qname: FxHashMap::default(),
		}
	}

	pub fn classes(&self) -> impl Iterator<Item = &'l ClassDef<'l>> + '_ {
		self.classes_by_qname.values().copied()
	}

	pub fn interfaces(&self) -> impl Iterator<Item = &'l InterfaceDef<'l>> + '_ {
		self.ifaces_by_qname.values().copied()
	}

	/// Runs both passes over one compilation unit, appending every declared
	/// class/interface to the analyzer's registries so later units in the
	/// same compilation can reference them.
	pub fn analyze(&mut self, unit: &CompilationUnit, diags: &mut DiagnosticSink) {
		let iface_skeletons = analyzer_decl::declare_interface_skeletons(self.bump, unit);
		for (def, _) in &iface_skeletons {
			def.id.set(self.ifaces_by_qname.len() as u32);
			self.ifaces_by_qname.insert(def.qualified_name().to_string(), *def);
		}

		let class_skeletons = analyzer_decl::declare_skeletons(self.bump, &mut self.registry, unit);
		for (def, _) in &class_skeletons {
			self.classes_by_qname.insert(def.qualified_name().to_string(), *def);
		}

		let using_ctx = self.build_using_ctx(unit);

		for (iface_def, iface_decl) in &iface_skeletons {
			let methods: Vec<_> = iface_decl
				.methods
				.iter()
				.map(|sig| crate::sem::class::Method {
					name: self.bump.alloc_str(&sig.name),
					params: std::cell::Cell::new(analyzer_decl::resolve_type_ref_params(
						self.bump,
						&self.registry,
						&using_ctx,
						&unit.namespace,
						&self.classes_by_qname,
						&self.ifaces_by_qname,
						sig,
						diags,
					)),
					return_ty: sig
						.return_ty
						.as_ref()
						.map(|t| analyzer_decl::resolve_type_ref(self.bump, &self.registry, &using_ctx, &unit.namespace, &self.classes_by_qname, &self.ifaces_by_qname, t, diags, sig.loc))
						.unwrap_or(Type::Primitive(crate::sem::types::Primitive::Void)),
					visibility: crate::sem::class::Visibility::Public,
					is_virtual: true,
					is_abstract: true,
					is_override: false,
					is_static: false,
					vtable_slot: std::cell::Cell::new(None),
				})
				.collect();
			iface_def.methods.set(self.bump.alloc_slice_fill_iter(methods));
		}

		for (class_def, class_decl) in &class_skeletons {
			link_class_bodies(
				self.bump,
				&self.registry,
				&using_ctx,
				&unit.namespace,
				*class_def,
				*class_decl,
				&self.classes_by_qname,
				&self.ifaces_by_qname,
				diags,
			);
		}

		let procedures = self.build_procedures(unit, &using_ctx, diags);
		let tyctx = TypeCtx::new(&self.classes_by_qname, &self.ifaces_by_qname, &procedures);

		for (class_def, class_decl) in &class_skeletons {
			for (method_decl, method) in class_decl.methods.iter().zip(class_def.methods.get()) {
				if let Some(body) = &method_decl.body {
					let mut symbols = SymbolTable::new();
					declare_params(&mut symbols, method.params.get());
					let mut ctx = StmtContext::for_method(
						!matches!(method.return_ty, Type::Primitive(crate::sem::types::Primitive::Void)),
						*class_def,
						method_decl.sig.name.clone(),
					);
					check_block(body, &mut symbols, &mut ctx, &tyctx, diags);
				} else if !class_decl.is_abstract && !method_decl.is_abstract {
					diags.error(ErrorKind::CannotInstantiateAbstract, class_decl.loc, class_decl.name.len() as u32, format!("'{}' has no body and its class is not abstract", method_decl.sig.name));
				}
			}
		}

		for decl in &unit.decls {
			match decl {
				Decl::Procedure(proc) => self.analyze_procedure(proc, &tyctx, diags),
				Decl::Const(const_decl) => {
					if fold_const(&const_decl.value).is_none() {
						diags.error(ErrorKind::NonConstantInitializer, const_decl.loc, const_decl.name.len() as u32, format!("initializer for '{}' is not a compile-time constant", const_decl.name));
					}
				}
				_ => {}
			}
		}
	}

	/// Resolves every free procedure's parameter/return types once per unit
	/// so call-shape (a) ("free function by simple name") can be checked
	/// against real arity/assignability.
	fn build_procedures(&self, unit: &CompilationUnit, using_ctx: &UsingContext, diags: &mut DiagnosticSink) -> FxHashMap<String, ProcSignature<'l>> {
		let mut procedures = FxHashMap::default();
		for decl in &unit.decls {
			if let Decl::Procedure(proc) = decl {
				let params = proc
					.sig
					.params
					.iter()
					.map(|p| analyzer_decl::resolve_type_ref(self.bump, &self.registry, using_ctx, &unit.namespace, &self.classes_by_qname, &self.ifaces_by_qname, &p.ty, diags, proc.sig.loc))
					.collect();
				let return_ty = proc
					.sig
					.return_ty
					.as_ref()
					.map(|t| analyzer_decl::resolve_type_ref(self.bump, &self.registry, using_ctx, &unit.namespace, &self.classes_by_qname, &self.ifaces_by_qname, t, diags, proc.sig.loc))
					.unwrap_or(Type::Primitive(crate::sem::types::Primitive::Void));
				procedures.insert(proc.sig.name.clone(), ProcSignature { params, return_ty });
			}
		}
		procedures
	}

	fn analyze_procedure(&self, proc: &ProcDecl, tyctx: &TypeCtx<'_, 'l>, diags: &mut DiagnosticSink) {
		let mut symbols = SymbolTable::new();
		for param in &proc.sig.params {
			symbols.declare(Symbol { name: param.name.clone(), ty: Type::Primitive(crate::sem::types::Primitive::Object), is_const: false, is_loop_var: false });
			symbols.mark_assigned(&param.name);
		}
		let mut ctx = StmtContext::for_procedure(proc.sig.return_ty.is_some(), proc.sig.name.clone());
		check_block(&proc.body, &mut symbols, &mut ctx, tyctx, diags);
	}

	fn build_using_ctx(&self, unit: &CompilationUnit) -> UsingContext {
		let mut using_ctx = UsingContext::new();
		for use_dir in &unit.uses {
			using_ctx.add(use_dir.ns.clone(), use_dir.alias.clone(), use_dir.loc);
		}
		using_ctx
	}
}

fn declare_params<'l>(symbols: &mut SymbolTable<'l>, params: &[crate::sem::class::Param<'l>]) {
	for param in params {
		symbols.declare(Symbol { name: param.name.to_string(), ty: param.ty, is_const: false, is_loop_var: false });
		symbols.mark_assigned(param.name);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ast::*;
	use crate::diagnostics::CollectingEmitter;

	#[test]
	fn analyzing_empty_unit_registers_no_classes() {
		let bump = Bump::new();
		let mut analyzer = SemanticAnalyzer::new(&bump);
		let mut emitter = CollectingEmitter::default();
		let mut sink = DiagnosticSink::new(&mut emitter);
		let unit = CompilationUnit { namespace: "App".into(), uses: vec![], decls: vec![] };
		analyzer.analyze(&unit, &mut sink);
		assert_eq!(analyzer.classes().count(), 0);
	}

	#[test]
	fn const_with_non_foldable_initializer_is_reported() {
		let bump = Bump::new();
		let mut analyzer = SemanticAnalyzer::new(&bump);
		let mut emitter = CollectingEmitter::default();
		let mut sink = DiagnosticSink::new(&mut emitter);
		let unit = CompilationUnit {
			namespace: "".into(),
			uses: vec![],
			decls: vec![Decl::Const(ConstDecl {
				name: "X".into(),
				value: Expr::Ident("y".into(), SourceLoc::default()),
				loc: SourceLoc::default(),
			})],
		};
		analyzer.analyze(&unit, &mut sink);
		assert!(emitter.diagnostics.iter().any(|d| d.kind == ErrorKind::NonConstantInitializer));
	}
}
