//! Basic blocks (spec §4.9): a list of block parameters, a straight-line
//! instruction sequence, and exactly one terminator.

use crate::il::instr::{BlockId, BlockParam, Instr, Terminator};

#[derive(Debug, Clone)]
pub struct BasicBlock {
	pub id: BlockId,
	pub params: Vec<BlockParam>,
	pub instrs: Vec<Instr>,
	pub terminator: Option<Terminator>,
}

impl BasicBlock {
	pub fn new(id: BlockId) -> Self {
		BasicBlock { id, params: Vec::new(), instrs: Vec::new(), terminator: None }
	}

	pub fn is_terminated(&self) -> bool {
		self.terminator.is_some()
	}

	pub fn push(&mut self, instr: Instr) {
		debug_assert!(!self.is_terminated(), "cannot append instructions after a block's terminator");
		self.instrs.push(instr);
	}
}
