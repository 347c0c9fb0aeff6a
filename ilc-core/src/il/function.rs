//! A single IL function: its entry block, the full block list, and the
//! declared type of every temp it defines (needed by the lowerer to pick
//! instruction encodings without re-deriving types from the AST).

use crate::il::block::BasicBlock;
use crate::il::instr::{BlockId, TempId};
use crate::il::types::IlType;
use nohash_hasher::BuildNoHashHasher;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Function {
	pub name: String,
	pub param_types: Vec<IlType>,
	pub return_ty: IlType,
	pub blocks: Vec<BasicBlock>,
	pub entry: BlockId,
	/// Keyed by `TempId`, a densely assigned counter, so a no-op hasher
	/// (teacher's own `schema::type` idiom for token/index-keyed maps) is
	/// faster than hashing through FxHash.
	pub temp_types: HashMap<TempId, IlType, BuildNoHashHasher<TempId>>,
	/// String literals referenced by this function, in first-use order;
	/// a `Value::StringConst(i)` indexes into this vector. Pooled per
	/// function rather than per module (duplicates across functions are
	/// tolerated) to keep lowering a single-pass, builder-local concern.
	pub string_pool: Vec<String>,
}

impl Function {
	pub fn new(name: impl Into<String>, param_types: Vec<IlType>, return_ty: IlType) -> Self {
		Function { name: name.into(), param_types, return_ty, blocks: Vec::new(), entry: BlockId(0), temp_types: HashMap::default(), string_pool: Vec::new() }
	}

	pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
		self.blocks.iter().find(|b| b.id == id)
	}

	pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
		self.blocks.iter_mut().find(|b| b.id == id)
	}

	/// Every block in the function must terminate; used as a post-lowering
	/// sanity check before a function is handed to the backend.
	pub fn is_well_formed(&self) -> bool {
		!self.blocks.is_empty() && self.blocks.iter().all(BasicBlock::is_terminated)
	}
}
