//! IR construction helper (spec §4.8/§4.9): the lowerer's single point of
//! contact with [`Function`] internals, so lowering code reads as "emit add,
//! emit call, emit branch" rather than manipulating block vectors directly.

use crate::il::block::BasicBlock;
use crate::il::function::Function;
use crate::il::instr::{BlockId, BlockParam, CallFlags, CallTarget, Instr, Opcode, Predicate, TempId, Terminator, Value};
use crate::il::types::IlType;

pub struct IrBuilder {
	function: Function,
	next_temp: u32,
	next_block: u32,
	current: BlockId,
}

impl IrBuilder {
	pub fn new(name: impl Into<String>, param_types: Vec<IlType>, return_ty: IlType) -> Self {
		let mut function = Function::new(name, param_types, return_ty);
		let entry = BlockId(0);
		function.blocks.push(BasicBlock::new(entry));
		function.entry = entry;
		IrBuilder { function, next_temp: 0, next_block: 1, current: entry }
	}

	pub fn create_block(&mut self) -> BlockId {
		let id = BlockId(self.next_block);
		self.next_block += 1;
		self.function.blocks.push(BasicBlock::new(id));
		id
	}

	pub fn add_block_param(&mut self, block: BlockId, ty: IlType) -> TempId {
		let temp = self.fresh_temp(ty);
		self.function.block_mut(block).expect("block exists").params.push(BlockParam { temp, ty });
		temp
	}

	pub fn switch_to_block(&mut self, block: BlockId) {
		self.current = block;
	}

	pub fn current_block(&self) -> BlockId {
		self.current
	}

	pub fn current_is_terminated(&self) -> bool {
		self.function.block(self.current).is_some_and(BasicBlock::is_terminated)
	}

	/// Interns a string literal into this function's constant pool, reusing
	/// an existing entry if the same text was already interned.
	pub fn intern_string(&mut self, text: &str) -> u32 {
		if let Some(i) = self.function.string_pool.iter().position(|s| s == text) {
			return i as u32;
		}
		self.function.string_pool.push(text.to_string());
		(self.function.string_pool.len() - 1) as u32
	}

	fn fresh_temp(&mut self, ty: IlType) -> TempId {
		let id = TempId(self.next_temp);
		self.next_temp += 1;
		self.function.temp_types.insert(id, ty);
		id
	}

	fn push(&mut self, instr: Instr) {
		self.function.block_mut(self.current).expect("current block exists").push(instr);
	}

	pub fn binary(&mut self, op: Opcode, ty: IlType, lhs: Value, rhs: Value) -> TempId {
		let dst = self.fresh_temp(ty);
		self.push(Instr::Binary { op, dst, ty, lhs, rhs });
		dst
	}

	pub fn unary(&mut self, op: Opcode, ty: IlType, operand: Value) -> TempId {
		let dst = self.fresh_temp(ty);
		self.push(Instr::Unary { op, dst, ty, operand });
		dst
	}

	pub fn icmp(&mut self, predicate: Predicate, lhs: Value, rhs: Value) -> TempId {
		let dst = self.fresh_temp(IlType::Bool);
		self.push(Instr::ICmp { dst, lhs, rhs, predicate });
		dst
	}

	pub fn load(&mut self, ty: IlType, base: Value, offset: u32) -> TempId {
		let dst = self.fresh_temp(ty);
		self.push(Instr::Load { dst, ty, base, offset });
		dst
	}

	pub fn store(&mut self, base: Value, offset: u32, value: Value) {
		self.push(Instr::Store { base, offset, value });
	}

	pub fn alloc_object(&mut self, class_id: u32, size: u32) -> TempId {
		let dst = self.fresh_temp(IlType::Ref);
		self.push(Instr::AllocObject { dst, class_id, size });
		dst
	}

	pub fn alloc_array(&mut self, elem_ty: IlType, length: Value) -> TempId {
		let dst = self.fresh_temp(IlType::Ref);
		self.push(Instr::AllocArray { dst, elem_ty, length });
		dst
	}

	pub fn call_direct(&mut self, name: impl Into<String>, args: Vec<Value>, ret_ty: Option<IlType>) -> Option<TempId> {
		let dst = ret_ty.map(|ty| self.fresh_temp(ty));
		self.push(Instr::Call { dst, callee: CallTarget::Direct(name.into()), args, flags: CallFlags::empty() });
		dst
	}

	pub fn call_virtual(&mut self, slot: u32, args: Vec<Value>, ret_ty: Option<IlType>) -> Option<TempId> {
		let dst = ret_ty.map(|ty| self.fresh_temp(ty));
		self.push(Instr::Call { dst, callee: CallTarget::Virtual { slot }, args, flags: CallFlags::VIRTUAL });
		dst
	}

	pub fn eh_push(&mut self, handler_block: crate::il::instr::BlockId, exception_class_id: Option<u32>) {
		self.push(Instr::EhPush { handler_block, exception_class_id });
	}

	pub fn eh_pop(&mut self) {
		self.push(Instr::EhPop);
	}

	/// Declares a handler block's `(err: Error, tok: ResumeTok)` parameters
	/// and emits the mandatory `eh.entry` marker as the block's first
	/// instruction (spec §4.9).
	pub fn eh_entry(&mut self, handler_block: BlockId) -> (TempId, TempId) {
		let err = self.add_block_param(handler_block, IlType::Ref);
		let tok = self.add_block_param(handler_block, IlType::ResumeTok);
		self.push(Instr::EhEntry { err, tok });
		(err, tok)
	}

	pub fn raise(&mut self, exception: Value) {
		self.push(Instr::Raise { exception });
	}

	pub fn br(&mut self, target: BlockId, args: Vec<Value>) {
		self.terminate(Terminator::Br { target, args });
	}

	pub fn br_cond(&mut self, cond: Value, then_target: BlockId, then_args: Vec<Value>, else_target: BlockId, else_args: Vec<Value>) {
		self.terminate(Terminator::BrCond { cond, then_target, then_args, else_target, else_args });
	}

	pub fn ret(&mut self, value: Option<Value>) {
		self.terminate(Terminator::Ret { value });
	}

	pub fn resume_same(&mut self, tok: Value) {
		self.terminate(Terminator::ResumeSame { tok });
	}

	pub fn resume_label(&mut self, tok: Value, target: BlockId) {
		self.terminate(Terminator::ResumeLabel { tok, target });
	}

	fn terminate(&mut self, terminator: Terminator) {
		let block = self.function.block_mut(self.current).expect("current block exists");
		debug_assert!(!block.is_terminated(), "block already terminated");
		block.terminator = Some(terminator);
	}

	pub fn finish(self) -> Function {
		self.function
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builds_a_two_block_function_that_is_well_formed() {
		let mut builder = IrBuilder::new("Main.Run", vec![], IlType::I32);
		let then_block = builder.create_block();
		let cond = builder.icmp(Predicate::Eq, Value::ConstInt(1), Value::ConstInt(1));
		builder.br_cond(Value::Temp(cond), then_block, vec![], then_block, vec![]);
		builder.switch_to_block(then_block);
		builder.ret(Some(Value::ConstInt(0)));
		let function = builder.finish();
		assert!(function.is_well_formed());
	}
}
