//! IL instructions (spec §4.9). `define_opcodes!` generates the bare
//! [`Opcode`] tag (used for quick dispatch/debug printing) alongside the
//! richer [`Instr`] payload enum that actually carries operands.

use crate::il::types::IlType;
use bitflags::bitflags;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TempId(pub u32);

/// The derived `Hash` impl writes exactly the wrapped `u32`, so the value
/// is already well distributed for `nohash_hasher::BuildNoHashHasher`.
impl nohash_hasher::IsEnabled for TempId {}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BlockId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Value {
	Temp(TempId),
	ConstInt(i64),
	ConstFloat(f64),
	ConstBool(bool),
	/// Index into the owning [`crate::il::function::Function`]'s
	/// `string_pool`, resolved to a boxed string at module-init time.
	StringConst(u32),
	Null,
}

bitflags! {
	/// Flags on a `call` instruction. `VIRTUAL` dispatches through the
	/// callee object's vtable slot rather than a direct function reference.
	#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
	pub struct CallFlags: u8 {
		const VIRTUAL = 0b0000_0001;
		const TAIL    = 0b0000_0010;
	}
}

macro_rules! define_opcodes {
	($($variant:ident => $doc:literal),+ $(,)?) => {
		#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
		pub enum Opcode {
			$(#[doc = $doc] $variant),+
		}
	};
}

define_opcodes! {
	// Signed-integer arithmetic (spec §4.8): traps on overflow/zero-divisor
	// rather than wrapping, named after the original's `IAddOvf` family.
	IAddOvf => "checked signed-integer add; traps on overflow",
	ISubOvf => "checked signed-integer subtract; traps on overflow",
	IMulOvf => "checked signed-integer multiply; traps on overflow",
	SDivChk0 => "checked signed-integer division; traps on zero divisor or overflow",
	SRemChk0 => "checked signed-integer remainder; traps on zero divisor",
	// Floating-point arithmetic: IEEE-754 semantics, no overflow trap.
	FAdd => "floating-point add",
	FSub => "floating-point subtract",
	FMul => "floating-point multiply",
	FDiv => "floating-point divide",
	Neg => "arithmetic negation",
	Not => "boolean/bitwise complement",
	Or => "eager (non-short-circuiting) boolean or, used for multi-label case dispatch",
	ICmp => "integer/float comparison, result type Bool",
	Load => "load a value from a field offset or array element",
	Store => "store a value to a field offset or array element",
	AllocObject => "allocate a zeroed instance of a class and set its vtable pointer",
	AllocArray => "allocate a zeroed array of a given element type and length",
	Call => "direct or virtual call; see CallFlags",
	Br => "unconditional branch, passing block-parameter arguments",
    BrCond => "conditional branch to one of two targets",
	Ret => "return from the current function, optionally with a value",
	EhPush => "push an exception handler frame onto the implicit handler stack",
	EhPop => "pop the most recently pushed handler frame",
	EhEntry => "marks a handler block's entry point; must be the block's first instruction",
	ResumeSame => "resume execution at the instruction after the one that raised",
	ResumeLabel => "resume execution at a specific handler-provided block",
	Raise => "raise an exception object, unwinding to the nearest handler",
}

/// A block parameter: since there are no phi nodes, a value coming from
/// multiple predecessors is declared as a parameter on the successor block
/// and supplied as an argument by every `br`/`br_cond` that targets it.
#[derive(Debug, Copy, Clone)]
pub struct BlockParam {
	pub temp: TempId,
	pub ty: IlType,
}

#[derive(Debug, Clone)]
pub enum Instr {
	Binary { op: Opcode, dst: TempId, ty: IlType, lhs: Value, rhs: Value },
	Unary { op: Opcode, dst: TempId, ty: IlType, operand: Value },
	ICmp { dst: TempId, lhs: Value, rhs: Value, predicate: Predicate },
	Load { dst: TempId, ty: IlType, base: Value, offset: u32 },
	Store { base: Value, offset: u32, value: Value },
	AllocObject { dst: TempId, class_id: u32, size: u32 },
	AllocArray { dst: TempId, elem_ty: IlType, length: Value },
	Call { dst: Option<TempId>, callee: CallTarget, args: Vec<Value>, flags: CallFlags },
	EhPush { handler_block: BlockId, exception_class_id: Option<u32> },
	EhPop,
	/// First instruction of a handler block (spec §4.9); `err`/`tok` name the
	/// block's own `(Error, ResumeTok)` parameters for readability at the IL
	/// level, they are not separately defined here.
	EhEntry { err: TempId, tok: TempId },
	Raise { exception: Value },
}

#[derive(Debug, Clone)]
pub enum CallTarget {
	Direct(String),
	/// Virtual dispatch: the vtable slot index to invoke on `this`, which is
	/// always `args[0]` for an instance call.
	Virtual { slot: u32 },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Predicate {
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
}

#[derive(Debug, Clone)]
pub enum Terminator {
	Br { target: BlockId, args: Vec<Value> },
	BrCond { cond: Value, then_target: BlockId, then_args: Vec<Value>, else_target: BlockId, else_args: Vec<Value> },
	Ret { value: Option<Value> },
	/// Resume an in-flight exception at the instruction following the one
	/// that raised it: a bare `raise;` re-throwing the handler's own bound
	/// exception (the handler reached the end of its body abnormally).
	ResumeSame { tok: Value },
	/// Resume at a specific block (the handler's fallthrough continuation),
	/// e.g. a `finally`-equivalent continuation.
	ResumeLabel { tok: Value, target: BlockId },
	Unreachable,
}
