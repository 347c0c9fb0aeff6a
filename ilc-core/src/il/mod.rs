//! Typed, basic-block-parameterized IL (spec §4.9): the common lowering
//! target for all three frontends. No SSA phi nodes; a block that needs a
//! value from multiple predecessors declares it as a block parameter
//! instead, the way the original's lowerer does.

pub mod block;
pub mod builder;
pub mod function;
pub mod instr;
pub mod module;
pub mod types;

pub use block::BasicBlock;
pub use builder::IrBuilder;
pub use function::Function;
pub use instr::{Instr, Opcode};
pub use module::Module;
pub use types::IlType;
