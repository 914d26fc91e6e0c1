//! In-memory IR for murk: modules, globals, functions in SSA form, and the structural
//! operations obfuscation passes build on (CFG view, block edits, verification, printing).

pub mod builder;
pub mod cfg_ir;
pub mod ir;
pub mod module;
pub mod printer;
pub mod verify;

pub use builder::FunctionBuilder;
pub use cfg_ir::{ControlFlowGraph, EdgeType};
pub use ir::{
    BasicBlock, BinaryOp, BlockId, CmpPredicate, FuncId, GlobalId, InstKind, Instruction,
    Operand, Terminator, Type, ValueId,
};
pub use module::{Constant, ConstantBytes, Function, Global, Linkage, Module, OBFUSCATED_SUFFIX};
pub use verify::{verify_function, verify_module};
