//! Incremental construction of function bodies.
//!
//! [`FunctionBuilder`] keeps a cursor on one block and appends instructions there, allocating a
//! fresh [`ValueId`] for every instruction that produces a result. Blocks start out terminated
//! by `unreachable` until a terminator is set.
//!
//! ```rust,ignore
//! let mut b = FunctionBuilder::new("twice", Linkage::Internal, vec![Type::I32], Type::I32);
//! b.block("entry");
//! let x = b.param(0);
//! let y = b.binary(BinaryOp::Add, Type::I32, x.clone(), x);
//! b.ret(Some(y));
//! let function = b.finish();
//! ```

use crate::ir::{
    BasicBlock, BinaryOp, BlockId, CmpPredicate, FuncId, InstKind, Instruction, Operand,
    Terminator, Type, ValueId,
};
use crate::module::{Function, Linkage};
use murk_utils::errors::IrError;

/// Builder for a single [`Function`].
#[derive(Debug)]
pub struct FunctionBuilder {
    func: Function,
    /// Layout index of the block receiving instructions.
    cursor: Option<usize>,
    /// Ids are handed out in order; the body starts empty.
    next_block: u32,
    next_value: u32,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>, linkage: Linkage, params: Vec<Type>, ret: Type) -> Self {
        Self {
            func: Function::new(name, linkage, params, ret),
            cursor: None,
            next_block: 0,
            next_value: 0,
        }
    }

    /// Appends a new block and moves the cursor to it.
    pub fn block(&mut self, label: impl Into<String>) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        self.func
            .blocks
            .push(BasicBlock::new(id, label, Terminator::Unreachable));
        self.cursor = Some(self.func.blocks.len() - 1);
        id
    }

    /// Moves the cursor to an existing block.
    pub fn position_at(&mut self, id: BlockId) -> Result<(), IrError> {
        let pos = self
            .func
            .block_position(id)
            .ok_or(IrError::UnknownBlock(id.0))?;
        self.cursor = Some(pos);
        Ok(())
    }

    pub fn param(&self, index: u32) -> Operand {
        Operand::Param(index)
    }

    pub fn binary(&mut self, op: BinaryOp, ty: Type, lhs: Operand, rhs: Operand) -> Operand {
        self.push_value(ty, InstKind::Binary { op, lhs, rhs })
    }

    pub fn icmp(&mut self, pred: CmpPredicate, lhs: Operand, rhs: Operand) -> Operand {
        self.push_value(Type::I1, InstKind::ICmp { pred, lhs, rhs })
    }

    pub fn alloca(&mut self, allocated: Type) -> Operand {
        self.push_value(Type::Ptr, InstKind::Alloca { allocated })
    }

    pub fn load(&mut self, ty: Type, ptr: Operand) -> Operand {
        self.push_value(ty, InstKind::Load { ptr })
    }

    pub fn store(&mut self, value: Operand, ptr: Operand) {
        self.push(Instruction {
            result: None,
            ty: Type::Void,
            kind: InstKind::Store { value, ptr },
        });
    }

    /// Emits a call; returns the result operand unless `ret` is `Void`.
    pub fn call(&mut self, callee: FuncId, ret: Type, args: Vec<Operand>) -> Option<Operand> {
        let kind = InstKind::Call { callee, args };
        if ret == Type::Void {
            self.push(Instruction {
                result: None,
                ty: ret,
                kind,
            });
            None
        } else {
            Some(self.push_value(ret, kind))
        }
    }

    pub fn phi(&mut self, ty: Type, incoming: Vec<(Operand, BlockId)>) -> Operand {
        self.push_value(ty, InstKind::Phi { incoming })
    }

    pub fn br(&mut self, target: BlockId) {
        self.terminate(Terminator::Br { target });
    }

    pub fn cond_br(&mut self, cond: Operand, then_dest: BlockId, else_dest: BlockId) {
        self.terminate(Terminator::CondBr {
            cond,
            then_dest,
            else_dest,
        });
    }

    pub fn ret(&mut self, value: Option<Operand>) {
        self.terminate(Terminator::Ret { value });
    }

    pub fn finish(self) -> Function {
        self.func
    }

    fn push_value(&mut self, ty: Type, kind: InstKind) -> Operand {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        self.push(Instruction {
            result: Some(id),
            ty,
            kind,
        });
        Operand::Value(id)
    }

    fn push(&mut self, inst: Instruction) {
        self.current().instructions.push(inst);
    }

    fn terminate(&mut self, terminator: Terminator) {
        self.current().terminator = terminator;
    }

    /// Block under the cursor; an `entry` block is created on first use.
    fn current(&mut self) -> &mut BasicBlock {
        let pos = match self.cursor {
            Some(pos) => pos,
            None => {
                self.block("entry");
                self.func.blocks.len() - 1
            }
        };
        &mut self.func.blocks[pos]
    }
}
