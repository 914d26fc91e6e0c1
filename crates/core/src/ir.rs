//! Instruction-level IR: types, operands, instructions, terminators and basic blocks.
//!
//! A function body is a list of [`BasicBlock`]s. Each block owns its instructions and ends in
//! exactly one [`Terminator`]; control edges are implied by terminator targets. Instructions
//! produce at most one [`ValueId`], which later instructions consume by reference through
//! [`Operand::Value`].

use serde::{Deserialize, Serialize};

/// Index of a global in [`crate::module::Module::globals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalId(pub usize);

/// Index of a function in [`crate::module::Module::functions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FuncId(pub usize);

/// Function-local identifier of a basic block. Stable across layout changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

/// Function-local SSA value produced by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueId(pub u32);

/// First-class types of the IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    I1,
    I8,
    I32,
    I64,
    Ptr,
    Array { elem: Box<Type>, len: usize },
}

impl Type {
    /// Byte array type `[len x i8]`, the type of string literals.
    pub fn bytes(len: usize) -> Self {
        Self::Array {
            elem: Box::new(Self::I8),
            len,
        }
    }

    /// Bit width of integer types.
    pub const fn bit_width(&self) -> Option<u32> {
        match self {
            Self::I1 => Some(1),
            Self::I8 => Some(8),
            Self::I32 => Some(32),
            Self::I64 => Some(64),
            _ => None,
        }
    }

    /// Wraps `value` to this type's width and sign-extends it back to `i64`.
    ///
    /// `i1` is kept as 0/1 rather than sign-extended so that comparison results read naturally.
    pub fn truncate(&self, value: i64) -> i64 {
        match self.bit_width() {
            Some(1) => value & 1,
            Some(bits) if bits < 64 => {
                let shift = 64 - bits;
                (value << shift) >> shift
            }
            _ => value,
        }
    }
}

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Xor,
    And,
    Or,
}

impl BinaryOp {
    /// Evaluates the operator with two's-complement wrapping at the width of `ty`.
    pub fn evaluate(self, lhs: i64, rhs: i64, ty: &Type) -> i64 {
        let raw = match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Mul => lhs.wrapping_mul(rhs),
            Self::Xor => lhs ^ rhs,
            Self::And => lhs & rhs,
            Self::Or => lhs | rhs,
        };
        ty.truncate(raw)
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Xor => "xor",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Signed integer comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl CmpPredicate {
    pub const fn evaluate(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Slt => lhs < rhs,
            Self::Sle => lhs <= rhs,
            Self::Sgt => lhs > rhs,
            Self::Sge => lhs >= rhs,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Slt => "slt",
            Self::Sle => "sle",
            Self::Sgt => "sgt",
            Self::Sge => "sge",
        }
    }
}

/// An instruction input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// Result of an earlier instruction in the same function.
    Value(ValueId),
    /// Formal parameter by position.
    Param(u32),
    /// Integer literal.
    Int { ty: Type, value: i64 },
    /// Address of a module global.
    Global(GlobalId),
    /// Address of a module function.
    Func(FuncId),
}

impl Operand {
    pub const fn i32(value: i32) -> Self {
        Self::Int {
            ty: Type::I32,
            value: value as i64,
        }
    }

    pub const fn i64(value: i64) -> Self {
        Self::Int {
            ty: Type::I64,
            value,
        }
    }

    pub const fn as_value(&self) -> Option<ValueId> {
        match self {
            Self::Value(id) => Some(*id),
            _ => None,
        }
    }

    /// Literal value, already wrapped to its type.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int { ty, value } => Some(ty.truncate(*value)),
            _ => None,
        }
    }
}

/// Operation performed by an [`Instruction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstKind {
    Binary {
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    },
    ICmp {
        pred: CmpPredicate,
        lhs: Operand,
        rhs: Operand,
    },
    /// Reserves one stack slot of `allocated` and yields its address.
    Alloca { allocated: Type },
    Load { ptr: Operand },
    Store { value: Operand, ptr: Operand },
    Call { callee: FuncId, args: Vec<Operand> },
    /// SSA merge; one incoming value per predecessor block.
    Phi { incoming: Vec<(Operand, BlockId)> },
}

impl InstKind {
    /// All operands read by the instruction, phi inputs included.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Self::Binary { lhs, rhs, .. } | Self::ICmp { lhs, rhs, .. } => vec![lhs, rhs],
            Self::Alloca { .. } => Vec::new(),
            Self::Load { ptr } => vec![ptr],
            Self::Store { value, ptr } => vec![value, ptr],
            Self::Call { args, .. } => args.iter().collect(),
            Self::Phi { incoming } => incoming.iter().map(|(op, _)| op).collect(),
        }
    }

    pub const fn is_phi(&self) -> bool {
        matches!(self, Self::Phi { .. })
    }
}

/// A typed operation producing at most one result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// The value this instruction defines, if any.
    pub result: Option<ValueId>,
    /// Result type (`Void` for stores and void calls).
    pub ty: Type,
    pub kind: InstKind,
}

/// Block-ending control transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminator {
    Br {
        target: BlockId,
    },
    CondBr {
        cond: Operand,
        then_dest: BlockId,
        else_dest: BlockId,
    },
    Ret {
        value: Option<Operand>,
    },
    Unreachable,
}

impl Terminator {
    /// Successor blocks in edge order (`then` before `else`).
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Self::Br { target } => vec![*target],
            Self::CondBr {
                then_dest,
                else_dest,
                ..
            } => vec![*then_dest, *else_dest],
            Self::Ret { .. } | Self::Unreachable => Vec::new(),
        }
    }

    /// Rewrites every edge to `from` so it points at `to`. Returns whether anything changed.
    pub fn replace_target(&mut self, from: BlockId, to: BlockId) -> bool {
        let mut changed = false;
        let mut swap = |slot: &mut BlockId| {
            if *slot == from {
                *slot = to;
                changed = true;
            }
        };
        match self {
            Self::Br { target } => swap(target),
            Self::CondBr {
                then_dest,
                else_dest,
                ..
            } => {
                swap(then_dest);
                swap(else_dest);
            }
            Self::Ret { .. } | Self::Unreachable => {}
        }
        changed
    }

    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Self::CondBr { cond, .. } => vec![cond],
            Self::Ret { value: Some(value) } => vec![value],
            _ => Vec::new(),
        }
    }
}

/// A straight-line instruction sequence ending in one terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    /// Human-readable label used by the printer and DOT output.
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn new(id: BlockId, label: impl Into<String>, terminator: Terminator) -> Self {
        Self {
            id,
            label: label.into(),
            instructions: Vec::new(),
            terminator,
        }
    }

    /// Number of leading phi instructions.
    pub fn phi_count(&self) -> usize {
        self.instructions
            .iter()
            .take_while(|inst| inst.kind.is_phi())
            .count()
    }

    pub fn has_phis(&self) -> bool {
        self.phi_count() > 0
    }

    /// Renames predecessor `from` to `to` in every phi of this block.
    pub fn retarget_phis(&mut self, from: BlockId, to: BlockId) {
        for inst in &mut self.instructions {
            if let InstKind::Phi { incoming } = &mut inst.kind {
                for (_, pred) in incoming.iter_mut() {
                    if *pred == from {
                        *pred = to;
                    }
                }
            }
        }
    }

    /// Values defined in this block, in order.
    pub fn defined_values(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.instructions.iter().filter_map(|inst| inst.result)
    }
}
