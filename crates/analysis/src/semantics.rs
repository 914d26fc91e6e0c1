//! Reference interpreter used to compare a module's observable behaviour before and after
//! transforms.
//!
//! Observable behaviour is the return value of the called function plus the ordered list of
//! calls that leave the module (calls to declarations). Pointer arguments to such calls that
//! name a byte-string global are recorded as the global's current bytes, so a rewritten
//! string literal shows up as a behaviour change.

use murk_core::ir::{
    BlockId, CmpPredicate, FuncId, GlobalId, InstKind, Operand, Terminator, Type, ValueId,
};
use murk_core::module::{Constant, Function, Module};
use murk_utils::errors::EvalError;
use std::collections::HashMap;

/// Default step budget shared by all frames of one [`Interpreter::call`].
pub const DEFAULT_FUEL: usize = 100_000;

/// Something a pointer can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pointer {
    /// A stack slot created by `alloca`.
    Slot(usize),
    Global(GlobalId),
    Func(FuncId),
}

/// A runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtValue {
    Int(i64),
    Ptr(Pointer),
}

impl RtValue {
    fn int(self) -> Result<i64, EvalError> {
        match self {
            Self::Int(v) => Ok(v),
            Self::Ptr(_) => Err(EvalError::NotAnInteger),
        }
    }

    fn ptr(self) -> Result<Pointer, EvalError> {
        match self {
            Self::Ptr(p) => Ok(p),
            Self::Int(_) => Err(EvalError::NotAPointer),
        }
    }
}

/// Argument of a call that leaves the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternArg {
    Int(i64),
    /// Current contents of a byte-string global.
    Bytes(Vec<u8>),
    /// Any other pointer.
    Pointer,
}

/// One call to a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternCall {
    pub name: String,
    pub args: Vec<ExternArg>,
}

/// Result of running a function to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    pub ret: Option<i64>,
    pub externs: Vec<ExternCall>,
    pub steps: usize,
}

/// Executes functions of one module.
#[derive(Debug)]
pub struct Interpreter<'m> {
    module: &'m Module,
    fuel: usize,
    steps: usize,
    slots: Vec<i64>,
    /// Integer globals written during execution.
    memory: HashMap<GlobalId, i64>,
    externs: Vec<ExternCall>,
}

struct Frame {
    args: Vec<RtValue>,
    values: HashMap<ValueId, RtValue>,
}

impl<'m> Interpreter<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self::with_fuel(module, DEFAULT_FUEL)
    }

    pub fn with_fuel(module: &'m Module, fuel: usize) -> Self {
        Self {
            module,
            fuel,
            steps: 0,
            slots: Vec::new(),
            memory: HashMap::new(),
            externs: Vec::new(),
        }
    }

    /// Runs `func` with integer arguments. Global writes from earlier calls on the same
    /// interpreter are kept; the extern log and step count start fresh.
    pub fn call(&mut self, func: FuncId, args: &[i64]) -> Result<ExecOutcome, EvalError> {
        self.steps = 0;
        self.externs.clear();
        let args = args.iter().map(|&v| RtValue::Int(v)).collect();
        let ret = self.invoke(func, args)?.map(RtValue::int).transpose()?;
        Ok(ExecOutcome {
            ret,
            externs: std::mem::take(&mut self.externs),
            steps: self.steps,
        })
    }

    fn invoke(&mut self, id: FuncId, args: Vec<RtValue>) -> Result<Option<RtValue>, EvalError> {
        let module = self.module;
        let func = module
            .function(id)
            .ok_or_else(|| EvalError::NoBody(format!("#{}", id.0)))?;
        if func.params.len() != args.len() {
            return Err(EvalError::ArgCount {
                expected: func.params.len(),
                got: args.len(),
            });
        }
        if func.is_declaration() {
            return Ok(self.call_extern(func, &args));
        }

        let mut frame = Frame {
            args,
            values: HashMap::new(),
        };
        let mut prev: Option<BlockId> = None;
        let mut current = func
            .entry_id()
            .ok_or_else(|| EvalError::NoBody(func.name.clone()))?;

        loop {
            let block = func
                .block(current)
                .ok_or(EvalError::UnknownBlock(current.0))?;

            // phis read the incoming frame all at once
            let phis = block.phi_count();
            let mut merged = Vec::with_capacity(phis);
            for inst in &block.instructions[..phis] {
                let InstKind::Phi { incoming } = &inst.kind else {
                    continue;
                };
                let pred = prev.ok_or(EvalError::PhiMismatch {
                    block: current.0,
                    pred: current.0,
                })?;
                let (operand, _) = incoming
                    .iter()
                    .find(|(_, from)| *from == pred)
                    .ok_or(EvalError::PhiMismatch {
                        block: current.0,
                        pred: pred.0,
                    })?;
                merged.push((inst.result, self.operand(&frame, operand)?));
            }
            for (result, value) in merged {
                if let Some(result) = result {
                    frame.values.insert(result, value);
                }
            }

            for inst in &block.instructions[phis..] {
                self.tick()?;
                let value = self.execute(&frame, &inst.ty, &inst.kind)?;
                if let (Some(result), Some(value)) = (inst.result, value) {
                    frame.values.insert(result, value);
                }
            }

            self.tick()?;
            let next = match &block.terminator {
                Terminator::Br { target } => *target,
                Terminator::CondBr {
                    cond,
                    then_dest,
                    else_dest,
                } => {
                    if self.operand(&frame, cond)?.int()? != 0 {
                        *then_dest
                    } else {
                        *else_dest
                    }
                }
                Terminator::Ret { value } => {
                    return value.as_ref().map(|v| self.operand(&frame, v)).transpose();
                }
                Terminator::Unreachable => return Err(EvalError::Unreachable(func.name.clone())),
            };
            prev = Some(current);
            current = next;
        }
    }

    fn execute(
        &mut self,
        frame: &Frame,
        ty: &Type,
        kind: &InstKind,
    ) -> Result<Option<RtValue>, EvalError> {
        let value = match kind {
            InstKind::Binary { op, lhs, rhs } => {
                let l = self.operand(frame, lhs)?.int()?;
                let r = self.operand(frame, rhs)?.int()?;
                Some(RtValue::Int(op.evaluate(l, r, ty)))
            }
            InstKind::ICmp { pred, lhs, rhs } => {
                let l = self.operand(frame, lhs)?;
                let r = self.operand(frame, rhs)?;
                let holds = match (l, r) {
                    (RtValue::Int(l), RtValue::Int(r)) => pred.evaluate(l, r),
                    (l, r) => match pred {
                        CmpPredicate::Eq => l == r,
                        CmpPredicate::Ne => l != r,
                        _ => return Err(EvalError::NotAnInteger),
                    },
                };
                Some(RtValue::Int(i64::from(holds)))
            }
            InstKind::Alloca { .. } => {
                self.slots.push(0);
                Some(RtValue::Ptr(Pointer::Slot(self.slots.len() - 1)))
            }
            InstKind::Load { ptr } => {
                let ptr = self.operand(frame, ptr)?.ptr()?;
                Some(RtValue::Int(ty.truncate(self.load(ptr)?)))
            }
            InstKind::Store { value, ptr } => {
                let value = self.operand(frame, value)?.int()?;
                let ptr = self.operand(frame, ptr)?.ptr()?;
                self.store(ptr, value)?;
                None
            }
            InstKind::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|a| self.operand(frame, a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.invoke(*callee, args)?
            }
            InstKind::Phi { .. } => None,
        };
        Ok(value)
    }

    fn operand(&self, frame: &Frame, operand: &Operand) -> Result<RtValue, EvalError> {
        match operand {
            Operand::Value(id) => frame
                .values
                .get(id)
                .copied()
                .ok_or(EvalError::Unset(id.0)),
            Operand::Param(index) => {
                frame
                    .args
                    .get(*index as usize)
                    .copied()
                    .ok_or(EvalError::ArgCount {
                        expected: *index as usize + 1,
                        got: frame.args.len(),
                    })
            }
            Operand::Int { ty, value } => Ok(RtValue::Int(ty.truncate(*value))),
            Operand::Global(id) => Ok(RtValue::Ptr(Pointer::Global(*id))),
            Operand::Func(id) => Ok(RtValue::Ptr(Pointer::Func(*id))),
        }
    }

    fn load(&self, ptr: Pointer) -> Result<i64, EvalError> {
        match ptr {
            Pointer::Slot(slot) => self.slots.get(slot).copied().ok_or(EvalError::NotAPointer),
            Pointer::Global(id) => {
                if let Some(value) = self.memory.get(&id) {
                    return Ok(*value);
                }
                match self.module.global(id).and_then(|g| g.initializer.as_ref()) {
                    Some(Constant::Int { ty, value }) => Ok(ty.truncate(*value)),
                    Some(Constant::Zero(_)) | None => Ok(0),
                    Some(Constant::Bytes(_)) => Err(EvalError::NotAnInteger),
                }
            }
            Pointer::Func(_) => Err(EvalError::NotAPointer),
        }
    }

    fn store(&mut self, ptr: Pointer, value: i64) -> Result<(), EvalError> {
        match ptr {
            Pointer::Slot(slot) => {
                let cell = self.slots.get_mut(slot).ok_or(EvalError::NotAPointer)?;
                *cell = value;
            }
            Pointer::Global(id) => {
                self.memory.insert(id, value);
            }
            Pointer::Func(_) => return Err(EvalError::NotAPointer),
        }
        Ok(())
    }

    fn call_extern(&mut self, func: &Function, args: &[RtValue]) -> Option<RtValue> {
        let args = args
            .iter()
            .map(|arg| match arg {
                RtValue::Int(v) => ExternArg::Int(*v),
                RtValue::Ptr(Pointer::Global(id)) => self
                    .module
                    .global(*id)
                    .and_then(|g| g.initializer.as_ref())
                    .and_then(Constant::as_bytes)
                    .map(|bytes| ExternArg::Bytes(bytes.as_bytes().to_vec()))
                    .unwrap_or(ExternArg::Pointer),
                RtValue::Ptr(_) => ExternArg::Pointer,
            })
            .collect::<Vec<_>>();
        for arg in &args {
            if let ExternArg::Bytes(bytes) = arg {
                tracing::trace!("{}(0x{})", func.name, hex::encode(bytes));
            }
        }
        self.externs.push(ExternCall {
            name: func.name.clone(),
            args,
        });
        (func.ret != Type::Void).then_some(RtValue::Int(0))
    }

    fn tick(&mut self) -> Result<(), EvalError> {
        self.steps += 1;
        if self.steps > self.fuel {
            return Err(EvalError::OutOfFuel);
        }
        Ok(())
    }
}
