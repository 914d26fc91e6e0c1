//! Liveness of blocks under constant folding, and call-site queries.

use murk_core::ir::{BlockId, FuncId, InstKind, Operand, Terminator, ValueId};
use murk_core::module::{Function, Module};
use std::collections::{HashMap, HashSet, VecDeque};

/// Blocks reachable from the entry once branches on literal comparisons are folded.
///
/// A `condbr` whose condition is a literal, or the result of an `icmp` of two integer
/// literals, only contributes the edge it would actually take. Every other terminator keeps
/// all of its edges.
pub fn live_blocks(func: &Function) -> HashSet<BlockId> {
    let mut folded: HashMap<ValueId, bool> = HashMap::new();
    for block in &func.blocks {
        for inst in &block.instructions {
            if let (Some(result), InstKind::ICmp { pred, lhs, rhs }) = (inst.result, &inst.kind) {
                if let (Some(l), Some(r)) = (lhs.as_int(), rhs.as_int()) {
                    folded.insert(result, pred.evaluate(l, r));
                }
            }
        }
    }

    let mut live = HashSet::new();
    let Some(entry) = func.entry_id() else {
        return live;
    };
    let mut queue = VecDeque::from([entry]);
    while let Some(id) = queue.pop_front() {
        if !live.insert(id) {
            continue;
        }
        let Some(block) = func.block(id) else {
            continue;
        };
        let next = match &block.terminator {
            Terminator::CondBr {
                cond,
                then_dest,
                else_dest,
            } => match constant_condition(cond, &folded) {
                Some(true) => vec![*then_dest],
                Some(false) => vec![*else_dest],
                None => vec![*then_dest, *else_dest],
            },
            other => other.successors(),
        };
        queue.extend(next.into_iter().filter(|b| !live.contains(b)));
    }
    live
}

fn constant_condition(cond: &Operand, folded: &HashMap<ValueId, bool>) -> Option<bool> {
    match cond {
        Operand::Int { .. } => cond.as_int().map(|v| v != 0),
        Operand::Value(v) => folded.get(v).copied(),
        _ => None,
    }
}

/// How a function is referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseKind {
    /// Direct call instruction.
    Call,
    /// The function's address is used as an operand.
    Address,
}

/// One reference to a function from inside a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub caller: FuncId,
    pub block: BlockId,
    /// Instruction index within the block; `None` for the terminator.
    pub index: Option<usize>,
    pub kind: UseKind,
}

/// Every call to, and every address-taking use of, `target` in the module.
pub fn call_sites(module: &Module, target: FuncId) -> Vec<CallSite> {
    let mut sites = Vec::new();
    for (caller, func) in module.iter_functions() {
        for block in &func.blocks {
            for (index, inst) in block.instructions.iter().enumerate() {
                let site = |kind| CallSite {
                    caller,
                    block: block.id,
                    index: Some(index),
                    kind,
                };
                if let InstKind::Call { callee, .. } = &inst.kind {
                    if *callee == target {
                        sites.push(site(UseKind::Call));
                    }
                }
                if inst.kind.operands().into_iter().any(|op| *op == Operand::Func(target)) {
                    sites.push(site(UseKind::Address));
                }
            }
            if block
                .terminator
                .operands()
                .into_iter()
                .any(|op| *op == Operand::Func(target))
            {
                sites.push(CallSite {
                    caller,
                    block: block.id,
                    index: None,
                    kind: UseKind::Address,
                });
            }
        }
    }
    sites
}

/// Whether anything in the module refers to `target`.
pub fn is_referenced(module: &Module, target: FuncId) -> bool {
    !call_sites(module, target).is_empty()
}
