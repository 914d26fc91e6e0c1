//! Structural well-formedness checks for a [`Module`].
//!
//! The verifier is what lets transforms be tested as "the module still makes sense": every
//! symbol is unique, every branch lands on a block that exists, the entry block has no
//! predecessors, and every SSA use is dominated by its definition.

use crate::cfg_ir::ControlFlowGraph;
use crate::ir::{BlockId, InstKind, Operand, Type, ValueId};
use crate::module::{Constant, Function, Module};
use murk_utils::errors::VerifyError;
use std::collections::{HashMap, HashSet};

/// Verifies the whole module, stopping at the first problem found.
pub fn verify_module(module: &Module) -> Result<(), VerifyError> {
    let mut names = HashSet::new();
    let symbol_names = module
        .globals
        .iter()
        .map(|g| &g.name)
        .chain(module.functions.iter().map(|f| &f.name));
    for name in symbol_names {
        if !names.insert(name.as_str()) {
            return Err(VerifyError::DuplicateSymbol(name.clone()));
        }
    }

    for global in &module.globals {
        if let (Some(Constant::Bytes(bytes)), Type::Array { len, .. }) =
            (&global.initializer, &global.ty)
        {
            if bytes.len() != *len {
                return Err(VerifyError::InitializerMismatch(global.name.clone()));
            }
        }
    }

    for func in &module.functions {
        verify_function(module, func)?;
    }
    Ok(())
}

/// Verifies one function against the module it belongs to.
pub fn verify_function(module: &Module, func: &Function) -> Result<(), VerifyError> {
    if func.is_declaration() {
        if !func.linkage.is_externally_visible() {
            return Err(VerifyError::HiddenDeclaration(func.name.clone()));
        }
        return Ok(());
    }

    let mut block_ids = HashSet::new();
    for block in &func.blocks {
        if !block_ids.insert(block.id) {
            return Err(VerifyError::DuplicateBlock {
                func: func.name.clone(),
                block: block.id.0,
            });
        }
    }

    for block in &func.blocks {
        for target in block.terminator.successors() {
            if !block_ids.contains(&target) {
                return Err(VerifyError::MissingTarget {
                    func: func.name.clone(),
                    block: block.id.0,
                    target: target.0,
                });
            }
        }
    }

    if let Some(entry) = func.entry_id() {
        if !func.predecessors(entry).is_empty() {
            return Err(VerifyError::EntryHasPredecessors {
                func: func.name.clone(),
                block: entry.0,
            });
        }
    }

    // value -> (defining block, index within block)
    let mut defs: HashMap<ValueId, (BlockId, usize)> = HashMap::new();
    for block in &func.blocks {
        for (idx, inst) in block.instructions.iter().enumerate() {
            if let Some(value) = inst.result {
                if defs.insert(value, (block.id, idx)).is_some() {
                    return Err(VerifyError::Redefinition {
                        func: func.name.clone(),
                        value: value.0,
                    });
                }
            }
        }
    }

    let graph = ControlFlowGraph::build(func);
    let reachable = graph.reachable();
    let Some(doms) = graph.dominators() else {
        return Ok(());
    };

    let checker = UseChecker {
        module,
        func,
        defs: &defs,
        graph: &graph,
        doms: &doms,
        reachable: &reachable,
    };

    for block in &func.blocks {
        for (idx, inst) in block.instructions.iter().enumerate() {
            match &inst.kind {
                InstKind::Phi { incoming } => {
                    for (operand, pred) in incoming {
                        checker.check_phi_operand(operand, *pred)?;
                    }
                }
                InstKind::Call { callee, args } => {
                    let target = module.function(*callee).ok_or_else(|| {
                        VerifyError::MissingFunction {
                            func: func.name.clone(),
                            callee: callee.0,
                        }
                    })?;
                    if target.params.len() != args.len() {
                        return Err(VerifyError::ArityMismatch {
                            func: func.name.clone(),
                            callee: target.name.clone(),
                            expected: target.params.len(),
                            got: args.len(),
                        });
                    }
                    for operand in args {
                        checker.check_operand(operand, block.id, idx)?;
                    }
                }
                kind => {
                    for operand in kind.operands() {
                        checker.check_operand(operand, block.id, idx)?;
                    }
                }
            }
        }
        for operand in block.terminator.operands() {
            checker.check_operand(operand, block.id, block.instructions.len())?;
        }
    }

    Ok(())
}

struct UseChecker<'a> {
    module: &'a Module,
    func: &'a Function,
    defs: &'a HashMap<ValueId, (BlockId, usize)>,
    graph: &'a ControlFlowGraph,
    doms: &'a petgraph::algo::dominators::Dominators<petgraph::graph::NodeIndex>,
    reachable: &'a HashSet<BlockId>,
}

impl UseChecker<'_> {
    /// Checks an operand used at position `idx` of `block`.
    fn check_operand(
        &self,
        operand: &Operand,
        block: BlockId,
        idx: usize,
    ) -> Result<(), VerifyError> {
        let Operand::Value(value) = operand else {
            return self.check_non_value(operand);
        };
        let (def_block, def_idx) = self.definition(*value)?;
        let ok = if def_block == block {
            def_idx < idx
        } else {
            // uses in dead code are not constrained by dominance
            !self.reachable.contains(&block) || self.graph.dominates(self.doms, def_block, block)
        };
        if ok {
            Ok(())
        } else {
            Err(VerifyError::NotDominated {
                func: self.func.name.clone(),
                value: value.0,
                block: block.0,
            })
        }
    }

    /// Phi inputs must be available at the end of their incoming block.
    fn check_phi_operand(&self, operand: &Operand, pred: BlockId) -> Result<(), VerifyError> {
        let Operand::Value(value) = operand else {
            return self.check_non_value(operand);
        };
        let (def_block, _) = self.definition(*value)?;
        if !self.reachable.contains(&pred) || self.graph.dominates(self.doms, def_block, pred) {
            Ok(())
        } else {
            Err(VerifyError::NotDominated {
                func: self.func.name.clone(),
                value: value.0,
                block: pred.0,
            })
        }
    }

    fn definition(&self, value: ValueId) -> Result<(BlockId, usize), VerifyError> {
        self.defs
            .get(&value)
            .copied()
            .ok_or_else(|| VerifyError::UndefinedValue {
                func: self.func.name.clone(),
                value: value.0,
            })
    }

    fn check_non_value(&self, operand: &Operand) -> Result<(), VerifyError> {
        match operand {
            Operand::Param(index) if (*index as usize) >= self.func.params.len() => {
                Err(VerifyError::BadParam {
                    func: self.func.name.clone(),
                    index: *index,
                })
            }
            Operand::Global(id) if self.module.global(*id).is_none() => {
                Err(VerifyError::MissingGlobal {
                    func: self.func.name.clone(),
                    global: id.0,
                })
            }
            Operand::Func(id) if self.module.function(*id).is_none() => {
                Err(VerifyError::MissingFunction {
                    func: self.func.name.clone(),
                    callee: id.0,
                })
            }
            _ => Ok(()),
        }
    }
}
