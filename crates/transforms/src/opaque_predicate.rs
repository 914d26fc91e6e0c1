use crate::{PassContext, Transform};
use murk_core::ir::{BinaryOp, CmpPredicate, InstKind, Instruction, Operand, Terminator, Type};
use murk_core::module::{Function, Module};
use murk_utils::errors::TransformError;
use rand::Rng;
use sha3::{Digest, Keccak256};
use tracing::{debug, info};

/// Label of the never-taken block.
pub const DEAD_LABEL: &str = "dead_branch_obf";
/// Label of the block holding the always-false comparison.
pub const GUARD_LABEL: &str = "opaque_guard_obf";

/// Puts an always-false branch in front of one function's entry block.
///
/// ```text
/// guard:  %c = icmp eq A, B        ; A != B
///         br %c, dead, entry
/// entry:  ...original...
/// dead:   %d = add A, 0
///         br entry
/// ```
///
/// The guard becomes the new entry and the original entry block is left untouched, so every
/// executed path runs the original instructions in the original order. At most one function
/// is changed per application.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaquePredicate;

impl OpaquePredicate {
    fn generate_constant(&self, seed: u64) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(seed.to_le_bytes());
        hasher.finalize().into()
    }

    /// Two distinct `i32` literals.
    fn literals(&self, ctx: &mut PassContext) -> (i32, i32) {
        let digest = self.generate_constant(ctx.rng.random());
        let lhs = i32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
        let mask: i32 = ctx.rng.random_range(1..=i32::MAX);
        (lhs, lhs ^ mask)
    }

    fn is_candidate(func: &Function) -> bool {
        !func.is_declaration()
            && !func.synthetic
            && func
                .entry_id()
                .is_some_and(|entry| func.predecessors(entry).is_empty())
    }
}

impl Transform for OpaquePredicate {
    fn name(&self) -> &'static str {
        "OpaquePredicate"
    }

    fn apply(&self, module: &mut Module, ctx: &mut PassContext) -> Result<bool, TransformError> {
        let Some(func) = module.functions.iter_mut().find(|f| Self::is_candidate(f)) else {
            debug!("No function eligible for an opaque predicate");
            return Ok(false);
        };
        let Some(entry) = func.entry_id() else {
            return Ok(false);
        };

        let cond = func.fresh_value()?;
        let filler_value = func.fresh_value()?;
        let (lhs, rhs) = self.literals(ctx);
        let compare = Instruction {
            result: Some(cond),
            ty: Type::I1,
            kind: InstKind::ICmp {
                pred: CmpPredicate::Eq,
                lhs: Operand::i32(lhs),
                rhs: Operand::i32(rhs),
            },
        };

        // falls through to the old entry until the dead block exists
        let guard = func.insert_block_before(
            entry,
            GUARD_LABEL,
            vec![compare],
            Terminator::Br { target: entry },
        )?;

        let filler = Instruction {
            result: Some(filler_value),
            ty: Type::I32,
            kind: InstKind::Binary {
                op: BinaryOp::Add,
                lhs: Operand::i32(lhs),
                rhs: Operand::i32(0),
            },
        };
        let dead = func.append_block(DEAD_LABEL, vec![filler], Terminator::Br { target: entry })?;

        if let Some(block) = func.block_mut(guard) {
            block.terminator = Terminator::CondBr {
                cond: Operand::Value(cond),
                then_dest: dead,
                else_dest: entry,
            };
        }

        ctx.stats.predicates_inserted += 1;
        info!(
            "Added opaque predicate to {}: icmp eq {} {} (guard bb{}, dead bb{})",
            func.name, lhs, rhs, guard.0, dead.0
        );
        Ok(true)
    }
}
