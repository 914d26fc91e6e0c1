//! CFG update operations

use crate::ir::{BasicBlock, BlockId, Instruction, Terminator};
use crate::module::Function;
use murk_utils::errors::IrError;

impl Function {
    /// Inserts a new block immediately before `target` in layout and routes every edge that
    /// used to enter `target` through the new block.
    ///
    /// When `target` is the entry block the new block becomes the entry. The new block's own
    /// terminator is taken as given and is expected to reach `target`; it is not rewritten.
    ///
    /// Phi nodes in `target` naming the single redirected predecessor are updated to name the
    /// new block. Redirecting several predecessors into a block with phis would need a new
    /// phi in the inserted block, so that case is rejected.
    ///
    /// # Returns
    /// The id of the inserted block.
    pub fn insert_block_before(
        &mut self,
        target: BlockId,
        label: impl Into<String>,
        instructions: Vec<Instruction>,
        terminator: Terminator,
    ) -> Result<BlockId, IrError> {
        if self.is_declaration() {
            return Err(IrError::Declaration(self.name.clone()));
        }
        let pos = self
            .block_position(target)
            .ok_or(IrError::UnknownBlock(target.0))?;

        let preds = self.predecessors(target);
        if preds.len() > 1 && self.blocks[pos].has_phis() {
            return Err(IrError::AmbiguousPhiRedirect {
                block: target.0,
                preds: preds.len(),
            });
        }

        let id = self.fresh_block_id()?;
        for pred in &preds {
            if let Some(block) = self.block_mut(*pred) {
                block.terminator.replace_target(target, id);
            }
        }
        if let [pred] = preds.as_slice() {
            self.blocks[pos].retarget_phis(*pred, id);
        }

        let mut block = BasicBlock::new(id, label, terminator);
        block.instructions = instructions;
        self.blocks.insert(pos, block);

        tracing::debug!(
            "{}: inserted bb{} before bb{} ({} predecessors redirected)",
            self.name,
            id.0,
            target.0,
            preds.len()
        );
        Ok(id)
    }

    /// Splits `block` before instruction `at`.
    ///
    /// Instructions `[at..]` and the terminator move to a new block placed right after the
    /// original, which now ends in a branch to it. Successors that named `block` in their phis
    /// are updated to name the new block. Splitting inside the leading phi group is refused.
    pub fn split_block(
        &mut self,
        block: BlockId,
        at: usize,
        label: impl Into<String>,
    ) -> Result<BlockId, IrError> {
        let pos = self
            .block_position(block)
            .ok_or(IrError::UnknownBlock(block.0))?;
        let len = self.blocks[pos].instructions.len();
        let phis = self.blocks[pos].phi_count();
        if at > len || at < phis {
            return Err(IrError::SplitOutOfRange {
                block: block.0,
                index: at,
                len,
            });
        }

        let id = self.fresh_block_id()?;
        let tail = self.blocks[pos].instructions.split_off(at);
        let terminator = std::mem::replace(
            &mut self.blocks[pos].terminator,
            Terminator::Br { target: id },
        );
        let successors = terminator.successors();

        let mut new_block = BasicBlock::new(id, label, terminator);
        new_block.instructions = tail;
        self.blocks.insert(pos + 1, new_block);

        for succ in successors {
            if let Some(succ_block) = self.block_mut(succ) {
                succ_block.retarget_phis(block, id);
            }
        }

        tracing::debug!(
            "{}: split bb{} at {} into bb{}",
            self.name,
            block.0,
            at,
            id.0
        );
        Ok(id)
    }
}
