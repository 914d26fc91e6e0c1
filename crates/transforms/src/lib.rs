//! Obfuscation passes over a murk [`Module`] and the pipeline that drives them.
//!
//! Every pass implements [`Transform`] and receives the whole module together with a
//! [`PassContext`], the explicit accumulator for randomness, synthetic-name numbering and
//! counters that persists across passes and cycles of one run.

pub mod bogus_function;
pub mod obfuscator;
pub mod opaque_predicate;
pub mod pass;
pub mod string_encryption;
pub mod symbol_rename;
pub mod telemetry;

use murk_core::module::Module;
use murk_utils::errors::TransformError;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Trait for module obfuscation transforms.
pub trait Transform: Send + Sync {
    /// Returns the transform's name for logging and identification.
    fn name(&self) -> &'static str;
    /// Applies the transform to the module, returning whether changes were made.
    fn apply(&self, module: &mut Module, ctx: &mut PassContext) -> Result<bool, TransformError>;
}

/// Counters accumulated over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    /// String literals whose bytes were encrypted.
    pub strings_obfuscated: usize,
    /// Synthetic functions added to the module.
    pub functions_inserted: usize,
    /// Cycles in which an opaque predicate was inserted.
    pub predicates_inserted: usize,
    /// Globals tagged by the renaming pass.
    pub globals_renamed: usize,
}

/// State shared by all passes of one run.
#[derive(Debug)]
pub struct PassContext {
    /// Seeded generator for predicate literals.
    pub rng: StdRng,
    /// Zero-based index of the cycle being run.
    pub cycle: usize,
    pub stats: PassStats,
    next_symbol: u64,
}

impl PassContext {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            cycle: 0,
            stats: PassStats::default(),
            next_symbol: seed,
        }
    }

    /// Next number for a synthetic symbol. Never repeats within a run.
    pub fn next_symbol_index(&mut self) -> u64 {
        let n = self.next_symbol;
        self.next_symbol = self.next_symbol.wrapping_add(1);
        n
    }
}
