use crate::bogus_function::BogusFunction;
use crate::opaque_predicate::OpaquePredicate;
use crate::pass;
use crate::string_encryption::StringEncryption;
use crate::symbol_rename::SymbolRename;
use crate::telemetry::{Telemetry, TelemetryReporter};
use crate::{PassContext, PassStats, Transform};
use murk_analysis::metrics::{collect_metrics, Metrics};
use murk_core::module::Module;
use murk_core::verify::verify_module;
use murk_utils::errors::{ObfuscateError, TransformError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Default telemetry file, relative to the working directory.
pub const DEFAULT_TELEMETRY_PATH: &str = "murk_pass_telemetry.json";

/// Configuration for the obfuscation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObfuscationConfig {
    /// Single-byte XOR key for string literals.
    pub xor_key: u8,
    /// Synthetic functions inserted per cycle.
    pub bogus_count: usize,
    /// Number of times the full pass sequence runs.
    pub cycles: usize,
    /// Seeds the synthetic-name counter and the predicate literal generator.
    pub seed: u64,
    /// Where the telemetry record is written.
    pub telemetry_path: PathBuf,
    /// Whether to write the telemetry file at all. The log lines are always emitted.
    pub emit_telemetry: bool,
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self {
            xor_key: 0xAA,
            bogus_count: 2,
            cycles: 1,
            seed: 42,
            telemetry_path: PathBuf::from(DEFAULT_TELEMETRY_PATH),
            emit_telemetry: true,
        }
    }
}

impl ObfuscationConfig {
    /// Loads a configuration from JSON. Missing fields take their default value.
    pub fn from_json_file(path: &Path) -> Result<Self, ObfuscateError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The passes of one cycle, in execution order.
    pub fn transforms(&self) -> Vec<Box<dyn Transform>> {
        vec![
            Box::new(StringEncryption::new(self.xor_key)),
            Box::new(BogusFunction::new(self.bogus_count)),
            Box::new(SymbolRename),
            Box::new(OpaquePredicate),
        ]
    }

    fn reporter(&self) -> TelemetryReporter {
        if self.emit_telemetry {
            TelemetryReporter::to_file(&self.telemetry_path)
        } else {
            TelemetryReporter::log_only()
        }
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObfuscationOutcome {
    /// Whether any pass changed the module in any cycle.
    pub changed: bool,
    pub telemetry: Telemetry,
    pub stats: PassStats,
    /// Whether the telemetry file was written.
    pub telemetry_written: bool,
    /// Metrics of the input; absent for an empty module.
    pub metrics_before: Option<Metrics>,
    pub metrics_after: Option<Metrics>,
}

/// Runs the fixed pass sequence for the configured number of cycles.
pub struct Obfuscator {
    config: ObfuscationConfig,
    transforms: Vec<Box<dyn Transform>>,
}

impl std::fmt::Debug for Obfuscator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Obfuscator")
            .field("config", &self.config)
            .field(
                "transforms",
                &self.transforms.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Obfuscator {
    pub fn new(config: ObfuscationConfig) -> Self {
        let transforms = config.transforms();
        Self { config, transforms }
    }

    pub const fn config(&self) -> &ObfuscationConfig {
        &self.config
    }

    /// Rewrites `module` in place and reports telemetry once at the end.
    ///
    /// A failing pass is logged and treated as "no change"; the run carries on with the next
    /// pass. Edits are never rolled back.
    pub fn run(&self, module: &mut Module) -> ObfuscationOutcome {
        let metrics_before = collect_metrics(module).ok();
        let mut ctx = PassContext::new(self.config.seed);
        let mut changed = false;

        debug!("Starting obfuscation of {}:", module.name);
        debug!("  Seed: 0x{:x}", self.config.seed);
        debug!("  XOR key: 0x{:02x}", self.config.xor_key);
        debug!(
            "  Transforms: {:?}",
            self.transforms.iter().map(|t| t.name()).collect::<Vec<_>>()
        );

        let mut cycles_completed = 0;
        for cycle in 0..self.config.cycles {
            info!("Running cycle {}/{}", cycle + 1, self.config.cycles);
            ctx.cycle = cycle;
            match pass::run(module, &self.transforms, &mut ctx) {
                Ok(cycle_changed) => changed |= cycle_changed,
                Err(e) => error!("Cycle {} failed: {}", cycle + 1, e),
            }
            cycles_completed += 1;
        }

        let telemetry = Telemetry::new(
            &ctx.stats,
            cycles_completed,
            self.config.xor_key,
            self.config.bogus_count,
        );
        let telemetry_written = self.config.reporter().report(&telemetry);

        ObfuscationOutcome {
            changed,
            telemetry,
            stats: ctx.stats,
            telemetry_written,
            metrics_before,
            metrics_after: collect_metrics(module).ok(),
        }
    }
}

/// Verifies `module`, runs the pipeline on it, and verifies the result.
pub fn obfuscate_module(
    module: &mut Module,
    config: ObfuscationConfig,
) -> Result<ObfuscationOutcome, ObfuscateError> {
    verify_module(module)?;
    let outcome = Obfuscator::new(config).run(module);
    verify_module(module).map_err(TransformError::from)?;
    Ok(outcome)
}
