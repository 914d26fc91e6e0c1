/// Module for the `obfuscate` subcommand, which runs the obfuscation pipeline over an IR
/// module.
///
/// This module loads a JSON module, builds the pipeline configuration from an optional config
/// file plus command-line overrides, rewrites the module and writes it back out as JSON. It can
/// also emit a report comparing module metrics before and after the run.
use async_trait::async_trait;
use clap::Args;
use murk_analysis::metrics::compare;
use murk_transform::obfuscator::{obfuscate_module, ObfuscationConfig, ObfuscationOutcome};
use murk_utils::errors::ObfuscateError;
use serde_json::json;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments for the `obfuscate` subcommand.
#[derive(Args, Debug, Default)]
pub struct ObfuscateArgs {
    /// JSON configuration file; flags given on the command line take precedence.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Single-byte XOR key for string literals, decimal or 0x-prefixed (default: 0xAA).
    #[arg(long, value_parser = parse_key)]
    pub xor_key: Option<u8>,
    /// Synthetic functions inserted per cycle (default: 2).
    #[arg(long)]
    pub bogus_count: Option<usize>,
    /// Number of pipeline cycles (default: 1).
    #[arg(long)]
    pub cycles: Option<usize>,
    /// Seed for synthetic names and predicate literals (default: 42).
    #[arg(long)]
    pub seed: Option<u64>,
    /// Telemetry file (default: murk_pass_telemetry.json).
    #[arg(long)]
    pub telemetry: Option<PathBuf>,
    /// Only log telemetry; do not write the file.
    #[arg(long)]
    pub no_telemetry: bool,
    /// Output file for the rewritten module (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Path to emit a before/after metrics report as JSON (optional).
    #[arg(long)]
    pub emit: Option<PathBuf>,
}

/// Parses an XOR key given either in decimal or as `0x`-prefixed hex.
fn parse_key(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid key {s:?}: {e}"))
}

impl ObfuscateArgs {
    /// Builds the pipeline configuration: file values first, then flag overrides.
    pub fn config(&self) -> Result<ObfuscationConfig, ObfuscateError> {
        let mut config = match &self.config {
            Some(path) => ObfuscationConfig::from_json_file(path)?,
            None => ObfuscationConfig::default(),
        };
        if let Some(key) = self.xor_key {
            config.xor_key = key;
        }
        if let Some(count) = self.bogus_count {
            config.bogus_count = count;
        }
        if let Some(cycles) = self.cycles {
            config.cycles = cycles;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(path) = &self.telemetry {
            config.telemetry_path = path.clone();
        }
        if self.no_telemetry {
            config.emit_telemetry = false;
        }
        Ok(config)
    }
}

#[async_trait]
impl super::Command for ObfuscateArgs {
    async fn execute(self, input: &str) -> Result<(), Box<dyn Error>> {
        let config = self.config()?;
        let mut module = super::load_module(input)?;

        let outcome = obfuscate_module(&mut module, config)?;
        if !outcome.changed {
            tracing::warn!("No transform changed {}", module.name);
        }

        if let Some(path) = &self.emit {
            write_report(path, &outcome)?;
            tracing::info!("Report written to {}", path.display());
        }

        let text = serde_json::to_string_pretty(&module)?;
        super::emit(&text, self.output.as_deref())?;
        Ok(())
    }
}

fn write_report(path: &Path, outcome: &ObfuscationOutcome) -> Result<(), ObfuscateError> {
    let delta = match (&outcome.metrics_before, &outcome.metrics_after) {
        (Some(before), Some(after)) => Some(compare(before, after)),
        _ => None,
    };
    let report = json!({
        "changed": outcome.changed,
        "telemetry": outcome.telemetry,
        "stats": outcome.stats,
        "metrics_before": outcome.metrics_before,
        "metrics_after": outcome.metrics_after,
        "delta": delta,
    });
    fs::write(path, serde_json::to_string_pretty(&report)?)?;
    Ok(())
}
