//! Run summary written once at the end of a pipeline run.

use crate::PassStats;
use murk_utils::errors::ObfuscateError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Flat record written to the telemetry file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telemetry {
    pub strings_obf_count: usize,
    pub fake_funcs_inserted: usize,
    pub cycles_completed: usize,
    pub xor_key: u8,
    pub bogus_count_requested: usize,
}

impl Telemetry {
    pub const fn new(
        stats: &PassStats,
        cycles_completed: usize,
        xor_key: u8,
        bogus_count_requested: usize,
    ) -> Self {
        Self {
            strings_obf_count: stats.strings_obfuscated,
            fake_funcs_inserted: stats.functions_inserted,
            cycles_completed,
            xor_key,
            bogus_count_requested,
        }
    }

    /// The full record on a single line, for log scraping.
    pub fn summary_line(&self) -> String {
        json!({
            "strings_obf_count": self.strings_obf_count,
            "fake_funcs_inserted": self.fake_funcs_inserted,
            "cycles_completed": self.cycles_completed,
            "xor_key": self.xor_key,
            "bogus_count_requested": self.bogus_count_requested,
        })
        .to_string()
    }

    /// Writes the record as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<(), ObfuscateError> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        fs::write(path, text)?;
        Ok(())
    }
}

/// Emits the telemetry record: optionally to a file, always to the log.
#[derive(Debug, Clone, Default)]
pub struct TelemetryReporter {
    path: Option<PathBuf>,
}

impl TelemetryReporter {
    /// Reporter that writes to `path`.
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Reporter that only logs.
    pub const fn log_only() -> Self {
        Self { path: None }
    }

    /// Reports `telemetry`. Returns whether a file was written; a failed write is only a
    /// warning since the module has already been rewritten by then.
    pub fn report(&self, telemetry: &Telemetry) -> bool {
        info!(
            "Obfuscation complete: {} strings encrypted, {} functions inserted, {} cycles",
            telemetry.strings_obf_count, telemetry.fake_funcs_inserted, telemetry.cycles_completed
        );

        let written = match &self.path {
            Some(path) => match telemetry.write(path) {
                Ok(()) => {
                    info!("Telemetry written to {}", path.display());
                    true
                }
                Err(e) => {
                    warn!("Could not write telemetry file {}: {}", path.display(), e);
                    false
                }
            },
            None => false,
        };

        info!("TELEMETRY: {}", telemetry.summary_line());
        written
    }
}
