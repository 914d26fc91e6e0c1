use async_trait::async_trait;
use clap::Args;
use murk_analysis::metrics::collect_metrics;
use std::error::Error;

/// Arguments for the `print` subcommand.
#[derive(Args, Debug, Default)]
pub struct PrintArgs {
    /// Print module metrics as JSON instead of the IR text
    #[arg(long)]
    pub metrics: bool,
    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<std::path::PathBuf>,
}

#[async_trait]
impl super::Command for PrintArgs {
    async fn execute(self, input: &str) -> Result<(), Box<dyn Error>> {
        let module = super::load_module(input)?;
        let text = if self.metrics {
            serde_json::to_string_pretty(&collect_metrics(&module)?)?
        } else {
            module.to_string()
        };
        super::emit(&text, self.output.as_deref())?;
        Ok(())
    }
}
