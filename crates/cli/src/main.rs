/// Entry point for the murk CLI, an IR module obfuscation tool.
///
/// This module parses command-line arguments and dispatches to subcommands for obfuscating a
/// module, printing it as text, or rendering a function's control flow graph. It initializes
/// logging and handles the main execution flow.
use clap::Parser;
use murk_cli::commands::{Cmd, Command};
use tracing_subscriber::EnvFilter;

/// Command-line interface for murk.
///
/// murk reads a JSON-serialized IR module and applies string encryption, synthetic function
/// insertion, private symbol renaming and opaque predicate insertion to it.
#[derive(Parser)]
#[command(name = "murk")]
#[command(about = "murk: IR module obfuscator")]
struct Cli {
    /// Input module as a JSON file
    input: String,

    #[command(subcommand)]
    command: Cmd,
}

/// Runs the murk CLI with the provided arguments.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli.command.execute(&cli.input).await
}
