use async_trait::async_trait;
use clap::Subcommand;
use murk_core::module::Module;
use murk_core::verify::verify_module;
use murk_utils::errors::ObfuscateError;
use std::error::Error;
use std::fs;
use std::path::Path;

pub mod cfg;
pub mod obfuscate;
pub mod print;

#[derive(Subcommand)]
pub enum Cmd {
    /// Run the obfuscation pipeline and write the rewritten module
    Obfuscate(obfuscate::ObfuscateArgs),

    /// Print the module as text
    Print(print::PrintArgs),

    /// Write one function's CFG as Graphviz .dot
    Cfg(cfg::CfgArgs),
}

#[async_trait]
pub trait Command {
    async fn execute(self, input: &str) -> Result<(), Box<dyn Error>>;
}

#[async_trait]
impl Command for Cmd {
    async fn execute(self, input: &str) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Obfuscate(args) => args.execute(input).await,
            Cmd::Print(args) => args.execute(input).await,
            Cmd::Cfg(args) => args.execute(input).await,
        }
    }
}

/// Reads a JSON module from `path` and checks that it is well formed.
pub fn load_module(path: &str) -> Result<Module, ObfuscateError> {
    let text = fs::read_to_string(path)?;
    let module: Module = serde_json::from_str(&text)?;
    verify_module(&module)?;
    tracing::debug!(
        "Loaded module {} ({} globals, {} functions)",
        module.name,
        module.globals.len(),
        module.functions.len()
    );
    Ok(module)
}

/// Writes `text` to `output`, or to stdout when no path is given.
pub fn emit(text: &str, output: Option<&Path>) -> Result<(), ObfuscateError> {
    match output {
        Some(path) => fs::write(path, text)?,
        None => println!("{text}"),
    }
    Ok(())
}
