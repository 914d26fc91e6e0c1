use async_trait::async_trait;
use clap::Args;
use murk_core::cfg_ir::ControlFlowGraph;
use murk_utils::errors::ObfuscateError;
use std::error::Error;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CfgArgs {
    /// Function whose control flow graph is rendered
    #[arg(short, long)]
    pub function: String,
    /// Output file for Graphviz .dot (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[async_trait]
impl super::Command for CfgArgs {
    async fn execute(self, input: &str) -> Result<(), Box<dyn Error>> {
        let module = super::load_module(input)?;
        let func = module
            .find_function(&self.function)
            .and_then(|id| module.function(id))
            .ok_or_else(|| ObfuscateError::UnknownFunction(self.function.clone()))?;

        let dot = ControlFlowGraph::build(func).to_dot(func);
        super::emit(&dot, self.output.as_deref())?;
        Ok(())
    }
}
