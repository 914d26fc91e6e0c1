use crate::{PassContext, Transform};
use murk_analysis::metrics::{collect_metrics, compare};
use murk_core::module::Module;
use murk_utils::errors::TransformError;
use tracing::{debug, error};

/// Trait for running one cycle of obfuscation transforms over a module.
pub trait Pass {
    fn run(
        &self,
        module: &mut Module,
        passes: &[Box<dyn Transform>],
        ctx: &mut PassContext,
    ) -> Result<bool, TransformError>;
}

/// Runs every transform once, in order, and ORs their results.
///
/// A transform that fails is logged and counted as having made no change; whatever it had
/// already done to the module stays.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPass;

impl Pass for DefaultPass {
    fn run(
        &self,
        module: &mut Module,
        passes: &[Box<dyn Transform>],
        ctx: &mut PassContext,
    ) -> Result<bool, TransformError> {
        let mut changed = false;
        for pass in passes {
            // an empty module has no metrics; the pass may still add to it
            let before = collect_metrics(module).ok();
            let mutated = match pass.apply(module, ctx) {
                Ok(mutated) => mutated,
                Err(e) => {
                    error!("Transform {} failed: {}", pass.name(), e);
                    false
                }
            };
            if !mutated {
                debug!("{:>18} no change", pass.name());
                continue;
            }

            if let (Some(before), Ok(after)) = (before, collect_metrics(module)) {
                let delta = compare(&before, &after);
                debug!(
                    "{:>18} globals {:+} functions {:+} blocks {:+} instructions {:+} potency {:+.2}",
                    pass.name(),
                    delta.globals,
                    delta.functions,
                    delta.blocks,
                    delta.instructions,
                    delta.potency
                );
            }
            changed = true;
        }
        Ok(changed)
    }
}

/// Convenience function to run the default pass.
pub fn run(
    module: &mut Module,
    passes: &[Box<dyn Transform>],
    ctx: &mut PassContext,
) -> Result<bool, TransformError> {
    DefaultPass.run(module, passes, ctx)
}
