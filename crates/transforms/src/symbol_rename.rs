use crate::{PassContext, Transform};
use murk_core::ir::GlobalId;
use murk_core::module::{Linkage, Module};
use murk_utils::errors::TransformError;
use tracing::info;

/// Tags every untagged private global, which also gives it the `_obf` suffix.
///
/// Internal and external globals stay as they are: both are visible in the symbol table and
/// may be referenced by name from outside the module.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymbolRename;

impl Transform for SymbolRename {
    fn name(&self) -> &'static str {
        "SymbolRename"
    }

    fn apply(&self, module: &mut Module, ctx: &mut PassContext) -> Result<bool, TransformError> {
        let targets: Vec<GlobalId> = module
            .iter_globals()
            .filter(|(_, g)| g.linkage == Linkage::Private && !g.is_obfuscated())
            .map(|(id, _)| id)
            .collect();

        for &id in &targets {
            let old = module
                .global(id)
                .map(|g| g.name.clone())
                .unwrap_or_default();
            let new = module.mark_global_obfuscated(id)?;
            ctx.stats.globals_renamed += 1;
            info!("Renamed global {} -> {}", old, new);
        }

        Ok(!targets.is_empty())
    }
}
