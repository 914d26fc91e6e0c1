use crate::{PassContext, Transform};
use murk_core::ir::GlobalId;
use murk_core::module::{Constant, ConstantBytes, Global, Linkage, Module};
use murk_utils::errors::TransformError;
use tracing::info;

/// XORs every byte with `key`. Applying it twice with the same key restores the input.
pub fn xor_bytes(bytes: &[u8], key: u8) -> Vec<u8> {
    bytes.iter().map(|b| b ^ key).collect()
}

/// Encrypts module-local constant C strings in place with a single-byte XOR key.
///
/// The terminator byte is encrypted too, so the array keeps its length and type. Each
/// processed global is tagged (gaining the `_obf` suffix) and a private `<name>_enc` copy of
/// the ciphertext is added next to it. Call sites are left alone: the module does not carry a
/// decoder, so the plaintext is simply gone from the image.
#[derive(Debug, Clone, Copy)]
pub struct StringEncryption {
    key: u8,
}

impl StringEncryption {
    pub const fn new(key: u8) -> Self {
        Self { key }
    }

    fn is_eligible(global: &Global) -> bool {
        global.is_constant
            && !global.is_externally_visible()
            && !global.is_obfuscated()
            && matches!(&global.initializer, Some(Constant::Bytes(bytes)) if bytes.is_c_string())
    }
}

impl Transform for StringEncryption {
    fn name(&self) -> &'static str {
        "StringEncryption"
    }

    fn apply(&self, module: &mut Module, ctx: &mut PassContext) -> Result<bool, TransformError> {
        let targets: Vec<GlobalId> = module
            .iter_globals()
            .filter(|(_, g)| Self::is_eligible(g))
            .map(|(id, _)| id)
            .collect();

        for &id in &targets {
            let Some(global) = module.global(id) else {
                continue;
            };
            let original = global.name.clone();
            let Some(plain) = global.initializer.as_ref().and_then(Constant::as_bytes) else {
                continue;
            };
            let cipher = ConstantBytes::new(xor_bytes(plain.as_bytes(), self.key));

            let renamed = module.mark_global_obfuscated(id)?;
            if let Some(global) = module.global_mut(id) {
                global.initializer = Some(Constant::Bytes(cipher.clone()));
            }

            let shadow = module.unique_symbol(&format!("{original}_enc"));
            module.add_global(
                Global::constant(shadow.clone(), Linkage::Private, Constant::Bytes(cipher.clone()))
                    .with_obfuscated_tag(),
            )?;

            ctx.stats.strings_obfuscated += 1;
            info!(
                "Obfuscated string {} -> {} ({} bytes, shadow {}): 0x{}",
                original,
                renamed,
                cipher.len(),
                shadow,
                hex::encode(cipher.as_bytes())
            );
        }

        Ok(!targets.is_empty())
    }
}
