use crate::{PassContext, Transform};
use murk_core::builder::FunctionBuilder;
use murk_core::ir::{BinaryOp, Operand, Type};
use murk_core::module::{Function, Linkage, Module};
use murk_utils::errors::TransformError;
use tracing::info;

/// Prefix of every synthetic function name.
pub const BOGUS_PREFIX: &str = "bogus_func_";

/// Number of add/mul rounds in a synthetic body.
const ROUNDS: usize = 3;

/// Adds never-called private functions with a small arithmetic body.
#[derive(Debug, Clone, Copy)]
pub struct BogusFunction {
    count: usize,
}

impl BogusFunction {
    pub const fn new(count: usize) -> Self {
        Self { count }
    }

    /// `i32 (i32)`: for each round, `acc = (acc + (i + j)) * 2`, then return `acc`.
    fn build(name: String, i: usize) -> Function {
        let mut b = FunctionBuilder::new(name, Linkage::Private, vec![Type::I32], Type::I32);
        b.block("entry");
        let mut acc = b.param(0);
        for j in 0..ROUNDS {
            let offset = Operand::Int {
                ty: Type::I32,
                value: (i + j) as i64,
            };
            acc = b.binary(BinaryOp::Add, Type::I32, acc, offset);
            acc = b.binary(BinaryOp::Mul, Type::I32, acc, Operand::i32(2));
        }
        b.ret(Some(acc));

        let mut func = b.finish();
        func.synthetic = true;
        func
    }
}

impl Transform for BogusFunction {
    fn name(&self) -> &'static str {
        "BogusFunction"
    }

    fn apply(&self, module: &mut Module, ctx: &mut PassContext) -> Result<bool, TransformError> {
        for i in 0..self.count {
            let name = loop {
                let candidate = format!("{BOGUS_PREFIX}{}", ctx.next_symbol_index());
                if !module.contains_symbol(&candidate) {
                    break candidate;
                }
            };
            let func = Self::build(name.clone(), i);
            let instructions = func.instruction_count();
            module.add_function(func)?;
            ctx.stats.functions_inserted += 1;
            info!("Inserted {} ({} instructions)", name, instructions);
        }
        Ok(self.count > 0)
    }
}
