//! Sample modules used across the integration tests.

use murk_core::builder::FunctionBuilder;
use murk_core::ir::{BinaryOp, CmpPredicate, FuncId, Operand, Type};
use murk_core::module::{Constant, Function, Global, Linkage, Module};
use murk_utils::errors::IrError;

/// Text of the private string literals in [`demo_module`].
pub const SECRET_MESSAGE: &str = "This is a secret message that should be obfuscated!";
pub const APP_NAME: &str = "murk Educational Obfuscation Demo";
pub const VERSION_INFO: &str = "Version 1.0.0 - Educational MVP";
/// Text of the exported string in [`demo_module`].
pub const EXPORTED_BANNER: &str = "==========================================";

/// Routes `tracing` output to the test harness; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A small program in the shape of a C demo:
///
/// ```c
/// static const char *secret_message = "...", *app_name = "...", *version_info = "...";
/// static int global_counter = 0;
/// const char exported_banner[] = "====...";
/// int total_runs = 0;
///
/// int calculate_fibonacci(int n) { return n <= 1 ? n : fib(n - 1) + fib(n - 2); }
/// void print_banner(void) { puts(exported_banner); puts(app_name); puts(version_info); }
/// int perform_calculations(int base) { global_counter++; int r = base * 2 + 10;
///                                      print_int(fmt, r); return r; }
/// int main(int n) { print_banner(); puts(secret_message); total_runs = n;
///                   return perform_calculations(n) + calculate_fibonacci(n); }
/// ```
pub fn demo_module() -> Result<Module, IrError> {
    let mut m = Module::new("example");

    let secret = m.add_global(Global::c_string(
        "secret_message",
        Linkage::Private,
        SECRET_MESSAGE,
    ))?;
    let app_name = m.add_global(Global::c_string("app_name", Linkage::Private, APP_NAME))?;
    let version = m.add_global(Global::c_string(
        "version_info",
        Linkage::Private,
        VERSION_INFO,
    ))?;
    let fmt = m.add_global(Global::c_string("calc_fmt", Linkage::Internal, "Calculation: %d\n"))?;
    let counter = m.add_global(Global::variable(
        "global_counter",
        Linkage::Private,
        Type::I32,
        Some(Constant::Int {
            ty: Type::I32,
            value: 0,
        }),
    ))?;
    let banner = m.add_global(Global::c_string(
        "exported_banner",
        Linkage::External,
        EXPORTED_BANNER,
    ))?;
    let total_runs = m.add_global(Global::variable(
        "total_runs",
        Linkage::External,
        Type::I32,
        Some(Constant::Int {
            ty: Type::I32,
            value: 0,
        }),
    ))?;

    let puts = m.add_function(Function::declaration("puts", vec![Type::Ptr], Type::I32))?;
    let print_int = m.add_function(Function::declaration(
        "print_int",
        vec![Type::Ptr, Type::I32],
        Type::I32,
    ))?;

    let fib = FuncId(m.functions.len());
    let mut b = FunctionBuilder::new(
        "calculate_fibonacci",
        Linkage::Internal,
        vec![Type::I32],
        Type::I32,
    );
    let entry = b.block("entry");
    let base = b.block("base");
    let rec = b.block("recurse");
    b.position_at(entry)?;
    let small = b.icmp(CmpPredicate::Sle, b.param(0), Operand::i32(1));
    b.cond_br(small, base, rec);
    b.position_at(base)?;
    b.ret(Some(b.param(0)));
    b.position_at(rec)?;
    let n1 = b.binary(BinaryOp::Sub, Type::I32, b.param(0), Operand::i32(1));
    let f1 = b.call(fib, Type::I32, vec![n1]).unwrap_or(Operand::i32(0));
    let n2 = b.binary(BinaryOp::Sub, Type::I32, b.param(0), Operand::i32(2));
    let f2 = b.call(fib, Type::I32, vec![n2]).unwrap_or(Operand::i32(0));
    let sum = b.binary(BinaryOp::Add, Type::I32, f1, f2);
    b.ret(Some(sum));
    m.add_function(b.finish())?;

    let mut b = FunctionBuilder::new("print_banner", Linkage::Internal, vec![], Type::Void);
    b.block("entry");
    for text in [banner, app_name, version] {
        b.call(puts, Type::I32, vec![Operand::Global(text)]);
    }
    b.ret(None);
    let print_banner = m.add_function(b.finish())?;

    let mut b = FunctionBuilder::new(
        "perform_calculations",
        Linkage::Internal,
        vec![Type::I32],
        Type::I32,
    );
    b.block("entry");
    let count = b.load(Type::I32, Operand::Global(counter));
    let count = b.binary(BinaryOp::Add, Type::I32, count, Operand::i32(1));
    b.store(count, Operand::Global(counter));
    let doubled = b.binary(BinaryOp::Mul, Type::I32, b.param(0), Operand::i32(2));
    let result = b.binary(BinaryOp::Add, Type::I32, doubled, Operand::i32(10));
    b.call(print_int, Type::I32, vec![Operand::Global(fmt), result.clone()]);
    b.ret(Some(result));
    let perform = m.add_function(b.finish())?;

    let mut b = FunctionBuilder::new("main", Linkage::External, vec![Type::I32], Type::I32);
    b.block("entry");
    b.call(print_banner, Type::Void, vec![]);
    b.call(puts, Type::I32, vec![Operand::Global(secret)]);
    b.store(b.param(0), Operand::Global(total_runs));
    let calc = b.call(perform, Type::I32, vec![b.param(0)]).unwrap_or(Operand::i32(0));
    let fib_n = b.call(fib, Type::I32, vec![b.param(0)]).unwrap_or(Operand::i32(0));
    let total = b.binary(BinaryOp::Add, Type::I32, calc, fib_n);
    b.ret(Some(total));
    m.add_function(b.finish())?;

    Ok(m)
}

/// One private `"hi"` literal printed by an external `main`.
pub fn hello_module() -> Result<Module, IrError> {
    let mut m = Module::new("hello");
    let msg = m.add_global(Global::c_string("msg", Linkage::Private, "hi"))?;
    let puts = m.add_function(Function::declaration("puts", vec![Type::Ptr], Type::I32))?;
    let mut b = FunctionBuilder::new("main", Linkage::External, vec![], Type::I32);
    b.block("entry");
    b.call(puts, Type::I32, vec![Operand::Global(msg)]);
    b.ret(Some(Operand::i32(0)));
    m.add_function(b.finish())?;
    Ok(m)
}

/// Reference value of `main(n)` in [`demo_module`].
pub fn demo_main_result(n: i64) -> i64 {
    fn fib(n: i64) -> i64 {
        if n <= 1 {
            n
        } else {
            fib(n - 1) + fib(n - 2)
        }
    }
    n * 2 + 10 + fib(n)
}
