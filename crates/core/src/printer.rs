//! Textual rendering of modules in an LLVM-flavoured syntax.

use crate::ir::{InstKind, Instruction, Operand, Terminator, Type};
use crate::module::{Constant, Function, Global, Module};
use std::fmt;

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::I1 => f.write_str("i1"),
            Self::I8 => f.write_str("i8"),
            Self::I32 => f.write_str("i32"),
            Self::I64 => f.write_str("i64"),
            Self::Ptr => f.write_str("ptr"),
            Self::Array { elem, len } => write!(f, "[{len} x {elem}]"),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module {}", self.name)?;
        for global in &self.globals {
            writeln!(f, "{}", render_global(global))?;
        }
        for func in &self.functions {
            writeln!(f)?;
            write!(f, "{}", FunctionDisplay { module: self, func })?;
        }
        Ok(())
    }
}

/// A function rendered with symbol names resolved through its module.
#[derive(Debug)]
pub struct FunctionDisplay<'a> {
    pub module: &'a Module,
    pub func: &'a Function,
}

impl fmt::Display for FunctionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = self.func;
        let params = func
            .params
            .iter()
            .enumerate()
            .map(|(i, ty)| format!("{ty} %arg{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        if func.is_declaration() {
            return writeln!(
                f,
                "declare {} {} @{}({params})",
                func.linkage.keyword(),
                func.ret,
                func.name
            );
        }

        writeln!(
            f,
            "define {} {} @{}({params}) {{",
            func.linkage.keyword(),
            func.ret,
            func.name
        )?;
        for block in &func.blocks {
            writeln!(f, "bb{}:  ; {}", block.id.0, block.label)?;
            for inst in &block.instructions {
                writeln!(f, "  {}", self.instruction(inst))?;
            }
            writeln!(f, "  {}", self.terminator(&block.terminator))?;
        }
        writeln!(f, "}}")
    }
}

impl FunctionDisplay<'_> {
    fn operand(&self, op: &Operand) -> String {
        match op {
            Operand::Value(v) => format!("%{}", v.0),
            Operand::Param(i) => format!("%arg{i}"),
            Operand::Int { ty, value } => format!("{}", ty.truncate(*value)),
            Operand::Global(id) => self
                .module
                .global(*id)
                .map(|g| format!("@{}", g.name))
                .unwrap_or_else(|| format!("@<global#{}>", id.0)),
            Operand::Func(id) => self
                .module
                .function(*id)
                .map(|g| format!("@{}", g.name))
                .unwrap_or_else(|| format!("@<func#{}>", id.0)),
        }
    }

    fn instruction(&self, inst: &Instruction) -> String {
        let lhs = inst
            .result
            .map(|v| format!("%{} = ", v.0))
            .unwrap_or_default();
        let body = match &inst.kind {
            InstKind::Binary { op, lhs, rhs } => format!(
                "{} {} {}, {}",
                op.mnemonic(),
                inst.ty,
                self.operand(lhs),
                self.operand(rhs)
            ),
            InstKind::ICmp { pred, lhs, rhs } => format!(
                "icmp {} {}, {}",
                pred.mnemonic(),
                self.operand(lhs),
                self.operand(rhs)
            ),
            InstKind::Alloca { allocated } => format!("alloca {allocated}"),
            InstKind::Load { ptr } => format!("load {}, ptr {}", inst.ty, self.operand(ptr)),
            InstKind::Store { value, ptr } => {
                format!("store {}, ptr {}", self.operand(value), self.operand(ptr))
            }
            InstKind::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|a| self.operand(a))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "call {} {}({args})",
                    inst.ty,
                    self.operand(&Operand::Func(*callee))
                )
            }
            InstKind::Phi { incoming } => {
                let arms = incoming
                    .iter()
                    .map(|(op, pred)| format!("[ {}, bb{} ]", self.operand(op), pred.0))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("phi {} {arms}", inst.ty)
            }
        };
        format!("{lhs}{body}")
    }

    fn terminator(&self, term: &Terminator) -> String {
        match term {
            Terminator::Br { target } => format!("br bb{}", target.0),
            Terminator::CondBr {
                cond,
                then_dest,
                else_dest,
            } => format!(
                "br {}, bb{}, bb{}",
                self.operand(cond),
                then_dest.0,
                else_dest.0
            ),
            Terminator::Ret { value: Some(v) } => format!("ret {}", self.operand(v)),
            Terminator::Ret { value: None } => "ret void".to_string(),
            Terminator::Unreachable => "unreachable".to_string(),
        }
    }
}

fn render_global(global: &Global) -> String {
    let kind = if global.is_constant { "constant" } else { "global" };
    let init = match &global.initializer {
        Some(Constant::Int { ty, value }) => format!(" {}", ty.truncate(*value)),
        Some(Constant::Bytes(bytes)) => format!(" c\"{}\"", escape_bytes(bytes.as_bytes())),
        Some(Constant::Zero(_)) => " zeroinitializer".to_string(),
        None => String::new(),
    };
    format!(
        "@{} = {} {kind} {}{init}",
        global.name,
        global.linkage.keyword(),
        global.ty
    )
}

/// Printable ASCII is kept; everything else (and `"`/`\`) becomes `\XX`.
fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\{b:02X}"));
        }
    }
    out
}
