//! Module-level entities: globals, functions and the module that owns them.

use crate::ir::{BasicBlock, BlockId, FuncId, GlobalId, Terminator, Type, ValueId};
use murk_utils::errors::IrError;
use serde::{Deserialize, Serialize};

/// Name suffix carried by every global an obfuscation pass has processed.
pub const OBFUSCATED_SUFFIX: &str = "_obf";

/// Symbol visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Linkage {
    /// Invisible outside the module; not even kept in the object's symbol table.
    Private,
    /// Local to the module but present in the symbol table.
    Internal,
    /// Part of the module's binary interface.
    External,
}

impl Linkage {
    pub const fn is_externally_visible(self) -> bool {
        matches!(self, Self::External)
    }

    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

/// Immutable byte array used as literal data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstantBytes(Vec<u8>);

impl ConstantBytes {
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Bytes of `text` followed by a zero terminator.
    pub fn c_string(text: &str) -> Self {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True for a zero-terminated string with no interior zero byte.
    pub fn is_c_string(&self) -> bool {
        match self.0.split_last() {
            Some((&0, body)) => !body.contains(&0),
            _ => false,
        }
    }

    /// String contents without the terminator, if this is a C string.
    pub fn as_c_str(&self) -> Option<&[u8]> {
        if self.is_c_string() {
            Some(&self.0[..self.0.len() - 1])
        } else {
            None
        }
    }
}

/// Initializer of a global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constant {
    Int { ty: Type, value: i64 },
    Bytes(ConstantBytes),
    Zero(Type),
}

impl Constant {
    pub fn ty(&self) -> Type {
        match self {
            Self::Int { ty, .. } | Self::Zero(ty) => ty.clone(),
            Self::Bytes(bytes) => Type::bytes(bytes.len()),
        }
    }

    pub const fn as_bytes(&self) -> Option<&ConstantBytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// A named piece of module-level data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Global {
    pub name: String,
    pub linkage: Linkage,
    pub is_constant: bool,
    pub ty: Type,
    pub initializer: Option<Constant>,
    /// Set once an obfuscation pass has processed this global.
    #[serde(default)]
    obfuscated: bool,
}

impl Global {
    /// A mutable global with an optional initializer.
    pub fn variable(
        name: impl Into<String>,
        linkage: Linkage,
        ty: Type,
        initializer: Option<Constant>,
    ) -> Self {
        Self {
            name: name.into(),
            linkage,
            is_constant: false,
            ty,
            initializer,
            obfuscated: false,
        }
    }

    /// A constant global whose type is taken from its initializer.
    pub fn constant(name: impl Into<String>, linkage: Linkage, initializer: Constant) -> Self {
        Self {
            name: name.into(),
            linkage,
            is_constant: true,
            ty: initializer.ty(),
            initializer: Some(initializer),
            obfuscated: false,
        }
    }

    /// A constant zero-terminated string literal.
    pub fn c_string(name: impl Into<String>, linkage: Linkage, text: &str) -> Self {
        Self::constant(name, linkage, Constant::Bytes(ConstantBytes::c_string(text)))
    }

    /// Marks the global as already processed without renaming it.
    pub fn with_obfuscated_tag(mut self) -> Self {
        self.obfuscated = true;
        self
    }

    /// Whether any pass has already processed this global.
    ///
    /// The suffix check covers modules written by an earlier run that predates the tag.
    pub fn is_obfuscated(&self) -> bool {
        self.obfuscated || self.name.ends_with(OBFUSCATED_SUFFIX)
    }

    pub fn is_externally_visible(&self) -> bool {
        self.linkage.is_externally_visible()
    }
}

/// A function definition or declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub linkage: Linkage,
    pub params: Vec<Type>,
    pub ret: Type,
    /// Body in layout order; the first block is the entry. Empty for declarations.
    #[serde(default)]
    pub blocks: Vec<BasicBlock>,
    /// Set on functions fabricated by the obfuscator.
    #[serde(default)]
    pub synthetic: bool,
    #[serde(skip)]
    next_value: u32,
    #[serde(skip)]
    next_block: u32,
}

impl Function {
    pub fn new(name: impl Into<String>, linkage: Linkage, params: Vec<Type>, ret: Type) -> Self {
        Self {
            name: name.into(),
            linkage,
            params,
            ret,
            blocks: Vec::new(),
            synthetic: false,
            next_value: 0,
            next_block: 0,
        }
    }

    /// An externally provided function without a body.
    pub fn declaration(name: impl Into<String>, params: Vec<Type>, ret: Type) -> Self {
        Self::new(name, Linkage::External, params, ret)
    }

    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn entry(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }

    pub fn entry_id(&self) -> Option<BlockId> {
        self.entry().map(|block| block.id)
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.iter().find(|block| block.id == id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.iter_mut().find(|block| block.id == id)
    }

    /// Layout position of a block.
    pub fn block_position(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|block| block.id == id)
    }

    /// Distinct predecessors of `id`, in layout order.
    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.blocks
            .iter()
            .filter(|block| block.terminator.successors().contains(&id))
            .map(|block| block.id)
            .collect()
    }

    /// Allocates a value id not used anywhere in the body.
    ///
    /// Ids come from the serialized body, so a module may already use the top of the id
    /// space; that is reported as [`IrError::IdSpaceExhausted`].
    pub fn fresh_value(&mut self) -> Result<ValueId, IrError> {
        let used = self
            .blocks
            .iter()
            .flat_map(|block| block.defined_values())
            .map(|value| value.0)
            .max();
        let next = self.next_id(used, self.next_value)?;
        self.next_value = next + 1;
        Ok(ValueId(next))
    }

    /// Allocates a block id not used by any block of the body.
    pub fn fresh_block_id(&mut self) -> Result<BlockId, IrError> {
        let used = self.blocks.iter().map(|block| block.id.0).max();
        let next = self.next_id(used, self.next_block)?;
        self.next_block = next + 1;
        Ok(BlockId(next))
    }

    /// First id above both `used` and `floor` that still leaves room for the counter.
    fn next_id(&self, used: Option<u32>, floor: u32) -> Result<u32, IrError> {
        let exhausted = || IrError::IdSpaceExhausted(self.name.clone());
        let above_used = match used {
            Some(max) => max.checked_add(1).ok_or_else(exhausted)?,
            None => 0,
        };
        let next = above_used.max(floor);
        if next == u32::MAX {
            return Err(exhausted());
        }
        Ok(next)
    }

    /// Appends a block at the end of the layout and returns its id.
    pub fn append_block(
        &mut self,
        label: impl Into<String>,
        instructions: Vec<crate::ir::Instruction>,
        terminator: Terminator,
    ) -> Result<BlockId, IrError> {
        let id = self.fresh_block_id()?;
        let mut block = BasicBlock::new(id, label, terminator);
        block.instructions = instructions;
        self.blocks.push(block);
        Ok(id)
    }

    /// Total instruction count, terminators excluded.
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|block| block.instructions.len()).sum()
    }
}

/// A whole program unit: ordered globals and functions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub globals: Vec<Global>,
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Whether a global or function already uses `name`.
    pub fn contains_symbol(&self, name: &str) -> bool {
        self.globals.iter().any(|g| g.name == name) || self.functions.iter().any(|f| f.name == name)
    }

    /// `base` if it is free, otherwise the first free `base.N`.
    pub fn unique_symbol(&self, base: &str) -> String {
        if !self.contains_symbol(base) {
            return base.to_string();
        }
        (1u64..)
            .map(|n| format!("{base}.{n}"))
            .find(|candidate| !self.contains_symbol(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    pub fn add_global(&mut self, global: Global) -> Result<GlobalId, IrError> {
        if self.contains_symbol(&global.name) {
            return Err(IrError::DuplicateSymbol(global.name));
        }
        self.globals.push(global);
        Ok(GlobalId(self.globals.len() - 1))
    }

    pub fn add_function(&mut self, function: Function) -> Result<FuncId, IrError> {
        if self.contains_symbol(&function.name) {
            return Err(IrError::DuplicateSymbol(function.name));
        }
        self.functions.push(function);
        Ok(FuncId(self.functions.len() - 1))
    }

    pub fn global(&self, id: GlobalId) -> Option<&Global> {
        self.globals.get(id.0)
    }

    pub fn global_mut(&mut self, id: GlobalId) -> Option<&mut Global> {
        self.globals.get_mut(id.0)
    }

    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(id.0)
    }

    pub fn function_mut(&mut self, id: FuncId) -> Option<&mut Function> {
        self.functions.get_mut(id.0)
    }

    pub fn iter_globals(&self) -> impl Iterator<Item = (GlobalId, &Global)> {
        self.globals
            .iter()
            .enumerate()
            .map(|(idx, global)| (GlobalId(idx), global))
    }

    pub fn iter_functions(&self) -> impl Iterator<Item = (FuncId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(idx, function)| (FuncId(idx), function))
    }

    pub fn find_global(&self, name: &str) -> Option<GlobalId> {
        self.globals
            .iter()
            .position(|g| g.name == name)
            .map(GlobalId)
    }

    pub fn find_function(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .map(FuncId)
    }

    /// Renames a module-local global. External globals are part of the ABI and are refused.
    pub fn rename_global(&mut self, id: GlobalId, new_name: String) -> Result<(), IrError> {
        let current = self.global(id).ok_or(IrError::UnknownGlobal(id.0))?;
        if current.is_externally_visible() {
            return Err(IrError::ExternallyVisible(current.name.clone()));
        }
        if current.name == new_name {
            return Ok(());
        }
        if self.contains_symbol(&new_name) {
            return Err(IrError::DuplicateSymbol(new_name));
        }
        if let Some(global) = self.global_mut(id) {
            global.name = new_name;
        }
        Ok(())
    }

    /// Tags a global as processed and appends the marker suffix. Returns the new name.
    pub fn mark_global_obfuscated(&mut self, id: GlobalId) -> Result<String, IrError> {
        let global = self.global(id).ok_or(IrError::UnknownGlobal(id.0))?;
        let new_name = if global.name.ends_with(OBFUSCATED_SUFFIX) {
            global.name.clone()
        } else {
            self.unique_symbol(&format!("{}{OBFUSCATED_SUFFIX}", global.name))
        };
        self.rename_global(id, new_name.clone())?;
        if let Some(global) = self.global_mut(id) {
            global.obfuscated = true;
        }
        Ok(new_name)
    }
}
