use thiserror::Error;

/// Error type for structural edits on the IR module.
#[derive(Debug, Error)]
pub enum IrError {
    /// A block id does not name a block of the function being edited.
    #[error("unknown block bb{0}")]
    UnknownBlock(u32),
    /// The function has no body, so there is nothing to edit.
    #[error("function `{0}` is a declaration")]
    Declaration(String),
    /// A symbol with this name already exists in the module.
    #[error("symbol `{0}` already exists in the module")]
    DuplicateSymbol(String),
    /// A global id is out of range.
    #[error("unknown global #{0}")]
    UnknownGlobal(usize),
    /// A function id is out of range.
    #[error("unknown function #{0}")]
    UnknownFunction(usize),
    /// Split point lies past the end of the block.
    #[error("split index {index} out of range for block bb{block} with {len} instructions")]
    SplitOutOfRange { block: u32, index: usize, len: usize },
    /// Several predecessors would be merged into one edge feeding phi nodes.
    #[error("cannot redirect {preds} predecessors of bb{block}: block has phi nodes")]
    AmbiguousPhiRedirect { block: u32, preds: usize },
    /// Attempt to mutate a symbol that is part of the module's binary interface.
    #[error("symbol `{0}` is externally visible")]
    ExternallyVisible(String),
    /// Every block or value id of the function is taken.
    #[error("no free ids left in function `{0}`")]
    IdSpaceExhausted(String),
}

/// Error type for module verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("duplicate symbol `{0}`")]
    DuplicateSymbol(String),
    #[error("function `{0}` has no body but is not externally visible")]
    HiddenDeclaration(String),
    #[error("function `{func}`: terminator of bb{block} targets missing bb{target}")]
    MissingTarget { func: String, block: u32, target: u32 },
    #[error("function `{func}`: entry block bb{block} has predecessors")]
    EntryHasPredecessors { func: String, block: u32 },
    #[error("function `{func}`: duplicate block id bb{block}")]
    DuplicateBlock { func: String, block: u32 },
    #[error("function `{func}`: value %{value} defined more than once")]
    Redefinition { func: String, value: u32 },
    #[error("function `{func}`: value %{value} used but never defined")]
    UndefinedValue { func: String, value: u32 },
    #[error("function `{func}`: value %{value} used in bb{block} before its definition dominates it")]
    NotDominated { func: String, value: u32, block: u32 },
    #[error("function `{func}`: parameter index {index} out of range")]
    BadParam { func: String, index: u32 },
    #[error("function `{func}`: reference to missing global #{global}")]
    MissingGlobal { func: String, global: usize },
    #[error("function `{func}`: reference to missing function #{callee}")]
    MissingFunction { func: String, callee: usize },
    #[error("function `{func}`: call to `{callee}` passes {got} arguments, expected {expected}")]
    ArityMismatch {
        func: String,
        callee: String,
        expected: usize,
        got: usize,
    },
    #[error("global `{0}`: initializer length does not match declared type")]
    InitializerMismatch(String),
}

/// Error type for metrics computation.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("module is empty")]
    EmptyModule,
}

/// Error type for the reference interpreter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("function `{0}` has no body")]
    NoBody(String),
    #[error("expected {expected} arguments, got {got}")]
    ArgCount { expected: usize, got: usize },
    #[error("value %{0} read before it was computed")]
    Unset(u32),
    #[error("step budget exhausted")]
    OutOfFuel,
    #[error("reached an unreachable terminator in `{0}`")]
    Unreachable(String),
    #[error("phi in bb{block} has no incoming value for bb{pred}")]
    PhiMismatch { block: u32, pred: u32 },
    #[error("operand is not a pointer")]
    NotAPointer,
    #[error("operand is not an integer")]
    NotAnInteger,
    #[error("unknown block bb{0}")]
    UnknownBlock(u32),
}

/// Error type for transform operations.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("IR edit failed: {0}")]
    Ir(#[from] IrError),
    #[error("transform produced an invalid module: {0}")]
    Verify(#[from] VerifyError),
}

/// Errors that can occur during obfuscation.
#[derive(Debug, Error)]
pub enum ObfuscateError {
    /// File read/write error.
    #[error("file error: {0}")]
    File(#[from] std::io::Error),
    /// The input module failed verification.
    #[error("invalid input module: {0}")]
    InvalidModule(#[from] VerifyError),
    /// Transform application failed.
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),
    /// No function with this name.
    #[error("no function named `{0}`")]
    UnknownFunction(String),
    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
