use thiserror::Error;

/// Failures while linking a unit against the live program image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("global slot {index} is out of range (table length {len})")]
    OutOfRange { index: usize, len: usize },

    #[error("unknown primitive #{index} ({count} registered)")]
    UnknownPrimitive { index: usize, count: usize },

    #[error("Toplevel not initialized (no reification backend installed)")]
    ToplevelNotInitialized,

    #[error("malformed unit: {0}")]
    MalformedUnit(String),
}

/// A dynamic symbol lookup came back empty.
///
/// This is the expected outcome when the host has no native loader, so it is
/// kept apart from [`RuntimeError`] and callers branch on it directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("symbol `{symbol}` not found in library `{library}`")]
pub struct SymbolNotFound {
    pub library: String,
    pub symbol: String,
}

/// A toplevel meta operation the host cannot perform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetaError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("{0} not implemented")]
    NotImplemented(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("global slot {0} is not bound yet")]
    UnboundGlobal(usize),

    #[error("stack overflow")]
    StackOverflow,

    #[error("invalid opcode {0}")]
    InvalidOpcode(u8),

    #[error("function handle {0} not found")]
    FunctionNotFound(u32),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    IntegerOverflow,

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("arity mismatch: {0}")]
    ArityMismatch(String),

    #[error("assertion failed")]
    AssertionFailed,

    #[error("fuel exhausted after {0} instructions")]
    FuelExhausted(u64),

    #[error("output error: {0}")]
    Output(String),

    #[error("{0}")]
    SystemError(String),
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid format: {0}")]
    Format(String),

    #[error("security limit exceeded: {0}")]
    Security(String),
}
