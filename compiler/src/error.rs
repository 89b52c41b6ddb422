use quill_parser::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilerError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unbound identifier `{name}` at line {line}, col {col}")]
    UnboundIdentifier {
        name: String,
        line: usize,
        col: usize,
    },

    #[error("cannot assign to immutable binding `{name}` at line {line}, col {col}")]
    ImmutableAssignment {
        name: String,
        line: usize,
        col: usize,
    },

    #[error("function `{name}` must be declared at the top level (line {line}, col {col})")]
    NestedFunction {
        name: String,
        line: usize,
        col: usize,
    },

    #[error("`return` outside of a function at line {line}, col {col}")]
    ReturnOutsideFunction { line: usize, col: usize },

    #[error("duplicate parameter `{0}`")]
    DuplicateParameter(String),

    #[error("invalid integer literal `{0}`")]
    InvalidNumber(String),

    #[error("integer literal `{0}` does not fit in 60 bits")]
    IntegerOutOfRange(String),

    #[error("expression needs more than 255 registers")]
    RegisterOverflow,

    #[error("too many constants in one function")]
    TooManyConstants,

    #[error("too many arguments (max 254)")]
    TooManyArguments,

    #[error("global slot space exhausted")]
    TooManyGlobals,

    #[error("jump target out of range")]
    JumpTooFar,
}

impl CompilerError {
    /// Source location, when the error points at one.
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            CompilerError::Parse(e) => Some((e.line, e.col)),
            CompilerError::UnboundIdentifier { line, col, .. }
            | CompilerError::ImmutableAssignment { line, col, .. }
            | CompilerError::NestedFunction { line, col, .. }
            | CompilerError::ReturnOutsideFunction { line, col } => Some((*line, *col)),
            _ => None,
        }
    }
}
