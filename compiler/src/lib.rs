pub mod codegen;
pub mod error;
pub mod expressions;
pub mod function_compiler;
pub mod scopes;
pub mod statements;
pub mod symbols;

pub use codegen::{compile, compile_program, CompiledFragment, Compiler};
pub use error::CompilerError;
pub use symbols::{Definition, GlobalSymbol, SymbolEnv};
