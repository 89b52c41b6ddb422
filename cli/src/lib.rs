pub mod bench_chart;
pub mod commands;
pub mod config;
pub mod repl;
pub mod toplevel;

pub use config::ToplevelConfig;
pub use toplevel::{
    Diagnostic, FragmentCompiler, FragmentSource, QuillCompiler, ScriptedInput, Toplevel,
    TurnOutcome,
};
