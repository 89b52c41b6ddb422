use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Quill interactive toplevel", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.quill/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Instruction budget per turn
    #[arg(long, global = true)]
    pub fuel: Option<u64>,

    /// Do not echo new bindings
    #[arg(long, global = true)]
    pub no_echo: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the toplevel (default)
    Repl,
    /// Run a source file or compiled unit
    Run {
        /// Path to the file (.ql or .qbc)
        path: String,
    },
    /// Compile a source file to a bytecode unit
    Compile {
        /// Input source file
        path: String,
        /// Output .qbc file (optional)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Turn benchmark samples into chart series
    Chart {
        /// JSON file: title -> case -> samples
        path: String,
        /// Baseline samples with the same shape
        #[arg(long)]
        baseline: Option<String>,
        /// Output JSON file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}
