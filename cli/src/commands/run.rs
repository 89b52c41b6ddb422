use std::fs;
use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};

use crate::config::ToplevelConfig;
use crate::toplevel::{Toplevel, TurnOutcome};

/// Run a source file (as one turn) or a compiled `.qbc` unit.
pub fn run_file(path: &str, config: ToplevelConfig) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_file_to(path, config, &mut out)
}

pub fn run_file_to(path: &str, config: ToplevelConfig, out: &mut dyn Write) -> Result<()> {
    let mut toplevel = Toplevel::new(config);

    let outcome = if path.ends_with(".qbc") {
        let bytes = fs::read(path).with_context(|| format!("failed to read {path}"))?;
        toplevel.run_unit_bytes(&bytes, out)
    } else {
        let content = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
        toplevel.run_turn(&content, out)
    };

    match outcome.failure() {
        None => Ok(()),
        Some(TurnOutcome::CompileFailed(text)) => Err(anyhow!("Compile error:\n{text}")),
        Some(TurnOutcome::LinkFailed(e)) => Err(anyhow!("Link error: {e}")),
        Some(TurnOutcome::Faulted(e)) => Err(anyhow!("Runtime error: {e}")),
        Some(other) => Err(anyhow!("turn failed: {other:?}")),
    }
}
