use std::fs;

use anyhow::{anyhow, Context, Result};
use compiler::SymbolEnv;
use vm::PrimitiveRegistry;

/// Compile against a fresh session: only the stdlib primitives are known.
/// Returns the encoded unit.
pub fn compile_source(source: &str) -> Result<Vec<u8>> {
    let env = SymbolEnv::with_primitives(&PrimitiveRegistry::with_stdlib());
    let fragment = compiler::compile(source, &env).map_err(|e| anyhow!("Compile error: {e}"))?;
    Ok(fragment.bytes)
}

pub fn compile_file(path: &str, output: Option<&str>) -> Result<()> {
    let content = fs::read_to_string(path).context("Failed to read file")?;
    let bytes = compile_source(&content)?;
    let exe = vm::load_from_bytes(&bytes).map_err(|e| anyhow!("Encode error: {e}"))?;

    println!(
        "Compiled {} instructions ({} functions).",
        exe.instruction_count(),
        exe.prototypes.len()
    );

    if let Some(out_path) = output {
        fs::write(out_path, &bytes).context("Failed to write output file")?;
        println!("Saved binary to {}", out_path);
    }
    Ok(())
}
