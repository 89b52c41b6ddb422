//! Toplevel settings read from `config.toml`.
//!
//! Lookup order: an explicit `--config` path, then `$HOME/.quill/config.toml`,
//! then built-in defaults. Missing keys fall back to their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToplevelConfig {
    pub prompt: String,
    pub continuation_prompt: String,
    pub history_file: Option<PathBuf>,
    /// Instruction budget per turn. `None` means unlimited.
    pub fuel: Option<u64>,
    /// Print `val name : type = value` for each new binding.
    pub echo_bindings: bool,
    /// `env_logger` filter string, used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for ToplevelConfig {
    fn default() -> Self {
        Self {
            prompt: "# ".into(),
            continuation_prompt: "  ".into(),
            history_file: default_dir().map(|d| d.join("history")),
            fuel: None,
            echo_bindings: true,
            log_filter: None,
        }
    }
}

fn default_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".quill"))
}

/// `$HOME/.quill/config.toml`, if `HOME` is set.
pub fn default_path() -> Option<PathBuf> {
    default_dir().map(|d| d.join("config.toml"))
}

impl ToplevelConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// An explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}
