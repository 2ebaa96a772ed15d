use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Tunables for the editing engine. Every field has a default so a partial
/// TOML file (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period before buffered title/content is sent to persistence.
    pub save_debounce_ms: u64,
    /// Quiet period before a completion request is issued.
    pub completion_debounce_ms: u64,
    /// Number of trailing whitespace-delimited tokens used as the prompt.
    pub context_tokens: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Try `semantic_search` first and fall back to lexical search on failure.
    pub semantic_search: bool,
    pub distance_cutoff: f32,
    /// Send an unsaved buffer immediately when its session is replaced.
    pub flush_on_switch: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: 300,
            completion_debounce_ms: 250,
            context_tokens: 10,
            max_tokens: 16,
            temperature: 0.3,
            semantic_search: false,
            distance_cutoff: 0.5,
            flush_on_switch: true,
        }
    }
}

impl EngineConfig {
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn completion_debounce(&self) -> Duration {
        Duration::from_millis(self.completion_debounce_ms)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid engine config")
    }

    /// Load from a TOML file. A missing file yields the defaults; a file that
    /// exists but does not parse is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text)
                .with_context(|| format!("while reading {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no engine config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }
}
