//! Engine configuration.
//!
//! Loaded once from a TOML file. Every key has a default, resolved when the
//! file is parsed, so the rest of the engine reads plain fields.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::NarrativeError;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "config.toml";

/// Windows and caps used by the context assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Log records shown to Tick and Collapse.
    pub recent_log_k: usize,

    /// Log records scanned for past dialogue.
    pub dialog_log_window: usize,

    /// Dialogue records kept from the scan.
    pub max_dialog_logs: usize,

    /// Memory entries shown to Dialog. `0` shows all of them.
    pub max_memory: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            recent_log_k: 10,
            dialog_log_window: 30,
            max_dialog_logs: 6,
            max_memory: 5,
        }
    }
}

/// Where documents, templates, cache entries and snapshots live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub prompts_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub snapshots_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            prompts_dir: PathBuf::from("prompts"),
            cache_dir: PathBuf::from(".cache"),
            snapshots_dir: PathBuf::from("outputs/snapshots"),
        }
    }
}

impl PathsConfig {
    /// Resolve every relative path against `root`.
    pub fn rooted_at(&self, root: &Path) -> Self {
        let join = |p: &PathBuf| if p.is_absolute() { p.clone() } else { root.join(p) };
        Self {
            data_dir: join(&self.data_dir),
            prompts_dir: join(&self.prompts_dir),
            cache_dir: join(&self.cache_dir),
            snapshots_dir: join(&self.snapshots_dir),
        }
    }
}

/// Connection settings for the OpenAI-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,

    /// Name of the environment variable holding the API key.
    pub api_key_env: String,

    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,

    /// Retries after a schema validation failure.
    pub retry_on_schema_fail: u32,
    pub retry_delay_ms: u64,

    /// Whether oracle results are cached on disk.
    pub cache: bool,

    pub max_updates_per_tick: usize,

    pub context: ContextConfig,
    pub paths: PathsConfig,
    pub llm: LlmConfig,

    /// Seed handed to world generation verbatim.
    pub init: serde_json::Value,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.2,
            max_tokens: 400,
            retry_on_schema_fail: 1,
            retry_delay_ms: 1_000,
            cache: true,
            max_updates_per_tick: 5,
            context: ContextConfig::default(),
            paths: PathsConfig::default(),
            llm: LlmConfig::default(),
            init: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

impl NarrativeConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, NarrativeError> {
        toml::from_str(content).map_err(|err| NarrativeError::Config {
            path: None,
            message: err.to_string(),
        })
    }

    /// Load a configuration file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, NarrativeError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file missing, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };
        toml::from_str(&content).map_err(|err| NarrativeError::Config {
            path: Some(path.to_path_buf()),
            message: err.to_string(),
        })
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Starting player location named by the init seed, if any.
    pub fn start_location(&self) -> &str {
        self.init
            .get("start")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown")
    }
}
