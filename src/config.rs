//! Configuration module for the muse analyzer.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.muse/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the binary)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `MUSE_` and use double
//! underscores to separate nested levels:
//! - `MUSE_ANALYSIS__DEFAULT_TOP_K=5` sets `analysis.default_top_k`
//! - `MUSE_SERVER__BIND=0.0.0.0:8000` sets `server.bind`
//! - `MUSE_DATASET_PATH=data/figures.json` sets `dataset_path`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MuseError, MuseResult};

/// Directory holding settings, the saved index and cached models.
pub const CONFIG_DIR: &str = ".muse";

const SETTINGS_FILE: &str = "settings.toml";

const ENV_PREFIX: &str = "MUSE_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding the saved index artifacts
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// JSON dataset of reference profiles
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Global debug mode
    #[serde(default = "default_false")]
    pub debug: bool,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub analysis: AnalysisSettings,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmbeddingConfig {
    /// Model to use for embeddings
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Where downloaded model files are cached
    #[serde(default = "default_model_cache_dir")]
    pub cache_dir: PathBuf,

    /// Batch size handed to the model; unset uses the model default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Show a progress bar while downloading the model
    #[serde(default = "default_true")]
    pub show_download_progress: bool,
}

/// Limits and knobs applied to every analysis request.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AnalysisSettings {
    /// Matches returned when a request does not ask for a count
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Largest accepted `top_k`
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Minimum text length in characters, after trimming
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,

    /// Maximum text length in characters
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,

    /// Corpus points sampled for the 2-D projection
    #[serde(default = "default_projection_sample")]
    pub projection_sample: usize,

    /// Drop search results below this score; unset keeps everything
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,

    /// Save a freshly built index so the next start can load it
    #[serde(default = "default_true")]
    pub persist_index: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// HTTP server bind address
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// CORS allowed origins; `*` allows any
    #[serde(default = "default_allow_origins")]
    pub allow_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from(".muse/index")
}
fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/cultural_figures/dataset.json")
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_embedding_model() -> String {
    "ParaphraseMLMpnetBaseV2".to_string()
}
fn default_model_cache_dir() -> PathBuf {
    PathBuf::from(".muse/models")
}
fn default_top_k() -> usize {
    3
}
fn default_max_top_k() -> usize {
    10
}
fn default_min_text_chars() -> usize {
    50
}
fn default_max_text_chars() -> usize {
    5000
}
fn default_projection_sample() -> usize {
    20
}
fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_allow_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            dataset_path: default_dataset_path(),
            debug: false,
            embedding: EmbeddingConfig::default(),
            analysis: AnalysisSettings::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: default_model_cache_dir(),
            batch_size: None,
            show_download_progress: true,
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            min_text_chars: default_min_text_chars(),
            max_text_chars: default_max_text_chars(),
            projection_sample: default_projection_sample(),
            min_score: None,
            persist_index: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            allow_origins: default_allow_origins(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .muse directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| Path::new(CONFIG_DIR).join(SETTINGS_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels, single underscores stay
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.muse/settings.toml` searching from the current directory up
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(CONFIG_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(SETTINGS_FILE));
            }
        }

        None
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Create a default settings file with helpful comments
    pub fn init_config_file(force: bool) -> MuseResult<PathBuf> {
        Self::init_config_file_in(Path::new(CONFIG_DIR), force)
    }

    /// Like [`init_config_file`](Self::init_config_file) but under `dir`
    pub fn init_config_file_in(dir: &Path, force: bool) -> MuseResult<PathBuf> {
        let config_path = dir.join(SETTINGS_FILE);

        if !force && config_path.exists() {
            return Err(MuseError::Config {
                reason: format!(
                    "{} already exists. Use --force to overwrite",
                    config_path.display()
                ),
            });
        }

        std::fs::create_dir_all(dir)
            .and_then(|()| std::fs::write(&config_path, SETTINGS_TEMPLATE))
            .map_err(|e| MuseError::Config {
                reason: format!("Failed to write {}: {e}", config_path.display()),
            })?;

        Ok(config_path)
    }
}

const SETTINGS_TEMPLATE: &str = r#"# Muse Configuration File

# Version of the configuration schema
version = 1

# Directory holding the saved index (vectors.vec + records.json)
index_path = ".muse/index"

# JSON array of reference profiles
dataset_path = "data/cultural_figures/dataset.json"

# Global debug mode
debug = false

[embedding]
# Supported: AllMiniLML6V2, ParaphraseMLMiniLML12V2, ParaphraseMLMpnetBaseV2,
# MultilingualE5Small, BGESmallENV15
model = "ParaphraseMLMpnetBaseV2"

# Where downloaded model files are cached
cache_dir = ".muse/models"

# Batch size for embedding (defaults to the model's own batch size)
# batch_size = 32

show_download_progress = true

[analysis]
# Matches returned when a request does not specify top_k
default_top_k = 3

# Largest accepted top_k
max_top_k = 10

# Accepted text length in characters
min_text_chars = 50
max_text_chars = 5000

# Corpus points shown next to the query in the 2-D projection
projection_sample = 20

# Drop matches scoring below this value (unset keeps every match)
# min_score = 0.4

# Save a freshly built index so the next start loads it from disk
persist_index = true

[server]
# HTTP server bind address
bind = "127.0.0.1:8000"

# CORS allowed origins, "*" allows any
allow_origins = ["*"]

[logging]
# Default log filter when RUST_LOG is unset
level = "info"
"#;
