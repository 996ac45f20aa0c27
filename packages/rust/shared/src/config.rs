//! Application configuration for papercorpus.
//!
//! User config lives at `~/.papercorpus/papercorpus.toml`.
//! CLI flags override config file values, which override defaults.
//!
//! Every chunking and validation threshold is a named parameter here; the
//! defaults are the baseline pipeline values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CorpusError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "papercorpus.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".papercorpus";

// ---------------------------------------------------------------------------
// Config structs (matching papercorpus.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input/output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Noise-section filter thresholds.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Chunk sizing.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Content-quality thresholds.
    #[serde(default)]
    pub validation: ValidationSettings,

    /// Batch execution.
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory of input XML documents.
    #[serde(default = "default_input_dir")]
    pub input_dir: String,

    /// Directory receiving one JSON file per article.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Where the corpus validation report is written.
    #[serde(default = "default_report_path")]
    pub report_path: String,

    /// Input file extension (without the dot). Other files are skipped.
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            report_path: default_report_path(),
            extension: default_extension(),
        }
    }
}

fn default_input_dir() -> String {
    "data/processed".into()
}
fn default_output_dir() -> String {
    "data/clean".into()
}
fn default_report_path() -> String {
    "data/validation_report.json".into()
}
fn default_extension() -> String {
    "xml".into()
}

/// `[filter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Sections with fewer whitespace-delimited words are dropped.
    #[serde(default = "default_min_words")]
    pub min_words: usize,

    /// Sections with fewer characters after trimming are dropped.
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_words: default_min_words(),
            min_chars: default_min_chars(),
        }
    }
}

fn default_min_words() -> usize {
    30
}
fn default_min_chars() -> usize {
    100
}

/// `[chunking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Word budget per chunk; only a single oversized sentence may exceed it.
    #[serde(default = "default_max_words")]
    pub max_words: usize,

    /// A trailing chunk below this word count is folded into its predecessor.
    #[serde(default = "default_merge_below_words")]
    pub merge_below_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
            merge_below_words: default_merge_below_words(),
        }
    }
}

fn default_max_words() -> usize {
    500
}
fn default_merge_below_words() -> usize {
    100
}

/// `[validation]` section.
///
/// The baseline pipeline used 200 characters and 1 valid section; later
/// revisions raised these to 300 and 3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// Minimum trimmed chunk length in characters.
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    /// Minimum number of chunks longer than `min_chunk_chars`.
    #[serde(default = "default_min_valid_sections")]
    pub min_valid_sections: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            min_chunk_chars: default_min_chunk_chars(),
            min_valid_sections: default_min_valid_sections(),
        }
    }
}

fn default_min_chunk_chars() -> usize {
    200
}
fn default_min_valid_sections() -> usize {
    1
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Maximum number of documents processed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

impl AppConfig {
    /// Reject parameter sets the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.concurrency == 0 {
            return Err(CorpusError::config("pipeline.concurrency must be at least 1"));
        }
        if self.chunking.max_words == 0 {
            return Err(CorpusError::config("chunking.max_words must be at least 1"));
        }
        if self.paths.extension.trim_start_matches('.').is_empty() {
            return Err(CorpusError::config("paths.extension must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Runtime parameter sets (derived from AppConfig, overridable in code)
// ---------------------------------------------------------------------------

/// Runtime thresholds for dropping noise sections before chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionFilterConfig {
    pub min_words: usize,
    pub min_chars: usize,
}

impl Default for SectionFilterConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SectionFilterConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            min_words: config.filter.min_words,
            min_chars: config.filter.min_chars,
        }
    }
}

/// Runtime chunk sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkerConfig {
    pub max_words: usize,
    pub merge_below_words: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ChunkerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_words: config.chunking.max_words,
            merge_below_words: config.chunking.merge_below_words,
        }
    }
}

/// Runtime content-quality thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationConfig {
    pub min_chunk_chars: usize,
    pub min_valid_sections: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ValidationConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            min_chunk_chars: config.validation.min_chunk_chars,
            min_valid_sections: config.validation.min_valid_sections,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.papercorpus/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CorpusError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.papercorpus/papercorpus.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CorpusError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CorpusError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CorpusError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CorpusError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("min_chunk_chars"));
        assert!(toml_str.contains("data/validation_report.json"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.chunking.max_words, 500);
        assert_eq!(parsed.validation.min_chunk_chars, 200);
        assert_eq!(parsed.paths.extension, "xml");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[validation]
min_chunk_chars = 300
min_valid_sections = 3

[pipeline]
concurrency = 8
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.validation.min_chunk_chars, 300);
        assert_eq!(config.validation.min_valid_sections, 3);
        assert_eq!(config.pipeline.concurrency, 8);
        assert_eq!(config.filter.min_words, 30);
        assert_eq!(config.paths.output_dir, "data/clean");
    }

    #[test]
    fn runtime_configs_from_app_config() {
        let mut app = AppConfig::default();
        app.chunking.merge_below_words = 50;

        assert_eq!(
            SectionFilterConfig::from(&app),
            SectionFilterConfig {
                min_words: 30,
                min_chars: 100
            }
        );
        assert_eq!(ChunkerConfig::from(&app).merge_below_words, 50);
        assert_eq!(ValidationConfig::default().min_valid_sections, 1);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.concurrency = 0;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("concurrency"));
    }

    #[test]
    fn load_config_from_file() {
        let dir = std::env::temp_dir().join(format!("pc-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[chunking]\nmax_words = 250\n").expect("write config");

        let config = load_config_from(&path).expect("load");
        assert_eq!(config.chunking.max_words, 250);
        assert_eq!(config.chunking.merge_below_words, 100);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
