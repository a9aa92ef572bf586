//! Configuration management for semcode

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub storage: StorageConfig,
    pub heuristics: HeuristicsConfigFile,
    /// Bundle name -> glob patterns
    pub bundles: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub max_file_size_bytes: usize,
    pub max_chunk_chars: usize,
    pub min_function_chars: usize,
    pub min_structure_chars: usize,
    pub reduced_import_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub max_input_chars: usize,
    pub batch_size: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub threshold: f32,
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database path, relative to the project root unless absolute
    pub database: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfigFile {
    /// Rules file, relative to the project root unless absolute
    pub rules_file: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 200 * 1024,
            max_chunk_chars: 3000,
            min_function_chars: 10,
            min_structure_chars: 15,
            reduced_import_limit: 3,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            max_input_chars: 8192,
            batch_size: 100,
            timeout_secs: 120,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            threshold: 0.5,
            batch_size: 100,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(".semcode/index.db"),
        }
    }
}

impl Default for HeuristicsConfigFile {
    fn default() -> Self {
        Self {
            rules_file: PathBuf::from(".semcode/heuristics.toml"),
        }
    }
}

impl Config {
    /// Apply `OLLAMA_HOST` / `SEMCODE_EMBED_MODEL` overrides
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            self.embedding.endpoint = host;
        }
        if let Ok(model) = std::env::var("SEMCODE_EMBED_MODEL") {
            self.embedding.model = model;
        }
    }

    pub fn database_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.storage.database)
    }

    pub fn rules_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.heuristics.rules_file)
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Get the configuration file path
fn config_path() -> Result<PathBuf> {
    let config_dir = directories::ProjectDirs::from("dev", "semcode", "semcode")
        .context("Failed to determine config directory")?
        .config_dir()
        .to_path_buf();

    Ok(config_dir.join("config.toml"))
}

/// `--config PATH` when given, otherwise the per-user location
fn resolve_config_path(custom_path: Option<&str>) -> Result<PathBuf> {
    match custom_path {
        Some(p) => Ok(PathBuf::from(p)),
        None => config_path(),
    }
}

/// Load configuration from file or use defaults
pub fn load_config(custom_path: Option<&str>) -> Result<Config> {
    let path = resolve_config_path(custom_path)?;

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?
    } else {
        Config::default()
    };

    config.apply_env();
    Ok(config)
}

/// Initialize configuration file with defaults, returning its path
pub fn init_config(custom_path: Option<&str>) -> Result<PathBuf> {
    let path = resolve_config_path(custom_path)?;

    if path.exists() {
        println!("Configuration file already exists at {:?}", path);
        return Ok(path);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {:?}", parent))?;
    }

    let content = toml::to_string_pretty(&Config::default())
        .context("Failed to serialize default config")?;

    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config to {:?}", path))?;

    println!("Configuration initialized at {:?}", path);
    Ok(path)
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .context("Failed to serialize config")?;
    println!("{}", content);
    Ok(())
}
