#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::chunking::ChunkingConfig;
use crate::embeddings::ollama::DEFAULT_EMBEDDING_DIMENSION;

const APP_DIR_NAME: &str = "paper-rag";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub pubmed: PubmedConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
}

impl Default for OllamaConfig {
    #[inline]
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "all-minilm".to_string(),
            batch_size: 16,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

/// OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the bearer token
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    #[inline]
    fn default() -> Self {
        Self {
            base_url: "https://router.huggingface.co/v1".to_string(),
            model: "deepseek-ai/DeepSeek-V3.2:novita".to_string(),
            api_key_env: "API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks returned per query
    pub k: usize,
    /// Table name used inside every project's vector index
    pub collection_name: String,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            k: 5,
            collection_name: "papers".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PubmedConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Keep a `PMID_<id>.txt` copy of each fetched article in the project
    pub save_papers: bool,
}

impl Default for PubmedConfig {
    #[inline]
    fn default() -> Self {
        Self {
            base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            timeout_secs: 30,
            save_papers: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexingConfig {
    /// Log and skip unreadable documents instead of aborting the run
    pub skip_unreadable: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid chunk size: {0} (must be between 50 and 100000)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid result count: {0} (must be between 1 and 1000)")]
    InvalidResultCount(usize),
    #[error("Invalid collection name: '{0}' (letters, digits, '_' and '-' only)")]
    InvalidCollectionName(String),
    #[error("Invalid environment variable name: '{0}'")]
    InvalidEnvVar(String),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load `config.toml` from `config_dir`, falling back to defaults when absent
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read, parsed or validated
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// # Errors
    /// Returns an error if validation fails or the file cannot be written
    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Per-user data directory used when no `--base-dir` is given
    ///
    /// # Errors
    /// Returns `ConfigError::DirectoryError` when the platform has no data directory
    #[inline]
    pub fn default_base_dir() -> Result<PathBuf, ConfigError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Get the base directory for the application
    #[inline]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir().join(CONFIG_FILE_NAME)
    }

    /// Directory holding one subdirectory per project
    #[inline]
    pub fn projects_dir(&self) -> PathBuf {
        self.base_dir().join("projects")
    }

    /// # Errors
    /// Returns the first invalid setting found
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.llm.validate()?;
        validate_chunking(&self.chunking)?;
        self.retrieval.validate()?;
        self.pubmed.validate()?;
        Ok(())
    }

    /// Set chunk size and overlap together
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidChunkSize` for an out-of-range size and
    /// `ConfigError::OverlapTooLarge` unless the overlap is below the size
    #[inline]
    pub fn set_chunking(&mut self, chunk_size: usize, chunk_overlap: usize) -> Result<(), ConfigError> {
        let chunking = ChunkingConfig {
            chunk_size,
            chunk_overlap,
            ..self.chunking.clone()
        };
        validate_chunking(&chunking)?;
        self.chunking = chunking;
        Ok(())
    }
}

fn validate_chunking(config: &ChunkingConfig) -> Result<(), ConfigError> {
    if !(50..=100_000).contains(&config.chunk_size) {
        return Err(ConfigError::InvalidChunkSize(config.chunk_size));
    }

    if config.chunk_overlap >= config.chunk_size {
        return Err(ConfigError::OverlapTooLarge(
            config.chunk_overlap,
            config.chunk_size,
        ));
    }

    Ok(())
}

fn validate_http_url(url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url).map_err(|_| ConfigError::InvalidUrl(url.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidProtocol(parsed.scheme().to_string()));
    }
    Ok(())
}

fn validate_timeout(seconds: u64) -> Result<(), ConfigError> {
    if !(1..=600).contains(&seconds) {
        return Err(ConfigError::InvalidTimeout(seconds));
    }
    Ok(())
}

impl OllamaConfig {
    /// # Errors
    /// Returns the first invalid setting found
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        self.ollama_url()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        Ok(())
    }

    /// # Errors
    /// Returns `ConfigError::InvalidUrl` when host and port do not form a URL
    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    /// # Errors
    /// Returns `ConfigError::InvalidProtocol` unless `http` or `https`
    #[inline]
    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol(protocol));
        }
        self.protocol = protocol;
        Ok(())
    }

    /// # Errors
    /// Returns an error when the host does not form a valid URL
    #[inline]
    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let temp_config = OllamaConfig {
            host: host.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.host = host;
        Ok(())
    }

    /// # Errors
    /// Returns `ConfigError::InvalidPort` for port 0
    #[inline]
    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    /// # Errors
    /// Returns `ConfigError::InvalidModel` for a blank name
    #[inline]
    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    /// # Errors
    /// Returns `ConfigError::InvalidBatchSize` outside 1..=1000
    #[inline]
    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }

    /// # Errors
    /// Returns `ConfigError::InvalidEmbeddingDimension` outside 64..=4096
    #[inline]
    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        if !(64..=4096).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        self.embedding_dimension = dimension;
        Ok(())
    }
}

impl LlmConfig {
    /// # Errors
    /// Returns the first invalid setting found
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url(&self.base_url)?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        let env_ok = !self.api_key_env.is_empty()
            && self
                .api_key_env
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !env_ok {
            return Err(ConfigError::InvalidEnvVar(self.api_key_env.clone()));
        }

        validate_timeout(self.timeout_secs)
    }

    /// # Errors
    /// Returns `ConfigError::InvalidUrl` unless an http(s) URL
    #[inline]
    pub fn set_base_url(&mut self, base_url: String) -> Result<(), ConfigError> {
        validate_http_url(&base_url)?;
        self.base_url = base_url;
        Ok(())
    }

    /// # Errors
    /// Returns `ConfigError::InvalidModel` for a blank name
    #[inline]
    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    /// # Errors
    /// Returns `ConfigError::InvalidTimeout` outside 1..=600
    #[inline]
    pub fn set_timeout_secs(&mut self, timeout_secs: u64) -> Result<(), ConfigError> {
        validate_timeout(timeout_secs)?;
        self.timeout_secs = timeout_secs;
        Ok(())
    }
}

impl RetrievalConfig {
    /// # Errors
    /// Returns the first invalid setting found
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=1000).contains(&self.k) {
            return Err(ConfigError::InvalidResultCount(self.k));
        }

        let name_ok = !self.collection_name.is_empty()
            && self
                .collection_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !name_ok {
            return Err(ConfigError::InvalidCollectionName(
                self.collection_name.clone(),
            ));
        }

        Ok(())
    }

    /// # Errors
    /// Returns `ConfigError::InvalidResultCount` outside 1..=1000
    #[inline]
    pub fn set_k(&mut self, k: usize) -> Result<(), ConfigError> {
        if !(1..=1000).contains(&k) {
            return Err(ConfigError::InvalidResultCount(k));
        }
        self.k = k;
        Ok(())
    }
}

impl PubmedConfig {
    /// # Errors
    /// Returns the first invalid setting found
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url(&self.base_url)?;
        validate_timeout(self.timeout_secs)
    }
}
