//! TOML-based configuration for Grasp
//!
//! All server settings live in a single `grasp.toml`: HTTP binding, storage
//! locations, chat providers, the embeddings endpoint, chunking/retrieval
//! parameters and the caption extractor.
//!
//! # Hot Reloading
//!
//! Configuration changes are automatically detected and applied at runtime.
//! Use `GraspConfigManager` for thread-safe access to the current configuration.
//! Values consumed per request (providers, retrieval window, history length)
//! pick up changes immediately; the listen address and database path only
//! apply on restart.

use crate::llm::ProviderKind;
use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Root configuration structure loaded from grasp.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraspConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Chat completion providers, at most one per kind
    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    #[serde(default)]
    pub rag: RagConfig,

    #[serde(default)]
    pub youtube: YoutubeConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

// ============= Storage Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "./data/grasp.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// JSON file backing the chunk index. When unset the index is kept in
    /// memory only and is lost on restart.
    #[serde(default = "default_vector_path")]
    pub path: Option<String>,
}

fn default_vector_path() -> Option<String> {
    Some("./data/vectors.json".to_string())
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            path: default_vector_path(),
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub openai: Option<ProviderConfig>,
    pub anthropic: Option<ProviderConfig>,
    pub gemini: Option<ProviderConfig>,
}

impl ProvidersConfig {
    pub fn get(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        match kind {
            ProviderKind::OpenAI => self.openai.as_ref(),
            ProviderKind::Anthropic => self.anthropic.as_ref(),
            ProviderKind::Gemini => self.gemini.as_ref(),
        }
    }

    /// Kinds that have a configuration block
    pub fn configured(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Environment variable containing the API key
    pub api_key_env: String,

    /// Overrides the provider's public endpoint
    #[serde(default)]
    pub api_base: Option<String>,

    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.7
}

// ============= Chat Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Provider used when a chat request doesn't name one
    #[serde(default = "default_provider")]
    pub default_provider: ProviderKind,

    /// Number of previous messages of the video's chat sent as history
    #[serde(default = "default_history_messages")]
    pub history_messages: usize,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_provider() -> ProviderKind {
    ProviderKind::OpenAI
}

fn default_history_messages() -> usize {
    6
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            history_messages: default_history_messages(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// ============= Embeddings Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embeddings_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_base")]
    pub api_base: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Maximum number of texts per embeddings request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embeddings_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_embeddings_key_env(),
            api_base: default_openai_base(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
        }
    }
}

// ============= RAG Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_min_chunk_tokens")]
    pub min_chunk_tokens: usize,

    #[serde(default = "default_max_chunk_tokens")]
    pub max_chunk_tokens: usize,

    /// Number of similarity hits added to the context
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Half-width of the playback window, in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: f64,
}

fn default_min_chunk_tokens() -> usize {
    500
}

fn default_max_chunk_tokens() -> usize {
    1000
}

fn default_top_k() -> usize {
    5
}

fn default_window_secs() -> f64 {
    120.0
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            min_chunk_tokens: default_min_chunk_tokens(),
            max_chunk_tokens: default_max_chunk_tokens(),
            top_k: default_top_k(),
            window_secs: default_window_secs(),
        }
    }
}

// ============= YouTube Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,

    #[serde(default = "default_caption_language")]
    pub caption_language: String,
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

fn default_caption_language() -> String {
    "en".to_string()
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            caption_language: default_caption_language(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Default provider '{0}' has no [providers.{0}] section")]
    MissingProvider(ProviderKind),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl GraspConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: GraspConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for internal consistency and env var availability
    pub fn validate(&self) -> Result<(), ConfigError> {
        let default = self.chat.default_provider;
        if self.providers.get(default).is_none() {
            return Err(ConfigError::MissingProvider(default));
        }

        for kind in self.providers.configured() {
            if let Some(provider) = self.providers.get(kind) {
                self.validate_env_var(&provider.api_key_env)?;
                if provider.model.trim().is_empty() {
                    return Err(ConfigError::ValidationError(format!(
                        "providers.{}.model must not be empty",
                        kind
                    )));
                }
            }
        }

        self.validate_env_var(&self.embeddings.api_key_env)?;
        if self.embeddings.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embeddings.batch_size must be at least 1".to_string(),
            ));
        }

        let rag = &self.rag;
        if rag.min_chunk_tokens == 0 || rag.min_chunk_tokens > rag.max_chunk_tokens {
            return Err(ConfigError::ValidationError(format!(
                "rag chunk bounds must satisfy 0 < min_chunk_tokens <= max_chunk_tokens (got {} and {})",
                rag.min_chunk_tokens, rag.max_chunk_tokens
            )));
        }
        if rag.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "rag.top_k must be at least 1".to_string(),
            ));
        }
        if !rag.window_secs.is_finite() || rag.window_secs < 0.0 {
            return Err(ConfigError::ValidationError(
                "rag.window_secs must be a non-negative number".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
        Ok(())
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

// ============= Hot Reloading Configuration Manager =============

/// Thread-safe configuration manager with hot reloading support
pub struct GraspConfigManager {
    config: Arc<ArcSwap<GraspConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
}

impl GraspConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = GraspConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
        })
    }

    /// Create a config manager directly from a config (useful for testing).
    /// This won't have file watching capabilities.
    pub fn from_config(config: GraspConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("grasp.toml"),
            watcher: RwLock::new(None),
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<GraspConfig> {
        self.config.load_full()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Manually reload the configuration from disk
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = GraspConfig::load(&self.config_path)?;
        self.config.store(Arc::new(new_config));

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    pub fn start_watching(&self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);
        let file_name = self.config_path.file_name().map(|n| n.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let touches_config = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_config && (event.kind.is_modify() || event.kind.is_create()) {
                        // Debounced in the receiver
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Config watcher error: {:?}", e);
                }
            }
        })?;

        // Watch the parent directory so editors that replace the file are seen
        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            let settle = Duration::from_millis(200);

            while rx.recv().await.is_some() {
                // Let the writer finish, then fold the burst of events into one reload
                tokio::time::sleep(settle).await;
                while rx.try_recv().is_ok() {}

                match GraspConfig::load(&config_path) {
                    Ok(new_config) => {
                        config_arc.store(Arc::new(new_config));
                        info!("Configuration hot-reloaded successfully");
                    }
                    Err(e) => {
                        warn!(
                            "Failed to hot-reload config: {}. Keeping previous config.",
                            e
                        );
                    }
                }
            }
        });

        info!("Configuration hot-reload watcher started");
        Ok(())
    }

    /// Stop watching for configuration changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Configuration hot-reload watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config(key_env: &str) -> String {
        format!(
            r#"
[server]
host = "0.0.0.0"
port = 9000
log_level = "debug"

[database]
url = ":memory:"

[vector_store]

[providers.anthropic]
api_key_env = "{key_env}"
model = "claude-sonnet-4-20250514"

[providers.gemini]
api_key_env = "{key_env}"
model = "gemini-1.5-flash"
max_tokens = 1024

[chat]
default_provider = "anthropic"
history_messages = 4

[embeddings]
api_key_env = "{key_env}"

[rag]
top_k = 3
"#
        )
    }

    #[test]
    fn test_parse_config() {
        let config: GraspConfig = toml::from_str(&sample_config("UNUSED")).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.chat.default_provider, ProviderKind::Anthropic);
        assert_eq!(config.chat.history_messages, 4);
        assert_eq!(
            config.providers.configured(),
            vec![ProviderKind::Anthropic, ProviderKind::Gemini]
        );
        assert_eq!(config.providers.gemini.as_ref().unwrap().max_tokens, 1024);
        assert_eq!(config.providers.anthropic.as_ref().unwrap().max_tokens, 2048);
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.rag.min_chunk_tokens, 500);
        assert_eq!(config.rag.max_chunk_tokens, 1000);
        assert_eq!(config.embeddings.model, "text-embedding-3-small");
        assert_eq!(config.vector_store.path.as_deref(), Some("./data/vectors.json"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: GraspConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.url, "./data/grasp.db");
        assert_eq!(config.chat.default_provider, ProviderKind::OpenAI);
        assert_eq!(config.rag.window_secs, 120.0);
        assert_eq!(config.youtube.caption_language, "en");
    }

    #[test]
    fn test_validation_missing_default_provider() {
        let config: GraspConfig = toml::from_str(
            r#"
[chat]
default_provider = "gemini"
"#,
        )
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingProvider(ProviderKind::Gemini))
        ));
    }

    #[test]
    fn test_validation_missing_env_var() {
        let config: GraspConfig =
            toml::from_str(&sample_config("GRASP_TEST_SURELY_UNSET_KEY")).unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingEnvVar(name)) if name == "GRASP_TEST_SURELY_UNSET_KEY"
        ));
    }

    #[test]
    fn test_validation_chunk_bounds() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("GRASP_TEST_CHUNK_BOUNDS_KEY", "key");
        }
        let mut config: GraspConfig =
            toml::from_str(&sample_config("GRASP_TEST_CHUNK_BOUNDS_KEY")).unwrap();
        assert!(config.validate().is_ok());

        config.rag.min_chunk_tokens = 1200;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = GraspConfig::load("/definitely/not/here/grasp.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_manager_from_config() {
        let manager = GraspConfigManager::from_config(GraspConfig::default());
        assert_eq!(manager.config().server.port, 8000);
    }
}
