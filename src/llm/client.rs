//! LLM Client abstractions and provider management
//!
//! This module provides a unified interface for the hosted chat providers:
//! - **OpenAI**: Chat Completions API
//! - **Anthropic**: Messages API
//! - **Gemini**: `generateContent` API
//!
//! All three are plain REST calls through `reqwest`, so any compatible
//! endpoint (a proxy, or a mock server in tests) can be targeted with
//! `api_base`.

use crate::types::{AppError, Result};
use crate::utils::toml_config::{GraspConfig, GraspConfigManager, ProviderConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

/// Generic LLM client trait for provider abstraction
///
/// All LLM providers implement this trait, allowing for easy swapping
/// between providers without changing application code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.generate_with_history(&[
            ("system".to_string(), system.to_string()),
            ("user".to_string(), prompt.to_string()),
        ])
        .await
    }

    /// Generate with conversation history
    async fn generate_with_history(
        &self,
        messages: &[(String, String)], // (role, content) pairs
    ) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// The chat providers a request can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::OpenAI,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(AppError::InvalidInput(format!(
                "Unknown provider '{}'. Expected one of: openai, anthropic, gemini",
                other
            ))),
        }
    }
}

/// Model inference parameters shared by all providers
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_secs: u64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
            request_timeout_secs: 120,
        }
    }
}

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI Chat Completions (or any compatible API)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-4o-mini".to_string(),
    ///     params: ModelParams::default(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        params: ModelParams,
    },

    /// Anthropic Claude Messages API
    Anthropic {
        api_key: String,
        api_base: String,
        model: String,
        params: ModelParams,
    },

    /// Google Gemini
    Gemini {
        api_key: String,
        api_base: String,
        model: String,
        params: ModelParams,
    },
}

impl Provider {
    /// Build a provider from its configuration block, resolving the API key
    /// from the environment.
    pub fn from_config(
        kind: ProviderKind,
        config: &ProviderConfig,
        request_timeout_secs: u64,
    ) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            AppError::Configuration(format!(
                "Environment variable '{}' for provider '{}' is not set",
                config.api_key_env, kind
            ))
        })?;

        let params = ModelParams {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            request_timeout_secs,
        };
        let model = config.model.clone();
        let base = |default: &str| {
            config
                .api_base
                .clone()
                .unwrap_or_else(|| default.to_string())
                .trim_end_matches('/')
                .to_string()
        };

        Ok(match kind {
            ProviderKind::OpenAI => Provider::OpenAI {
                api_key,
                api_base: base(OPENAI_API_BASE),
                model,
                params,
            },
            ProviderKind::Anthropic => Provider::Anthropic {
                api_key,
                api_base: base(ANTHROPIC_API_BASE),
                model,
                params,
            },
            ProviderKind::Gemini => Provider::Gemini {
                api_key,
                api_base: base(GEMINI_API_BASE),
                model,
                params,
            },
        })
    }

    /// Create a client instance for this provider
    pub fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                params,
            } => Ok(Box::new(super::openai::OpenAIClient::with_params(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                params.clone(),
            )?)),

            Provider::Anthropic {
                api_key,
                api_base,
                model,
                params,
            } => Ok(Box::new(super::anthropic::AnthropicClient::with_params(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                params.clone(),
            )?)),

            Provider::Gemini {
                api_key,
                api_base,
                model,
                params,
            } => Ok(Box::new(super::gemini::GeminiClient::with_params(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                params.clone(),
            )?)),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::OpenAI { .. } => ProviderKind::OpenAI,
            Provider::Anthropic { .. } => ProviderKind::Anthropic,
            Provider::Gemini { .. } => ProviderKind::Gemini,
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Anthropic { .. } => "Anthropic",
            Provider::Gemini { .. } => "Gemini",
        }
    }
}

/// Factory trait for creating LLM clients
///
/// Handlers hold an `Arc<dyn LLMClientFactoryTrait>` so tests can swap in
/// a mock factory.
pub trait LLMClientFactoryTrait: Send + Sync {
    /// Provider used when a request doesn't name one
    fn default_provider(&self) -> ProviderKind;

    /// Create a client for the given provider
    fn create_for(&self, kind: ProviderKind) -> Result<Box<dyn LLMClient>>;

    /// Create a client using the default provider
    fn create_default(&self) -> Result<Box<dyn LLMClient>> {
        self.create_for(self.default_provider())
    }
}

/// Creates clients from the live configuration, so provider changes in
/// `grasp.toml` apply to the next request.
pub struct ConfigBasedLLMFactory {
    config_manager: Arc<GraspConfigManager>,
}

impl ConfigBasedLLMFactory {
    pub fn new(config_manager: Arc<GraspConfigManager>) -> Self {
        Self { config_manager }
    }

    fn provider_for(config: &GraspConfig, kind: ProviderKind) -> Result<Provider> {
        let provider_config = config.providers.get(kind).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Provider '{}' is not configured on this server",
                kind
            ))
        })?;
        Provider::from_config(kind, provider_config, config.chat.request_timeout_secs)
    }
}

impl LLMClientFactoryTrait for ConfigBasedLLMFactory {
    fn default_provider(&self) -> ProviderKind {
        self.config_manager.config().chat.default_provider
    }

    fn create_for(&self, kind: ProviderKind) -> Result<Box<dyn LLMClient>> {
        let config = self.config_manager.config();
        Self::provider_for(&config, kind)?.create_client()
    }
}

// ============= Shared HTTP helpers =============

/// Build the HTTP client used by a provider
pub(crate) fn http_client(params: &ModelParams) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(params.request_timeout_secs))
        .build()
        .map_err(|e| AppError::LLM(format!("Failed to build HTTP client: {}", e)))
}

/// Map a transport failure to a user-visible provider error
pub(crate) fn network_error(provider: &str, err: reqwest::Error) -> AppError {
    tracing::error!(provider, error = %err, "LLM request failed");
    if err.is_timeout() {
        AppError::LLM(format!("{} network error: request timed out", provider))
    } else {
        AppError::LLM(format!("{} network error: {}", provider, err))
    }
}

/// Turn a non-2xx response into a user-visible provider error
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(provider, status = %status, "LLM provider returned an error");

    match status.as_u16() {
        429 => AppError::LLM(format!("{} rate limit exceeded, try again later", provider)),
        401 | 403 => AppError::LLM(format!(
            "{} authentication failed, check the configured API key",
            provider
        )),
        _ => AppError::LLM(format!(
            "{} API request failed with status {}: {}",
            provider, status, body
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAI);
        assert_eq!("Claude".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("google".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!("mistral".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_kind_serde() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::OpenAI).unwrap(),
            "\"openai\""
        );
        let kind: ProviderKind = serde_json::from_str("\"anthropic\"").unwrap();
        assert_eq!(kind, ProviderKind::Anthropic);
    }

    #[test]
    fn test_provider_name() {
        let gemini = Provider::Gemini {
            api_key: "".to_string(),
            api_base: "".to_string(),
            model: "".to_string(),
            params: ModelParams::default(),
        };
        assert_eq!(gemini.name(), "Gemini");
        assert_eq!(gemini.kind(), ProviderKind::Gemini);
    }

    #[test]
    fn test_from_config_missing_key() {
        let config = ProviderConfig {
            api_key_env: "GRASP_TEST_NO_SUCH_PROVIDER_KEY".to_string(),
            api_base: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2048,
            temperature: 0.7,
        };
        let result = Provider::from_config(ProviderKind::OpenAI, &config, 30);
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_from_config_trims_api_base() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("GRASP_TEST_TRIM_BASE_KEY", "secret");
        }
        let config = ProviderConfig {
            api_key_env: "GRASP_TEST_TRIM_BASE_KEY".to_string(),
            api_base: Some("http://localhost:9999/".to_string()),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
            temperature: 0.2,
        };
        let provider = Provider::from_config(ProviderKind::Anthropic, &config, 30).unwrap();
        match provider {
            Provider::Anthropic {
                api_key,
                api_base,
                params,
                ..
            } => {
                assert_eq!(api_key, "secret");
                assert_eq!(api_base, "http://localhost:9999");
                assert_eq!(params.max_tokens, 1024);
                assert_eq!(params.request_timeout_secs, 30);
            }
            other => panic!("unexpected provider {:?}", other),
        }
    }
}
