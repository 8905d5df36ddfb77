//! Anthropic Claude LLM client implementation
//!
//! Talks to the Messages API directly. System turns are lifted out of the
//! conversation into the top-level `system` field, as the API requires.

use crate::llm::client::{LLMClient, ModelParams, http_client, network_error, status_error};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "Anthropic";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Claude client for API-based inference
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    params: ModelParams,
}

impl AnthropicClient {
    /// Create a new Anthropic client with model parameters
    ///
    /// # Arguments
    ///
    /// * `api_key` - Anthropic API key
    /// * `api_base` - API root without the `/v1` suffix
    /// * `model` - Model identifier (e.g., "claude-sonnet-4-20250514")
    /// * `params` - Model inference parameters
    pub fn with_params(
        api_key: String,
        api_base: String,
        model: String,
        params: ModelParams,
    ) -> Result<Self> {
        Ok(Self {
            http: http_client(&params)?,
            api_key,
            api_base,
            model,
            params,
        })
    }

    /// Split `(role, content)` pairs into the system prompt and the
    /// user/assistant turns.
    fn split_system<'a>(messages: &'a [(String, String)]) -> (Option<String>, Vec<Message<'a>>) {
        let mut system_parts = Vec::new();
        let mut turns = Vec::new();

        for (role, content) in messages {
            match role.as_str() {
                "system" => system_parts.push(content.as_str()),
                "assistant" => turns.push(Message {
                    role: "assistant",
                    content,
                }),
                _ => turns.push(Message {
                    role: "user",
                    content,
                }),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, turns)
    }

    /// Extract text content from response content blocks
    fn extract_text_content(content: &[ContentBlock]) -> String {
        content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[async_trait]
impl LLMClient for AnthropicClient {
    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        let (system, turns) = Self::split_system(messages);

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            system,
            messages: turns,
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Invalid response from Anthropic: {}", e)))?;

        let text = Self::extract_text_content(&body.content);
        if text.is_empty() {
            return Err(AppError::LLM("No text content in Anthropic response".to_string()));
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
