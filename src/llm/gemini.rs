//! Google Gemini client (`generateContent`)
//!
//! Gemini names the assistant role `model` and takes the system prompt as a
//! separate `systemInstruction`.

use crate::llm::client::{LLMClient, ModelParams, http_client, network_error, status_error};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "Gemini";

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    params: ModelParams,
}

impl GeminiClient {
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

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }

    fn build_request(&self, messages: &[(String, String)]) -> GenerateRequest {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for (role, content) in messages {
            let part = Part {
                text: content.clone(),
            };
            match role.as_str() {
                "system" => system_parts.push(part),
                "assistant" | "model" => contents.push(Content {
                    role: Some("model".to_string()),
                    parts: vec![part],
                }),
                _ => contents.push(Content {
                    role: Some("user".to_string()),
                    parts: vec![part],
                }),
            }
        }

        GenerateRequest {
            system_instruction: (!system_parts.is_empty()).then(|| Content {
                role: None,
                parts: system_parts,
            }),
            contents,
            generation_config: GenerationConfig {
                max_output_tokens: self.params.max_tokens,
                temperature: self.params.temperature,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate_with_history(&self, messages: &[(String, String)]) -> Result<String> {
        let request = self.build_request(messages);

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| network_error(PROVIDER, e.without_url()))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLM(format!("Invalid response from Gemini: {}", e)))?;

        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AppError::LLM("No response from Gemini".to_string()));
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_maps_roles() {
        let client = GeminiClient::with_params(
            "key".to_string(),
            "http://localhost".to_string(),
            "gemini-1.5-flash".to_string(),
            ModelParams::default(),
        )
        .unwrap();

        let request = client.build_request(&[
            ("system".to_string(), "you are a tutor".to_string()),
            ("user".to_string(), "hi".to_string()),
            ("assistant".to_string(), "hello".to_string()),
        ]);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "you are a tutor");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_endpoint_includes_model() {
        let client = GeminiClient::with_params(
            "key".to_string(),
            "https://generativelanguage.googleapis.com".to_string(),
            "gemini-1.5-flash".to_string(),
            ModelParams::default(),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
