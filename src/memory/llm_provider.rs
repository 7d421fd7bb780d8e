// src/memory/llm_provider.rs
// LLM Provider abstraction - pluggable generation backend
// Default: a locally served model via Ollama

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// LLM Provider trait - implement this to support new backends
#[async_trait::async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError>;
    fn model_name(&self) -> &str;
}

/// Sampling parameters passed to the generation backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub repeat_penalty: f32,
    pub max_tokens: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.9,
            repeat_penalty: 1.2,
            max_tokens: 1024,
        }
    }
}

/// Connection settings for the generation backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub ollama_url: String,
    pub model: String,
    pub params: GenerationParams,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model: "flan-t5-base".to_string(),
            params: GenerationParams::default(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum LLMError {
    #[error("LLM connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),
}

/// Ollama-based LLM provider
pub struct OllamaProvider {
    url: String,
    model: String,
    params: GenerationParams,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
    num_predict: usize,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaProvider {
    pub fn new(config: LLMConfig) -> Self {
        info!(url = %config.ollama_url, model = %config.model, "Initializing Ollama provider");
        Self {
            url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.model,
            params: config.params,
            client: reqwest::Client::new(),
        }
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> OllamaRequest<'a> {
        OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.params.temperature,
                top_p: self.params.top_p,
                repeat_penalty: self.params.repeat_penalty,
                num_predict: self.params.max_tokens,
            },
        }
    }
}

#[async_trait::async_trait]
impl LLMProvider for OllamaProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Generating with Ollama");

        let url = format!("{}/api/generate", self.url);
        let response = self
            .client
            .post(&url)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| LLMError::ConnectionFailed(format!("Cannot reach {}: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Ollama returned an error status");
            return Err(LLMError::GenerationFailed(format!("{}: {}", status, body)));
        }

        let ollama_resp: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(e.to_string()))?;

        info!(model = %self.model, response_len = ollama_resp.response.len(), "Generation complete");
        Ok(ollama_resp.response.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LLMConfig::default();
        assert_eq!(config.model, "flan-t5-base");
        assert_eq!(config.params.temperature, 0.3);
        assert_eq!(config.params.repeat_penalty, 1.2);
    }

    #[test]
    fn test_request_body_carries_params() {
        let provider = OllamaProvider::new(LLMConfig {
            ollama_url: "http://localhost:11434/".to_string(),
            ..Default::default()
        });
        let body = serde_json::to_value(provider.request_body("hi")).unwrap();
        assert_eq!(body["model"], "flan-t5-base");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 1024);
        assert_eq!(provider.url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_connection_error() {
        let provider = OllamaProvider::new(LLMConfig {
            ollama_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        });
        let err = provider.generate("hello").await.unwrap_err();
        assert!(matches!(err, LLMError::ConnectionFailed(_)));
    }

    #[test]
    fn test_llm_error_display() {
        let err = LLMError::ConnectionFailed("test".to_string());
        assert!(err.to_string().contains("connection failed"));
    }
}
