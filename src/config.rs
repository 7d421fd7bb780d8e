// src/config.rs
use crate::error::ConfigError;
use crate::memory::llm_provider::{GenerationParams, LLMConfig};
use crate::memory::query::RagConfig;
use crate::memory::splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::memory::vector_store::SNAPSHOT_FILE;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_CORS_ORIGINS: &str = "https://ai-based-help-bot-full.onrender.com,https://ai-based-help-bot.onrender.com,http://localhost:3000";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub data_path: PathBuf,
    pub store_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub rag: RagConfig,
    pub llm: LLMConfig,
    pub tokenizer: String,
}

impl ApiConfig {
    /// Load `.env` (if present) and read settings from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let defaults = GenerationParams::default();
        let rag_defaults = RagConfig::default();

        let store_path = lookup("STORE_PATH")
            .or_else(|| lookup("CHROMA_PATH"))
            .unwrap_or_else(|| "chroma".to_string());

        Ok(Self {
            host: string("BACKEND_HOST", "127.0.0.1"),
            port: parse(&lookup, "BACKEND_PORT", 8000)?,
            cors_origins: string("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
            data_path: PathBuf::from(string("DATA_PATH", "data/books")),
            store_path: PathBuf::from(store_path),
            chunk_size: parse(&lookup, "CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: parse(&lookup, "CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            rag: RagConfig {
                top_k: parse(&lookup, "RETRIEVAL_TOP_K", rag_defaults.top_k)?,
                relevance_threshold: parse(
                    &lookup,
                    "RELEVANCE_THRESHOLD",
                    rag_defaults.relevance_threshold,
                )?,
                max_context_tokens: parse(
                    &lookup,
                    "MAX_CONTEXT_TOKENS",
                    rag_defaults.max_context_tokens,
                )?,
            },
            llm: LLMConfig {
                ollama_url: string("OLLAMA_URL", "http://localhost:11434"),
                model: string("LLM_MODEL", "flan-t5-base"),
                params: GenerationParams {
                    temperature: parse(&lookup, "LLM_TEMPERATURE", defaults.temperature)?,
                    top_p: parse(&lookup, "LLM_TOP_P", defaults.top_p)?,
                    repeat_penalty: parse(&lookup, "LLM_REPEAT_PENALTY", defaults.repeat_penalty)?,
                    max_tokens: parse(&lookup, "LLM_MAX_TOKENS", defaults.max_tokens)?,
                },
            },
            tokenizer: string("TOKENIZER", "cl100k_base"),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.store_path.join(SNAPSHOT_FILE)
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
