// src/memory/query.rs
// RAG query pipeline: retrieval -> context assembly -> generation, with fallback

use crate::embedder::EmbeddingService;
use crate::memory::context::{ContextAssembler, DEFAULT_MAX_CONTEXT_TOKENS};
use crate::memory::fallback::{fallback, FallbackTopic};
use crate::memory::llm_provider::LLMProvider;
use crate::memory::vector_store::{Passage, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const PROMPT_TEMPLATE: &str = "
Answer the question based only on the following context:

{context}

---

Answer the question based on the above context: {question}
";

/// A cited source in a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source: String,
    pub relevance: f32,
}

/// Query request body
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Answer returned to callers. Only `answer` and `sources` go over the wire.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    #[serde(skip)]
    pub context: Option<String>,
    #[serde(skip)]
    pub fallback_topic: Option<FallbackTopic>,
}

impl QueryResponse {
    pub fn is_fallback(&self) -> bool {
        self.fallback_topic.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RagConfig {
    pub top_k: usize,
    pub relevance_threshold: f32,
    pub max_context_tokens: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 6,
            relevance_threshold: 0.2,
            max_context_tokens: DEFAULT_MAX_CONTEXT_TOKENS,
        }
    }
}

/// Why the generation path was not used
#[derive(Debug, Clone, Error)]
pub enum RagError {
    #[error("Vector store unavailable")]
    StoreUnavailable,

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("No results found")]
    NoResults,

    #[error("Top relevance {top:.3} below threshold {threshold:.3}")]
    LowConfidence { top: f32, threshold: f32 },

    #[error("LLM generation failed: {0}")]
    LLMGenerationFailed(String),
}

pub struct RagQueryPipeline {
    embedding_service: Arc<EmbeddingService>,
    vector_store: Option<Arc<RwLock<VectorStore>>>,
    llm_provider: Arc<dyn LLMProvider>,
    assembler: ContextAssembler,
    config: RagConfig,
}

impl RagQueryPipeline {
    /// `vector_store = None` runs in degraded mode: every query is answered
    /// by the fallback table.
    pub fn new(
        embedding_service: Arc<EmbeddingService>,
        vector_store: Option<Arc<RwLock<VectorStore>>>,
        llm_provider: Arc<dyn LLMProvider>,
        assembler: ContextAssembler,
        config: RagConfig,
    ) -> Self {
        info!(
            llm_model = llm_provider.model_name(),
            tokenizer = assembler.counter().name(),
            degraded = vector_store.is_none(),
            top_k = config.top_k,
            relevance_threshold = config.relevance_threshold,
            max_context_tokens = config.max_context_tokens,
            "Initializing RAG pipeline"
        );
        Self {
            embedding_service,
            vector_store,
            llm_provider,
            assembler,
            config,
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.llm_provider.model_name()
    }

    pub fn is_degraded(&self) -> bool {
        self.vector_store.is_none()
    }

    pub async fn document_count(&self) -> usize {
        match &self.vector_store {
            Some(store) => store.read().await.len(),
            None => 0,
        }
    }

    /// Answer a query. Never fails: any pipeline error, or a retrieval that
    /// is empty or below the relevance threshold, yields the fallback answer.
    pub async fn answer(&self, query: &str) -> QueryResponse {
        match self.generate(query).await {
            Ok(response) => response,
            Err(e) => {
                let resp = fallback(query);
                info!(query = %query, reason = %e, fallback_topic = resp.topic.as_str(), "Answering with fallback");
                QueryResponse {
                    answer: resp.answer,
                    sources: resp.sources,
                    context: None,
                    fallback_topic: Some(resp.topic),
                }
            }
        }
    }

    /// The generation path alone: retrieve, check confidence, assemble, generate.
    pub async fn generate(&self, query: &str) -> Result<QueryResponse, RagError> {
        let passages = self.retrieve(query).await?;
        self.check_confidence(&passages)?;

        let context = self
            .assembler
            .assemble(&passages, self.config.max_context_tokens);
        debug!(
            context_tokens = self.assembler.counter().count(&context),
            budget = self.config.max_context_tokens,
            "Context assembled"
        );

        let prompt = build_prompt(&context, query);
        let answer = self
            .llm_provider
            .generate(&prompt)
            .await
            .map_err(|e| {
                warn!(error = %e, "Generation failed");
                RagError::LLMGenerationFailed(e.to_string())
            })?;

        let sources = passages
            .iter()
            .map(|p| SourceRef {
                source: p.source().to_string(),
                relevance: p.relevance,
            })
            .collect();

        info!(query = %query, results = passages.len(), "RAG query completed");
        Ok(QueryResponse {
            answer,
            sources,
            context: Some(context),
            fallback_topic: None,
        })
    }

    /// Top-k passages for the query, most relevant first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Passage>, RagError> {
        let store = self.vector_store.as_ref().ok_or(RagError::StoreUnavailable)?;
        let query_embedding = self.embedding_service.embed_query(query).await;
        let passages = store
            .read()
            .await
            .search_with_relevance(&query_embedding, self.config.top_k)
            .map_err(|e| RagError::SearchFailed(e.to_string()))?;

        debug!(
            results = passages.len(),
            top_relevance = passages.first().map(|p| p.relevance).unwrap_or(0.0),
            "Retrieved passages"
        );
        Ok(passages)
    }

    /// Reject empty or low-confidence retrievals.
    pub fn check_confidence(&self, passages: &[Passage]) -> Result<(), RagError> {
        let top = passages.first().ok_or(RagError::NoResults)?;
        if top.relevance < self.config.relevance_threshold {
            return Err(RagError::LowConfidence {
                top: top.relevance,
                threshold: self.config.relevance_threshold,
            });
        }
        Ok(())
    }
}

/// Fill `PROMPT_TEMPLATE` in a single scan. Substituted text is never
/// rescanned, so braces inside the context or question are kept verbatim.
pub fn build_prompt(context: &str, question: &str) -> String {
    let slots = [("{context}", context), ("{question}", question)];
    let mut prompt = String::with_capacity(PROMPT_TEMPLATE.len() + context.len() + question.len());
    let mut rest = PROMPT_TEMPLATE;

    while let Some(open) = rest.find('{') {
        prompt.push_str(&rest[..open]);
        let tail = &rest[open..];
        match slots.iter().find(|(slot, _)| tail.starts_with(slot)) {
            Some((slot, value)) => {
                prompt.push_str(value);
                rest = &tail[slot.len()..];
            }
            None => {
                prompt.push('{');
                rest = &tail[1..];
            }
        }
    }
    prompt.push_str(rest);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::llm_provider::LLMError;
    use crate::tokenizer::WordEstimateCounter;

    struct EchoLLM;

    #[async_trait::async_trait]
    impl LLMProvider for EchoLLM {
        async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
            Ok(format!("echo:{}", prompt.len()))
        }
        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn pipeline(store: Option<VectorStore>) -> RagQueryPipeline {
        RagQueryPipeline::new(
            Arc::new(EmbeddingService::default()),
            store.map(|s| Arc::new(RwLock::new(s))),
            Arc::new(EchoLLM),
            ContextAssembler::new(Arc::new(WordEstimateCounter)),
            RagConfig::default(),
        )
    }

    #[test]
    fn test_rag_config_default() {
        let config = RagConfig::default();
        assert_eq!(config.top_k, 6);
        assert_eq!(config.relevance_threshold, 0.2);
        assert_eq!(config.max_context_tokens, 250);
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt("CTX", "Q?");
        assert!(prompt.contains("following context:\n\nCTX\n\n---\n\nAnswer"));
        assert!(prompt.trim_end().ends_with("above context: Q?"));
    }

    #[test]
    fn test_build_prompt_keeps_placeholders_in_context() {
        let prompt = build_prompt("Forms use the {question} field.", "How do I register?");
        assert!(prompt.contains("following context:\n\nForms use the {question} field.\n\n---"));
        assert!(prompt.trim_end().ends_with("above context: How do I register?"));
        assert_eq!(prompt.matches("How do I register?").count(), 1);
    }

    #[test]
    fn test_build_prompt_keeps_placeholders_in_question() {
        let prompt = build_prompt("CTX", "what does {context} mean?");
        assert_eq!(prompt.matches("CTX").count(), 1);
        assert!(prompt.trim_end().ends_with("above context: what does {context} mean?"));
    }

    #[test]
    fn test_check_confidence() {
        let p = pipeline(None);
        assert!(matches!(p.check_confidence(&[]), Err(RagError::NoResults)));
        let low = vec![Passage::new("x", "a.md", 0.19)];
        assert!(matches!(
            p.check_confidence(&low),
            Err(RagError::LowConfidence { .. })
        ));
        let ok = vec![Passage::new("x", "a.md", 0.2)];
        assert!(p.check_confidence(&ok).is_ok());
    }

    #[tokio::test]
    async fn test_degraded_mode_uses_fallback() {
        let p = pipeline(None);
        assert!(p.is_degraded());
        let resp = p.answer("how do I register").await;
        assert_eq!(resp.fallback_topic, Some(FallbackTopic::Registration));
        assert_eq!(resp.sources[0].relevance, 0.9);
        assert!(matches!(p.generate("x").await, Err(RagError::StoreUnavailable)));
    }

    #[tokio::test]
    async fn test_empty_store_uses_fallback() {
        let p = pipeline(Some(VectorStore::new()));
        let resp = p.answer("what is the weather today").await;
        assert!(resp.is_fallback());
        assert!(resp.answer.contains("what is the weather today"));
    }

    #[test]
    fn test_response_serializes_answer_and_sources_only() {
        let resp = QueryResponse {
            answer: "a".to_string(),
            sources: vec![SourceRef {
                source: "s".to_string(),
                relevance: 0.5,
            }],
            context: Some("ctx".to_string()),
            fallback_topic: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"answer": "a", "sources": [{"source": "s", "relevance": 0.5}]})
        );
    }
}
