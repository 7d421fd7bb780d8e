// tests/query_pipeline_tests.rs
// End-to-end behaviour of the RAG pipeline with a stubbed generator
//
// Run with: cargo test --test query_pipeline_tests -- --nocapture

use helpbot::embedder::{embed, EmbeddingService};
use helpbot::memory::{
    ContextAssembler, FallbackTopic, LLMError, LLMProvider, RagConfig, RagError,
    RagQueryPipeline, VectorRecord, VectorStore,
};
use helpbot::tokenizer::WordEstimateCounter;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

// ───────────────────────────────────────────────────────────────────────────
// Helpers
// ───────────────────────────────────────────────────────────────────────────

struct FixedLLM(&'static str);

#[async_trait::async_trait]
impl LLMProvider for FixedLLM {
    async fn generate(&self, _prompt: &str) -> Result<String, LLMError> {
        Ok(self.0.to_string())
    }
    fn model_name(&self) -> &str {
        "fixed"
    }
}

struct DownLLM;

#[async_trait::async_trait]
impl LLMProvider for DownLLM {
    async fn generate(&self, _prompt: &str) -> Result<String, LLMError> {
        Err(LLMError::ConnectionFailed("connection refused".to_string()))
    }
    fn model_name(&self) -> &str {
        "down"
    }
}

fn record(content: &str, source: &str) -> VectorRecord {
    let mut metadata = HashMap::new();
    metadata.insert("source".to_string(), Value::String(source.to_string()));
    VectorRecord::new(content.to_string(), metadata, embed(content))
}

fn store(docs: &[(&str, &str)]) -> VectorStore {
    let mut store = VectorStore::new();
    for (content, source) in docs {
        store.add_record(record(content, source)).unwrap();
    }
    store
}

fn pipeline(
    store: Option<VectorStore>,
    llm: Arc<dyn LLMProvider>,
    config: RagConfig,
) -> RagQueryPipeline {
    RagQueryPipeline::new(
        Arc::new(EmbeddingService::default()),
        store.map(|s| Arc::new(RwLock::new(s))),
        llm,
        ContextAssembler::new(Arc::new(WordEstimateCounter)),
        config,
    )
}

const REGISTRATION_DOC: &str = "MOSDAC registration requires a verified email address";

// ───────────────────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_relevant_match_uses_generator() {
    let p = pipeline(
        Some(store(&[(REGISTRATION_DOC, "data/books/register.md")])),
        Arc::new(FixedLLM("Sign up with a verified email.")),
        RagConfig::default(),
    );

    let resp = p.answer(REGISTRATION_DOC).await;
    assert!(!resp.is_fallback());
    assert_eq!(resp.answer, "Sign up with a verified email.");
    assert_eq!(resp.sources.len(), 1);
    assert_eq!(resp.sources[0].source, "data/books/register.md");
    assert!(resp.sources[0].relevance > 0.99);
    assert_eq!(resp.context.as_deref(), Some(REGISTRATION_DOC));
}

#[tokio::test]
async fn test_sources_ordered_by_relevance() {
    let p = pipeline(
        Some(store(&[
            ("alpha", "one.md"),
            ("alpha beta gamma delta", "four.md"),
            ("alpha beta", "two.md"),
        ])),
        Arc::new(FixedLLM("ok")),
        RagConfig {
            relevance_threshold: 0.0,
            ..RagConfig::default()
        },
    );

    let resp = p.answer("alpha").await;
    assert!(!resp.is_fallback());
    assert_eq!(resp.sources.len(), 3);
    assert_eq!(resp.sources[0].source, "one.md");
    for pair in resp.sources.windows(2) {
        assert!(pair[0].relevance >= pair[1].relevance);
    }
}

#[tokio::test]
async fn test_top_k_limits_sources() {
    let docs: Vec<(String, String)> = (0..10)
        .map(|i| (format!("satellite product {}", i), format!("doc{}.md", i)))
        .collect();
    let refs: Vec<(&str, &str)> = docs.iter().map(|(c, s)| (c.as_str(), s.as_str())).collect();
    let p = pipeline(
        Some(store(&refs)),
        Arc::new(FixedLLM("ok")),
        RagConfig::default(),
    );

    let resp = p.answer("satellite product").await;
    assert!(!resp.is_fallback());
    assert_eq!(resp.sources.len(), 6);
}

#[tokio::test]
async fn test_low_confidence_falls_back() {
    let p = pipeline(
        Some(store(&[("alpha beta gamma delta", "greek.md")])),
        Arc::new(FixedLLM("should not be used")),
        RagConfig {
            relevance_threshold: 0.9,
            ..RagConfig::default()
        },
    );

    let resp = p.answer("alpha download").await;
    assert_eq!(resp.fallback_topic, Some(FallbackTopic::Download));
    assert_eq!(resp.sources[0].source, "MOSDAC Data Download Guide");
    assert!(resp.context.is_none());
}

#[tokio::test]
async fn test_empty_store_falls_back() {
    let p = pipeline(
        Some(VectorStore::new()),
        Arc::new(FixedLLM("unused")),
        RagConfig::default(),
    );

    let resp = p.answer("Which INSAT products are available?").await;
    assert_eq!(resp.fallback_topic, Some(FallbackTopic::SatelliteData));
    assert_eq!(resp.sources.len(), 1);
    assert_eq!(resp.sources[0].relevance, 0.8);
}

#[tokio::test]
async fn test_search_failure_falls_back() {
    // records built with a foreign embedding size, so every search fails
    let mut metadata = HashMap::new();
    metadata.insert("source".to_string(), Value::String("legacy.md".to_string()));
    let mut legacy = VectorStore::new();
    legacy
        .add_record(VectorRecord::new(
            "MOSDAC registration steps".to_string(),
            metadata,
            vec![0.5; 8],
        ))
        .unwrap();

    let p = pipeline(
        Some(legacy),
        Arc::new(FixedLLM("should not be used")),
        RagConfig::default(),
    );

    assert!(matches!(
        p.generate("How do I register?").await,
        Err(RagError::SearchFailed(_))
    ));

    let resp = p.answer("How do I register?").await;
    assert_eq!(resp.fallback_topic, Some(FallbackTopic::Registration));
    assert_eq!(resp.sources.len(), 1);
    assert_eq!(resp.sources[0].source, "MOSDAC Registration Guide");
    assert_eq!(resp.sources[0].relevance, 0.9);
    assert!(resp.context.is_none());
}

#[tokio::test]
async fn test_generation_failure_falls_back() {
    let p = pipeline(
        Some(store(&[(REGISTRATION_DOC, "register.md")])),
        Arc::new(DownLLM),
        RagConfig::default(),
    );

    let resp = p.answer(REGISTRATION_DOC).await;
    assert_eq!(resp.fallback_topic, Some(FallbackTopic::Registration));
    assert_eq!(resp.sources[0].source, "MOSDAC Registration Guide");
    assert_eq!(resp.sources[0].relevance, 0.9);
}

#[tokio::test]
async fn test_degraded_mode_always_falls_back() {
    let p = pipeline(None, Arc::new(FixedLLM("unused")), RagConfig::default());
    assert!(p.is_degraded());
    assert_eq!(p.document_count().await, 0);

    let resp = p.answer("What is the weather like?").await;
    assert_eq!(resp.fallback_topic, Some(FallbackTopic::General));
    assert!(resp.answer.contains("What is the weather like?"));
    assert_eq!(resp.sources[0].source, "MOSDAC Help Center");
}

#[tokio::test]
async fn test_context_respects_token_budget() {
    let long_doc = "satellite ".repeat(400);
    let p = pipeline(
        Some(store(&[(long_doc.as_str(), "long.md")])),
        Arc::new(FixedLLM("ok")),
        RagConfig::default(),
    );

    let resp = p.answer("satellite").await;
    let context = resp.context.expect("generation path used");
    let estimated = context.split_whitespace().count() * 13 / 10;
    assert!(estimated <= 250);
    assert!(long_doc.starts_with(&context));
}
