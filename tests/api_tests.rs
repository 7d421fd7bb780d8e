// tests/api_tests.rs
// HTTP contract of POST /query and GET /health
//
// Run with: cargo test --test api_tests -- --nocapture

use actix_web::{http::StatusCode, test, web, App};
use helpbot::embedder::{embed, EmbeddingService};
use helpbot::memory::{
    ContextAssembler, LLMError, LLMProvider, RagConfig, RagQueryPipeline, VectorRecord,
    VectorStore,
};
use helpbot::tokenizer::WordEstimateCounter;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

struct CannedLLM;

#[async_trait::async_trait]
impl LLMProvider for CannedLLM {
    async fn generate(&self, _prompt: &str) -> Result<String, LLMError> {
        Ok("Use the Sign Up page.".to_string())
    }
    fn model_name(&self) -> &str {
        "canned"
    }
}

const DOC: &str = "Register on the MOSDAC portal using the Sign Up page";

fn pipeline(with_store: bool) -> Arc<RagQueryPipeline> {
    let store = with_store.then(|| {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), Value::String("signup.md".to_string()));
        let mut store = VectorStore::new();
        store
            .add_record(VectorRecord::new(DOC.to_string(), metadata, embed(DOC)))
            .unwrap();
        Arc::new(RwLock::new(store))
    });

    Arc::new(RagQueryPipeline::new(
        Arc::new(EmbeddingService::default()),
        store,
        Arc::new(CannedLLM),
        ContextAssembler::new(Arc::new(WordEstimateCounter)),
        RagConfig::default(),
    ))
}

macro_rules! app {
    ($with_store:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::from(pipeline($with_store)))
                .configure(helpbot::api::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn test_query_returns_answer_and_sources() {
    let app = app!(true);
    let req = test::TestRequest::post()
        .uri("/query")
        .set_json(json!({ "query": DOC }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["answer"], "Use the Sign Up page.");
    assert_eq!(body["sources"][0]["source"], "signup.md");
    assert!(body["sources"][0]["relevance"].as_f64().unwrap() > 0.99);
    assert!(body.get("context").is_none());
}

#[actix_web::test]
async fn test_fallback_answer_is_still_200() {
    let app = app!(false);
    let req = test::TestRequest::post()
        .uri("/query")
        .set_json(json!({ "query": "How do I download data?" }))
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["sources"][0]["source"], "MOSDAC Data Download Guide");
    assert!(!body["answer"].as_str().unwrap().is_empty());
}

#[actix_web::test]
async fn test_blank_query_rejected() {
    let app = app!(true);
    for query in ["", "   ", "\n\t"] {
        let req = test::TestRequest::post()
            .uri("/query")
            .set_json(json!({ "query": query }))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Query cannot be empty");
    }
}

#[actix_web::test]
async fn test_malformed_body_rejected() {
    let app = app!(true);

    let req = test::TestRequest::post()
        .uri("/query")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["detail"].is_string());

    let req = test::TestRequest::post()
        .uri("/query")
        .set_json(json!({ "question": "missing field" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_health_reports_store_state() {
    let app = app!(true);
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["documents"], 1);
    assert_eq!(body["model"], "canned");
    assert_eq!(body["degraded"], false);

    let app = app!(false);
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["documents"], 0);
    assert_eq!(body["degraded"], true);
}
