use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::memory::query::{QueryRequest, RagQueryPipeline};
use actix_cors::Cors;
use actix_web::{error::InternalError, web, App, HttpResponse, HttpServer};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Generate a short request ID for correlation
fn generate_request_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

/// POST /query
///
/// Blank queries are rejected with 400. Everything else gets a 200 answer,
/// falling back to the canned responses when retrieval or generation fails.
pub async fn query_handler(
    pipeline: web::Data<RagQueryPipeline>,
    req: web::Json<QueryRequest>,
) -> Result<HttpResponse, ApiError> {
    let request_id = generate_request_id();
    let query = req.into_inner().query;
    if query.trim().is_empty() {
        info!(request_id = %request_id, "Rejected empty query");
        return Err(ApiError::EmptyQuery);
    }

    let started = Instant::now();
    let pipeline = pipeline.into_inner();
    let task_query = query.clone();
    let response = actix_web::rt::spawn(async move { pipeline.answer(&task_query).await })
        .await
        .map_err(|e| {
            error!(request_id = %request_id, error = %e, "Query task failed");
            ApiError::Internal(e.to_string())
        })?;

    info!(
        request_id = %request_id,
        query = %query,
        fallback = response.is_fallback(),
        sources = response.sources.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Query answered"
    );
    Ok(HttpResponse::Ok().json(response))
}

/// GET /health
pub async fn health_check(pipeline: web::Data<RagQueryPipeline>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "documents": pipeline.document_count().await,
        "model": pipeline.model_name(),
        "degraded": pipeline.is_degraded(),
    }))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let detail = err.to_string();
        InternalError::from_response(err, HttpResponse::BadRequest().json(json!({ "detail": detail })))
            .into()
    })
}

/// Register routes; shared by the server and integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/query", web::post().to(query_handler))
        .route("/health", web::get().to(health_check));
}

fn cors(origins: &[String]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}

pub async fn start_api_server(
    config: &ApiConfig,
    pipeline: Arc<RagQueryPipeline>,
) -> std::io::Result<()> {
    let bind_addr = config.bind_addr();
    let origins = config.cors_origins.clone();
    let data = web::Data::from(pipeline);

    info!(addr = %bind_addr, origins = ?origins, "Starting API server");
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(cors(&origins))
            .configure(configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
