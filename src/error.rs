// src/error.rs
// Crate-level error types

use crate::memory::vector_store::VectorStoreError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },
}

/// Errors while building the vector store from documents
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Data directory not found: {0}")]
    MissingDataDir(String),

    #[error("No documents found in {0}")]
    NoDocuments(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error(transparent)]
    Store(#[from] VectorStoreError),
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io(err.to_string())
    }
}

/// Errors surfaced by the HTTP layer
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Query cannot be empty")]
    EmptyQuery,

    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::EmptyQuery => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "detail": self.to_string() }))
    }
}
