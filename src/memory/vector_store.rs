// src/memory/vector_store.rs
// In-memory vector store with relevance-scored search and JSON snapshots

use crate::embedder::{cosine_similarity, EmbeddingVector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// File name of the store snapshot inside the store directory.
pub const SNAPSHOT_FILE: &str = "store.json";

const SNAPSHOT_VERSION: u32 = 1;

/// A retrieved unit of text with its source metadata and relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub metadata: HashMap<String, Value>,
    pub relevance: f32,
}

impl Passage {
    pub fn new(content: impl Into<String>, source: impl Into<String>, relevance: f32) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), Value::String(source.into()));
        Self {
            content: content.into(),
            metadata,
            relevance,
        }
    }

    /// Source identifier, `"Unknown"` when the metadata has none.
    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
    }
}

/// A stored chunk with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub content: String,
    pub metadata: HashMap<String, Value>,
    pub embedding: EmbeddingVector,
}

impl VectorRecord {
    pub fn new(
        content: String,
        metadata: HashMap<String, Value>,
        embedding: EmbeddingVector,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content,
            metadata,
            embedding,
        }
    }

    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
    }
}

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("Vector store not found: {0}")]
    NotFound(String),

    #[error("Invalid vector dimension: expected {expected}, got {got}")]
    InvalidDimension { expected: usize, got: usize },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<std::io::Error> for VectorStoreError {
    fn from(err: std::io::Error) -> Self {
        VectorStoreError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for VectorStoreError {
    fn from(err: serde_json::Error) -> Self {
        VectorStoreError::SerializationError(err.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct VectorStoreSnapshot {
    version: u32,
    timestamp: i64,
    records: Vec<VectorRecord>,
}

/// Statistics about the vector store
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub total_records: usize,
    pub total_sources: usize,
}

/// Flat cosine-similarity store. Every record must share one dimension.
#[derive(Debug, Default)]
pub struct VectorStore {
    records: Vec<VectorRecord>,
    dimension: Option<usize>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&mut self, record: VectorRecord) -> Result<(), VectorStoreError> {
        let got = record.embedding.len();
        match self.dimension {
            Some(expected) if expected != got => {
                return Err(VectorStoreError::InvalidDimension { expected, got });
            }
            None => self.dimension = Some(got),
            _ => {}
        }
        debug!(id = %record.id, source = %record.source(), "Adding vector record");
        self.records.push(record);
        Ok(())
    }

    pub fn add_records(&mut self, records: Vec<VectorRecord>) -> Result<(), VectorStoreError> {
        info!(count = records.len(), "Adding batch of records");
        for record in records {
            self.add_record(record)?;
        }
        Ok(())
    }

    /// Top `k` passages by descending relevance (cosine similarity clamped to `[0, 1]`).
    pub fn search_with_relevance(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<Passage>, VectorStoreError> {
        if self.records.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension {
            if expected != query_embedding.len() {
                return Err(VectorStoreError::InvalidDimension {
                    expected,
                    got: query_embedding.len(),
                });
            }
        }

        let mut scored: Vec<(f32, &VectorRecord)> = self
            .records
            .iter()
            .map(|r| {
                let score = cosine_similarity(query_embedding, &r.embedding).clamp(0.0, 1.0);
                (score, r)
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!(results = scored.len(), "Search returned results");
        Ok(scored
            .into_iter()
            .map(|(relevance, r)| Passage {
                content: r.content.clone(),
                metadata: r.metadata.clone(),
                relevance,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        let sources: HashSet<&str> = self.records.iter().map(|r| r.source()).collect();
        StoreStats {
            total_records: self.records.len(),
            total_sources: sources.len(),
        }
    }

    /// Write a JSON snapshot of all records to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VectorStoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot = VectorStoreSnapshot {
            version: SNAPSHOT_VERSION,
            timestamp: chrono::Utc::now().timestamp(),
            records: self.records.clone(),
        };
        std::fs::write(path, serde_json::to_string(&snapshot)?)?;
        info!(path = ?path, records = self.records.len(), "Vector store saved");
        Ok(())
    }

    /// Load a store from a JSON snapshot written by [`VectorStore::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VectorStoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VectorStoreError::NotFound(path.display().to_string()));
        }

        let json = std::fs::read_to_string(path)?;
        let snapshot: VectorStoreSnapshot = serde_json::from_str(&json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(VectorStoreError::SerializationError(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let mut store = Self::new();
        store.add_records(snapshot.records)?;
        info!(path = ?path, records = store.len(), "Vector store loaded");
        Ok(store)
    }
}
