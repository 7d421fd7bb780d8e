// src/memory/loader.rs
// Markdown document loading

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use walkdir::WalkDir;

/// A loaded document or a chunk of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: HashMap<String, Value>,
}

impl Document {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), Value::String(source.into()));
        Self {
            content: content.into(),
            metadata,
        }
    }

    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
    }
}

/// Load every `*.md` file directly under `dir`, sorted by path.
pub fn load_documents<P: AsRef<Path>>(dir: P) -> Result<Vec<Document>, IngestError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(IngestError::MissingDataDir(dir.display().to_string()));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| IngestError::Io(e.to_string()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }

        let content = std::fs::read_to_string(path)?;
        documents.push(Document::new(content, path.display().to_string()));
    }

    info!(count = documents.len(), dir = %dir.display(), "Loaded documents");
    for (i, doc) in documents.iter().enumerate() {
        info!(
            index = i,
            source = %doc.source(),
            chars = doc.content.chars().count(),
            "Document loaded"
        );
    }

    Ok(documents)
}
