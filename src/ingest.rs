// src/ingest.rs
// Build the vector store: load -> split -> analyse -> embed -> save -> verify

use crate::embedder::EmbeddingService;
use crate::error::IngestError;
use crate::memory::loader::{load_documents, Document};
use crate::memory::splitter::RecursiveCharacterSplitter;
use crate::memory::vector_store::{VectorRecord, VectorStore, SNAPSHOT_FILE};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const VERIFY_QUERY: &str = "MOSDAC portal registration";
const PREVIEW_CHUNK: usize = 7;
const PREVIEW_CHARS: usize = 200;

/// Size distribution of produced chunks (character counts)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChunkStats {
    pub total_chunks: usize,
    pub avg_size: f64,
    pub min_size: usize,
    pub max_size: usize,
    pub under_400: usize,
    pub from_400_to_600: usize,
    pub from_600_to_800: usize,
    pub over_800: usize,
}

impl ChunkStats {
    pub fn from_chunks(chunks: &[Document]) -> Self {
        let sizes: Vec<usize> = chunks.iter().map(|c| c.content.chars().count()).collect();
        if sizes.is_empty() {
            return Self::default();
        }

        let mut stats = Self {
            total_chunks: sizes.len(),
            avg_size: sizes.iter().sum::<usize>() as f64 / sizes.len() as f64,
            min_size: sizes.iter().copied().min().unwrap_or(0),
            max_size: sizes.iter().copied().max().unwrap_or(0),
            ..Self::default()
        };
        for size in sizes {
            match size {
                0..=399 => stats.under_400 += 1,
                400..=599 => stats.from_400_to_600 += 1,
                600..=799 => stats.from_600_to_800 += 1,
                _ => stats.over_800 += 1,
            }
        }
        stats
    }

    fn percent(&self, count: usize) -> f64 {
        if self.total_chunks == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total_chunks as f64
        }
    }

    pub fn log(&self) {
        info!(
            total_chunks = self.total_chunks,
            avg_size = %format!("{:.0}", self.avg_size),
            min_size = self.min_size,
            max_size = self.max_size,
            "Chunk analysis"
        );
        for (range, count) in [
            ("< 400", self.under_400),
            ("400-600", self.from_400_to_600),
            ("600-800", self.from_600_to_800),
            ("800+", self.over_800),
        ] {
            info!(range, count, percent = %format!("{:.1}", self.percent(count)), "Chunk size distribution");
        }
    }
}

/// Outcome of an ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub stats: ChunkStats,
    pub snapshot_path: PathBuf,
    pub verification_hits: usize,
}

/// Rebuild the store at `store_dir` from the markdown files in `data_dir`.
/// Any existing store directory is removed first.
pub async fn generate_data_store(
    data_dir: &Path,
    store_dir: &Path,
    splitter: &RecursiveCharacterSplitter,
    embedding_service: &EmbeddingService,
) -> Result<IngestReport, IngestError> {
    info!(data_dir = %data_dir.display(), store_dir = %store_dir.display(), "Starting ingestion");

    let documents = load_documents(data_dir)?;
    if documents.is_empty() {
        return Err(IngestError::NoDocuments(data_dir.display().to_string()));
    }

    let chunks = splitter.split_documents(&documents);
    info!(documents = documents.len(), chunks = chunks.len(), "Split documents into chunks");

    let stats = ChunkStats::from_chunks(&chunks);
    stats.log();
    if let Some(chunk) = chunks.get(PREVIEW_CHUNK) {
        let preview: String = chunk.content.chars().take(PREVIEW_CHARS).collect();
        info!(
            chunk = PREVIEW_CHUNK,
            chars = chunk.content.chars().count(),
            preview = %preview,
            metadata = ?chunk.metadata,
            "Sample chunk"
        );
    }

    if store_dir.exists() {
        std::fs::remove_dir_all(store_dir)?;
        info!(store_dir = %store_dir.display(), "Cleared existing store");
    }

    let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let embeddings = embedding_service.embed_batch(&texts).await;

    let mut store = VectorStore::new();
    for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
        store.add_record(VectorRecord::new(chunk.content, chunk.metadata, embedding))?;
    }

    let snapshot_path = store_dir.join(SNAPSHOT_FILE);
    store.save(&snapshot_path)?;

    let verification_hits = verify_store(&store, embedding_service).await;

    Ok(IngestReport {
        documents: documents.len(),
        stats,
        snapshot_path,
        verification_hits,
    })
}

/// Run a known query against a fresh store; failures only warn.
async fn verify_store(store: &VectorStore, embedding_service: &EmbeddingService) -> usize {
    let query = embedding_service.embed_query(VERIFY_QUERY).await;
    match store.search_with_relevance(&query, 3) {
        Ok(results) => {
            info!(hits = results.len(), query = VERIFY_QUERY, "Store verification");
            if let Some(first) = results.first() {
                let preview: String = first.content.chars().take(100).collect();
                info!(preview = %preview, relevance = first.relevance, "First verification hit");
            }
            results.len()
        }
        Err(e) => {
            warn!(error = %e, "Store verification failed");
            0
        }
    }
}
