// src/embedder.rs
// Hashed bag-of-words embeddings with an LRU cache

use lru::LruCache;
use once_cell::sync::Lazy;
use regex::Regex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Embedding dimension (matches all-MiniLM-L6-v2 so stores stay interchangeable)
pub const EMBEDDING_DIM: usize = 384;

pub type EmbeddingVector = Vec<f32>;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").expect("static token regex"));

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "how", "i", "in", "is",
    "it", "its", "of", "on", "or", "that", "the", "to", "was", "were", "what", "will", "with",
];

/// Embed text by hashing each term into a bucket, then L2-normalising.
///
/// All components are non-negative, so cosine similarity between two
/// embeddings always falls in `[0, 1]`.
pub fn embed(text: &str) -> EmbeddingVector {
    let lowered = text.to_lowercase();
    let mut vec = vec![0.0f32; EMBEDDING_DIM];

    for term in TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !STOP_WORDS.contains(t))
    {
        let bucket = (seahash::hash(term.as_bytes()) % EMBEDDING_DIM as u64) as usize;
        vec[bucket] += 1.0;
    }

    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vec.iter_mut().for_each(|x| *x /= norm);
    }
    vec
}

type EmbeddingCache = LruCache<String, EmbeddingVector>;

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub batch_size: usize,
    pub cache_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            cache_size: 10_000,
        }
    }
}

/// Thread-safe embedding service with caching and batching
pub struct EmbeddingService {
    config: EmbeddingConfig,
    cache: Arc<RwLock<EmbeddingCache>>,
}

impl EmbeddingService {
    pub fn new(config: EmbeddingConfig) -> Self {
        let cache_size = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);

        info!(
            batch_size = config.batch_size,
            cache_size = cache_size.get(),
            dim = EMBEDDING_DIM,
            "Initializing EmbeddingService"
        );

        Self {
            config,
            cache: Arc::new(RwLock::new(LruCache::new(cache_size))),
        }
    }

    /// Embed a single text, with cache lookup
    pub async fn embed_text(&self, text: &str) -> EmbeddingVector {
        let key = format!("{:x}", seahash::hash(text.as_bytes()));

        {
            let mut cache = self.cache.write().await;
            if let Some(embedding) = cache.get(&key) {
                debug!(cache_key = %key, text_len = text.len(), "Cache hit for embedding");
                return embedding.clone();
            }
        }

        let embedding = embed(text);
        self.cache.write().await.put(key, embedding.clone());
        embedding
    }

    /// Embed many texts, yielding to the runtime between batches
    pub async fn embed_batch(&self, texts: &[&str]) -> Vec<EmbeddingVector> {
        info!(
            total_texts = texts.len(),
            batch_size = self.config.batch_size,
            "Starting batch embedding"
        );

        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            for text in batch {
                results.push(self.embed_text(text).await);
            }
            tokio::task::yield_now().await;
        }
        results
    }

    pub async fn embed_query(&self, query: &str) -> EmbeddingVector {
        debug!(query = %query, "Generating query embedding");
        self.embed_text(query).await
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.read().await.len()
    }
}

impl Default for EmbeddingService {
    fn default() -> Self {
        Self::new(EmbeddingConfig::default())
    }
}

/// Cosine similarity; zero for empty or zero-magnitude inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
