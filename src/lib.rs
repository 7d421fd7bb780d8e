pub mod api;
pub mod config;
pub mod embedder;
pub mod error;
pub mod ingest;
pub mod memory;
pub mod monitoring;
pub mod tokenizer;

pub use memory::{ContextAssembler, QueryResponse, RagQueryPipeline};
