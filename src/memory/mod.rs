// src/memory/mod.rs

pub mod context;
pub mod fallback;
pub mod llm_provider;
pub mod loader;
pub mod query;
pub mod splitter;
pub mod vector_store;

pub use context::{ContextAssembler, SECTION_SEPARATOR};
pub use fallback::{fallback, FallbackResponse, FallbackTopic, FALLBACK_RULES};
pub use llm_provider::{GenerationParams, LLMConfig, LLMError, LLMProvider, OllamaProvider};
pub use loader::{load_documents, Document};
pub use query::{QueryRequest, QueryResponse, RagConfig, RagError, RagQueryPipeline, SourceRef};
pub use splitter::RecursiveCharacterSplitter;
pub use vector_store::{Passage, VectorRecord, VectorStore, VectorStoreError};
