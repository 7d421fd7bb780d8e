// src/main.rs
use clap::{Parser, Subcommand};
use helpbot::api::start_api_server;
use helpbot::config::ApiConfig;
use helpbot::embedder::EmbeddingService;
use helpbot::ingest::generate_data_store;
use helpbot::memory::{
    ContextAssembler, OllamaProvider, RagQueryPipeline, RecursiveCharacterSplitter, VectorStore,
};
use helpbot::monitoring::{init_tracing, LoggingConfig};
use helpbot::tokenizer::default_counter;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "helpbot", about = "MOSDAC helpdesk bot: retrieval-augmented answers over markdown docs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP query API (default)
    Serve,
    /// Rebuild the vector store from the markdown data directory
    Ingest,
    /// Answer a single question on the command line
    Query {
        /// The query text
        query_text: String,
    },
}

#[actix_web::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let logging = match LoggingConfig::from_env() {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_tracing(&logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Ingest => ingest(&config).await,
        Command::Query { query_text } => query(&config, &query_text).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

/// Build the pipeline; a missing or unreadable store leaves it in degraded mode.
fn build_pipeline(config: &ApiConfig) -> RagQueryPipeline {
    let snapshot = config.snapshot_path();
    let store = match VectorStore::load(&snapshot) {
        Ok(store) => Some(Arc::new(RwLock::new(store))),
        Err(e) => {
            warn!(path = %snapshot.display(), error = %e, "Vector store unavailable, answering from fallback only");
            None
        }
    };

    RagQueryPipeline::new(
        Arc::new(EmbeddingService::default()),
        store,
        Arc::new(OllamaProvider::new(config.llm.clone())),
        ContextAssembler::new(Arc::from(default_counter(&config.tokenizer))),
        config.rag.clone(),
    )
}

async fn serve(config: &ApiConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Arc::new(build_pipeline(config));
    start_api_server(config, pipeline).await?;
    Ok(())
}

async fn ingest(config: &ApiConfig) -> Result<(), Box<dyn std::error::Error>> {
    let splitter = RecursiveCharacterSplitter::new(config.chunk_size, config.chunk_overlap);
    let report = generate_data_store(
        &config.data_path,
        &config.store_path,
        &splitter,
        &EmbeddingService::default(),
    )
    .await?;
    info!(
        documents = report.documents,
        chunks = report.stats.total_chunks,
        snapshot = %report.snapshot_path.display(),
        "Ingestion completed"
    );
    Ok(())
}

async fn query(config: &ApiConfig, query_text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = build_pipeline(config);
    let response = pipeline.answer(query_text).await;

    let rule = "=".repeat(60);
    println!("{}", rule);
    println!("QUERY: {}", query_text);
    println!("{}", rule);
    if let Some(context) = &response.context {
        println!("\nRetrieved Context:");
        println!("{}", "-".repeat(40));
        println!("{}", context);
        println!("{}", "-".repeat(40));
    }
    println!("\nAnswer:\n{}", response.answer);
    println!("\nSources:");
    for (i, source) in response.sources.iter().enumerate() {
        println!("  {}. {} (relevance: {:.3})", i + 1, source.source, source.relevance);
    }
    Ok(())
}
