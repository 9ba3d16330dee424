//! LegalRAG Ingestion
//!
//! Warms the index store ahead of serving:
//! 1. Parses every configured reference PDF
//! 2. Chunks and embeds the documents that have no persisted index
//! 3. Persists one index per reference document and exits

use legalrag_common::{
    config::{AppConfig, ObservabilityConfig, ReferenceDocument},
    embeddings::create_embedder,
    errors::AppError,
    VERSION,
};
use legalrag_ingestion::DocumentProcessor;
use legalrag_search::{CollectionCache, IndexStore, ReferenceLibrary};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    info!("Starting LegalRAG ingestion v{}", VERSION);

    let embedder = create_embedder(&config.embedding).map_err(|e| {
        error!(error = %e, "Failed to create embedder");
        e
    })?;

    let store = IndexStore::new(&config.storage.root, embedder);
    let cache = CollectionCache::new(store, config.storage.cache_capacity);
    let processor = DocumentProcessor::new();

    let start = Instant::now();
    let documents = &config.library.documents;
    let library = ReferenceLibrary::load(&cache, documents, config.library.preload_concurrency, |doc: ReferenceDocument| {
        let processor = processor.clone();
        async move {
            let processed = processor.process_file(&doc.path, &doc.name).await.map_err(AppError::from)?;
            Ok::<_, AppError>(processed.chunks)
        }
    })
    .await;

    if library.len() < documents.len() {
        warn!(
            loaded = library.len(),
            configured = documents.len(),
            "Some reference documents could not be indexed"
        );
    }

    info!(
        collections = ?library.names(),
        root = %config.storage.root.display(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Ingestion complete"
    );

    if library.is_empty() && !documents.is_empty() {
        anyhow::bail!("no reference document could be indexed");
    }
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}
