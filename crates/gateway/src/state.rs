//! Shared application state and startup preload

use legalrag_common::{
    config::AppConfig,
    context::{AnswerGenerator, ClauseExtractor},
    embeddings::Embedder,
    errors::{AppError, Result},
    llm::LanguageModel,
};
use legalrag_ingestion::DocumentProcessor;
use legalrag_search::{CollectionCache, IndexStore, ReferenceLibrary, RetrievalAggregator};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub processor: DocumentProcessor,
    pub cache: Arc<CollectionCache>,
    pub aggregator: Arc<RetrievalAggregator>,
    pub generator: Arc<AnswerGenerator>,
    pub extractor: Arc<ClauseExtractor>,
    /// Set once the startup preload finishes
    pub library: Arc<OnceCell<ReferenceLibrary>>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let store = IndexStore::new(&config.storage.root, embedder.clone());
        let cache = Arc::new(CollectionCache::new(store, config.storage.cache_capacity));
        let generator = Arc::new(AnswerGenerator::new(model, &config.generation));

        Self {
            processor: DocumentProcessor::new(),
            cache,
            aggregator: Arc::new(RetrievalAggregator::new(embedder)),
            extractor: Arc::new(ClauseExtractor::new(generator.clone())),
            generator,
            library: Arc::new(OnceCell::new()),
            metrics,
            config: Arc::new(config),
        }
    }

    /// The reference library, once it holds at least one collection
    pub fn library(&self) -> Result<&ReferenceLibrary> {
        self.library
            .get()
            .filter(|library| !library.is_empty())
            .ok_or(AppError::LibraryNotLoaded)
    }

    /// Resolve every configured reference document and publish the library
    pub async fn preload_library(&self) {
        let processor = self.processor.clone();
        let library = ReferenceLibrary::load(
            &self.cache,
            &self.config.library.documents,
            self.config.library.preload_concurrency,
            |doc| {
                let processor = processor.clone();
                async move {
                    let processed = processor.process_file(&doc.path, &doc.name).await?;
                    Ok::<_, AppError>(processed.chunks)
                }
            },
        )
        .await;

        if library.is_empty() {
            warn!("No reference documents could be loaded; /ask-existing stays unavailable");
        }

        let names: Vec<String> = library.names().into_iter().map(String::from).collect();
        if self.library.set(library).is_err() {
            warn!("Reference library was already loaded");
            return;
        }
        info!(collections = ?names, "Reference library ready");
    }
}
