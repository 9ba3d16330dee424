//! LegalRAG API Gateway
//!
//! The HTTP surface of the legal assistant.
//! Handles:
//! - Reference-library, uploaded-document and follow-up Q&A
//! - Clause extraction, comparison and risk analysis
//! - Startup preload of the reference library
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;
mod state;

#[cfg(test)]
mod tests;

use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use legalrag_common::{
    config::{AppConfig, ObservabilityConfig},
    embeddings::create_embedder,
    errors::AppError,
    llm::create_language_model,
    metrics,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tower::{limit::GlobalConcurrencyLimitLayer, timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (.env is read first)
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config.observability);

    info!("Starting LegalRAG API Gateway v{}", legalrag_common::VERSION);

    // Initialize metrics
    let prometheus = PrometheusBuilder::new().install_recorder()?;
    metrics::register_metrics();

    // Remote providers
    let embedder = create_embedder(&config.embedding).map_err(|e| {
        tracing::error!(error = %e, "Failed to create embedder");
        e
    })?;
    let model = create_language_model(&config.generation).map_err(|e| {
        tracing::error!(error = %e, "Failed to create language model");
        e
    })?;
    info!(
        embedding_model = embedder.model_name(),
        generation_model = model.model_name(),
        storage_root = %config.storage.root.display(),
        "Providers ready"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Create app state
    let state = AppState::new(config, embedder, model, Some(prometheus));

    // Reference documents load in the background; /ask-existing answers 503 until done
    let preload = state.clone();
    tokio::spawn(async move {
        preload.preload_library().await;
    });

    // Build the router
    let app = create_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
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

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;
    let max_concurrent = state.config.server.max_concurrent_requests.max(1);
    let timeout = state.config.request_timeout();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))

        // Question answering
        .route("/ask-existing", post(handlers::ask::ask_existing))
        .route("/ask-upload", post(handlers::ask::ask_upload))
        .route("/ask-context", post(handlers::ask::ask_context))
        .route("/chat", post(handlers::chat::chat))
        .route("/summarize", post(handlers::chat::summarize))

        // Clause endpoints
        .route("/extract-clauses", post(handlers::clauses::extract_clauses))
        .route("/extract-clauses-from-text", post(handlers::clauses::extract_clauses_from_text))
        .route("/compare-clauses", post(handlers::clauses::compare_clauses))
        .route("/analyze-clause-risks", post(handlers::clauses::analyze_clause_risks))
        .route_layer(from_fn(middleware::metrics::track_requests));

    // Compose the app
    api_routes
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| async move { request_failed(err, timeout) }))
                .layer(TimeoutLayer::new(timeout)),
        )
        .layer(GlobalConcurrencyLimitLayer::new(max_concurrent))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Map a middleware failure onto the JSON error shape
fn request_failed(err: BoxError, timeout: Duration) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return AppError::RequestTimeout {
            timeout_ms: timeout.as_millis() as u64,
        };
    }
    AppError::Internal {
        message: err.to_string(),
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
