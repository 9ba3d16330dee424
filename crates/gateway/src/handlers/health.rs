//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use crate::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, Deserialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: ReadyChecks,
}

#[derive(Serialize, Deserialize)]
pub struct ReadyChecks {
    pub library: LibraryCheck,
    pub cached_uploads: usize,
}

#[derive(Serialize, Deserialize)]
pub struct LibraryCheck {
    pub status: String,
    pub collections: Vec<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: legalrag_common::VERSION.to_string(),
    })
}

/// Readiness probe - ready once the reference library has loaded
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let (library_status, collections) = match state.library.get() {
        Some(library) if !library.is_empty() => (
            "up",
            library.names().into_iter().map(String::from).collect(),
        ),
        Some(_) => ("empty", Vec::new()),
        None => ("loading", Vec::new()),
    };

    let ready = library_status == "up";
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(ReadyResponse {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            checks: ReadyChecks {
                library: LibraryCheck {
                    status: library_status.to_string(),
                    collections,
                },
                cached_uploads: state.cache.len(),
            },
        }),
    )
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.as_ref().map(|handle| handle.render()).unwrap_or_default()
}
