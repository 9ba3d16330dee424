//! In-process route tests against mock providers

use crate::{create_router, AppState};
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
};
use legalrag_common::{
    config::AppConfig,
    embeddings::MockEmbedder,
    errors::AppError,
    llm::MockModel,
    models::{Chunk, CollectionId},
};
use legalrag_search::ReferenceLibrary;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "legalrag-test-boundary";

const TWO_CLAUSES: &str = "CLAUSE_START\n\
    Type: Indemnification\n\
    Text: The Supplier shall indemnify the Customer against all losses.\n\
    Key Points: Uncapped liability\n\
    Risk Level: High\n\
    Analysis: Exposes the Supplier to unlimited claims.\n\
    CLAUSE_END\n\n\
    CLAUSE_START\n\
    Type: Governing Law\n\
    Text: This Agreement is governed by the laws of India.\n\
    Key Points: Indian courts have jurisdiction\n\
    Risk Level: Low\n\
    Analysis: Standard choice of law.\n\
    CLAUSE_END\n";

fn test_state(tmp: &TempDir, model: MockModel) -> AppState {
    state_with(tmp, model, |_| {}).0
}

/// State over `tmp`, also handing back the embedder to count builds
fn state_with(tmp: &TempDir, model: MockModel, configure: impl FnOnce(&mut AppConfig)) -> (AppState, Arc<MockEmbedder>) {
    let mut config = AppConfig::default();
    config.storage.root = tmp.path().to_path_buf();
    config.embedding.provider = "mock".to_string();
    config.generation.provider = "mock".to_string();
    configure(&mut config);

    let embedder = Arc::new(MockEmbedder::new(16));
    let state = AppState::new(config, embedder.clone(), Arc::new(model), None);
    (state, embedder)
}

/// A single-page PDF whose only text is `text`
fn one_page_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

async fn load_ipc(state: &AppState) {
    let id = CollectionId::named("IPC").unwrap();
    let index = state
        .cache
        .resolve_pinned(&id, || async {
            Ok::<_, AppError>(vec![
                Chunk::new("Section 378. Whoever intends to take dishonestly any movable property commits theft.", "IPC", Some(0)),
                Chunk::new("Section 379. Whoever commits theft shall be punished with imprisonment.", "IPC", Some(1)),
            ])
        })
        .await
        .unwrap();
    let library = ReferenceLibrary::from_collections(vec![("IPC".to_string(), index)]);
    assert!(state.library.set(library).is_ok());
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Parts are (name, filename, content)
fn multipart(uri: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/pdf\r\n\r\n",
                    name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes()),
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());

    let (status, body) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_tracks_library() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());

    let (status, body) = send(&state, get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"]["library"]["status"], "loading");

    load_ipc(&state).await;
    let (status, body) = send(&state, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["library"]["collections"][0], "IPC");
}

#[tokio::test]
async fn test_ask_existing_before_preload() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());

    let (status, body) = send(&state, form("/ask-existing", "query=What+is+theft%3F")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "LIBRARY_NOT_LOADED");
}

#[tokio::test]
async fn test_ask_existing_answers_from_library() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());
    load_ipc(&state).await;

    let (status, body) = send(&state, form("/ask-existing", "query=What+is+the+penalty+for+theft%3F")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "IPC");
    assert!(body["answer"].as_str().unwrap().contains("What is the penalty for theft?"));
}

#[tokio::test]
async fn test_ask_existing_requires_query() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());
    load_ipc(&state).await;

    let (status, body) = send(&state, form("/ask-existing", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "query");
}

#[tokio::test]
async fn test_chat() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());

    let (status, body) = send(&state, form("/chat", "query=Can+a+tenant+withhold+rent%3F")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["response"].as_str().unwrap().contains("Can a tenant withhold rent?"));
}

#[tokio::test]
async fn test_summarize_rejects_blank_text() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());

    let (status, body) = send(&state, form("/summarize", "text=+++")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "text");

    let (status, body) = send(&state, form("/summarize", "text=The+lessee+shall+pay+rent.")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["summary"].is_string());
}

#[tokio::test]
async fn test_extract_clauses_from_text() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::with_reply(TWO_CLAUSES));

    let (status, body) = send(
        &state,
        form("/extract-clauses-from-text", "document_text=The+Supplier+shall+indemnify+the+Customer."),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_clauses"], 2);
    assert_eq!(body["parse_mode"], "strict");
    assert_eq!(body["clauses"][0]["type"], "Indemnification");
    assert_eq!(body["clauses"][0]["risk_level"], "High");
    assert!(body["summary"].as_str().unwrap().contains("High-risk clauses: 1"));
}

#[tokio::test]
async fn test_extract_clauses_from_empty_text() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::with_reply(TWO_CLAUSES));

    let (status, body) = send(&state, form("/extract-clauses-from-text", "document_text=")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "document_text");
}

#[tokio::test]
async fn test_analyze_clause_risks() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());

    let request = json(
        "/analyze-clause-risks",
        serde_json::json!({
            "clauses": [
                { "type": "Indemnification", "text": "Supplier indemnifies all losses.", "risk_level": "High", "analysis": "Uncapped." },
                { "type": "Notice", "text": "Notices in writing." }
            ]
        }),
    );
    let (status, body) = send(&state, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["high_risk"].as_array().unwrap().len(), 1);
    assert_eq!(body["low_risk"].as_array().unwrap().len(), 1);
    assert_eq!(body["recommendations"][0], "Review high-risk clauses with legal counsel");

    let (status, body) = send(&state, json("/analyze-clause-risks", serde_json::json!({ "clauses": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_ask_context_unknown_file() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());

    let unknown = "a".repeat(64);
    let (status, body) = send(&state, form("/ask-context", &format!("query=Who+pays%3F&file_id={}", unknown))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "COLLECTION_NOT_FOUND");

    let (status, _) = send(&state, form("/ask-context", "query=Who+pays%3F&file_id=..%2Fetc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ask_context_after_upload_index_exists() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());

    let id = CollectionId::from_bytes(b"%PDF-1.5 lease agreement");
    state
        .cache
        .resolve(&id, || async {
            Ok::<_, AppError>(vec![Chunk::new("Rent is payable on the first of each month.", "lease", Some(0))])
        })
        .await
        .unwrap();

    let (status, body) = send(
        &state,
        form("/ask-context", &format!("query=When+is+rent+due%3F&file_id={}", id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["file_id"], id.as_str());
    assert!(body["answer"].as_str().unwrap().contains("When is rent due?"));
}

#[tokio::test]
async fn test_ask_upload_requires_file() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());

    let (status, body) = send(&state, multipart("/ask-upload", &[("query", None, &b"Who pays?"[..])])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_FIELD");
    assert_eq!(body["error"]["field"], "file");
}

#[tokio::test]
async fn test_ask_upload_rejects_non_pdf() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());

    let request = multipart(
        "/ask-upload",
        &[("query", None, &b"Who pays?"[..]), ("file", Some("notes.pdf"), &b"<html>not a pdf</html>"[..])],
    );
    let (status, body) = send(&state, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "PDF_PARSE_ERROR");
    // A failed build is not cached
    assert_eq!(state.cache.len(), 0);
}

#[tokio::test]
async fn test_compare_requires_both_files() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::with_reply(TWO_CLAUSES));

    let request = multipart("/compare-clauses", &[("file1", Some("a.pdf"), &b"%PDF-1.5"[..])]);
    let (status, body) = send(&state, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "file2");
}

#[tokio::test]
async fn test_metrics_without_recorder() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::new());

    let response = create_router(state).oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_ask_upload_reuses_index_for_same_bytes() {
    let tmp = TempDir::new().unwrap();
    let (state, embedder) = state_with(&tmp, MockModel::new(), |_| {});
    let pdf = one_page_pdf("The tenant shall pay rent of 20000 rupees on the fifth day of each month.");
    let expected_id = CollectionId::from_bytes(&pdf);

    let upload = |query: &'static [u8]| multipart("/ask-upload", &[("query", None, query), ("file", Some("lease.pdf"), &pdf[..])]);

    let (status, body) = send(&state, upload(b"When is rent due?")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["file_id"], expected_id.as_str());
    assert!(body["answer"].as_str().unwrap().contains("When is rent due?"));
    let builds = embedder.batch_calls();
    assert!(builds > 0);

    let (status, body) = send(&state, upload(b"How much is the rent?")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["file_id"], expected_id.as_str());
    assert_eq!(embedder.batch_calls(), builds);

    // The returned id works for follow-ups, also after a restart
    let (restarted, restarted_embedder) = state_with(&tmp, MockModel::new(), |_| {});
    let (status, body) = send(
        &restarted,
        form("/ask-context", &format!("query=Who+pays+rent%3F&file_id={}", expected_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["file_id"], expected_id.as_str());
    assert_eq!(restarted_embedder.batch_calls(), 0);
}

#[tokio::test]
async fn test_extract_clauses_from_upload() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::with_reply(TWO_CLAUSES));
    let pdf = one_page_pdf("The Supplier shall indemnify the Customer against all losses.");

    let (status, body) = send(&state, multipart("/extract-clauses", &[("file", Some("supply.pdf"), &pdf[..])])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_clauses"], 2);
    assert_eq!(body["parse_mode"], "strict");
    assert_eq!(body["clauses"][1]["type"], "Governing Law");
    assert_eq!(body["clauses"][1]["risk_level"], "Low");
}

#[tokio::test]
async fn test_compare_clauses() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, MockModel::with_reply(TWO_CLAUSES));
    let first = one_page_pdf("The Supplier shall indemnify the Customer.");
    let second = one_page_pdf("This Agreement is governed by the laws of India.");

    let request = multipart(
        "/compare-clauses",
        &[("file1", Some("first.pdf"), &first[..]), ("file2", Some("second.pdf"), &second[..])],
    );
    let (status, body) = send(&state, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document1"]["filename"], "first.pdf");
    assert_eq!(body["document2"]["filename"], "second.pdf");
    assert_eq!(body["document1"]["total_clauses"], 2);
    assert_eq!(body["comparison"]["doc1_clause_count"], 2);
    assert_eq!(body["comparison"]["doc2_clause_count"], 2);
    assert!(body["comparison"]["comparison_analysis"].as_str().unwrap().contains("Indemnification"));
}

#[tokio::test]
async fn test_oversized_upload_is_payload_too_large() {
    let tmp = TempDir::new().unwrap();
    let (state, _) = state_with(&tmp, MockModel::new(), |config| config.server.max_upload_bytes = 1024);

    let big = vec![b'x'; 4096];
    let request = multipart("/ask-upload", &[("query", None, &b"Who pays?"[..]), ("file", Some("big.pdf"), &big[..])]);
    let (status, body) = send(&state, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_slow_request_times_out_with_json_error() {
    let tmp = TempDir::new().unwrap();
    let (state, _) = state_with(&tmp, MockModel::new().delayed(Duration::from_secs(5)), |config| {
        config.server.request_timeout_secs = 1;
        config.embedding.timeout_secs = 0;
        config.generation.timeout_secs = 0;
    });

    let (status, body) = send(&state, form("/chat", "query=Is+a+verbal+lease+valid%3F")).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["code"], "REQUEST_TIMEOUT");
}
