//! In-process fake backend for integration testing.
//!
//! Serves the `/api/v1` routes the client uses from an axum router bound to an
//! ephemeral port. Status polls advance each document's progress by
//! `progress_step` per request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use docchat_client::{ApiClient, ClientConfig, PollConfig};
use serde_json::{json, Value};

#[derive(Default)]
struct Inner {
    progress: HashMap<String, u32>,
    uploads: Vec<Value>,
    status_requests: usize,
}

#[derive(Clone)]
pub struct FakeBackend {
    inner: Arc<Mutex<Inner>>,
    progress_step: u32,
}

pub struct TestHarness {
    pub base_url: String,
    pub backend: FakeBackend,
}

impl TestHarness {
    /// Start a backend whose documents advance 50% per status poll.
    pub async fn start() -> Self {
        Self::start_with_step(50).await
    }

    pub async fn start_with_step(progress_step: u32) -> Self {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let backend = FakeBackend {
            inner: Arc::default(),
            progress_step,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let app = router(backend.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            base_url: format!("http://{}", addr),
            backend,
        }
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.base_url).expect("Failed to build client")
    }

    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.base_url);
        config.poll = PollConfig::new(std::time::Duration::from_millis(5), 10);
        config
    }
}

impl FakeBackend {
    /// JSON bodies (or multipart summaries) of every accepted upload.
    pub fn uploads(&self) -> Vec<Value> {
        self.inner.lock().unwrap().uploads.clone()
    }

    pub fn status_requests(&self) -> usize {
        self.inner.lock().unwrap().status_requests
    }

    fn accept(&self, document_id: &str, record: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner.progress.insert(document_id.to_string(), 0);
        inner.uploads.push(record);
    }
}

fn router(backend: FakeBackend) -> Router {
    Router::new()
        .route("/api/v1/upload/:session/file", post(upload_file))
        .route("/api/v1/upload/:session/url", post(upload_url))
        .route("/api/v1/upload/:session/website", post(upload_website))
        .route("/api/v1/upload/:session/status/:document", get(upload_status))
        .route("/api/v1/upload/:session/documents", get(list_documents))
        .route("/api/v1/chat/:session/metrics", get(chat_metrics))
        .route("/api/v1/session/create", post(create_session))
        .route("/api/v1/session/:session", get(get_session))
        .route("/api/v1/session/:session/metrics", get(session_stats))
        .route("/api/v1/session/:session/heartbeat", post(heartbeat))
        .route("/api/v1/session/:session/close", post(close_session))
        .route("/api/v1/session/:session/restart", post(restart_session))
        .route("/api/v1/session/:session/language", put(set_language))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .with_state(backend)
}

fn error(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

async fn upload_file(
    State(backend): State<FakeBackend>,
    Path(session): Path<String>,
    mut multipart: Multipart,
) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(_) => return error(StatusCode::BAD_REQUEST, "unreadable upload"),
        };

        if file_name.contains("malware") {
            return error(StatusCode::UNPROCESSABLE_ENTITY, "File content was rejected");
        }

        let document_id = format!("file-{}", bytes.len());
        backend.accept(
            &document_id,
            json!({
                "session": session,
                "file_name": file_name,
                "content_type": content_type,
                "size": bytes.len(),
            }),
        );

        return Json(json!({
            "document_id": document_id,
            "source_type": "file",
            "filename": file_name,
            "extraction_status": "pending",
            "moderation_status": "pending",
        }))
        .into_response();
    }

    error(StatusCode::BAD_REQUEST, "missing file field")
}

async fn upload_url(
    State(backend): State<FakeBackend>,
    Path(session): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let url = body["url"].as_str().unwrap_or_default().to_string();
    let document_id = "url-1";
    backend.accept(document_id, json!({ "session": session, "url": url }));

    Json(json!({
        "document_id": document_id,
        "source_type": "url",
        "url": url,
        "extraction_status": "pending",
        "moderation_status": "pending",
    }))
    .into_response()
}

async fn upload_website(
    State(backend): State<FakeBackend>,
    Path(session): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let url = body["url"].as_str().unwrap_or_default().to_string();
    let max_pages = body["max_pages"].as_u64().unwrap_or_default();
    let document_id = "crawl-1";
    backend.accept(document_id, json!({ "session": session, "request": body }));

    Json(json!({
        "document_id": document_id,
        "source_type": "crawl",
        "url": url,
        "extraction_status": "processing",
        "moderation_status": "pending",
        "base_url": url,
        "pages_found": max_pages,
        "total_tokens": 2400,
        "crawl_status": "page_limit_reached",
        "crawled_pages": [
            { "url": format!("{}/", url), "title": "Home", "token_count": 1200, "content_preview": "Welcome" },
            { "url": format!("{}/about", url), "title": "About", "token_count": 1200 },
        ],
    }))
    .into_response()
}

async fn upload_status(
    State(backend): State<FakeBackend>,
    Path((_session, document)): Path<(String, String)>,
) -> Response {
    let mut inner = backend.inner.lock().unwrap();
    inner.status_requests += 1;

    let Some(progress) = inner.progress.get_mut(&document) else {
        return error(StatusCode::NOT_FOUND, "Document not found");
    };

    let current = *progress;
    *progress = (current + backend.progress_step).min(100);

    let extraction = if current >= 100 { "completed" } else { "processing" };
    Json(json!({
        "document_id": document,
        "extraction_status": extraction,
        "moderation_status": "approved",
        "chunk_count": current / 10,
        "processing_progress": current,
    }))
    .into_response()
}

async fn list_documents(
    State(backend): State<FakeBackend>,
    Path(_session): Path<String>,
) -> Response {
    let inner = backend.inner.lock().unwrap();
    let mut ids: Vec<&String> = inner.progress.keys().collect();
    ids.sort();

    let documents: Vec<Value> = ids
        .into_iter()
        .map(|id| {
            json!({
                "document_id": id,
                "extraction_status": "processing",
                "processing_progress": inner.progress[id],
            })
        })
        .collect();

    Json(json!({ "documents": documents })).into_response()
}

async fn chat_metrics(Path(session): Path<String>) -> Response {
    match session.as_str() {
        "broken" => error(StatusCode::INTERNAL_SERVER_ERROR, "metrics store offline"),
        "garbled" => (StatusCode::OK, "not json").into_response(),
        _ => Json(json!({
            "total_queries": 4,
            "total_tokens": 12000,
            "input_tokens": 9000,
            "output_tokens": 3000,
            "avg_tokens_per_query": 3000.0,
            "avg_chunks_retrieved": 4.5,
            "unanswered_ratio": 0.25,
        }))
        .into_response(),
    }
}

async fn create_session(Json(body): Json<Value>) -> Response {
    Json(json!({
        "session_id": "sess-1",
        "language": body.get("language").cloned().unwrap_or(json!("en")),
        "status": "active",
        "created_at": "2026-01-01T00:00:00Z",
        "ttl_seconds": 3600,
    }))
    .into_response()
}

async fn get_session(Path(session): Path<String>) -> Response {
    match session.as_str() {
        "missing" => error(StatusCode::NOT_FOUND, "Session not found or expired"),
        "bad" => error(StatusCode::BAD_REQUEST, "Malformed session id"),
        "crash" => (StatusCode::INTERNAL_SERVER_ERROR, "").into_response(),
        "down" => (StatusCode::SERVICE_UNAVAILABLE, "").into_response(),
        "teapot" => (StatusCode::IM_A_TEAPOT, "short and stout").into_response(),
        _ => Json(json!({
            "session_id": session,
            "status": "active",
            "document_count": 2,
            "message_count": 5,
        }))
        .into_response(),
    }
}

async fn session_stats(Path(_session): Path<String>) -> Response {
    Json(json!({
        "document_count": 2,
        "message_count": 5,
        "total_chunks": 48,
        "total_tokens": 15000,
        "uptime_seconds": 120,
    }))
    .into_response()
}

async fn heartbeat(Path(_session): Path<String>) -> Response {
    StatusCode::OK.into_response()
}

async fn close_session(Path(session): Path<String>) -> Response {
    Json(json!({ "session_id": session, "status": "closed" })).into_response()
}

async fn restart_session(Path(session): Path<String>) -> Response {
    Json(json!({ "session_id": session, "status": "active", "document_count": 0 })).into_response()
}

async fn set_language(Path(session): Path<String>, Json(body): Json<Value>) -> Response {
    let language = body["language"].as_str().unwrap_or_default();
    if language.len() != 2 {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Unsupported language");
    }
    Json(json!({ "session_id": session, "message": format!("language set to {}", language) }))
        .into_response()
}
