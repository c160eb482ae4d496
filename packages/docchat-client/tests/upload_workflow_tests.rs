//! End-to-end tests for the upload workflow coordinator.
//!
//! Runs the workflow against both the scripted `MockBackend` and the
//! in-process HTTP backend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::common::TestHarness;
use docchat_client::testing::{status_at, MockBackend, MockCall};
use docchat_client::{
    ApiClient, ClientError, CrawlRequest, CrawlSummary, DocumentStatus, ExtractionStatus,
    FileUpload, ModerationStatus, PollConfig, UploadObserver, UploadState, UploadWorkflow,
    WorkflowSnapshot,
};

// =============================================================================
// Test Helpers
// =============================================================================

#[derive(Default)]
struct Recorder {
    states: Vec<UploadState>,
    progress: Vec<f64>,
    completed: Vec<DocumentStatus>,
    errors: Vec<String>,
    crawl: Option<CrawlSummary>,
    /// Published workflow state seen at each callback, as (state, progress)
    published: Vec<(UploadState, Option<f64>)>,
    watch: Option<watch::Receiver<WorkflowSnapshot>>,
}

impl Recorder {
    fn watching(rx: watch::Receiver<WorkflowSnapshot>) -> Self {
        Self {
            watch: Some(rx),
            ..Default::default()
        }
    }

    fn record_published(&mut self) {
        if let Some(rx) = &self.watch {
            let snapshot = rx.borrow();
            let progress = snapshot.status.as_ref().map(|s| s.processing_progress);
            self.published.push((snapshot.state, progress));
        }
    }
}

impl UploadObserver for Recorder {
    fn on_state_change(&mut self, state: UploadState) {
        self.states.push(state);
        self.record_published();
    }

    fn on_progress(&mut self, status: &DocumentStatus) {
        self.progress.push(status.processing_progress);
        self.record_published();
    }

    fn on_crawl_summary(&mut self, crawl: &CrawlSummary) {
        self.crawl = Some(crawl.clone());
    }

    fn on_complete(&mut self, status: &DocumentStatus) {
        self.completed.push(status.clone());
    }

    fn on_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

fn two_megabyte_pdf() -> FileUpload {
    FileUpload::new("annual-report.pdf", vec![0x25; 2 * 1024 * 1024])
}

fn fast_poll() -> PollConfig {
    PollConfig::new(Duration::from_millis(1), 10)
}

// =============================================================================
// Scripted backend
// =============================================================================

#[tokio::test]
async fn test_file_upload_end_to_end() {
    let backend = MockBackend::new().with_document_id("doc-42").with_statuses(
        "doc-42",
        vec![
            status_at("doc-42", 0.0),
            status_at("doc-42", 50.0),
            status_at("doc-42", 100.0),
        ],
    );
    let workflow = UploadWorkflow::new(Arc::new(backend.clone())).with_poll_config(fast_poll());
    let mut recorder = Recorder::watching(workflow.subscribe());

    let snapshot = workflow
        .handle_file_upload("s1", &two_megabyte_pdf(), &mut recorder)
        .await;

    // Every snapshot is published while the workflow stays in Processing
    assert_eq!(
        recorder.published,
        vec![
            (UploadState::Uploading, None),
            (UploadState::Processing, None),
            (UploadState::Processing, Some(0.0)),
            (UploadState::Processing, Some(50.0)),
            (UploadState::Processing, Some(100.0)),
            (UploadState::Completed, Some(100.0)),
        ]
    );

    // Processing holds across the 0% and 50% snapshots
    assert_eq!(
        recorder.states,
        vec![
            UploadState::Uploading,
            UploadState::Processing,
            UploadState::Completed
        ]
    );
    assert_eq!(recorder.progress, vec![0.0, 50.0, 100.0]);

    assert_eq!(recorder.completed.len(), 1);
    assert_eq!(recorder.completed[0].processing_progress, 100.0);
    assert_eq!(recorder.completed[0].document_id, "doc-42");
    assert!(recorder.errors.is_empty());

    assert_eq!(snapshot.state, UploadState::Completed);
    assert_eq!(snapshot.document_id.as_deref(), Some("doc-42"));
    assert_eq!(snapshot.status, Some(recorder.completed[0].clone()));
    assert!(snapshot.error.is_none());

    assert_eq!(
        backend.calls()[0],
        MockCall::UploadFile {
            session_id: "s1".into(),
            file_name: "annual-report.pdf".into(),
            size: 2 * 1024 * 1024,
        }
    );
    assert_eq!(backend.status_calls(), 3);
}

#[tokio::test]
async fn test_moderation_block_fails_workflow() {
    let mut blocked = status_at("doc-1", 60.0);
    blocked.moderation_status = ModerationStatus::Blocked;
    blocked.moderation_categories = vec!["self-harm".into()];

    let backend = MockBackend::new()
        .with_statuses("doc-1", vec![status_at("doc-1", 30.0), blocked]);
    let workflow = UploadWorkflow::new(Arc::new(backend.clone())).with_poll_config(fast_poll());
    let mut recorder = Recorder::default();

    let snapshot = workflow
        .handle_url_upload("s1", "https://example.com/post", &mut recorder)
        .await;

    assert_eq!(snapshot.state, UploadState::Failed);
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Content blocked by moderation: self-harm")
    );
    assert_eq!(recorder.errors.len(), 1);
    assert!(recorder.completed.is_empty());
    assert_eq!(backend.status_calls(), 2);
}

#[tokio::test]
async fn test_extraction_failure_surfaces_backend_message() {
    let mut failed = status_at("doc-1", 20.0);
    failed.extraction_status = ExtractionStatus::Failed;
    failed.error_message = Some("Unable to extract text from scanned PDF".into());

    let backend = MockBackend::new().with_statuses("doc-1", vec![failed]);
    let workflow = UploadWorkflow::new(Arc::new(backend)).with_poll_config(fast_poll());
    let mut recorder = Recorder::default();

    let snapshot = workflow
        .handle_file_upload("s1", &two_megabyte_pdf(), &mut recorder)
        .await;

    assert_eq!(snapshot.state, UploadState::Failed);
    assert_eq!(
        recorder.errors,
        vec!["Processing failed: Unable to extract text from scanned PDF".to_string()]
    );
}

#[tokio::test]
async fn test_timeout_fails_workflow() {
    let backend = MockBackend::new().with_statuses("doc-1", vec![status_at("doc-1", 10.0)]);
    let workflow = UploadWorkflow::new(Arc::new(backend.clone()))
        .with_poll_config(PollConfig::new(Duration::from_millis(1), 3));
    let mut recorder = Recorder::default();

    let snapshot = workflow
        .handle_url_upload("s1", "https://example.com", &mut recorder)
        .await;

    assert_eq!(snapshot.state, UploadState::Failed);
    assert_eq!(
        snapshot.error.as_deref(),
        Some("Processing timed out after 3 status checks")
    );
    assert_eq!(backend.status_calls(), 3);
}

#[tokio::test]
async fn test_failed_upload_can_be_retried() {
    let failing = MockBackend::new().fail_uploads_with(|| ClientError::Network("offline".into()));
    let workflow = UploadWorkflow::new(Arc::new(failing.clone())).with_poll_config(fast_poll());

    let first = workflow
        .handle_url_upload("s1", "https://example.com", &mut ())
        .await;
    assert_eq!(first.state, UploadState::Failed);

    // No automatic retry happened
    assert_eq!(failing.upload_calls(), 1);

    let healthy = MockBackend::new().with_statuses("doc-1", vec![status_at("doc-1", 100.0)]);
    let workflow = UploadWorkflow::new(Arc::new(healthy)).with_poll_config(fast_poll());
    let second = workflow
        .handle_url_upload("s1", "https://example.com", &mut ())
        .await;
    assert_eq!(second.state, UploadState::Completed);
}

#[tokio::test]
async fn test_completed_and_failed_are_exclusive() {
    let backend = MockBackend::new().with_statuses("doc-1", vec![status_at("doc-1", 100.0)]);
    let workflow = UploadWorkflow::new(Arc::new(backend)).with_poll_config(fast_poll());
    let mut recorder = Recorder::default();

    let snapshot = workflow
        .handle_url_upload("s1", "https://example.com", &mut recorder)
        .await;

    assert_eq!(snapshot.state, UploadState::Completed);
    assert!(snapshot.error.is_none());
    assert!(!recorder.states.contains(&UploadState::Failed));

    workflow.reset();
    assert_eq!(workflow.snapshot(), WorkflowSnapshot::default());
}

#[tokio::test]
async fn test_dropping_run_stops_polling() {
    let backend = MockBackend::new().with_statuses("doc-1", vec![status_at("doc-1", 10.0)]);
    let workflow = UploadWorkflow::new(Arc::new(backend.clone()))
        .with_poll_config(PollConfig::new(Duration::from_millis(10), 1000));
    let mut recorder = Recorder::default();

    let run = workflow.handle_url_upload("s1", "https://example.com", &mut recorder);
    let result = tokio::time::timeout(Duration::from_millis(50), run).await;
    assert!(result.is_err(), "run should still be polling");

    let polled = backend.status_calls();
    assert!(polled > 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.status_calls(), polled);
    assert!(recorder.completed.is_empty());
    assert!(recorder.errors.is_empty());
}

// =============================================================================
// Over HTTP
// =============================================================================

#[tokio::test]
async fn test_file_upload_over_http() {
    let harness = TestHarness::start().await;
    let client = Arc::new(ApiClient::from_config(&harness.config()).unwrap());
    let workflow = UploadWorkflow::new(client).with_poll_config(harness.config().poll);
    let mut recorder = Recorder::default();

    let snapshot = workflow
        .handle_file_upload("s1", &two_megabyte_pdf(), &mut recorder)
        .await;

    assert_eq!(snapshot.state, UploadState::Completed, "{:?}", snapshot.error);
    assert_eq!(
        recorder.states,
        vec![
            UploadState::Uploading,
            UploadState::Processing,
            UploadState::Completed
        ]
    );
    assert_eq!(recorder.progress, vec![0.0, 50.0, 100.0]);
    assert_eq!(recorder.completed.len(), 1);
    assert_eq!(harness.backend.uploads()[0]["size"], 2 * 1024 * 1024);
}

#[tokio::test]
async fn test_website_upload_over_http() {
    let harness = TestHarness::start_with_step(100).await;
    let client = Arc::new(harness.client());
    let workflow = UploadWorkflow::new(client).with_poll_config(fast_poll());
    let mut recorder = Recorder::default();

    let request = CrawlRequest::new("https://example.com").with_max_pages(2);
    let snapshot = workflow
        .handle_website_upload("s1", &request, &mut recorder)
        .await;

    assert_eq!(snapshot.state, UploadState::Completed);
    let crawl = recorder.crawl.expect("crawl summary forwarded");
    assert_eq!(crawl.crawled_pages.len(), 2);
    assert_eq!(crawl.base_url.as_deref(), Some("https://example.com"));
}
