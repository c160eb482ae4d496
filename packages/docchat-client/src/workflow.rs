//! Upload workflow coordinator.
//!
//! Drives one upload at a time through
//! `Idle -> Uploading -> Processing -> Completed | Failed`, publishing a
//! [`WorkflowSnapshot`] on a watch channel and notifying an
//! [`UploadObserver`]. Entry points never return errors; failures become the
//! `Failed` state plus an `on_error` callback.
//!
//! A run borrows the workflow, so dropping the run future (host teardown)
//! stops its poll loop on the spot. Every run also owns a cancellation token:
//! starting another run or calling [`UploadWorkflow::reset`] or
//! [`UploadWorkflow::cancel`] from elsewhere cancels it, after which the run
//! neither publishes state nor calls its observer. Each entry point returns
//! its own run's outcome; a run that was cancelled returns `Failed` with
//! "Operation cancelled" whatever the shared state shows.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::DocumentApi;
use crate::error::{ClientError, Result};
use crate::polling::{poll_upload_status, PollConfig};
use crate::types::{CrawlRequest, CrawlSummary, DocumentStatus};
use crate::upload::FileUpload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl UploadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadState::Idle => "idle",
            UploadState::Uploading => "uploading",
            UploadState::Processing => "processing",
            UploadState::Completed => "completed",
            UploadState::Failed => "failed",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, UploadState::Uploading | UploadState::Processing)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, UploadState::Completed | UploadState::Failed)
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reactive state exposed to the host.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowSnapshot {
    pub state: UploadState,
    pub document_id: Option<String>,
    /// Latest status snapshot from the backend.
    pub status: Option<DocumentStatus>,
    pub error: Option<String>,
}

/// Callbacks from a workflow run. All methods default to no-ops.
pub trait UploadObserver: Send {
    fn on_state_change(&mut self, _state: UploadState) {}

    /// Called with every polled snapshot, including the final one.
    fn on_progress(&mut self, _status: &DocumentStatus) {}

    /// Website uploads only; called once the crawl response arrives.
    fn on_crawl_summary(&mut self, _crawl: &CrawlSummary) {}

    fn on_complete(&mut self, _status: &DocumentStatus) {}

    fn on_error(&mut self, _message: &str) {}
}

impl UploadObserver for () {}

enum Source<'a> {
    File(&'a FileUpload),
    Url(&'a str),
    Website(&'a CrawlRequest),
}

pub struct UploadWorkflow<A: DocumentApi + ?Sized> {
    api: Arc<A>,
    poll: PollConfig,
    state: watch::Sender<WorkflowSnapshot>,
    /// Token of the current run; the lock also serializes state publication.
    current: Mutex<CancellationToken>,
}

impl<A: DocumentApi + ?Sized> UploadWorkflow<A> {
    pub fn new(api: Arc<A>) -> Self {
        let (state, _) = watch::channel(WorkflowSnapshot::default());
        Self {
            api,
            poll: PollConfig::default(),
            state,
            current: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Current state.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state publication.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.state.subscribe()
    }

    /// Upload a file and follow it to a terminal state.
    pub async fn handle_file_upload<O>(
        &self,
        session_id: &str,
        file: &FileUpload,
        observer: &mut O,
    ) -> WorkflowSnapshot
    where
        O: UploadObserver + ?Sized,
    {
        self.drive(session_id, Source::File(file), observer).await
    }

    /// Ingest a single URL and follow it to a terminal state.
    pub async fn handle_url_upload<O>(
        &self,
        session_id: &str,
        url: &str,
        observer: &mut O,
    ) -> WorkflowSnapshot
    where
        O: UploadObserver + ?Sized,
    {
        self.drive(session_id, Source::Url(url), observer).await
    }

    /// Crawl a website and follow the crawled content to a terminal state.
    pub async fn handle_website_upload<O>(
        &self,
        session_id: &str,
        request: &CrawlRequest,
        observer: &mut O,
    ) -> WorkflowSnapshot
    where
        O: UploadObserver + ?Sized,
    {
        self.drive(session_id, Source::Website(request), observer).await
    }

    /// Cancel any in-flight run and return to the initial state.
    pub fn reset(&self) {
        let mut current = self.lock();
        current.cancel();
        *current = CancellationToken::new();
        self.state.send_replace(WorkflowSnapshot::default());
    }

    /// Cancel the in-flight run, leaving the workflow `Failed`.
    pub fn cancel(&self) {
        let current = self.lock();
        if current.is_cancelled() {
            return;
        }
        current.cancel();

        self.state.send_if_modified(|snapshot| {
            if !snapshot.state.is_busy() {
                return false;
            }
            snapshot.state = UploadState::Failed;
            snapshot.error = Some(ClientError::Cancelled.to_string());
            true
        });
    }

    async fn drive<O>(&self, session_id: &str, source: Source<'_>, observer: &mut O) -> WorkflowSnapshot
    where
        O: UploadObserver + ?Sized,
    {
        let cancel = self.begin();
        observer.on_state_change(UploadState::Uploading);

        // This run's own view; the shared state may already belong to a newer run
        let mut run = WorkflowSnapshot {
            state: UploadState::Uploading,
            ..Default::default()
        };

        match self.execute(session_id, source, observer, &cancel, &mut run).await {
            Ok(status) => {
                run.state = UploadState::Completed;
                run.status = Some(status.clone());

                if !self.publish(&cancel, |s| *s = run.clone()) {
                    return superseded(run);
                }
                info!(document_id = %status.document_id, "Upload workflow completed");
                observer.on_state_change(UploadState::Completed);
                observer.on_complete(&status);
            }
            Err(e) => {
                let message = e.to_string();
                run.state = UploadState::Failed;
                run.error = Some(message.clone());

                if !self.publish(&cancel, |s| *s = run.clone()) {
                    return superseded(run);
                }
                warn!(error = %message, "Upload workflow failed");
                observer.on_state_change(UploadState::Failed);
                observer.on_error(&message);
            }
        }

        run
    }

    async fn execute<O>(
        &self,
        session_id: &str,
        source: Source<'_>,
        observer: &mut O,
        cancel: &CancellationToken,
        run: &mut WorkflowSnapshot,
    ) -> Result<DocumentStatus>
    where
        O: UploadObserver + ?Sized,
    {
        let document_id = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            accepted = self.upload(session_id, source, observer, cancel) => accepted?,
        };

        run.state = UploadState::Processing;
        run.document_id = Some(document_id.clone());
        if !self.publish(cancel, |s| *s = run.clone()) {
            return Err(ClientError::Cancelled);
        }
        observer.on_state_change(UploadState::Processing);

        poll_upload_status(
            self.api.as_ref(),
            session_id,
            &document_id,
            &self.poll,
            |status| {
                run.status = Some(status.clone());
                if self.publish(cancel, |s| s.status = Some(status.clone())) {
                    observer.on_progress(status);
                }
            },
            cancel,
        )
        .await
    }

    /// Perform the upload request, returning the accepted document id.
    async fn upload<O>(
        &self,
        session_id: &str,
        source: Source<'_>,
        observer: &mut O,
        cancel: &CancellationToken,
    ) -> Result<String>
    where
        O: UploadObserver + ?Sized,
    {
        let accepted = match source {
            Source::File(file) => self.api.upload_file(session_id, file).await?,
            Source::Url(url) => self.api.upload_url(session_id, url).await?,
            Source::Website(request) => {
                let response = self.api.upload_website(session_id, request).await?;
                if !cancel.is_cancelled() {
                    observer.on_crawl_summary(&response.crawl);
                }
                response.accepted
            }
        };

        info!(session_id, document_id = %accepted.document_id, "Upload accepted, processing");
        Ok(accepted.document_id)
    }

    /// Cancel the previous run and start a new one in `Uploading`.
    fn begin(&self) -> CancellationToken {
        let mut current = self.lock();
        current.cancel();
        let token = CancellationToken::new();
        *current = token.clone();

        self.state.send_replace(WorkflowSnapshot {
            state: UploadState::Uploading,
            ..Default::default()
        });
        token
    }

    /// Apply `update` unless `cancel` has fired. Returns whether it was applied.
    fn publish(&self, cancel: &CancellationToken, update: impl FnOnce(&mut WorkflowSnapshot)) -> bool {
        let _current = self.lock();
        if cancel.is_cancelled() {
            return false;
        }
        self.state.send_modify(update);
        true
    }

    fn lock(&self) -> MutexGuard<'_, CancellationToken> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Outcome of a run that was cancelled, reset or replaced before it could
/// publish its result.
fn superseded(mut run: WorkflowSnapshot) -> WorkflowSnapshot {
    run.state = UploadState::Failed;
    run.error = Some(ClientError::Cancelled.to_string());
    run
}
