//! Fixed-interval polling of a document's processing status.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::DocumentApi;
use crate::error::{ClientError, Result};
use crate::types::DocumentStatus;

/// Interval and attempt budget for [`poll_upload_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: 150,
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Upper bound on time spent sleeping between polls.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Poll a document's status until it reaches a terminal condition.
///
/// `on_progress` sees every fetched snapshot, including the final one.
/// Terminal conditions, checked in this order after each fetch:
/// - extraction failed: [`ClientError::ExtractionFailed`] with the backend message
/// - moderation blocked: [`ClientError::ModerationBlocked`] with the categories
/// - progress reached 100: the snapshot is returned
///
/// After `max_attempts` snapshots without a terminal condition the result is
/// [`ClientError::PollTimeout`]. Cancelling `cancel` stops the loop with
/// [`ClientError::Cancelled`]; `on_progress` is not called after that.
pub async fn poll_upload_status<A, F>(
    api: &A,
    session_id: &str,
    document_id: &str,
    config: &PollConfig,
    mut on_progress: F,
    cancel: &CancellationToken,
) -> Result<DocumentStatus>
where
    A: DocumentApi + ?Sized,
    F: FnMut(&DocumentStatus),
{
    for attempt in 1..=config.max_attempts {
        if cancel.is_cancelled() {
            debug!(document_id, attempt, "Polling cancelled");
            return Err(ClientError::Cancelled);
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            status = api.upload_status(session_id, document_id) => status?,
        };

        debug!(
            document_id,
            attempt,
            progress = status.processing_progress,
            extraction = %status.extraction_status,
            moderation = %status.moderation_status,
            "Polled document status"
        );

        on_progress(&status);

        if status.is_failed() {
            let message = status
                .error_message
                .clone()
                .unwrap_or_else(|| "document processing failed".to_string());
            warn!(document_id, error = %message, "Document extraction failed");
            return Err(ClientError::ExtractionFailed {
                code: status.error_code.clone(),
                message,
            });
        }

        if status.is_blocked() {
            warn!(
                document_id,
                categories = ?status.moderation_categories,
                "Document blocked by moderation"
            );
            return Err(ClientError::ModerationBlocked {
                categories: status.moderation_categories,
            });
        }

        if status.is_complete() {
            info!(
                document_id,
                attempts = attempt,
                chunks = status.chunk_count,
                "Document processing complete"
            );
            return Ok(status);
        }

        if attempt < config.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                _ = tokio::time::sleep(config.interval) => {}
            }
        }
    }

    warn!(
        document_id,
        attempts = config.max_attempts,
        "Document processing did not finish in time"
    );
    Err(ClientError::PollTimeout {
        attempts: config.max_attempts,
    })
}
