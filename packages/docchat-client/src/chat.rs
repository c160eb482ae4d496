//! Chat metrics.

use tracing::warn;

use crate::client::{path_segment, ApiClient};
use crate::types::SessionMetrics;

impl ApiClient {
    /// Metrics for a session's chat history.
    ///
    /// Never fails: any error is logged and the zeroed default is returned,
    /// so dashboards can always render.
    pub async fn chat_metrics(&self, session_id: &str) -> SessionMetrics {
        let result = match path_segment("session id", session_id) {
            Ok(id) => {
                self.get::<SessionMetrics>(&format!("/chat/{}/metrics", id))
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(metrics) => metrics.with_derived_warnings(),
            Err(e) => {
                warn!(session_id, error = %e, "Failed to fetch chat metrics, using defaults");
                SessionMetrics::default()
            }
        }
    }
}
