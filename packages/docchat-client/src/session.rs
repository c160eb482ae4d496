//! Session lifecycle endpoints.

use tracing::info;

use crate::client::{path_segment, ApiClient};
use crate::error::Result;
use crate::types::{CreateSessionRequest, LanguageRequest, SessionAck, SessionInfo, SessionStats};

impl ApiClient {
    pub async fn create_session(&self, language: Option<&str>) -> Result<SessionInfo> {
        let body = CreateSessionRequest {
            language: language.map(str::to_string),
        };
        let session: SessionInfo = self.post_json("/session/create", &body).await?;

        info!(session_id = %session.session_id, "Session created");
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<SessionInfo> {
        let session_id = path_segment("session id", session_id)?;
        self.get(&format!("/session/{}", session_id)).await
    }

    /// Session-level counters (documents, messages, chunks).
    pub async fn session_stats(&self, session_id: &str) -> Result<SessionStats> {
        let session_id = path_segment("session id", session_id)?;
        self.get(&format!("/session/{}/metrics", session_id)).await
    }

    /// Extend the session's TTL.
    pub async fn heartbeat(&self, session_id: &str) -> Result<SessionAck> {
        let session_id = path_segment("session id", session_id)?;
        self.post_empty(&format!("/session/{}/heartbeat", session_id))
            .await
    }

    pub async fn close_session(&self, session_id: &str) -> Result<SessionAck> {
        let session_id = path_segment("session id", session_id)?;
        let ack = self
            .post_empty(&format!("/session/{}/close", session_id))
            .await?;

        info!(session_id, "Session closed");
        Ok(ack)
    }

    /// Discard the session's documents and conversation, keeping its id.
    pub async fn restart_session(&self, session_id: &str) -> Result<SessionInfo> {
        let session_id = path_segment("session id", session_id)?;
        let session: SessionInfo = self
            .post_empty(&format!("/session/{}/restart", session_id))
            .await?;

        info!(session_id = %session.session_id, "Session restarted");
        Ok(session)
    }

    pub async fn set_language(&self, session_id: &str, language: &str) -> Result<SessionAck> {
        let session_id = path_segment("session id", session_id)?;
        let body = LanguageRequest {
            language: language.to_string(),
        };
        self.put_json(&format!("/session/{}/language", session_id), &body)
            .await
    }
}
