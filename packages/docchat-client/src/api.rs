//! The seam between the HTTP client and the polling/workflow layers.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CrawlRequest, DocumentStatus, UploadAccepted, WebsiteUploadResponse};
use crate::upload::FileUpload;

/// Document ingestion operations the upload workflow depends on.
///
/// [`ApiClient`](crate::ApiClient) implements this over HTTP;
/// [`MockBackend`](crate::testing::MockBackend) implements it with scripted responses.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn upload_file(&self, session_id: &str, file: &FileUpload) -> Result<UploadAccepted>;

    async fn upload_url(&self, session_id: &str, url: &str) -> Result<UploadAccepted>;

    async fn upload_website(
        &self,
        session_id: &str,
        request: &CrawlRequest,
    ) -> Result<WebsiteUploadResponse>;

    async fn upload_status(&self, session_id: &str, document_id: &str) -> Result<DocumentStatus>;
}
