//! Upload, crawl and document-status endpoints.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::info;

use crate::api::DocumentApi;
use crate::client::{path_segment, ApiClient};
use crate::error::{ClientError, Result, ValidationError};
use crate::types::{
    CrawlRequest, DocumentList, DocumentStatus, UploadAccepted, UrlUploadRequest,
    WebsiteUploadResponse,
};
use crate::validation::{ensure_url, validate_upload};

/// A file ready to be sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Build an upload, guessing the content type from the file extension.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Read a file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Request(format!("not a file path: {}", path.display())))?
            .to_string();

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ClientError::Request(format!("failed to read {}: {}", path.display(), e)))?;

        Ok(Self::new(file_name, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn to_form(&self) -> Result<Form> {
        let part = Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.content_type)
            .map_err(|e| ClientError::Request(format!("invalid content type: {}", e)))?;

        Ok(Form::new().part("file", part))
    }
}

impl ApiClient {
    /// Upload a file for ingestion. Validation failures never reach the network.
    pub async fn upload_file(&self, session_id: &str, file: &FileUpload) -> Result<UploadAccepted> {
        validate_upload(file, self.limits())?;
        let session_id = path_segment("session id", session_id)?;

        let accepted: UploadAccepted = self
            .post_multipart(&format!("/upload/{}/file", session_id), file.to_form()?)
            .await?;

        info!(
            session_id,
            document_id = %accepted.document_id,
            file_name = %file.file_name,
            size = file.size(),
            "File upload accepted"
        );
        Ok(accepted)
    }

    /// Ingest a single web page.
    pub async fn upload_url(&self, session_id: &str, url: &str) -> Result<UploadAccepted> {
        ensure_url(url)?;
        let session_id = path_segment("session id", session_id)?;

        let body = UrlUploadRequest {
            url: url.trim().to_string(),
        };
        let accepted: UploadAccepted = self
            .post_json(&format!("/upload/{}/url", session_id), &body)
            .await?;

        info!(session_id, document_id = %accepted.document_id, url, "URL upload accepted");
        Ok(accepted)
    }

    /// Crawl a website within a token and page budget.
    ///
    /// The crawl summary arrives in this response; extraction of the
    /// crawled content is then tracked through [`upload_status`](Self::upload_status).
    pub async fn upload_website(
        &self,
        session_id: &str,
        request: &CrawlRequest,
    ) -> Result<WebsiteUploadResponse> {
        ensure_url(&request.url)?;
        if request.max_tokens == 0 || request.max_pages == 0 {
            return Err(ValidationError::InvalidCrawlLimits.into());
        }
        let session_id = path_segment("session id", session_id)?;

        let body = CrawlRequest {
            url: request.url.trim().to_string(),
            ..request.clone()
        };
        let response: WebsiteUploadResponse = self
            .post_json(&format!("/upload/{}/website", session_id), &body)
            .await?;

        info!(
            session_id,
            document_id = %response.accepted.document_id,
            url = %body.url,
            pages_found = response.crawl.pages_found,
            total_tokens = response.crawl.total_tokens,
            crawl_status = %response.crawl.crawl_status,
            "Website crawl accepted"
        );
        Ok(response)
    }

    /// One processing-status snapshot.
    pub async fn upload_status(&self, session_id: &str, document_id: &str) -> Result<DocumentStatus> {
        let session_id = path_segment("session id", session_id)?;
        let document_id = path_segment("document id", document_id)?;

        self.get(&format!("/upload/{}/status/{}", session_id, document_id))
            .await
    }

    /// Status snapshots of every document in a session.
    pub async fn list_documents(&self, session_id: &str) -> Result<Vec<DocumentStatus>> {
        let session_id = path_segment("session id", session_id)?;

        let list: DocumentList = self
            .get(&format!("/upload/{}/documents", session_id))
            .await?;
        Ok(list.into_vec())
    }
}

#[async_trait]
impl DocumentApi for ApiClient {
    async fn upload_file(&self, session_id: &str, file: &FileUpload) -> Result<UploadAccepted> {
        ApiClient::upload_file(self, session_id, file).await
    }

    async fn upload_url(&self, session_id: &str, url: &str) -> Result<UploadAccepted> {
        ApiClient::upload_url(self, session_id, url).await
    }

    async fn upload_website(
        &self,
        session_id: &str,
        request: &CrawlRequest,
    ) -> Result<WebsiteUploadResponse> {
        ApiClient::upload_website(self, session_id, request).await
    }

    async fn upload_status(&self, session_id: &str, document_id: &str) -> Result<DocumentStatus> {
        ApiClient::upload_status(self, session_id, document_id).await
    }
}
