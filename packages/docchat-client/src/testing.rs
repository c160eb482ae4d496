//! Testing utilities including a scripted backend.
//!
//! Useful for exercising the polling loop and the upload workflow without a
//! running backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::api::DocumentApi;
use crate::error::{ClientError, Result, ValidationError};
use crate::types::{
    CrawlRequest, CrawlSummary, DocumentStatus, ExtractionStatus, ModerationStatus, SourceType,
    UploadAccepted, WebsiteUploadResponse,
};
use crate::upload::FileUpload;
use crate::validation::{ensure_url, validate_upload, UploadLimits};

type ErrorFactory = Arc<dyn Fn() -> ClientError + Send + Sync>;

/// A snapshot at `progress` percent; extraction is `processing` below 100 and
/// `completed` at 100, moderation is approved.
pub fn status_at(document_id: &str, progress: f64) -> DocumentStatus {
    let mut status = DocumentStatus::pending(document_id);
    status.processing_progress = progress;
    status.moderation_status = ModerationStatus::Approved;
    status.extraction_status = if progress >= 100.0 {
        ExtractionStatus::Completed
    } else {
        ExtractionStatus::Processing
    };
    status
}

/// Record of a call made to the mock backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    UploadFile { session_id: String, file_name: String, size: u64 },
    UploadUrl { session_id: String, url: String },
    UploadWebsite { session_id: String, url: String },
    Status { session_id: String, document_id: String },
}

/// A scripted [`DocumentApi`].
///
/// Uploads are validated the way [`ApiClient`](crate::ApiClient) validates
/// them, then answered with the configured document id. Status requests
/// replay the scripted snapshots for that document in order, repeating the
/// last one once the script is exhausted.
#[derive(Clone)]
pub struct MockBackend {
    document_id: String,
    limits: UploadLimits,
    crawl: CrawlSummary,
    scripts: Arc<RwLock<HashMap<String, Vec<DocumentStatus>>>>,
    cursors: Arc<RwLock<HashMap<String, usize>>>,
    upload_error: Option<ErrorFactory>,
    status_error: Option<ErrorFactory>,
    calls: Arc<RwLock<Vec<MockCall>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            document_id: "doc-1".to_string(),
            limits: UploadLimits::default(),
            crawl: CrawlSummary {
                base_url: None,
                pages_found: 0,
                total_tokens: 0,
                crawl_status: Default::default(),
                crawled_pages: Vec::new(),
            },
            scripts: Arc::default(),
            cursors: Arc::default(),
            upload_error: None,
            status_error: None,
            calls: Arc::default(),
        }
    }

    /// Document id returned by every accepted upload.
    pub fn with_document_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = document_id.into();
        self
    }

    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Crawl summary returned by website uploads.
    pub fn with_crawl_summary(mut self, crawl: CrawlSummary) -> Self {
        self.crawl = crawl;
        self
    }

    /// Script the snapshots returned for `document_id`.
    pub fn with_statuses(self, document_id: impl Into<String>, statuses: Vec<DocumentStatus>) -> Self {
        self.scripts
            .write()
            .unwrap()
            .insert(document_id.into(), statuses);
        self
    }

    /// Make every upload fail with the error built by `make`.
    pub fn fail_uploads_with(
        mut self,
        make: impl Fn() -> ClientError + Send + Sync + 'static,
    ) -> Self {
        self.upload_error = Some(Arc::new(make));
        self
    }

    /// Make every status request fail with the error built by `make`.
    pub fn fail_status_with(
        mut self,
        make: impl Fn() -> ClientError + Send + Sync + 'static,
    ) -> Self {
        self.status_error = Some(Arc::new(make));
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().unwrap().clone()
    }

    /// Number of status snapshots requested.
    pub fn status_calls(&self) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockCall::Status { .. }))
            .count()
    }

    /// Number of upload requests that reached the backend.
    pub fn upload_calls(&self) -> usize {
        self.calls.read().unwrap().len() - self.status_calls()
    }

    fn record(&self, call: MockCall) {
        self.calls.write().unwrap().push(call);
    }

    fn accept(&self, source_type: SourceType) -> Result<UploadAccepted> {
        if let Some(make) = &self.upload_error {
            return Err(make());
        }

        Ok(UploadAccepted {
            document_id: self.document_id.clone(),
            source_type: Some(source_type),
            filename: None,
            url: None,
            extraction_status: ExtractionStatus::Pending,
            moderation_status: ModerationStatus::Pending,
            message: None,
        })
    }
}

#[async_trait]
impl DocumentApi for MockBackend {
    async fn upload_file(&self, session_id: &str, file: &FileUpload) -> Result<UploadAccepted> {
        validate_upload(file, &self.limits)?;
        self.record(MockCall::UploadFile {
            session_id: session_id.to_string(),
            file_name: file.file_name.clone(),
            size: file.size(),
        });

        let mut accepted = self.accept(SourceType::File)?;
        accepted.filename = Some(file.file_name.clone());
        Ok(accepted)
    }

    async fn upload_url(&self, session_id: &str, url: &str) -> Result<UploadAccepted> {
        ensure_url(url)?;
        self.record(MockCall::UploadUrl {
            session_id: session_id.to_string(),
            url: url.to_string(),
        });

        let mut accepted = self.accept(SourceType::Url)?;
        accepted.url = Some(url.to_string());
        Ok(accepted)
    }

    async fn upload_website(
        &self,
        session_id: &str,
        request: &CrawlRequest,
    ) -> Result<WebsiteUploadResponse> {
        ensure_url(&request.url)?;
        if request.max_tokens == 0 || request.max_pages == 0 {
            return Err(ValidationError::InvalidCrawlLimits.into());
        }
        self.record(MockCall::UploadWebsite {
            session_id: session_id.to_string(),
            url: request.url.clone(),
        });

        let mut accepted = self.accept(SourceType::Crawl)?;
        accepted.url = Some(request.url.clone());

        let mut crawl = self.crawl.clone();
        crawl.base_url.get_or_insert_with(|| request.url.clone());

        Ok(WebsiteUploadResponse { accepted, crawl })
    }

    async fn upload_status(&self, session_id: &str, document_id: &str) -> Result<DocumentStatus> {
        self.record(MockCall::Status {
            session_id: session_id.to_string(),
            document_id: document_id.to_string(),
        });

        if let Some(make) = &self.status_error {
            return Err(make());
        }

        let scripts = self.scripts.read().unwrap();
        let script = scripts
            .get(document_id)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClientError::NotFound(format!("document {}", document_id)))?;

        let mut cursors = self.cursors.write().unwrap();
        let cursor = cursors.entry(document_id.to_string()).or_insert(0);
        let status = script[(*cursor).min(script.len() - 1)].clone();
        *cursor += 1;

        Ok(status)
    }
}
