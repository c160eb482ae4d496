//! Wire types for the docchat backend.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Where a document's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    File,
    Url,
    #[serde(alias = "website")]
    Crawl,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::File => "file",
            SourceType::Url => "url",
            SourceType::Crawl => "crawl",
        }
    }
}

/// Backend stage of turning raw content into retrievable chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Pending => "pending",
            ExtractionStatus::Processing => "processing",
            ExtractionStatus::Completed => "completed",
            ExtractionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExtractionStatus::Completed | ExtractionStatus::Failed)
    }
}

/// Backend safety-review outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Blocked,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Blocked => "blocked",
        }
    }

    /// Blocked halts all further processing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ModerationStatus::Blocked)
    }
}

/// State of a website crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    #[default]
    Pending,
    Crawling,
    Completed,
    TokenLimitReached,
    PageLimitReached,
}

impl CrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlStatus::Pending => "pending",
            CrawlStatus::Crawling => "crawling",
            CrawlStatus::Completed => "completed",
            CrawlStatus::TokenLimitReached => "token_limit_reached",
            CrawlStatus::PageLimitReached => "page_limit_reached",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CrawlStatus::Completed | CrawlStatus::TokenLimitReached | CrawlStatus::PageLimitReached
        )
    }

    /// True when the crawl stopped because it hit one of its budgets.
    pub fn hit_limit(&self) -> bool {
        matches!(
            self,
            CrawlStatus::TokenLimitReached | CrawlStatus::PageLimitReached
        )
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(SourceType, ExtractionStatus, ModerationStatus, CrawlStatus);

/// Response returned when the backend accepts an upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadAccepted {
    pub document_id: String,
    #[serde(default)]
    pub source_type: Option<SourceType>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub extraction_status: ExtractionStatus,
    #[serde(default)]
    pub moderation_status: ModerationStatus,
    #[serde(default)]
    pub message: Option<String>,
}

/// One processing-status snapshot of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentStatus {
    pub document_id: String,
    #[serde(default)]
    pub source_type: Option<SourceType>,
    /// File name or URL the document was ingested from.
    #[serde(default, alias = "source")]
    pub filename: Option<String>,
    #[serde(default)]
    pub extraction_status: ExtractionStatus,
    #[serde(default)]
    pub moderation_status: ModerationStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chunk_count: u32,
    /// 0-100
    #[serde(default, deserialize_with = "null_as_default")]
    pub processing_progress: f64,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub moderation_categories: Vec<String>,
}

impl DocumentStatus {
    /// A fresh snapshot in the pending state.
    pub fn pending(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            source_type: None,
            filename: None,
            extraction_status: ExtractionStatus::Pending,
            moderation_status: ModerationStatus::Pending,
            chunk_count: 0,
            processing_progress: 0.0,
            summary: None,
            error_code: None,
            error_message: None,
            moderation_categories: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.processing_progress >= 100.0
    }

    pub fn is_failed(&self) -> bool {
        self.extraction_status == ExtractionStatus::Failed
    }

    pub fn is_blocked(&self) -> bool {
        self.moderation_status == ModerationStatus::Blocked
    }
}

/// Body of `POST /upload/{session}/url`.
#[derive(Debug, Clone, Serialize)]
pub struct UrlUploadRequest {
    pub url: String,
}

/// Body of `POST /upload/{session}/website`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlRequest {
    pub url: String,
    pub max_tokens: u32,
    pub max_pages: u32,
}

impl CrawlRequest {
    pub const DEFAULT_MAX_TOKENS: u32 = 100_000;
    pub const DEFAULT_MAX_PAGES: u32 = 50;

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            max_pages: Self::DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }
}

/// One page visited by a crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawledPage {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub token_count: u64,
    #[serde(default)]
    pub content_preview: Option<String>,
}

/// Aggregate result of a website crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlSummary {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub pages_found: u32,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub crawl_status: CrawlStatus,
    #[serde(default)]
    pub crawled_pages: Vec<CrawledPage>,
}

/// Response of `POST /upload/{session}/website`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebsiteUploadResponse {
    #[serde(flatten)]
    pub accepted: UploadAccepted,
    #[serde(flatten)]
    pub crawl: CrawlSummary,
}

/// Average tokens per query above which usage is flagged.
pub const TOKEN_USAGE_WARNING_THRESHOLD: f64 = 2000.0;

/// Share of unanswered queries above which answer quality is flagged.
pub const UNANSWERED_WARNING_THRESHOLD: f64 = 0.3;

/// Per-session chat metrics. `Default` is the zeroed fallback.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionMetrics {
    pub total_queries: u64,
    pub total_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub avg_tokens_per_query: f64,
    pub avg_chunks_retrieved: f64,
    /// 0.0-1.0
    pub unanswered_ratio: f64,
    pub high_token_usage: bool,
    pub low_answer_quality: bool,
}

impl SessionMetrics {
    /// Set the warning flags from the fixed thresholds, keeping any flag the
    /// backend already raised.
    pub fn with_derived_warnings(mut self) -> Self {
        self.high_token_usage |= self.avg_tokens_per_query > TOKEN_USAGE_WARNING_THRESHOLD;
        self.low_answer_quality |= self.unanswered_ratio > UNANSWERED_WARNING_THRESHOLD;
        self
    }

    pub fn has_warnings(&self) -> bool {
        self.high_token_usage || self.low_answer_quality
    }
}

/// A backend session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
    #[serde(default)]
    pub document_count: Option<u32>,
    #[serde(default)]
    pub message_count: Option<u32>,
}

/// Body of `POST /session/create`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateSessionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Body of `PUT /session/{id}/language`.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageRequest {
    pub language: String,
}

/// Session-level counters from `GET /session/{id}/metrics`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionStats {
    #[serde(default)]
    pub document_count: u32,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub total_chunks: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Acknowledgement for heartbeat, close and language changes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionAck {
    pub session_id: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// RFC 3339, or a naive ISO timestamp taken as UTC. Anything else is `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%.f").map(|n| n.and_utc()))
            .ok()
    }))
}

/// `GET /upload/{session}/documents` returns either a bare list or an envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DocumentList {
    Bare(Vec<DocumentStatus>),
    Envelope { documents: Vec<DocumentStatus> },
}

impl DocumentList {
    pub(crate) fn into_vec(self) -> Vec<DocumentStatus> {
        match self {
            DocumentList::Bare(docs) | DocumentList::Envelope { documents: docs } => docs,
        }
    }
}
