//! Typed errors for the docchat client.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Every variant renders a
//! plain, human-readable message; hosts surface `error.to_string()` directly.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for docchat client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the backend or processing a document.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client-side validation failed; no request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 400
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// 422, usually the backend rejecting the uploaded content
    #[error("Content rejected: {0}")]
    Unprocessable(String),

    /// 500
    #[error("Server error: {0}")]
    Server(String),

    /// 503
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Any other non-2xx response
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// The backend could not be reached (connection refused, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The request could not be built or sent
    #[error("Request error: {0}")]
    Request(String),

    /// The response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// The backend reported that extraction failed
    #[error("Processing failed: {message}")]
    ExtractionFailed {
        code: Option<String>,
        message: String,
    },

    /// The backend's moderation step blocked the document
    #[error("Content blocked by moderation: {}", describe_categories(.categories))]
    ModerationBlocked { categories: Vec<String> },

    /// Polling exhausted its attempt budget
    #[error("Processing timed out after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    /// The operation was cancelled before reaching a terminal state
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Client-side validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unsupported file type: {file_name} (allowed: {allowed})")]
    UnsupportedFileType { file_name: String, allowed: String },

    #[error("File is empty: {file_name}")]
    EmptyFile { file_name: String },

    #[error("File too large: {file_name} is {size} bytes (max {max} bytes)")]
    FileTooLarge {
        file_name: String,
        size: u64,
        max: u64,
    },

    #[error("Invalid URL: {url} (must be http or https)")]
    InvalidUrl { url: String },

    #[error("Invalid crawl limits: max_tokens and max_pages must be greater than zero")]
    InvalidCrawlLimits,
}

fn describe_categories(categories: &[String]) -> String {
    if categories.is_empty() {
        "unspecified policy violation".to_string()
    } else {
        categories.join(", ")
    }
}

impl ClientError {
    /// Map a non-success HTTP response to a typed error.
    ///
    /// The message comes from the backend body when it carries one (`detail`,
    /// a `detail[].msg` list, or `message`); otherwise a fixed message per status.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = backend_message(body).unwrap_or_else(|| default_message(status).to_string());

        match status.as_u16() {
            400 => ClientError::BadRequest(message),
            404 => ClientError::NotFound(message),
            422 => ClientError::Unprocessable(message),
            500 => ClientError::Server(message),
            503 => ClientError::ServiceUnavailable(message),
            code => ClientError::Status {
                status: code,
                message,
            },
        }
    }

    /// HTTP status associated with this error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::BadRequest(_) => Some(400),
            ClientError::NotFound(_) => Some(404),
            ClientError::Unprocessable(_) => Some(422),
            ClientError::Server(_) => Some(500),
            ClientError::ServiceUnavailable(_) => Some(503),
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for errors raised without any network call.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            ClientError::Request(e.to_string())
        } else if e.is_decode() {
            ClientError::Parse(e.to_string())
        } else if e.is_connect() || e.is_timeout() {
            ClientError::Network(format!("unable to reach server ({})", e))
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

fn default_message(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "the request was malformed",
        404 => "the requested session or document does not exist",
        422 => "the submitted content could not be processed",
        500 => "the server encountered an internal error, please try again later",
        503 => "the service is temporarily unavailable, please try again later",
        _ => status.canonical_reason().unwrap_or("unexpected response"),
    }
}

fn backend_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        // Plain-text bodies are used verbatim
        Err(_) => return Some(trimmed.to_string()),
    };

    match value.get("detail") {
        Some(serde_json::Value::String(s)) => return Some(s.clone()),
        Some(serde_json::Value::Array(items)) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if !msgs.is_empty() {
                return Some(msgs.join("; "));
            }
        }
        _ => {}
    }

    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}
