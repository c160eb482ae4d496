//! Client configuration.

use std::env;
use std::time::Duration;

use crate::error::{ClientError, Result};
use crate::polling::PollConfig;
use crate::validation::UploadLimits;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for [`ApiClient`](crate::ApiClient) and the upload workflow.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin; the `/api/v1` prefix is appended by the client.
    pub base_url: String,
    pub request_timeout: Duration,
    pub poll: PollConfig,
    pub limits: UploadLimits,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll: PollConfig::default(),
            limits: UploadLimits::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Read overrides from `DOCCHAT_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but unparsable ones are errors.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var("DOCCHAT_API_URL") {
            config.base_url = url;
        }
        if let Some(secs) = parse_var::<u64>("DOCCHAT_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>("DOCCHAT_POLL_INTERVAL_MS")? {
            config.poll.interval = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_var::<u32>("DOCCHAT_POLL_MAX_ATTEMPTS")? {
            config.poll.max_attempts = attempts;
        }
        if let Some(max) = parse_var::<u64>("DOCCHAT_MAX_FILE_SIZE")? {
            config.limits.max_file_size = max;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ClientError::Config(format!("{} must be a valid number, got {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}
