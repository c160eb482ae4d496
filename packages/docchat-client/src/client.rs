//! HTTP plumbing shared by every endpoint.

use reqwest::{multipart::Form, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::validation::UploadLimits;

const API_PREFIX: &str = "/api/v1";

/// Typed client for the docchat backend.
///
/// Endpoint methods live next to their domain: uploads in [`crate::upload`],
/// sessions in [`crate::session`], chat metrics in [`crate::chat`].
#[derive(Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: String,
    limits: UploadLimits,
}

impl ApiClient {
    /// Create a client for the backend at `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::from_config(&ClientConfig::new(base_url))
    }

    /// Create a client from `DOCCHAT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_config(&ClientConfig::from_env()?)
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limits: config.limits.clone(),
        })
    }

    /// Replace the upload limits used for client-side validation.
    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    pub(crate) async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let request = self.http_client.get(self.endpoint(path));
        self.send(request, path).await
    }

    pub(crate) async fn post_json<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R> {
        let request = self.http_client.post(self.endpoint(path)).json(body);
        self.send(request, path).await
    }

    pub(crate) async fn put_json<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R> {
        let request = self.http_client.put(self.endpoint(path)).json(body);
        self.send(request, path).await
    }

    pub(crate) async fn post_empty<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let request = self.http_client.post(self.endpoint(path));
        self.send(request, path).await
    }

    pub(crate) async fn post_multipart<R: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<R> {
        let request = self.http_client.post(self.endpoint(path)).multipart(form);
        self.send(request, path).await
    }

    async fn send<R: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<R> {
        let start = std::time::Instant::now();

        let response = request.send().await.map_err(|e| {
            warn!(path, error = %e, "Backend request failed");
            ClientError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(path, status = %status, body = %body, "Backend returned error status");
            return Err(ClientError::from_status(status, &body));
        }

        let bytes = response.bytes().await?;

        debug!(
            path,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis(),
            "Backend request"
        );

        // Acknowledgement endpoints may answer with an empty body
        let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };

        serde_json::from_slice(body)
            .map_err(|e| ClientError::Parse(format!("unexpected response from {}: {}", path, e)))
    }
}

/// Reject ids that would change the shape of the request path.
pub(crate) fn path_segment<'a>(kind: &str, id: &'a str) -> Result<&'a str> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ClientError::Request(format!("invalid {}: {:?}", kind, id)));
    }
    Ok(id)
}
