use anyhow::{Context, Result};
use docchat_client::ClientConfig;
use dotenvy::dotenv;
use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
    /// Session used when a command is given no `--session`
    pub default_session: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            client: ClientConfig::from_env().context("Invalid DOCCHAT_* configuration")?,
            default_session: env::var("DOCCHAT_SESSION_ID")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        })
    }

    /// Resolve the session for a command.
    pub fn session(&self, explicit: Option<String>) -> Result<String> {
        explicit
            .or_else(|| self.default_session.clone())
            .context("No session given: pass --session or set DOCCHAT_SESSION_ID")
    }
}
