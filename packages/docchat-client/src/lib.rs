//! Typed client for the docchat document-upload and chat-metrics backend.
//!
//! Covers document ingestion (file, single URL, website crawl), status polling
//! until a document is processed, an upload workflow coordinator that exposes
//! reactive state to a host UI, session lifecycle calls, and chat metrics.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docchat_client::{ApiClient, FileUpload, UploadWorkflow};
//!
//! let client = Arc::new(ApiClient::new("http://localhost:8000")?);
//! let session = client.create_session(Some("en")).await?;
//!
//! let workflow = UploadWorkflow::new(client.clone());
//! let file = FileUpload::from_path("report.pdf").await?;
//! let snapshot = workflow
//!     .handle_file_upload(&session.session_id, &file, &mut ())
//!     .await;
//!
//! println!("{}: {:?}", snapshot.state, snapshot.error);
//! ```
//!
//! # Modules
//!
//! - [`client`] - HTTP plumbing and status-code mapping
//! - [`upload`] - upload, crawl and status endpoints
//! - [`polling`] - fixed-interval status polling with cancellation
//! - [`workflow`] - the upload state machine
//! - [`validation`] / [`format`] - pure client-side helpers
//! - [`testing`] - a scripted backend for tests

pub mod api;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod polling;
pub mod session;
pub mod testing;
pub mod types;
pub mod upload;
pub mod validation;
pub mod workflow;

pub use api::DocumentApi;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result, ValidationError};
pub use format::{format_file_size, format_percentage, format_ratio, format_token_count, token_percentage};
pub use polling::{poll_upload_status, PollConfig};
pub use types::*;
pub use upload::FileUpload;
pub use validation::{validate_file_size, validate_file_type, validate_upload, validate_url, UploadLimits};
pub use workflow::{UploadObserver, UploadState, UploadWorkflow, WorkflowSnapshot};

// Cancellation tokens are part of the polling API
pub use tokio_util::sync::CancellationToken;
