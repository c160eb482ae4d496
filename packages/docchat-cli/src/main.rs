//! Command-line front end for the docchat backend.
//!
//! Usage:
//!   docchat session create --language en
//!   docchat upload-file --session <id> report.pdf
//!   docchat crawl --session <id> https://example.com --max-pages 10
//!   docchat metrics --session <id>

mod config;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use docchat_client::{
    ApiClient, CrawlRequest, FileUpload, UploadState, UploadWorkflow, WorkflowSnapshot,
};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::output::TerminalObserver;

#[derive(Parser)]
#[command(name = "docchat")]
#[command(about = "Upload documents to a docchat session and follow their processing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file and wait until it is processed
    UploadFile {
        /// Session to upload into (defaults to DOCCHAT_SESSION_ID)
        #[arg(long)]
        session: Option<String>,

        /// Path of the file to upload
        path: PathBuf,
    },

    /// Ingest a single web page and wait until it is processed
    UploadUrl {
        #[arg(long)]
        session: Option<String>,

        url: String,
    },

    /// Crawl a website and wait until the crawled content is processed
    Crawl {
        #[arg(long)]
        session: Option<String>,

        url: String,

        /// Token budget for the crawl
        #[arg(long, default_value_t = CrawlRequest::DEFAULT_MAX_TOKENS)]
        max_tokens: u32,

        /// Page budget for the crawl
        #[arg(long, default_value_t = CrawlRequest::DEFAULT_MAX_PAGES)]
        max_pages: u32,
    },

    /// Show the processing status of one document
    Status {
        #[arg(long)]
        session: Option<String>,

        document_id: String,
    },

    /// List the documents in a session
    Documents {
        #[arg(long)]
        session: Option<String>,
    },

    /// Show chat metrics for a session
    Metrics {
        #[arg(long)]
        session: Option<String>,
    },

    /// Manage sessions
    #[command(subcommand)]
    Session(SessionCommands),
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Create a new session
    Create {
        #[arg(long)]
        language: Option<String>,
    },
    /// Show session details
    Get { session_id: Option<String> },
    /// Show session statistics
    Stats { session_id: Option<String> },
    /// Keep a session alive
    Heartbeat { session_id: Option<String> },
    /// Close a session and discard its documents
    Close { session_id: Option<String> },
    /// Close a session and open a fresh one
    Restart { session_id: Option<String> },
    /// Change the session's response language
    Language {
        language: String,

        #[arg(long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,docchat_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let client = Arc::new(
        ApiClient::from_config(&config.client).context("Failed to build HTTP client")?,
    );
    debug!(
        base_url = %config.client.base_url,
        poll_interval_ms = config.client.poll.interval.as_millis() as u64,
        max_attempts = config.client.poll.max_attempts,
        "Configured backend"
    );

    match cli.command {
        Commands::UploadFile { session, path } => {
            let session = config.session(session)?;
            let file = FileUpload::from_path(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            output::print_file_line(&file.file_name, file.size());

            let workflow = workflow(&config, &client);
            let mut observer = TerminalObserver::default();
            let snapshot = with_interrupt(&workflow, async {
                workflow
                    .handle_file_upload(&session, &file, &mut observer)
                    .await
            })
            .await;
            finish(snapshot);
        }
        Commands::UploadUrl { session, url } => {
            let session = config.session(session)?;
            let workflow = workflow(&config, &client);
            let mut observer = TerminalObserver::default();
            let snapshot = with_interrupt(&workflow, async {
                workflow
                    .handle_url_upload(&session, &url, &mut observer)
                    .await
            })
            .await;
            finish(snapshot);
        }
        Commands::Crawl {
            session,
            url,
            max_tokens,
            max_pages,
        } => {
            let session = config.session(session)?;
            let request = CrawlRequest::new(url)
                .with_max_tokens(max_tokens)
                .with_max_pages(max_pages);

            let workflow = workflow(&config, &client);
            let mut observer = TerminalObserver::for_crawl(&request);
            let snapshot = with_interrupt(&workflow, async {
                workflow
                    .handle_website_upload(&session, &request, &mut observer)
                    .await
            })
            .await;
            finish(snapshot);
        }
        Commands::Status {
            session,
            document_id,
        } => {
            let session = config.session(session)?;
            let status = client.upload_status(&session, &document_id).await?;
            output::print_status(&status);
        }
        Commands::Documents { session } => {
            let session = config.session(session)?;
            let documents = client.list_documents(&session).await?;
            output::print_documents(&documents);
        }
        Commands::Metrics { session } => {
            let session = config.session(session)?;
            let metrics = client.chat_metrics(&session).await;
            output::print_metrics(&metrics);
        }
        Commands::Session(command) => run_session_command(&config, &client, command).await?,
    }

    Ok(())
}

async fn run_session_command(
    config: &Config,
    client: &ApiClient,
    command: SessionCommands,
) -> Result<()> {
    match command {
        SessionCommands::Create { language } => {
            let session = client.create_session(language.as_deref()).await?;
            println!("{} session created", "✓".bright_green());
            output::print_session(&session);
        }
        SessionCommands::Get { session_id } => {
            let session = client.get_session(&config.session(session_id)?).await?;
            output::print_session(&session);
        }
        SessionCommands::Stats { session_id } => {
            let stats = client.session_stats(&config.session(session_id)?).await?;
            output::print_stats(&stats);
        }
        SessionCommands::Heartbeat { session_id } => {
            let ack = client.heartbeat(&config.session(session_id)?).await?;
            output::print_ack(&ack);
        }
        SessionCommands::Close { session_id } => {
            let ack = client.close_session(&config.session(session_id)?).await?;
            output::print_ack(&ack);
        }
        SessionCommands::Restart { session_id } => {
            let session = client.restart_session(&config.session(session_id)?).await?;
            println!("{} session restarted", "✓".bright_green());
            output::print_session(&session);
        }
        SessionCommands::Language { language, session } => {
            let ack = client
                .set_language(&config.session(session)?, &language)
                .await?;
            output::print_ack(&ack);
        }
    }

    Ok(())
}

fn workflow(config: &Config, client: &Arc<ApiClient>) -> Arc<UploadWorkflow<ApiClient>> {
    Arc::new(UploadWorkflow::new(client.clone()).with_poll_config(config.client.poll))
}

/// Run an upload, cancelling it when Ctrl-C arrives.
async fn with_interrupt<F>(workflow: &Arc<UploadWorkflow<ApiClient>>, run: F) -> WorkflowSnapshot
where
    F: std::future::Future<Output = WorkflowSnapshot>,
{
    let watcher = {
        let workflow = workflow.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{}", "Cancelling upload".yellow());
                workflow.cancel();
            }
        })
    };

    let snapshot = run.await;
    watcher.abort();
    snapshot
}

/// Exit non-zero when the run did not complete. The observer has already
/// printed the reason.
fn finish(snapshot: WorkflowSnapshot) {
    if snapshot.state != UploadState::Completed {
        std::process::exit(1);
    }
}
