//! Terminal rendering for workflow progress and command results.

use colored::Colorize;
use docchat_client::{
    format_file_size, format_ratio, format_token_count, token_percentage, CrawlRequest,
    CrawlSummary, DocumentStatus, SessionAck, SessionInfo, SessionMetrics, SessionStats,
    UploadObserver, UploadState,
};

/// Prints workflow events as they happen.
#[derive(Default)]
pub struct TerminalObserver {
    last_progress: Option<f64>,
    max_tokens: Option<u32>,
}

impl TerminalObserver {
    pub fn for_crawl(request: &CrawlRequest) -> Self {
        Self {
            last_progress: None,
            max_tokens: Some(request.max_tokens),
        }
    }
}

impl UploadObserver for TerminalObserver {
    fn on_state_change(&mut self, state: UploadState) {
        let label = match state {
            UploadState::Completed => state.to_string().bright_green().bold(),
            UploadState::Failed => state.to_string().bright_red().bold(),
            _ => state.to_string().bright_cyan(),
        };
        println!("{} {}", "→".bright_blue(), label);
    }

    fn on_progress(&mut self, status: &DocumentStatus) {
        // Only print when something moved
        if self.last_progress == Some(status.processing_progress) {
            return;
        }
        self.last_progress = Some(status.processing_progress);

        println!(
            "  {:>5.1}%  extraction: {}  moderation: {}  chunks: {}",
            status.processing_progress,
            status.extraction_status,
            status.moderation_status,
            status.chunk_count
        );
    }

    fn on_crawl_summary(&mut self, crawl: &CrawlSummary) {
        println!(
            "  crawled {} pages, {} tokens ({})",
            crawl.pages_found,
            format_token_count(crawl.total_tokens),
            crawl.crawl_status
        );
        if let Some(max) = self.max_tokens {
            println!(
                "  token budget used: {:.0}%",
                token_percentage(crawl.total_tokens, u64::from(max))
            );
        }
        if crawl.crawl_status.hit_limit() {
            println!("  {}", "crawl stopped at its budget".yellow());
        }
        for page in &crawl.crawled_pages {
            println!(
                "    {:>7}  {}  {}",
                format_token_count(page.token_count),
                page.url,
                page.title.as_deref().unwrap_or("").dimmed()
            );
        }
    }

    fn on_complete(&mut self, status: &DocumentStatus) {
        println!(
            "{} document {} ready: {} chunks",
            "✓".bright_green(),
            status.document_id,
            status.chunk_count
        );
        if let Some(summary) = &status.summary {
            println!("  {}", summary);
        }
    }

    fn on_error(&mut self, message: &str) {
        eprintln!("{} {}", "✗".bright_red(), message);
    }
}

pub fn print_status(status: &DocumentStatus) {
    println!("{}", status.document_id.bold());
    if let Some(source) = &status.filename {
        println!("  source:      {}", source);
    }
    println!("  progress:    {:.1}%", status.processing_progress);
    println!("  extraction:  {}", status.extraction_status);
    println!("  moderation:  {}", status.moderation_status);
    println!("  chunks:      {}", status.chunk_count);
    if !status.moderation_categories.is_empty() {
        println!("  categories:  {}", status.moderation_categories.join(", ").red());
    }
    if let Some(message) = &status.error_message {
        println!("  error:       {}", message.red());
    }
    if let Some(summary) = &status.summary {
        println!("  summary:     {}", summary);
    }
}

pub fn print_documents(documents: &[DocumentStatus]) {
    if documents.is_empty() {
        println!("{}", "No documents in this session".dimmed());
        return;
    }
    for doc in documents {
        println!(
            "{:<38} {:>6.1}%  {:<10} {:<9} {}",
            doc.document_id,
            doc.processing_progress,
            doc.extraction_status,
            doc.moderation_status,
            doc.filename.as_deref().unwrap_or("")
        );
    }
}

pub fn print_metrics(metrics: &SessionMetrics) {
    println!("queries:            {}", metrics.total_queries);
    println!(
        "tokens:             {} (in {}, out {})",
        format_token_count(metrics.total_tokens),
        format_token_count(metrics.input_tokens),
        format_token_count(metrics.output_tokens)
    );
    println!("avg tokens/query:   {:.0}", metrics.avg_tokens_per_query);
    println!("avg chunks/query:   {:.1}", metrics.avg_chunks_retrieved);
    println!("unanswered:         {}", format_ratio(metrics.unanswered_ratio));

    if metrics.high_token_usage {
        println!("{}", "warning: high token usage per query".yellow());
    }
    if metrics.low_answer_quality {
        println!("{}", "warning: many queries went unanswered".yellow());
    }
}

pub fn print_session(session: &SessionInfo) {
    println!("{}", session.session_id.bold());
    if let Some(status) = &session.status {
        println!("  status:      {}", status);
    }
    if let Some(language) = &session.language {
        println!("  language:    {}", language);
    }
    if let Some(created) = session.created_at {
        println!("  created:     {}", created.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(expires) = session.expires_at {
        println!("  expires:     {}", expires.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(count) = session.document_count {
        println!("  documents:   {}", count);
    }
    if let Some(count) = session.message_count {
        println!("  messages:    {}", count);
    }
}

pub fn print_stats(stats: &SessionStats) {
    println!("documents:  {}", stats.document_count);
    println!("messages:   {}", stats.message_count);
    println!("chunks:     {}", stats.total_chunks);
    println!("tokens:     {}", format_token_count(stats.total_tokens));
    for (key, value) in &stats.extra {
        println!("{}: {}", key, value);
    }
}

pub fn print_ack(ack: &SessionAck) {
    let text = ack
        .message
        .clone()
        .or_else(|| ack.status.clone())
        .unwrap_or_else(|| "ok".to_string());
    println!("{} {}", "✓".bright_green(), text);
}

pub fn print_file_line(name: &str, size: u64) {
    println!("{} {} ({})", "↑".bright_blue(), name, format_file_size(size));
}
