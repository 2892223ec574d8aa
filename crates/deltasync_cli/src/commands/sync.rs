//! Sync command implementation.

use super::{print_page_text, ClientArgs, OutputFormat, PageSummary};
use deltasync_client::{Page, SyncClient};
use serde::Serialize;
use tracing::{info, warn};

/// Result of a sync run.
#[derive(Debug, Serialize)]
pub struct SyncRunResult {
    /// Token the run started from.
    pub start_token: String,
    /// Fetched pages, in fetch order.
    pub pages: Vec<PageSummary>,
    /// Token to resume from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
    /// Whether an empty page was reached.
    pub exhausted: bool,
    /// Error that ended the run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the sync command.
pub fn run(
    args: &ClientArgs,
    token: &str,
    all: bool,
    max_pages: Option<u32>,
    with_payload: bool,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = args.config()?;
    if let Some(limit) = max_pages {
        config = config.with_max_pages(limit);
    }
    let client = SyncClient::new(config)?;

    let (pages, error) = if all {
        fetch_all(&client, token)
    } else {
        match client.sync(token).execute() {
            Ok(page) => (vec![page], None),
            Err(e) => (Vec::new(), Some(e.to_string())),
        }
    };

    let exhausted = error.is_none() && pages.last().is_some_and(Page::is_empty);
    let result = SyncRunResult {
        start_token: token.to_string(),
        continuation_token: pages.last().map(|p| p.continuation_token().to_string()),
        pages: pages
            .iter()
            .map(|p| PageSummary::new(p, with_payload))
            .collect(),
        exhausted,
        error,
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => print_text_output(&result),
    }

    match result.error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

fn fetch_all(client: &SyncClient, token: &str) -> (Vec<Page>, Option<String>) {
    match client.sync(token).execute_all() {
        Ok(result) => {
            info!(
                pages = result.page_count(),
                records = result.total_records(),
                "feed exhausted"
            );
            (result.into_pages(), None)
        }
        Err(partial) => {
            warn!(
                pages = partial.pages.len(),
                reason = partial.reason().as_str(),
                "sync run failed"
            );
            let message = partial.error.to_string();
            (partial.pages, Some(message))
        }
    }
}

fn print_text_output(result: &SyncRunResult) {
    println!("Sync from token {}", result.start_token);
    println!();

    for (i, page) in result.pages.iter().enumerate() {
        print_page_text(i + 1, page);
    }

    let total: usize = result.pages.iter().map(PageSummary::total).sum();
    println!();
    println!("Pages:   {}", result.pages.len());
    println!("Records: {}", total);

    if let Some(ref token) = result.continuation_token {
        println!("Resume token: {}", token);
    }

    if let Some(ref error) = result.error {
        println!("✗ Stopped: {}", error);
    } else if result.exhausted {
        println!("✓ Feed exhausted");
    } else {
        println!("More changes may be available; run again with the resume token");
    }
}
