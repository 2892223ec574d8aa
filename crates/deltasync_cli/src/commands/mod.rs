//! CLI command implementations.

pub mod init;
pub mod sync;
pub mod url;

use deltasync_client::{Collection, Page, RetryConfig, SyncClient, SyncConfig};
use deltasync_protocol::ApiMode;
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;

/// Output format of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{}', expected text or json", other)),
        }
    }
}

/// Connection options shared by all commands.
#[derive(Debug, Clone)]
pub struct ClientArgs {
    /// Environment ID.
    pub environment_id: Option<String>,
    /// Delivery API mode.
    pub api_mode: ApiMode,
    /// Delivery API key.
    pub api_key: Option<String>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Whether to validate responses.
    pub validate: bool,
    /// Maximum retries per request.
    pub retries: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl ClientArgs {
    /// Builds the client configuration from the command-line options.
    pub fn config(&self) -> Result<SyncConfig, Box<dyn std::error::Error>> {
        let environment_id = self
            .environment_id
            .clone()
            .ok_or("Environment ID required (--environment)")?;

        let config = match self.api_mode {
            ApiMode::Public => SyncConfig::public(environment_id),
            mode => {
                let key = self
                    .api_key
                    .clone()
                    .ok_or_else(|| format!("{} mode requires --api-key", mode))?;
                if mode == ApiMode::Preview {
                    SyncConfig::preview(environment_id, key)
                } else {
                    SyncConfig::secure(environment_id, key)
                }
            }
        };

        let config = match self.base_url {
            Some(ref base_url) => config.with_base_url(base_url.clone()),
            None => config,
        };

        Ok(config
            .with_response_validation(self.validate)
            .with_retry(RetryConfig::new(self.retries))
            .with_timeout(Duration::from_secs(self.timeout_secs)))
    }

    /// Builds a client from the command-line options.
    pub fn client(&self) -> Result<SyncClient, Box<dyn std::error::Error>> {
        Ok(SyncClient::new(self.config()?)?)
    }
}

/// Summary of one fetched page.
#[derive(Debug, Serialize)]
pub struct PageSummary {
    /// HTTP status.
    pub status: u16,
    /// Continuation token returned with the page.
    pub continuation_token: String,
    /// Number of content item records.
    pub items: usize,
    /// Number of content type records.
    pub types: usize,
    /// Number of language records.
    pub languages: usize,
    /// Number of taxonomy records.
    pub taxonomies: usize,
    /// Response body (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl PageSummary {
    /// Summarizes a page, optionally keeping its body.
    pub fn new(page: &Page, with_payload: bool) -> Self {
        Self {
            status: page.meta.status,
            continuation_token: page.continuation_token().to_string(),
            items: page.record_count(Collection::Items),
            types: page.record_count(Collection::Types),
            languages: page.record_count(Collection::Languages),
            taxonomies: page.record_count(Collection::Taxonomies),
            payload: with_payload.then(|| page.payload.clone()),
        }
    }

    /// Total number of records on the page.
    pub fn total(&self) -> usize {
        self.items + self.types + self.languages + self.taxonomies
    }
}

/// Prints a page summary as text.
pub fn print_page_text(index: usize, page: &PageSummary) {
    println!(
        "Page {:>3}: {:>4} record(s)  next token: {}",
        index,
        page.total(),
        page.continuation_token
    );
    if page.total() > 0 {
        println!(
            "          items={} types={} languages={} taxonomies={}",
            page.items, page.types, page.languages, page.taxonomies
        );
    }
    if let Some(ref payload) = page.payload {
        match serde_json::to_string_pretty(payload) {
            Ok(text) => println!("{}", text),
            Err(e) => println!("          <unprintable payload: {}>", e),
        }
    }
}
