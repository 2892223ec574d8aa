//! Init command implementation.

use super::{ClientArgs, OutputFormat};
use serde::Serialize;

/// Result of initializing a sync session.
#[derive(Debug, Serialize)]
pub struct InitResult {
    /// URL the init request was sent to.
    pub url: String,
    /// HTTP status.
    pub status: u16,
    /// First continuation token of the session.
    pub continuation_token: String,
}

/// Runs the init command.
pub fn run(args: &ClientArgs, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let client = args.client()?;
    let query = client.init();
    let page = query.execute()?;

    let result = InitResult {
        url: query.to_url(),
        status: page.meta.status,
        continuation_token: page.continuation_token().to_string(),
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            println!("Sync session initialized");
            println!("  URL:    {}", result.url);
            println!("  Status: {}", result.status);
            println!("  Token:  {}", result.continuation_token);
        }
    }

    Ok(())
}
