//! DeltaSync CLI
//!
//! Command-line client for the delivery sync API.
//!
//! # Commands
//!
//! - `init` - Initialize a sync session and print the first token
//! - `sync` - Fetch the page after a token, or every page with `--all`
//! - `url` - Print the endpoint URLs for the configured environment

mod commands;

use clap::{Parser, Subcommand};
use commands::{ClientArgs, OutputFormat};
use deltasync_protocol::ApiMode;
use tracing_subscriber::EnvFilter;

/// Delta sync command-line client.
#[derive(Parser)]
#[command(name = "deltasync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Environment ID of the project
    #[arg(global = true, short, long)]
    environment: Option<String>,

    /// Delivery API mode (public, preview, secure)
    #[arg(global = true, short, long, default_value = "public")]
    mode: ApiMode,

    /// Delivery API key for preview and secure modes
    #[arg(global = true, short = 'k', long)]
    api_key: Option<String>,

    /// Base URL overriding the mode default
    #[arg(global = true, long)]
    base_url: Option<String>,

    /// Validate response bodies
    #[arg(global = true, long)]
    validate: bool,

    /// Maximum retries per request
    #[arg(global = true, long, default_value = "3")]
    retries: u32,

    /// Request timeout in seconds
    #[arg(global = true, long, default_value = "30")]
    timeout: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a sync session
    Init {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Fetch changes after a continuation token
    Sync {
        /// Continuation token to start from
        token: String,

        /// Fetch pages until the feed is exhausted
        #[arg(short, long)]
        all: bool,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Include response bodies in the output
        #[arg(short, long)]
        payload: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the endpoint URLs
    Url,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = ClientArgs {
        environment_id: cli.environment,
        api_mode: cli.mode,
        api_key: cli.api_key,
        base_url: cli.base_url,
        validate: cli.validate,
        retries: cli.retries,
        timeout_secs: cli.timeout,
    };

    match cli.command {
        Commands::Init { format } => {
            commands::init::run(&args, format)?;
        }
        Commands::Sync {
            token,
            all,
            max_pages,
            payload,
            format,
        } => {
            commands::sync::run(&args, &token, all, max_pages, payload, format)?;
        }
        Commands::Url => {
            commands::url::run(&args)?;
        }
        Commands::Version => {
            println!("DeltaSync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
