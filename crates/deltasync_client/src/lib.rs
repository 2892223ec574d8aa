//! # DeltaSync Client
//!
//! Client for the delivery sync API of a headless content platform.
//!
//! This crate provides:
//! - Session init (`POST /sync/init`) yielding the first continuation token
//! - Single-page fetch (`GET /sync` with `X-Continuation`)
//! - A continuation engine that chains tokens until the feed is exhausted
//! - Aggregation of multi-page results, with partial results on failure
//! - A pluggable HTTP service with retries and exponential backoff
//!
//! ## Usage
//!
//! ```no_run
//! use deltasync_client::{SyncClient, SyncConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SyncClient::new(SyncConfig::public("my-environment"))?;
//!
//! let init = client.init().execute()?;
//! let result = client.sync(init.continuation_token()).execute_all()?;
//!
//! // Persist this token to resume later
//! println!("resume from {}", result.continuation_token());
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Invariants
//!
//! - Pages are returned in fetch order
//! - Each request uses the token returned by the previous page
//! - A page with all four collections empty ends the run and is included
//! - A successful response without a continuation token is an error
//! - A failed run hands back every page fetched before the failure

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod engine;
mod error;
mod fetch;
mod http;
mod page;
mod query;
mod transport;

pub use client::SyncClient;
pub use config::{default_should_retry, RetryCause, RetryConfig, SyncConfig};
pub use engine::{CancelHandle, ContinuationEngine, EngineState};
pub use error::{ErrorReason, PartialSyncError, SyncError, SyncResult};
pub use fetch::{PageFetcher, PageSource};
pub use http::{AdapterResponse, DefaultHttpService, HttpAdapter, UreqAdapter};
pub use page::{AggregatedResult, Page, ResponseMeta, ResultAggregator};
pub use query::{InitQuery, SyncQuery};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpService, MockHttpService, TransportError,
};

pub use deltasync_protocol::{ApiMode, Collection};
