//! Query objects returned by [`SyncClient`](crate::SyncClient).

use crate::engine::{CancelHandle, ContinuationEngine};
use crate::error::{PartialSyncError, SyncResult};
use crate::fetch::{ClientContext, PageFetcher};
use crate::page::{AggregatedResult, Page};
use std::sync::Arc;

/// The session init query.
///
/// Every call to [`InitQuery::execute`] issues a new, independent request.
#[derive(Clone)]
pub struct InitQuery {
    context: Arc<ClientContext>,
}

impl InitQuery {
    pub(crate) fn new(context: Arc<ClientContext>) -> Self {
        Self { context }
    }

    /// Returns the URL this query posts to.
    pub fn to_url(&self) -> String {
        self.context.init_url()
    }

    /// Initializes a sync session, returning the page carrying the first
    /// continuation token.
    pub fn execute(&self) -> SyncResult<Page> {
        self.context.init()
    }
}

/// A sync query starting from a continuation token.
#[derive(Clone)]
pub struct SyncQuery {
    context: Arc<ClientContext>,
    token: String,
    cancel: CancelHandle,
}

impl SyncQuery {
    pub(crate) fn new(context: Arc<ClientContext>, token: String) -> Self {
        Self {
            context,
            token,
            cancel: CancelHandle::new(),
        }
    }

    /// Returns the URL this query fetches from.
    pub fn to_url(&self) -> String {
        self.context.sync_url()
    }

    /// Returns the token the query starts from.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns a handle that cancels [`SyncQuery::execute_all`] between
    /// pages.
    ///
    /// The handle is shared by clones of this query. A request made before a
    /// run starts cancels that run; the flag is cleared when the run ends, so
    /// the query can be executed again.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Fetches exactly one page.
    pub fn execute(&self) -> SyncResult<Page> {
        self.context.fetch_page(&self.token)
    }

    /// Builds the continuation engine for this query without running it.
    pub fn engine(&self) -> ContinuationEngine<PageFetcher> {
        ContinuationEngine::new(PageFetcher::new(self.context.clone()), self.token.clone())
            .with_cancel_handle(self.cancel.clone())
            .with_max_pages(self.context.config.max_pages)
    }

    /// Fetches pages until the feed is exhausted.
    ///
    /// On failure the pages fetched before it are returned with the error.
    pub fn execute_all(&self) -> Result<AggregatedResult, PartialSyncError> {
        let outcome = self.engine().run();
        self.cancel.reset();
        outcome
    }
}
