//! Continuation engine state machine.
//!
//! The engine chains continuation tokens across sequential fetches:
//!
//! ```text
//! Ready(token) -> Fetching(token) -> Continue(next) -> Fetching(next) -> ...
//!                                 -> Stop
//!                                 -> Failed(error)
//! ```
//!
//! A page whose four collections are all present and empty ends the run;
//! that page is still part of the result. A body without the collections
//! never ends the run. Any failure ends the run and the pages fetched
//! before it are handed back with the error.

use crate::error::{PartialSyncError, SyncError};
use crate::fetch::PageSource;
use crate::page::{AggregatedResult, Page, ResultAggregator};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// The current state of a continuation engine.
#[derive(Debug)]
pub enum EngineState {
    /// Not started; holds the token the run starts from.
    Ready(String),
    /// A fetch with this token is in progress.
    Fetching(String),
    /// The last page was non-empty; holds the token to fetch next.
    Continue(String),
    /// An empty page was reached. Terminal.
    Stop,
    /// The run failed. Terminal.
    Failed(SyncError),
}

impl EngineState {
    /// Returns true if no further cycles will run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Stop | EngineState::Failed(_))
    }

    /// Returns the token the next cycle would use, if any.
    pub fn pending_token(&self) -> Option<&str> {
        match self {
            EngineState::Ready(token)
            | EngineState::Fetching(token)
            | EngineState::Continue(token) => Some(token),
            EngineState::Stop | EngineState::Failed(_) => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            EngineState::Ready(_) => "ready",
            EngineState::Fetching(_) => "fetching",
            EngineState::Continue(_) => "continue",
            EngineState::Stop => "stop",
            EngineState::Failed(_) => "failed",
        }
    }
}

/// Cooperative cancellation flag for a sync run.
///
/// Cancellation is observed between cycles; a fetch already in flight
/// completes and its page is kept.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Creates a handle that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clears a cancellation request.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Drives fetch cycles until the feed is exhausted or a failure occurs.
pub struct ContinuationEngine<S: PageSource> {
    source: S,
    state: EngineState,
    aggregator: ResultAggregator,
    cancel: CancelHandle,
    max_pages: Option<u32>,
}

impl<S: PageSource> ContinuationEngine<S> {
    /// Creates an engine starting from `token`.
    ///
    /// Any token is accepted, so a run can resume from a token persisted by
    /// an earlier process.
    pub fn new(source: S, token: impl Into<String>) -> Self {
        Self {
            source,
            state: EngineState::Ready(token.into()),
            aggregator: ResultAggregator::new(),
            cancel: CancelHandle::new(),
            max_pages: None,
        }
    }

    /// Uses the given cancellation handle.
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fails the run once `max_pages` pages were fetched without reaching an
    /// empty page.
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Gets the current state.
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Gets the pages fetched so far, in fetch order.
    pub fn pages(&self) -> &[Page] {
        self.aggregator.pages()
    }

    /// Returns a handle that cancels this engine.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Runs one cycle.
    ///
    /// Returns false once the engine is in a terminal state.
    pub fn step(&mut self) -> bool {
        let token = match std::mem::replace(&mut self.state, EngineState::Stop) {
            EngineState::Ready(token)
            | EngineState::Fetching(token)
            | EngineState::Continue(token) => token,
            terminal => {
                self.state = terminal;
                return false;
            }
        };

        if self.cancel.is_cancelled() {
            return self.fail(SyncError::Cancelled);
        }

        let cycle = self.aggregator.len() + 1;
        debug!(cycle, token = %token, "fetching page");
        self.state = EngineState::Fetching(token.clone());
        let outcome = self.source.fetch_page(&token);

        let page = match outcome {
            Ok(page) => page,
            Err(error) => return self.fail(error),
        };

        if !page.has_collections() {
            warn!(cycle, "page body lacks the sync collections, continuing");
        }
        let exhausted = page.is_empty();
        let next = page.continuation_token().to_owned();
        debug!(
            cycle,
            records = page.total_records(),
            next_token = %next,
            exhausted,
            "page fetched"
        );
        self.aggregator.push(page);

        if exhausted {
            debug!(pages = self.aggregator.len(), "feed exhausted");
            self.state = EngineState::Stop;
            return false;
        }

        if let Some(limit) = self.max_pages {
            if self.aggregator.len() >= limit as usize {
                return self.fail(SyncError::PageLimitExceeded { limit });
            }
        }

        self.state = EngineState::Continue(next);
        true
    }

    fn fail(&mut self, error: SyncError) -> bool {
        warn!(
            pages = self.aggregator.len(),
            reason = error.reason().as_str(),
            %error,
            "sync run failed"
        );
        self.state = EngineState::Failed(error);
        false
    }

    /// Runs cycles until a terminal state is reached.
    pub fn run(mut self) -> Result<AggregatedResult, PartialSyncError> {
        while self.step() {}
        self.finish()
    }

    /// Consumes the engine, producing the run's outcome.
    ///
    /// Finishing before a terminal state counts as cancellation.
    pub fn finish(self) -> Result<AggregatedResult, PartialSyncError> {
        let pages = self.aggregator;
        match self.state {
            EngineState::Stop => pages.finish().ok_or_else(|| {
                PartialSyncError::new(
                    SyncError::Unknown {
                        message: "engine stopped without fetching a page".into(),
                        source: None,
                    },
                    Vec::new(),
                )
            }),
            EngineState::Failed(error) => Err(PartialSyncError::new(error, pages.into_pages())),
            state => {
                debug!(state = state.name(), "engine finished before completion");
                Err(PartialSyncError::new(SyncError::Cancelled, pages.into_pages()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorReason, SyncResult};
    use crate::transport::HttpResponse;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn body(items: usize) -> Value {
        let items: Vec<Value> = (0..items).map(|i| json!({ "n": i })).collect();
        json!({ "items": items, "types": [], "languages": [], "taxonomies": [] })
    }

    fn page(next: &str, items: usize) -> Page {
        Page::from_response(
            HttpResponse::ok(body(items)).with_continuation(next),
            next.to_string(),
        )
    }

    /// Page source answering from a token -> page table and recording calls.
    struct Feed {
        pages: HashMap<String, Result<Page, String>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Feed {
        fn chain() -> Self {
            let mut pages = HashMap::new();
            pages.insert("a".to_string(), Ok(page("b", 2)));
            pages.insert("b".to_string(), Ok(page("c", 1)));
            pages.insert("c".to_string(), Ok(page("d", 3)));
            pages.insert("d".to_string(), Ok(page("d", 0)));
            Self {
                pages,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn failing_at(mut self, token: &str) -> Self {
            self.pages
                .insert(token.to_string(), Err(format!("scripted failure at {token}")));
            self
        }

        fn with_body(mut self, token: &str, body: Value, next: &str) -> Self {
            let page = Page::from_response(
                HttpResponse::ok(body).with_continuation(next),
                next.to_string(),
            );
            self.pages.insert(token.to_string(), Ok(page));
            self
        }

        fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
            self.calls.clone()
        }
    }

    impl PageSource for Feed {
        fn fetch_page(&self, token: &str) -> SyncResult<Page> {
            self.calls.lock().push(token.to_string());
            match self.pages.get(token) {
                Some(Ok(page)) => Ok(page.clone()),
                Some(Err(message)) => Err(SyncError::Unknown {
                    message: message.clone(),
                    source: None,
                }),
                None => Err(SyncError::InvalidToken),
            }
        }
    }

    fn calls(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().clone()
    }

    #[test]
    fn runs_until_empty_page() {
        let feed = Feed::chain();
        let log = feed.call_log();
        let result = ContinuationEngine::new(feed, "a").run().unwrap();

        assert_eq!(result.page_count(), 4);
        assert_eq!(result.continuation_token(), "d");
        assert!(result.pages()[3].is_empty());
        assert_eq!(result.total_records(), 6);
        assert_eq!(calls(&log), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn null_body_mid_chain_does_not_end_run() {
        let feed = Feed::chain().with_body("b", Value::Null, "c");
        let log = feed.call_log();
        let result = ContinuationEngine::new(feed, "a").run().unwrap();

        assert_eq!(result.page_count(), 4);
        assert!(result.pages()[1].payload.is_null());
        assert_eq!(result.continuation_token(), "d");
        assert_eq!(calls(&log), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn foreign_body_mid_chain_does_not_end_run() {
        for body in [json!({}), json!({ "result": "ok" }), json!({ "items": [] })] {
            let feed = Feed::chain().with_body("b", body, "c");
            let log = feed.call_log();
            let result = ContinuationEngine::new(feed, "a").run().unwrap();

            assert_eq!(result.page_count(), 4);
            assert_eq!(calls(&log), vec!["a", "b", "c", "d"]);
        }
    }

    #[test]
    fn chains_tokens_from_previous_page() {
        let feed = Feed::chain();
        let log = feed.call_log();
        let mut engine = ContinuationEngine::new(feed, "b");

        assert!(matches!(engine.state(), EngineState::Ready(t) if t == "b"));
        assert!(engine.step());
        assert_eq!(engine.state().pending_token(), Some("d"));
        assert!(engine.step());
        assert!(!engine.step());
        assert!(engine.state().is_terminal());
        assert!(!engine.step());

        assert_eq!(calls(&log), vec!["b", "c", "d"]);
        assert_eq!(engine.pages().len(), 3);
    }

    #[test]
    fn failure_keeps_prior_pages() {
        let feed = Feed::chain().failing_at("c");
        let log = feed.call_log();
        let err = ContinuationEngine::new(feed, "a").run().unwrap_err();

        assert_eq!(err.reason(), ErrorReason::Unknown);
        assert_eq!(err.pages.len(), 2);
        assert_eq!(err.resume_token(), Some("c"));
        assert_eq!(calls(&log), vec!["a", "b", "c"]);
    }

    #[test]
    fn first_page_empty_stops_immediately() {
        let result = ContinuationEngine::new(Feed::chain(), "d").run().unwrap();

        assert_eq!(result.page_count(), 1);
        assert_eq!(result.continuation_token(), "d");
    }

    #[test]
    fn cancellation_between_cycles() {
        let feed = Feed::chain();
        let log = feed.call_log();
        let mut engine = ContinuationEngine::new(feed, "a");
        let cancel = engine.cancel_handle();

        assert!(engine.step());
        cancel.cancel();
        assert!(!engine.step());

        let err = engine.finish().unwrap_err();
        assert_eq!(err.reason(), ErrorReason::Cancelled);
        assert_eq!(err.pages.len(), 1);
        assert_eq!(calls(&log), vec!["a"]);
    }

    #[test]
    fn cancelled_before_start_fetches_nothing() {
        let feed = Feed::chain();
        let log = feed.call_log();
        let cancel = CancelHandle::new();
        cancel.cancel();

        let err = ContinuationEngine::new(feed, "a")
            .with_cancel_handle(cancel)
            .run()
            .unwrap_err();
        assert_eq!(err.reason(), ErrorReason::Cancelled);
        assert!(err.pages.is_empty());
        assert!(calls(&log).is_empty());
    }

    #[test]
    fn reset_handle_allows_a_new_run() {
        let cancel = CancelHandle::new();
        cancel.cancel();
        let err = ContinuationEngine::new(Feed::chain(), "a")
            .with_cancel_handle(cancel.clone())
            .run()
            .unwrap_err();
        assert_eq!(err.reason(), ErrorReason::Cancelled);

        cancel.reset();
        assert!(!cancel.is_cancelled());
        let result = ContinuationEngine::new(Feed::chain(), "a")
            .with_cancel_handle(cancel)
            .run()
            .unwrap();
        assert_eq!(result.page_count(), 4);
    }

    #[test]
    fn page_limit_fails_run() {
        let err = ContinuationEngine::new(Feed::chain(), "a")
            .with_max_pages(Some(2))
            .run()
            .unwrap_err();

        assert!(matches!(err.error, SyncError::PageLimitExceeded { limit: 2 }));
        assert_eq!(err.pages.len(), 2);
    }

    #[test]
    fn page_limit_allows_terminal_page() {
        let result = ContinuationEngine::new(Feed::chain(), "a")
            .with_max_pages(Some(4))
            .run()
            .unwrap();
        assert_eq!(result.page_count(), 4);
    }

    #[test]
    fn finishing_early_counts_as_cancelled() {
        let mut engine = ContinuationEngine::new(Feed::chain(), "a");
        engine.step();

        let err = engine.finish().unwrap_err();
        assert_eq!(err.reason(), ErrorReason::Cancelled);
        assert_eq!(err.pages.len(), 1);
    }

    #[test]
    fn closures_are_page_sources() {
        let source = |token: &str| -> SyncResult<Page> {
            assert_eq!(token, "only");
            Ok(page("last", 0))
        };
        let result = ContinuationEngine::new(source, "only").run().unwrap();
        assert_eq!(result.continuation_token(), "last");
    }
}
