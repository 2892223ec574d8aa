//! Pages and the result aggregator.

use crate::transport::HttpResponse;
use deltasync_protocol::{
    collection_len, has_collections, is_empty_body, Collection, Header, ProtocolResult, SyncPayload,
};
use serde::Serialize;
use serde_json::Value;

/// Status metadata of a fetched page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMeta {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub response_headers: Vec<Header>,
    /// Continuation token returned with the page.
    pub continuation_token: String,
}

/// The normalized result of one fetch cycle.
///
/// The payload is kept as the raw JSON body so that responses pass through
/// untouched when validation is disabled; [`Page::records`] gives the typed
/// view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// Response body.
    pub payload: Value,
    /// Status and token metadata.
    pub meta: ResponseMeta,
}

impl Page {
    /// Builds a page from a response whose token has already been checked.
    pub fn from_response(response: HttpResponse, continuation_token: String) -> Self {
        Self {
            payload: response.body,
            meta: ResponseMeta {
                status: response.status,
                response_headers: response.headers,
                continuation_token,
            },
        }
    }

    /// Returns the continuation token returned with this page.
    pub fn continuation_token(&self) -> &str {
        &self.meta.continuation_token
    }

    /// Returns true if the body holds all four collections and all are
    /// empty. Only such a page ends a run.
    pub fn is_empty(&self) -> bool {
        is_empty_body(&self.payload)
    }

    /// Returns true if the body holds all four collections as arrays.
    pub fn has_collections(&self) -> bool {
        has_collections(&self.payload)
    }

    /// Returns the number of records in one collection.
    pub fn record_count(&self, collection: Collection) -> usize {
        collection_len(&self.payload, collection)
    }

    /// Returns the total number of records on this page.
    pub fn total_records(&self) -> usize {
        Collection::ALL.iter().map(|c| self.record_count(*c)).sum()
    }

    /// Decodes the typed records of this page.
    pub fn records(&self) -> ProtocolResult<SyncPayload> {
        SyncPayload::from_value(&self.payload)
    }
}

/// The outcome of an aggregated run: every page in fetch order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResult {
    pages: Vec<Page>,
    continuation_token: String,
}

impl AggregatedResult {
    /// Returns the pages in fetch order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Consumes the result, returning the pages.
    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    /// Returns the token of the last page: the resume point of a future run.
    pub fn continuation_token(&self) -> &str {
        &self.continuation_token
    }

    /// Returns the number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Returns the number of records in one collection across all pages.
    pub fn record_count(&self, collection: Collection) -> usize {
        self.pages.iter().map(|p| p.record_count(collection)).sum()
    }

    /// Returns the total number of records across all pages.
    pub fn total_records(&self) -> usize {
        self.pages.iter().map(Page::total_records).sum()
    }
}

/// Accumulates pages across engine cycles.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    pages: Vec<Page>,
}

impl ResultAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a page.
    pub fn push(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Returns the number of pages folded so far.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns true if no page was folded yet.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Returns the pages folded so far.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Returns the token of the last page folded.
    pub fn last_token(&self) -> Option<&str> {
        self.pages.last().map(Page::continuation_token)
    }

    /// Finishes aggregation.
    ///
    /// Returns `None` if no page was folded.
    pub fn finish(self) -> Option<AggregatedResult> {
        let continuation_token = self.last_token()?.to_owned();
        Some(AggregatedResult {
            pages: self.pages,
            continuation_token,
        })
    }

    /// Consumes the aggregator, returning the pages.
    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(token: &str, languages: usize) -> Page {
        let records: Vec<Value> = (0..languages).map(|i| json!({ "n": i })).collect();
        let body = json!({ "items": [], "types": [], "languages": records, "taxonomies": [] });
        Page::from_response(
            HttpResponse::ok(body).with_continuation(token),
            token.to_string(),
        )
    }

    #[test]
    fn page_counts() {
        let p = page("a", 2);
        assert!(!p.is_empty());
        assert_eq!(p.record_count(Collection::Languages), 2);
        assert_eq!(p.total_records(), 2);
        assert!(page("b", 0).is_empty());
    }

    #[test]
    fn page_without_collections_is_not_empty() {
        let p = Page::from_response(
            HttpResponse::ok(Value::Null).with_continuation("c"),
            "c".to_string(),
        );
        assert!(!p.is_empty());
        assert!(!p.has_collections());
        assert_eq!(p.total_records(), 0);
    }

    #[test]
    fn aggregator_preserves_order() {
        let mut aggregator = ResultAggregator::new();
        assert!(aggregator.is_empty());

        aggregator.push(page("b", 1));
        aggregator.push(page("c", 3));
        aggregator.push(page("d", 0));
        assert_eq!(aggregator.last_token(), Some("d"));

        let result = aggregator.finish().unwrap();
        let tokens: Vec<&str> = result.pages().iter().map(Page::continuation_token).collect();
        assert_eq!(tokens, vec!["b", "c", "d"]);
        assert_eq!(result.continuation_token(), "d");
        assert_eq!(result.page_count(), 3);
        assert_eq!(result.record_count(Collection::Languages), 4);
        assert_eq!(result.total_records(), 4);
    }

    #[test]
    fn empty_aggregator_has_no_result() {
        assert!(ResultAggregator::new().finish().is_none());
    }
}
