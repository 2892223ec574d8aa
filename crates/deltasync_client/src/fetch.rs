//! Session init and single-page fetch.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::page::Page;
use crate::transport::{HttpRequest, HttpResponse, HttpService};
use deltasync_protocol::{
    validate_init_payload, validate_payload, Header, ProtocolResult, SyncPayload,
    SYNC_INIT_PATH, SYNC_PATH,
};
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::debug;

/// Configuration and HTTP service shared by a client and its queries.
pub(crate) struct ClientContext {
    pub(crate) config: SyncConfig,
    pub(crate) service: Arc<dyn HttpService>,
}

impl ClientContext {
    pub(crate) fn init_url(&self) -> String {
        self.config.endpoint_url(SYNC_INIT_PATH)
    }

    pub(crate) fn sync_url(&self) -> String {
        self.config.endpoint_url(SYNC_PATH)
    }

    fn with_auth(&self, request: HttpRequest) -> HttpRequest {
        match self.config.auth_header() {
            Some(header) => request.with_header(header),
            None => request,
        }
    }

    /// Runs the service, turning panics into [`SyncError::Unknown`].
    fn execute(&self, request: &HttpRequest) -> SyncResult<HttpResponse> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.service.execute(request)))
            .map_err(|payload| SyncError::Unknown {
                message: format!("http service panicked: {}", panic_message(&*payload)),
                source: None,
            })?;
        outcome.map_err(|e| SyncError::from_transport(&request.url, e))
    }

    /// Validates the body when validation is enabled.
    fn check_payload(
        &self,
        url: &str,
        response: HttpResponse,
        validate: fn(&Value) -> ProtocolResult<SyncPayload>,
    ) -> SyncResult<HttpResponse> {
        if !self.config.response_validation {
            return Ok(response);
        }
        match validate(&response.body) {
            Ok(_) => Ok(response),
            Err(source) => Err(SyncError::ValidationFailed {
                url: url.to_string(),
                source,
                response: Box::new(response),
            }),
        }
    }

    /// Issues the init call and returns its page.
    ///
    /// A success response without a token is a protocol violation.
    pub(crate) fn init(&self) -> SyncResult<Page> {
        let url = self.init_url();
        let request = self.with_auth(HttpRequest::post(&url));

        debug!(url = %url, "initializing sync session");
        let response = self.execute(&request)?;
        let response = self.check_payload(&url, response, validate_init_payload)?;

        let token = match response.continuation_token() {
            Some(token) => token.to_owned(),
            None => {
                return Err(SyncError::MissingContinuationToken {
                    url,
                    status: response.status,
                    previous_token: None,
                })
            }
        };

        Ok(Page::from_response(response, token))
    }

    /// Fetches the page following `token`.
    pub(crate) fn fetch_page(&self, token: &str) -> SyncResult<Page> {
        if token.trim().is_empty() {
            return Err(SyncError::InvalidToken);
        }

        let url = self.sync_url();
        let request = self.with_auth(HttpRequest::get(&url).with_header(Header::continuation(token)));

        let response = self.execute(&request)?;
        let response = self.check_payload(&url, response, validate_payload)?;

        let next = match response.continuation_token() {
            Some(next) => next.to_owned(),
            None => {
                return Err(SyncError::MissingContinuationToken {
                    url,
                    status: response.status,
                    previous_token: Some(token.to_owned()),
                })
            }
        };

        Ok(Page::from_response(response, next))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Source of pages for the continuation engine.
pub trait PageSource {
    /// Fetches the page following `token`.
    fn fetch_page(&self, token: &str) -> SyncResult<Page>;
}

/// Fetches sync pages through a client's HTTP service.
#[derive(Clone)]
pub struct PageFetcher {
    context: Arc<ClientContext>,
}

impl PageFetcher {
    pub(crate) fn new(context: Arc<ClientContext>) -> Self {
        Self { context }
    }
}

impl PageSource for PageFetcher {
    fn fetch_page(&self, token: &str) -> SyncResult<Page> {
        self.context.fetch_page(token)
    }
}

impl<F> PageSource for F
where
    F: Fn(&str) -> SyncResult<Page>,
{
    fn fetch_page(&self, token: &str) -> SyncResult<Page> {
        self(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorReason;
    use crate::transport::{MockHttpService, TransportError};
    use serde_json::json;

    fn context(config: SyncConfig, service: impl HttpService + 'static) -> ClientContext {
        ClientContext {
            config,
            service: Arc::new(service),
        }
    }

    fn empty_body() -> Value {
        json!({ "items": [], "types": [], "languages": [], "taxonomies": [] })
    }

    #[test]
    fn init_posts_and_reads_token() {
        let service = Arc::new(MockHttpService::new());
        service.push_response(HttpResponse::ok(empty_body()).with_continuation("x"));
        let ctx = ClientContext {
            config: SyncConfig::preview("env", "key"),
            service: service.clone(),
        };

        let page = ctx.init().unwrap();
        assert_eq!(page.continuation_token(), "x");
        assert!(page.is_empty());

        let request = &service.requests()[0];
        assert_eq!(request.url, "https://preview-deliver.kontent.ai/v2/env/sync/init");
        assert_eq!(request.method.as_str(), "POST");
        assert_eq!(request.header("authorization"), Some("Bearer key"));
    }

    #[test]
    fn init_without_token_is_fatal() {
        let service = MockHttpService::new();
        service.push_response(HttpResponse::ok(empty_body()));
        let ctx = context(SyncConfig::public("env"), service);

        let err = ctx.init().unwrap_err();
        assert_eq!(err.reason(), ErrorReason::MissingContinuationToken);
    }

    #[test]
    fn fetch_sends_token_header() {
        let service = Arc::new(MockHttpService::new());
        service.push_response(HttpResponse::ok(empty_body()).with_continuation("b"));
        let ctx = ClientContext {
            config: SyncConfig::public("env"),
            service: service.clone(),
        };

        let page = ctx.fetch_page("a").unwrap();
        assert_eq!(page.continuation_token(), "b");

        let request = &service.requests()[0];
        assert_eq!(request.url, "https://deliver.kontent.ai/v2/env/sync");
        assert_eq!(request.header("X-Continuation"), Some("a"));
        assert_eq!(request.header("Authorization"), None);
    }

    #[test]
    fn empty_token_is_rejected_without_request() {
        let service = Arc::new(MockHttpService::new());
        let ctx = ClientContext {
            config: SyncConfig::public("env"),
            service: service.clone(),
        };

        assert_eq!(ctx.fetch_page("").unwrap_err().reason(), ErrorReason::InvalidToken);
        assert_eq!(service.request_count(), 0);
    }

    #[test]
    fn missing_token_keeps_previous_for_diagnostics() {
        let service = MockHttpService::new();
        service.push_response(HttpResponse::ok(json!({ "items": [1] })));
        let ctx = context(SyncConfig::public("env"), service);

        match ctx.fetch_page("a").unwrap_err() {
            SyncError::MissingContinuationToken { previous_token, status, .. } => {
                assert_eq!(previous_token.as_deref(), Some("a"));
                assert_eq!(status, 200);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validation_failure_keeps_raw_response() {
        let service = MockHttpService::new();
        service.push_response(HttpResponse::ok(json!({ "result": "ok" })).with_continuation("x"));
        let ctx = context(
            SyncConfig::public("env").with_response_validation(true),
            service,
        );

        match ctx.init().unwrap_err() {
            SyncError::ValidationFailed { response, url, .. } => {
                assert_eq!(response.body, json!({ "result": "ok" }));
                assert!(url.ends_with("/env/sync/init"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn payload_passes_through_without_validation() {
        let service = MockHttpService::new();
        service.push_response(HttpResponse::ok(json!({ "result": "ok" })).with_continuation("x"));
        let ctx = context(SyncConfig::public("env"), service);

        let page = ctx.init().unwrap();
        assert_eq!(page.payload, json!({ "result": "ok" }));
    }

    #[test]
    fn panicking_service_becomes_unknown() {
        struct Exploding;

        impl HttpService for Exploding {
            fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
                panic!("adapter exploded");
            }
        }

        let ctx = context(SyncConfig::public("env"), Exploding);
        match ctx.init().unwrap_err() {
            SyncError::Unknown { message, .. } => assert!(message.contains("adapter exploded")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
