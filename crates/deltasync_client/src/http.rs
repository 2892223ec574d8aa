//! Default HTTP service.
//!
//! The service is split in two layers. An [`HttpAdapter`] performs exactly
//! one raw exchange; [`DefaultHttpService`] wraps an adapter with the retry
//! strategy, interprets the status code and parses the JSON body. The
//! shipped adapter uses `ureq`, but any adapter can be plugged in (a
//! loopback adapter, another HTTP library, a recorded fixture).

use crate::config::{RetryCause, RetryConfig};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpService, TransportError};
use deltasync_protocol::Header;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// A raw, uninterpreted HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status reason phrase.
    pub status_text: String,
    /// Response headers.
    pub headers: Vec<Header>,
    /// Response body as text.
    pub body: String,
}

impl AdapterResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single HTTP exchange.
///
/// Implement this trait to swap the HTTP library while keeping the retry
/// and response handling of [`DefaultHttpService`].
pub trait HttpAdapter: Send + Sync {
    /// Sends a request and returns the raw response.
    ///
    /// Non-success statuses are returned as responses, not errors. Return
    /// [`TransportError::Network`] for failures worth retrying and
    /// [`TransportError::Custom`] for anything else.
    fn send(&self, request: &HttpRequest) -> Result<AdapterResponse, TransportError>;
}

/// HTTP adapter backed by a `ureq` agent.
pub struct UreqAdapter {
    agent: ureq::Agent,
}

impl UreqAdapter {
    /// Creates an adapter with the given overall request timeout.
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }
}

impl Default for UreqAdapter {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl HttpAdapter for UreqAdapter {
    fn send(&self, request: &HttpRequest) -> Result<AdapterResponse, TransportError> {
        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.url);
                for header in &request.headers {
                    builder = builder.header(header.name.as_str(), header.value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&request.url);
                for header in &request.headers {
                    builder = builder.header(header.name.as_str(), header.value.as_str());
                }
                match request.body {
                    Some(ref body) => builder.send_json(body),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(|e| TransportError::network(e.to_string()))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| Header::new(name.as_str(), v))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| TransportError::network(format!("failed to read body: {}", e)))?;

        Ok(AdapterResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

/// HTTP service with retries and JSON response handling.
pub struct DefaultHttpService<A: HttpAdapter = UreqAdapter> {
    adapter: A,
    retry: RetryConfig,
}

impl DefaultHttpService<UreqAdapter> {
    /// Creates a service using the `ureq` adapter.
    pub fn new(retry: RetryConfig, timeout: Duration) -> Self {
        Self::with_adapter(UreqAdapter::new(timeout), retry)
    }
}

impl<A: HttpAdapter> DefaultHttpService<A> {
    /// Creates a service around a custom adapter.
    pub fn with_adapter(adapter: A, retry: RetryConfig) -> Self {
        Self { adapter, retry }
    }

    /// Returns the retry configuration.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Returns the adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    fn can_retry(&self, cause: RetryCause, attempt: u32) -> bool {
        attempt < self.retry.max_retries && (self.retry.should_retry)(cause)
    }
}

impl<A: HttpAdapter> HttpService for DefaultHttpService<A> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut attempt = 0u32;

        loop {
            if attempt > 0 {
                std::thread::sleep(self.retry.delay_for_attempt(attempt));
            }

            debug!(
                method = request.method.as_str(),
                url = %request.url,
                attempt,
                "sending request"
            );

            let response = match self.adapter.send(request) {
                Ok(response) => response,
                Err(error @ TransportError::Network { .. }) => {
                    if self.can_retry(RetryCause::Network, attempt) {
                        warn!(url = %request.url, attempt, %error, "request failed, retrying");
                        attempt += 1;
                        continue;
                    }
                    return Err(error.with_retry_attempt(attempt));
                }
                Err(error) => return Err(error),
            };

            if !response.is_success() {
                if self.can_retry(RetryCause::Status(response.status), attempt) {
                    warn!(
                        url = %request.url,
                        attempt,
                        status = response.status,
                        "invalid response, retrying"
                    );
                    attempt += 1;
                    continue;
                }
                return Err(TransportError::InvalidResponse {
                    status: response.status,
                    status_text: response.status_text,
                    retry_attempt: attempt,
                    body: Some(response.body).filter(|b| !b.is_empty()),
                });
            }

            let body = if response.body.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&response.body).map_err(TransportError::InvalidJson)?
            };

            return Ok(HttpResponse {
                status: response.status,
                status_text: response.status_text,
                headers: response.headers,
                body,
                retry_attempt: attempt,
            });
        }
    }
}
