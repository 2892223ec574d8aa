//! Transport layer abstraction for sync requests.

use deltasync_protocol::{extract_continuation_token, find_header, Header};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::error::Error as StdError;
use thiserror::Error;

/// HTTP method of a sync request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET request.
    Get,
    /// POST request.
    Post,
}

impl HttpMethod {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A request handed to an [`HttpService`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Fully qualified URL.
    pub url: String,
    /// Request headers.
    pub headers: Vec<Header>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl HttpRequest {
    /// Creates a GET request without headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a POST request with an empty body.
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    /// Looks up a request header, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A successful response returned by an [`HttpService`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status reason phrase.
    pub status_text: String,
    /// Response headers.
    pub headers: Vec<Header>,
    /// Parsed JSON body (`null` for an empty body).
    pub body: Value,
    /// Number of retries performed before this response arrived.
    pub retry_attempt: u32,
}

impl HttpResponse {
    /// Creates a `200 OK` response with the given body.
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            status_text: "OK".into(),
            headers: Vec::new(),
            body,
            retry_attempt: 0,
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    /// Adds an `X-Continuation` header.
    pub fn with_continuation(self, token: impl Into<String>) -> Self {
        self.with_header(Header::continuation(token))
    }

    /// Returns the continuation token, if the response carries one.
    pub fn continuation_token(&self) -> Option<&str> {
        extract_continuation_token(&self.headers)
    }
}

/// Failure of an HTTP exchange.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("invalid response: {status} {status_text} (retried {retry_attempt} time(s))")]
    InvalidResponse {
        /// HTTP status code.
        status: u16,
        /// Status reason phrase.
        status_text: String,
        /// Number of retries performed.
        retry_attempt: u32,
        /// Raw response body, if it could be read.
        body: Option<String>,
    },

    /// The exchange could not be completed.
    #[error("request failed: {message} (retried {retry_attempt} time(s))")]
    Network {
        /// Error message.
        message: String,
        /// Number of retries performed.
        retry_attempt: u32,
    },

    /// The response body was not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// An error raised by a custom transport implementation.
    #[error("custom transport error: {0}")]
    Custom(#[source] Box<dyn StdError + Send + Sync>),
}

impl TransportError {
    /// Wraps an arbitrary error raised by a custom transport.
    pub fn custom(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Custom(error.into())
    }

    /// Creates a network error that has not been retried yet.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retry_attempt: 0,
        }
    }

    /// Returns the HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::InvalidResponse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the status reason phrase, if the server answered.
    pub fn status_text(&self) -> Option<&str> {
        match self {
            TransportError::InvalidResponse { status_text, .. } => Some(status_text),
            _ => None,
        }
    }

    /// Returns the number of retries performed before giving up.
    pub fn retry_attempt(&self) -> u32 {
        match self {
            TransportError::InvalidResponse { retry_attempt, .. }
            | TransportError::Network { retry_attempt, .. } => *retry_attempt,
            _ => 0,
        }
    }

    pub(crate) fn with_retry_attempt(mut self, attempt: u32) -> Self {
        match &mut self {
            TransportError::InvalidResponse { retry_attempt, .. }
            | TransportError::Network { retry_attempt, .. } => *retry_attempt = attempt,
            _ => {}
        }
        self
    }
}

/// An HTTP service performs one request/response exchange.
///
/// Retries, timeouts and status interpretation are the service's concern;
/// callers see a single resolved outcome. Implementations must be safe to
/// share between concurrent sync runs.
pub trait HttpService: Send + Sync {
    /// Executes a request.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// A scripted HTTP service for testing.
///
/// Outcomes are served in the order they were queued and every request is
/// recorded.
#[derive(Debug, Default)]
pub struct MockHttpService {
    outcomes: Mutex<VecDeque<Result<HttpResponse, String>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpService {
    /// Creates a mock with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: HttpResponse) {
        self.outcomes.lock().push_back(Ok(response));
    }

    /// Queues a network failure.
    pub fn push_network_error(&self, message: impl Into<String>) {
        self.outcomes.lock().push_back(Err(message.into()));
    }

    /// Returns all recorded requests.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of recorded requests.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl HttpService for MockHttpService {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request.clone());
        match self.outcomes.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::network(message)),
            None => Err(TransportError::network("no mock response queued")),
        }
    }
}
