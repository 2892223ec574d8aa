//! HTTP header types and the continuation header.

use serde::{Deserialize, Serialize};

/// Header carrying the continuation token on requests and responses.
pub const CONTINUATION_HEADER: &str = "X-Continuation";

/// Header carrying the delivery API key.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// A single HTTP header as a name/value pair.
///
/// Names keep the casing they were received or created with; lookups
/// through [`find_header`] are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl Header {
    /// Creates a header.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Creates an `X-Continuation` header for the given token.
    pub fn continuation(token: impl Into<String>) -> Self {
        Self::new(CONTINUATION_HEADER, token)
    }

    /// Creates a bearer `Authorization` header.
    pub fn bearer(api_key: &str) -> Self {
        Self::new(AUTHORIZATION_HEADER, format!("Bearer {}", api_key))
    }

    /// Returns true if this header has the given name, ignoring ASCII case.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Finds the first header with the given name, ignoring ASCII case.
pub fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.is_named(name))
        .map(|h| h.value.as_str())
}

/// Extracts the continuation token from response headers.
///
/// A header that is present but blank counts as absent.
pub fn extract_continuation_token(headers: &[Header]) -> Option<&str> {
    find_header(headers, CONTINUATION_HEADER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
