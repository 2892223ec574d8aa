//! API modes and endpoint URL resolution.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Default base URL for the public and secure delivery APIs.
pub const DELIVERY_BASE_URL: &str = "https://deliver.kontent.ai/v2";

/// Default base URL for the preview delivery API.
pub const PREVIEW_BASE_URL: &str = "https://preview-deliver.kontent.ai/v2";

/// Path of the session init endpoint, relative to the environment.
pub const SYNC_INIT_PATH: &str = "/sync/init";

/// Path of the sync page endpoint, relative to the environment.
pub const SYNC_PATH: &str = "/sync";

/// Which delivery API a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiMode {
    /// Publicly available content, no credentials.
    #[default]
    Public,
    /// Unpublished content; needs a key with preview access.
    Preview,
    /// Published content behind a key with secure access.
    Secure,
}

impl ApiMode {
    /// Returns the lowercase mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMode::Public => "public",
            ApiMode::Preview => "preview",
            ApiMode::Secure => "secure",
        }
    }

    /// Returns true if requests in this mode must carry a delivery API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(self, ApiMode::Preview | ApiMode::Secure)
    }

    /// Returns the base URL used when no override is configured.
    ///
    /// Secure mode differs from public only in the credential it sends.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ApiMode::Preview => PREVIEW_BASE_URL,
            ApiMode::Public | ApiMode::Secure => DELIVERY_BASE_URL,
        }
    }
}

impl fmt::Display for ApiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(ApiMode::Public),
            "preview" => Ok(ApiMode::Preview),
            "secure" => Ok(ApiMode::Secure),
            _ => Err(ProtocolError::UnknownApiMode(s.to_string())),
        }
    }
}

/// Resolves the fully qualified URL of an endpoint.
///
/// The override, when given, always wins over the mode default.
pub fn resolve_url(
    environment_id: &str,
    api_mode: ApiMode,
    path: &str,
    base_url_override: Option<&str>,
) -> String {
    let base = base_url_override.unwrap_or_else(|| api_mode.default_base_url());
    join_endpoint(base, environment_id, path)
}

/// Joins `{base}/{environment_id}/{path}` and collapses duplicate slashes.
pub fn join_endpoint(base_url: &str, environment_id: &str, path: &str) -> String {
    remove_duplicate_slashes(&format!("{}/{}/{}", base_url, environment_id, path))
}

/// Collapses runs of `/` into a single `/`.
///
/// The `://` scheme separator is kept intact.
pub fn remove_duplicate_slashes(url: &str) -> String {
    let (prefix, rest) = match url.find("://") {
        Some(idx) => url.split_at(idx + 3),
        None => ("", url),
    };

    let mut out = String::with_capacity(url.len());
    out.push_str(prefix);

    let mut prev_slash = !prefix.is_empty();
    for c in rest.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out
}

/// Parses and checks a base URL override.
///
/// Only absolute `http` and `https` URLs are accepted.
pub fn parse_base_url(base_url: &str) -> ProtocolResult<Url> {
    let url = Url::parse(base_url).map_err(|e| ProtocolError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProtocolError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
