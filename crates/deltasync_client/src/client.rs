//! The sync client facade.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::fetch::ClientContext;
use crate::http::DefaultHttpService;
use crate::query::{InitQuery, SyncQuery};
use crate::transport::HttpService;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Client for the delivery sync API.
///
/// Cloning is cheap; clones share the configuration and HTTP service.
#[derive(Clone)]
pub struct SyncClient {
    context: Arc<ClientContext>,
}

impl SyncClient {
    /// Builds a client, validating the configuration.
    ///
    /// Without a custom service the client uses [`DefaultHttpService`] with
    /// the configured retry strategy and timeout.
    pub fn new(config: SyncConfig) -> SyncResult<Self> {
        config.validate()?;

        let service: Arc<dyn HttpService> = match config.http_service {
            Some(ref service) => service.clone(),
            None => Arc::new(DefaultHttpService::new(config.retry.clone(), config.timeout)),
        };

        debug!(
            environment_id = %config.environment_id,
            api_mode = %config.api_mode,
            custom_service = config.http_service.is_some(),
            "sync client created"
        );

        Ok(Self {
            context: Arc::new(ClientContext { config, service }),
        })
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.context.config
    }

    /// Query initializing a sync session.
    pub fn init(&self) -> InitQuery {
        InitQuery::new(self.context.clone())
    }

    /// Query fetching changes after `token`.
    pub fn sync(&self, token: impl Into<String>) -> SyncQuery {
        SyncQuery::new(self.context.clone(), token.into())
    }
}

impl fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncClient")
            .field("config", &self.context.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorReason;
    use crate::transport::{HttpResponse, MockHttpService};
    use serde_json::json;

    #[test]
    fn rejects_invalid_config() {
        let err = SyncClient::new(SyncConfig::public(" ")).unwrap_err();
        assert_eq!(err.reason(), ErrorReason::InvalidConfig);
    }

    #[test]
    fn query_urls() {
        let client = SyncClient::new(SyncConfig::public("env")).unwrap();
        assert_eq!(
            client.init().to_url(),
            "https://deliver.kontent.ai/v2/env/sync/init"
        );
        assert_eq!(client.sync("a").to_url(), "https://deliver.kontent.ai/v2/env/sync");

        let client = SyncClient::new(
            SyncConfig::preview("env", "key").with_base_url("http://localhost:8080/"),
        )
        .unwrap();
        assert_eq!(client.init().to_url(), "http://localhost:8080/env/sync/init");
    }

    #[test]
    fn clones_share_the_service() {
        let service = Arc::new(MockHttpService::new());
        service.push_response(
            HttpResponse::ok(json!({ "items": [], "types": [], "languages": [], "taxonomies": [] }))
                .with_continuation("x"),
        );
        service.push_response(
            HttpResponse::ok(json!({ "items": [], "types": [], "languages": [], "taxonomies": [] }))
                .with_continuation("y"),
        );

        let client =
            SyncClient::new(SyncConfig::public("env").with_shared_http_service(service.clone()))
                .unwrap();
        let other = client.clone();

        assert_eq!(client.init().execute().unwrap().continuation_token(), "x");
        assert_eq!(other.init().execute().unwrap().continuation_token(), "y");
        assert_eq!(service.request_count(), 2);
    }

    #[test]
    fn debug_does_not_leak_key() {
        let client = SyncClient::new(SyncConfig::secure("env", "secret-key")).unwrap();
        assert!(!format!("{:?}", client).contains("secret-key"));
    }
}
