//! Configuration for the sync client.

use crate::error::{SyncError, SyncResult};
use crate::transport::HttpService;
use deltasync_protocol::{parse_base_url, resolve_url, ApiMode, Header};
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a sync client.
#[derive(Clone)]
pub struct SyncConfig {
    /// Environment ID of the project.
    pub environment_id: String,
    /// Which delivery API to use.
    pub api_mode: ApiMode,
    /// Delivery API key (preview and secure modes).
    pub delivery_api_key: Option<String>,
    /// Base URL overriding the mode default.
    pub base_url: Option<String>,
    /// Whether response bodies are validated against the expected shape.
    pub response_validation: bool,
    /// Optional cap on pages fetched by one aggregated run.
    pub max_pages: Option<u32>,
    /// Retry configuration of the default HTTP service.
    pub retry: RetryConfig,
    /// Request timeout of the default HTTP service.
    pub timeout: Duration,
    /// Custom HTTP service; the default ureq service is used when unset.
    pub http_service: Option<Arc<dyn HttpService>>,
}

impl SyncConfig {
    fn new(environment_id: String, api_mode: ApiMode, delivery_api_key: Option<String>) -> Self {
        Self {
            environment_id,
            api_mode,
            delivery_api_key,
            base_url: None,
            response_validation: false,
            max_pages: None,
            retry: RetryConfig::default(),
            timeout: Duration::from_secs(30),
            http_service: None,
        }
    }

    /// Configuration for the public delivery API.
    pub fn public(environment_id: impl Into<String>) -> Self {
        Self::new(environment_id.into(), ApiMode::Public, None)
    }

    /// Configuration for the preview delivery API.
    pub fn preview(environment_id: impl Into<String>, delivery_api_key: impl Into<String>) -> Self {
        Self::new(
            environment_id.into(),
            ApiMode::Preview,
            Some(delivery_api_key.into()),
        )
    }

    /// Configuration for the secure delivery API.
    pub fn secure(environment_id: impl Into<String>, delivery_api_key: impl Into<String>) -> Self {
        Self::new(
            environment_id.into(),
            ApiMode::Secure,
            Some(delivery_api_key.into()),
        )
    }

    /// Overrides the base URL for every API mode.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Enables or disables response validation.
    pub fn with_response_validation(mut self, enable: bool) -> Self {
        self.response_validation = enable;
        self
    }

    /// Caps the number of pages a single aggregated run may fetch.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Uses a custom HTTP service instead of the default one.
    pub fn with_http_service(mut self, service: impl HttpService + 'static) -> Self {
        self.http_service = Some(Arc::new(service));
        self
    }

    /// Uses a shared HTTP service instead of the default one.
    pub fn with_shared_http_service(mut self, service: Arc<dyn HttpService>) -> Self {
        self.http_service = Some(service);
        self
    }

    /// Checks that the configuration can be used to build a client.
    pub fn validate(&self) -> SyncResult<()> {
        if self.environment_id.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "environment id must not be empty".into(),
            ));
        }

        if self.api_mode.requires_api_key()
            && self
                .delivery_api_key
                .as_deref()
                .map_or(true, |key| key.trim().is_empty())
        {
            return Err(SyncError::InvalidConfig(format!(
                "{} mode requires a delivery api key",
                self.api_mode
            )));
        }

        if let Some(ref base_url) = self.base_url {
            parse_base_url(base_url).map_err(|e| SyncError::InvalidConfig(e.to_string()))?;
        }

        self.retry.validate()?;

        if self.max_pages == Some(0) {
            return Err(SyncError::InvalidConfig(
                "max pages must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    /// Resolves the URL of an endpoint path for this configuration.
    pub fn endpoint_url(&self, path: &str) -> String {
        resolve_url(
            &self.environment_id,
            self.api_mode,
            path,
            self.base_url.as_deref(),
        )
    }

    /// Returns the `Authorization` header to send, if the mode needs one.
    pub fn auth_header(&self) -> Option<Header> {
        if !self.api_mode.requires_api_key() {
            return None;
        }
        self.delivery_api_key.as_deref().map(Header::bearer)
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("environment_id", &self.environment_id)
            .field("api_mode", &self.api_mode)
            .field(
                "delivery_api_key",
                &self.delivery_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("base_url", &self.base_url)
            .field("response_validation", &self.response_validation)
            .field("max_pages", &self.max_pages)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .field("http_service", &self.http_service.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

/// What caused a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCause {
    /// The server answered with this non-success status.
    Status(u16),
    /// The exchange could not be completed.
    Network,
}

/// Default retry predicate: network failures, 408, 429 and 5xx.
pub fn default_should_retry(cause: RetryCause) -> bool {
    match cause {
        RetryCause::Network => true,
        RetryCause::Status(status) => status == 408 || status == 429 || status >= 500,
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
    /// Decides whether a failed attempt is retried.
    pub should_retry: fn(RetryCause) -> bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
            should_retry: default_should_retry,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
            should_retry: default_should_retry,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Sets the retry predicate.
    pub fn with_retry_predicate(mut self, predicate: fn(RetryCause) -> bool) -> Self {
        self.should_retry = predicate;
        self
    }

    /// Calculates the delay before a given retry (1-indexed; 0 means the
    /// first attempt, which never waits).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self
                .backoff_multiplier
                .powi(attempt.saturating_sub(1).min(i32::MAX as u32) as i32);

        // NaN and negative products wait nothing
        let delay_secs = if base_delay.is_nan() {
            0.0
        } else {
            base_delay.clamp(0.0, self.max_delay.as_secs_f64())
        };

        let delay_secs = if self.add_jitter {
            // Up to 25% jitter
            delay_secs + delay_secs * 0.25 * rand::thread_rng().gen_range(0.0..1.0)
        } else {
            delay_secs
        };

        Duration::try_from_secs_f64(delay_secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay.saturating_add(self.max_delay / 4))
    }

    /// Checks that delays can be computed from this configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 0.0 {
            return Err(SyncError::InvalidConfig(format!(
                "backoff multiplier must be a finite non-negative number, got {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_delay > self.max_delay && self.max_retries > 0 {
            return Err(SyncError::InvalidConfig(
                "initial retry delay must not exceed the maximum delay".into(),
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::preview("env-1", "key")
            .with_base_url("https://custom.com")
            .with_response_validation(true)
            .with_max_pages(50)
            .with_timeout(Duration::from_secs(60));

        assert_eq!(config.environment_id, "env-1");
        assert_eq!(config.api_mode, ApiMode::Preview);
        assert!(config.response_validation);
        assert_eq!(config.max_pages, Some(50));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_configs() {
        assert!(SyncConfig::public("").validate().is_err());
        assert!(SyncConfig::secure("env", " ").validate().is_err());
        assert!(SyncConfig::public("env")
            .with_base_url("ftp://custom.com")
            .validate()
            .is_err());
        assert!(SyncConfig::public("env").with_max_pages(0).validate().is_err());
    }

    #[test]
    fn endpoint_and_auth() {
        let config = SyncConfig::public("x");
        assert_eq!(
            config.endpoint_url("/sync/init"),
            "https://deliver.kontent.ai/v2/x/sync/init"
        );
        assert!(config.auth_header().is_none());

        let config = SyncConfig::secure("x", "key");
        assert_eq!(config.auth_header().unwrap().value, "Bearer key");
    }

    #[test]
    fn debug_redacts_key() {
        let config = SyncConfig::preview("x", "super-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn retry_config_no_retry() {
        let config = RetryConfig::no_retry();
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn retry_delay_calculation() {
        let config = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);

        // Jitter makes exact values unpredictable, so check bounds
        let delay1 = config.delay_for_attempt(1);
        assert!(delay1 >= Duration::from_millis(100));
        assert!(delay1 <= Duration::from_millis(150));

        let delay2 = config.delay_for_attempt(2);
        assert!(delay2 >= Duration::from_millis(200));
    }

    #[test]
    fn retry_delay_respects_max() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0)
            .with_jitter(false);

        assert_eq!(config.delay_for_attempt(5), Duration::from_secs(5));
    }

    #[test]
    fn retry_delay_never_panics_on_extreme_settings() {
        let negative = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(-2.0)
            .with_jitter(false);
        assert_eq!(negative.delay_for_attempt(2), Duration::ZERO);

        let huge = RetryConfig::new(5)
            .with_initial_delay(Duration::from_secs(u64::MAX / 2))
            .with_max_delay(Duration::MAX)
            .with_backoff_multiplier(10.0);
        assert!(huge.delay_for_attempt(3) <= Duration::MAX);

        let nan = RetryConfig::new(5).with_backoff_multiplier(f64::NAN);
        assert_eq!(nan.delay_for_attempt(2), Duration::ZERO);

        let jittered = RetryConfig::new(5)
            .with_initial_delay(Duration::from_secs(10))
            .with_max_delay(Duration::from_secs(1));
        assert!(jittered.delay_for_attempt(1) <= Duration::from_millis(1250));
    }

    #[test]
    fn validation_rejects_bad_retry_settings() {
        let config = SyncConfig::public("env")
            .with_retry(RetryConfig::new(3).with_backoff_multiplier(-1.0));
        assert!(config.validate().is_err());

        let config = SyncConfig::public("env")
            .with_retry(RetryConfig::new(3).with_backoff_multiplier(f64::INFINITY));
        assert!(config.validate().is_err());

        let config = SyncConfig::public("env").with_retry(
            RetryConfig::new(3)
                .with_initial_delay(Duration::from_secs(60))
                .with_max_delay(Duration::from_secs(1)),
        );
        assert!(config.validate().is_err());

        assert!(SyncConfig::public("env")
            .with_retry(RetryConfig::no_retry())
            .validate()
            .is_ok());
    }

    #[test]
    fn default_predicate() {
        assert!(default_should_retry(RetryCause::Network));
        assert!(default_should_retry(RetryCause::Status(429)));
        assert!(default_should_retry(RetryCause::Status(503)));
        assert!(!default_should_retry(RetryCause::Status(404)));
    }
}
