//! Test configuration and crawler builders

use super::doubles::{MockTransport, PublicResolver};
use feed_harvest::config::RetryConfig;
use feed_harvest::url_guard::UrlGuard;
use feed_harvest::{CrawlConfig, Crawler, Environment};
use std::sync::Arc;
use std::time::Duration;

/// Retry budget with millisecond delays
pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
        jitter: true,
    }
}

/// Default configuration with fast retries, no pacing and no capture
pub fn test_config() -> CrawlConfig {
    let mut config = CrawlConfig {
        environment: Environment::Development,
        ..CrawlConfig::default()
    };
    config.fetch.feed_retry = fast_retry(2);
    config.fetch.page_retry = fast_retry(3);
    config.fetch.feed_timeout = Duration::from_secs(2);
    config.fetch.page_timeout = Duration::from_millis(150);
    config.fetch.min_request_gap = Duration::ZERO;
    config.fetch.max_request_gap = Duration::ZERO;
    config.debug.capture_pages = false;
    config
}

/// Crawler over `transport`, resolving every host to a public address
pub fn mock_crawler(transport: &Arc<MockTransport>, config: CrawlConfig) -> Crawler {
    let guard = UrlGuard::new().with_resolver(Arc::new(PublicResolver));
    Crawler::with_transport(config, transport.clone(), guard)
        .unwrap_or_else(|e| panic!("test crawler must build: {e}"))
}
