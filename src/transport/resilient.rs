//! Resilient fetch: guard, secure-first fallback, timeout racing and retry.

use super::{FetchRequest, Transport};
use crate::error::TransportError;
use crate::retry::{RetryPolicy, with_retry, with_timeout};
use crate::url_guard::UrlGuard;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Per-call-site fetch settings (the feed and article pages use different ones)
#[derive(Clone, Debug)]
pub struct FetchOptions {
    /// Retry policy wrapped around each attempt
    pub retry: RetryPolicy,
    /// Time budget for one attempt, including a protocol downgrade
    pub timeout: Duration,
    /// `Accept` header
    pub accept: &'static str,
}

/// The crawler's single outbound-fetch primitive
///
/// Owned by the caller and passed into the pipeline; nothing here is global.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    guard: UrlGuard,
    user_agents: Vec<String>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("guard", &self.guard)
            .field("user_agents", &self.user_agents.len())
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Create a fetcher over `transport`, gating every request through `guard`
    pub fn new(transport: Arc<dyn Transport>, guard: UrlGuard, user_agents: Vec<String>) -> Self {
        Self {
            transport,
            guard,
            user_agents,
        }
    }

    /// Fetch `url` with retries; each attempt is raced against `options.timeout`
    pub async fn fetch(
        &self,
        url: &str,
        referer: Option<&str>,
        options: &FetchOptions,
    ) -> Result<String, TransportError> {
        with_retry(&options.retry, || self.fetch_once(url, referer, options)).await
    }

    async fn fetch_once(
        &self,
        url: &str,
        referer: Option<&str>,
        options: &FetchOptions,
    ) -> Result<String, TransportError> {
        with_timeout(
            options.timeout,
            self.fetch_with_fallback(url, referer, options.accept),
            || TransportError::Timeout {
                url: url.to_string(),
                after: options.timeout,
            },
        )
        .await
    }

    /// Secure scheme first; on a TLS-class failure retry once over the insecure scheme
    async fn fetch_with_fallback(
        &self,
        url: &str,
        referer: Option<&str>,
        accept: &'static str,
    ) -> Result<String, TransportError> {
        let secure = secure_form(url)?;

        let secure_err = match self.attempt(secure.as_str(), referer, accept).await {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };

        if !secure_err.is_protocol_error() {
            return Err(secure_err);
        }
        let Some(insecure) = downgrade(&secure) else {
            return Err(secure_err);
        };

        warn!(
            url = %secure,
            error = %secure_err,
            "TLS failure, retrying over plain HTTP"
        );

        match self.attempt(insecure.as_str(), referer, accept).await {
            Ok(body) => Ok(body),
            Err(insecure_err) => Err(TransportError::ProtocolFallbackExhausted {
                secure: Box::new(secure_err),
                insecure: Box::new(insecure_err),
            }),
        }
    }

    async fn attempt(
        &self,
        url: &str,
        referer: Option<&str>,
        accept: &'static str,
    ) -> Result<String, TransportError> {
        let url = self.guard.assert_fetchable(url).await?;
        let request = FetchRequest {
            url,
            referer: referer.map(str::to_string),
            user_agent: self.pick_user_agent(),
            accept,
        };
        debug!(url = %request.url, "Fetching");
        self.transport.get(&request).await
    }

    fn pick_user_agent(&self) -> String {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| "Mozilla/5.0".to_string())
    }
}

/// The https form of `url` (http is upgraded, https is unchanged)
pub fn secure_form(url: &str) -> Result<Url, TransportError> {
    let mut parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))?;
    if parsed.scheme() == "http" && parsed.set_scheme("https").is_err() {
        return Err(TransportError::InvalidUrl(format!("{url}: cannot switch to https")));
    }
    Ok(parsed)
}

/// The http form of an https URL (`None` for anything else)
///
/// An explicit port is kept as is.
pub fn downgrade(url: &Url) -> Option<Url> {
    if url.scheme() != "https" {
        return None;
    }
    let mut insecure = url.clone();
    insecure.set_scheme("http").ok()?;
    Some(insecure)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::retry::IsRetryable;
    use crate::test_helpers::{MockResponse, MockTransport, StaticResolver};
    use crate::transport::HTML_ACCEPT;

    fn options(max_attempts: u32, timeout: Duration) -> FetchOptions {
        FetchOptions {
            retry: RetryPolicy::from(&RetryConfig {
                max_attempts,
                initial_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
                backoff_multiplier: 2.0,
                jitter: false,
            }),
            timeout,
            accept: HTML_ACCEPT,
        }
    }

    fn fetcher(transport: Arc<MockTransport>) -> Fetcher {
        let guard = UrlGuard::new().with_resolver(Arc::new(StaticResolver::public()));
        Fetcher::new(transport, guard, vec!["UA-1".into(), "UA-2".into()])
    }

    #[test]
    fn secure_form_upgrades_http() {
        assert_eq!(
            secure_form("http://blog.naver.com/a/1?x=1").unwrap().as_str(),
            "https://blog.naver.com/a/1?x=1"
        );
        assert_eq!(
            secure_form("https://blog.naver.com/a/1").unwrap().as_str(),
            "https://blog.naver.com/a/1"
        );
        assert!(secure_form("nope").is_err());
    }

    #[test]
    fn downgrade_rules() {
        let plain = Url::parse("https://blog.naver.com/a/1").unwrap();
        assert_eq!(downgrade(&plain).unwrap().as_str(), "http://blog.naver.com/a/1");

        let default_port = Url::parse("https://blog.naver.com:443/a").unwrap();
        assert_eq!(downgrade(&default_port).unwrap().as_str(), "http://blog.naver.com/a");

        let custom_port = Url::parse("https://127.0.0.1:8443/a").unwrap();
        assert_eq!(downgrade(&custom_port).unwrap().as_str(), "http://127.0.0.1:8443/a");

        let already_plain = Url::parse("http://blog.naver.com/a").unwrap();
        assert!(downgrade(&already_plain).is_none());
    }

    #[tokio::test]
    async fn plain_http_input_is_tried_over_https_first() {
        let transport = Arc::new(
            MockTransport::new().route("https://blog.naver.com/a/1", MockResponse::body("secure")),
        );
        let body = fetcher(transport.clone())
            .fetch("http://blog.naver.com/a/1", None, &options(1, Duration::from_secs(1)))
            .await
            .unwrap();

        assert_eq!(body, "secure");
        assert_eq!(transport.requested_urls(), vec!["https://blog.naver.com/a/1"]);
    }

    #[tokio::test]
    async fn tls_failure_downgrades_once() {
        let transport = Arc::new(
            MockTransport::new()
                .route("https://blog.naver.com/a/1", MockResponse::Tls)
                .route("http://blog.naver.com/a/1", MockResponse::body("plain")),
        );
        let body = fetcher(transport.clone())
            .fetch("https://blog.naver.com/a/1", Some("https://blog.naver.com/a/1"), &options(3, Duration::from_secs(1)))
            .await
            .unwrap();

        assert_eq!(body, "plain");
        assert_eq!(
            transport.requested_urls(),
            vec!["https://blog.naver.com/a/1", "http://blog.naver.com/a/1"]
        );
        let requests = transport.requests();
        assert_eq!(requests[1].referer.as_deref(), Some("https://blog.naver.com/a/1"));
        assert!(["UA-1", "UA-2"].contains(&requests[1].user_agent.as_str()));
    }

    #[tokio::test]
    async fn both_schemes_failing_yields_aggregate_error_without_retry() {
        let transport = Arc::new(
            MockTransport::new()
                .route("https://blog.naver.com/a/1", MockResponse::Tls)
                .route("http://blog.naver.com/a/1", MockResponse::Status(503)),
        );
        let err = fetcher(transport.clone())
            .fetch("https://blog.naver.com/a/1", None, &options(3, Duration::from_secs(1)))
            .await
            .unwrap_err();

        match &err {
            TransportError::ProtocolFallbackExhausted { secure, insecure } => {
                assert!(matches!(**secure, TransportError::Tls { .. }));
                assert!(matches!(**insecure, TransportError::Status { status: 503, .. }));
            }
            other => panic!("expected aggregate error, got {other:?}"),
        }
        assert!(!err.is_retryable());
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn non_protocol_errors_are_not_downgraded_but_are_retried() {
        let transport = Arc::new(
            MockTransport::new().route("https://blog.naver.com/a/1", MockResponse::Status(500)),
        );
        let err = fetcher(transport.clone())
            .fetch("https://blog.naver.com/a/1", None, &options(3, Duration::from_secs(1)))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Status { status: 500, .. }));
        assert_eq!(
            transport.requested_urls(),
            vec![
                "https://blog.naver.com/a/1",
                "https://blog.naver.com/a/1",
                "https://blog.naver.com/a/1"
            ]
        );
    }

    #[tokio::test]
    async fn slow_attempts_time_out_and_are_retried() {
        let transport = Arc::new(MockTransport::new().route(
            "https://blog.naver.com/a/1",
            MockResponse::Hang(Duration::from_secs(5)),
        ));
        let err = fetcher(transport.clone())
            .fetch("https://blog.naver.com/a/1", None, &options(2, Duration::from_millis(30)))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Timeout { .. }));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn blocked_target_never_reaches_transport() {
        let transport = Arc::new(MockTransport::new());
        let err = fetcher(transport.clone())
            .fetch("http://192.168.0.10/admin", None, &options(3, Duration::from_secs(1)))
            .await
            .unwrap_err();

        assert!(err.is_unsafe_target());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn rebinding_to_private_address_is_blocked_at_fetch_time() {
        let transport = Arc::new(MockTransport::new());
        let resolver = StaticResolver::public().with_host("blog.naver.com", "10.0.0.7".parse().unwrap());
        let guard = UrlGuard::new().with_resolver(Arc::new(resolver));
        let fetcher = Fetcher::new(transport.clone(), guard, vec!["UA".into()]);

        let err = fetcher
            .fetch("https://blog.naver.com/a/1", None, &options(3, Duration::from_secs(1)))
            .await
            .unwrap_err();

        assert!(err.is_unsafe_target());
        assert_eq!(transport.request_count(), 0);
    }
}
