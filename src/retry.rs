//! Retry logic with exponential backoff
//!
//! This module provides the retry and timeout primitives every outbound fetch is wrapped in.
//! Delays grow exponentially, are capped at `max_delay`, and carry up to 10% random jitter
//! so many crawlers never retry against the same host in lockstep.
//!
//! # Example
//!
//! ```no_run
//! use feed_harvest::config::RetryConfig;
//! use feed_harvest::error::TransportError;
//! use feed_harvest::retry::{RetryPolicy, with_retry, with_timeout};
//! use std::time::Duration;
//!
//! # async fn fetch_feed() -> Result<String, TransportError> { Ok(String::new()) }
//! # async fn example() -> Result<(), TransportError> {
//! let policy = RetryPolicy::from(&RetryConfig::feed_default());
//! let budget = Duration::from_secs(10);
//! let body = with_retry(&policy, || {
//!     with_timeout(budget, fetch_feed(), || TransportError::Timeout {
//!         url: "https://rss.blog.naver.com/someblog.xml".into(),
//!         after: budget,
//!     })
//! })
//! .await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::TransportError;
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound of the jitter added to a delay, as a fraction of that delay
pub const JITTER_FRACTION: f64 = 0.1;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, refused connections, 429, 5xx) should return `true`.
/// Permanent failures (other 4xx, blocked targets, malformed URLs) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for TransportError {
    fn is_retryable(&self) -> bool {
        match self {
            // Transport-level transients
            TransportError::Timeout { .. }
            | TransportError::Connect { .. }
            | TransportError::Dns { .. } => true,
            // Rate limiting and server-side failures
            TransportError::Status { status, .. } => *status == 429 || (500..=599).contains(status),
            // SSRF refusals are terminal by definition
            TransportError::Unsafe(_) => false,
            // Both schemes already tried
            TransportError::ProtocolFallbackExhausted { .. } => false,
            TransportError::Tls { .. }
            | TransportError::Body { .. }
            | TransportError::Request { .. }
            | TransportError::InvalidUrl(_)
            | TransportError::Cancelled => false,
        }
    }
}

/// Observer invoked before each retry delay with the failed attempt number and its error
pub type RetryObserver = Arc<dyn Fn(u32, &(dyn std::error::Error + 'static)) + Send + Sync>;

/// Custom classification replacing [`IsRetryable`] for one policy
pub type RetryPredicate = Arc<dyn Fn(&(dyn std::error::Error + 'static)) -> bool + Send + Sync>;

/// Runtime retry policy, built from a [`RetryConfig`] per call site
#[derive(Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Cap on the non-jittered delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
    /// Whether to add up to [`JITTER_FRACTION`] random jitter
    pub jitter: bool,
    retryable: Option<RetryPredicate>,
    observer: Option<RetryObserver>,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("jitter", &self.jitter)
            .field("custom_predicate", &self.retryable.is_some())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: config.initial_delay,
            max_delay: config.max_delay,
            backoff_multiplier: config.backoff_multiplier,
            jitter: config.jitter,
            retryable: None,
            observer: None,
        }
    }
}

impl RetryPolicy {
    /// Replace the default [`IsRetryable`] classification
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&(dyn std::error::Error + 'static)) -> bool + Send + Sync + 'static,
    {
        self.retryable = Some(Arc::new(predicate));
        self
    }

    /// Attach an observer; its return value is ignored and it cannot alter control flow
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: Fn(u32, &(dyn std::error::Error + 'static)) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Non-jittered delay after failed attempt `attempt` (1-based)
    ///
    /// `min(initial_delay * multiplier^(attempt-1), max_delay)`
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// Delay actually slept after failed attempt `attempt`, computed fresh each call
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter { add_jitter(base) } else { base }
    }

    fn is_retryable<E>(&self, error: &E) -> bool
    where
        E: IsRetryable + std::error::Error + 'static,
    {
        match &self.retryable {
            Some(predicate) => predicate(error),
            None => error.is_retryable(),
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// The operation is invoked at most `policy.max_attempts` times (at least once). A
/// non-retryable error is returned immediately; once attempts run out the last error is
/// returned unchanged.
///
/// # Example
///
/// ```no_run
/// use feed_harvest::retry::{RetryPolicy, with_retry};
/// use feed_harvest::config::RetryConfig;
/// use feed_harvest::error::TransportError;
///
/// # async fn example() -> Result<(), TransportError> {
/// let policy = RetryPolicy::from(&RetryConfig::default())
///     .with_observer(|attempt, err| eprintln!("attempt {attempt} failed: {err}"));
/// let body = with_retry(&policy, || async {
///     Ok::<String, TransportError>("<rss/>".to_string())
/// }).await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::error::Error + 'static,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if policy.is_retryable(&e) && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                if let Some(observer) = &policy.observer {
                    observer(attempt, &e);
                }

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if policy.is_retryable(&e) {
                    tracing::debug!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Race `future` against a timer; the timer winning yields `on_timeout()`
///
/// The losing future is dropped, so its result is discarded.
pub async fn with_timeout<Fut, T, E>(
    duration: Duration,
    future: Fut,
    on_timeout: impl FnOnce() -> E,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_elapsed) => Err(on_timeout()),
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and [`JITTER_FRACTION`] of the delay.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=JITTER_FRACTION);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
