//! Outbound HTTP for the crawler
//!
//! [`Transport`] is the seam: one GET, no retries, no policy. [`HttpTransport`] implements
//! it over `reqwest`; tests inject an in-memory fake. [`Fetcher`] layers the
//! resilience on top: URL guard, secure-first protocol fallback, per-attempt timeout racing
//! and retry with backoff.

mod http;
mod resilient;

pub use http::HttpTransport;
pub use resilient::{FetchOptions, Fetcher, downgrade, secure_form};

use crate::error::TransportError;
use async_trait::async_trait;
use url::Url;

/// `Accept` header sent for article pages
pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5";

/// `Accept` header sent for the feed document
pub const FEED_ACCEPT: &str =
    "application/rss+xml,application/atom+xml;q=0.9,application/xml;q=0.8,text/xml;q=0.8,*/*;q=0.5";

/// A single GET as handed to a [`Transport`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    /// Target, already cleared by the URL guard
    pub url: Url,
    /// `Referer` header value, if any
    pub referer: Option<String>,
    /// `User-Agent` header value
    pub user_agent: String,
    /// `Accept` header value
    pub accept: &'static str,
}

/// One-shot HTTP GET returning the response body as text
///
/// Implementations must map a non-success status to [`TransportError::Status`] and
/// TLS-class failures to [`TransportError::Tls`], since retry and protocol fallback
/// decisions are made from those variants.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request
    async fn get(&self, request: &FetchRequest) -> Result<String, TransportError>;
}
