//! Error types for feed-harvest
//!
//! Errors are split by layer:
//! - [`Error`] is what a caller of [`crate::Crawler::crawl`] sees. Only a handful of
//!   conditions ever reach it; per-post failures are absorbed by the pipeline.
//! - [`TransportError`] describes a single fetch (feed document or candidate page) and
//!   carries the retryable/terminal classification used by [`crate::retry`].
//! - [`SecurityError`] is raised by the URL guard before any request leaves the process.
//! - [`FeedError`] is raised when a feed body is neither RSS nor Atom.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for feed-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type returned by a crawl
#[derive(Debug, Error)]
pub enum Error {
    /// The feed URL or a request target failed the SSRF/policy check
    #[error("unsafe target: {0}")]
    UnsafeTarget(#[from] SecurityError),

    /// The feed document could not be fetched after all retry attempts
    #[error("crawling failed for {feed_url}: {source}")]
    CrawlingFailed {
        /// Feed URL that could not be fetched
        feed_url: String,
        /// Last transport failure
        #[source]
        source: TransportError,
    },

    /// The feed was fetched but yielded no article links
    #[error("feed {feed_url} is empty or unreadable: {reason}")]
    EmptyFeed {
        /// Feed URL that yielded nothing
        feed_url: String,
        /// Why no links were found (parse failure or zero entries)
        reason: String,
    },

    /// Every discovered post failed extraction or was too short to keep
    #[error("no extractable posts among {attempted} discovered")]
    NoExtractablePosts {
        /// Number of post links that were attempted
        attempted: usize,
    },

    /// The crawl request itself is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "fetch.page_retry.max_attempts")
        key: Option<String>,
    },

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// The caller cancelled the crawl
    #[error("crawl cancelled")]
    Cancelled,
}

impl Error {
    /// Stable machine-readable code for this error
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnsafeTarget(_) => "unsafe_target",
            Error::CrawlingFailed { .. } => "crawling_failed",
            Error::EmptyFeed { .. } => "empty_feed",
            Error::NoExtractablePosts { .. } => "no_extractable_posts",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Config { .. } => "config",
            Error::HttpClient(_) => "http_client",
            Error::Cancelled => "cancelled",
        }
    }

    /// Sentence suitable for showing to the person who submitted the feed URL
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::UnsafeTarget(_) | Error::InvalidRequest(_) => {
                "This address cannot be crawled. Please submit a public blog feed URL."
            }
            Error::CrawlingFailed { .. } => {
                "The blog could not be reached right now. Please try again later."
            }
            Error::EmptyFeed { .. } => {
                "The feed is unreadable, empty, or not public."
            }
            Error::NoExtractablePosts { .. } => {
                "The posts could not be read. The blog may be private."
            }
            Error::Config { .. } | Error::HttpClient(_) => {
                "The crawler is misconfigured."
            }
            Error::Cancelled => "The crawl was cancelled.",
        }
    }
}

/// Failure of a single outbound fetch
#[derive(Debug, Error)]
pub enum TransportError {
    /// The target failed the URL guard
    #[error("blocked: {0}")]
    Unsafe(#[from] SecurityError),

    /// The attempt did not finish within its time budget
    #[error("timed out after {}ms: {url}", after.as_millis())]
    Timeout {
        /// Requested URL
        url: String,
        /// Time budget that elapsed
        after: Duration,
    },

    /// TCP connection could not be established (refused, reset, unreachable)
    #[error("connection failed for {url}: {message}")]
    Connect {
        /// Requested URL
        url: String,
        /// Underlying error text
        message: String,
    },

    /// Hostname could not be resolved
    #[error("DNS lookup failed for {url}: {message}")]
    Dns {
        /// Requested URL
        url: String,
        /// Underlying error text
        message: String,
    },

    /// TLS handshake, certificate expiry or verification failure
    #[error("TLS failure for {url}: {message}")]
    Tls {
        /// Requested URL
        url: String,
        /// Underlying error text
        message: String,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Response body could not be read or decoded
    #[error("failed to read body of {url}: {message}")]
    Body {
        /// Requested URL
        url: String,
        /// Underlying error text
        message: String,
    },

    /// Any other request failure (builder error, redirect refused, ...)
    #[error("request to {url} failed: {message}")]
    Request {
        /// Requested URL
        url: String,
        /// Underlying error text
        message: String,
    },

    /// URL could not be parsed or rewritten
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Both the secure attempt and the downgraded attempt failed
    #[error("secure attempt failed ({secure}); insecure fallback failed ({insecure})")]
    ProtocolFallbackExhausted {
        /// Failure of the https attempt
        secure: Box<TransportError>,
        /// Failure of the http attempt
        insecure: Box<TransportError>,
    },

    /// Cancelled by the caller while in flight
    #[error("fetch cancelled")]
    Cancelled,
}

impl TransportError {
    /// True for TLS-class failures that justify a downgrade to the insecure scheme
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, TransportError::Tls { .. })
    }

    /// True when the URL guard refused the target
    pub fn is_unsafe_target(&self) -> bool {
        match self {
            TransportError::Unsafe(_) => true,
            TransportError::ProtocolFallbackExhausted { secure, insecure } => {
                secure.is_unsafe_target() || insecure.is_unsafe_target()
            }
            _ => false,
        }
    }

    /// Move the guard failure out, if this error is one
    pub fn into_security_error(self) -> Option<SecurityError> {
        match self {
            TransportError::Unsafe(e) => Some(e),
            TransportError::ProtocolFallbackExhausted { secure, insecure } => secure
                .into_security_error()
                .or_else(|| insecure.into_security_error()),
            _ => None,
        }
    }
}

/// URL guard failures (SSRF and feed policy)
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// Host is blocked by name (e.g., localhost)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// Host is, or resolved to, an address in a blocked range
    #[error("blocked address {address} for host {host}")]
    BlockedAddress {
        /// Host as written in the URL
        host: String,
        /// Offending address
        address: std::net::IpAddr,
    },

    /// Feed host is not on the allow-list
    #[error("feed host not allowed: {0}")]
    FeedHostNotAllowed(String),

    /// Feed path does not carry the required suffix
    #[error("feed path must end with {required}: {path}")]
    FeedPathNotAllowed {
        /// Path as written in the URL
        path: String,
        /// Required suffix
        required: String,
    },

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Feed document could not be parsed
#[derive(Debug, Error)]
#[error("failed to parse feed as RSS ({rss}) or Atom ({atom})")]
pub struct FeedError {
    /// RSS parser message
    pub rss: String,
    /// Atom parser message
    pub atom: String,
}
