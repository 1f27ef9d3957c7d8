//! # feed-harvest
//!
//! Blog feed crawler that turns a syndication feed into article text for style analysis.
//!
//! Given a feed URL, the crawler fetches the feed, discovers article links, fetches each
//! article through a resilient transport, extracts the readable body and produces two
//! outputs: a few length-capped writing samples and a merged, length-capped corpus.
//!
//! ## Design Philosophy
//!
//! - **Hostile network by default** - every request is SSRF-checked after DNS resolution,
//!   retried with backoff and jitter, raced against a timeout, and downgraded from https
//!   to http only on TLS-class failures
//! - **Partial results are success** - one broken post never fails the crawl
//! - **Caller-owned state** - no global clients; build a [`Crawler`] and pass it around
//! - **Library-first** - no subscriber, no storage; callers persist [`CrawlResult`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use feed_harvest::{CrawlConfig, CrawlRequest, Crawler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let crawler = Crawler::new(CrawlConfig::default())?;
//!
//!     let request = CrawlRequest::new("https://rss.blog.naver.com/someblog.xml", 10);
//!     let result = crawler.crawl(&request).await?;
//!
//!     println!("{} posts, {} samples", result.post_count, result.samples.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Debug-mode raw page capture
pub mod capture;
/// Candidate-URL expansion for discovered posts
pub mod candidates;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Article body extraction
pub mod extract;
/// Feed parsing
pub mod feed;
/// Crawl orchestration
pub mod pipeline;
/// Retry logic with exponential backoff
pub mod retry;
/// Samples and merged corpus
pub mod shaping;
/// Outbound HTTP
pub mod transport;
/// Core types
pub mod types;
/// SSRF guard and feed URL policy
pub mod url_guard;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{CrawlConfig, Environment};
pub use error::{Error, Result, SecurityError, TransportError};
pub use pipeline::Crawler;
pub use types::{CleanedPost, CrawlOptions, CrawlRequest, CrawlResult};

/// Crawl `feed_url` with the default configuration
///
/// Convenience wrapper building a one-off [`Crawler`]; hold on to a `Crawler` instead
/// when crawling repeatedly, to reuse its connection pool.
///
/// # Example
///
/// ```no_run
/// use feed_harvest::{CrawlOptions, crawl};
///
/// # async fn example() -> feed_harvest::Result<()> {
/// let result = crawl(
///     "https://rss.blog.naver.com/someblog.xml",
///     5,
///     CrawlOptions { debug: false },
/// )
/// .await?;
/// for sample in &result.samples {
///     println!("{sample}");
/// }
/// # Ok(())
/// # }
/// ```
pub async fn crawl(feed_url: &str, max_posts: usize, options: CrawlOptions) -> Result<CrawlResult> {
    let crawler = Crawler::new(CrawlConfig::default())?;
    let request = CrawlRequest::new(feed_url, max_posts).with_debug(options.debug);
    crawler.crawl(&request).await
}
