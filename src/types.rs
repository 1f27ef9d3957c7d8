//! Core types for feed-harvest

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rendering of an article page, which decides the selector catalog used on it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageVariant {
    /// Desktop viewer markup
    Desktop,
    /// Mobile markup
    Mobile,
}

impl PageVariant {
    /// Classify a host: `m.` hosts serve the mobile rendering
    pub fn for_host(host: &str) -> Self {
        if host.starts_with("m.") {
            PageVariant::Mobile
        } else {
            PageVariant::Desktop
        }
    }
}

/// One address to try for a discovered post
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateUrl {
    /// URL to fetch
    pub url: String,
    /// Position in the priority list (0 = best)
    pub priority: usize,
    /// Rendering the URL is expected to serve
    pub variant: PageVariant,
}

/// Options accepted by the top-level [`crate::crawl`] entry point
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CrawlOptions {
    /// Per-selector diagnostics and raw-page capture (ignored in production)
    #[serde(default)]
    pub debug: bool,
}

/// Immutable input to a crawl
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    /// Feed document URL; must pass the feed allow-list
    pub feed_url: String,
    /// Requested number of posts, clamped to the configured limit
    pub max_posts: usize,
    /// Debug mode requested by the caller
    #[serde(default)]
    pub debug: bool,
}

impl CrawlRequest {
    /// Request `max_posts` posts from `feed_url`
    pub fn new(feed_url: impl Into<String>, max_posts: usize) -> Self {
        Self {
            feed_url: feed_url.into(),
            max_posts,
            debug: false,
        }
    }

    /// Toggle debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

/// Outcome of running the extraction engine over one page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Visible text of the winning container (or the whole document)
    pub text: String,
    /// Winning selector, or [`crate::extract::DOCUMENT_FALLBACK`]
    pub selector_used: String,
    /// Selector to matched-text length, only in debug mode
    pub diagnostics: Option<BTreeMap<String, usize>>,
}

/// Article text that survived cleaning and the length filter
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedPost {
    /// Article URL as discovered in the feed
    pub source_url: String,
    /// Selector that produced the text
    pub selector_used: String,
    /// Cleaned text
    pub text: String,
}

/// Output of a crawl
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    /// Corpus: each post capped, joined with the separator in discovery order
    pub merged_text: String,
    /// Each post capped to the sample length, shuffled
    pub samples: Vec<String>,
    /// Number of cleaned posts behind both outputs
    pub post_count: usize,
    /// Number of feed links attempted
    pub discovered: usize,
}
