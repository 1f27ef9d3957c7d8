//! Configuration types for feed-harvest

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Root crawler configuration
///
/// Every field has a sensible default, so `CrawlConfig::default()` crawls the supported
/// blog platform out of the box.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Entry-point policy for feed URLs
    #[serde(default)]
    pub feed: FeedPolicy,

    /// Outbound request behavior (retries, timeouts, pacing, headers)
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Content thresholds for extraction and cleaning
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Output caps and separators
    #[serde(default)]
    pub shaping: ShapingConfig,

    /// Debug-mode diagnostics
    #[serde(default)]
    pub debug: DebugConfig,

    /// Deployment environment (default: detected from `APP_ENV`)
    #[serde(default = "Environment::detect")]
    pub environment: Environment,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            feed: FeedPolicy::default(),
            fetch: FetchConfig::default(),
            extraction: ExtractionConfig::default(),
            shaping: ShapingConfig::default(),
            debug: DebugConfig::default(),
            environment: Environment::detect(),
        }
    }
}

impl CrawlConfig {
    /// Check the configuration for values that would make the crawler misbehave
    pub fn validate(&self) -> Result<()> {
        if self.feed.allowed_hosts.is_empty() {
            return Err(config_error("at least one feed host must be allowed", "feed.allowed_hosts"));
        }
        if self.feed.max_posts_limit == 0 {
            return Err(config_error("must be greater than zero", "feed.max_posts_limit"));
        }
        self.fetch.feed_retry.validate("fetch.feed_retry")?;
        self.fetch.page_retry.validate("fetch.page_retry")?;
        if self.fetch.feed_timeout.is_zero() {
            return Err(config_error("must be greater than zero", "fetch.feed_timeout"));
        }
        if self.fetch.page_timeout.is_zero() {
            return Err(config_error("must be greater than zero", "fetch.page_timeout"));
        }
        if self.fetch.min_request_gap > self.fetch.max_request_gap {
            return Err(config_error(
                "min_request_gap must not exceed max_request_gap",
                "fetch.min_request_gap",
            ));
        }
        if self.fetch.user_agents.is_empty() {
            return Err(config_error("user agent pool must not be empty", "fetch.user_agents"));
        }
        if self.extraction.min_post_chars < self.extraction.min_extracted_chars {
            return Err(config_error(
                "min_post_chars must be at least min_extracted_chars",
                "extraction.min_post_chars",
            ));
        }
        if self.shaping.sample_max_chars == 0 {
            return Err(config_error("must be greater than zero", "shaping.sample_max_chars"));
        }
        if self.shaping.corpus_item_max_chars == 0 {
            return Err(config_error("must be greater than zero", "shaping.corpus_item_max_chars"));
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

/// Which feeds may be submitted at all
///
/// This is a policy gate on the entry URL only. The network-level SSRF check in
/// [`crate::url_guard`] applies to every request regardless of this policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedPolicy {
    /// Hosts a feed URL may point at (default: `rss.blog.naver.com`)
    #[serde(default = "default_feed_hosts")]
    pub allowed_hosts: Vec<String>,

    /// Suffix the feed URL path must end with (default: `.xml`)
    #[serde(default = "default_feed_suffix")]
    pub required_suffix: String,

    /// Upper bound applied to a request's `max_posts` (default: 50)
    #[serde(default = "default_max_posts_limit")]
    pub max_posts_limit: usize,
}

impl Default for FeedPolicy {
    fn default() -> Self {
        Self {
            allowed_hosts: default_feed_hosts(),
            required_suffix: default_feed_suffix(),
            max_posts_limit: default_max_posts_limit(),
        }
    }
}

/// Retry configuration for transient failures
///
/// `max_attempts` counts every invocation, including the first one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt (default: 500ms)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between attempts (default: 8 seconds)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add up to 10% random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Shorter budget used for the feed document
    pub fn feed_default() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(2),
            ..Self::default()
        }
    }

    fn validate(&self, key: &str) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(config_error(
                "max_attempts must be at least 1",
                &format!("{key}.max_attempts"),
            ));
        }
        if !(self.backoff_multiplier >= 1.0 && self.backoff_multiplier.is_finite()) {
            return Err(config_error(
                "backoff_multiplier must be a finite value >= 1.0",
                &format!("{key}.backoff_multiplier"),
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(config_error(
                "initial_delay must not exceed max_delay",
                &format!("{key}.initial_delay"),
            ));
        }
        Ok(())
    }
}

/// Outbound request configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Retry policy for the feed document (default: 2 attempts)
    #[serde(default = "RetryConfig::feed_default")]
    pub feed_retry: RetryConfig,

    /// Retry policy for each candidate page (default: 3 attempts)
    #[serde(default)]
    pub page_retry: RetryConfig,

    /// Per-attempt time budget for the feed (default: 10 seconds)
    #[serde(default = "default_feed_timeout", with = "duration_ms_serde")]
    pub feed_timeout: Duration,

    /// Per-attempt time budget for a candidate page (default: 15 seconds)
    #[serde(default = "default_page_timeout", with = "duration_ms_serde")]
    pub page_timeout: Duration,

    /// Lower bound of the randomized gap between page requests (default: 300ms)
    #[serde(default = "default_min_request_gap", with = "duration_ms_serde")]
    pub min_request_gap: Duration,

    /// Upper bound of the randomized gap between page requests (default: 900ms)
    #[serde(default = "default_max_request_gap", with = "duration_ms_serde")]
    pub max_request_gap: Duration,

    /// Browser-like User-Agent pool; one is drawn at random per request
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Maximum redirects followed per request (default: 5)
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            feed_retry: RetryConfig::feed_default(),
            page_retry: RetryConfig::default(),
            feed_timeout: default_feed_timeout(),
            page_timeout: default_page_timeout(),
            min_request_gap: default_min_request_gap(),
            max_request_gap: default_max_request_gap(),
            user_agents: default_user_agents(),
            max_redirects: default_max_redirects(),
        }
    }
}

/// Content-length thresholds, all counted in characters
///
/// The three thresholds are deliberately distinct: a selector must clear
/// `selector_min_chars` to win, a fetched candidate must clear `min_extracted_chars`
/// to be accepted, and a cleaned post must clear `min_post_chars` to be kept.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Minimum text a content selector must match to be a candidate winner (default: 100)
    #[serde(default = "default_selector_min_chars")]
    pub selector_min_chars: usize,

    /// Minimum raw extracted text for a candidate URL to be accepted (default: 80)
    #[serde(default = "default_min_extracted_chars")]
    pub min_extracted_chars: usize,

    /// Minimum cleaned text for a post to be kept (default: 200)
    #[serde(default = "default_min_post_chars")]
    pub min_post_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            selector_min_chars: default_selector_min_chars(),
            min_extracted_chars: default_min_extracted_chars(),
            min_post_chars: default_min_post_chars(),
        }
    }
}

/// Output shaping configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShapingConfig {
    /// Per-sample character cap (default: 1000)
    #[serde(default = "default_sample_max_chars")]
    pub sample_max_chars: usize,

    /// Per-post character cap inside the merged corpus (default: 3000)
    #[serde(default = "default_corpus_item_max_chars")]
    pub corpus_item_max_chars: usize,

    /// Separator placed between posts in the merged corpus
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Appended to any truncated text (default: "...")
    #[serde(default = "default_truncation_marker")]
    pub truncation_marker: String,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            sample_max_chars: default_sample_max_chars(),
            corpus_item_max_chars: default_corpus_item_max_chars(),
            separator: default_separator(),
            truncation_marker: default_truncation_marker(),
        }
    }
}

/// Debug-mode diagnostics configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Directory raw pages are written to in debug mode (default: "./crawl-debug")
    #[serde(default = "default_capture_dir")]
    pub capture_dir: PathBuf,

    /// Write raw pages to `capture_dir` when debug is active (default: true)
    #[serde(default = "default_true")]
    pub capture_pages: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            capture_dir: default_capture_dir(),
            capture_pages: true,
        }
    }
}

/// Deployment environment
///
/// Debug diagnostics are suppressed in production no matter what the request asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Local or staging deployment
    #[default]
    Development,
    /// Production deployment
    Production,
}

impl Environment {
    /// Name of the environment variable consulted by [`Environment::detect`]
    pub const ENV_VAR: &'static str = "APP_ENV";

    /// Read the environment from `APP_ENV` (`production` or `prod` means production)
    pub fn detect() -> Self {
        std::env::var(Self::ENV_VAR)
            .map(|value| Self::from_name(&value))
            .unwrap_or_default()
    }

    /// Parse an environment name, defaulting to development
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    /// True for production deployments
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_feed_hosts() -> Vec<String> {
    vec!["rss.blog.naver.com".into()]
}

fn default_feed_suffix() -> String {
    ".xml".into()
}

fn default_max_posts_limit() -> usize {
    50
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(8)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_feed_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_page_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_min_request_gap() -> Duration {
    Duration::from_millis(300)
}

fn default_max_request_gap() -> Duration {
    Duration::from_millis(900)
}

fn default_user_agents() -> Vec<String> {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".into(),
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".into(),
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0".into(),
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36".into(),
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1".into(),
    ]
}

fn default_max_redirects() -> usize {
    5
}

fn default_selector_min_chars() -> usize {
    100
}

fn default_min_extracted_chars() -> usize {
    80
}

fn default_min_post_chars() -> usize {
    200
}

fn default_sample_max_chars() -> usize {
    1000
}

fn default_corpus_item_max_chars() -> usize {
    3000
}

fn default_separator() -> String {
    "\n\n---\n\n".into()
}

fn default_truncation_marker() -> String {
    "...".into()
}

fn default_capture_dir() -> PathBuf {
    PathBuf::from("./crawl-debug")
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
