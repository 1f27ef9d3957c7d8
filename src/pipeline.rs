//! Crawl orchestration
//!
//! One feed fetch, then each discovered post in order: expand to candidate URLs, fetch
//! each candidate until one yields enough text, clean it, keep it if it is long enough.
//! Per-candidate and per-post failures are logged and absorbed; only an unsafe target,
//! an unreachable or empty feed, zero usable posts, or cancellation fail the crawl.

use crate::candidates;
use crate::capture::PageCapture;
use crate::config::CrawlConfig;
use crate::error::{Error, Result, TransportError};
use crate::extract::{Extractor, clean_text};
use crate::feed::parse_feed_links;
use crate::retry::{RetryObserver, RetryPolicy};
use crate::shaping::{build_merged_text, build_samples};
use crate::transport::{
    FEED_ACCEPT, FetchOptions, Fetcher, HTML_ACCEPT, HttpTransport, Transport,
};
use crate::types::{CleanedPost, CrawlRequest, CrawlResult};
use crate::url_guard::{UrlGuard, check_feed_url};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Caller-owned crawler
///
/// Holds the HTTP client, URL guard and pre-parsed selector catalogs. Cheap to share
/// behind an `Arc`; a crawl borrows it immutably, so concurrent crawls are fine.
#[derive(Debug, Clone)]
pub struct Crawler {
    config: CrawlConfig,
    fetcher: Fetcher,
    extractor: Extractor,
    capture: PageCapture,
    feed_options: FetchOptions,
    page_options: FetchOptions,
}

impl Crawler {
    /// Build a crawler with the `reqwest` transport and the system DNS resolver
    ///
    /// # Errors
    /// Returns [`Error::Config`] for invalid settings and [`Error::HttpClient`] if the
    /// HTTP client cannot be built.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let guard = UrlGuard::new();
        let transport = HttpTransport::new(&config.fetch, &guard)?;
        Self::with_transport(config, Arc::new(transport), guard)
    }

    /// Build a crawler over an explicit transport and guard
    pub fn with_transport(
        config: CrawlConfig,
        transport: Arc<dyn Transport>,
        guard: UrlGuard,
    ) -> Result<Self> {
        config.validate()?;

        let fetcher = Fetcher::new(transport, guard, config.fetch.user_agents.clone());
        let feed_options = FetchOptions {
            retry: RetryPolicy::from(&config.fetch.feed_retry),
            timeout: config.fetch.feed_timeout,
            accept: FEED_ACCEPT,
        };
        let page_options = FetchOptions {
            retry: RetryPolicy::from(&config.fetch.page_retry),
            timeout: config.fetch.page_timeout,
            accept: HTML_ACCEPT,
        };

        Ok(Self {
            extractor: Extractor::new(&config.extraction),
            capture: PageCapture::new(config.debug.capture_dir.clone()),
            fetcher,
            feed_options,
            page_options,
            config,
        })
    }

    /// Observe every retry of every fetch (attempt number and error)
    pub fn with_retry_observer(mut self, observer: RetryObserver) -> Self {
        let feed_observer = Arc::clone(&observer);
        self.feed_options.retry = self
            .feed_options
            .retry
            .with_observer(move |attempt, err| feed_observer(attempt, err));
        self.page_options.retry = self
            .page_options
            .retry
            .with_observer(move |attempt, err| observer(attempt, err));
        self
    }

    /// Active configuration
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Run a crawl to completion
    pub async fn crawl(&self, request: &CrawlRequest) -> Result<CrawlResult> {
        self.crawl_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Run a crawl that aborts with [`Error::Cancelled`] once `cancel` fires
    pub async fn crawl_with_cancel(
        &self,
        request: &CrawlRequest,
        cancel: &CancellationToken,
    ) -> Result<CrawlResult> {
        let feed_url = check_feed_url(&self.config.feed, &request.feed_url)?;
        let max_posts = request.max_posts.clamp(1, self.config.feed.max_posts_limit);
        let debug_mode = self.debug_enabled(request.debug);

        info!(
            feed_url = %feed_url,
            max_posts,
            debug = debug_mode,
            "Starting crawl"
        );

        let body = with_cancel(
            cancel,
            self.fetcher
                .fetch(feed_url.as_str(), None, &self.feed_options),
        )
        .await
        .map_err(|e| feed_fetch_error(feed_url.as_str(), e))?;

        let links = parse_feed_links(&body, max_posts).map_err(|e| {
            error!(feed_url = %feed_url, error = %e, "Feed could not be parsed");
            Error::EmptyFeed {
                feed_url: feed_url.to_string(),
                reason: e.to_string(),
            }
        })?;
        if links.is_empty() {
            error!(feed_url = %feed_url, "Feed has no entries with links");
            return Err(Error::EmptyFeed {
                feed_url: feed_url.to_string(),
                reason: "no entries with links".to_string(),
            });
        }
        info!(feed_url = %feed_url, discovered = links.len(), "Discovered posts");

        let mut posts = Vec::with_capacity(links.len());
        for (index, link) in links.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            debug!(post = index + 1, of = links.len(), url = %link, "Processing post");
            if let Some(post) = self.process_post(link, debug_mode, cancel).await? {
                posts.push(post);
            }
        }

        if posts.is_empty() {
            error!(feed_url = %feed_url, attempted = links.len(), "No extractable posts");
            return Err(Error::NoExtractablePosts {
                attempted: links.len(),
            });
        }

        let result = CrawlResult {
            merged_text: build_merged_text(&posts, &self.config.shaping),
            samples: build_samples(&posts, &self.config.shaping),
            post_count: posts.len(),
            discovered: links.len(),
        };

        info!(
            feed_url = %feed_url,
            posts = result.post_count,
            discovered = result.discovered,
            merged_chars = result.merged_text.chars().count(),
            "Crawl complete"
        );
        Ok(result)
    }

    /// Try each candidate URL of one post; `Ok(None)` means the post is skipped
    async fn process_post(
        &self,
        post_url: &str,
        debug_mode: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<CleanedPost>> {
        let candidates = candidates::expand(post_url);
        let thresholds = &self.config.extraction;

        for candidate in &candidates {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.pace(cancel).await?;

            let fetched = with_cancel(
                cancel,
                self.fetcher
                    .fetch(&candidate.url, Some(post_url), &self.page_options),
            )
            .await;
            let body = match fetched {
                Ok(body) => body,
                Err(TransportError::Cancelled) => return Err(Error::Cancelled),
                Err(e) if e.is_unsafe_target() => {
                    error!(url = %candidate.url, error = %e, "Refusing unsafe candidate URL");
                    return Err(unsafe_target(e));
                }
                Err(e) => {
                    warn!(
                        url = %candidate.url,
                        priority = candidate.priority,
                        error = %e,
                        "Candidate fetch failed, trying next"
                    );
                    continue;
                }
            };

            if debug_mode && self.config.debug.capture_pages {
                // Fire-and-forget; extraction does not wait for the write
                drop(self.capture.capture(&candidate.url, body.clone()));
            }

            let extraction = self
                .extractor
                .extract_page(&body, candidate.variant, debug_mode);
            if let Some(diagnostics) = &extraction.diagnostics {
                debug!(
                    url = %candidate.url,
                    selector = %extraction.selector_used,
                    diagnostics = ?diagnostics,
                    "Selector lengths"
                );
            }

            let extracted_chars = extraction.text.chars().count();
            if extracted_chars <= thresholds.min_extracted_chars {
                warn!(
                    url = %candidate.url,
                    chars = extracted_chars,
                    min = thresholds.min_extracted_chars,
                    "Candidate yielded too little text, trying next"
                );
                continue;
            }

            let text = clean_text(&extraction.text);
            let cleaned_chars = text.chars().count();
            if cleaned_chars <= thresholds.min_post_chars {
                info!(
                    url = %post_url,
                    chars = cleaned_chars,
                    min = thresholds.min_post_chars,
                    "Post too short after cleaning, discarding"
                );
                return Ok(None);
            }

            debug!(
                url = %post_url,
                candidate = %candidate.url,
                selector = %extraction.selector_used,
                chars = cleaned_chars,
                "Post extracted"
            );
            return Ok(Some(CleanedPost {
                source_url: post_url.to_string(),
                selector_used: extraction.selector_used,
                text,
            }));
        }

        warn!(
            url = %post_url,
            candidates = candidates.len(),
            "All candidates failed, skipping post"
        );
        Ok(None)
    }

    fn debug_enabled(&self, requested: bool) -> bool {
        if requested && self.config.environment.is_production() {
            debug!("Debug mode requested in production, ignoring");
            return false;
        }
        requested
    }

    /// Randomized gap before each page request
    async fn pace(&self, cancel: &CancellationToken) -> Result<()> {
        let gap = self.request_gap();
        if gap.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(gap) => Ok(()),
        }
    }

    fn request_gap(&self) -> Duration {
        let min = self.config.fetch.min_request_gap;
        let max = self.config.fetch.max_request_gap;
        if max <= min {
            return min;
        }
        let millis = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
        Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
    }
}

/// Race `future` against cancellation
async fn with_cancel<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = std::result::Result<T, TransportError>>,
) -> std::result::Result<T, TransportError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        result = future => result,
    }
}

fn feed_fetch_error(feed_url: &str, error: TransportError) -> Error {
    match error {
        TransportError::Cancelled => Error::Cancelled,
        e if e.is_unsafe_target() => {
            error!(feed_url, error = %e, "Feed URL refused by guard");
            unsafe_target(e)
        }
        e => {
            error!(feed_url, error = %e, "Feed fetch failed");
            Error::CrawlingFailed {
                feed_url: feed_url.to_string(),
                source: e,
            }
        }
    }
}

fn unsafe_target(error: TransportError) -> Error {
    let message = error.to_string();
    match error.into_security_error() {
        Some(security) => Error::UnsafeTarget(security),
        None => Error::InvalidRequest(message),
    }
}
