//! Feed document parsing
//!
//! The body is tried as RSS 2.0 first, then as Atom. Entry links come back in document
//! order; entries without a usable link are skipped.

use crate::error::FeedError;
use tracing::debug;

/// Ordered article links from a feed body, truncated to `max_posts`
///
/// An empty list is a valid answer (a feed with no entries, or none with links).
pub fn parse_feed_links(body: &str, max_posts: usize) -> Result<Vec<String>, FeedError> {
    let links = match rss_links(body) {
        Ok(links) => {
            debug!(entries = links.len(), "Parsed feed as RSS");
            links
        }
        Err(rss_err) => {
            debug!(error = %rss_err, "Not RSS, trying Atom");
            let links = atom_links(body).map_err(|atom_err| FeedError {
                rss: rss_err.to_string(),
                atom: atom_err.to_string(),
            })?;
            debug!(entries = links.len(), "Parsed feed as Atom");
            links
        }
    };

    Ok(links.into_iter().take(max_posts).collect())
}

fn rss_links(body: &str) -> Result<Vec<String>, rss::Error> {
    let channel = body.parse::<rss::Channel>()?;
    Ok(channel
        .items()
        .iter()
        .filter_map(|item| usable_link(item.link()))
        .collect())
}

fn atom_links(body: &str) -> Result<Vec<String>, atom_syndication::Error> {
    let feed = atom_syndication::Feed::read_from(body.as_bytes())?;
    Ok(feed
        .entries()
        .iter()
        .filter_map(|entry| {
            // Prefer rel="alternate", which is what readers open
            let link = entry
                .links()
                .iter()
                .find(|link| link.rel() == "alternate")
                .or_else(|| entry.links().first())?;
            usable_link(Some(link.href()))
        })
        .collect())
}

fn usable_link(link: Option<&str>) -> Option<String> {
    let link = link?.trim();
    (!link.is_empty()).then(|| link.to_string())
}
