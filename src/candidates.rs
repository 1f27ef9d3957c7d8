//! Alternate addresses for one article
//!
//! A Naver Blog post is reachable as the desktop viewer frame, the mobile page, and
//! whatever link the feed carried. The viewer frame holds the article markup directly
//! (the plain desktop page is an iframe shell), so it is tried first.

use crate::types::{CandidateUrl, PageVariant};
use url::Url;

const DESKTOP_HOST: &str = "blog.naver.com";
const MOBILE_HOST: &str = "m.blog.naver.com";

/// Blog and article identifiers of a recognized post URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostId {
    /// Blog (account) id
    pub blog_id: String,
    /// Article number
    pub log_no: String,
}

impl PostId {
    /// Desktop viewer frame
    pub fn viewer_url(&self) -> String {
        format!(
            "https://{DESKTOP_HOST}/PostView.naver?blogId={}&logNo={}&redirect=Dlog&widgetTypeCall=true&directAccess=false",
            self.blog_id, self.log_no
        )
    }

    /// Mobile page
    pub fn mobile_url(&self) -> String {
        format!("https://{MOBILE_HOST}/{}/{}", self.blog_id, self.log_no)
    }
}

/// Recognize `/{blogId}/{logNo}` and `/PostView.naver?blogId=..&logNo=..` on either host
pub fn parse_post_id(post_url: &str) -> Option<PostId> {
    let url = Url::parse(post_url).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    if host != DESKTOP_HOST && host != MOBILE_HOST {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    let (blog_id, log_no) = match segments.as_slice() {
        [page] if page.starts_with("PostView.") => {
            let mut blog_id = None;
            let mut log_no = None;
            for (key, value) in url.query_pairs() {
                match key.as_ref() {
                    "blogId" => blog_id = Some(value.into_owned()),
                    "logNo" => log_no = Some(value.into_owned()),
                    _ => {}
                }
            }
            (blog_id?, log_no?)
        }
        [blog_id, log_no] => ((*blog_id).to_string(), (*log_no).to_string()),
        _ => return None,
    };

    let valid_blog = !blog_id.is_empty()
        && blog_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    let valid_log = !log_no.is_empty() && log_no.chars().all(|c| c.is_ascii_digit());
    (valid_blog && valid_log).then_some(PostId { blog_id, log_no })
}

/// Candidate URLs for `post_url`, best first
///
/// Recognized posts yield viewer, mobile, then the original; anything else yields the
/// original alone. Duplicates are dropped keeping the first occurrence.
pub fn expand(post_url: &str) -> Vec<CandidateUrl> {
    let mut urls = Vec::with_capacity(3);
    if let Some(id) = parse_post_id(post_url) {
        urls.push(id.viewer_url());
        urls.push(id.mobile_url());
    }
    urls.push(post_url.to_string());

    let mut seen = std::collections::HashSet::new();
    urls.into_iter()
        .filter(|url| seen.insert(url.clone()))
        .enumerate()
        .map(|(priority, url)| CandidateUrl {
            variant: variant_of(&url),
            url,
            priority,
        })
        .collect()
}

fn variant_of(url: &str) -> PageVariant {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(PageVariant::for_host))
        .unwrap_or(PageVariant::Desktop)
}
