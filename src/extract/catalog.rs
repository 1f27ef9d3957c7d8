//! Content-container and noise selectors for Naver Blog markup

use crate::types::PageVariant;
use scraper::Selector;
use tracing::warn;

/// Containers tried on the desktop viewer frame, best first
pub const DESKTOP_SELECTORS: &[&str] = &[
    ".se-main-container",
    "#postViewArea",
    ".se_component_wrap",
    "#post-view",
    ".post-view",
    ".post_ct",
    "article",
];

/// Containers tried on the mobile page, best first
pub const MOBILE_SELECTORS: &[&str] = &[
    ".se-main-container",
    "#viewTypeSelector",
    "._postView",
    ".post_ct",
    ".se_component_wrap",
    "#postViewArea",
    "article",
];

/// Subtrees removed before any text is measured
pub const NOISE_SELECTORS: &[&str] = &[
    "script",
    "style",
    "noscript",
    "iframe",
    "template",
    "svg",
    // comment widgets
    ".u_cbox",
    "#naverComment",
    ".area_comment",
    ".comment_area",
    ".wrap_postcomment",
    // ads and sponsored blocks
    ".revenue_unit_wrap",
    ".ad_area",
    ".ads",
    ".advertisement",
    "[id^='ad_']",
    "[class*='_ad_']",
];

/// Ordered, pre-parsed selector list for one page variant
#[derive(Debug, Clone)]
pub struct SelectorCatalog {
    entries: Vec<(String, Selector)>,
}

impl SelectorCatalog {
    /// Parse `selectors`; entries that fail to parse are skipped with a warning
    pub fn from_strs(selectors: &[&str]) -> Self {
        let entries = selectors
            .iter()
            .filter_map(|raw| match Selector::parse(raw) {
                Ok(selector) => Some(((*raw).to_string(), selector)),
                Err(e) => {
                    warn!(selector = raw, error = %e, "Skipping unparsable selector");
                    None
                }
            })
            .collect();
        Self { entries }
    }

    /// Catalog for `variant`
    pub fn for_variant(variant: PageVariant) -> Self {
        match variant {
            PageVariant::Desktop => Self::from_strs(DESKTOP_SELECTORS),
            PageVariant::Mobile => Self::from_strs(MOBILE_SELECTORS),
        }
    }

    /// Noise selectors
    pub fn noise() -> Self {
        Self::from_strs(NOISE_SELECTORS)
    }

    /// `(source text, selector)` pairs in priority order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selector)> {
        self.entries.iter().map(|(raw, sel)| (raw.as_str(), sel))
    }

    /// Number of usable selectors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no selector parsed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
