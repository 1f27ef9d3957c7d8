//! Article body extraction
//!
//! Noise subtrees (scripts, styles, frames, comment widgets, ads) are removed first, then
//! each catalog selector's first match is measured by visible-text length. Among the
//! selectors reaching the minimum, the longest wins and ties keep the earlier one. If none
//! reaches it, the whole document's visible text is returned under [`DOCUMENT_FALLBACK`].

mod catalog;
mod clean;


pub use catalog::{DESKTOP_SELECTORS, MOBILE_SELECTORS, NOISE_SELECTORS, SelectorCatalog};
pub use clean::clean_text;

use crate::config::ExtractionConfig;
use crate::types::{ExtractionResult, PageVariant};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

/// `selector_used` value when no selector reached the minimum
pub const DOCUMENT_FALLBACK: &str = "document";

/// Elements that start a new line in visible text
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Extraction engine with the desktop and mobile catalogs pre-parsed
#[derive(Debug, Clone)]
pub struct Extractor {
    desktop: SelectorCatalog,
    mobile: SelectorCatalog,
    noise: SelectorCatalog,
    min_chars: usize,
}

impl Extractor {
    /// Build from config (`selector_min_chars` is the per-selector minimum)
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            desktop: SelectorCatalog::for_variant(PageVariant::Desktop),
            mobile: SelectorCatalog::for_variant(PageVariant::Mobile),
            noise: SelectorCatalog::noise(),
            min_chars: config.selector_min_chars,
        }
    }

    /// Catalog used for pages of `variant`
    pub fn catalog(&self, variant: PageVariant) -> &SelectorCatalog {
        match variant {
            PageVariant::Desktop => &self.desktop,
            PageVariant::Mobile => &self.mobile,
        }
    }

    /// Extract from a page rendered as `variant`
    pub fn extract_page(&self, html: &str, variant: PageVariant, debug: bool) -> ExtractionResult {
        extract(html, self.catalog(variant), &self.noise, self.min_chars, debug)
    }
}

/// Run the engine over `html` with an explicit catalog
pub fn extract(
    html: &str,
    catalog: &SelectorCatalog,
    noise: &SelectorCatalog,
    min_chars: usize,
    debug: bool,
) -> ExtractionResult {
    let mut document = Html::parse_document(html);
    remove_noise(&mut document, noise);

    let mut diagnostics = debug.then(BTreeMap::new);
    let mut best: Option<(&str, String, usize)> = None;

    for (raw, selector) in catalog.iter() {
        let text = document
            .select(selector)
            .next()
            .map(visible_text)
            .unwrap_or_default();
        let len = text.chars().count();

        if let Some(map) = diagnostics.as_mut() {
            map.insert(raw.to_string(), len);
        }

        let beats_current = best.as_ref().is_none_or(|(_, _, best_len)| len > *best_len);
        if len >= min_chars && beats_current {
            best = Some((raw, text, len));
        }
    }

    match best {
        Some((selector, text, _)) => ExtractionResult {
            text,
            selector_used: selector.to_string(),
            diagnostics,
        },
        None => ExtractionResult {
            text: document_text(&document),
            selector_used: DOCUMENT_FALLBACK.to_string(),
            diagnostics,
        },
    }
}

fn remove_noise(document: &mut Html, noise: &SelectorCatalog) {
    let ids: Vec<_> = noise
        .iter()
        .flat_map(|(_, selector)| document.select(selector).map(|el| el.id()).collect::<Vec<_>>())
        .collect();

    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn document_text(document: &Html) -> String {
    match Selector::parse("body") {
        Ok(body) => match document.select(&body).next() {
            Some(body) => visible_text(body),
            None => visible_text(document.root_element()),
        },
        Err(_) => visible_text(document.root_element()),
    }
}

/// Text of `element` with block boundaries as line breaks and whitespace collapsed
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);

    let lines: Vec<String> = raw
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect();
    lines.join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if name == "br" {
                out.push('\n');
                continue;
            }
            let block = BLOCK_ELEMENTS.contains(&name);
            if block {
                out.push('\n');
            }
            collect_text(child, out);
            if block {
                out.push('\n');
            }
        }
    }
}
