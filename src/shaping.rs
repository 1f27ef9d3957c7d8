//! Output shaping: samples and merged corpus from the cleaned posts

use crate::config::ShapingConfig;
use crate::types::CleanedPost;
use rand::seq::SliceRandom;

/// Truncate `text` to `max_chars` characters, appending `marker` when cut
///
/// Counting is by `char`, never splitting a code point. The marker is extra to the cap.
pub fn truncate_chars(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{marker}", text[..byte_idx].trim_end()),
        None => text.to_string(),
    }
}

/// Each post capped to the sample length, then shuffled
pub fn build_samples(posts: &[CleanedPost], config: &ShapingConfig) -> Vec<String> {
    let mut samples: Vec<String> = posts
        .iter()
        .map(|post| truncate_chars(&post.text, config.sample_max_chars, &config.truncation_marker))
        .collect();
    samples.shuffle(&mut rand::thread_rng());
    samples
}

/// Each post capped to the corpus length, joined with the separator in discovery order
pub fn build_merged_text(posts: &[CleanedPost], config: &ShapingConfig) -> String {
    posts
        .iter()
        .map(|post| {
            truncate_chars(
                &post.text,
                config.corpus_item_max_chars,
                &config.truncation_marker,
            )
        })
        .collect::<Vec<_>>()
        .join(&config.separator)
}
