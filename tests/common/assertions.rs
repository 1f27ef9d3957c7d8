//! Custom assertions on crawl results

use feed_harvest::CrawlResult;

/// Split the merged corpus back into its segments
pub fn segments<'a>(result: &'a CrawlResult, separator: &str) -> Vec<&'a str> {
    result.merged_text.split(separator).collect()
}

/// Assert every sample is one of the merged segments (or a prefix of one, when capped)
pub fn assert_samples_drawn_from_corpus(result: &CrawlResult, separator: &str, marker: &str) {
    let segments = segments(result, separator);
    for sample in &result.samples {
        let body = sample.strip_suffix(marker).unwrap_or(sample);
        assert!(
            segments.iter().any(|segment| segment.starts_with(body)),
            "sample not found in corpus: {}...",
            body.chars().take(20).collect::<String>()
        );
    }
}
