//! Keyword pre-filter for review text.

use soundrank_common::ReviewRecord;
use tracing::info;

/// Keep reviews whose lower-cased text contains any of `keywords`.
/// An empty keyword list keeps everything.
pub fn filter_by_keywords(reviews: Vec<ReviewRecord>, keywords: &[String]) -> Vec<ReviewRecord> {
    if keywords.is_empty() {
        return reviews;
    }

    let needles: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    let before = reviews.len();

    let kept: Vec<ReviewRecord> = reviews
        .into_iter()
        .filter(|r| {
            let text = r.text.to_lowercase();
            needles.iter().any(|k| text.contains(k.as_str()))
        })
        .collect();

    info!(before, after = kept.len(), "Filtered keyword-matching reviews");
    kept
}
