//! Category filter: drops low-signal products before scoring.

use soundrank_common::ProductAggregate;
use tracing::info;

/// Keep aggregates with `review_count >= min_reviews`, preserving input order.
/// An empty result is valid.
pub fn filter_products(aggregates: Vec<ProductAggregate>, min_reviews: u32) -> Vec<ProductAggregate> {
    let before = aggregates.len();
    let kept: Vec<ProductAggregate> = aggregates
        .into_iter()
        .filter(|a| a.review_count >= min_reviews)
        .collect();

    info!(min_reviews, before, after = kept.len(), "Filtered low-signal products");
    kept
}
