//! Review → product aggregation.
//!
//! Collapses review-level records into one row per product. A product only
//! comes into existence when its first review is seen, so every aggregate has
//! `review_count >= 1` and the ratio denominators can never be zero.

use std::collections::BTreeMap;

use soundrank_common::{ProductAggregate, ReviewRecord, SentimentLabel, SoundrankError};
use tracing::info;

type Result<T> = soundrank_common::Result<T>;

#[derive(Default)]
struct Accumulator {
    title: Option<String>,
    review_count: u32,
    rating_sum: u64,
    negative_count: u32,
    positive_count: u32,
    texts: Vec<String>,
}

impl Accumulator {
    fn push(&mut self, review: &ReviewRecord) {
        self.review_count += 1;
        self.rating_sum += u64::from(review.rating);
        match review.sentiment_label {
            SentimentLabel::Negative => self.negative_count += 1,
            SentimentLabel::Positive => self.positive_count += 1,
        }
        if self.title.is_none() {
            self.title = review.title.clone().filter(|t| !t.is_empty());
        }
        self.texts.push(review.text.clone());
    }

    fn finish(self, product_id: String) -> ProductAggregate {
        let n = f64::from(self.review_count);
        ProductAggregate {
            product_id,
            title: self.title,
            review_count: self.review_count,
            avg_rating: self.rating_sum as f64 / n,
            negative_count: self.negative_count,
            positive_count: self.positive_count,
            negative_ratio: f64::from(self.negative_count) / n,
            combined_text: self.texts.join(" "),
        }
    }
}

/// Group reviews by `product_id`.
///
/// Output is ordered by `product_id` ascending, so any permutation of the same
/// review set yields the same table. Texts are concatenated in input order.
pub fn aggregate(reviews: &[ReviewRecord]) -> Result<Vec<ProductAggregate>> {
    if reviews.is_empty() {
        return Err(SoundrankError::EmptyInput { stage: "aggregate" });
    }

    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    for (i, review) in reviews.iter().enumerate() {
        validate(review, i)?;
        groups.entry(review.product_id.clone()).or_default().push(review);
    }

    let products: Vec<ProductAggregate> = groups
        .into_iter()
        .map(|(product_id, acc)| acc.finish(product_id))
        .collect();

    info!(n_reviews = reviews.len(), n_products = products.len(), "Aggregated reviews");
    Ok(products)
}

fn validate(review: &ReviewRecord, index: usize) -> Result<()> {
    if review.product_id.trim().is_empty() {
        return Err(SoundrankError::schema(
            format!("review #{index}"),
            "product_id is empty",
        ));
    }
    if !(1..=5).contains(&review.rating) {
        return Err(SoundrankError::schema(
            format!("review #{index} (product '{}')", review.product_id),
            format!("rating {} is outside 1–5", review.rating),
        ));
    }
    Ok(())
}
