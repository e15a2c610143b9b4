//! Fixture builders shared by the soundrank test suites.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use soundrank_common::{ClusteredProduct, ProductAggregate, ReviewRecord, SentimentLabel};

pub use pretty_assertions;

/// A review whose label follows the star rating (1–2 negative, 3–5 positive).
pub fn review(product_id: &str, rating: u8, text: &str) -> ReviewRecord {
    let label = if rating <= 2 { SentimentLabel::Negative } else { SentimentLabel::Positive };
    labelled_review(product_id, rating, label, text)
}

pub fn labelled_review(
    product_id: &str,
    rating: u8,
    sentiment_label: SentimentLabel,
    text: &str,
) -> ReviewRecord {
    ReviewRecord {
        product_id: product_id.to_string(),
        rating,
        sentiment_label,
        text: text.to_string(),
        title: None,
    }
}

/// An aggregate built directly from its headline numbers.
/// `negative_count` is rounded from `negative_ratio * review_count`; the stored
/// ratio is kept exactly as given so scenario numbers stay readable.
pub fn aggregate(
    product_id: &str,
    review_count: u32,
    avg_rating: f64,
    negative_ratio: f64,
) -> ProductAggregate {
    let negative_count = ((negative_ratio * review_count as f64).round() as u32).min(review_count);
    ProductAggregate {
        product_id: product_id.to_string(),
        title: None,
        review_count,
        avg_rating,
        negative_count,
        positive_count: review_count - negative_count,
        negative_ratio,
        combined_text: String::new(),
    }
}

pub fn clustered(aggregate: ProductAggregate, cluster_id: i64) -> ClusteredProduct {
    ClusteredProduct { aggregate, cluster_id }
}

/// Deterministic pseudo-random review set.
///
/// Products are named `P000`, `P001`, …; review counts are skewed so that a few
/// products dominate, which is the shape the shrinkage estimator is built for.
pub fn random_reviews(seed: u64, n_products: usize, max_reviews: u32) -> Vec<ReviewRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let words = ["bass", "treble", "battery", "bluetooth", "speaker", "earbud", "volume", "fit"];
    let mut out = Vec::new();

    for p in 0..n_products {
        let product_id = format!("P{p:03}");
        let skew: f64 = rng.gen::<f64>().powi(3);
        let count = 1 + (skew * (max_reviews.max(1) - 1) as f64) as u32;
        let bias: u8 = rng.gen_range(1..=5);
        for _ in 0..count {
            let jitter: i8 = rng.gen_range(-1..=1);
            let rating = (bias as i8 + jitter).clamp(1, 5) as u8;
            let text = format!(
                "{} {} {}",
                words[rng.gen_range(0..words.len())],
                words[rng.gen_range(0..words.len())],
                words[rng.gen_range(0..words.len())],
            );
            let mut r = review(&product_id, rating, &text);
            // Occasionally disagree with the stars, as a real classifier would.
            if rng.gen_bool(0.1) {
                r.sentiment_label = match r.sentiment_label {
                    SentimentLabel::Positive => SentimentLabel::Negative,
                    SentimentLabel::Negative => SentimentLabel::Positive,
                };
            }
            out.push(r);
        }
    }
    out
}

/// Deterministic cluster id in `0..n_clusters` for a product id.
pub fn cluster_for(product_id: &str, n_clusters: i64) -> i64 {
    let hash = product_id.bytes().fold(0i64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as i64));
    hash.rem_euclid(n_clusters.max(1))
}

/// Write `content` to `name` inside `dir` and return the full path.
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    Ok(path)
}
