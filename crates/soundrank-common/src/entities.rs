/// Core record types flowing through the ranking pipeline.
/// Each stage builds a new table from the previous one; nothing is mutated in place.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sentiment label
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
        }
    }

    /// Parse the label as written by the sentiment collaborator.
    /// Accepts either case ("POSITIVE" is what the classifier emits).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(SentimentLabel::Positive),
            "negative" => Some(SentimentLabel::Negative),
            _          => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Review record (input)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewRecord {
    pub product_id: String,
    pub rating: u8, // 1–5 stars
    pub sentiment_label: SentimentLabel,
    pub text: String,
    pub title: Option<String>,
}

// ---------------------------------------------------------------------------
// Product aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductAggregate {
    pub product_id: String,
    pub title: Option<String>,
    pub review_count: u32,
    pub avg_rating: f64,
    pub negative_count: u32,
    pub positive_count: u32,
    pub negative_ratio: f64,
    pub combined_text: String,
}

// ---------------------------------------------------------------------------
// Clustered product (aggregate joined with its category)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusteredProduct {
    pub aggregate: ProductAggregate,
    pub cluster_id: i64,
}

// ---------------------------------------------------------------------------
// Scored product (terminal artifact)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredProduct {
    pub aggregate: ProductAggregate,
    pub cluster_id: i64,
    pub bayesian_rating: f64,
    pub sentiment_penalty: f64,
    pub final_score: f64,
    /// None until the ranker has run.
    pub cluster_rank: Option<u32>,
}

impl ScoredProduct {
    pub fn product_id(&self) -> &str {
        &self.aggregate.product_id
    }
}

/// One row of `ranked_products.csv`. The column set is the contract
/// shared with every display and report consumer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedProductRow {
    pub product_id: String,
    pub review_count: u32,
    pub avg_rating: f64,
    pub negative_ratio: f64,
    pub cluster_id: i64,
    pub bayesian_rating: f64,
    pub sentiment_penalty: f64,
    pub final_score: f64,
    pub cluster_rank: u32,
}

impl RankedProductRow {
    pub const COLUMNS: [&'static str; 9] = [
        "product_id",
        "review_count",
        "avg_rating",
        "negative_ratio",
        "cluster_id",
        "bayesian_rating",
        "sentiment_penalty",
        "final_score",
        "cluster_rank",
    ];
}

impl TryFrom<&ScoredProduct> for RankedProductRow {
    type Error = crate::error::SoundrankError;

    fn try_from(p: &ScoredProduct) -> Result<Self, Self::Error> {
        let cluster_rank = p.cluster_rank.ok_or_else(|| {
            crate::error::SoundrankError::schema(
                format!("product '{}'", p.product_id()),
                "cluster_rank is missing; rank products before persisting them",
            )
        })?;
        Ok(Self {
            product_id: p.aggregate.product_id.clone(),
            review_count: p.aggregate.review_count,
            avg_rating: p.aggregate.avg_rating,
            negative_ratio: p.aggregate.negative_ratio,
            cluster_id: p.cluster_id,
            bayesian_rating: p.bayesian_rating,
            sentiment_penalty: p.sentiment_penalty,
            final_score: p.final_score,
            cluster_rank,
        })
    }
}
