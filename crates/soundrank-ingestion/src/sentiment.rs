//! Trait for sentiment label access.
//!
//! The classifier itself is an external inference service; the pipeline only
//! needs one label per review. Implementations can use:
//! - Star-rating mapping (built in)
//! - A classifier's precomputed output
//! - Mock data (testing)
//!
//! [`evaluate_labels`] checks supplied labels against a reference labeler on a
//! seeded sample, reporting a confusion matrix and per-label metrics.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use soundrank_common::{ReviewRecord, SentimentLabel, SoundrankError};
use tracing::info;

/// A review row before a sentiment label has been attached.
#[derive(Debug, Clone, PartialEq)]
pub struct UnlabeledReview {
    pub product_id: String,
    pub rating: u8,
    pub text: String,
    pub title: Option<String>,
}

impl UnlabeledReview {
    pub fn with_label(self, sentiment_label: SentimentLabel) -> ReviewRecord {
        ReviewRecord {
            product_id: self.product_id,
            rating: self.rating,
            sentiment_label,
            text: self.text,
            title: self.title,
        }
    }
}

impl From<&ReviewRecord> for UnlabeledReview {
    fn from(review: &ReviewRecord) -> Self {
        Self {
            product_id: review.product_id.clone(),
            rating: review.rating,
            text: review.text.clone(),
            title: review.title.clone(),
        }
    }
}

pub trait SentimentLabeler: Send + Sync {
    fn label(&self, review: &UnlabeledReview) -> SentimentLabel;
}

/// 1–2 stars → negative, 3–5 stars → positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct StarRatingLabeler;

impl SentimentLabeler for StarRatingLabeler {
    fn label(&self, review: &UnlabeledReview) -> SentimentLabel {
        if review.rating <= 2 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Positive
        }
    }
}

// ── Label evaluation ────────────────────────────────────────────────────────

/// Label order used by the confusion matrix and the per-label metrics.
pub const EVALUATION_LABELS: [SentimentLabel; 2] = [SentimentLabel::Negative, SentimentLabel::Positive];

fn label_index(label: SentimentLabel) -> usize {
    match label {
        SentimentLabel::Negative => 0,
        SentimentLabel::Positive => 1,
    }
}

/// One sampled review with both its supplied and its reference label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedReview {
    pub product_id: String,
    pub rating: u8,
    pub text: String,
    pub sentiment_label: SentimentLabel,
    pub reference_label: SentimentLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelMetrics {
    pub label: SentimentLabel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Sampled reviews whose reference label is `label`
    pub support: u32,
}

/// Agreement between supplied labels and a reference labeler.
///
/// The reference plays the role of ground truth: `confusion[r][s]` counts
/// reviews whose reference label is `EVALUATION_LABELS[r]` and whose supplied
/// label is `EVALUATION_LABELS[s]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentEvaluation {
    pub sample: Vec<EvaluatedReview>,
    pub confusion: [[u32; 2]; 2],
    pub per_label: Vec<LabelMetrics>,
    pub accuracy: f64,
}

impl SentimentEvaluation {
    fn from_sample(sample: Vec<EvaluatedReview>) -> Self {
        let mut confusion = [[0u32; 2]; 2];
        for r in &sample {
            confusion[label_index(r.reference_label)][label_index(r.sentiment_label)] += 1;
        }

        let ratio = |num: u32, den: u32| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let per_label = EVALUATION_LABELS
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                let hits = confusion[i][i];
                let support = confusion[i][0] + confusion[i][1];
                let predicted = confusion[0][i] + confusion[1][i];
                let precision = ratio(hits, predicted);
                let recall = ratio(hits, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                LabelMetrics { label, precision, recall, f1, support }
            })
            .collect();

        let accuracy = ratio(confusion[0][0] + confusion[1][1], sample.len() as u32);
        Self { sample, confusion, per_label, accuracy }
    }

    /// Plain-text classification report followed by the confusion matrix.
    pub fn render(&self) -> String {
        let mut out = format!("{:>10} {:>9} {:>9} {:>9} {:>9}\n", "", "precision", "recall", "f1", "support");
        for m in &self.per_label {
            out.push_str(&format!(
                "{:>10} {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
                m.label.as_str(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            ));
        }
        out.push_str(&format!("{:>10} {:>29.2} {:>9}\n\n", "accuracy", self.accuracy, self.sample.len()));
        out.push_str("confusion (rows reference, columns supplied; negative, positive)\n");
        for row in &self.confusion {
            out.push_str(&format!("[{:>6} {:>6}]\n", row[0], row[1]));
        }
        out
    }
}

/// Compare each review's supplied label with `reference` on a seeded sample of
/// at most `sample_size` reviews. Sampled reviews keep their input order.
pub fn evaluate_labels(
    reviews: &[ReviewRecord],
    reference: &dyn SentimentLabeler,
    sample_size: usize,
    seed: u64,
) -> soundrank_common::Result<SentimentEvaluation> {
    if reviews.is_empty() || sample_size == 0 {
        return Err(SoundrankError::EmptyInput { stage: "evaluate" });
    }

    let picked: Vec<&ReviewRecord> = if reviews.len() <= sample_size {
        reviews.iter().collect()
    } else {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices = rand::seq::index::sample(&mut rng, reviews.len(), sample_size).into_vec();
        indices.sort_unstable();
        indices.into_iter().map(|i| &reviews[i]).collect()
    };

    let sample = picked
        .into_iter()
        .map(|r| EvaluatedReview {
            product_id: r.product_id.clone(),
            rating: r.rating,
            text: r.text.clone(),
            sentiment_label: r.sentiment_label,
            reference_label: reference.label(&UnlabeledReview::from(r)),
        })
        .collect();

    let evaluation = SentimentEvaluation::from_sample(sample);
    info!(
        n_sampled = evaluation.sample.len(),
        accuracy = evaluation.accuracy,
        "Evaluated sentiment labels"
    );
    Ok(evaluation)
}

// ── Mock Implementation for Testing ────────────────────────────────────────

/// Labels reviews from a fixed text → label table, defaulting to positive.
pub struct MockSentimentLabeler {
    data: std::collections::HashMap<String, SentimentLabel>,
}

impl MockSentimentLabeler {
    pub fn new() -> Self {
        Self {
            data: std::collections::HashMap::new(),
        }
    }

    pub fn with(mut self, text: &str, label: SentimentLabel) -> Self {
        self.data.insert(text.to_string(), label);
        self
    }
}

impl Default for MockSentimentLabeler {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentLabeler for MockSentimentLabeler {
    fn label(&self, review: &UnlabeledReview) -> SentimentLabel {
        self.data.get(&review.text).copied().unwrap_or(SentimentLabel::Positive)
    }
}
