//! Bayesian product score computation.
//!
//! B(p) = (v / (v + m)) × R + (m / (v + m)) × C
//! S(p) = B(p) × (1 − negative_ratio)
//!
//! where v is the product's review count, R its mean rating, C the mean rating
//! across all scored products and m the median review count. Products with few
//! reviews are pulled toward C; well-reviewed products keep close to their own R.

use serde::{Deserialize, Serialize};
use soundrank_common::{ClusteredProduct, ScoredProduct, SoundrankError};
use tracing::{debug, info};

use crate::stats::{mean, median};

type Result<T> = soundrank_common::Result<T>;

/// Global statistics shared by every product in one scoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// C: mean of `avg_rating` over all inputs
    pub prior_mean: f64,
    /// m: median of `review_count` over all inputs
    pub shrinkage_strength: f64,
    pub product_count: usize,
}

/// Compute C and m once for the whole input set.
pub fn compute_summary(clustered: &[ClusteredProduct]) -> Result<ScoreSummary> {
    let ratings: Vec<f64> = clustered.iter().map(|c| c.aggregate.avg_rating).collect();
    let counts: Vec<f64> = clustered.iter().map(|c| f64::from(c.aggregate.review_count)).collect();

    match (mean(&ratings), median(&counts)) {
        (Some(prior_mean), Some(shrinkage_strength)) => Ok(ScoreSummary {
            prior_mean,
            shrinkage_strength,
            product_count: clustered.len(),
        }),
        _ => Err(SoundrankError::EmptyInput { stage: "score" }),
    }
}

/// Shrinkage-adjusted rating. None when `v + m == 0`.
pub fn compute_bayesian_rating(v: f64, r: f64, m: f64, c: f64) -> Option<f64> {
    let denom = v + m;
    if denom == 0.0 {
        return None;
    }
    Some((v / denom) * r + (m / denom) * c)
}

/// Multiplicative discount from the share of negative reviews.
pub fn compute_sentiment_penalty(negative_ratio: f64) -> f64 {
    1.0 - negative_ratio
}

/// Score every product. See [`score_with_summary`].
pub fn score(clustered: &[ClusteredProduct]) -> Result<Vec<ScoredProduct>> {
    score_with_summary(clustered).map(|(scored, _)| scored)
}

/// Score every product and return the global statistics used.
///
/// Pure: each product's score depends only on its own (v, R, negative_ratio)
/// and the global C, m, so input order never changes any value.
/// Output rows carry no `cluster_rank` yet.
pub fn score_with_summary(clustered: &[ClusteredProduct]) -> Result<(Vec<ScoredProduct>, ScoreSummary)> {
    if clustered.is_empty() {
        return Err(SoundrankError::EmptyInput { stage: "score" });
    }
    for c in clustered {
        validate(c)?;
    }

    let summary = compute_summary(clustered)?;
    info!(
        prior_mean = summary.prior_mean,
        shrinkage_strength = summary.shrinkage_strength,
        n_products = summary.product_count,
        "Computing Bayesian scores"
    );

    let scored = clustered
        .iter()
        .map(|c| score_one(c, &summary))
        .collect::<Result<Vec<_>>>()?;

    Ok((scored, summary))
}

fn score_one(c: &ClusteredProduct, summary: &ScoreSummary) -> Result<ScoredProduct> {
    let agg = &c.aggregate;
    let v = f64::from(agg.review_count);
    let bayesian_rating = compute_bayesian_rating(v, agg.avg_rating, summary.shrinkage_strength, summary.prior_mean)
        .ok_or_else(|| {
            SoundrankError::degenerate(&agg.product_id, "review_count + median review_count is zero")
        })?;
    let sentiment_penalty = compute_sentiment_penalty(agg.negative_ratio);
    let final_score = bayesian_rating * sentiment_penalty;

    debug!(product_id = %agg.product_id, bayesian_rating, final_score, "Scored product");

    Ok(ScoredProduct {
        aggregate: agg.clone(),
        cluster_id: c.cluster_id,
        bayesian_rating,
        sentiment_penalty,
        final_score,
        cluster_rank: None,
    })
}

fn validate(c: &ClusteredProduct) -> Result<()> {
    let agg = &c.aggregate;
    if !agg.avg_rating.is_finite() {
        return Err(SoundrankError::degenerate(&agg.product_id, "avg_rating is not finite"));
    }
    if !agg.negative_ratio.is_finite() || !(0.0..=1.0).contains(&agg.negative_ratio) {
        return Err(SoundrankError::degenerate(
            &agg.product_id,
            format!("negative_ratio {} is outside [0, 1]", agg.negative_ratio),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundrank_test_utils::{aggregate, clustered};

    fn scenario() -> Vec<ClusteredProduct> {
        vec![
            clustered(aggregate("P1", 10, 4.5, 0.1), 0),
            clustered(aggregate("P2", 3, 2.0, 0.6), 0),
            clustered(aggregate("P3", 100, 4.0, 0.05), 0),
        ]
    }

    #[test]
    fn test_scenario_priors() {
        let summary = compute_summary(&scenario()).unwrap();
        assert_eq!(summary.shrinkage_strength, 10.0);
        assert!((summary.prior_mean - 3.5).abs() < 1e-12);
        assert_eq!(summary.product_count, 3);
    }

    #[test]
    fn test_scenario_scores() {
        let scored = score(&scenario()).unwrap();
        // P1: 0.5 × 4.5 + 0.5 × 3.5 = 4.0
        assert!((scored[0].bayesian_rating - 4.0).abs() < 1e-12);
        assert!((scored[0].final_score - 3.6).abs() < 1e-12);
        // P2: (3/13) × 2.0 + (10/13) × 3.5
        let expected = (3.0 / 13.0) * 2.0 + (10.0 / 13.0) * 3.5;
        assert!((scored[1].bayesian_rating - expected).abs() < 1e-12);
        // P3 stays nearest its own rating
        let gaps: Vec<f64> = scored
            .iter()
            .map(|s| (s.bayesian_rating - s.aggregate.avg_rating).abs())
            .collect();
        assert!(gaps[2] < gaps[0] && gaps[2] < gaps[1]);
        assert!(scored.iter().all(|s| s.cluster_rank.is_none()));
    }

    #[test]
    fn test_penalty() {
        assert_eq!(compute_sentiment_penalty(0.0), 1.0);
        assert_eq!(compute_sentiment_penalty(1.0), 0.0);
        assert!((compute_sentiment_penalty(0.25) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_zero_denominator() {
        assert_eq!(compute_bayesian_rating(0.0, 4.0, 0.0, 3.0), None);
        let err = score(&[clustered(aggregate("Z", 0, 4.0, 0.0), 0)]).unwrap_err();
        match err {
            SoundrankError::DegenerateInput { product_id, .. } => assert_eq!(product_id, "Z"),
            other => panic!("expected degenerate input, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(score(&[]), Err(SoundrankError::EmptyInput { stage: "score" })));
    }

    #[test]
    fn test_non_finite_inputs_rejected() {
        let nan_rating = clustered(aggregate("N", 5, f64::NAN, 0.0), 0);
        assert!(matches!(score(&[nan_rating]), Err(SoundrankError::DegenerateInput { .. })));

        let bad_ratio = clustered(aggregate("R", 5, 4.0, 1.5), 0);
        assert!(matches!(score(&[bad_ratio]), Err(SoundrankError::DegenerateInput { .. })));
    }

    #[test]
    fn test_scoring_ignores_cluster_and_order() {
        let mut shuffled = scenario();
        shuffled.reverse();
        shuffled[0].cluster_id = 9;
        let a = score(&scenario()).unwrap();
        let b = score(&shuffled).unwrap();
        for s in &a {
            let other = b.iter().find(|o| o.product_id() == s.product_id()).unwrap();
            assert_eq!(s.final_score.to_bits(), other.final_score.to_bits());
        }
    }
}
