//! End-to-end ranking pass: aggregate → filter → cluster join → score → rank.

use serde::Serialize;
use soundrank_common::{PipelineConfig, ProductAggregate, ReviewRecord, ScoredProduct};
use tracing::info;

use crate::aggregate::aggregate;
use crate::cluster_provider::{assign_clusters, ClusterAssigner};
use crate::filter::filter_products;
use crate::ranking::rank_within_clusters;
use crate::scorer::{score_with_summary, ScoreSummary};

type Result<T> = soundrank_common::Result<T>;

/// Everything one run produces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    /// Full product table, before the review-count filter
    pub aggregates: Vec<ProductAggregate>,
    /// Scored and ranked products that survived the filter
    pub ranked: Vec<ScoredProduct>,
    pub summary: ScoreSummary,
}

impl PipelineOutput {
    /// Distinct cluster ids, ascending.
    pub fn cluster_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.ranked.iter().map(|p| p.cluster_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Run the ranking pass over labelled reviews.
///
/// All-or-nothing: if the filter leaves no products the scorer reports an
/// empty input and no partial output is returned.
pub fn run_pipeline(
    reviews: &[ReviewRecord],
    assigner: &dyn ClusterAssigner,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    config.validate()?;
    info!(n_reviews = reviews.len(), min_reviews = config.ranking.min_reviews, "Starting ranking pipeline");

    let aggregates = aggregate(reviews)?;
    let kept = filter_products(aggregates.clone(), config.ranking.min_reviews);
    let clustered = assign_clusters(kept, assigner)?;
    let (scored, summary) = score_with_summary(&clustered)?;
    let ranked = rank_within_clusters(scored)?;

    info!(
        n_products = aggregates.len(),
        n_ranked = ranked.len(),
        prior_mean = summary.prior_mean,
        shrinkage_strength = summary.shrinkage_strength,
        "Ranking pipeline complete"
    );

    Ok(PipelineOutput { aggregates, ranked, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster_provider::MockClusterAssigner;
    use soundrank_common::SoundrankError;
    use soundrank_test_utils::review;

    fn reviews() -> Vec<ReviewRecord> {
        let mut out = Vec::new();
        for (pid, ratings) in [("A", &[5u8, 5, 4][..]), ("B", &[2, 1, 3, 4][..]), ("C", &[5][..])] {
            for &r in ratings {
                out.push(review(pid, r, "speaker"));
            }
        }
        out
    }

    #[test]
    fn test_pipeline_filters_and_ranks() {
        let assigner = MockClusterAssigner::new().everything_in(0);
        let output = run_pipeline(&reviews(), &assigner, &PipelineConfig::default()).unwrap();

        assert_eq!(output.aggregates.len(), 3);
        let ids: Vec<&str> = output.ranked.iter().map(|p| p.product_id()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(output.ranked[0].cluster_rank, Some(1));
        assert_eq!(output.ranked[1].cluster_rank, Some(2));
        assert_eq!(output.summary.product_count, 2);
        assert_eq!(output.cluster_ids(), vec![0]);
    }

    #[test]
    fn test_filter_removing_everything_fails() {
        let mut config = PipelineConfig::default();
        config.ranking.min_reviews = 50;
        let assigner = MockClusterAssigner::new().everything_in(0);
        let err = run_pipeline(&reviews(), &assigner, &config).unwrap_err();
        assert!(matches!(err, SoundrankError::EmptyInput { stage: "score" }));
    }

    #[test]
    fn test_unclustered_product_fails() {
        let assigner = MockClusterAssigner::new().with("A", 0);
        let err = run_pipeline(&reviews(), &assigner, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, SoundrankError::Schema { .. }));
    }
}
