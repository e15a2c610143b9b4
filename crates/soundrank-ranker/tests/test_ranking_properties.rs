//! Property and scenario checks over the full ranking pass.
//!
//! Run with: cargo test --package soundrank-ranker --test test_ranking_properties

use std::collections::BTreeMap;

use soundrank_common::{ClusteredProduct, PipelineConfig, ScoredProduct};
use soundrank_ranker::aggregate::aggregate as aggregate_reviews;
use soundrank_ranker::cluster_provider::{assign_clusters, MockClusterAssigner};
use soundrank_ranker::pipeline::run_pipeline;
use soundrank_ranker::ranking::rank_within_clusters;
use soundrank_ranker::scorer::{compute_bayesian_rating, score, score_with_summary};
use soundrank_test_utils::pretty_assertions::assert_eq;
use soundrank_test_utils::{aggregate, cluster_for, clustered, random_reviews};

const SEEDS: [u64; 5] = [1, 7, 42, 1234, 98765];

fn random_clustered(seed: u64) -> Vec<ClusteredProduct> {
    let products = aggregate_reviews(&random_reviews(seed, 60, 120)).unwrap();
    products
        .into_iter()
        .map(|p| {
            let cid = cluster_for(&p.product_id, 5);
            clustered(p, cid)
        })
        .collect()
}

fn by_cluster(ranked: &[ScoredProduct]) -> BTreeMap<i64, Vec<&ScoredProduct>> {
    let mut out: BTreeMap<i64, Vec<&ScoredProduct>> = BTreeMap::new();
    for p in ranked {
        out.entry(p.cluster_id).or_default().push(p);
    }
    out
}

#[test]
fn test_aggregation_counts_are_conserved() {
    for seed in SEEDS {
        let reviews = random_reviews(seed, 50, 80);
        let products = aggregate_reviews(&reviews).unwrap();
        let total: u32 = products.iter().map(|p| p.review_count).sum();
        assert_eq!(total as usize, reviews.len());
        for p in &products {
            assert!(p.review_count > 0, "zero-count row for {}", p.product_id);
            assert_eq!(p.negative_count + p.positive_count, p.review_count);
        }
    }
}

#[test]
fn test_scores_are_bounded() {
    for seed in SEEDS {
        let (scored, summary) = score_with_summary(&random_clustered(seed)).unwrap();
        let c = summary.prior_mean;
        for p in &scored {
            let r = p.aggregate.avg_rating;
            assert!(p.final_score >= 0.0);
            assert!(p.bayesian_rating >= r.min(c) - 1e-9);
            assert!(p.bayesian_rating <= r.max(c) + 1e-9);
        }
    }
}

#[test]
fn test_more_reviews_move_toward_own_rating() {
    let (c, m) = (3.5, 10.0);
    for r in [1.0, 2.25, 4.0, 5.0] {
        let mut last_gap = f64::INFINITY;
        for v in [1.0, 2.0, 5.0, 10.0, 50.0, 500.0] {
            let gap = (compute_bayesian_rating(v, r, m, c).unwrap() - r).abs();
            assert!(gap < last_gap, "v={v} r={r}: {gap} !< {last_gap}");
            last_gap = gap;
        }
    }
}

#[test]
fn test_ranks_are_contiguous_per_cluster() {
    for seed in SEEDS {
        let ranked = rank_within_clusters(score(&random_clustered(seed)).unwrap()).unwrap();
        for (cid, members) in by_cluster(&ranked) {
            let mut ranks: Vec<u32> = members.iter().map(|p| p.cluster_rank.unwrap()).collect();
            ranks.sort_unstable();
            let expected: Vec<u32> = (1..=members.len() as u32).collect();
            assert_eq!(ranks, expected, "cluster {cid}");
        }
    }
}

#[test]
fn test_higher_score_means_better_rank() {
    for seed in SEEDS {
        let ranked = rank_within_clusters(score(&random_clustered(seed)).unwrap()).unwrap();
        for members in by_cluster(&ranked).values() {
            for a in members {
                for b in members {
                    if a.final_score > b.final_score {
                        assert!(a.cluster_rank < b.cluster_rank);
                    }
                }
            }
        }
    }
}

#[test]
fn test_scoring_and_ranking_are_idempotent() {
    let input = random_clustered(42);
    let first = rank_within_clusters(score(&input).unwrap()).unwrap();
    let second = rank_within_clusters(score(&input).unwrap()).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_three_product_scenario() {
    let input = vec![
        clustered(aggregate("P1", 10, 4.5, 0.1), 0),
        clustered(aggregate("P2", 3, 2.0, 0.6), 0),
        clustered(aggregate("P3", 100, 4.0, 0.05), 0),
    ];
    let (scored, summary) = score_with_summary(&input).unwrap();
    assert_eq!(summary.shrinkage_strength, 10.0);
    assert!((summary.prior_mean - 3.5).abs() < 1e-12);

    let ranked = rank_within_clusters(scored).unwrap();
    let p3 = &ranked[2];
    assert!((p3.bayesian_rating - 4.0).abs() < (ranked[0].bayesian_rating - 4.5).abs());
    assert_eq!(ranked[1].product_id(), "P2");
    assert_eq!(ranked[1].cluster_rank, Some(3));
}

#[test]
fn test_tied_scores_order_by_product_id() {
    let tied = |pid: &str| ScoredProduct {
        aggregate: aggregate(pid, 8, 3.2, 0.0),
        cluster_id: 2,
        bayesian_rating: 3.2,
        sentiment_penalty: 1.0,
        final_score: 3.2,
        cluster_rank: None,
    };
    for _ in 0..10 {
        let ranked = rank_within_clusters(vec![tied("B0002"), tied("B0001")]).unwrap();
        assert_eq!(ranked[0].cluster_rank, Some(2));
        assert_eq!(ranked[1].cluster_rank, Some(1));
    }
}

#[test]
fn test_pipeline_over_random_reviews() {
    let reviews = random_reviews(5, 80, 60);
    let products = aggregate_reviews(&reviews).unwrap();
    let mut assigner = MockClusterAssigner::new();
    for p in &products {
        assigner = assigner.with(&p.product_id, cluster_for(&p.product_id, 5));
    }
    assert!(assign_clusters(products.clone(), &assigner).is_ok());

    let output = run_pipeline(&reviews, &assigner, &PipelineConfig::default()).unwrap();
    assert_eq!(output.aggregates.len(), products.len());
    assert!(output.ranked.iter().all(|p| p.aggregate.review_count >= 3));
    assert!(output.ranked.iter().all(|p| p.cluster_rank.is_some()));
}
