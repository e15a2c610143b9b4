//! Within-cluster ranking.
//!
//! Ranks are contiguous `1..=k` inside each cluster, best first. Ordering is a
//! total order: `final_score` descending, then `product_id` ascending, so ties
//! are broken the same way on every run.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use soundrank_common::{ScoredProduct, SoundrankError};
use tracing::info;

type Result<T> = soundrank_common::Result<T>;

/// Cluster count above which groups are ranked on the rayon pool.
#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 8;

/// Best-first comparison used for ranking.
pub fn rank_order(a: &ScoredProduct, b: &ScoredProduct) -> Ordering {
    b.final_score
        .total_cmp(&a.final_score)
        .then_with(|| a.product_id().cmp(b.product_id()))
}

/// Fill `cluster_rank` on every product.
///
/// Rows come back in input order; only `cluster_rank` changes.
pub fn rank_within_clusters(mut products: Vec<ScoredProduct>) -> Result<Vec<ScoredProduct>> {
    if products.is_empty() {
        return Err(SoundrankError::EmptyInput { stage: "rank" });
    }
    if let Some(p) = products.iter().find(|p| p.final_score.is_nan()) {
        return Err(SoundrankError::degenerate(p.product_id(), "final_score is NaN"));
    }

    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, p) in products.iter().enumerate() {
        groups.entry(p.cluster_id).or_default().push(i);
    }
    let n_clusters = groups.len();

    for (index, rank) in assign_ranks(&products, groups.into_values().collect()) {
        products[index].cluster_rank = Some(rank);
    }

    info!(n_products = products.len(), n_clusters, "Ranked products within clusters");
    Ok(products)
}

fn assign_ranks(products: &[ScoredProduct], groups: Vec<Vec<usize>>) -> Vec<(usize, u32)> {
    #[cfg(feature = "parallel")]
    {
        if groups.len() > PARALLEL_THRESHOLD {
            use rayon::prelude::*;
            return groups
                .into_par_iter()
                .flat_map_iter(|group| rank_group(products, group))
                .collect();
        }
    }

    groups
        .into_iter()
        .flat_map(|group| rank_group(products, group))
        .collect()
}

fn rank_group(products: &[ScoredProduct], mut group: Vec<usize>) -> Vec<(usize, u32)> {
    group.sort_by(|&a, &b| rank_order(&products[a], &products[b]));
    group
        .into_iter()
        .zip(1u32..)
        .collect()
}
