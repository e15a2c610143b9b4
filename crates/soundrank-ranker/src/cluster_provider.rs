//! Trait for cluster assignment access.
//!
//! Provides an abstraction over the external clustering collaborator, allowing
//! the ranker to attach category ids to products without depending on the
//! embedding model or clustering algorithm.

use soundrank_common::{ClusteredProduct, ProductAggregate, SoundrankError};
use soundrank_ingestion::clusters::ClusterTable;
use tracing::info;

type Result<T> = soundrank_common::Result<T>;

/// Trait for looking up the category of a product.
///
/// Implementations can use:
/// - A cluster table exported by the clustering job (local CSV)
/// - Mock data (testing)
pub trait ClusterAssigner: Send + Sync {
    /// Returns None if the product was never clustered.
    fn assign(&self, product: &ProductAggregate) -> Option<i64>;
}

/// Join every aggregate with its cluster id.
///
/// The join must be total: an aggregate the assigner does not know is a
/// schema error naming the product.
pub fn assign_clusters(
    aggregates: Vec<ProductAggregate>,
    assigner: &dyn ClusterAssigner,
) -> Result<Vec<ClusteredProduct>> {
    let clustered = aggregates
        .into_iter()
        .map(|aggregate| match assigner.assign(&aggregate) {
            Some(cluster_id) => Ok(ClusteredProduct { aggregate, cluster_id }),
            None => Err(SoundrankError::schema(
                "cluster assignment",
                format!("product '{}' has no cluster_id", aggregate.product_id),
            )),
        })
        .collect::<Result<Vec<_>>>()?;

    info!(n_products = clustered.len(), "Attached cluster ids");
    Ok(clustered)
}

// ── Mock Implementation for Testing ────────────────────────────────────────

/// Mock assigner with hardcoded product → cluster pairs.
pub struct MockClusterAssigner {
    data: std::collections::HashMap<String, i64>,
    fallback: Option<i64>,
}

impl MockClusterAssigner {
    pub fn new() -> Self {
        Self {
            data: std::collections::HashMap::new(),
            fallback: None,
        }
    }

    pub fn with(mut self, product_id: &str, cluster_id: i64) -> Self {
        self.data.insert(product_id.to_string(), cluster_id);
        self
    }

    /// Put every unlisted product into `cluster_id`.
    pub fn everything_in(mut self, cluster_id: i64) -> Self {
        self.fallback = Some(cluster_id);
        self
    }
}

impl Default for MockClusterAssigner {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterAssigner for MockClusterAssigner {
    fn assign(&self, product: &ProductAggregate) -> Option<i64> {
        self.data.get(&product.product_id).copied().or(self.fallback)
    }
}

// ── Adapter for ClusterTable ─────────────────────────────────────────────────

/// Adapter that wraps a loaded `ClusterTable` to implement `ClusterAssigner`.
pub struct ClusterTableAdapter {
    table: ClusterTable,
}

impl ClusterTableAdapter {
    pub fn new(table: ClusterTable) -> Self {
        Self { table }
    }

    /// Load the table from disk and wrap it.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        Ok(Self { table: ClusterTable::load_from_path(path)? })
    }

    pub fn table(&self) -> &ClusterTable {
        &self.table
    }
}

impl ClusterAssigner for ClusterTableAdapter {
    fn assign(&self, product: &ProductAggregate) -> Option<i64> {
        self.table.cluster_of(&product.product_id)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
