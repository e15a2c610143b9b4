//! Cluster assignment table.
//!
//! Loads the `product_id → cluster_id` table produced by the external
//! clustering collaborator. Accepted headers: `product_id` or `asin`, and
//! `cluster_id` or `cluster`.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use soundrank_common::SoundrankError;
use tracing::info;

type Result<T> = soundrank_common::Result<T>;

/// In-memory cluster assignments.
#[derive(Debug, Clone, Default)]
pub struct ClusterTable {
    /// Product → cluster id
    assignments: HashMap<String, i64>,
    /// Source file, when loaded from disk
    source_file: Option<PathBuf>,
}

impl ClusterTable {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        Self {
            assignments: pairs.into_iter().map(|(p, c)| (p.into(), c)).collect(),
            source_file: None,
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Loading cluster assignments");
        let file = std::fs::File::open(path)?;
        let mut table = Self::read(file)?;
        table.source_file = Some(path.to_path_buf());
        Ok(table)
    }

    pub fn read<R: Read>(source: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(source);
        let headers = reader.headers()?.clone();

        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let product_idx = find(&["product_id", "asin"]).ok_or_else(|| {
            SoundrankError::schema("cluster table header", "missing required column: product_id")
        })?;
        let cluster_idx = find(&["cluster_id", "cluster"]).ok_or_else(|| {
            SoundrankError::schema("cluster table header", "missing required column: cluster_id")
        })?;

        let mut assignments = HashMap::new();
        for (i, row) in reader.records().enumerate() {
            let row = row?;
            let line = i + 2;
            let context = format!("cluster table line {line}");

            let product_id = row.get(product_idx).map(str::trim).unwrap_or("");
            if product_id.is_empty() {
                return Err(SoundrankError::schema(context, "product_id is empty"));
            }
            let cluster_id: i64 = row
                .get(cluster_idx)
                .and_then(|c| c.trim().parse().ok())
                .ok_or_else(|| SoundrankError::schema(context.clone(), "cluster_id is not an integer"))?;

            if let Some(previous) = assignments.insert(product_id.to_string(), cluster_id) {
                if previous != cluster_id {
                    return Err(SoundrankError::schema(
                        context,
                        format!(
                            "product '{product_id}' assigned to both cluster {previous} and {cluster_id}"
                        ),
                    ));
                }
            }
        }

        info!(n_products = assignments.len(), "Loaded cluster assignments");
        Ok(Self { assignments, source_file: None })
    }

    pub fn cluster_of(&self, product_id: &str) -> Option<i64> {
        self.assignments.get(product_id).copied()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_with_aliases() {
        let csv = "asin,cluster\nB01,0\nB02,3\n";
        let table = ClusterTable::read(csv.as_bytes()).unwrap();
        assert_eq!(table.cluster_of("B01"), Some(0));
        assert_eq!(table.cluster_of("B02"), Some(3));
        assert_eq!(table.cluster_of("B03"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_conflicting_assignment_is_schema_error() {
        let csv = "product_id,cluster_id\nB01,0\nB01,1\n";
        let err = ClusterTable::read(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, SoundrankError::Schema { .. }));
    }

    #[test]
    fn test_repeated_identical_assignment_is_fine() {
        let csv = "product_id,cluster_id\nB01,2\nB01,2\n";
        let table = ClusterTable::read(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_non_integer_cluster_rejected() {
        let csv = "product_id,cluster_id\nB01,two\n";
        assert!(ClusterTable::read(csv.as_bytes()).is_err());
    }
}
