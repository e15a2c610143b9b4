//! Persistence of the terminal pipeline tables.
//!
//! Every file is written to a temporary sibling and renamed into place, so a
//! failed run never leaves a half-written table behind for consumers.
//! [`write_run`] stages every artifact of a run before renaming any of them.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soundrank_common::{ProductAggregate, RankedProductRow, ReviewRecord, ScoredProduct, SoundrankError};
use tempfile::NamedTempFile;
use tracing::info;
use uuid::Uuid;

use crate::sentiment::EvaluatedReview;

type Result<T> = soundrank_common::Result<T>;

pub const PRODUCTS_FILE: &str = "products.csv";
pub const RANKED_PRODUCTS_FILE: &str = "ranked_products.csv";
pub const CLUSTER_SUMMARY_FILE: &str = "cluster_summary.txt";
pub const REPORTS_FILE: &str = "generated_reports.txt";
pub const MANIFEST_FILE: &str = "run_manifest.json";
pub const CLEAN_REVIEWS_FILE: &str = "clean_reviews.csv";
pub const EVALUATION_SAMPLE_FILE: &str = "sentiment_evaluation_sample.csv";

/// Metadata describing one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub min_reviews: u32,
    pub review_count: usize,
    pub product_count: usize,
    pub ranked_count: usize,
    pub cluster_count: usize,
    pub prior_mean: f64,
    pub shrinkage_strength: f64,
    /// Share of sampled supplied labels matching the star mapping
    #[serde(default)]
    pub label_accuracy: Option<f64>,
}

/// A fully written temporary file waiting to be renamed over its target.
#[derive(Debug)]
struct StagedFile {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    fn commit(self) -> Result<PathBuf> {
        self.tmp.persist(&self.target).map_err(|e| SoundrankError::Io(e.error))?;
        info!(path = %self.target.display(), "Saved output file");
        Ok(self.target)
    }
}

/// Write `dir/name` into a temporary file in the same directory.
fn stage(dir: &Path, name: &str, write: impl FnOnce(&mut NamedTempFile) -> Result<()>) -> Result<StagedFile> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    write(&mut tmp)?;
    tmp.as_file().sync_all()?;
    Ok(StagedFile { tmp, target: dir.join(name) })
}

/// Write `dir/name` through a temporary file in the same directory.
fn write_atomic(dir: &Path, name: &str, write: impl FnOnce(&mut NamedTempFile) -> Result<()>) -> Result<PathBuf> {
    stage(dir, name, write)?.commit()
}

fn write_csv<T: Serialize>(tmp: &mut NamedTempFile, records: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(tmp);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Save the product-level aggregate table.
pub fn write_products(dir: &Path, aggregates: &[ProductAggregate]) -> Result<PathBuf> {
    write_atomic(dir, PRODUCTS_FILE, |tmp| write_csv(tmp, aggregates))
}

/// Save the ranked table. Rows are converted before anything touches disk, so
/// an unranked product aborts the write with a schema error.
pub fn write_ranked_products(dir: &Path, ranked: &[ScoredProduct]) -> Result<PathBuf> {
    let rows = ranked
        .iter()
        .map(RankedProductRow::try_from)
        .collect::<Result<Vec<_>>>()?;

    write_atomic(dir, RANKED_PRODUCTS_FILE, |tmp| write_csv(tmp, &rows))
}

/// Save the filtered, labelled review table. It reloads with
/// [`crate::reviews::load_reviews`].
pub fn write_reviews(dir: &Path, reviews: &[ReviewRecord]) -> Result<PathBuf> {
    write_atomic(dir, CLEAN_REVIEWS_FILE, |tmp| write_csv(tmp, reviews))
}

// ── Whole-run output ───────────────────────────────────────────────────────

/// Every file one `run` produces, computed before anything is written.
#[derive(Debug)]
pub struct RunArtifacts<'a> {
    pub reviews: &'a [ReviewRecord],
    pub aggregates: &'a [ProductAggregate],
    pub ranked_rows: &'a [RankedProductRow],
    pub cluster_summary: &'a str,
    pub reports: &'a str,
    pub evaluation_sample: Option<&'a [EvaluatedReview]>,
    pub manifest: &'a RunManifest,
}

/// Write all artifacts of a run into `dir`.
///
/// Each file is staged first; targets are only replaced once every file has
/// been written, so a failure while writing leaves the previous run's files
/// untouched. The manifest is renamed last.
pub fn write_run(dir: &Path, artifacts: &RunArtifacts<'_>) -> Result<Vec<PathBuf>> {
    let mut staged = vec![
        stage(dir, CLEAN_REVIEWS_FILE, |tmp| write_csv(tmp, artifacts.reviews))?,
        stage(dir, PRODUCTS_FILE, |tmp| write_csv(tmp, artifacts.aggregates))?,
        stage(dir, RANKED_PRODUCTS_FILE, |tmp| write_csv(tmp, artifacts.ranked_rows))?,
        stage(dir, CLUSTER_SUMMARY_FILE, |tmp| {
            tmp.write_all(artifacts.cluster_summary.as_bytes())?;
            Ok(())
        })?,
        stage(dir, REPORTS_FILE, |tmp| {
            tmp.write_all(artifacts.reports.as_bytes())?;
            Ok(())
        })?,
    ];
    if let Some(sample) = artifacts.evaluation_sample {
        staged.push(stage(dir, EVALUATION_SAMPLE_FILE, |tmp| write_csv(tmp, sample))?);
    }
    staged.push(stage(dir, MANIFEST_FILE, |tmp| {
        serde_json::to_writer_pretty(tmp, artifacts.manifest)?;
        Ok(())
    })?);

    let paths = staged.into_iter().map(StagedFile::commit).collect::<Result<Vec<_>>>()?;
    info!(dir = %dir.display(), n_files = paths.len(), run_id = %artifacts.manifest.run_id, "Run output written");
    Ok(paths)
}

pub fn read_manifest(path: &Path) -> Result<RunManifest> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

/// Read `ranked_products.csv` back, checking the full column contract first.
/// Every missing column is reported, not just the first.
pub fn read_ranked_products(path: &Path) -> Result<Vec<RankedProductRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let missing: Vec<&str> = RankedProductRow::COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h.trim() == *col))
        .collect();
    if !missing.is_empty() {
        return Err(SoundrankError::schema(
            path.display().to_string(),
            format!("missing required columns: {}", missing.join(", ")),
        ));
    }

    let mut rows = Vec::new();
    for (i, row) in reader.deserialize::<RankedProductRow>().enumerate() {
        let row = row.map_err(|e| {
            SoundrankError::schema(format!("{} line {}", path.display(), i + 2), e.to_string())
        })?;
        rows.push(row);
    }
    info!(path = %path.display(), n_rows = rows.len(), "Loaded ranked products");
    Ok(rows)
}
