//! Pipeline configuration.
//!
//! Every stage receives its settings from this structure instead of reading
//! process-wide constants, so each stage can be exercised with synthetic input.
//! Loadable from YAML, JSON or TOML.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, SoundrankError};

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Category filter and scoring
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Review pre-filtering
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,

    /// Settings handed to the external clustering collaborator
    #[serde(default)]
    pub clustering: ClusteringConfig,

    /// Cluster keyword extraction
    #[serde(default)]
    pub interpretation: InterpretationConfig,

    /// Sentiment label agreement check
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Report context options
    #[serde(default)]
    pub report: ReportConfig,

    /// Output options
    #[serde(default)]
    pub output: OutputConfig,

    /// Human-friendly category names keyed by cluster id (TOML keys are strings)
    #[serde(default = "default_categories")]
    pub categories: BTreeMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ranking: RankingConfig::default(),
            preprocessing: PreprocessingConfig::default(),
            clustering: ClusteringConfig::default(),
            interpretation: InterpretationConfig::default(),
            evaluation: EvaluationConfig::default(),
            report: ReportConfig::default(),
            output: OutputConfig::default(),
            categories: default_categories(),
        }
    }
}

// ── Ranking ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Products with fewer reviews are dropped before scoring
    #[serde(default = "default_min_reviews")]
    pub min_reviews: u32,
}

fn default_min_reviews() -> u32 { 3 }

impl Default for RankingConfig {
    fn default() -> Self {
        Self { min_reviews: default_min_reviews() }
    }
}

// ── Preprocessing ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Keep only reviews whose text mentions one of these keywords
    #[serde(default = "default_audio_keywords")]
    pub audio_keywords: Vec<String>,

    /// Upper bound on reviews read from the input file (0 = no limit)
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

fn default_audio_keywords() -> Vec<String> {
    [
        "headphone", "earbud", "speaker", "bluetooth", "soundbar", "microphone",
        "audio", "turntable", "subwoofer", "amp", "receiver",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_sample_size() -> usize { 50_000 }

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            audio_keywords: default_audio_keywords(),
            sample_size: default_sample_size(),
        }
    }
}

// ── Clustering ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    #[serde(default = "default_n_clusters")]
    pub n_clusters: usize,

    #[serde(default = "default_random_state")]
    pub random_state: u64,
}

fn default_n_clusters() -> usize { 5 }
fn default_random_state() -> u64 { 42 }

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            n_clusters: default_n_clusters(),
            random_state: default_random_state(),
        }
    }
}

// ── Interpretation ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpretationConfig {
    /// Vocabulary size per cluster (most frequent terms)
    #[serde(default = "default_max_features")]
    pub max_features: usize,

    /// Keywords reported per cluster
    #[serde(default = "default_top_keywords")]
    pub top_keywords: usize,

    /// Representative products listed per cluster
    #[serde(default = "default_representatives")]
    pub representative_products: usize,
}

fn default_max_features() -> usize { 20 }
fn default_top_keywords() -> usize { 10 }
fn default_representatives() -> usize { 3 }

impl Default for InterpretationConfig {
    fn default() -> Self {
        Self {
            max_features: default_max_features(),
            top_keywords: default_top_keywords(),
            representative_products: default_representatives(),
        }
    }
}

// ── Evaluation ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Reviews sampled when comparing supplied labels with the star mapping
    /// (0 = skip the check)
    #[serde(default = "default_evaluation_sample")]
    pub sample_size: usize,

    #[serde(default = "default_evaluation_seed")]
    pub seed: u64,
}

fn default_evaluation_sample() -> usize { 2000 }
fn default_evaluation_seed() -> u64 { 42 }

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            sample_size: default_evaluation_sample(),
            seed: default_evaluation_seed(),
        }
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Number of top products included in each category context
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_top_n() -> usize { 3 }

impl Default for ReportConfig {
    fn default() -> Self {
        Self { top_n: default_top_n() }
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving products.csv, ranked_products.csv and summaries
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

fn default_output_dir() -> String { "data/processed".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: default_output_dir() }
    }
}

fn default_categories() -> BTreeMap<String, String> {
    [
        ("0", "Portable Bluetooth Speakers"),
        ("1", "Car Audio & Radio Devices"),
        ("2", "Home / TV Speaker Systems"),
        ("3", "Headphones & Earbuds"),
        ("4", "Smart Speakers (Alexa / Echo)"),
    ]
    .iter()
    .map(|(id, name)| (id.to_string(), name.to_string()))
    .collect()
}

// ── Helper Methods ─────────────────────────────────────────────────────────────

impl PipelineConfig {
    /// Load from YAML file
    pub fn from_yaml(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load from JSON file
    pub fn from_json(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load from TOML file
    pub fn from_toml(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.ranking.min_reviews == 0 {
            return Err(SoundrankError::Config(
                "ranking.min_reviews must be at least 1".to_string(),
            ));
        }
        if self.report.top_n == 0 {
            return Err(SoundrankError::Config("report.top_n must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Display name for a cluster, falling back to "Category {id}".
    pub fn category_name(&self, cluster_id: i64) -> String {
        self.categories
            .get(&cluster_id.to_string())
            .cloned()
            .unwrap_or_else(|| format!("Category {cluster_id}"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
