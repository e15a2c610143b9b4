//! Configuration loading for soundrank.
//! Reads soundrank.toml from the current directory or path in SOUNDRANK_CONFIG env var.

use serde::{Deserialize, Serialize};
use soundrank_common::PipelineConfig;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "SOUNDRANK_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "soundrank.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub inputs: InputsConfig,

    /// Pipeline sections (`[ranking]`, `[report]`, `[categories]`, ...) live at top level.
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
}

/// Default input locations, overridable on the command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputsConfig {
    pub reviews: Option<PathBuf>,
    pub clusters: Option<PathBuf>,
    #[serde(default)]
    pub label_from_rating: bool,
    #[serde(default)]
    pub keywords_filter: bool,
}

impl Config {
    /// Resolve the config path: explicit argument, then SOUNDRANK_CONFIG, then ./soundrank.toml.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(p) => p.to_path_buf(),
            None => std::env::var(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE)),
        }
    }

    /// Load configuration, falling back to defaults when no file exists.
    /// A file that exists but does not parse is an error.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = Self::resolve_path(explicit);
        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found; using defaults. Copy soundrank.example.toml to soundrank.toml to customise."
            );
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        tracing::info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.pipeline.validate()?;
        Ok(config)
    }
}
