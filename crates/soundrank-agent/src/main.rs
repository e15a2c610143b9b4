//! soundrank: audio product review ranking
//! Entry point for the command-line binary.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Rank audio products within their categories from labelled reviews.
#[derive(Parser, Debug)]
#[command(name = "soundrank", version, about, long_about = None)]
struct Cli {
    /// Path to config file (overrides SOUNDRANK_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate, score and rank products, then write all output tables
    Run {
        /// Review CSV (product_id/asin, rating, text, sentiment_label)
        #[arg(long)]
        reviews: Option<PathBuf>,

        /// Cluster assignment CSV (product_id/asin, cluster_id/cluster)
        #[arg(long)]
        clusters: Option<PathBuf>,

        /// Output directory (default from config: data/processed)
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long)]
        min_reviews: Option<u32>,

        /// Derive missing sentiment labels from the star rating
        #[arg(long)]
        label_from_rating: bool,

        /// Keep only reviews mentioning a configured audio keyword
        #[arg(long)]
        keywords_filter: bool,
    },

    /// Print a per-category leaderboard from a ranked products table
    Summarize {
        #[arg(long)]
        ranked: PathBuf,
    },

    /// Print category reports from a ranked products table
    Report {
        #[arg(long)]
        ranked: PathBuf,

        /// Only this cluster id
        #[arg(long)]
        category: Option<i64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("soundrank=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "soundrank starting");

    let config = config::Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run { reviews, clusters, out, min_reviews, label_from_rating, keywords_filter } => {
            let mut config = config;
            if let Some(n) = min_reviews {
                config.pipeline.ranking.min_reviews = n;
            }
            config.inputs.label_from_rating |= label_from_rating;
            config.inputs.keywords_filter |= keywords_filter;

            let reviews = reviews
                .or_else(|| config.inputs.reviews.clone())
                .context("no review table given (use --reviews or [inputs] reviews)")?;
            let clusters = clusters
                .or_else(|| config.inputs.clusters.clone())
                .context("no cluster table given (use --clusters or [inputs] clusters)")?;
            let out = out.unwrap_or_else(|| PathBuf::from(&config.pipeline.output.dir));

            commands::run(&config, &reviews, &clusters, &out)?;
        }
        Command::Summarize { ranked } => print!("{}", commands::summarize(&config, &ranked)?),
        Command::Report { ranked, category } => print!("{}", commands::report(&config, &ranked, category)?),
    }
    Ok(())
}
