//! Subcommand bodies. `main` only parses arguments and prints.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use soundrank_common::RankedProductRow;
use soundrank_ingestion::output::{read_ranked_products, write_run, RunArtifacts, RunManifest};
use soundrank_ingestion::preprocess::filter_by_keywords;
use soundrank_ingestion::reviews::{load_reviews, LoadOptions};
use soundrank_ingestion::sentiment::{evaluate_labels, SentimentLabeler, StarRatingLabeler};
use soundrank_ranker::cluster_provider::ClusterTableAdapter;
use soundrank_ranker::interpret::{interpret_clusters, render_cluster_summaries};
use soundrank_ranker::pipeline::run_pipeline;
use soundrank_ranker::report::{build_report_context, render_reports, NarrativeGenerator, StructuredBriefGenerator};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;

/// Load, rank, interpret and report, then write every output file.
///
/// All artifacts are built in memory first; nothing under `out` changes
/// unless every stage succeeded.
pub fn run(config: &Config, reviews_path: &Path, clusters_path: &Path, out: &Path) -> Result<RunManifest> {
    let pipeline_config = &config.pipeline;
    let labeler = StarRatingLabeler;
    let options = LoadOptions {
        labeler: config.inputs.label_from_rating.then_some(&labeler as &dyn SentimentLabeler),
        sample_size: pipeline_config.preprocessing.sample_size,
    };

    let mut reviews = load_reviews(reviews_path, &options)
        .with_context(|| format!("loading reviews from {}", reviews_path.display()))?;
    if config.inputs.keywords_filter {
        reviews = filter_by_keywords(reviews, &pipeline_config.preprocessing.audio_keywords);
    }

    // Labels derived from the star mapping would agree with it trivially.
    let evaluation = if config.inputs.label_from_rating || pipeline_config.evaluation.sample_size == 0 {
        None
    } else {
        let evaluation = evaluate_labels(
            &reviews,
            &labeler,
            pipeline_config.evaluation.sample_size,
            pipeline_config.evaluation.seed,
        )?;
        for m in &evaluation.per_label {
            info!(
                label = m.label.as_str(),
                precision = m.precision,
                recall = m.recall,
                f1 = m.f1,
                support = m.support,
                "Sentiment label agreement"
            );
        }
        debug!(confusion = ?evaluation.confusion, "Sentiment confusion matrix\n{}", evaluation.render());
        Some(evaluation)
    };

    let assigner = ClusterTableAdapter::load(clusters_path)
        .with_context(|| format!("loading clusters from {}", clusters_path.display()))?;
    info!(n_assignments = assigner.table().len(), "Cluster table ready");

    let output = run_pipeline(&reviews, &assigner, pipeline_config)?;

    let rows = output
        .ranked
        .iter()
        .map(RankedProductRow::try_from)
        .collect::<soundrank_common::Result<Vec<_>>>()?;
    let summaries = interpret_clusters(&output.ranked, &pipeline_config.interpretation)?;
    let cluster_summary = render_cluster_summaries(&summaries);
    let reports = render_reports(&rows, &StructuredBriefGenerator, pipeline_config)?;

    let manifest = RunManifest {
        run_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        min_reviews: pipeline_config.ranking.min_reviews,
        review_count: reviews.len(),
        product_count: output.aggregates.len(),
        ranked_count: output.ranked.len(),
        cluster_count: output.cluster_ids().len(),
        prior_mean: output.summary.prior_mean,
        shrinkage_strength: output.summary.shrinkage_strength,
        label_accuracy: evaluation.as_ref().map(|e| e.accuracy),
    };

    write_run(
        out,
        &RunArtifacts {
            reviews: &reviews,
            aggregates: &output.aggregates,
            ranked_rows: &rows,
            cluster_summary: &cluster_summary,
            reports: &reports,
            evaluation_sample: evaluation.as_ref().map(|e| e.sample.as_slice()),
            manifest: &manifest,
        },
    )
    .with_context(|| format!("writing output to {}", out.display()))?;

    info!(
        run_id = %manifest.run_id,
        out = %out.display(),
        n_ranked = manifest.ranked_count,
        "Run complete"
    );
    Ok(manifest)
}

/// Per-category leaderboard text for a ranked products table.
pub fn summarize(config: &Config, ranked: &Path) -> Result<String> {
    let rows = read_ranked_products(ranked)
        .with_context(|| format!("reading {}", ranked.display()))?;
    let mut cluster_ids: Vec<i64> = rows.iter().map(|r| r.cluster_id).collect();
    cluster_ids.sort_unstable();
    cluster_ids.dedup();

    let mut out = String::new();
    for cluster_id in cluster_ids {
        let ctx = build_report_context(cluster_id, &rows, config.pipeline.report.top_n)?;
        out.push_str(&format!(
            "{} (cluster {cluster_id}, {} products)\n",
            config.pipeline.category_name(cluster_id),
            ctx.product_count
        ));
        for p in &ctx.top_products {
            out.push_str(&format!(
                "  {:>3}. {:<14} score {:.3}  rating {:.2}  reviews {:>5}  negative {:.0}%\n",
                p.cluster_rank,
                p.product_id,
                p.final_score,
                p.avg_rating,
                p.review_count,
                p.negative_ratio * 100.0
            ));
        }
        out.push('\n');
    }
    Ok(out)
}

/// Category reports for one cluster, or for all of them.
pub fn report(config: &Config, ranked: &Path, category: Option<i64>) -> Result<String> {
    let rows = read_ranked_products(ranked)
        .with_context(|| format!("reading {}", ranked.display()))?;
    let generator = StructuredBriefGenerator;

    match category {
        Some(cluster_id) => {
            let ctx = build_report_context(cluster_id, &rows, config.pipeline.report.top_n)?
                .with_category_name(config.pipeline.category_name(cluster_id));
            Ok(format!("{}\n", generator.generate(&ctx)?))
        }
        None => Ok(render_reports(&rows, &generator, &config.pipeline)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundrank_ingestion::output::{
        read_manifest, CLEAN_REVIEWS_FILE, CLUSTER_SUMMARY_FILE, EVALUATION_SAMPLE_FILE, MANIFEST_FILE,
        PRODUCTS_FILE, RANKED_PRODUCTS_FILE, REPORTS_FILE,
    };
    use std::path::PathBuf;

    const REVIEWS: &str = "product_id,rating,sentiment_label,text\n\
        A,5,positive,great speaker bass\n\
        A,4,positive,loud speaker\n\
        A,5,positive,speaker battery lasts\n\
        B,2,negative,speaker crackles\n\
        B,3,positive,speaker is fine\n\
        B,1,positive,speaker died\n\
        C,5,positive,lonely speaker\n\
        D,4,positive,earbuds fit well\n\
        D,5,positive,earbuds sound clear\n\
        D,1,negative,earbuds broke\n\
        D,4,positive,earbuds case\n";

    const CLUSTERS: &str = "asin,cluster\nA,0\nB,0\nC,0\nD,3\n";

    fn fixtures(dir: &Path, clusters: &str) -> (PathBuf, PathBuf) {
        let reviews = dir.join("reviews.csv");
        let cluster_file = dir.join("clusters.csv");
        std::fs::write(&reviews, REVIEWS).unwrap();
        std::fs::write(&cluster_file, clusters).unwrap();
        (reviews, cluster_file)
    }

    #[test]
    fn test_run_writes_all_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let (reviews, clusters) = fixtures(dir.path(), CLUSTERS);
        let out = dir.path().join("out");

        let manifest = run(&Config::default(), &reviews, &clusters, &out).unwrap();
        assert_eq!(manifest.review_count, 11);
        assert_eq!(manifest.product_count, 4);
        assert_eq!(manifest.ranked_count, 3);
        assert_eq!(manifest.cluster_count, 2);
        // B's 1-star review is labelled positive: 10 of 11 agree.
        let accuracy = manifest.label_accuracy.unwrap();
        assert!((accuracy - 10.0 / 11.0).abs() < 1e-12);

        for name in [
            CLEAN_REVIEWS_FILE,
            PRODUCTS_FILE,
            RANKED_PRODUCTS_FILE,
            CLUSTER_SUMMARY_FILE,
            REPORTS_FILE,
            EVALUATION_SAMPLE_FILE,
            MANIFEST_FILE,
        ] {
            assert!(out.join(name).exists(), "{name} missing");
        }
        let on_disk = read_manifest(&out.join(MANIFEST_FILE)).unwrap();
        assert_eq!(on_disk.run_id, manifest.run_id);

        let ranked = read_ranked_products(&out.join(RANKED_PRODUCTS_FILE)).unwrap();
        let ids: Vec<&str> = ranked.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "D"]);
        assert_eq!(ranked[0].cluster_rank, 1);
        assert_eq!(ranked[1].cluster_rank, 2);
        assert_eq!(ranked[2].cluster_rank, 1);

        let reports = std::fs::read_to_string(out.join(REPORTS_FILE)).unwrap();
        assert!(reports.contains("CATEGORY 0 REPORT"));
        assert!(reports.contains("Headphones & Earbuds"));

        let leaderboard = summarize(&Config::default(), &out.join(RANKED_PRODUCTS_FILE)).unwrap();
        assert!(leaderboard.starts_with("Portable Bluetooth Speakers (cluster 0, 2 products)"));
        let one = report(&Config::default(), &out.join(RANKED_PRODUCTS_FILE), Some(3)).unwrap();
        assert!(one.contains("Executive Brief: Headphones & Earbuds"));
    }

    #[test]
    fn test_labels_from_rating_skip_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let (reviews, clusters) = fixtures(dir.path(), CLUSTERS);
        let out = dir.path().join("out");
        let mut config = Config::default();
        config.inputs.label_from_rating = true;

        let manifest = run(&config, &reviews, &clusters, &out).unwrap();
        assert_eq!(manifest.label_accuracy, None);
        assert!(!out.join(EVALUATION_SAMPLE_FILE).exists());
    }

    #[test]
    fn test_failed_run_keeps_previous_outputs() {
        let dir = tempfile::tempdir().unwrap();
        // D has no cluster, so the join fails after loading succeeded.
        let (reviews, clusters) = fixtures(dir.path(), "asin,cluster\nA,0\nB,0\nC,0\n");
        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join(REPORTS_FILE), "previous reports").unwrap();

        assert!(run(&Config::default(), &reviews, &clusters, &out).is_err());

        let names: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![REPORTS_FILE.to_string()]);
        assert_eq!(std::fs::read_to_string(out.join(REPORTS_FILE)).unwrap(), "previous reports");
    }
}
