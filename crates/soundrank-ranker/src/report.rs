//! Per-category report context and narrative generation.
//!
//! The context is a small numeric digest of one cluster's ranking. Any prose
//! is produced from it by a [`NarrativeGenerator`]; the crate ships a
//! deterministic one so reports work without a language model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use soundrank_common::{PipelineConfig, RankedProductRow, SoundrankError};
use tracing::{info, warn};

type Result<T> = soundrank_common::Result<T>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProduct {
    pub product_id: String,
    pub cluster_rank: u32,
    pub final_score: f64,
    pub review_count: u32,
    pub avg_rating: f64,
    pub negative_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorstProduct {
    pub product_id: String,
    pub cluster_rank: u32,
    pub final_score: f64,
    pub negative_ratio: f64,
}

/// Numbers a narrative about one category may draw on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportContext {
    pub cluster_id: i64,
    pub category_name: Option<String>,
    pub product_count: usize,
    pub top_products: Vec<TopProduct>,
    pub worst_product: WorstProduct,
}

impl ReportContext {
    pub fn with_category_name(mut self, name: impl Into<String>) -> Self {
        self.category_name = Some(name.into());
        self
    }

    /// Instruction text for an external text generator.
    pub fn to_prompt(&self) -> String {
        let mut products = String::new();
        for p in &self.top_products {
            products.push_str(&format!(
                "Product: {} | Score: {:.3} | Reviews: {} | Avg Rating: {:.2}\n",
                p.product_id, p.final_score, p.review_count, p.avg_rating
            ));
        }
        let w = &self.worst_product;
        format!(
            "You are a professional consumer technology analyst.\n\n\
             Create a complete product recommendation report.\n\n\
             Category ID: {}\n\nTop {} Products:\n{}\nWorst Product:\n\
             Product: {} | Score: {:.3} | Negative Ratio: {:.2}\n\n\
             Write two clearly labeled sections:\n\n\
             SECTION 1 - Executive Brief (bullet points, concise)\n\n\
             SECTION 2 - Blog Article (engaging, structured, buying advice)",
            self.cluster_id,
            self.top_products.len(),
            products,
            w.product_id,
            w.final_score,
            w.negative_ratio,
        )
    }
}

/// Build the context for `cluster_id` from ranked rows of any clusters.
///
/// Rows are ordered by `cluster_rank`, then `product_id`. A rank of 0 means the
/// row was never ranked and is rejected.
pub fn build_report_context(
    cluster_id: i64,
    rows: &[RankedProductRow],
    top_n: usize,
) -> Result<ReportContext> {
    let mut members: Vec<&RankedProductRow> = rows.iter().filter(|r| r.cluster_id == cluster_id).collect();
    if let Some(r) = members.iter().find(|r| r.cluster_rank == 0) {
        return Err(SoundrankError::schema(
            format!("product '{}'", r.product_id),
            "cluster_rank is missing",
        ));
    }
    members.sort_by(|a, b| {
        a.cluster_rank
            .cmp(&b.cluster_rank)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });

    let worst = members.last().ok_or(SoundrankError::EmptyInput { stage: "report" })?;
    let worst_product = WorstProduct {
        product_id: worst.product_id.clone(),
        cluster_rank: worst.cluster_rank,
        final_score: worst.final_score,
        negative_ratio: worst.negative_ratio,
    };

    let top_products = members
        .iter()
        .take(top_n)
        .map(|r| TopProduct {
            product_id: r.product_id.clone(),
            cluster_rank: r.cluster_rank,
            final_score: r.final_score,
            review_count: r.review_count,
            avg_rating: r.avg_rating,
            negative_ratio: r.negative_ratio,
        })
        .collect();

    Ok(ReportContext {
        cluster_id,
        category_name: None,
        product_count: members.len(),
        top_products,
        worst_product,
    })
}

// ── Narrative generation ─────────────────────────────────────────────────────

/// Turns a report context into prose.
pub trait NarrativeGenerator: Send + Sync {
    fn generate(&self, context: &ReportContext) -> Result<String>;

    fn name(&self) -> &str;
}

/// Deterministic executive brief built only from the numbers in the context.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredBriefGenerator;

impl NarrativeGenerator for StructuredBriefGenerator {
    fn generate(&self, ctx: &ReportContext) -> Result<String> {
        let title = ctx
            .category_name
            .clone()
            .unwrap_or_else(|| format!("Category {}", ctx.cluster_id));
        let mut out = format!("SECTION 1 - Executive Brief: {title}\n\n");
        out.push_str(&format!("- Products ranked: {}\n", ctx.product_count));

        for p in &ctx.top_products {
            out.push_str(&format!(
                "- #{} {}: score {:.3}, {} reviews, avg rating {:.2}, {:.0}% negative\n",
                p.cluster_rank,
                p.product_id,
                p.final_score,
                p.review_count,
                p.avg_rating,
                p.negative_ratio * 100.0,
            ));
        }

        let w = &ctx.worst_product;
        if ctx.product_count > 1 {
            out.push_str(&format!(
                "- Avoid: {} (rank {}), score {:.3}, {:.0}% negative\n",
                w.product_id,
                w.cluster_rank,
                w.final_score,
                w.negative_ratio * 100.0,
            ));
        }

        if let Some(best) = ctx.top_products.first() {
            out.push_str(&format!(
                "\nSECTION 2 - Buying Advice\n\n{} leads this category with a score of {:.3} across {} reviews.",
                best.product_id, best.final_score, best.review_count
            ));
            if ctx.product_count > 1 {
                out.push_str(&format!(
                    " {} trails with {:.0}% negative reviews.",
                    w.product_id,
                    w.negative_ratio * 100.0
                ));
            }
            out.push('\n');
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "structured-brief"
    }
}

/// Render one `CATEGORY {id} REPORT` block per cluster, clusters ascending.
pub fn render_reports(
    rows: &[RankedProductRow],
    generator: &dyn NarrativeGenerator,
    config: &PipelineConfig,
) -> Result<String> {
    if rows.is_empty() {
        return Err(SoundrankError::EmptyInput { stage: "report" });
    }
    let clusters: BTreeSet<i64> = rows.iter().map(|r| r.cluster_id).collect();
    let rule = "====================================";

    let mut out = String::new();
    for &cluster_id in &clusters {
        let ctx = build_report_context(cluster_id, rows, config.report.top_n)?
            .with_category_name(config.category_name(cluster_id));
        let body = generator.generate(&ctx).map_err(|e| {
            warn!(cluster_id, generator = generator.name(), error = %e, "Narrative generation failed");
            e
        })?;
        out.push_str(&format!("\n{rule}\nCATEGORY {cluster_id} REPORT\n{rule}\n\n{body}\n\n"));
    }

    info!(n_clusters = clusters.len(), generator = generator.name(), "Rendered category reports");
    Ok(out)
}
