//! Cluster interpretation: TF-IDF keywords and representative products.
//!
//! Each cluster is treated as its own corpus, one document per product
//! (`combined_text`). Scores use raw term counts, smooth idf
//! `ln((1 + n) / (1 + df)) + 1` and L2-normalised rows; a term's cluster score
//! is its mean over all documents.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use soundrank_common::pipeline_config::InterpretationConfig;
use soundrank_common::{ScoredProduct, SoundrankError};
use tracing::{debug, info};

type Result<T> = soundrank_common::Result<T>;

/// English stop words, as used by scikit-learn's `TfidfVectorizer`.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can", "cannot",
    "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do", "done",
    "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else", "elsewhere",
    "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything", "everywhere",
    "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five", "for", "former",
    "formerly", "forty", "found", "four", "from", "front", "full", "further", "get", "give", "go",
    "had", "has", "hasnt", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein",
    "hereupon", "hers", "herself", "him", "himself", "his", "how", "however", "hundred", "i", "ie",
    "if", "in", "inc", "indeed", "interest", "into", "is", "it", "its", "itself", "keep", "last",
    "latter", "latterly", "least", "less", "ltd", "made", "many", "may", "me", "meanwhile",
    "might", "mill", "mine", "more", "moreover", "most", "mostly", "move", "much", "must", "my",
    "myself", "name", "namely", "neither", "never", "nevertheless", "next", "nine", "no", "nobody",
    "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once",
    "one", "only", "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out",
    "over", "own", "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see",
    "seem", "seemed", "seeming", "seems", "serious", "several", "she", "should", "show", "side",
    "since", "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something",
    "sometime", "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that",
    "the", "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together", "too",
    "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up", "upon",
    "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "whence",
    "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever",
    "whether", "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why",
    "will", "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "yourselves",
];

/// A product listed as typical of its cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representative {
    pub product_id: String,
    pub review_count: u32,
}

/// Human-readable description of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_id: i64,
    pub product_count: usize,
    pub top_keywords: Vec<String>,
    pub representative_products: Vec<Representative>,
}

struct Tokenizer {
    word: Regex,
    stop_words: HashSet<&'static str>,
}

impl Tokenizer {
    fn new() -> Result<Self> {
        let word = Regex::new(r"\b\w\w+\b")
            .map_err(|e| SoundrankError::Other(anyhow::anyhow!("token pattern: {e}")))?;
        Ok(Self {
            word,
            stop_words: ENGLISH_STOP_WORDS.iter().copied().collect(),
        })
    }

    fn tokens(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.word
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(*t))
            .map(str::to_string)
            .collect()
    }
}

/// Summarise every cluster present in `products`, clusters ascending.
pub fn interpret_clusters(
    products: &[ScoredProduct],
    options: &InterpretationConfig,
) -> Result<Vec<ClusterSummary>> {
    if products.is_empty() {
        return Err(SoundrankError::EmptyInput { stage: "interpret" });
    }
    let tokenizer = Tokenizer::new()?;

    let mut clusters: BTreeMap<i64, Vec<&ScoredProduct>> = BTreeMap::new();
    for p in products {
        clusters.entry(p.cluster_id).or_default().push(p);
    }

    let summaries: Vec<ClusterSummary> = clusters
        .into_iter()
        .map(|(cluster_id, members)| {
            let docs: Vec<Vec<String>> = members
                .iter()
                .map(|p| tokenizer.tokens(&p.aggregate.combined_text))
                .collect();
            let top_keywords = top_terms(&docs, options.max_features, options.top_keywords);
            debug!(cluster_id, keywords = ?top_keywords, "Extracted cluster keywords");

            ClusterSummary {
                cluster_id,
                product_count: members.len(),
                top_keywords,
                representative_products: representatives(&members, options.representative_products),
            }
        })
        .collect();

    info!(n_clusters = summaries.len(), "Interpreted clusters");
    Ok(summaries)
}

/// Highest mean TF-IDF terms; ties go to the alphabetically first term.
pub fn top_terms(docs: &[Vec<String>], max_features: usize, top_k: usize) -> Vec<String> {
    let n_docs = docs.len();
    if n_docs == 0 {
        return Vec::new();
    }

    // ── Vocabulary: most frequent terms over the whole cluster ──
    let mut corpus_counts: HashMap<&str, usize> = HashMap::new();
    for doc in docs {
        for t in doc {
            *corpus_counts.entry(t.as_str()).or_default() += 1;
        }
    }
    let mut by_frequency: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
    by_frequency.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    by_frequency.truncate(max_features);
    let vocab: Vec<&str> = by_frequency.into_iter().map(|(t, _)| t).collect();
    let index: HashMap<&str, usize> = vocab.iter().enumerate().map(|(i, t)| (*t, i)).collect();

    // ── Term counts per document ──
    let counts: Vec<Vec<f64>> = docs
        .iter()
        .map(|doc| {
            let mut row = vec![0.0; vocab.len()];
            for t in doc {
                if let Some(&i) = index.get(t.as_str()) {
                    row[i] += 1.0;
                }
            }
            row
        })
        .collect();

    let idf: Vec<f64> = (0..vocab.len())
        .map(|i| {
            let df = counts.iter().filter(|row| row[i] > 0.0).count() as f64;
            ((1.0 + n_docs as f64) / (1.0 + df)).ln() + 1.0
        })
        .collect();

    let mut mean_scores = vec![0.0; vocab.len()];
    for row in &counts {
        let weighted: Vec<f64> = row.iter().zip(&idf).map(|(c, w)| c * w).collect();
        let norm = weighted.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (acc, x) in mean_scores.iter_mut().zip(&weighted) {
                *acc += x / norm;
            }
        }
    }
    for s in &mut mean_scores {
        *s /= n_docs as f64;
    }

    let mut ranked: Vec<(&str, f64)> = vocab.into_iter().zip(mean_scores).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.into_iter().take(top_k).map(|(t, _)| t.to_string()).collect()
}

fn representatives(members: &[&ScoredProduct], n: usize) -> Vec<Representative> {
    let mut sorted: Vec<&&ScoredProduct> = members.iter().collect();
    sorted.sort_by(|a, b| {
        b.aggregate
            .review_count
            .cmp(&a.aggregate.review_count)
            .then_with(|| a.product_id().cmp(b.product_id()))
    });
    sorted
        .into_iter()
        .take(n)
        .map(|p| Representative {
            product_id: p.product_id().to_string(),
            review_count: p.aggregate.review_count,
        })
        .collect()
}

/// Text written to `cluster_summary.txt`.
pub fn render_cluster_summaries(summaries: &[ClusterSummary]) -> String {
    let rule = "===============================";
    let mut out = String::new();
    for s in summaries {
        out.push_str(&format!(
            "\n{rule}\nCluster {}\n{rule}\nNumber of Products: {}\n\nTop Keywords:\n{}\n\n\
             Representative Products (product_id + review_count):\n",
            s.cluster_id,
            s.product_count,
            s.top_keywords.join(", "),
        ));
        for r in &s.representative_products {
            out.push_str(&format!("- {} ({} reviews)\n", r.product_id, r.review_count));
        }
    }
    out
}
