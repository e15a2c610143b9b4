//! File-level ingestion: review and cluster tables in, persisted tables out.
//!
//! Run with: cargo test --package soundrank-ingestion --test test_load_and_persist

use soundrank_common::{ScoredProduct, SentimentLabel, SoundrankError};
use soundrank_ingestion::clusters::ClusterTable;
use soundrank_ingestion::output::{
    read_ranked_products, write_products, write_ranked_products, RANKED_PRODUCTS_FILE,
};
use soundrank_ingestion::preprocess::filter_by_keywords;
use soundrank_ingestion::reviews::{load_reviews, LoadOptions};
use soundrank_ingestion::sentiment::StarRatingLabeler;
use soundrank_test_utils::pretty_assertions::assert_eq;
use soundrank_test_utils::{aggregate, write_fixture};

const REVIEWS: &str = "\
asin,rating,text,title,sentiment_label
B01,5.0,Great bluetooth speaker,Boom Mini,POSITIVE
B01,2,Speaker died after a week,,NEGATIVE
B02,4,Comfortable earbuds,Buds,POSITIVE
B03,1,Phone case cracked,,NEGATIVE
";

#[test]
fn test_load_filter_and_label() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "reviews.csv", REVIEWS).unwrap();

    let reviews = load_reviews(&path, &LoadOptions::default()).unwrap();
    assert_eq!(reviews.len(), 4);
    assert_eq!(reviews[0].product_id, "B01");
    assert_eq!(reviews[0].rating, 5);
    assert_eq!(reviews[1].sentiment_label, SentimentLabel::Negative);

    let keywords = vec!["speaker".to_string(), "earbud".to_string()];
    let audio = filter_by_keywords(reviews, &keywords);
    let ids: Vec<&str> = audio.iter().map(|r| r.product_id.as_str()).collect();
    assert_eq!(ids, vec!["B01", "B01", "B02"]);
}

#[test]
fn test_labeler_fills_missing_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        dir.path(),
        "unlabelled.csv",
        "product_id,rating,text\nA,1,bad\nA,4,good\n",
    )
    .unwrap();

    let err = load_reviews(&path, &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, SoundrankError::Schema { .. }));

    let labeler = StarRatingLabeler;
    let options = LoadOptions { labeler: Some(&labeler), sample_size: 0 };
    let reviews = load_reviews(&path, &options).unwrap();
    assert_eq!(reviews[0].sentiment_label, SentimentLabel::Negative);
    assert_eq!(reviews[1].sentiment_label, SentimentLabel::Positive);
}

#[test]
fn test_cluster_table_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(dir.path(), "clusters.csv", "asin,cluster\nB01,0\nB02,3\n").unwrap();
    let table = ClusterTable::load_from_path(&path).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.cluster_of("B02"), Some(3));
    assert_eq!(table.source_file(), Some(path.as_path()));
}

#[test]
fn test_persist_and_read_back_ranked_products() {
    let dir = tempfile::tempdir().unwrap();
    let ranked: Vec<ScoredProduct> = [("B01", 1u32, 3.6), ("B02", 2, 2.1)]
        .iter()
        .map(|&(pid, rank, score)| ScoredProduct {
            aggregate: aggregate(pid, 10, 4.0, 0.1),
            cluster_id: 0,
            bayesian_rating: score / 0.9,
            sentiment_penalty: 0.9,
            final_score: score,
            cluster_rank: Some(rank),
        })
        .collect();

    write_products(dir.path(), &[aggregate("B01", 10, 4.0, 0.1)]).unwrap();
    let path = write_ranked_products(dir.path(), &ranked).unwrap();
    assert_eq!(path, dir.path().join(RANKED_PRODUCTS_FILE));

    let rows = read_ranked_products(&path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].product_id, "B02");
    assert_eq!(rows[1].cluster_rank, 2);
    assert!((rows[0].final_score - 3.6).abs() < 1e-12);
}

#[test]
fn test_unranked_rows_are_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let unranked = ScoredProduct {
        aggregate: aggregate("B09", 4, 3.0, 0.25),
        cluster_id: 1,
        bayesian_rating: 3.0,
        sentiment_penalty: 0.75,
        final_score: 2.25,
        cluster_rank: None,
    };
    let err = write_ranked_products(dir.path(), &[unranked]).unwrap_err();
    assert!(matches!(err, SoundrankError::Schema { .. }));
    assert!(!dir.path().join(RANKED_PRODUCTS_FILE).exists());
}
