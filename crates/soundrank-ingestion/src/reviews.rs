//! Review table loader.
//!
//! Reads a review CSV into validated `ReviewRecord`s.
//!
//! Expected columns:
//! - `product_id` (or `asin`): product key, non-empty
//! - `rating`: star rating 1–5 (integral floats such as `4.0` are accepted)
//! - `text`: review body
//! - `sentiment_label`: `positive` | `negative` (optional when a labeler is supplied)
//! - `title`: product title (optional)

use std::io::Read;
use std::path::Path;

use soundrank_common::{ReviewRecord, SentimentLabel, SoundrankError};
use tracing::{debug, info};

use crate::sentiment::{SentimentLabeler, UnlabeledReview};

type Result<T> = soundrank_common::Result<T>;

#[derive(Default)]
pub struct LoadOptions<'a> {
    /// Fills in labels when the file has no `sentiment_label` value.
    pub labeler: Option<&'a dyn SentimentLabeler>,
    /// Stop after this many data rows (0 = read everything).
    pub sample_size: usize,
}

/// Column positions resolved from the header row.
#[derive(Debug)]
struct ReviewColumns {
    product_id: usize,
    rating: usize,
    text: usize,
    sentiment_label: Option<usize>,
    title: Option<usize>,
}

impl ReviewColumns {
    fn resolve(headers: &csv::StringRecord, label_optional: bool) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        let mut missing = Vec::new();
        let product_id = find(&["product_id", "asin"]);
        let rating = find(&["rating"]);
        let text = find(&["text"]);
        let sentiment_label = find(&["sentiment_label"]);
        if product_id.is_none() { missing.push("product_id"); }
        if rating.is_none() { missing.push("rating"); }
        if text.is_none() { missing.push("text"); }
        if sentiment_label.is_none() && !label_optional { missing.push("sentiment_label"); }

        match (product_id, rating, text) {
            (Some(product_id), Some(rating), Some(text)) if missing.is_empty() => Ok(Self {
                product_id,
                rating,
                text,
                sentiment_label,
                title: find(&["title"]),
            }),
            _ => Err(SoundrankError::schema(
                "review table header",
                format!("missing required columns: {}", missing.join(", ")),
            )),
        }
    }
}

/// Load reviews from a CSV file on disk.
pub fn load_reviews(path: &Path, options: &LoadOptions<'_>) -> Result<Vec<ReviewRecord>> {
    info!(path = %path.display(), "Loading review table");
    let file = std::fs::File::open(path)?;
    read_reviews(file, options)
}

/// Load reviews from any CSV source.
pub fn read_reviews<R: Read>(source: R, options: &LoadOptions<'_>) -> Result<Vec<ReviewRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(source);

    let headers = reader.headers()?.clone();
    let columns = ReviewColumns::resolve(&headers, options.labeler.is_some())?;
    debug!(?columns, "Resolved review columns");

    let mut reviews = Vec::new();
    let mut n_labelled = 0usize;

    for (i, row) in reader.records().enumerate() {
        if options.sample_size > 0 && i >= options.sample_size {
            break;
        }
        let row = row?;
        // Header is line 1, so data row i sits on line i + 2.
        let line = i + 2;
        let unlabeled = parse_row(&row, &columns, line)?;

        let label_cell = columns
            .sentiment_label
            .and_then(|idx| row.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let record = match (label_cell, options.labeler) {
            (Some(raw), _) => {
                let label = SentimentLabel::parse(raw).ok_or_else(|| {
                    SoundrankError::schema(
                        format!("review table line {line}"),
                        format!("unknown sentiment_label '{raw}'"),
                    )
                })?;
                unlabeled.with_label(label)
            }
            (None, Some(labeler)) => {
                n_labelled += 1;
                let label = labeler.label(&unlabeled);
                unlabeled.with_label(label)
            }
            (None, None) => {
                return Err(SoundrankError::schema(
                    format!("review table line {line}"),
                    "sentiment_label is missing",
                ));
            }
        };
        reviews.push(record);
    }

    info!(n_reviews = reviews.len(), n_labelled, "Loaded reviews");
    Ok(reviews)
}

fn cell<'r>(row: &'r csv::StringRecord, idx: usize, name: &str, line: usize) -> Result<&'r str> {
    row.get(idx).ok_or_else(|| {
        SoundrankError::schema(format!("review table line {line}"), format!("{name} is missing"))
    })
}

fn parse_row(row: &csv::StringRecord, columns: &ReviewColumns, line: usize) -> Result<UnlabeledReview> {
    let context = format!("review table line {line}");

    let product_id = cell(row, columns.product_id, "product_id", line)?.trim();
    if product_id.is_empty() {
        return Err(SoundrankError::schema(context, "product_id is empty"));
    }

    let rating = match parse_rating(cell(row, columns.rating, "rating", line)?) {
        Some(rating) => rating,
        None => {
            return Err(SoundrankError::schema(context, "rating must be an integer from 1 to 5"));
        }
    };

    let text = cell(row, columns.text, "text", line)?.to_string();

    let title = columns
        .title
        .and_then(|idx| row.get(idx))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(UnlabeledReview {
        product_id: product_id.to_string(),
        rating,
        text,
        title,
    })
}

/// Ratings arrive as `4` or `4.0`; anything fractional or out of range is rejected.
fn parse_rating(raw: &str) -> Option<u8> {
    let value: f64 = raw.trim().parse().ok()?;
    if value.fract() != 0.0 || !(1.0..=5.0).contains(&value) {
        return None;
    }
    Some(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::StarRatingLabeler;

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("4"), Some(4));
        assert_eq!(parse_rating(" 5.0 "), Some(5));
        assert_eq!(parse_rating("3.5"), None);
        assert_eq!(parse_rating("0"), None);
        assert_eq!(parse_rating("6"), None);
        assert_eq!(parse_rating("five"), None);
    }

    #[test]
    fn test_read_labelled_table() {
        let csv = "product_id,rating,sentiment_label,text\n\
                   B01,5,positive,great bass\n\
                   B01,1,NEGATIVE,\"died, after a week\"\n";
        let reviews = read_reviews(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[1].sentiment_label, SentimentLabel::Negative);
        assert_eq!(reviews[1].text, "died, after a week");
    }

    #[test]
    fn test_asin_alias_and_title() {
        let csv = "asin,title,rating,sentiment_label,text\nB02,Boom Box,4.0,positive,loud\n";
        let reviews = read_reviews(csv.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(reviews[0].product_id, "B02");
        assert_eq!(reviews[0].title.as_deref(), Some("Boom Box"));
        assert_eq!(reviews[0].rating, 4);
    }

    #[test]
    fn test_missing_label_column_is_schema_error() {
        let csv = "product_id,rating,text\nB01,5,fine\n";
        let err = read_reviews(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        match err {
            SoundrankError::Schema { message, .. } => assert!(message.contains("sentiment_label")),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_labeler_fills_missing_labels() {
        let labeler = StarRatingLabeler;
        let options = LoadOptions { labeler: Some(&labeler), sample_size: 0 };
        let csv = "product_id,rating,text\nB01,2,meh\nB01,4,nice\n";
        let reviews = read_reviews(csv.as_bytes(), &options).unwrap();
        assert_eq!(reviews[0].sentiment_label, SentimentLabel::Negative);
        assert_eq!(reviews[1].sentiment_label, SentimentLabel::Positive);
    }

    #[test]
    fn test_short_row_is_schema_error() {
        let csv = "product_id,rating,sentiment_label,text\nB01,5,positive\n";
        let err = read_reviews(csv.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SoundrankError::Schema { .. }));
    }

    #[test]
    fn test_sample_size_limits_rows() {
        let csv = "product_id,rating,sentiment_label,text\n\
                   A,5,positive,x\nB,5,positive,y\nC,5,positive,z\n";
        let options = LoadOptions { labeler: None, sample_size: 2 };
        let reviews = read_reviews(csv.as_bytes(), &options).unwrap();
        assert_eq!(reviews.len(), 2);
    }
}
