//! soundrank-ingestion: review loading, pre-filtering and table persistence.
//!
//! Everything here happens strictly before or after the ranking core runs:
//! reading review and cluster CSVs, labelling and filtering reviews, and
//! writing the terminal tables for display and report consumers.

pub mod reviews;
pub mod sentiment;
pub mod preprocess;
pub mod clusters;
pub mod output;
