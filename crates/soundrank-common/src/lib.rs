//! soundrank-common: shared types, errors and configuration for the soundrank crates.

pub mod error;
pub mod entities;
pub mod pipeline_config;

// Re-export commonly used types
pub use entities::{
    ClusteredProduct, ProductAggregate, RankedProductRow, ReviewRecord, ScoredProduct,
    SentimentLabel,
};
pub use error::{Result, SoundrankError};
pub use pipeline_config::PipelineConfig;
