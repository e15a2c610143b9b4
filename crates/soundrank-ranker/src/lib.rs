//! soundrank-ranker: product scoring and within-category ranking engine.
//!
//! Stages, leaves first: aggregate → filter → score → rank.

pub mod aggregate;
pub mod filter;
pub mod stats;
pub mod scorer;
pub mod ranking;
pub mod cluster_provider;
pub mod pipeline;
pub mod interpret;
pub mod report;
