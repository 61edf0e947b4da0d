//! Analysis modules.
//!
//! Aggregation and statistics are plain functions over rows and values;
//! [`MetricsEngine`] puts them together behind snapshot-aware queries.

pub mod aggregator;
pub mod metrics;
pub mod stats;

pub use aggregator::*;
pub use metrics::{
    band_ranking, Comparison, ComparisonMode, ComparisonTier, CorrelationMatrix, MetricsEngine,
    RankBand,
};
