//! Score analysis: confidence gating, aggregation, and performance
//! breakdowns.
//!
//! These are pure functions over the data model; the workflow state machine
//! calls them from its stages.

pub mod aggregator;
pub mod analyzer;
pub mod gate;

pub use aggregator::aggregate;
pub use analyzer::{analyze, PerformanceAnalysis};
pub use gate::{apply_threshold, review_ids};
