//! Retention analytics — cohort partitioning, per-cohort retention
//! evaluation, and headline retention metrics.

#![warn(clippy::unwrap_used)]

pub mod cohort;
pub mod retention;
pub mod summary;

pub use cohort::{CohortGranularity, CohortWindow, RetentionHorizon, RetentionRange};
pub use retention::{
    CohortRetention, ProjectSelector, RetentionCalculator, RetentionQuery, RetentionReport,
};
pub use summary::KeyMetric;
