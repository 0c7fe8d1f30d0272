//! # Utilities Module
//!
//! Cross-cutting helpers: metrics assembly and thread-pool configuration.

pub mod metrics;
pub mod threading;

pub use metrics::{OffsetSummary, ShardMetrics};
