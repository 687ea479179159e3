//! # Metrics Module
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and text exposition
//! - `backup_metrics` - Pipeline metrics (observations, skips, files, errors)

pub mod backup_metrics;
pub mod registry;

pub use backup_metrics::*;
pub use registry::*;
