//! # ratio-ate
//!
//! Average treatment effect estimation for ratio metrics in A/B tests.
//!
//! A ratio metric is a per-unit numerator summed over a group divided by a
//! per-unit denominator summed over the same group (clicks per view, orders
//! per session). Units are independent; numerator and denominator within a
//! unit are not. This crate provides:
//! - Delta-method variance of each arm's ratio
//! - A pooled-variance z-test with two-sided p-value
//! - CUPED variance reduction using a pre-period ratio as covariate
//! - A synthetic data generator for calibration studies
//!
//! ## Quick Start
//!
//! ```ignore
//! use ratio_ate::{ColumnSpec, RatioAteEstimator, UnitTable};
//!
//! let columns = ColumnSpec::new("Y", "N")
//!     .experiment_suffix("_exp")
//!     .pre_period_suffix("");
//! let estimator = RatioAteEstimator::new(&control, &treatment, columns)?;
//!
//! let report = estimator.estimate_all()?;
//! println!("{}", ratio_ate::output::format_report(&report, 0.05));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod error;
mod estimator;
mod result;
mod table;
mod thread_pool;
mod types;

// Functional modules
pub mod analysis;
pub mod output;
pub mod simulation;
pub mod statistics;

// Re-exports for public API
pub use config::{ColumnSpec, EstimatorConfig};
pub use error::{EstimationError, Result, SimulationError};
pub use estimator::{estimate_ratio_ate, RatioAteEstimator};
pub use result::{AteResult, CupedAteResult, EstimateReport};
pub use table::{UnitRecord, UnitTable};
pub use types::{Arm, Matrix2, Matrix4, Vector2, Vector4};
