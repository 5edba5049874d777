//! Statistical primitives for ratio-metric estimation.
//!
//! - Sample covariance of fixed-dimension vectors, batch and streaming
//! - Quadratic and bilinear forms for delta-method linearization
//! - Standard normal tail probabilities
//! - Counter-based seeding for reproducible simulation trials

mod covariance;
mod normal;
mod rng;

pub use covariance::{bilinear_form, quadratic_form, sample_covariance, WelfordCovariance};
pub use normal::{standard_normal_sf, two_sided_pvalue};
pub use rng::counter_rng_seed;
