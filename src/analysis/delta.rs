//! Delta-method variance of a ratio-of-means statistic.
//!
//! For i.i.d. units with numerator Y and denominator N, the statistic Y̅/N̅ is
//! linearized around the sample means:
//!
//! ```text
//! β = [1/N̅, −Y̅/N̅²]ᵀ
//! Var(Y/N) ≈ βᵀ Σ β,   Σ = Cov(Y, N)  (divisor n − 1)
//! ```
//!
//! The result is the per-unit variance of the linearized ratio; the
//! pooled tester divides by the arm sizes.

use tracing::debug;

use crate::error::{EstimationError, Result};
use crate::statistics::{quadratic_form, sample_covariance};
use crate::types::{Matrix2, Vector2};

use super::aggregate::GroupView;

/// Variance estimate of one arm's ratio metric.
#[derive(Debug, Clone, Copy)]
pub struct DeltaVariance {
    /// Linearized per-unit variance βᵀΣβ.
    pub variance: f64,
    /// Gradient of the ratio at the sample means.
    pub gradient: Vector2,
    /// Sample covariance of (Y, N).
    pub covariance: Matrix2,
}

/// Gradient of `numerator / denominator` evaluated at the given means.
///
/// # Errors
///
/// `DegenerateMetric` if `denominator_mean` is zero; `metric` names the ratio
/// in the error.
pub fn ratio_gradient(numerator_mean: f64, denominator_mean: f64, metric: &str) -> Result<Vector2> {
    if denominator_mean == 0.0 {
        return Err(EstimationError::degenerate(metric));
    }
    Ok(Vector2::new(
        1.0 / denominator_mean,
        -numerator_mean / (denominator_mean * denominator_mean),
    ))
}

/// Delta-method variance of `Y̅/N̅` for one arm.
///
/// # Errors
///
/// - `DegenerateMetric` if the mean denominator is zero
/// - `InsufficientData` if the view has fewer than 2 units
pub fn delta_method_variance(
    group: &GroupView<'_>,
    numerator_mean: f64,
    denominator_mean: f64,
) -> Result<DeltaVariance> {
    let metric = format!("{} experiment-period", group.arm);
    let gradient = ratio_gradient(numerator_mean, denominator_mean, &metric)?;

    let covariance = sample_covariance([group.numerator, group.denominator]).ok_or(
        EstimationError::InsufficientData {
            arm: group.arm,
            n: group.numerator.len(),
        },
    )?;

    let variance = quadratic_form(&gradient, &covariance);
    debug!(arm = %group.arm, variance, "delta-method variance");

    Ok(DeltaVariance {
        variance,
        gradient,
        covariance,
    })
}
