//! Pooled two-sample z-test.
//!
//! Per-arm variances are combined into a sample-size-weighted pooled
//! variance, or a pooled variance computed upstream is used directly:
//!
//! ```text
//! var_pooled = Σ(nᵢ − 1)·varᵢ / (Σnᵢ − k)
//! z          = ate / sqrt(Σ(1/nᵢ) · var_pooled)
//! p          = 2·(1 − Φ(|z|))
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EstimationError, Result};
use crate::statistics::two_sided_pvalue;

/// Source of the pooled variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PooledVariance<'a> {
    /// Recombine per-arm variances, ordered like the counts.
    Recombine(&'a [f64]),
    /// Use a variance that was already pooled upstream.
    Override(f64),
}

/// Outcome of the pooled z-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZTest {
    /// Two-sided p-value.
    pub pval: f64,
    /// Test statistic.
    pub zstat: f64,
    /// Pooled per-unit variance used for the test.
    pub variance_pooled: f64,
}

/// Run a two-sided z-test of `ate` against zero.
///
/// With zero standard error the statistic is 0 when `ate` is 0 and ±∞
/// otherwise.
///
/// # Errors
///
/// `Numerical` if a count is zero, the variances and counts differ in length,
/// there are no degrees of freedom left, or the pooled variance is negative
/// or non-finite.
pub fn pooled_z_test(ate: f64, counts: &[usize], variance: PooledVariance<'_>) -> Result<ZTest> {
    if counts.is_empty() {
        return Err(EstimationError::numerical("no arms to test"));
    }
    if counts.contains(&0) {
        return Err(EstimationError::numerical("arm with zero units"));
    }

    let variance_pooled = match variance {
        PooledVariance::Recombine(variances) => recombine(variances, counts)?,
        PooledVariance::Override(v) => v,
    };

    if !variance_pooled.is_finite() || variance_pooled < 0.0 {
        return Err(EstimationError::numerical(format!(
            "pooled variance {} is negative or undefined",
            variance_pooled
        )));
    }

    let inverse_counts: f64 = counts.iter().map(|&n| 1.0 / n as f64).sum();
    let standard_error = (inverse_counts * variance_pooled).sqrt();

    let zstat = if standard_error > 0.0 {
        ate / standard_error
    } else if ate == 0.0 {
        0.0
    } else {
        f64::INFINITY.copysign(ate)
    };

    Ok(ZTest {
        pval: two_sided_pvalue(zstat),
        zstat,
        variance_pooled,
    })
}

fn recombine(variances: &[f64], counts: &[usize]) -> Result<f64> {
    if variances.len() != counts.len() {
        return Err(EstimationError::numerical(format!(
            "{} variances for {} arms",
            variances.len(),
            counts.len()
        )));
    }

    let total: usize = counts.iter().sum();
    let dof = total
        .checked_sub(counts.len())
        .filter(|&dof| dof > 0)
        .ok_or_else(|| EstimationError::numerical("no degrees of freedom for pooled variance"))?;

    let weighted: f64 = counts
        .iter()
        .zip(variances)
        .map(|(&n, &var)| (n - 1) as f64 * var)
        .sum();

    Ok(weighted / dof as f64)
}
