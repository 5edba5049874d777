//! Standard normal tail probabilities.

use std::f64::consts::SQRT_2;

use statrs::function::erf::erfc;

/// Upper tail `1 - Φ(z)` of the standard normal distribution.
///
/// Evaluated through `erfc` so p-values far in the tail do not cancel to zero.
pub fn standard_normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / SQRT_2)
}

/// Two-sided p-value `2·(1 - Φ(|z|))`.
pub fn two_sided_pvalue(z: f64) -> f64 {
    if z.is_infinite() {
        return 0.0;
    }
    (2.0 * standard_normal_sf(z.abs())).min(1.0)
}
