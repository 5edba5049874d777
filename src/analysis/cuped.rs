//! CUPED variance reduction generalized to ratio metrics.
//!
//! Both arms are pooled to estimate one linear relationship between the
//! experiment ratio Y/N and the pre-period ratio X/M. With
//! Σ = Cov(Y, N, X, M) over the pooled units and gradients at the pooled means
//!
//! ```text
//! β_expt = [1/N̅, −Y̅/N̅², 0, 0]ᵀ
//! β_pre  = [0, 0, 1/M̅, −X̅/M̅²]ᵀ
//! ```
//!
//! the variance-minimizing coefficient and explained variance are
//!
//! ```text
//! θ  = β_exptᵀΣβ_pre / β_preᵀΣβ_pre
//! ρ² = (β_exptᵀΣβ_pre)² / (β_preᵀΣβ_pre · β_exptᵀΣβ_expt)
//! ```
//!
//! and the adjusted metric Y/N − θ·X/M has variance Var(Y/N)·(1 − ρ²).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EstimationError, Result};
use crate::statistics::{bilinear_form, quadratic_form, WelfordCovariance};
use crate::types::{Matrix4, Vector4};

use super::aggregate::GroupView;
use super::delta::ratio_gradient;

/// Pooled CUPED coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CupedFit {
    /// Coefficient subtracted from the pre-period ratio.
    pub theta: f64,
    /// Squared correlation between experiment and pre-period ratios, in [0, 1].
    pub rho_sq: f64,
    /// β_exptᵀΣβ_pre.
    pub cross_covariance: f64,
    /// β_preᵀΣβ_pre.
    pub pre_variance: f64,
    /// β_exptᵀΣβ_expt.
    pub experiment_variance: f64,
    /// Number of pooled units.
    pub n_pooled: usize,
}

/// Estimate θ and ρ² from the pooled units of both arms.
///
/// # Errors
///
/// - `MissingCovariate` if either group has no pre-period columns
/// - `DegenerateMetric` if a pooled mean denominator is zero
/// - `Numerical` if the linearized pre-period variance is at most
///   `tolerance` times its scale (see [`pre_period_scale`]), leaving θ
///   undefined
pub fn fit_cuped(
    control: &GroupView<'_>,
    treatment: &GroupView<'_>,
    tolerance: f64,
) -> Result<CupedFit> {
    let mut pooled = pre_period_accumulator(control)?;
    pooled.merge(&pre_period_accumulator(treatment)?);

    let covariance: Matrix4 = pooled.covariance().ok_or_else(|| {
        EstimationError::numerical("pooled sample has fewer than 2 units")
    })?;
    let mean = *pooled.mean();

    let expt = ratio_gradient(mean[0], mean[1], "pooled experiment-period")?;
    let pre = ratio_gradient(mean[2], mean[3], "pooled pre-period")?;
    let beta_expt = Vector4::new(expt[0], expt[1], 0.0, 0.0);
    let beta_pre = Vector4::new(0.0, 0.0, pre[0], pre[1]);

    let cross_covariance = bilinear_form(&beta_expt, &covariance, &beta_pre);
    let pre_variance = quadratic_form(&beta_pre, &covariance);
    let experiment_variance = quadratic_form(&beta_expt, &covariance);

    let scale = pre_period_scale(&beta_pre, &covariance);
    if pre_variance.is_nan() || pre_variance <= tolerance * scale {
        return Err(EstimationError::numerical(format!(
            "pre-period ratio variance {:e} is negligible against its scale {:e}",
            pre_variance, scale
        )));
    }

    let theta = cross_covariance / pre_variance;
    let rho_sq = if experiment_variance > 0.0 {
        // Cauchy–Schwarz bounds this by 1; clamp rounding excursions
        (cross_covariance * cross_covariance / (pre_variance * experiment_variance)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    debug!(theta, rho_sq, n_pooled = pooled.count(), "fitted CUPED coefficients");

    Ok(CupedFit {
        theta,
        rho_sq,
        cross_covariance,
        pre_variance,
        experiment_variance,
        n_pooled: pooled.count(),
    })
}

/// Upper bound `(|β_X|·σ_X + |β_M|·σ_M)²` of `β_preᵀΣβ_pre`.
///
/// The linearized variance cancels towards zero relative to this bound only
/// when X/M is constant across units, whatever the magnitude of the ratio.
pub fn pre_period_scale(beta_pre: &Vector4, covariance: &Matrix4) -> f64 {
    let spread = beta_pre[2].abs() * covariance[(2, 2)].max(0.0).sqrt()
        + beta_pre[3].abs() * covariance[(3, 3)].max(0.0).sqrt();
    spread * spread
}

fn pre_period_accumulator(group: &GroupView<'_>) -> Result<WelfordCovariance<4>> {
    let pre = group.pre_period.ok_or(EstimationError::MissingCovariate)?;
    Ok(WelfordCovariance::from_columns([
        group.numerator,
        group.denominator,
        pre.numerator,
        pre.denominator,
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate::PrePeriodView;
    use crate::statistics::sample_covariance;
    use crate::types::Arm;

    fn view<'a>(arm: Arm, y: &'a [f64], n: &'a [f64], x: &'a [f64], m: &'a [f64]) -> GroupView<'a> {
        GroupView {
            arm,
            numerator: y,
            denominator: n,
            pre_period: Some(PrePeriodView {
                numerator: x,
                denominator: m,
            }),
        }
    }

    #[test]
    fn test_identical_pre_period_gives_full_correlation() {
        let (yc, nc) = ([10.0, 20.0, 30.0], [100.0, 100.0, 100.0]);
        let (yt, nt) = ([15.0, 25.0, 35.0], [100.0, 100.0, 100.0]);
        let control = view(Arm::Control, &yc, &nc, &yc, &nc);
        let treatment = view(Arm::Treatment, &yt, &nt, &yt, &nt);

        let fit = fit_cuped(&control, &treatment, 1e-10).unwrap();

        assert!((fit.theta - 1.0).abs() < 1e-9, "theta = {}", fit.theta);
        assert!((fit.rho_sq - 1.0).abs() < 1e-9, "rho_sq = {}", fit.rho_sq);
        assert_eq!(fit.n_pooled, 6);
    }

    #[test]
    fn test_matches_concatenated_covariance() {
        let yc = [3.0, 7.0, 2.0, 9.0];
        let nc = [10.0, 14.0, 8.0, 20.0];
        let xc = [2.0, 6.0, 3.0, 8.0];
        let mc = [9.0, 15.0, 9.0, 18.0];
        let yt = [4.0, 5.0, 8.0];
        let nt = [12.0, 11.0, 19.0];
        let xt = [5.0, 4.0, 6.0];
        let mt = [13.0, 10.0, 17.0];

        let fit = fit_cuped(
            &view(Arm::Control, &yc, &nc, &xc, &mc),
            &view(Arm::Treatment, &yt, &nt, &xt, &mt),
            1e-10,
        )
        .unwrap();

        let cat = |a: &[f64], b: &[f64]| a.iter().chain(b).copied().collect::<Vec<_>>();
        let (y, n, x, m) = (cat(&yc, &yt), cat(&nc, &nt), cat(&xc, &xt), cat(&mc, &mt));
        let cov = sample_covariance([&y[..], &n[..], &x[..], &m[..]]).unwrap();
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        let (yb, nb, xb, mb) = (mean(&y), mean(&n), mean(&x), mean(&m));
        let be = Vector4::new(1.0 / nb, -yb / (nb * nb), 0.0, 0.0);
        let bp = Vector4::new(0.0, 0.0, 1.0 / mb, -xb / (mb * mb));

        let theta = bilinear_form(&be, &cov, &bp) / quadratic_form(&bp, &cov);
        assert!((fit.theta - theta).abs() < 1e-9);
        assert!(fit.rho_sq >= 0.0 && fit.rho_sq <= 1.0);
    }

    #[test]
    fn test_missing_pre_period() {
        let y = [1.0, 2.0];
        let n = [3.0, 4.0];
        let control = GroupView {
            arm: Arm::Control,
            numerator: &y,
            denominator: &n,
            pre_period: None,
        };

        let err = fit_cuped(&control, &control, 1e-10).unwrap_err();
        assert_eq!(err, EstimationError::MissingCovariate);
    }

    #[test]
    fn test_constant_pre_period_ratio_is_numerical_error() {
        let (y, n) = ([1.0, 2.0, 5.0], [3.0, 4.0, 9.0]);
        let (x, m) = ([2.0, 2.0, 2.0], [4.0, 4.0, 4.0]);

        let group = view(Arm::Control, &y, &n, &x, &m);
        let err = fit_cuped(&group, &group, 1e-10).unwrap_err();
        assert!(matches!(err, EstimationError::Numerical(_)));
    }

    #[test]
    fn test_rare_event_ratio_is_fitted() {
        // Around one event per million trials in both periods.
        let (yc, xc) = ([0.0, 1.0, 2.0, 3.0], [1.0, 2.0, 3.0, 4.0]);
        let (yt, xt) = ([1.0, 3.0, 0.0, 2.0], [2.0, 4.0, 1.0, 3.0]);
        let n = [1e6; 4];

        let fit = fit_cuped(
            &view(Arm::Control, &yc, &n, &xc, &n),
            &view(Arm::Treatment, &yt, &n, &xt, &n),
            1e-10,
        )
        .unwrap();

        assert!(fit.pre_variance < 1e-11);
        assert!((fit.theta - 1.0).abs() < 1e-9, "theta = {}", fit.theta);
        assert!((fit.rho_sq - 1.0).abs() < 1e-9, "rho_sq = {}", fit.rho_sq);
    }

    #[test]
    fn test_proportional_pre_period_is_numerical_error() {
        // X/M is 0.25 for every unit although X and M both vary.
        let (y, n) = ([1.0, 2.0, 5.0], [3.0, 4.0, 9.0]);
        let (x, m) = ([1.0, 3.0, 7.0], [4.0, 12.0, 28.0]);

        let group = view(Arm::Control, &y, &n, &x, &m);
        let err = fit_cuped(&group, &group, 1e-10).unwrap_err();
        assert!(matches!(err, EstimationError::Numerical(_)));
    }

    #[test]
    fn test_zero_pre_period_denominator_is_degenerate() {
        let (y, n) = ([1.0, 2.0], [3.0, 4.0]);
        let (x, m) = ([1.0, 3.0], [0.0, 0.0]);

        let group = view(Arm::Control, &y, &n, &x, &m);
        let err = fit_cuped(&group, &group, 1e-10).unwrap_err();
        assert!(matches!(err, EstimationError::DegenerateMetric { .. }));
    }
}
