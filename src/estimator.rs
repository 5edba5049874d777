//! Main `RatioAteEstimator` entry point.

use tracing::{debug, warn};

use crate::analysis::{
    aggregate, delta_method_variance, fit_cuped, pooled_z_test, AggregatedGroup, GroupSummary,
    PooledVariance, RatioSums,
};
use crate::config::{ColumnSpec, EstimatorConfig};
use crate::error::{EstimationError, Result};
use crate::result::{AteResult, CupedAteResult, EstimateReport};
use crate::table::UnitTable;
use crate::types::Arm;

/// Treatment effect estimator for a ratio metric.
///
/// Both arms are aggregated once at construction; every estimate is then a
/// pure function of the two groups.
///
/// # Example
///
/// ```ignore
/// use ratio_ate::{ColumnSpec, RatioAteEstimator};
///
/// let columns = ColumnSpec::new("Y", "N")
///     .experiment_suffix("_exp")
///     .pre_period_suffix("");
/// let estimator = RatioAteEstimator::new(&control, &treatment, columns)?;
///
/// let base = estimator.estimate()?;
/// let cuped = estimator.estimate_cuped(&base)?;
/// println!("ate {:.4} (p={:.3}), cuped {:.4} (p={:.3})",
///     base.ate, base.pval, cuped.ate_cuped, cuped.pval_cuped);
/// ```
#[derive(Debug, Clone)]
pub struct RatioAteEstimator<'a> {
    config: EstimatorConfig,
    control: AggregatedGroup<'a>,
    treatment: AggregatedGroup<'a>,
}

impl<'a> RatioAteEstimator<'a> {
    /// Create an estimator with default tolerances.
    ///
    /// # Errors
    ///
    /// Any aggregation error: `MissingColumn`, `InsufficientData` or
    /// `NonFiniteValue`.
    pub fn new(
        control: &'a UnitTable,
        treatment: &'a UnitTable,
        columns: ColumnSpec,
    ) -> Result<Self> {
        Self::with_config(control, treatment, EstimatorConfig::new(columns))
    }

    /// Create an estimator with a full configuration.
    pub fn with_config(
        control: &'a UnitTable,
        treatment: &'a UnitTable,
        config: EstimatorConfig,
    ) -> Result<Self> {
        let control = aggregate(control, &config.columns, Arm::Control)?;
        let treatment = aggregate(treatment, &config.columns, Arm::Treatment)?;

        for summary in [&control.summary, &treatment.summary] {
            if summary.n < config.small_sample_warning {
                warn!(
                    arm = %summary.arm,
                    n = summary.n,
                    "few units; the normal approximation may not hold"
                );
            }
        }

        Ok(Self {
            config,
            control,
            treatment,
        })
    }

    /// Set the relative tolerance below which the pre-period variance counts as zero.
    pub fn pre_period_variance_tolerance(mut self, tolerance: f64) -> Self {
        self.config.pre_period_variance_tolerance = tolerance;
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Summary of the control arm.
    pub fn control_summary(&self) -> &GroupSummary {
        &self.control.summary
    }

    /// Summary of the treatment arm.
    pub fn treatment_summary(&self) -> &GroupSummary {
        &self.treatment.summary
    }

    /// Whether pre-period columns were configured, enabling CUPED.
    pub fn has_pre_period(&self) -> bool {
        self.control.view.pre_period.is_some() && self.treatment.view.pre_period.is_some()
    }

    /// Estimate the treatment effect without covariate adjustment.
    ///
    /// `ate = ΣY_t/ΣN_t − ΣY_c/ΣN_c`, tested with the pooled delta-method
    /// variance of both arms.
    ///
    /// # Errors
    ///
    /// `DegenerateMetric` if an arm's mean denominator is zero, `Numerical` if
    /// the pooled variance is undefined.
    pub fn estimate(&self) -> Result<AteResult> {
        let var_c = arm_variance(&self.control)?;
        let var_t = arm_variance(&self.treatment)?;

        let control_metric = self.control.summary.experiment.ratio();
        let treatment_metric = self.treatment.summary.experiment.ratio();
        let ate = treatment_metric - control_metric;

        let (n_control, n_treatment) = self.counts();
        let test = pooled_z_test(
            ate,
            &[n_control, n_treatment],
            PooledVariance::Recombine(&[var_c, var_t]),
        )?;

        debug!(
            ate,
            pval = test.pval,
            variance_pooled = test.variance_pooled,
            "ratio treatment effect"
        );

        Ok(AteResult {
            ate,
            pval: test.pval,
            variance_pooled: test.variance_pooled,
            zstat: test.zstat,
            control_metric,
            treatment_metric,
            n_control,
            n_treatment,
        })
    }

    /// Estimate the CUPED-adjusted treatment effect.
    ///
    /// `base` must come from [`estimate`](Self::estimate) on this estimator;
    /// its pooled variance is reduced by the fraction ρ² explained by the
    /// pre-period ratio.
    ///
    /// # Errors
    ///
    /// - `MissingCovariate` without pre-period columns
    /// - `BaseResultMismatch` if `base` was computed from other groups
    /// - `DegenerateMetric` if a pre-period mean denominator is zero
    /// - `Numerical` if the pre-period ratio has no variance
    pub fn estimate_cuped(&self, base: &AteResult) -> Result<CupedAteResult> {
        let (n_control, n_treatment) = self.counts();
        if (base.n_control, base.n_treatment) != (n_control, n_treatment) {
            return Err(EstimationError::BaseResultMismatch {
                base_control: base.n_control,
                base_treatment: base.n_treatment,
                control: n_control,
                treatment: n_treatment,
            });
        }

        let fit = fit_cuped(
            &self.control.view,
            &self.treatment.view,
            self.config.pre_period_variance_tolerance,
        )?;

        let control_metric_cuped = adjusted_metric(&self.control.summary, fit.theta)?;
        let treatment_metric_cuped = adjusted_metric(&self.treatment.summary, fit.theta)?;
        let ate_cuped = treatment_metric_cuped - control_metric_cuped;
        let variance_pooled_cuped = base.variance_pooled * (1.0 - fit.rho_sq);

        let test = pooled_z_test(
            ate_cuped,
            &[n_control, n_treatment],
            PooledVariance::Override(variance_pooled_cuped),
        )?;

        debug!(
            ate_cuped,
            pval_cuped = test.pval,
            theta = fit.theta,
            rho_sq = fit.rho_sq,
            "CUPED-adjusted ratio treatment effect"
        );

        Ok(CupedAteResult {
            ate_cuped,
            pval_cuped: test.pval,
            variance_pooled_cuped: test.variance_pooled,
            theta: fit.theta,
            rho_sq: fit.rho_sq,
            zstat_cuped: test.zstat,
            control_metric_cuped,
            treatment_metric_cuped,
            n_control,
            n_treatment,
        })
    }

    /// Run [`estimate`](Self::estimate) and, when pre-period columns are
    /// configured, feed its result into [`estimate_cuped`](Self::estimate_cuped).
    pub fn estimate_all(&self) -> Result<EstimateReport> {
        let base = self.estimate()?;
        let cuped = if self.has_pre_period() {
            Some(self.estimate_cuped(&base)?)
        } else {
            None
        };
        Ok(EstimateReport { base, cuped })
    }

    fn counts(&self) -> (usize, usize) {
        (self.control.summary.n, self.treatment.summary.n)
    }
}

/// Convenience function estimating the unadjusted effect with defaults.
pub fn estimate_ratio_ate(
    control: &UnitTable,
    treatment: &UnitTable,
    columns: ColumnSpec,
) -> Result<AteResult> {
    RatioAteEstimator::new(control, treatment, columns)?.estimate()
}

fn arm_variance(group: &AggregatedGroup<'_>) -> Result<f64> {
    let RatioSums {
        numerator_mean,
        denominator_mean,
        ..
    } = group.summary.experiment;
    Ok(delta_method_variance(&group.view, numerator_mean, denominator_mean)?.variance)
}

/// Y̅/N̅ − θ·X̅/M̅ for one arm.
fn adjusted_metric(summary: &GroupSummary, theta: f64) -> Result<f64> {
    let pre = summary.pre_period.ok_or(EstimationError::MissingCovariate)?;
    if pre.denominator_mean == 0.0 {
        return Err(EstimationError::degenerate(format!(
            "{} pre-period",
            summary.arm
        )));
    }
    Ok(summary.experiment.ratio() - theta * pre.ratio())
}
