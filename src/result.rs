//! Estimation result types.

use serde::{Deserialize, Serialize};

/// Treatment effect of a ratio metric without covariate adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AteResult {
    /// Treatment ratio minus control ratio.
    pub ate: f64,
    /// Two-sided p-value of the pooled z-test.
    pub pval: f64,
    /// Pooled per-unit delta-method variance.
    pub variance_pooled: f64,
    /// z statistic.
    pub zstat: f64,
    /// ΣY/ΣN in the control arm.
    pub control_metric: f64,
    /// ΣY/ΣN in the treatment arm.
    pub treatment_metric: f64,
    /// Control units.
    pub n_control: usize,
    /// Treatment units.
    pub n_treatment: usize,
}

impl AteResult {
    /// Whether the effect is significant at level `alpha`.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.pval < alpha
    }

    /// Standard error of `ate`.
    pub fn standard_error(&self) -> f64 {
        standard_error(self.variance_pooled, self.n_control, self.n_treatment)
    }

    /// Treatment effect relative to the control metric.
    pub fn relative_lift(&self) -> f64 {
        self.ate / self.control_metric
    }
}

/// Treatment effect after CUPED adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CupedAteResult {
    /// Difference of the adjusted arm metrics.
    pub ate_cuped: f64,
    /// Two-sided p-value using the reduced variance.
    pub pval_cuped: f64,
    /// Pooled variance after reduction, `variance_pooled·(1 − ρ²)`.
    pub variance_pooled_cuped: f64,
    /// Pooled adjustment coefficient.
    pub theta: f64,
    /// Fraction of variance explained by the pre-period ratio.
    pub rho_sq: f64,
    /// z statistic.
    pub zstat_cuped: f64,
    /// Control Y̅/N̅ − θ·X̅/M̅.
    pub control_metric_cuped: f64,
    /// Treatment Y̅/N̅ − θ·X̅/M̅.
    pub treatment_metric_cuped: f64,
    /// Control units.
    pub n_control: usize,
    /// Treatment units.
    pub n_treatment: usize,
}

impl CupedAteResult {
    /// Whether the adjusted effect is significant at level `alpha`.
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.pval_cuped < alpha
    }

    /// Standard error of `ate_cuped`.
    pub fn standard_error(&self) -> f64 {
        standard_error(self.variance_pooled_cuped, self.n_control, self.n_treatment)
    }
}

fn standard_error(variance_pooled: f64, n_control: usize, n_treatment: usize) -> f64 {
    ((1.0 / n_control as f64 + 1.0 / n_treatment as f64) * variance_pooled).sqrt()
}

/// Base estimate with the optional CUPED estimate derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimateReport {
    /// Unadjusted estimate.
    pub base: AteResult,
    /// Adjusted estimate, present when pre-period columns were configured.
    pub cuped: Option<CupedAteResult>,
}
