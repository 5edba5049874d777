//! Null calibration of the ratio estimators.
//!
//! Simulates experiments in which treatment has no effect and records the
//! p-values of the unadjusted and CUPED estimators. A well-calibrated test
//! produces p-values that are uniform on [0, 1], so the rejection rate at
//! level α is close to α.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ColumnSpec;
use crate::error::SimulationError;
use crate::estimator::RatioAteEstimator;
use crate::statistics::counter_rng_seed;

use super::generator::{GeneratorConfig, RatioDataGenerator, COL_N, COL_Y};
use super::impact::ExperimentImpact;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// p-values collected from simulated null experiments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Unadjusted p-value per trial.
    pub pvalues: Vec<f64>,
    /// CUPED p-value per trial.
    pub pvalues_cuped: Vec<f64>,
    /// Fitted ρ² per trial.
    pub rho_sq: Vec<f64>,
}

impl CalibrationReport {
    /// Number of trials.
    pub fn trials(&self) -> usize {
        self.pvalues.len()
    }

    /// Fraction of unadjusted p-values below `alpha`.
    pub fn rejection_rate(&self, alpha: f64) -> f64 {
        rejection_rate(&self.pvalues, alpha)
    }

    /// Fraction of CUPED p-values below `alpha`.
    pub fn cuped_rejection_rate(&self, alpha: f64) -> f64 {
        rejection_rate(&self.pvalues_cuped, alpha)
    }

    /// Mean unadjusted p-value; 0.5 under uniformity.
    pub fn mean_pvalue(&self) -> f64 {
        if self.pvalues.is_empty() {
            return f64::NAN;
        }
        self.pvalues.iter().sum::<f64>() / self.pvalues.len() as f64
    }

    /// Kolmogorov–Smirnov distance of the unadjusted p-values from Uniform(0, 1).
    pub fn ks_distance(&self) -> f64 {
        ks_uniform_distance(&self.pvalues)
    }
}

fn rejection_rate(pvalues: &[f64], alpha: f64) -> f64 {
    if pvalues.is_empty() {
        return f64::NAN;
    }
    pvalues.iter().filter(|&&p| p < alpha).count() as f64 / pvalues.len() as f64
}

/// Kolmogorov–Smirnov statistic `sup |F̂(p) − p|` against Uniform(0, 1).
pub fn ks_uniform_distance(pvalues: &[f64]) -> f64 {
    let mut sorted = pvalues.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len() as f64;
    sorted
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let above = (i + 1) as f64 / n - p;
            let below = p - i as f64 / n;
            above.max(below)
        })
        .fold(0.0_f64, f64::max)
}

/// Run `trials` null experiments drawn from `config`.
///
/// Trial `i` uses a generator seeded with `counter_rng_seed(seed, i)`, so the
/// report is identical with or without the `parallel` feature.
///
/// # Errors
///
/// Any generator or estimation error of a trial, e.g. an arm with fewer than
/// 2 units when `config.units` is very small.
pub fn run_null_calibration(
    config: &GeneratorConfig,
    trials: usize,
    seed: u64,
) -> Result<CalibrationReport, SimulationError> {
    config.validate()?;

    #[cfg(feature = "parallel")]
    let outcomes: Vec<TrialOutcome> = crate::thread_pool::install(|| {
        (0..trials)
            .into_par_iter()
            .map(|i| run_trial(config, seed, i as u64))
            .collect::<Result<Vec<_>, _>>()
    })?;

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<TrialOutcome> = crate::thread_pool::install(|| {
        (0..trials)
            .map(|i| run_trial(config, seed, i as u64))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let report = CalibrationReport {
        pvalues: outcomes.iter().map(|o| o.pval).collect(),
        pvalues_cuped: outcomes.iter().map(|o| o.pval_cuped).collect(),
        rho_sq: outcomes.iter().map(|o| o.rho_sq).collect(),
    };

    let rate = report.rejection_rate(0.05);
    debug!(trials, rejection_rate = rate, "null calibration finished");
    if trials >= 100 && rate > 0.1 {
        warn!(rejection_rate = rate, "null rejection rate is more than twice alpha=0.05");
    }

    Ok(report)
}

struct TrialOutcome {
    pval: f64,
    pval_cuped: f64,
    rho_sq: f64,
}

fn run_trial(config: &GeneratorConfig, seed: u64, trial: u64) -> Result<TrialOutcome, SimulationError> {
    let mut generator = RatioDataGenerator::new(config.with_seed(counter_rng_seed(seed, trial)))?;
    let data = generator.generate(Some(&ExperimentImpact::none()))?;
    let (control, treatment) = data.split_by_arm()?;

    let columns = ColumnSpec::new(COL_Y, COL_N)
        .experiment_suffix("_exp")
        .pre_period_suffix("");
    let estimator = RatioAteEstimator::new(&control, &treatment, columns)?;
    let base = estimator.estimate()?;
    let cuped = estimator.estimate_cuped(&base)?;

    Ok(TrialOutcome {
        pval: base.pval,
        pval_cuped: cuped.pval_cuped,
        rho_sq: cuped.rho_sq,
    })
}
