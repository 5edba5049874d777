//! Configuration for ratio-metric estimation.

use serde::{Deserialize, Serialize};

/// Names of the columns holding a ratio metric's numerator and denominator.
///
/// Experiment-period and pre-period columns share base names and differ by
/// suffix, so `ColumnSpec::new("Y", "N").experiment_suffix("_exp")` reads
/// `Y_exp`/`N_exp` for the experiment and, once a pre-period suffix is set,
/// `Y<suffix>`/`N<suffix>` for the covariate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Base name of the numerator column.
    pub numerator: String,
    /// Base name of the denominator column.
    pub denominator: String,
    /// Suffix of the experiment-period columns (default: "").
    pub suffix_expt: String,
    /// Suffix of the pre-period columns; `None` disables CUPED.
    pub suffix_pre: Option<String>,
}

impl ColumnSpec {
    /// Column spec with an empty experiment suffix and no pre-period.
    pub fn new(numerator: impl Into<String>, denominator: impl Into<String>) -> Self {
        Self {
            numerator: numerator.into(),
            denominator: denominator.into(),
            suffix_expt: String::new(),
            suffix_pre: None,
        }
    }

    /// Set the experiment-period suffix.
    pub fn experiment_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix_expt = suffix.into();
        self
    }

    /// Set the pre-period suffix, enabling CUPED.
    pub fn pre_period_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix_pre = Some(suffix.into());
        self
    }

    /// Resolved experiment-period column names `(numerator, denominator)`.
    pub fn experiment_columns(&self) -> (String, String) {
        (
            format!("{}{}", self.numerator, self.suffix_expt),
            format!("{}{}", self.denominator, self.suffix_expt),
        )
    }

    /// Resolved pre-period column names, if a pre-period suffix is set.
    pub fn pre_period_columns(&self) -> Option<(String, String)> {
        self.suffix_pre.as_ref().map(|suffix| {
            (
                format!("{}{}", self.numerator, suffix),
                format!("{}{}", self.denominator, suffix),
            )
        })
    }
}

/// Configuration options for `RatioAteEstimator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Columns read from both groups.
    pub columns: ColumnSpec,

    /// Relative tolerance below which the linearized pre-period variance
    /// counts as zero and θ is undefined (default: 1e-10).
    ///
    /// Compared against the variance's scale, so it applies equally to
    /// rare-event and high-rate ratios.
    pub pre_period_variance_tolerance: f64,

    /// Arms smaller than this log a warning that the normal approximation
    /// may not hold (default: 30).
    pub small_sample_warning: usize,
}

impl EstimatorConfig {
    /// Default tolerances for the given columns.
    pub fn new(columns: ColumnSpec) -> Self {
        Self {
            columns,
            pre_period_variance_tolerance: 1e-10,
            small_sample_warning: 30,
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::new(ColumnSpec::new("Y", "N"))
    }
}
