//! Treatment impact applied by the data generator.

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// Fraction of the change magnitude used as width when none is given.
pub const DEFAULT_WIDTH_FRACTION: f64 = 0.1;

/// How the width of the per-unit change distribution is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ImpactWidth {
    /// Use exactly this width, in percentage points.
    Explicit(f64),

    /// Use [`DEFAULT_WIDTH_FRACTION`] of the change's magnitude.
    #[default]
    FractionOfMagnitude,
}

/// Effect of the treatment on each treated unit's success probability.
///
/// Every unit draws a percentage change uniformly from
/// `[change − width/2, change + width/2]`; treated units have their success
/// probability scaled by `(100 + change) / 100`. The width is resolved once,
/// at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExperimentImpact {
    perc_prob_success_change: f64,
    width_perc_prob_change: f64,
    treatment_proportion: f64,
}

impl ExperimentImpact {
    /// Impact with the default width rule and an even split between arms.
    pub fn new(perc_prob_success_change: f64) -> Result<Self, SimulationError> {
        Self::with_width(perc_prob_success_change, ImpactWidth::default(), 0.5)
    }

    /// Impact with an explicit width rule and treatment proportion.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` if the change or width is not finite, the width is
    /// negative, or the proportion lies outside [0, 1].
    pub fn with_width(
        perc_prob_success_change: f64,
        width: ImpactWidth,
        treatment_proportion: f64,
    ) -> Result<Self, SimulationError> {
        if !perc_prob_success_change.is_finite() {
            return Err(SimulationError::InvalidParameter(format!(
                "percentage change {} is not finite",
                perc_prob_success_change
            )));
        }
        if !(0.0..=1.0).contains(&treatment_proportion) {
            return Err(SimulationError::InvalidParameter(format!(
                "treatment proportion {} outside [0, 1]",
                treatment_proportion
            )));
        }

        let width_perc_prob_change = match width {
            ImpactWidth::Explicit(w) => w,
            ImpactWidth::FractionOfMagnitude => {
                perc_prob_success_change.abs() * DEFAULT_WIDTH_FRACTION
            }
        };
        if !width_perc_prob_change.is_finite() || width_perc_prob_change < 0.0 {
            return Err(SimulationError::InvalidParameter(format!(
                "width {} must be finite and non-negative",
                width_perc_prob_change
            )));
        }

        Ok(Self {
            perc_prob_success_change,
            width_perc_prob_change,
            treatment_proportion,
        })
    }

    /// Impact with no change, for null experiments.
    pub fn none() -> Self {
        Self {
            perc_prob_success_change: 0.0,
            width_perc_prob_change: 0.0,
            treatment_proportion: 0.5,
        }
    }

    /// Center of the percentage change.
    pub fn perc_prob_success_change(&self) -> f64 {
        self.perc_prob_success_change
    }

    /// Resolved width of the percentage change.
    pub fn width_perc_prob_change(&self) -> f64 {
        self.width_perc_prob_change
    }

    /// Probability that a unit is assigned to treatment.
    pub fn treatment_proportion(&self) -> f64 {
        self.treatment_proportion
    }

    /// Bounds `(low, high)` of the per-unit percentage change.
    pub fn change_bounds(&self) -> (f64, f64) {
        let half = self.width_perc_prob_change / 2.0;
        (
            self.perc_prob_success_change - half,
            self.perc_prob_success_change + half,
        )
    }
}
