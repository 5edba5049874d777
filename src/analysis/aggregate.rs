//! Reduction of one arm's per-unit table into sums and means.

use serde::{Deserialize, Serialize};

use crate::config::ColumnSpec;
use crate::error::{EstimationError, Result};
use crate::table::UnitTable;
use crate::types::Arm;

/// Borrowed view over one arm's ratio columns.
#[derive(Debug, Clone, Copy)]
pub struct GroupView<'a> {
    /// Arm the units belong to.
    pub arm: Arm,
    /// Experiment-period numerator per unit (Y).
    pub numerator: &'a [f64],
    /// Experiment-period denominator per unit (N).
    pub denominator: &'a [f64],
    /// Pre-period columns, when configured.
    pub pre_period: Option<PrePeriodView<'a>>,
}

/// Borrowed pre-period columns.
#[derive(Debug, Clone, Copy)]
pub struct PrePeriodView<'a> {
    /// Pre-period numerator per unit (X).
    pub numerator: &'a [f64],
    /// Pre-period denominator per unit (M).
    pub denominator: &'a [f64],
}

/// Sums and means of a ratio's numerator and denominator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioSums {
    /// Σ numerator.
    pub numerator_sum: f64,
    /// Σ denominator.
    pub denominator_sum: f64,
    /// Σ numerator / n.
    pub numerator_mean: f64,
    /// Σ denominator / n.
    pub denominator_mean: f64,
}

impl RatioSums {
    fn from_columns(numerator: &[f64], denominator: &[f64]) -> Self {
        let n = numerator.len() as f64;
        let numerator_sum: f64 = numerator.iter().sum();
        let denominator_sum: f64 = denominator.iter().sum();
        Self {
            numerator_sum,
            denominator_sum,
            numerator_mean: numerator_sum / n,
            denominator_mean: denominator_sum / n,
        }
    }

    /// Ratio of sums Σnumerator / Σdenominator.
    ///
    /// Equal to the ratio of means, and unchanged by scaling both sums.
    pub fn ratio(&self) -> f64 {
        self.numerator_sum / self.denominator_sum
    }
}

/// Immutable summary of one arm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Arm the units belong to.
    pub arm: Arm,
    /// Number of units.
    pub n: usize,
    /// Experiment-period sums and means (Y, N).
    pub experiment: RatioSums,
    /// Pre-period sums and means (X, M), when configured.
    pub pre_period: Option<RatioSums>,
}

/// An arm's column view together with its summary.
#[derive(Debug, Clone, Copy)]
pub struct AggregatedGroup<'a> {
    /// Raw per-unit columns.
    pub view: GroupView<'a>,
    /// Derived sums and means.
    pub summary: GroupSummary,
}

/// Aggregate one arm of an experiment.
///
/// Resolves the configured column names against `table`, checks the group is
/// large enough for a sample covariance and computes sums and means.
///
/// # Errors
///
/// - `MissingColumn` if an experiment column, or a configured pre-period
///   column, is absent
/// - `InsufficientData` if the table has fewer than 2 units
/// - `NonFiniteValue` if a consumed column holds NaN or ±∞
pub fn aggregate<'a>(
    table: &'a UnitTable,
    columns: &ColumnSpec,
    arm: Arm,
) -> Result<AggregatedGroup<'a>> {
    let (numer, denom) = columns.experiment_columns();
    let numerator = finite_column(table, &numer, arm)?;
    let denominator = finite_column(table, &denom, arm)?;

    let pre_period = match columns.pre_period_columns() {
        Some((pre_numer, pre_denom)) => Some(PrePeriodView {
            numerator: finite_column(table, &pre_numer, arm)?,
            denominator: finite_column(table, &pre_denom, arm)?,
        }),
        None => None,
    };

    let n = table.len();
    if n < 2 {
        return Err(EstimationError::InsufficientData { arm, n });
    }

    let summary = GroupSummary {
        arm,
        n,
        experiment: RatioSums::from_columns(numerator, denominator),
        pre_period: pre_period.map(|pre| RatioSums::from_columns(pre.numerator, pre.denominator)),
    };

    Ok(AggregatedGroup {
        view: GroupView {
            arm,
            numerator,
            denominator,
            pre_period,
        },
        summary,
    })
}

fn finite_column<'a>(table: &'a UnitTable, name: &str, arm: Arm) -> Result<&'a [f64]> {
    let values = table
        .column(name)
        .ok_or_else(|| EstimationError::MissingColumn {
            column: name.to_string(),
            arm,
        })?;

    if let Some(row) = values.iter().position(|v| !v.is_finite()) {
        return Err(EstimationError::NonFiniteValue {
            column: name.to_string(),
            row,
        });
    }
    Ok(values)
}
