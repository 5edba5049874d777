//! Error types for ratio-metric estimation.

use thiserror::Error;

use crate::types::Arm;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EstimationError>;

/// Errors raised while aggregating groups or estimating treatment effects.
///
/// All errors are raised at the point of detection; a failed estimation
/// never yields a partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    /// A required column is absent from a group's table.
    #[error("column `{column}` not found in {arm} group")]
    MissingColumn {
        /// Fully resolved column name (base name plus suffix).
        column: String,
        /// Arm whose table lacks the column.
        arm: Arm,
    },

    /// A group has too few units for a sample covariance.
    #[error("{arm} group has {n} unit(s); at least 2 are required")]
    InsufficientData {
        /// Arm with too few units.
        arm: Arm,
        /// Number of units observed.
        n: usize,
    },

    /// A mean denominator is zero, so the ratio metric is undefined.
    #[error("mean denominator is zero for {metric}; ratio metric is undefined")]
    DegenerateMetric {
        /// Which ratio could not be formed (e.g. "treatment experiment-period").
        metric: String,
    },

    /// CUPED was requested but no pre-period columns were configured.
    #[error("CUPED requires pre-period numerator and denominator columns")]
    MissingCovariate,

    /// A variance or count made the computation numerically undefined.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Table columns have different lengths.
    #[error("column `{column}` has {actual} rows, expected {expected}")]
    ColumnLengthMismatch {
        /// Offending column.
        column: String,
        /// Row count of the table.
        expected: usize,
        /// Row count of the column.
        actual: usize,
    },

    /// A consumed column holds NaN or an infinite value.
    #[error("column `{column}` has a non-finite value at row {row}")]
    NonFiniteValue {
        /// Offending column.
        column: String,
        /// Zero-based row index.
        row: usize,
    },

    /// The base result passed to CUPED was computed from other groups.
    #[error(
        "base result covers {base_control}/{base_treatment} units, \
         estimator groups have {control}/{treatment}"
    )]
    BaseResultMismatch {
        /// Control count recorded in the base result.
        base_control: usize,
        /// Treatment count recorded in the base result.
        base_treatment: usize,
        /// Control count of this estimator.
        control: usize,
        /// Treatment count of this estimator.
        treatment: usize,
    },
}

impl EstimationError {
    pub(crate) fn degenerate(metric: impl Into<String>) -> Self {
        EstimationError::DegenerateMetric {
            metric: metric.into(),
        }
    }

    pub(crate) fn numerical(reason: impl Into<String>) -> Self {
        EstimationError::Numerical(reason.into())
    }
}

/// Errors raised while configuring or running the synthetic data generator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// Per-type parameter arrays have different lengths.
    #[error("per-type parameters differ in length: {0}")]
    LengthMismatch(String),

    /// A parameter is outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Estimation on a simulated experiment failed.
    #[error(transparent)]
    Estimation(#[from] EstimationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_arm_and_column() {
        let err = EstimationError::MissingColumn {
            column: "N_exp".to_string(),
            arm: Arm::Treatment,
        };
        assert_eq!(err.to_string(), "column `N_exp` not found in treatment group");

        let err = EstimationError::InsufficientData {
            arm: Arm::Control,
            n: 1,
        };
        assert!(err.to_string().contains("control group has 1 unit"));
    }
}
