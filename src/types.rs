//! Type aliases and common types.

use std::fmt;

use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};

/// 2x2 covariance matrix over (numerator, denominator).
pub type Matrix2 = SMatrix<f64, 2, 2>;

/// Gradient of a ratio with respect to (numerator, denominator).
pub type Vector2 = SVector<f64, 2>;

/// 4x4 covariance matrix over (Y, N, X, M).
pub type Matrix4 = SMatrix<f64, 4, 4>;

/// Gradient over (Y, N, X, M).
pub type Vector4 = SVector<f64, 4>;

/// Experiment arm a group of units was assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arm {
    /// Units that did not receive the change.
    Control,
    /// Units exposed to the change.
    Treatment,
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arm::Control => f.write_str("control"),
            Arm::Treatment => f.write_str("treatment"),
        }
    }
}
