//! Synthetic experiments for validating the estimators.
//!
//! The estimators never depend on this module; it only produces
//! [`UnitTable`](crate::UnitTable)s in the documented column layout and runs
//! null calibration studies on them.

mod calibration;
mod generator;
mod impact;

pub use calibration::{ks_uniform_distance, run_null_calibration, CalibrationReport};
pub use generator::{
    ExperimentPeriod, GeneratorConfig, RatioDataGenerator, SimulatedData, SimulatedUnit, COL_N,
    COL_N_EXP, COL_TREATMENT, COL_TYPE, COL_Y, COL_Y_EXP,
};
pub use impact::{ExperimentImpact, ImpactWidth, DEFAULT_WIDTH_FRACTION};
