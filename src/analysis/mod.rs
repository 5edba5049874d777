//! Analysis pipeline for ratio-metric treatment effects.
//!
//! 1. **Aggregation** ([`aggregate()`]): per-arm sums and means
//! 2. **Delta method** ([`delta_method_variance`]): linearized variance of each arm's ratio
//! 3. **Pooled test** ([`pooled_z_test`]): pooled variance and two-sided z-test
//! 4. **CUPED** ([`fit_cuped`]): pre-period adjustment coefficients θ and ρ²

mod aggregate;
mod cuped;
mod delta;
mod pooled;

pub use aggregate::{aggregate, AggregatedGroup, GroupSummary, GroupView, PrePeriodView, RatioSums};
pub use cuped::{fit_cuped, pre_period_scale, CupedFit};
pub use delta::{delta_method_variance, ratio_gradient, DeltaVariance};
pub use pooled::{pooled_z_test, PooledVariance, ZTest};
