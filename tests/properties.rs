//! Property tests of estimator invariants.

use proptest::prelude::*;
use ratio_ate::{ColumnSpec, EstimationError, RatioAteEstimator, UnitRecord, UnitTable};

fn columns() -> ColumnSpec {
    ColumnSpec::new("Y", "N")
        .experiment_suffix("_exp")
        .pre_period_suffix("_pre")
}

/// Units with positive denominators and numerators no larger than them.
fn units() -> impl Strategy<Value = Vec<UnitRecord>> {
    prop::collection::vec(
        (1.0..200.0f64, 0.0..1.0f64, 1.0..200.0f64, 0.0..1.0f64).prop_map(|(n, p, m, q)| {
            UnitRecord::new((n * p).floor(), n.ceil()).with_pre_period((m * q).floor(), m.ceil())
        }),
        3..40,
    )
}

fn scaled(records: &[UnitRecord], factor: f64) -> Vec<UnitRecord> {
    records
        .iter()
        .map(|r| {
            UnitRecord::new(r.y * factor, r.n * factor)
                .with_pre_period(r.x.unwrap_or(0.0) * factor, r.m.unwrap_or(0.0) * factor)
        })
        .collect()
}

proptest! {
    #[test]
    fn ate_matches_ratio_of_sums(control in units(), treatment in units()) {
        let c = UnitTable::from_records(&control, &columns());
        let t = UnitTable::from_records(&treatment, &columns());
        let result = RatioAteEstimator::new(&c, &t, columns()).unwrap().estimate().unwrap();

        let ratio = |records: &[UnitRecord]| {
            records.iter().map(|r| r.y).sum::<f64>() / records.iter().map(|r| r.n).sum::<f64>()
        };
        prop_assert!((result.ate - (ratio(&treatment) - ratio(&control))).abs() < 1e-9);
        prop_assert!((0.0..=1.0).contains(&result.pval));
        prop_assert!(result.variance_pooled >= 0.0);
    }

    #[test]
    fn ate_is_scale_invariant(
        control in units(),
        treatment in units(),
        factor in 0.5..20.0f64,
    ) {
        let c = UnitTable::from_records(&control, &columns());
        let t = UnitTable::from_records(&treatment, &columns());
        let base = RatioAteEstimator::new(&c, &t, columns()).unwrap().estimate().unwrap();

        let c_scaled = UnitTable::from_records(&scaled(&control, factor), &columns());
        let t_scaled = UnitTable::from_records(&scaled(&treatment, factor), &columns());
        let rescaled = RatioAteEstimator::new(&c_scaled, &t_scaled, columns())
            .unwrap()
            .estimate()
            .unwrap();

        prop_assert!((base.ate - rescaled.ate).abs() < 1e-9);
        prop_assert!((base.pval - rescaled.pval).abs() < 1e-6);
    }

    #[test]
    fn cuped_bounds(control in units(), treatment in units()) {
        let c = UnitTable::from_records(&control, &columns());
        let t = UnitTable::from_records(&treatment, &columns());
        let estimator = RatioAteEstimator::new(&c, &t, columns()).unwrap();
        let base = estimator.estimate().unwrap();

        // θ is undefined only when every pooled unit has the same pre-period ratio.
        let pre_ratios: Vec<f64> = control
            .iter()
            .chain(&treatment)
            .map(|r| r.x.unwrap_or(0.0) / r.m.unwrap_or(1.0))
            .collect();
        let constant = pre_ratios.iter().all(|&r| r == pre_ratios[0]);

        match estimator.estimate_cuped(&base) {
            Ok(cuped) => {
                prop_assert!(!constant);
                prop_assert!((0.0..=1.0).contains(&cuped.rho_sq));
                prop_assert!(cuped.variance_pooled_cuped <= base.variance_pooled);
                prop_assert!((0.0..=1.0).contains(&cuped.pval_cuped));
                if cuped.rho_sq > f64::EPSILON && base.variance_pooled > 0.0 {
                    prop_assert!(cuped.variance_pooled_cuped < base.variance_pooled);
                }
                if cuped.rho_sq == 0.0 {
                    prop_assert_eq!(cuped.variance_pooled_cuped, base.variance_pooled);
                }
            }
            Err(err) => {
                prop_assert!(constant, "unexpected {:?}", err);
                prop_assert!(matches!(err, EstimationError::Numerical(_)));
            }
        }
    }
}
