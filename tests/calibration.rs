//! Calibration tests on synthetic experiments.
//!
//! Each test uses a fixed seed, so the simulated data and therefore the
//! outcome are deterministic.

use ratio_ate::simulation::{
    run_null_calibration, ExperimentImpact, GeneratorConfig, RatioDataGenerator, COL_N, COL_Y,
};
use ratio_ate::{ColumnSpec, RatioAteEstimator};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn columns() -> ColumnSpec {
    ColumnSpec::new(COL_Y, COL_N)
        .experiment_suffix("_exp")
        .pre_period_suffix("")
}

/// Under the null, p-values are close to uniform.
#[test]
fn null_false_positive_rate() {
    init_tracing();
    let report = run_null_calibration(&GeneratorConfig::default(), 300, 7).unwrap();

    let fpr = report.rejection_rate(0.05);
    eprintln!(
        "[null_false_positive_rate] fpr={:.3} cuped_fpr={:.3} mean_p={:.3} ks={:.3}",
        fpr,
        report.cuped_rejection_rate(0.05),
        report.mean_pvalue(),
        report.ks_distance()
    );

    assert!(fpr > 0.005 && fpr < 0.12, "fpr = {}", fpr);
    assert!(
        report.cuped_rejection_rate(0.05) < 0.12,
        "cuped fpr = {}",
        report.cuped_rejection_rate(0.05)
    );
    assert!(
        (0.4..0.6).contains(&report.mean_pvalue()),
        "mean p = {}",
        report.mean_pvalue()
    );
    assert!(report.ks_distance() < 0.12, "ks = {}", report.ks_distance());
}

/// The pre-period of the same unit is a strong covariate.
#[test]
fn cuped_explains_variance() {
    let report = run_null_calibration(&GeneratorConfig::default(), 50, 13).unwrap();
    let mean_rho_sq = report.rho_sq.iter().sum::<f64>() / report.trials() as f64;

    assert!(mean_rho_sq > 0.1, "mean rho_sq = {}", mean_rho_sq);
    assert!(report.rho_sq.iter().all(|r| (0.0..=1.0).contains(r)));
}

/// A large positive change is detected by both estimators.
#[test]
fn detects_large_effect() {
    let mut generator = RatioDataGenerator::new(GeneratorConfig {
        units: 5_000,
        ..GeneratorConfig::default()
    })
    .unwrap();
    let impact = ExperimentImpact::new(30.0).unwrap();
    let data = generator.generate(Some(&impact)).unwrap();
    let (control, treatment) = data.split_by_arm().unwrap();

    let report = RatioAteEstimator::new(&control, &treatment, columns())
        .unwrap()
        .estimate_all()
        .unwrap();
    let cuped = report.cuped.unwrap();

    assert!(report.base.ate > 0.0);
    assert!(report.base.pval < 0.01, "p = {}", report.base.pval);
    assert!(cuped.ate_cuped > 0.0);
    assert!(cuped.pval_cuped < 0.01, "cuped p = {}", cuped.pval_cuped);
    assert!(cuped.variance_pooled_cuped <= report.base.variance_pooled);
}

/// Same seed, same data.
#[test]
fn generator_is_reproducible() {
    let impact = ExperimentImpact::new(10.0).unwrap();
    let a = RatioDataGenerator::new(GeneratorConfig::quick())
        .unwrap()
        .generate(Some(&impact))
        .unwrap();
    let b = RatioDataGenerator::new(GeneratorConfig::quick())
        .unwrap()
        .generate(Some(&impact))
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(a.units.len(), 200);
    assert!(a.treated() > 0 && a.treated() < 200);
}
