//! Terminal output formatting with colors.

use colored::Colorize;

use crate::result::{AteResult, CupedAteResult, EstimateReport};

/// Format an estimate for human-readable terminal output.
///
/// `alpha` is the significance level used for the verdict lines.
pub fn format_report(report: &EstimateReport, alpha: f64) -> String {
    let mut output = String::new();
    let sep = "\u{2500}".repeat(62);

    output.push_str("ratio-ate\n");
    output.push_str(&sep);
    output.push_str("\n\n");

    format_base(&mut output, &report.base, alpha);

    match &report.cuped {
        Some(cuped) => format_cuped(&mut output, report.base.variance_pooled, cuped, alpha),
        None => output.push_str("  CUPED: not run (no pre-period columns)\n\n"),
    }

    output.push_str(&sep);
    output.push('\n');
    output.push_str("Note: p-values use a normal approximation of the ratio's sampling distribution.\n");

    output
}

fn format_base(output: &mut String, base: &AteResult, alpha: f64) {
    output.push_str(&format!(
        "  Units: {} control, {} treatment\n",
        base.n_control, base.n_treatment
    ));
    output.push_str(&format!(
        "  Metric: {:.4} control, {:.4} treatment\n\n",
        base.control_metric, base.treatment_metric
    ));
    output.push_str(&format!("  {}\n", verdict(base.is_significant(alpha), alpha)));
    output.push_str(&format!(
        "    ATE: {:+.4} ({:+.1}% relative), SE {:.4}\n",
        base.ate,
        base.relative_lift() * 100.0,
        base.standard_error()
    ));
    output.push_str(&format!("    z = {:.3}, p = {:.4}\n\n", base.zstat, base.pval));
}

fn format_cuped(output: &mut String, base_variance: f64, cuped: &CupedAteResult, alpha: f64) {
    output.push_str(&format!(
        "  CUPED (theta = {:.3}, variance explained = {:.1}%)\n",
        cuped.theta,
        cuped.rho_sq * 100.0
    ));
    output.push_str(&format!("  {}\n", verdict(cuped.is_significant(alpha), alpha)));
    output.push_str(&format!(
        "    ATE: {:+.4}, SE {:.4}\n",
        cuped.ate_cuped,
        cuped.standard_error()
    ));
    output.push_str(&format!(
        "    z = {:.3}, p = {:.4}\n",
        cuped.zstat_cuped, cuped.pval_cuped
    ));
    output.push_str(&format!(
        "    Pooled variance: {:.3e} -> {:.3e}\n\n",
        base_variance, cuped.variance_pooled_cuped
    ));
}

fn verdict(significant: bool, alpha: f64) -> String {
    if significant {
        format!("\u{2713} Significant at alpha = {}", alpha)
            .green()
            .bold()
            .to_string()
    } else {
        format!("\u{2022} Not significant at alpha = {}", alpha)
            .yellow()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_report(with_cuped: bool) -> EstimateReport {
        let base = AteResult {
            ate: 0.05,
            pval: 0.003,
            variance_pooled: 0.04,
            zstat: 2.97,
            control_metric: 0.2,
            treatment_metric: 0.25,
            n_control: 500,
            n_treatment: 510,
        };
        let cuped = CupedAteResult {
            ate_cuped: 0.048,
            pval_cuped: 0.0001,
            variance_pooled_cuped: 0.02,
            theta: 0.9,
            rho_sq: 0.5,
            zstat_cuped: 3.9,
            control_metric_cuped: 0.02,
            treatment_metric_cuped: 0.068,
            n_control: 500,
            n_treatment: 510,
        };
        EstimateReport {
            base,
            cuped: with_cuped.then_some(cuped),
        }
    }

    #[test]
    fn test_format_with_cuped() {
        let output = format_report(&make_report(true), 0.05);
        assert!(output.contains("ratio-ate"));
        assert!(output.contains("ATE: +0.0500 (+25.0% relative)"));
        assert!(output.contains("variance explained = 50.0%"));
        assert!(output.contains("Significant at alpha = 0.05"));
    }

    #[test]
    fn test_format_without_cuped() {
        let output = format_report(&make_report(false), 0.001);
        assert!(output.contains("CUPED: not run"));
        assert!(output.contains("Not significant at alpha = 0.001"));
    }
}
