//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized

use crate::domain::FitReport;
use crate::fit::SweepPoint;
use crate::optimize::OptimizeResult;

/// Multi-line summary of a minimizer run, in the familiar L-BFGS-B layout.
pub fn format_optimize_result(res: &OptimizeResult) -> String {
    let n = res.hess_inv.dim();
    let mut out = String::new();
    out.push_str(&format!("  message: {}\n", res.message()));
    out.push_str(&format!("  success: {}\n", res.success()));
    out.push_str(&format!("   status: {}\n", res.status.code()));
    out.push_str(&format!("      fun: {:e}\n", res.fun));
    out.push_str(&format!("        x: {}\n", fmt_sci(&res.x)));
    out.push_str(&format!("      nit: {}\n", res.nit));
    out.push_str(&format!("      jac: {}\n", fmt_sci(&res.jac)));
    out.push_str(&format!("     nfev: {}\n", res.nfev));
    out.push_str(&format!("     njev: {}\n", res.njev));
    out.push_str(&format!(
        " hess_inv: <{n}x{n} limited-memory inverse Hessian, {} pairs>",
        res.hess_inv.len()
    ));
    out
}

/// Terminal summary of one fit.
pub fn format_fit_summary(report: &FitReport) -> String {
    let mut out = String::new();

    out.push_str("=== gfit - weighted two-channel growth fit ===\n");
    out.push_str(&format!(
        "Model: {} | norm: {:?} | lagrange: {} | tol: {:e}\n",
        report.model.display_name(),
        report.norm,
        report.lagrange,
        report.tol
    ));
    out.push_str(&format!(
        "Data: n={} | channels: {} / {}",
        report.n_samples, report.channels[0], report.channels[1]
    ));
    if let Some(origin) = report.origin {
        out.push_str(&format!(" | x=0 at {origin}"));
    }
    out.push('\n');

    out.push_str(&format!(
        "Status: {} ({}) | nit={} nfev={}\n",
        if report.success { "converged" } else { "not converged" },
        report.message,
        report.nit,
        report.nfev
    ));

    out.push_str("\nParameters:\n");
    out.push_str(format!("{:<12} {:>16} {:>16}", "name", "value", "sqrt(H_ii)").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<12} {:-<16} {:-<16}", "", "", "").trim_end());
    out.push('\n');
    for p in &report.params {
        let scale = p.curvature_scale.map(|v| format!("{v:.6e}")).unwrap_or_else(|| "-".to_string());
        out.push_str(format!("{:<12} {:>16.8} {:>16}", p.name, p.value, scale).trim_end());
        out.push('\n');
    }

    out.push_str("\nResiduals:\n");
    out.push_str(&format!("- {}: {:.6e}\n", report.channels[0], report.channel_norms[0]));
    out.push_str(&format!(
        "- {}: {:.6e} (x {})\n",
        report.channels[1], report.channel_norms[1], report.lagrange
    ));
    out.push_str(&format!("- objective: {:.6e}\n", report.objective));

    out
}

/// Table of a Lagrange sweep, one row per weight.
pub fn format_sweep_table(points: &[SweepPoint], param_names: &[&str], labels: &[String; 2]) -> String {
    let mut out = String::new();

    let mut header = format!("{:>10} {:>14} {:>14} {:>14}", "lagrange", labels[0], labels[1], "objective");
    for name in param_names {
        header.push_str(&format!(" {name:>14}"));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for p in points {
        let mut row = format!(
            "{:>10} {:>14.6e} {:>14.6e} {:>14.6e}",
            p.lagrange, p.channel_norms[0], p.channel_norms[1], p.objective
        );
        for v in &p.params {
            row.push_str(&format!(" {v:>14.6}"));
        }
        if !p.success {
            row.push_str("  (not converged)");
        }
        out.push_str(row.trim_end());
        out.push('\n');
    }

    out
}

fn fmt_sci(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.3e}")).collect();
    format!("[{}]", parts.join("  "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::{ConvergenceReason, InverseHessian, TerminationStatus};

    #[test]
    fn optimize_result_summary_lists_core_fields() {
        let res = OptimizeResult {
            x: vec![2.0, 3.0],
            fun: 1e-9,
            jac: vec![0.0, 0.0],
            nit: 7,
            nfev: 30,
            njev: 8,
            status: TerminationStatus::Converged(ConvergenceReason::RelativeReduction),
            hess_inv: InverseHessian::new(2),
        };
        let text = format_optimize_result(&res);
        assert!(text.contains("CONVERGENCE: REL_REDUCTION_OF_F_<=_FACTR*EPSMCH"));
        assert!(text.contains("success: true"));
        assert!(text.contains("x: [2.000e0  3.000e0]"));
        assert!(text.contains("nit: 7"));
        assert!(text.contains("<2x2 limited-memory inverse Hessian, 0 pairs>"));
    }

    #[test]
    fn sweep_table_flags_unconverged_rows() {
        let points = vec![SweepPoint {
            lagrange: 2.0,
            params: vec![1.0, 2.0],
            channel_norms: [0.5, 0.25],
            objective: 1.0,
            success: false,
        }];
        let labels = ["cases".to_string(), "deaths".to_string()];
        let table = format_sweep_table(&points, &["a", "b"], &labels);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("cases") && lines[0].contains("deaths"));
        assert!(lines[1].ends_with("(not converged)"));
    }
}
