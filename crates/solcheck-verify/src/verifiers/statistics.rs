//! Simple linear regression recomputed from the statement's table.
//!
//! The table layout is not parsed: the last `stat_series_len` numeric
//! literals of the statement are read as a y-series indexed `0..n`.

use std::sync::OnceLock;

use regex::Regex;
use solcheck_core::{Policy, ReportKind, VerifyReport};

use super::{mentions, Submission};

const TOPICS: [&str; 5] = ["stat", "régression", "regression", "corrél", "correl"];

fn statement_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d+(?:\.\d+)?\b").expect("valid statement number regex"))
}

fn solution_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("valid solution number regex"))
}

pub(super) fn can_handle(selector: &str, _submission: &Submission<'_>) -> bool {
    mentions(selector, &TOPICS)
}

pub(super) fn verify(submission: &Submission<'_>, policy: &Policy) -> VerifyReport {
    let mut report = VerifyReport::new(ReportKind::Numeric, "Statistics and regression (numeric)");

    let numbers = numbers_in(statement_number_regex(), submission.statement);
    let needed = policy.stat_min_numbers.max(policy.stat_series_len);
    if numbers.len() < needed {
        report.add(
            "extract.table",
            false,
            format!("only {} numbers found in the statement, need {needed}", numbers.len()),
        );
        return report;
    }

    let series = &numbers[numbers.len() - policy.stat_series_len..];
    let fit = Regression::fit(series);
    report.detail("r", fit.r);
    report.detail("slope", fit.slope);
    report.detail("intercept", fit.intercept);

    let claimed = numbers_in(solution_number_regex(), submission.solution);
    report.add(
        "extract.solution_numbers",
        !claimed.is_empty(),
        format!("{} numbers found in the solution", claimed.len()),
    );
    if claimed.is_empty() {
        report.add(
            "numeric.consistency",
            false,
            "no number in the solution to compare against",
        );
        return report;
    }

    let consistent = claimed.iter().any(|v| {
        (v - fit.r).abs() < policy.corr_tol || (v - fit.slope).abs() < policy.slope_tol
    });
    report.add(
        "numeric.consistency",
        consistent,
        format!(
            "recomputed r={:.3}, slope={:.3}, intercept={:.3}",
            fit.r, fit.slope, fit.intercept
        ),
    );
    report
}

fn numbers_in(re: &Regex, text: &str) -> Vec<f64> {
    let text = text.replace(',', ".");
    re.find_iter(&text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Least-squares fit of `y` against `x = 0, 1, ..`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Regression {
    slope: f64,
    intercept: f64,
    r: f64,
}

impl Regression {
    fn fit(y: &[f64]) -> Self {
        let n = y.len() as f64;
        let x: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();
        let mean = |v: &[f64]| v.iter().sum::<f64>() / n;
        let (x_mean, y_mean) = (mean(&x), mean(y));
        let cov = x
            .iter()
            .zip(y)
            .map(|(xi, yi)| (xi - x_mean) * (yi - y_mean))
            .sum::<f64>()
            / n;
        let x_var = x.iter().map(|xi| (xi - x_mean).powi(2)).sum::<f64>() / n;
        let y_var = y.iter().map(|yi| (yi - y_mean).powi(2)).sum::<f64>() / n;

        let slope = if x_var != 0.0 { cov / x_var } else { 0.0 };
        let r = if x_var != 0.0 && y_var != 0.0 {
            cov / (x_var.sqrt() * y_var.sqrt())
        } else {
            0.0
        };
        Self {
            slope,
            intercept: y_mean - slope * x_mean,
            r,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_line() {
        let fit = Regression::fit(&[1.0, 3.0, 5.0, 7.0, 9.0]);
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
        assert!((fit.r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_series_has_zero_correlation() {
        let fit = Regression::fit(&[4.0; 5]);
        assert_eq!(fit.r, 0.0);
        assert_eq!(fit.slope, 0.0);
    }

    #[test]
    fn decimal_commas_are_read() {
        let numbers = numbers_in(statement_number_regex(), "valeurs 1,5 et 2");
        assert_eq!(numbers, vec![1.5, 2.0]);
    }
}
