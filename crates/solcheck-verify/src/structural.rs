//! Verifier-independent sanity checks on the text shape.

use solcheck_core::{Policy, ReportKind, VerifyReport};

/// Placeholder marker that generators leave in truncated output.
pub const ELLIPSIS: &str = "...";

/// Statement length and placeholder checks.
pub fn structural_checks(statement: &str, solution: &str, policy: &Policy) -> VerifyReport {
    let mut report = VerifyReport::new(ReportKind::Structural, "Structural checks");
    let length = statement.trim().chars().count();
    if length < policy.min_statement_chars {
        report.add(
            "structure.enonce",
            false,
            format!(
                "statement too short or empty ({length} < {} characters)",
                policy.min_statement_chars
            ),
        );
    } else {
        report.add("structure.enonce", true, "statement OK");
    }
    if statement.contains(ELLIPSIS) || solution.contains(ELLIPSIS) {
        report.add(
            "structure.ellipsis",
            false,
            "placeholder '...' in statement or solution",
        );
    } else {
        report.add("structure.ellipsis", true, "no '...' placeholder");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_characters_not_bytes() {
        let policy = Policy::default();
        let statement = "é".repeat(39);
        let report = structural_checks(&statement, "", &policy);
        assert!(!report.ok());
        let statement = "é".repeat(40);
        assert!(structural_checks(&statement, "", &policy).ok());
    }

    #[test]
    fn ellipsis_in_solution_fails() {
        let statement = "Résoudre l'équation 2x + 1 = 5 dans les réels.";
        let report = structural_checks(statement, "x = ...", &Policy::default());
        assert_eq!(report.failures().count(), 1);
        assert!(report.item("structure.ellipsis").is_some_and(|item| !item.ok));
    }
}
