//! Identities over the complex numbers; `i` and `I` both denote the imaginary unit.

use solcheck_core::{ReportKind, VerifyReport};
use solcheck_sym::{equals, is_zero, parse_with, Expr, ParseOptions};

use super::{decided, mentions, Submission};

const TOPICS: [&str; 4] = ["complex", "complexe", "affixe", "imaginaire"];

const OPTIONS: ParseOptions = ParseOptions { imaginary_i: true };

pub(super) fn can_handle(selector: &str, submission: &Submission<'_>) -> bool {
    mentions(selector, &TOPICS) && submission.final_answer.is_some()
}

pub(super) fn verify(submission: &Submission<'_>) -> VerifyReport {
    let mut report = VerifyReport::new(ReportKind::Mixed, "Complex numbers");
    let Some(answer) = submission.final_answer else {
        report.add("parse.final_answer", false, "FINAL_ANSWER missing");
        return report;
    };
    if let Err(err) = parse_with(answer, &OPTIONS) {
        report.add("parse.final_answer", false, format!("FINAL_ANSWER not parsable: {err}"));
        return report;
    }
    report.add("parse.final_answer", true, "FINAL_ANSWER parsed");

    let Some(check) = submission.check else {
        report.add("parse.check", true, "no CHECK given");
        return report;
    };
    let parsed = match parse_with(check, &OPTIONS) {
        Ok(parsed) => parsed,
        Err(err) => {
            report.add("parse.check", false, format!("CHECK not parsable: {err}"));
            return report;
        }
    };
    report.add("parse.check", true, "CHECK parsed");

    match parsed {
        // Equalities between constants are decided outright.
        Expr::Eq(lhs, rhs) if lhs.free_symbols().is_empty() && rhs.free_symbols().is_empty() => {
            let (ok, message) = decided(
                equals(&lhs, &rhs),
                "CHECK evaluates to true",
                "CHECK evaluates to false",
            );
            report.add("symbolic.check_bool", ok, message);
        }
        Expr::Eq(lhs, rhs) => {
            let (ok, message) = decided(
                equals(&lhs, &rhs),
                "CHECK equality holds",
                "CHECK equality does not hold",
            );
            report.add("symbolic.check_eq", ok, message);
        }
        expr => {
            let (ok, message) = decided(
                is_zero(&expr),
                "CHECK expression is 0",
                "CHECK expression is not 0",
            );
            report.add("symbolic.check_expr", ok, message);
        }
    }
    report
}
