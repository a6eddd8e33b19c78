//! Matrix, determinant and vector identities stated in `CHECK`.

use solcheck_core::{ReportKind, VerifyReport};
use solcheck_sym::{equals, is_zero, parse, Expr};

use super::{decided, mentions, Submission};

const TOPICS: [&str; 6] = [
    "matrice",
    "matrix",
    "déterminant",
    "determinant",
    "vecteur",
    "espace",
];

pub(super) fn can_handle(selector: &str, submission: &Submission<'_>) -> bool {
    mentions(selector, &TOPICS) && submission.final_answer.is_some()
}

pub(super) fn verify(submission: &Submission<'_>) -> VerifyReport {
    let mut report = VerifyReport::new(ReportKind::Symbolic, "Linear algebra");
    match submission.final_answer.map(parse) {
        Some(Ok(_)) => report.add("parse.final_answer", true, "FINAL_ANSWER parsed"),
        Some(Err(err)) => {
            report.add("parse.final_answer", false, format!("FINAL_ANSWER not parsable: {err}"));
            return report;
        }
        None => {
            report.add("parse.final_answer", false, "FINAL_ANSWER missing");
            return report;
        }
    }

    let Some(check) = submission.check else {
        report.add("parse.check", true, "no CHECK given");
        return report;
    };
    match parse(check) {
        Ok(Expr::Eq(lhs, rhs)) => {
            report.add("parse.check", true, "CHECK parsed");
            let (ok, message) = decided(
                equals(&lhs, &rhs),
                "CHECK equality holds",
                "CHECK equality does not hold",
            );
            report.add("symbolic.check_eq", ok, message);
        }
        Ok(expr) => {
            report.add("parse.check", true, "CHECK parsed");
            let (ok, message) = decided(
                is_zero(&expr),
                "CHECK expression is 0",
                "CHECK expression is not 0",
            );
            report.add("symbolic.check_expr", ok, message);
        }
        Err(err) => report.add("parse.check", false, format!("CHECK not parsable: {err}")),
    }
    report
}
