#![allow(dead_code)]

use solcheck_core::Policy;
use solcheck_verify::{classify, Submission};

/// Long enough to pass the structural length check without padding.
pub const STATEMENT: &str =
    "On considère la fonction définie ci-dessous. Répondre puis vérifier le résultat obtenu.";

/// Four-heading solution text around `final_answer` and `check`.
pub fn solution(final_answer: &str, check: &str) -> String {
    format!(
        "EXERCICE:\n{STATEMENT}\n\nSOLUTION:\nCalcul détaillé.\n\nFINAL_ANSWER:\n{final_answer}\n\nCHECK:\n{check}"
    )
}

pub fn policy() -> Policy {
    Policy::default()
}

/// A submission read directly, bypassing block extraction.
pub fn submission<'a>(topic: &'a str, final_answer: &'a str, check: &'a str) -> Submission<'a> {
    let check = Some(check).filter(|c| !c.is_empty());
    Submission {
        topic,
        statement: STATEMENT,
        solution: "",
        final_answer: Some(final_answer).filter(|a| !a.is_empty()),
        check,
        directive: classify(check),
    }
}

pub fn failing(report: &solcheck_core::VerifyReport) -> Vec<String> {
    report.failures().map(|item| item.name.clone()).collect()
}
