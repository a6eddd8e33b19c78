//! Entry points: structural checks, verifier selection and report assembly.

use solcheck_core::{Policy, ReportFlag, ReportKind, VerifyReport};
use tracing::{debug, warn};

use crate::blocks::{extract_blocks, Heading};
use crate::directive::classify;
use crate::normalize::normalize;
use crate::structural::structural_checks;
use crate::verifiers::{Submission, Verifier};

/// Verifiers that run for `submission`.
///
/// With a directive in `CHECK` only the first verifier claiming it runs.
/// Without one every verifier whose topic keywords match runs.
pub fn select_verifiers(topic: &str, submission: &Submission<'_>) -> Vec<Verifier> {
    match submission.directive {
        Some(kind) => Verifier::ALL
            .into_iter()
            .find(|v| v.can_handle(kind.keyword(), submission))
            .into_iter()
            .collect(),
        None => Verifier::ALL
            .into_iter()
            .filter(|v| v.can_handle(topic, submission))
            .collect(),
    }
}

/// Verifies a solution text as given, without normalizing it first.
///
/// Never fails: every problem found, including unparsable input, is a failing
/// item of the returned report.
pub fn verify(topic: &str, statement: &str, solution: &str, policy: &Policy) -> VerifyReport {
    let mut blocks = extract_blocks(solution);
    let non_empty = |content: String| Some(content).filter(|c| !c.is_empty());
    let final_answer = blocks.remove(&Heading::FinalAnswer).and_then(non_empty);
    let check = blocks.remove(&Heading::Check).and_then(non_empty);

    let structural = structural_checks(statement, solution, policy);
    let directive = classify(check.as_deref());
    let submission = Submission {
        topic,
        statement,
        solution,
        final_answer: final_answer.as_deref(),
        check: check.as_deref(),
        directive,
    };
    let selected = select_verifiers(topic, &submission);
    debug!(?directive, ?selected, "verifiers selected");

    let mut report = if selected.is_empty() {
        warn!(topic, "no verifier applicable");
        let mut report = VerifyReport::new(ReportKind::Structural, "no verifier applicable");
        report.extend(structural.into_items());
        report
    } else {
        let names: Vec<&str> = selected.iter().map(|v| v.name()).collect();
        let mut report = VerifyReport::new(
            ReportKind::Mixed,
            format!("structural checks + {}", names.join(" + ")),
        );
        report.extend(structural.into_items());
        for verifier in &selected {
            let mut outcome = verifier.verify(&submission, policy);
            debug!(verifier = %verifier, ok = outcome.ok(), "verifier finished");
            report.details.append(&mut outcome.details);
            report.extend(outcome.into_items());
        }
        report
    };
    report.detail("verifiers", &selected);
    report.detail("directive", directive.map(|d| d.keyword()));
    report
}

/// Normalizes the input, then verifies it.
///
/// Applied rewrites are listed under `details["autofix"]`; the report is
/// flagged [`ReportFlag::AutoFixed`] when any rewrite happened and
/// [`ReportFlag::StatementPadded`] when the statement was lengthened.
pub fn verify_normalized(
    topic: &str,
    statement: &str,
    solution: &str,
    policy: &Policy,
) -> VerifyReport {
    let normalized = normalize(statement, solution, policy);
    let mut report = verify(topic, &normalized.statement, &normalized.solution, policy);
    if !normalized.fixes.is_empty() {
        report.flag(ReportFlag::AutoFixed);
    }
    if normalized.padded() {
        report.flag(ReportFlag::StatementPadded);
    }
    report.detail("autofix", &normalized.fixes);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::DirectiveKind;

    fn submission<'a>(check: Option<&'a str>, answer: Option<&'a str>) -> Submission<'a> {
        Submission {
            topic: "",
            statement: "",
            solution: "",
            final_answer: answer,
            check,
            directive: classify(check),
        }
    }

    #[test]
    fn directive_mode_is_exclusive() {
        let sub = submission(Some("SYSTEM; Eq(x+y, 1); Eq(x-y, 3)"), Some("{x: 2, y: -1}"));
        assert_eq!(sub.directive, Some(DirectiveKind::System));
        assert_eq!(
            select_verifiers("équations, suites, statistiques", &sub),
            vec![Verifier::EquationsSystem]
        );
    }

    #[test]
    fn topic_mode_is_inclusive() {
        let sub = submission(None, Some("2"));
        let selected = select_verifiers("Dérivées et statistiques", &sub);
        assert_eq!(selected, vec![Verifier::Calculus, Verifier::Statistics]);
    }

    #[test]
    fn unknown_topic_selects_nothing() {
        let sub = submission(None, None);
        assert!(select_verifiers("géométrie", &sub).is_empty());
    }
}
