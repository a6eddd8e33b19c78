//! The closed set of domain verifiers.

mod calculus;
mod complex;
mod equations;
mod linear_algebra;
mod optimization;
mod sequences;
mod statistics;

use std::fmt;

use serde::{Deserialize, Serialize};
use solcheck_core::{Policy, RngHandle, VerifyReport};
use solcheck_sym::SymError;

use crate::directive::DirectiveKind;

/// Everything a verifier may read about one submission.
#[derive(Debug, Clone, Copy)]
pub struct Submission<'a> {
    /// Free-text topic hint.
    pub topic: &'a str,
    /// Exercise statement.
    pub statement: &'a str,
    /// Full solution text, headings included.
    pub solution: &'a str,
    /// Trimmed `FINAL_ANSWER` block.
    pub final_answer: Option<&'a str>,
    /// Trimmed `CHECK` block.
    pub check: Option<&'a str>,
    /// Directive keyword leading `CHECK`, if any.
    pub directive: Option<DirectiveKind>,
}

/// Domain verifier kinds, in dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verifier {
    /// Single equalities and `SYSTEM;` directives.
    EquationsSystem,
    /// Derivatives, antiderivatives and limits.
    Calculus,
    /// Matrix and determinant identities.
    LinearAlgebra,
    /// Identities over the complex numbers.
    ComplexNumbers,
    /// Recurrent sequences.
    Sequences,
    /// Simple linear regression.
    Statistics,
    /// Constrained extrema.
    Optimization,
}

impl Verifier {
    /// Every verifier, in dispatch priority order.
    pub const ALL: [Verifier; 7] = [
        Verifier::EquationsSystem,
        Verifier::Calculus,
        Verifier::LinearAlgebra,
        Verifier::ComplexNumbers,
        Verifier::Sequences,
        Verifier::Statistics,
        Verifier::Optimization,
    ];

    /// Stable short name.
    pub fn name(self) -> &'static str {
        match self {
            Verifier::EquationsSystem => "equations_system",
            Verifier::Calculus => "calculus",
            Verifier::LinearAlgebra => "linear_algebra",
            Verifier::ComplexNumbers => "complex_numbers",
            Verifier::Sequences => "sequences",
            Verifier::Statistics => "statistics",
            Verifier::Optimization => "optimization",
        }
    }

    fn substream(self) -> u64 {
        self as u64
    }

    /// Whether this verifier claims the submission.
    ///
    /// `selector` is the directive keyword in directive mode and the topic
    /// hint otherwise.
    pub fn can_handle(self, selector: &str, submission: &Submission<'_>) -> bool {
        let selector = selector.to_lowercase();
        match self {
            Verifier::EquationsSystem => equations::can_handle(&selector, submission),
            Verifier::Calculus => calculus::can_handle(&selector, submission),
            Verifier::LinearAlgebra => linear_algebra::can_handle(&selector, submission),
            Verifier::ComplexNumbers => complex::can_handle(&selector, submission),
            Verifier::Sequences => sequences::can_handle(&selector, submission),
            Verifier::Statistics => statistics::can_handle(&selector, submission),
            Verifier::Optimization => optimization::can_handle(&selector, submission),
        }
    }

    /// Runs the checks. Failures become failing items, never errors.
    pub fn verify(self, submission: &Submission<'_>, policy: &Policy) -> VerifyReport {
        let mut rng = RngHandle::substream(policy.seed, self.substream());
        match self {
            Verifier::EquationsSystem => equations::verify(submission, policy, &mut rng),
            Verifier::Calculus => calculus::verify(submission, policy, &mut rng),
            Verifier::LinearAlgebra => linear_algebra::verify(submission),
            Verifier::ComplexNumbers => complex::verify(submission),
            Verifier::Sequences => sequences::verify(submission, policy),
            Verifier::Statistics => statistics::verify(submission, policy),
            Verifier::Optimization => optimization::verify(submission, policy, &mut rng),
        }
    }
}

impl fmt::Display for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn mentions(selector: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| selector.contains(k))
}

/// Outcome text for an engine call that should decide a boolean.
fn decided(result: Result<bool, SymError>, yes: &str, no: &str) -> (bool, String) {
    match result {
        Ok(true) => (true, yes.to_string()),
        Ok(false) => (false, no.to_string()),
        Err(err) => (false, format!("{no}: {err}")),
    }
}
