//! Recurrent sequences.
//!
//! Validation is partial: the final answer must parse, and a recurrence
//! `Eq(u(n+k), rhs)` in `CHECK` is only exploited when the answer lists
//! indexed terms (`u0`, `u_1`, ...).

use std::collections::BTreeMap;

use solcheck_core::{Policy, ReportKind, VerifyReport};
use solcheck_sym::{evaluate_real, parse, substitute_one, Expr, SymError};

use super::{mentions, Submission};
use crate::answer::parse_answer;

const TOPICS: [&str; 1] = ["suite"];

pub(super) fn can_handle(selector: &str, submission: &Submission<'_>) -> bool {
    mentions(selector, &TOPICS) && submission.final_answer.is_some()
}

pub(super) fn verify(submission: &Submission<'_>, policy: &Policy) -> VerifyReport {
    let mut report = VerifyReport::new(ReportKind::Mixed, "Sequences (first terms, formula)");
    let Some(answer_text) = submission.final_answer else {
        report.add("parse.final_answer", false, "FINAL_ANSWER missing");
        return report;
    };
    report.add("parse.final_answer", true, "FINAL_ANSWER present");

    let recurrence = submission.check.map(|check| {
        let parsed = parse(check);
        match &parsed {
            Ok(_) => report.add("parse.check", true, "CHECK parsed"),
            Err(err) => report.add("parse.check", false, format!("CHECK not parsable: {err}")),
        }
        parsed
    });

    let answer = match parse_answer(answer_text, &Default::default()) {
        Ok(answer) => {
            report.add("parse.final_answer_expr", true, "FINAL_ANSWER parsed");
            answer
        }
        Err(err) => {
            report.add(
                "parse.final_answer_expr",
                false,
                format!("FINAL_ANSWER not parsable (e.g. {{u0: 1, u1: 2}}): {err}"),
            );
            return report;
        }
    };

    let Some(Ok(Expr::Eq(lhs, rhs))) = recurrence else {
        report.add(
            "symbolic.sequence_recurrence",
            true,
            "no Eq CHECK, limited validation",
        );
        return report;
    };
    let Some(rule) = Recurrence::from_sides(&lhs, &rhs) else {
        report.add(
            "symbolic.sequence_recurrence",
            true,
            "Eq CHECK found but not of the form u(n+k) = ...",
        );
        return report;
    };
    report.add(
        "symbolic.sequence_recurrence",
        true,
        format!("recurrence on {}({} + {})", rule.name, rule.index, rule.shift),
    );

    let terms = indexed_terms(&answer, &rule.name);
    if terms.is_empty() {
        return report;
    }
    match rule.check_terms(&terms, policy.root_tol) {
        Ok((0, _)) => {}
        Ok((checked, mismatches)) => report.add(
            "numeric.sequence_terms",
            mismatches.is_empty(),
            if mismatches.is_empty() {
                format!("{checked} declared terms follow the recurrence")
            } else {
                format!("terms {mismatches:?} break the recurrence")
            },
        ),
        Err(err) => report.add(
            "numeric.sequence_terms",
            false,
            format!("cannot evaluate the recurrence: {err}"),
        ),
    }
    report
}

/// `name(index + shift) = rhs`.
#[derive(Debug, Clone, PartialEq)]
struct Recurrence {
    name: String,
    index: String,
    shift: i64,
    rhs: Expr,
}

impl Recurrence {
    fn from_sides(lhs: &Expr, rhs: &Expr) -> Option<Self> {
        let Expr::Apply(name, args) = lhs else {
            return None;
        };
        let [arg] = args.as_slice() else {
            return None;
        };
        let symbols = arg.free_symbols();
        if symbols.len() != 1 {
            return None;
        }
        let index = symbols.into_iter().next()?;
        let at = |n: f64| evaluate_real(arg, &BTreeMap::from([(index.clone(), n)])).ok();
        let (at0, at1) = (at(0.0)?, at(1.0)?);
        if (at1 - at0 - 1.0).abs() > 1e-12 || at0.fract() != 0.0 || at0 < 0.0 {
            return None;
        }
        Some(Self {
            name: name.clone(),
            index,
            shift: at0 as i64,
            rhs: rhs.clone(),
        })
    }

    /// Checks every declared term that the recurrence determines from earlier
    /// declared terms. Returns the number checked and the failing indices.
    fn check_terms(
        &self,
        terms: &BTreeMap<i64, Expr>,
        tol: f64,
    ) -> Result<(usize, Vec<i64>), SymError> {
        let empty = BTreeMap::new();
        let mut checked = 0;
        let mut mismatches = Vec::new();
        for (&j, declared) in terms {
            let n = j - self.shift;
            if n < 0 {
                continue;
            }
            let Some(rhs) = self.instantiate(n, terms)? else {
                continue;
            };
            let predicted = evaluate_real(&rhs, &empty)?;
            let declared = evaluate_real(declared, &empty)?;
            checked += 1;
            if (predicted - declared).abs() > tol.max(tol * declared.abs()) {
                mismatches.push(j);
            }
        }
        Ok((checked, mismatches))
    }

    /// `rhs` at index `n` with sequence references replaced by declared terms;
    /// `None` when a referenced term is not declared.
    fn instantiate(&self, n: i64, terms: &BTreeMap<i64, Expr>) -> Result<Option<Expr>, SymError> {
        let at_n = substitute_one(&self.rhs, &self.index, &Expr::int(n))?;
        let empty = BTreeMap::new();
        let replaced = at_n.map_nodes(&|node| match node {
            Expr::Apply(name, args) if *name == self.name && args.len() == 1 => {
                let value = evaluate_real(&args[0], &empty).ok()?;
                if value.fract() != 0.0 {
                    return None;
                }
                terms.get(&(value as i64)).cloned()
            }
            _ => None,
        });
        let unresolved =
            replaced.any(&|node| matches!(node, Expr::Apply(name, _) if *name == self.name));
        Ok((!unresolved).then_some(replaced))
    }
}

/// Declared terms keyed by index (`u0`, `u_1`, ...).
fn indexed_terms(answer: &Expr, name: &str) -> BTreeMap<i64, Expr> {
    let Expr::Dict(entries) = answer else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(key, value)| {
            let rest = key.strip_prefix(name)?;
            let digits = rest.strip_prefix('_').unwrap_or(rest);
            let index: i64 = digits.parse().ok()?;
            Some((index, value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recurrence(check: &str) -> Recurrence {
        let Ok(Expr::Eq(lhs, rhs)) = parse(check) else {
            panic!("not an equality: {check}");
        };
        Recurrence::from_sides(&lhs, &rhs).expect("recurrence")
    }

    #[test]
    fn reads_shift_and_index() {
        let rule = recurrence("Eq(u(n+1), 2*u(n) + 1)");
        assert_eq!((rule.name.as_str(), rule.index.as_str(), rule.shift), ("u", "n", 1));
    }

    #[test]
    fn declared_terms_follow_recurrence() -> Result<(), SymError> {
        let rule = recurrence("Eq(u(n+1), 2*u(n) + 1)");
        let answer = parse("{u0: 1, u_1: 3, u2: 7, u3: 16}")?;
        let (checked, mismatches) = rule.check_terms(&indexed_terms(&answer, "u"), 1e-9)?;
        assert_eq!(checked, 3);
        assert_eq!(mismatches, vec![3]);
        Ok(())
    }
}
