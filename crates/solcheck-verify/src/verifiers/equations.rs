//! Single equalities and `SYSTEM;` directives.

use std::collections::{BTreeMap, BTreeSet};

use solcheck_core::{Policy, ReportKind, RngHandle, VerifyReport};
use solcheck_sym::{
    evaluate, is_zero, parse, simplify, solve_system, substitute, Complex64, Expr, Solution,
    SymError,
};
use tracing::debug;

use super::{decided, mentions, Submission};
use crate::answer::parse_answer;
use crate::directive::{Directive, DirectiveKind};

const TOPICS: [&str; 6] = [
    "équation",
    "equation",
    "système",
    "systeme",
    "arithmétique",
    "arithmetique",
];

/// `Eq(..)`, `a = b` or `a == b`.
fn is_bare_equality(check: &str) -> bool {
    let check = check.trim();
    check.starts_with("Eq(")
        || check.starts_with("Eq ")
        || (!check.contains(';') && matches!(parse(check), Ok(Expr::Eq(..))))
}

pub(super) fn can_handle(selector: &str, submission: &Submission<'_>) -> bool {
    if let Some(check) = submission.check {
        if Directive::parse(check).is_some_and(|d| d.kind == DirectiveKind::System)
            || is_bare_equality(check)
        {
            return true;
        }
    }
    mentions(selector, &TOPICS)
}

pub(super) fn verify(
    submission: &Submission<'_>,
    policy: &Policy,
    rng: &mut RngHandle,
) -> VerifyReport {
    let mut report = VerifyReport::new(ReportKind::Mixed, "Equations and systems");
    let answer_text = submission.final_answer;
    report.add(
        "structure.final_answer_present",
        answer_text.is_some(),
        if answer_text.is_some() {
            "FINAL_ANSWER present"
        } else {
            "FINAL_ANSWER missing"
        },
    );
    let Some(check) = submission.check else {
        report.add(
            "structure.check_present",
            false,
            "CHECK missing (expected Eq(...) or SYSTEM; Eq(...); ...)",
        );
        return report;
    };

    let answer = answer_text.and_then(|text| parse_answer(text, &Default::default()).ok());
    report.add(
        "parse.final_answer",
        answer.is_some(),
        if answer.is_some() {
            "FINAL_ANSWER parsed"
        } else {
            "FINAL_ANSWER not parsable"
        },
    );

    match Directive::parse(check).filter(|d| d.kind == DirectiveKind::System) {
        Some(directive) => verify_system(&mut report, &directive, answer.as_ref(), rng),
        None => verify_equality(&mut report, check, answer.as_ref(), policy, rng),
    }
    report
}

fn verify_system(
    report: &mut VerifyReport,
    directive: &Directive,
    answer: Option<&Expr>,
    rng: &mut RngHandle,
) {
    if directive.segments.is_empty() {
        report.add("parse.system", false, "no equation after SYSTEM;");
        return;
    }
    let mut equations = Vec::with_capacity(directive.segments.len());
    for segment in &directive.segments {
        match parse(segment) {
            Ok(eq @ Expr::Eq(..)) => equations.push(eq),
            Ok(_) => {
                report.add("parse.system", false, format!("not an equality: {segment}"));
                return;
            }
            Err(err) => {
                report.add("parse.system", false, format!("cannot parse `{segment}`: {err}"));
                return;
            }
        }
    }
    report.add(
        "parse.system",
        true,
        format!("{} equations parsed", equations.len()),
    );

    let symbols: Vec<String> = equations
        .iter()
        .flat_map(Expr::free_symbols)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    report.detail("system_symbols", &symbols);
    if symbols.is_empty() {
        report.add("symbolic.system_symbols", false, "no variable in the system");
        return;
    }
    report.add(
        "symbolic.system_symbols",
        true,
        format!("variables: {}", symbols.join(", ")),
    );

    match solve_system(&equations, &symbols) {
        Ok(solutions) => {
            let rendered: Vec<String> = solutions.iter().map(render_solution).collect();
            debug!(count = solutions.len(), "system solved");
            report.add(
                "symbolic.system_solve",
                !solutions.is_empty(),
                if solutions.is_empty() {
                    "no solution found".to_string()
                } else {
                    format!("solutions: {}", rendered.join("; "))
                },
            );
            report.detail("system_solutions", rendered);
        }
        Err(err) => {
            report.add("symbolic.system_solve", false, format!("solve failed: {err}"));
            return;
        }
    }

    match answer.and_then(assignment) {
        None => report.add(
            "compare.final_answer_mapping",
            false,
            "FINAL_ANSWER must be a mapping for a system (e.g. {x: 2, y: 3})",
        ),
        Some(mapping) => {
            let (ok, message) = decided(
                satisfies_all(&equations, &mapping),
                "FINAL_ANSWER satisfies every equation",
                "FINAL_ANSWER does not satisfy the system",
            );
            report.add("symbolic.system_substitution", ok, message);
        }
    }

    let sanity = sanity_samples(&equations[0], &symbols, rng, 4);
    report.add(
        "numeric.eval",
        true,
        match sanity {
            Ok(()) => "numeric evaluation OK".to_string(),
            Err(err) => format!("numeric evaluation skipped: {err}"),
        },
    );
}

fn verify_equality(
    report: &mut VerifyReport,
    check: &str,
    answer: Option<&Expr>,
    policy: &Policy,
    rng: &mut RngHandle,
) {
    let (lhs, rhs) = match parse(check) {
        Ok(Expr::Eq(lhs, rhs)) => {
            report.add("parse.check", true, "CHECK parsed (Eq)");
            (*lhs, *rhs)
        }
        Ok(_) => {
            report.add("parse.check", false, "CHECK is not Eq(...)");
            report.add(
                "symbolic.substitution",
                false,
                "CHECK must be Eq(...) or SYSTEM; ...",
            );
            return;
        }
        Err(err) => {
            report.add("parse.check", false, format!("CHECK not parsable: {err}"));
            return;
        }
    };

    let raw = Expr::sub(lhs, rhs);
    let residual = simplify(&raw).unwrap_or(raw);
    let symbols: Vec<String> = residual.free_symbols().into_iter().collect();
    report.detail("eq_symbols", &symbols);

    let Some(var) = symbols.first() else {
        let (ok, message) = decided(
            is_zero(&residual),
            "constant equality holds",
            "constant equality is false",
        );
        report.add("symbolic.eq_constant", ok, message);
        return;
    };
    report.add("symbolic.variable_guess", true, format!("unknown: {var}"));

    let roots: Vec<Expr> = match answer {
        None => Vec::new(),
        Some(Expr::List(items)) => items.clone(),
        Some(dict @ Expr::Dict(_)) => dict.dict_get(var).cloned().into_iter().collect(),
        Some(scalar) => vec![scalar.clone()],
    };
    if roots.is_empty() {
        report.add(
            "symbolic.substitution",
            false,
            "no usable root in FINAL_ANSWER",
        );
        return;
    }

    let mut all_ok = true;
    let mut worst = 0.0_f64;
    for root in &roots {
        let value = substitute(&residual, &BTreeMap::from([(var.clone(), root.clone())]))
            .and_then(|e| evaluate(&e, &BTreeMap::new()));
        match value {
            Ok(z) => {
                worst = worst.max(z.norm());
                all_ok &= z.norm() < policy.root_tol;
            }
            Err(err) => {
                debug!(%root, %err, "root could not be evaluated");
                all_ok = false;
            }
        }
    }
    report.add(
        "symbolic.substitution",
        all_ok,
        if all_ok {
            format!("every declared root satisfies the equation (max residual {worst:.2e})")
        } else {
            "at least one declared root does not satisfy the equation".to_string()
        },
    );

    match sanity_samples(&residual, std::slice::from_ref(var), rng, 5) {
        Ok(()) => report.add("numeric.eval", true, "numeric evaluation OK"),
        Err(err) => report.add("numeric.eval", false, format!("numeric evaluation failed: {err}")),
    }
}

/// Reads a mapping answer (or a list of `(var, value)` pairs) as an assignment.
fn assignment(answer: &Expr) -> Option<BTreeMap<String, Expr>> {
    let mapping: BTreeMap<String, Expr> = match answer {
        Expr::Dict(entries) => entries.iter().cloned().collect(),
        Expr::List(pairs) => pairs
            .iter()
            .filter_map(|pair| match pair {
                Expr::List(kv) if kv.len() == 2 => {
                    Some((kv[0].as_symbol()?.to_string(), kv[1].clone()))
                }
                _ => None,
            })
            .collect(),
        _ => return None,
    };
    (!mapping.is_empty()).then_some(mapping)
}

fn satisfies_all(equations: &[Expr], mapping: &BTreeMap<String, Expr>) -> Result<bool, SymError> {
    for eq in equations {
        if !is_zero(&substitute(eq, mapping)?)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluates the residual of `expr` at random values of the first variable,
/// the others held at 1. Domain errors are tolerated.
fn sanity_samples(
    expr: &Expr,
    symbols: &[String],
    rng: &mut RngHandle,
    count: usize,
) -> Result<(), SymError> {
    let residual = match expr {
        Expr::Eq(lhs, rhs) => Expr::sub((**lhs).clone(), (**rhs).clone()),
        other => other.clone(),
    };
    let Some((first, rest)) = symbols.split_first() else {
        return Ok(());
    };
    let mut bindings: BTreeMap<String, Complex64> = rest
        .iter()
        .map(|s| (s.clone(), Complex64::new(1.0, 0.0)))
        .collect();
    for _ in 0..count {
        bindings.insert(first.clone(), Complex64::new(rng.uniform(-5.0, 5.0), 0.0));
        match evaluate(&residual, &bindings) {
            Ok(_) | Err(SymError::Domain(_) | SymError::Undefined(_)) => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn render_solution(solution: &Solution) -> String {
    let body: Vec<String> = solution
        .iter()
        .map(|(var, root)| format!("{var}: {}", root.to_expr()))
        .collect();
    format!("{{{}}}", body.join(", "))
}
