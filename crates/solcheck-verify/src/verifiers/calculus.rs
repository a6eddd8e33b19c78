//! Derivatives, antiderivatives and limits.
//!
//! With a directive only the matching branch runs. Without one the topic
//! selects the branches and `CHECK` holds the function, the integrand or a
//! `limit(expr, x, point)` call.

use std::collections::BTreeMap;

use solcheck_core::{Policy, ReportKind, RngHandle, VerifyReport};
use solcheck_sym::{
    differentiate, differentiate_unexpanded, equals, evaluate_real, limit, parse, Direction, Expr,
    LimitValue, SymError,
};
use tracing::debug;

use super::{decided, mentions, Submission};
use crate::directive::{Directive, DirectiveKind};
use crate::sampling::{sample_points, sides_agree};

const DERIVATIVE_TOPICS: [&str; 2] = ["dériv", "derive"];
const INTEGRAL_TOPICS: [&str; 2] = ["intégr", "integr"];
const LIMIT_TOPICS: [&str; 2] = ["limite", "limit"];

const SECOND_ORDER_MARKERS: [&str; 6] = [
    "f''",
    "f’’",
    "secondedérivée",
    "secondederivee",
    "seconddérivée",
    "secondderivative",
];

pub(super) fn can_handle(selector: &str, submission: &Submission<'_>) -> bool {
    if matches!(
        submission.directive,
        Some(DirectiveKind::Derivative | DirectiveKind::Integral | DirectiveKind::Limit)
    ) {
        return submission.final_answer.is_some();
    }
    let topics = [DERIVATIVE_TOPICS, INTEGRAL_TOPICS, LIMIT_TOPICS].concat();
    mentions(selector, &topics) && submission.final_answer.is_some()
}

/// Order requested by the statement: 2 when it mentions a second derivative.
fn derivative_order(statement: &str) -> u32 {
    let compact: String = statement
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    if SECOND_ORDER_MARKERS.iter().any(|m| compact.contains(m)) {
        2
    } else {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Branches {
    derivative: bool,
    integral: bool,
    limit: bool,
}

fn branches(directive: Option<&Directive>, topic: &str) -> Branches {
    match directive.map(|d| d.kind) {
        Some(DirectiveKind::Derivative) => Branches {
            derivative: true,
            integral: false,
            limit: false,
        },
        Some(DirectiveKind::Integral) => Branches {
            derivative: false,
            integral: true,
            limit: false,
        },
        Some(DirectiveKind::Limit) => Branches {
            derivative: false,
            integral: false,
            limit: true,
        },
        _ => {
            let topic = topic.to_lowercase();
            Branches {
                derivative: mentions(&topic, &DERIVATIVE_TOPICS),
                integral: mentions(&topic, &INTEGRAL_TOPICS),
                limit: mentions(&topic, &LIMIT_TOPICS),
            }
        }
    }
}

struct Context<'a> {
    policy: &'a Policy,
    var: String,
    answer: Expr,
    check: Option<&'a str>,
    directive: Option<&'a Directive>,
}

pub(super) fn verify(
    submission: &Submission<'_>,
    policy: &Policy,
    rng: &mut RngHandle,
) -> VerifyReport {
    let mut report = VerifyReport::new(ReportKind::Mixed, "Calculus (derivative, integral, limit)");
    let Some(answer_text) = submission.final_answer else {
        report.add("structure.final_answer_present", false, "FINAL_ANSWER missing");
        return report;
    };
    report.add("structure.final_answer_present", true, "FINAL_ANSWER present");

    let directive = submission.check.and_then(Directive::parse);
    if let Some(check) = submission.check {
        match &directive {
            Some(d) => report.add(
                "parse.check_directive",
                matches!(
                    d.kind,
                    DirectiveKind::Derivative | DirectiveKind::Integral | DirectiveKind::Limit
                ),
                format!("CHECK directive: {}", d.kind),
            ),
            None => report.add(
                "parse.check_directive",
                true,
                format!("legacy CHECK without directive: {check}"),
            ),
        }
    }

    let answer = match parse(answer_text) {
        Ok(answer) => {
            report.add("parse.final_answer", true, "FINAL_ANSWER parsed");
            answer
        }
        Err(err) => {
            report.add("parse.final_answer", false, format!("FINAL_ANSWER not parsable: {err}"));
            return report;
        }
    };

    let ctx = Context {
        policy,
        var: directive.as_ref().map_or("x", Directive::var).to_string(),
        answer,
        check: submission.check,
        directive: directive.as_ref(),
    };
    let selected = branches(directive.as_ref(), submission.topic);
    debug!(?selected, var = %ctx.var, "calculus branches");

    if selected.derivative {
        derivative_branch(&mut report, &ctx, derivative_order(submission.statement), rng);
    }
    if selected.integral {
        integral_branch(&mut report, &ctx, rng);
    }
    if selected.limit {
        limit_branch(&mut report, &ctx);
    }
    report
}

/// Legacy `CHECK` payload: the text itself unless it is a malformed directive.
fn legacy_payload<'a>(ctx: &Context<'a>, keyword: &str) -> Option<&'a str> {
    let check = ctx.check?.trim();
    let malformed = check
        .to_uppercase()
        .strip_prefix(keyword)
        .is_some_and(|rest| rest.trim_start().starts_with(';'));
    (!malformed).then_some(check)
}

/// Parses a function for differentiation; equalities are rejected.
fn function_source<'a>(ctx: &Context<'a>, param: &str, keyword: &str) -> Result<(Expr, String), String> {
    let text = match ctx.directive.and_then(|d| d.get(param)) {
        Some(text) => text.to_string(),
        None => legacy_payload(ctx, keyword)
            .ok_or_else(|| format!("CHECK must hold the function or `{keyword}; var=..; {param}=..`"))?
            .to_string(),
    };
    match parse(&text) {
        Ok(Expr::Eq(..)) => Err(format!("CHECK must hold the function or `{keyword}; var=..; {param}=..`")),
        Ok(expr) => Ok((expr, text)),
        Err(err) => Err(format!("cannot parse `{text}`: {err}")),
    }
}

/// Exact comparison of `target.0` with `claimed`, then a sampled one.
///
/// `target.1` is the same value before simplification; it is what gets
/// evaluated, since expanded powers lose precision in floating point.
fn symbolic_and_sampled(
    report: &mut VerifyReport,
    ctx: &Context<'_>,
    names: (&str, &str),
    (target, sampled): (&Expr, &Expr),
    claimed: &Expr,
    source: &str,
    rng: &mut RngHandle,
) {
    let (ok, message) = decided(
        equals(target, claimed),
        "symbolic difference simplifies to 0",
        "symbolic difference does not simplify to 0",
    );
    report.add(names.0, ok, message);

    let points = sample_points(rng, source, ctx.policy.sample_count);
    match sides_agree(sampled, claimed, &ctx.var, &points, ctx.policy.sample_tol) {
        Ok(outcome) => report.add(
            names.1,
            outcome.passed,
            format!(
                "{} samples, max relative gap {:.2e}",
                outcome.evaluated, outcome.worst
            ),
        ),
        Err(err) => report.add(names.1, false, format!("numeric evaluation failed: {err}")),
    }
}

fn derivative_branch(report: &mut VerifyReport, ctx: &Context<'_>, order: u32, rng: &mut RngHandle) {
    let (function, source) = match function_source(ctx, "func", "DERIVATIVE") {
        Ok(found) => found,
        Err(message) => {
            report.add("symbolic.derivative", false, message);
            return;
        }
    };
    match differentiate(&function, &ctx.var, order) {
        Ok(target) => {
            report.detail("derivative_order", order);
            let sampled = differentiate_unexpanded(&function, &ctx.var, order).unwrap_or_else(|_| target.clone());
            symbolic_and_sampled(
                report,
                ctx,
                ("symbolic.derivative", "numeric.derivative"),
                (&target, &sampled),
                &ctx.answer,
                &source,
                rng,
            );
        }
        Err(err) => report.add("symbolic.derivative", false, format!("differentiation failed: {err}")),
    }
}

/// Fundamental-theorem check: the derivative of the claimed antiderivative is the integrand.
fn integral_branch(report: &mut VerifyReport, ctx: &Context<'_>, rng: &mut RngHandle) {
    let (integrand, source) = match function_source(ctx, "integrand", "INTEGRAL") {
        Ok(found) => found,
        Err(message) => {
            report.add("symbolic.integral", false, message);
            return;
        }
    };
    match differentiate(&ctx.answer, &ctx.var, 1) {
        Ok(derivative) => symbolic_and_sampled(
            report,
            ctx,
            ("symbolic.integral", "numeric.integral"),
            (
                &derivative,
                &differentiate_unexpanded(&ctx.answer, &ctx.var, 1).unwrap_or_else(|_| derivative.clone()),
            ),
            &integrand,
            &source,
            rng,
        ),
        Err(err) => report.add(
            "symbolic.integral",
            false,
            format!("cannot differentiate FINAL_ANSWER: {err}"),
        ),
    }
}

fn limit_branch(report: &mut VerifyReport, ctx: &Context<'_>) {
    let directive = ctx.directive.filter(|d| d.kind == DirectiveKind::Limit);
    match directive.and_then(|d| Some((d.get("expr")?, d.get("point")?, d))) {
        Some((expr, point, d)) => directive_limit(report, ctx, expr, point, d.get("dir")),
        None => legacy_limit(report, ctx),
    }
}

fn matches_limit(value: &LimitValue, answer: &Expr) -> Result<bool, SymError> {
    match value {
        LimitValue::Finite(v) => {
            if answer.infinity_sign().is_some() {
                return Ok(false);
            }
            equals(v, answer)
        }
        LimitValue::PositiveInfinity => Ok(answer.infinity_sign() == Some(1)),
        LimitValue::NegativeInfinity => Ok(answer.infinity_sign() == Some(-1)),
    }
}

fn directive_limit(
    report: &mut VerifyReport,
    ctx: &Context<'_>,
    expr_text: &str,
    point_text: &str,
    dir_text: Option<&str>,
) {
    let parsed = parse(expr_text).and_then(|e| Ok((e, parse(point_text)?)));
    let (expr, point) = match parsed {
        Ok(pair) => pair,
        Err(err) => {
            report.add("symbolic.limit", false, format!("LIMIT not parsable: {err}"));
            return;
        }
    };
    let requested = match dir_text.map(Direction::from_token) {
        Some(None) => {
            report.add("symbolic.limit", false, format!("unknown direction `{}`", dir_text.unwrap_or_default()));
            return;
        }
        Some(dir) => dir,
        None => None,
    };

    match limit(&expr, &ctx.var, &point, requested.unwrap_or_default()) {
        Ok(value) => {
            let (ok, message) = decided(
                matches_limit(&value, &ctx.answer),
                &format!("limit at {point} equals FINAL_ANSWER"),
                &format!("limit at {point} is {}, not FINAL_ANSWER", value.to_expr()),
            );
            report.add("symbolic.limit", ok, message);
        }
        Err(err) => report.add("symbolic.limit", false, format!("limit failed: {err}")),
    }

    let (ok, message) = numeric_limit(ctx, &expr, &point, requested.unwrap_or(Direction::Both));
    report.add("numeric.limit", ok, message);
}

/// Evaluates `expr` near `point` on the requested side(s).
///
/// A finite answer must be matched within the tolerance at every offset; an
/// infinite one must be approached by values of the right sign growing in
/// magnitude as the offset shrinks.
fn numeric_limit(ctx: &Context<'_>, expr: &Expr, point: &Expr, dir: Direction) -> (bool, String) {
    let empty = BTreeMap::new();
    let mut eps = ctx.policy.limit_eps.clone();
    eps.sort_by(|a, b| b.total_cmp(a));

    let abscissa = |offset: f64, side: f64| -> Result<f64, SymError> {
        match point.infinity_sign() {
            Some(sign) => Ok(f64::from(sign) / offset),
            None => Ok(evaluate_real(point, &empty)? + side * offset),
        }
    };
    let sides: Vec<f64> = match (point.infinity_sign(), dir) {
        (Some(_), _) => vec![1.0],
        (None, Direction::Plus) => vec![1.0],
        (None, Direction::Minus) => vec![-1.0],
        (None, Direction::Both) => vec![1.0, -1.0],
    };

    let mut series = Vec::new();
    for side in sides {
        let mut values = Vec::new();
        for &offset in &eps {
            let at = match abscissa(offset, side) {
                Ok(at) => at,
                Err(err) => return (false, format!("limit point not numeric: {err}")),
            };
            match evaluate_real(expr, &BTreeMap::from([(ctx.var.clone(), at)])) {
                Ok(v) => values.push(v),
                Err(SymError::Domain(_) | SymError::Undefined(_)) => {}
                Err(err) => return (false, format!("numeric evaluation failed: {err}")),
            }
        }
        series.push(values);
    }
    if series.iter().all(Vec::is_empty) {
        return (false, "no sample point near the limit could be evaluated".to_string());
    }

    match ctx.answer.infinity_sign() {
        Some(sign) => {
            let sign = f64::from(sign);
            let diverges = series.iter().all(|values| {
                values.iter().all(|v| v.signum() == sign)
                    && values.windows(2).all(|w| w[1].abs() > w[0].abs())
            });
            (diverges, format!("samples {series:?} expected to diverge"))
        }
        None => match evaluate_real(&ctx.answer, &empty) {
            Ok(target) => {
                let ok = series
                    .iter()
                    .flatten()
                    .all(|v| (v - target).abs() < ctx.policy.limit_tol);
                (ok, format!("samples {series:?} against {target}"))
            }
            Err(err) => (false, format!("FINAL_ANSWER not numeric: {err}")),
        },
    }
}

fn legacy_limit(report: &mut VerifyReport, ctx: &Context<'_>) {
    let Some(check) = ctx.check.map(str::trim) else {
        report.add("symbolic.limit", false, "CHECK limit(...) or LIMIT directive missing");
        return;
    };
    let payload = match check.split_once(';') {
        Some((head, rest)) if head.trim().eq_ignore_ascii_case("LIMIT") => rest.trim(),
        _ => check,
    };
    if payload.is_empty() {
        report.add("symbolic.limit", false, "CHECK limit(...) or LIMIT directive missing");
        return;
    }
    let value = match parse(payload) {
        Ok(Expr::Limit { expr, var, point, dir }) => limit(&expr, &var, &point, dir),
        Ok(other) => Ok(LimitValue::Finite(other)),
        Err(err) => Err(err),
    };
    match value {
        Ok(value) => {
            let (ok, message) = decided(
                matches_limit(&value, &ctx.answer),
                "limit equals FINAL_ANSWER",
                "limit does not equal FINAL_ANSWER",
            );
            report.add("symbolic.limit", ok, message);
        }
        Err(err) => report.add("symbolic.limit", false, format!("legacy limit failed: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_derivative_markers() {
        assert_eq!(derivative_order("Calculer f''(x) pour f(x) = x^3"), 2);
        assert_eq!(derivative_order("Find the second   derivative of sin"), 2);
        assert_eq!(derivative_order("Calculer f'(x)"), 1);
    }

    #[test]
    fn topic_selects_legacy_branches() {
        let selected = branches(None, "Dérivées et limites");
        assert!(selected.derivative && selected.limit && !selected.integral);
    }
}
