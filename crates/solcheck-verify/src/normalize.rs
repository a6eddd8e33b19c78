//! Pre-verification repair of common generator mistakes.
//!
//! Every rewrite is recorded as an [`AppliedFix`] so callers can tell a
//! repaired input from a clean one. Normalizing already-normalized text is a
//! no-op and reports no fixes.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use solcheck_core::Policy;
use solcheck_sym::{parse, Expr};
use tracing::debug;

use crate::blocks::{rebuild_blocks, scan, Blocks, Heading};
use crate::directive::{Directive, DirectiveKind};
use crate::structural::ELLIPSIS;

/// One rewrite performed by [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliedFix {
    /// Removed `...` placeholders.
    StrippedEllipsis,
    /// Appended the policy clause to a short statement.
    PaddedStatement,
    /// Moved inline `HEADING: content` onto separate lines.
    SplitInlineHeadings,
    /// Built blocks for text with fewer than two headings.
    SynthesizedBlocks,
    /// Moved a `DERIVATIVE;` directive out of the final answer into `CHECK`.
    MovedDirectiveToCheck,
    /// Rewrote `DERIVATIVE; Eq(Derivative(..), ..)` into `var=`/`func=` form.
    RewroteDerivativeCheck,
    /// Wrapped a scalar answer to a one-variable system as `{var: value}`.
    WrappedSystemAnswer,
}

/// Output of [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSolution {
    /// Statement after placeholder removal and padding.
    pub statement: String,
    /// Rebuilt heading text.
    pub solution: String,
    /// Rewrites applied, in order.
    pub fixes: Vec<AppliedFix>,
}

impl NormalizedSolution {
    /// Whether the statement was padded to pass the length check.
    pub fn padded(&self) -> bool {
        self.fixes.contains(&AppliedFix::PaddedStatement)
    }
}

fn inline_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(EXERCICE|SOLUTION|FINAL_ANSWER|CHECK)[ \t]*:[ \t]*(\S.*)$")
            .expect("valid inline heading regex")
    })
}

fn derivative_with_func() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)\bDERIVATIVE\s*;.*\bfunc\s*=").expect("valid derivative directive regex")
    })
}

fn derivative_payload() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^\s*DERIVATIVE\s*;\s*(.+)$").expect("valid derivative payload regex")
    })
}

struct FixLog(Vec<AppliedFix>);

impl FixLog {
    fn record(&mut self, fix: AppliedFix) {
        debug!(?fix, "applied normalization fix");
        self.0.push(fix);
    }
}

fn strip_ellipsis(text: &str) -> String {
    text.replace(ELLIPSIS, "").trim().to_string()
}

/// Repairs `statement` and `solution` so that a verifier can act on them.
pub fn normalize(statement: &str, solution: &str, policy: &Policy) -> NormalizedSolution {
    let mut log = FixLog(Vec::new());

    let mut fixed_statement = strip_ellipsis(statement);
    let text = strip_ellipsis(solution);
    if fixed_statement != statement.trim() || text != solution.trim() {
        log.record(AppliedFix::StrippedEllipsis);
    }

    let clause = policy.pad_clause.trim();
    if fixed_statement.chars().count() < policy.pad_below_chars
        && !(clause.is_empty() || fixed_statement.ends_with(clause))
    {
        fixed_statement.push_str(&policy.pad_clause);
        fixed_statement = fixed_statement.trim().to_string();
        log.record(AppliedFix::PaddedStatement);
    }

    let split = inline_heading().replace_all(&text, "$1:\n$2");
    if split != text {
        log.record(AppliedFix::SplitInlineHeadings);
    }

    let mut blocks = blocks_or_synthesized(&split, &fixed_statement, &mut log);

    let answer = block(&blocks, Heading::FinalAnswer);
    let check = block(&blocks, Heading::Check);
    if answer.to_uppercase().starts_with("DERIVATIVE;") && check.is_empty() {
        blocks.insert(Heading::Check, answer);
        blocks.insert(Heading::FinalAnswer, String::new());
        log.record(AppliedFix::MovedDirectiveToCheck);
    }

    let check = block(&blocks, Heading::Check);
    if let Some(rewritten) = rewrite_derivative_check(&check) {
        blocks.insert(Heading::Check, rewritten);
        log.record(AppliedFix::RewroteDerivativeCheck);
    }

    let answer = block(&blocks, Heading::FinalAnswer);
    let check = block(&blocks, Heading::Check);
    if let Some(wrapped) = wrap_system_answer(&answer, &check) {
        blocks.insert(Heading::FinalAnswer, wrapped);
        log.record(AppliedFix::WrappedSystemAnswer);
    }

    blocks.insert(Heading::Statement, fixed_statement.clone());
    NormalizedSolution {
        statement: fixed_statement,
        solution: rebuild_blocks(&blocks),
        fixes: log.0,
    }
}

fn block(blocks: &Blocks, heading: Heading) -> String {
    blocks.get(&heading).map(|c| c.trim().to_string()).unwrap_or_default()
}

/// Structured blocks, or a synthesized layout for unstructured text.
///
/// A lone heading keeps its block and the text before it becomes the solution.
fn blocks_or_synthesized(text: &str, statement: &str, log: &mut FixLog) -> Blocks {
    let scanned = scan(text);
    match scanned.headings {
        0 => {
            log.record(AppliedFix::SynthesizedBlocks);
            Blocks::from([
                (Heading::Statement, statement.to_string()),
                (Heading::Solution, text.trim().to_string()),
                (Heading::FinalAnswer, String::new()),
                (Heading::Check, String::new()),
            ])
        }
        1 => {
            log.record(AppliedFix::SynthesizedBlocks);
            let mut blocks = scanned.blocks;
            if !scanned.preamble.is_empty() {
                blocks
                    .entry(Heading::Solution)
                    .or_insert(scanned.preamble);
            }
            blocks
        }
        _ => scanned.blocks,
    }
}

/// `DERIVATIVE; Eq(Derivative(f, v), g)` becomes `DERIVATIVE; var=v; func=f`.
fn rewrite_derivative_check(check: &str) -> Option<String> {
    if check.is_empty() || derivative_with_func().is_match(check) {
        return None;
    }
    let payload = derivative_payload().captures(check)?.get(1)?.as_str().trim();
    let Ok(Expr::Eq(lhs, rhs)) = parse(payload) else {
        return None;
    };
    let (func, var) = first_derivative(&lhs).or_else(|| first_derivative(&rhs))?;
    Some(format!("DERIVATIVE; var={var}; func={func}"))
}

fn first_derivative(expr: &Expr) -> Option<(Expr, String)> {
    if let Expr::Derivative { expr, var, .. } = expr {
        return Some((expr.as_ref().clone(), var.clone()));
    }
    expr.children().into_iter().find_map(first_derivative)
}

/// Scalar answer to `SYSTEM;` with exactly one free variable becomes `{var: value}`.
fn wrap_system_answer(answer: &str, check: &str) -> Option<String> {
    if answer.is_empty() || (answer.starts_with('{') && answer.ends_with('}')) {
        return None;
    }
    if !check.to_uppercase().starts_with("SYSTEM;") {
        return None;
    }
    let directive = Directive::parse(check)?;
    if directive.kind != DirectiveKind::System {
        return None;
    }
    let mut symbols = BTreeSet::new();
    for segment in &directive.segments {
        match parse(segment) {
            Ok(equality @ Expr::Eq(..)) => symbols.extend(equality.free_symbols()),
            _ => return None,
        }
    }
    if symbols.len() != 1 {
        return None;
    }
    let value = parse(answer).ok()?;
    if !value.is_scalar_like() {
        return None;
    }
    let var = symbols.into_iter().next()?;
    Some(format!("{{{var}: {answer}}}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::extract_blocks;

    const LONG: &str = "Résoudre dans R l'équation 2x + 1 = 5 et vérifier le résultat.";

    #[test]
    fn derivative_eq_is_rewritten() {
        let check = "DERIVATIVE; Eq(Derivative(x**3, x), 3*x**2)";
        assert_eq!(
            rewrite_derivative_check(check).as_deref(),
            Some("DERIVATIVE; var=x; func=x**3")
        );
        assert_eq!(rewrite_derivative_check("DERIVATIVE; var=x; func=x**3"), None);
    }

    #[test]
    fn derivative_on_right_hand_side() {
        let check = "DERIVATIVE; Eq(2*t, Derivative(t**2, t))";
        assert_eq!(
            rewrite_derivative_check(check).as_deref(),
            Some("DERIVATIVE; var=t; func=t**2")
        );
    }

    #[test]
    fn system_answer_wraps_only_single_variable() {
        assert_eq!(
            wrap_system_answer("2", "SYSTEM; Eq(2*x+1, 5)").as_deref(),
            Some("{x: 2}")
        );
        assert_eq!(wrap_system_answer("2", "SYSTEM; Eq(x+y, 1); Eq(x-y, 3)"), None);
        assert_eq!(wrap_system_answer("{x: 2}", "SYSTEM; Eq(2*x+1, 5)"), None);
    }

    #[test]
    fn unstructured_text_is_synthesized() {
        let out = normalize(LONG, "x = 2 car 2*2+1 = 5", &Policy::default());
        assert_eq!(out.fixes, vec![AppliedFix::SynthesizedBlocks]);
        let blocks = extract_blocks(&out.solution);
        assert_eq!(blocks.get(&Heading::Statement).map(String::as_str), Some(LONG));
        assert_eq!(
            blocks.get(&Heading::Solution).map(String::as_str),
            Some("x = 2 car 2*2+1 = 5")
        );
    }

    #[test]
    fn short_statement_is_padded_once() {
        let policy = Policy::default();
        let first = normalize("Résoudre 2x+1=5", "SOLUTION:\nx=2\nFINAL_ANSWER: 2", &policy);
        assert!(first.padded());
        assert!(first.fixes.contains(&AppliedFix::SplitInlineHeadings));
        let second = normalize(&first.statement, &first.solution, &policy);
        assert_eq!(second, NormalizedSolution { fixes: Vec::new(), ..first });
    }

    #[test]
    fn derivative_answer_moves_to_check() {
        let text = "SOLUTION:\non dérive\nFINAL_ANSWER:\nDERIVATIVE; Eq(Derivative(sin(x), x), cos(x))";
        let out = normalize(LONG, text, &Policy::default());
        assert_eq!(
            out.fixes,
            vec![AppliedFix::MovedDirectiveToCheck, AppliedFix::RewroteDerivativeCheck]
        );
        let blocks = extract_blocks(&out.solution);
        assert_eq!(blocks.get(&Heading::FinalAnswer), None);
        assert_eq!(
            blocks.get(&Heading::Check).map(String::as_str),
            Some("DERIVATIVE; var=x; func=sin(x)")
        );
    }
}
