//! Seeded numeric corroboration of symbolic results.

use std::collections::BTreeMap;

use solcheck_core::RngHandle;
use solcheck_sym::{evaluate, Complex64, Expr, SymError};
use tracing::trace;

/// Draws `count` sample abscissae suited to the functions in `source`.
///
/// Expressions involving a logarithm or square root are sampled on
/// `[0.2, 3)`, everything else on `[-3, 3)`.
pub fn sample_points(rng: &mut RngHandle, source: &str, count: usize) -> Vec<f64> {
    let lowered = source.to_lowercase();
    let positive = ["log(", "ln(", "sqrt("].iter().any(|f| lowered.contains(f));
    let (low, high) = if positive { (0.2, 3.0) } else { (-3.0, 3.0) };
    trace!(positive, count, "drawing sample points");
    (0..count).map(|_| rng.uniform(low, high)).collect()
}

/// Result of comparing two expressions on sample points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOutcome {
    /// Points where both sides evaluated.
    pub evaluated: usize,
    /// Points outside the expression's domain.
    pub skipped: usize,
    /// Largest relative gap seen.
    pub worst: f64,
    /// Whether every gap is below the tolerance.
    pub passed: bool,
}

/// Evaluates both sides at each point bound to `var` and compares them
/// relative to their magnitude: `|lhs - rhs| / max(1, |lhs|, |rhs|)`.
///
/// Points outside either side's domain are skipped. When no point at all can
/// be evaluated, or evaluation fails for another reason, the error is returned.
pub fn sides_agree(
    lhs: &Expr,
    rhs: &Expr,
    var: &str,
    points: &[f64],
    tol: f64,
) -> Result<SampleOutcome, SymError> {
    let mut outcome = SampleOutcome {
        evaluated: 0,
        skipped: 0,
        worst: 0.0,
        passed: true,
    };
    let mut last_domain_error = None;
    for &point in points {
        let bindings = BTreeMap::from([(var.to_string(), Complex64::new(point, 0.0))]);
        match evaluate(lhs, &bindings).and_then(|l| Ok((l, evaluate(rhs, &bindings)?))) {
            Ok((l, r)) => {
                let gap = (l - r).norm() / l.norm().max(r.norm()).max(1.0);
                trace!(point, gap, "relative gap sample");
                outcome.evaluated += 1;
                outcome.worst = outcome.worst.max(gap);
                outcome.passed &= gap < tol;
            }
            Err(err @ (SymError::Domain(_) | SymError::Undefined(_))) => {
                trace!(point, %err, "sample outside domain");
                outcome.skipped += 1;
                last_domain_error = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    if outcome.evaluated == 0 {
        return Err(last_domain_error
            .unwrap_or_else(|| SymError::Domain("no sample point to evaluate".to_string())));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solcheck_sym::parse;

    #[test]
    fn logarithms_sample_positive_points() {
        let mut rng = RngHandle::from_seed(7);
        let points = sample_points(&mut rng, "log(x)/x", 32);
        assert!(points.iter().all(|p| (0.2..3.0).contains(p)));
    }

    #[test]
    fn unbound_symbol_is_an_error() -> Result<(), SymError> {
        let outcome = sides_agree(&parse("x - y")?, &parse("0")?, "x", &[1.0], 1e-6);
        assert!(matches!(outcome, Err(SymError::Unbound(_))));
        Ok(())
    }

    #[test]
    fn large_values_compare_relatively() -> Result<(), SymError> {
        let lhs = parse("180*(3*x + 7)**59")?;
        let rhs = parse("60*(3*x + 7)**59*3")?;
        let outcome = sides_agree(&lhs, &rhs, "x", &[-2.5, 0.5, 2.9], 1e-9)?;
        assert!(outcome.passed, "worst gap {}", outcome.worst);
        let off = parse("181*(3*x + 7)**59")?;
        assert!(!sides_agree(&lhs, &off, "x", &[0.5], 1e-9)?.passed);
        Ok(())
    }

    #[test]
    fn identity_passes() -> Result<(), SymError> {
        let lhs = parse("sin(x)**2 + cos(x)**2")?;
        let outcome = sides_agree(&lhs, &parse("1")?, "x", &[-1.0, 0.5, 2.0], 1e-9)?;
        assert!(outcome.passed);
        assert_eq!(outcome.evaluated, 3);
        Ok(())
    }
}
