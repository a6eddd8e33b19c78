//! Differentiation and limits.

use std::collections::BTreeMap;

use tracing::debug;

use crate::canon::{canonical_scalar, equals, frac_to_expr, poly_to_expr, simplify, Frac};
use crate::error::{Result, SymError};
use crate::eval::evaluate_real;
use crate::expr::{Constant, Direction, Expr, Func};
use crate::rational::Rational;
use crate::subs::substitute_one;

/// Result of a limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitValue {
    /// Finite value.
    Finite(Expr),
    /// Diverges to `+oo`.
    PositiveInfinity,
    /// Diverges to `-oo`.
    NegativeInfinity,
}

impl LimitValue {
    /// Expression form (`oo` and `-oo` for the infinite cases).
    pub fn to_expr(&self) -> Expr {
        match self {
            LimitValue::Finite(e) => e.clone(),
            LimitValue::PositiveInfinity => Expr::Const(Constant::Infinity),
            LimitValue::NegativeInfinity => Expr::neg(Expr::Const(Constant::Infinity)),
        }
    }
}

fn zero() -> Expr {
    Expr::int(0)
}

/// `order`-th derivative of `expr` with respect to `var`, simplified when possible.
pub fn differentiate(expr: &Expr, var: &str, order: u32) -> Result<Expr> {
    let mut current = expr.clone();
    for _ in 0..order {
        let raw = derive(&current, var)?;
        current = match simplify(&raw) {
            Ok(simple) => simple,
            Err(err) => {
                debug!(%err, "derivative left unsimplified");
                raw
            }
        };
    }
    Ok(current)
}

/// `order`-th derivative of `expr` as produced by the differentiation rules.
///
/// Powers of sums stay factored, so the result evaluates accurately where the
/// expanded canonical form would cancel catastrophically.
pub fn differentiate_unexpanded(expr: &Expr, var: &str, order: u32) -> Result<Expr> {
    let mut current = expr.clone();
    for _ in 0..order {
        current = derive(&current, var)?;
    }
    Ok(current)
}

fn derive(expr: &Expr, var: &str) -> Result<Expr> {
    if !expr.depends_on(var) && expr.is_scalar_like() {
        return Ok(zero());
    }
    Ok(match expr {
        Expr::Sym(name) => Expr::int(i64::from(name == var)),
        Expr::Num(_) | Expr::Const(_) | Expr::Str(_) => zero(),
        Expr::Add(terms) => Expr::Add(terms.iter().map(|t| derive(t, var)).collect::<Result<_>>()?),
        Expr::Mul(factors) => {
            let mut sum = Vec::new();
            for (i, f) in factors.iter().enumerate() {
                if !f.depends_on(var) {
                    continue;
                }
                let mut product = factors.clone();
                product[i] = derive(f, var)?;
                sum.push(Expr::Mul(product));
            }
            Expr::Add(sum)
        }
        Expr::Pow(base, exp) => {
            let (b, e) = ((**base).clone(), (**exp).clone());
            if !e.depends_on(var) {
                let lowered = match e.as_rational() {
                    Some(r) => Expr::Num(&r - &Rational::one()),
                    None => Expr::sub(e.clone(), Expr::int(1)),
                };
                Expr::Mul(vec![e, Expr::pow(b.clone(), lowered), derive(&b, var)?])
            } else if !b.depends_on(var) {
                Expr::Mul(vec![expr.clone(), Expr::func(Func::Log, b), derive(&e, var)?])
            } else {
                let inner = Expr::add(
                    Expr::mul(derive(&e, var)?, Expr::func(Func::Log, b.clone())),
                    Expr::Mul(vec![e, derive(&b, var)?, Expr::pow(b, Expr::int(-1))]),
                );
                Expr::mul(expr.clone(), inner)
            }
        }
        Expr::Func(f, arg) => {
            let u = (**arg).clone();
            let du = derive(&u, var)?;
            let outer = match f {
                Func::Sin => Expr::func(Func::Cos, u),
                Func::Cos => Expr::neg(Expr::func(Func::Sin, u)),
                Func::Tan => Expr::add(Expr::int(1), Expr::pow(Expr::func(Func::Tan, u), Expr::int(2))),
                Func::Asin | Func::Acos => {
                    let root = Expr::pow(
                        Expr::sub(Expr::int(1), Expr::pow(u, Expr::int(2))),
                        Expr::Num(Rational::half().neg()),
                    );
                    if *f == Func::Asin {
                        root
                    } else {
                        Expr::neg(root)
                    }
                }
                Func::Atan => Expr::pow(Expr::add(Expr::int(1), Expr::pow(u, Expr::int(2))), Expr::int(-1)),
                Func::Sinh => Expr::func(Func::Cosh, u),
                Func::Cosh => Expr::func(Func::Sinh, u),
                Func::Tanh => Expr::sub(Expr::int(1), Expr::pow(Expr::func(Func::Tanh, u), Expr::int(2))),
                Func::Exp => Expr::func(Func::Exp, u),
                Func::Log => Expr::pow(u, Expr::int(-1)),
                Func::Abs => Expr::div(u.clone(), Expr::func(Func::Abs, u)),
                Func::Re | Func::Im | Func::Conjugate => return Ok(Expr::func(*f, du)),
                Func::Arg => return Err(SymError::Unsupported("derivative of arg".into())),
            };
            Expr::mul(outer, du)
        }
        Expr::Apply(name, _) => {
            return Err(SymError::Unsupported(format!(
                "derivative of the undefined function `{name}`"
            )))
        }
        Expr::Derivative { expr: inner, var: v, order } => derive(&differentiate(inner, v, *order)?, var)?,
        Expr::Limit { .. } => derive(&simplify(expr)?, var)?,
        Expr::Eq(a, b) => Expr::eq(derive(a, var)?, derive(b, var)?),
        Expr::List(items) => Expr::List(items.iter().map(|e| derive(e, var)).collect::<Result<_>>()?),
        Expr::Matrix(rows) => Expr::Matrix(
            rows.iter()
                .map(|r| r.iter().map(|e| derive(e, var)).collect::<Result<Vec<_>>>())
                .collect::<Result<_>>()?,
        ),
        Expr::MatOp(..) => derive(&simplify(expr)?, var)?,
        Expr::Dict(_) => return Err(SymError::NotScalar("cannot differentiate a mapping".into())),
    })
}

const LHOPITAL_ROUNDS: usize = 8;

/// Limit of `expr` as `var` approaches `point` from `dir`.
///
/// `point` may be `oo` or `-oo`. Exact strategies are tried first (direct
/// substitution, L'Hôpital's rule, then products split into factors); when
/// they fail the limit is extrapolated numerically and accepted only if it
/// matches a simple closed form.
pub fn limit(expr: &Expr, var: &str, point: &Expr, dir: Direction) -> Result<LimitValue> {
    if let Some(sign) = point.infinity_sign() {
        let t = fresh_symbol(expr, "t");
        let replaced = substitute_one(expr, var, &Expr::div(Expr::int(i64::from(sign)), Expr::sym(&t)))?;
        return limit_at(&replaced, &t, &Frac::zero(), Direction::Plus);
    }
    if point.depends_on(var) {
        return Err(SymError::Unsupported("the limit point depends on the variable".into()));
    }
    let p = canonical_scalar(point)?;
    if dir == Direction::Both {
        let above = limit_at(expr, var, &p, Direction::Plus)?;
        let below = limit_at(expr, var, &p, Direction::Minus)?;
        let agree = match (&above, &below) {
            (LimitValue::Finite(a), LimitValue::Finite(b)) => equals(a, b)?,
            (a, b) => a == b,
        };
        if !agree {
            return Err(SymError::Undefined("one-sided limits differ".into()));
        }
        return Ok(above);
    }
    limit_at(expr, var, &p, dir)
}

fn fresh_symbol(expr: &Expr, stem: &str) -> String {
    let used = expr.free_symbols();
    let mut name = format!("_{stem}");
    while used.contains(&name) {
        name.push('_');
    }
    name
}

fn value_at(expr: &Expr, var: &str, point: &Frac) -> Result<Frac> {
    canonical_scalar(&substitute_one(expr, var, &frac_to_expr(point))?)
}

/// Nesting allowed when a product is split into factors.
const PRODUCT_DEPTH: usize = 4;

fn limit_at(expr: &Expr, var: &str, point: &Frac, dir: Direction) -> Result<LimitValue> {
    limit_within(expr, var, point, dir, PRODUCT_DEPTH)
}

fn limit_within(expr: &Expr, var: &str, point: &Frac, dir: Direction, depth: usize) -> Result<LimitValue> {
    if let Some(value) = quotient_limit(expr, var, point, dir)? {
        return Ok(value);
    }
    if depth > 0 {
        if let Some(value) = product_limit(expr, var, point, dir, depth - 1)? {
            return Ok(value);
        }
    }
    numeric_limit(expr, var, point, dir)
}

/// Direct substitution into the canonical quotient, then L'Hôpital's rule on `0/0`.
fn quotient_limit(expr: &Expr, var: &str, point: &Frac, dir: Direction) -> Result<Option<LimitValue>> {
    let Ok(frac) = canonical_scalar(expr) else {
        return Ok(None);
    };
    let mut num = poly_to_expr(frac.num());
    let mut den = poly_to_expr(frac.den());
    for round in 0..LHOPITAL_ROUNDS {
        let (Ok(n0), Ok(d0)) = (value_at(&num, var, point), value_at(&den, var, point)) else {
            break;
        };
        if !d0.is_zero() {
            return Ok(Some(LimitValue::Finite(frac_to_expr(&n0.div(&d0)?))));
        }
        if !n0.is_zero() {
            return infinite_side(expr, var, point, dir).map(Some);
        }
        debug!(round, "indeterminate form, applying l'hopital");
        let ratio = canonical_scalar(&Expr::div(derive(&num, var)?, derive(&den, var)?));
        let Ok(ratio) = ratio else { break };
        num = poly_to_expr(ratio.num());
        den = poly_to_expr(ratio.den());
    }
    Ok(None)
}

fn product_of(mut factors: Vec<Expr>) -> Expr {
    match factors.len() {
        0 => Expr::int(1),
        1 => factors.remove(0),
        _ => Expr::Mul(factors),
    }
}

fn is_bounded(expr: &Expr) -> bool {
    match expr {
        Expr::Num(_) => true,
        Expr::Func(Func::Sin | Func::Cos | Func::Atan, _) => true,
        Expr::Pow(base, exp) => is_bounded(base) && exp.as_rational().is_some_and(|e| !e.is_negative()),
        _ => false,
    }
}

fn is_zero_limit(value: &Result<LimitValue>) -> bool {
    match value {
        Ok(LimitValue::Finite(v)) => canonical_scalar(v).is_ok_and(|f| f.is_zero()),
        _ => false,
    }
}

/// Products whose factors cannot be substituted directly.
///
/// A bounded factor times one that vanishes tends to zero. Otherwise each
/// factor `f` whose cofactor `g` vanishes is tried as `f / (1/g)` under
/// L'Hôpital's rule, and the result is kept only if a sample near the point
/// agrees with it.
fn product_limit(expr: &Expr, var: &str, point: &Frac, dir: Direction, depth: usize) -> Result<Option<LimitValue>> {
    let factors = match expr {
        Expr::Mul(factors) => factors.clone(),
        _ => match canonical_scalar(expr).map(|f| frac_to_expr(&f)) {
            Ok(Expr::Mul(factors)) => factors,
            _ => return Ok(None),
        },
    };
    if factors.len() < 2 {
        return Ok(None);
    }
    let (bounded, rest): (Vec<Expr>, Vec<Expr>) = factors.iter().cloned().partition(is_bounded);
    if !bounded.is_empty() && !rest.is_empty() && is_zero_limit(&limit_within(&product_of(rest), var, point, dir, depth)) {
        debug!("bounded factor times a vanishing one");
        return Ok(Some(LimitValue::Finite(zero())));
    }
    for (i, top) in factors.iter().enumerate() {
        let mut others = factors.clone();
        others.remove(i);
        let others = product_of(others);
        if !is_zero_limit(&limit_within(&others, var, point, dir, depth)) {
            continue;
        }
        let bottom = Expr::pow(others, Expr::int(-1));
        let (Ok(d_top), Ok(d_bottom)) = (derive(top, var), derive(&bottom, var)) else {
            continue;
        };
        let Ok(ratio) = simplify(&Expr::div(d_top, d_bottom)) else {
            continue;
        };
        debug!(factor = i, "rewriting 0*oo as a quotient");
        if let Ok(value) = limit_within(&ratio, var, point, dir, depth) {
            if agrees_near(expr, var, point, dir, &value) {
                return Ok(Some(value));
            }
        }
    }
    Ok(None)
}

fn agrees_near(expr: &Expr, var: &str, point: &Frac, dir: Direction, value: &LimitValue) -> bool {
    let Ok(p) = point_value(point) else {
        return false;
    };
    let Ok(near) = sample(expr, var, p + side(dir) * 1e-6) else {
        return false;
    };
    match value {
        LimitValue::Finite(v) => evaluate_real(v, &BTreeMap::new()).is_ok_and(|v| (near - v).abs() <= 1e-3 * v.abs().max(1.0)),
        LimitValue::PositiveInfinity => near > 1e3,
        LimitValue::NegativeInfinity => near < -1e3,
    }
}

fn side(dir: Direction) -> f64 {
    if dir == Direction::Minus {
        -1.0
    } else {
        1.0
    }
}

fn sample(expr: &Expr, var: &str, x: f64) -> Result<f64> {
    evaluate_real(expr, &BTreeMap::from([(var.to_string(), x)]))
}

fn point_value(point: &Frac) -> Result<f64> {
    evaluate_real(&frac_to_expr(point), &BTreeMap::new())
}

fn infinite_side(expr: &Expr, var: &str, point: &Frac, dir: Direction) -> Result<LimitValue> {
    let p = point_value(point)?;
    let v = sample(expr, var, p + side(dir) * 1e-7)?;
    Ok(if v > 0.0 {
        LimitValue::PositiveInfinity
    } else {
        LimitValue::NegativeInfinity
    })
}

fn numeric_limit(expr: &Expr, var: &str, point: &Frac, dir: Direction) -> Result<LimitValue> {
    let p = point_value(point)?;
    let s = side(dir);
    let at = |h: f64| sample(expr, var, p + s * h);
    let (f1, f2, f3, f4) = (at(1e-3)?, at(5e-4)?, at(1e-5)?, at(5e-6)?);
    if f4.abs() > 1e7 && f4.abs() > f3.abs() && f3.abs() > f1.abs() {
        return Ok(if f4 > 0.0 {
            LimitValue::PositiveInfinity
        } else {
            LimitValue::NegativeInfinity
        });
    }
    let coarse = 2.0 * f2 - f1;
    let fine = 2.0 * f4 - f3;
    if (coarse - fine).abs() > 1e-4 * fine.abs().max(1.0) {
        return Err(SymError::Unsupported("the limit could not be determined".into()));
    }
    recognize(fine)
        .map(LimitValue::Finite)
        .ok_or_else(|| SymError::Unsupported(format!("no closed form found for the limit {fine}")))
}

/// Matches `value` against small rational multiples of common constants.
fn recognize(value: f64) -> Option<Expr> {
    let candidates: [(f64, Option<Expr>); 6] = [
        (1.0, None),
        (std::f64::consts::PI, Some(Expr::Const(Constant::Pi))),
        (std::f64::consts::E, Some(Expr::Const(Constant::E))),
        (std::f64::consts::SQRT_2, Some(Expr::pow(Expr::int(2), Expr::Num(Rational::half())))),
        (3f64.sqrt(), Some(Expr::pow(Expr::int(3), Expr::Num(Rational::half())))),
        (std::f64::consts::LN_2, Some(Expr::func(Func::Log, Expr::int(2)))),
    ];
    for (scale, constant) in candidates {
        let r = Rational::approximate(value / scale, 1000).ok()?;
        if (r.to_f64() * scale - value).abs() <= 1e-8 * value.abs().max(1.0) {
            return Some(match constant {
                None => Expr::Num(r),
                Some(c) if r.is_one() => c,
                Some(c) => Expr::mul(Expr::Num(r), c),
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn power_rule() {
        let d = differentiate(&parse("x**3").unwrap(), "x", 1).unwrap();
        assert!(equals(&d, &parse("3*x**2").unwrap()).unwrap());
    }

    #[test]
    fn recognizes_euler_number() {
        assert_eq!(recognize(std::f64::consts::E), Some(Expr::Const(Constant::E)));
        assert_eq!(recognize(0.5), Some(Expr::Num(Rational::half())));
    }
}
