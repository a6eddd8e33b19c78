//! Conversion between expression trees and canonical values.

use crate::calculus::{differentiate, limit, LimitValue};
use crate::error::{Result, SymError};
use crate::expr::{Constant, Expr, Func};
use crate::matrix::{self, FracMatrix};
use crate::rational::Rational;

use super::functions;
use super::poly::{Atom, Frac, Monomial, Poly};

/// Canonical value of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Canon {
    /// Scalar.
    Scalar(Frac),
    /// Matrix given by rows.
    Matrix(FracMatrix),
}

impl Canon {
    /// The scalar value, or `NotScalar`.
    pub fn into_scalar(self) -> Result<Frac> {
        match self {
            Canon::Scalar(f) => Ok(f),
            Canon::Matrix(_) => Err(SymError::NotScalar("matrix".into())),
        }
    }

    /// Whether every entry is zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Canon::Scalar(f) => f.is_zero(),
            Canon::Matrix(rows) => rows.iter().flatten().all(Frac::is_zero),
        }
    }

    fn add(&self, other: &Canon) -> Result<Canon> {
        match (self, other) {
            (Canon::Scalar(a), Canon::Scalar(b)) => Ok(Canon::Scalar(a.add(b)?)),
            (Canon::Matrix(a), Canon::Matrix(b)) => Ok(Canon::Matrix(matrix::add(a, b)?)),
            _ => Err(SymError::Shape("cannot add a scalar and a matrix".into())),
        }
    }

    fn mul(&self, other: &Canon) -> Result<Canon> {
        match (self, other) {
            (Canon::Scalar(a), Canon::Scalar(b)) => Ok(Canon::Scalar(a.mul(b)?)),
            (Canon::Scalar(k), Canon::Matrix(m)) | (Canon::Matrix(m), Canon::Scalar(k)) => {
                Ok(Canon::Matrix(matrix::scale(k, m)?))
            }
            (Canon::Matrix(a), Canon::Matrix(b)) => Ok(Canon::Matrix(matrix::mul(a, b)?)),
        }
    }

    fn pow(&self, exp: &Frac) -> Result<Canon> {
        match self {
            Canon::Scalar(base) => Ok(Canon::Scalar(scalar_pow(base, exp)?)),
            Canon::Matrix(m) => {
                let k = exp
                    .as_rational()
                    .filter(Rational::is_integer)
                    .ok_or_else(|| SymError::Unsupported("matrix powers need an integer exponent".into()))?;
                Ok(Canon::Matrix(matrix::pow(m, k.to_i64().ok_or(SymError::Overflow)?)?))
            }
        }
    }
}

fn scalar_pow(base: &Frac, exp: &Frac) -> Result<Frac> {
    if let Some(r) = exp.as_rational() {
        return base.pow_rational(&r);
    }
    if base.is_zero() {
        return Err(SymError::Undefined("zero raised to a symbolic power".into()));
    }
    let log = functions::apply(Func::Log, base)?;
    functions::apply(Func::Exp, &exp.mul(&log)?)
}

/// Canonical scalar value of `expr`.
pub fn canonical_scalar(expr: &Expr) -> Result<Frac> {
    canonical(expr)?.into_scalar()
}

/// Canonical value of `expr`.
pub fn canonical(expr: &Expr) -> Result<Canon> {
    Ok(match expr {
        Expr::Num(r) => Canon::Scalar(Frac::constant(r.clone())),
        Expr::Sym(name) => Canon::Scalar(Frac::from_poly(Poly::atom(Atom::Sym(name.clone())))?),
        Expr::Const(Constant::Pi) => Canon::Scalar(Frac::from_poly(Poly::atom(Atom::Pi))?),
        Expr::Const(Constant::I) => Canon::Scalar(Frac::from_poly(Poly::atom(Atom::Imag))?),
        Expr::Const(Constant::E) => Canon::Scalar(functions::apply(Func::Exp, &Frac::one())?),
        Expr::Const(Constant::Infinity) => {
            return Err(SymError::Unsupported("infinity is not a finite value".into()))
        }
        Expr::Add(terms) => {
            let mut acc: Option<Canon> = None;
            for t in terms {
                let c = canonical(t)?;
                acc = Some(match acc {
                    Some(a) => a.add(&c)?,
                    None => c,
                });
            }
            acc.unwrap_or(Canon::Scalar(Frac::zero()))
        }
        Expr::Mul(factors) => {
            let mut acc = Canon::Scalar(Frac::one());
            for f in factors {
                acc = acc.mul(&canonical(f)?)?;
            }
            acc
        }
        Expr::Pow(base, exp) => canonical(base)?.pow(&canonical_scalar(exp)?)?,
        Expr::Func(f, arg) => Canon::Scalar(functions::apply(*f, &canonical_scalar(arg)?)?),
        Expr::Apply(name, args) => {
            let args = args.iter().map(canonical_scalar).collect::<Result<Vec<_>>>()?;
            Canon::Scalar(Frac::from_poly(Poly::atom(Atom::Apply(name.clone(), args)))?)
        }
        Expr::Derivative { expr, var, order } => canonical(&differentiate(expr, var, *order)?)?,
        Expr::Limit { expr, var, point, dir } => match limit(expr, var, point, *dir)? {
            LimitValue::Finite(value) => canonical(&value)?,
            _ => return Err(SymError::Unsupported("the limit is infinite".into())),
        },
        Expr::Matrix(rows) => Canon::Matrix(
            rows.iter()
                .map(|r| r.iter().map(canonical_scalar).collect::<Result<Vec<_>>>())
                .collect::<Result<Vec<_>>>()?,
        ),
        Expr::MatOp(op, inner) => match canonical(inner)? {
            Canon::Matrix(m) => matrix::apply(*op, &m)?,
            Canon::Scalar(_) => return Err(SymError::Shape(format!("{} needs a matrix", op.name()))),
        },
        Expr::Eq(..) => return Err(SymError::NotScalar("equality".into())),
        Expr::List(_) => return Err(SymError::NotScalar("list".into())),
        Expr::Dict(_) => return Err(SymError::NotScalar("mapping".into())),
        Expr::Str(s) => return Err(SymError::NotScalar(format!("string {s:?}"))),
    })
}

fn atom_to_expr(atom: &Atom) -> Expr {
    match atom {
        Atom::Sym(name) => Expr::Sym(name.clone()),
        Atom::Imag => Expr::Const(Constant::I),
        Atom::Pi => Expr::Const(Constant::Pi),
        Atom::Prime(p) => Expr::Num(Rational::integer(p.clone())),
        Atom::Func(Func::Exp, arg) if arg.as_rational().is_some_and(|r| r.is_one()) => Expr::Const(Constant::E),
        Atom::Func(f, arg) => Expr::func(*f, frac_to_expr(arg)),
        Atom::Radical(p) => poly_to_expr(p),
        Atom::Apply(name, args) => Expr::Apply(name.clone(), args.iter().map(frac_to_expr).collect()),
    }
}

fn degree(mono: &Monomial) -> Rational {
    mono.iter()
        .filter(|(a, _)| matches!(a, Atom::Sym(_)))
        .fold(Rational::zero(), |acc, (_, e)| acc + e)
}

fn term_to_expr(mono: &Monomial, coeff: &Rational) -> Expr {
    let mut factors = Vec::new();
    if !coeff.is_one() || mono.is_empty() {
        factors.push(Expr::Num(coeff.clone()));
    }
    for (atom, e) in mono {
        let base = atom_to_expr(atom);
        factors.push(if e.is_one() { base } else { Expr::pow(base, Expr::Num(e.clone())) });
    }
    if factors.len() == 1 {
        factors.remove(0)
    } else {
        Expr::Mul(factors)
    }
}

/// Expression for a polynomial, highest degree first.
pub fn poly_to_expr(poly: &Poly) -> Expr {
    let mut terms: Vec<(&Monomial, &Rational)> = poly.terms().collect();
    terms.sort_by(|a, b| degree(b.0).cmp(&degree(a.0)));
    let mut items: Vec<Expr> = terms.into_iter().map(|(m, c)| term_to_expr(m, c)).collect();
    match items.len() {
        0 => Expr::int(0),
        1 => items.remove(0),
        _ => Expr::Add(items),
    }
}

/// Expression for a canonical scalar.
pub fn frac_to_expr(frac: &Frac) -> Expr {
    let num = poly_to_expr(frac.num());
    match frac.den().as_constant() {
        Some(d) if d.is_one() => num,
        _ => Expr::div(num, poly_to_expr(frac.den())),
    }
}

/// Expression for a canonical value.
pub fn canon_to_expr(canon: &Canon) -> Expr {
    match canon {
        Canon::Scalar(f) => frac_to_expr(f),
        Canon::Matrix(rows) => Expr::Matrix(rows.iter().map(|r| r.iter().map(frac_to_expr).collect()).collect()),
    }
}
