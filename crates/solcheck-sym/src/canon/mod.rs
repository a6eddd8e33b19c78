//! Canonical forms, simplification and the zero test.
//!
//! Every scalar is brought to a quotient of polynomials over atoms (symbols,
//! `pi`, `I`, radicals and function applications). Two expressions are equal
//! when the numerator of their difference vanishes after rewriting.

mod convert;
mod functions;
mod poly;

pub use convert::{canon_to_expr, canonical, canonical_scalar, frac_to_expr, poly_to_expr, Canon};
pub use poly::{Atom, Frac, Monomial, Poly};

use crate::error::{Result, SymError};
use crate::expr::Expr;

/// Simplified form of `expr`. Equalities, lists and mappings are simplified element-wise.
pub fn simplify(expr: &Expr) -> Result<Expr> {
    match expr {
        Expr::Eq(a, b) => Ok(Expr::eq(simplify(a)?, simplify(b)?)),
        Expr::List(items) => Ok(Expr::List(items.iter().map(simplify).collect::<Result<_>>()?)),
        Expr::Dict(entries) => Ok(Expr::Dict(
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), simplify(v)?)))
                .collect::<Result<_>>()?,
        )),
        Expr::Str(_) => Ok(expr.clone()),
        other => Ok(canon_to_expr(&canonical(other)?)),
    }
}

/// Whether `expr` simplifies to zero. An equality is zero when its sides agree.
pub fn is_zero(expr: &Expr) -> Result<bool> {
    match expr {
        Expr::Eq(a, b) => is_zero(&Expr::sub((**a).clone(), (**b).clone())),
        other => Ok(canonical(other)?.is_zero()),
    }
}

/// Whether two expressions are mathematically equal.
///
/// Matrices of different shapes are unequal; lists compare element-wise.
pub fn equals(a: &Expr, b: &Expr) -> Result<bool> {
    match (a, b) {
        (Expr::List(xs), Expr::List(ys)) => {
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (x, y) in xs.iter().zip(ys) {
                if !equals(x, y)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Expr::Eq(a1, a2), Expr::Eq(b1, b2)) => {
            let lhs = Expr::sub((**a1).clone(), (**a2).clone());
            let rhs = Expr::sub((**b1).clone(), (**b2).clone());
            Ok(equals(&lhs, &rhs)? || equals(&lhs, &Expr::neg(rhs))?)
        }
        _ => match is_zero(&Expr::sub(a.clone(), b.clone())) {
            Err(SymError::Shape(_)) => Ok(false),
            other => other,
        },
    }
}
