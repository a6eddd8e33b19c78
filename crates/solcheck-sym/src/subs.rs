//! Substitution of symbols by expressions.

use std::collections::BTreeMap;

use crate::calculus::differentiate;
use crate::error::Result;
use crate::expr::Expr;

/// Replaces every free occurrence of the mapped symbols simultaneously.
///
/// A derivative whose variable is being replaced is evaluated first, so
/// `Derivative(x**2, x)` at `x = 3` yields `6` rather than a derivative
/// with respect to a number.
pub fn substitute(expr: &Expr, mapping: &BTreeMap<String, Expr>) -> Result<Expr> {
    if mapping.is_empty() {
        return Ok(expr.clone());
    }
    Ok(match expr {
        Expr::Sym(name) => mapping.get(name).cloned().unwrap_or_else(|| expr.clone()),
        Expr::Num(_) | Expr::Const(_) | Expr::Str(_) => expr.clone(),
        Expr::Derivative { expr: inner, var, order } => {
            if mapping.contains_key(var) {
                substitute(&differentiate(inner, var, *order)?, mapping)?
            } else {
                Expr::Derivative {
                    expr: Box::new(substitute(inner, mapping)?),
                    var: var.clone(),
                    order: *order,
                }
            }
        }
        Expr::Limit { expr: inner, var, point, dir } => {
            let mut scoped = mapping.clone();
            scoped.remove(var);
            Expr::Limit {
                expr: Box::new(substitute(inner, &scoped)?),
                var: var.clone(),
                point: Box::new(substitute(point, mapping)?),
                dir: *dir,
            }
        }
        Expr::Add(items) => Expr::Add(subs_all(items, mapping)?),
        Expr::Mul(items) => Expr::Mul(subs_all(items, mapping)?),
        Expr::List(items) => Expr::List(subs_all(items, mapping)?),
        Expr::Apply(name, items) => Expr::Apply(name.clone(), subs_all(items, mapping)?),
        Expr::Pow(a, b) => Expr::pow(substitute(a, mapping)?, substitute(b, mapping)?),
        Expr::Eq(a, b) => Expr::eq(substitute(a, mapping)?, substitute(b, mapping)?),
        Expr::Func(f, a) => Expr::func(*f, substitute(a, mapping)?),
        Expr::MatOp(op, a) => Expr::MatOp(*op, Box::new(substitute(a, mapping)?)),
        Expr::Dict(entries) => Expr::Dict(
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), substitute(v, mapping)?)))
                .collect::<Result<_>>()?,
        ),
        Expr::Matrix(rows) => Expr::Matrix(
            rows.iter()
                .map(|r| subs_all(r, mapping))
                .collect::<Result<_>>()?,
        ),
    })
}

fn subs_all(items: &[Expr], mapping: &BTreeMap<String, Expr>) -> Result<Vec<Expr>> {
    items.iter().map(|e| substitute(e, mapping)).collect()
}

/// Substitutes a single symbol.
pub fn substitute_one(expr: &Expr, var: &str, value: &Expr) -> Result<Expr> {
    substitute(expr, &BTreeMap::from([(var.to_string(), value.clone())]))
}
