//! Floating-point evaluation.
//!
//! Evaluation runs either over the complex numbers or in a strict real mode
//! where leaving the reals (`log` of a non-positive number, even roots of
//! negatives, `I`) is a domain error. Non-finite results are always errors.

use std::collections::BTreeMap;

use num_complex::Complex;

use crate::calculus::{differentiate, limit, LimitValue};
use crate::canon::{canonical_scalar, frac_to_expr, Frac};
use crate::error::{Result, SymError};
use crate::expr::{Constant, Expr, Func, MatOp};
use crate::matrix::numeric_det;

/// Complex number type used for numeric results.
pub type Complex64 = Complex<f64>;

struct Evaluator<'a> {
    bindings: &'a BTreeMap<String, Complex64>,
    real: bool,
}

fn c(re: f64) -> Complex64 {
    Complex::new(re, 0.0)
}

fn domain(what: impl Into<String>) -> SymError {
    SymError::Domain(what.into())
}

impl Evaluator<'_> {
    fn check(&self, value: Complex64, what: &str) -> Result<Complex64> {
        if !value.re.is_finite() || !value.im.is_finite() {
            return Err(domain(format!("{what} is not finite")));
        }
        if self.real && value.im.abs() > 1e-12 * value.re.abs().max(1.0) {
            return Err(domain(format!("{what} is not real")));
        }
        Ok(if self.real { c(value.re) } else { value })
    }

    fn eval(&self, expr: &Expr) -> Result<Complex64> {
        let value = match expr {
            Expr::Num(r) => c(r.to_f64()),
            Expr::Sym(name) => *self
                .bindings
                .get(name)
                .ok_or_else(|| SymError::Unbound(name.clone()))?,
            Expr::Const(Constant::Pi) => c(std::f64::consts::PI),
            Expr::Const(Constant::E) => c(std::f64::consts::E),
            Expr::Const(Constant::I) => {
                if self.real {
                    return Err(domain("the imaginary unit in a real evaluation"));
                }
                Complex::new(0.0, 1.0)
            }
            Expr::Const(Constant::Infinity) => return Err(domain("infinity")),
            Expr::Add(terms) => {
                let mut acc = c(0.0);
                for t in terms {
                    acc += self.eval(t)?;
                }
                acc
            }
            Expr::Mul(factors) => {
                let mut acc = c(1.0);
                for f in factors {
                    acc *= self.eval(f)?;
                }
                acc
            }
            Expr::Pow(base, exp) => self.pow(base, exp)?,
            Expr::Func(f, arg) => self.func(*f, self.eval(arg)?)?,
            Expr::Derivative { expr, var, order } => self.eval(&differentiate(expr, var, *order)?)?,
            Expr::Limit { expr, var, point, dir } => match limit(expr, var, point, *dir)? {
                LimitValue::Finite(value) => self.eval(&value)?,
                _ => return Err(domain("the limit is infinite")),
            },
            Expr::MatOp(op @ (MatOp::Det | MatOp::Trace), inner) => {
                let Expr::Matrix(rows) = crate::canon::simplify(inner).unwrap_or_else(|_| (**inner).clone()) else {
                    return Err(SymError::NotScalar(format!("{} of a non-matrix", op.name())));
                };
                let values = rows
                    .iter()
                    .map(|r| r.iter().map(|e| self.eval(e)).collect::<Result<Vec<_>>>())
                    .collect::<Result<Vec<_>>>()?;
                match op {
                    MatOp::Det => numeric_det(&values)?,
                    _ => {
                        if values.iter().any(|r| r.len() != values.len()) {
                            return Err(SymError::Shape("trace needs a square matrix".into()));
                        }
                        values.iter().enumerate().map(|(i, r)| r[i]).sum()
                    }
                }
            }
            Expr::Apply(name, _) => {
                return Err(SymError::Unsupported(format!("cannot evaluate undefined function `{name}`")))
            }
            other => return Err(SymError::NotScalar(other.to_string())),
        };
        self.check(value, "value")
    }

    fn pow(&self, base: &Expr, exp: &Expr) -> Result<Complex64> {
        let b = self.eval(base)?;
        let exact = exp.as_rational().or_else(|| {
            if exp.free_symbols().is_empty() {
                canonical_scalar(exp).ok().and_then(|f| f.as_rational())
            } else {
                None
            }
        });
        let e = match &exact {
            Some(r) => c(r.to_f64()),
            None => self.eval(exp)?,
        };
        if b.norm() == 0.0 {
            return if e.re > 0.0 {
                Ok(c(0.0))
            } else {
                Err(domain("zero raised to a non-positive power"))
            };
        }
        if let Some(r) = &exact {
            if let Some(k) = r.to_i64().and_then(|k| i32::try_from(k).ok()) {
                return self.check(b.powi(k), "power");
            }
            if b.im == 0.0 && b.re < 0.0 && r.denom_is_odd() {
                let magnitude = (-b.re).powf(r.to_f64());
                let sign = if r.numer_is_odd() { -1.0 } else { 1.0 };
                return self.check(c(sign * magnitude), "power");
            }
        }
        if self.real {
            if b.re < 0.0 {
                return Err(domain("fractional power of a negative number"));
            }
            return self.check(c(b.re.powf(e.re)), "power");
        }
        self.check(b.powc(e), "power")
    }

    fn func(&self, f: Func, x: Complex64) -> Result<Complex64> {
        if self.real {
            let v = x.re;
            let out = match f {
                Func::Log if v <= 0.0 => return Err(domain("log of a non-positive number")),
                Func::Asin | Func::Acos if v.abs() > 1.0 => return Err(domain("inverse sine or cosine outside [-1, 1]")),
                Func::Sin => v.sin(),
                Func::Cos => v.cos(),
                Func::Tan => v.tan(),
                Func::Asin => v.asin(),
                Func::Acos => v.acos(),
                Func::Atan => v.atan(),
                Func::Sinh => v.sinh(),
                Func::Cosh => v.cosh(),
                Func::Tanh => v.tanh(),
                Func::Exp => v.exp(),
                Func::Log => v.ln(),
                Func::Abs => v.abs(),
                Func::Re | Func::Conjugate => v,
                Func::Im => 0.0,
                Func::Arg => {
                    if v < 0.0 {
                        std::f64::consts::PI
                    } else {
                        0.0
                    }
                }
            };
            return self.check(c(out), f.name());
        }
        let out = match f {
            Func::Log if x.norm() == 0.0 => return Err(domain("log(0)")),
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
            Func::Asin => x.asin(),
            Func::Acos => x.acos(),
            Func::Atan => x.atan(),
            Func::Sinh => x.sinh(),
            Func::Cosh => x.cosh(),
            Func::Tanh => x.tanh(),
            Func::Exp => x.exp(),
            Func::Log => x.ln(),
            Func::Abs => c(x.norm()),
            Func::Re => c(x.re),
            Func::Im => c(x.im),
            Func::Conjugate => x.conj(),
            Func::Arg => c(x.arg()),
        };
        self.check(out, f.name())
    }
}

/// Evaluates `expr` over the complex numbers.
pub fn evaluate(expr: &Expr, bindings: &BTreeMap<String, Complex64>) -> Result<Complex64> {
    Evaluator { bindings, real: false }.eval(expr)
}

/// Evaluates `expr` over the reals; any non-real intermediate value is a domain error.
pub fn evaluate_real(expr: &Expr, bindings: &BTreeMap<String, f64>) -> Result<f64> {
    let bindings: BTreeMap<String, Complex64> = bindings.iter().map(|(k, v)| (k.clone(), c(*v))).collect();
    Ok(Evaluator {
        bindings: &bindings,
        real: true,
    }
    .eval(expr)?
    .re)
}

/// Numeric value of a canonical constant.
pub fn evaluate_constant(value: &Frac) -> Result<Complex64> {
    evaluate(&frac_to_expr(value), &BTreeMap::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn real_mode_rejects_log_of_negative() {
        let e = parse("log(x)").unwrap();
        let bindings = BTreeMap::from([("x".to_string(), -1.0)]);
        assert!(matches!(evaluate_real(&e, &bindings), Err(SymError::Domain(_))));
    }

    #[test]
    fn odd_roots_of_negatives_are_real() {
        let e = parse("(-8)**(1/3)").unwrap();
        let v = evaluate_real(&e, &BTreeMap::new()).unwrap();
        assert!((v + 2.0).abs() < 1e-12);
    }

    #[test]
    fn imaginary_unit_squares() {
        let v = evaluate(&parse("I**2 + 1").unwrap(), &BTreeMap::new()).unwrap();
        assert!(v.norm() < 1e-12);
    }

    #[test]
    fn complex_transcendental_functions() {
        let bindings = BTreeMap::from([("z".to_string(), Complex::new(0.5, -1.5))]);
        let v = evaluate(&parse("sin(z)**2 + cos(z)**2 + (1 + I)**(1/2)*(1 + I)**(1/2) - I").unwrap(), &bindings).unwrap();
        assert!((v - c(2.0)).norm() < 1e-12, "{v}");
        let v = evaluate(&parse("exp(I*pi) + Abs(3 + 4*I)").unwrap(), &BTreeMap::new()).unwrap();
        assert!((v - c(4.0)).norm() < 1e-12, "{v}");
    }
}
