//! Special values and rewrites for elementary functions.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::ToPrimitive;

use crate::error::{Result, SymError};
use crate::eval::evaluate_constant;
use crate::expr::Func;
use crate::rational::Rational;

use super::poly::{rational_power, Atom, Frac, Poly};

fn frac_of(poly: Poly) -> Result<Frac> {
    Frac::from_poly(poly)
}

fn atom(f: Func, arg: Frac) -> Result<Frac> {
    frac_of(Poly::atom(Atom::Func(f, arg)))
}

fn pi() -> Frac {
    Frac::from_poly(Poly::atom(Atom::Pi)).unwrap_or_else(|_| Frac::zero())
}

fn pi_times(k: Rational) -> Result<Frac> {
    pi().mul(&Frac::constant(k))
}

/// `c` such that the value is `c * pi`.
fn pi_multiple(arg: &Frac) -> Option<Rational> {
    if arg.is_zero() {
        return Some(Rational::zero());
    }
    if arg.den().as_constant() != Some(Rational::one()) {
        return None;
    }
    let (mono, c) = arg.num().as_single_term()?;
    if mono.len() == 1 && mono.get(&Atom::Pi).is_some_and(Rational::is_one) {
        Some(c)
    } else {
        None
    }
}

fn sqrt_over(n: i128, d: i128) -> Result<Frac> {
    let root = rational_power(&Rational::integer(n), &Rational::half())?;
    Frac::from_poly(root.scale(&Rational::new(1, d)?)?)
}

/// `sin(k * pi / 12)` for `k` in `0..24` where the value is a known radical.
fn sin_table(k: u8) -> Result<Option<Frac>> {
    let half = |sign: i128| Ok::<_, SymError>(Some(Frac::constant(Rational::new(sign, 2)?)));
    let value = match k {
        0 | 12 => Some(Frac::zero()),
        6 => Some(Frac::one()),
        18 => Some(Frac::constant(Rational::minus_one())),
        2 | 10 => return half(1),
        14 | 22 => return half(-1),
        3 | 9 => Some(sqrt_over(2, 2)?),
        15 | 21 => Some(sqrt_over(2, 2)?.neg()),
        4 | 8 => Some(sqrt_over(3, 2)?),
        16 | 20 => Some(sqrt_over(3, 2)?.neg()),
        _ => None,
    };
    Ok(value)
}

fn trig_special(arg: &Frac, shift: i64) -> Result<Option<Frac>> {
    let Some(c) = pi_multiple(arg) else {
        return Ok(None);
    };
    let twelfths = c * Rational::integer(12);
    if !twelfths.is_integer() {
        return Ok(None);
    }
    let k = (twelfths.numer() + BigInt::from(shift)).mod_floor(&BigInt::from(24));
    match k.to_u8() {
        Some(k) => sin_table(k),
        None => Ok(None),
    }
}

/// `exp(arg)` as a polynomial, folding `log` terms and multiples of `I*pi`.
pub(crate) fn exp_poly(arg: &Frac) -> Result<Poly> {
    if arg.is_zero() {
        return Ok(Poly::one());
    }
    if arg.den().as_constant() != Some(Rational::one()) {
        return Ok(arg.clone().exp_atom());
    }
    let mut factor = Poly::one();
    let mut rest = Poly::zero();
    for (mono, c) in arg.num().terms() {
        if mono.len() == 1 {
            if let Some((Atom::Func(Func::Log, inner), e)) = mono.iter().next() {
                if e.is_one() {
                    factor = factor.mul(&inner.pow_rational(c)?.to_poly()?)?;
                    continue;
                }
            }
        }
        let is_i_pi = mono.len() == 2
            && mono.get(&Atom::Imag).is_some_and(Rational::is_one)
            && mono.get(&Atom::Pi).is_some_and(Rational::is_one);
        let doubled = c * &Rational::integer(2);
        if is_i_pi && doubled.is_integer() {
            factor = factor.mul(&Poly::atom_pow(Atom::Imag, doubled))?;
            continue;
        }
        rest = rest.add(&Poly::term(mono.clone(), c.clone()))?;
    }
    if !rest.is_zero() {
        factor = factor.mul(&Frac::from_poly(rest)?.exp_atom())?;
    }
    Ok(factor)
}

fn odd(f: Func, arg: &Frac) -> Result<Frac> {
    if arg.is_negative_leading() {
        Ok(atom(f, arg.neg())?.neg())
    } else {
        atom(f, arg.clone())
    }
}

fn real_sign(arg: &Frac) -> Option<f64> {
    let value = evaluate_constant(arg).ok()?;
    if value.im.abs() > 1e-12 {
        return None;
    }
    Some(value.re.signum())
}

fn exp_of(arg: &Frac) -> Result<Frac> {
    frac_of(exp_poly(arg)?)
}

/// Largest sum length or integer multiple expanded by the addition formulas.
const MAX_ANGLE_SPLIT: usize = 8;

/// `arg = a + b` for the addition formulas: the first term of a sum, or one
/// copy of `u` out of `k * u` for an integer `2 <= k`.
fn split_angle(arg: &Frac) -> Result<Option<(Frac, Frac)>> {
    if arg.den().as_constant() != Some(Rational::one()) || arg.num().len() > MAX_ANGLE_SPLIT {
        return Ok(None);
    }
    let num = arg.num();
    let first = if num.len() >= 2 {
        num.terms().next().map(|(mono, c)| Poly::term(mono.clone(), c.clone()))
    } else {
        num.as_single_term()
            .filter(|(mono, c)| {
                !mono.is_empty()
                    && c.is_integer()
                    && c.abs() > Rational::one()
                    && c.abs() <= Rational::integer(MAX_ANGLE_SPLIT as i64)
            })
            .map(|(mono, c)| {
                let unit = if c.is_negative() { Rational::minus_one() } else { Rational::one() };
                Poly::term(mono.clone(), unit)
            })
    };
    let Some(first) = first else {
        return Ok(None);
    };
    let rest = num.add(&first.neg())?;
    Ok(Some((Frac::from_poly(first)?, Frac::from_poly(rest)?)))
}

fn sin_of(arg: &Frac) -> Result<Frac> {
    if let Some(v) = trig_special(arg, 0)? {
        return Ok(v);
    }
    if let Some((a, b)) = split_angle(arg)? {
        let ab = sin_of(&a)?.mul(&cos_of(&b)?)?;
        return ab.add(&cos_of(&a)?.mul(&sin_of(&b)?)?);
    }
    odd(Func::Sin, arg)
}

fn cos_of(arg: &Frac) -> Result<Frac> {
    if let Some(v) = trig_special(arg, 6)? {
        return Ok(v);
    }
    if let Some((a, b)) = split_angle(arg)? {
        let ab = cos_of(&a)?.mul(&cos_of(&b)?)?;
        return ab.sub(&sin_of(&a)?.mul(&sin_of(&b)?)?);
    }
    if arg.is_negative_leading() {
        atom(Func::Cos, arg.neg())
    } else {
        atom(Func::Cos, arg.clone())
    }
}

fn unit_sign(r: &Rational) -> i128 {
    if r.is_negative() {
        -1
    } else {
        1
    }
}

/// Applies `f` to a canonical argument.
///
/// Sines and cosines of sums and of integer multiples are expanded, so every
/// trigonometric atom has a single-term argument with coefficient one.
pub(crate) fn apply(f: Func, arg: &Frac) -> Result<Frac> {
    let special = |r: Rational| Ok(Frac::constant(r));
    match f {
        Func::Sin => sin_of(arg),
        Func::Cos => cos_of(arg),
        Func::Tan => {
            let cos = cos_of(arg)?;
            if cos.is_zero() {
                return Err(SymError::Undefined("tan is undefined at odd multiples of pi/2".into()));
            }
            sin_of(arg)?.div(&cos)
        }
        Func::Exp => exp_of(arg),
        Func::Log => {
            if arg.is_zero() {
                return Err(SymError::Undefined("log(0)".into()));
            }
            if arg.as_rational() == Some(Rational::one()) {
                return Ok(Frac::zero());
            }
            if let Some(Atom::Func(Func::Exp, inner)) = arg.as_atom() {
                return Ok(inner.clone());
            }
            atom(Func::Log, arg.clone())
        }
        Func::Asin => match arg.as_rational() {
            Some(r) if r.is_zero() => special(Rational::zero()),
            Some(r) if r.abs().is_one() => pi_times(Rational::new(unit_sign(&r), 2)?),
            Some(r) if r.abs() == Rational::half() => pi_times(Rational::new(unit_sign(&r), 6)?),
            _ => odd(Func::Asin, arg),
        },
        Func::Acos => match arg.as_rational() {
            Some(r) if r.is_one() => special(Rational::zero()),
            Some(r) if r.is_zero() => pi_times(Rational::half()),
            Some(r) if r == Rational::minus_one() => pi_times(Rational::one()),
            Some(r) if r == Rational::half() => pi_times(Rational::new(1, 3)?),
            Some(r) if r == Rational::half().neg() => pi_times(Rational::new(2, 3)?),
            _ if arg.is_negative_leading() => pi().sub(&atom(Func::Acos, arg.neg())?),
            _ => atom(Func::Acos, arg.clone()),
        },
        Func::Atan => match arg.as_rational() {
            Some(r) if r.is_zero() => special(Rational::zero()),
            Some(r) if r.abs().is_one() => pi_times(Rational::new(unit_sign(&r), 4)?),
            _ => odd(Func::Atan, arg),
        },
        Func::Sinh | Func::Cosh | Func::Tanh => {
            let up = exp_of(arg)?;
            let down = exp_of(&arg.neg())?;
            let half = Frac::constant(Rational::half());
            let sinh = up.sub(&down)?.mul(&half)?;
            let cosh = up.add(&down)?.mul(&half)?;
            match f {
                Func::Sinh => Ok(sinh),
                Func::Cosh => Ok(cosh),
                _ => sinh.div(&cosh),
            }
        }
        Func::Abs => {
            if !arg.is_symbolic() {
                let (re, im) = arg.split_complex()?;
                if !im.is_zero() {
                    return re.mul(&re)?.add(&im.mul(&im)?)?.pow_rational(&Rational::half());
                }
                return match real_sign(arg) {
                    Some(s) if s < 0.0 => Ok(arg.neg()),
                    Some(_) => Ok(arg.clone()),
                    None => atom(Func::Abs, arg.clone()),
                };
            }
            if arg.is_negative_leading() {
                atom(Func::Abs, arg.neg())
            } else {
                atom(Func::Abs, arg.clone())
            }
        }
        Func::Re | Func::Im | Func::Conjugate | Func::Arg if arg.is_symbolic() => atom(f, arg.clone()),
        Func::Re => Ok(arg.split_complex()?.0),
        Func::Im => Ok(arg.split_complex()?.1),
        Func::Conjugate => arg.conjugate(),
        Func::Arg => {
            let (re, im) = arg.split_complex()?;
            let re_sign = real_sign(&re).unwrap_or(0.0);
            let im_sign = if im.is_zero() { 0.0 } else { real_sign(&im).unwrap_or(0.0) };
            if re.is_zero() {
                if im.is_zero() {
                    return Err(SymError::Undefined("arg(0)".into()));
                }
                return pi_times(Rational::new(if im_sign < 0.0 { -1 } else { 1 }, 2)?);
            }
            let base = apply(Func::Atan, &im.div(&re)?)?;
            if re_sign > 0.0 {
                Ok(base)
            } else if im_sign < 0.0 {
                base.sub(&pi())
            } else {
                base.add(&pi())
            }
        }
    }
}
