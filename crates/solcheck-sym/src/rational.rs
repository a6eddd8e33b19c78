//! Exact rational numbers of unbounded size.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::{Result, SymError};

/// Largest exponent accepted by [`Rational::try_pow`].
const MAX_POW: u64 = 4096;

/// Reduced fraction with a positive denominator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rational(BigRational);

fn division_by_zero() -> SymError {
    SymError::Undefined("division by zero".to_string())
}

impl Rational {
    /// Zero.
    pub fn zero() -> Self {
        Self(BigRational::zero())
    }

    /// One.
    pub fn one() -> Self {
        Self(BigRational::one())
    }

    /// Minus one.
    pub fn minus_one() -> Self {
        Self::integer(-1)
    }

    /// One half.
    pub fn half() -> Self {
        Self(BigRational::new(BigInt::one(), BigInt::from(2)))
    }

    /// Builds a reduced fraction; fails on a zero denominator.
    pub fn new(num: i128, den: i128) -> Result<Self> {
        Self::from_bigints(BigInt::from(num), BigInt::from(den))
    }

    /// Builds a reduced fraction from big integers; fails on a zero denominator.
    pub fn from_bigints(num: BigInt, den: BigInt) -> Result<Self> {
        if den.is_zero() {
            return Err(division_by_zero());
        }
        Ok(Self(BigRational::new(num, den)))
    }

    /// Integer value.
    pub fn integer(value: impl Into<BigInt>) -> Self {
        Self(BigRational::from_integer(value.into()))
    }

    /// Numerator.
    pub fn numer(&self) -> &BigInt {
        self.0.numer()
    }

    /// Denominator (always positive).
    pub fn denom(&self) -> &BigInt {
        self.0.denom()
    }

    /// Integer value as `i64`, when integral and in range.
    pub fn to_i64(&self) -> Option<i64> {
        self.is_integer().then(|| self.numer().to_i64()).flatten()
    }

    /// Whether the numerator is odd.
    pub fn numer_is_odd(&self) -> bool {
        self.numer().is_odd()
    }

    /// Whether the denominator is odd.
    pub fn denom_is_odd(&self) -> bool {
        self.denom().is_odd()
    }

    /// Parses decimal notation exactly (`12`, `-0.25`, `1e-3`, `2.5E2`).
    pub fn from_decimal_str(text: &str) -> Result<Self> {
        let invalid = |position: usize| SymError::Parse {
            position,
            message: format!("invalid number `{text}`"),
        };
        let (mantissa, exponent) = match text.find(['e', 'E']) {
            Some(idx) => {
                let exp: i32 = text[idx + 1..].parse().map_err(|_| SymError::Parse {
                    position: idx,
                    message: format!("invalid exponent in `{text}`"),
                })?;
                (&text[..idx], exp)
            }
            None => (text, 0),
        };
        let (negative, digits) = match mantissa.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid(0));
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid(0));
        }
        let num: BigInt = format!("{int_part}{frac_part}").parse().map_err(|_| invalid(0))?;
        let scale = i64::from(exponent) - frac_part.len() as i64;
        if scale.unsigned_abs() > MAX_POW {
            return Err(SymError::Overflow);
        }
        let ten_pow = num_traits::pow(BigInt::from(10), scale.unsigned_abs() as usize);
        let value = if scale >= 0 {
            Self::integer(num * ten_pow)
        } else {
            Self::from_bigints(num, ten_pow)?
        };
        Ok(if negative { value.neg() } else { value })
    }

    /// Closest fraction with denominator at most `max_den` (continued fractions).
    pub fn approximate(value: f64, max_den: i128) -> Result<Self> {
        if !value.is_finite() {
            return Err(SymError::Domain(format!("cannot approximate {value}")));
        }
        let negative = value < 0.0;
        let mut x = value.abs();
        let (mut h0, mut h1) = (0i128, 1i128);
        let (mut k0, mut k1) = (1i128, 0i128);
        for _ in 0..64 {
            let a = x.floor();
            if a > 1e18 {
                break;
            }
            let a = a as i128;
            let h2 = a.checked_mul(h1).and_then(|v| v.checked_add(h0));
            let k2 = a.checked_mul(k1).and_then(|v| v.checked_add(k0));
            let (Some(h2), Some(k2)) = (h2, k2) else { break };
            if k2 > max_den {
                break;
            }
            (h0, h1) = (h1, h2);
            (k0, k1) = (k1, k2);
            let frac = x - a as f64;
            if frac < 1e-15 {
                break;
            }
            x = 1.0 / frac;
        }
        if k1 == 0 {
            return Ok(Self::zero());
        }
        let r = Self::new(h1, k1)?;
        Ok(if negative { r.neg() } else { r })
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether the value is one.
    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    /// Whether the denominator is one.
    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }

    /// Whether the value is strictly negative.
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    /// Negation.
    pub fn neg(&self) -> Self {
        Self(-&self.0)
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Largest integer not greater than the value.
    pub fn floor(&self) -> Self {
        Self(self.0.floor())
    }

    /// Quotient; fails on a zero divisor.
    pub fn try_div(&self, other: &Self) -> Result<Self> {
        if other.is_zero() {
            return Err(division_by_zero());
        }
        Ok(Self(&self.0 / &other.0))
    }

    /// Reciprocal; fails on zero.
    pub fn recip(&self) -> Result<Self> {
        Self::one().try_div(self)
    }

    /// Integer power; fails on `0 ** -k` and on exponents too large to expand.
    pub fn try_pow(&self, exp: i64) -> Result<Self> {
        if exp.unsigned_abs() > MAX_POW {
            return Err(SymError::Overflow);
        }
        let base = if exp < 0 { self.recip()? } else { self.clone() };
        Ok(Self(num_traits::pow(base.0, exp.unsigned_abs() as usize)))
    }

    /// Lossy conversion to `f64`.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident) => {
        impl $trait<&Rational> for &Rational {
            type Output = Rational;
            fn $method(self, other: &Rational) -> Rational {
                Rational($trait::$method(&self.0, &other.0))
            }
        }

        impl $trait<&Rational> for Rational {
            type Output = Rational;
            fn $method(self, other: &Rational) -> Rational {
                Rational($trait::$method(self.0, &other.0))
            }
        }

        impl $trait for Rational {
            type Output = Rational;
            fn $method(self, other: Rational) -> Rational {
                Rational($trait::$method(self.0, other.0))
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Self::integer(value)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.numer())
        } else {
            write!(f, "{}/{}", self.numer(), self.denom())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: i128, d: i128) -> Rational {
        Rational::new(n, d).expect("non-zero denominator")
    }

    #[test]
    fn decimals_are_exact() {
        assert_eq!(Rational::from_decimal_str("0.25").unwrap(), q(1, 4));
        assert_eq!(Rational::from_decimal_str("1e-3").unwrap(), q(1, 1000));
        assert_eq!(Rational::from_decimal_str("2.5E2").unwrap(), Rational::integer(250));
    }

    #[test]
    fn continued_fraction_recovers_simple_fractions() {
        assert_eq!(Rational::approximate(0.333_333_333_333, 1000).unwrap(), q(1, 3));
        assert_eq!(Rational::approximate(-2.5, 10).unwrap(), q(-5, 2));
    }

    #[test]
    fn ordering_matches_value() {
        let (a, b) = (q(1, 3), q(1, 2));
        assert!(a < b);
        assert!(b.neg() < a.neg());
        assert_eq!(q(7, 2).floor(), Rational::integer(3));
        assert_eq!(q(-1, 2).floor(), Rational::integer(-1));
    }

    #[test]
    fn large_powers_stay_exact() {
        let big = Rational::integer(3).try_pow(120).unwrap();
        let back = big.try_div(&Rational::integer(3).try_pow(119).unwrap()).unwrap();
        assert_eq!(back, Rational::integer(3));
        assert_eq!((&big - &big), Rational::zero());
    }
}
