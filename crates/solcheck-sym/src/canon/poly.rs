//! Sparse polynomials over atoms and their quotients.
//!
//! A [`Poly`] is a sum of rational multiples of monomials; a monomial maps
//! atoms to rational exponents. [`Frac`] is a quotient of two polynomials
//! kept in normal form: rewrite rules applied, no negative exponents, no
//! common monomial factor, and a denominator whose leading coefficient is 1.

use std::collections::{BTreeMap, BTreeSet};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::{Result, SymError};
use crate::expr::Func;
use crate::rational::Rational;

/// Indivisible factor of a monomial.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Atom {
    /// Free symbol.
    Sym(String),
    /// Imaginary unit, exponent reduced to 1.
    Imag,
    /// π.
    Pi,
    /// Integer base of a radical, exponent kept in `[0, 1)`.
    Prime(BigInt),
    /// Function of a canonical argument.
    Func(Func, Frac),
    /// Non-monomial polynomial raised to a fractional power.
    Radical(Poly),
    /// Undefined function application.
    Apply(String, Vec<Frac>),
}

impl Atom {
    /// Whether the atom mentions the symbol `name`.
    pub fn depends_on(&self, name: &str) -> bool {
        match self {
            Atom::Sym(s) => s == name,
            Atom::Imag | Atom::Pi | Atom::Prime(_) => false,
            Atom::Func(_, arg) => arg.depends_on(name),
            Atom::Radical(p) => p.depends_on(name),
            Atom::Apply(_, args) => args.iter().any(|a| a.depends_on(name)),
        }
    }

    /// Whether the atom mentions any symbol or undefined function.
    pub fn is_symbolic(&self) -> bool {
        match self {
            Atom::Sym(_) | Atom::Apply(..) => true,
            Atom::Imag | Atom::Pi | Atom::Prime(_) => false,
            Atom::Func(_, arg) => arg.is_symbolic(),
            Atom::Radical(p) => p.is_symbolic(),
        }
    }

    fn exp_of(arg: Frac) -> Atom {
        Atom::Func(Func::Exp, arg)
    }
}

/// Product of atoms with rational exponents.
pub type Monomial = BTreeMap<Atom, Rational>;

/// Sum of monomials with non-zero rational coefficients.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Poly {
    terms: BTreeMap<Monomial, Rational>,
}

fn mono_mul(a: &Monomial, b: &Monomial) -> Result<Monomial> {
    let mut out = a.clone();
    for (atom, exp) in b {
        let sum = out.get(atom).map_or_else(|| exp.clone(), |cur| cur + exp);
        if sum.is_zero() {
            out.remove(atom);
        } else {
            out.insert(atom.clone(), sum);
        }
    }
    Ok(out)
}

impl Poly {
    /// Zero polynomial.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Constant polynomial.
    pub fn constant(value: Rational) -> Self {
        let mut p = Self::zero();
        p.push_term(Monomial::new(), value);
        p
    }

    /// One.
    pub fn one() -> Self {
        Self::constant(Rational::one())
    }

    /// Single atom raised to `exp`.
    pub fn atom_pow(atom: Atom, exp: Rational) -> Self {
        let mut mono = Monomial::new();
        if !exp.is_zero() {
            mono.insert(atom, exp);
        }
        Self::term(mono, Rational::one())
    }

    /// Single atom.
    pub fn atom(atom: Atom) -> Self {
        Self::atom_pow(atom, Rational::one())
    }

    /// Single term.
    pub fn term(mono: Monomial, coeff: Rational) -> Self {
        let mut p = Self::zero();
        p.push_term(mono, coeff);
        p
    }

    fn push_term(&mut self, mono: Monomial, coeff: Rational) {
        if !coeff.is_zero() {
            self.terms.insert(mono, coeff);
        }
    }

    fn accumulate(&mut self, mono: Monomial, coeff: Rational) -> Result<()> {
        let sum = match self.terms.get(&mono) {
            Some(cur) => cur + &coeff,
            None => coeff,
        };
        if sum.is_zero() {
            self.terms.remove(&mono);
        } else {
            self.terms.insert(mono, sum);
        }
        Ok(())
    }

    /// Terms in monomial order.
    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &Rational)> {
        self.terms.iter()
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the polynomial is zero.
    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Constant value, if the polynomial has no atoms.
    pub fn as_constant(&self) -> Option<Rational> {
        match self.terms.len() {
            0 => Some(Rational::zero()),
            1 => self
                .terms
                .iter()
                .next()
                .filter(|(m, _)| m.is_empty())
                .map(|(_, c)| c.clone()),
            _ => None,
        }
    }

    /// The only term, if there is exactly one.
    pub fn as_single_term(&self) -> Option<(&Monomial, Rational)> {
        if self.terms.len() == 1 {
            self.terms.iter().next().map(|(m, c)| (m, c.clone()))
        } else {
            None
        }
    }

    /// Coefficient of the first term in monomial order.
    pub fn leading_coefficient(&self) -> Rational {
        self.terms.values().next().cloned().unwrap_or_else(Rational::zero)
    }

    /// Every atom appearing in some term.
    pub fn atoms(&self) -> BTreeSet<Atom> {
        self.terms.keys().flat_map(|m| m.keys().cloned()).collect()
    }

    /// Whether the symbol `name` appears.
    pub fn depends_on(&self, name: &str) -> bool {
        self.terms.keys().any(|m| m.keys().any(|a| a.depends_on(name)))
    }

    /// Whether any symbol or undefined function appears.
    pub fn is_symbolic(&self) -> bool {
        self.terms.keys().any(|m| m.keys().any(Atom::is_symbolic))
    }

    /// Sum.
    pub fn add(&self, other: &Poly) -> Result<Poly> {
        let mut out = self.clone();
        for (m, c) in &other.terms {
            out.accumulate(m.clone(), c.clone())?;
        }
        Ok(out)
    }

    /// Multiplication by a rational.
    pub fn scale(&self, k: &Rational) -> Result<Poly> {
        let mut out = Poly::zero();
        for (m, c) in &self.terms {
            out.push_term(m.clone(), c * k);
        }
        Ok(out)
    }

    /// Negation.
    pub fn neg(&self) -> Poly {
        Poly {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), c.neg())).collect(),
        }
    }

    /// Product, without rewriting.
    pub fn mul(&self, other: &Poly) -> Result<Poly> {
        let mut out = Poly::zero();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &other.terms {
                out.accumulate(mono_mul(ma, mb)?, ca * cb)?;
            }
        }
        Ok(out)
    }

    /// Non-negative integer power.
    pub fn pow_u(&self, exp: u32) -> Result<Poly> {
        let mut out = Poly::one();
        for _ in 0..exp {
            out = normalize(&out.mul(self)?)?;
        }
        Ok(out)
    }

    /// Replaces the imaginary unit by its negation.
    pub fn conjugate(&self) -> Poly {
        Poly {
            terms: self
                .terms
                .iter()
                .map(|(m, c)| {
                    let odd = m.get(&Atom::Imag).is_some_and(|e| e.is_integer() && e.numer_is_odd());
                    (m.clone(), if odd { c.neg() } else { c.clone() })
                })
                .collect(),
        }
    }

    /// Splits into terms without and with the imaginary unit (the latter with `I` removed).
    pub fn split_imaginary(&self) -> (Poly, Poly) {
        let mut re = Poly::zero();
        let mut im = Poly::zero();
        for (m, c) in &self.terms {
            if m.contains_key(&Atom::Imag) {
                let mut rest = m.clone();
                rest.remove(&Atom::Imag);
                im.push_term(rest, c.clone());
            } else {
                re.push_term(m.clone(), c.clone());
            }
        }
        (re, im)
    }

    /// Coefficients of `var` as a polynomial in that variable, or `None` when
    /// `var` appears other than with a non-negative integer exponent.
    pub fn coefficients_in(&self, var: &str) -> Option<BTreeMap<u32, Poly>> {
        let key = Atom::Sym(var.to_string());
        let mut out: BTreeMap<u32, Poly> = BTreeMap::new();
        for (m, c) in &self.terms {
            let mut rest = m.clone();
            let degree = match rest.remove(&key) {
                Some(e) if e.is_integer() && !e.is_negative() => e.numer().to_u32()?,
                Some(_) => return None,
                None => 0,
            };
            if rest.keys().any(|a| a.depends_on(var)) {
                return None;
            }
            out.entry(degree).or_default().push_term(rest, c.clone());
        }
        Some(out)
    }
}

/// Trial-division bound; any cofactor left above it is kept as one base.
const TRIAL_DIVISION_LIMIT: u32 = 100_000;

fn factorize(n: &BigInt) -> Vec<(BigInt, u32)> {
    let mut n = n.abs();
    let mut out = Vec::new();
    let mut p: u32 = 2;
    while p <= TRIAL_DIVISION_LIMIT {
        let big_p = BigInt::from(p);
        if &big_p * &big_p > n {
            break;
        }
        let mut k = 0;
        loop {
            let (q, r) = n.div_rem(&big_p);
            if !r.is_zero() {
                break;
            }
            n = q;
            k += 1;
        }
        if k > 0 {
            out.push((big_p, k));
        }
        p += if p == 2 { 1 } else { 2 };
    }
    if n > BigInt::one() {
        out.push((n, 1));
    }
    out
}

fn division_by_zero() -> SymError {
    SymError::Undefined("division by zero".to_string())
}

/// `c ** r` for rational `c` and `r`, expressed with radical atoms.
pub fn rational_power(c: &Rational, r: &Rational) -> Result<Poly> {
    if r.is_integer() {
        let k = r.to_i64().ok_or(SymError::Overflow)?;
        if c.is_zero() && k < 0 {
            return Err(division_by_zero());
        }
        return Ok(Poly::constant(c.try_pow(k)?));
    }
    if c.is_zero() {
        return if r.is_negative() {
            Err(division_by_zero())
        } else {
            Ok(Poly::zero())
        };
    }
    let mut out = Poly::one();
    if c.is_negative() {
        if r.denom() == &BigInt::from(2) {
            out = Poly::atom_pow(Atom::Imag, Rational::integer(r.numer().clone()));
        } else if r.numer_is_odd() {
            out = Poly::constant(Rational::minus_one());
        }
    }
    let mut mono = Monomial::new();
    for (p, k) in factorize(c.numer()) {
        mono.insert(Atom::Prime(p), r * &Rational::integer(k));
    }
    for (p, k) in factorize(c.denom()) {
        mono.insert(Atom::Prime(p), r * &Rational::integer(-i64::from(k)));
    }
    normalize(&out.mul(&Poly::term(mono, Rational::one()))?)
}

/// `p ** r`; may produce negative exponents.
pub fn poly_power(p: &Poly, r: &Rational) -> Result<Poly> {
    if r.is_zero() {
        return Ok(Poly::one());
    }
    if p.is_zero() {
        return if r.is_negative() {
            Err(division_by_zero())
        } else {
            Ok(Poly::zero())
        };
    }
    if r.is_integer() && !r.is_negative() {
        let k = r
            .numer()
            .to_u32()
            .filter(|k| *k <= 512)
            .ok_or_else(|| SymError::Unsupported("power too large".into()))?;
        return p.pow_u(k);
    }
    if let Some((mono, c)) = p.as_single_term() {
        let mut raised = Monomial::new();
        for (atom, e) in mono {
            raised.insert(atom.clone(), e * r);
        }
        return normalize(&rational_power(&c, r)?.mul(&Poly::term(raised, Rational::one()))?);
    }
    let content = p.leading_coefficient().abs();
    let inner = p.scale(&content.recip()?)?;
    normalize(&rational_power(&content, r)?.mul(&Poly::atom_pow(Atom::Radical(inner), r.clone()))?)
}

fn exp_poly(arg: &Frac) -> Result<Poly> {
    super::functions::exp_poly(arg)
}

/// Rewrites one term, or returns `None` when it is already normal.
fn rewrite_term(mono: &Monomial, coeff: &Rational) -> Result<Option<Poly>> {
    let exp_atoms: Vec<(&Atom, &Rational)> = mono
        .iter()
        .filter(|(a, _)| matches!(a, Atom::Func(Func::Exp, _)))
        .collect();
    if exp_atoms.len() > 1 || exp_atoms.iter().any(|(_, e)| !e.is_one()) {
        let mut rest = mono.clone();
        let mut arg = Frac::zero();
        for (atom, e) in exp_atoms {
            rest.remove(atom);
            if let Atom::Func(_, u) = atom {
                arg = arg.add(&u.mul(&Frac::constant(e.clone()))?)?;
            }
        }
        return Ok(Some(Poly::term(rest, coeff.clone()).mul(&exp_poly(&arg)?)?));
    }
    for (atom, e) in mono {
        let mut rest = mono.clone();
        rest.remove(atom);
        let base = Poly::term(rest, coeff.clone());
        match atom {
            Atom::Imag if e.is_integer() && !e.is_one() => {
                let k = e.numer().mod_floor(&BigInt::from(4)).to_u8().unwrap_or(0);
                let sign = if k >= 2 { Rational::minus_one() } else { Rational::one() };
                let unit = if k % 2 == 1 { Poly::atom(Atom::Imag) } else { Poly::one() };
                return Ok(Some(base.scale(&sign)?.mul(&unit)?));
            }
            Atom::Prime(p) if e.is_negative() || *e >= Rational::one() => {
                let k = e.floor();
                let whole = Rational::integer(p.clone()).try_pow(k.to_i64().ok_or(SymError::Overflow)?)?;
                let frac = e - &k;
                return Ok(Some(base.scale(&whole)?.mul(&Poly::atom_pow(atom.clone(), frac))?));
            }
            Atom::Radical(inner) if *e >= Rational::one() => {
                let k = e.floor();
                let frac = e - &k;
                let times = k.numer().to_u32().ok_or(SymError::Overflow)?;
                let expanded = inner.pow_u(times)?;
                return Ok(Some(base.mul(&expanded)?.mul(&Poly::atom_pow(atom.clone(), frac))?));
            }
            Atom::Radical(inner) if inner.as_single_term().is_some() || inner.as_constant().is_some() => {
                return Ok(Some(base.mul(&poly_power(inner, e)?)?));
            }
            Atom::Func(Func::Cos, arg) if e.is_integer() && *e >= Rational::integer(2) => {
                let k = e.numer().to_u32().ok_or(SymError::Overflow)?;
                let sin_sq = Poly::atom_pow(Atom::Func(Func::Sin, arg.clone()), Rational::integer(2));
                let one_minus = Poly::one().add(&sin_sq.neg())?;
                let mut out = base.mul(&one_minus.pow_u(k / 2)?)?;
                if k % 2 == 1 {
                    out = out.mul(&Poly::atom(atom.clone()))?;
                }
                return Ok(Some(out));
            }
            _ => {}
        }
    }
    Ok(None)
}

/// Applies the rewrite rules until no term changes.
pub fn normalize(poly: &Poly) -> Result<Poly> {
    let mut current = poly.clone();
    for _ in 0..64 {
        let mut changed = false;
        let mut next = Poly::zero();
        for (m, c) in &current.terms {
            match rewrite_term(m, c)? {
                Some(p) => {
                    changed = true;
                    next = next.add(&p)?;
                }
                None => next.accumulate(m.clone(), c.clone())?,
            }
        }
        current = next;
        if !changed {
            return Ok(current);
        }
    }
    Err(SymError::Unsupported("rewriting did not terminate".to_string()))
}

/// Quotient of polynomials in normal form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Frac {
    num: Poly,
    den: Poly,
}

fn min_exponents(polys: &[&Poly]) -> BTreeMap<Atom, Rational> {
    let mut all: BTreeSet<Atom> = BTreeSet::new();
    for p in polys {
        all.extend(p.atoms());
    }
    let mut out = BTreeMap::new();
    for atom in all {
        let mut min: Option<Rational> = None;
        for p in polys {
            for m in p.terms.keys() {
                let e = m.get(&atom).cloned().unwrap_or_else(Rational::zero);
                min = Some(match min {
                    Some(cur) if cur <= e => cur,
                    _ => e,
                });
            }
        }
        if let Some(min) = min {
            out.insert(atom, min);
        }
    }
    out
}

impl Frac {
    /// Builds and normalizes `num / den`.
    pub fn new(num: Poly, den: Poly) -> Result<Self> {
        let mut num = normalize(&num)?;
        let mut den = normalize(&den)?;
        if den.is_zero() {
            return Err(SymError::Undefined("division by zero".to_string()));
        }
        if num.is_zero() {
            return Ok(Self::zero());
        }
        for _ in 0..16 {
            let negatives: Monomial = min_exponents(&[&num, &den])
                .into_iter()
                .filter(|(_, e)| e.is_negative())
                .map(|(a, e)| (a, e.neg()))
                .collect();
            if negatives.is_empty() {
                break;
            }
            let lift = Poly::term(negatives, Rational::one());
            num = normalize(&num.mul(&lift)?)?;
            den = normalize(&den.mul(&lift)?)?;
        }
        let common: Monomial = min_exponents(&[&num, &den])
            .into_iter()
            .filter(|(_, e)| !e.is_negative() && !e.is_zero())
            .map(|(a, e)| (a, e.neg()))
            .collect();
        if !common.is_empty() {
            let cut = Poly::term(common, Rational::one());
            num = num.mul(&cut)?;
            den = den.mul(&cut)?;
        }
        if den.is_zero() {
            return Err(SymError::Undefined("division by zero".to_string()));
        }
        let lead = den.leading_coefficient();
        let scale = lead.recip()?;
        num = num.scale(&scale)?;
        den = den.scale(&scale)?;
        if num.is_zero() {
            return Ok(Self::zero());
        }
        Ok(Self { num, den })
    }

    /// Polynomial with denominator one.
    pub fn from_poly(p: Poly) -> Result<Self> {
        Self::new(p, Poly::one())
    }

    /// Zero.
    pub fn zero() -> Self {
        Self {
            num: Poly::zero(),
            den: Poly::one(),
        }
    }

    /// One.
    pub fn one() -> Self {
        Self::constant(Rational::one())
    }

    /// Rational constant.
    pub fn constant(value: Rational) -> Self {
        Self {
            num: Poly::constant(value),
            den: Poly::one(),
        }
    }

    /// Numerator.
    pub fn num(&self) -> &Poly {
        &self.num
    }

    /// Denominator.
    pub fn den(&self) -> &Poly {
        &self.den
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    /// Rational value, if constant and rational.
    pub fn as_rational(&self) -> Option<Rational> {
        match (self.num.as_constant(), self.den.as_constant()) {
            (Some(n), Some(d)) if !d.is_zero() => n.try_div(&d).ok(),
            _ => None,
        }
    }

    /// Whether the value mentions `name`.
    pub fn depends_on(&self, name: &str) -> bool {
        self.num.depends_on(name) || self.den.depends_on(name)
    }

    /// Whether any symbol or undefined function appears.
    pub fn is_symbolic(&self) -> bool {
        self.num.is_symbolic() || self.den.is_symbolic()
    }

    /// Whether the numerator's leading coefficient is negative.
    pub fn is_negative_leading(&self) -> bool {
        self.num.leading_coefficient().is_negative()
    }

    /// Single atom with coefficient one and exponent one, if that is the whole value.
    pub fn as_atom(&self) -> Option<&Atom> {
        if self.den.as_constant() != Some(Rational::one()) {
            return None;
        }
        let (mono, c) = self.num.as_single_term()?;
        if !c.is_one() || mono.len() != 1 {
            return None;
        }
        mono.iter().next().filter(|(_, e)| e.is_one()).map(|(a, _)| a)
    }

    /// Sum.
    pub fn add(&self, other: &Frac) -> Result<Frac> {
        if self.den == other.den {
            return Frac::new(self.num.add(&other.num)?, self.den.clone());
        }
        let num = self.num.mul(&other.den)?.add(&other.num.mul(&self.den)?)?;
        Frac::new(num, self.den.mul(&other.den)?)
    }

    /// Difference.
    pub fn sub(&self, other: &Frac) -> Result<Frac> {
        self.add(&other.neg())
    }

    /// Negation.
    pub fn neg(&self) -> Frac {
        Frac {
            num: self.num.neg(),
            den: self.den.clone(),
        }
    }

    /// Product.
    pub fn mul(&self, other: &Frac) -> Result<Frac> {
        Frac::new(self.num.mul(&other.num)?, self.den.mul(&other.den)?)
    }

    /// Quotient.
    pub fn div(&self, other: &Frac) -> Result<Frac> {
        if other.is_zero() {
            return Err(SymError::Undefined("division by zero".to_string()));
        }
        Frac::new(self.num.mul(&other.den)?, self.den.mul(&other.num)?)
    }

    /// Rational power.
    pub fn pow_rational(&self, r: &Rational) -> Result<Frac> {
        if r.is_zero() {
            return Ok(Frac::one());
        }
        if r.is_negative() {
            if self.is_zero() {
                return Err(SymError::Undefined("division by zero".to_string()));
            }
            let flipped = Frac {
                num: self.den.clone(),
                den: self.num.clone(),
            };
            return flipped.pow_rational(&r.neg());
        }
        Frac::new(poly_power(&self.num, r)?, poly_power(&self.den, r)?)
    }

    /// Single polynomial equal to the value, using negative exponents for the denominator.
    pub fn to_poly(&self) -> Result<Poly> {
        normalize(&self.num.mul(&poly_power(&self.den, &Rational::minus_one())?)?)
    }

    /// Value with every `I` replaced by `-I`.
    pub fn conjugate(&self) -> Result<Frac> {
        Frac::new(self.num.conjugate(), self.den.conjugate())
    }

    /// Real and imaginary parts, treating every atom other than `I` as real.
    pub fn split_complex(&self) -> Result<(Frac, Frac)> {
        let (num, den) = if self.den.atoms().contains(&Atom::Imag) {
            let conj = self.den.conjugate();
            (
                normalize(&self.num.mul(&conj)?)?,
                normalize(&self.den.mul(&conj)?)?,
            )
        } else {
            (self.num.clone(), self.den.clone())
        };
        let (re, im) = num.split_imaginary();
        Ok((Frac::new(re, den.clone())?, Frac::new(im, den)?))
    }

    /// `exp(self)` as an atom, bypassing special values.
    pub(crate) fn exp_atom(self) -> Poly {
        Poly::atom(Atom::exp_of(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Poly {
        Poly::atom(Atom::Sym("x".into()))
    }

    #[test]
    fn radical_integer_parts_are_extracted() {
        let eight_sqrt = rational_power(&Rational::integer(8), &Rational::half()).unwrap();
        let expected = Poly::atom_pow(Atom::Prime(BigInt::from(2)), Rational::half())
            .scale(&Rational::integer(2))
            .unwrap();
        assert_eq!(eight_sqrt, expected);
    }

    #[test]
    fn common_factors_cancel() {
        let num = x().mul(&x()).unwrap();
        let f = Frac::new(num, x()).unwrap();
        assert_eq!(f, Frac::from_poly(x()).unwrap());
    }

    #[test]
    fn imaginary_unit_squares_to_minus_one() {
        let i = Poly::atom(Atom::Imag);
        let sq = normalize(&i.mul(&i).unwrap()).unwrap();
        assert_eq!(sq.as_constant(), Some(Rational::minus_one()));
    }
}
