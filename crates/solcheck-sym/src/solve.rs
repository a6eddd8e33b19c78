//! Equation solving.
//!
//! Univariate polynomials are solved exactly where possible: zero roots are
//! factored out, rational roots found by the rational root theorem, and the
//! remaining quadratic handled by the quadratic formula. Higher-degree
//! remainders fall back to companion-matrix eigenvalues, and transcendental
//! equations to a sign-change scan. Systems are solved by exact Gauss-Jordan
//! elimination when linear, by substitution when one equation isolates a
//! variable, and by damped Gauss-Newton iteration otherwise.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use num_bigint::BigInt;
use num_complex::Complex;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive};
use tracing::debug;

use crate::calculus::differentiate;
use crate::canon::{canonical_scalar, frac_to_expr, poly_to_expr, simplify, Atom, Frac, Poly};
use crate::error::{Result, SymError};
use crate::eval::{evaluate, evaluate_constant, evaluate_real, Complex64};
use crate::expr::{Constant, Expr, Func};
use crate::rational::Rational;
use crate::subs::substitute;

/// One solution value.
#[derive(Debug, Clone, PartialEq)]
pub enum Root {
    /// Exact closed form.
    Exact(Expr),
    /// Floating-point approximation.
    Approx(Complex64),
}

impl Root {
    /// Numeric value.
    pub fn value(&self) -> Result<Complex64> {
        match self {
            Root::Exact(e) => evaluate(e, &BTreeMap::new()),
            Root::Approx(z) => Ok(*z),
        }
    }

    /// Whether the value is real within `tol`.
    pub fn is_real(&self, tol: f64) -> bool {
        self.value().is_ok_and(|z| z.im.abs() <= tol)
    }

    /// Expression form; approximations become nearby rationals.
    pub fn to_expr(&self) -> Expr {
        match self {
            Root::Exact(e) => e.clone(),
            Root::Approx(z) => {
                let re = Rational::approximate(z.re, 1_000_000_000_000).unwrap_or_else(|_| Rational::zero());
                let im = Rational::approximate(z.im, 1_000_000_000_000).unwrap_or_else(|_| Rational::zero());
                if im.is_zero() {
                    Expr::Num(re)
                } else {
                    Expr::add(Expr::Num(re), Expr::mul(Expr::Num(im), Expr::Const(Constant::I)))
                }
            }
        }
    }
}

/// Knobs for [`solve_univariate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveOptions {
    /// Keep only real roots.
    pub real_only: bool,
    /// Interval scanned for transcendental equations.
    pub scan_interval: (f64, f64),
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            real_only: false,
            scan_interval: (-10.0, 10.0),
        }
    }
}

fn residual(expr: &Expr) -> Expr {
    match expr {
        Expr::Eq(a, b) => Expr::sub((**a).clone(), (**b).clone()),
        other => other.clone(),
    }
}

/// Roots of `expr` (or of `lhs - rhs` for an equality) in `var`.
pub fn solve_univariate(expr: &Expr, var: &str, opts: &SolveOptions) -> Result<Vec<Root>> {
    let frac = canonical_scalar(&residual(expr))?;
    if frac.is_zero() {
        return Ok(Vec::new());
    }
    let mut roots = poly_roots(frac.num(), var, opts)?;
    let den = poly_to_expr(frac.den());
    if frac.den().depends_on(var) {
        roots.retain(|r| {
            let at = BTreeMap::from([(var.to_string(), r.value().unwrap_or(Complex::new(f64::NAN, 0.0)))]);
            evaluate(&den, &at).is_ok_and(|d| d.norm() > 1e-9)
        });
    }
    if opts.real_only {
        roots.retain(|r| r.is_real(1e-9));
    }
    Ok(dedupe(roots))
}

fn dedupe(roots: Vec<Root>) -> Vec<Root> {
    let mut out: Vec<(Root, Option<Complex64>)> = Vec::new();
    for root in roots {
        let value = root.value().ok();
        let duplicate = out.iter().any(|(r, v)| match (v, value) {
            (Some(a), Some(b)) => (a - b).norm() <= 1e-9 * a.norm().max(1.0),
            _ => *r == root,
        });
        if !duplicate {
            out.push((root, value));
        }
    }
    out.into_iter().map(|(r, _)| r).collect()
}

fn exact(frac: &Frac) -> Root {
    Root::Exact(frac_to_expr(frac))
}

fn poly_roots(p: &Poly, var: &str, opts: &SolveOptions) -> Result<Vec<Root>> {
    if !p.depends_on(var) {
        return Ok(Vec::new());
    }
    if let Some(coeffs) = p.coefficients_in(var) {
        return polynomial_roots(&coeffs);
    }
    let mut roots = Vec::new();
    let mut remaining = p.clone();
    let shared = common_atoms(p, var);
    for (atom, exp) in &shared {
        match atom {
            Atom::Sym(name) if name == var => roots.push(Root::Exact(Expr::int(0))),
            Atom::Func(Func::Exp, _) => {}
            Atom::Func(Func::Log, u) => {
                let shifted = Expr::sub(frac_to_expr(u), Expr::int(1));
                roots.extend(solve_univariate(&shifted, var, opts)?);
            }
            Atom::Radical(inner) => roots.extend(poly_roots(inner, var, opts)?),
            _ => continue,
        }
        remaining = divide_atom(&remaining, atom, exp)?;
    }
    if remaining.depends_on(var) {
        if let Some(coeffs) = remaining.coefficients_in(var) {
            roots.extend(polynomial_roots(&coeffs)?);
        } else {
            roots.extend(scan_roots(&poly_to_expr(&remaining), var, opts.scan_interval));
        }
    }
    Ok(roots)
}

fn common_atoms(p: &Poly, var: &str) -> Vec<(Atom, Rational)> {
    let mut out = Vec::new();
    for atom in p.atoms() {
        if !atom.depends_on(var) {
            continue;
        }
        let min = p
            .terms()
            .map(|(m, _)| m.get(&atom).cloned().unwrap_or_else(Rational::zero))
            .min()
            .unwrap_or_else(Rational::zero);
        if !min.is_negative() && !min.is_zero() {
            out.push((atom, min));
        }
    }
    out
}

fn divide_atom(p: &Poly, atom: &Atom, exp: &Rational) -> Result<Poly> {
    p.mul(&Poly::atom_pow(atom.clone(), exp.neg()))
}

fn polynomial_roots(coeffs: &BTreeMap<u32, Poly>) -> Result<Vec<Root>> {
    let degree = coeffs.keys().next_back().copied().unwrap_or(0);
    let rational: Option<Vec<Rational>> = (0..=degree)
        .map(|k| coeffs.get(&k).map_or(Some(Rational::zero()), Poly::as_constant))
        .collect();
    if let Some(a) = rational {
        return rational_polynomial_roots(a);
    }
    let frac = |k: u32| -> Result<Frac> {
        coeffs.get(&k).cloned().map_or(Ok(Frac::zero()), Frac::from_poly)
    };
    match degree {
        1 => Ok(vec![exact(&frac(0)?.neg().div(&frac(1)?)?)]),
        2 => quadratic(&frac(2)?, &frac(1)?, &frac(0)?),
        _ => {
            let mut values = Vec::with_capacity(degree as usize + 1);
            for k in 0..=degree {
                let z = evaluate_constant(&frac(k)?)?;
                if z.im.abs() > 1e-12 {
                    return Err(SymError::Unsupported("complex polynomial coefficients".into()));
                }
                values.push(z.re);
            }
            companion_roots(&values)
        }
    }
}

fn horner(a: &[Rational], x: &Rational) -> Rational {
    a.iter().rev().fold(Rational::zero(), |acc, c| acc * x + c)
}

fn deflate(a: &[Rational], x: &Rational) -> Vec<Rational> {
    let n = a.len() - 1;
    let mut out = vec![Rational::zero(); n];
    let mut carry = Rational::zero();
    for k in (1..=n).rev() {
        carry = carry * x + &a[k];
        out[k - 1] = carry.clone();
    }
    out
}

/// Largest constant or leading coefficient searched by the rational root theorem.
const MAX_ROOT_SEARCH: i128 = 1_000_000_000;

fn divisors(n: i128) -> Vec<i128> {
    let n = n.abs();
    let mut out = Vec::new();
    let mut d = 1;
    while d * d <= n {
        if n % d == 0 {
            out.push(d);
            if d * d != n {
                out.push(n / d);
            }
        }
        d += 1;
    }
    out
}

fn rational_polynomial_roots(mut a: Vec<Rational>) -> Result<Vec<Root>> {
    while a.last().is_some_and(Rational::is_zero) {
        a.pop();
    }
    let mut roots = Vec::new();
    while a.len() > 1 && a[0].is_zero() {
        roots.push(Root::Exact(Expr::int(0)));
        a.remove(0);
    }
    if a.len() > 3 {
        let lcm = a.iter().fold(BigInt::one(), |acc, r| acc.lcm(r.denom()));
        let scaled = |r: &Rational| (r.numer() * (&lcm / r.denom())).abs().to_i128();
        let bounds = a.first().and_then(scaled).zip(a.last().and_then(scaled));
        if let Some((first, last)) = bounds.filter(|(f, l)| *f <= MAX_ROOT_SEARCH && *l <= MAX_ROOT_SEARCH) {
            'search: loop {
                if a.len() <= 3 {
                    break;
                }
                for p in divisors(first) {
                    for q in divisors(last) {
                        for sign in [1, -1] {
                            let candidate = Rational::new(sign * p, q)?;
                            if horner(&a, &candidate).is_zero() {
                                a = deflate(&a, &candidate);
                                roots.push(Root::Exact(Expr::Num(candidate)));
                                continue 'search;
                            }
                        }
                    }
                }
                break;
            }
        }
    }
    let frac = |k: usize| Frac::constant(a.get(k).cloned().unwrap_or_else(Rational::zero));
    match a.len() {
        0 | 1 => {}
        2 => roots.push(exact(&frac(0).neg().div(&frac(1))?)),
        3 => roots.extend(quadratic(&frac(2), &frac(1), &frac(0))?),
        _ => roots.extend(companion_roots(&a.iter().map(Rational::to_f64).collect::<Vec<_>>())?),
    }
    Ok(roots)
}

fn quadratic(a: &Frac, b: &Frac, c: &Frac) -> Result<Vec<Root>> {
    let four = Frac::constant(Rational::integer(4));
    let disc = b.mul(b)?.sub(&four.mul(a)?.mul(c)?)?;
    let root = disc.pow_rational(&Rational::half())?;
    let two_a = Frac::constant(Rational::integer(2)).mul(a)?;
    let minus_b = b.neg();
    let plus = minus_b.add(&root)?.div(&two_a)?;
    let minus = minus_b.sub(&root)?.div(&two_a)?;
    Ok(vec![exact(&minus), exact(&plus)])
}

/// Roots of `sum a[k] x^k` from the eigenvalues of the companion matrix.
fn companion_roots(a: &[f64]) -> Result<Vec<Root>> {
    let n = a.len() - 1;
    let lead = a[n];
    if lead == 0.0 {
        return Err(SymError::Undefined("zero leading coefficient".into()));
    }
    let companion = DMatrix::from_fn(n, n, |i, j| {
        if j == n - 1 {
            -a[i] / lead
        } else if i == j + 1 {
            1.0
        } else {
            0.0
        }
    });
    let eigen = companion.complex_eigenvalues();
    Ok(eigen.iter().map(|z| Root::Approx(polish(a, *z))).collect())
}

fn polish(a: &[f64], mut z: Complex64) -> Complex64 {
    for _ in 0..8 {
        let mut f = Complex::new(0.0, 0.0);
        let mut df = Complex::new(0.0, 0.0);
        for &c in a.iter().rev() {
            df = df * z + f;
            f = f * z + Complex::new(c, 0.0);
        }
        if df.norm() == 0.0 {
            break;
        }
        z -= f / df;
    }
    if z.im.abs() < 1e-12 {
        z.im = 0.0;
    }
    z
}

fn scan_roots(expr: &Expr, var: &str, (low, high): (f64, f64)) -> Vec<Root> {
    const STEPS: usize = 4000;
    let f = |x: f64| evaluate_real(expr, &BTreeMap::from([(var.to_string(), x)])).ok();
    let mut roots = Vec::new();
    let width = (high - low) / STEPS as f64;
    let mut prev = (low, f(low));
    for k in 1..=STEPS {
        let x = low + width * k as f64;
        let fx = f(x);
        if let (Some(a), Some(b)) = (prev.1, fx) {
            if a == 0.0 {
                roots.push(Root::Approx(Complex::new(prev.0, 0.0)));
            } else if a.signum() != b.signum() && b != 0.0 {
                if let Some(r) = bisect(&f, prev.0, x) {
                    roots.push(Root::Approx(Complex::new(r, 0.0)));
                }
            }
        }
        prev = (x, fx);
    }
    roots
}

fn bisect(f: &dyn Fn(f64) -> Option<f64>, mut lo: f64, mut hi: f64) -> Option<f64> {
    let mut f_lo = f(lo)?;
    for _ in 0..100 {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid)?;
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    let root = 0.5 * (lo + hi);
    (f(root)?.abs() < 1e-6).then_some(root)
}

/// One assignment of values to variables.
pub type Solution = BTreeMap<String, Root>;

/// Solves a system of equations (or expressions set to zero) for `vars`.
///
/// Variables left free by an underdetermined linear system are absent from
/// the solution mapping. An inconsistent system yields no solutions.
pub fn solve_system(equations: &[Expr], vars: &[String]) -> Result<Vec<Solution>> {
    let mut numerators = Vec::new();
    for eq in equations {
        let frac = canonical_scalar(&residual(eq))?;
        if !frac.is_zero() {
            numerators.push(frac.num().clone());
        }
    }
    if let Some(solutions) = linear_solve(&numerators, vars)? {
        return Ok(solutions);
    }
    let exprs: Vec<Expr> = numerators.iter().map(poly_to_expr).collect();
    match eliminate(exprs.clone(), vars.to_vec(), 0) {
        Ok(solutions) => Ok(solutions),
        Err(err) => {
            debug!(%err, "elimination failed, falling back to newton iteration");
            newton_system(&exprs, vars)
        }
    }
}

fn linear_row(p: &Poly, vars: &[String]) -> Result<Option<(Vec<Frac>, Frac)>> {
    let mut coeffs = vec![Poly::zero(); vars.len()];
    let mut constant = Poly::zero();
    for (mono, c) in p.terms() {
        let hits: Vec<usize> = vars
            .iter()
            .enumerate()
            .filter(|(_, v)| mono.keys().any(|a| a.depends_on(v)))
            .map(|(i, _)| i)
            .collect();
        match hits.as_slice() {
            [] => constant = constant.add(&Poly::term(mono.clone(), c.clone()))?,
            [i] => {
                let key = Atom::Sym(vars[*i].clone());
                if !mono.get(&key).is_some_and(Rational::is_one) {
                    return Ok(None);
                }
                let mut rest = mono.clone();
                rest.remove(&key);
                if rest.keys().any(|a| a.depends_on(&vars[*i])) {
                    return Ok(None);
                }
                coeffs[*i] = coeffs[*i].add(&Poly::term(rest, c.clone()))?;
            }
            _ => return Ok(None),
        }
    }
    let coeffs = coeffs.into_iter().map(Frac::from_poly).collect::<Result<Vec<_>>>()?;
    Ok(Some((coeffs, Frac::from_poly(constant.neg())?)))
}

fn linear_solve(numerators: &[Poly], vars: &[String]) -> Result<Option<Vec<Solution>>> {
    let mut rows = Vec::with_capacity(numerators.len());
    for p in numerators {
        match linear_row(p, vars)? {
            Some(row) => rows.push(row),
            None => return Ok(None),
        }
    }
    let n = vars.len();
    let mut pivots: Vec<(usize, usize)> = Vec::new();
    let mut r = 0;
    for col in 0..n {
        let Some(pivot) = (r..rows.len()).find(|&i| !rows[i].0[col].is_zero()) else {
            continue;
        };
        rows.swap(pivot, r);
        let p = rows[r].0[col].clone();
        for k in 0..n {
            rows[r].0[k] = rows[r].0[k].div(&p)?;
        }
        rows[r].1 = rows[r].1.div(&p)?;
        for i in 0..rows.len() {
            if i == r || rows[i].0[col].is_zero() {
                continue;
            }
            let factor = rows[i].0[col].clone();
            for k in 0..n {
                let delta = factor.mul(&rows[r].0[k])?;
                rows[i].0[k] = rows[i].0[k].sub(&delta)?;
            }
            let delta = factor.mul(&rows[r].1)?;
            rows[i].1 = rows[i].1.sub(&delta)?;
        }
        pivots.push((r, col));
        r += 1;
    }
    if rows[r..].iter().any(|(_, rhs)| !rhs.is_zero()) {
        return Ok(Some(Vec::new()));
    }
    let pivot_cols: Vec<usize> = pivots.iter().map(|(_, c)| *c).collect();
    let mut solution = Solution::new();
    for (row, col) in pivots {
        let mut value = frac_to_expr(&rows[row].1);
        for (k, var) in vars.iter().enumerate() {
            if pivot_cols.contains(&k) || rows[row].0[k].is_zero() {
                continue;
            }
            value = Expr::sub(value, Expr::mul(frac_to_expr(&rows[row].0[k]), Expr::sym(var)));
        }
        solution.insert(vars[col].clone(), Root::Exact(simplify(&value)?));
    }
    Ok(Some(vec![solution]))
}

fn eliminate(equations: Vec<Expr>, vars: Vec<String>, depth: usize) -> Result<Vec<Solution>> {
    if depth > 8 {
        return Err(SymError::Unsupported("elimination is too deep".into()));
    }
    let mut polys = Vec::new();
    for eq in &equations {
        let frac = canonical_scalar(eq)?;
        if frac.is_zero() {
            continue;
        }
        if !vars.iter().any(|v| frac.depends_on(v)) {
            return Ok(Vec::new());
        }
        polys.push(frac.num().clone());
    }
    if polys.is_empty() {
        return Ok(vec![Solution::new()]);
    }
    for (i, p) in polys.iter().enumerate() {
        for var in &vars {
            let Some(coeffs) = p.coefficients_in(var) else { continue };
            if coeffs.keys().next_back() != Some(&1) {
                continue;
            }
            let lead = coeffs.get(&1).cloned().unwrap_or_default();
            if vars.iter().any(|v| lead.depends_on(v)) {
                continue;
            }
            let rest = coeffs.get(&0).cloned().unwrap_or_default();
            let value = frac_to_expr(&Frac::from_poly(rest)?.neg().div(&Frac::from_poly(lead)?)?);
            return back_substitute(&polys, i, var, Root::Exact(value), &vars, depth);
        }
    }
    for (i, p) in polys.iter().enumerate() {
        let involved: Vec<&String> = vars.iter().filter(|v| p.depends_on(v)).collect();
        if let [var] = involved.as_slice() {
            let mut out = Vec::new();
            for root in solve_univariate(&poly_to_expr(p), var, &SolveOptions::default())? {
                out.extend(back_substitute(&polys, i, var, root, &vars, depth)?);
            }
            return Ok(out);
        }
    }
    Err(SymError::Unsupported("no equation isolates a variable".into()))
}

fn back_substitute(
    polys: &[Poly],
    used: usize,
    var: &str,
    value: Root,
    vars: &[String],
    depth: usize,
) -> Result<Vec<Solution>> {
    let approximate = matches!(value, Root::Approx(_));
    let value_expr = value.to_expr();
    let mapping = BTreeMap::from([(var.to_string(), value_expr.clone())]);
    let reduced = polys
        .iter()
        .enumerate()
        .filter(|(k, _)| *k != used)
        .map(|(_, p)| substitute(&poly_to_expr(p), &mapping))
        .collect::<Result<Vec<_>>>()?;
    let rest: Vec<String> = vars.iter().filter(|v| *v != var).cloned().collect();
    let mut out = Vec::new();
    for mut solution in eliminate(reduced, rest, depth + 1)? {
        let bound: BTreeMap<String, Expr> = solution.iter().map(|(k, r)| (k.clone(), r.to_expr())).collect();
        let resolved = simplify(&substitute(&value_expr, &bound)?)?;
        solution.insert(var.to_string(), Root::Exact(resolved));
        if approximate {
            for root in solution.values_mut() {
                *root = Root::Approx(root.value()?);
            }
        }
        out.push(solution);
    }
    Ok(out)
}

fn newton_system(equations: &[Expr], vars: &[String]) -> Result<Vec<Solution>> {
    let n = vars.len();
    let m = equations.len();
    if n == 0 || m == 0 {
        return Ok(Vec::new());
    }
    let jacobian: Vec<Vec<Expr>> = equations
        .iter()
        .map(|e| vars.iter().map(|v| differentiate(e, v, 1)).collect::<Result<Vec<_>>>())
        .collect::<Result<_>>()?;
    let eval_at = |e: &Expr, x: &DVector<f64>| {
        let bindings: BTreeMap<String, f64> = vars.iter().cloned().zip(x.iter().copied()).collect();
        evaluate_real(e, &bindings)
    };
    let mut found: Vec<DVector<f64>> = Vec::new();
    for start in 0..48 {
        let mut x = DVector::from_fn(n, |j, _| {
            let phase = ((start as f64 + 1.0) * (j as f64 + 1.0) * 0.618_033_988_75).fract();
            8.0 * phase - 4.0
        });
        let mut converged = false;
        for _ in 0..80 {
            let Ok(fv) = (0..m).map(|i| eval_at(&equations[i], &x)).collect::<Result<Vec<_>>>() else {
                break;
            };
            let f = DVector::from_vec(fv);
            if f.norm() < 1e-12 {
                converged = true;
                break;
            }
            let Ok(jv) = (0..m * n)
                .map(|k| eval_at(&jacobian[k / n][k % n], &x))
                .collect::<Result<Vec<_>>>()
            else {
                break;
            };
            let j = DMatrix::from_row_slice(m, n, &jv);
            let jt = j.transpose();
            let Some(step) = (&jt * &j).lu().solve(&(-(&jt * &f))) else {
                break;
            };
            x += step;
        }
        if converged && !found.iter().any(|y| (y - &x).norm() < 1e-6) {
            found.push(x);
        }
    }
    Ok(found
        .into_iter()
        .map(|x| {
            vars.iter()
                .cloned()
                .zip(x.iter().map(|v| Root::Approx(Complex::new(*v, 0.0))))
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::equals;
    use crate::parser::parse;

    #[test]
    fn cubic_with_rational_roots() {
        let roots = solve_univariate(&parse("x**3 - 6*x**2 + 11*x - 6").unwrap(), "x", &SolveOptions::default()).unwrap();
        let mut values: Vec<f64> = roots.iter().map(|r| r.value().unwrap().re).collect();
        values.sort_by(f64::total_cmp);
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn quadratic_is_exact() {
        let roots = solve_univariate(&parse("x**2 - 2").unwrap(), "x", &SolveOptions::default()).unwrap();
        assert_eq!(roots.len(), 2);
        assert!(roots.iter().any(|r| equals(&r.to_expr(), &parse("sqrt(2)").unwrap()).unwrap()));
    }
}
