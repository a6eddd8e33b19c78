//! Exact matrix arithmetic over canonical scalars, plus a numeric determinant.

use nalgebra::DMatrix;
use num_complex::Complex;

use crate::canon::{Canon, Frac};
use crate::error::{Result, SymError};
use crate::expr::MatOp;

/// Matrix of canonical scalars, stored by rows.
pub type FracMatrix = Vec<Vec<Frac>>;

fn shape(m: &FracMatrix) -> (usize, usize) {
    (m.len(), m.first().map_or(0, Vec::len))
}

fn square(m: &FracMatrix, what: &str) -> Result<usize> {
    let (r, c) = shape(m);
    if r != c {
        return Err(SymError::Shape(format!("{what} needs a square matrix, got {r}x{c}")));
    }
    Ok(r)
}

/// Element-wise sum.
pub fn add(a: &FracMatrix, b: &FracMatrix) -> Result<FracMatrix> {
    if shape(a) != shape(b) {
        return Err(SymError::Shape(format!("cannot add {:?} and {:?} matrices", shape(a), shape(b))));
    }
    a.iter()
        .zip(b)
        .map(|(ra, rb)| ra.iter().zip(rb).map(|(x, y)| x.add(y)).collect())
        .collect()
}

/// Scalar multiple.
pub fn scale(k: &Frac, m: &FracMatrix) -> Result<FracMatrix> {
    m.iter().map(|r| r.iter().map(|x| k.mul(x)).collect()).collect()
}

/// Matrix product.
pub fn mul(a: &FracMatrix, b: &FracMatrix) -> Result<FracMatrix> {
    let (ar, ac) = shape(a);
    let (br, bc) = shape(b);
    if ac != br {
        return Err(SymError::Shape(format!("cannot multiply {ar}x{ac} by {br}x{bc}")));
    }
    let mut out = Vec::with_capacity(ar);
    for row in a {
        let mut out_row = Vec::with_capacity(bc);
        for j in 0..bc {
            let mut acc = Frac::zero();
            for (k, x) in row.iter().enumerate() {
                acc = acc.add(&x.mul(&b[k][j])?)?;
            }
            out_row.push(acc);
        }
        out.push(out_row);
    }
    Ok(out)
}

fn identity(n: usize) -> FracMatrix {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { Frac::one() } else { Frac::zero() }).collect())
        .collect()
}

/// Integer power; negative exponents invert first.
pub fn pow(m: &FracMatrix, k: i64) -> Result<FracMatrix> {
    let n = square(m, "a matrix power")?;
    let base = if k < 0 { inverse(m)? } else { m.clone() };
    let mut out = identity(n);
    for _ in 0..k.unsigned_abs() {
        out = mul(&out, &base)?;
    }
    Ok(out)
}

/// Transpose.
pub fn transpose(m: &FracMatrix) -> FracMatrix {
    let (r, c) = shape(m);
    (0..c).map(|j| (0..r).map(|i| m[i][j].clone()).collect()).collect()
}

/// Trace.
pub fn trace(m: &FracMatrix) -> Result<Frac> {
    let n = square(m, "trace")?;
    (0..n).try_fold(Frac::zero(), |acc, i| acc.add(&m[i][i]))
}

/// Determinant by fraction-exact Gaussian elimination.
pub fn det(m: &FracMatrix) -> Result<Frac> {
    let n = square(m, "det")?;
    let mut a = m.clone();
    let mut result = Frac::one();
    for col in 0..n {
        let Some(pivot) = (col..n).find(|&r| !a[r][col].is_zero()) else {
            return Ok(Frac::zero());
        };
        if pivot != col {
            a.swap(pivot, col);
            result = result.neg();
        }
        let p = a[col][col].clone();
        result = result.mul(&p)?;
        for r in col + 1..n {
            if a[r][col].is_zero() {
                continue;
            }
            let factor = a[r][col].div(&p)?;
            for c in col..n {
                let delta = factor.mul(&a[col][c])?;
                a[r][c] = a[r][c].sub(&delta)?;
            }
        }
    }
    Ok(result)
}

/// Inverse by Gauss-Jordan elimination.
pub fn inverse(m: &FracMatrix) -> Result<FracMatrix> {
    let n = square(m, "inverse")?;
    let mut a = m.clone();
    let mut inv = identity(n);
    for col in 0..n {
        let pivot = (col..n)
            .find(|&r| !a[r][col].is_zero())
            .ok_or_else(|| SymError::Undefined("matrix is singular".into()))?;
        a.swap(pivot, col);
        inv.swap(pivot, col);
        let p = a[col][col].clone();
        for c in 0..n {
            a[col][c] = a[col][c].div(&p)?;
            inv[col][c] = inv[col][c].div(&p)?;
        }
        for r in 0..n {
            if r == col || a[r][col].is_zero() {
                continue;
            }
            let factor = a[r][col].clone();
            for c in 0..n {
                let da = factor.mul(&a[col][c])?;
                let di = factor.mul(&inv[col][c])?;
                a[r][c] = a[r][c].sub(&da)?;
                inv[r][c] = inv[r][c].sub(&di)?;
            }
        }
    }
    Ok(inv)
}

/// Applies a matrix operation.
pub fn apply(op: MatOp, m: &FracMatrix) -> Result<Canon> {
    Ok(match op {
        MatOp::Det => Canon::Scalar(det(m)?),
        MatOp::Trace => Canon::Scalar(trace(m)?),
        MatOp::Transpose => Canon::Matrix(transpose(m)),
        MatOp::Inverse => Canon::Matrix(inverse(m)?),
    })
}

/// Floating-point determinant of a square complex matrix.
pub fn numeric_det(rows: &[Vec<Complex<f64>>]) -> Result<Complex<f64>> {
    let n = rows.len();
    if rows.iter().any(|r| r.len() != n) {
        return Err(SymError::Shape("det needs a square matrix".into()));
    }
    if n == 0 {
        return Ok(Complex::new(1.0, 0.0));
    }
    let m = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
    Ok(m.determinant())
}
