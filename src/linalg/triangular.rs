//! Triangular solves and multiplies.
//!
//! Every solver reads only the relevant triangle of its factor, so the
//! packed output of an in-place decomposition can be passed directly.
//! Each solve is O(n²) per right-hand side. A zero on the diagonal is
//! reported as [`LinalgError::Singular`] before the right-hand side is
//! touched.
//!
//! The `_inplace` variants accept any [`VectorMut`] (an owning
//! [`Vector`] or a [`VectorViewMut`](crate::VectorViewMut) into a matrix
//! column) and leave the solution in it.
//!
//! ```
//! use scalar_kalman::{Matrix, Vector};
//! use scalar_kalman::linalg::{lsolve, lsolve_inplace};
//!
//! let l = Matrix::from_rows(2, 2, &[2.0_f64, 0.0, 1.0, 4.0]);
//! let b = Vector::from_slice(&[2.0, 9.0]);
//! let x = lsolve(&l, &b).unwrap();
//! assert_eq!(x.as_slice(), &[1.0, 2.0]);
//!
//! let mut y = b.clone();
//! lsolve_inplace(&l, &mut y).unwrap();
//! assert_eq!(y, x);
//! ```

use crate::traits::{FloatScalar, MatrixRef, Scalar, VectorMut, VectorRef};
use crate::{Matrix, Vector};

use super::{require_len, require_square, LinalgError};

fn check_diagonal<T: FloatScalar>(
    a: &impl MatrixRef<T>,
    rhs_len: usize,
) -> Result<usize, LinalgError> {
    let n = require_square(a)?;
    require_len(n, rhs_len)?;
    for i in 0..n {
        if *a.get(i, i) == T::zero() {
            return Err(LinalgError::Singular);
        }
    }
    Ok(n)
}

// ── Unchecked kernels ───────────────────────────────────────────────

/// Solve `L x = b` in place; `x` holds `b` on entry.
#[inline]
pub(crate) fn forward_substitute<T: Scalar>(l: &impl MatrixRef<T>, x: &mut impl VectorMut<T>) {
    let n = l.nrows();
    for i in 0..n {
        let mut sum = *x.get(i);
        for j in 0..i {
            sum = sum - *l.get(i, j) * *x.get(j);
        }
        *x.get_mut(i) = sum / *l.get(i, i);
    }
}

/// Solve `U x = b` in place.
#[inline]
pub(crate) fn back_substitute<T: Scalar>(u: &impl MatrixRef<T>, x: &mut impl VectorMut<T>) {
    let n = u.nrows();
    for i in (0..n).rev() {
        let mut sum = *x.get(i);
        for j in (i + 1)..n {
            sum = sum - *u.get(i, j) * *x.get(j);
        }
        *x.get_mut(i) = sum / *u.get(i, i);
    }
}

/// Solve `Lᵀ x = b` in place, reading only the lower triangle.
#[inline]
pub(crate) fn back_substitute_lt<T: Scalar>(l: &impl MatrixRef<T>, x: &mut impl VectorMut<T>) {
    let n = l.nrows();
    for i in (0..n).rev() {
        let mut sum = *x.get(i);
        let col = l.col_as_slice(i, i + 1);
        for (k, &lji) in col.iter().enumerate() {
            sum = sum - lji * *x.get(i + 1 + k);
        }
        *x.get_mut(i) = sum / *l.get(i, i);
    }
}

// ── Vector right-hand side ──────────────────────────────────────────

/// Solve `L x = b` for lower-triangular `L`.
pub fn lsolve<T: FloatScalar>(
    l: &impl MatrixRef<T>,
    b: &impl VectorRef<T>,
) -> Result<Vector<T>, LinalgError> {
    let mut x = copy_of(b);
    lsolve_inplace(l, &mut x)?;
    Ok(x)
}

/// Solve `U x = b` for upper-triangular `U`.
pub fn usolve<T: FloatScalar>(
    u: &impl MatrixRef<T>,
    b: &impl VectorRef<T>,
) -> Result<Vector<T>, LinalgError> {
    let mut x = copy_of(b);
    usolve_inplace(u, &mut x)?;
    Ok(x)
}

/// Solve `Lᵀ x = b` for lower-triangular `L`.
pub fn lt_solve<T: FloatScalar>(
    l: &impl MatrixRef<T>,
    b: &impl VectorRef<T>,
) -> Result<Vector<T>, LinalgError> {
    let mut x = copy_of(b);
    lt_solve_inplace(l, &mut x)?;
    Ok(x)
}

pub fn lsolve_inplace<T: FloatScalar>(
    l: &impl MatrixRef<T>,
    x: &mut impl VectorMut<T>,
) -> Result<(), LinalgError> {
    check_diagonal(l, x.len())?;
    forward_substitute(l, x);
    Ok(())
}

pub fn usolve_inplace<T: FloatScalar>(
    u: &impl MatrixRef<T>,
    x: &mut impl VectorMut<T>,
) -> Result<(), LinalgError> {
    check_diagonal(u, x.len())?;
    back_substitute(u, x);
    Ok(())
}

pub fn lt_solve_inplace<T: FloatScalar>(
    l: &impl MatrixRef<T>,
    x: &mut impl VectorMut<T>,
) -> Result<(), LinalgError> {
    check_diagonal(l, x.len())?;
    back_substitute_lt(l, x);
    Ok(())
}

// ── Matrix right-hand side ──────────────────────────────────────────

/// Solve `L X = B` column by column.
pub fn lsolve_matrix<T: FloatScalar>(
    l: &impl MatrixRef<T>,
    b: &Matrix<T>,
) -> Result<Matrix<T>, LinalgError> {
    let mut x = b.clone();
    lsolve_matrix_inplace(l, &mut x)?;
    Ok(x)
}

/// Solve `U X = B` column by column.
pub fn usolve_matrix<T: FloatScalar>(
    u: &impl MatrixRef<T>,
    b: &Matrix<T>,
) -> Result<Matrix<T>, LinalgError> {
    let mut x = b.clone();
    usolve_matrix_inplace(u, &mut x)?;
    Ok(x)
}

/// Solve `Lᵀ X = B` column by column.
pub fn lt_solve_matrix<T: FloatScalar>(
    l: &impl MatrixRef<T>,
    b: &Matrix<T>,
) -> Result<Matrix<T>, LinalgError> {
    let mut x = b.clone();
    lt_solve_matrix_inplace(l, &mut x)?;
    Ok(x)
}

pub fn lsolve_matrix_inplace<T: FloatScalar>(
    l: &impl MatrixRef<T>,
    b: &mut Matrix<T>,
) -> Result<(), LinalgError> {
    check_diagonal(l, b.nrows())?;
    for j in 0..b.ncols() {
        forward_substitute(l, &mut b.col_mut(j));
    }
    Ok(())
}

pub fn usolve_matrix_inplace<T: FloatScalar>(
    u: &impl MatrixRef<T>,
    b: &mut Matrix<T>,
) -> Result<(), LinalgError> {
    check_diagonal(u, b.nrows())?;
    for j in 0..b.ncols() {
        back_substitute(u, &mut b.col_mut(j));
    }
    Ok(())
}

pub fn lt_solve_matrix_inplace<T: FloatScalar>(
    l: &impl MatrixRef<T>,
    b: &mut Matrix<T>,
) -> Result<(), LinalgError> {
    check_diagonal(l, b.nrows())?;
    for j in 0..b.ncols() {
        back_substitute_lt(l, &mut b.col_mut(j));
    }
    Ok(())
}

// ── Inverses ────────────────────────────────────────────────────────

/// Inverse of a lower-triangular matrix (itself lower triangular).
pub fn linv<T: FloatScalar>(l: &impl MatrixRef<T>) -> Result<Matrix<T>, LinalgError> {
    let n = require_square(l)?;
    lsolve_matrix(l, &Matrix::eye(n))
}

/// Inverse of an upper-triangular matrix (itself upper triangular).
pub fn uinv<T: FloatScalar>(u: &impl MatrixRef<T>) -> Result<Matrix<T>, LinalgError> {
    let n = require_square(u)?;
    usolve_matrix(u, &Matrix::eye(n))
}

// ── Multiplies ──────────────────────────────────────────────────────

/// `L x`, reading only the lower triangle of `l`.
pub fn lmult<T: Scalar>(l: &impl MatrixRef<T>, x: &impl VectorRef<T>) -> Vector<T> {
    let n = l.nrows();
    assert!(
        l.ncols() == n && x.len() == n,
        "dimension mismatch: {}x{} * {}",
        n,
        l.ncols(),
        x.len()
    );
    (0..n)
        .map(|i| (0..=i).fold(T::zero(), |acc, j| acc + *l.get(i, j) * *x.get(j)))
        .collect()
}

/// `U x`, reading only the upper triangle of `u`.
pub fn umult<T: Scalar>(u: &impl MatrixRef<T>, x: &impl VectorRef<T>) -> Vector<T> {
    let n = u.ncols();
    assert_eq!(n, x.len(), "dimension mismatch: {}x{} * {}", u.nrows(), n, x.len());
    (0..u.nrows())
        .map(|i| (i..n).fold(T::zero(), |acc, j| acc + *u.get(i, j) * *x.get(j)))
        .collect()
}

/// `U B`, reading only the upper triangle of `u`.
pub fn umult_matrix<T: Scalar>(u: &impl MatrixRef<T>, b: &Matrix<T>) -> Matrix<T> {
    assert_eq!(
        u.ncols(),
        b.nrows(),
        "dimension mismatch: {}x{} * {}x{}",
        u.nrows(),
        u.ncols(),
        b.nrows(),
        b.ncols()
    );
    let mut out = Matrix::zeros(u.nrows(), b.ncols());
    for j in 0..b.ncols() {
        out.set_col(j, &umult(u, &b.col(j)));
    }
    out
}

fn copy_of<T: Scalar>(b: &impl VectorRef<T>) -> Vector<T> {
    (0..b.len()).map(|i| *b.get(i)).collect()
}
