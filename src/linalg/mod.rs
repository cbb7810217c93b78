//! Dense decompositions and triangular solves.
//!
//! Free functions (`cholesky_in_place`, `lu_in_place`, `qr_in_place`, and
//! the triangular solvers in [`triangular`]) operate on
//! `&mut impl MatrixMut<T>` / `&impl MatrixRef<T>`. The wrapper structs
//! own their factors and expose `solve`, `inverse`, and `det`.

pub(crate) mod cholesky;
pub(crate) mod lu;
pub(crate) mod qr;
pub mod triangular;

pub use cholesky::{cholesky_in_place, CholeskyDecomposition};
pub use lu::{lu_in_place, lu_solve, LuDecomposition};
pub use qr::{qr_in_place, QrDecomposition};
pub use triangular::{
    linv, lmult, lsolve, lsolve_inplace, lsolve_matrix, lsolve_matrix_inplace, lt_solve,
    lt_solve_inplace, lt_solve_matrix, lt_solve_matrix_inplace, uinv, umult, umult_matrix,
    usolve, usolve_inplace, usolve_matrix, usolve_matrix_inplace,
};

use crate::traits::MatrixRef;

/// Errors from linear algebra operations.
///
/// Returned by decomposition constructors, triangular solves, and the
/// convenience methods (`solve`, `inv`, `cholesky`, `qr`, `lu`).
///
/// ```
/// use scalar_kalman::Matrix;
/// use scalar_kalman::linalg::LinalgError;
///
/// let singular = Matrix::from_rows(2, 2, &[1.0_f64, 2.0, 2.0, 4.0]);
/// assert_eq!(singular.lu().unwrap_err(), LinalgError::Singular);
///
/// let not_pd = Matrix::from_rows(2, 2, &[1.0_f64, 5.0, 5.0, 1.0]);
/// assert_eq!(not_pd.cholesky().unwrap_err(), LinalgError::NotPositiveDefinite);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinalgError {
    /// Matrix is singular or numerically singular.
    #[error("matrix is singular")]
    Singular,
    /// Matrix is not positive definite (required for Cholesky).
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
    /// A square matrix was required.
    #[error("matrix is not square ({nrows}x{ncols})")]
    NotSquare { nrows: usize, ncols: usize },
    /// Operand dimensions do not conform.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    /// A symmetric matrix was required.
    #[error("matrix is not symmetric")]
    NotSymmetric,
}

#[inline]
pub(crate) fn require_square<T>(a: &impl MatrixRef<T>) -> Result<usize, LinalgError> {
    if a.nrows() != a.ncols() {
        return Err(LinalgError::NotSquare {
            nrows: a.nrows(),
            ncols: a.ncols(),
        });
    }
    Ok(a.nrows())
}

#[inline]
pub(crate) fn require_len(expected: usize, found: usize) -> Result<(), LinalgError> {
    if expected != found {
        return Err(LinalgError::DimensionMismatch { expected, found });
    }
    Ok(())
}
