use alloc::vec;
use alloc::vec::Vec;

use crate::linalg::triangular::{usolve_inplace, usolve_matrix_inplace};
use crate::linalg::{require_len, LinalgError};
use crate::traits::{FloatScalar, MatrixMut, VectorMut, VectorRef};
use crate::{Matrix, SpdMatrix, Vector};

/// QR decomposition in place using Householder reflections.
///
/// On return, `a` contains the packed QR factorization:
/// - Upper triangle (including diagonal): R
/// - Lower triangle (excluding diagonal): Householder vectors (scaled so
///   the implicit leading element is 1)
///
/// `tau` is filled with the Householder scalar factors (length N), so
/// that `Hₖ = I − τₖ vₖ vₖᵀ`.
///
/// Requires `M >= N`. Returns `LinalgError::Singular` if a column is
/// exactly zero below the diagonal.
pub fn qr_in_place<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    tau: &mut [T],
) -> Result<(), LinalgError> {
    let m = a.nrows();
    let n = a.ncols();
    if m < n {
        return Err(LinalgError::DimensionMismatch {
            expected: n,
            found: m,
        });
    }
    require_len(n, tau.len())?;

    for col in 0..n {
        let norm_sq = a
            .col_as_slice(col, col)
            .iter()
            .fold(T::zero(), |acc, &v| acc + v * v);
        if norm_sq == T::zero() || norm_sq.is_nan() {
            return Err(LinalgError::Singular);
        }

        let norm = norm_sq.sqrt();
        let a_cc = *a.get(col, col);

        // sign(a_cc) · ‖x‖ so v0 = a_cc + sigma avoids cancellation.
        let sigma = if a_cc < T::zero() { T::zero() - norm } else { norm };
        let v0 = a_cc + sigma;
        let tau_val = v0 / sigma;
        tau[col] = tau_val;

        let inv_v0 = T::one() / v0;
        for x in a.col_as_mut_slice(col, col + 1).iter_mut() {
            *x = *x * inv_v0;
        }

        // A[col.., j] -= τ v (vᵀ A[col.., j]) with v = [1, a[col+1.., col]]
        for j in (col + 1)..n {
            let mut dot = *a.get(col, j);
            for i in (col + 1)..m {
                dot = dot + *a.get(i, col) * *a.get(i, j);
            }
            dot = dot * tau_val;

            *a.get_mut(col, j) = *a.get(col, j) - dot;
            for i in (col + 1)..m {
                let vi = *a.get(i, col);
                let aij = a.get_mut(i, j);
                *aij = *aij - dot * vi;
            }
        }

        *a.get_mut(col, col) = T::zero() - sigma;
    }

    Ok(())
}

/// Householder QR decomposition of an M × N matrix with M ≥ N.
///
/// Used for least squares and for forming cross-product matrices
/// stably: `XᵀX = RᵀR` and `XᵀY = Rᵀ(QᵀY)`.
///
/// # Example
///
/// ```
/// use scalar_kalman::{Matrix, Vector};
///
/// // Least-squares fit: y = c0 + c1*x to points (0,1), (1,2), (2,4)
/// let a = Matrix::from_rows(3, 2, &[1.0_f64, 0.0, 1.0, 1.0, 1.0, 2.0]);
/// let b = Vector::from_slice(&[1.0, 2.0, 4.0]);
/// let x = a.qr().unwrap().solve(&b).unwrap();
/// assert!((x[0] - 5.0 / 6.0).abs() < 1e-10);
/// assert!((x[1] - 3.0 / 2.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct QrDecomposition<T> {
    qr: Matrix<T>,
    tau: Vec<T>,
}

impl<T: FloatScalar> QrDecomposition<T> {
    /// Decompose a matrix with at least as many rows as columns.
    pub fn new(a: &Matrix<T>) -> Result<Self, LinalgError> {
        let mut qr = a.clone();
        let mut tau = vec![T::zero(); a.ncols()];
        qr_in_place(&mut qr, &mut tau)?;
        Ok(Self { qr, tau })
    }

    /// Rows of the decomposed matrix.
    pub fn nrows(&self) -> usize {
        self.qr.nrows()
    }

    /// Columns of the decomposed matrix.
    pub fn ncols(&self) -> usize {
        self.qr.ncols()
    }

    /// The upper-triangular R factor (N × N).
    pub fn r(&self) -> Matrix<T> {
        let n = self.ncols();
        Matrix::from_fn(n, n, |i, j| if i <= j { self.qr[(i, j)] } else { T::zero() })
    }

    /// Apply every `Hₖ` to a column of length M, last-to-first if `reverse`.
    fn reflect(&self, x: &mut impl VectorMut<T>, reverse: bool) {
        let m = self.nrows();
        let n = self.ncols();
        let mut apply = |col: usize| {
            let mut dot = *x.get(col);
            for i in (col + 1)..m {
                dot = dot + self.qr[(i, col)] * *x.get(i);
            }
            dot = dot * self.tau[col];
            *x.get_mut(col) = *x.get(col) - dot;
            for i in (col + 1)..m {
                *x.get_mut(i) = *x.get(i) - dot * self.qr[(i, col)];
            }
        };
        if reverse {
            (0..n).rev().for_each(&mut apply);
        } else {
            (0..n).for_each(&mut apply);
        }
    }

    /// The thin Q factor (M × N, orthonormal columns).
    pub fn q(&self) -> Matrix<T> {
        let (m, n) = (self.nrows(), self.ncols());
        let mut q = Matrix::zeros(m, n);
        for j in 0..n {
            q[(j, j)] = T::one();
            self.reflect(&mut q.col_mut(j), true);
        }
        q
    }

    /// `Qᵀ B` for the thin Q: the first N rows of the full product.
    pub fn qt_mul(&self, b: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
        require_len(self.nrows(), b.nrows())?;
        let n = self.ncols();
        let mut full = b.clone();
        let mut out = Matrix::zeros(n, b.ncols());
        for j in 0..b.ncols() {
            self.reflect(&mut full.col_mut(j), false);
            for i in 0..n {
                out[(i, j)] = full[(i, j)];
            }
        }
        Ok(out)
    }

    /// `Qᵀ b` for the thin Q (length N).
    pub fn qt_mul_vec(&self, b: &impl VectorRef<T>) -> Result<Vector<T>, LinalgError> {
        require_len(self.nrows(), b.len())?;
        let mut x: Vector<T> = (0..b.len()).map(|i| *b.get(i)).collect();
        self.reflect(&mut x, false);
        Ok(x.subvector(0, self.ncols()).to_vector())
    }

    /// Least-squares solution of min ‖A x − b‖ via `R x = Qᵀ b`.
    pub fn solve(&self, b: &impl VectorRef<T>) -> Result<Vector<T>, LinalgError> {
        let mut x = self.qt_mul_vec(b)?;
        usolve_inplace(&self.qr.top_square(), &mut x)?;
        Ok(x)
    }

    /// Least-squares solution for every column of `B`.
    pub fn solve_matrix(&self, b: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
        let mut x = self.qt_mul(b)?;
        usolve_matrix_inplace(&self.qr.top_square(), &mut x)?;
        Ok(x)
    }

    /// Solve `R X = B` for an N-row right-hand side.
    pub fn r_solve_matrix(&self, b: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
        let mut x = b.clone();
        usolve_matrix_inplace(&self.qr.top_square(), &mut x)?;
        Ok(x)
    }

    /// `AᵀA = RᵀR`, formed from R alone.
    pub fn inner(&self) -> SpdMatrix<T> {
        self.r().inner()
    }

    /// Determinant of the original matrix (square only).
    pub fn det(&self) -> Result<T, LinalgError> {
        if self.nrows() != self.ncols() {
            return Err(LinalgError::NotSquare {
                nrows: self.nrows(),
                ncols: self.ncols(),
            });
        }
        // Each reflection has determinant -1 unless τ = 0.
        let mut d = self.qr.diag().iter().fold(T::one(), |acc, &x| acc * x);
        for &t in self.tau.iter() {
            if t != T::zero() {
                d = T::zero() - d;
            }
        }
        Ok(d)
    }
}

impl<T: FloatScalar> Matrix<T> {
    /// Householder QR decomposition (requires `nrows >= ncols`).
    pub fn qr(&self) -> Result<QrDecomposition<T>, LinalgError> {
        QrDecomposition::new(self)
    }

    /// The leading `ncols × ncols` block.
    fn top_square(&self) -> Matrix<T> {
        let n = self.ncols();
        Matrix::from_fn(n, n, |i, j| self[(i, j)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn tall() -> Matrix<f64> {
        Matrix::from_rows(
            4,
            3,
            &[12.0, -51.0, 4.0, 6.0, 167.0, -68.0, -4.0, 24.0, -41.0, 1.0, 2.0, 3.0],
        )
    }

    #[test]
    fn q_times_r_reconstructs() {
        let a = tall();
        let qr = a.qr().unwrap();
        let q = qr.q();
        let r = qr.r();
        let back = &q * &r;
        for (x, y) in back.iter().zip(a.iter()) {
            assert!(approx_eq(*x, *y, 1e-10));
        }
        assert!(approx_eq(r[(2, 0)], 0.0, 1e-15));
    }

    #[test]
    fn q_is_orthonormal() {
        let q = tall().qr().unwrap().q();
        let qtq = q.inner();
        for i in 0..3 {
            for j in 0..3 {
                let e = if i == j { 1.0 } else { 0.0 };
                assert!(approx_eq(qtq[(i, j)], e, 1e-12));
            }
        }
    }

    #[test]
    fn cross_products_from_r() {
        let x = tall();
        let y = Matrix::from_rows(4, 2, &[1.0, 0.0, 2.0, 1.0, 3.0, -1.0, 4.0, 2.0]);
        let qr = x.qr().unwrap();

        let xtx = qr.inner();
        let expected = x.inner();
        for (a, b) in xtx.iter().zip(expected.iter()) {
            assert!(approx_eq(*a, *b, 1e-9 * b.abs().max(1.0)));
        }

        let xty = qr.r().tmul(&qr.qt_mul(&y).unwrap());
        let expected = x.tmul(&y);
        for (a, b) in xty.iter().zip(expected.iter()) {
            assert!(approx_eq(*a, *b, 1e-9 * b.abs().max(1.0)));
        }
    }

    #[test]
    fn least_squares_solve_matches_normal_equations() {
        let x = tall();
        let b = Vector::from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let beta = x.qr().unwrap().solve(&b).unwrap();
        let normal = x.inner().solve(&x.tmul_vec(&b)).unwrap();
        for i in 0..3 {
            assert!(approx_eq(beta[i], normal[i], 1e-9));
        }

        let bm = Matrix::from_rows(4, 1, &[1.0, 2.0, 3.0, 4.0]);
        let betam = x.qr().unwrap().solve_matrix(&bm).unwrap();
        assert!(approx_eq(betam[(1, 0)], beta[1], 1e-12));
    }

    #[test]
    fn r_solve() {
        let qr = tall().qr().unwrap();
        let b = Matrix::from_rows(3, 1, &[1.0, 1.0, 1.0]);
        let x = qr.r_solve_matrix(&b).unwrap();
        let back = &qr.r() * &x;
        for i in 0..3 {
            assert!(approx_eq(back[(i, 0)], 1.0, 1e-12));
        }
    }

    #[test]
    fn det_matches_lu() {
        let a = Matrix::from_rows(3, 3, &[6.0_f64, 1.0, 1.0, 4.0, -2.0, 5.0, 2.0, 8.0, 7.0]);
        assert!(approx_eq(a.qr().unwrap().det().unwrap(), a.det(), 1e-9));
        assert!(tall().qr().unwrap().det().is_err());
    }

    #[test]
    fn wide_or_zero_column_rejected() {
        assert!(Matrix::<f64>::zeros(2, 3).qr().is_err());
        let z = Matrix::from_rows(3, 2, &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0]);
        assert_eq!(z.qr().unwrap_err(), LinalgError::Singular);
    }
}
