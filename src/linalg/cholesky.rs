use crate::linalg::triangular::{back_substitute_lt, forward_substitute};
use crate::linalg::{require_len, require_square, LinalgError};
use crate::traits::{FloatScalar, MatrixMut, MatrixRef, VectorRef};
use crate::{Matrix, SpdMatrix, Vector};

/// Cholesky decomposition in place: A = L Lᵀ.
///
/// On return, the lower triangle of `a` (including diagonal) contains L.
/// The upper triangle is left unchanged and never read.
///
/// Returns an error if the matrix is not positive definite.
pub fn cholesky_in_place<T: FloatScalar>(a: &mut impl MatrixMut<T>) -> Result<(), LinalgError> {
    let n = require_square(a)?;

    for j in 0..n {
        for k in 0..j {
            let ljk = *a.get(j, k);
            for i in j..n {
                let lik = *a.get(i, k);
                let aij = a.get_mut(i, j);
                *aij = *aij - lik * ljk;
            }
        }

        let diag = *a.get(j, j);
        if diag.is_nan() || diag <= T::zero() {
            return Err(LinalgError::NotPositiveDefinite);
        }
        let ljj = diag.sqrt();
        *a.get_mut(j, j) = ljj;

        let inv_ljj = T::one() / ljj;
        for x in a.col_as_mut_slice(j, j + 1).iter_mut() {
            *x = *x * inv_ljj;
        }
    }

    Ok(())
}

/// Cholesky decomposition of a symmetric positive-definite matrix.
///
/// # Example
///
/// ```
/// use scalar_kalman::{Matrix, Vector};
///
/// let a = Matrix::from_rows(2, 2, &[4.0_f64, 2.0, 2.0, 3.0]);
/// let chol = a.cholesky().unwrap();
///
/// let b = Vector::from_slice(&[8.0, 7.0]);
/// let x = chol.solve(&b); // solve Ax = b
///
/// let inv = chol.inverse(); // A⁻¹
/// let det = chol.det();     // det(A)
/// assert!((det - 8.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct CholeskyDecomposition<T> {
    /// Packed factor; only the lower triangle is meaningful.
    l: Matrix<T>,
}

impl<T: FloatScalar> CholeskyDecomposition<T> {
    /// Decompose a positive-definite matrix, reading its lower triangle.
    pub fn new(a: &Matrix<T>) -> Result<Self, LinalgError> {
        let mut l = a.clone();
        cholesky_in_place(&mut l)?;
        Ok(Self { l })
    }

    /// Dimension of the factored matrix.
    pub fn dim(&self) -> usize {
        self.l.nrows()
    }

    /// The packed factor. Entries above the diagonal are stale input.
    pub fn l(&self) -> &Matrix<T> {
        &self.l
    }

    /// The lower-triangular factor with zeros above the diagonal.
    pub fn l_full(&self) -> Matrix<T> {
        let mut out = self.l.clone();
        let n = out.nrows();
        for j in 0..n {
            for i in 0..j {
                out[(i, j)] = T::zero();
            }
        }
        out
    }

    /// Solve A x = b.
    ///
    /// Panics if `b` has the wrong length.
    pub fn solve(&self, b: &impl VectorRef<T>) -> Vector<T> {
        assert_eq!(b.len(), self.dim(), "dimension mismatch in Cholesky solve");
        let mut x: Vector<T> = (0..b.len()).map(|i| *b.get(i)).collect();
        forward_substitute(&self.l, &mut x);
        back_substitute_lt(&self.l, &mut x);
        x
    }

    /// Solve A X = B for a matrix right-hand side.
    pub fn solve_matrix(&self, b: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
        require_len(self.dim(), b.nrows())?;
        let mut x = b.clone();
        for j in 0..x.ncols() {
            let mut col = x.col_mut(j);
            forward_substitute(&self.l, &mut col);
            back_substitute_lt(&self.l, &mut col);
        }
        Ok(x)
    }

    /// Determinant: (Π Lᵢᵢ)².
    pub fn det(&self) -> T {
        let prod = self.l.diag().iter().fold(T::one(), |acc, &x| acc * x);
        prod * prod
    }

    /// Log-determinant: 2 Σ ln Lᵢᵢ. Stable where `det` would overflow.
    pub fn ln_det(&self) -> T {
        let two = T::one() + T::one();
        two * self.l.diag().iter().fold(T::zero(), |acc, &x| acc + x.ln())
    }

    /// Inverse A⁻¹ = L⁻ᵀ L⁻¹, exactly symmetric.
    pub fn inverse(&self) -> SpdMatrix<T> {
        let n = self.dim();
        let mut linv = Matrix::eye(n);
        for j in 0..n {
            forward_substitute(&self.l, &mut linv.col_mut(j));
        }
        linv.inner()
    }
}

impl<T> MatrixRef<T> for CholeskyDecomposition<T> {
    fn nrows(&self) -> usize {
        self.l.nrows()
    }

    fn ncols(&self) -> usize {
        self.l.ncols()
    }

    fn get(&self, row: usize, col: usize) -> &T {
        MatrixRef::get(&self.l, row, col)
    }

    fn col_as_slice(&self, col: usize, row_start: usize) -> &[T] {
        self.l.col_as_slice(col, row_start)
    }
}

impl<T: FloatScalar> Matrix<T> {
    /// Cholesky decomposition (`A = L Lᵀ`).
    ///
    /// ```
    /// use scalar_kalman::Matrix;
    /// let spd = Matrix::from_rows(2, 2, &[4.0_f64, 2.0, 2.0, 3.0]);
    /// let l = spd.cholesky().unwrap().l_full();
    /// let reconstructed = l.mul_t(&l);
    /// assert!((reconstructed[(0, 1)] - 2.0).abs() < 1e-12);
    /// ```
    pub fn cholesky(&self) -> Result<CholeskyDecomposition<T>, LinalgError> {
        CholeskyDecomposition::new(self)
    }
}
