use alloc::vec;
use alloc::vec::Vec;

use crate::linalg::{require_len, require_square, LinalgError};
use crate::traits::{FloatScalar, MatrixMut, MatrixRef, VectorRef};
use crate::{Matrix, Vector};

/// Perform LU decomposition with partial pivoting, in place.
///
/// On return, `a` contains both L and U packed together:
/// - Upper triangle (including diagonal): U
/// - Lower triangle (excluding diagonal): L (diagonal of L is implicitly 1)
///
/// `perm` is filled with the row permutation indices.
/// Returns `true` if the number of row swaps was even.
///
/// A pivot no larger than `ε · max|aᵢⱼ|` is treated as singular.
pub fn lu_in_place<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    perm: &mut [usize],
) -> Result<bool, LinalgError> {
    let n = require_square(a)?;
    require_len(n, perm.len())?;

    let mut scale = T::zero();
    for j in 0..n {
        for &x in a.col_as_slice(j, 0) {
            scale = scale.max(x.abs());
        }
    }
    let tol = scale * T::epsilon();

    for (i, p) in perm.iter_mut().enumerate() {
        *p = i;
    }

    let mut even = true;

    for col in 0..n {
        // Partial pivoting: largest magnitude in this column.
        let mut max_row = col;
        let mut max_val = a.get(col, col).abs();
        for row in (col + 1)..n {
            let val = a.get(row, col).abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val.is_nan() || max_val <= tol {
            return Err(LinalgError::Singular);
        }

        if max_row != col {
            perm.swap(col, max_row);
            for j in 0..n {
                let tmp = *a.get(col, j);
                *a.get_mut(col, j) = *a.get(max_row, j);
                *a.get_mut(max_row, j) = tmp;
            }
            even = !even;
        }

        let inv_pivot = T::one() / *a.get(col, col);
        for x in a.col_as_mut_slice(col, col + 1).iter_mut() {
            *x = *x * inv_pivot;
        }

        // Rank-1 update: a[col+1.., j] -= a[col, j] * a[col+1.., col]
        for j in (col + 1)..n {
            let a_col_j = *a.get(col, j);
            if a_col_j == T::zero() {
                continue;
            }
            for i in (col + 1)..n {
                let lic = *a.get(i, col);
                let aij = a.get_mut(i, j);
                *aij = *aij - a_col_j * lic;
            }
        }
    }

    Ok(even)
}

/// Solve Ax = b given the packed LU decomposition and permutation.
///
/// `b` (input) and `x` (output) are separate slices of length n.
pub fn lu_solve<T: FloatScalar>(lu: &impl MatrixRef<T>, perm: &[usize], b: &[T], x: &mut [T]) {
    let n = lu.nrows();

    // Ly = Pb
    for i in 0..n {
        let mut sum = b[perm[i]];
        for j in 0..i {
            sum = sum - *lu.get(i, j) * x[j];
        }
        x[i] = sum;
    }

    // Ux = y
    for i in (0..n).rev() {
        let mut sum = x[i];
        for j in (i + 1)..n {
            sum = sum - *lu.get(i, j) * x[j];
        }
        x[i] = sum / *lu.get(i, i);
    }
}

/// LU decomposition with partial pivoting.
///
/// # Example
///
/// ```
/// use scalar_kalman::{Matrix, Vector};
///
/// let a = Matrix::from_rows(2, 2, &[2.0_f64, 1.0, 5.0, 3.0]);
/// let lu = a.lu().unwrap();
///
/// let x = lu.solve(&Vector::from_slice(&[4.0, 11.0]));
/// assert!((x[0] - 1.0).abs() < 1e-12);
/// assert!((x[1] - 2.0).abs() < 1e-12);
/// assert!((lu.det() - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct LuDecomposition<T> {
    lu: Matrix<T>,
    perm: Vec<usize>,
    even: bool,
}

impl<T: FloatScalar> LuDecomposition<T> {
    /// Decompose a square matrix. Returns an error if it is singular.
    pub fn new(a: &Matrix<T>) -> Result<Self, LinalgError> {
        let mut lu = a.clone();
        let mut perm = vec![0usize; a.nrows()];
        let even = lu_in_place(&mut lu, &mut perm)?;
        Ok(Self { lu, perm, even })
    }

    pub fn dim(&self) -> usize {
        self.lu.nrows()
    }

    /// Solve Ax = b. Panics if `b` has the wrong length.
    pub fn solve(&self, b: &impl VectorRef<T>) -> Vector<T> {
        let n = self.dim();
        assert_eq!(b.len(), n, "dimension mismatch in LU solve");
        let rhs: Vec<T> = (0..n).map(|i| *b.get(i)).collect();
        let mut x = vec![T::zero(); n];
        lu_solve(&self.lu, &self.perm, &rhs, &mut x);
        Vector::from_vec(x)
    }

    /// Solve AX = B for a matrix right-hand side.
    pub fn solve_matrix(&self, b: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
        let n = self.dim();
        require_len(n, b.nrows())?;
        let mut out = Matrix::zeros(n, b.ncols());
        let mut x = vec![T::zero(); n];
        for j in 0..b.ncols() {
            lu_solve(&self.lu, &self.perm, b.col_as_slice(j, 0), &mut x);
            out.col_as_mut_slice(j, 0).copy_from_slice(&x);
        }
        Ok(out)
    }

    /// Inverse of the original matrix.
    pub fn inverse(&self) -> Matrix<T> {
        let n = self.dim();
        let mut inv = Matrix::zeros(n, n);
        let mut e = vec![T::zero(); n];
        for col in 0..n {
            if col > 0 {
                e[col - 1] = T::zero();
            }
            e[col] = T::one();
            lu_solve(&self.lu, &self.perm, &e, inv.col_as_mut_slice(col, 0));
        }
        inv
    }

    /// Determinant: sign · Π Uᵢᵢ.
    pub fn det(&self) -> T {
        let d = self.lu.diag().iter().fold(T::one(), |acc, &x| acc * x);
        if self.even {
            d
        } else {
            T::zero() - d
        }
    }
}

impl<T: FloatScalar> Matrix<T> {
    /// LU decomposition with partial pivoting.
    pub fn lu(&self) -> Result<LuDecomposition<T>, LinalgError> {
        LuDecomposition::new(self)
    }

    /// Inverse via LU.
    ///
    /// ```
    /// use scalar_kalman::Matrix;
    /// let a = Matrix::from_rows(2, 2, &[4.0_f64, 7.0, 2.0, 6.0]);
    /// let inv = a.inv().unwrap();
    /// let id = &a * &inv;
    /// assert!((id[(0, 0)] - 1.0).abs() < 1e-12);
    /// assert!(id[(0, 1)].abs() < 1e-12);
    /// ```
    pub fn inv(&self) -> Result<Matrix<T>, LinalgError> {
        Ok(self.lu()?.inverse())
    }

    /// Solve `A x = b` via LU.
    pub fn solve(&self, b: &impl VectorRef<T>) -> Result<Vector<T>, LinalgError> {
        require_square(self)?;
        require_len(self.nrows(), b.len())?;
        Ok(self.lu()?.solve(b))
    }

    /// Solve `A X = B` via LU.
    pub fn solve_matrix(&self, b: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
        require_square(self)?;
        require_len(self.nrows(), b.nrows())?;
        self.lu()?.solve_matrix(b)
    }
}
