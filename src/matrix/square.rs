use crate::linalg::LuDecomposition;
use crate::traits::{FloatScalar, Scalar, VectorRef};

use super::Matrix;

impl<T: Scalar> Matrix<T> {
    /// Sum of diagonal elements.
    ///
    /// ```
    /// use scalar_kalman::Matrix;
    /// let m = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    /// assert_eq!(m.trace(), 5.0);
    /// ```
    pub fn trace(&self) -> T {
        self.diag().iter().fold(T::zero(), |acc, &x| acc + x)
    }

    /// Create a square diagonal matrix from a vector-like.
    pub fn from_diag(v: &impl VectorRef<T>) -> Self {
        let n = v.len();
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = *v.get(i);
        }
        m
    }

    /// Integer matrix power via repeated squaring. `pow(0)` is the identity.
    pub fn pow(&self, mut n: u32) -> Self {
        assert!(self.is_square(), "pow requires a square matrix");
        let mut result = Self::eye(self.nrows);
        let mut base = self.clone();
        while n > 0 {
            if n & 1 == 1 {
                result = &result * &base;
            }
            base = &base * &base;
            n >>= 1;
        }
        result
    }

    /// Sum of squared elements.
    pub fn sumsq(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &x| acc + x * x)
    }

    /// Check if the matrix is exactly symmetric (`A == Aᵀ`).
    ///
    /// ```
    /// use scalar_kalman::Matrix;
    /// let sym = Matrix::from_rows(2, 2, &[1.0, 2.0, 2.0, 3.0]);
    /// assert!(sym.is_symmetric());
    /// ```
    pub fn is_symmetric(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        let n = self.nrows;
        for j in 0..n {
            for i in 0..j {
                if self[(i, j)] != self[(j, i)] {
                    return false;
                }
            }
        }
        true
    }
}

impl<T: FloatScalar> Matrix<T> {
    /// Sum of absolute values of the elements.
    pub fn abs_norm(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &x| acc + x.abs())
    }

    /// Frobenius norm.
    pub fn frobenius_norm(&self) -> T {
        self.sumsq().sqrt()
    }

    /// Largest absolute element (0 for an empty matrix).
    pub fn max_abs(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &x| acc.max(x.abs()))
    }

    /// Whether every element is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Determinant via LU with partial pivoting; 0 when the matrix is singular.
    ///
    /// Panics if the matrix is not square.
    ///
    /// ```
    /// use scalar_kalman::Matrix;
    /// let m = Matrix::from_rows(2, 2, &[3.0_f64, 8.0, 4.0, 6.0]);
    /// assert!((m.det() - (-14.0)).abs() < 1e-12);
    /// ```
    pub fn det(&self) -> T {
        assert!(self.is_square(), "determinant requires a square matrix");
        match LuDecomposition::new(self) {
            Ok(lu) => lu.det(),
            Err(_) => T::zero(),
        }
    }
}
