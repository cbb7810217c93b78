use alloc::vec;
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::traits::{Scalar, VectorRef};

use super::view::VectorView;
use super::{Matrix, SpdMatrix, Vector};

impl<T: Scalar> Matrix<T> {
    fn zip_map(&self, rhs: &Matrix<T>, op: &str, f: impl Fn(T, T) -> T) -> Matrix<T> {
        assert_eq!(
            (self.nrows, self.ncols),
            (rhs.nrows, rhs.ncols),
            "dimension mismatch: {}x{} {} {}x{}",
            self.nrows,
            self.ncols,
            op,
            rhs.nrows,
            rhs.ncols,
        );
        let data = self
            .data
            .iter()
            .zip(rhs.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Matrix {
            data,
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }

    fn zip_assign(&mut self, rhs: &Matrix<T>, op: &str, f: impl Fn(T, T) -> T) {
        assert_eq!(
            (self.nrows, self.ncols),
            (rhs.nrows, rhs.ncols),
            "dimension mismatch: {}x{} {} {}x{}",
            self.nrows,
            self.ncols,
            op,
            rhs.nrows,
            rhs.ncols,
        );
        for (a, &b) in self.data.iter_mut().zip(rhs.data.iter()) {
            *a = f(*a, b);
        }
    }
}

// ── Element-wise addition / subtraction ─────────────────────────────

macro_rules! impl_elementwise {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<T: Scalar> $trait<&Matrix<T>> for &Matrix<T> {
            type Output = Matrix<T>;
            fn $method(self, rhs: &Matrix<T>) -> Matrix<T> {
                self.zip_map(rhs, stringify!($op), |a, b| a $op b)
            }
        }

        impl<T: Scalar> $trait<&Matrix<T>> for Matrix<T> {
            type Output = Matrix<T>;
            fn $method(self, rhs: &Matrix<T>) -> Matrix<T> {
                (&self).$method(rhs)
            }
        }

        impl<T: Scalar> $trait<Matrix<T>> for &Matrix<T> {
            type Output = Matrix<T>;
            fn $method(self, rhs: Matrix<T>) -> Matrix<T> {
                self.$method(&rhs)
            }
        }

        impl<T: Scalar> $trait for Matrix<T> {
            type Output = Matrix<T>;
            fn $method(self, rhs: Matrix<T>) -> Matrix<T> {
                (&self).$method(&rhs)
            }
        }
    };
}

impl_elementwise!(Add, add, +);
impl_elementwise!(Sub, sub, -);

impl<T: Scalar> AddAssign<&Matrix<T>> for Matrix<T> {
    fn add_assign(&mut self, rhs: &Matrix<T>) {
        self.zip_assign(rhs, "+=", |a, b| a + b);
    }
}

impl<T: Scalar> AddAssign for Matrix<T> {
    fn add_assign(&mut self, rhs: Matrix<T>) {
        *self += &rhs;
    }
}

impl<T: Scalar> SubAssign<&Matrix<T>> for Matrix<T> {
    fn sub_assign(&mut self, rhs: &Matrix<T>) {
        self.zip_assign(rhs, "-=", |a, b| a - b);
    }
}

impl<T: Scalar> SubAssign for Matrix<T> {
    fn sub_assign(&mut self, rhs: Matrix<T>) {
        *self -= &rhs;
    }
}

impl<T: Scalar + Neg<Output = T>> Neg for Matrix<T> {
    type Output = Matrix<T>;
    fn neg(mut self) -> Matrix<T> {
        for x in self.data.iter_mut() {
            *x = -*x;
        }
        self
    }
}

// ── Matrix multiplication ───────────────────────────────────────────

impl<T: Scalar> Mul<&Matrix<T>> for &Matrix<T> {
    type Output = Matrix<T>;

    fn mul(self, rhs: &Matrix<T>) -> Matrix<T> {
        assert_eq!(
            self.ncols, rhs.nrows,
            "dimension mismatch: {}x{} * {}x{}",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        let m = self.nrows;
        let n = self.ncols;
        let p = rhs.ncols;
        let mut data = vec![T::zero(); m * p];
        // C[:, j] += A[:, k] * B[k, j], column-major friendly.
        for j in 0..p {
            for k in 0..n {
                let b_kj = rhs.data[j * n + k];
                if b_kj == T::zero() {
                    continue;
                }
                let a_col = &self.data[k * m..(k + 1) * m];
                let c_col = &mut data[j * m..(j + 1) * m];
                for (c, &a) in c_col.iter_mut().zip(a_col.iter()) {
                    *c = *c + a * b_kj;
                }
            }
        }
        Matrix {
            data,
            nrows: m,
            ncols: p,
        }
    }
}

impl<T: Scalar> Mul for Matrix<T> {
    type Output = Matrix<T>;
    fn mul(self, rhs: Matrix<T>) -> Matrix<T> {
        &self * &rhs
    }
}

impl<T: Scalar> Mul<&Matrix<T>> for Matrix<T> {
    type Output = Matrix<T>;
    fn mul(self, rhs: &Matrix<T>) -> Matrix<T> {
        &self * rhs
    }
}

// ── Matrix-vector multiplication ────────────────────────────────────

impl<T: Scalar> Mul<&Vector<T>> for &Matrix<T> {
    type Output = Vector<T>;
    fn mul(self, rhs: &Vector<T>) -> Vector<T> {
        self.mul_vec(rhs)
    }
}

impl<T: Scalar> Mul<&VectorView<'_, T>> for &Matrix<T> {
    type Output = Vector<T>;
    fn mul(self, rhs: &VectorView<'_, T>) -> Vector<T> {
        self.mul_vec(rhs)
    }
}

// ── Scalar multiplication / division ────────────────────────────────

impl<T: Scalar> Mul<T> for &Matrix<T> {
    type Output = Matrix<T>;
    fn mul(self, rhs: T) -> Matrix<T> {
        Matrix {
            data: self.data.iter().map(|&x| x * rhs).collect(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<T: Scalar> Mul<T> for Matrix<T> {
    type Output = Matrix<T>;
    fn mul(mut self, rhs: T) -> Matrix<T> {
        self *= rhs;
        self
    }
}

impl<T: Scalar> MulAssign<T> for Matrix<T> {
    fn mul_assign(&mut self, rhs: T) {
        for x in self.data.iter_mut() {
            *x = *x * rhs;
        }
    }
}

impl<T: Scalar> Div<T> for &Matrix<T> {
    type Output = Matrix<T>;
    fn div(self, rhs: T) -> Matrix<T> {
        Matrix {
            data: self.data.iter().map(|&x| x / rhs).collect(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<T: Scalar> Div<T> for Matrix<T> {
    type Output = Matrix<T>;
    fn div(mut self, rhs: T) -> Matrix<T> {
        self /= rhs;
        self
    }
}

impl<T: Scalar> DivAssign<T> for Matrix<T> {
    fn div_assign(&mut self, rhs: T) {
        for x in self.data.iter_mut() {
            *x = *x / rhs;
        }
    }
}

macro_rules! impl_scalar_mul_matrix {
    ($($t:ty),*) => {
        $(
            impl Mul<Matrix<$t>> for $t {
                type Output = Matrix<$t>;
                fn mul(self, rhs: Matrix<$t>) -> Matrix<$t> {
                    rhs * self
                }
            }

            impl Mul<&Matrix<$t>> for $t {
                type Output = Matrix<$t>;
                fn mul(self, rhs: &Matrix<$t>) -> Matrix<$t> {
                    rhs * self
                }
            }
        )*
    };
}

impl_scalar_mul_matrix!(f32, f64);

// ── Products with transposes ────────────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// Matrix-vector product `A v` for any vector-like.
    pub fn mul_vec(&self, v: &impl VectorRef<T>) -> Vector<T> {
        assert_eq!(
            self.ncols,
            v.len(),
            "dimension mismatch: {}x{} * vector of length {}",
            self.nrows,
            self.ncols,
            v.len(),
        );
        let m = self.nrows;
        let mut out = Vector::zeros(m);
        for k in 0..self.ncols {
            let vk = *v.get(k);
            let col = &self.data[k * m..(k + 1) * m];
            for (o, &a) in out.as_mut_slice().iter_mut().zip(col.iter()) {
                *o = *o + a * vk;
            }
        }
        out
    }

    /// Transpose-vector product `Aᵀ v`.
    pub fn tmul_vec(&self, v: &impl VectorRef<T>) -> Vector<T> {
        assert_eq!(
            self.nrows,
            v.len(),
            "dimension mismatch: ({}x{})ᵀ * vector of length {}",
            self.nrows,
            self.ncols,
            v.len(),
        );
        (0..self.ncols).map(|j| self.col(j).dot(v)).collect()
    }

    /// `Aᵀ B` without forming the transpose.
    ///
    /// ```
    /// use scalar_kalman::Matrix;
    /// let a = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    /// let b = Matrix::from_rows(2, 1, &[1.0, 1.0]);
    /// assert_eq!(a.tmul(&b), &a.transpose() * &b);
    /// ```
    pub fn tmul(&self, rhs: &Matrix<T>) -> Matrix<T> {
        assert_eq!(
            self.nrows, rhs.nrows,
            "dimension mismatch: ({}x{})ᵀ * {}x{}",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        Matrix::from_fn(self.ncols, rhs.ncols, |i, j| self.col(i).dot(&rhs.col(j)))
    }

    /// `A Bᵀ` without forming the transpose.
    pub fn mul_t(&self, rhs: &Matrix<T>) -> Matrix<T> {
        assert_eq!(
            self.ncols, rhs.ncols,
            "dimension mismatch: {}x{} * ({}x{})ᵀ",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        let (m, p) = (self.nrows, rhs.nrows);
        let mut out = Matrix::zeros(m, p);
        for k in 0..self.ncols {
            let a_col = &self.data[k * m..(k + 1) * m];
            let b_col = &rhs.data[k * p..(k + 1) * p];
            for (j, &b) in b_col.iter().enumerate() {
                if b == T::zero() {
                    continue;
                }
                let c_col = &mut out.data[j * m..(j + 1) * m];
                for (c, &a) in c_col.iter_mut().zip(a_col.iter()) {
                    *c = *c + a * b;
                }
            }
        }
        out
    }

    /// `Aᵀ A`, symmetric by construction.
    pub fn inner(&self) -> SpdMatrix<T> {
        let n = self.ncols;
        let mut out = Matrix::zeros(n, n);
        for j in 0..n {
            for i in 0..=j {
                let x = self.col(i).dot(&self.col(j));
                out[(i, j)] = x;
                out[(j, i)] = x;
            }
        }
        SpdMatrix::from_symmetric(out)
    }

    /// `A Aᵀ`, symmetric by construction.
    pub fn outer(&self) -> SpdMatrix<T> {
        let n = self.nrows;
        let mut out = Matrix::zeros(n, n);
        for j in 0..n {
            for i in 0..=j {
                let x = self.row(i).dot(&self.row(j));
                out[(i, j)] = x;
                out[(j, i)] = x;
            }
        }
        SpdMatrix::from_symmetric(out)
    }

    /// Rank-one update `A += scale · u vᵀ`.
    ///
    /// Accepts owning vectors and views in any combination.
    ///
    /// ```
    /// use scalar_kalman::{Matrix, Vector};
    /// let mut m = Matrix::<f64>::zeros(2, 2);
    /// let u = Vector::from_slice(&[1.0, 2.0]);
    /// m.add_outer(&u, &u.view(), 0.5);
    /// assert_eq!(m[(1, 0)], 1.0);
    /// assert_eq!(m[(1, 1)], 2.0);
    /// ```
    pub fn add_outer(
        &mut self,
        u: &impl VectorRef<T>,
        v: &impl VectorRef<T>,
        scale: T,
    ) -> &mut Self {
        assert_eq!(
            (self.nrows, self.ncols),
            (u.len(), v.len()),
            "dimension mismatch: {}x{} += outer({}, {})",
            self.nrows,
            self.ncols,
            u.len(),
            v.len(),
        );
        let m = self.nrows;
        for j in 0..self.ncols {
            let sv = scale * *v.get(j);
            if sv == T::zero() {
                continue;
            }
            let col = &mut self.data[j * m..(j + 1) * m];
            for (i, c) in col.iter_mut().enumerate() {
                *c = *c + *u.get(i) * sv;
            }
        }
        self
    }

    /// Transpose: (M×N) → (N×M).
    pub fn transpose(&self) -> Matrix<T> {
        Matrix::from_fn(self.ncols, self.nrows, |i, j| self[(j, i)])
    }

    /// Element-wise (Hadamard) product.
    pub fn element_mul(&self, rhs: &Matrix<T>) -> Matrix<T> {
        self.zip_map(rhs, ".*", |a, b| a * b)
    }
}
