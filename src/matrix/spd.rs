use core::ops::{AddAssign, Deref, Mul, MulAssign, SubAssign};

use crate::linalg::{require_len, CholeskyDecomposition, LinalgError};
use crate::traits::{FloatScalar, MatrixRef, Scalar, VectorRef};

use super::{Matrix, Vector};

/// Symmetric (positive-definite) matrix.
///
/// Wraps a square [`Matrix`] and keeps `M(i, j) == M(j, i)` exactly: every
/// mutator writes the upper triangle and mirrors it into the lower one.
/// Read access to the underlying matrix goes through `Deref`, so all
/// non-mutating `Matrix` methods are available.
///
/// Positive definiteness is not checked on construction; the
/// Cholesky-backed operations report [`LinalgError::NotPositiveDefinite`].
///
/// ```
/// use scalar_kalman::{SpdMatrix, Vector};
///
/// let mut p = SpdMatrix::<f64>::identity(2);
/// p.add_outer(&Vector::from_slice(&[1.0, 2.0]), 0.5);
/// assert_eq!(p[(0, 1)], p[(1, 0)]);
/// assert_eq!(p[(1, 1)], 3.0);
///
/// let x = p.solve(&Vector::from_slice(&[1.5, 1.0])).unwrap();
/// assert!((x[0] - 1.0).abs() < 1e-12);
/// assert!(x[1].abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SpdMatrix<T> {
    m: Matrix<T>,
}

impl<T: Scalar> SpdMatrix<T> {
    /// `n × n` zero matrix.
    pub fn zeros(n: usize) -> Self {
        Self {
            m: Matrix::zeros(n, n),
        }
    }

    /// `n × n` identity.
    pub fn identity(n: usize) -> Self {
        Self { m: Matrix::eye(n) }
    }

    /// `n × n` matrix with `value` on the diagonal.
    pub fn scaled_identity(n: usize, value: T) -> Self {
        let mut m = Matrix::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = value;
        }
        Self { m }
    }

    /// Diagonal matrix from a vector-like.
    pub fn from_diag(v: &impl VectorRef<T>) -> Self {
        Self {
            m: Matrix::from_diag(v),
        }
    }

    /// Wrap a matrix, checking that it is square and exactly symmetric.
    pub fn new(m: Matrix<T>) -> Result<Self, LinalgError> {
        if !m.is_square() {
            return Err(LinalgError::NotSquare {
                nrows: m.nrows(),
                ncols: m.ncols(),
            });
        }
        if !m.is_symmetric() {
            return Err(LinalgError::NotSymmetric);
        }
        Ok(Self { m })
    }

    /// Wrap a matrix the caller has built symmetric.
    pub(crate) fn from_symmetric(m: Matrix<T>) -> Self {
        debug_assert!(m.is_symmetric());
        Self { m }
    }

    /// Row/column dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.m.nrows()
    }

    /// The underlying matrix.
    #[inline]
    pub fn as_matrix(&self) -> &Matrix<T> {
        &self.m
    }

    pub fn into_matrix(self) -> Matrix<T> {
        self.m
    }

    fn mirror_upper(&mut self) {
        let n = self.dim();
        for j in 0..n {
            for i in 0..j {
                self.m[(j, i)] = self.m[(i, j)];
            }
        }
    }

    /// Set `M(i, j)` and `M(j, i)` to `x`.
    pub fn set(&mut self, i: usize, j: usize, x: T) -> &mut Self {
        self.m[(i, j)] = x;
        self.m[(j, i)] = x;
        self
    }

    /// Set every element to zero.
    pub fn set_zero(&mut self) {
        self.m.set_all(T::zero());
    }

    /// `M += w · v vᵀ`.
    pub fn add_outer(&mut self, v: &impl VectorRef<T>, w: T) -> &mut Self {
        assert_eq!(v.len(), self.dim(), "dimension mismatch in add_outer");
        let n = self.dim();
        for j in 0..n {
            let wvj = w * *v.get(j);
            for i in 0..=j {
                self.m[(i, j)] = self.m[(i, j)] + *v.get(i) * wvj;
            }
        }
        self.mirror_upper();
        self
    }

    /// `M += w · XᵀX`.
    pub fn add_inner(&mut self, x: &Matrix<T>, w: T) -> &mut Self {
        assert_eq!(x.ncols(), self.dim(), "dimension mismatch in add_inner");
        let n = self.dim();
        for j in 0..n {
            for i in 0..=j {
                let xij = x.col(i).dot(&x.col(j));
                self.m[(i, j)] = self.m[(i, j)] + w * xij;
            }
        }
        self.mirror_upper();
        self
    }

    /// `M += Xᵀ diag(weights) X`.
    pub fn add_inner_weighted(&mut self, x: &Matrix<T>, weights: &impl VectorRef<T>) -> &mut Self {
        assert_eq!(x.ncols(), self.dim(), "dimension mismatch in add_inner_weighted");
        assert_eq!(weights.len(), x.nrows(), "one weight per row required");
        let n = self.dim();
        for j in 0..n {
            for i in 0..=j {
                let mut s = T::zero();
                for k in 0..x.nrows() {
                    s = s + x[(k, i)] * *weights.get(k) * x[(k, j)];
                }
                self.m[(i, j)] = self.m[(i, j)] + s;
            }
        }
        self.mirror_upper();
        self
    }

    /// `M += w · (AᵀB + BᵀA)`.
    pub fn add_inner2(&mut self, a: &Matrix<T>, b: &Matrix<T>, w: T) -> &mut Self {
        assert_eq!(
            (a.nrows(), a.ncols()),
            (b.nrows(), b.ncols()),
            "dimension mismatch in add_inner2"
        );
        assert_eq!(a.ncols(), self.dim(), "dimension mismatch in add_inner2");
        let n = self.dim();
        for j in 0..n {
            for i in 0..=j {
                let s = a.col(i).dot(&b.col(j)) + b.col(i).dot(&a.col(j));
                self.m[(i, j)] = self.m[(i, j)] + w * s;
            }
        }
        self.mirror_upper();
        self
    }

    /// `A M Aᵀ`, symmetric by construction.
    pub fn sandwich(&self, a: &Matrix<T>) -> SpdMatrix<T> {
        assert_eq!(a.ncols(), self.dim(), "dimension mismatch in sandwich");
        let am = a * &self.m;
        let k = a.nrows();
        let mut out = Matrix::zeros(k, k);
        for j in 0..k {
            for i in 0..=j {
                let x = am.row(i).dot(&a.row(j));
                out[(i, j)] = x;
                out[(j, i)] = x;
            }
        }
        SpdMatrix { m: out }
    }

    /// `vᵀ M v`.
    pub fn quad_form(&self, v: &impl VectorRef<T>) -> T {
        assert_eq!(v.len(), self.dim(), "dimension mismatch in quad_form");
        let n = self.dim();
        let mut s = T::zero();
        for j in 0..n {
            s = s + *v.get(j) * self.m.col(j).dot(v);
        }
        s
    }

    /// `M v`.
    pub fn mul_vec(&self, v: &impl VectorRef<T>) -> Vector<T> {
        self.m.mul_vec(v)
    }
}

impl<T: FloatScalar> SpdMatrix<T> {
    /// Cholesky factorization.
    pub fn chol(&self) -> Result<CholeskyDecomposition<T>, LinalgError> {
        CholeskyDecomposition::new(&self.m)
    }

    /// Inverse through Cholesky; exactly symmetric.
    pub fn inv(&self) -> Result<SpdMatrix<T>, LinalgError> {
        Ok(self.chol()?.inverse())
    }

    /// `ln det M` through Cholesky.
    pub fn logdet(&self) -> Result<T, LinalgError> {
        Ok(self.chol()?.ln_det())
    }

    /// Solve `M x = b` through Cholesky.
    pub fn solve(&self, b: &impl VectorRef<T>) -> Result<Vector<T>, LinalgError> {
        require_len(self.dim(), b.len())?;
        Ok(self.chol()?.solve(b))
    }

    /// Solve `M X = B` through Cholesky.
    pub fn solve_matrix(&self, b: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
        self.chol()?.solve_matrix(b)
    }

    /// Whether every element is finite.
    pub fn is_finite(&self) -> bool {
        self.m.is_finite()
    }
}

impl<T> Deref for SpdMatrix<T> {
    type Target = Matrix<T>;

    #[inline]
    fn deref(&self) -> &Matrix<T> {
        &self.m
    }
}

impl<T> MatrixRef<T> for SpdMatrix<T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.m.nrows()
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.m.ncols()
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> &T {
        MatrixRef::get(&self.m, row, col)
    }

    #[inline]
    fn col_as_slice(&self, col: usize, row_start: usize) -> &[T] {
        self.m.col_as_slice(col, row_start)
    }
}

impl<T: Scalar> AddAssign<&SpdMatrix<T>> for SpdMatrix<T> {
    fn add_assign(&mut self, rhs: &SpdMatrix<T>) {
        self.m += &rhs.m;
    }
}

impl<T: Scalar> SubAssign<&SpdMatrix<T>> for SpdMatrix<T> {
    fn sub_assign(&mut self, rhs: &SpdMatrix<T>) {
        self.m -= &rhs.m;
    }
}

impl<T: Scalar> MulAssign<T> for SpdMatrix<T> {
    fn mul_assign(&mut self, rhs: T) {
        self.m *= rhs;
    }
}

impl<T: Scalar> Mul<T> for &SpdMatrix<T> {
    type Output = SpdMatrix<T>;
    fn mul(self, rhs: T) -> SpdMatrix<T> {
        SpdMatrix { m: &self.m * rhs }
    }
}

impl<T> From<SpdMatrix<T>> for Matrix<T> {
    fn from(s: SpdMatrix<T>) -> Matrix<T> {
        s.m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    fn spd() -> SpdMatrix<f64> {
        SpdMatrix::new(Matrix::from_rows(
            3,
            3,
            &[4.0, 2.0, 1.0, 2.0, 10.0, 3.5, 1.0, 3.5, 4.5],
        ))
        .unwrap()
    }

    #[test]
    fn new_rejects_asymmetric_and_rectangular() {
        let asym = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(SpdMatrix::new(asym).unwrap_err(), LinalgError::NotSymmetric);
        assert_eq!(
            SpdMatrix::new(Matrix::<f64>::zeros(2, 3)).unwrap_err(),
            LinalgError::NotSquare { nrows: 2, ncols: 3 }
        );
    }

    #[test]
    fn set_writes_both_halves() {
        let mut s = SpdMatrix::<f64>::zeros(3);
        s.set(0, 2, 5.0);
        assert_eq!(s[(2, 0)], 5.0);
        assert_eq!(s[(0, 2)], 5.0);
    }

    #[test]
    fn add_outer_matches_explicit() {
        let mut s = spd();
        let v = Vector::from_slice(&[1.0, -2.0, 0.5]);
        s.add_outer(&v, 2.0);
        let expected = &*spd() + &(&v.outer(&v) * 2.0);
        assert_eq!(*s, expected);
        assert!(s.is_symmetric());
    }

    #[test]
    fn add_inner_variants() {
        let x = Matrix::from_rows(
            4,
            3,
            &[1.0, 2.0, 0.0, -1.0, 0.5, 3.0, 2.0, 2.0, 1.0, 0.0, 1.0, -1.0],
        );

        let mut a = SpdMatrix::zeros(3);
        a.add_inner(&x, 2.0);
        let expected = &x.tmul(&x) * 2.0;
        assert_eq!(*a, expected);

        let w = Vector::from_slice(&[1.0, 2.0, 0.5, 3.0]);
        let mut b = SpdMatrix::zeros(3);
        b.add_inner_weighted(&x, &w);
        let mut wx = x.clone();
        for k in 0..4 {
            wx.row_mut(k).scale(w[k]);
        }
        let expected = x.tmul(&wx);
        for (p, q) in b.iter().zip(expected.iter()) {
            assert!(approx_eq(*p, *q, 1e-12));
        }
        assert!(b.is_symmetric());

        let y = Matrix::from_fn(4, 3, |i, j| (i + 2 * j) as f64);
        let mut c = SpdMatrix::zeros(3);
        c.add_inner2(&x, &y, 0.5);
        let expected = &(&x.tmul(&y) + &y.tmul(&x)) * 0.5;
        for (p, q) in c.iter().zip(expected.iter()) {
            assert!(approx_eq(*p, *q, 1e-12));
        }
        assert!(c.is_symmetric());
    }

    #[test]
    fn sandwich_and_quad_form() {
        let s = spd();
        let a = Matrix::from_rows(2, 3, &[1.0, 0.0, 1.0, 0.5, -1.0, 2.0]);
        let sw = s.sandwich(&a);
        let expected = (&a * &*s).mul_t(&a);
        for (p, q) in sw.iter().zip(expected.iter()) {
            assert!(approx_eq(*p, *q, 1e-12));
        }
        assert!(sw.is_symmetric());

        let v = Vector::from_slice(&[1.0, 2.0, 3.0]);
        assert!(approx_eq(s.quad_form(&v), v.dot(&s.mul_vec(&v)), 1e-12));
    }

    #[test]
    fn cholesky_backed_ops() {
        let s = spd();
        let inv = s.inv().unwrap();
        assert!(inv.is_symmetric());
        let id = &*s * &*inv;
        for i in 0..3 {
            for j in 0..3 {
                let e = if i == j { 1.0 } else { 0.0 };
                assert!(approx_eq(id[(i, j)], e, 1e-10));
            }
        }
        assert!(approx_eq(s.logdet().unwrap(), s.det().ln(), 1e-10));

        let b = Vector::from_slice(&[1.0, 0.0, -1.0]);
        let x = s.solve(&b).unwrap();
        let r = s.mul_vec(&x);
        for i in 0..3 {
            assert!(approx_eq(r[i], b[i], 1e-12));
        }

        let bm = Matrix::from_rows(3, 2, &[1.0, 0.0, 0.0, 1.0, -1.0, 0.0]);
        let xm = s.solve_matrix(&bm).unwrap();
        assert!(approx_eq(xm[(0, 0)], x[0], 1e-12));
    }

    #[test]
    fn indefinite_reports_error() {
        let mut s = SpdMatrix::<f64>::identity(2);
        s.set(0, 1, 3.0);
        assert_eq!(s.inv().unwrap_err(), LinalgError::NotPositiveDefinite);
        assert_eq!(s.logdet().unwrap_err(), LinalgError::NotPositiveDefinite);
    }

    #[test]
    fn arithmetic_keeps_symmetry() {
        let mut s = spd();
        s += &SpdMatrix::identity(3);
        s -= &SpdMatrix::scaled_identity(3, 0.5);
        s *= 2.0;
        assert_eq!(s[(0, 0)], 9.0);
        assert_eq!(s[(0, 1)], 4.0);
        assert!(s.is_symmetric());
        let t = &s * 0.5;
        assert_eq!(t[(1, 1)], 10.5);
    }
}
