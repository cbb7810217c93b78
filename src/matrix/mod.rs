mod ops;
mod spd;
mod square;
mod vector;
mod view;

pub use spd::SpdMatrix;
pub use vector::Vector;
pub use view::{VectorView, VectorViewMut};

use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

use crate::traits::{MatrixMut, MatrixRef, Scalar, VectorRef};

/// Dense heap-allocated matrix with runtime dimensions.
///
/// Column-major `Vec<T>` storage. Dimensions are fixed at construction and
/// only change through [`resize`](Matrix::resize) or reassignment.
/// Implements [`MatrixRef`] and [`MatrixMut`], so all generic linalg free
/// functions work with `Matrix` directly.
///
/// Columns are contiguous, so [`col`](Matrix::col) views have unit stride;
/// [`row`](Matrix::row) views stride by `nrows`. Neither copies.
///
/// # Examples
///
/// ```
/// use scalar_kalman::Matrix;
///
/// let a = Matrix::from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
/// assert_eq!(a[(0, 1)], 2.0);
/// assert_eq!(a.nrows(), 2);
///
/// let r = a.row(1);
/// assert_eq!(r[0], 3.0);
/// assert_eq!(r[1], 4.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    data: Vec<T>,
    nrows: usize,
    ncols: usize,
}

// ── Constructors ────────────────────────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// Create an `nrows x ncols` matrix of zeros.
    ///
    /// ```
    /// use scalar_kalman::Matrix;
    /// let m = Matrix::<f64>::zeros(2, 3);
    /// assert_eq!(m.ncols(), 3);
    /// assert_eq!(m[(1, 2)], 0.0);
    /// ```
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![T::zero(); nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Create a matrix filled with `value`.
    pub fn fill(nrows: usize, ncols: usize, value: T) -> Self {
        Self {
            data: vec![value; nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Create an `n x n` identity matrix.
    pub fn eye(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = T::one();
        }
        m
    }

    /// Create a matrix from a flat slice in column-major order.
    ///
    /// Panics if `slice.len() != nrows * ncols`.
    pub fn from_slice(nrows: usize, ncols: usize, slice: &[T]) -> Self {
        assert_eq!(
            slice.len(),
            nrows * ncols,
            "slice length {} does not match {}x{} matrix",
            slice.len(),
            nrows,
            ncols,
        );
        Self {
            data: slice.to_vec(),
            nrows,
            ncols,
        }
    }

    /// Create a matrix from a flat slice in row-major order.
    ///
    /// Panics if `row_major.len() != nrows * ncols`.
    ///
    /// ```
    /// use scalar_kalman::Matrix;
    /// let m = Matrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    /// assert_eq!(m[(0, 2)], 3.0);
    /// assert_eq!(m[(1, 0)], 4.0);
    /// ```
    pub fn from_rows(nrows: usize, ncols: usize, row_major: &[T]) -> Self {
        assert_eq!(
            row_major.len(),
            nrows * ncols,
            "slice length {} does not match {}x{} matrix",
            row_major.len(),
            nrows,
            ncols,
        );
        let mut data = vec![T::zero(); nrows * ncols];
        for i in 0..nrows {
            for j in 0..ncols {
                data[j * nrows + i] = row_major[i * ncols + j];
            }
        }
        Self { data, nrows, ncols }
    }

    /// Create a matrix from an owned `Vec<T>` in column-major order.
    ///
    /// Panics if `data.len() != nrows * ncols`.
    pub fn from_vec(nrows: usize, ncols: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            nrows * ncols,
            "vec length {} does not match {}x{} matrix",
            data.len(),
            nrows,
            ncols,
        );
        Self { data, nrows, ncols }
    }

    /// Change the dimensions, discarding the contents (all zeros after).
    pub fn resize(&mut self, nrows: usize, ncols: usize) {
        self.data.clear();
        self.data.resize(nrows * ncols, T::zero());
        self.nrows = nrows;
        self.ncols = ncols;
    }

    /// Set every element to `value`.
    pub fn set_all(&mut self, value: T) {
        for x in self.data.iter_mut() {
            *x = value;
        }
    }

    /// Copy of row `i` as an owning [`Vector`].
    pub fn row_vector(&self, i: usize) -> Vector<T> {
        self.row(i).to_vector()
    }

    /// Copy of column `j` as an owning [`Vector`].
    pub fn col_vector(&self, j: usize) -> Vector<T> {
        self.col(j).to_vector()
    }

    /// Overwrite row `i` with `v`.
    pub fn set_row(&mut self, i: usize, v: &impl VectorRef<T>) {
        assert_eq!(v.len(), self.ncols, "row length mismatch");
        for j in 0..self.ncols {
            self[(i, j)] = *v.get(j);
        }
    }

    /// Overwrite column `j` with `v`.
    pub fn set_col(&mut self, j: usize, v: &impl VectorRef<T>) {
        assert_eq!(v.len(), self.nrows, "column length mismatch");
        for i in 0..self.nrows {
            self[(i, j)] = *v.get(i);
        }
    }
}

impl<T> Matrix<T> {
    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Whether the matrix is square.
    #[inline]
    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    /// Create a matrix by calling `f(row, col)` for each element.
    ///
    /// ```
    /// use scalar_kalman::Matrix;
    /// let m = Matrix::from_fn(3, 3, |i, j| if i == j { 1.0_f64 } else { 0.0 });
    /// assert_eq!(m[(0, 0)], 1.0);
    /// assert_eq!(m[(0, 1)], 0.0);
    /// ```
    pub fn from_fn(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(nrows * ncols);
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self { data, nrows, ncols }
    }

    /// The whole matrix as a flat column-major slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The whole matrix as a mutable flat column-major slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterate over all elements in column-major order.
    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Row `i` as a strided view (no copy).
    #[inline]
    pub fn row(&self, i: usize) -> VectorView<'_, T> {
        assert!(i < self.nrows, "row {} out of range for {} rows", i, self.nrows);
        VectorView::new(&self.data[i..], self.ncols, self.nrows)
    }

    /// Mutable view of row `i`.
    #[inline]
    pub fn row_mut(&mut self, i: usize) -> VectorViewMut<'_, T> {
        assert!(i < self.nrows, "row {} out of range for {} rows", i, self.nrows);
        let (ncols, stride) = (self.ncols, self.nrows);
        VectorViewMut::new(&mut self.data[i..], ncols, stride)
    }

    /// Column `j` as a contiguous view (no copy).
    #[inline]
    pub fn col(&self, j: usize) -> VectorView<'_, T> {
        assert!(j < self.ncols, "column {} out of range for {} columns", j, self.ncols);
        let start = j * self.nrows;
        VectorView::new(&self.data[start..start + self.nrows], self.nrows, 1)
    }

    /// Mutable view of column `j`.
    #[inline]
    pub fn col_mut(&mut self, j: usize) -> VectorViewMut<'_, T> {
        assert!(j < self.ncols, "column {} out of range for {} columns", j, self.ncols);
        let n = self.nrows;
        let start = j * n;
        VectorViewMut::new(&mut self.data[start..start + n], n, 1)
    }

    /// Diagonal as a strided view.
    #[inline]
    pub fn diag(&self) -> VectorView<'_, T> {
        let n = self.nrows.min(self.ncols);
        VectorView::new(&self.data, n, self.nrows + 1)
    }
}

// ── MatrixRef / MatrixMut ───────────────────────────────────────────

impl<T> MatrixRef<T> for Matrix<T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> &T {
        &self.data[col * self.nrows + row]
    }

    #[inline]
    fn col_as_slice(&self, col: usize, row_start: usize) -> &[T] {
        let start = col * self.nrows + row_start;
        let end = col * self.nrows + self.nrows;
        &self.data[start..end]
    }
}

impl<T> MatrixMut<T> for Matrix<T> {
    #[inline]
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        &mut self.data[col * self.nrows + row]
    }

    #[inline]
    fn col_as_mut_slice(&mut self, col: usize, row_start: usize) -> &mut [T] {
        let start = col * self.nrows + row_start;
        let end = col * self.nrows + self.nrows;
        &mut self.data[start..end]
    }
}

// ── Index ───────────────────────────────────────────────────────────

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &T {
        debug_assert!(row < self.nrows && col < self.ncols);
        &self.data[col * self.nrows + row]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        debug_assert!(row < self.nrows && col < self.ncols);
        &mut self.data[col * self.nrows + row]
    }
}

impl<'a, T> IntoIterator for &'a Matrix<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros() {
        let m = Matrix::<f64>::zeros(3, 4);
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 4);
        assert!(m.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn empty_matrix() {
        let m = Matrix::<f64>::zeros(0, 0);
        assert_eq!(m.nrows(), 0);
        assert_eq!(m.ncols(), 0);
        assert!(m.is_square());
    }

    #[test]
    fn eye() {
        let m = Matrix::<f64>::eye(3);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_eq!(m[(i, j)], expected);
            }
        }
    }

    #[test]
    fn from_rows_is_column_major_internally() {
        let m = Matrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(m[(1, 2)], 6.0);
    }

    #[test]
    #[should_panic(expected = "slice length")]
    fn from_rows_wrong_length() {
        let _ = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn row_and_col_views() {
        let m = Matrix::from_rows(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let r = m.row(1);
        assert_eq!(r.len(), 2);
        assert_eq!(r[0], 3.0);
        assert_eq!(r[1], 4.0);

        let c = m.col(1);
        assert_eq!(c.len(), 3);
        assert_eq!(c[0], 2.0);
        assert_eq!(c[2], 6.0);

        let d = m.diag();
        assert_eq!(d.len(), 2);
        assert_eq!(d[0], 1.0);
        assert_eq!(d[1], 4.0);
    }

    #[test]
    fn mutable_views_write_through() {
        let mut m = Matrix::<f64>::zeros(2, 3);
        m.row_mut(1)[2] = 7.0;
        m.col_mut(0)[0] = 5.0;
        assert_eq!(m[(1, 2)], 7.0);
        assert_eq!(m[(0, 0)], 5.0);
    }

    #[test]
    fn set_row_and_col() {
        let mut m = Matrix::<f64>::zeros(2, 2);
        m.set_row(0, &Vector::from_slice(&[1.0, 2.0]));
        m.set_col(1, &Vector::from_slice(&[9.0, 8.0]));
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(0, 1)], 9.0);
        assert_eq!(m[(1, 1)], 8.0);
    }

    #[test]
    fn resize_discards_contents() {
        let mut m = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        m.resize(3, 1);
        assert_eq!(m.nrows(), 3);
        assert_eq!(m.ncols(), 1);
        assert!(m.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn matrix_ref_trait() {
        let m = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        fn trace<T: Scalar>(m: &impl MatrixRef<T>) -> T {
            let mut sum = T::zero();
            for i in 0..m.nrows().min(m.ncols()) {
                sum = sum + *m.get(i, i);
            }
            sum
        }
        assert_eq!(trace(&m), 5.0);
        assert_eq!(m.col_as_slice(1, 1), &[4.0]);
    }
}
