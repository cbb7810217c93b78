use core::ops::{Index, IndexMut};

use crate::traits::{Scalar, VectorMut, VectorRef};

use super::Vector;

#[inline]
fn check_extent(available: usize, len: usize, stride: usize) {
    if len > 0 {
        assert!(stride > 0, "view stride must be positive");
        assert!(
            (len - 1) * stride < available,
            "view of {} elements with stride {} exceeds {} available",
            len,
            stride,
            available
        );
    }
}

/// Non-owning, read-only strided window onto a sequence of elements.
///
/// Produced by [`Matrix::row`](super::Matrix::row),
/// [`Matrix::col`](super::Matrix::col), [`Vector::view`] and friends.
/// Element `i` lives at `data[i * stride]`. Arithmetic goes through
/// [`VectorRef`], so a view can be passed anywhere an owning
/// [`Vector`] is accepted by reference.
///
/// ```
/// use scalar_kalman::{Matrix, Vector};
///
/// let m = Matrix::from_rows(2, 2, &[1.0_f64, 2.0, 3.0, 4.0]);
/// let v = Vector::from_slice(&[1.0, 1.0]);
/// assert_eq!(m.row(1).dot(&v), 7.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct VectorView<'a, T> {
    data: &'a [T],
    len: usize,
    stride: usize,
}

impl<'a, T> VectorView<'a, T> {
    /// View `len` elements of `data` spaced `stride` apart.
    ///
    /// Panics if the view would run past the end of `data`.
    #[inline]
    pub fn new(data: &'a [T], len: usize, stride: usize) -> Self {
        check_extent(data.len(), len, stride);
        Self { data, len, stride }
    }

    /// Number of elements in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distance between consecutive elements in the underlying storage.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Iterate over the viewed elements.
    pub fn iter(&self) -> impl Iterator<Item = &'a T> + '_ {
        let (data, stride) = (self.data, self.stride);
        (0..self.len).map(move |i| &data[i * stride])
    }
}

impl<T: Scalar> VectorView<'_, T> {
    /// Copy the viewed elements into an owning [`Vector`].
    pub fn to_vector(&self) -> Vector<T> {
        self.iter().copied().collect()
    }

    /// Dot product with any vector-like.
    pub fn dot(&self, rhs: &impl VectorRef<T>) -> T {
        crate::traits::dot(self, rhs)
    }
}

impl<T> VectorRef<T> for VectorView<'_, T> {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, i: usize) -> &T {
        assert!(i < self.len, "index {} out of range for view of length {}", i, self.len);
        &self.data[i * self.stride]
    }
}

impl<T> Index<usize> for VectorView<'_, T> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        VectorRef::get(self, i)
    }
}

/// Non-owning, mutable strided window.
///
/// Writes go straight into the underlying vector or matrix. Useful as the
/// right-hand side of the in-place triangular solves in
/// [`linalg`](crate::linalg).
#[derive(Debug)]
pub struct VectorViewMut<'a, T> {
    data: &'a mut [T],
    len: usize,
    stride: usize,
}

impl<'a, T> VectorViewMut<'a, T> {
    /// Mutable view of `len` elements of `data` spaced `stride` apart.
    #[inline]
    pub fn new(data: &'a mut [T], len: usize, stride: usize) -> Self {
        check_extent(data.len(), len, stride);
        Self { data, len, stride }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reborrow as a read-only view.
    #[inline]
    pub fn as_view(&self) -> VectorView<'_, T> {
        VectorView {
            data: &self.data[..],
            len: self.len,
            stride: self.stride,
        }
    }
}

impl<T: Scalar> VectorViewMut<'_, T> {
    /// Overwrite the viewed elements with `src`.
    pub fn assign(&mut self, src: &impl VectorRef<T>) {
        assert_eq!(self.len, src.len(), "view length mismatch");
        for i in 0..self.len {
            self.data[i * self.stride] = *src.get(i);
        }
    }

    /// Multiply every viewed element by `s`.
    pub fn scale(&mut self, s: T) {
        for i in 0..self.len {
            let x = &mut self.data[i * self.stride];
            *x = *x * s;
        }
    }

    /// `self += a * x`.
    pub fn axpy(&mut self, a: T, x: &impl VectorRef<T>) {
        assert_eq!(self.len, x.len(), "view length mismatch");
        for i in 0..self.len {
            let y = &mut self.data[i * self.stride];
            *y = *y + a * *x.get(i);
        }
    }

    /// Copy into an owning [`Vector`].
    pub fn to_vector(&self) -> Vector<T> {
        self.as_view().to_vector()
    }
}

impl<T> VectorRef<T> for VectorViewMut<'_, T> {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn get(&self, i: usize) -> &T {
        assert!(i < self.len, "index {} out of range for view of length {}", i, self.len);
        &self.data[i * self.stride]
    }
}

impl<T> VectorMut<T> for VectorViewMut<'_, T> {
    #[inline]
    fn get_mut(&mut self, i: usize) -> &mut T {
        assert!(i < self.len, "index {} out of range for view of length {}", i, self.len);
        &mut self.data[i * self.stride]
    }
}

impl<T> Index<usize> for VectorViewMut<'_, T> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        VectorRef::get(self, i)
    }
}

impl<T> IndexMut<usize> for VectorViewMut<'_, T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        VectorMut::get_mut(self, i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Matrix;

    #[test]
    fn strided_view_reads_row() {
        let m = Matrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let row: alloc::vec::Vec<f64> = m.row(0).iter().copied().collect();
        assert_eq!(row, [1.0, 2.0, 3.0]);
        assert_eq!(m.row(0).stride(), 2);
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn view_past_end_panics() {
        let data = [1.0, 2.0, 3.0];
        let _ = VectorView::new(&data, 3, 2);
    }

    #[test]
    fn view_dot_matches_vector_dot() {
        let v = Vector::from_slice(&[1.0, 2.0, 3.0]);
        let w = Vector::from_slice(&[4.0, 5.0, 6.0]);
        assert_eq!(v.view().dot(&w), v.dot(&w));
        assert_eq!(v.view().dot(&w.view()), 32.0);
    }

    #[test]
    fn mutable_view_axpy_and_scale() {
        let mut m = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        {
            let mut r = m.row_mut(0);
            r.axpy(2.0, &Vector::from_slice(&[1.0, 1.0]));
            r.scale(0.5);
        }
        assert_eq!(m[(0, 0)], 1.5);
        assert_eq!(m[(0, 1)], 2.0);
        assert_eq!(m[(1, 0)], 3.0);
    }

    #[test]
    fn assign_copies_values() {
        let mut v = Vector::<f64>::zeros(3);
        v.view_mut().assign(&Vector::from_slice(&[7.0, 8.0, 9.0]));
        assert_eq!(v.as_slice(), &[7.0, 8.0, 9.0]);
    }
}
