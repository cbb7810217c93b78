use alloc::vec;
use alloc::vec::Vec;
use core::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign,
};

use crate::traits::{FloatScalar, Scalar, VectorMut, VectorRef};

use super::view::{VectorView, VectorViewMut};
use super::{Matrix, SpdMatrix};

/// Dynamically-sized owning vector of scalars.
///
/// # Examples
///
/// ```
/// use scalar_kalman::Vector;
///
/// let v = Vector::from_slice(&[1.0_f64, 2.0, 3.0]);
/// assert_eq!(v[0], 1.0);
/// assert_eq!(v.len(), 3);
/// assert!((v.dot(&v) - 14.0).abs() < 1e-12);
///
/// let outer = v.outer(&v);
/// assert_eq!(outer[(1, 2)], 6.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vector<T> {
    data: Vec<T>,
}

impl<T: Scalar> Vector<T> {
    /// Create a vector from a flat slice.
    pub fn from_slice(data: &[T]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    /// Create a vector from an owned `Vec`.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    /// Create a zero vector of length `n`.
    pub fn zeros(n: usize) -> Self {
        Self {
            data: vec![T::zero(); n],
        }
    }

    /// Create a vector of length `n` filled with `value`.
    pub fn fill(n: usize, value: T) -> Self {
        Self {
            data: vec![value; n],
        }
    }

    /// The `i`-th standard basis vector of length `n`.
    pub fn basis(n: usize, i: usize) -> Self {
        assert!(i < n, "basis index {} out of range for length {}", i, n);
        let mut v = Self::zeros(n);
        v.data[i] = T::one();
        v
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the vector is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Dot product with any vector-like (owning vector or view).
    ///
    /// ```
    /// use scalar_kalman::Vector;
    /// let a = Vector::from_slice(&[1.0, 2.0, 3.0]);
    /// let b = Vector::from_slice(&[4.0, 5.0, 6.0]);
    /// assert_eq!(a.dot(&b), 32.0);
    /// ```
    pub fn dot(&self, rhs: &impl VectorRef<T>) -> T {
        crate::traits::dot(self, rhs)
    }

    /// Sum of the elements.
    pub fn sum(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &x| acc + x)
    }

    /// `self += a * x`.
    pub fn axpy(&mut self, a: T, x: &impl VectorRef<T>) -> &mut Self {
        assert_eq!(self.len(), x.len(), "vector length mismatch");
        for (i, y) in self.data.iter_mut().enumerate() {
            *y = *y + a * *x.get(i);
        }
        self
    }

    /// Outer product `self ⊗ rhs` (a `len × rhs.len()` matrix).
    pub fn outer(&self, rhs: &impl VectorRef<T>) -> Matrix<T> {
        Matrix::from_fn(self.len(), rhs.len(), |i, j| self.data[i] * *rhs.get(j))
    }

    /// Self outer product `self ⊗ self`, symmetric by construction.
    pub fn outer_self(&self) -> SpdMatrix<T> {
        let mut out = SpdMatrix::zeros(self.len());
        out.add_outer(self, T::one());
        out
    }

    /// Overwrite every element with `value`.
    pub fn set_all(&mut self, value: T) {
        for x in self.data.iter_mut() {
            *x = value;
        }
    }

    /// Element-wise product.
    pub fn element_mul(&self, rhs: &impl VectorRef<T>) -> Self {
        assert_eq!(self.len(), rhs.len(), "vector length mismatch");
        self.data
            .iter()
            .enumerate()
            .map(|(i, &x)| x * *rhs.get(i))
            .collect()
    }

    /// Append an element.
    pub fn push(&mut self, x: T) {
        self.data.push(x);
    }

    /// Append the elements of another vector-like.
    pub fn concat(&mut self, rhs: &impl VectorRef<T>) {
        self.data.reserve(rhs.len());
        for i in 0..rhs.len() {
            self.data.push(*rhs.get(i));
        }
    }
}

impl<T: FloatScalar> Vector<T> {
    /// Euclidean norm.
    pub fn norm(&self) -> T {
        self.dot(self).sqrt()
    }

    /// Sum of absolute values.
    pub fn abs_norm(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &x| acc + x.abs())
    }

    /// Largest absolute value (0 for an empty vector).
    pub fn max_abs(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &x| acc.max(x.abs()))
    }

    /// Whether every element is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

impl<T> Vector<T> {
    /// View the vector data as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// View the vector data as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterate over the elements.
    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Iterate mutably over the elements.
    #[inline]
    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// Read-only view of the whole vector.
    #[inline]
    pub fn view(&self) -> VectorView<'_, T> {
        VectorView::new(&self.data, self.data.len(), 1)
    }

    /// Mutable view of the whole vector.
    #[inline]
    pub fn view_mut(&mut self) -> VectorViewMut<'_, T> {
        let n = self.data.len();
        VectorViewMut::new(&mut self.data, n, 1)
    }

    /// View of `len` elements starting at `start`.
    #[inline]
    pub fn subvector(&self, start: usize, len: usize) -> VectorView<'_, T> {
        VectorView::new(&self.data[start..start + len], len, 1)
    }

    /// Consume the vector, returning the underlying `Vec`.
    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

// ── VectorRef / VectorMut ───────────────────────────────────────────

impl<T> VectorRef<T> for Vector<T> {
    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn get(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T> VectorMut<T> for Vector<T> {
    #[inline]
    fn get_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

// ── Index ───────────────────────────────────────────────────────────

impl<T> Index<usize> for Vector<T> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T> IndexMut<usize> for Vector<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

// ── Conversions ─────────────────────────────────────────────────────

impl<T> From<Vec<T>> for Vector<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

impl<T> FromIterator<T> for Vector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a Vector<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ── Arithmetic ──────────────────────────────────────────────────────

fn zip_with<T: Scalar>(a: &Vector<T>, b: &Vector<T>, f: impl Fn(T, T) -> T) -> Vector<T> {
    assert_eq!(
        a.len(),
        b.len(),
        "vector length mismatch: {} vs {}",
        a.len(),
        b.len()
    );
    a.data
        .iter()
        .zip(b.data.iter())
        .map(|(&x, &y)| f(x, y))
        .collect()
}

impl<T: Scalar> Add<&Vector<T>> for &Vector<T> {
    type Output = Vector<T>;
    fn add(self, rhs: &Vector<T>) -> Vector<T> {
        zip_with(self, rhs, |a, b| a + b)
    }
}

impl<T: Scalar> Add for Vector<T> {
    type Output = Vector<T>;
    fn add(self, rhs: Vector<T>) -> Vector<T> {
        &self + &rhs
    }
}

impl<T: Scalar> Sub<&Vector<T>> for &Vector<T> {
    type Output = Vector<T>;
    fn sub(self, rhs: &Vector<T>) -> Vector<T> {
        zip_with(self, rhs, |a, b| a - b)
    }
}

impl<T: Scalar> Sub for Vector<T> {
    type Output = Vector<T>;
    fn sub(self, rhs: Vector<T>) -> Vector<T> {
        &self - &rhs
    }
}

impl<T: Scalar> AddAssign<&Vector<T>> for Vector<T> {
    fn add_assign(&mut self, rhs: &Vector<T>) {
        self.axpy(T::one(), rhs);
    }
}

impl<T: Scalar> SubAssign<&Vector<T>> for Vector<T> {
    fn sub_assign(&mut self, rhs: &Vector<T>) {
        self.axpy(T::zero() - T::one(), rhs);
    }
}

impl<T: Scalar + Neg<Output = T>> Neg for Vector<T> {
    type Output = Vector<T>;
    fn neg(self) -> Vector<T> {
        self.data.into_iter().map(|x| -x).collect()
    }
}

impl<T: Scalar> Mul<T> for &Vector<T> {
    type Output = Vector<T>;
    fn mul(self, rhs: T) -> Vector<T> {
        self.data.iter().map(|&x| x * rhs).collect()
    }
}

impl<T: Scalar> Mul<T> for Vector<T> {
    type Output = Vector<T>;
    fn mul(mut self, rhs: T) -> Vector<T> {
        self *= rhs;
        self
    }
}

impl<T: Scalar> MulAssign<T> for Vector<T> {
    fn mul_assign(&mut self, rhs: T) {
        for x in self.data.iter_mut() {
            *x = *x * rhs;
        }
    }
}

impl<T: Scalar> Div<T> for &Vector<T> {
    type Output = Vector<T>;
    fn div(self, rhs: T) -> Vector<T> {
        self.data.iter().map(|&x| x / rhs).collect()
    }
}

impl<T: Scalar> DivAssign<T> for Vector<T> {
    fn div_assign(&mut self, rhs: T) {
        for x in self.data.iter_mut() {
            *x = *x / rhs;
        }
    }
}

macro_rules! impl_scalar_mul_vector {
    ($($t:ty),*) => {
        $(
            impl Mul<Vector<$t>> for $t {
                type Output = Vector<$t>;
                fn mul(self, rhs: Vector<$t>) -> Vector<$t> {
                    rhs * self
                }
            }

            impl Mul<&Vector<$t>> for $t {
                type Output = Vector<$t>;
                fn mul(self, rhs: &Vector<$t>) -> Vector<$t> {
                    rhs * self
                }
            }
        )*
    };
}

impl_scalar_mul_vector!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_slice_and_index() {
        let v = Vector::from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(v.len(), 3);
        assert_eq!(v[2], 3.0);
    }

    #[test]
    fn basis() {
        let e = Vector::<f64>::basis(3, 1);
        assert_eq!(e.as_slice(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn arithmetic() {
        let a = Vector::from_slice(&[1.0, 2.0]);
        let b = Vector::from_slice(&[3.0, 5.0]);
        assert_eq!((&a + &b).as_slice(), &[4.0, 7.0]);
        assert_eq!((&b - &a).as_slice(), &[2.0, 3.0]);
        assert_eq!((2.0_f64 * &a).as_slice(), &[2.0, 4.0]);
        assert_eq!((&b / 2.0).as_slice(), &[1.5, 2.5]);
        assert_eq!((-a).as_slice(), &[-1.0, -2.0]);
    }

    #[test]
    fn axpy_with_view() {
        let mut y = Vector::from_slice(&[1.0, 1.0]);
        let m = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        y.axpy(2.0, &m.col(1));
        assert_eq!(y.as_slice(), &[5.0, 9.0]);
    }

    #[test]
    #[should_panic(expected = "length mismatch")]
    fn add_length_mismatch() {
        let a = Vector::from_slice(&[1.0, 2.0]);
        let b = Vector::from_slice(&[1.0]);
        let _ = &a + &b;
    }

    #[test]
    fn outer_product() {
        let u = Vector::from_slice(&[1.0, 2.0]);
        let v = Vector::from_slice(&[3.0, 4.0, 5.0]);
        let m = u.outer(&v);
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 3);
        assert_eq!(m[(1, 2)], 10.0);

        let s = u.outer_self();
        assert_eq!(s[(0, 1)], 2.0);
        assert_eq!(s[(1, 0)], 2.0);
        assert_eq!(s[(1, 1)], 4.0);
    }

    #[test]
    fn norms() {
        let v = Vector::from_slice(&[3.0_f64, -4.0]);
        assert!((v.norm() - 5.0).abs() < 1e-12);
        assert_eq!(v.abs_norm(), 7.0);
        assert_eq!(v.max_abs(), 4.0);
        assert_eq!(v.sum(), -1.0);
    }

    #[test]
    fn concat_and_push() {
        let mut v = Vector::from_slice(&[1.0]);
        v.push(2.0);
        v.concat(&Vector::from_slice(&[3.0, 4.0]));
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(v.subvector(1, 2)[1], 3.0);
    }
}
