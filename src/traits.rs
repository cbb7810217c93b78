use core::fmt::Debug;
use num_traits::{Float, Num, One, Zero};

/// Trait for types that can be used as matrix elements.
///
/// Blanket-implemented for all types satisfying the bounds.
/// Covers `f32`, `f64`, and all integer types.
pub trait Scalar: Copy + PartialEq + Debug + Zero + One + Num {}

impl<T: Copy + PartialEq + Debug + Zero + One + Num> Scalar for T {}

/// Trait for floating-point matrix elements.
///
/// Required by decompositions, norms, and the filter (`sqrt`, `ln`,
/// `is_finite`, ...). Implemented for `f32` and `f64`.
pub trait FloatScalar: Scalar + Float {}

impl<T: Scalar + Float> FloatScalar for T {}

/// Read-only access to a matrix-like type.
///
/// Decompositions and triangular solves are written against this trait,
/// so they accept a [`Matrix`](crate::Matrix), the matrix inside an
/// [`SpdMatrix`](crate::SpdMatrix), or a decomposition's stored factor.
pub trait MatrixRef<T> {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
    fn get(&self, row: usize, col: usize) -> &T;

    /// Contiguous view of column `col` starting at `row_start`.
    fn col_as_slice(&self, col: usize, row_start: usize) -> &[T];
}

/// Mutable access to a matrix-like type.
///
/// Extends `MatrixRef` with mutable element access, enabling
/// in-place algorithms (Cholesky, LU, QR) to work generically.
pub trait MatrixMut<T>: MatrixRef<T> {
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T;

    /// Mutable contiguous view of column `col` starting at `row_start`.
    fn col_as_mut_slice(&mut self, col: usize, row_start: usize) -> &mut [T];
}

/// Read-only access to a vector-like type.
///
/// Implemented by the owning [`Vector`](crate::Vector) and by the
/// non-owning [`VectorView`](crate::VectorView) /
/// [`VectorViewMut`](crate::VectorViewMut), so every operation that takes
/// `&impl VectorRef<T>` behaves identically for all three.
pub trait VectorRef<T> {
    fn len(&self) -> usize;
    fn get(&self, i: usize) -> &T;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable access to a vector-like type.
pub trait VectorMut<T>: VectorRef<T> {
    fn get_mut(&mut self, i: usize) -> &mut T;
}

/// Dot product of two vector-likes of equal length.
#[inline]
pub(crate) fn dot<T: Scalar>(a: &impl VectorRef<T>, b: &impl VectorRef<T>) -> T {
    assert_eq!(
        a.len(),
        b.len(),
        "vector length mismatch: {} vs {}",
        a.len(),
        b.len()
    );
    let mut sum = T::zero();
    for i in 0..a.len() {
        sum = sum + *a.get(i) * *b.get(i);
    }
    sum
}
