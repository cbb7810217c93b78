//! # scalar-kalman
//!
//! Kalman filtering and fast disturbance smoothing for linear Gaussian
//! state-space models with scalar observations, built on a small
//! heap-allocated dense linear-algebra kernel. no-std compatible (needs
//! `alloc`).
//!
//! ## Quick start
//!
//! ```
//! use scalar_kalman::estimate::{LinearGaussianModel, ScalarKalmanFilter};
//!
//! let data = [4.4, 4.0, 3.5, f64::NAN, 4.6, 5.1];
//! let model = LinearGaussianModel::local_level(0.2, 0.5, 4.0, 1.0, &data).unwrap();
//! let mut filter = ScalarKalmanFilter::new(model);
//!
//! let loglike = filter.update().unwrap();
//! filter.fast_disturbance_smooth().unwrap();
//!
//! let level = filter.smoothed_state_mean(3).unwrap();
//! assert!(loglike < 0.0);
//! assert!(level[0] > 3.5 && level[0] < 5.0);
//! ```
//!
//! ## Modules
//!
//! - [`matrix`]: Column-major [`Matrix<T>`] with runtime dimensions, the
//!   owning [`Vector<T>`], strided [`VectorView`] / [`VectorViewMut`] for rows,
//!   columns and diagonals, and [`SpdMatrix<T>`] for symmetric matrices with
//!   rank-one updates (`add_outer`, `add_inner`) and congruence (`sandwich`).
//!
//! - [`linalg`]: LU (partial pivoting), Cholesky, and Householder QR
//!   decompositions plus triangular solves. Free functions operate on
//!   `&mut impl MatrixMut<T>` / `&mut impl VectorMut<T>` for in-place use;
//!   wrapper structs offer `solve()`, `inverse()`, and `det()`.
//!
//! - [`estimate`]: [`ScalarKalmanFilter`] over any [`ScalarStateSpaceModel`],
//!   the [`LinearGaussianModel`] adapter (local level, local linear trend, or
//!   arbitrary time-invariant systems), and regression sufficient statistics
//!   ([`NeRegressionSuf`], [`QrRegressionSuf`]).
//!
//! - [`traits`]: Element trait hierarchy:
//!   - [`Scalar`]: all matrix elements (`Copy + PartialEq + Debug + Zero + One + Num`)
//!   - [`FloatScalar`]: real floats (`Scalar + Float`), used by decompositions and filters
//!   - [`MatrixRef`] / [`MatrixMut`], [`VectorRef`] / [`VectorMut`]: generic
//!     access for algorithms
//!
//! ## Logging
//!
//! Filtering and smoothing report through the [`log`] facade: `debug!` after
//! each pass, `trace!` per time step, `warn!` before a degenerate prediction
//! variance is returned as an error. No logger is installed.
//!
//! ## Cargo features
//!
//! | Feature | Default  | Description |
//! |---------|----------|-------------|
//! | `std`   | yes      | Hardware FPU via system libm |
//! | `libm`  | baseline | Pure-Rust software float fallback |

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod estimate;
pub mod linalg;
pub mod matrix;
pub mod traits;

pub use estimate::{
    EstimateError, FilterConfig, FilterStatus, LinearGaussianModel, NeRegressionSuf,
    QrRegressionSuf, RegressionSuf, ScalarKalmanFilter, ScalarMarginalDistribution,
    ScalarStateSpaceModel,
};
pub use linalg::{CholeskyDecomposition, LinalgError, LuDecomposition, QrDecomposition};
pub use matrix::{Matrix, SpdMatrix, Vector, VectorView, VectorViewMut};
pub use traits::{FloatScalar, MatrixMut, MatrixRef, Scalar, VectorMut, VectorRef};
