//! State estimation for linear Gaussian state-space models with scalar
//! observations, plus regression sufficient statistics.
//!
//! The forward pass ([`ScalarKalmanFilter::update`]) asks a
//! [`ScalarStateSpaceModel`] for its system matrices and one-step-ahead
//! prediction at each time index, records a [`ScalarMarginalDistribution`]
//! node, and hands that node back to the model so it can form the next
//! prediction. The backward pass
//! ([`ScalarKalmanFilter::fast_disturbance_smooth`]) walks the nodes in
//! reverse using only what they cached.
//!
//! # Local level model
//!
//! ```
//! use scalar_kalman::estimate::{LinearGaussianModel, ScalarKalmanFilter};
//!
//! let model = LinearGaussianModel::local_level(0.5_f64, 1.0, 0.0, 2.0, &[1.0, 2.0, 1.5, 3.0, 2.5])
//!     .unwrap();
//! let mut filter = ScalarKalmanFilter::new(model);
//!
//! let loglike = filter.update().unwrap();
//! assert!(loglike.is_finite());
//! assert!((filter[0].prediction_variance() - 3.0).abs() < 1e-12);
//!
//! filter.fast_disturbance_smooth().unwrap();
//! let last = filter.size() - 1;
//! let smoothed = filter.smoothed_state_mean(last).unwrap();
//! let filtered = filter[last].contemporaneous_state_mean();
//! assert!((smoothed[0] - filtered[0]).abs() < 1e-12);
//! ```
//!
//! # Regression sufficient statistics
//!
//! ```
//! use scalar_kalman::estimate::{NeRegressionSuf, RegressionSuf};
//! use scalar_kalman::Matrix;
//!
//! let x = Matrix::from_rows(3, 2, &[1.0_f64, 0.0, 1.0, 1.0, 1.0, 2.0]);
//! let y = Matrix::from_rows(3, 1, &[1.0, 2.0, 4.0]);
//! let suf = NeRegressionSuf::from_data(&x, &y).unwrap();
//! let beta = suf.beta_hat().unwrap();
//! assert!((beta[(1, 0)] - 1.5).abs() < 1e-10);
//! ```

mod marginal;
mod model;
mod regression;
mod scalar_kalman;

#[cfg(test)]
mod tests;

pub use marginal::ScalarMarginalDistribution;
pub use model::{LinearGaussianModel, Observation, ScalarStateSpaceModel};
pub use regression::{NeRegressionSuf, QrRegressionSuf, RegressionSuf};
pub use scalar_kalman::{FilterConfig, FilterStatus, ScalarKalmanFilter};

use crate::linalg::LinalgError;

/// Errors from filtering, smoothing, and sufficient-statistic operations.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum EstimateError {
    /// A time index outside `0..len`.
    #[error("time index {index} out of range for {len} time points")]
    TimeIndexOutOfRange { index: usize, len: usize },
    /// The filter holds no nodes.
    #[error("filter is empty")]
    EmptyFilter,
    /// The operation needs a complete forward pass.
    #[error("filter has not completed a forward pass")]
    NotFiltered,
    /// The operation needs a smoothing pass.
    #[error("filter has not been smoothed")]
    NotSmoothed,
    /// The model's filtered state does not reach `t - 1`.
    #[error("predicted state for time {requested} requested, but the model has filtered only {available} time points")]
    StateOutOfSequence { requested: usize, available: usize },
    /// Operand or model dimensions do not conform.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    /// The variance scale factor must be finite and strictly positive.
    #[error("variance scale factor must be finite and positive, got {0}")]
    InvalidScaleFactor(f64),
    /// A model parameter failed validation.
    #[error("invalid model: {0}")]
    InvalidModel(&'static str),
    /// Prediction variance at or below the floor (or NaN) for an observed point.
    #[error("prediction variance {variance} at time {time} is not above the floor")]
    NonPositivePredictionVariance { time: usize, variance: f64 },
    /// A matrix operation failed.
    #[error(transparent)]
    Linalg(#[from] LinalgError),
    /// The accumulator does not support this operation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// Cached quantities are out of date; call `refresh()` first.
    #[error("sufficient statistics are stale; call refresh() first")]
    Stale,
}

fn as_f64<T: crate::traits::FloatScalar>(x: T) -> f64 {
    num_traits::ToPrimitive::to_f64(&x).unwrap_or(f64::NAN)
}
