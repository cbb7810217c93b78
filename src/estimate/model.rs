use alloc::vec::Vec;

use crate::traits::FloatScalar;
use crate::{Matrix, SpdMatrix, Vector};

use super::{EstimateError, ScalarMarginalDistribution};

/// One observed value and its missing flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation<T> {
    pub value: T,
    pub missing: bool,
}

impl<T: FloatScalar> Observation<T> {
    pub fn observed(value: T) -> Self {
        Self {
            value,
            missing: false,
        }
    }

    pub fn missing() -> Self {
        Self {
            value: T::zero(),
            missing: true,
        }
    }
}

/// Model side of the forward/backward recursion.
///
/// For each time index `t` the model provides the system matrices of
///
/// ```text
/// yₜ   = Zₜᵀ αₜ + εₜ,        εₜ ~ N(0, Hₜ)
/// αₜ₊₁ = Tₜ αₜ + Rₜ ηₜ,      ηₜ ~ N(0, Qₜ)
/// ```
///
/// together with the one-step-ahead prediction `(aₜ, Pₜ)` of the state.
/// The filter calls [`absorb_filtered_state`](Self::absorb_filtered_state)
/// after each step so the model can form the prediction for `t + 1`.
///
/// System-matrix accessors may assume `t < time_dimension()`; the filter
/// checks the range before asking.
pub trait ScalarStateSpaceModel<T: FloatScalar> {
    /// Number of time points.
    fn time_dimension(&self) -> usize;

    /// Dimension of the state vector.
    fn state_dimension(&self) -> usize;

    /// The observation at time `t`.
    fn observation(&self, t: usize) -> Observation<T>;

    /// `Zₜ`, the observation loadings.
    fn loading_vector(&self, t: usize) -> Vector<T>;

    /// `Hₜ`, the observation noise variance.
    fn observation_variance(&self, t: usize) -> T;

    /// `Tₜ`, the state transition.
    fn transition_matrix(&self, t: usize) -> Matrix<T>;

    /// `aₜ = E(αₜ | y₀..yₜ₋₁)`.
    ///
    /// Fails with [`EstimateError::StateOutOfSequence`] unless the filtered
    /// state reaches `t - 1`.
    fn predicted_state_mean(&self, t: usize) -> Result<Vector<T>, EstimateError>;

    /// `Pₜ = Var(αₜ | y₀..yₜ₋₁)`.
    fn predicted_state_variance(&self, t: usize) -> Result<SpdMatrix<T>, EstimateError>;

    /// Take the filtered node for time `t` and form the prediction for `t + 1`.
    fn absorb_filtered_state(
        &mut self,
        t: usize,
        node: &ScalarMarginalDistribution<T>,
    ) -> Result<(), EstimateError>;
}

/// Time-invariant linear Gaussian model with owned data.
///
/// Holds `T`, `Z`, `H`, the state disturbance variance `W = R Q Rᵀ`, the
/// prior `(a₀, P₀)`, and the observation series. Predictions are cached
/// per time index: entry `t` exists once the filtered state reaches `t - 1`.
///
/// Observations given as NaN are treated as missing.
///
/// ```
/// use scalar_kalman::estimate::{LinearGaussianModel, ScalarStateSpaceModel};
///
/// let mut model = LinearGaussianModel::local_level(0.1, 1.0, 0.0, 10.0, &[1.0, f64::NAN])
///     .unwrap();
/// assert_eq!(model.time_dimension(), 2);
/// assert!(model.observation(1).missing);
///
/// model.push_observation(3.0);
/// assert_eq!(model.time_dimension(), 3);
/// assert!(model.predicted_state_mean(2).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct LinearGaussianModel<T> {
    transition: Matrix<T>,
    loading: Vector<T>,
    observation_variance: T,
    state_variance: SpdMatrix<T>,
    data: Vec<T>,
    missing: Vec<bool>,
    predicted_mean: Vec<Vector<T>>,
    predicted_variance: Vec<SpdMatrix<T>>,
}

fn check_covariance<T: FloatScalar>(
    p: &Matrix<T>,
    n: usize,
    what: &'static str,
) -> Result<(), EstimateError> {
    if p.nrows() != n || p.ncols() != n {
        return Err(EstimateError::DimensionMismatch {
            expected: n,
            found: if p.nrows() != n { p.nrows() } else { p.ncols() },
        });
    }
    if !p.is_finite() || !p.is_symmetric() {
        return Err(EstimateError::InvalidModel(what));
    }
    if p.diag().iter().any(|&d| d < T::zero()) {
        return Err(EstimateError::InvalidModel(what));
    }
    Ok(())
}

impl<T: FloatScalar> LinearGaussianModel<T> {
    /// Build a model from its system matrices.
    ///
    /// `state_variance` and `initial_variance` must be finite, symmetric,
    /// and have a non-negative diagonal (semi-definite matrices such as zero
    /// process noise are allowed). `observation_variance` must be finite
    /// and non-negative.
    pub fn new(
        transition: Matrix<T>,
        loading: Vector<T>,
        observation_variance: T,
        state_variance: Matrix<T>,
        initial_mean: Vector<T>,
        initial_variance: Matrix<T>,
        data: &[T],
    ) -> Result<Self, EstimateError> {
        let n = loading.len();
        if n == 0 {
            return Err(EstimateError::InvalidModel("state dimension must be positive"));
        }
        if transition.nrows() != n || transition.ncols() != n {
            return Err(EstimateError::DimensionMismatch {
                expected: n,
                found: transition.nrows().max(transition.ncols()),
            });
        }
        if initial_mean.len() != n {
            return Err(EstimateError::DimensionMismatch {
                expected: n,
                found: initial_mean.len(),
            });
        }
        if !transition.is_finite() || !loading.is_finite() || !initial_mean.is_finite() {
            return Err(EstimateError::InvalidModel("system matrices must be finite"));
        }
        if !observation_variance.is_finite() || observation_variance < T::zero() {
            return Err(EstimateError::InvalidModel(
                "observation variance must be finite and non-negative",
            ));
        }
        check_covariance(&state_variance, n, "state variance must be a covariance matrix")?;
        check_covariance(
            &initial_variance,
            n,
            "initial variance must be a covariance matrix",
        )?;

        let mut model = Self {
            transition,
            loading,
            observation_variance,
            state_variance: SpdMatrix::new(state_variance)?,
            data: Vec::new(),
            missing: Vec::new(),
            predicted_mean: alloc::vec![initial_mean],
            predicted_variance: alloc::vec![SpdMatrix::new(initial_variance)?],
        };
        model.set_data(data);
        Ok(model)
    }

    /// Random walk plus noise: `μₜ₊₁ = μₜ + ηₜ`, `yₜ = μₜ + εₜ`.
    pub fn local_level(
        level_variance: T,
        observation_variance: T,
        initial_level: T,
        initial_variance: T,
        data: &[T],
    ) -> Result<Self, EstimateError> {
        Self::new(
            Matrix::eye(1),
            Vector::fill(1, T::one()),
            observation_variance,
            Matrix::fill(1, 1, level_variance),
            Vector::fill(1, initial_level),
            Matrix::fill(1, 1, initial_variance),
            data,
        )
    }

    /// Level and slope: `μₜ₊₁ = μₜ + δₜ + ηₜ`, `δₜ₊₁ = δₜ + ζₜ`.
    #[allow(clippy::too_many_arguments)]
    pub fn local_linear_trend(
        level_variance: T,
        slope_variance: T,
        observation_variance: T,
        initial_level: T,
        initial_slope: T,
        initial_level_variance: T,
        initial_slope_variance: T,
        data: &[T],
    ) -> Result<Self, EstimateError> {
        let zero = T::zero();
        let one = T::one();
        Self::new(
            Matrix::from_rows(2, 2, &[one, one, zero, one]),
            Vector::from_slice(&[one, zero]),
            observation_variance,
            Matrix::from_rows(2, 2, &[level_variance, zero, zero, slope_variance]),
            Vector::from_slice(&[initial_level, initial_slope]),
            Matrix::from_rows(
                2,
                2,
                &[initial_level_variance, zero, zero, initial_slope_variance],
            ),
            data,
        )
    }

    /// Drop every cached prediction after time `t`.
    fn invalidate_after(&mut self, t: usize) {
        self.predicted_mean.truncate(t + 1);
        self.predicted_variance.truncate(t + 1);
    }

    /// Replace the observation series. NaN entries are missing.
    pub fn set_data(&mut self, data: &[T]) {
        self.data = data.to_vec();
        self.missing = data.iter().map(|y| y.is_nan()).collect();
        self.invalidate_after(0);
    }

    /// Overwrite the observation at time `t` and mark it present.
    pub fn set_observation(&mut self, t: usize, y: T) -> Result<(), EstimateError> {
        self.check_time(t)?;
        self.data[t] = y;
        self.missing[t] = y.is_nan();
        self.invalidate_after(t);
        Ok(())
    }

    /// Set or clear the missing flag at time `t`.
    pub fn set_missing(&mut self, t: usize, missing: bool) -> Result<(), EstimateError> {
        self.check_time(t)?;
        self.missing[t] = missing;
        self.invalidate_after(t);
        Ok(())
    }

    /// Append an observation at the end of the series.
    pub fn push_observation(&mut self, y: T) {
        self.data.push(y);
        self.missing.push(y.is_nan());
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn transition(&self) -> &Matrix<T> {
        &self.transition
    }

    pub fn loading(&self) -> &Vector<T> {
        &self.loading
    }

    /// `W = R Q Rᵀ`.
    pub fn state_variance(&self) -> &SpdMatrix<T> {
        &self.state_variance
    }

    /// Number of time points with a cached prediction.
    pub fn predictions_available(&self) -> usize {
        self.predicted_mean.len()
    }

    fn check_time(&self, t: usize) -> Result<(), EstimateError> {
        if t >= self.data.len() {
            return Err(EstimateError::TimeIndexOutOfRange {
                index: t,
                len: self.data.len(),
            });
        }
        Ok(())
    }

    fn check_prediction(&self, t: usize) -> Result<(), EstimateError> {
        if t >= self.predicted_mean.len() {
            return Err(EstimateError::StateOutOfSequence {
                requested: t,
                available: self.predicted_mean.len(),
            });
        }
        Ok(())
    }
}

impl<T: FloatScalar> ScalarStateSpaceModel<T> for LinearGaussianModel<T> {
    fn time_dimension(&self) -> usize {
        self.data.len()
    }

    fn state_dimension(&self) -> usize {
        self.loading.len()
    }

    fn observation(&self, t: usize) -> Observation<T> {
        if self.missing[t] {
            Observation::missing()
        } else {
            Observation::observed(self.data[t])
        }
    }

    fn loading_vector(&self, _t: usize) -> Vector<T> {
        self.loading.clone()
    }

    fn observation_variance(&self, _t: usize) -> T {
        self.observation_variance
    }

    fn transition_matrix(&self, _t: usize) -> Matrix<T> {
        self.transition.clone()
    }

    fn predicted_state_mean(&self, t: usize) -> Result<Vector<T>, EstimateError> {
        self.check_prediction(t)?;
        Ok(self.predicted_mean[t].clone())
    }

    fn predicted_state_variance(&self, t: usize) -> Result<SpdMatrix<T>, EstimateError> {
        self.check_prediction(t)?;
        Ok(self.predicted_variance[t].clone())
    }

    fn absorb_filtered_state(
        &mut self,
        t: usize,
        node: &ScalarMarginalDistribution<T>,
    ) -> Result<(), EstimateError> {
        self.check_prediction(t)?;
        let filtered_mean = node.contemporaneous_state_mean();
        let filtered_variance = node.contemporaneous_state_variance();

        let mean = self.transition.mul_vec(&filtered_mean);
        let mut variance = filtered_variance.sandwich(&self.transition);
        variance += &self.state_variance;

        self.invalidate_after(t);
        self.predicted_mean.push(mean);
        self.predicted_variance.push(variance);
        Ok(())
    }
}
