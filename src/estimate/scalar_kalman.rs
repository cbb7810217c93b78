use alloc::vec::Vec;
use core::ops::Index;

use crate::traits::FloatScalar;
use crate::Vector;

use super::{as_f64, EstimateError, ScalarMarginalDistribution, ScalarStateSpaceModel};

/// Tuning for [`ScalarKalmanFilter`].
///
/// ```
/// use scalar_kalman::estimate::FilterConfig;
///
/// let config = FilterConfig::default().with_variance_scale_factor(2.0_f64);
/// assert!(config.validate().is_ok());
/// assert!(config.with_variance_scale_factor(0.0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig<T> {
    /// Multiplies every observation variance `Hₜ`. Finite and positive.
    pub variance_scale_factor: T,
    /// An observed point fails unless `Fₜ` exceeds this floor.
    pub min_prediction_variance: T,
}

impl<T: FloatScalar> Default for FilterConfig<T> {
    fn default() -> Self {
        Self {
            variance_scale_factor: T::one(),
            min_prediction_variance: T::zero(),
        }
    }
}

impl<T: FloatScalar> FilterConfig<T> {
    pub fn with_variance_scale_factor(mut self, factor: T) -> Self {
        self.variance_scale_factor = factor;
        self
    }

    pub fn with_min_prediction_variance(mut self, floor: T) -> Self {
        self.min_prediction_variance = floor;
        self
    }

    pub fn validate(&self) -> Result<(), EstimateError> {
        let s = self.variance_scale_factor;
        if !s.is_finite() || s <= T::zero() {
            return Err(EstimateError::InvalidScaleFactor(as_f64(s)));
        }
        let floor = self.min_prediction_variance;
        if !floor.is_finite() || floor < T::zero() {
            return Err(EstimateError::InvalidModel(
                "minimum prediction variance must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Progress of a [`ScalarKalmanFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    /// No nodes.
    Empty,
    /// Nodes `0..=through` hold a consistent forward pass.
    Partial { through: usize },
    /// Every time point has been filtered.
    Filtered,
    /// Filtered, then smoothed.
    Smoothed,
}

/// Kalman filter for a state-space model with scalar observations.
///
/// Holds one [`ScalarMarginalDistribution`] per time point. The forward
/// pass costs `O(n²)` per step for state dimension `n` (no matrix
/// inversion), and [`fast_disturbance_smooth`](Self::fast_disturbance_smooth)
/// reuses the cached nodes without touching the model.
///
/// # Example
///
/// ```
/// use scalar_kalman::estimate::{FilterStatus, LinearGaussianModel, ScalarKalmanFilter};
///
/// let model = LinearGaussianModel::local_linear_trend(
///     0.1, 0.01, 1.0, 0.0, 0.0, 100.0, 100.0, &[1.0, 2.1, 2.9, f64::NAN, 5.2],
/// )
/// .unwrap();
/// let mut filter = ScalarKalmanFilter::new(model);
///
/// filter.update().unwrap();
/// assert_eq!(filter.status(), FilterStatus::Filtered);
/// assert_eq!(filter.prediction_error(3, false).unwrap(), 0.0);
///
/// filter.fast_disturbance_smooth().unwrap();
/// let slope = filter.smoothed_state_mean(3).unwrap()[1];
/// assert!(slope > 0.5 && slope < 1.5);
/// ```
#[derive(Debug, Clone)]
pub struct ScalarKalmanFilter<T, M> {
    model: M,
    nodes: Vec<ScalarMarginalDistribution<T>>,
    config: FilterConfig<T>,
    status: FilterStatus,
    log_likelihood: T,
    initial_scaled_state_error: Vector<T>,
}

impl<T: FloatScalar, M: ScalarStateSpaceModel<T>> ScalarKalmanFilter<T, M> {
    pub fn new(model: M) -> Self {
        let n = model.state_dimension();
        Self {
            model,
            nodes: Vec::new(),
            config: FilterConfig::default(),
            status: FilterStatus::Empty,
            log_likelihood: T::zero(),
            initial_scaled_state_error: Vector::zeros(n),
        }
    }

    pub fn with_config(model: M, config: FilterConfig<T>) -> Result<Self, EstimateError> {
        config.validate()?;
        let mut filter = Self::new(model);
        filter.config = config;
        Ok(filter)
    }

    pub fn config(&self) -> &FilterConfig<T> {
        &self.config
    }

    /// Replace the configuration. Existing nodes are discarded.
    pub fn set_config(&mut self, config: FilterConfig<T>) -> Result<(), EstimateError> {
        config.validate()?;
        self.config = config;
        self.clear();
        Ok(())
    }

    /// Run the forward pass over every time point and return the total
    /// log likelihood.
    ///
    /// On failure at time `t` the nodes before `t` are kept and the status
    /// becomes `Partial { through: t - 1 }` (or `Empty` when `t == 0`).
    pub fn update(&mut self) -> Result<T, EstimateError> {
        let len = self.model.time_dimension();
        let n = self.model.state_dimension();
        self.nodes.truncate(len);
        self.initial_scaled_state_error = Vector::zeros(n);
        self.log_likelihood = T::zero();

        if len == 0 {
            self.status = FilterStatus::Empty;
            return Ok(T::zero());
        }

        for t in 0..len {
            if let Err(e) = self.step(t) {
                self.nodes.truncate(t);
                self.status = match t {
                    0 => FilterStatus::Empty,
                    _ => FilterStatus::Partial { through: t - 1 },
                };
                return Err(e);
            }
            self.log_likelihood = self.log_likelihood + self.nodes[t].log_likelihood_contribution();
        }

        self.status = FilterStatus::Filtered;
        log::debug!(
            "filtered {} time points, log likelihood {}",
            len,
            as_f64(self.log_likelihood)
        );
        Ok(self.log_likelihood)
    }

    /// Filter one time point using the model's own observation.
    fn step(&mut self, t: usize) -> Result<(), EstimateError> {
        let obs = self.model.observation(t);
        self.step_with(obs.value, obs.missing, t)
    }

    fn step_with(&mut self, y: T, missing: bool, t: usize) -> Result<(), EstimateError> {
        if t == self.nodes.len() {
            let n = self.model.state_dimension();
            self.nodes.push(ScalarMarginalDistribution::new(t, n));
        }
        let v = self.nodes[t].update(y, missing, t, &self.model, &self.config)?;
        self.model.absorb_filtered_state(t, &self.nodes[t])?;
        log::trace!(
            "t = {}: v = {}, F = {}, loglike = {}",
            t,
            as_f64(v),
            as_f64(self.nodes[t].prediction_variance()),
            as_f64(self.nodes[t].log_likelihood_contribution())
        );
        Ok(())
    }

    /// Filter the single time point `t` with the supplied observation and
    /// return its prediction error.
    ///
    /// Nodes `0..t` must already be present; `t == size()` appends a node.
    /// Nodes after `t` are discarded, since their predictions no longer
    /// follow from node `t`, so `size()` becomes `t + 1` and indexing a
    /// later node panics until it is filtered again. The model's stored
    /// data is not modified.
    pub fn update_at(&mut self, y: T, t: usize, missing: bool) -> Result<T, EstimateError> {
        let len = self.model.time_dimension();
        if t >= len {
            return Err(EstimateError::TimeIndexOutOfRange { index: t, len });
        }
        if t > self.nodes.len() {
            return Err(EstimateError::TimeIndexOutOfRange {
                index: t,
                len: self.nodes.len(),
            });
        }

        if let Err(e) = self.step_with(y, missing, t) {
            self.nodes.truncate(t);
            self.status = match t {
                0 => FilterStatus::Empty,
                _ => FilterStatus::Partial { through: t - 1 },
            };
            self.log_likelihood = self.sum_log_likelihood();
            return Err(e);
        }
        self.nodes.truncate(t + 1);
        self.initial_scaled_state_error = Vector::zeros(self.model.state_dimension());

        self.status = if t + 1 == len {
            FilterStatus::Filtered
        } else {
            FilterStatus::Partial { through: t }
        };
        self.log_likelihood = self.sum_log_likelihood();
        Ok(self.nodes[t].prediction_error())
    }

    fn sum_log_likelihood(&self) -> T {
        self.nodes
            .iter()
            .fold(T::zero(), |acc, node| acc + node.log_likelihood_contribution())
    }

    /// Backward pass computing the scaled errors `rₜ` and `uₜ`.
    ///
    /// Starting from `r = 0` after the last time point:
    ///
    /// ```text
    /// uₜ   = vₜ / Fₜ − Kₜᵀ Tₜᵀ rₜ      (0 if yₜ is missing)
    /// rₜ₋₁ = Tₜᵀ rₜ + Zₜ uₜ
    /// ```
    ///
    /// `r₋₁` is kept as [`initial_scaled_state_error`](Self::initial_scaled_state_error).
    /// Uses only the cached nodes; the model is not consulted.
    pub fn fast_disturbance_smooth(&mut self) -> Result<(), EstimateError> {
        match self.status {
            FilterStatus::Empty => return Err(EstimateError::EmptyFilter),
            FilterStatus::Partial { .. } => return Err(EstimateError::NotFiltered),
            FilterStatus::Filtered | FilterStatus::Smoothed => {}
        }

        let mut r = Vector::zeros(self.model.state_dimension());
        for node in self.nodes.iter_mut().rev() {
            let w = node.transition().tmul_vec(&r);
            let u = if node.missing() {
                T::zero()
            } else {
                node.prediction_error() / node.prediction_variance() - node.kalman_gain().dot(&w)
            };
            let mut r_prev = w;
            r_prev.axpy(u, node.loading());
            node.set_smoothing(r, u);
            r = r_prev;
        }
        self.initial_scaled_state_error = r;
        self.status = FilterStatus::Smoothed;
        log::debug!("smoothed {} time points", self.nodes.len());
        Ok(())
    }

    fn require_smoothed(&self, t: usize) -> Result<(), EstimateError> {
        if self.status != FilterStatus::Smoothed {
            return Err(EstimateError::NotSmoothed);
        }
        self.check_index(t)
    }

    fn check_index(&self, t: usize) -> Result<(), EstimateError> {
        if t >= self.nodes.len() {
            return Err(EstimateError::TimeIndexOutOfRange {
                index: t,
                len: self.nodes.len(),
            });
        }
        Ok(())
    }

    /// `E(αₜ | all data) = aₜ + Pₜ rₜ₋₁`.
    pub fn smoothed_state_mean(&self, t: usize) -> Result<Vector<T>, EstimateError> {
        self.require_smoothed(t)?;
        let node = &self.nodes[t];
        let r_prev = match node.previous() {
            Some(s) => self.nodes[s].scaled_state_error(),
            None => &self.initial_scaled_state_error,
        };
        let mut mean = node.state_variance().mul_vec(r_prev);
        mean += node.state_mean();
        Ok(mean)
    }

    /// `E(εₜ | all data) = Hₜ uₜ`.
    pub fn smoothed_observation_disturbance(&self, t: usize) -> Result<T, EstimateError> {
        self.require_smoothed(t)?;
        let node = &self.nodes[t];
        Ok(node.observation_variance() * node.scaled_prediction_error())
    }

    /// `E(Rₜ ηₜ | all data) = α̂ₜ₊₁ − Tₜ α̂ₜ`, zero at the last time point.
    pub fn smoothed_state_disturbance(&self, t: usize) -> Result<Vector<T>, EstimateError> {
        self.require_smoothed(t)?;
        if t + 1 == self.nodes.len() {
            return Ok(Vector::zeros(self.model.state_dimension()));
        }
        let now = self.smoothed_state_mean(t)?;
        let mut next = self.smoothed_state_mean(t + 1)?;
        next -= &self.nodes[t].transition().mul_vec(&now);
        Ok(next)
    }

    /// `r₋₁`, the scaled state error before the first time point.
    pub fn initial_scaled_state_error(&self) -> Result<&Vector<T>, EstimateError> {
        if self.status != FilterStatus::Smoothed {
            return Err(EstimateError::NotSmoothed);
        }
        Ok(&self.initial_scaled_state_error)
    }

    /// `vₜ`, or `vₜ / √Fₜ` when `standardize` is set. Zero for missing points.
    pub fn prediction_error(&self, t: usize, standardize: bool) -> Result<T, EstimateError> {
        self.check_index(t)?;
        let node = &self.nodes[t];
        if standardize && !node.missing() {
            Ok(node.prediction_error() / node.prediction_variance().sqrt())
        } else {
            Ok(node.prediction_error())
        }
    }

    /// Prediction errors for every filtered time point.
    pub fn prediction_errors(&self, standardize: bool) -> Vec<T> {
        (0..self.nodes.len())
            .map(|t| self.prediction_error(t, standardize).unwrap_or_else(|_| T::zero()))
            .collect()
    }

    pub fn get(&self, t: usize) -> Option<&ScalarMarginalDistribution<T>> {
        self.nodes.get(t)
    }

    /// The last node.
    pub fn back(&self) -> Result<&ScalarMarginalDistribution<T>, EstimateError> {
        self.nodes.last().ok_or(EstimateError::EmptyFilter)
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[ScalarMarginalDistribution<T>] {
        &self.nodes
    }

    pub fn status(&self) -> FilterStatus {
        self.status
    }

    /// Sum of the log-likelihood contributions of the current nodes.
    pub fn log_likelihood(&self) -> T {
        self.log_likelihood
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Mutable access to the model. The nodes are discarded, since any
    /// change to the model can invalidate them.
    pub fn model_mut(&mut self) -> &mut M {
        self.clear();
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.status = FilterStatus::Empty;
        self.log_likelihood = T::zero();
        self.initial_scaled_state_error = Vector::zeros(self.model.state_dimension());
    }
}

impl<T, M> Index<usize> for ScalarKalmanFilter<T, M> {
    type Output = ScalarMarginalDistribution<T>;

    fn index(&self, t: usize) -> &Self::Output {
        &self.nodes[t]
    }
}
