use crate::traits::FloatScalar;
use crate::{Matrix, SpdMatrix, Vector};

use super::{as_f64, EstimateError, FilterConfig, ScalarStateSpaceModel};

/// One time step of a scalar Kalman filter.
///
/// Stores the one-step-ahead prediction `(aₜ, Pₜ)` of the state, the system
/// quantities used at this step, and the innovation `vₜ`, its variance `Fₜ`
/// and the gain `Kₜ = Pₜ Zₜ / Fₜ`. After a disturbance smoothing pass it also
/// holds the scaled state error `rₜ` and the scaled prediction error `uₜ`.
///
/// Nodes are owned by [`ScalarKalmanFilter`](super::ScalarKalmanFilter) and
/// refer to their predecessor by index.
#[derive(Debug, Clone)]
pub struct ScalarMarginalDistribution<T> {
    time_index: usize,
    previous: Option<usize>,

    observation: T,
    missing: bool,

    state_mean: Vector<T>,
    state_variance: SpdMatrix<T>,
    loading: Vector<T>,
    transition: Matrix<T>,
    observation_variance: T,

    prediction_error: T,
    prediction_variance: T,
    kalman_gain: Vector<T>,
    log_likelihood: T,

    scaled_state_error: Vector<T>,
    scaled_prediction_error: T,
}

impl<T: FloatScalar> ScalarMarginalDistribution<T> {
    /// An empty node for time `time_index` with an `n`-dimensional state.
    pub fn new(time_index: usize, n: usize) -> Self {
        Self {
            time_index,
            previous: time_index.checked_sub(1),
            observation: T::zero(),
            missing: true,
            state_mean: Vector::zeros(n),
            state_variance: SpdMatrix::zeros(n),
            loading: Vector::zeros(n),
            transition: Matrix::eye(n),
            observation_variance: T::zero(),
            prediction_error: T::zero(),
            prediction_variance: T::zero(),
            kalman_gain: Vector::zeros(n),
            log_likelihood: T::zero(),
            scaled_state_error: Vector::zeros(n),
            scaled_prediction_error: T::zero(),
        }
    }

    /// Run one forward step and return the prediction error `vₜ`.
    ///
    /// ```text
    /// Fₜ = Zₜᵀ Pₜ Zₜ + s·Hₜ
    /// vₜ = yₜ − Zₜᵀ aₜ
    /// Kₜ = Pₜ Zₜ / Fₜ
    /// ℓₜ = −½ (ln 2π + ln Fₜ + vₜ² / Fₜ)
    /// ```
    ///
    /// where `s` is the variance scale factor. A missing observation sets
    /// `vₜ`, `Kₜ` and `ℓₜ` to zero.
    ///
    /// An observed point whose `Fₜ` is NaN or not above
    /// `config.min_prediction_variance` fails with
    /// [`EstimateError::NonPositivePredictionVariance`] and leaves the node
    /// unchanged. A missing point fails the same way when `Fₜ` is NaN or
    /// negative.
    pub fn update<M>(
        &mut self,
        y: T,
        missing: bool,
        t: usize,
        model: &M,
        config: &FilterConfig<T>,
    ) -> Result<T, EstimateError>
    where
        M: ScalarStateSpaceModel<T> + ?Sized,
    {
        let a = model.predicted_state_mean(t)?;
        let p = model.predicted_state_variance(t)?;
        let z = model.loading_vector(t);
        let transition = model.transition_matrix(t);
        let h = model.observation_variance(t) * config.variance_scale_factor;

        let n = a.len();
        if z.len() != n || p.dim() != n {
            return Err(EstimateError::DimensionMismatch {
                expected: n,
                found: if z.len() != n { z.len() } else { p.dim() },
            });
        }
        if transition.nrows() != n || transition.ncols() != n {
            return Err(EstimateError::DimensionMismatch {
                expected: n,
                found: transition.nrows().max(transition.ncols()),
            });
        }

        let pz = p.mul_vec(&z);
        let f = z.dot(&pz) + h;

        // Missing points never divide by F, so only a negative F is fatal there.
        let degenerate = f.is_nan()
            || if missing {
                f < T::zero()
            } else {
                f <= config.min_prediction_variance
            };
        if degenerate {
            log::warn!(
                "degenerate prediction variance {} at time {}",
                as_f64(f),
                t
            );
            return Err(EstimateError::NonPositivePredictionVariance {
                time: t,
                variance: as_f64(f),
            });
        }

        let (v, k, loglike) = if missing {
            (T::zero(), Vector::zeros(n), T::zero())
        } else {
            let v = y - z.dot(&a);
            let k = &pz / f;
            let half = T::from(0.5).unwrap();
            let ln_2pi = T::from(core::f64::consts::TAU).unwrap().ln();
            (v, k, -half * (ln_2pi + f.ln() + v * v / f))
        };

        self.time_index = t;
        self.previous = t.checked_sub(1);
        self.observation = if missing { T::zero() } else { y };
        self.missing = missing;
        self.state_mean = a;
        self.state_variance = p;
        self.loading = z;
        self.transition = transition;
        self.observation_variance = h;
        self.prediction_error = v;
        self.prediction_variance = f;
        self.kalman_gain = k;
        self.log_likelihood = loglike;
        self.scaled_state_error = Vector::zeros(n);
        self.scaled_prediction_error = T::zero();
        Ok(v)
    }

    /// `E(αₜ | y₀..yₜ) = aₜ + Kₜ vₜ`.
    pub fn contemporaneous_state_mean(&self) -> Vector<T> {
        let mut m = self.state_mean.clone();
        m.axpy(self.prediction_error, &self.kalman_gain);
        m
    }

    /// `Var(αₜ | y₀..yₜ) = Pₜ − Fₜ Kₜ Kₜᵀ`.
    pub fn contemporaneous_state_variance(&self) -> SpdMatrix<T> {
        let mut v = self.state_variance.clone();
        v.add_outer(&self.kalman_gain, -self.prediction_variance);
        v
    }

    pub(crate) fn set_smoothing(&mut self, r: Vector<T>, u: T) {
        self.scaled_state_error = r;
        self.scaled_prediction_error = u;
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn time_index(&self) -> usize {
        self.time_index
    }

    /// Index of the preceding node, `None` at time 0.
    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    /// The observation used at this step (zero when missing).
    pub fn observation(&self) -> T {
        self.observation
    }

    pub fn missing(&self) -> bool {
        self.missing
    }

    /// `aₜ`.
    pub fn state_mean(&self) -> &Vector<T> {
        &self.state_mean
    }

    /// `Pₜ`.
    pub fn state_variance(&self) -> &SpdMatrix<T> {
        &self.state_variance
    }

    pub fn loading(&self) -> &Vector<T> {
        &self.loading
    }

    pub fn transition(&self) -> &Matrix<T> {
        &self.transition
    }

    /// `Hₜ` after scaling.
    pub fn observation_variance(&self) -> T {
        self.observation_variance
    }

    /// `vₜ`.
    pub fn prediction_error(&self) -> T {
        self.prediction_error
    }

    /// `Fₜ`.
    pub fn prediction_variance(&self) -> T {
        self.prediction_variance
    }

    /// `Kₜ = Pₜ Zₜ / Fₜ`.
    pub fn kalman_gain(&self) -> &Vector<T> {
        &self.kalman_gain
    }

    pub fn log_likelihood_contribution(&self) -> T {
        self.log_likelihood
    }

    /// `rₜ` from the last smoothing pass.
    pub fn scaled_state_error(&self) -> &Vector<T> {
        &self.scaled_state_error
    }

    /// `uₜ` from the last smoothing pass.
    pub fn scaled_prediction_error(&self) -> T {
        self.scaled_prediction_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimate::LinearGaussianModel;

    #[test]
    fn first_step_of_local_level() {
        let model = LinearGaussianModel::local_level(0.5_f64, 1.0, 0.0, 2.0, &[1.0]).unwrap();
        let mut node = ScalarMarginalDistribution::<f64>::new(0, 1);
        let v = node
            .update(1.0, false, 0, &model, &FilterConfig::default())
            .unwrap();
        let ll = node.log_likelihood_contribution();

        assert_eq!(node.previous(), None);
        assert_eq!(v, 1.0);
        assert!((node.prediction_variance() - 3.0).abs() < 1e-14);
        assert!((node.prediction_error() - 1.0).abs() < 1e-14);
        assert!((node.kalman_gain()[0] - 2.0 / 3.0).abs() < 1e-14);
        let expected = -0.5 * ((2.0 * core::f64::consts::PI).ln() + 3.0_f64.ln() + 1.0 / 3.0);
        assert!((ll - expected).abs() < 1e-14);

        assert!((node.contemporaneous_state_mean()[0] - 2.0 / 3.0).abs() < 1e-14);
        assert!((node.contemporaneous_state_variance()[(0, 0)] - 2.0 / 3.0).abs() < 1e-14);
    }

    #[test]
    fn missing_observation_passes_prediction_through() {
        let model = LinearGaussianModel::local_level(0.5_f64, 1.0, 4.0, 2.0, &[f64::NAN]).unwrap();
        let mut node = ScalarMarginalDistribution::<f64>::new(0, 1);
        let v = node
            .update(0.0, true, 0, &model, &FilterConfig::default())
            .unwrap();

        assert_eq!(v, 0.0);
        assert_eq!(node.log_likelihood_contribution(), 0.0);
        assert_eq!(node.prediction_error(), 0.0);
        assert_eq!(node.kalman_gain()[0], 0.0);
        assert!((node.prediction_variance() - 3.0).abs() < 1e-14);
        assert_eq!(node.contemporaneous_state_mean()[0], 4.0);
        assert_eq!(node.contemporaneous_state_variance()[(0, 0)], 2.0);
    }

    #[test]
    fn scale_factor_multiplies_observation_variance() {
        let model = LinearGaussianModel::local_level(0.5_f64, 1.0, 0.0, 2.0, &[1.0]).unwrap();
        let mut node = ScalarMarginalDistribution::<f64>::new(0, 1);
        let config = FilterConfig::default().with_variance_scale_factor(4.0);
        node.update(1.0, false, 0, &model, &config).unwrap();
        assert!((node.observation_variance() - 4.0).abs() < 1e-14);
        assert!((node.prediction_variance() - 6.0).abs() < 1e-14);
    }

    #[test]
    fn degenerate_variance_leaves_node_untouched() {
        let model = LinearGaussianModel::local_level(0.0_f64, 0.0, 0.0, 0.0, &[1.0]).unwrap();
        let mut node = ScalarMarginalDistribution::<f64>::new(0, 1);
        let err = node
            .update(1.0, false, 0, &model, &FilterConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            EstimateError::NonPositivePredictionVariance {
                time: 0,
                variance: 0.0
            }
        );
        assert!(node.missing());
        assert_eq!(node.prediction_variance(), 0.0);

        // A zero F is fine when nothing is observed.
        assert!(node
            .update(0.0, true, 0, &model, &FilterConfig::default())
            .is_ok());
    }

    #[test]
    fn negative_variance_fails_on_a_missing_point() {
        let model = LinearGaussianModel::new(
            Matrix::eye(1),
            Vector::fill(1, 1.0_f64),
            0.0,
            Matrix::zeros(1, 1),
            Vector::zeros(1),
            Matrix::zeros(1, 1),
            &[f64::NAN],
        )
        .unwrap();
        let mut node = ScalarMarginalDistribution::<f64>::new(0, 1);

        // A negative H drives F below zero even though y is missing.
        struct NegativeH<'a>(&'a LinearGaussianModel<f64>);
        impl ScalarStateSpaceModel<f64> for NegativeH<'_> {
            fn time_dimension(&self) -> usize {
                self.0.time_dimension()
            }
            fn state_dimension(&self) -> usize {
                self.0.state_dimension()
            }
            fn observation(&self, t: usize) -> crate::estimate::Observation<f64> {
                self.0.observation(t)
            }
            fn loading_vector(&self, t: usize) -> Vector<f64> {
                self.0.loading_vector(t)
            }
            fn observation_variance(&self, _t: usize) -> f64 {
                -1.0
            }
            fn transition_matrix(&self, t: usize) -> Matrix<f64> {
                self.0.transition_matrix(t)
            }
            fn predicted_state_mean(&self, t: usize) -> Result<Vector<f64>, EstimateError> {
                self.0.predicted_state_mean(t)
            }
            fn predicted_state_variance(&self, t: usize) -> Result<SpdMatrix<f64>, EstimateError> {
                self.0.predicted_state_variance(t)
            }
            fn absorb_filtered_state(
                &mut self,
                _t: usize,
                _node: &ScalarMarginalDistribution<f64>,
            ) -> Result<(), EstimateError> {
                Ok(())
            }
        }

        let err = node
            .update(0.0, true, 0, &NegativeH(&model), &FilterConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            EstimateError::NonPositivePredictionVariance {
                time: 0,
                variance: -1.0
            }
        );
        assert_eq!(node.prediction_variance(), 0.0);
    }
}
