use super::*;
use crate::{Matrix, SpdMatrix, Vector};

fn approx_eq(a: f64, b: f64, tol: f64) {
    assert!(
        (a - b).abs() < tol,
        "expected {} ≈ {} (diff = {}, tol = {})",
        a,
        b,
        (a - b).abs(),
        tol
    );
}

const DATA: [f64; 5] = [1.0, 2.0, 1.5, 3.0, 2.5];

fn local_level(data: &[f64]) -> ScalarKalmanFilter<f64, LinearGaussianModel<f64>> {
    let model = LinearGaussianModel::local_level(0.5, 1.0, 0.0, 2.0, data).unwrap();
    ScalarKalmanFilter::new(model)
}

fn trend_data() -> [f64; 12] {
    [
        0.3,
        1.4,
        1.9,
        3.2,
        f64::NAN,
        5.1,
        5.8,
        7.4,
        f64::NAN,
        9.0,
        10.3,
        10.8,
    ]
}

fn local_linear_trend() -> ScalarKalmanFilter<f64, LinearGaussianModel<f64>> {
    let model = LinearGaussianModel::local_linear_trend(
        0.2,
        0.05,
        0.8,
        0.0,
        0.5,
        4.0,
        1.0,
        &trend_data(),
    )
    .unwrap();
    ScalarKalmanFilter::new(model)
}

// ── Forward pass ────────────────────────────────────────────────────

#[test]
fn local_level_matches_hand_computation() {
    let mut kf = local_level(&DATA);
    kf.update().unwrap();

    let f = [3.0, 13.0 / 6.0, 53.0 / 26.0, 213.0 / 106.0, 853.0 / 426.0];
    let k = [2.0 / 3.0, 7.0 / 13.0, 27.0 / 53.0, 107.0 / 213.0, 427.0 / 853.0];
    assert_eq!(kf.size(), 5);
    for t in 0..5 {
        approx_eq(kf[t].prediction_variance(), f[t], 1e-10);
        approx_eq(kf[t].kalman_gain()[0], k[t], 1e-10);
    }

    // aₜ₊₁ = aₜ + Kₜ vₜ
    let mut a = 0.0;
    for (t, &y) in DATA.iter().enumerate() {
        approx_eq(kf[t].state_mean()[0], a, 1e-10);
        approx_eq(kf[t].prediction_error(), y - a, 1e-10);
        a += k[t] * (y - a);
    }
    approx_eq(kf.back().unwrap().contemporaneous_state_mean()[0], a, 1e-10);
}

#[test]
fn log_likelihood_equals_joint_gaussian_density() {
    let mut kf = local_level(&DATA);
    let loglike = kf.update().unwrap();

    // y ~ N(0, Σ) with Σᵢⱼ = p0 + W·min(i, j) + H·δᵢⱼ
    let n = DATA.len();
    let sigma = Matrix::from_fn(n, n, |i, j| {
        2.0 + 0.5 * i.min(j) as f64 + if i == j { 1.0 } else { 0.0 }
    });
    let sigma = SpdMatrix::new(sigma).unwrap();
    let y = Vector::from_slice(&DATA);
    let quad = y.dot(&sigma.solve(&y).unwrap());
    let expected = -0.5
        * (n as f64 * (2.0 * core::f64::consts::PI).ln() + sigma.logdet().unwrap() + quad);

    approx_eq(loglike, expected, 1e-10);
    approx_eq(kf.log_likelihood(), expected, 1e-10);

    let sum: f64 = kf.nodes().iter().map(|n| n.log_likelihood_contribution()).sum();
    approx_eq(sum, loglike, 1e-12);
}

#[test]
fn filtering_is_causal() {
    let mut kf = local_level(&DATA);
    kf.update().unwrap();
    let before = kf[2].clone();

    kf.model_mut().set_observation(3, 100.0).unwrap();
    assert_eq!(kf.status(), FilterStatus::Empty);
    kf.update().unwrap();

    let after = &kf[2];
    assert_eq!(after.prediction_error(), before.prediction_error());
    assert_eq!(after.prediction_variance(), before.prediction_variance());
    assert_eq!(after.kalman_gain(), before.kalman_gain());
    assert_eq!(
        after.contemporaneous_state_mean(),
        before.contemporaneous_state_mean()
    );
    assert!(kf[3].prediction_error() > 90.0);
}

#[test]
fn missing_observation_only_propagates_the_state() {
    let data = [1.0, 2.0, f64::NAN, 3.0, 2.5];
    let mut kf = local_level(&data);
    kf.update().unwrap();

    let node = &kf[2];
    assert!(node.missing());
    assert_eq!(node.prediction_error(), 0.0);
    assert_eq!(node.kalman_gain()[0], 0.0);
    assert_eq!(node.log_likelihood_contribution(), 0.0);
    assert_eq!(kf.prediction_error(2, true).unwrap(), 0.0);

    // Pₜ₊₁ = T Pₜ Tᵀ + W with no measurement update at t = 2.
    approx_eq(
        kf[3].state_variance()[(0, 0)],
        node.state_variance()[(0, 0)] + 0.5,
        1e-14,
    );
    approx_eq(kf[3].state_mean()[0], node.state_mean()[0], 1e-14);

    let sum: f64 = kf.nodes().iter().map(|n| n.log_likelihood_contribution()).sum();
    approx_eq(kf.log_likelihood(), sum, 1e-12);
}

#[test]
fn standardized_prediction_errors() {
    let mut kf = local_level(&DATA);
    kf.update().unwrap();
    let raw = kf.prediction_errors(false);
    let scaled = kf.prediction_errors(true);
    assert_eq!(raw.len(), 5);
    for t in 0..5 {
        approx_eq(scaled[t], raw[t] / kf[t].prediction_variance().sqrt(), 1e-14);
    }
    assert_eq!(
        kf.prediction_error(5, false),
        Err(EstimateError::TimeIndexOutOfRange { index: 5, len: 5 })
    );
}

#[test]
fn update_at_matches_full_pass() {
    let mut full = local_level(&DATA);
    let expected = full.update().unwrap();

    let mut kf = local_level(&DATA);
    for (t, &y) in DATA.iter().enumerate() {
        kf.update_at(y, t, false).unwrap();
        let want = if t + 1 == DATA.len() {
            FilterStatus::Filtered
        } else {
            FilterStatus::Partial { through: t }
        };
        assert_eq!(kf.status(), want);
    }
    approx_eq(kf.log_likelihood(), expected, 1e-12);

    // Refiltering an early point drops everything after it.
    kf.update_at(1.0, 1, true).unwrap();
    assert_eq!(kf.size(), 2);
    assert_eq!(kf.status(), FilterStatus::Partial { through: 1 });
    assert!(kf[1].missing());
}

#[test]
fn update_at_rejects_gaps() {
    let mut kf = local_level(&DATA);
    assert_eq!(
        kf.update_at(1.0, 2, false),
        Err(EstimateError::TimeIndexOutOfRange { index: 2, len: 0 })
    );
    assert_eq!(
        kf.update_at(1.0, 5, false),
        Err(EstimateError::TimeIndexOutOfRange { index: 5, len: 5 })
    );
    assert!(kf.is_empty());
}

#[test]
fn degenerate_variance_stops_the_pass() {
    let model = LinearGaussianModel::local_level(0.5, 1.0, 0.0, 2.0, &DATA).unwrap();
    let config = FilterConfig::default().with_min_prediction_variance(2.1);
    let mut kf = ScalarKalmanFilter::with_config(model, config).unwrap();

    let err = kf.update().unwrap_err();
    assert!(matches!(
        err,
        EstimateError::NonPositivePredictionVariance { time: 2, .. }
    ));
    assert_eq!(kf.size(), 2);
    assert_eq!(kf.status(), FilterStatus::Partial { through: 1 });
    assert_eq!(kf.fast_disturbance_smooth(), Err(EstimateError::NotFiltered));
}

/// Local level model whose predicted variance turns negative at one time
/// point.
struct BrokenVariance {
    inner: LinearGaussianModel<f64>,
    at: usize,
}

impl ScalarStateSpaceModel<f64> for BrokenVariance {
    fn time_dimension(&self) -> usize {
        self.inner.time_dimension()
    }
    fn state_dimension(&self) -> usize {
        self.inner.state_dimension()
    }
    fn observation(&self, t: usize) -> Observation<f64> {
        self.inner.observation(t)
    }
    fn loading_vector(&self, t: usize) -> Vector<f64> {
        self.inner.loading_vector(t)
    }
    fn observation_variance(&self, t: usize) -> f64 {
        self.inner.observation_variance(t)
    }
    fn transition_matrix(&self, t: usize) -> Matrix<f64> {
        self.inner.transition_matrix(t)
    }
    fn predicted_state_mean(&self, t: usize) -> Result<Vector<f64>, EstimateError> {
        self.inner.predicted_state_mean(t)
    }
    fn predicted_state_variance(&self, t: usize) -> Result<SpdMatrix<f64>, EstimateError> {
        let p = self.inner.predicted_state_variance(t)?;
        if t == self.at {
            Ok(SpdMatrix::scaled_identity(1, -5.0))
        } else {
            Ok(p)
        }
    }
    fn absorb_filtered_state(
        &mut self,
        t: usize,
        node: &ScalarMarginalDistribution<f64>,
    ) -> Result<(), EstimateError> {
        self.inner.absorb_filtered_state(t, node)
    }
}

#[test]
fn negative_variance_at_a_missing_point_stops_the_pass() {
    let data = [1.0, f64::NAN, 2.0];
    let inner = LinearGaussianModel::local_level(0.5, 1.0, 0.0, 2.0, &data).unwrap();
    let mut kf = ScalarKalmanFilter::new(BrokenVariance { inner, at: 1 });

    let err = kf.update().unwrap_err();
    assert_eq!(
        err,
        EstimateError::NonPositivePredictionVariance {
            time: 1,
            variance: -4.0
        }
    );
    assert_eq!(kf.size(), 1);
    assert_eq!(kf.status(), FilterStatus::Partial { through: 0 });

    // Same failure when the bad point is the last one.
    let inner = LinearGaussianModel::local_level(0.5, 1.0, 0.0, 2.0, &[1.0, f64::NAN]).unwrap();
    let mut kf = ScalarKalmanFilter::new(BrokenVariance { inner, at: 1 });
    assert!(kf.update().is_err());
    assert_ne!(kf.status(), FilterStatus::Filtered);
}

#[test]
fn scale_factor_validation() {
    let model = LinearGaussianModel::local_level(0.5, 1.0, 0.0, 2.0, &DATA).unwrap();
    let bad = FilterConfig::default().with_variance_scale_factor(0.0);
    assert!(matches!(
        ScalarKalmanFilter::with_config(model, bad),
        Err(EstimateError::InvalidScaleFactor(s)) if s == 0.0
    ));

    let mut kf = local_level(&DATA);
    kf.update().unwrap();
    assert!(kf
        .set_config(FilterConfig::default().with_variance_scale_factor(f64::INFINITY))
        .is_err());
    assert_eq!(kf.status(), FilterStatus::Filtered);

    kf.set_config(FilterConfig::default().with_variance_scale_factor(2.0))
        .unwrap();
    assert!(kf.is_empty());
    kf.update().unwrap();
    approx_eq(kf[0].prediction_variance(), 4.0, 1e-14);
}

#[test]
fn empty_model() {
    let mut kf = local_level(&[]);
    assert_eq!(kf.update(), Ok(0.0));
    assert_eq!(kf.status(), FilterStatus::Empty);
    assert_eq!(kf.back().unwrap_err(), EstimateError::EmptyFilter);
    assert_eq!(kf.fast_disturbance_smooth(), Err(EstimateError::EmptyFilter));
}

// ── Smoothing ───────────────────────────────────────────────────────

#[test]
fn smoothing_requires_a_pass() {
    let mut kf = local_level(&DATA);
    kf.update().unwrap();
    assert_eq!(kf.smoothed_state_mean(0), Err(EstimateError::NotSmoothed));
    assert_eq!(
        kf.initial_scaled_state_error().unwrap_err(),
        EstimateError::NotSmoothed
    );

    kf.fast_disturbance_smooth().unwrap();
    assert_eq!(kf.status(), FilterStatus::Smoothed);
    assert_eq!(
        kf.smoothed_state_mean(5),
        Err(EstimateError::TimeIndexOutOfRange { index: 5, len: 5 })
    );

    // Smoothing twice is harmless.
    let first = kf.smoothed_state_mean(1).unwrap();
    kf.fast_disturbance_smooth().unwrap();
    assert_eq!(kf.smoothed_state_mean(1).unwrap(), first);
}

#[test]
fn last_smoothed_state_is_last_filtered_state() {
    let mut kf = local_linear_trend();
    kf.update().unwrap();
    kf.fast_disturbance_smooth().unwrap();

    let last = kf.size() - 1;
    let smoothed = kf.smoothed_state_mean(last).unwrap();
    let filtered = kf[last].contemporaneous_state_mean();
    for i in 0..2 {
        approx_eq(smoothed[i], filtered[i], 1e-10);
    }
    assert_eq!(kf.smoothed_state_disturbance(last).unwrap(), Vector::zeros(2));
}

#[test]
fn data_on_the_model_path_smooths_to_the_filtered_states() {
    let data: alloc::vec::Vec<f64> = (0..10).map(|t| 1.0 + 0.5 * t as f64).collect();
    let model =
        LinearGaussianModel::local_linear_trend(0.0, 0.0, 1.0, 1.0, 0.5, 4.0, 1.0, &data).unwrap();
    let mut kf = ScalarKalmanFilter::new(model);
    kf.update().unwrap();
    kf.fast_disturbance_smooth().unwrap();

    for t in 0..kf.size() {
        let smoothed = kf.smoothed_state_mean(t).unwrap();
        let filtered = kf[t].contemporaneous_state_mean();
        approx_eq(smoothed[0], filtered[0], 1e-12);
        approx_eq(smoothed[1], filtered[1], 1e-12);
        approx_eq(smoothed[0], data[t], 1e-12);
    }
}

#[test]
fn zero_process_noise_smooths_to_a_constant() {
    let model = LinearGaussianModel::local_level(0.0, 1.0, 0.0, 10.0, &DATA).unwrap();
    let mut kf = ScalarKalmanFilter::new(model);
    kf.update().unwrap();
    kf.fast_disturbance_smooth().unwrap();

    let last = kf.back().unwrap().contemporaneous_state_mean()[0];
    for t in 0..kf.size() {
        approx_eq(kf.smoothed_state_mean(t).unwrap()[0], last, 1e-10);
        approx_eq(kf.smoothed_state_disturbance(t).unwrap()[0], 0.0, 1e-10);
    }
}

#[test]
fn fast_smoother_matches_rts() {
    let mut kf = local_linear_trend();
    kf.update().unwrap();
    kf.fast_disturbance_smooth().unwrap();

    let n = kf.size();
    let tt = kf[0].transition().clone();
    let mut smoothed = alloc::vec![Vector::zeros(2); n];
    smoothed[n - 1] = kf[n - 1].contemporaneous_state_mean();
    for t in (0..n - 1).rev() {
        // J = Pₜ|ₜ Tᵀ Pₜ₊₁⁻¹
        let filtered_var = kf[t].contemporaneous_state_variance();
        let pinv = kf[t + 1].state_variance().inv().unwrap();
        let j = &(filtered_var.as_matrix() * &tt.transpose()) * pinv.as_matrix();
        let diff = &smoothed[t + 1] - kf[t + 1].state_mean();
        let mut s = kf[t].contemporaneous_state_mean();
        s += &j.mul_vec(&diff);
        smoothed[t] = s;
    }

    for (t, expected) in smoothed.iter().enumerate() {
        let got = kf.smoothed_state_mean(t).unwrap();
        approx_eq(got[0], expected[0], 1e-9);
        approx_eq(got[1], expected[1], 1e-9);
    }
}

#[test]
fn smoothed_disturbances_are_consistent() {
    let data = [1.0, 2.0, f64::NAN, 3.0, 2.5];
    let mut kf = local_level(&data);
    kf.update().unwrap();
    kf.fast_disturbance_smooth().unwrap();

    for t in 0..5 {
        let alpha = kf.smoothed_state_mean(t).unwrap()[0];
        let eps = kf.smoothed_observation_disturbance(t).unwrap();
        if data[t].is_nan() {
            assert_eq!(eps, 0.0);
        } else {
            // ε̂ₜ = yₜ − Zᵀα̂ₜ
            approx_eq(eps, data[t] - alpha, 1e-10);
        }
        // η̂ₜ = W rₜ
        approx_eq(
            kf.smoothed_state_disturbance(t).unwrap()[0],
            0.5 * kf[t].scaled_state_error()[0],
            1e-10,
        );
    }

    // α̂₀ = a₀ + P₀ r₋₁
    let r0 = kf.initial_scaled_state_error().unwrap()[0];
    approx_eq(kf.smoothed_state_mean(0).unwrap()[0], 2.0 * r0, 1e-12);
}

#[test]
fn smoothing_is_invalidated_by_refiltering() {
    let mut kf = local_level(&DATA);
    kf.update().unwrap();
    kf.fast_disturbance_smooth().unwrap();
    kf.update().unwrap();
    assert_eq!(kf.status(), FilterStatus::Filtered);
    assert_eq!(kf.smoothed_state_mean(0), Err(EstimateError::NotSmoothed));
    assert_eq!(kf[0].scaled_prediction_error(), 0.0);

    kf.model_mut().push_observation(4.0);
    kf.update().unwrap();
    assert_eq!(kf.size(), 6);
    let model = kf.into_model();
    assert_eq!(model.predictions_available(), 7);
}
