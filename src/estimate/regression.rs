use alloc::vec::Vec;

use crate::traits::{FloatScalar, VectorRef};
use crate::{Matrix, SpdMatrix, Vector};

use super::EstimateError;

/// Sufficient statistics for the multivariate regression `Y = X B + E`
/// with `xdim` predictors and `ydim` responses.
pub trait RegressionSuf<T: FloatScalar> {
    fn xdim(&self) -> usize;
    fn ydim(&self) -> usize;

    /// Number of observations.
    fn n(&self) -> usize;

    /// Sum of the observation weights.
    fn sumw(&self) -> T;

    /// `Xᵀ W X`.
    fn xtx(&self) -> Result<&SpdMatrix<T>, EstimateError>;

    /// `Xᵀ W Y`.
    fn xty(&self) -> Result<&Matrix<T>, EstimateError>;

    /// `Yᵀ W Y`.
    fn yty(&self) -> Result<&SpdMatrix<T>, EstimateError>;

    /// Least-squares coefficients, `xdim × ydim`.
    fn beta_hat(&self) -> Result<Matrix<T>, EstimateError>;

    /// Residual cross-products at `B`:
    ///
    /// ```text
    /// (Y − XB)ᵀ W (Y − XB) = YᵀWY − BᵀXᵀWY − YᵀWXB + BᵀXᵀWXB
    /// ```
    fn sse(&self, beta: &Matrix<T>) -> Result<SpdMatrix<T>, EstimateError> {
        if beta.nrows() != self.xdim() {
            return Err(EstimateError::DimensionMismatch {
                expected: self.xdim(),
                found: beta.nrows(),
            });
        }
        if beta.ncols() != self.ydim() {
            return Err(EstimateError::DimensionMismatch {
                expected: self.ydim(),
                found: beta.ncols(),
            });
        }
        let xtx = self.xtx()?;
        let xty = self.xty()?;
        let yty = self.yty()?;

        let quad = beta.tmul(&(xtx.as_matrix() * beta));
        let cross = beta.tmul(xty);
        let d = self.ydim();
        let sse = Matrix::from_fn(d, d, |i, j| {
            let (a, b) = (i.min(j), i.max(j));
            yty[(a, b)] - cross[(a, b)] - cross[(b, a)] + quad[(a, b)]
        });
        Ok(SpdMatrix::from_symmetric(sse))
    }

    /// Add another accumulator's statistics to this one.
    fn combine(&mut self, other: &Self) -> Result<(), EstimateError>
    where
        Self: Sized;

    /// Flatten to `[XᵀX, XᵀY, YᵀY, sumw, n]`.
    ///
    /// With `minimal` set, the symmetric blocks contribute only their upper
    /// triangle, column by column.
    fn vectorize(&self, minimal: bool) -> Result<Vec<T>, EstimateError>;
}

fn check_len(expected: usize, found: usize) -> Result<(), EstimateError> {
    if expected != found {
        return Err(EstimateError::DimensionMismatch { expected, found });
    }
    Ok(())
}

fn count<T: FloatScalar>(n: usize) -> T {
    T::from(n).unwrap_or_else(T::nan)
}

fn push_symmetric<T: FloatScalar>(out: &mut Vec<T>, m: &SpdMatrix<T>, minimal: bool) {
    if minimal {
        for j in 0..m.dim() {
            out.extend((0..=j).map(|i| m[(i, j)]));
        }
    } else {
        out.extend_from_slice(m.as_slice());
    }
}

// ── Normal equations ────────────────────────────────────────────────

/// Regression statistics accumulated as `XᵀX`, `XᵀY` and `YᵀY`.
///
/// Observations can be added one at a time with
/// [`update`](Self::update), and two accumulators over disjoint data can be
/// merged with [`combine`](RegressionSuf::combine).
///
/// ```
/// use scalar_kalman::estimate::{NeRegressionSuf, RegressionSuf};
/// use scalar_kalman::Vector;
///
/// let mut suf = NeRegressionSuf::<f64>::new(2, 1);
/// for (x, y) in [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)] {
///     suf.update(&Vector::from_slice(&[1.0, x]), &Vector::from_slice(&[y]), 1.0)
///         .unwrap();
/// }
/// let beta = suf.beta_hat().unwrap();
/// assert!((beta[(0, 0)] - 1.0).abs() < 1e-12);
/// assert!((beta[(1, 0)] - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NeRegressionSuf<T> {
    xtx: SpdMatrix<T>,
    xty: Matrix<T>,
    yty: SpdMatrix<T>,
    n: usize,
    sumw: T,
}

impl<T: FloatScalar> NeRegressionSuf<T> {
    pub fn new(xdim: usize, ydim: usize) -> Self {
        Self {
            xtx: SpdMatrix::zeros(xdim),
            xty: Matrix::zeros(xdim, ydim),
            yty: SpdMatrix::zeros(ydim),
            n: 0,
            sumw: T::zero(),
        }
    }

    /// Statistics of the rows of `x` (`n × xdim`) and `y` (`n × ydim`).
    ///
    /// `XᵀX` is formed as `RᵀR` and `XᵀY` as `Rᵀ QᵀY` from a QR
    /// decomposition of `x`. Designs with fewer rows than columns, or a
    /// zero column, fall back to direct products.
    pub fn from_data(x: &Matrix<T>, y: &Matrix<T>) -> Result<Self, EstimateError> {
        check_len(x.nrows(), y.nrows())?;
        let (xtx, xty) = match x.qr() {
            Ok(qr) => (qr.inner(), qr.r().tmul(&qr.qt_mul(y)?)),
            Err(_) => (x.inner(), x.tmul(y)),
        };
        Ok(Self {
            xtx,
            xty,
            yty: y.inner(),
            n: x.nrows(),
            sumw: count(x.nrows()),
        })
    }

    /// Add one observation with weight `w`.
    pub fn update(
        &mut self,
        x: &impl VectorRef<T>,
        y: &impl VectorRef<T>,
        w: T,
    ) -> Result<(), EstimateError> {
        check_len(self.xdim(), x.len())?;
        check_len(self.ydim(), y.len())?;
        self.xtx.add_outer(x, w);
        self.xty.add_outer(x, y, w);
        self.yty.add_outer(y, w);
        self.n += 1;
        self.sumw = self.sumw + w;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.xtx.set_zero();
        self.xty.set_all(T::zero());
        self.yty.set_zero();
        self.n = 0;
        self.sumw = T::zero();
    }
}

impl<T: FloatScalar> RegressionSuf<T> for NeRegressionSuf<T> {
    fn xdim(&self) -> usize {
        self.xtx.dim()
    }

    fn ydim(&self) -> usize {
        self.yty.dim()
    }

    fn n(&self) -> usize {
        self.n
    }

    fn sumw(&self) -> T {
        self.sumw
    }

    fn xtx(&self) -> Result<&SpdMatrix<T>, EstimateError> {
        Ok(&self.xtx)
    }

    fn xty(&self) -> Result<&Matrix<T>, EstimateError> {
        Ok(&self.xty)
    }

    fn yty(&self) -> Result<&SpdMatrix<T>, EstimateError> {
        Ok(&self.yty)
    }

    fn beta_hat(&self) -> Result<Matrix<T>, EstimateError> {
        Ok(self.xtx.solve_matrix(&self.xty)?)
    }

    fn combine(&mut self, other: &Self) -> Result<(), EstimateError> {
        check_len(self.xdim(), other.xdim())?;
        check_len(self.ydim(), other.ydim())?;
        self.xtx += &other.xtx;
        self.xty += &other.xty;
        self.yty += &other.yty;
        self.n += other.n;
        self.sumw = self.sumw + other.sumw;
        Ok(())
    }

    fn vectorize(&self, minimal: bool) -> Result<Vec<T>, EstimateError> {
        let mut out = Vec::new();
        push_symmetric(&mut out, &self.xtx, minimal);
        out.extend_from_slice(self.xty.as_slice());
        push_symmetric(&mut out, &self.yty, minimal);
        out.push(self.sumw);
        out.push(count(self.n));
        Ok(out)
    }
}

// ── QR ──────────────────────────────────────────────────────────────

/// Regression statistics recomputed from the raw design by QR.
///
/// Adding observations marks the accumulator stale; accessors then fail
/// with [`EstimateError::Stale`] until [`refresh`](Self::refresh) is
/// called. Weighted rows enter the decomposition scaled by `√w`.
///
/// ```
/// use scalar_kalman::estimate::{QrRegressionSuf, RegressionSuf};
/// use scalar_kalman::Vector;
///
/// let mut suf = QrRegressionSuf::<f64>::new(1, 1);
/// suf.add_observation(&Vector::from_slice(&[1.0]), &Vector::from_slice(&[2.0]), 1.0)
///     .unwrap();
/// assert!(suf.is_stale());
/// assert!(suf.beta_hat().is_err());
///
/// suf.refresh().unwrap();
/// assert!((suf.beta_hat().unwrap()[(0, 0)] - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct QrRegressionSuf<T> {
    xdim: usize,
    ydim: usize,
    x_rows: Vec<Vector<T>>,
    y_rows: Vec<Vector<T>>,
    weights: Vec<T>,
    xtx: SpdMatrix<T>,
    xty: Matrix<T>,
    yty: SpdMatrix<T>,
    beta: Matrix<T>,
    stale: bool,
}

impl<T: FloatScalar> QrRegressionSuf<T> {
    pub fn new(xdim: usize, ydim: usize) -> Self {
        Self {
            xdim,
            ydim,
            x_rows: Vec::new(),
            y_rows: Vec::new(),
            weights: Vec::new(),
            xtx: SpdMatrix::zeros(xdim),
            xty: Matrix::zeros(xdim, ydim),
            yty: SpdMatrix::zeros(ydim),
            beta: Matrix::zeros(xdim, ydim),
            stale: false,
        }
    }

    /// Build from a design `x` and responses `y` with unit weights.
    pub fn from_data(x: &Matrix<T>, y: &Matrix<T>) -> Result<Self, EstimateError> {
        check_len(x.nrows(), y.nrows())?;
        let mut suf = Self::new(x.ncols(), y.ncols());
        for i in 0..x.nrows() {
            suf.x_rows.push(x.row_vector(i));
            suf.y_rows.push(y.row_vector(i));
            suf.weights.push(T::one());
        }
        suf.stale = true;
        suf.refresh()?;
        Ok(suf)
    }

    /// Append one row with weight `w`. Marks the statistics stale.
    pub fn add_observation(
        &mut self,
        x: &impl VectorRef<T>,
        y: &impl VectorRef<T>,
        w: T,
    ) -> Result<(), EstimateError> {
        check_len(self.xdim, x.len())?;
        check_len(self.ydim, y.len())?;
        if !w.is_finite() || w < T::zero() {
            return Err(EstimateError::InvalidModel(
                "regression weights must be finite and non-negative",
            ));
        }
        self.x_rows.push((0..x.len()).map(|i| *x.get(i)).collect());
        self.y_rows.push((0..y.len()).map(|i| *y.get(i)).collect());
        self.weights.push(w);
        self.stale = true;
        Ok(())
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Recompute every statistic from the stored rows.
    ///
    /// On failure the accumulator stays stale.
    pub fn refresh(&mut self) -> Result<(), EstimateError> {
        if !self.stale {
            return Ok(());
        }
        let m = self.x_rows.len();
        if m == 0 {
            self.xtx.set_zero();
            self.xty.set_all(T::zero());
            self.yty.set_zero();
            self.beta.set_all(T::zero());
            self.stale = false;
            return Ok(());
        }

        let sw: Vec<T> = self.weights.iter().map(|w| w.sqrt()).collect();
        let x = Matrix::from_fn(m, self.xdim, |i, j| self.x_rows[i][j] * sw[i]);
        let y = Matrix::from_fn(m, self.ydim, |i, j| self.y_rows[i][j] * sw[i]);

        let qr = x.qr()?;
        let qty = qr.qt_mul(&y)?;
        let beta = qr.r_solve_matrix(&qty)?;

        self.xtx = qr.inner();
        self.xty = qr.r().tmul(&qty);
        self.yty = y.inner();
        self.beta = beta;
        self.stale = false;
        Ok(())
    }

    fn fresh<'a, R>(&'a self, value: &'a R) -> Result<&'a R, EstimateError> {
        if self.stale {
            Err(EstimateError::Stale)
        } else {
            Ok(value)
        }
    }
}

impl<T: FloatScalar> RegressionSuf<T> for QrRegressionSuf<T> {
    fn xdim(&self) -> usize {
        self.xdim
    }

    fn ydim(&self) -> usize {
        self.ydim
    }

    fn n(&self) -> usize {
        self.x_rows.len()
    }

    fn sumw(&self) -> T {
        self.weights.iter().fold(T::zero(), |acc, &w| acc + w)
    }

    fn xtx(&self) -> Result<&SpdMatrix<T>, EstimateError> {
        self.fresh(&self.xtx)
    }

    fn xty(&self) -> Result<&Matrix<T>, EstimateError> {
        self.fresh(&self.xty)
    }

    fn yty(&self) -> Result<&SpdMatrix<T>, EstimateError> {
        self.fresh(&self.yty)
    }

    fn beta_hat(&self) -> Result<Matrix<T>, EstimateError> {
        self.fresh(&self.beta).cloned()
    }

    fn combine(&mut self, _other: &Self) -> Result<(), EstimateError> {
        Err(EstimateError::Unsupported(
            "QR statistics cannot be combined; use NeRegressionSuf",
        ))
    }

    fn vectorize(&self, _minimal: bool) -> Result<Vec<T>, EstimateError> {
        Err(EstimateError::Unsupported(
            "QR statistics cannot be vectorized; use NeRegressionSuf",
        ))
    }
}
