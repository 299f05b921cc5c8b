//! Least-squares fit of a straight line.

use ndarray as nd;
use itertools::izip;
use crate::error::{ SimError, SimResult };

/// Parameters of the line `y = slope * x + intercept`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Evaluate the line at `x`.
    pub fn eval(&self, x: f64) -> f64 { self.slope * x + self.intercept }

    /// The point where the line crosses zero, if the slope is non-zero.
    pub fn root(&self) -> Option<f64> {
        (self.slope != 0.0).then(|| -self.intercept / self.slope)
    }
}

/// Fit `y ≈ slope * x + intercept` by least squares, starting from `guess =
/// (slope, intercept)`.
///
/// The model is linear in its parameters, so a single Gauss-Newton step from
/// the guess lands on the least-squares optimum; the guess only fixes the
/// reference point the correction is computed against.
///
/// Fails if fewer than two points are given, the arrays have unequal lengths,
/// any value is not finite, or the normal equations are singular (all `x`
/// equal).
pub fn fit_linear(
    x: &nd::Array1<f64>,
    y: &nd::Array1<f64>,
    guess: (f64, f64),
) -> SimResult<LinearFit>
{
    if x.len() != y.len() {
        return Err(SimError::DimensionMismatch {
            what: "fit data", expected: x.len(), got: y.len() });
    }
    if x.len() < 2 {
        return Err(SimError::Regression(format!("need at least 2 points, got {}", x.len())));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(SimError::Regression("non-finite data".into()));
    }
    let (k0, b0) = guess;
    let n = x.len() as f64;
    let mut sx = 0.0;
    let mut sxx = 0.0;
    let mut sr = 0.0;
    let mut sxr = 0.0;
    for (&xk, &yk) in izip!(x, y) {
        let r = yk - (k0 * xk + b0);
        sx += xk;
        sxx += xk * xk;
        sr += r;
        sxr += xk * r;
    }
    let det = n * sxx - sx * sx;
    let scale = n * sxx;
    if !(det.abs() > 1e-12 * scale && det.is_finite()) {
        return Err(SimError::Regression("singular normal equations".into()));
    }
    let dk = (n * sxr - sx * sr) / det;
    let db = (sxx * sr - sx * sxr) / det;
    let fit = LinearFit { slope: k0 + dk, intercept: b0 + db };
    if !(fit.slope.is_finite() && fit.intercept.is_finite()) {
        return Err(SimError::Regression("fit did not converge".into()));
    }
    Ok(fit)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn recovers_exact_line() {
        let x = nd::Array1::linspace(-1.0, 3.0, 11);
        let y = x.mapv(|xk| -2.5 * xk + 0.75);
        let fit = fit_linear(&x, &y, (10.0, -10.0)).unwrap();
        assert!((fit.slope + 2.5).abs() < 1e-10);
        assert!((fit.intercept - 0.75).abs() < 1e-10);
        assert!((fit.root().unwrap() - 0.3).abs() < 1e-10);
    }

    #[test]
    fn singular_window_fails() {
        let x = nd::array![1.0, 1.0, 1.0];
        let y = nd::array![0.0, 1.0, 2.0];
        assert!(matches!(fit_linear(&x, &y, (0.0, 0.0)), Err(SimError::Regression(_))));
        let y = nd::array![0.0, f64::NAN, 2.0];
        let x = nd::array![0.0, 1.0, 2.0];
        assert!(matches!(fit_linear(&x, &y, (0.0, 0.0)), Err(SimError::Regression(_))));
    }
}
