//! Effective driving of the central spin by an applied field in the presence
//! of the bath, and estimates of the bath linewidth and Rabi period derived
//! from it.

use std::f64::consts::PI;
use ndarray as nd;
use num_complex::Complex64 as C64;
use rand::Rng;
use tracing::info;
use crate::{
    ensemble::SpinCluster,
    error::{ SimError, SimResult },
    fit::{ fit_linear, LinearFit },
    qubit::{ rotation, KrausSet },
    signal::ensemble_rabi,
    vector::Vec3,
};

/// Sample-averaged driving phase and axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Driving {
    /// `Ω̄ t`, where `Ω̄` is the mean magnitude of the total field.
    pub phase: f64,
    /// Mean of the per-sample unit field directions, renormalized.
    pub axis: Vec3,
    /// Mean of the per-sample unit field directions. Its norm falls below 1
    /// as the directions spread.
    pub mean_axis: Vec3,
}

/// Per-sample driving phases and axes.
#[derive(Clone, Debug, PartialEq)]
pub struct SampledDriving {
    /// `t Ω_p` for each sample.
    pub phases: nd::Array1<f64>,
    /// Unit field direction for each sample, one per row.
    pub axes: nd::Array2<f64>,
}

impl SampledDriving {
    /// Number of samples.
    pub fn len(&self) -> usize { self.phases.len() }

    /// `true` if there are no samples.
    pub fn is_empty(&self) -> bool { self.phases.is_empty() }

    /// Unit direction of sample `p`.
    pub fn axis(&self, p: usize) -> Vec3 {
        let row = self.axes.row(p);
        Vec3::new(row[0], row[1], row[2])
    }

    /// Equal-weight Kraus operators `sqrt(1/N) R(n_p, t Ω_p)` of the channel
    /// averaging the driven rotation over all samples.
    pub fn kraus_operators(&self) -> KrausSet {
        let w = (self.len() as f64).recip().sqrt();
        (0..self.len())
            .map(|p| rotation(&self.axis(p), self.phases[p]) * C64::from(w))
            .collect()
    }
}

// total field vectors and magnitudes for `n` bath samples
fn sample_fields<R>(
    h: f64,
    cluster: &SpinCluster,
    aim: Option<Vec3>,
    n: usize,
    rng: &mut R,
) -> SimResult<Vec<(Vec3, f64)>>
where R: Rng + ?Sized
{
    if n == 0 {
        return Err(SimError::TooFewSamples { what: "driving", min: 1, got: 0 });
    }
    let aim = aim.unwrap_or_else(Vec3::x).normalized()
        .ok_or(SimError::ZeroVector("aim"))?;
    let z0 = cluster.z0();
    let fields
        = (0..n)
        .map(|_| {
            let field = z0 * cluster.sample_beta(rng) + aim * h;
            let omega = field.norm();
            // a vanishing field has no direction; fall back to the
            // quantization axis with zero phase
            let dir = field.normalized().unwrap_or(z0);
            (dir, omega)
        })
        .collect();
    Ok(fields)
}

/// Average driving phase and axis for drive strength `h` applied for time `t`
/// along `aim` (default x), over `n` bath samples.
pub fn driving<R>(
    h: f64,
    t: f64,
    cluster: &SpinCluster,
    aim: Option<Vec3>,
    n: usize,
    rng: &mut R,
) -> SimResult<Driving>
where R: Rng + ?Sized
{
    let fields = sample_fields(h, cluster, aim, n, rng)?;
    let nf = fields.len() as f64;
    let omega_mean = fields.iter().map(|(_, omega)| *omega).sum::<f64>() / nf;
    let dir_sum
        = fields.iter()
        .fold(Vec3::zeros(), |acc, (dir, _)| acc + *dir);
    let mean_axis = dir_sum * nf.recip();
    let axis = mean_axis.normalized().unwrap_or_else(|| cluster.z0());
    Ok(Driving { phase: omega_mean * t, axis, mean_axis })
}

/// Per-sample driving phases and axes for drive strength `h` applied for time
/// `t` along `aim` (default x), for `n` bath samples.
pub fn sampled_driving<R>(
    h: f64,
    t: f64,
    cluster: &SpinCluster,
    aim: Option<Vec3>,
    n: usize,
    rng: &mut R,
) -> SimResult<SampledDriving>
where R: Rng + ?Sized
{
    let fields = sample_fields(h, cluster, aim, n, rng)?;
    let phases: nd::Array1<f64>
        = fields.iter().map(|(_, omega)| t * omega).collect();
    let axes: nd::Array2<f64>
        = nd::Array2::from_shape_fn((fields.len(), 3), |(p, k)| fields[p].0[k]);
    Ok(SampledDriving { phases, axes })
}

/// Estimate the dipolar linewidth as the RMS bath field over `m` disorder
/// realizations, `sqrt(<Σ_j D_j^2>)`.
///
/// `cluster` is rerolled after every realization.
pub fn linewidth<R>(cluster: &mut SpinCluster, m: usize, rng: &mut R)
    -> SimResult<f64>
where R: Rng + ?Sized
{
    if m == 0 {
        return Err(SimError::TooFewSamples { what: "linewidth", min: 1, got: 0 });
    }
    let mut acc: f64 = 0.0;
    for _ in 0..m {
        acc += cluster.field_variance();
        cluster.reroll(rng)?;
    }
    Ok((acc / m as f64).sqrt())
}

/// Parameters for [`rabi_period`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RabiPeriodParams {
    /// Number of disorder realizations.
    pub clusters: usize,
    /// Number of bath configurations per realization.
    pub samples: usize,
    /// Number of points in the fit window.
    pub points: usize,
    /// Half-width of the fit window as a fraction of its center.
    pub window: f64,
}

impl Default for RabiPeriodParams {
    fn default() -> Self {
        Self { clusters: 50, samples: 100, points: 10, window: 0.1 }
    }
}

/// Estimate the Rabi period under drive strength `h`.
///
/// With linewidth `Γ` and `ω = sqrt(h^2 + Γ^2)`, the ensemble z-signal `z(t)` is
/// sampled on `[t0 (1 - λ), t0 (1 + λ)]` around `t0 = π / (2 ω)` and converted
/// to the rotation angle `θ(t) = asin(sqrt(1/2 + z(t)))`, which falls off as
/// `π/2 - Ω t / 2`. A line `k t + b` is fitted to `θ`, starting from `(-ω,
/// π/2)`, and the period is `-2 b / k`.
///
/// The result is only meaningful while the window is short enough for `θ` to
/// be close to linear, i.e. for small `λ`.
pub fn rabi_period<R>(
    cluster: &mut SpinCluster,
    h: f64,
    params: RabiPeriodParams,
    rng: &mut R,
) -> SimResult<f64>
where R: Rng + ?Sized
{
    let RabiPeriodParams { clusters, samples, points, window } = params;
    if points < 2 {
        return Err(SimError::TooFewSamples { what: "rabi_period window", min: 2, got: points });
    }
    if !(window > 0.0 && window < 1.0) {
        return Err(SimError::invalid("window", format!("{window} is not in (0, 1)")));
    }
    if !h.is_finite() || h == 0.0 {
        return Err(SimError::invalid("h", format!("{h} drives no Rabi oscillation")));
    }
    let gamma = linewidth(cluster, clusters, rng)?;
    let omega = (h * h + gamma * gamma).sqrt();
    let t0 = PI / (2.0 * omega);
    let t = nd::Array1::linspace(t0 * (1.0 - window), t0 * (1.0 + window), points);
    let z = ensemble_rabi(&t, cluster, h, clusters, samples, 3, rng)?;
    let theta = z.mapv(|zk| (0.5 + zk).clamp(0.0, 1.0).sqrt().asin());
    let LinearFit { slope, intercept } = fit_linear(&t, &theta, (-omega, PI / 2.0))?;
    if slope.abs() <= 1e-9 * omega {
        return Err(SimError::Regression(format!("negligible slope {slope:e}")));
    }
    let period = -2.0 * intercept / slope;
    if !period.is_finite() || period <= 0.0 {
        return Err(SimError::Regression(format!("non-physical period {period:e}")));
    }
    info!(linewidth = gamma, period, "estimated rabi period");
    Ok(period)
}

#[cfg(test)]
mod test {
    use std::f64::consts::TAU;
    use crate::{
        ensemble::SpinEnsemble,
        qubit::{ approx_eq, completeness, identity },
        rng::seeded,
        sampler::Geometry,
    };
    use super::*;

    fn ensemble(num_spins: usize) -> SpinEnsemble {
        SpinEnsemble::new(1.0, 3, Vec3::z(), 1.0, num_spins, Geometry::Shell { inner: 1.0 })
            .unwrap()
    }

    #[test]
    fn driving_without_bath() {
        let ens = ensemble(1);
        let cluster = SpinCluster::from_couplings(&ens, nd::array![0.0]).unwrap();
        let mut rng = seeded(0);
        let d = driving(2.0, 0.5, &cluster, None, 10, &mut rng).unwrap();
        assert!((d.phase - 1.0).abs() < 1e-12);
        assert!((d.axis - Vec3::x()).norm() < 1e-12);
        assert!((d.mean_axis - Vec3::x()).norm() < 1e-12);
        let d = driving(2.0, 0.5, &cluster, Some(Vec3::new(0.0, 3.0, 0.0)), 10, &mut rng)
            .unwrap();
        assert!((d.axis - Vec3::y()).norm() < 1e-12);
    }

    #[test]
    fn mean_axis_shrinks_with_spread() {
        // β = ±1 with h = 1 along x: directions (1, 0, ±1) / √2
        let ens = ensemble(1);
        let cluster = SpinCluster::from_couplings(&ens, nd::array![1.0]).unwrap();
        let mut rng = seeded(5);
        let d = driving(1.0, 1.0, &cluster, None, 200, &mut rng).unwrap();
        assert!((d.mean_axis[0] - 0.5_f64.sqrt()).abs() < 1e-12);
        assert!(d.mean_axis[1].abs() < 1e-12);
        assert!(d.mean_axis.norm() < 1.0 - 1e-3);
        assert!((d.axis.norm() - 1.0).abs() < 1e-12);
        let expected = d.mean_axis.normalized().unwrap();
        assert!((d.axis - expected).norm() < 1e-12);
        assert!((d.phase - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn sampled_driving_shapes() {
        let ens = ensemble(5);
        let mut rng = seeded(8);
        let cluster = SpinCluster::new(&ens, &mut rng).unwrap();
        let s = sampled_driving(1.5, 2.0, &cluster, None, 40, &mut rng).unwrap();
        assert_eq!(s.phases.len(), 40);
        assert_eq!(s.axes.shape(), &[40, 3]);
        for p in 0..s.len() {
            assert!((s.axis(p).norm() - 1.0).abs() < 1e-12);
            assert!(s.phases[p] >= 2.0 * 1.5 - 1e-12);
        }
        let kraus = s.kraus_operators();
        assert!(approx_eq(&completeness(&kraus), &identity(), 1e-10));
    }

    #[test]
    fn zero_field_sample_uses_quantization_axis() {
        let ens = ensemble(1);
        let cluster = SpinCluster::from_couplings(&ens, nd::array![0.0]).unwrap();
        let mut rng = seeded(0);
        let s = sampled_driving(0.0, 1.0, &cluster, None, 3, &mut rng).unwrap();
        assert_eq!(s.phases, nd::array![0.0, 0.0, 0.0]);
        assert_eq!(s.axis(0), Vec3::z());
    }

    #[test]
    fn linewidth_of_fixed_couplings() {
        let ens = ensemble(2);
        let mut rng = seeded(2);
        let mut cluster = SpinCluster::from_couplings(&ens, nd::array![3.0, 4.0]).unwrap();
        // the first realization is the fixed one; later ones are random
        let g = linewidth(&mut cluster, 1, &mut rng).unwrap();
        assert!((g - 5.0).abs() < 1e-12);
    }

    #[test]
    fn rabi_period_without_bath() {
        // negligible couplings: Γ → 0 and the period is 2π / h
        let ens = SpinEnsemble::new(1e-9, 3, Vec3::z(), 1.0, 3, Geometry::Spherical).unwrap();
        let mut rng = seeded(4);
        let mut cluster = SpinCluster::new(&ens, &mut rng).unwrap();
        let params = RabiPeriodParams { clusters: 5, samples: 10, points: 11, window: 0.1 };
        let period = rabi_period(&mut cluster, TAU, params, &mut rng).unwrap();
        assert!((period - 1.0).abs() < 1e-3);
    }

    #[test]
    fn rabi_period_preconditions() {
        let ens = ensemble(2);
        let mut rng = seeded(4);
        let mut cluster = SpinCluster::new(&ens, &mut rng).unwrap();
        let params = RabiPeriodParams { points: 1, ..Default::default() };
        assert!(rabi_period(&mut cluster, 1.0, params, &mut rng).is_err());
        let params = RabiPeriodParams { window: 1.5, ..Default::default() };
        assert!(rabi_period(&mut cluster, 1.0, params, &mut rng).is_err());
    }

    #[test]
    fn rabi_period_rejects_zero_drive() {
        // no drive: z(t) is flat and the fit has no slope to speak of
        let ens = ensemble(10);
        let mut rng = seeded(4);
        let mut cluster = SpinCluster::new(&ens, &mut rng).unwrap();
        let params = RabiPeriodParams::default();
        assert!(matches!(
            rabi_period(&mut cluster, 0.0, params, &mut rng),
            Err(SimError::InvalidParameter { name: "h", .. }),
        ));
        assert!(matches!(
            rabi_period(&mut cluster, f64::NAN, params, &mut rng),
            Err(SimError::InvalidParameter { name: "h", .. }),
        ));
    }
}
