//! Free-induction decay and Rabi signals of a central spin in a dipolar bath.
//!
//! Every estimator here follows the same two-level Monte-Carlo pattern. For a
//! fixed [`SpinCluster`], `n` bath configurations are drawn, each giving a
//! field offset `β`, and a closed-form signal is averaged over them with
//! [`RunningStats`]. The ensemble (disorder) versions repeat this for `m`
//! clusters, [rerolling][SpinCluster::reroll] after each one, and accumulate
//! the per-cluster means with the same update rule.
//!
//! The ensemble variance is therefore the variance of the per-cluster means.
//! It mixes the within-cluster and across-cluster fluctuations instead of
//! decomposing them.

use ndarray as nd;
use rand::Rng;
use rayon::prelude::*;
use tracing::debug;
use crate::{
    ensemble::{ SpinCluster, SpinEnsemble },
    error::{ SimError, SimResult },
    rng,
    stats::{ Estimate, RunningStats },
};

/// Bloch-vector projection selector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl TryFrom<usize> for Axis {
    type Error = SimError;

    /// `1 ↦ X`, `2 ↦ Y`, `3 ↦ Z`.
    fn try_from(k: usize) -> SimResult<Self> {
        match k {
            1 => Ok(Self::X),
            2 => Ok(Self::Y),
            3 => Ok(Self::Z),
            _ => Err(SimError::InvalidAxis(k)),
        }
    }
}

fn check_time(t: &nd::Array1<f64>) -> SimResult<()> {
    if t.is_empty() { Err(SimError::EmptyTime) } else { Ok(()) }
}

fn check_samples(what: &'static str, min: usize, got: usize) -> SimResult<()> {
    if got < min {
        Err(SimError::TooFewSamples { what, min, got })
    } else {
        Ok(())
    }
}

/// FID signal for a single field offset `beta` under transverse field `h`:
/// ```text
/// ω = sqrt(h^2 + β^2) / 2
/// f(t) = [cos^2(ω t) + sin^2(ω t) (β^2 - h^2) / (β^2 + h^2)] / 2
/// ```
///
/// Returns `1/2` everywhere in the zero-field limit.
pub fn fid_single(t: &nd::Array1<f64>, beta: f64, h: f64) -> nd::Array1<f64> {
    let omega2 = h * h + beta * beta;
    if omega2 == 0.0 { return nd::Array1::from_elem(t.len(), 0.5); }
    let w = omega2.sqrt() / 2.0;
    let ratio = (beta * beta - h * h) / omega2;
    t.mapv(|tk| {
        let (s, c) = (w * tk).sin_cos();
        (c * c + s * s * ratio) / 2.0
    })
}

/// Exact zero-field FID of a cluster, `½ ∏_j cos(D_j t)`.
pub fn fid_exact(t: &nd::Array1<f64>, cluster: &SpinCluster) -> nd::Array1<f64> {
    t.mapv(|tk| {
        0.5 * cluster.couplings().iter().map(|d| (d * tk).cos()).product::<f64>()
    })
}

/// Bloch-vector projection (halved) along `axis` for a spin starting in `|↑⟩`
/// under field offset `beta` along the quantization axis and drive `h`.
/// With `Ω = sqrt(h^2 + β^2)`:
/// ```text
/// x(t) = β h (1 - cos Ω t) / (2 Ω^2)
/// y(t) = -h sin(Ω t) / (2 Ω)
/// z(t) = (β^2 + h^2 cos Ω t) / (2 Ω^2)
/// ```
///
/// The zero-field limit `Ω = 0` gives the unperturbed `(0, 0, 1/2)`.
pub fn rabi_single(t: &nd::Array1<f64>, beta: f64, h: f64, axis: Axis)
    -> nd::Array1<f64>
{
    let omega2 = h * h + beta * beta;
    if omega2 == 0.0 {
        let v = if axis == Axis::Z { 0.5 } else { 0.0 };
        return nd::Array1::from_elem(t.len(), v);
    }
    let omega = omega2.sqrt();
    match axis {
        Axis::X => t.mapv(|tk| beta * h * (1.0 - (omega * tk).cos()) / (2.0 * omega2)),
        Axis::Y => t.mapv(|tk| -h * (omega * tk).sin() / (2.0 * omega)),
        Axis::Z => t.mapv(|tk| (beta * beta + h * h * (omega * tk).cos()) / (2.0 * omega2)),
    }
}

// inner Monte-Carlo loop over bath configurations of a fixed cluster
fn sample_cluster<R, F>(
    t: &nd::Array1<f64>,
    cluster: &SpinCluster,
    n: usize,
    rng: &mut R,
    signal: F,
) -> RunningStats
where
    R: Rng + ?Sized,
    F: Fn(&nd::Array1<f64>, f64) -> nd::Array1<f64>,
{
    let mut stats = RunningStats::new(t.len());
    for _ in 0..n {
        let beta = cluster.sample_beta(rng);
        stats.push(&signal(t, beta));
    }
    stats
}

/// Monte-Carlo FID of a single cluster, averaged over `n` bath configurations.
///
/// For `h == 0` the exact [`fid_exact`] is returned and no sampling happens.
pub fn fid<R>(
    t: &nd::Array1<f64>,
    cluster: &SpinCluster,
    h: f64,
    n: usize,
    rng: &mut R,
) -> SimResult<nd::Array1<f64>>
where R: Rng + ?Sized
{
    check_time(t)?;
    if h == 0.0 { return Ok(fid_exact(t, cluster)); }
    check_samples("fid", 1, n)?;
    Ok(sample_cluster(t, cluster, n, rng, |t, b| fid_single(t, b, h)).mean())
}

/// Like [`fid`], but also returning the sample variance.
///
/// The exact `h == 0` path has zero variance.
pub fn fid_with_variance<R>(
    t: &nd::Array1<f64>,
    cluster: &SpinCluster,
    h: f64,
    n: usize,
    rng: &mut R,
) -> SimResult<Estimate>
where R: Rng + ?Sized
{
    check_time(t)?;
    if h == 0.0 {
        return Ok(Estimate {
            mean: fid_exact(t, cluster),
            var: nd::Array1::zeros(t.len()),
        });
    }
    check_samples("fid", 2, n)?;
    Ok(sample_cluster(t, cluster, n, rng, |t, b| fid_single(t, b, h)).finish())
}

/// Monte-Carlo Rabi signal of a single cluster along `axis` (`1 ↦ x`,
/// `2 ↦ y`, `3 ↦ z`), averaged over `n` bath configurations.
pub fn rabi<R>(
    t: &nd::Array1<f64>,
    cluster: &SpinCluster,
    h: f64,
    n: usize,
    axis: usize,
    rng: &mut R,
) -> SimResult<nd::Array1<f64>>
where R: Rng + ?Sized
{
    let axis = Axis::try_from(axis)?;
    check_time(t)?;
    check_samples("rabi", 1, n)?;
    Ok(sample_cluster(t, cluster, n, rng, |t, b| rabi_single(t, b, h, axis)).mean())
}

/// Like [`rabi`], but also returning the sample variance.
pub fn rabi_with_variance<R>(
    t: &nd::Array1<f64>,
    cluster: &SpinCluster,
    h: f64,
    n: usize,
    axis: usize,
    rng: &mut R,
) -> SimResult<Estimate>
where R: Rng + ?Sized
{
    let axis = Axis::try_from(axis)?;
    check_time(t)?;
    check_samples("rabi", 2, n)?;
    Ok(sample_cluster(t, cluster, n, rng, |t, b| rabi_single(t, b, h, axis)).finish())
}

// outer Monte-Carlo loop over disorder realizations
fn sample_ensemble<R, F>(
    t: &nd::Array1<f64>,
    cluster: &mut SpinCluster,
    m: usize,
    rng: &mut R,
    mut inner: F,
) -> SimResult<RunningStats>
where
    R: Rng + ?Sized,
    F: FnMut(&SpinCluster, &mut R) -> SimResult<nd::Array1<f64>>,
{
    let mut stats = RunningStats::new(t.len());
    for k in 0..m {
        stats.push(&inner(cluster, rng)?);
        cluster.reroll(rng)?;
        debug!(realization = k + 1, total = m, "disorder realization done");
    }
    Ok(stats)
}

/// FID averaged over `m` disorder realizations of `n` bath configurations
/// each.
///
/// `cluster` is rerolled after every realization and is left in a fresh
/// state on return.
pub fn ensemble_fid<R>(
    t: &nd::Array1<f64>,
    cluster: &mut SpinCluster,
    h: f64,
    m: usize,
    n: usize,
    rng: &mut R,
) -> SimResult<nd::Array1<f64>>
where R: Rng + ?Sized
{
    check_time(t)?;
    check_samples("ensemble_fid", 1, m)?;
    if h != 0.0 { check_samples("fid", 1, n)?; }
    sample_ensemble(t, cluster, m, rng, |c, rng| fid(t, c, h, n, rng))
        .map(|stats| stats.mean())
}

/// Like [`ensemble_fid`], but also returning the variance of the
/// per-realization means.
pub fn ensemble_fid_with_variance<R>(
    t: &nd::Array1<f64>,
    cluster: &mut SpinCluster,
    h: f64,
    m: usize,
    n: usize,
    rng: &mut R,
) -> SimResult<Estimate>
where R: Rng + ?Sized
{
    check_time(t)?;
    check_samples("ensemble_fid", 2, m)?;
    if h != 0.0 { check_samples("fid", 1, n)?; }
    sample_ensemble(t, cluster, m, rng, |c, rng| fid(t, c, h, n, rng))
        .map(|stats| stats.finish())
}

/// Rabi signal averaged over `m` disorder realizations of `n` bath
/// configurations each.
///
/// `cluster` is rerolled after every realization.
pub fn ensemble_rabi<R>(
    t: &nd::Array1<f64>,
    cluster: &mut SpinCluster,
    h: f64,
    m: usize,
    n: usize,
    axis: usize,
    rng: &mut R,
) -> SimResult<nd::Array1<f64>>
where R: Rng + ?Sized
{
    Axis::try_from(axis)?;
    check_time(t)?;
    check_samples("ensemble_rabi", 1, m)?;
    check_samples("rabi", 1, n)?;
    sample_ensemble(t, cluster, m, rng, |c, rng| rabi(t, c, h, n, axis, rng))
        .map(|stats| stats.mean())
}

/// Like [`ensemble_rabi`], but also returning the variance of the
/// per-realization means.
pub fn ensemble_rabi_with_variance<R>(
    t: &nd::Array1<f64>,
    cluster: &mut SpinCluster,
    h: f64,
    m: usize,
    n: usize,
    axis: usize,
    rng: &mut R,
) -> SimResult<Estimate>
where R: Rng + ?Sized
{
    Axis::try_from(axis)?;
    check_time(t)?;
    check_samples("ensemble_rabi", 2, m)?;
    check_samples("rabi", 1, n)?;
    sample_ensemble(t, cluster, m, rng, |c, rng| rabi(t, c, h, n, axis, rng))
        .map(|stats| stats.finish())
}

// parallel outer loop: realization `k` draws its own cluster from substream `k`
// of `seed`; per-realization means are reduced in order afterwards
fn par_sample_ensemble<F>(
    t: &nd::Array1<f64>,
    ensemble: &SpinEnsemble,
    m: usize,
    seed: u64,
    inner: F,
) -> SimResult<RunningStats>
where F: Fn(&SpinCluster, &mut rand::rngs::StdRng) -> SimResult<nd::Array1<f64>> + Sync
{
    let means: Vec<nd::Array1<f64>>
        = (0..m).into_par_iter()
        .map(|k| {
            let mut rng = rng::substream(seed, k as u64);
            let cluster = SpinCluster::new(ensemble, &mut rng)?;
            inner(&cluster, &mut rng)
        })
        .collect::<SimResult<_>>()?;
    let mut stats = RunningStats::new(t.len());
    means.iter().for_each(|f| stats.push(f));
    debug!(realizations = m, "parallel ensemble done");
    Ok(stats)
}

/// Parallel counterpart to [`ensemble_fid_with_variance`].
///
/// Each of the `m` realizations uses an independent cluster and random stream
/// derived from `seed`, so the result depends only on the arguments.
pub fn par_ensemble_fid(
    t: &nd::Array1<f64>,
    ensemble: &SpinEnsemble,
    h: f64,
    m: usize,
    n: usize,
    seed: u64,
) -> SimResult<Estimate>
{
    check_time(t)?;
    check_samples("par_ensemble_fid", 2, m)?;
    if h != 0.0 { check_samples("fid", 1, n)?; }
    par_sample_ensemble(t, ensemble, m, seed, |c, rng| fid(t, c, h, n, rng))
        .map(|stats| stats.finish())
}

/// Parallel counterpart to [`ensemble_rabi_with_variance`].
pub fn par_ensemble_rabi(
    t: &nd::Array1<f64>,
    ensemble: &SpinEnsemble,
    h: f64,
    m: usize,
    n: usize,
    axis: usize,
    seed: u64,
) -> SimResult<Estimate>
{
    Axis::try_from(axis)?;
    check_time(t)?;
    check_samples("par_ensemble_rabi", 2, m)?;
    check_samples("rabi", 1, n)?;
    par_sample_ensemble(t, ensemble, m, seed, |c, rng| rabi(t, c, h, n, axis, rng))
        .map(|stats| stats.finish())
}
