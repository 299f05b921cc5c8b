//! Step-resolved evolution of the central spin through repeated passes of a
//! [`Sequence`].
//!
//! Every idle period is split into `n` equal sub-steps so that the free
//! precession between gates is resolved in time, while each gate is recorded
//! once. Operators for the idle sub-step and for every gate (forward and
//! inverse) are built once up front and reused for all `cycle` passes. The
//! initial state is not recorded, so a trajectory through a sequence with `k`
//! idle markers and `g` gate markers holds `cycle * (k * n + g)` states.

use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::debug;
use crate::{
    error::{ SimError, SimResult },
    pulse::{ normalize_weights, Propagator },
    qubit::{ apply_channel, dagger, stack_arrays, KrausSet },
    sequence::{ Sequence, Step },
    vector::Vec3,
};

/// Time stamps paired with the states recorded at them, with time running
/// along the last axis of `states`.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory<S> {
    pub time: nd::Array1<f64>,
    pub states: S,
}

impl<S> Trajectory<S> {
    /// Number of recorded time points.
    pub fn len(&self) -> usize { self.time.len() }

    /// `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool { self.time.is_empty() }
}

/// Number of recorded states per pass through `seq` with `n` idle sub-steps.
pub fn steps_per_cycle(seq: &Sequence, n: usize) -> usize {
    let k = seq.num_idle();
    k * n + (seq.order().len() - k)
}

// precomputed operators for the idle sub-step and each gate
struct StepOps<O> {
    idle: O,
    forward: Vec<O>,
    inverse: Vec<O>,
}

impl<O> StepOps<O> {
    fn get(&self, step: Step) -> &O {
        match step {
            Step::Idle => &self.idle,
            Step::Gate(k) => &self.forward[k - 1],
            Step::Inverse(k) => &self.inverse[k - 1],
        }
    }

    fn run<S, F>(&self, seq: &Sequence, n: usize, cycle: usize, init: S, apply: F)
        -> Vec<S>
    where
        S: Clone,
        F: Fn(&O, &S) -> S,
    {
        let mut states: Vec<S> = Vec::with_capacity(steps_per_cycle(seq, n) * cycle);
        let mut cur = init;
        for _ in 0..cycle {
            for &step in seq.order() {
                let reps = if step == Step::Idle { n } else { 1 };
                let op = self.get(step);
                for _ in 0..reps {
                    cur = apply(op, &cur);
                    states.push(cur.clone());
                }
            }
        }
        states
    }
}

fn unitary_ops(seq: &Sequence, n: usize, beta: f64, z0: &Vec3)
    -> StepOps<nd::Array2<C64>>
{
    let idle = seq.idle().subdivide(n).unitary(beta, z0);
    let forward: Vec<nd::Array2<C64>>
        = seq.gates().map(|(_, gate)| gate.unitary(beta, z0)).collect();
    let inverse: Vec<nd::Array2<C64>>
        = forward.iter().map(|u| dagger(u)).collect();
    StepOps { idle, forward, inverse }
}

fn kraus_ops(
    seq: &Sequence,
    n: usize,
    betas: &nd::Array1<f64>,
    weights: &nd::Array1<f64>,
    z0: &Vec3,
) -> SimResult<StepOps<KrausSet>>
{
    let idle = seq.idle().subdivide(n).kraus_operators(betas, Some(weights), z0)?;
    let forward: Vec<KrausSet>
        = seq.gates()
        .map(|(_, gate)| gate.kraus_operators(betas, Some(weights), z0))
        .collect::<SimResult<_>>()?;
    let inverse: Vec<KrausSet>
        = forward.iter()
        .map(|kraus| kraus.iter().map(|k| dagger(k)).collect())
        .collect();
    Ok(StepOps { idle, forward, inverse })
}

// cumulative time after every recorded step, tiled over `cycle` passes
fn time_ticks(seq: &Sequence, n: usize, cycle: usize) -> nd::Array1<f64> {
    let dt_idle = seq.idle().subdivide(n).duration;
    let mut ticks: Vec<f64> = Vec::with_capacity(steps_per_cycle(seq, n));
    let mut t: f64 = 0.0;
    for &step in seq.order() {
        if step == Step::Idle {
            for _ in 0..n {
                t += dt_idle;
                ticks.push(t);
            }
        } else {
            t += seq.step_duration(step);
            ticks.push(t);
        }
    }
    let period = t;
    (0..cycle)
        .flat_map(|c| {
            let offset = c as f64 * period;
            ticks.iter().map(move |tk| offset + tk)
        })
        .collect()
}

fn check_counts(seq: &Sequence, n: usize, cycle: usize) -> SimResult<()> {
    if n == 0 {
        return Err(SimError::invalid("n", "idle periods need at least one sub-step"));
    }
    if cycle == 0 {
        return Err(SimError::invalid("cycle", "need at least one pass"));
    }
    if seq.order().is_empty() {
        return Err(SimError::invalid("seq", "order is empty"));
    }
    Ok(())
}

fn check_density(rho0: &nd::Array2<C64>) -> SimResult<()> {
    let (r, c) = rho0.dim();
    if r != 2 || c != 2 {
        return Err(SimError::DimensionMismatch {
            what: "density matrix", expected: 2, got: r.max(c) });
    }
    Ok(())
}

/// Evolve the pure state `psi0` through `cycle` passes of `seq` under a fixed
/// bath offset `beta` along `z0`, with each idle period split into `n`
/// sub-steps.
///
/// States are stacked along axis 1 of the returned `2 × T` array.
pub fn deploy_pure(
    psi0: &nd::Array1<C64>,
    seq: &Sequence,
    n: usize,
    beta: f64,
    z0: &Vec3,
    cycle: usize,
) -> SimResult<Trajectory<nd::Array2<C64>>>
{
    check_counts(seq, n, cycle)?;
    if psi0.len() != 2 {
        return Err(SimError::DimensionMismatch {
            what: "state vector", expected: 2, got: psi0.len() });
    }
    let ops = unitary_ops(seq, n, beta, z0);
    let states = ops.run(seq, n, cycle, psi0.clone(), |u, psi| u.dot(psi));
    debug!(steps = states.len(), "deployed pure state");
    let time = time_ticks(seq, n, cycle);
    let states = stack_arrays(nd::Axis(1), &states)?;
    Ok(Trajectory { time, states })
}

/// Evolve the density matrix `rho0` through `cycle` passes of `seq`, applying
/// at every step the channel that mixes the step's unitaries over bath
/// offsets `betas` with weights `weights` (uniform if `None`).
///
/// The bath offset is redrawn independently at every step. States are stacked
/// along axis 2 of the returned `2 × 2 × T` array.
pub fn deploy_density(
    rho0: &nd::Array2<C64>,
    seq: &Sequence,
    n: usize,
    betas: &nd::Array1<f64>,
    weights: Option<&nd::Array1<f64>>,
    z0: &Vec3,
    cycle: usize,
) -> SimResult<Trajectory<nd::Array3<C64>>>
{
    check_counts(seq, n, cycle)?;
    check_density(rho0)?;
    let c = normalize_weights(betas.len(), weights)?;
    let ops = kraus_ops(seq, n, betas, &c, z0)?;
    let states = ops.run(seq, n, cycle, rho0.clone(), |kraus, rho| apply_channel(kraus, rho));
    debug!(steps = states.len(), kraus = betas.len(), "deployed density matrix");
    let time = time_ticks(seq, n, cycle);
    let states = stack_arrays(nd::Axis(2), &states)?;
    Ok(Trajectory { time, states })
}

/// Like [`deploy_density`], but with the bath offset held fixed over the whole
/// trajectory: `ρ(t) = Σ_k c_k U_k(t) ρ0 U_k(t)†`.
pub fn deploy_quasistatic(
    rho0: &nd::Array2<C64>,
    seq: &Sequence,
    n: usize,
    betas: &nd::Array1<f64>,
    weights: Option<&nd::Array1<f64>>,
    z0: &Vec3,
    cycle: usize,
) -> SimResult<Trajectory<nd::Array3<C64>>>
{
    check_counts(seq, n, cycle)?;
    check_density(rho0)?;
    let c = normalize_weights(betas.len(), weights)?;
    let len = steps_per_cycle(seq, n) * cycle;
    let mut acc: Vec<nd::Array2<C64>> = vec![nd::Array2::zeros((2, 2)); len];
    for (&beta, &ck) in betas.iter().zip(c.iter()) {
        let ops = unitary_ops(seq, n, beta, z0);
        let states = ops.run(
            seq, n, cycle, rho0.clone(), |u, rho| u.dot(rho).dot(&dagger(u)));
        acc.iter_mut()
            .zip(states)
            .for_each(|(a, rho)| { a.scaled_add(C64::from(ck), &rho); });
    }
    debug!(steps = len, kraus = betas.len(), "deployed quasistatic mixture");
    let time = time_ticks(seq, n, cycle);
    let states = stack_arrays(nd::Axis(2), &acc)?;
    Ok(Trajectory { time, states })
}

#[cfg(test)]
mod test {
    use std::f64::consts::PI;
    use crate::{
        pulse::{ Idle, SquarePulse },
        qubit::{ bloch, bloch_pure, outer_prod, trace, up },
        signal::{ rabi_single, Axis },
    };
    use super::*;

    fn echo() -> Sequence {
        let x = SquarePulse::rotation(PI, 4.0, Vec3::x()).unwrap();
        Sequence::new(Idle::new(1.0).unwrap(), [("X", x)], &[0, 1, 0, -1]).unwrap()
    }

    #[test]
    fn trajectory_length_and_time() {
        let seq = echo();
        let psi0 = up();
        let traj = deploy_pure(&psi0, &seq, 4, 0.3, &Vec3::z(), 3).unwrap();
        assert_eq!(steps_per_cycle(&seq, 4), 10);
        assert_eq!(traj.len(), 30);
        assert_eq!(traj.states.shape(), &[2, 30]);
        assert!((traj.time[0] - 0.25).abs() < 1e-12);
        assert!((traj.time[29] - 3.0 * seq.duration()).abs() < 1e-12);
        assert!(traj.time.windows(2).into_iter().all(|w| w[1] > w[0]));
    }

    #[test]
    fn pure_deploy_matches_rabi_formulas() {
        let (h, beta, tau) = (2.0, 0.7, 0.15);
        let x = SquarePulse::new(tau, h, Vec3::x()).unwrap();
        let seq = Sequence::new(Idle::new(1.0).unwrap(), [("X", x)], &[1]).unwrap();
        let traj = deploy_pure(&up(), &seq, 1, beta, &Vec3::z(), 20).unwrap();
        let proj: Vec<nd::Array1<f64>>
            = [Axis::X, Axis::Y, Axis::Z].into_iter()
            .map(|ax| rabi_single(&traj.time, beta, h, ax))
            .collect();
        for (i, psi) in traj.states.axis_iter(nd::Axis(1)).enumerate() {
            let b = bloch_pure(&psi.to_owned());
            for k in 0..3 {
                assert!((b[k] / 2.0 - proj[k][i]).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn density_deploy_preserves_trace() {
        let seq = echo();
        let rho0 = outer_prod(&up(), &up());
        let betas = nd::array![-1.0, -0.2, 0.4, 1.5];
        let traj = deploy_density(&rho0, &seq, 3, &betas, None, &Vec3::z(), 2).unwrap();
        assert_eq!(traj.states.shape(), &[2, 2, 16]);
        for rho in traj.states.axis_iter(nd::Axis(2)) {
            let rho = rho.to_owned();
            assert!((trace(&rho) - C64::from(1.0)).norm() < 1e-10);
            assert!(bloch(&rho).norm() <= 1.0 + 1e-10);
        }
    }

    #[test]
    fn single_offset_channels_agree_with_pure_deploy() {
        let seq = echo();
        let psi0 = (up() + crate::qubit::down()) * C64::from(0.5_f64.sqrt());
        let rho0 = outer_prod(&psi0, &psi0);
        let betas = nd::array![0.45];
        let pure = deploy_pure(&psi0, &seq, 2, 0.45, &Vec3::z(), 2).unwrap();
        let dens = deploy_density(&rho0, &seq, 2, &betas, None, &Vec3::z(), 2).unwrap();
        let stat = deploy_quasistatic(&rho0, &seq, 2, &betas, None, &Vec3::z(), 2).unwrap();
        assert_eq!(pure.time, dens.time);
        for i in 0..pure.len() {
            let psi = pure.states.column(i).to_owned();
            let expected = outer_prod(&psi, &psi);
            let d = dens.states.index_axis(nd::Axis(2), i).to_owned();
            let s = stat.states.index_axis(nd::Axis(2), i).to_owned();
            assert!(crate::qubit::approx_eq(&d, &expected, 1e-10));
            assert!(crate::qubit::approx_eq(&s, &expected, 1e-10));
        }
    }

    #[test]
    fn quasistatic_echo_refocuses() {
        // a static offset is undone by the echo; independent redraws are not
        let x = SquarePulse::rotation(PI, 100.0, Vec3::x()).unwrap();
        let seq = Sequence::new(Idle::new(1.0).unwrap(), [("X", x)], &[0, 1, 0, -1]).unwrap();
        let psi0 = (up() + crate::qubit::down()) * C64::from(0.5_f64.sqrt());
        let rho0 = outer_prod(&psi0, &psi0);
        let betas = nd::array![-0.3, 0.3];
        let stat = deploy_quasistatic(&rho0, &seq, 1, &betas, None, &Vec3::z(), 1).unwrap();
        let last = stat.states.index_axis(nd::Axis(2), stat.len() - 1).to_owned();
        assert!((bloch(&last).norm() - 1.0).abs() < 1e-2);
        let dens = deploy_density(&rho0, &seq, 1, &betas, None, &Vec3::z(), 1).unwrap();
        let last = dens.states.index_axis(nd::Axis(2), dens.len() - 1).to_owned();
        assert!(bloch(&last).norm() < 0.95);
    }

    #[test]
    fn preconditions() {
        let seq = echo();
        let z0 = Vec3::z();
        assert!(deploy_pure(&up(), &seq, 0, 0.0, &z0, 1).is_err());
        assert!(deploy_pure(&up(), &seq, 1, 0.0, &z0, 0).is_err());
        assert!(matches!(
            deploy_pure(&nd::Array1::zeros(3), &seq, 1, 0.0, &z0, 1),
            Err(SimError::DimensionMismatch { .. }),
        ));
        let rho0 = nd::Array2::<C64>::zeros((3, 3));
        assert!(deploy_density(&rho0, &seq, 1, &nd::array![0.0], None, &z0, 1).is_err());
        let rho0 = outer_prod(&up(), &up());
        assert!(deploy_density(&rho0, &seq, 1, &nd::Array1::zeros(0), None, &z0, 1).is_err());
    }
}
