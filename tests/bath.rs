use std::f64::consts::TAU;
use ndarray as nd;
use spinbath_sim::{
    config::SimConfig,
    deploy::{ deploy_pure, steps_per_cycle },
    driving::{ driving, linewidth, rabi_period, RabiPeriodParams },
    ensemble::{ SpinCluster, SpinEnsemble },
    qubit::{ bloch_pure, up },
    rng::seeded,
    sampler::Geometry,
    signal::{ ensemble_fid, ensemble_rabi, fid, fid_exact, par_ensemble_fid, rabi },
    vector::Vec3,
    SimError,
};

fn bath(num_spins: usize) -> SpinEnsemble {
    SpinEnsemble::new(1.0, 3, Vec3::z(), 1.0, num_spins, Geometry::Shell { inner: 0.5 })
        .unwrap()
}

#[test]
fn fid_starts_at_half_and_decays() {
    let ens = bath(50);
    let mut rng = seeded(1);
    let mut cluster = SpinCluster::new(&ens, &mut rng).unwrap();
    let t = nd::Array1::linspace(0.0, 20.0, 41);
    let f = ensemble_fid(&t, &mut cluster, 0.0, 20, 1, &mut rng).unwrap();
    assert!((f[0] - 0.5).abs() < 1e-12);
    assert!(f.iter().all(|fk| fk.abs() <= 0.5 + 1e-12));
    assert!(f[40].abs() < f[0]);
}

#[test]
fn zero_field_fid_needs_no_samples() {
    let ens = bath(10);
    let mut rng = seeded(5);
    let cluster = SpinCluster::new(&ens, &mut rng).unwrap();
    let t = nd::Array1::linspace(0.0, 3.0, 7);
    let f = fid(&t, &cluster, 0.0, 0, &mut rng).unwrap();
    assert_eq!(f, fid_exact(&t, &cluster));
}

#[test]
fn weak_bath_rabi_is_bare_oscillation() {
    let ens = SpinEnsemble::new(1e-9, 3, Vec3::z(), 1.0, 4, Geometry::Spherical).unwrap();
    let mut rng = seeded(2);
    let mut cluster = SpinCluster::new(&ens, &mut rng).unwrap();
    let t = nd::Array1::linspace(0.0, 2.0, 9);
    let z = ensemble_rabi(&t, &mut cluster, TAU, 3, 5, 3, &mut rng).unwrap();
    for (zk, tk) in z.iter().zip(&t) {
        assert!((zk - 0.5 * (TAU * tk).cos()).abs() < 1e-6);
    }
    let y = rabi(&t, &cluster, TAU, 5, 2, &mut rng).unwrap();
    for (yk, tk) in y.iter().zip(&t) {
        assert!((yk + 0.5 * (TAU * tk).sin()).abs() < 1e-6);
    }
}

#[test]
fn rabi_period_and_linewidth() {
    let ens = SpinEnsemble::new(1e-9, 3, Vec3::z(), 1.0, 4, Geometry::Spherical).unwrap();
    let mut rng = seeded(11);
    let mut cluster = SpinCluster::new(&ens, &mut rng).unwrap();
    let gamma = linewidth(&mut cluster, 10, &mut rng).unwrap();
    assert!(gamma < 1e-3);
    let params = RabiPeriodParams { clusters: 4, samples: 8, ..Default::default() };
    let period = rabi_period(&mut cluster, TAU, params, &mut rng).unwrap();
    assert!((period - 1.0).abs() < 1e-3);
}

#[test]
fn symmetric_bath_tilts_average_out() {
    let ens = bath(1);
    let cluster = SpinCluster::from_couplings(&ens, nd::array![1.0]).unwrap();
    let mut rng = seeded(3);
    // β = ±1 with equal probability; the tilts cancel on average
    let d = driving(1.0, 1.0, &cluster, None, 2000, &mut rng).unwrap();
    assert!((d.phase - 2.0_f64.sqrt()).abs() < 1e-12);
    assert!(d.axis[0] > 0.99);
}

#[test]
fn parallel_and_sequential_agree_statistically() {
    let ens = bath(20);
    let t = nd::Array1::linspace(0.0, 4.0, 9);
    let par = par_ensemble_fid(&t, &ens, 0.0, 64, 1, 7).unwrap();
    let mut rng = seeded(8);
    let mut cluster = SpinCluster::new(&ens, &mut rng).unwrap();
    let seq = ensemble_fid(&t, &mut cluster, 0.0, 64, 1, &mut rng).unwrap();
    let err = par.std_err(64);
    for k in 0..t.len() {
        assert!((par.mean[k] - seq[k]).abs() <= 6.0 * err[k] + 1e-9);
    }
}

#[test]
fn default_config_sequence_deploys() {
    let config = SimConfig::default();
    let seq = config.sequence.build().unwrap();
    let n = config.sequence.substeps;
    let traj = deploy_pure(&up(), &seq, n, 0.0, &Vec3::z(), config.sequence.cycle).unwrap();
    assert_eq!(traj.len(), steps_per_cycle(&seq, n) * config.sequence.cycle);
    // X Y X Y with π pulses returns |↑⟩ to itself up to a phase
    let last = traj.states.column(traj.len() - 1).to_owned();
    assert!((bloch_pure(&last)[2] - 1.0).abs() < 1e-10);
}

#[test]
fn invalid_inputs_surface_as_errors() {
    assert!(matches!(
        SpinEnsemble::new(-1.0, 3, Vec3::z(), 1.0, 1, Geometry::Cubic),
        Err(SimError::InvalidParameter { name: "density", .. }),
    ));
    assert!(matches!(
        SpinEnsemble::new(1.0, 3, Vec3::zeros(), 1.0, 1, Geometry::Cubic),
        Err(SimError::ZeroVector("z0")),
    ));
    let ens = bath(3);
    assert!(matches!(
        SpinCluster::from_couplings(&ens, nd::array![1.0]),
        Err(SimError::CouplingCount { expected: 3, got: 1 }),
    ));
}
