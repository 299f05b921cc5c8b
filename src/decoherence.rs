//! Run the configured FID, Rabi, Rabi-period and sequence computations for a
//! dipolar spin bath and write the results to `.npz` archives.
//!
//! ```bash
//! decoherence --config bath.toml --output output --log-level debug
//! ```

use std::path::{ Path, PathBuf };
use anyhow::Context;
use clap::Parser;
use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing::info;
use tracing_subscriber::{ fmt, prelude::*, EnvFilter };
use spinbath_sim::{
    mkdir,
    write_npz,
    config::SimConfig,
    deploy::{ deploy_density, deploy_pure, deploy_quasistatic },
    driving::{ linewidth, rabi_period },
    ensemble::{ SpinCluster, SpinEnsemble },
    qubit::{ down, outer_prod, up },
    rng::{ substream, substream_seed },
    signal::{
        ensemble_fid_with_variance,
        ensemble_rabi_with_variance,
        par_ensemble_fid,
        par_ensemble_rabi,
        Axis,
    },
    stats::Estimate,
    utils::NpzWriter,
};

// substream indices for each stage
const FID_STREAM: u64 = 0;
const RABI_STREAM: u64 = 1;
const PERIOD_STREAM: u64 = 2;
const SEQUENCE_STREAM: u64 = 3;

/// Monte-Carlo decoherence of a central spin in a dipolar spin bath
#[derive(Parser, Debug)]
#[command(name = "decoherence")]
#[command(version)]
#[command(about = "Monte-Carlo decoherence of a central spin in a dipolar spin bath")]
struct Cli {
    /// Path to a TOML configuration file; built-in defaults if omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = match cli.config.as_deref() {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => SimConfig::default(),
    };
    let outdir = cli.output;
    mkdir!(outdir)?;
    std::fs::write(outdir.join("config.toml"), toml::to_string(&config)?)?;

    let ensemble = config.ensemble.build()?;
    info!(
        spins = ensemble.num_spins(),
        density = ensemble.spin_density(),
        dim = ensemble.dim(),
        geometry = ?ensemble.geometry(),
        seed = config.seed,
        "bath ensemble"
    );

    run_fid(&config, &ensemble, &outdir)?;
    run_rabi(&config, &ensemble, &outdir)?;
    run_rabi_period(&config, &ensemble, &outdir)?;
    run_sequence(&config, &ensemble, &outdir)?;

    info!(output = %outdir.display(), "done");
    Ok(())
}

fn run_fid(config: &SimConfig, ensemble: &SpinEnsemble, outdir: &Path)
    -> anyhow::Result<()>
{
    let fid = &config.fid;
    let time = fid.time.array();
    let seed = substream_seed(config.seed, FID_STREAM);
    let Estimate { mean, var }
        = if fid.parallel {
            par_ensemble_fid(&time, ensemble, fid.h, fid.clusters, fid.samples, seed)?
        } else {
            let mut rng = substream(config.seed, FID_STREAM);
            let mut cluster = SpinCluster::new(ensemble, &mut rng)?;
            ensemble_fid_with_variance(
                &time, &mut cluster, fid.h, fid.clusters, fid.samples, &mut rng)?
        };
    info!(h = fid.h, points = time.len(), "computed fid");
    write_npz!(
        outdir.join("fid.npz"),
        arrays: {
            "time" => &time,
            "mean" => &mean,
            "var" => &var,
        }
    )?;
    Ok(())
}

fn run_rabi(config: &SimConfig, ensemble: &SpinEnsemble, outdir: &Path)
    -> anyhow::Result<()>
{
    let rabi = &config.rabi;
    let time = rabi.time.array();
    let mut output = NpzWriter::new(std::fs::File::create(outdir.join("rabi.npz"))?);
    output.add_array("time", &time)?;
    let seed = substream_seed(config.seed, RABI_STREAM);
    for (k, &axis) in rabi.axes.iter().enumerate() {
        let label = match Axis::try_from(axis)? {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        let Estimate { mean, var }
            = if rabi.parallel {
                par_ensemble_rabi(
                    &time, ensemble, rabi.h, rabi.clusters, rabi.samples, axis,
                    substream_seed(seed, k as u64),
                )?
            } else {
                let mut rng = substream(seed, k as u64);
                let mut cluster = SpinCluster::new(ensemble, &mut rng)?;
                ensemble_rabi_with_variance(
                    &time, &mut cluster, rabi.h, rabi.clusters, rabi.samples, axis,
                    &mut rng,
                )?
            };
        info!(h = rabi.h, axis = label, "computed rabi projection");
        output.add_array(format!("{label}_mean"), &mean)?;
        output.add_array(format!("{label}_var"), &var)?;
    }
    output.finish()?;
    Ok(())
}

fn run_rabi_period(config: &SimConfig, ensemble: &SpinEnsemble, outdir: &Path)
    -> anyhow::Result<()>
{
    let params = config.rabi_period.params();
    let mut rng = substream(config.seed, PERIOD_STREAM);
    let mut cluster = SpinCluster::new(ensemble, &mut rng)?;
    let gamma = linewidth(&mut cluster, params.clusters, &mut rng)?;
    let period = rabi_period(&mut cluster, config.rabi_period.h, params, &mut rng)?;
    info!(h = config.rabi_period.h, linewidth = gamma, period, "rabi period");
    write_npz!(
        outdir.join("rabi_period.npz"),
        arrays: {
            "h" => &nd::array![config.rabi_period.h],
            "linewidth" => &nd::array![gamma],
            "period" => &nd::array![period],
        }
    )?;
    Ok(())
}

fn run_sequence(config: &SimConfig, ensemble: &SpinEnsemble, outdir: &Path)
    -> anyhow::Result<()>
{
    let sc = &config.sequence;
    let seq = sc.build()?;
    let mut rng = substream(config.seed, SEQUENCE_STREAM);
    let cluster = SpinCluster::new(ensemble, &mut rng)?;
    let betas = cluster.sample_betas(sc.samples, &mut rng);
    let z0 = ensemble.z0();

    let psi0 = (up() + down()) * C64::from(0.5_f64.sqrt());
    let rho0 = outer_prod(&psi0, &psi0);
    let ideal = deploy_pure(&psi0, &seq, sc.substeps, 0.0, &z0, sc.cycle)?;
    let kraus = deploy_density(&rho0, &seq, sc.substeps, &betas, None, &z0, sc.cycle)?;
    let quasistatic
        = deploy_quasistatic(&rho0, &seq, sc.substeps, &betas, None, &z0, sc.cycle)?;
    info!(
        gates = seq.num_gates(),
        order = ?seq.markers(),
        steps = kraus.len(),
        "deployed sequence"
    );
    write_npz!(
        outdir.join("sequence.npz"),
        arrays: {
            "time" => &kraus.time,
            "betas" => &betas,
            "psi_ideal" => &ideal.states,
            "rho_kraus" => &kraus.states,
            "rho_quasistatic" => &quasistatic.states,
        }
    )?;
    Ok(())
}
