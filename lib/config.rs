//! Run configuration for the `decoherence` binary, read from TOML.
//!
//! Every table is optional and falls back to its defaults:
//!
//! ```toml
//! seed = 10546
//!
//! [ensemble]
//! density = 1.0
//! dim = 3
//! z0 = [0.0, 0.0, 1.0]
//! concentration = 1.0
//! num_spins = 100
//! geometry = { kind = "shell", inner = 0.5 }
//!
//! [fid]
//! time = { start = 0.0, stop = 10.0, points = 200 }
//! h = 0.0
//!
//! [sequence]
//! idle = 1.0
//! gates = [
//!     { name = "X", angle = 3.141592653589793, strength = 10.0, aim = [1.0, 0.0, 0.0] },
//! ]
//! order = ["0", "X", "0", "-X"]
//! ```

use std::{ f64::consts::{ PI, TAU }, path::Path };
use ndarray as nd;
use serde::{ Deserialize, Serialize };
use crate::{
    driving::RabiPeriodParams,
    ensemble::SpinEnsemble,
    error::{ SimError, SimResult },
    pulse::{ Idle, Pulse, SquarePulse },
    sampler::Geometry,
    sequence::Sequence,
    vector::Vec3,
};

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed; every computation derives its own generator from it.
    pub seed: u64,
    pub ensemble: EnsembleConfig,
    pub fid: FidConfig,
    pub rabi: RabiConfig,
    pub rabi_period: RabiPeriodConfig,
    pub sequence: SequenceConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 10546,
            ensemble: EnsembleConfig::default(),
            fid: FidConfig::default(),
            rabi: RabiConfig::default(),
            rabi_period: RabiPeriodConfig::default(),
            sequence: SequenceConfig::default(),
        }
    }
}

impl SimConfig {
    /// Read a configuration file.
    pub fn load<P>(path: P) -> SimResult<Self>
    where P: AsRef<Path>
    {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> SimResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Parameters of a [`SpinEnsemble`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub density: f64,
    pub dim: usize,
    pub z0: Vec3,
    pub concentration: f64,
    pub num_spins: usize,
    pub geometry: Geometry,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            density: 1.0,
            dim: 3,
            z0: Vec3::z(),
            concentration: 1.0,
            num_spins: 100,
            geometry: Geometry::Shell { inner: 0.5 },
        }
    }
}

impl EnsembleConfig {
    /// Construct the ensemble, validating all parameters.
    pub fn build(&self) -> SimResult<SpinEnsemble> {
        SpinEnsemble::new(
            self.density,
            self.dim,
            self.z0,
            self.concentration,
            self.num_spins,
            self.geometry,
        )
    }
}

/// An evenly spaced time grid, endpoints included.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    pub start: f64,
    pub stop: f64,
    pub points: usize,
}

impl TimeGrid {
    pub fn array(&self) -> nd::Array1<f64> {
        nd::Array1::linspace(self.start, self.stop, self.points)
    }
}

/// Settings for the free-induction decay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FidConfig {
    pub time: TimeGrid,
    /// Transverse field.
    pub h: f64,
    /// Disorder realizations.
    pub clusters: usize,
    /// Bath configurations per realization.
    pub samples: usize,
    /// Run the disorder loop on the rayon pool.
    pub parallel: bool,
}

impl Default for FidConfig {
    fn default() -> Self {
        Self {
            time: TimeGrid { start: 0.0, stop: 10.0, points: 200 },
            h: 0.0,
            clusters: 100,
            samples: 100,
            parallel: true,
        }
    }
}

/// Settings for the driven Rabi signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RabiConfig {
    pub time: TimeGrid,
    /// Drive strength.
    pub h: f64,
    pub clusters: usize,
    pub samples: usize,
    /// Bloch projections to compute: 1 (x), 2 (y), 3 (z).
    pub axes: Vec<usize>,
    pub parallel: bool,
}

impl Default for RabiConfig {
    fn default() -> Self {
        Self {
            time: TimeGrid { start: 0.0, stop: 10.0, points: 200 },
            h: TAU,
            clusters: 100,
            samples: 100,
            axes: vec![1, 2, 3],
            parallel: true,
        }
    }
}

/// Settings for the Rabi-period estimate.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RabiPeriodConfig {
    /// Drive strength.
    pub h: f64,
    pub clusters: usize,
    pub samples: usize,
    pub points: usize,
    pub window: f64,
}

impl Default for RabiPeriodConfig {
    fn default() -> Self {
        let RabiPeriodParams { clusters, samples, points, window }
            = RabiPeriodParams::default();
        Self { h: TAU, clusters, samples, points, window }
    }
}

impl RabiPeriodConfig {
    pub fn params(&self) -> RabiPeriodParams {
        RabiPeriodParams {
            clusters: self.clusters,
            samples: self.samples,
            points: self.points,
            window: self.window,
        }
    }
}

/// A square gate, given either by its duration or by the rotation angle it
/// produces with no bath field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    pub strength: f64,
    pub aim: Vec3,
}

impl GateConfig {
    pub fn build(&self) -> SimResult<Pulse> {
        let pulse = match (self.duration, self.angle) {
            (Some(duration), None) => SquarePulse::new(duration, self.strength, self.aim)?,
            (None, Some(angle)) => SquarePulse::rotation(angle, self.strength, self.aim)?,
            _ => {
                return Err(SimError::invalid(
                    "gate",
                    format!("'{}' needs exactly one of `duration` or `angle`", self.name),
                ));
            },
        };
        Ok(pulse.into())
    }
}

/// Settings for a sequence deployment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Duration of one idle period.
    pub idle: f64,
    /// Sub-steps per idle period.
    pub substeps: usize,
    /// Passes through the order.
    pub cycle: usize,
    /// Bath configurations in the Kraus mixture.
    pub samples: usize,
    pub gates: Vec<GateConfig>,
    /// Gate names, `"0"` for an idle period and a leading `-` for an inverse.
    pub order: Vec<String>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        let gate = |name: &str, aim: Vec3| GateConfig {
            name: name.into(),
            duration: None,
            angle: Some(PI),
            strength: 10.0,
            aim,
        };
        Self {
            idle: 1.0,
            substeps: 10,
            cycle: 4,
            samples: 100,
            gates: vec![gate("X", Vec3::x()), gate("Y", Vec3::y())],
            order: ["0", "X", "0", "0", "Y", "0", "0", "X", "0", "0", "Y", "0"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl SequenceConfig {
    /// Construct the sequence, validating gates and order.
    pub fn build(&self) -> SimResult<Sequence> {
        let gates: Vec<(String, Pulse)>
            = self.gates.iter()
            .map(|g| g.build().map(|p| (g.name.clone(), p)))
            .collect::<SimResult<_>>()?;
        let order: Vec<&str> = self.order.iter().map(String::as_str).collect();
        Sequence::from_names(Idle::new(self.idle)?, gates, &order)
    }
}
