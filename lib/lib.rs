//! Monte-Carlo simulation of a central spin coupled to a random dipolar spin
//! bath: free-induction decay, driven Rabi oscillations, and the evolution of
//! the central spin under dynamical-decoupling pulse sequences.
//!
//! A [`SpinEnsemble`] describes the bath statistically; a [`SpinCluster`] is
//! one disorder realization of it. Bath configurations are drawn from a
//! cluster as quasi-static field offsets `β` along the quantization axis, and
//! the signal routines in [`signal`] average closed-form single-configuration
//! results over bath configurations (inner loop) and over disorder
//! realizations (outer loop).

pub mod error;
pub mod utils;
pub mod vector;
pub mod qubit;
pub mod stats;
pub mod rng;
pub mod sampler;
pub mod ensemble;
pub mod signal;
pub mod fit;
pub mod driving;
pub mod pulse;
pub mod sequence;
pub mod deploy;
pub mod config;

pub use error::{ SimError, SimResult };
pub use vector::Vec3;
pub use ensemble::{ SpinCluster, SpinEnsemble };
pub use sampler::Geometry;
pub use signal::Axis;
pub use pulse::{ Idle, Propagator, Pulse, SquarePulse };
pub use sequence::{ Sequence, Step };
pub use deploy::Trajectory;
pub use config::SimConfig;
