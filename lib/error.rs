//! Error taxonomy shared by all simulation routines.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid axis selector {0}: expected 1 (x), 2 (y), or 3 (z)")]
    InvalidAxis(usize),

    #[error("time array must be non-empty")]
    EmptyTime,

    #[error("{what}: need at least {min} samples, got {got}")]
    TooFewSamples { what: &'static str, min: usize, got: usize },

    #[error("sequence order references gate {index}, but only {num_gates} gates are defined")]
    BadGateIndex { index: i32, num_gates: usize },

    #[error("duplicate gate name '{0}'")]
    DuplicateGate(String),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("{0} must be a non-zero vector")]
    ZeroVector(&'static str),

    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch { what: &'static str, expected: usize, got: usize },

    #[error("cluster needs {expected} couplings, got {got}")]
    CouplingCount { expected: usize, got: usize },

    #[error("degenerate bath geometry: {0}")]
    DegenerateGeometry(String),

    #[error("linear regression failed: {0}")]
    Regression(String),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("npz write error: {0}")]
    Npz(#[from] ndarray_npy::WriteNpzError),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub(crate) fn invalid<S>(name: &'static str, reason: S) -> Self
    where S: Into<String>
    {
        Self::InvalidParameter { name, reason: reason.into() }
    }
}
