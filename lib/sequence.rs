//! Dynamical-decoupling sequences: idle periods interleaved with named gates.

use indexmap::IndexMap;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::{ SimError, SimResult },
    pulse::{ Idle, Propagator, Pulse },
    qubit::{ dagger, identity },
    vector::Vec3,
};

/// A single element of a sequence's order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    /// One idle period.
    Idle,
    /// Gate `k` (1-based), forward.
    Gate(usize),
    /// Gate `k` (1-based), Hermitian conjugate.
    Inverse(usize),
}

impl Step {
    /// Parse a signed order marker: `0` is an idle period, `k > 0` applies gate
    /// `k`, and `-k` applies its inverse.
    ///
    /// Fails if `|k|` is not a valid 1-based index into `num_gates` gates.
    pub fn from_marker(marker: i32, num_gates: usize) -> SimResult<Self> {
        let k = marker.unsigned_abs() as usize;
        if marker != 0 && !(1..=num_gates).contains(&k) {
            return Err(SimError::BadGateIndex { index: marker, num_gates });
        }
        Ok(match marker.signum() {
            0 => Self::Idle,
            1 => Self::Gate(k),
            _ => Self::Inverse(k),
        })
    }

    /// Convert back to a signed order marker.
    pub fn marker(self) -> i32 {
        match self {
            Self::Idle => 0,
            Self::Gate(k) => k as i32,
            Self::Inverse(k) => -(k as i32),
        }
    }
}

/// An idle period, an ordered set of named gates, and the order in which to
/// apply them.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    idle: Idle,
    gates: IndexMap<String, Pulse>,
    order: Vec<Step>,
}

impl Sequence {
    /// Create a new sequence.
    ///
    /// `order` uses the signed markers of [`Step::from_marker`], with gates
    /// indexed from 1 in the order given by `gates`. Fails on a duplicate gate
    /// name or an out-of-range marker.
    pub fn new<I, S, P>(idle: Idle, gates: I, order: &[i32]) -> SimResult<Self>
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<Pulse>,
    {
        let mut map: IndexMap<String, Pulse> = IndexMap::new();
        for (name, pulse) in gates {
            let name: String = name.into();
            if map.contains_key(&name) {
                return Err(SimError::DuplicateGate(name));
            }
            map.insert(name, pulse.into());
        }
        let order: Vec<Step>
            = order.iter()
            .map(|m| Step::from_marker(*m, map.len()))
            .collect::<SimResult<_>>()?;
        Ok(Self { idle, gates: map, order })
    }

    /// Create a sequence from gate names, with `"0"` marking an idle period
    /// and a leading `-` marking an inverse, e.g. `["0", "X", "0", "-X"]`.
    pub fn from_names<I, S, P>(idle: Idle, gates: I, order: &[&str])
        -> SimResult<Self>
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<Pulse>,
    {
        let mut seq = Self::new(idle, gates, &[])?;
        let steps: Vec<Step>
            = order.iter()
            .map(|name| seq.parse_name(name))
            .collect::<SimResult<_>>()?;
        seq.order = steps;
        Ok(seq)
    }

    fn parse_name(&self, name: &str) -> SimResult<Step> {
        if name == "0" { return Ok(Step::Idle); }
        let (inverse, bare) = match name.strip_prefix('-') {
            Some(bare) => (true, bare),
            None => (false, name),
        };
        let k = self.gates.get_index_of(bare)
            .ok_or_else(|| SimError::invalid("order", format!("unknown gate '{bare}'")))?
            + 1;
        Ok(if inverse { Step::Inverse(k) } else { Step::Gate(k) })
    }

    /// The idle period.
    pub fn idle(&self) -> &Idle { &self.idle }

    /// Number of gates.
    pub fn num_gates(&self) -> usize { self.gates.len() }

    /// Gate `k` (1-based) and its name.
    pub fn gate(&self, k: usize) -> Option<(&str, &Pulse)> {
        k.checked_sub(1)
            .and_then(|i| self.gates.get_index(i))
            .map(|(name, pulse)| (name.as_str(), pulse))
    }

    /// Look up a gate by name.
    pub fn gate_by_name(&self, name: &str) -> Option<&Pulse> { self.gates.get(name) }

    /// Iterate over gates in index order.
    pub fn gates(&self) -> impl Iterator<Item = (&str, &Pulse)> + '_ {
        self.gates.iter().map(|(name, pulse)| (name.as_str(), pulse))
    }

    /// The order of application.
    pub fn order(&self) -> &[Step] { &self.order }

    /// The order as signed markers.
    pub fn markers(&self) -> Vec<i32> {
        self.order.iter().map(|s| s.marker()).collect()
    }

    /// Number of idle markers in the order.
    pub fn num_idle(&self) -> usize {
        self.order.iter().filter(|s| **s == Step::Idle).count()
    }

    // the order is validated on construction
    fn gate_pulse(&self, k: usize) -> &Pulse { &self.gates[k - 1] }

    /// Duration of a single step.
    pub fn step_duration(&self, step: Step) -> f64 {
        match step {
            Step::Idle => self.idle.duration,
            Step::Gate(k) | Step::Inverse(k) => self.gate_pulse(k).duration(),
        }
    }

    /// Unitary for a single step.
    pub fn step_unitary(&self, step: Step, beta: f64, z0: &Vec3)
        -> nd::Array2<C64>
    {
        match step {
            Step::Idle => self.idle.unitary(beta, z0),
            Step::Gate(k) => self.gate_pulse(k).unitary(beta, z0),
            Step::Inverse(k) => dagger(&self.gate_pulse(k).unitary(beta, z0)),
        }
    }
}

impl Propagator for Sequence {
    /// Total time of one pass through the order.
    fn duration(&self) -> f64 {
        self.order.iter().map(|s| self.step_duration(*s)).sum()
    }

    /// Total unitary of one pass through the order, with each step
    /// left-multiplied onto the accumulated product.
    fn unitary(&self, beta: f64, z0: &Vec3) -> nd::Array2<C64> {
        self.order.iter()
            .fold(identity(), |acc, step| self.step_unitary(*step, beta, z0).dot(&acc))
    }
}
