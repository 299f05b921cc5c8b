//! Control pulses acting on the central spin in the presence of a bath field.
//!
//! A bath configuration shifts the central spin's precession by `β` along the
//! quantization axis `z0`; a pulse adds a drive of strength `h` along its aim.
//! The total generator is `h·aim + β·z0`, applied for the pulse's duration
//! via [`rotation`].

use itertools::izip;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::{ SimError, SimResult },
    qubit::{ rotation, KrausSet },
    vector::Vec3,
};

/// Normalize Kraus mixture weights for `len` components so that they sum to 1.
///
/// `None` gives uniform weights. Fails if there are no components, the lengths
/// differ, or a weight is negative or not finite, or all weights are zero.
pub fn normalize_weights(len: usize, weights: Option<&nd::Array1<f64>>)
    -> SimResult<nd::Array1<f64>>
{
    if len == 0 {
        return Err(SimError::TooFewSamples { what: "kraus_operators", min: 1, got: 0 });
    }
    let Some(w) = weights else {
        return Ok(nd::Array1::from_elem(len, (len as f64).recip()));
    };
    if w.len() != len {
        return Err(SimError::DimensionMismatch {
            what: "kraus weights", expected: len, got: w.len() });
    }
    if w.iter().any(|c| !(c.is_finite() && *c >= 0.0)) {
        return Err(SimError::invalid("weights", "must be finite and non-negative"));
    }
    let total = w.sum();
    if total <= 0.0 {
        return Err(SimError::invalid("weights", "must have a positive sum"));
    }
    Ok(w / total)
}

/// Common interface for anything that evolves the central spin under a fixed
/// bath field.
pub trait Propagator {
    /// Total evolution time.
    fn duration(&self) -> f64;

    /// Unitary evolution operator under bath field offset `beta` along `z0`.
    fn unitary(&self, beta: f64, z0: &Vec3) -> nd::Array2<C64>;

    /// Kraus operators `sqrt(c_k) U(β_k)` for an incoherent mixture of bath
    /// field offsets `betas` with weights `c` (uniform if `None`, normalized
    /// to sum to 1 otherwise).
    fn kraus_operators(
        &self,
        betas: &nd::Array1<f64>,
        weights: Option<&nd::Array1<f64>>,
        z0: &Vec3,
    ) -> SimResult<KrausSet>
    {
        let c = normalize_weights(betas.len(), weights)?;
        let kraus: KrausSet
            = izip!(betas, &c)
            .map(|(&beta, &ck)| self.unitary(beta, z0) * C64::from(ck.sqrt()))
            .collect();
        Ok(kraus)
    }
}

fn check_duration(duration: f64) -> SimResult<()> {
    if !(duration >= 0.0 && duration.is_finite()) {
        return Err(SimError::invalid("duration", format!("{duration} is not a finite non-negative time")));
    }
    Ok(())
}

/// Free evolution with no applied field.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Idle {
    pub duration: f64,
}

impl Idle {
    pub fn new(duration: f64) -> SimResult<Self> {
        check_duration(duration)?;
        Ok(Self { duration })
    }

    /// Split into `n` equal sub-periods.
    pub fn subdivide(&self, n: usize) -> Self {
        Self { duration: self.duration / n as f64 }
    }
}

impl Propagator for Idle {
    fn duration(&self) -> f64 { self.duration }

    fn unitary(&self, beta: f64, z0: &Vec3) -> nd::Array2<C64> {
        rotation(&(*z0 * beta), self.duration)
    }
}

/// A constant drive of strength `h` along a fixed unit direction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SquarePulse {
    duration: f64,
    strength: f64,
    aim: Vec3,
}

impl SquarePulse {
    /// Create a new pulse, normalizing `aim`.
    pub fn new(duration: f64, strength: f64, aim: Vec3) -> SimResult<Self> {
        check_duration(duration)?;
        if !strength.is_finite() {
            return Err(SimError::invalid("strength", format!("{strength} is not finite")));
        }
        let aim = aim.normalized().ok_or(SimError::ZeroVector("aim"))?;
        Ok(Self { duration, strength, aim })
    }

    /// A pulse rotating by `angle` about `aim` in the absence of a bath field.
    ///
    /// `strength` must be positive; reverse `aim` for the opposite sense.
    pub fn rotation(angle: f64, strength: f64, aim: Vec3) -> SimResult<Self> {
        if !(strength > 0.0 && strength.is_finite()) {
            return Err(SimError::invalid("strength", format!("{strength} is not positive")));
        }
        if !(angle >= 0.0 && angle.is_finite()) {
            return Err(SimError::invalid("angle", format!("{angle} is not a finite non-negative angle")));
        }
        Self::new(angle / strength, strength, aim)
    }

    /// Drive strength.
    pub fn strength(&self) -> f64 { self.strength }

    /// Unit drive direction.
    pub fn aim(&self) -> Vec3 { self.aim }

    /// Total field vector for bath offset `beta`.
    pub fn generator(&self, beta: f64, z0: &Vec3) -> Vec3 {
        self.aim * self.strength + *z0 * beta
    }
}

impl Propagator for SquarePulse {
    fn duration(&self) -> f64 { self.duration }

    fn unitary(&self, beta: f64, z0: &Vec3) -> nd::Array2<C64> {
        rotation(&self.generator(beta, z0), self.duration)
    }
}

/// A single sequence element.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Pulse {
    Idle(Idle),
    Square(SquarePulse),
}

impl From<Idle> for Pulse {
    fn from(idle: Idle) -> Self { Self::Idle(idle) }
}

impl From<SquarePulse> for Pulse {
    fn from(pulse: SquarePulse) -> Self { Self::Square(pulse) }
}

impl Propagator for Pulse {
    fn duration(&self) -> f64 {
        match self {
            Self::Idle(idle) => idle.duration(),
            Self::Square(pulse) => pulse.duration(),
        }
    }

    fn unitary(&self, beta: f64, z0: &Vec3) -> nd::Array2<C64> {
        match self {
            Self::Idle(idle) => idle.unitary(beta, z0),
            Self::Square(pulse) => pulse.unitary(beta, z0),
        }
    }
}

#[cfg(test)]
mod test {
    use std::f64::consts::PI;
    use crate::qubit::{ approx_eq, completeness, dagger, identity };
    use super::*;

    #[test]
    fn idle_without_field_is_identity() {
        let u = Idle::new(3.0).unwrap().unitary(0.0, &Vec3::z());
        assert_eq!(u, identity());
    }

    #[test]
    fn square_pulse_is_unitary() {
        let p = SquarePulse::new(0.4, 2.0, Vec3::new(1.0, 1.0, 0.0)).unwrap();
        assert!((p.aim().norm() - 1.0).abs() < 1e-12);
        for beta in [-1.3, 0.0, 0.25] {
            let u = p.unitary(beta, &Vec3::z());
            assert!(approx_eq(&u.dot(&dagger(&u)), &identity(), 1e-10));
        }
    }

    #[test]
    fn pi_pulse_flips_spin() {
        let p = SquarePulse::rotation(PI, 5.0, Vec3::x()).unwrap();
        let u = p.unitary(0.0, &Vec3::z());
        assert!(u[[0, 0]].norm() < 1e-12);
        assert!((u[[1, 0]].norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_aim_rejected() {
        assert!(matches!(SquarePulse::new(1.0, 1.0, Vec3::zeros()), Err(SimError::ZeroVector("aim"))));
    }

    #[test]
    fn invalid_durations_rejected() {
        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(Idle::new(bad), Err(SimError::InvalidParameter { name: "duration", .. })));
            assert!(matches!(
                SquarePulse::new(bad, 1.0, Vec3::x()),
                Err(SimError::InvalidParameter { name: "duration", .. }),
            ));
        }
        assert!(Idle::new(0.0).is_ok());
        assert!(matches!(
            SquarePulse::new(1.0, f64::NAN, Vec3::x()),
            Err(SimError::InvalidParameter { name: "strength", .. }),
        ));
        assert!(matches!(
            SquarePulse::rotation(-PI, 1.0, Vec3::x()),
            Err(SimError::InvalidParameter { name: "angle", .. }),
        ));
    }

    #[test]
    fn negative_strength_rejected() {
        for bad in [-2.0, 0.0, f64::INFINITY] {
            assert!(matches!(
                SquarePulse::rotation(PI, bad, Vec3::x()),
                Err(SimError::InvalidParameter { name: "strength", .. }),
            ));
        }
        // a negative drive along x is a positive one along -x
        let neg = SquarePulse::new(0.5, -2.0, Vec3::x()).unwrap();
        let flipped = SquarePulse::new(0.5, 2.0, -Vec3::x()).unwrap();
        assert!(approx_eq(&neg.unitary(0.3, &Vec3::z()), &flipped.unitary(0.3, &Vec3::z()), 1e-12));
    }

    #[test]
    fn kraus_sets_are_complete() {
        let pulse: Pulse = SquarePulse::new(0.7, 1.0, Vec3::y()).unwrap().into();
        let betas = nd::array![-0.5, 0.1, 0.9];
        let weights = nd::array![1.0, 2.0, 5.0];
        let kraus = pulse.kraus_operators(&betas, Some(&weights), &Vec3::z()).unwrap();
        assert_eq!(kraus.len(), 3);
        assert!(approx_eq(&completeness(&kraus), &identity(), 1e-10));
        let kraus = pulse.kraus_operators(&betas, None, &Vec3::z()).unwrap();
        assert!(approx_eq(&completeness(&kraus), &identity(), 1e-10));
    }

    #[test]
    fn bad_weights_rejected() {
        let betas = nd::array![0.0, 1.0];
        assert!(normalize_weights(2, Some(&nd::array![1.0])).is_err());
        assert!(normalize_weights(2, Some(&nd::array![-1.0, 2.0])).is_err());
        assert!(normalize_weights(2, Some(&nd::array![0.0, 0.0])).is_err());
        assert!(Idle::new(1.0).unwrap().kraus_operators(&nd::Array1::zeros(0), None, &Vec3::z()).is_err());
        let w = normalize_weights(betas.len(), Some(&nd::array![1.0, 3.0])).unwrap();
        assert_eq!(w, nd::array![0.25, 0.75]);
    }
}
