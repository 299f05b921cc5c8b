//! Statistical descriptions of a dipolar spin bath and concrete disorder
//! realizations drawn from them.

use ndarray as nd;
use rand::Rng;
use crate::{
    error::{ SimError, SimResult },
    sampler::{ self, Geometry },
    vector::Vec3,
};

/// Immutable description of a bath ensemble.
///
/// Bath spins occupy lattice sites of number density `density` with
/// probability `concentration`, so their number density is
/// `density * concentration`.
#[derive(Clone, Debug, PartialEq)]
pub struct SpinEnsemble {
    density: f64,
    dim: usize,
    z0: Vec3,
    concentration: f64,
    num_spins: usize,
    geometry: Geometry,
}

impl SpinEnsemble {
    /// Create a new ensemble, normalizing `z0`.
    ///
    /// Fails if `density` is not positive, `dim` is not 1, 2, or 3, `z0` is
    /// zero, `concentration` is outside `(0, 1]`, or `num_spins` is zero.
    pub fn new(
        density: f64,
        dim: usize,
        z0: Vec3,
        concentration: f64,
        num_spins: usize,
        geometry: Geometry,
    ) -> SimResult<Self>
    {
        if !(density > 0.0 && density.is_finite()) {
            return Err(SimError::invalid("density", format!("{density} is not positive")));
        }
        if !(1..=3).contains(&dim) {
            return Err(SimError::invalid("dim", format!("{dim} is not 1, 2, or 3")));
        }
        if !(concentration > 0.0 && concentration <= 1.0) {
            return Err(SimError::invalid(
                "concentration", format!("{concentration} is not in (0, 1]")));
        }
        if num_spins == 0 {
            return Err(SimError::invalid("num_spins", "need at least one bath spin"));
        }
        let z0 = z0.normalized().ok_or(SimError::ZeroVector("z0"))?;
        Ok(Self { density, dim, z0, concentration, num_spins, geometry })
    }

    /// Lattice-site number density.
    pub fn density(&self) -> f64 { self.density }

    /// Spatial dimension.
    pub fn dim(&self) -> usize { self.dim }

    /// Unit quantization axis.
    pub fn z0(&self) -> Vec3 { self.z0 }

    /// Site occupation fraction.
    pub fn concentration(&self) -> f64 { self.concentration }

    /// Number of bath spins per cluster.
    pub fn num_spins(&self) -> usize { self.num_spins }

    /// Sampling geometry.
    pub fn geometry(&self) -> Geometry { self.geometry }

    /// Number density of bath spins.
    pub fn spin_density(&self) -> f64 { self.density * self.concentration }

    /// Draw a fresh set of couplings.
    pub fn sample_couplings<R>(&self, rng: &mut R) -> SimResult<nd::Array1<f64>>
    where R: Rng + ?Sized
    {
        let positions = sampler::sample_positions(
            self.geometry, self.dim, self.num_spins, self.spin_density(), rng)?;
        sampler::couplings_from_positions(&positions, &self.z0)
    }
}

/// A single disorder realization of a [`SpinEnsemble`].
///
/// The number of couplings is fixed for the lifetime of the cluster;
/// [`reroll`][Self::reroll] only replaces their values.
#[derive(Clone, Debug)]
pub struct SpinCluster<'a> {
    ensemble: &'a SpinEnsemble,
    couplings: nd::Array1<f64>,
}

impl<'a> SpinCluster<'a> {
    /// Draw a new cluster from `ensemble`.
    pub fn new<R>(ensemble: &'a SpinEnsemble, rng: &mut R) -> SimResult<Self>
    where R: Rng + ?Sized
    {
        let couplings = ensemble.sample_couplings(rng)?;
        Ok(Self { ensemble, couplings })
    }

    /// Build a cluster with fixed couplings.
    ///
    /// Fails if the number of couplings differs from the ensemble's number of
    /// bath spins.
    pub fn from_couplings(
        ensemble: &'a SpinEnsemble,
        couplings: nd::Array1<f64>,
    ) -> SimResult<Self>
    {
        if couplings.len() != ensemble.num_spins() {
            return Err(SimError::CouplingCount {
                expected: ensemble.num_spins(),
                got: couplings.len(),
            });
        }
        Ok(Self { ensemble, couplings })
    }

    /// Draw a new disorder realization from the same ensemble, overwriting the
    /// current couplings.
    pub fn reroll<R>(&mut self, rng: &mut R) -> SimResult<()>
    where R: Rng + ?Sized
    {
        let new = self.ensemble.sample_couplings(rng)?;
        self.couplings.assign(&new);
        Ok(())
    }

    /// The ensemble this cluster was drawn from.
    pub fn ensemble(&self) -> &'a SpinEnsemble { self.ensemble }

    /// The coupling strengths `D_j`.
    pub fn couplings(&self) -> &nd::Array1<f64> { &self.couplings }

    /// Unit quantization axis of the parent ensemble.
    pub fn z0(&self) -> Vec3 { self.ensemble.z0() }

    /// Number of bath spins.
    pub fn len(&self) -> usize { self.couplings.len() }

    /// Always `false` for a validly constructed cluster.
    pub fn is_empty(&self) -> bool { self.couplings.is_empty() }

    /// Draw one bath configuration `σ ∈ {+1, -1}^n` uniformly and return the
    /// resulting field offset `β = Σ_j σ_j D_j`.
    pub fn sample_beta<R>(&self, rng: &mut R) -> f64
    where R: Rng + ?Sized
    {
        self.couplings.iter()
            .map(|d| if rng.gen::<bool>() { *d } else { -*d })
            .sum()
    }

    /// Draw `n` independent field offsets.
    pub fn sample_betas<R>(&self, n: usize, rng: &mut R) -> nd::Array1<f64>
    where R: Rng + ?Sized
    {
        (0..n).map(|_| self.sample_beta(rng)).collect()
    }

    /// Variance of `β` over bath configurations, `Σ_j D_j^2`.
    pub fn field_variance(&self) -> f64 {
        self.couplings.iter().map(|d| d * d).sum()
    }
}

#[cfg(test)]
mod test {
    use crate::rng::seeded;
    use super::*;

    fn ensemble() -> SpinEnsemble {
        SpinEnsemble::new(1.0, 3, Vec3::new(0.0, 0.0, 2.0), 0.5, 12, Geometry::Spherical)
            .unwrap()
    }

    #[test]
    fn z0_is_normalized() {
        assert_eq!(ensemble().z0(), Vec3::z());
        assert!(matches!(
            SpinEnsemble::new(1.0, 3, Vec3::zeros(), 0.5, 1, Geometry::Cubic),
            Err(SimError::ZeroVector(_)),
        ));
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(SpinEnsemble::new(0.0, 3, Vec3::z(), 0.5, 1, Geometry::Cubic).is_err());
        assert!(SpinEnsemble::new(1.0, 0, Vec3::z(), 0.5, 1, Geometry::Cubic).is_err());
        assert!(SpinEnsemble::new(1.0, 3, Vec3::z(), 1.5, 1, Geometry::Cubic).is_err());
        assert!(SpinEnsemble::new(1.0, 3, Vec3::z(), 0.5, 0, Geometry::Cubic).is_err());
    }

    #[test]
    fn reroll_keeps_length_and_changes_values() {
        let ens = ensemble();
        let mut rng = seeded(1234);
        let mut cluster = SpinCluster::new(&ens, &mut rng).unwrap();
        let before = cluster.couplings().clone();
        cluster.reroll(&mut rng).unwrap();
        assert_eq!(cluster.len(), before.len());
        assert!(before.iter().zip(cluster.couplings()).all(|(a, b)| a != b));
    }

    #[test]
    fn coupling_count_is_checked() {
        let ens = ensemble();
        assert!(matches!(
            SpinCluster::from_couplings(&ens, nd::array![1.0]),
            Err(SimError::CouplingCount { expected: 12, got: 1 }),
        ));
    }

    #[test]
    fn beta_is_signed_sum() {
        let ens = SpinEnsemble::new(1.0, 3, Vec3::z(), 1.0, 2, Geometry::Cubic).unwrap();
        let cluster = SpinCluster::from_couplings(&ens, nd::array![1.0, 2.0]).unwrap();
        let mut rng = seeded(5);
        for beta in cluster.sample_betas(50, &mut rng).iter() {
            assert!([-3.0, -1.0, 1.0, 3.0].contains(beta));
        }
        assert_eq!(cluster.field_variance(), 5.0);
    }
}
