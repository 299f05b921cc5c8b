//! Single-qubit operators and states.
//!
//! All operators are 2×2 complex arrays in the `(|↑⟩, |↓⟩)` basis, i.e. the
//! eigenbasis of `σz` with `|↑⟩` first.

use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::{ One, Zero };
use crate::vector::Vec3;

/// A set of Kraus operators `{K_k}` describing the channel
/// `ρ ↦ Σ_k K_k ρ K_k†`.
pub type KrausSet = Vec<nd::Array2<C64>>;

/// The 2×2 identity.
pub fn identity() -> nd::Array2<C64> { nd::Array2::eye(2) }

/// Pauli matrix `σx`.
pub fn sigma_x() -> nd::Array2<C64> {
    nd::array![[C64::zero(), C64::one()], [C64::one(), C64::zero()]]
}

/// Pauli matrix `σy`.
pub fn sigma_y() -> nd::Array2<C64> {
    nd::array![[C64::zero(), -C64::i()], [C64::i(), C64::zero()]]
}

/// Pauli matrix `σz`.
pub fn sigma_z() -> nd::Array2<C64> {
    nd::array![[C64::one(), C64::zero()], [C64::zero(), -C64::one()]]
}

/// The spin-up state `|↑⟩`.
pub fn up() -> nd::Array1<C64> { nd::array![C64::one(), C64::zero()] }

/// The spin-down state `|↓⟩`.
pub fn down() -> nd::Array1<C64> { nd::array![C64::zero(), C64::one()] }

/// Rotation generated by the field vector `n` acting over duration `t`:
/// ```text
/// U = exp(-i (t / 2) n·σ)
///   = cos(|n| t / 2) I - i sin(|n| t / 2) (n / |n|)·σ
/// ```
///
/// A zero generator (or zero duration) gives the identity.
pub fn rotation(n: &Vec3, t: f64) -> nd::Array2<C64> {
    let nnorm = n.norm();
    let theta = nnorm * t;
    if nnorm == 0.0 || theta == 0.0 { return identity(); }
    let [nx, ny, nz] = (*n * nnorm.recip()).0;
    let c = (theta / 2.0).cos();
    let s = (theta / 2.0).sin();
    nd::array![
        [C64::new(c, -s * nz), C64::new(-s * ny, -s * nx)],
        [C64::new( s * ny, -s * nx), C64::new(c,  s * nz)],
    ]
}

/// Hermitian conjugate.
pub fn dagger<S>(a: &nd::ArrayBase<S, nd::Ix2>) -> nd::Array2<C64>
where S: nd::Data<Elem = C64>
{
    a.t().mapv(|x| x.conj())
}

/// Compute the outer product `|a⟩⟨b|` of two state vectors.
pub fn outer_prod(a: &nd::Array1<C64>, b: &nd::Array1<C64>)
    -> nd::Array2<C64>
{
    nd::Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j].conj())
}

/// Trace of a square matrix.
pub fn trace(a: &nd::Array2<C64>) -> C64 { a.diag().iter().sum() }

/// Apply the channel described by `kraus` to `rho`.
pub fn apply_channel(kraus: &[nd::Array2<C64>], rho: &nd::Array2<C64>)
    -> nd::Array2<C64>
{
    kraus.iter()
        .fold(nd::Array2::zeros(rho.raw_dim()), |acc, k| {
            acc + k.dot(rho).dot(&dagger(k))
        })
}

/// Compute `Σ_k K_k† K_k`, which equals the identity for a trace-preserving
/// channel.
pub fn completeness(kraus: &[nd::Array2<C64>]) -> nd::Array2<C64> {
    kraus.iter()
        .fold(nd::Array2::zeros((2, 2)), |acc, k| acc + dagger(k).dot(k))
}

/// Bloch vector `(⟨σx⟩, ⟨σy⟩, ⟨σz⟩)` of a (not necessarily normalized)
/// density matrix.
pub fn bloch(rho: &nd::Array2<C64>) -> Vec3 {
    Vec3::new(
        2.0 * rho[[0, 1]].re,
        -2.0 * rho[[0, 1]].im,
        (rho[[0, 0]] - rho[[1, 1]]).re,
    )
}

/// Bloch vector of a pure state.
pub fn bloch_pure(psi: &nd::Array1<C64>) -> Vec3 {
    bloch(&outer_prod(psi, psi))
}

/// Return `true` if every element of `a` is within `eps` of the corresponding
/// element of `b`.
pub fn approx_eq(a: &nd::Array2<C64>, b: &nd::Array2<C64>, eps: f64) -> bool {
    a.shape() == b.shape()
        && a.iter().zip(b.iter()).all(|(x, y)| (x - y).norm() < eps)
}

/// Stack a series of arrays.
pub fn stack_arrays<A, D>(axis: nd::Axis, arrays: &[nd::Array<A, D>])
    -> Result<nd::Array<A, D::Larger>, nd::ShapeError>
where
    A: Clone,
    D: nd::Dimension,
    D::Larger: nd::RemoveAxis,
{
    nd::stack(
        axis,
        &arrays.iter().map(|arr| arr.view()).collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod test {
    use std::f64::consts::PI;
    use super::*;

    #[test]
    fn rotation_is_unitary() {
        let n = Vec3::new(0.3, -1.2, 2.0);
        let u = rotation(&n, 1.7);
        assert!(approx_eq(&u.dot(&dagger(&u)), &identity(), 1e-12));
    }

    #[test]
    fn pi_rotation_about_x_flips() {
        let u = rotation(&Vec3::x(), PI);
        let psi = u.dot(&up());
        assert!(psi[0].norm() < 1e-12);
        assert!((psi[1].norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_generator_is_identity() {
        assert_eq!(rotation(&Vec3::zeros(), 3.0), identity());
        assert_eq!(rotation(&Vec3::z(), 0.0), identity());
    }

    #[test]
    fn bloch_of_basis_states() {
        assert_eq!(bloch_pure(&up()), Vec3::z());
        assert_eq!(bloch_pure(&down()), -Vec3::z());
    }
}
