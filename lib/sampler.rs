//! Random bath-spin positions and their dipolar couplings to a central spin at
//! the origin.
//!
//! Couplings are in natural units with unit dipolar prefactor:
//! ```text
//! D_j = (1 - 3 cos^2 θ_j) / r_j^3,    cos θ_j = (r_j · z0) / |r_j|
//! ```

use std::f64::consts::{ PI, TAU };
use ndarray as nd;
use rand::Rng;
use serde::{ Deserialize, Serialize };
use crate::{
    error::{ SimError, SimResult },
    vector::Vec3,
};

/// Spatial distribution of bath spins around the central spin.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Geometry {
    /// Uniform over a ball (disk in 2D, segment in 1D) centered on the central
    /// spin.
    Spherical,
    /// Uniform over a cube (square in 2D, segment in 1D) centered on the
    /// central spin.
    Cubic,
    /// Uniform over a ball with the region `r < inner` around the central spin
    /// excluded.
    Shell {
        /// Inner exclusion radius.
        inner: f64,
    },
}

impl Default for Geometry {
    fn default() -> Self { Self::Spherical }
}

// volume of the unit ball in `dim` dimensions
fn unit_ball_volume(dim: usize) -> f64 {
    match dim {
        1 => 2.0,
        2 => PI,
        _ => 4.0 * PI / 3.0,
    }
}

// uniform point on the unit sphere embedded in `dim` dimensions
fn random_direction<R>(dim: usize, rng: &mut R) -> Vec3
where R: Rng + ?Sized
{
    match dim {
        1 => Vec3::new(if rng.gen::<bool>() { 1.0 } else { -1.0 }, 0.0, 0.0),
        2 => {
            let phi = TAU * rng.gen::<f64>();
            Vec3::new(phi.cos(), phi.sin(), 0.0)
        },
        _ => {
            let cos_th = 2.0 * rng.gen::<f64>() - 1.0;
            let sin_th = (1.0 - cos_th * cos_th).max(0.0).sqrt();
            let phi = TAU * rng.gen::<f64>();
            Vec3::new(sin_th * phi.cos(), sin_th * phi.sin(), cos_th)
        },
    }
}

// radius sampled so that points are uniform in the `dim`-dimensional volume
// between `r_in` and `r_out`
fn random_radius<R>(dim: usize, r_in: f64, r_out: f64, rng: &mut R) -> f64
where R: Rng + ?Sized
{
    let d = dim as i32;
    let lo = r_in.powi(d);
    let hi = r_out.powi(d);
    (lo + (hi - lo) * rng.gen::<f64>()).powf((dim as f64).recip())
}

/// Sample `count` positions for bath spins at number density `density` in
/// `dim` dimensions.
///
/// The result has shape `count × 3`; for `dim < 3` the unused coordinates are
/// zero (1D along x, 2D in the xy plane).
pub fn sample_positions<R>(
    geometry: Geometry,
    dim: usize,
    count: usize,
    density: f64,
    rng: &mut R,
) -> SimResult<nd::Array2<f64>>
where R: Rng + ?Sized
{
    if !(1..=3).contains(&dim) {
        return Err(SimError::invalid("dim", format!("{dim} is not 1, 2, or 3")));
    }
    if !(density > 0.0 && density.is_finite()) {
        return Err(SimError::invalid("density", format!("{density} is not positive")));
    }
    let volume = count as f64 / density;
    let mut positions: nd::Array2<f64> = nd::Array2::zeros((count, 3));
    match geometry {
        Geometry::Spherical => {
            let r_out = (volume / unit_ball_volume(dim)).powf((dim as f64).recip());
            for mut row in positions.rows_mut() {
                let r = random_radius(dim, 0.0, r_out, rng);
                let p = random_direction(dim, rng) * r;
                row.iter_mut().zip(p.iter()).for_each(|(x, pk)| { *x = *pk; });
            }
        },
        Geometry::Cubic => {
            let side = volume.powf((dim as f64).recip());
            for mut row in positions.rows_mut() {
                row.iter_mut().take(dim)
                    .for_each(|x| { *x = side * (rng.gen::<f64>() - 0.5); });
            }
        },
        Geometry::Shell { inner } => {
            if !(inner >= 0.0 && inner.is_finite()) {
                return Err(SimError::invalid("inner", format!("{inner} is not a valid radius")));
            }
            let r_out
                = (volume / unit_ball_volume(dim) + inner.powi(dim as i32))
                .powf((dim as f64).recip());
            for mut row in positions.rows_mut() {
                let r = random_radius(dim, inner, r_out, rng);
                let p = random_direction(dim, rng) * r;
                row.iter_mut().zip(p.iter()).for_each(|(x, pk)| { *x = *pk; });
            }
        },
    }
    Ok(positions)
}

/// Convert a `count × 3` position array into dipolar couplings with respect to
/// the (unit) quantization axis `z0`.
///
/// Fails if any position coincides with the central spin.
pub fn couplings_from_positions(positions: &nd::Array2<f64>, z0: &Vec3)
    -> SimResult<nd::Array1<f64>>
{
    positions.rows().into_iter()
        .enumerate()
        .map(|(j, row)| {
            let r = Vec3::new(row[0], row[1], row[2]);
            let rnorm = r.norm();
            if rnorm <= f64::EPSILON {
                return Err(SimError::DegenerateGeometry(
                    format!("bath spin {j} sits on the central spin")
                ));
            }
            let cos_th = r.dot(z0) / rnorm;
            Ok((1.0 - 3.0 * cos_th * cos_th) / rnorm.powi(3))
        })
        .collect()
}
