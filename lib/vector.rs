//! Fixed-dimension real 3-vectors for field directions and positions.

use std::ops::{
    Add, AddAssign,
    Sub, SubAssign,
    Mul, MulAssign,
    Neg,
    Index, IndexMut,
};
use num_traits::Zero;
use serde::{ Deserialize, Serialize };

/// A real vector in three dimensions.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vec3(pub [f64; 3]);

impl Vec3 {
    /// Create a new vector from components.
    pub fn new(x: f64, y: f64, z: f64) -> Self { Self([x, y, z]) }

    /// Create a vector of all zeros.
    pub fn zeros() -> Self { Self([0.0; 3]) }

    /// Create a vector with 1 at the `k`-th index and zeros elsewhere.
    ///
    /// This is equivalent to `zeros` if `k ≥ 3`.
    pub fn unit(k: usize) -> Self {
        let mut v = Self::zeros();
        if let Some(elem) = v.0.get_mut(k) {
            *elem = 1.0;
        }
        v
    }

    /// The unit vector along x.
    pub fn x() -> Self { Self::unit(0) }

    /// The unit vector along y.
    pub fn y() -> Self { Self::unit(1) }

    /// The unit vector along z.
    pub fn z() -> Self { Self::unit(2) }

    /// Return an iterator over references to all elements.
    pub fn iter(&self) -> std::slice::Iter<'_, f64> { self.0.iter() }

    /// Call a function on each element, returning results in a new vector.
    pub fn map<F>(&self, mut f: F) -> Self
    where F: FnMut(f64) -> f64
    {
        Self([f(self.0[0]), f(self.0[1]), f(self.0[2])])
    }

    /// Return the dot product of two vectors.
    pub fn dot(&self, rhs: &Self) -> f64 {
        self.0.iter().zip(rhs.0.iter()).map(|(a, b)| a * b).sum()
    }

    /// Return the cross product `self × rhs`.
    pub fn cross(&self, rhs: &Self) -> Self {
        let [a0, a1, a2] = self.0;
        let [b0, b1, b2] = rhs.0;
        Self([a1 * b2 - a2 * b1, a2 * b0 - a0 * b2, a0 * b1 - a1 * b0])
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 { self.dot(self).sqrt() }

    /// Return a unit-length copy of `self`, or `None` if `self` is zero or not
    /// finite.
    pub fn normalized(&self) -> Option<Self> {
        let n = self.norm();
        (n > 0.0 && n.is_finite()).then(|| *self * n.recip())
    }
}

impl Default for Vec3 {
    fn default() -> Self { Self::zeros() }
}

impl From<[f64; 3]> for Vec3 {
    fn from(a: [f64; 3]) -> Self { Self(a) }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self { v.0 }
}

impl Index<usize> for Vec3 {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output { &self.0[index] }
}

impl IndexMut<usize> for Vec3 {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl Zero for Vec3 {
    fn zero() -> Self { Self::zeros() }

    fn is_zero(&self) -> bool { self.0.iter().all(|x| *x == 0.0) }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        self.0.iter_mut().zip(rhs.0).for_each(|(a, b)| { *a += b; });
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Self) {
        self.0.iter_mut().zip(rhs.0).for_each(|(a, b)| { *a -= b; });
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(mut self, rhs: f64) -> Self {
        self *= rhs;
        self
    }
}

impl Mul<Vec3> for f64 {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Vec3 { rhs * self }
}

impl MulAssign<f64> for Vec3 {
    fn mul_assign(&mut self, rhs: f64) {
        self.0.iter_mut().for_each(|a| { *a *= rhs; });
    }
}

impl Neg for Vec3 {
    type Output = Self;

    fn neg(self) -> Self { self * -1.0 }
}

#[cfg(test)]
mod test {
    use super::Vec3;

    #[test]
    fn cross_of_units() {
        assert_eq!(Vec3::x().cross(&Vec3::y()), Vec3::z());
        assert_eq!(Vec3::y().cross(&Vec3::z()), Vec3::x());
    }

    #[test]
    fn normalize() {
        let v = Vec3::new(3.0, 0.0, 4.0).normalized().unwrap();
        assert!((v.norm() - 1.0).abs() < 1e-12);
        assert!((v[0] - 0.6).abs() < 1e-12);
        assert!(Vec3::zeros().normalized().is_none());
    }
}
