//! Crystal orientation stored as a canonical unit quaternion

use std::f64::consts::PI;
use std::fmt;
use std::ops::Mul;

use nalgebra::Quaternion;
use serde::{Deserialize, Serialize};

use crate::error::{MisoriError, MisoriResult};

/// Tolerance used when validating quaternion norms at ingestion
pub const UNIT_NORM_TOLERANCE: f64 = 1e-6;

/// A crystal orientation as a unit quaternion with non-negative scalar part.
///
/// Euler angle construction follows the Bunge (ZXZ) convention with the
/// passive rotation sense used by crystallographic texture codes, so
/// `Orientation::from_euler(phi1, 0.0, 0.0)` has a vector part along `-z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    quat: Quaternion<f64>,
}

impl Orientation {
    /// The identity orientation (1, 0, 0, 0)
    pub fn identity() -> Self {
        Self {
            quat: Quaternion::new(1.0, 0.0, 0.0, 0.0),
        }
    }

    /// Create from Bunge Euler angles in radians
    pub fn from_euler(phi1: f64, phi: f64, phi2: f64) -> Self {
        let (s_phi, c_phi) = (phi / 2.0).sin_cos();
        let sum = (phi1 + phi2) / 2.0;
        let diff = (phi1 - phi2) / 2.0;

        Self::from_components_unchecked(
            c_phi * sum.cos(),
            -s_phi * diff.cos(),
            -s_phi * diff.sin(),
            -c_phi * sum.sin(),
        )
    }

    /// Create from Bunge Euler angles in degrees
    pub fn from_euler_deg(phi1: f64, phi: f64, phi2: f64) -> Self {
        Self::from_euler(phi1.to_radians(), phi.to_radians(), phi2.to_radians())
    }

    /// Create from quaternion components, normalizing and canonicalizing.
    ///
    /// Fails if the components have zero or non-finite length.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> MisoriResult<Self> {
        let quat = Quaternion::new(w, x, y, z);
        let norm = quat.norm();
        if !norm.is_finite() || norm < f64::EPSILON {
            return Err(MisoriError::InvalidOrientation(format!(
                "quaternion ({w}, {x}, {y}, {z}) has norm {norm}"
            )));
        }
        Ok(Self::canonical(quat / norm))
    }

    /// Create from components that are already unit length.
    ///
    /// Only the half-space canonicalization is applied. NaN components are
    /// carried through untouched.
    pub fn from_components_unchecked(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self::canonical(Quaternion::new(w, x, y, z))
    }

    fn canonical(quat: Quaternion<f64>) -> Self {
        if quat.w < 0.0 {
            Self { quat: -quat }
        } else {
            Self { quat }
        }
    }

    /// Components as [w, x, y, z]
    pub fn components(&self) -> [f64; 4] {
        [self.quat.w, self.quat.i, self.quat.j, self.quat.k]
    }

    /// Scalar part
    pub fn w(&self) -> f64 {
        self.quat.w
    }

    /// Underlying nalgebra quaternion
    pub fn as_quaternion(&self) -> &Quaternion<f64> {
        &self.quat
    }

    /// Quaternion norm
    pub fn norm(&self) -> f64 {
        self.quat.norm()
    }

    /// Check the quaternion is unit length within `tol`
    pub fn is_unit(&self, tol: f64) -> bool {
        (self.norm() - 1.0).abs() <= tol
    }

    /// Inverse rotation (vector part negated)
    pub fn conjugate(&self) -> Self {
        Self {
            quat: self.quat.conjugate(),
        }
    }

    /// Hamilton product `self * other`, canonicalized.
    ///
    /// `a.multiply(&b.conjugate())` is the rotation taking `b` to `a`.
    pub fn multiply(&self, other: &Orientation) -> Self {
        Self::canonical(self.quat * other.quat)
    }

    /// 4-component dot product
    pub fn dot(&self, other: &Orientation) -> f64 {
        self.quat.dot(&other.quat)
    }

    /// Rotation angle between two orientations in radians, ignoring symmetry.
    ///
    /// Uses `|dot|` so either quaternion sign gives the same result. The dot
    /// product is clamped before `acos`, identical inputs can round to
    /// slightly above one.
    pub fn misorientation_angle(&self, other: &Orientation) -> f64 {
        2.0 * self.dot(other).abs().clamp(-1.0, 1.0).acos()
    }

    /// Rotation angle between two orientations in degrees, ignoring symmetry
    pub fn misorientation_angle_deg(&self, other: &Orientation) -> f64 {
        self.misorientation_angle(other).to_degrees()
    }

    /// Rotation angle of this orientation from the reference frame (radians)
    pub fn rotation_angle(&self) -> f64 {
        2.0 * self.quat.w.abs().clamp(-1.0, 1.0).acos()
    }

    /// Bunge Euler angles (phi1, Phi, phi2) in radians.
    ///
    /// phi1 and phi2 are returned in [0, 2pi), Phi in [0, pi].
    pub fn euler_angles(&self) -> [f64; 3] {
        let [q0, q1, q2, q3] = self.components();
        let q03 = q0 * q0 + q3 * q3;
        let q12 = q1 * q1 + q2 * q2;
        let chi = (q03 * q12).sqrt();

        let mut eulers = if chi < 1e-12 && q12 < 1e-12 {
            [(-2.0 * q0 * q3).atan2(q0 * q0 - q3 * q3), 0.0, 0.0]
        } else if chi < 1e-12 && q03 < 1e-12 {
            [(2.0 * q1 * q2).atan2(q1 * q1 - q2 * q2), PI, 0.0]
        } else {
            let cos_ph1 = (-q0 * q1 - q2 * q3) / chi;
            let sin_ph1 = (-q0 * q2 + q1 * q3) / chi;
            let cos_phi = q03 - q12;
            let sin_phi = 2.0 * chi;
            let cos_ph2 = (-q0 * q1 + q2 * q3) / chi;
            let sin_ph2 = (q1 * q3 + q0 * q2) / chi;
            [
                sin_ph1.atan2(cos_ph1),
                sin_phi.atan2(cos_phi),
                sin_ph2.atan2(cos_ph2),
            ]
        };

        if eulers[0] < 0.0 {
            eulers[0] += 2.0 * PI;
        }
        if eulers[2] < 0.0 {
            eulers[2] += 2.0 * PI;
        }
        eulers
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Orientation {
    type Output = Orientation;

    fn mul(self, rhs: Orientation) -> Orientation {
        self.multiply(&rhs)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [w, x, y, z] = self.components();
        write!(f, "[{w:.4}, {x:.4}, {y:.4}, {z:.4}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_zero_euler_is_identity() {
        let q = Orientation::from_euler(0.0, 0.0, 0.0);
        assert_eq!(q.components(), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_euler_construction_is_canonical_and_unit() {
        for (a, b, c) in [(5.0, 1.0, 4.0), (3.1, 2.9, 0.2), (6.0, 0.5, 6.0)] {
            let q = Orientation::from_euler(a, b, c);
            assert!(q.w() >= 0.0);
            assert!(q.is_unit(1e-12));
        }
    }

    #[test]
    fn test_new_normalizes_and_flips_sign() {
        let q = Orientation::new(-2.0, 0.0, 0.0, 0.0).unwrap();
        assert_eq!(q.components(), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_new_rejects_zero_quaternion() {
        assert!(matches!(
            Orientation::new(0.0, 0.0, 0.0, 0.0),
            Err(MisoriError::InvalidOrientation(_))
        ));
        assert!(Orientation::new(f64::NAN, 0.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_self_misorientation_is_zero() {
        let q = Orientation::from_euler(0.3, 1.2, 2.5);
        assert_relative_eq!(q.misorientation_angle(&q), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_conjugate_pair_angle() {
        // 90 deg about z against its inverse is a 180 deg rotation
        let q = Orientation::from_euler(FRAC_PI_2, 0.0, 0.0);
        assert_relative_eq!(q.misorientation_angle_deg(&q.conjugate()), 180.0, epsilon = 1e-9);
        assert_relative_eq!(q.rotation_angle(), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_double_cover_ignored() {
        let q = Orientation::from_euler(0.7, 0.4, 1.1);
        let [w, x, y, z] = q.components();
        let neg = Quaternion::new(-w, -x, -y, -z);
        assert_relative_eq!(q.quat.dot(&neg), -1.0, epsilon = 1e-12);
        let other = Orientation { quat: neg };
        assert_relative_eq!(q.misorientation_angle(&other), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_relative_rotation() {
        let a = Orientation::from_euler(0.4, 0.0, 0.0);
        let b = Orientation::from_euler(0.1, 0.0, 0.0);
        let rel = a.multiply(&b.conjugate());
        assert_relative_eq!(rel.rotation_angle(), 0.3, epsilon = 1e-12);
        assert_relative_eq!(a.misorientation_angle(&b), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_euler_round_trip() {
        let eulers = [1.0, 0.6, 2.0];
        let q = Orientation::from_euler(eulers[0], eulers[1], eulers[2]);
        let back = q.euler_angles();
        for i in 0..3 {
            assert_relative_eq!(back[i], eulers[i], epsilon = 1e-10);
        }
    }
}
