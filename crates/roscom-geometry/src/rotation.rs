//! Unit quaternions and their `XZY` Euler decomposition.
//!
//! The rig composes head rotations as `R = Ry(yaw) · Rz(roll) · Rx(pitch)`,
//! i.e. pitch is applied first.  [`Quaternion::to_euler_xzy`] inverts that
//! composition.
//!
//! # Example
//!
//! ```rust
//! use roscom_geometry::rotation::Quaternion;
//!
//! let e = Quaternion::identity().to_euler_xzy().unwrap();
//! assert_eq!((e.pitch, e.yaw, e.roll), (0.0, 0.0, 0.0));
//! ```

use thiserror::Error;

/// Below this norm a quaternion carries no usable orientation.
const MIN_NORM: f64 = 1e-9;

/// Below this value `cos(roll)` is treated as zero (gimbal lock).
const GIMBAL_EPSILON: f64 = 1e-9;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum RotationError {
    #[error("Quaternion has non-finite components")]
    NonFinite,

    #[error("Quaternion norm {0} is too small to normalise")]
    Degenerate(f64),
}

/// A rotation quaternion (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Euler angles in radians.
///
/// `pitch` rotates about X, `yaw` about Y and `roll` about Z.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Euler {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    pub fn norm(self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Scale to unit length.
    ///
    /// # Errors
    ///
    /// Fails when any component is NaN/infinite or the norm is ~0.
    pub fn normalized(self) -> Result<Self, RotationError> {
        if ![self.w, self.x, self.y, self.z].iter().all(|c| c.is_finite()) {
            return Err(RotationError::NonFinite);
        }
        let n = self.norm();
        if n < MIN_NORM {
            return Err(RotationError::Degenerate(n));
        }
        Ok(Self::new(self.w / n, self.x / n, self.y / n, self.z / n))
    }

    /// Row-major 3×3 rotation matrix of a unit quaternion.
    fn to_matrix(self) -> [[f64; 3]; 3] {
        let Self { w, x, y, z } = self;
        [
            [
                1.0 - 2.0 * (y * y + z * z),
                2.0 * (x * y - w * z),
                2.0 * (x * z + w * y),
            ],
            [
                2.0 * (x * y + w * z),
                1.0 - 2.0 * (x * x + z * z),
                2.0 * (y * z - w * x),
            ],
            [
                2.0 * (x * z - w * y),
                2.0 * (y * z + w * x),
                1.0 - 2.0 * (x * x + y * y),
            ],
        ]
    }

    /// Decompose into `XZY`-ordered Euler angles.
    ///
    /// At gimbal lock (roll = ±90°) yaw is pinned to zero and the remaining
    /// rotation is attributed to pitch.
    pub fn to_euler_xzy(self) -> Result<Euler, RotationError> {
        let m = self.normalized()?.to_matrix();

        // R = Ry(b) · Rz(c) · Rx(a):
        //   m[1][0] = sin c
        //   m[1][1] = cos c · cos a,  m[1][2] = -cos c · sin a
        //   m[0][0] = cos b · cos c,  m[2][0] = -sin b · cos c
        let roll = m[1][0].clamp(-1.0, 1.0).asin();
        let cos_roll = (m[1][1] * m[1][1] + m[1][2] * m[1][2]).sqrt();

        let (pitch, yaw) = if cos_roll > GIMBAL_EPSILON {
            ((-m[1][2]).atan2(m[1][1]), (-m[2][0]).atan2(m[0][0]))
        } else {
            (m[2][1].atan2(m[2][2]), 0.0)
        };

        Ok(Euler { pitch, yaw, roll })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_6};

    fn about_x(a: f64) -> Quaternion {
        Quaternion::new((a / 2.0).cos(), (a / 2.0).sin(), 0.0, 0.0)
    }

    fn about_y(a: f64) -> Quaternion {
        Quaternion::new((a / 2.0).cos(), 0.0, (a / 2.0).sin(), 0.0)
    }

    fn about_z(a: f64) -> Quaternion {
        Quaternion::new((a / 2.0).cos(), 0.0, 0.0, (a / 2.0).sin())
    }

    #[test]
    fn identity_decodes_to_zero_angles() {
        let e = Quaternion::identity().to_euler_xzy().unwrap();
        assert!(e.pitch.abs() < 1e-12);
        assert!(e.yaw.abs() < 1e-12);
        assert!(e.roll.abs() < 1e-12);
    }

    #[test]
    fn single_axis_rotations_land_on_their_own_angle() {
        let e = about_x(FRAC_PI_6).to_euler_xzy().unwrap();
        assert!((e.pitch - FRAC_PI_6).abs() < 1e-9, "pitch={}", e.pitch);
        assert!(e.yaw.abs() < 1e-9 && e.roll.abs() < 1e-9);

        let e = about_y(FRAC_PI_4).to_euler_xzy().unwrap();
        assert!((e.yaw - FRAC_PI_4).abs() < 1e-9, "yaw={}", e.yaw);
        assert!(e.pitch.abs() < 1e-9 && e.roll.abs() < 1e-9);

        let e = about_z(-FRAC_PI_6).to_euler_xzy().unwrap();
        assert!((e.roll + FRAC_PI_6).abs() < 1e-9, "roll={}", e.roll);
        assert!(e.pitch.abs() < 1e-9 && e.yaw.abs() < 1e-9);
    }

    #[test]
    fn composed_rotation_round_trips_through_xzy_order() {
        let (pitch, yaw, roll) = (0.2, -0.4, 0.3);
        // Pitch first, then roll, then yaw.
        let q = about_y(yaw).mul(about_z(roll)).mul(about_x(pitch));
        let e = q.to_euler_xzy().unwrap();
        assert!((e.pitch - pitch).abs() < 1e-9, "pitch={}", e.pitch);
        assert!((e.yaw - yaw).abs() < 1e-9, "yaw={}", e.yaw);
        assert!((e.roll - roll).abs() < 1e-9, "roll={}", e.roll);
    }

    #[test]
    fn unnormalised_input_is_scaled_first() {
        let q = about_y(FRAC_PI_4);
        let scaled = Quaternion::new(q.w * 3.0, q.x * 3.0, q.y * 3.0, q.z * 3.0);
        let e = scaled.to_euler_xzy().unwrap();
        assert!((e.yaw - FRAC_PI_4).abs() < 1e-9);
    }

    #[test]
    fn gimbal_lock_pins_yaw() {
        let e = about_z(FRAC_PI_2).to_euler_xzy().unwrap();
        assert!((e.roll - FRAC_PI_2).abs() < 1e-6);
        assert_eq!(e.yaw, 0.0);
    }

    #[test]
    fn nan_component_is_rejected() {
        let q = Quaternion::new(f64::NAN, 0.0, 0.0, 0.0);
        assert_eq!(q.to_euler_xzy(), Err(RotationError::NonFinite));
    }

    #[test]
    fn zero_quaternion_is_rejected() {
        let q = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        assert!(matches!(q.to_euler_xzy(), Err(RotationError::Degenerate(_))));
    }
}
