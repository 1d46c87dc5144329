//! Look-at targets.

/// A 3-D point in the rig frame: +X forward, +Y left, +Z up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Convert a pitch/yaw pair (radians) into a target one metre away.
///
/// Positive pitch tilts the target downwards, so the vertical component is
/// `-sin(pitch)`.
pub fn look_at_target(pitch: f64, yaw: f64) -> Vec3 {
    Vec3::new(
        yaw.cos() * pitch.cos(),
        yaw.sin() * pitch.cos(),
        -pitch.sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn zero_angles_look_straight_ahead() {
        let t = look_at_target(0.0, 0.0);
        assert_eq!(t.to_array(), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn quarter_yaw_looks_left() {
        let t = look_at_target(0.0, FRAC_PI_2);
        assert!(t.x.abs() < 1e-12);
        assert!((t.y - 1.0).abs() < 1e-12);
        assert!(t.z.abs() < 1e-12);
    }

    #[test]
    fn positive_pitch_looks_down() {
        let t = look_at_target(0.5, 0.0);
        assert!(t.z < 0.0);
    }

    #[test]
    fn target_is_one_metre_away() {
        let t = look_at_target(0.3, -1.1);
        let len = (t.x * t.x + t.y * t.y + t.z * t.z).sqrt();
        assert!((len - 1.0).abs() < 1e-12);
    }
}
