//! `roscom-geometry` – pose arithmetic for the PAU channel pair.
//!
//! # Modules
//!
//! - [`rotation`] – [`Quaternion`][rotation::Quaternion] and its decoding
//!   into [`Euler`][rotation::Euler] angles in the fixed `XZY` axis order the
//!   rig uses for head rotation.
//! - [`target`] – [`Vec3`][target::Vec3] and the spherical → Cartesian
//!   conversion that turns a pitch/yaw pair into a look-at point one metre
//!   in front of the rig.

pub mod rotation;
pub mod target;

pub use rotation::{Euler, Quaternion, RotationError};
pub use target::{Vec3, look_at_target};
