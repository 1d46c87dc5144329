//! [`AnimationEngine`] – the capability set consumed by the bridge.
//!
//! Implementations own their thread-safety: every method takes `&self` and
//! may be called concurrently from bus callback threads and from the
//! owning control loop.
//!
//! Setters addressing a named catalog item return
//! [`RigError::NotFound`][roscom_types::RigError::NotFound] for names the
//! engine does not know.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use roscom_types::msg::{SaccadeCycle, Viseme};
use roscom_types::{PauMode, RigError};

/// Current parameters of one somatic state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SomaValues {
    pub magnitude: f64,
    pub rate: f64,
    /// Seconds.
    pub ease_in: f64,
}

/// Current parameters of one running gesture or arm animation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GestureValues {
    pub speed: f64,
    pub magnitude: f64,
    /// Seconds.
    pub duration: f64,
}

/// Bone orientation as a quaternion in the engine's own axis convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

/// Gaze angles of one eye, radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EyeGaze {
    pub pitch: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EyesData {
    pub left: EyeGaze,
    pub right: EyeGaze,
}

/// The animation engine driven by the bridge.
pub trait AnimationEngine: Send + Sync {
    fn api_version(&self) -> i32;

    // ── Animation mode and the PAU override window ──────────────────────

    fn animation_mode(&self) -> PauMode;
    fn set_animation_mode(&self, mode: PauMode);

    /// Deadline after which the [`PauMode::ACTIVE`] bit should be cleared.
    fn pau_timeout(&self) -> DateTime<Utc>;
    fn set_pau_timeout(&self, deadline: DateTime<Utc>);

    /// How long one PAU message keeps the override active.
    fn pau_active_timeout(&self) -> TimeDelta;

    // ── Somatic states ──────────────────────────────────────────────────

    fn available_soma_states(&self) -> Vec<String>;
    fn soma_states(&self) -> BTreeMap<String, SomaValues>;
    fn set_soma_state(&self, name: &str, values: SomaValues) -> Result<(), RigError>;

    // ── Emotions ────────────────────────────────────────────────────────

    fn available_emotion_states(&self) -> Vec<String>;
    /// Current magnitude per emotion.
    fn emotion_states(&self) -> BTreeMap<String, f64>;
    /// Blend towards `name` for `duration` seconds.
    fn set_emotion_state(&self, name: &str, magnitude: f64, duration: f64) -> Result<(), RigError>;
    /// Pin `name` at `magnitude` until told otherwise.
    fn set_emotion_value(&self, name: &str, magnitude: f64, duration: f64) -> Result<(), RigError>;

    // ── Gestures and visemes ────────────────────────────────────────────

    fn available_gestures(&self) -> Vec<String>;
    fn gestures(&self) -> BTreeMap<String, GestureValues>;
    fn set_gesture(&self, name: &str, repeat: u32, speed: f64, magnitude: f64) -> Result<(), RigError>;

    fn available_visemes(&self) -> Vec<String>;
    fn queue_viseme(&self, viseme: &Viseme) -> Result<(), RigError>;

    // ── Targets and rotations ───────────────────────────────────────────

    /// Turn the head (and eyes) towards `target`.
    fn set_face_target(&self, target: [f64; 3], speed: Option<f64>);
    /// Turn only the eyes towards `target`.
    fn set_gaze_target(&self, target: [f64; 3], speed: Option<f64>);
    fn set_head_rotation(&self, roll: f64);
    fn set_neck_rotation(&self, pitch: f64, roll: f64);

    // ── Pose readback and direct pose control ───────────────────────────

    fn head_data(&self) -> Orientation;
    fn neck_data(&self) -> Orientation;
    fn eyes_data(&self) -> EyesData;
    /// Shape-key name → weight.
    fn face_data(&self) -> BTreeMap<String, f64>;
    /// Arm-joint name → angle.
    fn arms_data(&self) -> BTreeMap<String, f64>;
    fn set_shape_keys(&self, shape_keys: BTreeMap<String, f64>);
    fn set_arms_joints(&self, joints: BTreeMap<String, f64>);

    // ── Procedural cycles ───────────────────────────────────────────────

    fn set_blink_randomly(&self, mean: f64, variation: f64);
    fn set_saccade(&self, cycle: &SaccadeCycle);

    // ── Parameter store and animation catalogs ──────────────────────────

    fn set_param(&self, key: &str, value: &str) -> bool;
    fn param(&self, key: &str) -> String;
    fn animation_length(&self, name: &str) -> Result<f64, RigError>;
    fn arm_animation_length(&self, name: &str) -> Result<f64, RigError>;
    /// Name and frame number of the animation currently playing, if any.
    fn current_frame(&self) -> Option<(String, i32)>;

    // ── Arms ────────────────────────────────────────────────────────────

    fn available_arm_animations(&self) -> Vec<String>;
    fn arm_animations(&self) -> BTreeMap<String, GestureValues>;
    fn set_arm_animation(&self, name: &str, repeat: u32, speed: f64, magnitude: f64) -> Result<(), RigError>;
    fn arms_mode(&self) -> i32;
    fn set_arms_mode(&self, mode: i32) -> bool;

    // ── Parallax ────────────────────────────────────────────────────────

    fn set_parallax(&self, eye_distance: f64, scale: f64);
}
