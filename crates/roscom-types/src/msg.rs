//! Wire records exchanged on bus channels.
//!
//! Durations travel as seconds (`f64`).  Every record derives
//! [`JsonSchema`] so the channel registry can describe its payload shape.

use std::fmt;

use schemars::JsonSchema;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Primitive wrappers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UInt8 {
    pub data: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Float32 {
    pub data: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Rotation quaternion in (x, y, z, w) field order.
///
/// Components decode leniently: a missing, `null` or non-numeric component
/// becomes NaN so the receiver can fall back to a neutral pose instead of
/// rejecting the whole message.  JSON encodes NaN as `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuaternionMsg {
    #[serde(default = "missing_component", deserialize_with = "lenient_component")]
    pub x: f64,
    #[serde(default = "missing_component", deserialize_with = "lenient_component")]
    pub y: f64,
    #[serde(default = "missing_component", deserialize_with = "lenient_component")]
    pub z: f64,
    #[serde(default = "missing_component", deserialize_with = "lenient_component")]
    pub w: f64,
}

fn missing_component() -> f64 {
    f64::NAN
}

fn lenient_component<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct Component;

    impl<'de> Visitor<'de> for Component {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a quaternion component")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            Ok(v.trim().parse().unwrap_or(f64::NAN))
        }

        fn visit_bool<E: de::Error>(self, _: bool) -> Result<f64, E> {
            Ok(f64::NAN)
        }

        fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
            Ok(f64::NAN)
        }

        fn visit_none<E: de::Error>(self) -> Result<f64, E> {
            Ok(f64::NAN)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<f64, D::Error> {
            d.deserialize_any(self)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<f64, A::Error> {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(f64::NAN)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<f64, A::Error> {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            Ok(f64::NAN)
        }
    }

    deserializer.deserialize_any(Component)
}

impl Default for QuaternionMsg {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Announcements
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ApiVersion {
    pub version: i32,
}

/// Catalog of names the engine understands (soma states, gestures, …).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AvailableNames {
    pub data: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Somatic, emotion, gesture and viseme state
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SomaState {
    pub name: String,
    pub magnitude: f64,
    pub rate: f64,
    /// Seconds.
    pub ease_in: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SomaStates {
    pub data: Vec<SomaState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmotionState {
    pub name: String,
    pub magnitude: f64,
    /// Seconds.
    pub duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EmotionStates {
    pub data: Vec<EmotionState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Gesture {
    pub name: String,
    pub speed: f64,
    pub magnitude: f64,
    /// Seconds.
    pub duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Gestures {
    pub data: Vec<Gesture>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SetGesture {
    pub name: String,
    pub repeat: u32,
    pub speed: f64,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Viseme {
    pub name: String,
    /// Seconds from now.
    pub start: f64,
    /// Seconds.
    pub duration: f64,
    pub rampin: f64,
    pub rampout: f64,
    pub magnitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CurrentFrame {
    pub name: String,
    pub frame: i32,
}

// ────────────────────────────────────────────────────────────────────────────
// Targets, rotations and procedural cycles
// ────────────────────────────────────────────────────────────────────────────

/// A point in the rig frame the head or eyes should turn towards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Target {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlinkCycle {
    pub mean: f64,
    pub variation: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SaccadeCycle {
    pub mean: f64,
    pub variation: f64,
    pub paint_scale: f64,
    pub eye_size: f64,
    pub eye_distance: f64,
    pub mouth_width: f64,
    pub mouth_height: f64,
    pub weight_eyes: f64,
    pub weight_mouth: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// PAU pose record
// ────────────────────────────────────────────────────────────────────────────

/// Full pose snapshot: head and neck orientation, bilateral eye gaze
/// (degrees on inbound messages), facial shape keys and arm joints.
///
/// Shape keys and joints travel as two parallel sequences each; entries are
/// paired positionally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Pau {
    pub head_rotation: QuaternionMsg,
    pub neck_rotation: QuaternionMsg,
    pub eye_gaze_left_pitch: f64,
    pub eye_gaze_left_yaw: f64,
    pub eye_gaze_right_pitch: f64,
    pub eye_gaze_right_yaw: f64,
    #[serde(default)]
    pub shapekeys: Vec<String>,
    #[serde(default)]
    pub coeffs: Vec<f64>,
    #[serde(default)]
    pub joints: Vec<String>,
    #[serde(default)]
    pub angles: Vec<f64>,
}

// ────────────────────────────────────────────────────────────────────────────
// Services
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SetParamRequest {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SetParamResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GetParamRequest {
    pub param: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GetParamResponse {
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GetAnimationLengthRequest {
    pub animation: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GetAnimationLengthResponse {
    /// Length in frames.
    pub length: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GetModeRequest {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GetModeResponse {
    pub mode: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SetModeRequest {
    pub mode: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SetModeResponse {
    pub success: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Live-reconfigure settings
// ────────────────────────────────────────────────────────────────────────────

/// Which rig parts PAU messages are allowed to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnimationModeConfig {
    pub head: bool,
    pub head_roll: bool,
    pub eyes: bool,
    pub face: bool,
    pub arms: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParallaxConfig {
    pub eye_distance: f64,
    pub parallax_scale: f64,
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        Self {
            eye_distance: 0.0,
            parallax_scale: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pau_sequences_default_when_absent() {
        let json = r#"{
            "head_rotation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0},
            "neck_rotation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0},
            "eye_gaze_left_pitch": 1.0,
            "eye_gaze_left_yaw": 2.0,
            "eye_gaze_right_pitch": 3.0,
            "eye_gaze_right_yaw": 4.0
        }"#;
        let pau: Pau = serde_json::from_str(json).unwrap();
        assert!(pau.shapekeys.is_empty());
        assert!(pau.angles.is_empty());
        assert!((pau.eye_gaze_right_yaw - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn malformed_quaternion_components_decode_as_nan() {
        let q: QuaternionMsg =
            serde_json::from_str(r#"{"x": null, "y": "oops", "z": [1], "w": 1}"#).unwrap();
        assert!(q.x.is_nan());
        assert!(q.y.is_nan());
        assert!(q.z.is_nan());
        assert_eq!(q.w, 1.0);

        let partial: QuaternionMsg = serde_json::from_str(r#"{"w": 0.5}"#).unwrap();
        assert!(partial.x.is_nan());
        assert_eq!(partial.w, 0.5);
    }

    #[test]
    fn nan_component_survives_the_json_round_trip_as_nan() {
        let q = QuaternionMsg {
            x: f64::NAN,
            ..QuaternionMsg::default()
        };
        let wire = serde_json::to_value(q).unwrap();
        assert!(wire["x"].is_null());
        let back: QuaternionMsg = serde_json::from_value(wire).unwrap();
        assert!(back.x.is_nan());
        assert_eq!(back.w, 1.0);
    }

    #[test]
    fn default_quaternion_is_identity() {
        let q = QuaternionMsg::default();
        assert_eq!((q.x, q.y, q.z, q.w), (0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn get_mode_request_accepts_empty_object() {
        let req: GetModeRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, GetModeRequest {});
    }
}
