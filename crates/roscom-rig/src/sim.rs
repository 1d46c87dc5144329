//! In-process simulated animation engine for headless runs.
//!
//! [`SimRig`] keeps just enough state to answer every getter plausibly and
//! appends one [`RigCall`] per accepted setter call, so tests can assert on
//! exactly what the bridge asked the engine to do.  Setters that name an
//! unknown catalog item are rejected with [`RigError::NotFound`] and leave
//! no trace in the call log.
//!
//! # Example
//!
//! ```rust
//! use roscom_rig::{AnimationEngine, RigCall, SimRig};
//!
//! let rig = SimRig::new();
//! rig.set_gesture("nod-1", 1, 1.0, 0.5).unwrap();
//! assert!(rig.set_gesture("moonwalk", 1, 1.0, 0.5).is_err());
//! assert_eq!(rig.calls().len(), 1);
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use roscom_types::msg::{SaccadeCycle, Viseme};
use roscom_types::{PauMode, RigError};
use tracing::debug;

use crate::engine::{AnimationEngine, EyesData, GestureValues, Orientation, SomaValues};

/// API version reported by the simulated rig.
pub const SIM_API_VERSION: i32 = 4;

/// Default length of the PAU active-override window, milliseconds.
pub const DEFAULT_PAU_ACTIVE_TIMEOUT_MS: i64 = 300;

const SOMA_STATES: &[&str] = &["normal", "breathing", "sleep", "drunk"];
const EMOTIONS: &[&str] = &["happy", "sad", "surprised", "angry", "bored"];
const GESTURES: &[&str] = &["blink", "nod-1", "nod-2", "shake-2", "yawn-1"];
const VISEMES: &[&str] = &["A-I", "E", "O-U", "M", "F-V", "L", "C-D-G-K-N-S-TH", "Q-W"];
const ARM_ANIMATIONS: &[&str] = &["wave", "point", "rest"];
const SHAPE_KEYS: &[&str] = &["brow_inner_up", "jaw_open", "smile_left", "smile_right"];
const ARM_JOINTS: &[&str] = &["left_shoulder", "left_elbow", "right_shoulder", "right_elbow"];

/// Frames per catalog animation.
const ANIMATION_FRAMES: f64 = 48.0;

/// One accepted setter call, in the order the engine received it.
#[derive(Debug, Clone, PartialEq)]
pub enum RigCall {
    SetAnimationMode(PauMode),
    SetPauTimeout(DateTime<Utc>),
    SetSomaState { name: String, values: SomaValues },
    SetEmotionState { name: String, magnitude: f64, duration: f64 },
    SetEmotionValue { name: String, magnitude: f64, duration: f64 },
    SetGesture { name: String, repeat: u32 },
    QueueViseme { name: String },
    SetFaceTarget([f64; 3]),
    SetGazeTarget([f64; 3]),
    SetHeadRotation(f64),
    SetNeckRotation { pitch: f64, roll: f64 },
    SetShapeKeys(BTreeMap<String, f64>),
    SetArmsJoints(BTreeMap<String, f64>),
    SetBlinkRandomly { mean: f64, variation: f64 },
    SetSaccade(SaccadeCycle),
    SetParam { key: String, value: String },
    SetArmAnimation { name: String, repeat: u32 },
    SetArmsMode(i32),
    SetParallax { eye_distance: f64, scale: f64 },
}

struct SimState {
    mode: PauMode,
    pau_timeout: DateTime<Utc>,
    soma: BTreeMap<String, SomaValues>,
    emotions: BTreeMap<String, f64>,
    gestures: BTreeMap<String, GestureValues>,
    arm_animations: BTreeMap<String, GestureValues>,
    head: Orientation,
    neck: Orientation,
    eyes: EyesData,
    face: BTreeMap<String, f64>,
    arms: BTreeMap<String, f64>,
    params: BTreeMap<String, String>,
    current_frame: Option<(String, i32)>,
    arms_mode: i32,
}

impl SimState {
    fn new() -> Self {
        Self {
            mode: PauMode::empty(),
            pau_timeout: DateTime::<Utc>::MIN_UTC,
            soma: BTreeMap::from([(
                "normal".to_string(),
                SomaValues {
                    magnitude: 1.0,
                    rate: 1.0,
                    ease_in: 0.0,
                },
            )]),
            emotions: BTreeMap::new(),
            gestures: BTreeMap::new(),
            arm_animations: BTreeMap::new(),
            head: Orientation::default(),
            neck: Orientation::default(),
            eyes: EyesData::default(),
            face: SHAPE_KEYS.iter().map(|k| (k.to_string(), 0.0)).collect(),
            arms: ARM_JOINTS.iter().map(|j| (j.to_string(), 0.0)).collect(),
            params: BTreeMap::new(),
            current_frame: None,
            arms_mode: 0,
        }
    }
}

/// Simulated [`AnimationEngine`].
pub struct SimRig {
    pau_active_timeout: TimeDelta,
    state: Mutex<SimState>,
    calls: Mutex<Vec<RigCall>>,
}

impl Default for SimRig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRig {
    pub fn new() -> Self {
        Self {
            pau_active_timeout: TimeDelta::milliseconds(DEFAULT_PAU_ACTIVE_TIMEOUT_MS),
            state: Mutex::new(SimState::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Override the PAU active-override window.
    pub fn with_pau_active_timeout(mut self, timeout: TimeDelta) -> Self {
        self.pau_active_timeout = timeout;
        self
    }

    /// Start with the given animation mode, without logging a call.
    pub fn with_mode(self, mode: PauMode) -> Self {
        self.state.lock().mode = mode;
        self
    }

    /// Start with the given head orientation.
    pub fn with_head(self, head: Orientation) -> Self {
        self.state.lock().head = head;
        self
    }

    /// Pretend `name` is playing at `frame`.
    pub fn with_current_frame(self, name: impl Into<String>, frame: i32) -> Self {
        self.state.lock().current_frame = Some((name.into(), frame));
        self
    }

    /// Snapshot of every accepted setter call so far.
    pub fn calls(&self) -> Vec<RigCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: RigCall) {
        debug!(?call, "sim rig call");
        self.calls.lock().push(call);
    }

    fn check_catalog(catalog: &[&str], kind: &str, name: &str) -> Result<(), RigError> {
        if catalog.contains(&name) {
            Ok(())
        } else {
            Err(RigError::not_found(kind, name))
        }
    }

    fn names(catalog: &[&str]) -> Vec<String> {
        catalog.iter().map(|s| s.to_string()).collect()
    }
}

impl AnimationEngine for SimRig {
    fn api_version(&self) -> i32 {
        SIM_API_VERSION
    }

    fn animation_mode(&self) -> PauMode {
        self.state.lock().mode
    }

    fn set_animation_mode(&self, mode: PauMode) {
        self.state.lock().mode = mode;
        self.record(RigCall::SetAnimationMode(mode));
    }

    fn pau_timeout(&self) -> DateTime<Utc> {
        self.state.lock().pau_timeout
    }

    fn set_pau_timeout(&self, deadline: DateTime<Utc>) {
        self.state.lock().pau_timeout = deadline;
        self.record(RigCall::SetPauTimeout(deadline));
    }

    fn pau_active_timeout(&self) -> TimeDelta {
        self.pau_active_timeout
    }

    fn available_soma_states(&self) -> Vec<String> {
        Self::names(SOMA_STATES)
    }

    fn soma_states(&self) -> BTreeMap<String, SomaValues> {
        self.state.lock().soma.clone()
    }

    fn set_soma_state(&self, name: &str, values: SomaValues) -> Result<(), RigError> {
        Self::check_catalog(SOMA_STATES, "soma state", name)?;
        self.state.lock().soma.insert(name.to_string(), values);
        self.record(RigCall::SetSomaState {
            name: name.to_string(),
            values,
        });
        Ok(())
    }

    fn available_emotion_states(&self) -> Vec<String> {
        Self::names(EMOTIONS)
    }

    fn emotion_states(&self) -> BTreeMap<String, f64> {
        self.state.lock().emotions.clone()
    }

    fn set_emotion_state(&self, name: &str, magnitude: f64, duration: f64) -> Result<(), RigError> {
        Self::check_catalog(EMOTIONS, "emotion", name)?;
        self.state.lock().emotions.insert(name.to_string(), magnitude);
        self.record(RigCall::SetEmotionState {
            name: name.to_string(),
            magnitude,
            duration,
        });
        Ok(())
    }

    fn set_emotion_value(&self, name: &str, magnitude: f64, duration: f64) -> Result<(), RigError> {
        Self::check_catalog(EMOTIONS, "emotion", name)?;
        self.state.lock().emotions.insert(name.to_string(), magnitude);
        self.record(RigCall::SetEmotionValue {
            name: name.to_string(),
            magnitude,
            duration,
        });
        Ok(())
    }

    fn available_gestures(&self) -> Vec<String> {
        Self::names(GESTURES)
    }

    fn gestures(&self) -> BTreeMap<String, GestureValues> {
        self.state.lock().gestures.clone()
    }

    fn set_gesture(&self, name: &str, repeat: u32, speed: f64, magnitude: f64) -> Result<(), RigError> {
        Self::check_catalog(GESTURES, "gesture", name)?;
        self.state.lock().gestures.insert(
            name.to_string(),
            GestureValues {
                speed,
                magnitude,
                duration: f64::from(repeat.max(1)),
            },
        );
        self.record(RigCall::SetGesture {
            name: name.to_string(),
            repeat,
        });
        Ok(())
    }

    fn available_visemes(&self) -> Vec<String> {
        Self::names(VISEMES)
    }

    fn queue_viseme(&self, viseme: &Viseme) -> Result<(), RigError> {
        Self::check_catalog(VISEMES, "viseme", &viseme.name)?;
        self.record(RigCall::QueueViseme {
            name: viseme.name.clone(),
        });
        Ok(())
    }

    fn set_face_target(&self, target: [f64; 3], _speed: Option<f64>) {
        self.record(RigCall::SetFaceTarget(target));
    }

    fn set_gaze_target(&self, target: [f64; 3], _speed: Option<f64>) {
        self.record(RigCall::SetGazeTarget(target));
    }

    fn set_head_rotation(&self, roll: f64) {
        self.record(RigCall::SetHeadRotation(roll));
    }

    fn set_neck_rotation(&self, pitch: f64, roll: f64) {
        self.record(RigCall::SetNeckRotation { pitch, roll });
    }

    fn head_data(&self) -> Orientation {
        self.state.lock().head
    }

    fn neck_data(&self) -> Orientation {
        self.state.lock().neck
    }

    fn eyes_data(&self) -> EyesData {
        self.state.lock().eyes
    }

    fn face_data(&self) -> BTreeMap<String, f64> {
        self.state.lock().face.clone()
    }

    fn arms_data(&self) -> BTreeMap<String, f64> {
        self.state.lock().arms.clone()
    }

    fn set_shape_keys(&self, shape_keys: BTreeMap<String, f64>) {
        self.state.lock().face.extend(shape_keys.clone());
        self.record(RigCall::SetShapeKeys(shape_keys));
    }

    fn set_arms_joints(&self, joints: BTreeMap<String, f64>) {
        self.state.lock().arms.extend(joints.clone());
        self.record(RigCall::SetArmsJoints(joints));
    }

    fn set_blink_randomly(&self, mean: f64, variation: f64) {
        self.record(RigCall::SetBlinkRandomly { mean, variation });
    }

    fn set_saccade(&self, cycle: &SaccadeCycle) {
        self.record(RigCall::SetSaccade(*cycle));
    }

    fn set_param(&self, key: &str, value: &str) -> bool {
        self.state
            .lock()
            .params
            .insert(key.to_string(), value.to_string());
        self.record(RigCall::SetParam {
            key: key.to_string(),
            value: value.to_string(),
        });
        true
    }

    fn param(&self, key: &str) -> String {
        self.state
            .lock()
            .params
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn animation_length(&self, name: &str) -> Result<f64, RigError> {
        Self::check_catalog(GESTURES, "animation", name)?;
        Ok(ANIMATION_FRAMES)
    }

    fn arm_animation_length(&self, name: &str) -> Result<f64, RigError> {
        Self::check_catalog(ARM_ANIMATIONS, "arm animation", name)?;
        Ok(ANIMATION_FRAMES)
    }

    fn current_frame(&self) -> Option<(String, i32)> {
        self.state.lock().current_frame.clone()
    }

    fn available_arm_animations(&self) -> Vec<String> {
        Self::names(ARM_ANIMATIONS)
    }

    fn arm_animations(&self) -> BTreeMap<String, GestureValues> {
        self.state.lock().arm_animations.clone()
    }

    fn set_arm_animation(&self, name: &str, repeat: u32, speed: f64, magnitude: f64) -> Result<(), RigError> {
        Self::check_catalog(ARM_ANIMATIONS, "arm animation", name)?;
        self.state.lock().arm_animations.insert(
            name.to_string(),
            GestureValues {
                speed,
                magnitude,
                duration: f64::from(repeat.max(1)),
            },
        );
        self.record(RigCall::SetArmAnimation {
            name: name.to_string(),
            repeat,
        });
        Ok(())
    }

    fn arms_mode(&self) -> i32 {
        self.state.lock().arms_mode
    }

    fn set_arms_mode(&self, mode: i32) -> bool {
        self.state.lock().arms_mode = mode;
        self.record(RigCall::SetArmsMode(mode));
        true
    }

    fn set_parallax(&self, eye_distance: f64, scale: f64) {
        self.record(RigCall::SetParallax { eye_distance, scale });
    }
}
