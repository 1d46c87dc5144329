//! The static command table: every channel the bridge exposes.
//!
//! Each function below is the conversion bound to one channel; [`table`]
//! pairs them with their channel names and roles.  Private names (`~x`)
//! resolve under the node namespace.

use chrono::Utc;
use roscom_rig::{AnimationEngine, SomaValues};
use roscom_types::msg::{
    AnimationModeConfig, ApiVersion, AvailableNames, BlinkCycle, CurrentFrame, EmotionState,
    EmotionStates, Float32, GetAnimationLengthRequest, GetAnimationLengthResponse, GetModeRequest,
    GetModeResponse, GetParamRequest, GetParamResponse, Gesture, Gestures, ParallaxConfig, Pau,
    SaccadeCycle, SetGesture, SetModeRequest, SetModeResponse, SetParamRequest, SetParamResponse,
    SomaState, SomaStates, Target, UInt8, Vector3, Viseme,
};
use roscom_types::{PauMode, RigError};
use tracing::debug;

use crate::channel::ChannelDecl;
use crate::pau;

/// Every channel of the bridge, in registration order.
pub fn table() -> Vec<ChannelDecl> {
    vec![
        // Announcements
        ChannelDecl::publish_once("~get_api_version", get_api_version),
        ChannelDecl::publish_once("~available_soma_states", available_soma_states),
        ChannelDecl::publish_once("~available_emotion_states", available_emotion_states),
        ChannelDecl::publish_once("~available_gestures", available_gestures),
        ChannelDecl::publish_once("~available_visemes", available_visemes),
        ChannelDecl::publish_once("~available_arm_animations", available_arm_animations),
        // Live state
        ChannelDecl::publish_live("~get_animation_mode", get_animation_mode),
        ChannelDecl::publish_live("~get_soma_states", get_soma_states),
        ChannelDecl::publish_live("~get_emotion_states", get_emotion_states),
        ChannelDecl::publish_live("~get_gestures", get_gestures),
        ChannelDecl::publish_live("~get_arm_animations", get_arm_animations),
        ChannelDecl::publish_live("~get_current_frame", get_current_frame),
        ChannelDecl::publish_live("~get_pau", get_pau),
        // Commands
        ChannelDecl::subscribe("~set_animation_mode", set_animation_mode),
        ChannelDecl::subscribe("~set_soma_state", set_soma_state),
        ChannelDecl::subscribe("~set_emotion_state", set_emotion_state),
        ChannelDecl::subscribe("~set_emotion_value", set_emotion_value),
        ChannelDecl::subscribe("~set_gesture", set_gesture),
        ChannelDecl::subscribe("~queue_viseme", queue_viseme),
        ChannelDecl::subscribe("~set_face_target", set_face_target),
        ChannelDecl::subscribe("~set_gaze_target", set_gaze_target),
        ChannelDecl::subscribe("~set_head_rotation", set_head_rotation),
        ChannelDecl::subscribe("~set_pau", set_pau),
        ChannelDecl::subscribe("~set_neck_rotation", set_neck_rotation),
        ChannelDecl::subscribe("~set_blink_randomly", set_blink_randomly),
        ChannelDecl::subscribe("~set_saccade", set_saccade),
        ChannelDecl::subscribe("~set_arm_animation", set_arm_animation),
        // Services
        ChannelDecl::service("~set_param", set_param),
        ChannelDecl::service("~get_param", get_param),
        ChannelDecl::service("~get_animation_length", get_animation_length),
        ChannelDecl::service("~get_arm_animation_length", get_arm_animation_length),
        ChannelDecl::service("~get_arms_mode", get_arms_mode),
        ChannelDecl::service("~set_arms_mode", set_arms_mode),
        // Live reconfiguration
        ChannelDecl::configure("~override_mode", configure_override_mode),
        ChannelDecl::configure("~parallax", configure_parallax),
    ]
}

/// `true` while PAU is actively driving every part in `parts`.
fn pau_owns(rig: &dyn AnimationEngine, parts: PauMode) -> bool {
    rig.animation_mode().contains(PauMode::ACTIVE | parts)
}

// ────────────────────────────────────────────────────────────────────────────
// Announcements
// ────────────────────────────────────────────────────────────────────────────

fn get_api_version(rig: &dyn AnimationEngine) -> ApiVersion {
    ApiVersion {
        version: rig.api_version(),
    }
}

fn available_soma_states(rig: &dyn AnimationEngine) -> AvailableNames {
    AvailableNames {
        data: rig.available_soma_states(),
    }
}

fn available_emotion_states(rig: &dyn AnimationEngine) -> AvailableNames {
    AvailableNames {
        data: rig.available_emotion_states(),
    }
}

fn available_gestures(rig: &dyn AnimationEngine) -> AvailableNames {
    AvailableNames {
        data: rig.available_gestures(),
    }
}

fn available_visemes(rig: &dyn AnimationEngine) -> AvailableNames {
    AvailableNames {
        data: rig.available_visemes(),
    }
}

fn available_arm_animations(rig: &dyn AnimationEngine) -> AvailableNames {
    AvailableNames {
        data: rig.available_arm_animations(),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Live state
// ────────────────────────────────────────────────────────────────────────────

fn get_animation_mode(rig: &dyn AnimationEngine) -> UInt8 {
    UInt8 {
        data: rig.animation_mode().bits(),
    }
}

fn get_soma_states(rig: &dyn AnimationEngine) -> SomaStates {
    SomaStates {
        data: rig
            .soma_states()
            .into_iter()
            .map(|(name, v)| SomaState {
                name,
                magnitude: v.magnitude,
                rate: v.rate,
                ease_in: v.ease_in,
            })
            .collect(),
    }
}

fn get_emotion_states(rig: &dyn AnimationEngine) -> EmotionStates {
    EmotionStates {
        data: rig
            .emotion_states()
            .into_iter()
            // Running emotions report no remaining duration.
            .map(|(name, magnitude)| EmotionState {
                name,
                magnitude,
                duration: 0.0,
            })
            .collect(),
    }
}

fn to_gestures(map: std::collections::BTreeMap<String, roscom_rig::GestureValues>) -> Gestures {
    Gestures {
        data: map
            .into_iter()
            .map(|(name, v)| Gesture {
                name,
                speed: v.speed,
                magnitude: v.magnitude,
                duration: v.duration,
            })
            .collect(),
    }
}

fn get_gestures(rig: &dyn AnimationEngine) -> Gestures {
    to_gestures(rig.gestures())
}

fn get_arm_animations(rig: &dyn AnimationEngine) -> Gestures {
    to_gestures(rig.arm_animations())
}

fn get_current_frame(rig: &dyn AnimationEngine) -> CurrentFrame {
    match rig.current_frame() {
        Some((name, frame)) => CurrentFrame { name, frame },
        None => CurrentFrame::default(),
    }
}

fn get_pau(rig: &dyn AnimationEngine) -> Pau {
    pau::get_pau(rig, Utc::now())
}

// ────────────────────────────────────────────────────────────────────────────
// Commands
// ────────────────────────────────────────────────────────────────────────────

fn set_animation_mode(rig: &dyn AnimationEngine, msg: UInt8) -> Result<(), RigError> {
    rig.set_animation_mode(PauMode::from_bits_retain(msg.data));
    Ok(())
}

fn set_soma_state(rig: &dyn AnimationEngine, msg: SomaState) -> Result<(), RigError> {
    if rig.animation_mode().contains(PauMode::ACTIVE) {
        debug!(name = %msg.name, "soma state ignored while PAU is active");
        return Ok(());
    }
    rig.set_soma_state(
        &msg.name,
        SomaValues {
            magnitude: msg.magnitude,
            rate: msg.rate,
            ease_in: msg.ease_in,
        },
    )
}

fn set_emotion_state(rig: &dyn AnimationEngine, msg: EmotionState) -> Result<(), RigError> {
    rig.set_emotion_state(&msg.name, msg.magnitude, msg.duration)
}

fn set_emotion_value(rig: &dyn AnimationEngine, msg: EmotionState) -> Result<(), RigError> {
    rig.set_emotion_value(&msg.name, msg.magnitude, msg.duration)
}

fn set_gesture(rig: &dyn AnimationEngine, msg: SetGesture) -> Result<(), RigError> {
    rig.set_gesture(&msg.name, msg.repeat, msg.speed, msg.magnitude)
}

fn queue_viseme(rig: &dyn AnimationEngine, msg: Viseme) -> Result<(), RigError> {
    if pau_owns(rig, PauMode::FACE) {
        return Ok(());
    }
    rig.queue_viseme(&msg)
}

fn set_face_target(rig: &dyn AnimationEngine, msg: Target) -> Result<(), RigError> {
    if pau_owns(rig, PauMode::HEAD_YAW) {
        return Ok(());
    }
    rig.set_face_target([msg.x, msg.y, msg.z], Some(msg.speed));
    Ok(())
}

fn set_gaze_target(rig: &dyn AnimationEngine, msg: Target) -> Result<(), RigError> {
    if pau_owns(rig, PauMode::EYE_TARGET) {
        return Ok(());
    }
    rig.set_gaze_target([msg.x, msg.y, msg.z], Some(msg.speed));
    Ok(())
}

fn set_head_rotation(rig: &dyn AnimationEngine, msg: Float32) -> Result<(), RigError> {
    if pau_owns(rig, PauMode::HEAD_ROLL) {
        return Ok(());
    }
    rig.set_head_rotation(f64::from(msg.data));
    Ok(())
}

fn set_pau(rig: &dyn AnimationEngine, msg: Pau) -> Result<(), RigError> {
    pau::set_pau(rig, &msg, Utc::now());
    Ok(())
}

/// Neck messages carry roll in `x` and pitch in `y`.
fn set_neck_rotation(rig: &dyn AnimationEngine, msg: Vector3) -> Result<(), RigError> {
    rig.set_neck_rotation(msg.y, msg.x);
    Ok(())
}

fn set_blink_randomly(rig: &dyn AnimationEngine, msg: BlinkCycle) -> Result<(), RigError> {
    rig.set_blink_randomly(msg.mean, msg.variation);
    Ok(())
}

fn set_saccade(rig: &dyn AnimationEngine, msg: SaccadeCycle) -> Result<(), RigError> {
    rig.set_saccade(&msg);
    Ok(())
}

fn set_arm_animation(rig: &dyn AnimationEngine, msg: SetGesture) -> Result<(), RigError> {
    rig.set_arm_animation(&msg.name, msg.repeat, msg.speed, msg.magnitude)
}

// ────────────────────────────────────────────────────────────────────────────
// Services
// ────────────────────────────────────────────────────────────────────────────

fn set_param(rig: &dyn AnimationEngine, req: SetParamRequest) -> Result<SetParamResponse, RigError> {
    Ok(SetParamResponse {
        success: rig.set_param(&req.key, &req.value),
    })
}

fn get_param(rig: &dyn AnimationEngine, req: GetParamRequest) -> Result<GetParamResponse, RigError> {
    Ok(GetParamResponse {
        value: rig.param(&req.param),
    })
}

fn get_animation_length(
    rig: &dyn AnimationEngine,
    req: GetAnimationLengthRequest,
) -> Result<GetAnimationLengthResponse, RigError> {
    Ok(GetAnimationLengthResponse {
        length: rig.animation_length(&req.animation)?,
    })
}

fn get_arm_animation_length(
    rig: &dyn AnimationEngine,
    req: GetAnimationLengthRequest,
) -> Result<GetAnimationLengthResponse, RigError> {
    Ok(GetAnimationLengthResponse {
        length: rig.arm_animation_length(&req.animation)?,
    })
}

fn get_arms_mode(rig: &dyn AnimationEngine, _req: GetModeRequest) -> Result<GetModeResponse, RigError> {
    Ok(GetModeResponse {
        mode: rig.arms_mode(),
    })
}

fn set_arms_mode(rig: &dyn AnimationEngine, req: SetModeRequest) -> Result<SetModeResponse, RigError> {
    Ok(SetModeResponse {
        success: rig.set_arms_mode(req.mode),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Live reconfiguration
// ────────────────────────────────────────────────────────────────────────────

/// Translate the override switches into a PAU mode mask.
pub fn override_mode(cfg: &AnimationModeConfig) -> PauMode {
    let mut mode = PauMode::empty();
    if cfg.head {
        mode |= PauMode::HEAD_YAW | PauMode::HEAD_PITCH;
    }
    if cfg.head_roll {
        mode |= PauMode::HEAD_ROLL;
    }
    if cfg.eyes {
        mode |= PauMode::EYE_TARGET;
    }
    if cfg.face {
        mode |= PauMode::FACE;
    }
    if cfg.arms {
        mode |= PauMode::ARMS;
    }
    mode
}

fn configure_override_mode(
    rig: &dyn AnimationEngine,
    cfg: AnimationModeConfig,
    level: u32,
) -> AnimationModeConfig {
    let mode = override_mode(&cfg);
    debug!(%mode, level, "override mode reconfigured");
    rig.set_animation_mode(mode);
    cfg
}

fn configure_parallax(rig: &dyn AnimationEngine, cfg: ParallaxConfig, level: u32) -> ParallaxConfig {
    debug!(eye_distance = cfg.eye_distance, scale = cfg.parallax_scale, level, "parallax reconfigured");
    rig.set_parallax(cfg.eye_distance, cfg.parallax_scale);
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelRole;
    use crate::registry::ChannelRegistry;
    use roscom_rig::{RigCall, SimRig};

    #[test]
    fn table_builds_without_duplicates() {
        let registry = ChannelRegistry::build("blender_api", table()).unwrap();
        assert_eq!(registry.len(), table().len());
        assert_eq!(registry.with_role(ChannelRole::AnnounceOnce).count(), 6);
        assert_eq!(registry.with_role(ChannelRole::PublishLive).count(), 7);
        assert_eq!(registry.with_role(ChannelRole::Subscribe).count(), 14);
        assert_eq!(registry.with_role(ChannelRole::Service).count(), 6);
        assert_eq!(registry.with_role(ChannelRole::Reconfigure).count(), 2);
    }

    #[test]
    fn override_mode_weights() {
        let all = AnimationModeConfig {
            head: true,
            head_roll: true,
            eyes: true,
            face: true,
            arms: true,
        };
        assert_eq!(override_mode(&all).bits(), 3 + 4 + 8 + 16 + 32);
        assert_eq!(override_mode(&AnimationModeConfig::default()), PauMode::empty());
    }

    #[test]
    fn face_target_is_suppressed_while_pau_drives_head_yaw() {
        let rig = SimRig::new().with_mode(PauMode::ACTIVE | PauMode::HEAD_YAW);
        let target = Target {
            x: 1.0,
            y: 0.5,
            z: 0.0,
            speed: 1.0,
        };
        set_face_target(&rig, target).unwrap();
        assert!(rig.calls().is_empty());

        // Gaze is a different part and still goes through.
        set_gaze_target(&rig, target).unwrap();
        assert_eq!(rig.calls(), vec![RigCall::SetGazeTarget([1.0, 0.5, 0.0])]);
    }

    #[test]
    fn inactive_pau_mode_does_not_suppress_targets() {
        let rig = SimRig::new().with_mode(PauMode::HEAD_YAW);
        set_face_target(&rig, Target::default()).unwrap();
        assert_eq!(rig.calls().len(), 1);
    }

    #[test]
    fn soma_state_is_ignored_while_pau_is_active() {
        let rig = SimRig::new().with_mode(PauMode::ACTIVE);
        let msg = SomaState {
            name: "breathing".to_string(),
            magnitude: 1.0,
            rate: 1.0,
            ease_in: 0.5,
        };
        set_soma_state(&rig, msg).unwrap();
        assert!(rig.calls().is_empty());
    }

    #[test]
    fn neck_rotation_swaps_axes() {
        let rig = SimRig::new();
        set_neck_rotation(&rig, Vector3 { x: 0.1, y: 0.2, z: 9.0 }).unwrap();
        assert_eq!(rig.calls(), vec![RigCall::SetNeckRotation { pitch: 0.2, roll: 0.1 }]);
    }

    #[test]
    fn visemes_are_ignored_while_pau_drives_the_face() {
        let rig = SimRig::new().with_mode(PauMode::ACTIVE | PauMode::FACE);
        let viseme = Viseme {
            name: "M".to_string(),
            ..Viseme::default()
        };
        queue_viseme(&rig, viseme.clone()).unwrap();
        assert!(rig.calls().is_empty());

        let rig = SimRig::new().with_mode(PauMode::FACE);
        queue_viseme(&rig, viseme).unwrap();
        assert_eq!(rig.calls(), vec![RigCall::QueueViseme { name: "M".to_string() }]);
    }

    #[test]
    fn unknown_viseme_is_an_error() {
        let rig = SimRig::new();
        let viseme = Viseme {
            name: "ZH".to_string(),
            ..Viseme::default()
        };
        assert!(matches!(queue_viseme(&rig, viseme), Err(RigError::NotFound { .. })));
        assert!(rig.calls().is_empty());
    }

    #[test]
    fn blink_cycle_keeps_mean_and_variation_apart() {
        let rig = SimRig::new();
        set_blink_randomly(&rig, BlinkCycle { mean: 3.0, variation: 0.5 }).unwrap();
        assert_eq!(
            rig.calls(),
            vec![RigCall::SetBlinkRandomly {
                mean: 3.0,
                variation: 0.5
            }]
        );
    }

    #[test]
    fn unknown_arm_animation_is_an_error() {
        let rig = SimRig::new();
        let msg = SetGesture {
            name: "juggle".to_string(),
            repeat: 1,
            speed: 1.0,
            magnitude: 1.0,
        };
        assert!(matches!(set_arm_animation(&rig, msg), Err(RigError::NotFound { .. })));
        assert!(rig.calls().is_empty());

        let wave = SetGesture {
            name: "wave".to_string(),
            repeat: 2,
            speed: 1.0,
            magnitude: 1.0,
        };
        set_arm_animation(&rig, wave).unwrap();
        assert_eq!(
            rig.calls(),
            vec![RigCall::SetArmAnimation {
                name: "wave".to_string(),
                repeat: 2
            }]
        );
    }

    #[test]
    fn parallax_config_is_applied_and_echoed() {
        let rig = SimRig::new();
        let cfg = ParallaxConfig {
            eye_distance: 0.06,
            parallax_scale: 1.5,
        };
        assert_eq!(configure_parallax(&rig, cfg, 0), cfg);
        assert_eq!(
            rig.calls(),
            vec![RigCall::SetParallax {
                eye_distance: 0.06,
                scale: 1.5
            }]
        );
    }

    #[test]
    fn unknown_animation_length_is_an_error() {
        let rig = SimRig::new();
        let req = GetAnimationLengthRequest {
            animation: "cartwheel".to_string(),
        };
        assert!(matches!(
            get_animation_length(&rig, req),
            Err(RigError::NotFound { .. })
        ));
    }

    #[test]
    fn current_frame_defaults_when_nothing_plays() {
        assert_eq!(get_current_frame(&SimRig::new()), CurrentFrame::default());
        let rig = SimRig::new().with_current_frame("nod-1", 12);
        assert_eq!(
            get_current_frame(&rig),
            CurrentFrame {
                name: "nod-1".to_string(),
                frame: 12
            }
        );
    }
}
