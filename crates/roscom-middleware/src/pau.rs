//! PAU pose translation: the `get_pau` / `set_pau` channel pair.
//!
//! `get_pau` snapshots the whole pose into one [`Pau`] record and expires
//! the active-override window.  `set_pau` applies an inbound pose to every
//! rig part the current [`PauMode`] hands over to PAU control.  The parts
//! are evaluated independently against the same message.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use roscom_geometry::{Euler, Quaternion, look_at_target};
use roscom_rig::{AnimationEngine, Orientation};
use roscom_types::PauMode;
use roscom_types::msg::{Pau, QuaternionMsg};
use tracing::trace;

/// Outbound quaternion: the engine's Z axis points the other way on the bus.
fn to_wire(o: Orientation) -> QuaternionMsg {
    QuaternionMsg {
        x: o.x,
        y: o.y,
        z: -o.z,
        w: o.w,
    }
}

/// Snapshot the current pose.
///
/// Clears [`PauMode::ACTIVE`] once `now` has reached the engine's PAU
/// deadline.
pub fn get_pau(engine: &dyn AnimationEngine, now: DateTime<Utc>) -> Pau {
    let eyes = engine.eyes_data();
    let (shapekeys, coeffs) = engine.face_data().into_iter().unzip();
    let (joints, angles) = engine.arms_data().into_iter().unzip();

    let msg = Pau {
        head_rotation: to_wire(engine.head_data()),
        neck_rotation: to_wire(engine.neck_data()),
        eye_gaze_left_pitch: eyes.left.pitch,
        eye_gaze_left_yaw: eyes.left.yaw,
        eye_gaze_right_pitch: eyes.right.pitch,
        eye_gaze_right_yaw: eyes.right.yaw,
        shapekeys,
        coeffs,
        joints,
        angles,
    };

    let mode = engine.animation_mode();
    if mode.contains(PauMode::ACTIVE) && now >= engine.pau_timeout() {
        trace!("pau override window expired");
        engine.set_animation_mode(mode.difference(PauMode::ACTIVE));
    }
    msg
}

/// Decode the inbound head rotation, falling back to a neutral pose.
fn head_angles(q: QuaternionMsg) -> Euler {
    Quaternion::new(q.w, q.x, q.y, q.z)
        .to_euler_xzy()
        .unwrap_or_default()
}

fn pair(names: &[String], values: &[f64]) -> BTreeMap<String, f64> {
    names.iter().cloned().zip(values.iter().copied()).collect()
}

/// Apply an inbound pose under the engine's current mode.
///
/// Ignored entirely while the mode mask is empty.
pub fn set_pau(engine: &dyn AnimationEngine, msg: &Pau, now: DateTime<Utc>) {
    let mode = engine.animation_mode();
    if mode.is_empty() {
        return;
    }

    engine.set_pau_timeout(now + engine.pau_active_timeout());
    engine.set_animation_mode(mode | PauMode::ACTIVE);

    let mut angles = Euler::default();
    if mode.intersects(PauMode::HEAD_YAW | PauMode::HEAD_ROLL) {
        angles = head_angles(msg.head_rotation);
        if mode.contains(PauMode::HEAD_YAW) {
            let target = look_at_target(angles.pitch, angles.yaw);
            engine.set_face_target(target.to_array(), None);
        }
        if mode.contains(PauMode::HEAD_ROLL) {
            engine.set_head_rotation(angles.roll);
        }
    }

    if mode.contains(PauMode::EYE_TARGET) {
        let pitch = angles.pitch + msg.eye_gaze_left_pitch.to_radians();
        let yaw = angles.yaw + msg.eye_gaze_left_yaw.to_radians();
        engine.set_gaze_target(look_at_target(pitch, yaw).to_array(), None);
    }

    if mode.contains(PauMode::FACE) {
        engine.set_shape_keys(pair(&msg.shapekeys, &msg.coeffs));
    }

    if mode.contains(PauMode::ARMS) {
        engine.set_arms_joints(pair(&msg.joints, &msg.angles));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use roscom_rig::{RigCall, SimRig};
    use std::f64::consts::FRAC_PI_4;

    fn pose_with_head(q: QuaternionMsg) -> Pau {
        Pau {
            head_rotation: q,
            ..Pau::default()
        }
    }

    fn face_targets(rig: &SimRig) -> Vec<[f64; 3]> {
        rig.calls()
            .into_iter()
            .filter_map(|c| match c {
                RigCall::SetFaceTarget(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    fn gaze_targets(rig: &SimRig) -> Vec<[f64; 3]> {
        rig.calls()
            .into_iter()
            .filter_map(|c| match c {
                RigCall::SetGazeTarget(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_mode_leaves_engine_untouched() {
        let rig = SimRig::new();
        let msg = Pau {
            shapekeys: vec!["jaw_open".to_string()],
            coeffs: vec![1.0],
            ..Pau::default()
        };
        set_pau(&rig, &msg, Utc::now());
        assert!(rig.calls().is_empty());
    }

    #[test]
    fn neutral_head_with_yaw_mode_looks_straight_ahead() {
        let rig = SimRig::new().with_mode(PauMode::HEAD_YAW);
        set_pau(&rig, &pose_with_head(QuaternionMsg::default()), Utc::now());
        assert_eq!(face_targets(&rig), vec![[1.0, 0.0, 0.0]]);
        assert!(gaze_targets(&rig).is_empty());
        assert!(!rig.calls().iter().any(|c| matches!(c, RigCall::SetHeadRotation(_))));
    }

    #[test]
    fn set_pau_extends_deadline_and_marks_active() {
        let rig = SimRig::new().with_mode(PauMode::FACE);
        let now = Utc::now();
        set_pau(&rig, &Pau::default(), now);
        assert_eq!(rig.pau_timeout(), now + rig.pau_active_timeout());
        assert_eq!(rig.animation_mode(), PauMode::FACE | PauMode::ACTIVE);
    }

    #[test]
    fn nan_head_rotation_degrades_to_neutral_angles() {
        let rig = SimRig::new().with_mode(PauMode::HEAD_YAW | PauMode::HEAD_ROLL);
        let q = QuaternionMsg {
            x: f64::NAN,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        };
        set_pau(&rig, &pose_with_head(q), Utc::now());
        assert_eq!(face_targets(&rig), vec![[1.0, 0.0, 0.0]]);
        assert!(rig.calls().contains(&RigCall::SetHeadRotation(0.0)));
    }

    #[test]
    fn yawed_head_turns_the_face_target() {
        let rig = SimRig::new().with_mode(PauMode::HEAD_YAW);
        let half = FRAC_PI_4 / 2.0;
        // 45° about Y.
        let q = QuaternionMsg {
            x: 0.0,
            y: half.sin(),
            z: 0.0,
            w: half.cos(),
        };
        set_pau(&rig, &pose_with_head(q), Utc::now());
        let [x, y, z] = face_targets(&rig)[0];
        assert!((x - FRAC_PI_4.cos()).abs() < 1e-9);
        assert!((y - FRAC_PI_4.sin()).abs() < 1e-9);
        assert!(z.abs() < 1e-9);
    }

    #[test]
    fn eye_angles_add_to_head_angles_and_go_to_gaze_target() {
        let rig = SimRig::new().with_mode(PauMode::EYE_TARGET);
        let msg = Pau {
            eye_gaze_left_yaw: 90.0,
            // The right eye is ignored.
            eye_gaze_right_yaw: -90.0,
            ..Pau::default()
        };
        set_pau(&rig, &msg, Utc::now());
        assert!(face_targets(&rig).is_empty());
        let [x, y, z] = gaze_targets(&rig)[0];
        assert!(x.abs() < 1e-9);
        assert!((y - 1.0).abs() < 1e-9);
        assert!(z.abs() < 1e-9);
    }

    #[test]
    fn face_and_arms_pair_names_with_values_positionally() {
        let rig = SimRig::new().with_mode(PauMode::FACE | PauMode::ARMS);
        let msg = Pau {
            shapekeys: vec!["jaw_open".to_string(), "smile_left".to_string()],
            coeffs: vec![0.25, 0.75, 1.0],
            joints: vec!["left_elbow".to_string()],
            angles: vec![1.2],
            ..Pau::default()
        };
        set_pau(&rig, &msg, Utc::now());
        let calls = rig.calls();
        assert!(calls.contains(&RigCall::SetShapeKeys(BTreeMap::from([
            ("jaw_open".to_string(), 0.25),
            ("smile_left".to_string(), 0.75),
        ]))));
        assert!(calls.contains(&RigCall::SetArmsJoints(BTreeMap::from([(
            "left_elbow".to_string(),
            1.2
        )]))));
    }

    #[test]
    fn get_pau_inverts_z_and_carries_named_values() {
        let rig = SimRig::new().with_head(Orientation {
            x: 0.1,
            y: 0.2,
            z: 0.3,
            w: 0.9,
        });
        let msg = get_pau(&rig, Utc::now());
        assert_eq!(msg.head_rotation.z, -0.3);
        assert_eq!(msg.head_rotation.x, 0.1);
        assert_eq!(msg.shapekeys.len(), msg.coeffs.len());
        assert!(msg.joints.contains(&"left_elbow".to_string()));
    }

    #[test]
    fn get_pau_expires_the_active_window() {
        let rig = SimRig::new().with_mode(PauMode::FACE);
        let start = Utc::now();
        set_pau(&rig, &Pau::default(), start);
        assert!(rig.animation_mode().contains(PauMode::ACTIVE));

        // Still inside the window.
        get_pau(&rig, start + TimeDelta::milliseconds(1));
        assert!(rig.animation_mode().contains(PauMode::ACTIVE));

        get_pau(&rig, start + rig.pau_active_timeout());
        assert_eq!(rig.animation_mode(), PauMode::FACE);
    }
}
