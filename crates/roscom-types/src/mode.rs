//! Pose-override ("PAU") animation mode flags.
//!
//! The animation engine keeps a single byte describing which parts of the
//! rig are currently driven by external PAU pose messages rather than by its
//! own procedural animation.  Each part owns one bit; [`PauMode::ACTIVE`]
//! marks that a PAU message arrived recently enough for the override to be
//! in effect.
//!
//! On the wire the mode is the raw byte, unknown bits included.

use std::fmt;

use bitflags::bitflags;
use schemars::JsonSchema;
use schemars::r#gen::SchemaGenerator;
use schemars::schema::Schema;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Bit-flag set of pose-override modes.
    ///
    /// | Flag | Part handed to PAU |
    /// |------|--------------------|
    /// | [`HEAD_YAW`](Self::HEAD_YAW) | head yaw, via the face target |
    /// | [`HEAD_PITCH`](Self::HEAD_PITCH) | head pitch |
    /// | [`HEAD_ROLL`](Self::HEAD_ROLL) | head roll |
    /// | [`EYE_TARGET`](Self::EYE_TARGET) | eye gaze |
    /// | [`FACE`](Self::FACE) | facial shape keys |
    /// | [`ARMS`](Self::ARMS) | arm joints |
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(from = "u8", into = "u8")]
    pub struct PauMode: u8 {
        const HEAD_YAW   = 0b0000_0001;
        const HEAD_PITCH = 0b0000_0010;
        const HEAD_ROLL  = 0b0000_0100;
        const EYE_TARGET = 0b0000_1000;
        const FACE       = 0b0001_0000;
        const ARMS       = 0b0010_0000;
        /// A PAU message arrived within the active-override window.
        const ACTIVE     = 0b1000_0000;
    }
}

impl From<u8> for PauMode {
    fn from(bits: u8) -> Self {
        Self::from_bits_retain(bits)
    }
}

impl From<PauMode> for u8 {
    fn from(mode: PauMode) -> Self {
        mode.bits()
    }
}

impl JsonSchema for PauMode {
    fn schema_name() -> String {
        "PauMode".to_string()
    }

    fn is_referenceable() -> bool {
        false
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        u8::json_schema(generator)
    }
}

impl fmt::Display for PauMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010b}", self.bits())
    }
}
