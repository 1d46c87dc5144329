//! `roscom-types` – shared vocabulary of the animation command bridge.
//!
//! # Modules
//!
//! - [`msg`] – wire records exchanged on bus channels: topic messages,
//!   service request/response pairs, and live-reconfigure settings.
//! - [`mode`] – [`PauMode`], the pose-override bit-flag set that gates the
//!   PAU channel pair and several target channels.
//! - [`error`] – [`BridgeError`], [`TransportError`] and [`RigError`].

pub mod error;
pub mod mode;
pub mod msg;

pub use error::{BridgeError, RigError, TransportError};
pub use mode::PauMode;
