//! Error taxonomy of the bridge.
//!
//! Only [`BridgeError`] values raised while a bridge node is being
//! constructed are allowed to abort the owning process.  Everything raised
//! on the publish or dispatch paths is logged at the node boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Faults signalled by the animation engine.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RigError {
    /// A named catalog item (gesture, viseme, animation, …) is unknown.
    #[error("Unknown {kind}: {name}")]
    NotFound { kind: String, name: String },

    /// The engine refused the request for a reason of its own.
    #[error("Rig rejected request: {0}")]
    Rejected(String),
}

impl RigError {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// Faults signalled by the message-bus transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Transport closed")]
    Closed,

    #[error("Publish on {channel} failed: {details}")]
    Publish { channel: String, details: String },

    #[error("Channel {0} is already bound")]
    AlreadyBound(String),

    #[error("No endpoint bound on {0}")]
    UnknownChannel(String),

    /// A synchronous handler failed; the caller receives this as its
    /// error response.
    #[error("Handler on {channel} failed: {details}")]
    Handler { channel: String, details: String },
}

/// Errors raised by the bridge node and its channel registry.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Duplicate channel name: {0}")]
    DuplicateChannel(String),

    #[error("Invalid channel name: {0:?}")]
    InvalidChannelName(String),

    #[error("Channel {0} declares no payload shape")]
    MissingPayloadShape(String),

    #[error("Channel registry is empty")]
    EmptyRegistry,

    #[error("Cannot decode payload on {channel}: {details}")]
    Decode { channel: String, details: String },

    #[error("Cannot encode payload on {channel}: {details}")]
    Encode { channel: String, details: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Rig(#[from] RigError),
}

impl BridgeError {
    /// `true` for faults that can only arise while a node is constructed.
    pub fn is_construction_fault(&self) -> bool {
        matches!(
            self,
            Self::DuplicateChannel(_)
                | Self::InvalidChannelName(_)
                | Self::MissingPayloadShape(_)
                | Self::EmptyRegistry
        )
    }
}
