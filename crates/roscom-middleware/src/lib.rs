//! `roscom-middleware` – channel routing between a message bus and an
//! animation engine.
//!
//! Owns the command table, the pause/drop lifecycle and the handoff queue
//! between bus callback threads and the control loop.
//!
//! # Modules
//!
//! - [`channel`] – channel roles, typed declarations and runtime
//!   descriptors with their pause flag.
//! - [`registry`] – resolves declarations into an ordered, duplicate-free
//!   registry.
//! - [`commands`] – the full table of bridge channels and their engine
//!   conversions.
//! - [`pau`] – whole-pose snapshot and override (`get_pau` / `set_pau`).
//! - [`queue`] – MPSC inbound command queue drained by `poll()`.
//! - [`transport`] – the [`Transport`] trait a message bus implements.
//! - [`local_bus`] – synchronous in-process [`Transport`] with inspection
//!   and fault-injection hooks.
//! - [`node`] – [`BridgeNode`]: construct, initialize, poll, push, drop.

pub mod channel;
pub mod commands;
pub mod local_bus;
pub mod node;
pub mod pau;
pub mod queue;
pub mod registry;
pub mod transport;

pub use channel::{ChannelDecl, ChannelDescriptor, ChannelRole, PayloadShape};
pub use local_bus::{BusMessage, LocalBus};
pub use node::{BridgeConfig, BridgeNode, DEFAULT_NAMESPACE, DispatchMode};
pub use queue::{InboundCommand, InboundQueue};
pub use registry::ChannelRegistry;
pub use transport::Transport;
