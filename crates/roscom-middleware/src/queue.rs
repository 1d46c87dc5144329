//! [`InboundQueue`] – handoff from bus callback threads to the control loop.
//!
//! Multi-producer / single-consumer FIFO built on an unbounded
//! [`tokio::sync::mpsc`] channel.  Producers ([`QueueSender`]) are cloned
//! into subscribe callbacks; the single consumer is the bridge node's
//! `poll()`, which never blocks.  Per-producer order is preserved.

use std::fmt;
use std::sync::Arc;

use roscom_rig::AnimationEngine;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tracing::warn;

use crate::channel::ChannelDescriptor;

/// A decoded-later inbound payload bound to the channel that received it.
///
/// Consumed exactly once via [`InboundCommand::execute`].
pub struct InboundCommand {
    channel: Arc<ChannelDescriptor>,
    payload: Value,
}

impl InboundCommand {
    pub fn new(channel: Arc<ChannelDescriptor>, payload: Value) -> Self {
        Self { channel, payload }
    }

    /// Name of the originating channel.
    pub fn channel(&self) -> &str {
        self.channel.name()
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Apply the command to `engine`, logging any failure.
    ///
    /// Returns `true` when the engine accepted it.
    pub fn execute(self, engine: &dyn AnimationEngine) -> bool {
        self.channel.deliver(engine, self.payload)
    }
}

impl fmt::Debug for InboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundCommand")
            .field("channel", &self.channel.name())
            .field("payload", &self.payload)
            .finish()
    }
}

/// Producer half, cheap to clone.
#[derive(Clone)]
pub struct QueueSender {
    tx: UnboundedSender<InboundCommand>,
}

impl QueueSender {
    /// Enqueue `command`.  Returns `false` if the queue has been dropped.
    pub fn push(&self, command: InboundCommand) -> bool {
        match self.tx.send(command) {
            Ok(()) => true,
            Err(mpsc::error::SendError(command)) => {
                warn!(channel = %command.channel(), "inbound queue closed; dropping command");
                false
            }
        }
    }
}

/// Single-consumer end of the inbound command queue.
pub struct InboundQueue {
    tx: UnboundedSender<InboundCommand>,
    rx: UnboundedReceiver<InboundCommand>,
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> QueueSender {
        QueueSender {
            tx: self.tx.clone(),
        }
    }

    /// Non-blocking dequeue.  `None` whenever the queue is empty.
    pub fn try_pop(&mut self) -> Option<InboundCommand> {
        match self.rx.try_recv() {
            Ok(command) => Some(command),
            // The queue holds its own sender, so it never disconnects.
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
