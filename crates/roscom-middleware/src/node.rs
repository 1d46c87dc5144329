//! [`BridgeNode`] – binds the command table to a transport and drives it.
//!
//! The owning process sees five lifecycle calls:
//!
//! - [`BridgeNode::construct`] builds the registry, binds every channel and
//!   fires the one-shot announcements.
//! - [`BridgeNode::initialize`] unpauses every channel.
//! - [`BridgeNode::poll`] dequeues one inbound command without blocking.
//! - [`BridgeNode::push`] publishes every live channel once.
//! - [`BridgeNode::drop`] pauses every channel for good.
//!
//! Only Publish-live and Subscribe traffic honours the pause flag; services
//! and reconfigure endpoints answer from construction on.

use std::sync::Arc;

use roscom_rig::AnimationEngine;
use roscom_types::{BridgeError, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};

use crate::channel::{ChannelDecl, ChannelDescriptor, ChannelRole};
use crate::commands;
use crate::queue::{InboundCommand, InboundQueue, QueueSender};
use crate::registry::ChannelRegistry;
use crate::transport::{ReconfigureCallback, ServiceCallback, SubscribeCallback, Transport};

/// Namespace private channel names resolve under by default.
pub const DEFAULT_NAMESPACE: &str = "blender_api";

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Where an unpaused Subscribe payload is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Convert and call the engine on the transport's callback thread.
    #[default]
    Direct,
    /// Enqueue an [`InboundCommand`]; the owner executes it after `poll()`.
    Queued,
}

impl std::str::FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "queued" => Ok(Self::Queued),
            other => Err(format!("unknown dispatch mode '{other}' (expected direct or queued)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub namespace: String,
    pub dispatch: DispatchMode,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            dispatch: DispatchMode::default(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// BridgeNode
// ────────────────────────────────────────────────────────────────────────────

pub struct BridgeNode {
    engine: Arc<dyn AnimationEngine>,
    transport: Arc<dyn Transport>,
    registry: ChannelRegistry,
    queue: InboundQueue,
    dispatch: DispatchMode,
}

impl BridgeNode {
    /// Build the full command table and bind it to `transport`.
    ///
    /// # Errors
    ///
    /// Any registry construction fault, any transport refusal while
    /// binding, or an announcement that cannot be produced.
    pub fn construct(
        engine: Arc<dyn AnimationEngine>,
        transport: Arc<dyn Transport>,
        config: &BridgeConfig,
    ) -> Result<Self, BridgeError> {
        Self::with_table(engine, transport, config, commands::table())
    }

    /// Like [`construct`](Self::construct) with an explicit declaration list.
    pub fn with_table(
        engine: Arc<dyn AnimationEngine>,
        transport: Arc<dyn Transport>,
        config: &BridgeConfig,
        decls: Vec<ChannelDecl>,
    ) -> Result<Self, BridgeError> {
        let registry = ChannelRegistry::build(&config.namespace, decls)?;
        let node = Self {
            engine,
            transport,
            registry,
            queue: InboundQueue::new(),
            dispatch: config.dispatch,
        };
        for channel in node.registry.iter() {
            node.bind(channel)?;
        }
        info!(
            namespace = %config.namespace,
            channels = node.registry.len(),
            dispatch = ?node.dispatch,
            "bridge node constructed"
        );
        Ok(node)
    }

    fn bind(&self, channel: &Arc<ChannelDescriptor>) -> Result<(), BridgeError> {
        let name = channel.name();
        match channel.role() {
            ChannelRole::AnnounceOnce => {
                self.transport.advertise(name, channel.payload(), true)?;
                if let Some(value) = channel.produce(self.engine.as_ref())? {
                    self.transport.publish(name, value)?;
                }
            }
            ChannelRole::PublishLive => {
                self.transport.advertise(name, channel.payload(), false)?;
            }
            ChannelRole::Subscribe => {
                let callback = self.subscribe_callback(Arc::clone(channel));
                self.transport.subscribe(name, channel.payload(), callback)?;
            }
            ChannelRole::Service => {
                let Some(response) = channel.response() else {
                    return Err(BridgeError::MissingPayloadShape(name.to_string()));
                };
                let callback = service_callback(Arc::clone(channel), Arc::clone(&self.engine));
                self.transport.serve(name, channel.payload(), response, callback)?;
            }
            ChannelRole::Reconfigure => {
                let callback = reconfigure_callback(Arc::clone(channel), Arc::clone(&self.engine));
                self.transport
                    .serve_reconfigure(name, channel.payload(), callback)?;
            }
        }
        debug!(channel = name, role = %channel.role(), "channel bound");
        Ok(())
    }

    fn subscribe_callback(&self, channel: Arc<ChannelDescriptor>) -> SubscribeCallback {
        match self.dispatch {
            DispatchMode::Direct => {
                let engine = Arc::clone(&self.engine);
                Arc::new(move |payload: Value| {
                    if channel.is_paused() {
                        trace!(channel = channel.name(), "paused; inbound message discarded");
                        return;
                    }
                    channel.deliver(engine.as_ref(), payload);
                })
            }
            DispatchMode::Queued => {
                let sender: QueueSender = self.queue.sender();
                Arc::new(move |payload: Value| {
                    if channel.is_paused() {
                        trace!(channel = channel.name(), "paused; inbound message discarded");
                        return;
                    }
                    sender.push(InboundCommand::new(Arc::clone(&channel), payload));
                })
            }
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Unpause every channel.  Idempotent.
    pub fn initialize(&self) -> bool {
        if self.registry.is_empty() {
            error!("cannot initialize an empty registry");
            return false;
        }
        for channel in self.registry.iter() {
            channel.set_paused(false);
        }
        info!(channels = self.registry.len(), "bridge node initialized");
        true
    }

    /// Next queued inbound command, or `None` without waiting.
    pub fn poll(&mut self) -> Option<InboundCommand> {
        self.queue.try_pop()
    }

    /// Publish the current state of every unpaused live channel, in
    /// registry order.
    ///
    /// A transport fault aborts the rest of this round and returns `false`;
    /// the next call starts over.  A channel whose state cannot be encoded
    /// is skipped.
    pub fn push(&self) -> bool {
        for channel in self.registry.with_role(ChannelRole::PublishLive) {
            if channel.is_paused() {
                continue;
            }
            let value = match channel.produce(self.engine.as_ref()) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(e) => {
                    warn!(channel = channel.name(), error = %e, "skipping live channel");
                    continue;
                }
            };
            if let Err(e) = self.transport.publish(channel.name(), value) {
                error!(channel = channel.name(), error = %e, "publish failed; aborting push");
                return false;
            }
        }
        true
    }

    /// Pause every channel.  Bus bindings stay in place.  Idempotent.
    pub fn drop(&self) -> bool {
        for channel in self.registry.iter() {
            channel.set_paused(true);
        }
        info!("bridge node dropped");
        true
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn engine(&self) -> &Arc<dyn AnimationEngine> {
        &self.engine
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn dispatch(&self) -> DispatchMode {
        self.dispatch
    }

    /// Commands waiting for `poll()`.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl std::fmt::Debug for BridgeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeNode")
            .field("channels", &self.registry.len())
            .field("dispatch", &self.dispatch)
            .field("pending", &self.queue.len())
            .finish()
    }
}

fn handler_error(channel: &ChannelDescriptor, e: BridgeError) -> TransportError {
    warn!(channel = channel.name(), error = %e, "handler failed; returning error response");
    TransportError::Handler {
        channel: channel.name().to_string(),
        details: e.to_string(),
    }
}

fn service_callback(channel: Arc<ChannelDescriptor>, engine: Arc<dyn AnimationEngine>) -> ServiceCallback {
    Arc::new(move |request: Value| {
        channel
            .respond(engine.as_ref(), request)
            .map_err(|e| handler_error(&channel, e))
    })
}

fn reconfigure_callback(
    channel: Arc<ChannelDescriptor>,
    engine: Arc<dyn AnimationEngine>,
) -> ReconfigureCallback {
    Arc::new(move |settings: Value, level: u32| {
        channel
            .configure(engine.as_ref(), settings, level)
            .map_err(|e| handler_error(&channel, e))
    })
}
