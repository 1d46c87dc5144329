//! The message-bus seam.
//!
//! The bridge never speaks a concrete bus protocol.  It binds its channels
//! against a [`Transport`], which owns connection lifecycle, serialisation
//! and per-channel delivery order.  Inbound callbacks are invoked on the
//! transport's own threads and must run to completion before returning.
//!
//! - [`LocalBus`][crate::local_bus::LocalBus] – in-process transport used by
//!   tests and the demo binary.

use std::sync::Arc;

use roscom_types::TransportError;
use serde_json::Value;

use crate::channel::PayloadShape;

/// Invoked once per inbound message on a subscribed channel.
pub type SubscribeCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Invoked once per service request; the result is the caller's response.
pub type ServiceCallback = Arc<dyn Fn(Value) -> Result<Value, TransportError> + Send + Sync>;

/// Invoked once per settings push with the change level.
pub type ReconfigureCallback =
    Arc<dyn Fn(Value, u32) -> Result<Value, TransportError> + Send + Sync>;

/// Publish/subscribe/service/reconfigure primitives of a message bus.
pub trait Transport: Send + Sync {
    /// Declare an outbound channel.  Latched channels retain their last
    /// value for late subscribers.
    fn advertise(&self, channel: &str, shape: &PayloadShape, latch: bool) -> Result<(), TransportError>;

    /// Send `payload` on a previously advertised channel.
    fn publish(&self, channel: &str, payload: Value) -> Result<(), TransportError>;

    fn subscribe(
        &self,
        channel: &str,
        shape: &PayloadShape,
        callback: SubscribeCallback,
    ) -> Result<(), TransportError>;

    fn serve(
        &self,
        channel: &str,
        request: &PayloadShape,
        response: &PayloadShape,
        callback: ServiceCallback,
    ) -> Result<(), TransportError>;

    fn serve_reconfigure(
        &self,
        channel: &str,
        shape: &PayloadShape,
        callback: ReconfigureCallback,
    ) -> Result<(), TransportError>;
}
