//! In-process [`Transport`] for tests and headless runs.
//!
//! [`LocalBus`] delivers synchronously: [`LocalBus::inject`],
//! [`LocalBus::call`] and [`LocalBus::reconfigure`] run the bound callback
//! on the calling thread, which plays the role of the bus thread.  Every
//! successful publish is recorded in a bounded history, kept as the latched value when the
//! channel was advertised with `latch = true`, and fanned out to
//! [`tokio::sync::broadcast`] taps.
//!
//! [`LocalBus::fail_channel`] makes publishes on one channel fail until
//! [`LocalBus::heal_channel`] is called, to exercise transport-fault paths.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use roscom_types::TransportError;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::channel::PayloadShape;
use crate::transport::{ReconfigureCallback, ServiceCallback, SubscribeCallback, Transport};

/// Default tap capacity (messages buffered before slow tap readers lag).
const DEFAULT_TAP_CAPACITY: usize = 256;

/// Default number of published messages kept for inspection.
const DEFAULT_HISTORY: usize = 1024;

/// One message sent on the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub channel: String,
    pub payload: Value,
}

struct Advertised {
    latch: bool,
    type_name: &'static str,
}

/// Synchronous in-process message bus.
pub struct LocalBus {
    advertised: Mutex<HashMap<String, Advertised>>,
    subscribers: Mutex<HashMap<String, Vec<SubscribeCallback>>>,
    services: Mutex<HashMap<String, ServiceCallback>>,
    reconfigures: Mutex<HashMap<String, ReconfigureCallback>>,
    published: Mutex<VecDeque<BusMessage>>,
    history: usize,
    latched: Mutex<HashMap<String, Value>>,
    failing: Mutex<HashSet<String>>,
    closed: AtomicBool,
    tap: broadcast::Sender<BusMessage>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_TAP_CAPACITY)
    }
}

impl LocalBus {
    /// Create a bus whose taps buffer up to `tap_capacity` messages.
    pub fn new(tap_capacity: usize) -> Self {
        let (tap, _) = broadcast::channel(tap_capacity);
        Self {
            advertised: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(HashMap::new()),
            services: Mutex::new(HashMap::new()),
            reconfigures: Mutex::new(HashMap::new()),
            published: Mutex::new(VecDeque::new()),
            history: DEFAULT_HISTORY,
            latched: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
            tap,
        }
    }

    /// Keep at most `history` published messages; older ones are evicted.
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history;
        self
    }

    // -----------------------------------------------------------------------
    // Delivery into bound callbacks
    // -----------------------------------------------------------------------

    /// Deliver `payload` to every subscriber of `channel`.
    ///
    /// Returns the number of callbacks invoked.
    pub fn inject(&self, channel: &str, payload: Value) -> usize {
        // Clone the callbacks out so none runs under the lock.
        let callbacks = self
            .subscribers
            .lock()
            .get(channel)
            .cloned()
            .unwrap_or_default();
        for callback in &callbacks {
            callback(payload.clone());
        }
        trace!(channel, delivered = callbacks.len(), "local bus inject");
        callbacks.len()
    }

    /// Invoke the service bound on `channel`.
    pub fn call(&self, channel: &str, request: Value) -> Result<Value, TransportError> {
        let service = self
            .services
            .lock()
            .get(channel)
            .cloned()
            .ok_or_else(|| TransportError::UnknownChannel(channel.to_string()))?;
        service(request)
    }

    /// Push a settings snapshot to the reconfigure endpoint on `channel`.
    pub fn reconfigure(&self, channel: &str, settings: Value, level: u32) -> Result<Value, TransportError> {
        let handler = self
            .reconfigures
            .lock()
            .get(channel)
            .cloned()
            .ok_or_else(|| TransportError::UnknownChannel(channel.to_string()))?;
        handler(settings, level)
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Retained published messages, oldest first.
    pub fn published(&self) -> Vec<BusMessage> {
        self.published.lock().iter().cloned().collect()
    }

    /// Messages published on `channel`, oldest first.
    pub fn published_on(&self, channel: &str) -> Vec<Value> {
        self.published
            .lock()
            .iter()
            .filter(|m| m.channel == channel)
            .map(|m| m.payload.clone())
            .collect()
    }

    pub fn clear_published(&self) {
        self.published.lock().clear();
    }

    /// Last value retained on a latched channel.
    pub fn latched(&self, channel: &str) -> Option<Value> {
        self.latched.lock().get(channel).cloned()
    }

    /// Message type advertised on `channel`.
    pub fn advertised_type(&self, channel: &str) -> Option<&'static str> {
        self.advertised.lock().get(channel).map(|a| a.type_name)
    }

    pub fn has_subscriber(&self, channel: &str) -> bool {
        self.subscribers.lock().contains_key(channel)
    }

    pub fn has_service(&self, channel: &str) -> bool {
        self.services.lock().contains_key(channel) || self.reconfigures.lock().contains_key(channel)
    }

    /// Receive a copy of every subsequent publish.
    pub fn tap(&self) -> broadcast::Receiver<BusMessage> {
        self.tap.subscribe()
    }

    // -----------------------------------------------------------------------
    // Fault injection
    // -----------------------------------------------------------------------

    /// Make every publish on `channel` fail.
    pub fn fail_channel(&self, channel: &str) {
        self.failing.lock().insert(channel.to_string());
    }

    pub fn heal_channel(&self, channel: &str) {
        self.failing.lock().remove(channel);
    }

    /// Refuse every further publish and binding.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Transport for LocalBus {
    fn advertise(&self, channel: &str, shape: &PayloadShape, latch: bool) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut advertised = self.advertised.lock();
        if advertised.contains_key(channel) {
            return Err(TransportError::AlreadyBound(channel.to_string()));
        }
        advertised.insert(
            channel.to_string(),
            Advertised {
                latch,
                type_name: shape.type_name,
            },
        );
        debug!(channel, latch, "advertised");
        Ok(())
    }

    fn publish(&self, channel: &str, payload: Value) -> Result<(), TransportError> {
        self.ensure_open()?;
        let latch = match self.advertised.lock().get(channel) {
            Some(a) => a.latch,
            None => return Err(TransportError::UnknownChannel(channel.to_string())),
        };
        if self.failing.lock().contains(channel) {
            return Err(TransportError::Publish {
                channel: channel.to_string(),
                details: "injected fault".to_string(),
            });
        }
        if latch {
            self.latched
                .lock()
                .insert(channel.to_string(), payload.clone());
        }
        let message = BusMessage {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            channel: channel.to_string(),
            payload,
        };
        {
            let mut published = self.published.lock();
            if self.history == 0 {
                published.clear();
            } else {
                while published.len() >= self.history {
                    published.pop_front();
                }
                published.push_back(message.clone());
            }
        }
        // No tap readers is a normal condition.
        let _ = self.tap.send(message);
        Ok(())
    }

    fn subscribe(
        &self,
        channel: &str,
        _shape: &PayloadShape,
        callback: SubscribeCallback,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.subscribers
            .lock()
            .entry(channel.to_string())
            .or_default()
            .push(callback);
        debug!(channel, "subscribed");
        Ok(())
    }

    fn serve(
        &self,
        channel: &str,
        _request: &PayloadShape,
        _response: &PayloadShape,
        callback: ServiceCallback,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut services = self.services.lock();
        if services.contains_key(channel) {
            return Err(TransportError::AlreadyBound(channel.to_string()));
        }
        services.insert(channel.to_string(), callback);
        debug!(channel, "service bound");
        Ok(())
    }

    fn serve_reconfigure(
        &self,
        channel: &str,
        _shape: &PayloadShape,
        callback: ReconfigureCallback,
    ) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut reconfigures = self.reconfigures.lock();
        if reconfigures.contains_key(channel) {
            return Err(TransportError::AlreadyBound(channel.to_string()));
        }
        reconfigures.insert(channel.to_string(), callback);
        debug!(channel, "reconfigure bound");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roscom_types::msg::{Float32, UInt8};
    use serde_json::json;
    use std::sync::Arc;

    fn shape() -> PayloadShape {
        PayloadShape::of::<UInt8>()
    }

    #[test]
    fn publish_requires_advertise() {
        let bus = LocalBus::default();
        let result = bus.publish("/ns/mode", json!({ "data": 1 }));
        assert_eq!(result, Err(TransportError::UnknownChannel("/ns/mode".to_string())));
    }

    #[test]
    fn latched_channel_keeps_last_value() -> Result<(), Box<dyn std::error::Error>> {
        let bus = LocalBus::default();
        bus.advertise("/ns/version", &shape(), true)?;
        bus.advertise("/ns/mode", &shape(), false)?;
        bus.publish("/ns/version", json!({ "data": 1 }))?;
        bus.publish("/ns/version", json!({ "data": 2 }))?;
        bus.publish("/ns/mode", json!({ "data": 3 }))?;

        assert_eq!(bus.latched("/ns/version"), Some(json!({ "data": 2 })));
        assert_eq!(bus.latched("/ns/mode"), None);
        assert_eq!(bus.published().len(), 3);
        assert_eq!(bus.published_on("/ns/mode"), vec![json!({ "data": 3 })]);
        Ok(())
    }

    #[test]
    fn history_keeps_only_the_newest_messages() -> Result<(), Box<dyn std::error::Error>> {
        let bus = LocalBus::default().with_history(4);
        bus.advertise("/ns/mode", &shape(), false)?;
        for n in 0..10 {
            bus.publish("/ns/mode", json!({ "data": n }))?;
        }
        let kept: Vec<Value> = bus.published().into_iter().map(|m| m.payload).collect();
        assert_eq!(
            kept,
            vec![
                json!({ "data": 6 }),
                json!({ "data": 7 }),
                json!({ "data": 8 }),
                json!({ "data": 9 })
            ]
        );
        Ok(())
    }

    #[test]
    fn zero_history_still_feeds_taps() -> Result<(), Box<dyn std::error::Error>> {
        let bus = LocalBus::default().with_history(0);
        let mut tap = bus.tap();
        bus.advertise("/ns/mode", &shape(), true)?;
        bus.publish("/ns/mode", json!({ "data": 1 }))?;
        assert!(bus.published().is_empty());
        assert_eq!(bus.latched("/ns/mode"), Some(json!({ "data": 1 })));
        assert_eq!(tap.try_recv()?.payload, json!({ "data": 1 }));
        Ok(())
    }

    #[test]
    fn advertising_twice_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let bus = LocalBus::default();
        bus.advertise("/ns/mode", &shape(), false)?;
        assert!(matches!(
            bus.advertise("/ns/mode", &shape(), false),
            Err(TransportError::AlreadyBound(_))
        ));
        Ok(())
    }

    #[test]
    fn inject_reaches_every_subscriber_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let bus = LocalBus::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            bus.subscribe(
                "/ns/set",
                &PayloadShape::of::<Float32>(),
                Arc::new(move |v: Value| seen.lock().push((tag, v))),
            )?;
        }
        assert_eq!(bus.inject("/ns/set", json!(1)), 2);
        assert_eq!(bus.inject("/ns/unbound", json!(1)), 0);
        assert_eq!(*seen.lock(), vec![("a", json!(1)), ("b", json!(1))]);
        Ok(())
    }

    #[test]
    fn failing_channel_rejects_publish_until_healed() -> Result<(), Box<dyn std::error::Error>> {
        let bus = LocalBus::default();
        bus.advertise("/ns/mode", &shape(), false)?;
        bus.fail_channel("/ns/mode");
        assert!(matches!(
            bus.publish("/ns/mode", json!({ "data": 1 })),
            Err(TransportError::Publish { .. })
        ));
        bus.heal_channel("/ns/mode");
        bus.publish("/ns/mode", json!({ "data": 1 }))?;
        assert_eq!(bus.published().len(), 1);
        Ok(())
    }

    #[test]
    fn call_on_unbound_service_fails() {
        let bus = LocalBus::default();
        assert_eq!(
            bus.call("/ns/get_param", json!({})),
            Err(TransportError::UnknownChannel("/ns/get_param".to_string()))
        );
    }

    #[test]
    fn closed_bus_refuses_publish() -> Result<(), Box<dyn std::error::Error>> {
        let bus = LocalBus::default();
        bus.advertise("/ns/mode", &shape(), false)?;
        bus.close();
        assert_eq!(bus.publish("/ns/mode", json!({})), Err(TransportError::Closed));
        Ok(())
    }

    #[tokio::test]
    async fn tap_sees_published_messages() -> Result<(), Box<dyn std::error::Error>> {
        let bus = LocalBus::default();
        let mut tap = bus.tap();
        bus.advertise("/ns/mode", &shape(), false)?;
        bus.publish("/ns/mode", json!({ "data": 7 }))?;

        let message = tap.recv().await?;
        assert_eq!(message.channel, "/ns/mode");
        assert_eq!(message.payload, json!({ "data": 7 }));
        Ok(())
    }
}
