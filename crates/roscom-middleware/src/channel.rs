//! Channel declarations and descriptors.
//!
//! A [`ChannelDecl`] is the static declaration of one bus endpoint: its
//! (possibly private, `~`-prefixed) name, its [`Handler`] and the shape of
//! the payload it exchanges.  The typed constructors
//! ([`ChannelDecl::publish_once`], [`ChannelDecl::subscribe`], …) erase the
//! message type behind JSON conversion so every channel can live in one
//! table.
//!
//! [`ChannelRegistry::build`][crate::registry::ChannelRegistry::build]
//! resolves declarations into [`ChannelDescriptor`]s, which add the
//! runtime pause flag.  A descriptor's role and handler never change after
//! construction; only the pause flag does.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use roscom_rig::AnimationEngine;
use roscom_types::{BridgeError, RigError};
use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, warn};

// ────────────────────────────────────────────────────────────────────────────
// Roles and payload shapes
// ────────────────────────────────────────────────────────────────────────────

/// The fixed set of roles a channel can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    /// Publish a single latched value when the channel is bound.
    AnnounceOnce,
    /// Publish the current state on every `push()` tick unless paused.
    PublishLive,
    /// Receive inbound payloads and apply them to the engine unless paused.
    Subscribe,
    /// Synchronous request → response.  Never paused.
    Service,
    /// Synchronous settings push with a change level.  Never paused.
    Reconfigure,
}

impl ChannelRole {
    /// `true` for roles whose traffic is suppressed while paused.
    pub fn is_gated(self) -> bool {
        matches!(self, Self::PublishLive | Self::Subscribe)
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AnnounceOnce => "announce-once",
            Self::PublishLive => "publish-live",
            Self::Subscribe => "subscribe",
            Self::Service => "service",
            Self::Reconfigure => "reconfigure",
        };
        f.write_str(s)
    }
}

/// The record type exchanged on a channel, with its JSON schema.
#[derive(Debug, Clone)]
pub struct PayloadShape {
    pub type_name: &'static str,
    pub schema: RootSchema,
}

impl PayloadShape {
    pub fn of<T: JsonSchema>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            schema: schemars::schema_for!(T),
        }
    }

    /// Unqualified type name, e.g. `Pau` for `roscom_types::msg::Pau`.
    pub fn short_name(&self) -> &'static str {
        self.type_name.rsplit("::").next().unwrap_or(self.type_name)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// Why a handler invocation did not produce its result.
#[derive(Debug)]
pub enum HandlerFault {
    Decode(serde_json::Error),
    Encode(serde_json::Error),
    Rig(RigError),
}

type Produce = Arc<dyn Fn(&dyn AnimationEngine) -> Result<Value, HandlerFault> + Send + Sync>;
type Consume = Arc<dyn Fn(&dyn AnimationEngine, Value) -> Result<(), HandlerFault> + Send + Sync>;
type Respond = Arc<dyn Fn(&dyn AnimationEngine, Value) -> Result<Value, HandlerFault> + Send + Sync>;
type Configure =
    Arc<dyn Fn(&dyn AnimationEngine, Value, u32) -> Result<Value, HandlerFault> + Send + Sync>;

/// Type-erased conversion bound to a channel.  The variant fixes the role.
#[derive(Clone)]
pub enum Handler {
    AnnounceOnce(Produce),
    PublishLive(Produce),
    Subscribe(Consume),
    Service(Respond),
    Reconfigure(Configure),
}

impl Handler {
    pub fn role(&self) -> ChannelRole {
        match self {
            Self::AnnounceOnce(_) => ChannelRole::AnnounceOnce,
            Self::PublishLive(_) => ChannelRole::PublishLive,
            Self::Subscribe(_) => ChannelRole::Subscribe,
            Self::Service(_) => ChannelRole::Service,
            Self::Reconfigure(_) => ChannelRole::Reconfigure,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler::{}", self.role())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value, HandlerFault> {
    serde_json::to_value(value).map_err(HandlerFault::Encode)
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, HandlerFault> {
    serde_json::from_value(payload).map_err(HandlerFault::Decode)
}

fn produce<T>(f: fn(&dyn AnimationEngine) -> T) -> Produce
where
    T: Serialize + 'static,
{
    Arc::new(move |engine: &dyn AnimationEngine| encode(&f(engine)))
}

// ────────────────────────────────────────────────────────────────────────────
// Declarations
// ────────────────────────────────────────────────────────────────────────────

/// Static declaration of one channel.
#[derive(Debug, Clone)]
pub struct ChannelDecl {
    /// Absolute (`/ns/name`) or private (`~name`) channel name.
    pub name: &'static str,
    pub handler: Handler,
    pub payload: Option<PayloadShape>,
    /// Response shape; services only.
    pub response: Option<PayloadShape>,
}

impl ChannelDecl {
    pub fn publish_once<T>(name: &'static str, f: fn(&dyn AnimationEngine) -> T) -> Self
    where
        T: Serialize + JsonSchema + 'static,
    {
        Self {
            name,
            handler: Handler::AnnounceOnce(produce(f)),
            payload: Some(PayloadShape::of::<T>()),
            response: None,
        }
    }

    pub fn publish_live<T>(name: &'static str, f: fn(&dyn AnimationEngine) -> T) -> Self
    where
        T: Serialize + JsonSchema + 'static,
    {
        Self {
            name,
            handler: Handler::PublishLive(produce(f)),
            payload: Some(PayloadShape::of::<T>()),
            response: None,
        }
    }

    pub fn subscribe<T>(
        name: &'static str,
        f: fn(&dyn AnimationEngine, T) -> Result<(), RigError>,
    ) -> Self
    where
        T: DeserializeOwned + JsonSchema + 'static,
    {
        let consume: Consume = Arc::new(move |engine: &dyn AnimationEngine, payload: Value| {
            f(engine, decode(payload)?).map_err(HandlerFault::Rig)
        });
        Self {
            name,
            handler: Handler::Subscribe(consume),
            payload: Some(PayloadShape::of::<T>()),
            response: None,
        }
    }

    pub fn service<Req, Resp>(
        name: &'static str,
        f: fn(&dyn AnimationEngine, Req) -> Result<Resp, RigError>,
    ) -> Self
    where
        Req: DeserializeOwned + JsonSchema + 'static,
        Resp: Serialize + JsonSchema + 'static,
    {
        let respond: Respond = Arc::new(move |engine: &dyn AnimationEngine, request: Value| {
            let response = f(engine, decode(request)?).map_err(HandlerFault::Rig)?;
            encode(&response)
        });
        Self {
            name,
            handler: Handler::Service(respond),
            payload: Some(PayloadShape::of::<Req>()),
            response: Some(PayloadShape::of::<Resp>()),
        }
    }

    pub fn configure<Cfg>(name: &'static str, f: fn(&dyn AnimationEngine, Cfg, u32) -> Cfg) -> Self
    where
        Cfg: Serialize + DeserializeOwned + JsonSchema + 'static,
    {
        let configure: Configure =
            Arc::new(move |engine: &dyn AnimationEngine, settings: Value, level: u32| {
                encode(&f(engine, decode(settings)?, level))
            });
        Self {
            name,
            handler: Handler::Reconfigure(configure),
            payload: Some(PayloadShape::of::<Cfg>()),
            response: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Descriptors
// ────────────────────────────────────────────────────────────────────────────

/// A resolved channel with its runtime pause flag.
///
/// The pause flag is read on bus callback threads and written from the
/// owning thread; relaxed atomics suffice since a one-tick stale read is
/// acceptable.
#[derive(Debug)]
pub struct ChannelDescriptor {
    name: String,
    handler: Handler,
    payload: PayloadShape,
    response: Option<PayloadShape>,
    paused: AtomicBool,
}

impl ChannelDescriptor {
    pub(crate) fn new(
        name: String,
        handler: Handler,
        payload: PayloadShape,
        response: Option<PayloadShape>,
    ) -> Self {
        Self {
            name,
            handler,
            payload,
            response,
            paused: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> ChannelRole {
        self.handler.role()
    }

    pub fn payload(&self) -> &PayloadShape {
        &self.payload
    }

    pub fn response(&self) -> Option<&PayloadShape> {
        self.response.as_ref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    /// `true` when traffic on this channel is currently suppressed.
    pub fn is_blocked(&self) -> bool {
        self.role().is_gated() && self.is_paused()
    }

    fn fault(&self, fault: HandlerFault) -> BridgeError {
        match fault {
            HandlerFault::Decode(e) => BridgeError::Decode {
                channel: self.name.clone(),
                details: e.to_string(),
            },
            HandlerFault::Encode(e) => BridgeError::Encode {
                channel: self.name.clone(),
                details: e.to_string(),
            },
            HandlerFault::Rig(e) => BridgeError::Rig(e),
        }
    }

    /// Produce the current payload of an announce or publish channel.
    ///
    /// Returns `Ok(None)` for roles that do not publish.
    pub fn produce(&self, engine: &dyn AnimationEngine) -> Result<Option<Value>, BridgeError> {
        match &self.handler {
            Handler::AnnounceOnce(f) | Handler::PublishLive(f) => {
                f(engine).map(Some).map_err(|e| self.fault(e))
            }
            _ => Ok(None),
        }
    }

    /// Apply an inbound payload to the engine.
    pub fn consume(&self, engine: &dyn AnimationEngine, payload: Value) -> Result<(), BridgeError> {
        match &self.handler {
            Handler::Subscribe(f) => f(engine, payload).map_err(|e| self.fault(e)),
            _ => Ok(()),
        }
    }

    /// Apply an inbound payload, logging instead of returning failures.
    ///
    /// Unknown catalog items are logged as errors, undecodable payloads as
    /// warnings.  Either way the single message is dropped.  Returns `true`
    /// when the engine accepted the command.
    pub fn deliver(&self, engine: &dyn AnimationEngine, payload: Value) -> bool {
        match self.consume(engine, payload) {
            Ok(()) => true,
            Err(BridgeError::Rig(e)) => {
                error!(channel = %self.name, error = %e, "engine rejected command");
                false
            }
            Err(e) => {
                warn!(channel = %self.name, error = %e, "dropping inbound message");
                false
            }
        }
    }

    /// Answer a service request.
    pub fn respond(&self, engine: &dyn AnimationEngine, request: Value) -> Result<Value, BridgeError> {
        match &self.handler {
            Handler::Service(f) => f(engine, request).map_err(|e| self.fault(e)),
            _ => Ok(Value::Null),
        }
    }

    /// Apply a settings snapshot and return the normalised echo.
    pub fn configure(
        &self,
        engine: &dyn AnimationEngine,
        settings: Value,
        level: u32,
    ) -> Result<Value, BridgeError> {
        match &self.handler {
            Handler::Reconfigure(f) => f(engine, settings, level).map_err(|e| self.fault(e)),
            _ => Ok(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roscom_rig::{RigCall, SimRig};
    use roscom_types::msg::{ApiVersion, GetModeRequest, GetModeResponse, SetGesture};
    use serde_json::json;

    fn api_version(rig: &dyn AnimationEngine) -> ApiVersion {
        ApiVersion {
            version: rig.api_version(),
        }
    }

    fn set_gesture(rig: &dyn AnimationEngine, msg: SetGesture) -> Result<(), RigError> {
        rig.set_gesture(&msg.name, msg.repeat, msg.speed, msg.magnitude)
    }

    fn descriptor(decl: ChannelDecl) -> ChannelDescriptor {
        let payload = decl.payload.expect("typed constructors declare a shape");
        ChannelDescriptor::new(decl.name.to_string(), decl.handler, payload, decl.response)
    }

    #[test]
    fn typed_constructors_fix_the_role() {
        assert_eq!(
            ChannelDecl::publish_once("~v", api_version).handler.role(),
            ChannelRole::AnnounceOnce
        );
        assert_eq!(
            ChannelDecl::publish_live("~v", api_version).handler.role(),
            ChannelRole::PublishLive
        );
        assert_eq!(
            ChannelDecl::subscribe("~g", set_gesture).handler.role(),
            ChannelRole::Subscribe
        );
    }

    #[test]
    fn payload_shape_names_the_message_type() {
        let decl = ChannelDecl::subscribe("~g", set_gesture);
        let shape = decl.payload.unwrap();
        assert_eq!(shape.short_name(), "SetGesture");
        assert!(shape.type_name.ends_with("msg::SetGesture"));
    }

    #[test]
    fn service_declares_request_and_response_shapes() {
        fn get_mode(rig: &dyn AnimationEngine, _: GetModeRequest) -> Result<GetModeResponse, RigError> {
            Ok(GetModeResponse {
                mode: rig.arms_mode(),
            })
        }
        let d = descriptor(ChannelDecl::service("~get_arms_mode", get_mode));
        assert_eq!(d.payload().short_name(), "GetModeRequest");
        assert_eq!(d.response().map(PayloadShape::short_name), Some("GetModeResponse"));
        let rig = SimRig::new();
        assert_eq!(d.respond(&rig, json!({})).unwrap(), json!({ "mode": 0 }));
    }

    #[test]
    fn descriptors_start_paused_and_gate_only_live_roles() {
        let live = descriptor(ChannelDecl::publish_live("~v", api_version));
        let once = descriptor(ChannelDecl::publish_once("~v", api_version));
        assert!(live.is_paused() && live.is_blocked());
        assert!(once.is_paused() && !once.is_blocked());
        live.set_paused(false);
        assert!(!live.is_blocked());
    }

    #[test]
    fn produce_encodes_the_engine_state() {
        let d = descriptor(ChannelDecl::publish_live("~v", api_version));
        let rig = SimRig::new();
        let value = d.produce(&rig).unwrap().unwrap();
        assert_eq!(value, json!({ "version": rig.api_version() }));
    }

    #[test]
    fn deliver_swallows_unknown_catalog_items() {
        let d = descriptor(ChannelDecl::subscribe("~g", set_gesture));
        let rig = SimRig::new();
        let msg = json!({ "name": "moonwalk", "repeat": 1, "speed": 1.0, "magnitude": 1.0 });
        assert!(!d.deliver(&rig, msg));
        assert!(rig.calls().is_empty());
    }

    #[test]
    fn consume_reports_decode_faults_with_channel_name() {
        let d = descriptor(ChannelDecl::subscribe("/ns/set_gesture", set_gesture));
        let rig = SimRig::new();
        let err = d.consume(&rig, json!({ "name": 7 })).unwrap_err();
        assert!(matches!(err, BridgeError::Decode { ref channel, .. } if channel == "/ns/set_gesture"));
    }

    #[test]
    fn deliver_applies_known_commands() {
        let d = descriptor(ChannelDecl::subscribe("~g", set_gesture));
        let rig = SimRig::new();
        let msg = json!({ "name": "blink", "repeat": 2, "speed": 1.0, "magnitude": 0.5 });
        assert!(d.deliver(&rig, msg));
        assert_eq!(
            rig.calls(),
            vec![RigCall::SetGesture {
                name: "blink".to_string(),
                repeat: 2
            }]
        );
    }
}
