//! `roscom-runtime` – process-level plumbing around the bridge node.
//!
//! # Modules
//!
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: drains
//!   the inbound queue and publishes live state at a fixed rate, dropping
//!   the node on shutdown.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with an optional OTLP span exporter
//!   (`OTEL_EXPORTER_OTLP_ENDPOINT`).

pub mod control_loop;
pub mod telemetry;

pub use control_loop::{ControlLoop, LoopStats, TickReport};
pub use telemetry::init_tracing;
