//! `roscom-rig` – the animation engine contract.
//!
//! The bridge never talks to a concrete renderer; it drives whatever sits
//! behind the [`AnimationEngine`] trait.
//!
//! # Modules
//!
//! - [`engine`] – [`AnimationEngine`], the capability set the bridge
//!   consumes, plus the plain value records it exchanges.
//! - [`sim`] – [`SimRig`][sim::SimRig], an in-process engine that keeps
//!   plausible state and records every setter call, for headless tests and
//!   demo runs.

pub mod engine;
pub mod sim;

pub use engine::{AnimationEngine, EyeGaze, EyesData, GestureValues, Orientation, SomaValues};
pub use sim::{RigCall, SimRig};
