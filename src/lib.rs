//! Vetro is a deterministic motion orchestrator for glass-styled UI
//! surfaces.
//!
//! Four components share one engine: a slow breathing pulse, scroll
//! parallax, pointer tilt, and one-shot progress reveals. The engine never
//! reads a wall clock or walks a real tree; the host feeds it events and
//! virtual time through a [`Stage`], so a whole session can be replayed
//! bit for bit.
//!
//! - Describe the host surface behind a [`Stage`] (or use [`sim::SimStage`])
//! - Build a [`MotionEngine`] from a validated [`MotionConfig`]
//! - Forward host events and drive time with [`MotionEngine::advance_to`]
#![forbid(unsafe_code)]

pub mod breathing;
pub mod config;
pub mod core;
pub mod ease;
pub mod engine;
pub mod error;
pub mod observe;
pub mod parallax;
pub mod pointer;
pub mod progress;
pub mod rate;
pub mod registry;
pub mod sched;
pub mod sim;
pub mod stage;
pub mod style;

pub use breathing::BreathPhase;
pub use config::MotionConfig;
pub use core::{CycleId, ElementId, Point, Rect, Timestamp, Vec2, Viewport};
pub use ease::CubicBezier;
pub use engine::MotionEngine;
pub use error::{VetroError, VetroResult};
pub use observe::{IntersectionEntry, IntersectionWatch, ObserverOptions};
pub use registry::{MotionRegistry, RegistrySnapshot, SlotName};
pub use sched::{FrameRequestId, Scheduler, TimerId};
pub use stage::{Capabilities, Stage, StyleProp};
