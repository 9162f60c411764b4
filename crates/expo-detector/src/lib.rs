//! Presence detection for the scenery installation.
//!
//! This crate provides:
//! - Zone aggregation from raw per-camera distance grids
//! - The epoch-based hysteresis counter state machine
//! - The sampling debounce applied in front of the counter machine

pub mod debounce;
pub mod error;
pub mod hysteresis;
pub mod zones;

pub use debounce::{SampleDebouncer, PASSTHROUGH_SAMPLES};
pub use error::{DetectorError, DetectorResult};
pub use hysteresis::{transition, CounterMachine, HysteresisConfig, RunEnd, TickOutcome, Transition};
pub use zones::{DistanceWindow, ZoneLayout};
