//! Shared data models for the scenery installation.
//!
//! This crate provides Serde-serializable types for:
//! - Raw depth grids and per-zone presence vectors
//! - Extended counter vectors (zones + global + group maxima)
//! - Scene identifiers, scene paths and asset loading status
//! - Raster frames exchanged between render-prep and presentation

pub mod counters;
pub mod frame;
pub mod presence;
pub mod scene;

// Re-export common types
pub use counters::{CounterLayoutError, CounterVector, GroupOrder, EXTENDED_SLOTS, GROUP_COUNT};
pub use frame::RasterFrame;
pub use presence::{CameraFrame, PresenceGrid, PresenceSample, PresenceVector};
pub use scene::{AssetEvent, AssetStatus, RunId, SceneId, ScenePath};
