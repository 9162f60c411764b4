//! Scenery path resolution.
//!
//! This crate provides:
//! - Scenery document loading and validation (nodes, tags, weights, transitions)
//! - Weighted tag sequence sampling and window combination
//! - Avoid-then-fallback BFS over the transition graph
//! - Random-walk and static-pool path policies behind a pull-based cursor

pub mod cursor;
pub mod document;
pub mod error;
pub mod generator;
pub mod graph;
pub mod static_paths;
pub mod tags;

pub use cursor::{PathSource, SequenceCursor};
pub use document::{GraphDocument, SceneryDocument};
pub use error::{SceneryError, SceneryResult};
pub use generator::{has_repeats_in_window, loop_violations, GeneratedPath, GeneratorSettings, RandomPathGenerator};
pub use graph::SceneryGraph;
pub use static_paths::StaticPathPool;
pub use tags::{collapse_repeats, TagCatalog, TagGroup, TagPlan};
