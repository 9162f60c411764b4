//! Scene identifiers, paths and asset status.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of one scenery node / pre-authored scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SceneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Ordered walk over the scenery graph.
///
/// Generated paths start and end at the graph's start node so playback can
/// cycle indefinitely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ScenePath(Vec<SceneId>);

impl ScenePath {
    pub fn new(nodes: Vec<SceneId>) -> Self {
        Self(nodes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SceneId> {
        self.0.get(index)
    }

    pub fn first(&self) -> Option<&SceneId> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&SceneId> {
        self.0.last()
    }

    pub fn nodes(&self) -> &[SceneId] {
        &self.0
    }

    /// Whether the path starts and ends at `node`.
    pub fn is_closed_at(&self, node: &SceneId) -> bool {
        self.first() == Some(node) && self.last() == Some(node)
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(SceneId::as_str).collect();
        write!(f, "{}", joined.join(" -> "))
    }
}

impl From<Vec<&str>> for ScenePath {
    fn from(nodes: Vec<&str>) -> Self {
        Self(nodes.into_iter().map(SceneId::from).collect())
    }
}

/// Unique identifier for one scene run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Loading status of one scene's assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Loading,
    Ready,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Loading => "loading",
            AssetStatus::Ready => "ready",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Asset loading progress event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AssetEvent {
    pub scene: SceneId,
    pub status: AssetStatus,
}

impl AssetEvent {
    pub fn loading(scene: SceneId) -> Self {
        Self {
            scene,
            status: AssetStatus::Loading,
        }
    }

    pub fn ready(scene: SceneId) -> Self {
        Self {
            scene,
            status: AssetStatus::Ready,
        }
    }
}
