//! Scenery error types.

use expo_models::SceneId;
use thiserror::Error;

pub type SceneryResult<T> = Result<T, SceneryError>;

#[derive(Debug, Error)]
pub enum SceneryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid scenery document: {0}")]
    InvalidDocument(String),

    #[error("Invalid generator settings: {0}")]
    InvalidSettings(String),

    #[error("Unknown scenery node '{node}' referenced by {context}")]
    UnknownNode { node: SceneId, context: String },

    #[error("Transitions graph does not allow closed walks: {path} -> (no path) -> {start}")]
    NoClosedWalk { path: String, start: SceneId },

    #[error("Scene path is empty")]
    EmptyPath,

    #[error("Static path pool is empty")]
    EmptyPool,
}

impl SceneryError {
    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }

    pub fn invalid_settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }

    pub fn unknown_node(node: &SceneId, context: impl Into<String>) -> Self {
        Self::UnknownNode {
            node: node.clone(),
            context: context.into(),
        }
    }

    /// Malformed static data: abort startup rather than retry.
    ///
    /// `EmptyPath` is an internal invariant violation instead.
    pub fn is_configuration_fault(&self) -> bool {
        !matches!(self, SceneryError::EmptyPath)
    }
}
