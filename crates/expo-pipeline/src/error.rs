//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Detector error: {0}")]
    Detector(#[from] expo_detector::DetectorError),

    #[error("Scenery error: {0}")]
    Scenery(#[from] expo_scenery::SceneryError),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn channel_closed(msg: impl Into<String>) -> Self {
        Self::ChannelClosed(msg.into())
    }

    /// Whether the error must stop the pipeline.
    ///
    /// A closed channel is a consequence of a peer context stopping, so it is
    /// only reported when nothing else explains the stop.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::ChannelClosed(_))
    }
}
