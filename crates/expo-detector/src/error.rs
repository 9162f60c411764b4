//! Detector error types.

use expo_models::CounterLayoutError;
use thiserror::Error;

pub type DetectorResult<T> = Result<T, DetectorError>;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Invalid zone layout: {0}")]
    InvalidLayout(String),

    #[error("Invalid hysteresis thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Presence vector length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Scene run already finished at epoch {0}")]
    RunFinished(u64),

    #[error("Counter layout error: {0}")]
    Layout(#[from] CounterLayoutError),
}

impl DetectorError {
    pub fn invalid_layout(msg: impl Into<String>) -> Self {
        Self::InvalidLayout(msg.into())
    }

    pub fn invalid_thresholds(msg: impl Into<String>) -> Self {
        Self::InvalidThresholds(msg.into())
    }
}
