//! Structured scene-run logging.
//!
//! Gives every scene run consistent lifecycle messages carrying the run id
//! and the selected scene.

use tracing::{error, info, warn, Span};

use expo_models::{RunId, SceneId};

/// Lifecycle logger for one scene run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    scene: String,
}

impl RunLogger {
    pub fn new(run_id: &RunId, scene: &SceneId) -> Self {
        Self {
            run_id: run_id.to_string(),
            scene: scene.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            scene = %self.scene,
            "Scene run started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            scene = %self.scene,
            "Scene run progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            scene = %self.scene,
            "Scene run warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            scene = %self.scene,
            "Scene run error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            scene = %self.scene,
            "Scene run completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    /// Span to instrument the run's future with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "scene_run",
            run_id = %self.run_id,
            scene = %self.scene
        )
    }
}
