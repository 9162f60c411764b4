//! Boundaries to the sensor, renderer and telemetry collaborators.
//!
//! Sensor and renderer calls are blocking; the pipeline moves them onto the
//! blocking pool so they never stall the async contexts.

use std::path::Path;

use expo_models::{AssetEvent, CounterVector, PresenceGrid, PresenceSample, RasterFrame, SceneId};

use crate::error::PipelineResult;

/// Depth sensor array.
///
/// `sample` never fails: read faults are handled inside the sensor, which
/// reports an all-zero grid instead.
pub trait PresenceSensor: Send + 'static {
    fn sample(&mut self) -> PresenceGrid;

    /// Release the devices. Called once when sampling stops.
    fn close(&mut self);

    /// Sensor name for logging.
    fn name(&self) -> &'static str;
}

/// Scene asset store and frame synthesis.
pub trait SceneRenderer: Send + 'static {
    /// Load every scene under `prefix`, reporting progress per scene.
    ///
    /// Returns the number of scenes loaded.
    fn load_assets(
        &mut self,
        prefix: &Path,
        on_event: &mut dyn FnMut(AssetEvent),
    ) -> PipelineResult<usize>;

    /// Switch the scene subsequent frames are rendered for.
    fn select_scene(&mut self, scene: &SceneId) -> PipelineResult<()>;

    /// Render the selected scene for a counter vector.
    fn render_frame(&mut self, counters: &CounterVector) -> PipelineResult<RasterFrame>;

    /// Frame shown before anything has been rendered.
    fn empty_frame(&self) -> RasterFrame;
}

/// Observer of pipeline activity (display overlays, logs, tests).
pub trait Telemetry: Send + Sync + 'static {
    fn on_presence_vector(&self, sample: &PresenceSample);

    fn on_counter_vector(&self, counters: &CounterVector);

    fn on_epoch(&self, epoch: u64);

    fn on_scene_selected(&self, scene: &SceneId);

    fn on_asset_status(&self, event: &AssetEvent);

    fn on_rendered_frame(&self, frame: &RasterFrame);
}
