//! Telemetry sinks.

use std::sync::Mutex;

use tracing::{debug, info, trace};

use expo_models::{AssetEvent, CounterVector, PresenceSample, RasterFrame, SceneId};

use crate::collaborators::Telemetry;

/// Logs pipeline activity through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn on_presence_vector(&self, sample: &PresenceSample) {
        trace!(
            occupied = sample.zones.occupied(),
            zones = ?sample.zones.as_slice(),
            captured_at = %sample.captured_at,
            "Presence sample"
        );
    }

    fn on_counter_vector(&self, counters: &CounterVector) {
        debug!(
            counters = ?counters.as_slice(),
            global = counters.global(),
            "Counter vector"
        );
    }

    fn on_epoch(&self, epoch: u64) {
        trace!(epoch, "Epoch");
    }

    fn on_scene_selected(&self, scene: &SceneId) {
        info!(scene = %scene, "Scene selected");
    }

    fn on_asset_status(&self, event: &AssetEvent) {
        debug!(scene = %event.scene, status = %event.status, "Asset status");
    }

    fn on_rendered_frame(&self, frame: &RasterFrame) {
        trace!(width = frame.width, height = frame.height, "Frame presented");
    }
}

/// Everything a [`RecordingTelemetry`] has observed.
#[derive(Debug, Clone, Default)]
pub struct TelemetryLog {
    pub presence_samples: usize,
    pub counters: Vec<CounterVector>,
    pub epochs: Vec<u64>,
    pub scenes: Vec<SceneId>,
    pub assets: Vec<AssetEvent>,
    pub frames: usize,
}

/// In-memory telemetry, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    log: Mutex<TelemetryLog>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> TelemetryLog {
        self.with_log(|log| log.clone())
    }

    fn with_log<R>(&self, f: impl FnOnce(&mut TelemetryLog) -> R) -> R {
        let mut log = self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut log)
    }
}

impl Telemetry for RecordingTelemetry {
    fn on_presence_vector(&self, _sample: &PresenceSample) {
        self.with_log(|log| log.presence_samples += 1);
    }

    fn on_counter_vector(&self, counters: &CounterVector) {
        self.with_log(|log| log.counters.push(counters.clone()));
    }

    fn on_epoch(&self, epoch: u64) {
        self.with_log(|log| log.epochs.push(epoch));
    }

    fn on_scene_selected(&self, scene: &SceneId) {
        self.with_log(|log| log.scenes.push(scene.clone()));
    }

    fn on_asset_status(&self, event: &AssetEvent) {
        self.with_log(|log| log.assets.push(event.clone()));
    }

    fn on_rendered_frame(&self, _frame: &RasterFrame) {
        self.with_log(|log| log.frames += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_telemetry_collects_events() {
        let telemetry = RecordingTelemetry::new();
        telemetry.on_epoch(1);
        telemetry.on_epoch(2);
        telemetry.on_scene_selected(&SceneId::from("4"));
        telemetry.on_asset_status(&AssetEvent::ready(SceneId::from("4")));
        telemetry.on_rendered_frame(&RasterFrame::blank(1, 1));

        let log = telemetry.snapshot();
        assert_eq!(log.epochs, vec![1, 2]);
        assert_eq!(log.scenes, vec![SceneId::from("4")]);
        assert_eq!(log.assets.len(), 1);
        assert_eq!(log.frames, 1);
    }
}
