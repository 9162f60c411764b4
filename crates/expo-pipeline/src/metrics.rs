//! Prometheus metrics for the pipeline.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{PipelineError, PipelineResult};

/// Install the Prometheus recorder with an HTTP listener on `addr`.
///
/// Without an installed recorder every `record_*` call is a no-op.
pub fn init_metrics(addr: SocketAddr) -> PipelineResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| PipelineError::config(format!("failed to install metrics exporter: {}", e)))
}

/// Metric names as constants for consistency.
pub mod names {
    // Sampling
    pub const SAMPLES_PUBLISHED_TOTAL: &str = "expo_samples_published_total";
    pub const ZONES_OCCUPIED: &str = "expo_zones_occupied";
    pub const SENSOR_FALLBACK_SAMPLES_TOTAL: &str = "expo_sensor_fallback_samples_total";

    // Scene runs
    pub const SCENE_RUNS_STARTED_TOTAL: &str = "expo_scene_runs_started_total";
    pub const SCENE_RUNS_COMPLETED_TOTAL: &str = "expo_scene_runs_completed_total";
    pub const SCENE_RUN_EPOCH: &str = "expo_scene_run_epoch";
    pub const COUNTER_EMISSIONS_TOTAL: &str = "expo_counter_emissions_total";

    // Rendering
    pub const RENDER_REQUESTS_TOTAL: &str = "expo_render_requests_total";
    pub const FRAMES_RENDERED_TOTAL: &str = "expo_frames_rendered_total";
    pub const RENDER_DURATION_SECONDS: &str = "expo_render_duration_seconds";
    pub const FRAMES_PRESENTED_TOTAL: &str = "expo_frames_presented_total";
    pub const ASSETS_LOADED: &str = "expo_assets_loaded";
}

/// Record a published presence sample.
pub fn record_sample_published(occupied_zones: usize) {
    counter!(names::SAMPLES_PUBLISHED_TOTAL).increment(1);
    gauge!(names::ZONES_OCCUPIED).set(occupied_zones as f64);
}

/// Record a failed sensor read answered with an all-zero grid.
pub fn record_sensor_fallback(sensor: &str) {
    let labels = [("sensor", sensor.to_string())];
    counter!(names::SENSOR_FALLBACK_SAMPLES_TOTAL, &labels).increment(1);
}

/// Record a scene run start.
pub fn record_run_started(policy: &str) {
    let labels = [("policy", policy.to_string())];
    counter!(names::SCENE_RUNS_STARTED_TOTAL, &labels).increment(1);
}

/// Record a scene run completion.
pub fn record_run_completed(reason: &str) {
    let labels = [("reason", reason.to_string())];
    counter!(names::SCENE_RUNS_COMPLETED_TOTAL, &labels).increment(1);
}

/// Track the current epoch of the active run.
pub fn set_epoch(epoch: u64) {
    gauge!(names::SCENE_RUN_EPOCH).set(epoch as f64);
}

/// Record a distinct counter vector emission.
pub fn record_counter_emission(forwarded: bool) {
    let labels = [("forwarded", forwarded.to_string())];
    counter!(names::COUNTER_EMISSIONS_TOTAL, &labels).increment(1);
}

/// Record a render request handed to render-prep.
pub fn record_render_request() {
    counter!(names::RENDER_REQUESTS_TOTAL).increment(1);
}

/// Record a rendered frame and how long it took.
pub fn record_frame_rendered(duration_secs: f64) {
    counter!(names::FRAMES_RENDERED_TOTAL).increment(1);
    histogram!(names::RENDER_DURATION_SECONDS).record(duration_secs);
}

/// Record a frame handed to the presentation collaborator.
pub fn record_frame_presented() {
    counter!(names::FRAMES_PRESENTED_TOTAL).increment(1);
}

/// Record the number of scenes with loaded assets.
pub fn set_assets_loaded(count: usize) {
    gauge!(names::ASSETS_LOADED).set(count as f64);
}
