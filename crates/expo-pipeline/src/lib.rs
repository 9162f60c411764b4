//! Presence-driven scene pipeline.
//!
//! Depth sensors are polled into per-zone presence flags, which drive the
//! hysteresis counters of the current scene run. Counter vectors are rendered
//! into frames for the selected scene, and scenes advance along paths drawn
//! from the scenery graph.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod interpolator;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod renderer;
pub mod simulation;
pub mod telemetry;

pub use collaborators::{PresenceSensor, SceneRenderer, Telemetry};
pub use config::{DepthConfig, PipelineConfig, RuntimeConfig, SequenceConfig, SequencePolicy, TimingConfig};
pub use error::{PipelineError, PipelineResult};
pub use interpolator::{ease_in_out, FrameInterpolator, PlaybackStats};
pub use logging::RunLogger;
pub use pipeline::{Collaborators, Pipeline, RenderCommand, ShutdownHandle, SwitchSignal};
pub use renderer::PreviewRenderer;
pub use simulation::{SimulatedSensor, SimulationSettings};
pub use telemetry::{RecordingTelemetry, TelemetryLog, TracingTelemetry};
