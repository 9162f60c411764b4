//! Pipeline orchestrator.
//!
//! Four contexts run concurrently and talk only through channels:
//!
//! - **sampling** polls the sensors on a fixed interval and publishes
//!   presence samples on a broadcast channel (late subscribers only see
//!   future samples)
//! - **counter** owns the scene-run lifecycle: on every switch signal it
//!   advances the sequence cursor, tells render-prep about the new scene and
//!   drives a fresh debounced counter machine until the run finishes
//! - **render-prep** loads the scene assets once, then renders frames
//!   strictly one at a time in request order
//! - **presentation** cross-fades rendered frames on its own cadence
//!
//! A `watch` channel carries shutdown. The first failing context stops the
//! whole pipeline.

mod presentation;
mod render_prep;
mod sampling;
mod scene_run;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use expo_detector::ZoneLayout;
use expo_models::{CounterVector, RunId, SceneId};
use expo_scenery::SequenceCursor;

use crate::collaborators::{PresenceSensor, SceneRenderer, Telemetry};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::renderer::PreviewRenderer;
use crate::simulation::{SimulatedSensor, SimulationSettings};
use crate::telemetry::TracingTelemetry;

use presentation::PresentationContext;
use render_prep::RenderPrepContext;
use sampling::SamplingContext;
use scene_run::CounterContext;

/// Presence samples buffered per subscriber before it starts lagging.
const PRESENCE_CHANNEL_CAPACITY: usize = 64;

/// Preview frame size.
const PREVIEW_WIDTH: u32 = 320;
const PREVIEW_HEIGHT: u32 = 180;

/// Request to start the next scene run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchSignal {
    /// Assets are loaded; start the first run.
    Start,
    /// The previous run finished.
    NextScene,
}

/// Work queued for the render-prep context.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    SelectScene { run_id: RunId, scene: SceneId },
    Render { run_id: RunId, epoch: u64, counters: CounterVector },
}

/// External collaborators of the pipeline.
pub struct Collaborators {
    pub sensor: Box<dyn PresenceSensor>,
    pub renderer: Box<dyn SceneRenderer>,
    pub telemetry: Arc<dyn Telemetry>,
}

impl Collaborators {
    /// Simulated sensors, preview renderer and tracing telemetry.
    pub fn simulated(config: &PipelineConfig, scenes: Vec<SceneId>) -> Self {
        Self {
            sensor: Box::new(SimulatedSensor::new(
                SimulationSettings::from_depth(&config.depth),
                config.sequence.seed,
            )),
            renderer: Box::new(PreviewRenderer::new(
                PREVIEW_WIDTH,
                PREVIEW_HEIGHT,
                config.timing.max_counter,
                scenes,
            )),
            telemetry: Arc::new(TracingTelemetry),
        }
    }
}

/// Requests a running pipeline to stop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }
}

/// The scene pipeline, ready to run.
pub struct Pipeline {
    config: PipelineConfig,
    layout: ZoneLayout,
    cursor: SequenceCursor,
    collaborators: Collaborators,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Pipeline {
    /// Validate the configuration and assemble the pipeline.
    pub fn new(
        config: PipelineConfig,
        cursor: SequenceCursor,
        collaborators: Collaborators,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let layout = config.depth.zone_layout()?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            config,
            layout,
            cursor,
            collaborators,
            shutdown: Arc::new(shutdown),
        })
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    /// Run until shutdown is requested (`Ok`) or a context fails (`Err`).
    pub async fn run(self) -> PipelineResult<()> {
        let Pipeline {
            config,
            layout,
            cursor,
            collaborators,
            shutdown,
        } = self;
        let Collaborators {
            sensor,
            renderer,
            telemetry,
        } = collaborators;

        info!(
            zones = layout.zone_count(),
            policy = cursor.policy(),
            sensor = sensor.name(),
            "Starting pipeline"
        );

        let (presence_tx, _) = broadcast::channel(PRESENCE_CHANNEL_CAPACITY);
        let (switch_tx, switch_rx) = mpsc::unbounded_channel();
        let (render_tx, render_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let initial_frame = renderer.empty_frame();

        let mut contexts = JoinSet::new();

        contexts.spawn(
            SamplingContext {
                sensor,
                layout: layout.clone(),
                interval: config.timing.sensor_refresh_interval,
                publisher: presence_tx.clone(),
                telemetry: Arc::clone(&telemetry),
                shutdown: shutdown.subscribe(),
            }
            .run(),
        );

        contexts.spawn(
            RenderPrepContext {
                renderer,
                assets_path: config.runtime.assets_path.clone(),
                commands: render_rx,
                frames: frame_tx,
                switch_tx: switch_tx.clone(),
                telemetry: Arc::clone(&telemetry),
                shutdown: shutdown.subscribe(),
            }
            .run(),
        );

        contexts.spawn(
            CounterContext {
                cursor,
                hysteresis: config.hysteresis(),
                zones: layout.zone_count(),
                sampling_interval: config.timing.counters_sampling_interval,
                presence: presence_tx,
                switch_rx,
                switch_tx,
                render_tx,
                telemetry: Arc::clone(&telemetry),
                shutdown: shutdown.subscribe(),
            }
            .run(),
        );

        contexts.spawn(
            PresentationContext {
                frames: frame_rx,
                initial: initial_frame,
                cadence: config.timing.presentation_interval(),
                crossfade: config.timing.crossfade,
                telemetry,
                shutdown: shutdown.subscribe(),
            }
            .run(),
        );

        let result = supervise(contexts, &shutdown).await;
        match &result {
            Ok(()) => info!("Pipeline stopped"),
            Err(e) => error!(error = %e, "Pipeline failed"),
        }
        result
    }
}

/// Wait for every context; the first one to stop stops the others.
///
/// Closed channels only count as failures when nothing else explains the
/// stop: no fatal error and no requested shutdown.
async fn supervise(
    mut contexts: JoinSet<PipelineResult<&'static str>>,
    shutdown: &watch::Sender<bool>,
) -> PipelineResult<()> {
    let mut requested: Option<bool> = None;
    let mut failure: Option<PipelineError> = None;
    let mut closed: Option<PipelineError> = None;

    while let Some(joined) = contexts.join_next().await {
        let external = *requested.get_or_insert_with(|| *shutdown.borrow());
        shutdown.send_replace(true);

        match joined.map_err(PipelineError::from).and_then(|result| result) {
            Ok(context) => debug!(context, "Context stopped"),
            Err(e) if e.is_fatal() => {
                error!(error = %e, "Context failed, stopping pipeline");
                if failure.is_none() {
                    failure = Some(e);
                }
            }
            Err(e) => {
                debug!(error = %e, "Context stopped on a closed channel");
                if !external && closed.is_none() {
                    closed = Some(e);
                }
            }
        }
    }

    match failure.or(closed) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Resolve once shutdown is requested or its sender is gone.
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Run a blocking call on `owner` off the async workers, handing it back.
pub(crate) async fn offload<T, R, F>(owner: T, f: F) -> PipelineResult<(T, R)>
where
    T: Send + 'static,
    R: Send + 'static,
    F: FnOnce(&mut T) -> R + Send + 'static,
{
    let joined = tokio::task::spawn_blocking(move || {
        let mut owner = owner;
        let output = f(&mut owner);
        (owner, output)
    })
    .await?;
    Ok(joined)
}
