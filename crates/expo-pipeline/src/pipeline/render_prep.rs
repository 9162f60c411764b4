//! Asset loading and frame rendering.
//!
//! Commands are handled one at a time in arrival order, so a render request
//! always sees the scene selected before it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use expo_models::{AssetEvent, RasterFrame};

use crate::collaborators::{SceneRenderer, Telemetry};
use crate::error::{PipelineError, PipelineResult};
use crate::metrics;

use super::{offload, wait_for_shutdown, RenderCommand, SwitchSignal};

pub(crate) struct RenderPrepContext {
    pub renderer: Box<dyn SceneRenderer>,
    pub assets_path: PathBuf,
    pub commands: mpsc::UnboundedReceiver<RenderCommand>,
    pub frames: mpsc::UnboundedSender<RasterFrame>,
    pub switch_tx: mpsc::UnboundedSender<SwitchSignal>,
    pub telemetry: Arc<dyn Telemetry>,
    pub shutdown: watch::Receiver<bool>,
}

impl RenderPrepContext {
    pub(crate) async fn run(self) -> PipelineResult<&'static str> {
        let RenderPrepContext {
            renderer,
            assets_path,
            mut commands,
            frames,
            switch_tx,
            telemetry,
            mut shutdown,
        } = self;

        let events = Arc::clone(&telemetry);
        let prefix = assets_path.clone();
        let (mut renderer, loaded) = offload(renderer, move |r| {
            r.load_assets(&prefix, &mut |event: AssetEvent| events.on_asset_status(&event))
        })
        .await?;
        let loaded = loaded?;
        if loaded == 0 {
            return Err(PipelineError::invariant(format!(
                "no scene assets loaded from {}",
                assets_path.display()
            )));
        }

        metrics::set_assets_loaded(loaded);
        info!(scenes = loaded, path = %assets_path.display(), "Scene assets ready");

        switch_tx
            .send(SwitchSignal::Start)
            .map_err(|_| PipelineError::channel_closed("switch signals"))?;
        drop(switch_tx);

        let mut rendered = 0u64;
        loop {
            let command = tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                command = commands.recv() => command,
            };
            let command = command.ok_or_else(|| PipelineError::channel_closed("render commands"))?;

            match command {
                RenderCommand::SelectScene { run_id, scene } => {
                    debug!(run_id = %run_id, scene = %scene, "Selecting scene");
                    let (returned, selected) =
                        offload(renderer, move |r| r.select_scene(&scene)).await?;
                    renderer = returned;
                    selected?;
                }
                RenderCommand::Render {
                    run_id,
                    epoch,
                    counters,
                } => {
                    let started = Instant::now();
                    let (returned, frame) =
                        offload(renderer, move |r| r.render_frame(&counters)).await?;
                    renderer = returned;
                    let frame = frame?;

                    let elapsed = started.elapsed();
                    metrics::record_frame_rendered(elapsed.as_secs_f64());
                    debug!(
                        run_id = %run_id,
                        epoch,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Frame rendered"
                    );

                    frames
                        .send(frame)
                        .map_err(|_| PipelineError::channel_closed("rendered frames"))?;
                    rendered += 1;
                }
            }
        }

        info!(rendered, "Render-prep context stopped");
        Ok("render_prep")
    }
}
