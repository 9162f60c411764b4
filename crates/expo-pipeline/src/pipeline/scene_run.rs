//! Scene-run lifecycle.
//!
//! Each run subscribes to the presence stream afresh, debounces it and feeds
//! a new counter machine until the run saturates or hits the switch epoch.
//! Distinct counter vectors go to telemetry; every second one is rendered.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, Instrument};

use expo_detector::{CounterMachine, HysteresisConfig, RunEnd, SampleDebouncer};
use expo_models::{PresenceSample, RunId};
use expo_scenery::SequenceCursor;

use crate::collaborators::Telemetry;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::RunLogger;
use crate::metrics;

use super::{wait_for_shutdown, RenderCommand, SwitchSignal};

/// Distinct emissions per render request.
const RENDER_DOWNSAMPLE: u64 = 2;

/// Epochs between progress lines in the run log.
const PROGRESS_LOG_EPOCHS: u64 = 10;

enum RunOutcome {
    Finished(RunEnd),
    Interrupted,
}

pub(crate) struct CounterContext {
    pub cursor: SequenceCursor,
    pub hysteresis: HysteresisConfig,
    pub zones: usize,
    pub sampling_interval: Duration,
    pub presence: broadcast::Sender<PresenceSample>,
    pub switch_rx: mpsc::UnboundedReceiver<SwitchSignal>,
    pub switch_tx: mpsc::UnboundedSender<SwitchSignal>,
    pub render_tx: mpsc::UnboundedSender<RenderCommand>,
    pub telemetry: Arc<dyn Telemetry>,
    pub shutdown: watch::Receiver<bool>,
}

impl CounterContext {
    /// Start one scene run per switch signal until shutdown.
    pub(crate) async fn run(mut self) -> PipelineResult<&'static str> {
        let mut completed = 0u64;

        loop {
            let signal = tokio::select! {
                _ = wait_for_shutdown(&mut self.shutdown) => break,
                signal = self.switch_rx.recv() => signal,
            };
            let signal =
                signal.ok_or_else(|| PipelineError::channel_closed("switch signals"))?;
            debug!(?signal, "Switching scene");

            let scene = self.cursor.next().map_err(|e| {
                error!(
                    error = %e,
                    configuration_fault = e.is_configuration_fault(),
                    policy = self.cursor.policy(),
                    "Cannot select the next scene"
                );
                e
            })?;
            self.telemetry.on_scene_selected(&scene);

            let run_id = RunId::new();
            self.send_render(RenderCommand::SelectScene {
                run_id: run_id.clone(),
                scene: scene.clone(),
            })?;

            let logger = RunLogger::new(&run_id, &scene);
            let span = logger.create_span();
            match self.run_scene(run_id, &logger).instrument(span).await? {
                RunOutcome::Finished(_) => {
                    completed += 1;
                    self.switch_tx
                        .send(SwitchSignal::NextScene)
                        .map_err(|_| PipelineError::channel_closed("switch signals"))?;
                }
                RunOutcome::Interrupted => break,
            }
        }

        info!(completed, "Counter context stopped");
        Ok("counter")
    }

    async fn run_scene(&mut self, run_id: RunId, logger: &RunLogger) -> PipelineResult<RunOutcome> {
        let mut presence = self.presence.subscribe();
        let mut debouncer = SampleDebouncer::new(self.sampling_interval);
        // The machine starts from an all-absent vector, which uses up one
        // pass-through slot.
        debouncer.mark_seeded();
        let mut machine = CounterMachine::new(self.hysteresis.clone(), self.zones)
            .map_err(|e| {
                logger.log_error(&format!("cannot start counter machine: {}", e));
                e
            })?;
        let mut emissions = 0u64;

        metrics::record_run_started(self.cursor.policy());
        logger.log_start(&format!(
            "switch at epoch {}, max counter {}",
            self.hysteresis.sequence_switch_epoch, self.hysteresis.max_counter
        ));

        loop {
            let sample = tokio::select! {
                _ = wait_for_shutdown(&mut self.shutdown) => {
                    logger.log_warning(&format!("interrupted at epoch {}", machine.epoch()));
                    return Ok(RunOutcome::Interrupted);
                }
                sample = debouncer.next(&mut presence) => sample,
            };
            let sample = sample.ok_or_else(|| PipelineError::channel_closed("presence samples"))?;

            let outcome = machine.tick(&sample.zones).map_err(|e| {
                logger.log_error(&format!("counter tick failed at epoch {}: {}", machine.epoch(), e));
                e
            })?;
            self.telemetry.on_epoch(outcome.epoch);
            metrics::set_epoch(outcome.epoch);
            if outcome.epoch % PROGRESS_LOG_EPOCHS == 0 {
                logger.log_progress(&format!(
                    "epoch {}, max counter {}",
                    outcome.epoch,
                    outcome.counters.max()
                ));
            }

            if outcome.emitted {
                let forward = emissions % RENDER_DOWNSAMPLE == 0;
                emissions += 1;
                self.telemetry.on_counter_vector(&outcome.counters);
                metrics::record_counter_emission(forward);

                if forward {
                    self.send_render(RenderCommand::Render {
                        run_id: run_id.clone(),
                        epoch: outcome.epoch,
                        counters: outcome.counters.clone(),
                    })?;
                    metrics::record_render_request();
                }
            }

            if let Some(end) = outcome.finished {
                metrics::record_run_completed(end.as_str());
                logger.log_completion(&format!(
                    "{} at epoch {}, max counter {}, {} distinct vectors",
                    end.as_str(),
                    outcome.epoch,
                    outcome.counters.max(),
                    emissions
                ));
                return Ok(RunOutcome::Finished(end));
            }
        }
    }

    fn send_render(&self, command: RenderCommand) -> PipelineResult<()> {
        self.render_tx
            .send(command)
            .map_err(|_| PipelineError::channel_closed("render commands"))
    }
}
