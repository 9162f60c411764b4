//! Presentation cadence.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::info;

use expo_models::RasterFrame;

use crate::collaborators::Telemetry;
use crate::error::{PipelineError, PipelineResult};
use crate::interpolator::{FrameInterpolator, PlaybackStats};
use crate::metrics;

use super::wait_for_shutdown;

/// How often playback statistics are logged.
const STATS_INTERVAL: Duration = Duration::from_secs(60);

pub(crate) struct PresentationContext {
    pub frames: mpsc::UnboundedReceiver<RasterFrame>,
    pub initial: RasterFrame,
    pub cadence: Duration,
    pub crossfade: Duration,
    pub telemetry: Arc<dyn Telemetry>,
    pub shutdown: watch::Receiver<bool>,
}

impl PresentationContext {
    /// Present the cross-faded frame on every cadence tick.
    pub(crate) async fn run(self) -> PipelineResult<&'static str> {
        let PresentationContext {
            mut frames,
            initial,
            cadence,
            crossfade,
            telemetry,
            mut shutdown,
        } = self;

        let start = Instant::now();
        let mut interpolator = FrameInterpolator::new(initial, crossfade, start);
        let mut stats = PlaybackStats::new(start);

        let mut ticker = interval(cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut report = interval_at(start + STATS_INTERVAL, STATS_INTERVAL);

        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                frame = frames.recv() => {
                    let frame = frame.ok_or_else(|| PipelineError::channel_closed("rendered frames"))?;
                    interpolator.push(frame, Instant::now());
                }
                _ = ticker.tick() => {
                    let frame = interpolator.frame_at(Instant::now());
                    telemetry.on_rendered_frame(&frame);
                    stats.record_frame();
                    metrics::record_frame_presented();
                }
                _ = report.tick() => {
                    info!(playback = %stats.format(Instant::now()), "Playback");
                }
            }
        }

        info!(
            frames = stats.frames(),
            playback = %stats.format(Instant::now()),
            "Presentation context stopped"
        );
        Ok("presentation")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::RecordingTelemetry;

    #[tokio::test(start_paused = true)]
    async fn test_presents_on_cadence_until_shutdown() {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let telemetry = Arc::new(RecordingTelemetry::new());

        let task = tokio::spawn(
            PresentationContext {
                frames: frame_rx,
                initial: RasterFrame::blank(2, 2),
                cadence: Duration::from_millis(100),
                crossfade: Duration::from_millis(500),
                telemetry: telemetry.clone(),
                shutdown: shutdown_rx,
            }
            .run(),
        );

        frame_tx.send(RasterFrame::blank(2, 2)).unwrap();
        tokio::time::sleep(Duration::from_millis(1050)).await;
        shutdown.send_replace(true);

        assert_eq!(task.await.unwrap().unwrap(), "presentation");
        let frames = telemetry.snapshot().frames;
        assert!((10..=12).contains(&frames), "presented {} frames", frames);
    }

    #[tokio::test]
    async fn test_closed_frame_channel_is_reported() {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (_shutdown, shutdown_rx) = watch::channel(false);
        drop(frame_tx);

        let result = PresentationContext {
            frames: frame_rx,
            initial: RasterFrame::blank(1, 1),
            cadence: Duration::from_secs(1),
            crossfade: Duration::ZERO,
            telemetry: Arc::new(RecordingTelemetry::new()),
            shutdown: shutdown_rx,
        }
        .run()
        .await;

        assert!(matches!(result, Err(PipelineError::ChannelClosed(_))));
    }
}
