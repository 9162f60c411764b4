//! Sensor polling context.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use expo_detector::ZoneLayout;
use expo_models::PresenceSample;

use crate::collaborators::{PresenceSensor, Telemetry};
use crate::error::PipelineResult;
use crate::metrics;

use super::{offload, wait_for_shutdown};

pub(crate) struct SamplingContext {
    pub sensor: Box<dyn PresenceSensor>,
    pub layout: ZoneLayout,
    pub interval: Duration,
    pub publisher: broadcast::Sender<PresenceSample>,
    pub telemetry: Arc<dyn Telemetry>,
    pub shutdown: watch::Receiver<bool>,
}

impl SamplingContext {
    /// Poll the sensors and publish one presence sample per interval.
    pub(crate) async fn run(self) -> PipelineResult<&'static str> {
        let SamplingContext {
            mut sensor,
            layout,
            interval: period,
            publisher,
            telemetry,
            mut shutdown,
        } = self;

        info!(
            sensor = sensor.name(),
            interval_ms = period.as_millis() as u64,
            "Sampling context started"
        );

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut published = 0u64;

        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = ticker.tick() => {
                    let (returned, grid) = offload(sensor, |s| s.sample()).await?;
                    sensor = returned;

                    let sample = layout.sample(&grid);
                    telemetry.on_presence_vector(&sample);
                    metrics::record_sample_published(sample.zones.occupied());

                    // Between scene runs nobody is subscribed.
                    if publisher.send(sample).is_err() {
                        debug!("No presence subscribers, sample dropped");
                    }
                    published += 1;
                }
            }
        }

        offload(sensor, |s| s.close()).await?;
        info!(published, "Sampling context stopped");
        Ok("sampling")
    }
}
