//! Sampling debounce in front of the counter machine.
//!
//! The first [`PASSTHROUGH_SAMPLES`] values are forwarded as they arrive.
//! After that, at most one value is forwarded per interval: the latest one
//! received since the previous emission. Intermediate values are dropped,
//! never queued. Intervals with no new value emit nothing.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Values forwarded without rate limiting at the start of a subscription.
pub const PASSTHROUGH_SAMPLES: usize = 2;

/// Latest-wins sampler over a broadcast subscription.
///
/// Owned by a single scene run; dropping it stops its timer.
#[derive(Debug)]
pub struct SampleDebouncer<T> {
    period: Duration,
    passthrough: usize,
    ticker: Option<Interval>,
    latest: Option<T>,
}

impl<T: Clone> SampleDebouncer<T> {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            passthrough: PASSTHROUGH_SAMPLES,
            ticker: None,
            latest: None,
        }
    }

    /// Count a locally injected seed value against the pass-through budget.
    pub fn mark_seeded(&mut self) {
        self.passthrough = self.passthrough.saturating_sub(1);
    }

    pub fn remaining_passthrough(&self) -> usize {
        self.passthrough
    }

    /// Wait for the next debounced value. `None` once the source is closed
    /// and nothing is pending.
    pub async fn next(&mut self, source: &mut broadcast::Receiver<T>) -> Option<T> {
        let period = self.period;
        // The sampling clock starts with the subscription, not after the pass-through.
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            if self.passthrough > 0 {
                let value = recv_latest(source).await?;
                self.passthrough -= 1;
                return Some(value);
            }

            let closed = tokio::select! {
                received = recv_latest(source) => match received {
                    Some(value) => {
                        self.latest = Some(value);
                        false
                    }
                    None => true,
                },
                _ = ticker.tick() => {
                    if let Some(value) = self.latest.take() {
                        return Some(value);
                    }
                    false
                }
            };

            if closed {
                // A value still pending when the source closes goes out on its tick.
                let pending = self.latest.take()?;
                ticker.tick().await;
                return Some(pending);
            }
        }
    }
}

/// Receive from a broadcast channel, skipping over lag gaps.
async fn recv_latest<T: Clone>(source: &mut broadcast::Receiver<T>) -> Option<T> {
    loop {
        match source.recv().await {
            Ok(value) => return Some(value),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Presence subscriber lagged, skipping stale samples");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn test_first_samples_pass_through() {
        let (tx, mut rx) = broadcast::channel(16);
        let mut debouncer = SampleDebouncer::new(PERIOD);
        let start = Instant::now();

        tx.send(1).unwrap();
        tx.send(2).unwrap();

        assert_eq!(debouncer.next(&mut rx).await, Some(1));
        assert_eq!(debouncer.next(&mut rx).await, Some(2));
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_wins_within_interval() {
        let (tx, mut rx) = broadcast::channel(16);
        let mut debouncer = SampleDebouncer::new(PERIOD);
        let start = Instant::now();

        for value in 1..=5 {
            tx.send(value).unwrap();
        }

        assert_eq!(debouncer.next(&mut rx).await, Some(1));
        assert_eq!(debouncer.next(&mut rx).await, Some(2));
        // 3 and 4 are dropped.
        assert_eq!(debouncer.next(&mut rx).await, Some(5));
        assert_eq!(Instant::now(), start + PERIOD);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_intervals_emit_nothing() {
        let (tx, mut rx) = broadcast::channel(16);
        let mut debouncer = SampleDebouncer::new(PERIOD);
        debouncer.mark_seeded();
        assert_eq!(debouncer.remaining_passthrough(), 1);

        let start = Instant::now();
        tx.send(10).unwrap();
        assert_eq!(debouncer.next(&mut rx).await, Some(10));

        let producer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            tx.send(11).unwrap();
        });

        // Ticks at 1s and 2s carry no value; the 3s tick forwards 11.
        assert_eq!(debouncer.next(&mut rx).await, Some(11));
        assert_eq!(Instant::now(), start + Duration::from_millis(3000));

        producer.await.unwrap();
        assert_eq!(debouncer.next(&mut rx).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_value_waits_for_tick() {
        let (tx, mut rx) = broadcast::channel(16);
        let mut debouncer = SampleDebouncer::new(PERIOD);
        debouncer.mark_seeded();
        tx.send(1).unwrap();
        assert_eq!(debouncer.next(&mut rx).await, Some(1));

        tx.send(2).unwrap();
        let mut next = tokio_test::task::spawn(debouncer.next(&mut rx));
        tokio_test::assert_pending!(next.poll());

        tokio::time::advance(PERIOD).await;
        assert_eq!(tokio_test::assert_ready!(next.poll()), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_value_survives_close() {
        let (tx, mut rx) = broadcast::channel(16);
        let mut debouncer = SampleDebouncer::new(PERIOD);
        debouncer.mark_seeded();
        let start = Instant::now();

        tx.send(1).unwrap();
        assert_eq!(debouncer.next(&mut rx).await, Some(1));

        tx.send(2).unwrap();
        drop(tx);
        assert_eq!(debouncer.next(&mut rx).await, Some(2));
        assert_eq!(Instant::now(), start + PERIOD);
        assert_eq!(debouncer.next(&mut rx).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_source_ends_stream() {
        let (tx, mut rx) = broadcast::channel::<u32>(4);
        drop(tx);

        let mut debouncer = SampleDebouncer::new(PERIOD);
        assert_eq!(debouncer.next(&mut rx).await, None);
    }
}
