//! Presentation-side frame blending and playback statistics.

use std::time::Duration;

use tokio::time::Instant;

use expo_models::RasterFrame;

/// Ease-in-out curve on `[0, 1]`.
pub fn ease_in_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Cross-fades from the previous frame to the latest one.
#[derive(Debug, Clone)]
pub struct FrameInterpolator {
    crossfade: Duration,
    previous: Option<RasterFrame>,
    current: RasterFrame,
    updated_at: Instant,
}

impl FrameInterpolator {
    /// Start from `initial` with nothing to blend from.
    pub fn new(initial: RasterFrame, crossfade: Duration, now: Instant) -> Self {
        Self {
            crossfade,
            previous: None,
            current: initial,
            updated_at: now,
        }
    }

    /// Replace the target frame; the fade restarts from what is on screen.
    pub fn push(&mut self, frame: RasterFrame, now: Instant) {
        let shown = self.frame_at(now);
        self.previous = Some(shown);
        self.current = frame;
        self.updated_at = now;
    }

    pub fn current(&self) -> &RasterFrame {
        &self.current
    }

    /// Blend progress at `now`, `1.0` once the fade is over.
    pub fn progress(&self, now: Instant) -> f32 {
        if self.previous.is_none() || self.crossfade.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.updated_at);
        (elapsed.as_secs_f32() / self.crossfade.as_secs_f32()).min(1.0)
    }

    /// Frame to show at `now`.
    ///
    /// Frames of different sizes are not blended; the latest one is shown.
    pub fn frame_at(&self, now: Instant) -> RasterFrame {
        let progress = self.progress(now);
        match &self.previous {
            Some(previous) if progress < 1.0 => self
                .current
                .blend(previous, ease_in_out(progress))
                .unwrap_or_else(|| self.current.clone()),
            _ => self.current.clone(),
        }
    }
}

/// Presented frame counter.
#[derive(Debug, Clone)]
pub struct PlaybackStats {
    started_at: Instant,
    frames: u64,
}

impl PlaybackStats {
    pub fn new(now: Instant) -> Self {
        Self {
            started_at: now,
            frames: 0,
        }
    }

    pub fn record_frame(&mut self) {
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Average presented frames per second since start.
    pub fn rate(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
        self.frames as f64 / elapsed.max(0.001)
    }

    /// `HH:MM:SS.ss | Total frames: N (R/s)`
    pub fn format(&self, now: Instant) -> String {
        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
        let hours = (elapsed / 3600.0).floor();
        let minutes = ((elapsed - hours * 3600.0) / 60.0).floor();
        let seconds = elapsed - hours * 3600.0 - minutes * 60.0;

        format!(
            "{:02}:{:02}:{:05.2} | Total frames: {} ({:.1}/s)",
            hours as u64,
            minutes as u64,
            seconds,
            self.frames,
            self.rate(now)
        )
    }
}
