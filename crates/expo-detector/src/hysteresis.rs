//! Epoch-based hysteresis counters.
//!
//! Presence is not counted on every sample. A zone that turns present must
//! stay present for `new_detection_threshold` consecutive ticks before its
//! counter increments; each further increment while it remains present needs
//! `continued_detection_threshold` more ticks. One absent tick clears the
//! pending trigger.
//!
//! # State
//! - `epoch`: tick number within the current scene run (first tick is 1)
//! - `trigger[z]`: epoch at which zone `z` fires next, `0` when idle
//! - `counter[z]`: saturating at `max_counter`
//!
//! A run is live while `epoch < sequence_switch_epoch` and the largest counter
//! is below `max_counter`; the first tick breaking either condition finishes it.

use expo_models::{CounterVector, GroupOrder, PresenceVector};

use crate::error::{DetectorError, DetectorResult};

/// Thresholds and limits of one scene run.
#[derive(Debug, Clone, PartialEq)]
pub struct HysteresisConfig {
    /// Consecutive present ticks before the first increment.
    pub new_detection_threshold: u64,
    /// Present ticks between subsequent increments.
    pub continued_detection_threshold: u64,
    /// Counter saturation value; reaching it ends the run.
    pub max_counter: u32,
    /// Epoch at which the run ends regardless of counters.
    pub sequence_switch_epoch: u64,
    /// Which side of the zone vector is reported as the left group.
    pub group_order: GroupOrder,
    /// Fire every zone on every tick (render-chain exercise mode).
    pub test_animation: bool,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            new_detection_threshold: 3,
            continued_detection_threshold: 1,
            max_counter: 30,
            sequence_switch_epoch: 45,
            group_order: GroupOrder::Forward,
            test_animation: false,
        }
    }
}

impl HysteresisConfig {
    pub fn validate(&self) -> DetectorResult<()> {
        if self.new_detection_threshold == 0 || self.continued_detection_threshold == 0 {
            return Err(DetectorError::invalid_thresholds(format!(
                "detection thresholds must be at least 1 (new={}, continued={})",
                self.new_detection_threshold, self.continued_detection_threshold
            )));
        }
        if self.max_counter == 0 {
            return Err(DetectorError::invalid_thresholds("max counter must be at least 1"));
        }
        if self.sequence_switch_epoch == 0 {
            return Err(DetectorError::invalid_thresholds(
                "sequence switch epoch must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Result of one pure transition over all zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub fired: Vec<bool>,
    pub trigger: Vec<u64>,
}

/// Per-zone trigger transition for tick `epoch`.
///
/// For a present zone the due epoch is the pending trigger when the zone was
/// already present, otherwise `epoch + new_detection_threshold - 1` (the
/// confirmation window counts the current tick). When the due epoch is
/// reached the zone fires and reschedules `continued_detection_threshold`
/// ticks ahead. Absent zones drop their trigger to `0`.
pub fn transition(
    config: &HysteresisConfig,
    epoch: u64,
    prev: &PresenceVector,
    curr: &PresenceVector,
    trigger: &[u64],
) -> Transition {
    let mut fired = Vec::with_capacity(trigger.len());
    let mut next = Vec::with_capacity(trigger.len());

    for (zone, pending) in trigger.iter().copied().enumerate() {
        if !curr.is_present(zone) {
            fired.push(false);
            next.push(0);
            continue;
        }

        let due = if prev.is_present(zone) && pending >= epoch {
            pending
        } else {
            epoch + config.new_detection_threshold - 1
        };

        if due == epoch {
            fired.push(true);
            next.push(epoch + config.continued_detection_threshold);
        } else {
            fired.push(false);
            next.push(due);
        }
    }

    Transition { fired, trigger: next }
}

/// Why a scene run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// A counter reached `max_counter`.
    Saturated,
    /// `sequence_switch_epoch` was reached.
    EpochLimit,
}

impl RunEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunEnd::Saturated => "saturated",
            RunEnd::EpochLimit => "epoch_limit",
        }
    }
}

/// Outcome of one counter tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub epoch: u64,
    pub counters: CounterVector,
    /// False when the vector equals the previous emission.
    pub emitted: bool,
    pub finished: Option<RunEnd>,
}

/// Counter state of one scene run.
///
/// Build a fresh machine per run; nothing carries over between runs.
#[derive(Debug, Clone)]
pub struct CounterMachine {
    config: HysteresisConfig,
    epoch: u64,
    prev: PresenceVector,
    trigger: Vec<u64>,
    counters: Vec<u32>,
    last_emitted: Option<CounterVector>,
    finished: Option<RunEnd>,
}

impl CounterMachine {
    pub fn new(config: HysteresisConfig, zones: usize) -> DetectorResult<Self> {
        config.validate()?;
        // Validates the zone partition up front.
        CounterVector::zeros(zones)?;

        Ok(Self {
            config,
            epoch: 0,
            prev: PresenceVector::absent(zones),
            trigger: vec![0; zones],
            counters: vec![0; zones],
            last_emitted: None,
            finished: None,
        })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn zone_count(&self) -> usize {
        self.counters.len()
    }

    pub fn trigger(&self) -> &[u64] {
        &self.trigger
    }

    pub fn zone_counters(&self) -> &[u32] {
        &self.counters
    }

    pub fn finished(&self) -> Option<RunEnd> {
        self.finished
    }

    /// Advance one epoch with the next debounced presence vector.
    pub fn tick(&mut self, curr: &PresenceVector) -> DetectorResult<TickOutcome> {
        if self.finished.is_some() {
            return Err(DetectorError::RunFinished(self.epoch));
        }
        if curr.len() != self.counters.len() {
            return Err(DetectorError::LengthMismatch {
                expected: self.counters.len(),
                actual: curr.len(),
            });
        }

        self.epoch += 1;

        let step = transition(&self.config, self.epoch, &self.prev, curr, &self.trigger);
        self.trigger = step.trigger;

        for (counter, fired) in self.counters.iter_mut().zip(&step.fired) {
            let increment = if self.config.test_animation || *fired { 1 } else { 0 };
            *counter = (*counter + increment).min(self.config.max_counter);
        }
        self.prev = curr.clone();

        let counters = CounterVector::from_zones(&self.counters, self.config.group_order)?;

        let emitted = self.last_emitted.as_ref() != Some(&counters);
        if emitted {
            self.last_emitted = Some(counters.clone());
        }

        let finished = if counters.max() >= self.config.max_counter {
            Some(RunEnd::Saturated)
        } else if self.epoch >= self.config.sequence_switch_epoch {
            Some(RunEnd::EpochLimit)
        } else {
            None
        };
        self.finished = finished;

        Ok(TickOutcome {
            epoch: self.epoch,
            counters,
            emitted,
            finished,
        })
    }
}
