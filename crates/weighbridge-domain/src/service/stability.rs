//! Truck presence detection
//!
//! Turns the polled scale weight into one edge-triggered event per truck visit.
//! This is a threshold-and-dwell heuristic: it only requires the weight to stay
//! above the entry threshold for a number of consecutive polls and does not
//! look at the variance between readings.

use tracing::debug;

/// Detector tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityThresholds {
    /// Weight (kg) above which a poll counts towards presence
    pub entry: f64,
    /// Weight (kg) below which the truck is considered gone
    pub departure: f64,
    /// Qualifying polls needed before firing
    pub ticks: u32,
}

impl Default for StabilityThresholds {
    fn default() -> Self {
        Self {
            entry: 500.0,
            departure: 100.0,
            ticks: 10,
        }
    }
}

/// Detector state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorState {
    /// Nothing on the scale counted yet
    #[default]
    Armed,
    /// Qualifying polls seen so far for this visit
    Counting(u32),
    /// Event emitted; waits for the weight to fall below departure
    Fired,
}

/// Emitted once per visit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruckStableEvent {
    /// Weight at the firing poll
    pub weight: f64,
    pub ticks: u32,
}

impl DetectorState {
    /// Advance the state by one poll.
    ///
    /// `in_flight` is true while an identification/ledger transaction is
    /// outstanding; such polls neither count nor fire.
    pub fn advance(
        self,
        weight: f64,
        in_flight: bool,
        thresholds: &StabilityThresholds,
    ) -> (DetectorState, Option<TruckStableEvent>) {
        if weight < thresholds.departure {
            return (DetectorState::Armed, None);
        }

        let counted = match self {
            DetectorState::Fired => return (self, None),
            DetectorState::Armed => 0,
            DetectorState::Counting(n) => n,
        };

        if weight > thresholds.entry && !in_flight {
            let count = counted.saturating_add(1);
            if count >= thresholds.ticks {
                return (
                    DetectorState::Fired,
                    Some(TruckStableEvent {
                        weight,
                        ticks: count,
                    }),
                );
            }
            return (DetectorState::Counting(count), None);
        }

        (self, None)
    }

    pub fn count(&self) -> u32 {
        match self {
            DetectorState::Counting(n) => *n,
            _ => 0,
        }
    }
}

/// Per-session stability detector
#[derive(Debug, Clone)]
pub struct StabilityDetector {
    thresholds: StabilityThresholds,
    state: DetectorState,
}

impl StabilityDetector {
    pub fn new(thresholds: StabilityThresholds) -> Self {
        Self {
            thresholds,
            state: DetectorState::Armed,
        }
    }

    /// Evaluate one poll against the latest weight
    pub fn tick(&mut self, weight: f64, in_flight: bool) -> Option<TruckStableEvent> {
        let (next, event) = self.state.advance(weight, in_flight, &self.thresholds);
        if next != self.state {
            match (self.state, next) {
                (DetectorState::Fired, DetectorState::Armed) => {
                    debug!(weight, "truck departed, detector re-armed");
                }
                (_, DetectorState::Fired) => {
                    debug!(weight, ticks = self.thresholds.ticks, "truck stable");
                }
                _ => {}
            }
            self.state = next;
        } else if in_flight && weight > self.thresholds.entry && self.state != DetectorState::Fired {
            debug!(weight, "transaction in flight, presence not counted");
        }
        event
    }

    /// Force the detector back to `Armed` (used when the telemetry stream ends)
    pub fn reset(&mut self) {
        self.state = DetectorState::Armed;
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// True once the current visit has produced its event
    pub fn has_fired(&self) -> bool {
        self.state == DetectorState::Fired
    }

    /// Treat the current visit as already handled, e.g. after a manual
    /// capture. The next event needs a departure first.
    pub fn mark_fired(&mut self) {
        if self.state != DetectorState::Fired {
            debug!("visit handled outside the detector, waiting for departure");
            self.state = DetectorState::Fired;
        }
    }
}

impl Default for StabilityDetector {
    fn default() -> Self {
        Self::new(StabilityThresholds::default())
    }
}
