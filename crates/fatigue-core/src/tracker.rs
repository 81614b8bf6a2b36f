//! Eye-state tracking
//!
//! Two-state OPEN/CLOSED machine driven by comparing each sample to the
//! calibrated closure threshold. Emits one [`ClosureEvent`] per completed
//! closure interval; in-flight closures are discarded when the signal is
//! lost so stale data never inflates a duration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One continuous interval of eye closure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClosureEvent {
    pub start: Duration,
    pub end: Duration,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EyeState {
    Open,
    Closed { since: Duration },
}

/// OPEN/CLOSED tracker producing closure-duration events.
#[derive(Debug)]
pub struct EyeStateTracker {
    threshold: f32,
    state: EyeState,
}

impl EyeStateTracker {
    /// Create a tracker with the calibrated closure threshold.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            state: EyeState::Open,
        }
    }

    /// Process one face-detected sample.
    ///
    /// Returns a [`ClosureEvent`] on the CLOSED -> OPEN transition; the OPEN
    /// state itself never emits.
    pub fn observe(&mut self, timestamp: Duration, openness: f32) -> Option<ClosureEvent> {
        match self.state {
            EyeState::Open => {
                if openness < self.threshold {
                    self.state = EyeState::Closed { since: timestamp };
                }
                None
            }
            EyeState::Closed { since } => {
                if openness >= self.threshold {
                    self.state = EyeState::Open;
                    let event = ClosureEvent {
                        start: since,
                        end: timestamp,
                        duration: timestamp.saturating_sub(since),
                    };
                    debug!(duration = ?event.duration, "closure completed");
                    Some(event)
                } else {
                    None
                }
            }
        }
    }

    /// Live duration of the in-flight closure, if the eye is closed.
    pub fn ongoing_closure(&self, now: Duration) -> Option<Duration> {
        match self.state {
            EyeState::Closed { since } => Some(now.saturating_sub(since)),
            EyeState::Open => None,
        }
    }

    /// Restart the in-flight closure clock at `now`.
    ///
    /// Used after an ongoing micro-sleep has fired, so the same closure does
    /// not re-trigger every frame.
    pub fn rebase_closure(&mut self, now: Duration) {
        if let EyeState::Closed { .. } = self.state {
            self.state = EyeState::Closed { since: now };
        }
    }

    /// Drop any in-flight closure without emitting.
    ///
    /// Called when the face is lost or the stream ends; partial closures at
    /// signal boundaries are intentionally ignored.
    pub fn abandon(&mut self) {
        if self.state != EyeState::Open {
            debug!("in-flight closure discarded");
            self.state = EyeState::Open;
        }
    }

    /// Whether the eye is currently considered closed.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, EyeState::Closed { .. })
    }
}
