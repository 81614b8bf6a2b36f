//! Per-tick engine outputs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::alarm::AlarmLevel;
use crate::classifier::FatigueEvent;
use crate::state::SessionPhase;

/// One classified event with the score movement it caused.
///
/// Emitted for logging consumers; serialization is their responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: FatigueEvent,
    /// Session time at which the event fired
    pub at: Duration,
    pub score_before: f32,
    pub score_after: f32,
}

/// Alarm-level change notification, for audio-triggering consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmTransition {
    pub from: AlarmLevel,
    pub to: AlarmLevel,
    /// Score at the moment of transition
    pub score: f32,
    /// Event that fired on the transitioning tick, if any
    pub trigger: Option<FatigueEvent>,
}

/// Complete engine snapshot for a single processed frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Session phase
    pub phase: SessionPhase,

    /// Calibration completion fraction in [0, 1]
    pub calibration_progress: f32,

    /// Whether this frame carried a usable signal
    pub face_detected: bool,

    /// Openness as supplied by the detector
    pub openness: f32,

    /// Calibrated baseline (0 until calibration completes)
    pub baseline: f32,

    /// Calibrated closure threshold (0 until calibration completes)
    pub threshold: f32,

    /// Duration of the in-flight or most recent closure
    pub closure_duration: Duration,

    /// Completed closures within the last minute
    pub blinks_last_minute: usize,

    /// Micro-sleeps over the whole session
    pub microsleep_count: u32,

    /// Events classified on this tick, in application order
    pub events: Vec<EventRecord>,

    /// Fatigue score after this tick
    pub score: f32,

    /// Alarm level after this tick
    pub alarm_level: AlarmLevel,

    /// Hysteresis latch state
    pub alarm_latched: bool,

    /// Present when the alarm level changed on this tick
    pub transition: Option<AlarmTransition>,
}

impl FrameAnalysis {
    /// Last event classified this tick, if any.
    pub fn current_event(&self) -> Option<&FatigueEvent> {
        self.events.last().map(|record| &record.event)
    }

    /// Operator-facing status string.
    ///
    /// Signal loss is reported distinctly from NORMAL so a consumer never
    /// renders a blocked camera as an alert-free operator.
    pub fn status_label(&self) -> &'static str {
        if !self.face_detected {
            return "NO SIGNAL";
        }
        match self.phase {
            SessionPhase::Calibrating => "CALIBRATING",
            SessionPhase::Grace => "SETTLING",
            SessionPhase::Monitoring => self.alarm_level.as_str(),
        }
    }
}
