//! Closure classification and rapid-blink cluster detection
//!
//! Duration boundaries use a closed-open convention throughout:
//! `d < normal_blink_max` is a normal blink, `normal_blink_max <= d <
//! microsleep_min` is a long blink, `d >= microsleep_min` is a micro-sleep.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::tracker::ClosureEvent;

/// Classified fatigue event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FatigueEvent {
    /// Ordinary blink; counted for cluster detection but never scored
    NormalBlink { duration: Duration },
    /// Closure long enough to indicate drowsiness
    LongBlink { duration: Duration },
    /// Closure long enough to indicate sleep onset
    MicroSleep { duration: Duration },
    /// Abnormally many blinks within the sliding window
    RapidBlinkCluster { blink_count: usize },
}

impl FatigueEvent {
    /// Stable label for logging and notification consumers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NormalBlink { .. } => "normal_blink",
            Self::LongBlink { .. } => "long_blink",
            Self::MicroSleep { .. } => "microsleep",
            Self::RapidBlinkCluster { .. } => "rapid_cluster",
        }
    }

    /// Base score increment for this event, if it carries one.
    pub fn base_points(&self, config: &EngineConfig) -> Option<f32> {
        match self {
            Self::NormalBlink { .. } => None,
            Self::LongBlink { .. } => Some(config.long_blink_points),
            Self::MicroSleep { .. } => Some(config.microsleep_points),
            Self::RapidBlinkCluster { .. } => Some(config.cluster_points),
        }
    }

    /// Closure duration, where the event has one.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::NormalBlink { duration }
            | Self::LongBlink { duration }
            | Self::MicroSleep { duration } => Some(*duration),
            Self::RapidBlinkCluster { .. } => None,
        }
    }
}

/// Time-bounded record of recent closure timestamps.
///
/// Retained timestamps are monotonically non-decreasing and always within
/// the window relative to the latest prune.
#[derive(Debug)]
struct BlinkHistory {
    window: Duration,
    stamps: VecDeque<Duration>,
}

impl BlinkHistory {
    fn new(window: Duration) -> Self {
        Self {
            window,
            stamps: VecDeque::new(),
        }
    }

    fn push(&mut self, at: Duration) {
        self.stamps.push_back(at);
    }

    fn prune(&mut self, now: Duration) {
        let cutoff = now.saturating_sub(self.window);
        while let Some(&front) = self.stamps.front() {
            if front < cutoff {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.stamps.len()
    }
}

/// Maps completed closures to typed events and detects blink clusters.
#[derive(Debug)]
pub struct EventClassifier {
    normal_blink_max: Duration,
    microsleep_min: Duration,
    cluster_count: usize,
    cluster_window: Duration,
    history: BlinkHistory,
    last_cluster_at: Option<Duration>,
}

impl EventClassifier {
    /// Create a classifier from the engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            normal_blink_max: config.normal_blink_max,
            microsleep_min: config.microsleep_min,
            cluster_count: config.cluster_count,
            cluster_window: config.cluster_window,
            history: BlinkHistory::new(config.cluster_window),
            last_cluster_at: None,
        }
    }

    /// Classify one completed closure.
    ///
    /// Every closure, normal blinks and micro-sleeps included, occupies one
    /// slot in the blink history. The second element is a cluster event if
    /// this closure filled the window: the count must reach the threshold
    /// AND no cluster may have fired within the trailing window, so a
    /// persisting set of blinks triggers at most once and a new cluster
    /// needs a new qualifying closure after the history has turned over.
    pub fn classify(&mut self, closure: &ClosureEvent) -> (FatigueEvent, Option<FatigueEvent>) {
        let duration = closure.duration;
        let event = if duration < self.normal_blink_max {
            FatigueEvent::NormalBlink { duration }
        } else if duration < self.microsleep_min {
            FatigueEvent::LongBlink { duration }
        } else {
            FatigueEvent::MicroSleep { duration }
        };
        debug!(event = event.label(), duration = ?duration, "closure classified");

        self.history.push(closure.end);
        self.history.prune(closure.end);

        let cooled_down = self
            .last_cluster_at
            .is_none_or(|last| closure.end.saturating_sub(last) > self.cluster_window);
        let cluster = if self.history.len() >= self.cluster_count && cooled_down {
            self.last_cluster_at = Some(closure.end);
            info!(blinks = self.history.len(), "rapid blink cluster detected");
            Some(FatigueEvent::RapidBlinkCluster {
                blink_count: self.history.len(),
            })
        } else {
            None
        };

        (event, cluster)
    }

    /// Evict history entries that fell out of the window.
    pub fn prune(&mut self, now: Duration) {
        self.history.prune(now);
    }

    /// Closures currently inside the cluster window.
    pub fn blinks_in_window(&self) -> usize {
        self.history.len()
    }
}
