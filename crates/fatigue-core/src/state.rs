//! Session phase and blink bookkeeping

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Session phase
///
/// Transitions are one-directional and time-triggered:
/// Calibrating -> Grace -> Monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    #[default]
    Calibrating,
    Grace,
    Monitoring,
}

impl SessionPhase {
    /// String representation for display and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calibrating => "CALIBRATING",
            Self::Grace => "GRACE",
            Self::Monitoring => "MONITORING",
        }
    }
}

/// Blink counters exposed to display consumers.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Completed-closure timestamps within the trailing rate window
    recent_blinks: VecDeque<Duration>,

    /// Completed closures over the whole session
    pub total_blinks: u32,

    /// Micro-sleeps over the whole session
    pub microsleep_count: u32,
}

impl SessionStats {
    /// Trailing window for the per-minute blink count
    const RATE_WINDOW: Duration = Duration::from_secs(60);

    /// Record one completed closure.
    pub fn record_blink(&mut self, at: Duration) {
        self.total_blinks += 1;
        self.recent_blinks.push_back(at);
    }

    /// Evict blinks that fell out of the rate window.
    pub fn prune(&mut self, now: Duration) {
        let cutoff = now.saturating_sub(Self::RATE_WINDOW);
        while let Some(&front) = self.recent_blinks.front() {
            if front < cutoff {
                self.recent_blinks.pop_front();
            } else {
                break;
            }
        }
    }

    /// Blinks completed within the last minute.
    pub fn blinks_last_minute(&self) -> usize {
        self.recent_blinks.len()
    }
}
