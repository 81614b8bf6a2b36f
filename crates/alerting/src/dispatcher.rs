//! Alert Dispatcher Implementation

use fatigue_core::AlarmLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Re-play interval for the warning beep while WARNING holds
    pub warning_repeat: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            warning_repeat: Duration::from_secs(5),
        }
    }
}

/// Audio action for the playback consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertAction {
    PlayWarning,
    PlayCritical,
    Silence,
}

/// Maps per-tick alarm levels to non-overlapping audio actions.
///
/// Once the critical alarm has sounded, warning levels are ignored until a
/// NORMAL level silences everything; an alarm winding down through WARNING
/// must not restart the beeper it just escalated past.
pub struct AlertDispatcher {
    config: AlertConfig,
    /// Audio level currently engaged, if any
    engaged: Option<AlarmLevel>,
    /// Session time of the last warning beep
    last_warning_at: Option<Duration>,
}

impl AlertDispatcher {
    /// Create a dispatcher with the given configuration.
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            engaged: None,
            last_warning_at: None,
        }
    }

    /// Decide the audio action for this tick's alarm level.
    ///
    /// `now` is the session clock, matching the engine's sample timestamps.
    pub fn on_level(&mut self, level: AlarmLevel, now: Duration) -> Option<AlertAction> {
        match level {
            AlarmLevel::Critical => {
                if self.engaged == Some(AlarmLevel::Critical) {
                    return None;
                }
                self.engaged = Some(AlarmLevel::Critical);
                info!("critical alarm engaged");
                Some(AlertAction::PlayCritical)
            }
            AlarmLevel::Warning => match self.engaged {
                Some(AlarmLevel::Critical) => None,
                Some(AlarmLevel::Warning) => {
                    let due = self
                        .last_warning_at
                        .is_none_or(|last| now.saturating_sub(last) >= self.config.warning_repeat);
                    if due {
                        self.last_warning_at = Some(now);
                        debug!("warning beep repeated");
                        Some(AlertAction::PlayWarning)
                    } else {
                        None
                    }
                }
                _ => {
                    self.engaged = Some(AlarmLevel::Warning);
                    self.last_warning_at = Some(now);
                    info!("warning alarm engaged");
                    Some(AlertAction::PlayWarning)
                }
            },
            AlarmLevel::Normal => {
                if self.engaged.take().is_some() {
                    self.last_warning_at = None;
                    info!("alarms silenced");
                    Some(AlertAction::Silence)
                } else {
                    None
                }
            }
        }
    }

    /// Audio level currently engaged, if any.
    pub fn engaged(&self) -> Option<AlarmLevel> {
        self.engaged
    }

    /// Forget all playback state.
    pub fn reset(&mut self) {
        self.engaged = None;
        self.last_warning_at = None;
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
