//! Alarm level derivation with hysteresis
//!
//! The machine is a function of the score and its own previous state, not
//! of the score alone. The latch records that the score has peaked at or
//! above the silence threshold; a latched alarm holds WARNING all the way
//! down to the silence threshold instead of flapping around the warning
//! threshold, and everything silences at once when the score drops below it.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;

/// Discrete alarm level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlarmLevel {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl AlarmLevel {
    /// String representation for display and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Hysteretic alarm state machine.
#[derive(Debug)]
pub struct AlarmMachine {
    warning_threshold: f32,
    critical_threshold: f32,
    silence_threshold: f32,
    level: AlarmLevel,
    latched: bool,
}

impl AlarmMachine {
    /// Create a machine in the NORMAL state.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            warning_threshold: config.warning_threshold,
            critical_threshold: config.critical_threshold,
            silence_threshold: config.silence_threshold,
            level: AlarmLevel::Normal,
            latched: false,
        }
    }

    /// Current level.
    pub fn level(&self) -> AlarmLevel {
        self.level
    }

    /// Whether the hysteresis latch is set.
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Re-evaluate the level from the current score.
    ///
    /// Transition table, first match wins:
    /// - score >= critical: CRITICAL, latch set.
    /// - active and latched: WARNING while score >= silence, otherwise
    ///   NORMAL and the latch clears.
    /// - score >= warning: WARNING; the latch sets once score >= silence.
    /// - otherwise: NORMAL, latch cleared.
    pub fn evaluate(&mut self, score: f32) -> AlarmLevel {
        let previous = self.level;

        if score >= self.critical_threshold {
            self.latched = true;
            self.level = AlarmLevel::Critical;
        } else if self.level != AlarmLevel::Normal && self.latched {
            if score >= self.silence_threshold {
                self.level = AlarmLevel::Warning;
            } else {
                self.latched = false;
                self.level = AlarmLevel::Normal;
            }
        } else if score >= self.warning_threshold {
            if score >= self.silence_threshold {
                self.latched = true;
            }
            self.level = AlarmLevel::Warning;
        } else {
            self.latched = false;
            self.level = AlarmLevel::Normal;
        }

        if self.level != previous {
            info!(
                from = previous.as_str(),
                to = self.level.as_str(),
                score,
                "alarm level changed"
            );
        }
        self.level
    }

    /// Return to NORMAL with the latch cleared.
    pub fn reset(&mut self) {
        self.level = AlarmLevel::Normal;
        self.latched = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> AlarmMachine {
        AlarmMachine::new(&EngineConfig::default())
    }

    #[test]
    fn test_warning_engages_and_holds() {
        let mut alarm = machine();
        assert_eq!(alarm.evaluate(10.0), AlarmLevel::Normal);
        assert_eq!(alarm.evaluate(30.0), AlarmLevel::Warning);

        // A steady score must not flap between WARNING and NORMAL.
        assert_eq!(alarm.evaluate(30.0), AlarmLevel::Warning);
        assert_eq!(alarm.evaluate(30.0), AlarmLevel::Warning);
    }

    #[test]
    fn test_unlatched_warning_releases_below_warning_threshold() {
        let mut alarm = machine();
        alarm.evaluate(30.0);
        assert!(!alarm.is_latched());
        assert_eq!(alarm.evaluate(20.0), AlarmLevel::Normal);
    }

    #[test]
    fn test_latched_warning_holds_down_to_silence_threshold() {
        let mut alarm = machine();
        alarm.evaluate(45.0);
        assert!(alarm.is_latched());

        // Dipping back through [25, 40) keeps the alarm on until < 40.
        assert_eq!(alarm.evaluate(42.0), AlarmLevel::Warning);
        assert_eq!(alarm.evaluate(40.0), AlarmLevel::Warning);
        assert_eq!(alarm.evaluate(39.9), AlarmLevel::Normal);
        assert!(!alarm.is_latched());
    }

    #[test]
    fn test_critical_downgrades_through_warning() {
        let mut alarm = machine();
        assert_eq!(alarm.evaluate(75.0), AlarmLevel::Critical);
        assert_eq!(alarm.evaluate(55.0), AlarmLevel::Warning);
        assert_eq!(alarm.evaluate(30.0), AlarmLevel::Normal);
    }

    #[test]
    fn test_silence_clears_everything_at_once() {
        let mut alarm = machine();
        alarm.evaluate(90.0);
        assert_eq!(alarm.evaluate(10.0), AlarmLevel::Normal);
        assert!(!alarm.is_latched());

        // Rising again behaves like a fresh activation.
        assert_eq!(alarm.evaluate(30.0), AlarmLevel::Warning);
        assert!(!alarm.is_latched());
    }

    #[test]
    fn test_reset() {
        let mut alarm = machine();
        alarm.evaluate(90.0);
        alarm.reset();
        assert_eq!(alarm.level(), AlarmLevel::Normal);
        assert!(!alarm.is_latched());
    }
}
