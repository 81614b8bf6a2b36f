//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::FatigueError;

/// Engine configuration
///
/// Supplied once at session start; the engine never mutates it. Use
/// [`EngineConfig::validate`] (called by the engine constructor) to reject
/// inconsistent parameter sets before any of them take effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Length of the baseline calibration window
    pub calibration_window: Duration,

    /// Settle delay between calibration and monitoring
    pub grace_period: Duration,

    /// Minimum buffered samples for a usable baseline
    pub min_calibration_samples: usize,

    /// Openness floor below which calibration samples are discarded
    /// (eyes likely mid-blink, not baseline evidence)
    pub open_eye_floor: f32,

    /// Closure threshold = baseline * this
    pub closure_multiplier: f32,

    /// Closures shorter than this are normal blinks
    pub normal_blink_max: Duration,

    /// Closures at or above this are micro-sleeps
    pub microsleep_min: Duration,

    /// Sliding window for rapid-blink cluster detection
    pub cluster_window: Duration,

    /// Closures within the window to trigger a cluster event
    pub cluster_count: usize,

    /// Score increment per long blink
    pub long_blink_points: f32,

    /// Score increment per micro-sleep
    pub microsleep_points: f32,

    /// Score increment per rapid-blink cluster
    pub cluster_points: f32,

    /// Score at which WARNING engages
    pub warning_threshold: f32,

    /// Score at which CRITICAL engages
    pub critical_threshold: f32,

    /// Active alarms silence when the score drops below this
    pub silence_threshold: f32,

    /// Increment multiplier once the score exceeds the warning threshold
    pub dampening_factor: f32,

    /// Points subtracted per second of event-free monitoring
    pub decay_per_sec: f32,

    /// Openness above baseline * this counts as wide open
    pub wide_eye_multiplier: f32,

    /// Decay rate multiplier while eyes are wide open
    pub wide_eye_decay_boost: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            calibration_window: Duration::from_secs(60),
            grace_period: Duration::from_secs(5),
            min_calibration_samples: 10,
            open_eye_floor: 0.15,
            closure_multiplier: 0.70,
            normal_blink_max: Duration::from_millis(700),
            microsleep_min: Duration::from_millis(2500),
            cluster_window: Duration::from_secs(15),
            cluster_count: 7,
            long_blink_points: 10.0,
            microsleep_points: 40.0,
            cluster_points: 20.0,
            warning_threshold: 25.0,
            critical_threshold: 60.0,
            silence_threshold: 40.0,
            dampening_factor: 0.5,
            decay_per_sec: 0.5,
            wide_eye_multiplier: 1.15,
            wide_eye_decay_boost: 4.0,
        }
    }
}

impl EngineConfig {
    /// Create strict config (events escalate faster, alarms engage earlier)
    pub fn strict() -> Self {
        Self {
            normal_blink_max: Duration::from_millis(500),
            microsleep_min: Duration::from_millis(2000),
            warning_threshold: 20.0,
            critical_threshold: 50.0,
            silence_threshold: 35.0,
            ..Default::default()
        }
    }

    /// Create lenient config (higher thresholds, faster recovery)
    pub fn lenient() -> Self {
        Self {
            normal_blink_max: Duration::from_millis(900),
            microsleep_min: Duration::from_millis(3000),
            warning_threshold: 35.0,
            critical_threshold: 70.0,
            silence_threshold: 50.0,
            decay_per_sec: 1.0,
            ..Default::default()
        }
    }

    /// Check every parameter against its sane bounds.
    ///
    /// Rejection is all-or-nothing: the engine constructor refuses the whole
    /// configuration on the first violation, so no partial set ever applies.
    pub fn validate(&self) -> Result<(), FatigueError> {
        if self.calibration_window.is_zero() {
            return Err(invalid("calibration_window must be positive"));
        }
        if self.min_calibration_samples == 0 {
            return Err(invalid("min_calibration_samples must be at least 1"));
        }
        if self.open_eye_floor < 0.0 {
            return Err(invalid("open_eye_floor must not be negative"));
        }
        if !(0.0..1.0).contains(&self.closure_multiplier) || self.closure_multiplier == 0.0 {
            return Err(invalid("closure_multiplier must be in (0, 1)"));
        }
        if self.normal_blink_max.is_zero() {
            return Err(invalid("normal_blink_max must be positive"));
        }
        if self.normal_blink_max >= self.microsleep_min {
            return Err(invalid("normal_blink_max must be below microsleep_min"));
        }
        if self.cluster_window.is_zero() {
            return Err(invalid("cluster_window must be positive"));
        }
        if self.cluster_count < 2 {
            return Err(invalid("cluster_count must be at least 2"));
        }
        if self.long_blink_points < 0.0 || self.microsleep_points < 0.0 || self.cluster_points < 0.0
        {
            return Err(invalid("event score increments must not be negative"));
        }
        if self.warning_threshold <= 0.0 {
            return Err(invalid("warning_threshold must be positive"));
        }
        if self.warning_threshold >= self.silence_threshold {
            return Err(invalid("warning_threshold must be below silence_threshold"));
        }
        if self.silence_threshold >= self.critical_threshold {
            return Err(invalid("silence_threshold must be below critical_threshold"));
        }
        if self.critical_threshold > crate::score::SCORE_MAX {
            return Err(invalid("critical_threshold must not exceed the score ceiling"));
        }
        if !(0.0..=1.0).contains(&self.dampening_factor) || self.dampening_factor == 0.0 {
            return Err(invalid("dampening_factor must be in (0, 1]"));
        }
        if self.decay_per_sec < 0.0 {
            return Err(invalid("decay_per_sec must not be negative"));
        }
        if self.wide_eye_multiplier <= 1.0 {
            return Err(invalid("wide_eye_multiplier must be above 1.0"));
        }
        if self.wide_eye_decay_boost < 1.0 {
            return Err(invalid("wide_eye_decay_boost must be at least 1.0"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> FatigueError {
    FatigueError::InvalidConfig(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
        assert!(EngineConfig::strict().validate().is_ok());
        assert!(EngineConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_blink_boundaries_must_be_ordered() {
        let config = EngineConfig {
            normal_blink_max: Duration::from_millis(2500),
            microsleep_min: Duration::from_millis(2500),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_alarm_thresholds_must_be_ordered() {
        let config = EngineConfig {
            silence_threshold: 60.0,
            critical_threshold: 60.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            warning_threshold: 40.0,
            silence_threshold: 40.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_calibration_window() {
        let config = EngineConfig {
            calibration_window: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_degenerate_dampening() {
        let config = EngineConfig {
            dampening_factor: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            dampening_factor: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_decay() {
        let config = EngineConfig {
            decay_per_sec: -0.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
