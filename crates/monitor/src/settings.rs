//! Layered settings loading
//!
//! Defaults, then an optional `monitor.toml`, then `MONITOR_`-prefixed
//! environment variables. Engine parameters are resolved once here and
//! handed to the engine at session start.

use alerting::AlertConfig;
use config::{Config, ConfigError, Environment, File};
use fatigue_core::EngineConfig;
use serde::Deserialize;
use std::time::Duration;

/// Runner settings
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSettings {
    /// Simulated capture frame rate
    pub fps: u32,

    /// Session length once monitoring begins (seconds)
    pub session_secs: f32,

    /// Capacity of the capture queue
    pub queue_capacity: usize,

    pub engine: EngineSettings,
    pub alerts: AlertSettings,
}

/// Engine parameters exposed to the settings file
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    pub calibration_secs: f32,
    pub grace_secs: f32,
    pub warning_threshold: f32,
    pub critical_threshold: f32,
    pub silence_threshold: f32,
    pub decay_per_sec: f32,
}

/// Alert dispatch parameters
#[derive(Debug, Clone, Deserialize)]
pub struct AlertSettings {
    pub warning_repeat_secs: f32,
}

impl MonitorSettings {
    /// Load settings from defaults, file, and environment.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("fps", 30)?
            .set_default("session_secs", 40.0)?
            .set_default("queue_capacity", 1800)?
            .set_default("engine.calibration_secs", 10.0)?
            .set_default("engine.grace_secs", 2.0)?
            .set_default("engine.warning_threshold", 25.0)?
            .set_default("engine.critical_threshold", 60.0)?
            .set_default("engine.silence_threshold", 40.0)?
            .set_default("engine.decay_per_sec", 0.5)?
            .set_default("alerts.warning_repeat_secs", 5.0)?
            .add_source(File::with_name("monitor").required(false))
            .add_source(Environment::with_prefix("MONITOR").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Engine configuration with file-tunable fields applied.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            calibration_window: Duration::from_secs_f32(self.engine.calibration_secs),
            grace_period: Duration::from_secs_f32(self.engine.grace_secs),
            warning_threshold: self.engine.warning_threshold,
            critical_threshold: self.engine.critical_threshold,
            silence_threshold: self.engine.silence_threshold,
            decay_per_sec: self.engine.decay_per_sec,
            ..EngineConfig::default()
        }
    }

    /// Alert dispatcher configuration.
    pub fn alert_config(&self) -> AlertConfig {
        AlertConfig {
            warning_repeat: Duration::from_secs_f32(self.alerts.warning_repeat_secs),
        }
    }
}
