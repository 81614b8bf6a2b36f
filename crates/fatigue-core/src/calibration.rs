//! Baseline calibration
//!
//! Buffers openness samples over a warm-up window and derives a personalized
//! baseline (median, for robustness against transient blinks) plus the
//! closure threshold used by the eye-state tracker.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::FatigueError;

/// Personalized openness baseline and derived closure threshold.
///
/// Created once at the end of the calibration window; immutable for the
/// rest of the session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Resting openness value (median of the calibration buffer)
    pub baseline: f32,
    /// Openness below this counts as a closed eye
    pub threshold: f32,
}

/// Collects openness samples while the session is in the calibration phase.
#[derive(Debug)]
pub struct BaselineCalibrator {
    window: Duration,
    multiplier: f32,
    min_samples: usize,
    open_eye_floor: f32,
    started_at: Option<Duration>,
    samples: Vec<f32>,
}

impl BaselineCalibrator {
    /// Create a calibrator from the engine configuration.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            window: config.calibration_window,
            multiplier: config.closure_multiplier,
            min_samples: config.min_calibration_samples,
            open_eye_floor: config.open_eye_floor,
            started_at: None,
            samples: Vec::new(),
        }
    }

    /// Feed one frame.
    ///
    /// The window clock starts at the first sample and keeps running through
    /// detection failures; only face-detected samples above the open-eye
    /// floor are buffered.
    pub fn observe(&mut self, timestamp: Duration, openness: f32, face_detected: bool) {
        if self.started_at.is_none() {
            self.started_at = Some(timestamp);
            debug!(at = ?timestamp, "calibration window started");
        }
        if face_detected && openness > self.open_eye_floor {
            self.samples.push(openness);
        }
    }

    /// Completion fraction in [0, 1] for progress display.
    pub fn progress(&self, now: Duration) -> f32 {
        let Some(started) = self.started_at else {
            return 0.0;
        };
        let elapsed = now.saturating_sub(started).as_secs_f32();
        (elapsed / self.window.as_secs_f32()).min(1.0)
    }

    /// Whether the calibration window has elapsed.
    pub fn is_complete(&self, now: Duration) -> bool {
        self.started_at
            .is_some_and(|started| now.saturating_sub(started) >= self.window)
    }

    /// Number of usable samples buffered so far.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Consume the buffered window and produce the baseline.
    ///
    /// With too few usable samples the window is discarded and a fresh one
    /// starts at `now`, so the caller may surface the error and let the
    /// calibration retry on the live stream.
    pub fn finish(&mut self, now: Duration) -> Result<CalibrationResult, FatigueError> {
        if self.samples.len() < self.min_samples {
            let collected = self.samples.len();
            self.samples.clear();
            self.started_at = Some(now);
            return Err(FatigueError::InsufficientCalibration {
                collected,
                required: self.min_samples,
            });
        }

        let baseline = median(&mut self.samples);
        let threshold = baseline * self.multiplier;
        info!(baseline, threshold, samples = self.samples.len(), "calibration complete");
        Ok(CalibrationResult { baseline, threshold })
    }
}

/// Median with the middle pair averaged for even counts.
fn median(values: &mut [f32]) -> f32 {
    values.sort_unstable_by(f32::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrator(window_secs: u64, min_samples: usize) -> BaselineCalibrator {
        BaselineCalibrator::new(&EngineConfig {
            calibration_window: Duration::from_secs(window_secs),
            min_calibration_samples: min_samples,
            ..Default::default()
        })
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [0.3, 0.1, 0.5]), 0.3);
        assert!((median(&mut [0.28, 0.32, 0.28, 0.32]) - 0.30).abs() < 1e-6);
    }

    #[test]
    fn test_baseline_is_median_and_threshold_scaled() {
        let mut cal = calibrator(10, 3);
        for (i, value) in [0.25, 0.30, 0.35, 0.30, 0.30].iter().enumerate() {
            cal.observe(Duration::from_secs(i as u64), *value, true);
        }
        assert!(cal.is_complete(Duration::from_secs(10)));

        let result = cal.finish(Duration::from_secs(10)).unwrap();
        assert!((result.baseline - 0.30).abs() < 1e-6);
        assert!((result.threshold - 0.21).abs() < 1e-6);
    }

    #[test]
    fn test_closed_eye_and_no_face_samples_excluded() {
        let mut cal = calibrator(10, 1);
        cal.observe(Duration::from_secs(0), 0.30, true);
        cal.observe(Duration::from_secs(1), 0.05, true); // below the open-eye floor
        cal.observe(Duration::from_secs(2), 0.90, false); // no face
        assert_eq!(cal.sample_count(), 1);
    }

    #[test]
    fn test_timer_runs_through_detection_failures() {
        let mut cal = calibrator(10, 1);
        cal.observe(Duration::from_secs(0), 0.0, false);
        assert!((cal.progress(Duration::from_secs(5)) - 0.5).abs() < 1e-6);
        assert!(cal.is_complete(Duration::from_secs(10)));
    }

    #[test]
    fn test_insufficient_samples_restart_window() {
        let mut cal = calibrator(10, 5);
        cal.observe(Duration::from_secs(0), 0.30, true);

        let err = cal.finish(Duration::from_secs(10)).unwrap_err();
        assert!(matches!(
            err,
            FatigueError::InsufficientCalibration { collected: 1, required: 5 }
        ));

        // Re-armed: a fresh window runs from the failure point.
        assert!(!cal.is_complete(Duration::from_secs(15)));
        assert_eq!(cal.sample_count(), 0);
        for i in 0..5 {
            cal.observe(Duration::from_secs(11 + i), 0.30, true);
        }
        assert!(cal.is_complete(Duration::from_secs(20)));
        assert!(cal.finish(Duration::from_secs(20)).is_ok());
    }
}
