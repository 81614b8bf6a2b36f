//! Fatigue scoring and event-classification engine
//!
//! Converts a stream of per-frame eye-openness samples into a bounded
//! fatigue score and a hysteretic alarm level:
//! - personalized baseline calibration (median over a warm-up window)
//! - OPEN/CLOSED eye-state tracking producing closure events
//! - event classification (normal blink, long blink, micro-sleep,
//!   rapid-blink cluster)
//! - cumulative score with increment dampening, time-proportional decay,
//!   and a wide-eye recovery boost
//! - WARNING/CRITICAL alarm derivation with a silence latch
//!
//! The engine is pure computation over in-memory state: one serialized
//! stream of samples drives it through [`FatigueEngine::tick`], it never
//! blocks or performs I/O, and each engine instance is fully independent.

pub mod alarm;
pub mod analysis;
pub mod calibration;
pub mod classifier;
pub mod config;
pub mod score;
pub mod state;
pub mod tracker;

pub use alarm::{AlarmLevel, AlarmMachine};
pub use analysis::{AlarmTransition, EventRecord, FrameAnalysis};
pub use calibration::{BaselineCalibrator, CalibrationResult};
pub use classifier::{EventClassifier, FatigueEvent};
pub use config::EngineConfig;
pub use score::ScoreEngine;
pub use state::{SessionPhase, SessionStats};
pub use tracker::{ClosureEvent, EyeStateTracker};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Engine error types
///
/// Every variant is recoverable: a failed tick reports upward and the next
/// sample is processed normally.
#[derive(Error, Debug)]
pub enum FatigueError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("insufficient calibration data: {collected} usable samples, need {required}")]
    InsufficientCalibration { collected: usize, required: usize },

    #[error("out-of-order sample: {timestamp:?} precedes {last:?}")]
    OutOfOrderSample { timestamp: Duration, last: Duration },
}

/// One per-frame measurement from the upstream detector.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic time since session start
    pub timestamp: Duration,

    /// Dimensionless eye-openness ratio (higher = more open)
    pub openness: f32,

    /// False marks a frame with no usable signal, not closed eyes
    pub face_detected: bool,
}

/// Phase-dependent engine state.
enum PhaseState {
    Calibrating(BaselineCalibrator),
    Grace {
        calibration: CalibrationResult,
        since: Duration,
    },
    Monitoring(Monitoring),
}

/// Everything the engine carries while the session is live.
struct Monitoring {
    calibration: CalibrationResult,
    tracker: EyeStateTracker,
    classifier: EventClassifier,
    score: ScoreEngine,
    alarm: AlarmMachine,
    stats: SessionStats,
    current_closure: Duration,
}

impl Monitoring {
    fn new(config: &EngineConfig, calibration: CalibrationResult, started_at: Duration) -> Self {
        Self {
            calibration,
            tracker: EyeStateTracker::new(calibration.threshold),
            classifier: EventClassifier::new(config),
            score: ScoreEngine::new(config, started_at),
            alarm: AlarmMachine::new(config),
            stats: SessionStats::default(),
            current_closure: Duration::ZERO,
        }
    }

    /// Process one sample: decay first, then any events this tick produced.
    fn tick(&mut self, config: &EngineConfig, sample: Sample) -> FrameAnalysis {
        let now = sample.timestamp;
        let mut events = Vec::new();

        if sample.face_detected {
            self.score
                .decay(now, Some(sample.openness), self.calibration.baseline);

            if let Some(closure) = self.tracker.observe(now, sample.openness) {
                self.current_closure = closure.duration;
                self.stats.record_blink(closure.end);
                let (primary, cluster) = self.classifier.classify(&closure);
                if matches!(primary, FatigueEvent::MicroSleep { .. }) {
                    self.stats.microsleep_count += 1;
                }
                events.push(self.apply_event(config, primary, now));
                if let Some(cluster) = cluster {
                    events.push(self.apply_event(config, cluster, now));
                }
            }

            // Ongoing micro-sleep: an operator asleep with closed eyes must
            // be scored before the eyes reopen. The closure clock rebases so
            // the same closure does not re-fire every frame.
            if let Some(ongoing) = self.tracker.ongoing_closure(now) {
                self.current_closure = ongoing;
                if ongoing >= config.microsleep_min {
                    self.stats.microsleep_count += 1;
                    self.tracker.rebase_closure(now);
                    events.push(self.apply_event(
                        config,
                        FatigueEvent::MicroSleep { duration: ongoing },
                        now,
                    ));
                }
            }
        } else {
            // Stale signal: the closure timer must not keep running.
            self.tracker.abandon();
            self.score.decay(now, None, self.calibration.baseline);
        }

        self.classifier.prune(now);
        self.stats.prune(now);

        let previous = self.alarm.level();
        let level = self.alarm.evaluate(self.score.value());
        let transition = (level != previous).then(|| AlarmTransition {
            from: previous,
            to: level,
            score: self.score.value(),
            trigger: events.last().map(|record| record.event.clone()),
        });

        FrameAnalysis {
            phase: SessionPhase::Monitoring,
            calibration_progress: 1.0,
            face_detected: sample.face_detected,
            openness: sample.openness,
            baseline: self.calibration.baseline,
            threshold: self.calibration.threshold,
            closure_duration: self.current_closure,
            blinks_last_minute: self.stats.blinks_last_minute(),
            microsleep_count: self.stats.microsleep_count,
            events,
            score: self.score.value(),
            alarm_level: level,
            alarm_latched: self.alarm.is_latched(),
            transition,
        }
    }

    fn apply_event(
        &mut self,
        config: &EngineConfig,
        event: FatigueEvent,
        at: Duration,
    ) -> EventRecord {
        let score_before = self.score.value();
        if let Some(points) = event.base_points(config) {
            self.score.apply(points);
        }
        let score_after = self.score.value();
        info!(event = event.label(), score_before, score_after, "fatigue event");
        EventRecord {
            event,
            at,
            score_before,
            score_after,
        }
    }
}

/// Fatigue analysis engine
///
/// Owns all session state behind a single mutation entry point. Create one
/// per operator session; [`FatigueEngine::reset`] returns it to a fresh
/// calibration on operator change.
pub struct FatigueEngine {
    config: EngineConfig,
    phase: PhaseState,
    last_timestamp: Option<Duration>,
}

impl FatigueEngine {
    /// Create an engine, rejecting inconsistent configuration whole.
    pub fn new(config: EngineConfig) -> Result<Self, FatigueError> {
        config.validate()?;
        Ok(Self {
            phase: PhaseState::Calibrating(BaselineCalibrator::new(&config)),
            config,
            last_timestamp: None,
        })
    }

    /// Process one sample and return the per-tick snapshot.
    ///
    /// Out-of-order samples are rejected as reported no-ops: no clock, score,
    /// or state advances, and the next in-order sample proceeds normally.
    pub fn tick(&mut self, sample: Sample) -> Result<FrameAnalysis, FatigueError> {
        if let Some(last) = self.last_timestamp {
            if sample.timestamp < last {
                warn!(timestamp = ?sample.timestamp, ?last, "out-of-order sample rejected");
                return Err(FatigueError::OutOfOrderSample {
                    timestamp: sample.timestamp,
                    last,
                });
            }
        }
        self.last_timestamp = Some(sample.timestamp);

        // Grace expiry is checked up front so the expiring sample is already
        // processed under MONITORING.
        if let PhaseState::Grace { calibration, since } = &self.phase {
            let (calibration, since) = (*calibration, *since);
            if sample.timestamp.saturating_sub(since) >= self.config.grace_period {
                info!("grace period over, monitoring started");
                self.phase = PhaseState::Monitoring(Monitoring::new(
                    &self.config,
                    calibration,
                    sample.timestamp,
                ));
            }
        }

        match &mut self.phase {
            PhaseState::Calibrating(calibrator) => {
                calibrator.observe(sample.timestamp, sample.openness, sample.face_detected);
                let progress = calibrator.progress(sample.timestamp);
                if calibrator.is_complete(sample.timestamp) {
                    let calibration = calibrator.finish(sample.timestamp)?;
                    self.phase = PhaseState::Grace {
                        calibration,
                        since: sample.timestamp,
                    };
                    return Ok(FrameAnalysis {
                        phase: SessionPhase::Grace,
                        calibration_progress: 1.0,
                        face_detected: sample.face_detected,
                        openness: sample.openness,
                        baseline: calibration.baseline,
                        threshold: calibration.threshold,
                        ..Default::default()
                    });
                }
                Ok(FrameAnalysis {
                    phase: SessionPhase::Calibrating,
                    calibration_progress: progress,
                    face_detected: sample.face_detected,
                    openness: sample.openness,
                    ..Default::default()
                })
            }
            PhaseState::Grace { calibration, .. } => Ok(FrameAnalysis {
                phase: SessionPhase::Grace,
                calibration_progress: 1.0,
                face_detected: sample.face_detected,
                openness: sample.openness,
                baseline: calibration.baseline,
                threshold: calibration.threshold,
                ..Default::default()
            }),
            PhaseState::Monitoring(monitoring) => Ok(monitoring.tick(&self.config, sample)),
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current session phase.
    pub fn phase(&self) -> SessionPhase {
        match &self.phase {
            PhaseState::Calibrating(_) => SessionPhase::Calibrating,
            PhaseState::Grace { .. } => SessionPhase::Grace,
            PhaseState::Monitoring(_) => SessionPhase::Monitoring,
        }
    }

    /// Calibration result, once the warm-up window has completed.
    pub fn calibration(&self) -> Option<CalibrationResult> {
        match &self.phase {
            PhaseState::Calibrating(_) => None,
            PhaseState::Grace { calibration, .. } => Some(*calibration),
            PhaseState::Monitoring(monitoring) => Some(monitoring.calibration),
        }
    }

    /// Current fatigue score (0 before monitoring begins).
    pub fn score(&self) -> f32 {
        match &self.phase {
            PhaseState::Monitoring(monitoring) => monitoring.score.value(),
            _ => score::SCORE_MIN,
        }
    }

    /// Current alarm level.
    pub fn alarm_level(&self) -> AlarmLevel {
        match &self.phase {
            PhaseState::Monitoring(monitoring) => monitoring.alarm.level(),
            _ => AlarmLevel::Normal,
        }
    }

    /// Return to a fresh calibration (operator change).
    pub fn reset(&mut self) {
        info!("engine reset");
        self.phase = PhaseState::Calibrating(BaselineCalibrator::new(&self.config));
        self.last_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(50);

    fn test_config() -> EngineConfig {
        EngineConfig {
            calibration_window: Duration::from_secs(2),
            grace_period: Duration::from_millis(200),
            ..Default::default()
        }
    }

    struct Harness {
        engine: FatigueEngine,
        now: Duration,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                engine: FatigueEngine::new(test_config()).unwrap(),
                now: Duration::ZERO,
            }
        }

        /// Drive through calibration and grace at resting openness 0.30.
        fn calibrated() -> Self {
            let mut harness = Self::new();
            for _ in 0..10_000 {
                let analysis = harness.step(0.30, true);
                if analysis.phase == SessionPhase::Monitoring {
                    return harness;
                }
            }
            panic!("engine never reached monitoring");
        }

        fn step(&mut self, openness: f32, face_detected: bool) -> FrameAnalysis {
            self.now += STEP;
            self.engine
                .tick(Sample {
                    timestamp: self.now,
                    openness,
                    face_detected,
                })
                .unwrap()
        }

        /// One blink: eyes closed for `closed_ms`, then reopened.
        fn blink(&mut self, closed_ms: u64) -> Vec<FrameAnalysis> {
            let mut ticks = Vec::new();
            let frames = closed_ms / STEP.as_millis() as u64;
            for _ in 0..frames {
                ticks.push(self.step(0.05, true));
            }
            ticks.push(self.step(0.30, true));
            ticks
        }
    }

    #[test]
    fn test_session_walks_through_phases() {
        let mut harness = Harness::new();

        let first = harness.step(0.30, true);
        assert_eq!(first.phase, SessionPhase::Calibrating);
        assert_eq!(first.calibration_progress, 0.0);

        let mut last_progress = 0.0;
        let mut saw_grace = false;
        for _ in 0..10_000 {
            let analysis = harness.step(0.30, true);
            assert!(analysis.calibration_progress >= last_progress);
            last_progress = analysis.calibration_progress;
            saw_grace |= analysis.phase == SessionPhase::Grace;
            if analysis.phase == SessionPhase::Monitoring {
                break;
            }
        }
        assert!(saw_grace);

        let calibration = harness.engine.calibration().unwrap();
        assert!((calibration.baseline - 0.30).abs() < 1e-6);
        assert!((calibration.threshold - 0.21).abs() < 1e-6);
        assert_eq!(harness.engine.score(), 0.0);
    }

    #[test]
    fn test_normal_blink_counts_but_never_scores() {
        let mut harness = Harness::calibrated();
        let ticks = harness.blink(200);

        let events: Vec<_> = ticks.iter().flat_map(|t| &t.events).collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].event, FatigueEvent::NormalBlink { .. }));
        assert_eq!(events[0].score_before, events[0].score_after);
        assert_eq!(harness.engine.score(), 0.0);
        assert_eq!(ticks.last().unwrap().blinks_last_minute, 1);
    }

    #[test]
    fn test_long_blink_scores_ten() {
        let mut harness = Harness::calibrated();
        let ticks = harness.blink(1000);

        let reopen = ticks.last().unwrap();
        assert_eq!(reopen.events.len(), 1);
        assert!(matches!(
            reopen.events[0].event,
            FatigueEvent::LongBlink { .. }
        ));
        assert_eq!(reopen.score, 10.0);
    }

    #[test]
    fn test_microsleep_fires_while_eyes_still_closed() {
        let mut harness = Harness::calibrated();

        let mut fired = None;
        for _ in 0..60 {
            let analysis = harness.step(0.05, true);
            if !analysis.events.is_empty() {
                fired = Some(analysis);
                break;
            }
        }

        let analysis = fired.expect("micro-sleep never fired");
        assert!(matches!(
            analysis.events[0].event,
            FatigueEvent::MicroSleep { .. }
        ));
        // Decay runs first on a zero score, so the increment lands whole.
        assert_eq!(analysis.score, 40.0);
        assert_eq!(analysis.microsleep_count, 1);

        let transition = analysis.transition.expect("alarm should transition");
        assert_eq!(transition.from, AlarmLevel::Normal);
        assert_eq!(transition.to, AlarmLevel::Warning);
        assert_eq!(transition.score, 40.0);
        assert!(matches!(
            transition.trigger,
            Some(FatigueEvent::MicroSleep { .. })
        ));
    }

    #[test]
    fn test_warning_silences_only_below_silence_threshold() {
        let mut harness = Harness::calibrated();

        // Ride a micro-sleep up to the latch, then recover with wide eyes.
        for _ in 0..60 {
            if !harness.step(0.05, true).events.is_empty() {
                break;
            }
        }
        assert_eq!(harness.engine.alarm_level(), AlarmLevel::Warning);

        for _ in 0..200 {
            let analysis = harness.step(0.40, true);
            match analysis.alarm_level {
                AlarmLevel::Warning => assert!(analysis.score >= 40.0),
                AlarmLevel::Normal => {
                    assert!(analysis.score < 40.0);
                    return;
                }
                AlarmLevel::Critical => panic!("decay must never escalate"),
            }
        }
        panic!("alarm never silenced");
    }

    #[test]
    fn test_cluster_fires_exactly_once_per_window() {
        let mut harness = Harness::calibrated();

        let mut clusters = 0;
        for _ in 0..7 {
            for tick in harness.blink(200) {
                clusters += tick
                    .events
                    .iter()
                    .filter(|r| matches!(r.event, FatigueEvent::RapidBlinkCluster { .. }))
                    .count();
            }
            // 600 ms of open eyes between blinks
            for _ in 0..12 {
                harness.step(0.30, true);
            }
        }
        assert_eq!(clusters, 1);

        // An eighth blink inside the same window stays quiet.
        for tick in harness.blink(200) {
            assert!(!tick
                .events
                .iter()
                .any(|r| matches!(r.event, FatigueEvent::RapidBlinkCluster { .. })));
        }
    }

    #[test]
    fn test_signal_loss_discards_closure() {
        let mut harness = Harness::calibrated();

        // Closure begins, then the face disappears mid-closure.
        harness.step(0.05, true);
        harness.step(0.05, true);
        let lost = harness.step(0.0, false);
        assert_eq!(lost.status_label(), "NO SIGNAL");

        // Reopening later must not emit a phantom closure.
        for _ in 0..10 {
            let analysis = harness.step(0.30, true);
            assert!(analysis.events.is_empty());
        }
        assert_eq!(harness.engine.score(), 0.0);
    }

    #[test]
    fn test_out_of_order_sample_is_reported_noop() {
        let mut harness = Harness::calibrated();
        harness.step(0.30, true);
        let score_before = harness.engine.score();

        let stale = Sample {
            timestamp: harness.now - STEP,
            openness: 0.05,
            face_detected: true,
        };
        let err = harness.engine.tick(stale).unwrap_err();
        assert!(matches!(err, FatigueError::OutOfOrderSample { .. }));
        assert_eq!(harness.engine.score(), score_before);

        // The stream continues normally afterwards.
        let analysis = harness.step(0.30, true);
        assert_eq!(analysis.phase, SessionPhase::Monitoring);
    }

    #[test]
    fn test_insufficient_calibration_surfaces_and_retries() {
        let mut harness = Harness::new();

        // A whole window with no face: the completion tick reports the
        // failure and a fresh window starts.
        let mut failed = false;
        for _ in 0..60 {
            harness.now += STEP;
            let result = harness.engine.tick(Sample {
                timestamp: harness.now,
                openness: 0.0,
                face_detected: false,
            });
            if let Err(FatigueError::InsufficientCalibration { collected, required }) = result {
                assert_eq!(collected, 0);
                assert_eq!(required, 10);
                failed = true;
                break;
            }
        }
        assert!(failed);
        assert_eq!(harness.engine.phase(), SessionPhase::Calibrating);

        // With the face back, the retried window completes.
        for _ in 0..10_000 {
            if harness.step(0.30, true).phase == SessionPhase::Monitoring {
                break;
            }
        }
        assert_eq!(harness.engine.phase(), SessionPhase::Monitoring);
        assert!(harness.engine.calibration().is_some());
    }

    #[test]
    fn test_grace_runs_no_detection() {
        let mut harness = Harness::new();

        // Calibrate, then hold the eyes closed through grace.
        let mut in_grace = false;
        for _ in 0..10_000 {
            let openness = if in_grace { 0.05 } else { 0.30 };
            let analysis = harness.step(openness, true);
            match analysis.phase {
                SessionPhase::Grace => {
                    in_grace = true;
                    assert!(analysis.events.is_empty());
                }
                SessionPhase::Monitoring => {
                    // The closure clock starts at monitoring, not in grace.
                    assert!(analysis.closure_duration <= STEP);
                    return;
                }
                SessionPhase::Calibrating => {}
            }
        }
        panic!("engine never reached monitoring");
    }

    #[test]
    fn test_reset_returns_to_calibration() {
        let mut harness = Harness::calibrated();
        harness.engine.reset();
        assert_eq!(harness.engine.phase(), SessionPhase::Calibrating);
        assert_eq!(harness.engine.score(), 0.0);
        assert!(harness.engine.calibration().is_none());
    }
}
