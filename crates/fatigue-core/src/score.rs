//! Cumulative fatigue score
//!
//! Two serialized mutation paths: event increments (dampened above the
//! warning threshold) and continuous decay proportional to elapsed session
//! time. Within a tick the engine applies decay first, then any events
//! generated by that tick. The score is clamped to `[SCORE_MIN, SCORE_MAX]`
//! after every mutation.

use std::time::Duration;
use tracing::debug;

use crate::config::EngineConfig;

/// Score floor
pub const SCORE_MIN: f32 = 0.0;
/// Score ceiling
pub const SCORE_MAX: f32 = 100.0;

/// Bounded cumulative score owned by the engine for the session lifetime.
#[derive(Debug)]
pub struct ScoreEngine {
    score: f32,
    last_decay_at: Duration,
    warning_threshold: f32,
    dampening_factor: f32,
    decay_per_sec: f32,
    wide_eye_multiplier: f32,
    wide_eye_decay_boost: f32,
}

impl ScoreEngine {
    /// Create a zeroed score whose decay clock starts at `started_at`.
    pub fn new(config: &EngineConfig, started_at: Duration) -> Self {
        Self {
            score: SCORE_MIN,
            last_decay_at: started_at,
            warning_threshold: config.warning_threshold,
            dampening_factor: config.dampening_factor,
            decay_per_sec: config.decay_per_sec,
            wide_eye_multiplier: config.wide_eye_multiplier,
            wide_eye_decay_boost: config.wide_eye_decay_boost,
        }
    }

    /// Current score.
    pub fn value(&self) -> f32 {
        self.score
    }

    /// Advance the decay clock to `now`.
    ///
    /// The subtracted amount scales with elapsed session time, never with
    /// tick count, so the result is frame-rate independent. `openness` is
    /// `None` while no face is visible; the wide-eye recovery boost applies
    /// only to a measured openness above `baseline * wide_eye_multiplier`.
    pub fn decay(&mut self, now: Duration, openness: Option<f32>, baseline: f32) {
        let elapsed = now.saturating_sub(self.last_decay_at);
        self.last_decay_at = now;

        let mut rate = self.decay_per_sec;
        if let Some(openness) = openness {
            if baseline > 0.0 && openness > baseline * self.wide_eye_multiplier {
                rate *= self.wide_eye_decay_boost;
            }
        }
        self.score -= rate * elapsed.as_secs_f32();
        self.clamp();
    }

    /// Apply an event increment.
    ///
    /// The dampening comparison uses the score before this increment: when
    /// it already exceeds the warning threshold, the delta is scaled down.
    pub fn apply(&mut self, points: f32) {
        let points = if self.score > self.warning_threshold {
            points * self.dampening_factor
        } else {
            points
        };
        self.score += points;
        self.clamp();
        debug!(points, score = self.score, "score incremented");
    }

    fn clamp(&mut self) {
        self.score = self.score.clamp(SCORE_MIN, SCORE_MAX);
    }
}
