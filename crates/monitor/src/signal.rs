//! Deterministic eye-openness signal for session replay
//!
//! Produces samples at a fixed frame rate from a script of closure,
//! wide-eye, and signal-loss segments over a resting baseline. Drives the
//! full pipeline without a camera; no randomness, so every run of the same
//! script replays identically.

use fatigue_core::Sample;
use std::time::Duration;

/// Openness emitted during a scripted closure
const CLOSED_OPENNESS: f32 = 0.06;

/// Wide-open factor relative to the resting baseline
const WIDE_OPENNESS_FACTOR: f32 = 1.35;

/// What the eyes are doing during a script segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Closed,
    WideOpen,
    SignalLost,
}

/// One timed stretch of scripted behavior
#[derive(Debug, Clone, Copy)]
pub struct ScriptSegment {
    pub start: Duration,
    pub end: Duration,
    pub kind: SegmentKind,
}

/// Frame-by-frame sample generator
pub struct ScriptedEyeSignal {
    frame_interval: Duration,
    total: Duration,
    baseline: f32,
    frame: u64,
    segments: Vec<ScriptSegment>,
}

impl ScriptedEyeSignal {
    /// Create a signal running for `total` at `fps` frames per second.
    pub fn new(fps: u32, total: Duration, baseline: f32, segments: Vec<ScriptSegment>) -> Self {
        Self {
            frame_interval: Duration::from_secs_f64(1.0 / fps as f64),
            total,
            baseline,
            frame: 0,
            segments,
        }
    }
}

impl Iterator for ScriptedEyeSignal {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let timestamp =
            Duration::from_secs_f64(self.frame as f64 * self.frame_interval.as_secs_f64());
        if timestamp >= self.total {
            return None;
        }
        self.frame += 1;

        // Small deterministic wobble keeps the trace lively without RNG;
        // the median over any window stays at the baseline.
        let wobble = ((self.frame % 5) as f32 - 2.0) * 0.004;
        let mut openness = self.baseline + wobble;
        let mut face_detected = true;

        for segment in &self.segments {
            if timestamp >= segment.start && timestamp < segment.end {
                match segment.kind {
                    SegmentKind::Closed => openness = CLOSED_OPENNESS,
                    SegmentKind::WideOpen => openness = self.baseline * WIDE_OPENNESS_FACTOR,
                    SegmentKind::SignalLost => {
                        openness = 0.0;
                        face_detected = false;
                    }
                }
                break;
            }
        }

        Some(Sample {
            timestamp,
            openness,
            face_detected,
        })
    }
}

/// Demo script exercising every event class once monitoring begins:
/// scattered normal blinks, a long blink, a rapid-blink burst, a
/// micro-sleep, a signal dropout, and a wide-eye recovery stretch.
pub fn demo_script(calibration: Duration, grace: Duration) -> Vec<ScriptSegment> {
    let monitoring_start = calibration + grace;
    let span = |begin: f32, len: f32, kind: SegmentKind| ScriptSegment {
        start: monitoring_start + Duration::from_secs_f32(begin),
        end: monitoring_start + Duration::from_secs_f32(begin + len),
        kind,
    };

    let mut segments = vec![
        span(2.0, 0.2, SegmentKind::Closed),
        span(5.0, 0.2, SegmentKind::Closed),
        // long blink
        span(8.0, 1.2, SegmentKind::Closed),
        // micro-sleep
        span(22.0, 3.0, SegmentKind::Closed),
        span(27.0, 1.0, SegmentKind::SignalLost),
        // wide-eye recovery
        span(29.0, 8.0, SegmentKind::WideOpen),
    ];
    // rapid-blink burst
    for i in 0..7 {
        segments.push(span(12.0 + i as f32 * 0.9, 0.25, SegmentKind::Closed));
    }
    segments.sort_by_key(|segment| segment.start);
    segments
}
