//! Drowsiness Monitor Runner
//!
//! Wires the scripted capture producer through the sample queue into the
//! fatigue engine and the alert dispatcher. The producer task pushes frames
//! at the configured rate; the consumer loop is the only place engine ticks
//! happen, so no two ticks ever interleave.

pub mod settings;
pub mod signal;

pub use settings::MonitorSettings;
pub use signal::{demo_script, ScriptSegment, ScriptedEyeSignal, SegmentKind};

use alerting::AlertDispatcher;
use chrono::{DateTime, Utc};
use fatigue_core::{FatigueEngine, FrameAnalysis};
use sample_queue::SampleQueue;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Aggregate session outcome
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub ticks: u64,
    pub events: u64,
    pub transitions: u64,
    pub tick_errors: u64,
    pub peak_score: f32,
    pub final_score: f32,
}

/// Event notification line for logging consumers
#[derive(Debug, Serialize)]
struct EventNotification<'a> {
    wall_time: DateTime<Utc>,
    session_secs: f64,
    event: &'a str,
    duration_ms: Option<u128>,
    score_before: f32,
    score_after: f32,
}

/// Run one replay session end to end.
pub async fn run_session(settings: MonitorSettings) -> anyhow::Result<SessionSummary> {
    let engine_config = settings.engine_config();
    let mut engine = FatigueEngine::new(engine_config.clone())?;
    let mut dispatcher = AlertDispatcher::new(settings.alert_config());
    let queue = Arc::new(SampleQueue::new(settings.queue_capacity));

    let total = engine_config.calibration_window
        + engine_config.grace_period
        + Duration::from_secs_f32(settings.session_secs);
    let script = demo_script(engine_config.calibration_window, engine_config.grace_period);
    let eye_signal = ScriptedEyeSignal::new(settings.fps, total, 0.30, script);

    let frame_interval = Duration::from_secs_f64(1.0 / settings.fps as f64);
    let producer_queue = Arc::clone(&queue);
    let producer = tokio::spawn(async move {
        let mut ticker = time::interval(frame_interval);
        for sample in eye_signal {
            ticker.tick().await;
            producer_queue.push(sample);
        }
    });

    let mut summary = SessionSummary::default();
    loop {
        while let Some(sample) = queue.pop() {
            match engine.tick(sample) {
                Ok(analysis) => {
                    summary.ticks += 1;
                    summary.peak_score = summary.peak_score.max(analysis.score);
                    summary.final_score = analysis.score;
                    emit_notifications(&analysis, &mut summary);

                    if let Some(action) =
                        dispatcher.on_level(analysis.alarm_level, sample.timestamp)
                    {
                        info!(
                            ?action,
                            score = analysis.score,
                            status = analysis.status_label(),
                            "audio action"
                        );
                    }
                }
                Err(error) => {
                    summary.tick_errors += 1;
                    warn!(%error, "tick rejected");
                }
            }
        }
        if producer.is_finished() && queue.is_empty() {
            break;
        }
        time::sleep(frame_interval).await;
    }
    producer.await?;

    Ok(summary)
}

/// Forward this tick's events and any alarm transition to consumers.
fn emit_notifications(analysis: &FrameAnalysis, summary: &mut SessionSummary) {
    for record in &analysis.events {
        summary.events += 1;
        let line = EventNotification {
            wall_time: Utc::now(),
            session_secs: record.at.as_secs_f64(),
            event: record.event.label(),
            duration_ms: record.event.duration().map(|d| d.as_millis()),
            score_before: record.score_before,
            score_after: record.score_after,
        };
        match serde_json::to_string(&line) {
            Ok(json) => info!(target: "events", "{json}"),
            Err(error) => warn!(%error, "event serialization failed"),
        }
    }

    if let Some(transition) = &analysis.transition {
        summary.transitions += 1;
        info!(
            from = transition.from.as_str(),
            to = transition.to.as_str(),
            score = transition.score,
            "alarm transition"
        );
    }
}
