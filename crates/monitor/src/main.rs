//! Drowsiness Monitor - Main Entry Point

use monitor::{init_logging, run_session, MonitorSettings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== NeuroGuard Fatigue Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let settings = MonitorSettings::load()?;
    info!(
        fps = settings.fps,
        session_secs = settings.session_secs,
        "starting replay session"
    );

    let summary = run_session(settings).await?;
    info!(
        ticks = summary.ticks,
        events = summary.events,
        transitions = summary.transitions,
        tick_errors = summary.tick_errors,
        peak_score = summary.peak_score,
        final_score = summary.final_score,
        "session complete"
    );

    Ok(())
}
