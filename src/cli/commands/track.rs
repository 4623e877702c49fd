use super::Services;
use crate::cli::ui::{self, ConsoleSink};
use anyhow::Result;
use clap::Args;
use compute_cli::api::{ProgressTracker, TrackOutcome};
use log::{info, warn};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Args)]
pub struct TrackArgs {
    /// Task to follow
    pub task_id: String,
    /// Delay between progress polls, in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// Consecutive transient failures tolerated before giving up
    #[arg(long)]
    pub error_tolerance: Option<u32>,
}

pub async fn track_command(args: TrackArgs, services: &Services) -> Result<ExitCode> {
    let mut config = services.polling.tracker.clone();
    if let Some(interval_ms) = args.interval_ms {
        config.poll_interval = Duration::from_millis(interval_ms);
    }
    if let Some(tolerance) = args.error_tolerance {
        config.error_tolerance = tolerance;
    }

    let tracker = ProgressTracker::new(services.client.clone(), config);
    let canceller = tracker.clone();
    let sink = ConsoleSink::new(args.task_id.clone());
    info!(
        "Tracking task {} (correlation id {})",
        args.task_id,
        sink.correlation_id()
    );

    let joined = tracker.track_async(args.task_id.clone(), sink).join();
    tokio::pin!(joined);

    let result = tokio::select! {
        result = &mut joined => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping tracker for task {}", args.task_id);
            canceller.cancel();
            joined.await
        }
    };

    match result {
        Ok((TrackOutcome::Completed, _)) => Ok(ExitCode::SUCCESS),
        Ok((TrackOutcome::Cancelled, _)) => {
            ui::failure(&format!("Stopped tracking task {}", args.task_id));
            Ok(ExitCode::from(130))
        }
        Err(e) => {
            ui::failure(&format!("Tracking task {} failed: {}", args.task_id, e));
            Ok(ExitCode::FAILURE)
        }
    }
}
