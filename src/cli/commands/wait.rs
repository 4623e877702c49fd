use super::Services;
use crate::cli::ui;
use anyhow::Result;
use clap::Args;
use compute_cli::api::{ComputationState, ComputationWaiter};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Args)]
pub struct WaitArgs {
    /// Computation to wait for
    pub computation_id: String,
    /// Delay between status polls, in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// Give up after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

pub async fn wait_command(args: WaitArgs, services: &Services) -> Result<ExitCode> {
    let mut budget = services.polling.wait;
    if let Some(interval_ms) = args.interval_ms {
        budget.poll_interval = Duration::from_millis(interval_ms);
    }
    if let Some(timeout_secs) = args.timeout_secs {
        budget.max_total_wait = Duration::from_secs(timeout_secs);
    }

    let waiter = ComputationWaiter::new(services.client.clone());
    match waiter.wait(&args.computation_id, budget).await {
        Ok(status) if status.state == ComputationState::Succeeded => {
            ui::success(&format!("Computation {} succeeded", args.computation_id));
            if let Some(result_ref) = status.result_ref {
                println!("  result: {}", result_ref);
            }
            Ok(ExitCode::SUCCESS)
        }
        Ok(status) => {
            ui::failure(&format!(
                "Computation {} {}",
                args.computation_id, status.state
            ));
            Ok(ExitCode::FAILURE)
        }
        Err(e) if e.is_timeout() => {
            ui::failure(&e.to_string());
            Ok(ExitCode::from(124))
        }
        Err(e) => {
            ui::failure(&format!("Waiting on {} failed: {}", args.computation_id, e));
            Ok(ExitCode::FAILURE)
        }
    }
}
