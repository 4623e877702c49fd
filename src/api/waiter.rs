use super::client::RemoteTaskClient;
use super::error::{Error, Result};
use super::models::{ComputationStatus, WaitBudget};
use std::sync::Arc;
use tokio::time::Instant;

/// Blocks until a computation reaches a terminal status or the wait budget
/// runs out.
///
/// Unlike the progress tracker this never retries: any fetch failure is
/// returned as-is, so automated callers fail loudly.
#[derive(Clone)]
pub struct ComputationWaiter {
    client: Arc<dyn RemoteTaskClient>,
}

impl ComputationWaiter {
    pub fn new(client: Arc<dyn RemoteTaskClient>) -> Self {
        Self { client }
    }

    /// Poll until the computation is succeeded, failed or cancelled.
    ///
    /// The budget is wall-clock time from this call, including sleeps and
    /// slow fetches. Running out of it yields [`Error::Timeout`], which says
    /// nothing about how the computation itself will end.
    pub async fn wait(&self, computation_id: &str, budget: WaitBudget) -> Result<ComputationStatus> {
        let started = Instant::now();
        let mut polls: u32 = 0;

        loop {
            let remaining = budget.max_total_wait.saturating_sub(started.elapsed());
            let status = match tokio::time::timeout(
                remaining,
                self.client.fetch_computation(computation_id),
            )
            .await
            {
                Ok(result) => result?,
                Err(_) => {
                    log::warn!(
                        "Status fetch for computation {} outlived the wait budget",
                        computation_id
                    );
                    return Err(timeout(computation_id, started));
                }
            };
            polls += 1;

            if status.state.is_terminal() {
                log::info!(
                    "Computation {} {} after {} polls",
                    computation_id,
                    status.state,
                    polls
                );
                return Ok(status);
            }
            log::debug!("Computation {} is {}", computation_id, status.state);

            tokio::time::sleep(budget.poll_interval).await;

            if started.elapsed() > budget.max_total_wait {
                log::warn!(
                    "Computation {} still {} after {:?} ({} polls)",
                    computation_id,
                    status.state,
                    budget.max_total_wait,
                    polls
                );
                return Err(timeout(computation_id, started));
            }
        }
    }
}

fn timeout(computation_id: &str, started: Instant) -> Error {
    Error::Timeout {
        computation_id: computation_id.to_string(),
        waited: started.elapsed(),
    }
}
