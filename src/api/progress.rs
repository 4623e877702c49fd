//! Staged progress tracking for remote tasks.
//!
//! A [`ProgressTracker`] polls a task's progress snapshots and turns them into
//! a stream of [`ProgressEvent`]s ("stage X of N, step Y of M") delivered to a
//! caller-supplied [`ProgressSink`]. It runs either inline via
//! [`ProgressTracker::track`] or in the background via
//! [`ProgressTracker::track_async`], which returns a [`TrackerHandle`].
//!
//! Cancellation is cooperative: it is checked before every fetch and after
//! every fetch returns, and it cuts interval sleeps short. A fetch already in
//! flight is allowed to finish; its result is discarded without emitting
//! anything.

use super::client::RemoteTaskClient;
use super::error::{Error, Result};
use super::models::StageProgress;
use super::resilience::{ErrorBudget, TrackerConfig, backoff_delay};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Progress notifications, in the order they happen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A stage display was opened. `previous_stage` is set when this replaces
    /// an open stage.
    StageStarted {
        stage_number: u32,
        num_stages: u32,
        stage_name: String,
        num_steps: u32,
        step_number: u32,
        previous_stage: Option<u32>,
    },
    /// The step counter of the open stage moved. `advanced` is zero when the
    /// platform reported a lower step than before.
    StepAdvanced {
        stage_number: u32,
        step_number: u32,
        num_steps: u32,
        advanced: u32,
    },
    StageFinished {
        stage_number: u32,
    },
    /// The task stopped running
    Completed,
}

impl ProgressEvent {
    pub fn is_stage_transition(&self) -> bool {
        matches!(
            self,
            ProgressEvent::StageStarted {
                previous_stage: Some(_),
                ..
            }
        )
    }
}

/// Receives progress events from a tracker
pub trait ProgressSink {
    fn emit(&mut self, event: ProgressEvent);
}

impl ProgressSink for Vec<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        // receiver gone means nobody is watching anymore
        let _ = self.send(event);
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for Box<S> {
    fn emit(&mut self, event: ProgressEvent) {
        (**self).emit(event);
    }
}

/// Writes each event as a structured log line
#[derive(Debug, Clone)]
pub struct LogSink {
    task_id: String,
    correlation_id: String,
}

impl LogSink {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

impl ProgressSink for LogSink {
    fn emit(&mut self, event: ProgressEvent) {
        let log_data = json!({
            "correlation_id": self.correlation_id,
            "task_id": self.task_id,
            "progress": event,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        log::info!("Task Progress: {}", log_data);
    }
}

/// How a tracking loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The platform reported the task as no longer running
    Completed,
    Cancelled,
}

/// Loop-local view of the remote task
#[derive(Debug)]
struct TrackerState {
    task_id: String,
    current_stage: Option<u32>,
    steps_done_in_stage: u32,
    errors: ErrorBudget,
    running: bool,
}

impl TrackerState {
    fn new(task_id: &str, error_tolerance: u32) -> Self {
        Self {
            task_id: task_id.to_string(),
            current_stage: None,
            steps_done_in_stage: 0,
            errors: ErrorBudget::new(error_tolerance),
            running: true,
        }
    }

    fn apply<S: ProgressSink + ?Sized>(&mut self, progress: &StageProgress, sink: &mut S) {
        if self.current_stage != Some(progress.stage_number) {
            if let Some(previous) = self.current_stage {
                sink.emit(ProgressEvent::StageFinished {
                    stage_number: previous,
                });
            }
            sink.emit(ProgressEvent::StageStarted {
                stage_number: progress.stage_number,
                num_stages: progress.num_stages,
                stage_name: progress.stage_name.clone(),
                num_steps: progress.num_steps,
                step_number: progress.step_number,
                previous_stage: self.current_stage,
            });
            self.current_stage = Some(progress.stage_number);
            self.steps_done_in_stage = progress.step_number;
        } else if progress.step_number != self.steps_done_in_stage {
            // a lower step than before resets the counter, it is not an error
            let advanced = progress.step_number.saturating_sub(self.steps_done_in_stage);
            self.steps_done_in_stage = progress.step_number;
            sink.emit(ProgressEvent::StepAdvanced {
                stage_number: progress.stage_number,
                step_number: progress.step_number,
                num_steps: progress.num_steps,
                advanced,
            });
        }

        self.running = progress.running;
    }

    fn finish<S: ProgressSink + ?Sized>(&mut self, sink: &mut S) {
        if let Some(stage_number) = self.current_stage.take() {
            sink.emit(ProgressEvent::StageFinished { stage_number });
        }
        sink.emit(ProgressEvent::Completed);
    }
}

/// Polls one remote task's progress until it stops running or is cancelled
#[derive(Clone)]
pub struct ProgressTracker {
    client: Arc<dyn RemoteTaskClient>,
    config: TrackerConfig,
    cancel: CancellationToken,
}

impl ProgressTracker {
    pub fn new(client: Arc<dyn RemoteTaskClient>, config: TrackerConfig) -> Self {
        Self {
            client,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Ask the loop to stop at its next checkpoint. Clones of this tracker
    /// share the flag.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run the polling loop on the current task until the remote task stops
    /// running or the tracker is cancelled
    pub async fn track<S: ProgressSink + ?Sized>(
        &self,
        task_id: &str,
        sink: &mut S,
    ) -> Result<TrackOutcome> {
        let mut state = TrackerState::new(task_id, self.config.error_tolerance);
        log::debug!(
            "Tracking task {} every {:?} (error tolerance {})",
            task_id,
            self.config.poll_interval,
            self.config.error_tolerance
        );

        loop {
            if self.cancel.is_cancelled() {
                log::info!("Tracking of task {} cancelled", state.task_id);
                return Ok(TrackOutcome::Cancelled);
            }

            let fetched = self.client.fetch_progress(&state.task_id).await;

            if self.cancel.is_cancelled() {
                log::debug!("Discarding progress for task {} fetched after cancel", state.task_id);
                return Ok(TrackOutcome::Cancelled);
            }

            match fetched {
                Err(e) if e.is_transient() => {
                    if !state.errors.record_failure() {
                        log::error!(
                            "Giving up on task {} after {} consecutive errors: {}",
                            state.task_id,
                            state.errors.consecutive(),
                            e
                        );
                        return Err(Error::Fetch(e));
                    }
                    log::warn!(
                        "Progress fetch for task {} failed ({}/{}): {}",
                        state.task_id,
                        state.errors.consecutive(),
                        state.errors.tolerance(),
                        e
                    );
                    self.pause(backoff_delay(
                        self.config.poll_interval,
                        self.config.not_found_backoff,
                    ))
                    .await;
                    continue;
                }
                Err(e) => {
                    log::error!("Progress fetch for task {} failed: {}", state.task_id, e);
                    return Err(Error::Fetch(e));
                }
                Ok(snapshot) => {
                    state.errors.reset();
                    state.apply(&snapshot.normalize(), &mut *sink);

                    if !state.running {
                        state.finish(&mut *sink);
                        log::info!("Task {} finished", state.task_id);
                        return Ok(TrackOutcome::Completed);
                    }
                }
            }

            self.pause(self.config.poll_interval).await;
        }
    }

    /// Run the polling loop on a background task. The returned handle
    /// cancels the loop when dropped.
    pub fn track_async<S>(self, task_id: impl Into<String>, sink: S) -> TrackerHandle<S>
    where
        S: ProgressSink + Send + 'static,
    {
        let task_id = task_id.into();
        let cancel = self.cancel.clone();

        let task = tokio::spawn(async move {
            let mut sink = sink;
            let result = self.track(&task_id, &mut sink).await;
            (result, sink)
        });

        TrackerHandle {
            cancel,
            task: Some(task),
        }
    }

    /// Sleep for `duration`, waking early on cancellation
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.cancel.cancelled() => {}
        }
    }
}

/// Handle to a background tracking loop
#[derive(Debug)]
pub struct TrackerHandle<S> {
    cancel: CancellationToken,
    task: Option<JoinHandle<(Result<TrackOutcome>, S)>>,
}

impl<S> TrackerHandle<S> {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }

    /// Wait for the loop to end and take back the sink. Dropping the
    /// returned future before it completes cancels the loop.
    pub async fn join(mut self) -> Result<(TrackOutcome, S)> {
        let Some(task) = self.task.as_mut() else {
            return Err(Error::Join("tracker already joined".into()));
        };

        // the task stays in `self` until it finishes so Drop can still cancel
        let joined = task.await;
        self.task = None;

        match joined {
            Ok((Ok(outcome), sink)) => Ok((outcome, sink)),
            Ok((Err(e), _)) => Err(e),
            Err(e) => Err(Error::Join(e.to_string())),
        }
    }
}

impl<S> Drop for TrackerHandle<S> {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel.cancel();
        }
    }
}
