//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use compute_cli::api::{
    ComputationState, ComputationStatus, FetchError, IdentityError, IdentityProvider,
    ProgressSnapshot, RemoteTaskClient, TokenGrant,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Identity provider that hands out numbered tokens and counts exchanges
pub struct FakeProvider {
    expires_in: Duration,
    refresh_expires_in: Duration,
    latency: Duration,
    issued: AtomicUsize,
    acquires: AtomicUsize,
    refreshes: AtomicUsize,
    refresh_failure: Mutex<Option<IdentityError>>,
    acquire_failure: Mutex<Option<IdentityError>>,
    refresh_tokens_seen: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new(expires_in: Duration, refresh_expires_in: Duration) -> Self {
        Self {
            expires_in,
            refresh_expires_in,
            latency: Duration::ZERO,
            issued: AtomicUsize::new(0),
            acquires: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            refresh_failure: Mutex::new(None),
            acquire_failure: Mutex::new(None),
            refresh_tokens_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fail_refresh(&self, error: IdentityError) {
        *self.refresh_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_acquire(&self, error: IdentityError) {
        *self.acquire_failure.lock().unwrap() = Some(error);
    }

    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn refresh_tokens_seen(&self) -> Vec<String> {
        self.refresh_tokens_seen.lock().unwrap().clone()
    }

    async fn issue(&self, failure: &Mutex<Option<IdentityError>>) -> Result<TokenGrant, IdentityError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(error) = failure.lock().unwrap().clone() {
            return Err(error);
        }

        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TokenGrant {
            access_token: format!("access-{}", n),
            refresh_token: format!("refresh-{}", n),
            expires_in: self.expires_in,
            refresh_expires_in: self.refresh_expires_in,
        })
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn exchange_client_credentials(
        &self,
        _client_id: &str,
        _client_secret: &str,
    ) -> Result<TokenGrant, IdentityError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        self.issue(&self.acquire_failure).await
    }

    async fn exchange_password(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<TokenGrant, IdentityError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        self.issue(&self.acquire_failure).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, IdentityError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.refresh_tokens_seen
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        self.issue(&self.refresh_failure).await
    }
}

/// Task client replaying scripted responses. Once a script runs out its
/// last entry repeats.
pub struct ScriptedClient {
    latency: Duration,
    progress: Mutex<VecDeque<Result<ProgressSnapshot, FetchError>>>,
    last_progress: Mutex<Option<Result<ProgressSnapshot, FetchError>>>,
    computations: Mutex<VecDeque<Result<ComputationStatus, FetchError>>>,
    last_computation: Mutex<Option<Result<ComputationStatus, FetchError>>>,
    progress_calls: AtomicUsize,
    computation_calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            progress: Mutex::new(VecDeque::new()),
            last_progress: Mutex::new(None),
            computations: Mutex::new(VecDeque::new()),
            last_computation: Mutex::new(None),
            progress_calls: AtomicUsize::new(0),
            computation_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_progress(
        self,
        script: impl IntoIterator<Item = Result<ProgressSnapshot, FetchError>>,
    ) -> Self {
        self.progress.lock().unwrap().extend(script);
        self
    }

    pub fn with_computations(
        self,
        script: impl IntoIterator<Item = Result<ComputationStatus, FetchError>>,
    ) -> Self {
        self.computations.lock().unwrap().extend(script);
        self
    }

    pub fn progress_calls(&self) -> usize {
        self.progress_calls.load(Ordering::SeqCst)
    }

    pub fn computation_calls(&self) -> usize {
        self.computation_calls.load(Ordering::SeqCst)
    }
}

fn next_scripted<T: Clone>(
    script: &Mutex<VecDeque<T>>,
    last: &Mutex<Option<T>>,
) -> T {
    let mut last = last.lock().unwrap();
    if let Some(item) = script.lock().unwrap().pop_front() {
        *last = Some(item);
    }
    last.clone().expect("script must not be empty")
}

#[async_trait]
impl RemoteTaskClient for ScriptedClient {
    async fn fetch_progress(&self, _task_id: &str) -> Result<ProgressSnapshot, FetchError> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        next_scripted(&self.progress, &self.last_progress)
    }

    async fn fetch_computation(
        &self,
        _computation_id: &str,
    ) -> Result<ComputationStatus, FetchError> {
        self.computation_calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        next_scripted(&self.computations, &self.last_computation)
    }
}

pub fn snapshot(stage: u32, step: u32, num_steps: u32, running: bool) -> ProgressSnapshot {
    ProgressSnapshot {
        stage_number: Some(stage),
        num_stages: Some(2),
        stage_name: Some(format!("stage-{}", stage)),
        step_number: Some(step),
        num_steps: Some(num_steps),
        running,
    }
}

pub fn status(state: ComputationState) -> ComputationStatus {
    ComputationStatus {
        state,
        result_ref: None,
    }
}

pub fn not_found() -> FetchError {
    FetchError::NotFound("task not visible yet".into())
}
