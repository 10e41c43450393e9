// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker poll loop: activate jobs while there is capacity, dispatch
//! each on its own task, drain on cancellation.

use super::WorkerStats;
use crate::dispatch::{dispatch_job, DispatchOutcome};
use crate::error::TerminalCommandError;
use crate::settings::WorkerSettings;
use crate::task::TaskAdapter;
use std::sync::Arc;
use tb_adapters::{ActivateJobsRequest, BrokerClient, BrokerError, TaskHandler};
use tb_core::{Job, JobKey};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

type DispatchResult = Result<DispatchOutcome, TerminalCommandError>;

pub(super) struct PollLoop<B, H> {
    pub(super) settings: Arc<WorkerSettings>,
    pub(super) client: B,
    pub(super) adapter: TaskAdapter<H>,
    pub(super) stats: Arc<WorkerStats>,
    pub(super) cancel: CancellationToken,
}

/// Removes a key from the in-flight set when its dispatch ends
struct InFlightGuard {
    stats: Arc<WorkerStats>,
    key: JobKey,
}

impl InFlightGuard {
    fn acquire(stats: &Arc<WorkerStats>, key: JobKey) -> Option<Self> {
        if !stats.in_flight.lock().insert(key) {
            return None;
        }
        Some(Self {
            stats: Arc::clone(stats),
            key,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.stats.in_flight.lock().remove(&self.key);
    }
}

impl<B: BrokerClient, H: TaskHandler> PollLoop<B, H> {
    /// Run until cancelled. Returns the first terminal-command error seen
    /// while draining.
    pub(super) async fn run(self) -> Option<TerminalCommandError> {
        let span = tracing::info_span!(
            "worker.poll",
            service_type = %self.settings.service_type,
            worker = %self.settings.worker_name
        );
        async move {
            let permits = Arc::new(Semaphore::new(self.settings.job_concurrency.max(1) as usize));
            let mut in_flight: JoinSet<DispatchResult> = JoinSet::new();

            loop {
                if self.cancel.is_cancelled() {
                    break;
                }

                if let Some(capacity) = self.capacity(in_flight.len()) {
                    match self.activate(capacity).await {
                        Ok(jobs) => {
                            for job in jobs {
                                self.spawn_dispatch(&mut in_flight, &permits, job);
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "activation failed"),
                    }
                }

                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                        let _ = self.record(joined);
                    }
                    _ = tokio::time::sleep(self.settings.poll_interval) => {}
                }
            }

            tracing::info!(in_flight = in_flight.len(), "draining");
            let mut first_error = None;
            while let Some(joined) = in_flight.join_next().await {
                if let Err(e) = self.record(joined) {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
            first_error
        }
        .instrument(span)
        .await
    }

    /// Jobs to request now, once active jobs have drained to the poll threshold
    fn capacity(&self, in_flight: usize) -> Option<u32> {
        let in_flight = u32::try_from(in_flight).unwrap_or(u32::MAX);
        let threshold = self.settings.poll_threshold_jobs();
        let capacity = self.settings.max_active_jobs.saturating_sub(in_flight);
        if in_flight > threshold || capacity == 0 {
            tracing::trace!(in_flight, threshold, "above poll threshold");
            return None;
        }
        Some(capacity)
    }

    async fn activate(&self, max_jobs: u32) -> Result<Vec<Job>, BrokerError> {
        let request = ActivateJobsRequest {
            job_type: self.settings.service_type.clone(),
            worker: self.settings.worker_name.to_string(),
            max_jobs,
            timeout: self.settings.job_timeout,
            request_timeout: self.settings.request_timeout,
        };
        let limit = self.settings.activation_timeout;
        tokio::select! {
            _ = self.cancel.cancelled() => Ok(Vec::new()),
            result = tokio::time::timeout(limit, self.client.activate_jobs(&request)) => {
                result.unwrap_or(Err(BrokerError::Timeout(limit)))
            }
        }
    }

    /// Run one activated job on the join set, gated by the concurrency permits.
    ///
    /// A key that is already in flight is skipped. That delivery gets no
    /// complete or fail command of its own; the dispatch already running for
    /// the key sends the single terminal command, and the skip is counted in
    /// `duplicates`.
    fn spawn_dispatch(
        &self,
        in_flight: &mut JoinSet<DispatchResult>,
        permits: &Arc<Semaphore>,
        job: Job,
    ) {
        let key = job.key();
        let Some(guard) = InFlightGuard::acquire(&self.stats, key) else {
            WorkerStats::bump(&self.stats.duplicates);
            tracing::warn!(job_key = %key, "job already in flight, skipping duplicate delivery");
            return;
        };
        WorkerStats::bump(&self.stats.activated);

        let client = self.client.clone();
        let adapter = self.adapter.clone();
        let permits = Arc::clone(permits);
        let worker = self.settings.worker_name.to_string();
        let command_timeout = self.settings.request_timeout;
        in_flight.spawn(async move {
            let _guard = guard;
            // The semaphore is never closed
            let _permit = permits.acquire_owned().await.ok();
            dispatch_job(&client, &adapter, job, &worker, command_timeout).await
        });
    }

    fn record(&self, joined: Result<DispatchResult, JoinError>) -> Result<(), TerminalCommandError> {
        match joined {
            Ok(Ok(DispatchOutcome::Completed)) => WorkerStats::bump(&self.stats.completed),
            Ok(Ok(DispatchOutcome::Failed { .. })) => WorkerStats::bump(&self.stats.failed),
            Ok(Err(e)) => {
                WorkerStats::bump(&self.stats.command_errors);
                tracing::error!(job_key = %e.key, error = %e, "terminal command not delivered");
                return Err(e);
            }
            Err(e) => tracing::error!(error = %e, "dispatch task failed"),
        }
        Ok(())
    }
}
