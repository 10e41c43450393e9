// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job workers: one poll loop per service type, bound to its own broker
//! connection.

mod poll;

use crate::error::{LifecycleError, TerminalCommandError};
use crate::settings::WorkerSettings;
use crate::task::TaskAdapter;
use parking_lot::Mutex;
use poll::PollLoop;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tb_adapters::{BrokerClient, TaskHandler};
use tb_core::{JobKey, WorkerId, WorkerState};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Counters shared between a worker and its poll loop
#[derive(Debug, Default)]
pub(crate) struct WorkerStats {
    activated: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    command_errors: AtomicU64,
    duplicates: AtomicU64,
    /// Keys with a dispatch in progress
    in_flight: Mutex<HashSet<JobKey>>,
}

impl WorkerStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSnapshot {
    pub service_type: String,
    pub worker_name: WorkerId,
    pub state: WorkerState,
    pub in_flight: usize,
    pub activated: u64,
    pub completed: u64,
    pub failed: u64,
    pub command_errors: u64,
    /// Deliveries skipped because the key was already being dispatched
    pub duplicates: u64,
}

/// A polling worker for one service type.
///
/// Owns its broker connection. Dropping the worker cancels its poll loop.
pub struct JobWorker<B, H> {
    settings: Arc<WorkerSettings>,
    client: B,
    adapter: TaskAdapter<H>,
    state: WorkerState,
    stats: Arc<WorkerStats>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Option<TerminalCommandError>>>,
}

impl<B: BrokerClient, H: TaskHandler> JobWorker<B, H> {
    pub fn new(settings: WorkerSettings, client: B, handler: H) -> Self {
        let adapter = TaskAdapter::new(handler, settings.reply_schema, settings.job_timeout);
        Self {
            settings: Arc::new(settings),
            client,
            adapter,
            state: WorkerState::Created,
            stats: Arc::new(WorkerStats::default()),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn service_type(&self) -> &str {
        &self.settings.service_type
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn transition(&mut self, next: WorkerState) -> Result<(), LifecycleError> {
        if !self.state.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                worker: self.settings.service_type.clone(),
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(
            service_type = %self.settings.service_type,
            from = %self.state,
            to = %next,
            "worker state"
        );
        self.state = next;
        Ok(())
    }

    /// Open the poll loop. Only legal from `Created`.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        self.transition(WorkerState::Open)?;
        let poll = PollLoop {
            settings: Arc::clone(&self.settings),
            client: self.client.clone(),
            adapter: self.adapter.clone(),
            stats: Arc::clone(&self.stats),
            cancel: self.cancel.clone(),
        };
        self.task = Some(tokio::spawn(poll.run()));
        tracing::info!(
            service_type = %self.settings.service_type,
            worker = %self.settings.worker_name,
            "worker opened"
        );
        Ok(())
    }

    /// Signal the poll loop to stop. `Open` moves to `Closing`; every other
    /// state is left alone.
    pub fn begin_stop(&mut self) {
        if self.state.is_dispatching() && self.transition(WorkerState::Closing).is_ok() {
            self.cancel.cancel();
        }
    }

    /// Finish a stop begun with [`begin_stop`](Self::begin_stop): await the
    /// drain, then always close the connection.
    ///
    /// Returns the first error encountered. `Created` and `Closed` workers
    /// return immediately without broker I/O.
    pub async fn finish_stop(&mut self) -> Result<(), LifecycleError> {
        if self.state != WorkerState::Closing {
            return Ok(());
        }
        self.cancel.cancel();

        let mut first_error = None;
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(None) => {}
                Ok(Some(e)) => first_error = Some(LifecycleError::TerminalCommand(e)),
                Err(e) => first_error = Some(LifecycleError::WorkerTask(e.to_string())),
            }
        }
        if let Err(source) = self.client.close().await {
            tracing::warn!(service_type = %self.settings.service_type, error = %source, "close failed");
            if first_error.is_none() {
                first_error = Some(LifecycleError::Close {
                    service_type: self.settings.service_type.clone(),
                    source,
                });
            }
        }
        self.transition(WorkerState::Closed)?;
        tracing::info!(service_type = %self.settings.service_type, "worker closed");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// `Open → Closing → Closed`, awaiting in-flight jobs.
    pub async fn stop(&mut self) -> Result<(), LifecycleError> {
        self.begin_stop();
        self.finish_stop().await
    }

    /// Release the connection of a worker that never opened
    pub(crate) async fn close_unstarted(&self) {
        if self.state != WorkerState::Created {
            return;
        }
        if let Err(e) = self.client.close().await {
            tracing::warn!(service_type = %self.settings.service_type, error = %e, "close failed");
        }
    }

    pub fn snapshot(&self) -> WorkerSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        WorkerSnapshot {
            service_type: self.settings.service_type.clone(),
            worker_name: self.settings.worker_name.clone(),
            state: self.state,
            in_flight: self.stats.in_flight.lock().len(),
            activated: load(&self.stats.activated),
            completed: load(&self.stats.completed),
            failed: load(&self.stats.failed),
            command_errors: load(&self.stats.command_errors),
            duplicates: load(&self.stats.duplicates),
        }
    }
}

impl<B, H> Drop for JobWorker<B, H> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
