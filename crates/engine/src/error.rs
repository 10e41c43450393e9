// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the worker engine

use std::fmt;
use std::time::Duration;
use tb_adapters::{BrokerError, HandlerError};
use tb_core::{format_duration, ConfigError, JobError, JobKey, ResultShapeError, WorkerState};
use thiserror::Error;

/// Failure while invoking the host handler for one job
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("handler failed: {0}")]
    Handler(#[from] HandlerError),
    #[error("handler panicked: {0}")]
    Panicked(String),
    #[error("handler timed out after {}", format_duration(*.0))]
    Timeout(Duration),
    #[error("handler task was cancelled")]
    Cancelled,
    #[error(transparent)]
    ResultShape(#[from] ResultShapeError),
}

/// Why a job is being failed. The display text is the message sent with the
/// fail command.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Extraction(#[from] JobError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error("{0}")]
    Rejected(String),
    #[error("complete command failed: {0}")]
    Complete(BrokerError),
}

/// A complete or fail command that could not be delivered
#[derive(Debug, Clone, Error)]
#[error("{command} command for job {key} failed: {source}")]
pub struct TerminalCommandError {
    pub key: JobKey,
    pub command: &'static str,
    #[source]
    pub source: BrokerError,
}

/// Errors from the lifecycle manager
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("adapter is disabled")]
    Disabled,
    #[error("manager already initialized")]
    AlreadyInitialized,
    #[error("manager not initialized")]
    NotInitialized,
    #[error("connection for {service_type} failed: {source}")]
    Connection {
        service_type: String,
        #[source]
        source: BrokerError,
    },
    #[error("worker {worker}: cannot transition from {from} to {to}")]
    InvalidTransition {
        worker: String,
        from: WorkerState,
        to: WorkerState,
    },
    #[error("worker not found: {0}")]
    WorkerNotFound(String),
    #[error(transparent)]
    TerminalCommand(#[from] TerminalCommandError),
    #[error("worker task failed: {0}")]
    WorkerTask(String),
    #[error("closing connection for {service_type} failed: {source}")]
    Close {
        service_type: String,
        #[source]
        source: BrokerError,
    },
    #[error("{} worker(s) failed to start (running: [{}]): {}", .failures.len(), .started.join(", "), join_failures(.failures))]
    PartialStart {
        /// Workers that are open after the call
        started: Vec<String>,
        failures: Vec<WorkerFailure>,
    },
    #[error("{} worker(s) failed to stop cleanly: {}", .failures.len(), join_failures(.failures))]
    Shutdown { failures: Vec<WorkerFailure> },
}

/// First error recorded for one worker during a lifecycle transition
#[derive(Debug)]
pub struct WorkerFailure {
    pub service_type: String,
    pub error: LifecycleError,
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.service_type, self.error)
    }
}

fn join_failures(failures: &[WorkerFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
