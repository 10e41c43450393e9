// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker identity and lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Name a worker announces to the broker when activating jobs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for WorkerId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Names workers whose policy sets no `workerName`.
pub trait WorkerNameGen: Clone + Send + Sync {
    fn generate(&self, service_type: &str) -> WorkerId;
}

/// `<service type>-<8 hex chars>`, random per worker
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidWorkerNames;

impl WorkerNameGen for UuidWorkerNames {
    fn generate(&self, service_type: &str) -> WorkerId {
        let mut suffix = uuid::Uuid::new_v4().simple().to_string();
        suffix.truncate(8);
        WorkerId(format!("{}-{}", service_type, suffix))
    }
}

/// `<service type>-<prefix>-<n>` with `n` counting from 1 across clones
#[derive(Debug, Clone)]
pub struct SequentialWorkerNames {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialWorkerNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl WorkerNameGen for SequentialWorkerNames {
    fn generate(&self, service_type: &str) -> WorkerId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        WorkerId(format!("{}-{}-{}", service_type, self.prefix, n))
    }
}

/// Lifecycle state of a job worker.
///
/// `Created → Open → Closing → Closed`, one step at a time. Only an `Open`
/// worker dispatches jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Connected but not polling
    #[default]
    Created,
    /// Polling and dispatching
    Open,
    /// Stop requested, draining in-flight jobs
    Closing,
    /// Poll loop finished and connection released
    Closed,
}

impl WorkerState {
    /// Whether `next` is the single legal successor of this state.
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        matches!(
            (self, next),
            (WorkerState::Created, WorkerState::Open)
                | (WorkerState::Open, WorkerState::Closing)
                | (WorkerState::Closing, WorkerState::Closed)
        )
    }

    /// Whether the worker is polling and dispatching jobs
    pub fn is_dispatching(self) -> bool {
        self == WorkerState::Open
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::Created => write!(f, "created"),
            WorkerState::Open => write!(f, "open"),
            WorkerState::Closing => write!(f, "closing"),
            WorkerState::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
