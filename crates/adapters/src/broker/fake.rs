// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake broker for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ActivateJobsRequest, BrokerClient, BrokerConnector, BrokerError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tb_core::{ConnectionConfig, Job, JobKey, VariableMap};

/// Recorded broker call
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerCall {
    Connect {
        connection: u64,
        config: ConnectionConfig,
    },
    ConnectRefused {
        address: String,
    },
    Activate {
        connection: u64,
        request: ActivateJobsRequest,
        returned: usize,
    },
    Complete {
        connection: u64,
        key: JobKey,
        variables: VariableMap,
    },
    Fail {
        connection: u64,
        key: JobKey,
        retries: i32,
        message: String,
    },
    Close {
        connection: u64,
    },
}

impl BrokerCall {
    /// Whether this call is a complete or fail command for `key`
    pub fn is_terminal_for(&self, key: JobKey) -> bool {
        match self {
            BrokerCall::Complete { key: k, .. } | BrokerCall::Fail { key: k, .. } => *k == key,
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
struct FakeBrokerState {
    calls: Vec<BrokerCall>,
    pending: HashMap<String, VecDeque<Job>>,
    next_connection: u64,
    closed: HashSet<u64>,
    connects_allowed: Option<usize>,
    activation_failures: usize,
    rejected_completes: HashSet<JobKey>,
    rejected_fails: HashSet<JobKey>,
    close_failure: Option<BrokerError>,
    command_delay: Option<Duration>,
}

/// In-memory broker. Acts as the connector; every connection it hands out
/// shares the same job queues and call log.
#[derive(Clone, Default)]
pub struct FakeBroker {
    inner: Arc<Mutex<FakeBrokerState>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a job for activation by workers of its type
    pub fn push_job(&self, job: Job) {
        self.inner
            .lock()
            .pending
            .entry(job.job_type.clone())
            .or_default()
            .push_back(job);
    }

    /// Jobs still waiting for activation
    pub fn pending_jobs(&self) -> usize {
        self.inner.lock().pending.values().map(VecDeque::len).sum()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<BrokerCall> {
        self.inner.lock().calls.clone()
    }

    /// Completed jobs in command order
    pub fn completed(&self) -> Vec<(JobKey, VariableMap)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BrokerCall::Complete { key, variables, .. } => Some((*key, variables.clone())),
                _ => None,
            })
            .collect()
    }

    /// Failed jobs in command order: `(key, retries, message)`
    pub fn failed(&self) -> Vec<(JobKey, i32, String)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BrokerCall::Fail {
                    key,
                    retries,
                    message,
                    ..
                } => Some((*key, *retries, message.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of complete/fail commands sent for `key`
    pub fn terminal_commands_for(&self, key: JobKey) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| c.is_terminal_for(key))
            .count()
    }

    /// Connections that have been closed
    pub fn closed_connections(&self) -> Vec<u64> {
        let mut closed: Vec<_> = self.inner.lock().closed.iter().copied().collect();
        closed.sort_unstable();
        closed
    }

    /// Number of connections handed out
    pub fn connections_opened(&self) -> u64 {
        self.inner.lock().next_connection
    }

    /// Allow `n` more successful connects, then refuse
    pub fn fail_connects_after(&self, n: usize) {
        self.inner.lock().connects_allowed = Some(n);
    }

    /// Fail the next `n` activation requests
    pub fn fail_activations(&self, n: usize) {
        self.inner.lock().activation_failures = n;
    }

    /// Reject complete commands for `key`
    pub fn reject_complete(&self, key: impl Into<JobKey>) {
        self.inner.lock().rejected_completes.insert(key.into());
    }

    /// Reject fail commands for `key`
    pub fn reject_fail(&self, key: impl Into<JobKey>) {
        self.inner.lock().rejected_fails.insert(key.into());
    }

    /// Make every `close` return `error`
    pub fn fail_close(&self, error: BrokerError) {
        self.inner.lock().close_failure = Some(error);
    }

    /// Delay complete and fail commands by `delay`
    pub fn delay_commands(&self, delay: Duration) {
        self.inner.lock().command_delay = Some(delay);
    }
}

#[async_trait]
impl BrokerConnector for FakeBroker {
    type Client = FakeBrokerClient;

    async fn connect(&self, config: &ConnectionConfig) -> Result<FakeBrokerClient, BrokerError> {
        let mut inner = self.inner.lock();
        if let Some(allowed) = inner.connects_allowed.as_mut() {
            if *allowed == 0 {
                let address = config.gateway_address();
                inner.calls.push(BrokerCall::ConnectRefused {
                    address: address.clone(),
                });
                return Err(BrokerError::Unavailable(address));
            }
            *allowed -= 1;
        }
        inner.next_connection += 1;
        let connection = inner.next_connection;
        inner.calls.push(BrokerCall::Connect {
            connection,
            config: config.clone(),
        });
        Ok(FakeBrokerClient {
            connection,
            inner: Arc::clone(&self.inner),
        })
    }
}

/// One connection handed out by [`FakeBroker`].
#[derive(Debug, Clone)]
pub struct FakeBrokerClient {
    connection: u64,
    inner: Arc<Mutex<FakeBrokerState>>,
}

impl FakeBrokerClient {
    pub fn connection(&self) -> u64 {
        self.connection
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.inner.lock().closed.contains(&self.connection) {
            return Err(BrokerError::Closed);
        }
        Ok(())
    }

    async fn command_delay(&self) {
        let delay = self.inner.lock().command_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl BrokerClient for FakeBrokerClient {
    async fn activate_jobs(&self, request: &ActivateJobsRequest) -> Result<Vec<Job>, BrokerError> {
        self.ensure_open()?;
        let mut inner = self.inner.lock();
        if inner.activation_failures > 0 {
            inner.activation_failures -= 1;
            return Err(BrokerError::Unavailable("activation refused".to_string()));
        }
        let mut jobs = Vec::new();
        if let Some(queue) = inner.pending.get_mut(&request.job_type) {
            while jobs.len() < request.max_jobs as usize {
                let Some(mut job) = queue.pop_front() else {
                    break;
                };
                job.worker = request.worker.clone();
                jobs.push(job);
            }
        }
        inner.calls.push(BrokerCall::Activate {
            connection: self.connection,
            request: request.clone(),
            returned: jobs.len(),
        });
        Ok(jobs)
    }

    async fn complete_job(&self, key: JobKey, variables: &VariableMap) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.command_delay().await;
        let mut inner = self.inner.lock();
        inner.calls.push(BrokerCall::Complete {
            connection: self.connection,
            key,
            variables: variables.clone(),
        });
        if inner.rejected_completes.contains(&key) {
            return Err(BrokerError::Rejected(format!("complete {}", key)));
        }
        Ok(())
    }

    async fn fail_job(&self, key: JobKey, retries: i32, message: &str) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.command_delay().await;
        let mut inner = self.inner.lock();
        inner.calls.push(BrokerCall::Fail {
            connection: self.connection,
            key,
            retries,
            message: message.to_string(),
        });
        if inner.rejected_fails.contains(&key) {
            return Err(BrokerError::Rejected(format!("fail {}", key)));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(BrokerCall::Close {
            connection: self.connection,
        });
        inner.closed.insert(self.connection);
        match &inner.close_failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
