// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow broker capability.
//!
//! The network client (wire protocol, TLS, auth handshake) lives outside
//! this workspace. These traits are the part of it the engine relies on:
//! open a connection, long-poll for jobs, and send one terminal command
//! per job.

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{BrokerCall, FakeBroker, FakeBrokerClient};

use async_trait::async_trait;
use std::time::Duration;
use tb_core::{ConnectionConfig, Job, JobKey, VariableMap};
use thiserror::Error;

/// Errors from broker calls
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("broker unavailable: {0}")]
    Unavailable(String),
    #[error("broker call timed out after {}", tb_core::format_duration(*.0))]
    Timeout(Duration),
    #[error("broker rejected command: {0}")]
    Rejected(String),
    #[error("broker connection closed")]
    Closed,
}

/// One long-poll activation request.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivateJobsRequest {
    pub job_type: String,
    /// Worker name recorded by the broker on each activated job
    pub worker: String,
    /// Upper bound on jobs returned by this call
    pub max_jobs: u32,
    /// Lease granted to each job before the broker redelivers it
    pub timeout: Option<Duration>,
    /// How long the broker may hold the request open waiting for jobs
    pub request_timeout: Option<Duration>,
}

/// Opens broker connections.
#[async_trait]
pub trait BrokerConnector: Clone + Send + Sync + 'static {
    type Client: BrokerClient;

    /// Establish a connection using the validated settings
    async fn connect(&self, config: &ConnectionConfig) -> Result<Self::Client, BrokerError>;
}

/// An open broker connection.
#[async_trait]
pub trait BrokerClient: Clone + Send + Sync + 'static {
    /// Activate up to `request.max_jobs` jobs of `request.job_type`.
    ///
    /// An empty vector means the long poll elapsed without work.
    async fn activate_jobs(&self, request: &ActivateJobsRequest) -> Result<Vec<Job>, BrokerError>;

    /// Complete a job, merging `variables` into the process instance
    async fn complete_job(&self, key: JobKey, variables: &VariableMap) -> Result<(), BrokerError>;

    /// Fail a job, leaving it `retries` attempts
    async fn fail_job(&self, key: JobKey, retries: i32, message: &str) -> Result<(), BrokerError>;

    /// Release the connection
    async fn close(&self) -> Result<(), BrokerError>;
}
