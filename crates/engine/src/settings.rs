// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effective worker settings.
//!
//! A [`HandlerPolicy`] leaves most knobs unset. [`WorkerDefaults`] supplies
//! the values the worker uses in their place; the broker-facing request
//! still carries `None` for unset timeouts so the broker applies its own.

use crate::env;
use std::time::Duration;
use tb_core::{HandlerPolicy, ReplySchema, WorkerId, WorkerNameGen};

/// Added to the activation request timeout when bounding the call locally,
/// so the broker answers a long poll before the client gives up.
pub const ACTIVATION_TIMEOUT_OFFSET: Duration = Duration::from_secs(10);

/// Values used for knobs a policy leaves unset.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerDefaults {
    pub job_concurrency: u32,
    pub max_active_jobs: u32,
    pub poll_interval: Duration,
    pub poll_threshold: f64,
    /// Assumed long-poll duration when a policy sets no request timeout
    pub request_timeout: Duration,
}

impl Default for WorkerDefaults {
    fn default() -> Self {
        Self {
            job_concurrency: 4,
            max_active_jobs: 32,
            poll_interval: Duration::from_millis(100),
            poll_threshold: 0.3,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl WorkerDefaults {
    /// Built-in defaults with `TB_*` environment overrides applied.
    pub fn from_env() -> Self {
        let builtin = Self::default();
        Self {
            job_concurrency: env::job_concurrency().unwrap_or(builtin.job_concurrency),
            max_active_jobs: env::max_active_jobs().unwrap_or(builtin.max_active_jobs),
            poll_interval: env::poll_interval().unwrap_or(builtin.poll_interval),
            poll_threshold: builtin.poll_threshold,
            request_timeout: env::request_timeout().unwrap_or(builtin.request_timeout),
        }
    }
}

/// Fully resolved knobs for one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSettings {
    pub service_type: String,
    pub worker_name: WorkerId,
    pub job_concurrency: u32,
    pub max_active_jobs: u32,
    pub poll_interval: Duration,
    pub poll_threshold: f64,
    /// Sent with activation requests and bounds terminal commands
    pub request_timeout: Option<Duration>,
    /// Job lease, also bounds the handler invocation
    pub job_timeout: Option<Duration>,
    pub reply_schema: ReplySchema,
    /// Local bound on one activation call
    pub activation_timeout: Duration,
}

impl WorkerSettings {
    pub fn resolve(
        policy: &HandlerPolicy,
        defaults: &WorkerDefaults,
        names: &impl WorkerNameGen,
    ) -> Self {
        let worker_name = match &policy.worker_name {
            Some(name) => WorkerId::new(name.as_str()),
            None => names.generate(&policy.service_type),
        };
        Self {
            service_type: policy.service_type.clone(),
            worker_name,
            job_concurrency: policy.job_concurrency.unwrap_or(defaults.job_concurrency),
            max_active_jobs: policy.max_active_jobs.unwrap_or(defaults.max_active_jobs),
            poll_interval: policy.poll_interval.unwrap_or(defaults.poll_interval),
            poll_threshold: policy.poll_threshold.unwrap_or(defaults.poll_threshold),
            request_timeout: policy.request_timeout,
            job_timeout: policy.job_timeout,
            reply_schema: policy.reply_schema,
            activation_timeout: policy.request_timeout.unwrap_or(defaults.request_timeout)
                + ACTIVATION_TIMEOUT_OFFSET,
        }
    }

    /// Active job count at or below which the worker polls again
    pub fn poll_threshold_jobs(&self) -> u32 {
        // threshold is in (0, 1], so the product never exceeds max_active_jobs
        (self.poll_threshold * f64::from(self.max_active_jobs)).round() as u32
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
