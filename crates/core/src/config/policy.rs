// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-service-type polling policy

use super::{ensure_non_zero, optional_duration, with_aliases, ConfigError, RawSettings};
use crate::coerce;
use crate::duration::format_duration;
use crate::task::ReplySchema;
use serde_json::Value;
use std::time::Duration;

const SERVICE_TYPE: &str = "serviceType";
const WORKER_NAME: &str = "workerName";
const JOB_CONCURRENCY: &str = "jobConcurrency";
const MAX_ACTIVE_JOBS: &str = "maxActiveJobs";
const POLL_INTERVAL: &str = "pollIntervalDurationString";
const POLL_THRESHOLD: &str = "pollThreshold";
const REQUEST_TIMEOUT: &str = "requestTimeoutDurationString";
const JOB_TIMEOUT: &str = "timeoutDurationString";
const REPLY_SCHEMA: &str = "replySchema";

/// Short names accepted in place of the canonical keys
const ALIASES: [(&str, &str); 3] = [
    (POLL_INTERVAL, "pollInterval"),
    (REQUEST_TIMEOUT, "requestTimeout"),
    (JOB_TIMEOUT, "timeout"),
];

/// Polling policy for one job worker.
///
/// Every optional field left as `None` means "use the broker default";
/// nothing here is ever defaulted to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerPolicy {
    /// Job type this worker accepts
    pub service_type: String,
    /// Name reported to the broker when activating jobs
    pub worker_name: Option<String>,
    /// Max handler invocations running in parallel
    pub job_concurrency: Option<u32>,
    /// Cap on activated jobs not yet completed or failed
    pub max_active_jobs: Option<u32>,
    pub poll_interval: Option<Duration>,
    /// Poll again once active jobs drop to this fraction of max active jobs
    pub poll_threshold: Option<f64>,
    /// Bound on a single broker request
    pub request_timeout: Option<Duration>,
    /// Job lease; also bounds a single handler invocation
    pub job_timeout: Option<Duration>,
    pub reply_schema: ReplySchema,
}

impl HandlerPolicy {
    pub fn new(service_type: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
            worker_name: None,
            job_concurrency: None,
            max_active_jobs: None,
            poll_interval: None,
            poll_threshold: None,
            request_timeout: None,
            job_timeout: None,
            reply_schema: ReplySchema::default(),
        }
    }

    /// Validate an untyped handler settings map.
    ///
    /// Zero counts and a zero threshold read as unset, the way a host's
    /// zero-valued fields arrive.
    pub fn from_map(values: &RawSettings) -> Result<Self, ConfigError> {
        let values = with_aliases(values, &ALIASES);
        let values = values.as_ref();
        let service_type =
            coerce::to_string(values, SERVICE_TYPE)?.ok_or(ConfigError::Missing(SERVICE_TYPE))?;

        let reply_schema = match coerce::to_string(values, REPLY_SCHEMA)? {
            None => ReplySchema::default(),
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::UnknownReplySchema(raw))?,
        };

        let policy = Self {
            service_type,
            worker_name: coerce::to_string(values, WORKER_NAME)?,
            job_concurrency: optional_count(values, JOB_CONCURRENCY)?,
            max_active_jobs: optional_count(values, MAX_ACTIVE_JOBS)?,
            poll_interval: optional_duration(values, POLL_INTERVAL)?,
            poll_threshold: coerce::to_f64(values, POLL_THRESHOLD)?.filter(|t| *t != 0.0),
            request_timeout: optional_duration(values, REQUEST_TIMEOUT)?,
            job_timeout: optional_duration(values, JOB_TIMEOUT)?,
            reply_schema,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check the policy however it was built: a non-blank service type,
    /// counts and durations that are either unset or greater than zero, and
    /// a threshold in `(0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_type.trim().is_empty() {
            return Err(ConfigError::Missing(SERVICE_TYPE));
        }
        if self
            .worker_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(out_of_range(WORKER_NAME, "must not be blank".to_string()));
        }
        for (key, count) in [
            (JOB_CONCURRENCY, self.job_concurrency),
            (MAX_ACTIVE_JOBS, self.max_active_jobs),
        ] {
            if count == Some(0) {
                return Err(out_of_range(key, "must be greater than zero".to_string()));
            }
        }
        if let Some(t) = self.poll_threshold {
            if !(t > 0.0 && t <= 1.0) {
                return Err(out_of_range(
                    POLL_THRESHOLD,
                    format!("{} is not a fraction in (0, 1]", t),
                ));
            }
        }
        ensure_non_zero(POLL_INTERVAL, self.poll_interval)?;
        ensure_non_zero(REQUEST_TIMEOUT, self.request_timeout)?;
        ensure_non_zero(JOB_TIMEOUT, self.job_timeout)
    }

    /// Serialize back to a settings map accepted by [`HandlerPolicy::from_map`].
    pub fn to_map(&self) -> RawSettings {
        let mut map = RawSettings::new();
        map.insert(SERVICE_TYPE.into(), Value::String(self.service_type.clone()));
        if let Some(name) = &self.worker_name {
            map.insert(WORKER_NAME.into(), Value::String(name.clone()));
        }
        if let Some(n) = self.job_concurrency {
            map.insert(JOB_CONCURRENCY.into(), Value::from(n));
        }
        if let Some(n) = self.max_active_jobs {
            map.insert(MAX_ACTIVE_JOBS.into(), Value::from(n));
        }
        if let Some(t) = self.poll_threshold {
            map.insert(POLL_THRESHOLD.into(), Value::from(t));
        }
        for (key, duration) in [
            (POLL_INTERVAL, self.poll_interval),
            (REQUEST_TIMEOUT, self.request_timeout),
            (JOB_TIMEOUT, self.job_timeout),
        ] {
            if let Some(d) = duration {
                map.insert(key.into(), Value::String(format_duration(d)));
            }
        }
        map.insert(
            REPLY_SCHEMA.into(),
            Value::String(self.reply_schema.as_str().to_string()),
        );
        map
    }
}

fn out_of_range(key: &str, reason: String) -> ConfigError {
    ConfigError::OutOfRange {
        key: key.to_string(),
        reason,
    }
}

/// Non-negative count where 0 means unset.
fn optional_count(values: &RawSettings, key: &str) -> Result<Option<u32>, ConfigError> {
    match coerce::to_i64(values, key)? {
        None | Some(0) => Ok(None),
        Some(n) => u32::try_from(n)
            .map(Some)
            .map_err(|_| out_of_range(key, format!("{} is not a positive count", n))),
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
