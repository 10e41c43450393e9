// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker-owned job records

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// String-keyed map of JSON-compatible values (process variables, headers).
pub type VariableMap = serde_json::Map<String, Value>;

/// Opaque job identifier assigned by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(pub i64);

impl JobKey {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for JobKey {
    fn from(key: i64) -> Self {
        Self(key)
    }
}

/// Failure to extract headers or variables from a job payload.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {key}: {part} is not valid JSON: {source}")]
    InvalidJson {
        key: JobKey,
        part: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("job {key}: {part} must be a JSON object, got {found}")]
    NotAnObject {
        key: JobKey,
        part: &'static str,
        found: String,
    },
}

/// A job as delivered by the broker. Read-only to this system.
///
/// Headers and variables arrive as the broker's raw JSON documents and are
/// only decoded when a dispatch extracts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub key: JobKey,
    #[serde(rename = "type")]
    pub job_type: String,
    /// Retries remaining before the broker raises an incident
    pub retries: i32,
    #[serde(default)]
    pub custom_headers: String,
    #[serde(default)]
    pub variables: String,
    /// Worker name the job was activated for
    #[serde(default)]
    pub worker: String,
}

impl Job {
    pub fn new(key: impl Into<JobKey>, job_type: impl Into<String>, retries: i32) -> Self {
        Self {
            key: key.into(),
            job_type: job_type.into(),
            retries,
            custom_headers: "{}".to_string(),
            variables: "{}".to_string(),
            worker: String::new(),
        }
    }

    pub fn key(&self) -> JobKey {
        self.key
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub fn retries(&self) -> i32 {
        self.retries
    }

    pub fn custom_headers_map(&self) -> Result<VariableMap, JobError> {
        self.decode("custom headers", &self.custom_headers)
    }

    pub fn variables_map(&self) -> Result<VariableMap, JobError> {
        self.decode("variables", &self.variables)
    }

    fn decode(&self, part: &'static str, raw: &str) -> Result<VariableMap, JobError> {
        if raw.trim().is_empty() {
            return Ok(VariableMap::new());
        }
        let value: Value = serde_json::from_str(raw).map_err(|source| JobError::InvalidJson {
            key: self.key,
            part,
            source,
        })?;
        match value {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(VariableMap::new()),
            other => Err(JobError::NotAnObject {
                key: self.key,
                part,
                found: crate::coerce::describe(&other),
            }),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
