// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{ConnectionConfig, HandlerPolicy, Job, RawSettings, VariableMap};
use serde_json::Value;

// ── Job factories ───────────────────────────────────────────────────────────

/// Job with the given variables document (must be a JSON object or null).
pub fn job(key: i64, job_type: &str, retries: i32, variables: Value) -> Job {
    let mut job = Job::new(key, job_type, retries);
    job.variables = variables.to_string();
    job
}

/// Job with raw header and variable documents, for extraction failures.
pub fn raw_job(key: i64, job_type: &str, retries: i32, headers: &str, variables: &str) -> Job {
    let mut job = Job::new(key, job_type, retries);
    job.custom_headers = headers.to_string();
    job.variables = variables.to_string();
    job
}

/// The canonical `pay-invoice` job: key 42, three retries, `{"amount": 100}`.
pub fn pay_invoice_job() -> Job {
    job(42, "pay-invoice", 3, serde_json::json!({"amount": 100}))
}

// ── Settings factories ──────────────────────────────────────────────────────

pub fn connection() -> ConnectionConfig {
    let mut config = ConnectionConfig::new("localhost", 26500);
    config.plaintext = true;
    config
}

pub fn policy(service_type: &str) -> HandlerPolicy {
    HandlerPolicy::new(service_type)
}

/// Unwrap a `json!` object literal into a map.
pub fn vars(value: Value) -> VariableMap {
    match value {
        Value::Object(map) => map,
        _ => VariableMap::new(),
    }
}

/// Unwrap a `json!` object literal into a raw settings map.
pub fn raw(value: Value) -> RawSettings {
    vars(value)
}
