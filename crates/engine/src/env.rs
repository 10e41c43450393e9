// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.
//!
//! Each tunable overrides one field of [`WorkerDefaults`](crate::WorkerDefaults).
//! Unset, unparsable and zero values are ignored.

use std::time::Duration;

fn parse_positive(var: &str) -> Option<u64> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
}

fn parse_duration_ms(var: &str) -> Option<Duration> {
    parse_positive(var).map(Duration::from_millis)
}

fn parse_count(var: &str) -> Option<u32> {
    parse_positive(var).and_then(|n| u32::try_from(n).ok())
}

/// Parallel handler invocations per worker (`TB_JOB_CONCURRENCY`).
pub fn job_concurrency() -> Option<u32> {
    parse_count("TB_JOB_CONCURRENCY")
}

/// In-flight job cap per worker (`TB_MAX_ACTIVE_JOBS`).
pub fn max_active_jobs() -> Option<u32> {
    parse_count("TB_MAX_ACTIVE_JOBS")
}

/// Pause between activation attempts (`TB_POLL_INTERVAL_MS`).
pub fn poll_interval() -> Option<Duration> {
    parse_duration_ms("TB_POLL_INTERVAL_MS")
}

/// Activation long-poll bound when a policy sets none (`TB_REQUEST_TIMEOUT_MS`).
pub fn request_timeout() -> Option<Duration> {
    parse_duration_ms("TB_REQUEST_TIMEOUT_MS")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
