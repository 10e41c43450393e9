// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tb-core: Core data model for the task bridge between a workflow broker
//! and host-supplied job handlers

pub mod coerce;
pub mod config;
pub mod duration;
pub mod job;
pub mod task;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::{
    ensure_unique_service_types, AdapterSettings, ConfigError, ConnectionConfig, Credentials,
    HandlerPolicy, OAuthCredentials, RawSettings,
};
pub use duration::{format_duration, parse_duration};
pub use job::{Job, JobError, JobKey, VariableMap};
pub use task::{ReplySchema, ResultShapeError, TaskInvocation, TaskResult, TerminalDecision};
pub use worker::{SequentialWorkerNames, UuidWorkerNames, WorkerId, WorkerNameGen, WorkerState};
