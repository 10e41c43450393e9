// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Task bridge engine: job workers and their lifecycle manager

mod dispatch;
pub mod env;
mod error;
mod manager;
mod settings;
mod task;
mod worker;

#[cfg(test)]
mod test_helpers;

pub use dispatch::{dispatch_job, DispatchOutcome};
pub use error::{DispatchError, LifecycleError, TaskError, TerminalCommandError, WorkerFailure};
pub use manager::{JobWorkerManager, ManagerDeps, StartReport};
pub use settings::{WorkerDefaults, WorkerSettings, ACTIVATION_TIMEOUT_OFFSET};
pub use task::TaskAdapter;
pub use worker::{JobWorker, WorkerSnapshot};
