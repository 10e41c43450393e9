// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the external collaborators: the workflow broker and the
//! host's job handler

pub mod broker;
pub mod handler;
pub mod traced;

pub use broker::{ActivateJobsRequest, BrokerClient, BrokerConnector, BrokerError};
pub use handler::{handler_fn, FnHandler, HandlerContext, HandlerError, TaskHandler};
pub use traced::{TracedBroker, TracedBrokerClient};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use broker::{BrokerCall, FakeBroker, FakeBrokerClient};
#[cfg(any(test, feature = "test-support"))]
pub use handler::{FakeTaskHandler, HandlerInvocation, HandlerReply};
