// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-supplied job handler.

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTaskHandler, HandlerInvocation, HandlerReply};

use async_trait::async_trait;
use std::future::Future;
use tb_core::{JobKey, VariableMap};
use thiserror::Error;

/// Failure reported by the host handler. The message becomes the
/// broker-visible failure reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Job metadata available to the handler alongside its input map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerContext {
    pub job_key: JobKey,
    pub job_type: String,
    /// Name of the worker that activated the job
    pub worker: String,
    pub retries: i32,
}

/// Business logic invoked once per job.
#[async_trait]
pub trait TaskHandler: Clone + Send + Sync + 'static {
    async fn handle(
        &self,
        context: HandlerContext,
        input: VariableMap,
    ) -> Result<VariableMap, HandlerError>;
}

/// Adapts an async closure into a [`TaskHandler`].
#[derive(Clone)]
pub struct FnHandler<F> {
    f: F,
}

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(HandlerContext, VariableMap) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<VariableMap, HandlerError>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(HandlerContext, VariableMap) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<VariableMap, HandlerError>> + Send + 'static,
{
    async fn handle(
        &self,
        context: HandlerContext,
        input: VariableMap,
    ) -> Result<VariableMap, HandlerError> {
        (self.f)(context, input).await
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
