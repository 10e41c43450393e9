// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task adapter: runs the host handler for one invocation and reads its
//! output back as a typed result.

use crate::error::TaskError;
use std::any::Any;
use std::time::Duration;
use tb_adapters::{HandlerContext, TaskHandler};
use tb_core::{ReplySchema, TaskInvocation, TaskResult};

/// Invokes the host handler under a reply schema and optional time bound.
#[derive(Clone)]
pub struct TaskAdapter<H> {
    handler: H,
    schema: ReplySchema,
    timeout: Option<Duration>,
}

impl<H: TaskHandler> TaskAdapter<H> {
    pub fn new(handler: H, schema: ReplySchema, timeout: Option<Duration>) -> Self {
        Self {
            handler,
            schema,
            timeout,
        }
    }

    /// Run the handler once for `invocation`.
    ///
    /// The handler runs on its own task so a panic surfaces as
    /// [`TaskError::Panicked`] instead of unwinding through the worker.
    pub async fn invoke(
        &self,
        invocation: TaskInvocation,
        worker: &str,
    ) -> Result<TaskResult, TaskError> {
        let context = HandlerContext {
            job_key: invocation.job_key,
            job_type: invocation.job_type.clone(),
            worker: worker.to_string(),
            retries: invocation.retries,
        };
        let input = invocation.into_input();
        let handler = self.handler.clone();
        let mut call = tokio::spawn(async move { handler.handle(context, input).await });

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut call).await {
                Ok(joined) => joined,
                Err(_) => {
                    call.abort();
                    return Err(TaskError::Timeout(limit));
                }
            },
            None => call.await,
        };

        let output = match joined {
            Ok(result) => result?,
            Err(e) if e.is_panic() => return Err(TaskError::Panicked(panic_message(e.into_panic()))),
            Err(_) => return Err(TaskError::Cancelled),
        };
        Ok(TaskResult::from_output(self.schema, output)?)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(_) => "non-string panic payload".to_string(),
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
