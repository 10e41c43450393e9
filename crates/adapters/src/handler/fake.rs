// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake task handler for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{HandlerContext, HandlerError, TaskHandler};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tb_core::{JobKey, VariableMap};
use tokio::sync::watch;

/// Scripted handler behavior
#[derive(Debug, Clone)]
pub enum HandlerReply {
    /// Return this output map
    Output(VariableMap),
    /// Return a handler error
    Error(String),
    /// Panic inside the handler
    Panic(String),
    /// Sleep, then behave as the inner reply
    Sleep(Duration, Box<HandlerReply>),
}

impl HandlerReply {
    /// `{"status": "ok", "outputVariables": variables}`
    pub fn ok(variables: Value) -> Self {
        let mut output = VariableMap::new();
        output.insert("status".into(), Value::String("ok".into()));
        output.insert("outputVariables".into(), variables);
        HandlerReply::Output(output)
    }

    /// Raw output map from a `json!` object literal
    pub fn output(value: Value) -> Self {
        match value {
            Value::Object(map) => HandlerReply::Output(map),
            _ => HandlerReply::Output(VariableMap::new()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        HandlerReply::Error(message.into())
    }
}

/// Recorded handler invocation
#[derive(Debug, Clone)]
pub struct HandlerInvocation {
    pub context: HandlerContext,
    pub input: VariableMap,
}

struct FakeHandlerState {
    invocations: Vec<HandlerInvocation>,
    default_reply: HandlerReply,
    replies: HashMap<JobKey, HandlerReply>,
    active: usize,
    max_active: usize,
}

/// Fake handler with scripted replies and an optional gate that holds
/// invocations until released.
#[derive(Clone)]
pub struct FakeTaskHandler {
    inner: Arc<Mutex<FakeHandlerState>>,
    gate: Arc<watch::Sender<bool>>,
}

impl Default for FakeTaskHandler {
    fn default() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            inner: Arc::new(Mutex::new(FakeHandlerState {
                invocations: Vec::new(),
                default_reply: HandlerReply::ok(Value::Object(VariableMap::new())),
                replies: HashMap::new(),
                active: 0,
                max_active: 0,
            })),
            gate: Arc::new(gate),
        }
    }
}

impl FakeTaskHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler that answers every job with `reply`
    pub fn replying(reply: HandlerReply) -> Self {
        let handler = Self::default();
        handler.set_default_reply(reply);
        handler
    }

    pub fn set_default_reply(&self, reply: HandlerReply) {
        self.inner.lock().default_reply = reply;
    }

    /// Script the reply for one job key
    pub fn reply_for(&self, key: impl Into<JobKey>, reply: HandlerReply) {
        self.inner.lock().replies.insert(key.into(), reply);
    }

    /// Get all recorded invocations
    pub fn invocations(&self) -> Vec<HandlerInvocation> {
        self.inner.lock().invocations.clone()
    }

    /// Highest number of invocations observed running at once
    pub fn max_concurrent(&self) -> usize {
        self.inner.lock().max_active
    }

    /// Hold subsequent invocations until [`release`](Self::release)
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Poll until at least `n` invocations were recorded or `within` elapses
    pub async fn wait_for_invocations(&self, n: usize, within: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            if self.inner.lock().invocations.len() >= n {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

struct ActiveGuard {
    inner: Arc<Mutex<FakeHandlerState>>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.inner.lock().active -= 1;
    }
}

#[async_trait]
impl TaskHandler for FakeTaskHandler {
    async fn handle(
        &self,
        context: HandlerContext,
        input: VariableMap,
    ) -> Result<VariableMap, HandlerError> {
        let mut reply = {
            let mut inner = self.inner.lock();
            inner.active += 1;
            inner.max_active = inner.max_active.max(inner.active);
            inner.invocations.push(HandlerInvocation {
                context: context.clone(),
                input,
            });
            inner
                .replies
                .get(&context.job_key)
                .cloned()
                .unwrap_or_else(|| inner.default_reply.clone())
        };
        let _active = ActiveGuard {
            inner: Arc::clone(&self.inner),
        };

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        loop {
            match reply {
                HandlerReply::Output(output) => return Ok(output),
                HandlerReply::Error(message) => return Err(HandlerError(message)),
                #[allow(clippy::panic)]
                HandlerReply::Panic(message) => panic!("{}", message),
                HandlerReply::Sleep(delay, next) => {
                    tokio::time::sleep(delay).await;
                    reply = *next;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
