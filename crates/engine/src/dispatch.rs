// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job dispatch: extract, invoke, then send exactly one terminal
//! decision to the broker.

use crate::error::{DispatchError, TerminalCommandError};
use crate::task::TaskAdapter;
use std::future::Future;
use std::time::Duration;
use tb_adapters::{BrokerClient, BrokerError, TaskHandler};
use tb_core::{Job, TaskInvocation, TerminalDecision};
use tracing::Instrument;

/// Terminal command delivered for a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed,
    Failed { retries: i32, message: String },
}

/// Run one job to its terminal command.
///
/// Every failure path (extraction, handler, result shape, business
/// rejection, complete-command error) ends in a fail command carrying the
/// job's retries minus one. Neither command is retried locally; the broker
/// redelivers after the job lease expires.
pub async fn dispatch_job<B, H>(
    client: &B,
    adapter: &TaskAdapter<H>,
    job: Job,
    worker: &str,
    command_timeout: Option<Duration>,
) -> Result<DispatchOutcome, TerminalCommandError>
where
    B: BrokerClient,
    H: TaskHandler,
{
    let key = job.key();
    let span = tracing::info_span!(
        "job.dispatch",
        job_key = %key,
        job_type = job.job_type(),
        retries = job.retries()
    );
    async move {
        let cause = match decide(adapter, &job, worker).await {
            Ok(TerminalDecision::Complete { variables }) => {
                match bounded(command_timeout, client.complete_job(key, &variables)).await {
                    Ok(()) => {
                        tracing::debug!("job completed");
                        return Ok(DispatchOutcome::Completed);
                    }
                    Err(e) => DispatchError::Complete(e),
                }
            }
            Ok(TerminalDecision::Fail { message }) => DispatchError::Rejected(message),
            Err(e) => e,
        };

        let retries = job.retries().saturating_sub(1);
        let message = cause.to_string();
        tracing::warn!(error = %message, retries, "failing job");
        bounded(command_timeout, client.fail_job(key, retries, &message))
            .await
            .map_err(|source| TerminalCommandError {
                key,
                command: "fail",
                source,
            })?;
        Ok(DispatchOutcome::Failed { retries, message })
    }
    .instrument(span)
    .await
}

async fn decide<H: TaskHandler>(
    adapter: &TaskAdapter<H>,
    job: &Job,
    worker: &str,
) -> Result<TerminalDecision, DispatchError> {
    let invocation = TaskInvocation::from_job(job)?;
    let result = adapter.invoke(invocation, worker).await?;
    Ok(result.into_decision())
}

async fn bounded<F>(limit: Option<Duration>, call: F) -> Result<(), BrokerError>
where
    F: Future<Output = Result<(), BrokerError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(BrokerError::Timeout(limit))),
        None => call.await,
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
