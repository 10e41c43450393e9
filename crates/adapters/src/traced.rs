// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::broker::{ActivateJobsRequest, BrokerClient, BrokerConnector, BrokerError};
use async_trait::async_trait;
use tb_core::{ConnectionConfig, Job, JobKey, VariableMap};
use tracing::Instrument;

/// Wrapper that adds tracing to any BrokerConnector and the clients it opens
#[derive(Clone)]
pub struct TracedBroker<C> {
    inner: C,
}

impl<C> TracedBroker<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: BrokerConnector> BrokerConnector for TracedBroker<C> {
    type Client = TracedBrokerClient<C::Client>;

    async fn connect(&self, config: &ConnectionConfig) -> Result<Self::Client, BrokerError> {
        let address = config.gateway_address();
        async {
            tracing::debug!(plaintext = config.plaintext, credentials = ?config.credentials, "connecting");
            let start = std::time::Instant::now();
            let result = self.inner.connect(config).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => tracing::info!(elapsed_ms, "connected"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "connect failed"),
            }
            result.map(|client| TracedBrokerClient {
                inner: client,
                address: address.clone(),
            })
        }
        .instrument(tracing::info_span!("broker.connect", address = %address))
        .await
    }
}

/// Traced broker connection
#[derive(Clone)]
pub struct TracedBrokerClient<B> {
    inner: B,
    address: String,
}

impl<B> TracedBrokerClient<B> {
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: BrokerClient> BrokerClient for TracedBrokerClient<B> {
    async fn activate_jobs(&self, request: &ActivateJobsRequest) -> Result<Vec<Job>, BrokerError> {
        let result = self.inner.activate_jobs(request).await;
        tracing::debug_span!(
            "broker.activate",
            job_type = %request.job_type,
            worker = %request.worker,
            max_jobs = request.max_jobs
        )
        .in_scope(|| match &result {
            Ok(jobs) if jobs.is_empty() => tracing::trace!("no jobs"),
            Ok(jobs) => tracing::debug!(activated = jobs.len(), "activated"),
            Err(e) => tracing::warn!(address = %self.address, error = %e, "activation failed"),
        });
        result
    }

    async fn complete_job(&self, key: JobKey, variables: &VariableMap) -> Result<(), BrokerError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.complete_job(key, variables).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(variables = variables.len(), elapsed_ms, "completed"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "complete failed"),
            }
            result
        }
        .instrument(tracing::info_span!("broker.complete", job_key = %key))
        .await
    }

    async fn fail_job(&self, key: JobKey, retries: i32, message: &str) -> Result<(), BrokerError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.fail_job(key, retries, message).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(reason = message, elapsed_ms, "failed job"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "fail command failed"),
            }
            result
        }
        .instrument(tracing::info_span!("broker.fail", job_key = %key, retries))
        .await
    }

    async fn close(&self) -> Result<(), BrokerError> {
        let result = self.inner.close().await;
        tracing::info_span!("broker.close", address = %self.address).in_scope(|| match &result {
            Ok(()) => tracing::info!("closed"),
            Err(e) => tracing::warn!(error = %e, "close failed"),
        });
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
