// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job worker lifecycle manager.
//!
//! Owns one [`JobWorker`] per handler policy. Dependencies (broker
//! connector, host handler) are passed in at construction.

use crate::error::{LifecycleError, WorkerFailure};
use crate::settings::{WorkerDefaults, WorkerSettings};
use crate::worker::{JobWorker, WorkerSnapshot};
use tb_adapters::{BrokerConnector, BrokerError, TaskHandler};
use tb_core::{
    ensure_unique_service_types, AdapterSettings, ConnectionConfig, HandlerPolicy, RawSettings,
    UuidWorkerNames, WorkerNameGen,
};

/// Manager adapter dependencies
pub struct ManagerDeps<C, H> {
    pub connector: C,
    pub handler: H,
}

/// Result of a successful [`JobWorkerManager::start`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartReport {
    /// Workers opened by this call
    pub started: Vec<String>,
    /// Workers that were already open
    pub already_open: Vec<String>,
}

/// Owns every worker and drives their lifecycle
pub struct JobWorkerManager<C: BrokerConnector, H, N = UuidWorkerNames> {
    connector: C,
    handler: H,
    names: N,
    defaults: WorkerDefaults,
    workers: Option<Vec<JobWorker<C::Client, H>>>,
}

impl<C: BrokerConnector, H: TaskHandler> JobWorkerManager<C, H> {
    pub fn new(deps: ManagerDeps<C, H>) -> Self {
        Self {
            connector: deps.connector,
            handler: deps.handler,
            names: UuidWorkerNames,
            defaults: WorkerDefaults::from_env(),
            workers: None,
        }
    }
}

impl<C, H, N> JobWorkerManager<C, H, N>
where
    C: BrokerConnector,
    H: TaskHandler,
    N: WorkerNameGen,
{
    /// Replace the knobs used for unset policy fields
    pub fn with_defaults(mut self, defaults: WorkerDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Replace the generator used for worker names
    pub fn with_worker_names<M: WorkerNameGen>(self, names: M) -> JobWorkerManager<C, H, M> {
        JobWorkerManager {
            connector: self.connector,
            handler: self.handler,
            names,
            defaults: self.defaults,
            workers: self.workers,
        }
    }

    /// Connect once per policy and build a `Created` worker for each.
    ///
    /// On a connection failure the connections opened so far are closed
    /// before the error is returned.
    pub async fn initialize(
        &mut self,
        connection: ConnectionConfig,
        policies: Vec<HandlerPolicy>,
    ) -> Result<(), LifecycleError> {
        if self.workers.is_some() {
            return Err(LifecycleError::AlreadyInitialized);
        }
        if !connection.enabled {
            return Err(LifecycleError::Disabled);
        }
        connection.validate()?;
        for policy in &policies {
            policy.validate()?;
        }
        ensure_unique_service_types(&policies)?;
        if policies.is_empty() {
            tracing::warn!("no handlers configured");
        }

        let mut workers = Vec::with_capacity(policies.len());
        for policy in &policies {
            match self.connect(&connection).await {
                Ok(client) => {
                    let settings = WorkerSettings::resolve(policy, &self.defaults, &self.names);
                    workers.push(JobWorker::new(settings, client, self.handler.clone()));
                }
                Err(source) => {
                    tracing::error!(service_type = %policy.service_type, error = %source, "connect failed");
                    for worker in &workers {
                        worker.close_unstarted().await;
                    }
                    return Err(LifecycleError::Connection {
                        service_type: policy.service_type.clone(),
                        source,
                    });
                }
            }
        }

        tracing::info!(
            address = %connection.gateway_address(),
            workers = workers.len(),
            "initialized"
        );
        self.workers = Some(workers);
        Ok(())
    }

    /// Validate raw settings maps, then [`initialize`](Self::initialize).
    pub async fn initialize_from_maps(
        &mut self,
        settings: &RawSettings,
        handlers: &[RawSettings],
    ) -> Result<(), LifecycleError> {
        let settings = AdapterSettings::from_maps(settings, handlers)?;
        self.initialize(settings.connection, settings.handlers).await
    }

    async fn connect(&self, connection: &ConnectionConfig) -> Result<C::Client, BrokerError> {
        match connection.connection_timeout {
            Some(limit) => tokio::time::timeout(limit, self.connector.connect(connection))
                .await
                .unwrap_or(Err(BrokerError::Timeout(limit))),
            None => self.connector.connect(connection).await,
        }
    }

    /// Open every `Created` worker.
    ///
    /// Already open workers are reported in `already_open`. Closed workers
    /// cannot reopen; their errors are collected into
    /// [`LifecycleError::PartialStart`] along with the workers that are running.
    pub fn start(&mut self) -> Result<StartReport, LifecycleError> {
        let workers = self.workers.as_mut().ok_or(LifecycleError::NotInitialized)?;
        let mut report = StartReport::default();
        let mut failures = Vec::new();

        for worker in workers.iter_mut() {
            let service_type = worker.service_type().to_string();
            if worker.state().is_dispatching() {
                report.already_open.push(service_type);
                continue;
            }
            match worker.start() {
                Ok(()) => report.started.push(service_type),
                Err(error) => failures.push(WorkerFailure {
                    service_type,
                    error,
                }),
            }
        }

        if failures.is_empty() {
            return Ok(report);
        }
        let mut started = report.already_open;
        started.extend(report.started);
        Err(LifecycleError::PartialStart { started, failures })
    }

    /// Stop every worker, draining in-flight jobs and closing connections.
    ///
    /// All workers are signalled before any is awaited. Errors are
    /// aggregated, first error per worker.
    pub async fn stop(&mut self) -> Result<(), LifecycleError> {
        let Some(workers) = self.workers.as_mut() else {
            return Ok(());
        };
        for worker in workers.iter_mut() {
            worker.begin_stop();
        }

        let mut failures = Vec::new();
        for worker in workers.iter_mut() {
            if let Err(error) = worker.finish_stop().await {
                failures.push(WorkerFailure {
                    service_type: worker.service_type().to_string(),
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::Shutdown { failures })
        }
    }

    /// Stop a single worker by service type
    pub async fn stop_worker(&mut self, service_type: &str) -> Result<(), LifecycleError> {
        let workers = self.workers.as_mut().ok_or(LifecycleError::NotInitialized)?;
        let worker = workers
            .iter_mut()
            .find(|w| w.service_type() == service_type)
            .ok_or_else(|| LifecycleError::WorkerNotFound(service_type.to_string()))?;
        worker.stop().await
    }

    pub fn workers(&self) -> Vec<WorkerSnapshot> {
        self.workers
            .iter()
            .flatten()
            .map(JobWorker::snapshot)
            .collect()
    }

    pub fn is_initialized(&self) -> bool {
        self.workers.is_some()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
