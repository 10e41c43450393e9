//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL around a manager wired to fakes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::time::Duration;
use tb_adapters::{FakeBroker, FakeTaskHandler};
use tb_core::{ConnectionConfig, HandlerPolicy, Job, SequentialWorkerNames};
use tb_engine::{JobWorkerManager, ManagerDeps, WorkerDefaults};

pub use serde_json::json;
pub use tb_adapters::{BrokerCall, HandlerReply};
pub use tb_core::{JobKey, WorkerState};

// Spec polling timeouts
pub const SPEC_POLL_INTERVAL_MS: u64 = 5;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

pub type SpecManager = JobWorkerManager<FakeBroker, FakeTaskHandler, SequentialWorkerNames>;

/// A manager plus the fakes behind it
pub struct Bridge {
    pub manager: SpecManager,
    pub broker: FakeBroker,
    pub handler: FakeTaskHandler,
}

/// Start building a bridge
pub fn bridge() -> BridgeBuilder {
    BridgeBuilder {
        connection: local_connection(),
        policies: Vec::new(),
    }
}

pub fn local_connection() -> ConnectionConfig {
    let mut config = ConnectionConfig::new("localhost", 26500);
    config.plaintext = true;
    config
}

/// Knobs tuned so workers react within a few milliseconds
pub fn spec_defaults() -> WorkerDefaults {
    WorkerDefaults {
        poll_interval: Duration::from_millis(SPEC_POLL_INTERVAL_MS),
        ..WorkerDefaults::default()
    }
}

pub struct BridgeBuilder {
    connection: ConnectionConfig,
    policies: Vec<HandlerPolicy>,
}

impl BridgeBuilder {
    pub fn handles(mut self, service_type: &str) -> Self {
        self.policies.push(HandlerPolicy::new(service_type));
        self
    }

    pub fn policy(mut self, policy: HandlerPolicy) -> Self {
        self.policies.push(policy);
        self
    }

    /// Build and initialize, leaving every worker `Created`
    pub async fn initialized(self) -> Bridge {
        let broker = FakeBroker::new();
        let handler = FakeTaskHandler::new();
        let mut manager = JobWorkerManager::new(ManagerDeps {
            connector: broker.clone(),
            handler: handler.clone(),
        })
        .with_defaults(spec_defaults())
        .with_worker_names(SequentialWorkerNames::new("spec"));
        manager
            .initialize(self.connection, self.policies)
            .await
            .unwrap();
        Bridge {
            manager,
            broker,
            handler,
        }
    }

    /// Build, initialize and start
    pub async fn running(self) -> Bridge {
        let mut bridge = self.initialized().await;
        bridge.manager.start().unwrap();
        bridge
    }
}

impl Bridge {
    pub fn deliver(&self, job: Job) {
        self.broker.push_job(job);
    }

    /// Wait until `n` terminal commands have been recorded
    pub async fn wait_for_terminal(&self, n: usize) {
        let done = wait_for(|| self.broker.completed().len() + self.broker.failed().len() >= n).await;
        assert!(
            done,
            "expected {n} terminal commands, broker saw: {:#?}",
            self.broker.calls()
        );
    }

    pub fn states(&self) -> Vec<WorkerState> {
        self.manager.workers().iter().map(|w| w.state).collect()
    }
}

/// Build a job whose variables document is `variables`
pub fn job(key: i64, job_type: &str, retries: i32, variables: serde_json::Value) -> Job {
    let mut job = Job::new(key, job_type, retries);
    job.variables = variables.to_string();
    job
}

/// Poll `condition` until it holds or the spec wait budget runs out.
pub async fn wait_for(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
    condition()
}
