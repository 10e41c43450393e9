// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::{JobWorker, JobWorkerManager, ManagerDeps, WorkerDefaults, WorkerSettings};
use std::time::Duration;
use tb_adapters::{BrokerConnector, FakeBroker, FakeBrokerClient, FakeTaskHandler};
use tb_core::test_support::connection;
use tb_core::{HandlerPolicy, SequentialWorkerNames};

/// Convenience alias for the fully-typed test manager.
pub(crate) type TestManager =
    JobWorkerManager<FakeBroker, FakeTaskHandler, SequentialWorkerNames>;

/// Test context holding the manager and its fakes.
pub(crate) struct TestContext {
    pub manager: TestManager,
    pub broker: FakeBroker,
    pub handler: FakeTaskHandler,
}

/// Defaults with a short poll interval so loops react quickly in tests.
pub(crate) fn fast_defaults() -> WorkerDefaults {
    WorkerDefaults {
        poll_interval: Duration::from_millis(5),
        ..WorkerDefaults::default()
    }
}

pub(crate) fn setup() -> TestContext {
    let broker = FakeBroker::new();
    let handler = FakeTaskHandler::new();
    let manager = JobWorkerManager::new(ManagerDeps {
        connector: broker.clone(),
        handler: handler.clone(),
    })
    .with_defaults(fast_defaults())
    .with_worker_names(SequentialWorkerNames::new("w"));
    TestContext {
        manager,
        broker,
        handler,
    }
}

/// A `Created` worker connected to a fresh fake broker.
pub(crate) async fn worker(
    policy: HandlerPolicy,
) -> (
    FakeBroker,
    FakeTaskHandler,
    JobWorker<FakeBrokerClient, FakeTaskHandler>,
) {
    let broker = FakeBroker::new();
    let handler = FakeTaskHandler::new();
    let client = broker.connect(&connection()).await.unwrap();
    let names = SequentialWorkerNames::new("w");
    let settings = WorkerSettings::resolve(&policy, &fast_defaults(), &names);
    let worker = JobWorker::new(settings, client, handler.clone());
    (broker, handler, worker)
}

/// Poll `condition` every few milliseconds for up to two seconds.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
