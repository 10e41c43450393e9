// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{wait_until, worker};
use serde_json::json;
use std::time::Duration;
use tb_adapters::{BrokerCall, HandlerReply};
use tb_core::test_support::{job, pay_invoice_job, policy};
use tb_core::HandlerPolicy;

#[tokio::test]
async fn starts_created_and_rejects_second_start() {
    let (_, _, mut worker) = worker(policy("pay-invoice")).await;
    assert_eq!(worker.state(), WorkerState::Created);

    worker.start().unwrap();
    assert_eq!(worker.state(), WorkerState::Open);

    let err = worker.start().unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            from: WorkerState::Open,
            to: WorkerState::Open,
            ..
        }
    ));
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn stop_on_created_worker_does_no_io() {
    let (broker, _, mut worker) = worker(policy("pay-invoice")).await;
    let before = broker.calls().len();

    worker.stop().await.unwrap();

    assert_eq!(worker.state(), WorkerState::Created);
    assert_eq!(broker.calls().len(), before);
}

#[tokio::test]
async fn stop_closes_connection_once() {
    let (broker, _, mut worker) = worker(policy("pay-invoice")).await;
    worker.start().unwrap();

    worker.stop().await.unwrap();
    assert_eq!(worker.state(), WorkerState::Closed);
    let calls_after_first = broker.calls().len();

    worker.stop().await.unwrap();
    assert_eq!(broker.calls().len(), calls_after_first);
    assert_eq!(broker.closed_connections(), vec![1]);
}

#[tokio::test]
async fn closed_worker_cannot_reopen() {
    let (_, _, mut worker) = worker(policy("pay-invoice")).await;
    worker.start().unwrap();
    worker.stop().await.unwrap();

    assert!(worker.start().is_err());
    assert_eq!(worker.state(), WorkerState::Closed);
}

#[tokio::test]
async fn dispatches_activated_jobs() {
    let (broker, handler, mut worker) = worker(policy("pay-invoice")).await;
    handler.set_default_reply(HandlerReply::ok(json!({"paid": true})));
    broker.push_job(pay_invoice_job());
    broker.push_job(job(43, "ship-order", 1, json!({})));

    worker.start().unwrap();
    assert!(wait_until(|| broker.completed().len() == 1).await);
    worker.stop().await.unwrap();

    let snapshot = worker.snapshot();
    assert_eq!(snapshot.activated, 1);
    assert_eq!(snapshot.completed, 1);
    assert_eq!(snapshot.in_flight, 0);
    // other service types are left for their own worker
    assert_eq!(broker.pending_jobs(), 1);
}

#[tokio::test]
async fn activation_request_carries_policy() {
    let mut policy = HandlerPolicy::new("pay-invoice");
    policy.worker_name = Some("billing".into());
    policy.max_active_jobs = Some(8);
    policy.job_timeout = Some(Duration::from_secs(300));
    let (broker, _, mut worker) = worker(policy).await;

    worker.start().unwrap();
    assert!(wait_until(|| broker.calls().len() > 1).await);
    worker.stop().await.unwrap();

    let request = broker
        .calls()
        .into_iter()
        .find_map(|c| match c {
            BrokerCall::Activate { request, .. } => Some(request),
            _ => None,
        })
        .unwrap();
    assert_eq!(request.job_type, "pay-invoice");
    assert_eq!(request.worker, "billing");
    assert_eq!(request.max_jobs, 8);
    assert_eq!(request.timeout, Some(Duration::from_secs(300)));
    assert_eq!(request.request_timeout, None);
}

#[tokio::test]
async fn stop_drains_in_flight_jobs() {
    let (broker, handler, mut worker) = worker(policy("pay-invoice")).await;
    handler.hold();
    broker.push_job(pay_invoice_job());

    worker.start().unwrap();
    assert!(handler.wait_for_invocations(1, Duration::from_secs(2)).await);

    let release = tokio::spawn({
        let handler = handler.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handler.release();
        }
    });
    worker.stop().await.unwrap();
    release.await.unwrap();

    assert_eq!(broker.completed().len(), 1);
    // the terminal command precedes the close
    let calls = broker.calls();
    let complete = calls.iter().position(|c| matches!(c, BrokerCall::Complete { .. }));
    let close = calls.iter().position(|c| matches!(c, BrokerCall::Close { .. }));
    assert!(complete < close);
}

#[tokio::test]
async fn concurrency_bounds_parallel_handlers() {
    let mut policy = HandlerPolicy::new("pay-invoice");
    policy.job_concurrency = Some(2);
    let (broker, handler, mut worker) = worker(policy).await;
    handler.set_default_reply(HandlerReply::Sleep(
        Duration::from_millis(20),
        Box::new(HandlerReply::ok(json!({}))),
    ));
    for key in 1..=6 {
        broker.push_job(job(key, "pay-invoice", 3, json!({})));
    }

    worker.start().unwrap();
    assert!(wait_until(|| broker.completed().len() == 6).await);
    worker.stop().await.unwrap();

    assert_eq!(handler.max_concurrent(), 2);
}

#[tokio::test]
async fn max_active_jobs_caps_each_activation() {
    let mut policy = HandlerPolicy::new("pay-invoice");
    policy.max_active_jobs = Some(2);
    let (broker, handler, mut worker) = worker(policy).await;
    handler.hold();
    for key in 1..=5 {
        broker.push_job(job(key, "pay-invoice", 3, json!({})));
    }

    worker.start().unwrap();
    assert!(handler.wait_for_invocations(2, Duration::from_secs(2)).await);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(worker.snapshot().in_flight, 2);
    assert_eq!(broker.pending_jobs(), 3);

    handler.release();
    assert!(wait_until(|| broker.completed().len() == 5).await);
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn threshold_defers_polling_until_active_jobs_drain() {
    let mut policy = HandlerPolicy::new("pay-invoice");
    policy.job_concurrency = Some(10);
    policy.max_active_jobs = Some(10);
    policy.poll_threshold = Some(0.3);
    let (broker, handler, mut worker) = worker(policy).await;
    handler.hold();
    for key in 1..=5 {
        broker.push_job(job(key, "pay-invoice", 3, json!({})));
    }

    worker.start().unwrap();
    assert!(handler.wait_for_invocations(5, Duration::from_secs(2)).await);
    let activations = || {
        broker
            .calls()
            .iter()
            .filter(|c| matches!(c, BrokerCall::Activate { .. }))
            .count()
    };
    let seen = activations();
    tokio::time::sleep(Duration::from_millis(40)).await;
    // 5 active jobs stay above the threshold of 3
    assert_eq!(activations(), seen);
    assert_eq!(worker.snapshot().in_flight, 5);

    handler.release();
    assert!(wait_until(|| activations() > seen).await);
    assert!(wait_until(|| broker.completed().len() == 5).await);
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn duplicate_delivery_of_in_flight_key_is_skipped() {
    let (broker, handler, mut worker) = worker(policy("pay-invoice")).await;
    handler.hold();
    broker.push_job(job(5, "pay-invoice", 3, json!({})));
    broker.push_job(job(5, "pay-invoice", 3, json!({})));

    worker.start().unwrap();
    assert!(wait_until(|| worker.snapshot().duplicates == 1).await);
    handler.release();
    assert!(wait_until(|| broker.completed().len() == 1).await);
    worker.stop().await.unwrap();

    assert_eq!(handler.invocations().len(), 1);
    assert_eq!(broker.terminal_commands_for(JobKey(5)), 1);
}

#[tokio::test]
async fn activation_errors_do_not_end_the_loop() {
    let (broker, _, mut worker) = worker(policy("pay-invoice")).await;
    broker.fail_activations(3);
    broker.push_job(pay_invoice_job());

    worker.start().unwrap();
    assert!(wait_until(|| broker.completed().len() == 1).await);
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn drain_command_error_is_reported_by_stop() {
    let (broker, handler, mut worker) = worker(policy("pay-invoice")).await;
    handler.set_default_reply(HandlerReply::error("boom"));
    handler.hold();
    broker.reject_fail(JobKey(42));
    broker.push_job(pay_invoice_job());

    worker.start().unwrap();
    assert!(handler.wait_for_invocations(1, Duration::from_secs(2)).await);
    let release = tokio::spawn({
        let handler = handler.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handler.release();
        }
    });

    let err = worker.stop().await.unwrap_err();
    release.await.unwrap();

    assert!(matches!(err, LifecycleError::TerminalCommand(ref e) if e.key == JobKey(42)));
    assert_eq!(worker.state(), WorkerState::Closed);
    assert_eq!(worker.snapshot().command_errors, 1);
    assert_eq!(broker.closed_connections(), vec![1]);
}

#[tokio::test]
async fn close_error_is_reported_after_drain() {
    let (broker, _, mut worker) = worker(policy("pay-invoice")).await;
    broker.fail_close(tb_adapters::BrokerError::Unavailable("gone".into()));

    worker.start().unwrap();
    let err = worker.stop().await.unwrap_err();

    assert!(matches!(err, LifecycleError::Close { .. }));
    assert_eq!(worker.state(), WorkerState::Closed);
}
