//! Manager lifecycle: initialize, start, stop.

use crate::prelude::*;
use tb_core::HandlerPolicy;
use tb_engine::LifecycleError;

#[tokio::test]
async fn stop_before_start_closes_nothing() {
    let mut bridge = bridge().handles("pay-invoice").initialized().await;
    let calls = bridge.broker.calls();

    bridge.manager.stop().await.unwrap();

    assert_eq!(bridge.broker.calls(), calls);
    assert!(bridge.broker.closed_connections().is_empty());
    assert_eq!(bridge.states(), vec![WorkerState::Created]);
}

#[tokio::test]
async fn stopping_twice_is_a_no_op() {
    let mut bridge = bridge().handles("pay-invoice").running().await;

    bridge.manager.stop().await.unwrap();
    let calls = bridge.broker.calls().len();
    bridge.manager.stop().await.unwrap();

    assert_eq!(bridge.broker.calls().len(), calls);
    assert_eq!(bridge.broker.closed_connections(), vec![1]);
    assert_eq!(bridge.states(), vec![WorkerState::Closed]);
}

#[tokio::test]
async fn unset_durations_fall_back_to_defaults() {
    let mut policy = HandlerPolicy::new("pay-invoice");
    policy.poll_interval = None;
    policy.job_timeout = None;
    policy.request_timeout = None;
    let mut bridge = bridge().policy(policy).running().await;

    bridge.deliver(job(1, "pay-invoice", 1, json!({})));
    bridge.wait_for_terminal(1).await;
    bridge.manager.stop().await.unwrap();

    assert_eq!(bridge.broker.completed().len(), 1);
}

#[tokio::test]
async fn workers_are_independent_per_service_type() {
    let mut bridge = bridge()
        .handles("pay-invoice")
        .handles("ship-order")
        .running()
        .await;
    assert_eq!(bridge.broker.connections_opened(), 2);

    bridge.manager.stop_worker("pay-invoice").await.unwrap();
    bridge.deliver(job(1, "ship-order", 1, json!({})));
    bridge.deliver(job(2, "pay-invoice", 1, json!({})));
    bridge.wait_for_terminal(1).await;
    bridge.manager.stop().await.unwrap();

    assert_eq!(bridge.broker.completed()[0].0, JobKey(1));
    assert_eq!(bridge.broker.pending_jobs(), 1);
}

#[tokio::test]
async fn a_stopped_worker_cannot_restart() {
    let mut bridge = bridge().handles("pay-invoice").running().await;
    bridge.manager.stop().await.unwrap();

    let err = bridge.manager.start().unwrap_err();
    assert!(matches!(err, LifecycleError::PartialStart { ref started, .. } if started.is_empty()));
}
