//! Every failure path ends in a single fail command with retries minus one.

use crate::prelude::*;

#[tokio::test]
async fn handler_error_fails_with_decremented_retries() {
    let mut bridge = bridge().handles("pay-invoice").running().await;
    bridge
        .handler
        .reply_for(JobKey(42), HandlerReply::error("card declined"));

    bridge.deliver(job(42, "pay-invoice", 3, json!({"amount": 100})));
    bridge.wait_for_terminal(1).await;
    bridge.manager.stop().await.unwrap();

    let failed = bridge.broker.failed();
    assert_eq!(failed.len(), 1);
    let (key, retries, message) = &failed[0];
    assert_eq!(*key, JobKey(42));
    assert_eq!(*retries, 2);
    assert!(message.contains("card declined"), "message: {message}");
    assert!(bridge.broker.completed().is_empty());
}

#[tokio::test]
async fn missing_required_result_field_fails_the_job() {
    let mut bridge = bridge().handles("pay-invoice").running().await;
    bridge.handler.reply_for(
        JobKey(42),
        HandlerReply::output(json!({"outputVariables": {"paid": true}})),
    );

    bridge.deliver(job(42, "pay-invoice", 3, json!({})));
    bridge.wait_for_terminal(1).await;
    bridge.manager.stop().await.unwrap();

    let failed = bridge.broker.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].1, 2);
    assert!(failed[0].2.contains("status"), "message: {}", failed[0].2);
    assert!(bridge.broker.completed().is_empty());
}

#[tokio::test]
async fn zero_retries_fail_with_minus_one() {
    let mut bridge = bridge().handles("pay-invoice").running().await;
    bridge.handler.reply_for(JobKey(9), HandlerReply::error("nope"));

    bridge.deliver(job(9, "pay-invoice", 0, json!({})));
    bridge.wait_for_terminal(1).await;
    bridge.manager.stop().await.unwrap();

    assert_eq!(bridge.broker.failed()[0].1, -1);
}

#[tokio::test]
async fn malformed_variables_fail_without_invoking_the_handler() {
    let mut bridge = bridge().handles("pay-invoice").running().await;
    let mut bad = job(5, "pay-invoice", 1, json!({}));
    bad.variables = "{not json".to_string();

    bridge.deliver(bad);
    bridge.wait_for_terminal(1).await;
    bridge.manager.stop().await.unwrap();

    assert!(bridge.handler.invocations().is_empty());
    assert_eq!(bridge.broker.failed()[0].1, 0);
}

#[tokio::test]
async fn rejected_complete_falls_back_to_fail() {
    let mut bridge = bridge().handles("pay-invoice").running().await;
    bridge.broker.reject_complete(JobKey(42));

    bridge.deliver(job(42, "pay-invoice", 3, json!({})));
    bridge.wait_for_terminal(2).await;
    bridge.manager.stop().await.unwrap();

    let failed = bridge.broker.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].1, 2);
    assert!(failed[0].2.starts_with("complete command failed"), "message: {}", failed[0].2);
}
