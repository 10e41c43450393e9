//! Successful handler results complete the job.

use crate::prelude::*;
use std::time::Duration;
use tb_adapters::{handler_fn, FakeBroker, HandlerContext, HandlerError};
use tb_core::{SequentialWorkerNames, VariableMap};
use tb_engine::{JobWorkerManager, ManagerDeps};

#[tokio::test]
async fn ok_status_completes_with_output_variables() {
    let mut bridge = bridge().handles("pay-invoice").running().await;
    bridge
        .handler
        .reply_for(JobKey(42), HandlerReply::ok(json!({"paid": true})));

    bridge.deliver(job(42, "pay-invoice", 3, json!({"amount": 100})));
    bridge.wait_for_terminal(1).await;
    bridge.manager.stop().await.unwrap();

    let completed = bridge.broker.completed();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].0, JobKey(42));
    assert_eq!(serde_json::Value::Object(completed[0].1.clone()), json!({"paid": true}));
    assert!(bridge.broker.failed().is_empty());
}

#[tokio::test]
async fn handler_sees_job_fields_and_variables() {
    let mut bridge = bridge().handles("pay-invoice").running().await;

    bridge.deliver(job(42, "pay-invoice", 3, json!({"amount": 100})));
    bridge.wait_for_terminal(1).await;
    bridge.manager.stop().await.unwrap();

    let invocations = bridge.handler.invocations();
    assert_eq!(invocations.len(), 1);
    let invocation = &invocations[0];
    assert_eq!(invocation.context.job_key, JobKey(42));
    assert_eq!(invocation.context.worker, "pay-invoice-spec-1");
    assert_eq!(invocation.input["jobType"], json!("pay-invoice"));
    assert_eq!(invocation.input["retries"], json!(3));
    assert_eq!(invocation.input["inputVariables"], json!({"amount": 100}));
}

#[tokio::test]
async fn closure_handler_runs_against_the_broker() {
    let broker = FakeBroker::new();
    let handler = handler_fn(|ctx: HandlerContext, input: VariableMap| async move {
        let amount = input["inputVariables"]["amount"]
            .as_i64()
            .ok_or_else(|| HandlerError::new("amount missing"))?;
        let mut output = VariableMap::new();
        output.insert("status".into(), json!("ok"));
        output.insert(
            "outputVariables".into(),
            json!({"charged": amount, "job": ctx.job_key.get()}),
        );
        Ok(output)
    });
    let mut manager = JobWorkerManager::new(ManagerDeps {
        connector: broker.clone(),
        handler,
    })
    .with_defaults(spec_defaults())
    .with_worker_names(SequentialWorkerNames::new("spec"));
    manager
        .initialize(local_connection(), vec![tb_core::HandlerPolicy::new("pay-invoice")])
        .await
        .unwrap();
    manager.start().unwrap();

    broker.push_job(job(7, "pay-invoice", 1, json!({"amount": 250})));
    broker.push_job(job(8, "pay-invoice", 1, json!({})));
    assert!(wait_for(|| broker.completed().len() + broker.failed().len() == 2).await);
    manager.stop().await.unwrap();

    let completed = broker.completed();
    assert_eq!(completed.len(), 1);
    assert_eq!(
        serde_json::Value::Object(completed[0].1.clone()),
        json!({"charged": 250, "job": 7})
    );
    let failed = broker.failed();
    assert_eq!(failed[0].0, JobKey(8));
    assert!(failed[0].2.contains("amount missing"));
}

#[tokio::test]
async fn each_job_gets_exactly_one_terminal_command() {
    let mut bridge = bridge().handles("pay-invoice").running().await;
    bridge.handler.reply_for(JobKey(2), HandlerReply::error("boom"));
    bridge.handler.reply_for(
        JobKey(3),
        HandlerReply::Sleep(Duration::from_millis(20), Box::new(HandlerReply::ok(json!({})))),
    );

    for key in 1..=5 {
        bridge.deliver(job(key, "pay-invoice", 2, json!({})));
    }
    bridge.wait_for_terminal(5).await;
    bridge.manager.stop().await.unwrap();

    for key in 1..=5 {
        assert_eq!(bridge.broker.terminal_commands_for(JobKey(key)), 1, "job {key}");
    }
}
