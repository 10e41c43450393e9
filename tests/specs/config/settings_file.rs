//! Settings loaded from a TOML file drive a running bridge.

use crate::prelude::*;
use tb_adapters::{FakeBroker, FakeTaskHandler};
use tb_core::{AdapterSettings, ReplySchema, SequentialWorkerNames};
use tb_engine::{JobWorkerManager, LifecycleError, ManagerDeps};

const SETTINGS: &str = r#"
[settings]
brokerHost = "localhost"
brokerPort = 26500
usePlainTextConnection = true

[[handlers]]
serviceType = "pay-invoice"
jobConcurrency = 2
pollInterval = "10ms"

[[handlers]]
serviceType = "ship-order"
replySchema = "variables"
"#;

fn manager(broker: &FakeBroker, handler: &FakeTaskHandler) -> SpecManager {
    JobWorkerManager::new(ManagerDeps {
        connector: broker.clone(),
        handler: handler.clone(),
    })
    .with_defaults(spec_defaults())
    .with_worker_names(SequentialWorkerNames::new("spec"))
}

#[tokio::test]
async fn toml_settings_run_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bridge.toml");
    std::fs::write(&path, SETTINGS).unwrap();
    let settings = AdapterSettings::load(&path).unwrap();
    assert_eq!(settings.handlers[1].reply_schema, ReplySchema::Variables);

    let broker = FakeBroker::new();
    let handler = FakeTaskHandler::new();
    let mut manager = manager(&broker, &handler);
    manager
        .initialize(settings.connection, settings.handlers)
        .await
        .unwrap();
    manager.start().unwrap();

    handler.reply_for(JobKey(1), HandlerReply::ok(json!({"paid": true})));
    handler.reply_for(JobKey(2), HandlerReply::output(json!({"shipped": true})));
    broker.push_job(job(1, "pay-invoice", 3, json!({})));
    broker.push_job(job(2, "ship-order", 3, json!({})));
    assert!(wait_for(|| broker.completed().len() == 2).await);
    manager.stop().await.unwrap();

    let mut completed = broker.completed();
    completed.sort_by_key(|(key, _)| *key);
    assert_eq!(serde_json::Value::Object(completed[0].1.clone()), json!({"paid": true}));
    assert_eq!(serde_json::Value::Object(completed[1].1.clone()), json!({"shipped": true}));
    assert!(broker.failed().is_empty());
}

#[tokio::test]
async fn invalid_settings_never_touch_the_broker() {
    let broker = FakeBroker::new();
    let handler = FakeTaskHandler::new();
    let mut manager = manager(&broker, &handler);

    let settings = tb_core::test_support::raw(json!({"brokerHost": "localhost"}));
    let handlers = [tb_core::test_support::raw(json!({"serviceType": "pay-invoice"}))];
    let err = manager
        .initialize_from_maps(&settings, &handlers)
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::InvalidConfig(_)));
    assert!(broker.calls().is_empty());
    assert!(!manager.is_initialized());
}
