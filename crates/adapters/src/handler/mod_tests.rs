// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::{json, Value};

fn context(key: i64) -> HandlerContext {
    HandlerContext {
        job_key: JobKey(key),
        job_type: "pay-invoice".to_string(),
        worker: "billing".to_string(),
        retries: 3,
    }
}

#[tokio::test]
async fn closure_handler_receives_context_and_input() {
    let handler = handler_fn(|ctx: HandlerContext, input: VariableMap| async move {
        let mut out = VariableMap::new();
        out.insert("key".into(), json!(ctx.job_key.get()));
        out.insert("echo".into(), Value::Object(input));
        Ok(out)
    });

    let mut input = VariableMap::new();
    input.insert("amount".into(), json!(100));
    let out = handler.handle(context(42), input).await.unwrap();

    assert_eq!(out["key"], json!(42));
    assert_eq!(out["echo"], json!({"amount": 100}));
}

#[tokio::test]
async fn closure_handler_propagates_errors() {
    let handler = handler_fn(|_ctx, _input| async { Err(HandlerError::new("card declined")) });
    let err = handler
        .handle(context(1), VariableMap::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "card declined");
}
