// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn handler_error_message_is_preserved() {
    let err = DispatchError::from(TaskError::from(HandlerError::new("card declined")));
    assert_eq!(err.to_string(), "handler failed: card declined");
}

#[test]
fn timeout_renders_duration() {
    let err = TaskError::Timeout(Duration::from_millis(1500));
    assert_eq!(err.to_string(), "handler timed out after 1500ms");
}

#[test]
fn shape_errors_render_field_name() {
    let err = DispatchError::from(TaskError::from(ResultShapeError::MissingField(
        "outputVariables",
    )));
    assert!(err.to_string().contains("outputVariables"));
}

#[test]
fn terminal_command_error_names_job() {
    let err = TerminalCommandError {
        key: JobKey(42),
        command: "fail",
        source: BrokerError::Closed,
    };
    assert_eq!(
        err.to_string(),
        "fail command for job 42 failed: broker connection closed"
    );
}

#[test]
fn aggregates_list_each_worker() {
    let err = LifecycleError::Shutdown {
        failures: vec![
            WorkerFailure {
                service_type: "pay-invoice".into(),
                error: LifecycleError::WorkerTask("panicked".into()),
            },
            WorkerFailure {
                service_type: "ship-order".into(),
                error: LifecycleError::Close {
                    service_type: "ship-order".into(),
                    source: BrokerError::Closed,
                },
            },
        ],
    };
    let text = err.to_string();
    assert!(text.starts_with("2 worker(s) failed to stop cleanly"));
    assert!(text.contains("pay-invoice: worker task failed: panicked"));
    assert!(text.contains("ship-order: closing connection"));
}

#[test]
fn partial_start_lists_running_workers() {
    let err = LifecycleError::PartialStart {
        started: vec!["pay-invoice".into()],
        failures: vec![WorkerFailure {
            service_type: "ship-order".into(),
            error: LifecycleError::InvalidTransition {
                worker: "ship-order".into(),
                from: WorkerState::Closed,
                to: WorkerState::Open,
            },
        }],
    };
    assert_eq!(
        err.to_string(),
        "1 worker(s) failed to start (running: [pay-invoice]): ship-order: worker ship-order: cannot transition from closed to open"
    );
}
