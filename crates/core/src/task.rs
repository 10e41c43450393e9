// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task invocation contract between broker jobs and host handlers.
//!
//! A [`TaskInvocation`] is the normalized request built once per job. The
//! handler's generic output map is read back as a [`TaskResult`] according
//! to the worker's [`ReplySchema`], and every result reduces to exactly one
//! [`TerminalDecision`].

use crate::job::{Job, JobError, JobKey, VariableMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Input map fields
const JOB_KEY: &str = "jobKey";
const JOB_TYPE: &str = "jobType";
const RETRIES: &str = "retries";
const HEADERS: &str = "headers";
const INPUT_VARIABLES: &str = "inputVariables";

// Output map fields
const STATUS: &str = "status";
const MESSAGE: &str = "message";
const OUTPUT_VARIABLES: &str = "outputVariables";
const APPLICATION_MESSAGE_TYPE: &str = "applicationMessageType";
const APPLICATION_MESSAGE_CODE: &str = "applicationMessageCode";
const APPLICATION_MESSAGE_TEXT: &str = "applicationMessageText";

const STATUS_OK: &str = "ok";
const APPLICATION_ERROR: &str = "ERROR";

/// Shape of the handler output a worker expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplySchema {
    /// The whole output map is the completion payload
    Variables,
    /// `{status, outputVariables, message?}` envelope
    #[default]
    Status,
    /// `{applicationMessageType, applicationMessageCode, applicationMessageText, outputVariables}`
    ApplicationMessage,
}

impl ReplySchema {
    pub fn as_str(self) -> &'static str {
        match self {
            ReplySchema::Variables => "variables",
            ReplySchema::Status => "status",
            ReplySchema::ApplicationMessage => "applicationMessage",
        }
    }
}

impl fmt::Display for ReplySchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplySchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "variables" | "plain" => Ok(ReplySchema::Variables),
            "status" => Ok(ReplySchema::Status),
            "applicationmessage" => Ok(ReplySchema::ApplicationMessage),
            _ => Err(format!("unknown reply schema: {}", s)),
        }
    }
}

/// Normalized request handed to the host handler. Built per job, consumed
/// by the single invocation.
#[derive(Debug, PartialEq)]
pub struct TaskInvocation {
    pub job_key: JobKey,
    pub job_type: String,
    pub retries: i32,
    pub headers: VariableMap,
    pub variables: VariableMap,
}

impl TaskInvocation {
    /// Extract headers and variables from a job.
    pub fn from_job(job: &Job) -> Result<Self, JobError> {
        Ok(Self {
            job_key: job.key(),
            job_type: job.job_type().to_string(),
            retries: job.retries(),
            headers: job.custom_headers_map()?,
            variables: job.variables_map()?,
        })
    }

    /// Input map for the host handler.
    pub fn into_input(self) -> VariableMap {
        let mut input = VariableMap::new();
        input.insert(JOB_KEY.into(), Value::from(self.job_key.get()));
        input.insert(JOB_TYPE.into(), Value::String(self.job_type));
        input.insert(RETRIES.into(), Value::from(self.retries));
        input.insert(HEADERS.into(), Value::Object(self.headers));
        input.insert(INPUT_VARIABLES.into(), Value::Object(self.variables));
        input
    }
}

/// Handler output that does not fit the configured reply schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResultShapeError {
    #[error("handler output is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("handler output field '{field}' must be {expected}, got {found}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: String,
    },
}

/// Typed handler result, one variant per reply schema.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Variables(VariableMap),
    Status {
        status: String,
        message: Option<String>,
        variables: VariableMap,
    },
    ApplicationMessage {
        message_type: String,
        code: String,
        text: String,
        variables: VariableMap,
    },
}

/// The single terminal action derived from a result.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalDecision {
    Complete { variables: VariableMap },
    Fail { message: String },
}

impl TaskResult {
    /// Read a handler output map according to `schema`.
    pub fn from_output(schema: ReplySchema, mut output: VariableMap) -> Result<Self, ResultShapeError> {
        match schema {
            ReplySchema::Variables => Ok(TaskResult::Variables(output)),
            ReplySchema::Status => {
                let status =
                    take_string(&mut output, STATUS)?.ok_or(ResultShapeError::MissingField(STATUS))?;
                let message = take_string(&mut output, MESSAGE)?;
                let variables = take_object(&mut output, OUTPUT_VARIABLES)?;
                let variables = match variables {
                    Some(vars) => vars,
                    None if is_ok_status(&status) => {
                        return Err(ResultShapeError::MissingField(OUTPUT_VARIABLES))
                    }
                    None => VariableMap::new(),
                };
                Ok(TaskResult::Status {
                    status,
                    message,
                    variables,
                })
            }
            ReplySchema::ApplicationMessage => {
                let message_type = take_string(&mut output, APPLICATION_MESSAGE_TYPE)?
                    .ok_or(ResultShapeError::MissingField(APPLICATION_MESSAGE_TYPE))?;
                Ok(TaskResult::ApplicationMessage {
                    message_type,
                    code: take_string(&mut output, APPLICATION_MESSAGE_CODE)?.unwrap_or_default(),
                    text: take_string(&mut output, APPLICATION_MESSAGE_TEXT)?.unwrap_or_default(),
                    variables: take_object(&mut output, OUTPUT_VARIABLES)?.unwrap_or_default(),
                })
            }
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            TaskResult::Variables(_) => true,
            TaskResult::Status { status, .. } => is_ok_status(status),
            TaskResult::ApplicationMessage { message_type, .. } => {
                !message_type.eq_ignore_ascii_case(APPLICATION_ERROR)
            }
        }
    }

    pub fn into_decision(self) -> TerminalDecision {
        let success = self.is_success();
        match self {
            TaskResult::Variables(variables) => TerminalDecision::Complete { variables },
            TaskResult::Status { variables, .. } if success => {
                TerminalDecision::Complete { variables }
            }
            TaskResult::Status {
                status, message, ..
            } => {
                let message = match message {
                    Some(m) => format!("handler reported status '{}': {}", status, m),
                    None => format!("handler reported status '{}'", status),
                };
                TerminalDecision::Fail { message }
            }
            TaskResult::ApplicationMessage { variables, .. } if success => {
                TerminalDecision::Complete { variables }
            }
            TaskResult::ApplicationMessage { code, text, .. } => {
                let mut message = "application error".to_string();
                if !code.is_empty() {
                    message.push_str(&format!(" [{}]", code));
                }
                if !text.is_empty() {
                    message.push_str(&format!(": {}", text));
                }
                TerminalDecision::Fail { message }
            }
        }
    }
}

fn is_ok_status(status: &str) -> bool {
    status.eq_ignore_ascii_case(STATUS_OK)
}

fn take_string(
    output: &mut VariableMap,
    field: &'static str,
) -> Result<Option<String>, ResultShapeError> {
    match output.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(ResultShapeError::WrongType {
            field,
            expected: "a string",
            found: crate::coerce::describe(&other),
        }),
    }
}

fn take_object(
    output: &mut VariableMap,
    field: &'static str,
) -> Result<Option<VariableMap>, ResultShapeError> {
    match output.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(ResultShapeError::WrongType {
            field,
            expected: "an object",
            found: crate::coerce::describe(&other),
        }),
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
