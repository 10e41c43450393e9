// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration model: broker connection settings and per-service-type
//! polling policy, validated once from untyped settings maps.

mod connection;
mod file;
mod policy;

pub use connection::{ConnectionConfig, Credentials, OAuthCredentials};
pub use file::{ensure_unique_service_types, AdapterSettings};
pub use policy::HandlerPolicy;

use crate::coerce;
use crate::duration::parse_duration;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;

/// Untyped settings map as handed over by a host framework.
pub type RawSettings = serde_json::Map<String, serde_json::Value>;

/// Malformed or missing settings. Fatal at initialization.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting '{0}'")]
    Missing(&'static str),
    #[error("setting '{key}' must be {expected}, got {found}")]
    InvalidType {
        key: String,
        expected: &'static str,
        found: String,
    },
    #[error("setting '{key}' is out of range: {reason}")]
    OutOfRange { key: String, reason: String },
    #[error("invalid duration for '{key}': {reason}")]
    InvalidDuration { key: String, reason: String },
    #[error("invalid credentials: {0}")]
    Credentials(String),
    #[error("unknown reply schema '{0}' (expected status, variables or applicationMessage)")]
    UnknownReplySchema(String),
    #[error("duplicate handler for service type '{0}'")]
    DuplicateServiceType(String),
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings file: {0}")]
    Parse(String),
}

/// Read an optional duration setting. Blank means unset.
fn optional_duration(values: &RawSettings, key: &str) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = coerce::to_string(values, key)? else {
        return Ok(None);
    };
    parse_duration(&raw)
        .map(Some)
        .map_err(|reason| ConfigError::InvalidDuration {
            key: key.to_string(),
            reason,
        })
}

/// Copy values given under an accepted alternate name onto the canonical
/// key. A canonical value that is set wins over its alias.
fn with_aliases<'a>(
    values: &'a RawSettings,
    aliases: &[(&'static str, &'static str)],
) -> Cow<'a, RawSettings> {
    let mut resolved = Cow::Borrowed(values);
    for &(canonical, alias) in aliases {
        if coerce::is_set(values, canonical) || !coerce::is_set(values, alias) {
            continue;
        }
        if let Some(value) = values.get(alias) {
            resolved.to_mut().insert(canonical.to_string(), value.clone());
        }
    }
    resolved
}

/// Reject a duration set to zero; the broker reads zero as "disabled".
fn ensure_non_zero(key: &str, duration: Option<Duration>) -> Result<(), ConfigError> {
    match duration {
        Some(d) if d.is_zero() => Err(ConfigError::OutOfRange {
            key: key.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        _ => Ok(()),
    }
}
