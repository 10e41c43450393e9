// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings file loading.
//!
//! ```toml
//! [settings]
//! zeebeBrokerHost = "localhost"
//! zeebeBrokerPort = 26500
//! usePlainTextConnection = true
//!
//! [[handlers]]
//! serviceType = "pay-invoice"
//! jobConcurrency = 4
//! pollIntervalDurationString = "250ms"
//! ```
//!
//! The shorter `brokerHost`, `brokerPort`, `pollInterval` and similar
//! names are accepted as well.

use super::{ConfigError, ConnectionConfig, HandlerPolicy, RawSettings};
use crate::coerce;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Connection settings plus one policy per handled service type.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterSettings {
    pub connection: ConnectionConfig,
    pub handlers: Vec<HandlerPolicy>,
}

impl AdapterSettings {
    /// Load and validate a TOML settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::parse(&content)?;
        tracing::debug!(
            path = %path.display(),
            handlers = settings.handlers.len(),
            "loaded settings file"
        );
        Ok(settings)
    }

    /// Parse and validate TOML settings content.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
        let document =
            serde_json::to_value(table).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let settings = match document.get("settings") {
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(ConfigError::InvalidType {
                    key: "settings".to_string(),
                    expected: "a table",
                    found: coerce::describe(other),
                })
            }
            None => return Err(ConfigError::Missing("settings")),
        };

        let handlers = match document.get("handlers") {
            None => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .enumerate()
                .map(|(i, entry)| match entry {
                    Value::Object(map) => Ok(map.clone()),
                    other => Err(ConfigError::InvalidType {
                        key: format!("handlers[{}]", i),
                        expected: "a table",
                        found: coerce::describe(other),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(ConfigError::InvalidType {
                    key: "handlers".to_string(),
                    expected: "an array of tables",
                    found: coerce::describe(other),
                })
            }
        };

        Self::from_maps(&settings, &handlers)
    }

    /// Validate the untyped maps a host framework hands over.
    pub fn from_maps(settings: &RawSettings, handlers: &[RawSettings]) -> Result<Self, ConfigError> {
        let connection = ConnectionConfig::from_map(settings)?;
        let handlers = handlers
            .iter()
            .map(HandlerPolicy::from_map)
            .collect::<Result<Vec<_>, _>>()?;
        ensure_unique_service_types(&handlers)?;
        Ok(Self {
            connection,
            handlers,
        })
    }
}

/// Each service type may be bound to at most one worker.
pub fn ensure_unique_service_types(handlers: &[HandlerPolicy]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for handler in handlers {
        if !seen.insert(handler.service_type.as_str()) {
            return Err(ConfigError::DuplicateServiceType(
                handler.service_type.clone(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
