// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker connection settings

use super::{ensure_non_zero, optional_duration, with_aliases, ConfigError, RawSettings};
use crate::coerce;
use crate::duration::format_duration;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const ENABLED: &str = "enabled";
const HOST: &str = "zeebeBrokerHost";
const PORT: &str = "zeebeBrokerPort";
const PLAINTEXT: &str = "usePlainTextConnection";
const CA_CERTIFICATE_PATH: &str = "caCertificatePath";
const TOKEN: &str = "token";
const CLIENT_ID: &str = "clientID";
const CLIENT_SECRET: &str = "clientSecret";
const AUDIENCE: &str = "audienceEndpoint";
const AUTHORIZATION_SERVER_URL: &str = "authorizationServerUrl";
const CONNECTION_TIMEOUT: &str = "timeoutDurationString";

/// Short names accepted in place of the canonical keys
const ALIASES: [(&str, &str); 5] = [
    (HOST, "brokerHost"),
    (PORT, "brokerPort"),
    (CLIENT_ID, "clientId"),
    (AUDIENCE, "audience"),
    (CONNECTION_TIMEOUT, "connectionTimeout"),
];

/// OAuth2 client-credentials material for the broker gateway.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
    pub authorization_server_url: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("audience", &self.audience)
            .field("authorization_server_url", &self.authorization_server_url)
            .finish()
    }
}

/// Credential material presented when connecting.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    None,
    /// Pre-issued bearer token
    Token(String),
    OAuth(OAuthCredentials),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::None => f.write_str("None"),
            Credentials::Token(_) => f.write_str("Token(<redacted>)"),
            Credentials::OAuth(oauth) => f.debug_tuple("OAuth").field(oauth).finish(),
        }
    }
}

impl Credentials {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Credentials::None => Ok(()),
            Credentials::Token(token) if token.trim().is_empty() => Err(ConfigError::Credentials(
                format!("'{}' must not be blank", TOKEN),
            )),
            Credentials::Token(_) => Ok(()),
            Credentials::OAuth(oauth) => {
                let blank: Vec<&str> = [
                    (CLIENT_ID, &oauth.client_id),
                    (CLIENT_SECRET, &oauth.client_secret),
                    (AUDIENCE, &oauth.audience),
                    (AUTHORIZATION_SERVER_URL, &oauth.authorization_server_url),
                ]
                .into_iter()
                .filter(|(_, v)| v.trim().is_empty())
                .map(|(k, _)| k)
                .collect();
                if !blank.is_empty() {
                    return Err(ConfigError::Credentials(format!(
                        "incomplete OAuth settings, missing {}",
                        blank.join(", ")
                    )));
                }
                let url = &oauth.authorization_server_url;
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(ConfigError::Credentials(format!(
                        "'{}' must be an http(s) URL, got {:?}",
                        AUTHORIZATION_SERVER_URL, url
                    )));
                }
                Ok(())
            }
        }
    }

    /// Resolve credential fields as a group: none, a token alone, or a
    /// complete OAuth2 client-credentials set.
    fn from_map(values: &RawSettings) -> Result<Self, ConfigError> {
        let token = coerce::to_string(values, TOKEN)?;
        let oauth_fields = [
            (CLIENT_ID, coerce::to_string(values, CLIENT_ID)?),
            (CLIENT_SECRET, coerce::to_string(values, CLIENT_SECRET)?),
            (AUDIENCE, coerce::to_string(values, AUDIENCE)?),
            (
                AUTHORIZATION_SERVER_URL,
                coerce::to_string(values, AUTHORIZATION_SERVER_URL)?,
            ),
        ];
        let supplied: Vec<&str> = oauth_fields
            .iter()
            .filter(|(_, v)| v.is_some())
            .map(|(k, _)| *k)
            .collect();

        if let Some(token) = token {
            if !supplied.is_empty() {
                return Err(ConfigError::Credentials(format!(
                    "'{}' cannot be combined with OAuth settings ({})",
                    TOKEN,
                    supplied.join(", ")
                )));
            }
            return Ok(Credentials::Token(token));
        }

        if supplied.is_empty() {
            return Ok(Credentials::None);
        }

        let missing: Vec<&str> = oauth_fields
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Credentials(format!(
                "incomplete OAuth settings, missing {}",
                missing.join(", ")
            )));
        }

        let [(_, client_id), (_, client_secret), (_, audience), (_, url)] = oauth_fields;
        let (Some(client_id), Some(client_secret), Some(audience), Some(url)) =
            (client_id, client_secret, audience, url)
        else {
            return Err(ConfigError::Credentials(
                "incomplete OAuth settings".to_string(),
            ));
        };
        Ok(Credentials::OAuth(OAuthCredentials {
            client_id,
            client_secret,
            audience,
            authorization_server_url: url,
        }))
    }
}

/// Settings for reaching the broker gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    /// A disabled adapter refuses to initialize
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub plaintext: bool,
    pub credentials: Credentials,
    pub ca_certificate_path: Option<PathBuf>,
    /// Bound on establishing the connection (None = connector default)
    pub connection_timeout: Option<Duration>,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            enabled: true,
            host: host.into(),
            port,
            plaintext: false,
            credentials: Credentials::None,
            ca_certificate_path: None,
            connection_timeout: None,
        }
    }

    /// `host:port` address of the gateway
    pub fn gateway_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate an untyped settings map.
    ///
    /// Host and port are required; every other field is optional and stays
    /// unset when absent so the connector applies its own default. An
    /// absent `enabled` reads as enabled.
    pub fn from_map(values: &RawSettings) -> Result<Self, ConfigError> {
        let values = with_aliases(values, &ALIASES);
        let values = values.as_ref();
        let enabled = coerce::to_bool(values, ENABLED)?.unwrap_or(true);
        let host = coerce::to_string(values, HOST)?.ok_or(ConfigError::Missing(HOST))?;
        let port = coerce::to_i64(values, PORT)?.ok_or(ConfigError::Missing(PORT))?;
        let port = u16::try_from(port).map_err(|_| ConfigError::OutOfRange {
            key: PORT.to_string(),
            reason: format!("{} is not a TCP port", port),
        })?;

        let config = Self {
            enabled,
            host,
            port,
            plaintext: coerce::to_bool(values, PLAINTEXT)?.unwrap_or(false),
            credentials: Credentials::from_map(values)?,
            ca_certificate_path: coerce::to_string(values, CA_CERTIFICATE_PATH)?
                .map(PathBuf::from),
            connection_timeout: optional_duration(values, CONNECTION_TIMEOUT)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the settings however they were built: a non-blank host, a
    /// non-zero port, consistent TLS and credential material, and a
    /// connection timeout that is unset or greater than zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing(HOST));
        }
        if self.port == 0 {
            return Err(ConfigError::OutOfRange {
                key: PORT.to_string(),
                reason: "0 is not a TCP port".to_string(),
            });
        }
        if self.plaintext && self.ca_certificate_path.is_some() {
            return Err(ConfigError::OutOfRange {
                key: CA_CERTIFICATE_PATH.to_string(),
                reason: format!("cannot be used together with {}", PLAINTEXT),
            });
        }
        self.credentials.validate()?;
        ensure_non_zero(CONNECTION_TIMEOUT, self.connection_timeout)
    }

    /// Serialize back to a settings map accepted by [`ConnectionConfig::from_map`].
    pub fn to_map(&self) -> RawSettings {
        let mut map = RawSettings::new();
        map.insert(ENABLED.into(), Value::Bool(self.enabled));
        map.insert(HOST.into(), Value::String(self.host.clone()));
        map.insert(PORT.into(), Value::from(self.port));
        map.insert(PLAINTEXT.into(), Value::Bool(self.plaintext));
        if let Some(path) = &self.ca_certificate_path {
            map.insert(
                CA_CERTIFICATE_PATH.into(),
                Value::String(path.display().to_string()),
            );
        }
        match &self.credentials {
            Credentials::None => {}
            Credentials::Token(token) => {
                map.insert(TOKEN.into(), Value::String(token.clone()));
            }
            Credentials::OAuth(oauth) => {
                map.insert(CLIENT_ID.into(), Value::String(oauth.client_id.clone()));
                map.insert(
                    CLIENT_SECRET.into(),
                    Value::String(oauth.client_secret.clone()),
                );
                map.insert(AUDIENCE.into(), Value::String(oauth.audience.clone()));
                map.insert(
                    AUTHORIZATION_SERVER_URL.into(),
                    Value::String(oauth.authorization_server_url.clone()),
                );
            }
        }
        if let Some(timeout) = self.connection_timeout {
            map.insert(
                CONNECTION_TIMEOUT.into(),
                Value::String(format_duration(timeout)),
            );
        }
        map
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
