//! Engine configuration.
//!
//! All knobs live in one explicit struct handed to the engine's
//! constructor; nothing is read ambiently at run time. Required keys are
//! validated up front so a misconfigured deployment fails at startup with
//! every missing key named, not mid-run with an opaque 401.

use std::collections::HashMap;
use std::time::Duration;

use loclink_languagecloud::client::{
    ClientConfig, DEFAULT_API_BASE, DEFAULT_AUTH_AUDIENCE, DEFAULT_AUTH_BASE,
};

/// Default number of days until a new project's due date.
const DEFAULT_DUE_BY_DAYS: i64 = 7;

/// Default per-request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration error raised at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required settings: {}", .0.join(", "))]
    MissingSettings(Vec<String>),
}

/// Settings for one sync deployment.
///
/// Loaded from environment variables by [`from_env`](Self::from_env);
/// hosts embedding the engine may construct it directly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// OAuth client id (required).
    pub client_id: String,
    /// OAuth client secret (required).
    pub client_secret: String,
    /// Tenant account id sent with every API call (required).
    pub account_id: String,
    /// Default project template for new projects (required).
    pub template_id: String,
    /// Default location for new projects (required).
    pub location_id: String,
    /// OAuth token endpoint.
    pub auth_base: String,
    /// OAuth audience.
    pub auth_audience: String,
    /// API base URL.
    pub api_base: String,
    /// Prefix prepended to generated project names.
    pub project_prefix: String,
    /// Days from "now" to a generated due date.
    pub due_by_days: i64,
    /// Fixed per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Optional fixed pause before each remote call, in milliseconds.
    pub call_delay_ms: Option<u64>,
    /// Host locale code → remote language code overrides.
    pub locale_map: HashMap<String, String>,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                   | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `LC_CLIENT_ID`             | yes      | —       |
    /// | `LC_CLIENT_SECRET`         | yes      | —       |
    /// | `LC_ACCOUNT_ID`            | yes      | —       |
    /// | `LC_TEMPLATE_ID`           | yes      | —       |
    /// | `LC_LOCATION_ID`           | yes      | —       |
    /// | `LC_AUTH_BASE`             | no       | production auth endpoint |
    /// | `LC_AUTH_AUDIENCE`         | no       | production audience      |
    /// | `LC_API_BASE`              | no       | production API base      |
    /// | `LC_PROJECT_PREFIX`        | no       | empty   |
    /// | `LC_DUE_BY_DAYS`           | no       | `7`     |
    /// | `LC_REQUEST_TIMEOUT_SECS`  | no       | `30`    |
    /// | `LC_CALL_DELAY_MS`         | no       | unset   |
    /// | `LC_LOCALE_MAP`            | no       | empty; `host:remote` pairs, comma-separated |
    pub fn from_env() -> Self {
        Self {
            client_id: std::env::var("LC_CLIENT_ID").unwrap_or_default(),
            client_secret: std::env::var("LC_CLIENT_SECRET").unwrap_or_default(),
            account_id: std::env::var("LC_ACCOUNT_ID").unwrap_or_default(),
            template_id: std::env::var("LC_TEMPLATE_ID").unwrap_or_default(),
            location_id: std::env::var("LC_LOCATION_ID").unwrap_or_default(),
            auth_base: std::env::var("LC_AUTH_BASE")
                .unwrap_or_else(|_| DEFAULT_AUTH_BASE.to_string()),
            auth_audience: std::env::var("LC_AUTH_AUDIENCE")
                .unwrap_or_else(|_| DEFAULT_AUTH_AUDIENCE.to_string()),
            api_base: std::env::var("LC_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            project_prefix: std::env::var("LC_PROJECT_PREFIX").unwrap_or_default(),
            due_by_days: std::env::var("LC_DUE_BY_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DUE_BY_DAYS),
            request_timeout_secs: std::env::var("LC_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            call_delay_ms: std::env::var("LC_CALL_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok()),
            locale_map: std::env::var("LC_LOCALE_MAP")
                .map(|v| parse_locale_map(&v))
                .unwrap_or_default(),
        }
    }

    /// Check that every required key is present; reports all missing keys
    /// at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("LC_CLIENT_ID", &self.client_id),
            ("LC_CLIENT_SECRET", &self.client_secret),
            ("LC_ACCOUNT_ID", &self.account_id),
            ("LC_TEMPLATE_ID", &self.template_id),
            ("LC_LOCATION_ID", &self.location_id),
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(key, _)| key.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingSettings(missing))
        }
    }

    /// The client-facing subset of this configuration.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            auth_base: self.auth_base.clone(),
            auth_audience: self.auth_audience.clone(),
            api_base: self.api_base.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            account_id: self.account_id.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            call_delay: self.call_delay_ms.map(Duration::from_millis),
            locale_map: self.locale_map.clone(),
        }
    }
}

/// Parse `host:remote` pairs from a comma-separated list, e.g.
/// `"fr:fr-FR,de:de-DE"`. Entries without a colon are ignored.
fn parse_locale_map(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (host, remote) = pair.split_once(':')?;
            let (host, remote) = (host.trim(), remote.trim());
            if host.is_empty() || remote.is_empty() {
                return None;
            }
            Some((host.to_string(), remote.to_string()))
        })
        .collect()
}
