//! REST client for the LanguageCloud public API.
//!
//! One [`ApiClient`] is constructed per sync run. [`authenticate`]
//! (LanguageCloud::authenticate) requests an OAuth token once; every
//! other call sends it as a Bearer header plus the tenant header. Calls
//! made before authentication fail with
//! [`LanguageCloudError::AuthenticationRequired`].

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tokio::sync::RwLock;

use loclink_core::types::Timestamp;

use crate::cache::TtlCache;

/// Due dates are sent in this fixed UTC format.
const DUE_BY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000Z";

/// How long the project-template listing stays cached.
const TEMPLATE_CACHE_TTL: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the LanguageCloud API layer.
#[derive(Debug, thiserror::Error)]
pub enum LanguageCloudError {
    /// A call was made before `authenticate()`.
    #[error("authenticate() must be called before using the API")]
    AuthenticationRequired,

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("LanguageCloud API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response that does not match the expected shape.
    #[error("malformed LanguageCloud response: {0}")]
    Malformed(String),

    /// Zero or multiple target files matched a download request.
    #[error("target file not found: {0}")]
    NotFound(String),
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_AUTH_BASE: &str = "https://sdl-prod.eu.auth0.com/oauth/token";
pub const DEFAULT_AUTH_AUDIENCE: &str = "https://api.sdl.com";
pub const DEFAULT_API_BASE: &str = "https://lc-api.sdl.com/public-api/v1";

/// Connection settings for one LanguageCloud tenant.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub auth_base: String,
    pub auth_audience: String,
    pub api_base: String,
    pub client_id: String,
    pub client_secret: String,
    /// Tenant id sent in the `X-LC-Tenant` header.
    pub account_id: String,
    /// Fixed timeout applied to every request.
    pub request_timeout: Duration,
    /// Optional fixed pause before each call, as rate-limit courtesy.
    /// This is pacing, not retry backoff.
    pub call_delay: Option<Duration>,
    /// Host locale code → LanguageCloud language code. Codes missing
    /// from the map pass through unchanged.
    pub locale_map: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Everything needed to create a remote project.
#[derive(Debug, Clone)]
pub struct CreateProjectRequest {
    pub name: String,
    pub due_by: Timestamp,
    pub description: String,
    pub template_id: String,
    pub location_id: String,
    pub source_locale: String,
    pub target_locales: Vec<String>,
}

/// A project template as listed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<TemplateLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateLocation {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct TemplateListResponse {
    #[serde(default)]
    items: Vec<ProjectTemplate>,
}

#[derive(Debug, Deserialize)]
struct TargetFileListResponse {
    #[serde(default)]
    items: Vec<TargetFileEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetFileEntry {
    id: String,
    source_file: FileRef,
    latest_version: VersionRef,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct VersionRef {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// The remote-service operations the sync engine depends on.
#[async_trait]
pub trait LanguageCloud: Send + Sync {
    /// Request an OAuth token for the rest of the run. Must succeed
    /// before any other call.
    async fn authenticate(&self) -> Result<(), LanguageCloudError>;

    /// Create a project; returns the remote project id.
    async fn create_project(
        &self,
        request: &CreateProjectRequest,
    ) -> Result<String, LanguageCloudError>;

    /// Upload one translatable source file; returns the remote file id.
    async fn create_source_file(
        &self,
        project_id: &str,
        content: &str,
        filename: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> Result<String, LanguageCloudError>;

    /// Move a fully-uploaded project into translation.
    async fn start_project(&self, project_id: &str) -> Result<(), LanguageCloudError>;

    /// Mark a project finished after all translations imported.
    async fn complete_project(&self, project_id: &str) -> Result<(), LanguageCloudError>;

    /// Fetch the project's current status string.
    async fn get_project(&self, project_id: &str) -> Result<String, LanguageCloudError>;

    /// Download the translated counterpart of a source file.
    async fn download_target_file(
        &self,
        project_id: &str,
        source_file_id: &str,
    ) -> Result<String, LanguageCloudError>;

    /// List the tenant's project templates (cached for five minutes).
    async fn get_project_templates(&self) -> Result<Vec<ProjectTemplate>, LanguageCloudError>;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip characters the service rejects in project names: anything
/// outside word characters, hyphens, and spaces.
pub fn sanitize_project_name(name: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"[^\w\- ]").expect("project name pattern is valid")
    });
    pattern.replace_all(name, "").into_owned()
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// HTTP client for one LanguageCloud tenant.
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
    token: RwLock<Option<String>>,
    templates: TtlCache<Vec<ProjectTemplate>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, LanguageCloudError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            config,
            token: RwLock::new(None),
            templates: TtlCache::new(TEMPLATE_CACHE_TTL),
        })
    }

    /// Map a host locale code to the service's language code.
    fn map_locale(&self, code: &str) -> String {
        self.config
            .locale_map
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    /// The stored bearer token, or `AuthenticationRequired`.
    async fn bearer_token(&self) -> Result<String, LanguageCloudError> {
        self.token
            .read()
            .await
            .clone()
            .ok_or(LanguageCloudError::AuthenticationRequired)
    }

    /// Optional fixed pause before a call, as rate-limit courtesy.
    async fn pace(&self) {
        if let Some(delay) = self.config.call_delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an `Api` error containing the
    /// status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, LanguageCloudError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LanguageCloudError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful response body into the expected type. A 2xx
    /// body that does not deserialize is a `Malformed` error, so callers
    /// can count it against the attempt budget like any other failure.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, LanguageCloudError> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| LanguageCloudError::Malformed(e.to_string()))
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), LanguageCloudError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[async_trait]
impl LanguageCloud for ApiClient {
    async fn authenticate(&self) -> Result<(), LanguageCloudError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("audience", self.config.auth_audience.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.config.auth_base)
            .form(&params)
            .send()
            .await?;

        let token: TokenResponse = Self::parse_response(response).await?;
        *self.token.write().await = Some(token.access_token);

        tracing::info!("Authenticated against LanguageCloud");
        Ok(())
    }

    async fn create_project(
        &self,
        request: &CreateProjectRequest,
    ) -> Result<String, LanguageCloudError> {
        let token = self.bearer_token().await?;
        self.pace().await;

        let language_directions: Vec<serde_json::Value> = request
            .target_locales
            .iter()
            .map(|target| {
                serde_json::json!({
                    "sourceLanguage": { "languageCode": self.map_locale(&request.source_locale) },
                    "targetLanguage": { "languageCode": self.map_locale(target) },
                })
            })
            .collect();

        let body = serde_json::json!({
            "name": sanitize_project_name(&request.name),
            "dueBy": request.due_by.format(DUE_BY_FORMAT).to_string(),
            "description": request.description,
            "projectTemplate": { "id": request.template_id },
            "location": request.location_id,
            "languageDirections": language_directions,
        });

        let response = self
            .http
            .post(format!("{}/projects", self.config.api_base))
            .bearer_auth(&token)
            .header("X-LC-Tenant", &self.config.account_id)
            .json(&body)
            .send()
            .await?;

        let created: CreatedResponse = Self::parse_response(response).await?;
        Ok(created.id)
    }

    async fn create_source_file(
        &self,
        project_id: &str,
        content: &str,
        filename: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> Result<String, LanguageCloudError> {
        let token = self.bearer_token().await?;
        self.pace().await;

        let properties = serde_json::json!({
            "name": filename,
            "role": "translatable",
            "type": "native",
            "language": self.map_locale(source_locale),
            "targetLanguages": [self.map_locale(target_locale)],
        })
        .to_string();

        let file_part = reqwest::multipart::Part::bytes(content.as_bytes().to_vec())
            .file_name(filename.to_string())
            .mime_str("text/plain")?;
        let form = reqwest::multipart::Form::new()
            .text("properties", properties)
            .part("file", file_part);

        let response = self
            .http
            .post(format!(
                "{}/projects/{}/source-files",
                self.config.api_base, project_id
            ))
            .bearer_auth(&token)
            .header("X-LC-Tenant", &self.config.account_id)
            .multipart(form)
            .send()
            .await?;

        let created: CreatedResponse = Self::parse_response(response).await?;
        Ok(created.id)
    }

    async fn start_project(&self, project_id: &str) -> Result<(), LanguageCloudError> {
        let token = self.bearer_token().await?;
        self.pace().await;

        let response = self
            .http
            .put(format!(
                "{}/projects/{}/start",
                self.config.api_base, project_id
            ))
            .bearer_auth(&token)
            .header("X-LC-Tenant", &self.config.account_id)
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn complete_project(&self, project_id: &str) -> Result<(), LanguageCloudError> {
        let token = self.bearer_token().await?;
        self.pace().await;

        let response = self
            .http
            .put(format!(
                "{}/projects/{}/complete",
                self.config.api_base, project_id
            ))
            .bearer_auth(&token)
            .header("X-LC-Tenant", &self.config.account_id)
            .send()
            .await?;

        Self::check_status(response).await
    }

    async fn get_project(&self, project_id: &str) -> Result<String, LanguageCloudError> {
        let token = self.bearer_token().await?;
        self.pace().await;

        let response = self
            .http
            .get(format!("{}/projects/{}", self.config.api_base, project_id))
            .bearer_auth(&token)
            .header("X-LC-Tenant", &self.config.account_id)
            .send()
            .await?;

        let project: ProjectResponse = Self::parse_response(response).await?;
        Ok(project.status)
    }

    async fn download_target_file(
        &self,
        project_id: &str,
        source_file_id: &str,
    ) -> Result<String, LanguageCloudError> {
        let token = self.bearer_token().await?;
        self.pace().await;

        let response = self
            .http
            .get(format!(
                "{}/projects/{}/target-files",
                self.config.api_base, project_id
            ))
            .bearer_auth(&token)
            .header("X-LC-Tenant", &self.config.account_id)
            .send()
            .await?;

        let listing: TargetFileListResponse = Self::parse_response(response).await?;
        let matches: Vec<&TargetFileEntry> = listing
            .items
            .iter()
            .filter(|item| {
                item.source_file.id == source_file_id && item.latest_version.kind == "native"
            })
            .collect();

        // Anything other than exactly one native match means we cannot
        // tell which artifact is ours; skip and retry next run.
        let entry = match matches.as_slice() {
            [entry] => *entry,
            [] => {
                return Err(LanguageCloudError::NotFound(format!(
                    "no native target file for source file {source_file_id}"
                )))
            }
            many => {
                return Err(LanguageCloudError::NotFound(format!(
                    "{} native target files for source file {source_file_id}",
                    many.len()
                )))
            }
        };

        self.pace().await;
        let response = self
            .http
            .get(format!(
                "{}/projects/{}/target-files/{}/versions/{}/download",
                self.config.api_base, project_id, entry.id, entry.latest_version.id
            ))
            .bearer_auth(&token)
            .header("X-LC-Tenant", &self.config.account_id)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.text().await?)
    }

    async fn get_project_templates(&self) -> Result<Vec<ProjectTemplate>, LanguageCloudError> {
        if let Some(templates) = self.templates.get() {
            return Ok(templates);
        }

        let token = self.bearer_token().await?;
        self.pace().await;

        let response = self
            .http
            .get(format!("{}/project-templates", self.config.api_base))
            .bearer_auth(&token)
            .header("X-LC-Tenant", &self.config.account_id)
            .send()
            .await?;

        let listing: TemplateListResponse = Self::parse_response(response).await?;
        self.templates.put(listing.items.clone());
        Ok(listing.items)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
