//! Where the repository token comes from.
//!
//! Two sources exist: an environment variable and a managed secret store.
//! One of them is picked at startup by [`select_secret_source`].

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GitHubSettings;

const SECRET_TIMEOUT: Duration = Duration::from_secs(10);
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("environment variable {0} is not set")]
    MissingEnv(String),
    #[error("secret store lookup for {resource} failed: {message}")]
    Store { resource: String, message: String },
}

#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Short label used in logs.
    fn describe(&self) -> &'static str;

    async fn secret(&self) -> Result<String, SecretError>;
}

pub struct EnvSecretSource {
    var: String,
}

impl EnvSecretSource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    fn describe(&self) -> &'static str {
        "env"
    }

    async fn secret(&self) -> Result<String, SecretError> {
        std::env::var(&self.var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| SecretError::MissingEnv(self.var.clone()))
    }
}

/// Google Secret Manager over REST, keyed by a full version resource name
/// such as `projects/p/secrets/s/versions/latest`.
pub struct SecretManagerSource {
    http: reqwest::Client,
    base_url: String,
    resource: String,
}

#[derive(Deserialize)]
struct AccessResponse {
    payload: AccessPayload,
}

#[derive(Deserialize)]
struct AccessPayload {
    data: String,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl SecretManagerSource {
    pub fn new(base_url: impl Into<String>, resource: impl Into<String>) -> Result<Self, SecretError> {
        let resource = resource.into();
        let http = reqwest::Client::builder()
            .timeout(SECRET_TIMEOUT)
            .build()
            .map_err(|e| SecretError::Store {
                resource: resource.clone(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            resource,
        })
    }

    fn store_error(&self, message: impl std::fmt::Display) -> SecretError {
        SecretError::Store {
            resource: self.resource.clone(),
            message: message.to_string(),
        }
    }

    async fn access_token(&self) -> Result<String, SecretError> {
        if let Some(token) = std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
        {
            return Ok(token);
        }

        let response = self.http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| self.store_error(format!("metadata server: {e}")))?;
        if !response.status().is_success() {
            return Err(self.store_error(format!("metadata server returned {}", response.status())));
        }
        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| self.store_error(e))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl SecretSource for SecretManagerSource {
    fn describe(&self) -> &'static str {
        "secret-manager"
    }

    async fn secret(&self) -> Result<String, SecretError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/v1/{}:access",
            self.base_url.trim_end_matches('/'),
            self.resource
        );

        let response = self.http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| self.store_error(e))?;
        if !response.status().is_success() {
            return Err(self.store_error(format!("status {}", response.status())));
        }

        let body: AccessResponse = response.json().await.map_err(|e| self.store_error(e))?;
        let bytes = STANDARD
            .decode(body.payload.data.trim())
            .map_err(|e| self.store_error(e))?;
        String::from_utf8(bytes)
            .map(|s| s.trim().to_string())
            .map_err(|e| self.store_error(e))
    }
}

/// Use the environment variable when it is set at startup, the secret store otherwise.
pub fn select_secret_source(
    settings: &GitHubSettings,
    secret_manager_url: &str,
) -> Result<Arc<dyn SecretSource>, SecretError> {
    let env_present = std::env::var(&settings.token_env)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);

    if env_present {
        Ok(Arc::new(EnvSecretSource::new(settings.token_env.clone())))
    } else {
        Ok(Arc::new(SecretManagerSource::new(
            secret_manager_url,
            settings.token_secret.clone(),
        )?))
    }
}
