use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use crate::llm::ProviderEndpoints;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    /// Environment variable consulted first for the token.
    pub token_env: String,
    /// Secret store resource consulted when the variable is absent.
    pub token_secret: String,
    pub read_timeout: Duration,
    /// Branch creation and commits.
    pub write_timeout: Duration,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".into(),
            owner: "renduples".into(),
            repo: "afpip".into(),
            token_env: "GITHUB_TOKEN".into(),
            token_secret: "projects/afpi-production/secrets/github-token/versions/latest".into(),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub email: String,
    pub name: String,
    pub password: Option<String>,
    pub password_hash: Option<String>,
    pub salt: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            email: "admin@afpip.com".into(),
            name: "Administrator".into(),
            password: None,
            password_hash: None,
            salt: "afpi-secure-salt-change-in-production".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub project_name: String,
    pub version: String,
    pub bind_addr: SocketAddr,
    pub api_prefix: String,
    pub database_path: String,
    pub github: GitHubSettings,
    pub secret_manager_url: String,
    pub providers: ProviderEndpoints,
    pub admin: AdminSettings,
    pub allowed_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            project_name: "AFPI API Gateway".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            api_prefix: "/api/v1".into(),
            database_path: ":memory:".into(),
            github: GitHubSettings::default(),
            secret_manager_url: "https://secretmanager.googleapis.com".into(),
            providers: ProviderEndpoints::default(),
            admin: AdminSettings::default(),
            allowed_origins: vec![
                "http://localhost:3000".into(),
                "http://localhost:8000".into(),
                "https://afpip.com".into(),
                "https://www.afpip.com".into(),
            ],
            log_format: LogFormat::Text,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_settings(&vars)
    }

    /// Build from a key/value map; unknown keys are ignored, missing keys keep defaults.
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| settings.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
        let seconds = |key: &'static str| -> Result<Option<Duration>, ConfigError> {
            match get(key) {
                None => Ok(None),
                Some(v) => match v.parse::<u64>() {
                    Ok(n) if n > 0 => Ok(Some(Duration::from_secs(n))),
                    _ => Err(ConfigError::Invalid { key, value: v.to_string() }),
                },
            }
        };
        let mut config = GatewayConfig::default();

        if let Some(addr) = get("BIND_ADDR") {
            config.bind_addr = addr.parse().map_err(|_| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: addr.to_string(),
            })?;
        }
        if let Some(prefix) = get("API_V1_STR") {
            let trimmed = prefix.trim_end_matches('/');
            if !prefix.starts_with('/') || trimmed.is_empty() {
                return Err(ConfigError::Invalid { key: "API_V1_STR", value: prefix.to_string() });
            }
            config.api_prefix = trimmed.to_string();
        }
        if let Some(path) = get("DATABASE_PATH") {
            config.database_path = path.to_string();
        }

        let github = &mut config.github;
        if let Some(v) = get("GITHUB_API_URL") {
            github.api_url = v.to_string();
        }
        if let Some(v) = get("GITHUB_OWNER") {
            github.owner = v.to_string();
        }
        if let Some(v) = get("GITHUB_REPO") {
            github.repo = v.to_string();
        }
        if let Some(v) = get("GITHUB_TOKEN_SECRET") {
            github.token_secret = v.to_string();
        }
        if let Some(t) = seconds("GITHUB_READ_TIMEOUT_SECS")? {
            github.read_timeout = t;
        }
        if let Some(t) = seconds("GITHUB_WRITE_TIMEOUT_SECS")? {
            github.write_timeout = t;
        }
        if let Some(v) = get("SECRET_MANAGER_URL") {
            config.secret_manager_url = v.to_string();
        }

        let providers = &mut config.providers;
        for (key, slot) in [
            ("XAI_BASE_URL", &mut providers.xai),
            ("OPENAI_BASE_URL", &mut providers.openai),
            ("ANTHROPIC_BASE_URL", &mut providers.anthropic),
            ("GOOGLE_BASE_URL", &mut providers.google),
        ] {
            if let Some(v) = get(key) {
                *slot = v.to_string();
            }
        }
        if let Some(t) = seconds("LLM_TOOL_TIMEOUT_SECS")? {
            providers.tool_loop_timeout = t;
        }
        if let Some(t) = seconds("LLM_TIMEOUT_SECS")? {
            providers.single_shot_timeout = t;
        }

        let admin = &mut config.admin;
        if let Some(v) = get("ADMIN_EMAIL") {
            admin.email = v.to_string();
        }
        if let Some(v) = get("ADMIN_NAME") {
            admin.name = v.to_string();
        }
        admin.password = get("ADMIN_PASSWORD").map(str::to_string);
        admin.password_hash = get("ADMIN_PASSWORD_HASH").map(str::to_lowercase);
        if let Some(v) = get("PASSWORD_SALT") {
            admin.salt = v.to_string();
        }

        if let Some(origins) = get("ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
            // Credentialed CORS cannot use a wildcard origin.
            if config.allowed_origins.iter().any(|o| o == "*") {
                return Err(ConfigError::Invalid {
                    key: "ALLOWED_ORIGINS",
                    value: origins.to_string(),
                });
            }
        }

        config.log_format = match get("LOG_FORMAT") {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid { key: "LOG_FORMAT", value: other.to_string() })
            }
        };

        Ok(config)
    }
}
