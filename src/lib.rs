//! AFPI API gateway: resource CRUD, a GitHub passthrough, and an AI chat relay
//! that lets tool-capable models read (and, for privileged callers, change)
//! the repository through a fixed tool catalog.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod llm;
pub mod models;
pub mod repo_tools;
pub mod secrets;
pub mod store;
pub mod workflows;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::auth::AdminCredentials;
use crate::config::GatewayConfig;
use crate::db::Db;
use crate::repo_tools::GitHubClient;

/// Everything a request handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub github: Arc<GitHubClient>,
    pub db: Db,
    pub admin: Arc<AdminCredentials>,
}

impl AppState {
    pub fn new(config: GatewayConfig, github: GitHubClient, db: Db) -> Self {
        let admin = AdminCredentials::from_settings(&config.admin);
        Self {
            config: Arc::new(config),
            github: Arc::new(github),
            db,
            admin: Arc::new(admin),
        }
    }
}

pub use api::router;
