use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type ID = String;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DataSource {
  pub id: ID,
  pub name: String,
  #[serde(rename = "type")]
  pub kind: String, // api|scraper|file|database
  pub status: String, // active|inactive|error
  pub config: Value,
  pub record_count: i64,
  pub last_sync: Option<String>,
  pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct NewDataSource {
  pub name: String,
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default = "default_active")]
  pub status: String,
  #[serde(default = "empty_object")]
  pub config: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Agent {
  pub id: ID,
  pub name: String,
  pub status: String, // created|running|paused|stopped
  pub taxonomy: Option<String>,
  pub model: Option<String>,
  pub config: Value,
  pub progress: i64,
  pub records_processed: i64,
  pub started_at: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct NewAgent {
  pub name: String,
  #[serde(default)]
  pub taxonomy: Option<String>,
  #[serde(default)]
  pub model: Option<String>,
  #[serde(default = "empty_object")]
  pub config: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentAction {
  Pause,
  Resume,
  Stop,
  Restart,
}

impl AgentAction {
  /// Status the agent ends up in after the action.
  pub fn target_status(self) -> &'static str {
    match self {
      AgentAction::Pause => "paused",
      AgentAction::Resume | AgentAction::Restart => "running",
      AgentAction::Stop => "stopped",
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      AgentAction::Pause => "pause",
      AgentAction::Resume => "resume",
      AgentAction::Stop => "stop",
      AgentAction::Restart => "restart",
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Taxonomy {
  pub id: ID,
  pub name: String,
  pub description: String,
  pub hierarchy: Value,
  pub category_count: i64,
  pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct NewTaxonomy {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default = "empty_object")]
  pub hierarchy: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Analysis {
  pub id: ID,
  pub title: String,
  pub description: String,
  pub taxonomy_id: Option<ID>,
  pub completed_at: String,
}

#[derive(Debug, Deserialize)]
pub struct NewAnalysis {
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub taxonomy_id: Option<ID>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct DashboardMetrics {
  pub total_records: i64,
  pub active_agents: i64,
  pub data_sources: i64,
  pub taxonomies: i64,
  pub analyses: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Pagination {
  pub page: u32,
  pub per_page: u32,
  pub total: i64,
}

/// Leaves of a nested category object: `{"a": {"b": {}, "c": {}}}` has two.
pub fn count_categories(hierarchy: &Value) -> i64 {
  match hierarchy.as_object() {
    Some(children) if !children.is_empty() => children
      .values()
      .map(|child| match child.as_object() {
        Some(grand) if !grand.is_empty() => count_categories(child),
        _ => 1,
      })
      .sum(),
    _ => 0,
  }
}

pub fn new_id(prefix: &str) -> ID {
  format!("{}_{}", prefix, Uuid::new_v4().simple())
}

pub fn now_iso() -> String {
  let t = time::OffsetDateTime::now_utc();
  t.format(&time::format_description::well_known::Rfc3339)
    .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

fn default_active() -> String {
  "active".into()
}

fn empty_object() -> Value {
  Value::Object(Map::new())
}
