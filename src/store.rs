use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::DbError;
use crate::models::*;

const DATA_SOURCE_COLUMNS: &str =
  "id, name, kind, status, config, record_count, last_sync, created_at";
const AGENT_COLUMNS: &str =
  "id, name, status, taxonomy, model, config, progress, records_processed, started_at, created_at, updated_at";

fn data_source_row(r: &Row) -> rusqlite::Result<DataSource> {
  Ok(DataSource {
    id: r.get(0)?,
    name: r.get(1)?,
    kind: r.get(2)?,
    status: r.get(3)?,
    config: r.get(4)?,
    record_count: r.get(5)?,
    last_sync: r.get(6)?,
    created_at: r.get(7)?,
  })
}

fn agent_row(r: &Row) -> rusqlite::Result<Agent> {
  Ok(Agent {
    id: r.get(0)?,
    name: r.get(1)?,
    status: r.get(2)?,
    taxonomy: r.get(3)?,
    model: r.get(4)?,
    config: r.get(5)?,
    progress: r.get(6)?,
    records_processed: r.get(7)?,
    started_at: r.get(8)?,
    created_at: r.get(9)?,
    updated_at: r.get(10)?,
  })
}

fn taxonomy_row(r: &Row) -> rusqlite::Result<Taxonomy> {
  let hierarchy: serde_json::Value = r.get(3)?;
  Ok(Taxonomy {
    id: r.get(0)?,
    name: r.get(1)?,
    description: r.get(2)?,
    category_count: count_categories(&hierarchy),
    hierarchy,
    created_at: r.get(4)?,
  })
}

fn analysis_row(r: &Row) -> rusqlite::Result<Analysis> {
  Ok(Analysis {
    id: r.get(0)?,
    title: r.get(1)?,
    description: r.get(2)?,
    taxonomy_id: r.get(3)?,
    completed_at: r.get(4)?,
  })
}

// ---- data sources ----

/// One page of data sources, newest first, plus the total matching `status`.
pub fn list_data_sources(
  conn: &Connection,
  page: u32,
  per_page: u32,
  status: Option<&str>,
) -> Result<(Vec<DataSource>, i64), DbError> {
  let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);

  let total: i64 = conn.query_row(
    "SELECT COUNT(*) FROM data_sources WHERE ?1 IS NULL OR status = ?1",
    [status],
    |r| r.get(0),
  )?;

  let mut stmt = conn.prepare(&format!(
    "SELECT {DATA_SOURCE_COLUMNS} FROM data_sources WHERE ?1 IS NULL OR status = ?1 \
     ORDER BY created_at DESC, id LIMIT ?2 OFFSET ?3"
  ))?;
  let rows = stmt.query_map(params![status, per_page, offset], data_source_row)?;

  let mut out = vec![];
  for row in rows {
    out.push(row?);
  }
  Ok((out, total))
}

pub fn create_data_source(conn: &Connection, input: NewDataSource) -> Result<DataSource, DbError> {
  let source = DataSource {
    id: new_id("ds"),
    name: input.name,
    kind: input.kind,
    status: input.status,
    config: input.config,
    record_count: 0,
    last_sync: None,
    created_at: now_iso(),
  };
  conn.execute(
    "INSERT INTO data_sources (id, name, kind, status, config, record_count, last_sync, created_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, ?6)",
    params![source.id, source.name, source.kind, source.status, source.config, source.created_at],
  )?;
  Ok(source)
}

pub fn get_data_source(conn: &Connection, id: &str) -> Result<Option<DataSource>, DbError> {
  Ok(conn
    .query_row(
      &format!("SELECT {DATA_SOURCE_COLUMNS} FROM data_sources WHERE id = ?1"),
      [id],
      data_source_row,
    )
    .optional()?)
}

// ---- agents ----

pub fn list_agents(conn: &Connection) -> Result<Vec<Agent>, DbError> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {AGENT_COLUMNS} FROM agents ORDER BY created_at DESC, id"
  ))?;
  let rows = stmt.query_map([], agent_row)?;

  let mut out = vec![];
  for row in rows {
    out.push(row?);
  }
  Ok(out)
}

pub fn create_agent(conn: &Connection, input: NewAgent) -> Result<Agent, DbError> {
  let ts = now_iso();
  let agent = Agent {
    id: new_id("agent"),
    name: input.name,
    status: "created".into(),
    taxonomy: input.taxonomy,
    model: input.model,
    config: input.config,
    progress: 0,
    records_processed: 0,
    started_at: None,
    created_at: ts.clone(),
    updated_at: ts,
  };
  conn.execute(
    "INSERT INTO agents (id, name, status, taxonomy, model, config, progress, records_processed, started_at, created_at, updated_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, NULL, ?7, ?8)",
    params![
      agent.id,
      agent.name,
      agent.status,
      agent.taxonomy,
      agent.model,
      agent.config,
      agent.created_at,
      agent.updated_at
    ],
  )?;
  Ok(agent)
}

pub fn get_agent(conn: &Connection, id: &str) -> Result<Option<Agent>, DbError> {
  Ok(conn
    .query_row(&format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"), [id], agent_row)
    .optional()?)
}

/// Apply `action` and return the updated agent, or `None` for an unknown id.
/// Restart also resets progress; the first transition to running stamps `started_at`.
pub fn control_agent(conn: &Connection, id: &str, action: AgentAction) -> Result<Option<Agent>, DbError> {
  let ts = now_iso();
  let changed = conn.execute(
    "UPDATE agents SET \
       status = ?1, \
       updated_at = ?2, \
       progress = CASE WHEN ?3 THEN 0 ELSE progress END, \
       started_at = CASE WHEN ?1 = 'running' AND (started_at IS NULL OR ?3) THEN ?2 ELSE started_at END \
     WHERE id = ?4",
    params![action.target_status(), ts, action == AgentAction::Restart, id],
  )?;
  if changed == 0 {
    return Ok(None);
  }
  get_agent(conn, id)
}

// ---- taxonomies ----

pub fn list_taxonomies(conn: &Connection) -> Result<Vec<Taxonomy>, DbError> {
  let mut stmt = conn.prepare(
    "SELECT id, name, description, hierarchy, created_at FROM taxonomies ORDER BY created_at DESC, id",
  )?;
  let rows = stmt.query_map([], taxonomy_row)?;

  let mut out = vec![];
  for row in rows {
    out.push(row?);
  }
  Ok(out)
}

pub fn create_taxonomy(conn: &Connection, input: NewTaxonomy) -> Result<Taxonomy, DbError> {
  let taxonomy = Taxonomy {
    id: new_id("tax"),
    category_count: count_categories(&input.hierarchy),
    name: input.name,
    description: input.description,
    hierarchy: input.hierarchy,
    created_at: now_iso(),
  };
  conn.execute(
    "INSERT INTO taxonomies (id, name, description, hierarchy, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    params![taxonomy.id, taxonomy.name, taxonomy.description, taxonomy.hierarchy, taxonomy.created_at],
  )?;
  Ok(taxonomy)
}

pub fn get_taxonomy(conn: &Connection, id: &str) -> Result<Option<Taxonomy>, DbError> {
  Ok(conn
    .query_row(
      "SELECT id, name, description, hierarchy, created_at FROM taxonomies WHERE id = ?1",
      [id],
      taxonomy_row,
    )
    .optional()?)
}

// ---- analytics ----

pub fn dashboard_metrics(conn: &Connection) -> Result<DashboardMetrics, DbError> {
  Ok(conn.query_row(
    "SELECT \
       (SELECT COALESCE(SUM(record_count), 0) FROM data_sources), \
       (SELECT COUNT(*) FROM agents WHERE status = 'running'), \
       (SELECT COUNT(*) FROM data_sources), \
       (SELECT COUNT(*) FROM taxonomies), \
       (SELECT COUNT(*) FROM analyses)",
    [],
    |r| {
      Ok(DashboardMetrics {
        total_records: r.get(0)?,
        active_agents: r.get(1)?,
        data_sources: r.get(2)?,
        taxonomies: r.get(3)?,
        analyses: r.get(4)?,
      })
    },
  )?)
}

pub fn recent_analyses(conn: &Connection, limit: u32) -> Result<Vec<Analysis>, DbError> {
  let mut stmt = conn.prepare(
    "SELECT id, title, description, taxonomy_id, completed_at FROM analyses ORDER BY completed_at DESC, id LIMIT ?1",
  )?;
  let rows = stmt.query_map([limit], analysis_row)?;

  let mut out = vec![];
  for row in rows {
    out.push(row?);
  }
  Ok(out)
}

pub fn create_analysis(conn: &Connection, input: NewAnalysis) -> Result<Analysis, DbError> {
  let analysis = Analysis {
    id: new_id("analysis"),
    title: input.title,
    description: input.description,
    taxonomy_id: input.taxonomy_id,
    completed_at: now_iso(),
  };
  conn.execute(
    "INSERT INTO analyses (id, title, description, taxonomy_id, completed_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    params![analysis.id, analysis.title, analysis.description, analysis.taxonomy_id, analysis.completed_at],
  )?;
  Ok(analysis)
}
