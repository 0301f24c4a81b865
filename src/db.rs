use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),
  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
  #[error("database lock poisoned")]
  Poisoned,
  #[error("database task failed: {0}")]
  Task(String),
}

/// Shared handle to the resource database. Every request borrows the
/// connection for the duration of one closure.
#[derive(Clone)]
pub struct Db {
  conn: Arc<Mutex<Connection>>,
}

impl Db {
  /// `":memory:"` gives a private in-process database; anything else is a file path.
  pub fn open(path: &str) -> Result<Self, DbError> {
    let conn = if path == ":memory:" {
      Connection::open_in_memory()?
    } else {
      Connection::open(path)?
    };
    init_db(&conn)?;
    Ok(Self { conn: Arc::new(Mutex::new(conn)) })
  }

  pub fn with<T>(&self, f: impl FnOnce(&Connection) -> Result<T, DbError>) -> Result<T, DbError> {
    let conn = self.conn.lock().map_err(|_| DbError::Poisoned)?;
    f(&conn)
  }

  /// Same as [`Db::with`], run on the blocking pool so request handlers
  /// never hold a runtime worker while SQLite works.
  pub async fn call<T, F>(&self, f: F) -> Result<T, DbError>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, DbError> + Send + 'static,
  {
    let db = self.clone();
    tokio::task::spawn_blocking(move || db.with(f))
      .await
      .map_err(|e| DbError::Task(e.to_string()))?
  }
}

pub fn init_db(conn: &Connection) -> Result<(), DbError> {
  // Each statement uses IF NOT EXISTS, so reapplying on restart is harmless.
  let init_sql = include_str!("../migrations/001_init.sql");
  conn.execute_batch(init_sql)?;
  Ok(())
}
