//! [`SqliteStore`]: the SQLite implementation of [`RequestStore`].

use std::path::Path;

use docket_core::{request::ServiceRequest, store::RequestStore};
use rusqlite::OptionalExtension as _;
use tracing::debug;

use crate::{
  Error, Result,
  encode::{EncodedRequest, RawRequest},
  schema::{COLUMNS, SCHEMA},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A request store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── RequestStore impl ───────────────────────────────────────────────────────

impl RequestStore for SqliteStore {
  type Error = Error;

  async fn load_all(&self) -> Result<Vec<ServiceRequest>> {
    let raws: Vec<RawRequest> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COLUMNS} FROM service_requests
           ORDER BY submitted_date ASC, request_id ASC"
        ))?;
        let rows = stmt
          .query_map([], RawRequest::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    debug!(rows = raws.len(), "loaded service_requests");
    raws.into_iter().map(RawRequest::into_request).collect()
  }

  async fn get(&self, request_id: &str) -> Result<Option<ServiceRequest>> {
    let id = request_id.to_owned();

    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {COLUMNS} FROM service_requests WHERE request_id = ?1"),
              rusqlite::params![id],
              RawRequest::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRequest::into_request).transpose()
  }

  async fn insert(&self, request: &ServiceRequest) -> Result<()> {
    let row = EncodedRequest::new(request)?;
    let id = row.request_id.clone();

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO service_requests (
             request_id, title, description, category, location,
             status, priority, submitted_date, last_updated, resolved_date,
             submitted_by, assigned_to, updates, depends_on
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
          rusqlite::params![
            row.request_id,
            row.title,
            row.description,
            row.category,
            row.location,
            row.status,
            row.priority,
            row.submitted_at,
            row.last_updated,
            row.resolved_at,
            row.submitted_by,
            row.assigned_to,
            row.updates,
            row.depends_on,
          ],
        )?;
        Ok(n > 0)
      })
      .await?;

    if !inserted {
      return Err(Error::AlreadyExists(id));
    }
    Ok(())
  }

  async fn update(&self, request: &ServiceRequest) -> Result<()> {
    let row = EncodedRequest::new(request)?;
    let id = row.request_id.clone();

    let changed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE service_requests
           SET title = ?2, description = ?3, category = ?4, location = ?5,
               status = ?6, priority = ?7, last_updated = ?8,
               resolved_date = ?9, assigned_to = ?10, updates = ?11,
               depends_on = ?12
           WHERE request_id = ?1",
          rusqlite::params![
            row.request_id,
            row.title,
            row.description,
            row.category,
            row.location,
            row.status,
            row.priority,
            row.last_updated,
            row.resolved_at,
            row.assigned_to,
            row.updates,
            row.depends_on,
          ],
        )?;
        Ok(n)
      })
      .await?;

    if changed == 0 {
      return Err(Error::NotFound(id));
    }
    Ok(())
  }
}
