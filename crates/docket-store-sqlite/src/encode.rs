//! Encoding and decoding helpers between domain types and the plain column
//! values stored in SQLite.
//!
//! Timestamps are stored as RFC 3339 strings. Status and priority use their
//! stable integer codes. The update log and dependency set are compact JSON
//! arrays.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use docket_core::request::{
  RequestId, RequestPriority, RequestStatus, ServiceRequest,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── JSON arrays ─────────────────────────────────────────────────────────────

pub fn encode_updates(updates: &[String]) -> Result<String> {
  Ok(serde_json::to_string(updates)?)
}

pub fn decode_updates(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_depends_on(ids: &BTreeSet<RequestId>) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_depends_on(s: &str) -> Result<BTreeSet<RequestId>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Outgoing row ────────────────────────────────────────────────────────────

/// A request flattened into owned column values, ready to move into a
/// database closure.
pub struct EncodedRequest {
  pub request_id:   String,
  pub title:        String,
  pub description:  String,
  pub category:     String,
  pub location:     String,
  pub status:       i64,
  pub priority:     i64,
  pub submitted_at: String,
  pub last_updated: Option<String>,
  pub resolved_at:  Option<String>,
  pub submitted_by: String,
  pub assigned_to:  Option<String>,
  pub updates:      String,
  pub depends_on:   String,
}

impl EncodedRequest {
  pub fn new(request: &ServiceRequest) -> Result<Self> {
    Ok(Self {
      request_id:   request.request_id.to_string(),
      title:        request.title.clone(),
      description:  request.description.clone(),
      category:     request.category.clone(),
      location:     request.location.clone(),
      status:       i64::from(request.status.code()),
      priority:     i64::from(request.priority.code()),
      submitted_at: encode_dt(request.submitted_at),
      last_updated: request.last_updated.map(encode_dt),
      resolved_at:  request.resolved_at.map(encode_dt),
      submitted_by: request.submitted_by.clone(),
      // Blank assignees are stored as NULL.
      assigned_to:  request
        .assigned_to
        .clone()
        .filter(|a| !a.trim().is_empty()),
      updates:      encode_updates(&request.updates)?,
      depends_on:   encode_depends_on(&request.depends_on)?,
    })
  }
}

// ─── Incoming row ────────────────────────────────────────────────────────────

/// A `service_requests` row as read, before decoding.
pub struct RawRequest {
  pub request_id:   String,
  pub title:        String,
  pub description:  String,
  pub category:     String,
  pub location:     String,
  pub status:       i64,
  pub priority:     i64,
  pub submitted_at: String,
  pub last_updated: Option<String>,
  pub resolved_at:  Option<String>,
  pub submitted_by: String,
  pub assigned_to:  Option<String>,
  pub updates:      Option<String>,
  pub depends_on:   Option<String>,
}

impl RawRequest {
  /// Read a row selected with [`crate::schema::COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id:   row.get(0)?,
      title:        row.get(1)?,
      description:  row.get(2)?,
      category:     row.get(3)?,
      location:     row.get(4)?,
      status:       row.get(5)?,
      priority:     row.get(6)?,
      submitted_at: row.get(7)?,
      last_updated: row.get(8)?,
      resolved_at:  row.get(9)?,
      submitted_by: row.get(10)?,
      assigned_to:  row.get(11)?,
      updates:      row.get(12)?,
      depends_on:   row.get(13)?,
    })
  }

  pub fn into_request(self) -> Result<ServiceRequest> {
    Ok(ServiceRequest {
      request_id:   RequestId::from(self.request_id),
      title:        self.title,
      description:  self.description,
      category:     self.category,
      location:     self.location,
      status:       RequestStatus::from_code(self.status)?,
      priority:     RequestPriority::from_code(self.priority)?,
      submitted_at: decode_dt(&self.submitted_at)?,
      last_updated: self.last_updated.as_deref().map(decode_dt).transpose()?,
      resolved_at:  self.resolved_at.as_deref().map(decode_dt).transpose()?,
      submitted_by: self.submitted_by,
      assigned_to:  self.assigned_to,
      updates:      self
        .updates
        .as_deref()
        .map(decode_updates)
        .transpose()?
        .unwrap_or_default(),
      depends_on:   self
        .depends_on
        .as_deref()
        .map(decode_depends_on)
        .transpose()?
        .unwrap_or_default(),
    })
  }
}
