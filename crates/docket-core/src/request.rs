//! Service requests, the unit of storage tracked by the manager.
//!
//! A request carries a status, a priority, a submission timestamp and an
//! optional set of requests it depends on. The identifier and submission
//! timestamp never change after creation; everything else is mutated only
//! through [`crate::manager::RequestManager`].

use std::{borrow::Borrow, collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::EnumIter;
use uuid::Uuid;

use crate::{Error, Result};

/// Format of the timestamp prefix on every update-log entry.
const UPDATE_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

// ─── Identifier ──────────────────────────────────────────────────────────────

/// Globally unique request identifier, e.g. `SR-20240131-9F3A11C2`.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
  /// Mint a fresh identifier stamped with the submission date.
  pub fn generate(submitted_at: DateTime<Utc>) -> Self {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(8);
    Self(format!(
      "SR-{}-{}",
      submitted_at.format("%Y%m%d"),
      suffix.to_uppercase()
    ))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl From<String> for RequestId {
  fn from(s: String) -> Self { Self(s) }
}

impl From<&str> for RequestId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl Borrow<str> for RequestId {
  fn borrow(&self) -> &str { &self.0 }
}

impl AsRef<str> for RequestId {
  fn as_ref(&self) -> &str { &self.0 }
}

impl fmt::Display for RequestId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a request is in its lifecycle. The integer codes are part of the
/// persisted row format and must not be renumbered.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
  Submitted,
  Pending,
  InProgress,
  OnHold,
  Resolved,
  Closed,
}

impl RequestStatus {
  pub fn code(self) -> u8 {
    match self {
      Self::Submitted => 0,
      Self::Pending => 1,
      Self::InProgress => 2,
      Self::OnHold => 3,
      Self::Resolved => 4,
      Self::Closed => 5,
    }
  }

  pub fn from_code(code: i64) -> Result<Self> {
    match code {
      0 => Ok(Self::Submitted),
      1 => Ok(Self::Pending),
      2 => Ok(Self::InProgress),
      3 => Ok(Self::OnHold),
      4 => Ok(Self::Resolved),
      5 => Ok(Self::Closed),
      other => Err(Error::UnknownStatusCode(other)),
    }
  }

  /// Neither resolved nor closed.
  pub fn is_open(self) -> bool { !matches!(self, Self::Resolved | Self::Closed) }
}

impl fmt::Display for RequestStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(match self {
      Self::Submitted => "Submitted",
      Self::Pending => "Pending",
      Self::InProgress => "In Progress",
      Self::OnHold => "On Hold",
      Self::Resolved => "Resolved",
      Self::Closed => "Closed",
    })
  }
}

impl FromStr for RequestStatus {
  type Err = Error;

  /// Accepts names case-insensitively, ignoring `_`, `-` and spaces, so
  /// `in_progress`, `In Progress` and `inprogress` all parse.
  fn from_str(s: &str) -> Result<Self> {
    match squash(s).as_str() {
      "submitted" => Ok(Self::Submitted),
      "pending" => Ok(Self::Pending),
      "inprogress" => Ok(Self::InProgress),
      "onhold" => Ok(Self::OnHold),
      "resolved" => Ok(Self::Resolved),
      "closed" => Ok(Self::Closed),
      _ => Err(Error::UnknownStatus(s.to_owned())),
    }
  }
}

// ─── Priority ────────────────────────────────────────────────────────────────

/// How urgent a request is. Declaration order is the natural ordering, so
/// `Critical > Low`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Default,
  Serialize,
  Deserialize,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum RequestPriority {
  Low,
  #[default]
  Normal,
  High,
  Urgent,
  Critical,
}

impl RequestPriority {
  pub fn code(self) -> u8 {
    match self {
      Self::Low => 0,
      Self::Normal => 1,
      Self::High => 2,
      Self::Urgent => 3,
      Self::Critical => 4,
    }
  }

  pub fn from_code(code: i64) -> Result<Self> {
    match code {
      0 => Ok(Self::Low),
      1 => Ok(Self::Normal),
      2 => Ok(Self::High),
      3 => Ok(Self::Urgent),
      4 => Ok(Self::Critical),
      other => Err(Error::UnknownPriorityCode(other)),
    }
  }
}

impl fmt::Display for RequestPriority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(match self {
      Self::Low => "Low",
      Self::Normal => "Normal",
      Self::High => "High",
      Self::Urgent => "Urgent",
      Self::Critical => "Critical",
    })
  }
}

impl FromStr for RequestPriority {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match squash(s).as_str() {
      "low" => Ok(Self::Low),
      "normal" => Ok(Self::Normal),
      "high" => Ok(Self::High),
      "urgent" => Ok(Self::Urgent),
      "critical" => Ok(Self::Critical),
      _ => Err(Error::UnknownPriority(s.to_owned())),
    }
  }
}

fn squash(s: &str) -> String {
  s.chars()
    .filter(|c| !matches!(c, '_' | '-' | ' '))
    .flat_map(char::to_lowercase)
    .collect()
}

// ─── ServiceRequest ──────────────────────────────────────────────────────────

/// A citizen-submitted work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
  pub request_id:   RequestId,
  pub title:        String,
  pub description:  String,
  pub category:     String,
  pub location:     String,
  pub status:       RequestStatus,
  pub priority:     RequestPriority,
  /// Never changes after creation; the ordered index keys on it.
  pub submitted_at: DateTime<Utc>,
  pub last_updated: Option<DateTime<Utc>>,
  /// Set only while `status` is [`RequestStatus::Resolved`].
  pub resolved_at:  Option<DateTime<Utc>>,
  pub submitted_by: String,
  pub assigned_to:  Option<String>,
  /// Append-only log of `[YYYY-MM-DD HH:MM] note` entries.
  pub updates:      Vec<String>,
  /// Requests that must be processed before this one.
  pub depends_on:   BTreeSet<RequestId>,
}

impl ServiceRequest {
  /// Append a timestamped entry to the update log and bump `last_updated`.
  pub fn record_update(&mut self, note: &str, at: DateTime<Utc>) {
    self
      .updates
      .push(format!("[{}] {note}", at.format(UPDATE_STAMP_FORMAT)));
    self.last_updated = Some(at);
  }

  /// Whole days elapsed between submission and `now`.
  pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
    (now - self.submitted_at).num_days()
  }

  /// Still open and older than `threshold`.
  pub fn is_overdue(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
    self.status.is_open() && now - self.submitted_at > threshold
  }

  /// Case-insensitive substring match over title, description and
  /// identifier. `needle` must already be lower-cased.
  pub fn matches_keyword(&self, needle: &str) -> bool {
    self.title.to_lowercase().contains(needle)
      || self.description.to_lowercase().contains(needle)
      || self.request_id.as_str().to_lowercase().contains(needle)
  }

  /// Drop a resolved timestamp that contradicts the status. Returns `true`
  /// if anything changed.
  pub fn normalize_resolution(&mut self) -> bool {
    if self.status != RequestStatus::Resolved && self.resolved_at.is_some() {
      self.resolved_at = None;
      return true;
    }
    false
  }
}

// ─── NewRequest ──────────────────────────────────────────────────────────────

/// Input for a freshly submitted request. The identifier and submission
/// timestamp are assigned by [`NewRequest::into_request`].
#[derive(Debug, Clone)]
pub struct NewRequest {
  pub title:        String,
  pub description:  String,
  pub category:     String,
  pub location:     String,
  pub priority:     RequestPriority,
  pub submitted_by: String,
  pub assigned_to:  Option<String>,
  pub depends_on:   BTreeSet<RequestId>,
}

impl NewRequest {
  /// Convenience constructor with all optional fields set to their defaults.
  pub fn new(title: impl Into<String>, category: impl Into<String>) -> Self {
    Self {
      title:        title.into(),
      description:  String::new(),
      category:     category.into(),
      location:     String::new(),
      priority:     RequestPriority::default(),
      submitted_by: "Anonymous".to_owned(),
      assigned_to:  None,
      depends_on:   BTreeSet::new(),
    }
  }

  pub fn into_request(self, submitted_at: DateTime<Utc>) -> ServiceRequest {
    ServiceRequest {
      request_id: RequestId::generate(submitted_at),
      title: self.title,
      description: self.description,
      category: self.category,
      location: self.location,
      status: RequestStatus::Submitted,
      priority: self.priority,
      submitted_at,
      last_updated: None,
      resolved_at: None,
      submitted_by: self.submitted_by,
      assigned_to: self.assigned_to,
      updates: Vec::new(),
      depends_on: self.depends_on,
    }
  }
}
