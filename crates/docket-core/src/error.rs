//! Error types for `docket-core`.

use thiserror::Error;

use crate::request::RequestId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("request not found: {0}")]
  NotFound(RequestId),

  /// Peek or extract on a structure holding no elements.
  #[error("{0} is empty")]
  EmptyStructure(&'static str),

  #[error("dependency {from} -> {to} would create a cycle")]
  CycleRejected { from: RequestId, to: RequestId },

  #[error("request {0} already exists")]
  DuplicateIdentifier(RequestId),

  #[error("unknown status code: {0}")]
  UnknownStatusCode(i64),

  #[error("unknown priority code: {0}")]
  UnknownPriorityCode(i64),

  #[error("unknown status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown priority: {0:?}")]
  UnknownPriority(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
