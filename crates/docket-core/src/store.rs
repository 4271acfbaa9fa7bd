//! The `RequestStore` trait: the load/save contract with persistence.
//!
//! The manager never calls out to storage. At startup the caller loads every
//! row with [`RequestStore::load_all`] and feeds it to
//! [`crate::manager::RequestManager::load`]; after each mutation the caller
//! persists the single changed request with [`RequestStore::insert`] or
//! [`RequestStore::update`].

use std::future::Future;

use crate::request::ServiceRequest;

/// Abstraction over a persistence backend for service requests.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait RequestStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every stored request, oldest submission first.
  fn load_all(
    &self,
  ) -> impl Future<Output = Result<Vec<ServiceRequest>, Self::Error>> + Send + '_;

  /// Retrieve a request by identifier. Returns `None` if not found.
  fn get<'a>(
    &'a self,
    request_id: &'a str,
  ) -> impl Future<Output = Result<Option<ServiceRequest>, Self::Error>> + Send + 'a;

  /// Persist a new request. Returns an error if the identifier is taken.
  fn insert<'a>(
    &'a self,
    request: &'a ServiceRequest,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Overwrite the mutable fields of an existing request. The identifier and
  /// submission timestamp are never rewritten.
  fn update<'a>(
    &'a self,
    request: &'a ServiceRequest,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
