//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, TimeZone, Utc};
use docket_core::{
  manager::RequestManager,
  request::{NewRequest, RequestId, RequestPriority, RequestStatus, ServiceRequest},
  store::RequestStore,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn day(d: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 2, d, 14, 15, 0).unwrap()
}

fn pothole(submitted: DateTime<Utc>) -> ServiceRequest {
  let mut input = NewRequest::new("Pothole on Main Street", "Roads");
  input.description = "Deep enough to lose a wheel".into();
  input.location = "Downtown".into();
  input.priority = RequestPriority::High;
  input.submitted_by = "Test User".into();
  input.into_request(submitted)
}

// ─── Insert & get ────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_roundtrip() {
  let s = store().await;
  let mut request = pothole(day(1));
  request.assigned_to = Some("Maintenance Team".into());
  request.depends_on = [RequestId::from("SR-OTHER")].into_iter().collect();
  request.record_update("triaged", day(2));

  s.insert(&request).await.unwrap();

  let fetched = s.get(request.request_id.as_str()).await.unwrap().unwrap();
  assert_eq!(fetched, request);
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get("SR-00000000-NOPE").await.unwrap().is_none());
}

#[tokio::test]
async fn insert_duplicate_is_rejected() {
  let s = store().await;
  let request = pothole(day(1));
  s.insert(&request).await.unwrap();
  let err = s.insert(&request).await.unwrap_err();
  assert!(matches!(err, Error::AlreadyExists(id) if id == request.request_id.as_str()));
}

#[tokio::test]
async fn blank_assignee_is_stored_as_null() {
  let s = store().await;
  let mut request = pothole(day(1));
  request.assigned_to = Some("  ".into());
  s.insert(&request).await.unwrap();
  let fetched = s.get(request.request_id.as_str()).await.unwrap().unwrap();
  assert_eq!(fetched.assigned_to, None);
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_persists_mutable_fields() {
  let s = store().await;
  let mut manager = RequestManager::new();
  let request = pothole(day(1));
  let id = request.request_id.clone();
  s.insert(&request).await.unwrap();
  manager.add_request(request);

  let changed = manager
    .update_status_at(id.as_str(), RequestStatus::Resolved, "filled", day(3))
    .unwrap();
  s.update(changed).await.unwrap();

  let fetched = s.get(id.as_str()).await.unwrap().unwrap();
  assert_eq!(fetched.status, RequestStatus::Resolved);
  assert_eq!(fetched.resolved_at, Some(day(3)));
  assert_eq!(fetched.last_updated, Some(day(3)));
  assert_eq!(fetched.updates, ["[2024-02-03 14:15] filled"]);
  assert_eq!(fetched.submitted_at, day(1));
}

#[tokio::test]
async fn update_missing_is_not_found() {
  let s = store().await;
  let err = s.update(&pothole(day(1))).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

// ─── Load ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn load_all_returns_oldest_first() {
  let s = store().await;
  for d in [3, 1, 2] {
    s.insert(&pothole(day(d))).await.unwrap();
  }
  let loaded = s.load_all().await.unwrap();
  let days: Vec<_> = loaded.iter().map(|r| r.submitted_at).collect();
  assert_eq!(days, [day(1), day(2), day(3)]);
}

#[tokio::test]
async fn load_rebuilds_manager_with_dependencies() {
  let s = store().await;
  let first = pothole(day(1));
  let mut second = pothole(day(2));
  second.depends_on.insert(first.request_id.clone());
  s.insert(&second).await.unwrap();
  s.insert(&first).await.unwrap();

  let mut manager = RequestManager::new();
  let report = manager.load(s.load_all().await.unwrap());
  assert_eq!(report.inserted, 2);

  let order = manager.processing_order();
  assert_eq!(order, [first.request_id.clone(), second.request_id.clone()]);
  assert_eq!(manager.dependents(first.request_id.as_str()), [second.request_id]);
}

#[tokio::test]
async fn dependency_added_through_manager_survives_reload() {
  let s = store().await;
  let mut manager = RequestManager::new();
  let a = pothole(day(1));
  let b = pothole(day(2));
  for r in [&a, &b] {
    s.insert(r).await.unwrap();
  }
  manager.load([a.clone(), b.clone()]);

  let changed = manager
    .add_dependency(a.request_id.as_str(), b.request_id.as_str())
    .unwrap();
  s.update(changed).await.unwrap();

  let mut reloaded = RequestManager::new();
  reloaded.load(s.load_all().await.unwrap());
  assert!(reloaded.would_create_cycle(b.request_id.as_str(), a.request_id.as_str()));
}

// ─── Corrupt rows ────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_status_code_is_a_core_error() {
  let s = store().await;
  s.conn
    .call(|conn| {
      conn.execute(
        "INSERT INTO service_requests (
           request_id, title, description, category, location, status,
           priority, submitted_date, submitted_by
         ) VALUES ('SR-BAD', 't', 'd', 'c', 'l', 9, 1,
                   '2024-02-01T00:00:00+00:00', 'x')",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.get("SR-BAD").await.unwrap_err();
  assert!(matches!(
    err,
    Error::Core(docket_core::Error::UnknownStatusCode(9))
  ));
}

#[tokio::test]
async fn malformed_timestamp_is_a_parse_error() {
  let s = store().await;
  s.conn
    .call(|conn| {
      conn.execute(
        "INSERT INTO service_requests (
           request_id, title, description, category, location, status,
           priority, submitted_date, submitted_by
         ) VALUES ('SR-DATE', 't', 'd', 'c', 'l', 0, 1, 'yesterday', 'x')",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  assert!(matches!(
    s.load_all().await.unwrap_err(),
    Error::DateParse(_)
  ));
}
