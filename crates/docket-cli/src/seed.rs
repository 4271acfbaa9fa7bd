//! Sample data for `docket seed`.

use chrono::{DateTime, Duration, Utc};
use docket_core::request::{
  NewRequest, RequestPriority, RequestStatus, ServiceRequest,
};
use rand_core::{OsRng, RngCore};
use strum::IntoEnumIterator as _;

const CATEGORIES: &[&str] =
  &["Roads", "Water", "Electricity", "Sanitation", "Parks", "Safety"];

const LOCATIONS: &[&str] =
  &["Downtown", "Suburb A", "Suburb B", "Industrial Area", "City Center"];

const TITLES: &[&str] = &[
  "Pothole on Main Street",
  "Water leak reported",
  "Street light not working",
  "Garbage not collected",
  "Park bench damaged",
  "Traffic signal malfunction",
  "Broken water pipe",
  "Road sign missing",
  "Sidewalk repair needed",
  "Tree trimming request",
];

/// How far back submissions are spread.
const MAX_AGE_DAYS: u32 = 60;

/// Generate `count` random requests submitted within the last
/// [`MAX_AGE_DAYS`] days before `now`.
pub fn generate(count: usize, now: DateTime<Utc>) -> Vec<ServiceRequest> {
  generate_with(&mut OsRng, count, now)
}

pub fn generate_with<R: RngCore>(
  rng: &mut R,
  count: usize,
  now: DateTime<Utc>,
) -> Vec<ServiceRequest> {
  let statuses: Vec<_> = RequestStatus::iter().collect();
  let priorities: Vec<_> = RequestPriority::iter().collect();

  (1..=count)
    .map(|n| {
      let mut input = NewRequest::new(*pick(rng, TITLES), *pick(rng, CATEGORIES));
      input.description = format!(
        "Sample service request #{n}. The issue requires attention from the \
         relevant department."
      );
      input.location = (*pick(rng, LOCATIONS)).to_owned();
      input.priority = *pick(rng, &priorities);
      input.submitted_by = "Test User".into();
      if rng.next_u32() % 2 == 0 {
        input.assigned_to = Some("Maintenance Team".into());
      }

      let age = Duration::days(i64::from(rng.next_u32() % MAX_AGE_DAYS));
      let submitted = now - age;
      let mut request = input.into_request(submitted);

      request.status = *pick(rng, &statuses);
      if request.status == RequestStatus::Resolved {
        let took = Duration::days(i64::from(1 + rng.next_u32() % 14));
        request.resolved_at = Some((submitted + took).min(now));
      }
      request
    })
    .collect()
}

fn pick<'a, R: RngCore, T>(rng: &mut R, items: &'a [T]) -> &'a T {
  &items[rng.next_u32() as usize % items.len()]
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use docket_core::manager::RequestManager;

  use super::*;

  /// Deterministic counter-based generator.
  struct Counter(u64);

  impl RngCore for Counter {
    fn next_u32(&mut self) -> u32 { self.next_u64() as u32 }

    fn next_u64(&mut self) -> u64 {
      self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
      self.0 >> 33
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
      rand_core::impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
      self.fill_bytes(dest);
      Ok(())
    }
  }

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() }

  #[test]
  fn generates_requested_count_within_window() {
    let requests = generate_with(&mut Counter(7), 25, now());
    assert_eq!(requests.len(), 25);
    for r in &requests {
      assert!(r.submitted_at <= now());
      assert!(now() - r.submitted_at < Duration::days(i64::from(MAX_AGE_DAYS)));
      assert!(CATEGORIES.contains(&r.category.as_str()));
      assert!(LOCATIONS.contains(&r.location.as_str()));
      assert!(TITLES.contains(&r.title.as_str()));
    }
  }

  #[test]
  fn only_resolved_requests_carry_a_resolution() {
    for r in generate_with(&mut Counter(42), 50, now()) {
      match r.resolved_at {
        Some(at) => {
          assert_eq!(r.status, RequestStatus::Resolved);
          assert!(at >= r.submitted_at && at <= now());
        }
        None => assert_ne!(r.status, RequestStatus::Resolved),
      }
    }
  }

  #[test]
  fn seeded_requests_load_into_manager() {
    let mut manager = RequestManager::new();
    let report = manager.load(generate_with(&mut Counter(1), 30, now()));
    assert_eq!(report.inserted, 30);
    assert!(manager.statistics().index_balanced);
  }
}
