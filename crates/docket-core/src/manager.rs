//! [`RequestManager`] is the single entry point for mutating and querying
//! service requests.
//!
//! The manager owns every request in one table keyed by identifier. The
//! ordered index, the priority heap, the dependency graph and the
//! category/status groupings hold identifiers only, so a status change made
//! here is seen by every access path without re-indexing. Each mutating call
//! updates all structures before returning.

use std::{
  cmp::Ordering,
  collections::{BTreeMap, HashMap},
};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  graph::DependencyGraph,
  heap::PriorityHeap,
  index::OrderedIndex,
  request::{RequestId, RequestPriority, RequestStatus, ServiceRequest},
};

// ─── Heap key ────────────────────────────────────────────────────────────────

/// Heap ordering: higher priority first, then older submissions, then
/// identifier so the order is total.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PriorityKey {
  priority:     RequestPriority,
  submitted_at: DateTime<Utc>,
  request_id:   RequestId,
}

impl PriorityKey {
  fn of(request: &ServiceRequest) -> Self {
    Self {
      priority:     request.priority,
      submitted_at: request.submitted_at,
      request_id:   request.request_id.clone(),
    }
  }
}

impl Ord for PriorityKey {
  fn cmp(&self, other: &Self) -> Ordering {
    other
      .priority
      .cmp(&self.priority)
      .then_with(|| self.submitted_at.cmp(&other.submitted_at))
      .then_with(|| self.request_id.cmp(&other.request_id))
  }
}

impl PartialOrd for PriorityKey {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Outcome of [`RequestManager::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
  pub inserted:   usize,
  pub duplicates: usize,
  /// Dependency edges added after the whole batch was known.
  pub linked:     usize,
  /// Stored dependencies left out of the graph because they form a cycle.
  pub rejected:   usize,
}

/// Diagnostic counts across every structure the manager owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
  pub total_requests:       usize,
  pub index_height:         usize,
  pub index_nodes:          usize,
  pub index_balanced:       bool,
  pub heap_size:            usize,
  pub heap_height:          usize,
  pub graph_vertices:       usize,
  pub graph_edges:          usize,
  pub categories:           usize,
  pub connected_components: usize,
  pub by_status:            BTreeMap<RequestStatus, usize>,
}

// ─── Manager ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RequestManager {
  requests:     HashMap<RequestId, ServiceRequest>,
  by_date:      OrderedIndex<DateTime<Utc>, RequestId>,
  by_priority:  PriorityHeap<PriorityKey>,
  dependencies: DependencyGraph<RequestId>,
  by_category:  BTreeMap<String, Vec<RequestId>>,
  by_status:    BTreeMap<RequestStatus, Vec<RequestId>>,
}

impl RequestManager {
  pub fn new() -> Self { Self::default() }

  pub fn len(&self) -> usize { self.requests.len() }

  pub fn is_empty(&self) -> bool { self.requests.is_empty() }

  // ── Inserts ─────────────────────────────────────────────────────────────

  /// Insert `request` into every structure.
  ///
  /// A known identifier is a no-op and returns `false`. Dependencies on
  /// requests not yet known are skipped, not deferred.
  pub fn add_request(&mut self, mut request: ServiceRequest) -> bool {
    if self.requests.contains_key(&request.request_id) {
      debug!(request = %request.request_id, "ignoring duplicate request");
      return false;
    }
    if request.normalize_resolution() {
      warn!(
        request = %request.request_id,
        status = %request.status,
        "dropped resolved timestamp on unresolved request"
      );
    }

    let id = request.request_id.clone();
    self.by_date.insert(request.submitted_at, id.clone());
    self.by_priority.insert(PriorityKey::of(&request));

    self.dependencies.add_vertex(id.clone());
    // A fresh vertex has no outgoing edges, so edges into it cannot close a
    // cycle.
    for dep in &request.depends_on {
      if !self.requests.contains_key(dep) {
        debug!(request = %id, dependency = %dep, "skipping unknown dependency");
        continue;
      }
      if !self.dependencies.has_edge(dep, &id) {
        self.dependencies.add_edge(dep.clone(), id.clone());
      }
    }

    self
      .by_category
      .entry(request.category.clone())
      .or_default()
      .push(id.clone());
    self.by_status.entry(request.status).or_default().push(id.clone());
    self.requests.insert(id, request);
    true
  }

  /// Like [`Self::add_request`] but a known identifier is an
  /// [`Error::DuplicateIdentifier`]. Returns the stored request.
  pub fn try_add_request(&mut self, request: ServiceRequest) -> Result<&ServiceRequest> {
    let id = request.request_id.clone();
    if !self.add_request(request) {
      return Err(Error::DuplicateIdentifier(id));
    }
    self.require(id.as_str())
  }

  /// Rebuild from persisted rows.
  ///
  /// Every record goes through [`Self::add_request`]; afterwards a second
  /// pass links any stored dependency whose target only appeared later in
  /// the batch, each through the cycle-safe insertion protocol.
  pub fn load<I>(&mut self, requests: I) -> LoadReport
  where
    I: IntoIterator<Item = ServiceRequest>,
  {
    let mut report = LoadReport::default();
    let mut batch = Vec::new();

    for request in requests {
      let id = request.request_id.clone();
      if self.add_request(request) {
        report.inserted += 1;
        batch.push(id);
      } else {
        report.duplicates += 1;
      }
    }

    for id in &batch {
      let pending: Vec<RequestId> = self.requests[id]
        .depends_on
        .iter()
        .filter(|dep| {
          self.requests.contains_key(*dep) && !self.dependencies.has_edge(dep, id)
        })
        .cloned()
        .collect();

      for dep in pending {
        if self.dependencies.add_edge_checked(dep.clone(), id.clone()) {
          report.linked += 1;
        } else {
          warn!(request = %id, dependency = %dep, "stored dependency forms a cycle; not linked");
          report.rejected += 1;
        }
      }
    }

    info!(
      inserted = report.inserted,
      duplicates = report.duplicates,
      linked = report.linked,
      rejected = report.rejected,
      "loaded requests"
    );
    report
  }

  // ── Lookups ─────────────────────────────────────────────────────────────

  /// O(1) lookup by identifier.
  pub fn get(&self, id: &str) -> Option<&ServiceRequest> { self.requests.get(id) }

  /// Like [`Self::get`] but unknown identifiers are an [`Error::NotFound`].
  pub fn require(&self, id: &str) -> Result<&ServiceRequest> {
    self.get(id).ok_or_else(|| Error::NotFound(id.into()))
  }

  pub fn contains(&self, id: &str) -> bool { self.requests.contains_key(id) }

  /// Every request, oldest submission first.
  pub fn all_sorted(&self) -> Vec<&ServiceRequest> {
    self.resolve(self.by_date.in_order())
  }

  /// Requests submitted within `[start, end]`, oldest first.
  pub fn in_date_range(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Vec<&ServiceRequest> {
    self.resolve(self.by_date.range(&start, &end))
  }

  pub fn by_category(&self, category: &str) -> Vec<&ServiceRequest> {
    self.resolve(self.by_category.get(category).into_iter().flatten())
  }

  pub fn by_status(&self, status: RequestStatus) -> Vec<&ServiceRequest> {
    self.resolve(self.by_status.get(&status).into_iter().flatten())
  }

  /// Known categories in alphabetical order.
  pub fn categories(&self) -> Vec<&str> {
    self.by_category.keys().map(String::as_str).collect()
  }

  /// Neither resolved nor closed, oldest first.
  pub fn unresolved(&self) -> Vec<&ServiceRequest> {
    self
      .all_sorted()
      .into_iter()
      .filter(|r| r.status.is_open())
      .collect()
  }

  /// Open requests submitted more than `threshold` before `now`.
  pub fn overdue(
    &self,
    now: DateTime<Utc>,
    threshold: Duration,
  ) -> Vec<&ServiceRequest> {
    self
      .all_sorted()
      .into_iter()
      .filter(|r| r.is_overdue(now, threshold))
      .collect()
  }

  /// Case-insensitive substring search over title, description and
  /// identifier, oldest first. A blank keyword returns everything.
  pub fn search(&self, keyword: &str) -> Vec<&ServiceRequest> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
      return self.all_sorted();
    }
    let needle = keyword.to_lowercase();
    self
      .all_sorted()
      .into_iter()
      .filter(|r| r.matches_keyword(&needle))
      .collect()
  }

  // ── Priority ────────────────────────────────────────────────────────────

  /// The highest-priority, oldest request, or `None` when empty.
  pub fn highest_priority(&self) -> Option<&ServiceRequest> {
    let key = self.by_priority.peek_min().ok()?;
    self.requests.get(&key.request_id)
  }

  /// Up to `count` requests in priority order.
  pub fn top_priority(&self, count: usize) -> Vec<&ServiceRequest> {
    let keys = self.by_priority.extract_all_sorted();
    self.resolve(keys.iter().take(count).map(|k| &k.request_id))
  }

  // ── Dependencies ────────────────────────────────────────────────────────

  /// Requests that must wait, directly or transitively, for `id`. Excludes
  /// `id` itself.
  pub fn downstream(&self, id: &str) -> Vec<RequestId> {
    let id = RequestId::from(id);
    self.dependencies.bfs(&id).into_iter().skip(1).collect()
  }

  /// Requests that directly depend on `id`.
  pub fn dependents(&self, id: &str) -> Vec<RequestId> {
    self.dependencies.neighbors(&RequestId::from(id))
  }

  /// Groups of requests linked by dependencies in either direction.
  pub fn related_groups(&self) -> Vec<Vec<RequestId>> {
    self.dependencies.connected_components()
  }

  /// Whether making `to` depend on `from` would close a cycle. Unknown
  /// identifiers answer `false`.
  pub fn would_create_cycle(&self, from: &str, to: &str) -> bool {
    if !self.contains(from) || !self.contains(to) {
      return false;
    }
    self
      .dependencies
      .would_create_cycle(&RequestId::from(from), &RequestId::from(to))
  }

  /// Make `to` depend on `from`.
  ///
  /// Both requests must exist. The edge is kept only if the graph stays
  /// acyclic; otherwise nothing changes and [`Error::CycleRejected`] is
  /// returned. On success the updated `to` request is returned so the caller
  /// can persist it.
  pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<&ServiceRequest> {
    let from = self.require(from)?.request_id.clone();
    let to = self.require(to)?.request_id.clone();

    if !self.dependencies.has_edge(&from, &to) {
      if !self.dependencies.add_edge_checked(from.clone(), to.clone()) {
        warn!(%from, %to, "rejected circular dependency");
        return Err(Error::CycleRejected { from, to });
      }
      debug!(%from, %to, "dependency added");
    }

    let request = self
      .requests
      .get_mut(&to)
      .ok_or_else(|| Error::NotFound(to.clone()))?;
    request.depends_on.insert(from);
    Ok(&*request)
  }

  /// Every request in an order that satisfies all dependencies.
  ///
  /// The graph is kept acyclic, but should a cycle ever be present this
  /// degrades to an empty order instead of failing.
  pub fn processing_order(&self) -> Vec<RequestId> {
    match self.dependencies.checked_topological_sort() {
      Some(order) => order,
      None => {
        warn!("dependency graph has a cycle; no processing order");
        Vec::new()
      }
    }
  }

  // ── Updates ─────────────────────────────────────────────────────────────

  /// Move `id` to `status`, logging `note`. See [`Self::update_status_at`].
  pub fn update_status(
    &mut self,
    id: &str,
    status: RequestStatus,
    note: &str,
  ) -> Result<&ServiceRequest> {
    self.update_status_at(id, status, note, Utc::now())
  }

  /// Move `id` to `status` as of `at`.
  ///
  /// Regroups the request, appends `note` to its update log and bumps
  /// `last_updated`. Entering Resolved stamps `resolved_at`; any other
  /// status clears it. The ordered index, heap and graph do not key on
  /// status and are left alone.
  pub fn update_status_at(
    &mut self,
    id: &str,
    status: RequestStatus,
    note: &str,
    at: DateTime<Utc>,
  ) -> Result<&ServiceRequest> {
    let request = self
      .requests
      .get_mut(id)
      .ok_or_else(|| Error::NotFound(id.into()))?;

    if let Some(group) = self.by_status.get_mut(&request.status) {
      group.retain(|member| *member != request.request_id);
    }
    self
      .by_status
      .entry(status)
      .or_default()
      .push(request.request_id.clone());

    request.status = status;
    request.record_update(note, at);
    request.resolved_at = (status == RequestStatus::Resolved).then_some(at);
    Ok(&*request)
  }

  /// Change the priority of `id` as of `now`. See
  /// [`Self::update_priority_at`].
  pub fn update_priority(
    &mut self,
    id: &str,
    priority: RequestPriority,
  ) -> Result<&ServiceRequest> {
    self.update_priority_at(id, priority, Utc::now())
  }

  /// Change the priority of `id` and rebuild the heap so its order matches.
  pub fn update_priority_at(
    &mut self,
    id: &str,
    priority: RequestPriority,
    at: DateTime<Utc>,
  ) -> Result<&ServiceRequest> {
    let request = self
      .requests
      .get_mut(id)
      .ok_or_else(|| Error::NotFound(id.into()))?;
    let key = request.request_id.clone();

    if request.priority != priority {
      let note = format!("Priority changed from {} to {priority}", request.priority);
      request.priority = priority;
      request.record_update(&note, at);
      self.by_priority = self.requests.values().map(PriorityKey::of).collect();
    }
    self.require(key.as_str())
  }

  /// Set or clear the assignee of `id`.
  pub fn assign(&mut self, id: &str, assignee: Option<String>) -> Result<&ServiceRequest> {
    self.assign_at(id, assignee, Utc::now())
  }

  pub fn assign_at(
    &mut self,
    id: &str,
    assignee: Option<String>,
    at: DateTime<Utc>,
  ) -> Result<&ServiceRequest> {
    let request = self
      .requests
      .get_mut(id)
      .ok_or_else(|| Error::NotFound(id.into()))?;
    let note = match &assignee {
      Some(name) => format!("Assigned to {name}"),
      None => "Unassigned".to_owned(),
    };
    request.assigned_to = assignee;
    request.record_update(&note, at);
    Ok(&*request)
  }

  // ── Diagnostics ─────────────────────────────────────────────────────────

  pub fn statistics(&self) -> Statistics {
    Statistics {
      total_requests:       self.requests.len(),
      index_height:         self.by_date.height(),
      index_nodes:          self.by_date.node_count(),
      index_balanced:       self.by_date.is_balanced(),
      heap_size:            self.by_priority.len(),
      heap_height:          self.by_priority.height(),
      graph_vertices:       self.dependencies.vertex_count(),
      graph_edges:          self.dependencies.edge_count(),
      categories:           self.by_category.len(),
      connected_components: self.dependencies.connected_components().len(),
      by_status:            RequestStatus::iter()
        .map(|s| (s, self.by_status.get(&s).map_or(0, Vec::len)))
        .collect(),
    }
  }

  /// Drop every request from every structure.
  pub fn clear(&mut self) { *self = Self::default(); }

  fn resolve<'a, 'b, I>(&'a self, ids: I) -> Vec<&'a ServiceRequest>
  where
    I: IntoIterator<Item = &'b RequestId>,
  {
    ids.into_iter().filter_map(|id| self.requests.get(id)).collect()
  }
}
