//! Text and JSON rendering of query results.

use chrono::{DateTime, Duration, Utc};
use docket_core::{
  manager::Statistics,
  request::{RequestId, ServiceRequest},
};
use serde::Serialize;

const STAMP: &str = "%Y-%m-%d %H:%M";

/// Where results go and in which shape.
pub struct Output {
  json: bool,
}

/// `show --json` payload.
#[derive(Serialize)]
struct Detail<'a> {
  #[serde(flatten)]
  request:    &'a ServiceRequest,
  age_days:   i64,
  overdue:    bool,
  dependents: &'a [RequestId],
}

impl Output {
  pub fn new(json: bool) -> Self { Self { json } }

  fn emit<T: Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
  }

  pub fn request(&self, request: &ServiceRequest) -> anyhow::Result<()> {
    if self.json {
      return self.emit(request);
    }
    println!("{}", summary(request));
    Ok(())
  }

  pub fn requests(&self, requests: &[&ServiceRequest]) -> anyhow::Result<()> {
    if self.json {
      return self.emit(requests);
    }
    if requests.is_empty() {
      println!("no matching requests");
    }
    for r in requests {
      println!("{}", summary(r));
    }
    Ok(())
  }

  pub fn detail(
    &self,
    request: &ServiceRequest,
    dependents: &[RequestId],
    now: DateTime<Utc>,
    overdue_after: Duration,
  ) -> anyhow::Result<()> {
    let age_days = request.age_days(now);
    let overdue = request.is_overdue(now, overdue_after);
    if self.json {
      return self.emit(&Detail { request, age_days, overdue, dependents });
    }

    println!("Request ID:   {}", request.request_id);
    println!("Title:        {}", request.title);
    println!("Category:     {}", request.category);
    println!("Location:     {}", request.location);
    println!("Status:       {}", request.status);
    println!("Priority:     {}", request.priority);
    println!("Submitted:    {}", request.submitted_at.format(STAMP));
    if let Some(at) = request.last_updated {
      println!("Last updated: {}", at.format(STAMP));
    }
    if let Some(at) = request.resolved_at {
      println!("Resolved:     {}", at.format(STAMP));
    }
    println!("Submitted by: {}", request.submitted_by);
    if let Some(assignee) = &request.assigned_to {
      println!("Assigned to:  {assignee}");
    }
    let flag = if overdue { " (overdue)" } else { "" };
    println!("Age:          {age_days} days{flag}");

    if !request.description.is_empty() {
      println!("\n{}", request.description);
    }
    if !request.depends_on.is_empty() {
      println!("\nDepends on:");
      for id in &request.depends_on {
        println!("  - {id}");
      }
    }
    if !dependents.is_empty() {
      println!("\nBlocks:");
      for id in dependents {
        println!("  - {id}");
      }
    }
    if !request.updates.is_empty() {
      println!("\nUpdates ({}):", request.updates.len());
      for entry in &request.updates {
        println!("  {entry}");
      }
    }
    Ok(())
  }

  pub fn ids(&self, ids: &[RequestId]) -> anyhow::Result<()> {
    if self.json {
      return self.emit(ids);
    }
    for (n, id) in ids.iter().enumerate() {
      println!("{:>3}. {id}", n + 1);
    }
    Ok(())
  }

  pub fn groups(&self, groups: &[Vec<RequestId>]) -> anyhow::Result<()> {
    if self.json {
      return self.emit(groups);
    }
    for (n, group) in groups.iter().enumerate() {
      let members: Vec<&str> = group.iter().map(RequestId::as_str).collect();
      println!("group {}: {}", n + 1, members.join(", "));
    }
    Ok(())
  }

  pub fn statistics(&self, stats: &Statistics) -> anyhow::Result<()> {
    if self.json {
      return self.emit(stats);
    }
    println!("Total requests:       {}", stats.total_requests);
    println!(
      "Ordered index:        {} nodes, height {}, balanced: {}",
      stats.index_nodes, stats.index_height, stats.index_balanced
    );
    println!(
      "Priority heap:        {} entries, height {}",
      stats.heap_size, stats.heap_height
    );
    println!(
      "Dependency graph:     {} vertices, {} edges, {} groups",
      stats.graph_vertices, stats.graph_edges, stats.connected_components
    );
    println!("Categories:           {}", stats.categories);
    for (status, count) in &stats.by_status {
      println!("  {status:<20}{count}");
    }
    Ok(())
  }
}

/// One-line listing form.
fn summary(r: &ServiceRequest) -> String {
  let assignee = r.assigned_to.as_deref().unwrap_or("-");
  format!(
    "{} | {} | {} | {} | {} | {} | {}",
    r.request_id,
    r.submitted_at.format("%Y-%m-%d"),
    r.category,
    r.priority,
    r.status,
    assignee,
    r.title,
  )
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use docket_core::request::{NewRequest, RequestPriority};

  use super::*;

  #[test]
  fn summary_lists_key_fields() {
    let at = Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap();
    let mut input = NewRequest::new("Broken water pipe", "Water");
    input.priority = RequestPriority::Urgent;
    let request = input.into_request(at);

    let line = summary(&request);
    assert!(line.starts_with("SR-20240309-"));
    assert!(line.contains("| 2024-03-09 | Water |"));
    assert!(line.ends_with("| - | Broken water pipe"));
  }

  #[test]
  fn detail_json_flattens_request() {
    let at = Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap();
    let request = NewRequest::new("Road sign missing", "Roads").into_request(at);
    let dependents = [RequestId::from("SR-LATER")];
    let detail = Detail {
      request:    &request,
      age_days:   3,
      overdue:    false,
      dependents: &dependents,
    };

    let value = serde_json::to_value(&detail).unwrap();
    assert_eq!(value["title"], "Road sign missing");
    assert_eq!(value["age_days"], 3);
    assert_eq!(value["dependents"][0], "SR-LATER");
  }
}
