//! `docket`: command-line front end for the Docket service-request store.
//!
//! Every invocation opens the SQLite store, rebuilds a [`RequestManager`]
//! from it, runs one subcommand and writes back the single request that
//! changed, if any.
//!
//! # Usage
//!
//! ```text
//! docket add "Pothole on Main Street" --category Roads --priority high
//! docket status SR-20240131-9F3A11C2 resolved --note "Filled"
//! docket depend SR-20240131-9F3A11C2 SR-20240201-0B7C44E1
//! docket order
//! docket --json stats
//! ```

mod render;
mod seed;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use docket_core::{
  manager::RequestManager,
  request::{NewRequest, RequestId, RequestPriority, RequestStatus},
  store::RequestStore,
};
use docket_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use render::Output;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "docket", version, about = "Track and triage service requests")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "docket.toml")]
  config: PathBuf,

  /// SQLite database path; overrides `store_path` from the config file.
  #[arg(long, env = "DOCKET_STORE")]
  store: Option<PathBuf>,

  /// Print results as JSON instead of text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Submit a new request.
  Add {
    title:        String,
    #[arg(long)]
    category:     String,
    #[arg(long, default_value = "")]
    description:  String,
    #[arg(long, default_value = "")]
    location:     String,
    #[arg(long, default_value = "normal")]
    priority:     RequestPriority,
    #[arg(long, default_value = "Anonymous")]
    submitted_by: String,
    #[arg(long)]
    assign:       Option<String>,
    /// Identifier of a request this one depends on; repeatable.
    #[arg(long = "depends-on")]
    depends_on:   Vec<String>,
  },
  /// List requests, oldest first.
  List {
    #[arg(long)]
    category:   Option<String>,
    #[arg(long)]
    status:     Option<RequestStatus>,
    /// Only requests that are neither resolved nor closed.
    #[arg(long)]
    unresolved: bool,
    /// Only open requests older than the configured threshold.
    #[arg(long)]
    overdue:    bool,
  },
  /// Show one request in full.
  Show { id: String },
  /// Move a request to a new status.
  Status {
    id:     String,
    status: RequestStatus,
    #[arg(long)]
    note:   Option<String>,
  },
  /// Set or clear the assignee.
  Assign { id: String, assignee: Option<String> },
  /// Change a request's priority.
  Priority { id: String, priority: RequestPriority },
  /// Record that `to` cannot start until `from` is done.
  Depend { from: String, to: String },
  /// Requests that wait, directly or transitively, on a request.
  Downstream { id: String },
  /// Every request in an order that satisfies all dependencies.
  Order,
  /// Highest-priority requests first.
  Top {
    #[arg(short = 'n', long, default_value_t = 5)]
    count: usize,
  },
  /// Requests submitted between two dates, inclusive.
  Range { start: NaiveDate, end: NaiveDate },
  /// Case-insensitive search over title, description and identifier.
  Search { keyword: String },
  /// Groups of requests linked by dependencies.
  Groups,
  /// Structure diagnostics.
  Stats,
  /// Insert randomly generated sample requests.
  Seed {
    #[arg(default_value_t = 10)]
    count: usize,
  },
}

// ─── Configuration ────────────────────────────────────────────────────────────

/// Settings read from the config file and `DOCKET_*` environment variables.
#[derive(Deserialize)]
struct Settings {
  #[serde(default = "default_store_path")]
  store_path:         PathBuf,
  #[serde(default = "default_overdue_after_days")]
  overdue_after_days: i64,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/docket/docket.db") }

fn default_overdue_after_days() -> i64 { 30 }

fn load_settings(path: &Path) -> anyhow::Result<Settings> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("DOCKET"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise settings")
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = load_settings(&cli.config)?;

  let store_path = expand_tilde(cli.store.as_ref().unwrap_or(&settings.store_path));
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let mut manager = RequestManager::new();
  let rows = store.load_all().await.context("failed to load requests")?;
  manager.load(rows);

  let out = Output::new(cli.json);
  let overdue_after = Duration::days(settings.overdue_after_days);

  run(cli.command, &mut manager, &store, &out, overdue_after).await
}

async fn run(
  command: Command,
  manager: &mut RequestManager,
  store: &SqliteStore,
  out: &Output,
  overdue_after: Duration,
) -> anyhow::Result<()> {
  match command {
    Command::Add {
      title,
      category,
      description,
      location,
      priority,
      submitted_by,
      assign,
      depends_on,
    } => {
      let mut input = NewRequest::new(title, category);
      input.description = description;
      input.location = location;
      input.priority = priority;
      input.submitted_by = submitted_by;
      input.assigned_to = assign;
      input.depends_on = depends_on.into_iter().map(RequestId::from).collect();

      let request = input.into_request(Utc::now());
      for dep in &request.depends_on {
        if !manager.contains(dep.as_str()) {
          tracing::warn!(dependency = %dep, "unknown dependency will not be linked");
        }
      }
      let added = manager.try_add_request(request)?;
      store.insert(added).await.context("failed to save request")?;
      out.request(added)?;
    }

    Command::List { category, status, unresolved, overdue } => {
      let mut requests = match (&category, status) {
        (Some(category), _) => manager.by_category(category),
        (None, Some(status)) => manager.by_status(status),
        (None, None) => manager.all_sorted(),
      };
      if let (Some(_), Some(status)) = (&category, status) {
        requests.retain(|r| r.status == status);
      }
      if unresolved {
        requests.retain(|r| r.status.is_open());
      }
      if overdue {
        let now = Utc::now();
        requests.retain(|r| r.is_overdue(now, overdue_after));
      }
      out.requests(&requests)?;
    }

    Command::Show { id } => {
      let request = manager.require(&id)?;
      out.detail(request, &manager.dependents(&id), Utc::now(), overdue_after)?;
    }

    Command::Status { id, status, note } => {
      let note = note.unwrap_or_else(|| format!("Status changed to {status}"));
      let changed = manager.update_status(&id, status, &note)?;
      store.update(changed).await.context("failed to save request")?;
      out.request(changed)?;
    }

    Command::Assign { id, assignee } => {
      let changed = manager.assign(&id, assignee)?;
      store.update(changed).await.context("failed to save request")?;
      out.request(changed)?;
    }

    Command::Priority { id, priority } => {
      let changed = manager.update_priority(&id, priority)?;
      store.update(changed).await.context("failed to save request")?;
      out.request(changed)?;
    }

    Command::Depend { from, to } => {
      let changed = manager.add_dependency(&from, &to)?;
      store.update(changed).await.context("failed to save request")?;
      out.request(changed)?;
    }

    Command::Downstream { id } => {
      manager.require(&id)?;
      out.ids(&manager.downstream(&id))?;
    }

    Command::Order => out.ids(&manager.processing_order())?,

    Command::Top { count } => out.requests(&manager.top_priority(count))?,

    Command::Range { start, end } => {
      if start > end {
        bail!("start date {start} is after end date {end}");
      }
      let from = start.and_time(NaiveTime::MIN).and_utc();
      let until = end
        .and_hms_nano_opt(23, 59, 59, 999_999_999)
        .context("invalid end date")?
        .and_utc();
      out.requests(&manager.in_date_range(from, until))?;
    }

    Command::Search { keyword } => out.requests(&manager.search(&keyword))?,

    Command::Groups => out.groups(&manager.related_groups())?,

    Command::Stats => out.statistics(&manager.statistics())?,

    Command::Seed { count } => {
      let now = Utc::now();
      for request in seed::generate(count, now) {
        store.insert(&request).await.context("failed to save request")?;
        manager.add_request(request);
      }
      tracing::info!(count, "seeded sample requests");
      out.statistics(&manager.statistics())?;
    }
  }

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
