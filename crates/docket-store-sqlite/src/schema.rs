//! SQL schema for the Docket SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One flat row per service request.
CREATE TABLE IF NOT EXISTS service_requests (
    request_id     TEXT PRIMARY KEY,
    title          TEXT NOT NULL,
    description    TEXT NOT NULL,
    category       TEXT NOT NULL,
    location       TEXT NOT NULL,
    status         INTEGER NOT NULL,  -- 0 submitted .. 5 closed
    priority       INTEGER NOT NULL,  -- 0 low .. 4 critical
    submitted_date TEXT NOT NULL,     -- RFC 3339 UTC; never rewritten
    last_updated   TEXT,
    resolved_date  TEXT,
    submitted_by   TEXT NOT NULL,
    assigned_to    TEXT,
    updates        TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
    depends_on     TEXT NOT NULL DEFAULT '[]'   -- JSON array of request ids
);

CREATE INDEX IF NOT EXISTS service_requests_submitted_idx
    ON service_requests(submitted_date);
CREATE INDEX IF NOT EXISTS service_requests_status_idx
    ON service_requests(status);

PRAGMA user_version = 1;
";

/// Column list shared by every `SELECT`, in [`crate::encode::RawRequest`]
/// field order.
pub const COLUMNS: &str = "request_id, title, description, category, location, \
   status, priority, submitted_date, last_updated, resolved_date, \
   submitted_by, assigned_to, updates, depends_on";
