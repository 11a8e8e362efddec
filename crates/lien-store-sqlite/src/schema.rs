//! SQL schema for the lien SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS projects (
    project_id  TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- One row per (project, category). Status and urgency are derived on read
-- and have no column.
CREATE TABLE IF NOT EXISTS deadlines (
    deadline_id   TEXT PRIMARY KEY,
    project_id    TEXT NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    user_id       TEXT NOT NULL,
    category      TEXT NOT NULL,   -- Category, snake_case
    deadline_date INTEGER NOT NULL, -- days from CE
    jurisdiction  TEXT NOT NULL,
    trigger_fact  TEXT NOT NULL,   -- DateFact, snake_case
    trigger_date  INTEGER NOT NULL, -- days from CE
    facts_json    TEXT NOT NULL,   -- ProjectFacts snapshot
    completed_at  TEXT,            -- RFC 3339 UTC; NULL while open
    note          TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (project_id, category)
);

CREATE INDEX IF NOT EXISTS projects_user_idx   ON projects(user_id);
CREATE INDEX IF NOT EXISTS deadlines_user_idx  ON deadlines(user_id);
CREATE INDEX IF NOT EXISTS deadlines_due_idx   ON deadlines(deadline_date)
    WHERE completed_at IS NULL;

PRAGMA user_version = 1;
";
