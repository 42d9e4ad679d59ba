//! DDL for the Redline SQLite store.
//!
//! Applied on every open. The append-only rules live here as triggers, so a
//! stray UPDATE from outside the store cannot rewrite history either.

/// Idempotent: every statement is `IF NOT EXISTS`. Layout version 1.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per uploaded document. `num_analysis` is the version counter;
-- every append rewrites it, which is what serialises concurrent appends.
CREATE TABLE IF NOT EXISTS files (
    file_id       TEXT PRIMARY KEY,
    owner         TEXT NOT NULL,
    num_analysis  INTEGER NOT NULL DEFAULT 0 CHECK (num_analysis >= 0),
    last_update   TEXT,            -- ISO 8601 UTC; NULL until first append
    created_at    TEXT NOT NULL
);

-- The file's version -> analysis id map. Append-only.
CREATE TABLE IF NOT EXISTS file_analysis_index (
    file_id      TEXT NOT NULL REFERENCES files(file_id),
    version      INTEGER NOT NULL CHECK (version >= 1),
    analysis_id  TEXT NOT NULL UNIQUE,
    PRIMARY KEY (file_id, version)
);

-- Analyses are written once; only `next_analysis` (once) and the user
-- feedback columns are ever updated.
CREATE TABLE IF NOT EXISTS analyses (
    analysis_id    TEXT PRIMARY KEY,
    file_id        TEXT NOT NULL REFERENCES files(file_id),
    version        INTEGER NOT NULL CHECK (version >= 1),
    owner          TEXT NOT NULL,
    content_json   TEXT NOT NULL,   -- feedback object or {\"rawText\": ...}
    model          TEXT NOT NULL,
    generate_time  TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    user_rating    TEXT,
    user_comment   TEXT,
    next_analysis  TEXT REFERENCES analyses(analysis_id),
    revised_from   TEXT REFERENCES analyses(analysis_id),
    UNIQUE (file_id, version),
    UNIQUE (next_analysis)
);

CREATE TRIGGER IF NOT EXISTS analyses_next_write_once
BEFORE UPDATE OF next_analysis ON analyses
WHEN OLD.next_analysis IS NOT NULL
BEGIN
    SELECT RAISE(ABORT, 'next_analysis is write-once');
END;

CREATE TRIGGER IF NOT EXISTS analyses_no_delete
BEFORE DELETE ON analyses
BEGIN
    SELECT RAISE(ABORT, 'analyses are append-only');
END;

CREATE TRIGGER IF NOT EXISTS file_analysis_index_no_delete
BEFORE DELETE ON file_analysis_index
BEGIN
    SELECT RAISE(ABORT, 'file_analysis_index is append-only');
END;

CREATE INDEX IF NOT EXISTS analyses_file_idx ON analyses(file_id, version);

PRAGMA user_version = 1;
";
