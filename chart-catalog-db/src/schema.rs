//! SQLite schema creation and migration.

use chart_catalog_core::{Folder, FolderCategory};
use rusqlite::{Connection, params};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: expected version {expected}, found {found}")]
    VersionMismatch { expected: i32, found: i32 },
}

/// Current schema version. Increment when adding migrations.
pub const CURRENT_VERSION: i32 = 1;

/// Create all tables and indexes if they don't exist, and seed the root folder.
///
/// Idempotent: safe to call on an existing database.
pub fn create_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(SCHEMA_SQL)?;
    ensure_root_folder(conn)?;
    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Open or create a catalog database at the given path.
pub fn open_database(path: &std::path::Path) -> Result<Connection, SchemaError> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;",
    )?;

    let version = get_schema_version(&conn)?;
    if version == 0 {
        create_schema(&conn)?;
    } else if version < CURRENT_VERSION {
        migrate(&conn, version)?;
    } else if version > CURRENT_VERSION {
        return Err(SchemaError::VersionMismatch {
            expected: CURRENT_VERSION,
            found: version,
        });
    }

    Ok(conn)
}

/// Open an in-memory database with the full schema. Useful for testing.
pub fn open_memory() -> Result<Connection, SchemaError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Get the current schema version, or 0 if no schema exists.
pub fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute(
        "INSERT INTO schema_version (version) SELECT ?1
         WHERE NOT EXISTS (SELECT 1 FROM schema_version WHERE version = ?1)",
        [version],
    )?;
    Ok(())
}

/// Insert the root sentinel if it is missing.
fn ensure_root_folder(conn: &Connection) -> Result<(), SchemaError> {
    let root = Folder::root();
    conn.execute(
        "INSERT OR IGNORE INTO folders (path_hash, parent_hash, name, category, path, modified_at)
         VALUES (?1, NULL, ?2, ?3, '', 0)",
        params![
            root.path_hash.as_str(),
            root.name,
            FolderCategory::Root.as_i64()
        ],
    )?;
    Ok(())
}

/// Run migrations from `from_version` up to `CURRENT_VERSION`.
fn migrate(conn: &Connection, from_version: i32) -> Result<(), SchemaError> {
    let mut version = from_version;
    while version < CURRENT_VERSION {
        // Per-version upgrade steps go here, keyed on `version`.
        version += 1;
        set_schema_version(conn, version)?;
    }
    ensure_root_folder(conn)?;

    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Scanned directory tree
CREATE TABLE IF NOT EXISTS folders (
    path_hash TEXT PRIMARY KEY NOT NULL,
    parent_hash TEXT REFERENCES folders(path_hash),
    name TEXT NOT NULL,
    category INTEGER NOT NULL DEFAULT 1,
    path TEXT NOT NULL,
    modified_at INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_folders_parent ON folders(parent_hash);
CREATE INDEX IF NOT EXISTS idx_folders_path ON folders(path);

-- One row per chart file occurrence
CREATE TABLE IF NOT EXISTS charts (
    content_hash TEXT NOT NULL,
    parent_hash TEXT NOT NULL REFERENCES folders(path_hash),
    file_name TEXT NOT NULL,
    format INTEGER NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    title2 TEXT NOT NULL DEFAULT '',
    artist TEXT NOT NULL DEFAULT '',
    artist2 TEXT NOT NULL DEFAULT '',
    genre TEXT NOT NULL DEFAULT '',
    version TEXT NOT NULL DEFAULT '',
    level REAL NOT NULL DEFAULT 0,
    start_bpm REAL NOT NULL DEFAULT 0,
    min_bpm REAL NOT NULL DEFAULT 0,
    max_bpm REAL NOT NULL DEFAULT 0,
    length_seconds INTEGER NOT NULL DEFAULT 0,
    total_notes INTEGER NOT NULL DEFAULT 0,
    regular_notes INTEGER NOT NULL DEFAULT 0,
    long_notes INTEGER NOT NULL DEFAULT 0,
    stage_file TEXT,
    banner TEXT,
    game_mode INTEGER NOT NULL DEFAULT 0,
    judge_rank INTEGER NOT NULL DEFAULT 0,
    total INTEGER NOT NULL DEFAULT 0,
    play_level INTEGER NOT NULL DEFAULT 0,
    difficulty INTEGER NOT NULL DEFAULT 0,
    has_long_notes BOOLEAN NOT NULL DEFAULT 0,
    has_mines BOOLEAN NOT NULL DEFAULT 0,
    has_metric_mod BOOLEAN NOT NULL DEFAULT 0,
    has_stops BOOLEAN NOT NULL DEFAULT 0,
    has_bga BOOLEAN NOT NULL DEFAULT 0,
    has_random BOOLEAN NOT NULL DEFAULT 0,
    added_at INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (parent_hash, file_name)
);
CREATE INDEX IF NOT EXISTS idx_charts_content_hash ON charts(content_hash);
CREATE INDEX IF NOT EXISTS idx_charts_parent ON charts(parent_hash);
CREATE INDEX IF NOT EXISTS idx_charts_game_mode ON charts(game_mode);
"#;
