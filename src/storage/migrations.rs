//! Table migrations for the SQLite storage backend.
//!
//! Uses a `schema_version` table to track which migrations have been applied.
//! Each migration runs exactly once and is recorded with a timestamp. This is
//! the layout of the backing database only; the layout of the stored values is
//! versioned separately by the maintenance engine.

use rusqlite::Connection;

type MigrationFn = fn(&Connection) -> Result<(), rusqlite::Error>;

/// Table migrations in order. Entry `i` produces version `i + 1`.
const MIGRATIONS: [(&str, MigrationFn); 2] = [
    ("Key-value store table", migration_v1),
    ("Track last write time per key", migration_v2),
];

/// Table schema version after every migration has run.
pub const CURRENT_TABLE_VERSION: i32 = MIGRATIONS.len() as i32;

/// Returns the applied table schema version (0 if nothing has been applied).
pub fn get_table_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Runs all pending table migrations against the provided connection.
///
/// Safe to call on every open.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_table_version(conn);

    for (version, (description, migrate)) in (1..).zip(MIGRATIONS) {
        if current < version {
            migrate(conn)?;
            record_version(conn, version, description)?;
        }
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<(), rusqlite::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![version, now, description],
    )?;
    Ok(())
}

/// V1: one row per storage key, value held as JSON text.
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv_store (
             key TEXT PRIMARY KEY,
             value TEXT NOT NULL
         );",
    )
}

/// V2: add `updated_at` for databases created before it existed.
fn migration_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    if conn.prepare("SELECT updated_at FROM kv_store LIMIT 0").is_err() {
        conn.execute_batch(
            "ALTER TABLE kv_store ADD COLUMN updated_at INTEGER NOT NULL DEFAULT 0;",
        )?;
    }
    Ok(())
}
