//! Schema migration system.
//!
//! Migrations are stored as static SQL strings keyed by version number.
//! The current version is tracked in a `_migrations` table so migrations
//! are idempotent and only run once.

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// A single migration definition.
struct Migration {
    /// Monotonically increasing version number (1, 2, 3, ...).
    version: u32,
    /// Human-readable description.
    description: &'static str,
    /// Raw SQL to execute. May contain multiple statements separated by `;`.
    sql: &'static str,
}

/// All migrations in order. Add new migrations to the end of this array.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "initial schema — projects, project_counter, time_entries, tasks, bot_state",
        sql: r#"
            CREATE TABLE projects (
                id                TEXT PRIMARY KEY,
                name              TEXT NOT NULL,
                project_number    TEXT,
                drive_folder_id   TEXT NOT NULL,
                drive_folder_link TEXT NOT NULL,
                created_at        INTEGER NOT NULL
            );
            CREATE INDEX idx_projects_number ON projects(project_number);
            CREATE INDEX idx_projects_created ON projects(created_at);

            CREATE TABLE project_counter (
                id          INTEGER PRIMARY KEY CHECK(id = 1),
                year        INTEGER NOT NULL,
                counter     INTEGER NOT NULL,
                last_issued TEXT NOT NULL
            );

            CREATE TABLE time_entries (
                id                   TEXT PRIMARY KEY,
                project_id           TEXT NOT NULL REFERENCES projects(id),
                duration_hours       REAL NOT NULL,
                activity_description TEXT NOT NULL DEFAULT '',
                entry_date           TEXT NOT NULL,
                created_by           TEXT NOT NULL,
                created_at           INTEGER NOT NULL
            );
            CREATE INDEX idx_time_entries_project ON time_entries(project_id);
            CREATE INDEX idx_time_entries_date ON time_entries(entry_date);

            CREATE TABLE tasks (
                id           TEXT PRIMARY KEY,
                content      TEXT NOT NULL,
                priority     TEXT NOT NULL CHECK(priority IN ('high','medium','low')),
                project_id   TEXT REFERENCES projects(id),
                tags         TEXT NOT NULL DEFAULT '[]',
                authority    TEXT,
                municipality TEXT,
                created_by   TEXT NOT NULL,
                created_at   INTEGER NOT NULL
            );
            CREATE INDEX idx_tasks_project ON tasks(project_id);

            CREATE TABLE bot_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        "#,
    },
];

// ── public API ───────────────────────────────────────────────────────

/// Run all pending migrations against `conn`.
///
/// This is a **synchronous** function — call it from `spawn_blocking`.
pub fn run_all(conn: &Connection) -> StoreResult<()> {
    ensure_migrations_table(conn)?;

    let current = current_version(conn)?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();

    if pending.is_empty() {
        debug!(current_version = current, "database schema is up to date");
        return Ok(());
    }

    info!(
        current_version = current,
        pending = pending.len(),
        "running pending migrations"
    );

    for migration in pending {
        apply(conn, migration)?;
    }

    Ok(())
}

/// Return the latest applied migration version, or 0 if none.
pub fn current_version(conn: &Connection) -> StoreResult<u32> {
    let version: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM _migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::Migration {
            version: 0,
            message: format!("failed to read current version: {e}"),
        })?;
    Ok(version)
}

// ── internals ────────────────────────────────────────────────────────

/// Create the `_migrations` bookkeeping table if it does not exist.
fn ensure_migrations_table(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version     INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at  INTEGER NOT NULL
        );",
    )
    .map_err(|e| StoreError::Migration {
        version: 0,
        message: format!("failed to create _migrations table: {e}"),
    })?;
    Ok(())
}

/// Apply a single migration inside a transaction.
fn apply(conn: &Connection, migration: &Migration) -> StoreResult<()> {
    info!(
        version = migration.version,
        description = migration.description,
        "applying migration"
    );

    conn.execute_batch("BEGIN IMMEDIATE;")
        .map_err(|e| StoreError::Migration {
            version: migration.version,
            message: format!("failed to begin transaction: {e}"),
        })?;

    let result = (|| -> StoreResult<()> {
        conn.execute_batch(migration.sql)
            .map_err(|e| StoreError::Migration {
                version: migration.version,
                message: format!("SQL execution failed: {e}"),
            })?;

        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO _migrations (version, description, applied_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![migration.version, migration.description, now],
        )
        .map_err(|e| StoreError::Migration {
            version: migration.version,
            message: format!("failed to record migration: {e}"),
        })?;

        Ok(())
    })();

    match &result {
        Ok(()) => {
            conn.execute_batch("COMMIT;")
                .map_err(|e| StoreError::Migration {
                    version: migration.version,
                    message: format!("failed to commit: {e}"),
                })?;
        }
        Err(err) => {
            warn!(version = migration.version, %err, "migration failed, rolling back");
            let _ = conn.execute_batch("ROLLBACK;");
        }
    }

    result
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        conn
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[1].version > window[0].version,
                "migration versions must be strictly increasing: {} >= {}",
                window[0].version,
                window[1].version,
            );
        }
    }

    #[test]
    fn run_all_is_idempotent() {
        let conn = setup_conn();
        run_all(&conn).unwrap();
        run_all(&conn).unwrap();

        let version = current_version(&conn).unwrap();
        assert_eq!(version, MIGRATIONS.last().unwrap().version);
    }

    #[test]
    fn migrations_create_all_tables() {
        let conn = setup_conn();
        run_all(&conn).unwrap();

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
                )
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .map(|r| r.unwrap())
                .collect()
        };

        assert!(tables.contains(&"projects".to_string()));
        assert!(tables.contains(&"project_counter".to_string()));
        assert!(tables.contains(&"time_entries".to_string()));
        assert!(tables.contains(&"tasks".to_string()));
        assert!(tables.contains(&"bot_state".to_string()));
    }

    #[test]
    fn counter_table_is_singleton() {
        let conn = setup_conn();
        run_all(&conn).unwrap();

        conn.execute(
            "INSERT INTO project_counter (id, year, counter, last_issued) VALUES (1, 25, 0, '25-000')",
            [],
        )
        .unwrap();

        // A second row with any other id violates the CHECK constraint.
        let second = conn.execute(
            "INSERT INTO project_counter (id, year, counter, last_issued) VALUES (2, 25, 0, '25-000')",
            [],
        );
        assert!(second.is_err());
    }

    #[test]
    fn tasks_priority_is_constrained() {
        let conn = setup_conn();
        run_all(&conn).unwrap();

        let bad = conn.execute(
            "INSERT INTO tasks (id, content, priority, created_by, created_at) \
             VALUES ('t1', 'x', 'urgent', 'tester', 0)",
            [],
        );
        assert!(bad.is_err());

        conn.execute(
            "INSERT INTO tasks (id, content, priority, created_by, created_at) \
             VALUES ('t1', 'x', 'medium', 'tester', 0)",
            [],
        )
        .unwrap();
    }
}
