//! Time entry persistence.
//!
//! Time entries are insert-only: the bot records them and never mutates
//! or deletes them. The duration is validated upstream by the normalizer
//! before it reaches this store.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::Database;
use crate::error::StoreResult;

/// A recorded unit of work against a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeEntry {
    /// Unique identifier (UUID v7).
    pub id: String,
    /// Owning project id.
    pub project_id: String,
    /// Duration in hours, in (0, 24].
    pub duration_hours: f64,
    /// Free-text description of the activity.
    pub activity_description: String,
    /// Calendar date the work happened on, `YYYY-MM-DD`.
    pub entry_date: String,
    /// Sender identity, e.g. `Marcel (12345)`.
    pub created_by: String,
    /// Unix timestamp when the entry was recorded.
    pub created_at: i64,
}

/// Insert-only store for time entries.
#[derive(Clone)]
pub struct TimeEntryStore {
    db: Database,
}

impl TimeEntryStore {
    /// Create a new time entry store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a new time entry.
    #[instrument(skip(self, activity_description))]
    pub async fn insert(
        &self,
        project_id: &str,
        duration_hours: f64,
        activity_description: &str,
        entry_date: &str,
        created_by: &str,
    ) -> StoreResult<TimeEntry> {
        let entry = TimeEntry {
            id: Uuid::now_v7().to_string(),
            project_id: project_id.to_string(),
            duration_hours,
            activity_description: activity_description.to_string(),
            entry_date: entry_date.to_string(),
            created_by: created_by.to_string(),
            created_at: Utc::now().timestamp(),
        };

        let row = entry.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO time_entries \
                     (id, project_id, duration_hours, activity_description, entry_date, created_by, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![
                        row.id,
                        row.project_id,
                        row.duration_hours,
                        row.activity_description,
                        row.entry_date,
                        row.created_by,
                        row.created_at
                    ],
                )?;
                Ok(())
            })
            .await?;

        debug!(
            entry_id = %entry.id,
            project_id = %entry.project_id,
            hours = entry.duration_hours,
            "time entry recorded"
        );
        Ok(entry)
    }

    /// List all entries for a project, newest first.
    pub async fn list_for_project(&self, project_id: &str) -> StoreResult<Vec<TimeEntry>> {
        let project_id = project_id.to_string();
        self.db
            .execute(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, project_id, duration_hours, activity_description, entry_date, created_by, created_at \
                     FROM time_entries WHERE project_id = ?1 ORDER BY entry_date DESC, created_at DESC",
                )?;
                let entries = stmt
                    .query_map(rusqlite::params![project_id], |row| {
                        Ok(TimeEntry {
                            id: row.get(0)?,
                            project_id: row.get(1)?,
                            duration_hours: row.get(2)?,
                            activity_description: row.get(3)?,
                            entry_date: row.get(4)?,
                            created_by: row.get(5)?,
                            created_at: row.get(6)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project_store::ProjectStore;

    async fn setup() -> (ProjectStore, TimeEntryStore) {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        (ProjectStore::new(db.clone()), TimeEntryStore::new(db))
    }

    #[tokio::test]
    async fn insert_and_list() {
        let (projects, entries) = setup().await;
        let project = projects
            .insert("25-001-Test", Some("25-001"), "f1", "l1")
            .await
            .unwrap();

        entries
            .insert(&project.id, 3.0, "Entwurf", "2025-06-23", "Marcel (1)")
            .await
            .unwrap();
        entries
            .insert(&project.id, 1.5, "Statik", "2025-06-24", "Marcel (1)")
            .await
            .unwrap();

        let listed = entries.list_for_project(&project.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].entry_date, "2025-06-24");
        assert_eq!(listed[1].duration_hours, 3.0);
    }

    #[tokio::test]
    async fn insert_requires_existing_project() {
        let (_projects, entries) = setup().await;
        let result = entries
            .insert("no-such-project", 2.0, "", "2025-06-23", "x")
            .await;
        assert!(result.is_err());
    }
}
