//! Project persistence and sequential project numbering.
//!
//! Projects are insert-only records describing a Drive folder tree. The
//! `project_counter` table holds the single counter row behind the
//! `YY-NNN` numbering scheme; issuance is a read-modify-write cycle that
//! must never produce the same number twice, so it runs as one immediate
//! transaction on the shared connection.

use chrono::{Datelike, NaiveDate, Utc};
use rusqlite::{OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::Database;
use crate::error::StoreResult;

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// A project record backed by a Google Drive folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (UUID v7).
    pub id: String,
    /// Full project name, usually `YY-NNN-description`.
    pub name: String,
    /// The issued `YY-NNN` number, if one could be extracted.
    pub project_number: Option<String>,
    /// Drive folder id of the top-level project folder.
    pub drive_folder_id: String,
    /// Shareable link to the top-level project folder.
    pub drive_folder_link: String,
    /// Unix timestamp when the project was created.
    pub created_at: i64,
}

/// State of the singleton numbering counter, exposed for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterState {
    /// Two-digit year the counter belongs to.
    pub year: i64,
    /// Last issued sequence value within that year.
    pub counter: i64,
    /// The most recently formatted number.
    pub last_issued: String,
}

// ═══════════════════════════════════════════════════════════════════════
//  ProjectStore
// ═══════════════════════════════════════════════════════════════════════

/// CRUD operations on projects plus counter issuance.
#[derive(Clone)]
pub struct ProjectStore {
    db: Database,
}

impl ProjectStore {
    /// Create a new project store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Issue the next sequential project number, formatted `YY-NNN`.
    ///
    /// The counter row is loaded, rolled over to 1 when its stored year
    /// differs from `today`'s two-digit year, incremented otherwise, and
    /// written back — all inside a `BEGIN IMMEDIATE` transaction so two
    /// concurrent issuances can never observe the same counter value.
    #[instrument(skip(self))]
    pub async fn issue_next_number(&self, today: NaiveDate) -> StoreResult<String> {
        self.db
            .execute_mut(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let current_year = i64::from(today.year()).rem_euclid(100);
                let stored: Option<(i64, i64)> = tx
                    .query_row(
                        "SELECT year, counter FROM project_counter WHERE id = 1",
                        [],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;

                // Year rollover resets the sequence to 1; a missing row
                // behaves like a fresh counter at 0.
                let next = match stored {
                    Some((year, counter)) if year == current_year => counter + 1,
                    _ => 1,
                };

                let number = format!("{current_year:02}-{next:03}");

                tx.execute(
                    "INSERT INTO project_counter (id, year, counter, last_issued) \
                     VALUES (1, ?1, ?2, ?3) \
                     ON CONFLICT(id) DO UPDATE SET \
                         year = excluded.year, \
                         counter = excluded.counter, \
                         last_issued = excluded.last_issued",
                    rusqlite::params![current_year, next, number],
                )?;
                tx.commit()?;

                debug!(number = %number, "issued project number");
                Ok(number)
            })
            .await
    }

    /// Read the current counter state, or `None` if nothing was issued yet.
    pub async fn counter_state(&self) -> StoreResult<Option<CounterState>> {
        self.db
            .execute(|conn| {
                let state = conn
                    .query_row(
                        "SELECT year, counter, last_issued FROM project_counter WHERE id = 1",
                        [],
                        |row| {
                            Ok(CounterState {
                                year: row.get(0)?,
                                counter: row.get(1)?,
                                last_issued: row.get(2)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(state)
            })
            .await
    }

    /// Persist a new project record.
    #[instrument(skip(self, drive_folder_id, drive_folder_link))]
    pub async fn insert(
        &self,
        name: &str,
        project_number: Option<&str>,
        drive_folder_id: &str,
        drive_folder_link: &str,
    ) -> StoreResult<Project> {
        let project = Project {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            project_number: project_number.map(|n| n.to_string()),
            drive_folder_id: drive_folder_id.to_string(),
            drive_folder_link: drive_folder_link.to_string(),
            created_at: Utc::now().timestamp(),
        };

        let row = project.clone();
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO projects (id, name, project_number, drive_folder_id, drive_folder_link, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        row.id,
                        row.name,
                        row.project_number,
                        row.drive_folder_id,
                        row.drive_folder_link,
                        row.created_at
                    ],
                )?;
                Ok(())
            })
            .await?;

        debug!(project_id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    /// Fetch a single project by id, returning `None` if not found.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Project>> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                let project = conn
                    .query_row(
                        "SELECT id, name, project_number, drive_folder_id, drive_folder_link, created_at \
                         FROM projects WHERE id = ?1",
                        rusqlite::params![id],
                        row_to_project,
                    )
                    .optional()?;
                Ok(project)
            })
            .await
    }

    /// Case-insensitive substring match on project names.
    ///
    /// When several projects match, the most recently created one wins —
    /// that is the documented disambiguation policy for free-text
    /// references like "Alpha" against two "Alpha House" projects.
    pub async fn find_by_name_fragment(&self, fragment: &str) -> StoreResult<Option<Project>> {
        let fragment = fragment.to_lowercase();
        self.db
            .execute(move |conn| {
                let project = conn
                    .query_row(
                        "SELECT id, name, project_number, drive_folder_id, drive_folder_link, created_at \
                         FROM projects WHERE lower(name) LIKE '%' || ?1 || '%' \
                         ORDER BY created_at DESC, id DESC LIMIT 1",
                        rusqlite::params![fragment],
                        row_to_project,
                    )
                    .optional()?;
                Ok(project)
            })
            .await
    }

    /// Case-insensitive substring match on project numbers, most recent wins.
    pub async fn find_by_number_fragment(&self, fragment: &str) -> StoreResult<Option<Project>> {
        let fragment = fragment.to_lowercase();
        self.db
            .execute(move |conn| {
                let project = conn
                    .query_row(
                        "SELECT id, name, project_number, drive_folder_id, drive_folder_link, created_at \
                         FROM projects WHERE project_number IS NOT NULL \
                         AND lower(project_number) LIKE '%' || ?1 || '%' \
                         ORDER BY created_at DESC, id DESC LIMIT 1",
                        rusqlite::params![fragment],
                        row_to_project,
                    )
                    .optional()?;
                Ok(project)
            })
            .await
    }
}

/// Map a full projects row onto a [`Project`].
fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        project_number: row.get(2)?,
        drive_folder_id: row.get(3)?,
        drive_folder_link: row.get(4)?,
        created_at: row.get(5)?,
    })
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_store() -> ProjectStore {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        ProjectStore::new(db)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn first_issuance_starts_at_one() {
        let store = setup_store().await;
        let number = store.issue_next_number(date(2025, 6, 23)).await.unwrap();
        assert_eq!(number, "25-001");
    }

    #[tokio::test]
    async fn sequential_issuance_is_gapless() {
        let store = setup_store().await;
        let today = date(2025, 6, 23);

        for expected in 1..=12_i64 {
            let number = store.issue_next_number(today).await.unwrap();
            assert_eq!(number, format!("25-{expected:03}"));
        }

        let state = store.counter_state().await.unwrap().unwrap();
        assert_eq!(state.counter, 12);
        assert_eq!(state.last_issued, "25-012");
    }

    #[tokio::test]
    async fn year_rollover_resets_to_one() {
        let store = setup_store().await;

        // 57 issuances recorded in year 24.
        for _ in 0..57 {
            store.issue_next_number(date(2024, 12, 30)).await.unwrap();
        }
        let state = store.counter_state().await.unwrap().unwrap();
        assert_eq!((state.year, state.counter), (24, 57));

        // First issuance of the new year restarts the sequence.
        let number = store.issue_next_number(date(2025, 1, 2)).await.unwrap();
        assert_eq!(number, "25-001");
    }

    #[tokio::test]
    async fn concurrent_issuance_yields_distinct_gapless_numbers() {
        let store = setup_store().await;
        let today = date(2025, 6, 23);

        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(
                async move { store.issue_next_number(today).await },
            ));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap());
        }

        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 32, "duplicate numbers issued");
        for (i, number) in numbers.iter().enumerate() {
            assert_eq!(number, &format!("25-{:03}", i + 1), "gap in sequence");
        }
    }

    #[tokio::test]
    async fn insert_and_get_roundtrip() {
        let store = setup_store().await;
        let created = store
            .insert("25-001-EFH Mustermann", Some("25-001"), "folder-1", "https://drive/x")
            .await
            .unwrap();

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "25-001-EFH Mustermann");
        assert_eq!(fetched.project_number.as_deref(), Some("25-001"));
    }

    #[tokio::test]
    async fn name_fragment_match_is_case_insensitive() {
        let store = setup_store().await;
        store
            .insert("25-001-Alpha House", Some("25-001"), "f1", "l1")
            .await
            .unwrap();

        let hit = store.find_by_name_fragment("alpha").await.unwrap();
        assert!(hit.is_some());
        assert!(store.find_by_name_fragment("zeta").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn number_fragment_match_works() {
        let store = setup_store().await;
        store
            .insert("25-003-WP04", Some("25-003"), "f1", "l1")
            .await
            .unwrap();

        let hit = store.find_by_number_fragment("25-003").await.unwrap();
        assert_eq!(hit.unwrap().name, "25-003-WP04");
    }
}
