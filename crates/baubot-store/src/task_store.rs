//! Task persistence.
//!
//! Tasks carry an optional project link, auto-derived domain tags (stored
//! as a JSON array), and the Tyrol-specific authority/municipality fields
//! extracted by the classifier.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{StoreError, StoreResult};

// ═══════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════

/// Task priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    /// Parse a classifier-supplied label leniently.
    ///
    /// Accepts English and German labels; anything absent or unrecognized
    /// falls back to `Medium`, which is the documented default.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "high" | "hoch" => Self::High,
            "low" | "niedrig" => Self::Low,
            _ => Self::Medium,
        }
    }

    /// Database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    fn from_str(s: &str) -> StoreResult<Self> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(StoreError::InvalidArgument(format!(
                "unknown task priority: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (UUID v7).
    pub id: String,
    /// Free-text task description.
    pub content: String,
    /// Priority, defaulted to medium upstream when unrecognized.
    pub priority: TaskPriority,
    /// Optional owning project.
    pub project_id: Option<String>,
    /// Auto-derived domain tags.
    pub tags: Vec<String>,
    /// Involved authority (Behörde), if the classifier extracted one.
    pub authority: Option<String>,
    /// Involved municipality (Gemeinde), if the classifier extracted one.
    pub municipality: Option<String>,
    /// Sender identity.
    pub created_by: String,
    /// Unix timestamp when the task was created.
    pub created_at: i64,
}

/// Fields for a new task, before the store assigns id and timestamp.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub content: String,
    pub priority: Option<TaskPriority>,
    pub project_id: Option<String>,
    pub tags: Vec<String>,
    pub authority: Option<String>,
    pub municipality: Option<String>,
    pub created_by: String,
}

// ═══════════════════════════════════════════════════════════════════════
//  TaskStore
// ═══════════════════════════════════════════════════════════════════════

/// Insert-only store for tasks.
#[derive(Clone)]
pub struct TaskStore {
    db: Database,
}

impl TaskStore {
    /// Create a new task store backed by `db`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a new task. A missing priority defaults to medium.
    #[instrument(skip(self, new))]
    pub async fn insert(&self, new: NewTask) -> StoreResult<Task> {
        if new.content.trim().is_empty() {
            return Err(StoreError::InvalidArgument(
                "task content must not be empty".into(),
            ));
        }

        let task = Task {
            id: Uuid::now_v7().to_string(),
            content: new.content,
            priority: new.priority.unwrap_or(TaskPriority::Medium),
            project_id: new.project_id,
            tags: new.tags,
            authority: new.authority,
            municipality: new.municipality,
            created_by: new.created_by,
            created_at: Utc::now().timestamp(),
        };

        let row = task.clone();
        let tags_json = serde_json::to_string(&row.tags)?;
        self.db
            .execute(move |conn| {
                conn.execute(
                    "INSERT INTO tasks \
                     (id, content, priority, project_id, tags, authority, municipality, created_by, created_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    rusqlite::params![
                        row.id,
                        row.content,
                        row.priority.as_str(),
                        row.project_id,
                        tags_json,
                        row.authority,
                        row.municipality,
                        row.created_by,
                        row.created_at
                    ],
                )?;
                Ok(())
            })
            .await?;

        debug!(task_id = %task.id, priority = %task.priority, "task created");
        Ok(task)
    }

    /// Fetch a single task by id, returning `None` if not found.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Task>> {
        let id = id.to_string();
        self.db
            .execute(move |conn| {
                let row: Option<(String, String, String, Option<String>, String, Option<String>, Option<String>, String, i64)> =
                    match conn.query_row(
                        "SELECT id, content, priority, project_id, tags, authority, municipality, created_by, created_at \
                         FROM tasks WHERE id = ?1",
                        rusqlite::params![id],
                        |row| {
                            Ok((
                                row.get(0)?,
                                row.get(1)?,
                                row.get(2)?,
                                row.get(3)?,
                                row.get(4)?,
                                row.get(5)?,
                                row.get(6)?,
                                row.get(7)?,
                                row.get(8)?,
                            ))
                        },
                    ) {
                        Ok(r) => Some(r),
                        Err(rusqlite::Error::QueryReturnedNoRows) => None,
                        Err(e) => return Err(e.into()),
                    };

                match row {
                    Some((id, content, priority, project_id, tags, authority, municipality, created_by, created_at)) => {
                        Ok(Some(Task {
                            id,
                            content,
                            priority: TaskPriority::from_str(&priority)?,
                            project_id,
                            tags: serde_json::from_str(&tags)?,
                            authority,
                            municipality,
                            created_by,
                            created_at,
                        }))
                    }
                    None => Ok(None),
                }
            })
            .await
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> TaskStore {
        let db = Database::open_in_memory().unwrap();
        db.run_migrations().await.unwrap();
        TaskStore::new(db)
    }

    #[tokio::test]
    async fn insert_roundtrips_tags_and_fields() {
        let store = setup().await;
        let created = store
            .insert(NewTask {
                content: "Stellplatznachweis prüfen".into(),
                priority: Some(TaskPriority::High),
                tags: vec!["TBO".into(), "Stellplatz".into()],
                authority: Some("BH Innsbruck".into()),
                municipality: Some("Telfs".into()),
                created_by: "Marcel (1)".into(),
                ..NewTask::default()
            })
            .await
            .unwrap();

        let fetched = store.get(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.priority, TaskPriority::High);
        assert_eq!(fetched.tags, vec!["TBO", "Stellplatz"]);
        assert_eq!(fetched.authority.as_deref(), Some("BH Innsbruck"));
        assert_eq!(fetched.municipality.as_deref(), Some("Telfs"));
    }

    #[tokio::test]
    async fn missing_priority_defaults_to_medium() {
        let store = setup().await;
        let created = store
            .insert(NewTask {
                content: "Grundriss überarbeiten".into(),
                created_by: "Marcel (1)".into(),
                ..NewTask::default()
            })
            .await
            .unwrap();
        assert_eq!(created.priority, TaskPriority::Medium);
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let store = setup().await;
        let result = store
            .insert(NewTask {
                content: "   ".into(),
                created_by: "x".into(),
                ..NewTask::default()
            })
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn priority_label_parsing_is_lenient() {
        assert_eq!(TaskPriority::from_label("hoch"), TaskPriority::High);
        assert_eq!(TaskPriority::from_label("HIGH"), TaskPriority::High);
        assert_eq!(TaskPriority::from_label("niedrig"), TaskPriority::Low);
        assert_eq!(TaskPriority::from_label("mittel"), TaskPriority::Medium);
        assert_eq!(TaskPriority::from_label("dringend"), TaskPriority::Medium);
        assert_eq!(TaskPriority::from_label(""), TaskPriority::Medium);
    }
}
