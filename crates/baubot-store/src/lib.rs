//! # baubot-store
//!
//! Storage engine for baubot.
//!
//! Provides SQLite-backed persistence (WAL mode, versioned transactional
//! migrations) for the office assistant's entities: projects and the
//! sequential project-number counter, time entries, tasks, and key-value
//! bot state (Telegram polling offset).
//!
//! ## Quick start
//!
//! ```ignore
//! use baubot_store::{Database, ProjectStore};
//!
//! let db = Database::open_and_migrate("data/baubot.db").await?;
//! let projects = ProjectStore::new(db.clone());
//! let number = projects.issue_next_number(chrono::Local::now().date_naive()).await?;
//! ```

pub mod bot_state;
pub mod db;
pub mod error;
pub mod migration;
pub mod project_store;
pub mod task_store;
pub mod time_entry_store;

// ── re-exports ───────────────────────────────────────────────────────

pub use bot_state::BotStateStore;
pub use db::Database;
pub use error::{StoreError, StoreResult};
pub use project_store::{CounterState, Project, ProjectStore};
pub use task_store::{NewTask, Task, TaskPriority, TaskStore};
pub use time_entry_store::{TimeEntry, TimeEntryStore};
