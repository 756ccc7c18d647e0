//! Per-intent workflows.
//!
//! One workflow per side-effecting intent: CreateProject, RecordTime,
//! CreateTask, ShowCalendarEvents, CreateCalendarEvent. Each workflow
//! owns its validation, reference resolution, side effects and message
//! formatting, and always returns a [`WorkflowResult`] — collaborator
//! failures are caught here, never propagated upward.

mod calendar_events;
mod create_project;
mod create_task;
mod record_time;

pub use create_task::TaskRequest;

use std::collections::BTreeMap;
use std::sync::Arc;

use baubot_adapters::{CalendarProvider, StorageProvider};
use baubot_store::{Database, ProjectStore, TaskStore, TimeEntryStore};

use crate::config::AssistantConfig;
use crate::error::CoreResult;
use crate::numbering::NumberingService;
use crate::resolver::ProjectResolver;
use crate::tags::TagMatcher;

/// Outcome of one workflow execution, handed to the transport layer.
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    /// Whether the workflow's primary side effect succeeded.
    pub success: bool,
    /// User-facing message (Markdown).
    pub message: String,
    /// Structured facts about the outcome, for logging and tests.
    pub details: BTreeMap<String, String>,
}

impl WorkflowResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Who sent the message being processed.
#[derive(Debug, Clone)]
pub struct SenderContext {
    pub user_id: i64,
    pub user_name: String,
}

impl SenderContext {
    /// Identity string stored in `created_by` columns.
    pub fn created_by(&self) -> String {
        format!("{} ({})", self.user_name, self.user_id)
    }
}

/// The workflow layer: leaf services plus external collaborators.
pub struct Workflows {
    pub(crate) config: AssistantConfig,
    pub(crate) numbering: NumberingService,
    pub(crate) resolver: ProjectResolver,
    pub(crate) tag_matcher: TagMatcher,
    pub(crate) projects: ProjectStore,
    pub(crate) time_entries: TimeEntryStore,
    pub(crate) tasks: TaskStore,
    pub(crate) storage: Arc<dyn StorageProvider>,
    pub(crate) calendar: Arc<dyn CalendarProvider>,
}

impl Workflows {
    /// Wire up the workflow layer over a migrated database and the
    /// external collaborators.
    pub fn new(
        db: Database,
        config: AssistantConfig,
        storage: Arc<dyn StorageProvider>,
        calendar: Arc<dyn CalendarProvider>,
    ) -> CoreResult<Self> {
        let projects = ProjectStore::new(db.clone());
        let tag_matcher = TagMatcher::new(&config.tag_keywords)?;

        Ok(Self {
            numbering: NumberingService::new(projects.clone()),
            resolver: ProjectResolver::new(projects.clone()),
            tag_matcher,
            time_entries: TimeEntryStore::new(db.clone()),
            tasks: TaskStore::new(db),
            projects,
            storage,
            calendar,
            config,
        })
    }
}
