//! Task creation: auto-tagging, optional project link, persist.

use baubot_store::{NewTask, TaskPriority};
use tracing::{debug, error, info, instrument};

use super::{SenderContext, WorkflowResult, Workflows};

/// Parameters for a new task, as extracted from the message.
#[derive(Debug, Clone, Default)]
pub struct TaskRequest {
    pub description: String,
    pub project_identifier: Option<String>,
    pub priority_label: Option<String>,
    pub authority: Option<String>,
    pub municipality: Option<String>,
}

impl Workflows {
    /// Create a task, auto-tagged from the configured keyword table.
    ///
    /// A project reference that does not resolve is tolerated: the task
    /// is created without a project link. That is deliberately laxer
    /// than time recording, where a bad reference is fatal.
    #[instrument(skip(self, sender, request), fields(user = %sender.user_name))]
    pub async fn create_task(
        &self,
        sender: &SenderContext,
        request: TaskRequest,
    ) -> WorkflowResult {
        let tags = self.tag_matcher.extract(&request.description);

        let mut project_name = None;
        let mut project_id = None;
        if let Some(identifier) = request.project_identifier.as_deref()
            && let Ok(project) = self.resolver.resolve(identifier).await
        {
            project_name = Some(project.name);
            project_id = Some(project.id);
        }
        if request.project_identifier.is_some() && project_id.is_none() {
            debug!("project reference did not resolve, creating unlinked task");
        }

        let priority = request
            .priority_label
            .as_deref()
            .map(TaskPriority::from_label)
            .unwrap_or(TaskPriority::Medium);

        let task = match self
            .tasks
            .insert(NewTask {
                content: request.description.clone(),
                priority: Some(priority),
                project_id,
                tags: tags.clone(),
                authority: request.authority.clone(),
                municipality: request.municipality.clone(),
                created_by: sender.created_by(),
            })
            .await
        {
            Ok(task) => task,
            Err(e) => {
                error!(error = %e, "task insert failed");
                return WorkflowResult::failed(
                    "❌ **Fehler beim Erstellen der Aufgabe.**\n\nBitte versuche es erneut.",
                );
            }
        };

        info!(task_id = %task.id, ?tags, "task created");

        let (priority_emoji, priority_label) = match priority {
            TaskPriority::High => ("🔴", "Hoch"),
            TaskPriority::Medium => ("🟡", "Mittel"),
            TaskPriority::Low => ("🟢", "Niedrig"),
        };

        let mut message = format!(
            "✅ **Aufgabe erstellt!**\n\n\
             {priority_emoji} **Priorität:** {priority_label}\n\
             📝 **Aufgabe:** {}\n",
            request.description,
        );
        if let Some(name) = &project_name {
            message.push_str(&format!("📁 **Projekt:** {name}\n"));
        }
        if !tags.is_empty() {
            message.push_str(&format!("🏷️ **Tags:** {}\n", tags.join(", ")));
        }
        if let Some(authority) = &request.authority {
            message.push_str(&format!("🏛️ **Behörde:** {authority}\n"));
        }
        if let Some(municipality) = &request.municipality {
            message.push_str(&format!("📍 **Gemeinde:** {municipality}\n"));
        }

        WorkflowResult::ok(message)
            .with_detail("task_id", &task.id)
            .with_detail("priority", priority.as_str())
            .with_detail("tags", tags.join(","))
            .with_detail(
                "project_linked",
                task.project_id.is_some().to_string(),
            )
    }
}
