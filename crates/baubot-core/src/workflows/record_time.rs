//! Time recording: validate, resolve, persist.

use chrono::{Local, NaiveDate};
use tracing::{error, info, instrument};

use super::{SenderContext, WorkflowResult, Workflows};
use crate::error::CoreError;
use crate::normalize::{normalize_date, normalize_duration};

impl Workflows {
    /// Record a time entry against a project.
    ///
    /// Validation and resolution run before any side effect: a bad
    /// duration or an unresolvable project produces an error message
    /// and leaves the store untouched.
    #[instrument(skip(self, sender), fields(user = %sender.user_name))]
    pub async fn record_time(
        &self,
        sender: &SenderContext,
        duration_hours: f64,
        project_identifier: &str,
        activity_description: &str,
        entry_date_raw: &str,
    ) -> WorkflowResult {
        let duration = match normalize_duration(duration_hours) {
            Ok(hours) => hours,
            Err(_) => {
                return WorkflowResult::failed(
                    "❌ **Fehler:** Ungültige Stundenanzahl. \
                     Bitte gib eine Zahl zwischen 0 und 24 an.",
                );
            }
        };

        let entry_date = normalize_date(entry_date_raw, Local::now().date_naive());

        let project = match self.resolver.resolve(project_identifier).await {
            Ok(project) => project,
            Err(CoreError::ProjectNotFound(_)) => {
                return WorkflowResult::failed(format!(
                    "🚨 **Fehler:** Das Projekt {project_identifier} konnte nicht gefunden \
                     werden. Bitte gib eine gültige Projektnummer oder einen Namen an."
                ));
            }
            Err(e) => {
                error!(error = %e, "project lookup failed");
                return WorkflowResult::failed(
                    "❌ **Fehler beim Speichern der Zeiterfassung.**\n\n\
                     Bitte versuche es erneut.",
                );
            }
        };

        let iso_date = entry_date.format("%Y-%m-%d").to_string();
        let entry = match self
            .time_entries
            .insert(
                &project.id,
                duration,
                activity_description,
                &iso_date,
                &sender.created_by(),
            )
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                error!(error = %e, project_id = %project.id, "time entry insert failed");
                return WorkflowResult::failed(
                    "❌ **Fehler beim Speichern der Zeiterfassung.**\n\n\
                     Bitte versuche es erneut.",
                );
            }
        };

        info!(entry_id = %entry.id, project = %project.name, duration, "time entry recorded");

        let message = format!(
            "✅ **Zeit erfasst!**\n\n\
             📁 **Projekt:** {}\n\
             ⏱️ **Dauer:** {duration} Stunden\n\
             📝 **Tätigkeit:** {activity_description}\n\
             📅 **Datum:** {}\n\
             👤 **Erfasst von:** {}",
            project.name,
            display_date(entry_date),
            sender.user_name,
        );

        WorkflowResult::ok(message)
            .with_detail("entry_id", &entry.id)
            .with_detail("project_id", &project.id)
            .with_detail("duration_hours", duration.to_string())
            .with_detail("entry_date", &iso_date)
    }
}

fn display_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}
