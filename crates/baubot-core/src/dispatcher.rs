//! Intent routing.
//!
//! The dispatcher is a finite map from classified intent to workflow.
//! It owns required-field validation and defaulting, nothing else:
//! business validation, resolution and side effects live in the
//! workflows. There is no cross-message state; every message is routed
//! independently.

use baubot_adapters::{ClassifiedIntent, Intent};
use tracing::{debug, instrument};

use crate::workflows::{SenderContext, TaskRequest, WorkflowResult, Workflows};

/// Default lookahead for the calendar listing, in days.
const DEFAULT_DAYS_AHEAD: i64 = 7;

/// Upper bound for the calendar lookahead. Extracted numbers come from
/// a language model and can be arbitrarily large; an unbounded value
/// would overflow the time arithmetic downstream.
const MAX_DAYS_AHEAD: i64 = 365;

/// Default event duration in hours.
const DEFAULT_EVENT_DURATION: f64 = 1.0;

/// Capability summary returned for the HELP intent.
const HELP_TEXT: &str = "📋 **Baubot - Verfügbare Befehle:**\n\n\
🏗️ **Projekt erstellen:**\n`\"Neues Projekt EFH Mustermann\"`\n\n\
⏱️ **Zeit erfassen:**\n`\"3h auf Projekt 25-003 für Entwurf\"`\n`\"gestern 4h an Fassade gearbeitet\"`\n\n\
📝 **Aufgabe hinzufügen:**\n`\"Aufgabe: Grundriss überarbeiten\"`\n\n\
📅 **Termine anzeigen:**\n`\"Zeige meine Termine\"`\n\n\
📅 **Termin erstellen:**\n`\"Termin: Bauverhandlung\"`\n\n\
❓ **Hilfe anzeigen:**\n`\"Hilfe\"`";

/// Routes classified intents to workflows.
pub struct Dispatcher {
    workflows: Workflows,
}

impl Dispatcher {
    pub fn new(workflows: Workflows) -> Self {
        Self { workflows }
    }

    /// Route one classified message and produce the reply.
    ///
    /// Never returns an error: validation problems, collaborator
    /// failures and unknown intents all come back as a
    /// [`WorkflowResult`] carrying a user-facing message.
    #[instrument(skip(self, classified, sender), fields(intent = ?classified.intent))]
    pub async fn dispatch(
        &self,
        classified: ClassifiedIntent,
        sender: &SenderContext,
    ) -> WorkflowResult {
        debug!(label = %classified.raw_label, "routing intent");
        let fields = classified.fields;

        match classified.intent {
            Intent::CreateProject => {
                self.workflows
                    .create_project(fields.project_name.as_deref())
                    .await
            }

            Intent::RecordTime => {
                let Some(duration) = fields.duration_hours else {
                    return WorkflowResult::failed(
                        "❌ **Fehler:** Ungültige Stundenanzahl. \
                         Bitte gib eine Zahl zwischen 0 und 24 an.",
                    );
                };
                let Some(identifier) = fields.project_identifier else {
                    return WorkflowResult::failed(
                        "🚨 **Fehler:** Es wurde kein Projekt angegeben. \
                         Bitte gib eine Projektnummer oder einen Namen an.",
                    );
                };
                self.workflows
                    .record_time(
                        sender,
                        duration,
                        &identifier,
                        fields.activity_description.as_deref().unwrap_or(""),
                        fields.entry_date.as_deref().unwrap_or(""),
                    )
                    .await
            }

            Intent::CreateTask => {
                let Some(description) = fields.task_description else {
                    return WorkflowResult::failed(
                        "❌ **Fehler:** Es wurde keine Aufgabenbeschreibung erkannt.",
                    );
                };
                self.workflows
                    .create_task(
                        sender,
                        TaskRequest {
                            description,
                            project_identifier: fields.project_identifier,
                            priority_label: fields.priority,
                            authority: fields.authority,
                            municipality: fields.municipality,
                        },
                    )
                    .await
            }

            Intent::ShowCalendar => {
                let days = fields
                    .days_ahead
                    .unwrap_or(DEFAULT_DAYS_AHEAD)
                    .clamp(1, MAX_DAYS_AHEAD);
                self.workflows.show_calendar_events(days).await
            }

            Intent::CreateCalendarEvent => {
                let title = fields.event_title.as_deref().unwrap_or("Termin");
                let duration = fields.duration_hours.unwrap_or(DEFAULT_EVENT_DURATION);
                self.workflows
                    .create_calendar_event(title, duration, fields.project_identifier.as_deref())
                    .await
            }

            Intent::Help => WorkflowResult::ok(HELP_TEXT),

            Intent::Unknown => WorkflowResult::failed(format!(
                "🤔 **Intent erkannt:** `{}`\n\n\
                 Ich verstehe deine Anfrage noch nicht vollständig.\n\n\
                 💡 Schreib **\"Hilfe\"** für alle verfügbaren Befehle.",
                classified.raw_label
            )),
        }
    }
}
