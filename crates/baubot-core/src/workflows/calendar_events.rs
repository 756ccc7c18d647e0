//! Calendar workflows: upcoming-events listing and event creation.

use baubot_adapters::{CalendarEvent, EventStart, NewCalendarEvent};
use chrono::{Duration, Local, Timelike, Utc};
use tracing::{error, info, instrument};

use super::{WorkflowResult, Workflows};
use crate::normalize::normalize_duration;

/// How many events the listing shows at most.
const EVENT_DISPLAY_LIMIT: usize = 10;

/// Display offset for event times (CET). Matches the office's fixed
/// display convention rather than tracking DST.
const DISPLAY_OFFSET_SECS: i32 = 3600;

impl Workflows {
    /// Show the sender's upcoming events for the next `days_ahead` days.
    ///
    /// An empty calendar and a failed query are distinct outcomes with
    /// distinct messages.
    #[instrument(skip(self))]
    pub async fn show_calendar_events(&self, days_ahead: i64) -> WorkflowResult {
        let now = Utc::now();
        let until = now + Duration::days(days_ahead);

        let mut events = match self.calendar.list_events(now, until).await {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, "calendar query failed");
                return WorkflowResult::failed(
                    "❌ **Fehler beim Abrufen der Termine.**\n\nBitte versuche es erneut.",
                );
            }
        };

        if events.is_empty() {
            return WorkflowResult::ok(format!(
                "📅 **Keine Termine in den nächsten {days_ahead} Tagen gefunden.**"
            ))
            .with_detail("event_count", "0");
        }

        events.sort_by_key(CalendarEvent::sort_key);
        let total = events.len();
        events.truncate(EVENT_DISPLAY_LIMIT);

        let mut message = format!("📅 **Termine der nächsten {days_ahead} Tage:**\n\n");
        for event in &events {
            message.push_str(&format_event_line(event));
            message.push('\n');
        }
        if total > EVENT_DISPLAY_LIMIT {
            message.push_str(&format!(
                "\n… und {} weitere Termine.",
                total - EVENT_DISPLAY_LIMIT
            ));
        }

        WorkflowResult::ok(message).with_detail("event_count", total.to_string())
    }

    /// Create a calendar event.
    ///
    /// Without an explicit start, the event defaults to 9:00 the
    /// following day. A resolvable project reference prefixes the
    /// title with the bracketed project name.
    #[instrument(skip(self))]
    pub async fn create_calendar_event(
        &self,
        title: &str,
        duration_hours: f64,
        project_identifier: Option<&str>,
    ) -> WorkflowResult {
        // Same bounds as time recording; an out-of-range extracted
        // duration would overflow the end-time arithmetic.
        let duration = match normalize_duration(duration_hours) {
            Ok(hours) => hours,
            Err(_) => {
                return WorkflowResult::failed(
                    "❌ **Fehler:** Ungültige Termindauer. \
                     Bitte gib eine Zahl zwischen 0 und 24 an.",
                );
            }
        };

        // Extracted date/time fields are deliberately ignored for now;
        // events always start tomorrow at 9:00 office time.
        let start = default_event_start();
        let minutes = (duration * 60.0).round() as i64;
        let end = start + Duration::minutes(minutes);

        let mut project_name = None;
        if let Some(identifier) = project_identifier
            && let Ok(project) = self.resolver.resolve(identifier).await
        {
            project_name = Some(project.name);
        }

        let summary = match &project_name {
            Some(name) => format!("[{name}] {title}"),
            None => title.to_string(),
        };

        let created = match self
            .calendar
            .create_event(&NewCalendarEvent {
                summary: summary.clone(),
                description: String::new(),
                start,
                end,
                timezone: self.config.timezone.clone(),
            })
            .await
        {
            Ok(created) => created,
            Err(e) => {
                error!(error = %e, "event creation failed");
                return WorkflowResult::failed(
                    "❌ **Fehler beim Erstellen des Termins.**\n\nBitte versuche es erneut.",
                );
            }
        };

        info!(uid = %created.uid, %summary, "calendar event created");

        let mut message = format!("✅ **Termin erstellt!**\n\n📅 **Termin:** {summary}\n");
        if let Some(name) = &project_name {
            message.push_str(&format!("📁 **Projekt:** {name}\n"));
        }
        message.push_str(&format!("🔗 [Im Kalender öffnen]({})", created.link));

        WorkflowResult::ok(message)
            .with_detail("event_uid", &created.uid)
            .with_detail("summary", &summary)
            .with_detail("start", start.format("%Y-%m-%dT%H:%M:%S").to_string())
    }
}

/// Tomorrow 9:00 office-local, as a naive timestamp handed to the
/// provider together with the configured timezone name.
fn default_event_start() -> chrono::NaiveDateTime {
    let tomorrow = Local::now().date_naive() + Duration::days(1);
    tomorrow.and_hms_opt(9, 0, 0).unwrap_or_else(|| {
        // 09:00 always exists on a NaiveDate.
        tomorrow.and_time(chrono::NaiveTime::default())
    })
}

/// One listing line: `📅 **DD.MM. HH:MM** - summary`, with all-day
/// events shown as `Ganztägig`.
fn format_event_line(event: &CalendarEvent) -> String {
    match &event.start {
        EventStart::At(instant) => {
            let shifted = *instant + Duration::seconds(i64::from(DISPLAY_OFFSET_SECS));
            format!(
                "📅 **{} {:02}:{:02}** - {}",
                shifted.format("%d.%m."),
                shifted.hour(),
                shifted.minute(),
                event.summary
            )
        }
        EventStart::AllDay(date) => {
            format!("📅 **{} Ganztägig** - {}", date.format("%d.%m."), event.summary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn timed_event_line_shows_cet_time() {
        let event = CalendarEvent {
            uid: Some("abc".into()),
            summary: "Bauverhandlung".into(),
            start: EventStart::At(Utc.with_ymd_and_hms(2025, 6, 23, 13, 30, 0).unwrap()),
        };
        assert_eq!(
            format_event_line(&event),
            "📅 **23.06. 14:30** - Bauverhandlung"
        );
    }

    #[test]
    fn all_day_event_line_says_ganztaegig() {
        let event = CalendarEvent {
            uid: None,
            summary: "Urlaub".into(),
            start: EventStart::AllDay(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()),
        };
        assert_eq!(format_event_line(&event), "📅 **01.07. Ganztägig** - Urlaub");
    }

    #[test]
    fn default_start_is_nine_oclock_tomorrow() {
        let start = default_event_start();
        assert_eq!(start.time(), chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(
            start.date(),
            Local::now().date_naive() + Duration::days(1)
        );
    }
}
