//! CalDAV calendar provider.
//!
//! Talks to a CalDAV-compatible server (Nextcloud, Radicale, Google
//! Calendar via CalDAV, ...) using standard HTTP methods and iCalendar
//! (RFC 5545) format. The configured collection URL plays the role of
//! the account's primary calendar; a missing URL is a reportable
//! failure, never a crash.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AdapterError, Result};
use crate::traits::{CalendarEvent, CalendarProvider, CreatedEvent, EventStart, NewCalendarEvent};

/// Request timeout for CalDAV calls.
const REQUEST_TIMEOUT_SECS: u64 = 8;

/// CalDAV calendar adapter.
pub struct CaldavCalendar {
    /// URL of the primary calendar collection.
    collection_url: Option<String>,
    /// Username for basic auth.
    username: Option<String>,
    /// Password for basic auth.
    password: Option<String>,
    http: reqwest::Client,
}

impl CaldavCalendar {
    /// Create a calendar adapter with pre-configured CalDAV credentials.
    pub fn new(
        collection_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("baubot/0.1")
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            collection_url: Some(collection_url.into()),
            username: Some(username.into()),
            password: Some(password.into()),
            http,
        }
    }

    /// Create an unconfigured adapter — every call reports the missing
    /// primary calendar instead of panicking.
    pub fn unconfigured() -> Self {
        Self {
            collection_url: None,
            username: None,
            password: None,
            http: reqwest::Client::new(),
        }
    }

    fn collection_url(&self) -> Result<&str> {
        self.collection_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                AdapterError::Config("no primary calendar collection configured".into())
            })
    }

    fn build_request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let (Some(user), Some(pass)) = (self.username.as_deref(), self.password.as_deref()) {
            builder = builder.basic_auth(user, Some(pass));
        }
        builder
    }

    // -----------------------------------------------------------------------
    // iCalendar format helpers (RFC 5545)
    // -----------------------------------------------------------------------

    /// Generate an iCalendar VCALENDAR string for a new event.
    ///
    /// `DTSTART`/`DTEND` carry the event's timezone via `TZID` so the
    /// server renders the event in local office time.
    fn generate_ical_event(uid: &str, event: &NewCalendarEvent) -> String {
        let dtstart = event.start.format("%Y%m%dT%H%M%S");
        let dtend = event.end.format("%Y%m%dT%H%M%S");
        let tzid = &event.timezone;

        let mut ical = String::with_capacity(512);
        ical.push_str("BEGIN:VCALENDAR\r\n");
        ical.push_str("VERSION:2.0\r\n");
        ical.push_str("PRODID:-//baubot//Calendar//EN\r\n");
        ical.push_str("BEGIN:VEVENT\r\n");
        ical.push_str(&format!("UID:{uid}\r\n"));
        ical.push_str(&format!("DTSTART;TZID={tzid}:{dtstart}\r\n"));
        ical.push_str(&format!("DTEND;TZID={tzid}:{dtend}\r\n"));
        ical.push_str(&format!("SUMMARY:{}\r\n", event.summary));
        if !event.description.is_empty() {
            ical.push_str(&format!("DESCRIPTION:{}\r\n", event.description));
        }
        ical.push_str("END:VEVENT\r\n");
        ical.push_str("END:VCALENDAR\r\n");
        ical
    }

    /// Extract VEVENT blocks from raw iCalendar or CalDAV REPORT data.
    fn parse_ical_events(ical_data: &str) -> Vec<CalendarEvent> {
        let mut events = Vec::new();
        let mut in_vevent = false;
        let mut uid: Option<String> = None;
        let mut summary: Option<String> = None;
        let mut start: Option<EventStart> = None;

        for line in ical_data.lines() {
            let trimmed = line.trim();
            if trimmed == "BEGIN:VEVENT" {
                in_vevent = true;
                uid = None;
                summary = None;
                start = None;
            } else if trimmed == "END:VEVENT" {
                in_vevent = false;
                if let Some(start) = start.take() {
                    events.push(CalendarEvent {
                        uid: uid.take(),
                        summary: summary.take().unwrap_or_else(|| "(ohne Titel)".into()),
                        start,
                    });
                }
            } else if in_vevent
                && let Some((key, value)) = trimmed.split_once(':')
            {
                // The key may carry parameters, e.g. DTSTART;VALUE=DATE.
                let mut params = key.split(';');
                let name = params.next().unwrap_or(key).to_ascii_uppercase();
                match name.as_str() {
                    "UID" => uid = Some(value.to_string()),
                    "SUMMARY" => summary = Some(value.to_string()),
                    "DTSTART" => start = Self::parse_ical_start(key, value),
                    _ => {}
                }
            }
        }

        events
    }

    /// Parse a DTSTART property into an [`EventStart`].
    ///
    /// Handles UTC (`20250623T100000Z`), floating/TZID-local
    /// (`20250623T100000`, treated as UTC for ordering purposes) and
    /// all-day (`VALUE=DATE:20250623`) forms.
    fn parse_ical_start(key: &str, value: &str) -> Option<EventStart> {
        let is_date_only = key.to_ascii_uppercase().contains("VALUE=DATE") || value.len() == 8;
        if is_date_only {
            let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
            return Some(EventStart::AllDay(date));
        }

        let trimmed = value.trim_end_matches('Z');
        let naive = NaiveDateTime::parse_from_str(trimmed, "%Y%m%dT%H%M%S").ok()?;
        Some(EventStart::At(naive.and_utc()))
    }

    /// Build a CalDAV REPORT XML body for listing events in a time range.
    fn build_calendar_query_xml(start: &str, end: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8" ?>
<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop>
    <D:getetag/>
    <C:calendar-data/>
  </D:prop>
  <C:filter>
    <C:comp-filter name="VCALENDAR">
      <C:comp-filter name="VEVENT">
        <C:time-range start="{start}" end="{end}"/>
      </C:comp-filter>
    </C:comp-filter>
  </C:filter>
</C:calendar-query>"#
        )
    }

    /// Format a chrono DateTime as a CalDAV time-range value.
    fn format_caldav_datetime(dt: &DateTime<Utc>) -> String {
        dt.format("%Y%m%dT%H%M%SZ").to_string()
    }
}

#[async_trait]
impl CalendarProvider for CaldavCalendar {
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>> {
        let collection_url = self.collection_url()?.to_string();

        let start_str = Self::format_caldav_datetime(&time_min);
        let end_str = Self::format_caldav_datetime(&time_max);
        let xml_body = Self::build_calendar_query_xml(&start_str, &end_str);

        debug!(url = %collection_url, start = %start_str, end = %end_str, "listing calendar events");

        let response = self
            .build_request(
                reqwest::Method::from_bytes(b"REPORT").unwrap_or(reqwest::Method::POST),
                &collection_url,
            )
            .header("Content-Type", "application/xml; charset=utf-8")
            .header("Depth", "1")
            .body(xml_body)
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed {
                operation: "calendar_list_events".into(),
                reason: format!("failed to query calendar: {e}"),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AdapterError::InvalidResponse {
                operation: "calendar_list_events".into(),
                reason: format!("failed to read response: {e}"),
            })?;

        if !status.is_success() {
            return Err(AdapterError::RequestFailed {
                operation: "calendar_list_events".into(),
                reason: format!("calendar server returned {status}"),
            });
        }

        Ok(Self::parse_ical_events(&body))
    }

    async fn create_event(&self, event: &NewCalendarEvent) -> Result<CreatedEvent> {
        let collection_url = self.collection_url()?;

        let uid = Uuid::now_v7().to_string();
        let ical_body = Self::generate_ical_event(&uid, event);
        let event_url = format!("{}/{}.ics", collection_url.trim_end_matches('/'), uid);

        debug!(url = %event_url, summary = %event.summary, "creating calendar event");

        let response = self
            .build_request(reqwest::Method::PUT, &event_url)
            .header("Content-Type", "text/calendar; charset=utf-8")
            .body(ical_body)
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed {
                operation: "calendar_create_event".into(),
                reason: format!("failed to create event: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::RequestFailed {
                operation: "calendar_create_event".into(),
                reason: format!("calendar server returned {status}"),
            });
        }

        Ok(CreatedEvent {
            uid,
            link: event_url,
        })
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn new_event() -> NewCalendarEvent {
        NewCalendarEvent {
            summary: "Bauverhandlung".into(),
            description: "Mit BH Innsbruck".into(),
            start: NaiveDate::from_ymd_opt(2025, 6, 24)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 6, 24)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            timezone: "Europe/Vienna".into(),
        }
    }

    #[test]
    fn generated_ical_carries_tzid_and_times() {
        let ical = CaldavCalendar::generate_ical_event("uid-1", &new_event());
        assert!(ical.contains("UID:uid-1\r\n"));
        assert!(ical.contains("DTSTART;TZID=Europe/Vienna:20250624T090000\r\n"));
        assert!(ical.contains("DTEND;TZID=Europe/Vienna:20250624T100000\r\n"));
        assert!(ical.contains("SUMMARY:Bauverhandlung\r\n"));
        assert!(ical.contains("DESCRIPTION:Mit BH Innsbruck\r\n"));
    }

    #[test]
    fn empty_description_is_omitted() {
        let mut event = new_event();
        event.description.clear();
        let ical = CaldavCalendar::generate_ical_event("uid-1", &event);
        assert!(!ical.contains("DESCRIPTION"));
    }

    #[test]
    fn parse_timed_and_all_day_events() {
        let ical = "BEGIN:VCALENDAR\r\n\
                    BEGIN:VEVENT\r\n\
                    UID:a\r\n\
                    DTSTART:20250623T100000Z\r\n\
                    SUMMARY:Besprechung\r\n\
                    END:VEVENT\r\n\
                    BEGIN:VEVENT\r\n\
                    UID:b\r\n\
                    DTSTART;VALUE=DATE:20250624\r\n\
                    SUMMARY:Urlaub\r\n\
                    END:VEVENT\r\n\
                    END:VCALENDAR\r\n";

        let events = CaldavCalendar::parse_ical_events(ical);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].summary, "Besprechung");
        assert!(matches!(events[0].start, EventStart::At(_)));
        assert_eq!(
            events[1].start,
            EventStart::AllDay(NaiveDate::from_ymd_opt(2025, 6, 24).unwrap())
        );
    }

    #[test]
    fn event_without_dtstart_is_skipped() {
        let ical = "BEGIN:VEVENT\r\nSUMMARY:kaputt\r\nEND:VEVENT\r\n";
        assert!(CaldavCalendar::parse_ical_events(ical).is_empty());
    }

    #[test]
    fn query_xml_includes_time_range() {
        let xml = CaldavCalendar::build_calendar_query_xml("20250623T000000Z", "20250630T000000Z");
        assert!(xml.contains(r#"start="20250623T000000Z""#));
        assert!(xml.contains(r#"end="20250630T000000Z""#));
    }

    #[tokio::test]
    async fn unconfigured_calendar_reports_missing_primary() {
        let calendar = CaldavCalendar::unconfigured();
        let result = calendar.list_events(Utc::now(), Utc::now()).await;
        assert!(matches!(result, Err(AdapterError::Config(_))));
    }
}
