//! Collaborator traits and supporting types.
//!
//! The workflow pipeline talks to cloud storage and the calendar only
//! through these traits, so tests can substitute in-memory fakes and the
//! concrete transports ([`crate::drive::DriveStorage`],
//! [`crate::calendar::CaldavCalendar`]) stay swappable.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Result of a successful folder creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedFolder {
    /// Provider-assigned folder id.
    pub folder_id: String,
    /// Shareable link to open the folder.
    pub folder_link: String,
}

/// Cloud storage collaborator: folder creation only.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Create a folder under `parent_id`, or at the storage root when
    /// `parent_id` is `None`.
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<CreatedFolder>;
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// When an event starts: a point in time or an all-day date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventStart {
    /// Timed event.
    At(DateTime<Utc>),
    /// All-day event.
    AllDay(NaiveDate),
}

/// A calendar event as returned by the provider.
#[derive(Debug, Clone)]
pub struct CalendarEvent {
    /// Provider event uid, when present.
    pub uid: Option<String>,
    /// Event title.
    pub summary: String,
    /// Start of the event.
    pub start: EventStart,
}

impl CalendarEvent {
    /// Chronological sort key — all-day events sort at midnight UTC.
    pub fn sort_key(&self) -> DateTime<Utc> {
        match self.start {
            EventStart::At(dt) => dt,
            EventStart::AllDay(date) => date
                .and_hms_opt(0, 0, 0)
                .map(|naive| naive.and_utc())
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Fields for a new calendar event.
#[derive(Debug, Clone)]
pub struct NewCalendarEvent {
    /// Event title.
    pub summary: String,
    /// Free-text description.
    pub description: String,
    /// Local start time, interpreted in `timezone`.
    pub start: NaiveDateTime,
    /// Local end time, interpreted in `timezone`.
    pub end: NaiveDateTime,
    /// IANA timezone name, e.g. `Europe/Vienna`.
    pub timezone: String,
}

/// Result of a successful event creation.
#[derive(Debug, Clone)]
pub struct CreatedEvent {
    /// Provider-assigned event uid.
    pub uid: String,
    /// Link to the created event.
    pub link: String,
}

/// Calendar collaborator: list and create events on the primary calendar.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// List events between `time_min` and `time_max` on the primary
    /// calendar, in no guaranteed order.
    async fn list_events(
        &self,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>>;

    /// Create an event on the primary calendar.
    async fn create_event(&self, event: &NewCalendarEvent) -> Result<CreatedEvent>;
}
