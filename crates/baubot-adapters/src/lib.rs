//! External service adapters for Baubot — storage, calendar, chat, LLM.
//!
//! Network-facing collaborators live here behind the traits defined in
//! [`traits`], so the workflow layer can be tested against in-memory
//! fakes.

pub mod calendar;
pub mod classifier;
pub mod drive;
pub mod error;
pub mod telegram;
pub mod traits;

pub use calendar::CaldavCalendar;
pub use classifier::{ClassifiedIntent, ExtractedFields, Intent, IntentClassifier};
pub use drive::DriveStorage;
pub use error::{AdapterError, Result};
pub use telegram::{IncomingMessage, TelegramClient, TelegramUpdate};
pub use traits::{
    CalendarEvent, CalendarProvider, CreatedEvent, CreatedFolder, EventStart, NewCalendarEvent,
    StorageProvider,
};
