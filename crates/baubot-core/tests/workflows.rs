//! End-to-end workflow tests against an in-memory database and
//! scripted storage/calendar collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use baubot_adapters::{
    AdapterError, CalendarEvent, CalendarProvider, ClassifiedIntent, CreatedEvent, CreatedFolder,
    EventStart, ExtractedFields, Intent, NewCalendarEvent, StorageProvider,
};
use baubot_core::{AssistantConfig, Dispatcher, SenderContext, Workflows};
use baubot_store::{Database, ProjectStore, TimeEntryStore};
use chrono::{DateTime, Duration, Local, TimeZone, Utc};

// ── scripted collaborators ───────────────────────────────────────────

#[derive(Default)]
struct MockStorage {
    created: Mutex<Vec<(String, Option<String>)>>,
    fail_top_level: bool,
    fail_names: Vec<String>,
    counter: AtomicUsize,
}

#[async_trait]
impl StorageProvider for MockStorage {
    async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<CreatedFolder, AdapterError> {
        if (self.fail_top_level && parent_id.is_none())
            || self.fail_names.iter().any(|n| n == name)
        {
            return Err(AdapterError::RequestFailed {
                operation: "create_folder".into(),
                reason: "scripted failure".into(),
            });
        }
        self.created
            .lock()
            .unwrap()
            .push((name.to_string(), parent_id.map(str::to_string)));
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(CreatedFolder {
            folder_id: format!("folder-{n}"),
            folder_link: format!("https://drive.example/folder-{n}"),
        })
    }
}

#[derive(Default)]
struct MockCalendar {
    events: Vec<CalendarEvent>,
    fail_list: bool,
    fail_create: bool,
    created: Mutex<Vec<NewCalendarEvent>>,
}

#[async_trait]
impl CalendarProvider for MockCalendar {
    async fn list_events(
        &self,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, AdapterError> {
        if self.fail_list {
            return Err(AdapterError::RequestFailed {
                operation: "list_events".into(),
                reason: "scripted failure".into(),
            });
        }
        Ok(self.events.clone())
    }

    async fn create_event(&self, event: &NewCalendarEvent) -> Result<CreatedEvent, AdapterError> {
        if self.fail_create {
            return Err(AdapterError::RequestFailed {
                operation: "create_event".into(),
                reason: "scripted failure".into(),
            });
        }
        self.created.lock().unwrap().push(event.clone());
        Ok(CreatedEvent {
            uid: "evt-1".into(),
            link: "https://cal.example/evt-1".into(),
        })
    }
}

// ── fixture ──────────────────────────────────────────────────────────

struct Fixture {
    db: Database,
    storage: Arc<MockStorage>,
    calendar: Arc<MockCalendar>,
    dispatcher: Dispatcher,
}

async fn fixture_with(storage: MockStorage, calendar: MockCalendar) -> Fixture {
    let db = Database::open_in_memory().unwrap();
    db.run_migrations().await.unwrap();
    let storage = Arc::new(storage);
    let calendar = Arc::new(calendar);
    let workflows = Workflows::new(
        db.clone(),
        AssistantConfig::default(),
        storage.clone(),
        calendar.clone(),
    )
    .unwrap();
    Fixture {
        db,
        storage,
        calendar,
        dispatcher: Dispatcher::new(workflows),
    }
}

async fn fixture() -> Fixture {
    fixture_with(MockStorage::default(), MockCalendar::default()).await
}

fn sender() -> SenderContext {
    SenderContext {
        user_id: 12345,
        user_name: "Marcel".to_string(),
    }
}

fn classified(intent: Intent, fields: ExtractedFields) -> ClassifiedIntent {
    ClassifiedIntent {
        intent,
        raw_label: format!("{intent:?}").to_uppercase(),
        confidence: Some(0.9),
        fields,
    }
}

async fn seed_project(db: &Database, name: &str, number: &str) {
    ProjectStore::new(db.clone())
        .insert(name, Some(number), "seed-folder", "https://drive.example/seed")
        .await
        .unwrap();
}

// ── project creation ─────────────────────────────────────────────────

#[tokio::test]
async fn create_project_builds_the_full_folder_tree() {
    let fx = fixture().await;
    let fields = ExtractedFields {
        project_name: Some("Neues Projekt EFH Mustermann".into()),
        ..Default::default()
    };

    let result = fx
        .dispatcher
        .dispatch(classified(Intent::CreateProject, fields), &sender())
        .await;

    assert!(result.success);
    let created = fx.storage.created.lock().unwrap();
    assert_eq!(created.len(), 9); // top-level + 8 subfolders
    assert!(created[0].0.ends_with("-EFH Mustermann"));
    assert!(created[0].1.is_none());
    assert_eq!(created[1].0, "01_Admin");
    assert_eq!(created[8].0, "08_Protokolle");
    // all subfolders hang off the top-level folder
    assert!(created[1..].iter().all(|(_, p)| p.as_deref() == Some("folder-0")));
    assert_eq!(result.details["db_saved"], "true");
}

#[tokio::test]
async fn create_project_without_base_name_uses_bare_number() {
    let fx = fixture().await;
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::CreateProject, ExtractedFields::default()), &sender())
        .await;

    assert!(result.success);
    let name = &result.details["project_name"];
    assert_eq!(name, &result.details["project_number"]);
    assert!(name.ends_with("-001"));
}

#[tokio::test]
async fn failed_top_level_folder_aborts_project_creation() {
    let fx = fixture_with(
        MockStorage {
            fail_top_level: true,
            ..Default::default()
        },
        MockCalendar::default(),
    )
    .await;

    let result = fx
        .dispatcher
        .dispatch(classified(Intent::CreateProject, ExtractedFields::default()), &sender())
        .await;

    assert!(!result.success);
    assert!(fx.storage.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_subfolder_is_reported_but_not_fatal() {
    let fx = fixture_with(
        MockStorage {
            fail_names: vec!["04_Fotos".into()],
            ..Default::default()
        },
        MockCalendar::default(),
    )
    .await;

    let result = fx
        .dispatcher
        .dispatch(classified(Intent::CreateProject, ExtractedFields::default()), &sender())
        .await;

    assert!(result.success);
    assert_eq!(result.details["failed_subfolders"], "1");
    assert!(result.message.contains("04_Fotos"));
}

#[tokio::test]
async fn storage_success_with_persistence_failure_is_a_split_outcome() {
    let fx = fixture().await;
    // Sabotage only the projects table; the counter stays intact.
    fx.db
        .execute_mut(|conn| {
            conn.execute_batch("DROP TABLE projects")?;
            Ok(())
        })
        .await
        .unwrap();

    let result = fx
        .dispatcher
        .dispatch(classified(Intent::CreateProject, ExtractedFields::default()), &sender())
        .await;

    // The folder was created, so the workflow succeeds — with a caveat.
    assert!(result.success);
    assert_eq!(result.details["db_saved"], "false");
    assert!(result.message.contains("Datenbank-Speicherung fehlgeschlagen"));
    assert_eq!(fx.storage.created.lock().unwrap().len(), 9);
}

// ── time recording ───────────────────────────────────────────────────

#[tokio::test]
async fn record_time_persists_an_entry_with_todays_date() {
    let fx = fixture().await;
    seed_project(&fx.db, "25-001-Haus Huber", "25-001").await;

    let fields = ExtractedFields {
        duration_hours: Some(3.0),
        project_identifier: Some("25-001".into()),
        entry_date: Some(String::new()),
        ..Default::default()
    };
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::RecordTime, fields), &sender())
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.details["duration_hours"], "3");
    assert_eq!(
        result.details["entry_date"],
        Local::now().date_naive().format("%Y-%m-%d").to_string()
    );

    let entries = TimeEntryStore::new(fx.db.clone())
        .list_for_project(&result.details["project_id"])
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].duration_hours, 3.0);
    assert_eq!(entries[0].created_by, "Marcel (12345)");
}

#[tokio::test]
async fn out_of_range_duration_is_rejected_without_side_effect() {
    let fx = fixture().await;
    seed_project(&fx.db, "25-001", "25-001").await;

    let fields = ExtractedFields {
        duration_hours: Some(30.0),
        project_identifier: Some("25-001".into()),
        ..Default::default()
    };
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::RecordTime, fields), &sender())
        .await;

    assert!(!result.success);
    assert!(result.message.contains("Ungültige Stundenanzahl"));
    let count: i64 = fx
        .db
        .execute(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM time_entries", [], |r| r.get(0))?)
        })
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn unknown_project_is_rejected_without_side_effect() {
    let fx = fixture().await;

    let fields = ExtractedFields {
        duration_hours: Some(2.0),
        project_identifier: Some("nonexistent".into()),
        ..Default::default()
    };
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::RecordTime, fields), &sender())
        .await;

    assert!(!result.success);
    assert!(result.message.contains("konnte nicht gefunden werden"));
}

#[tokio::test]
async fn record_time_with_yesterday_keyword() {
    let fx = fixture().await;
    seed_project(&fx.db, "25-002-Gewerbehof", "25-002").await;

    let fields = ExtractedFields {
        duration_hours: Some(2.5),
        project_identifier: Some("Gewerbehof".into()),
        entry_date: Some("gestern".into()),
        ..Default::default()
    };
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::RecordTime, fields), &sender())
        .await;

    assert!(result.success, "{}", result.message);
    let expected = (Local::now().date_naive() - Duration::days(1))
        .format("%Y-%m-%d")
        .to_string();
    assert_eq!(result.details["entry_date"], expected);
}

#[tokio::test]
async fn missing_duration_fails_before_any_lookup() {
    let fx = fixture().await;
    let fields = ExtractedFields {
        project_identifier: Some("25-001".into()),
        ..Default::default()
    };
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::RecordTime, fields), &sender())
        .await;
    assert!(!result.success);
}

// ── tasks ────────────────────────────────────────────────────────────

#[tokio::test]
async fn task_is_tagged_and_tolerates_missing_project() {
    let fx = fixture().await;

    let fields = ExtractedFields {
        task_description: Some("Schneelast für das Dach mit dem Bauamt klären".into()),
        project_identifier: Some("nonexistent".into()),
        priority: Some("hoch".into()),
        municipality: Some("Telfs".into()),
        ..Default::default()
    };
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::CreateTask, fields), &sender())
        .await;

    assert!(result.success, "{}", result.message);
    assert_eq!(result.details["priority"], "high");
    assert_eq!(result.details["project_linked"], "false");
    let tags = &result.details["tags"];
    assert!(tags.contains("Schneelast") && tags.contains("Behörde"));
}

#[tokio::test]
async fn task_links_to_a_resolvable_project() {
    let fx = fixture().await;
    seed_project(&fx.db, "25-003-Kindergarten Zirl", "25-003").await;

    let fields = ExtractedFields {
        task_description: Some("Einreichplan fertigstellen".into()),
        project_identifier: Some("Kindergarten".into()),
        ..Default::default()
    };
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::CreateTask, fields), &sender())
        .await;

    assert!(result.success);
    assert_eq!(result.details["project_linked"], "true");
    assert_eq!(result.details["priority"], "medium");
    assert!(result.message.contains("Kindergarten Zirl"));
}

// ── calendar ─────────────────────────────────────────────────────────

fn timed_event(summary: &str, at: DateTime<Utc>) -> CalendarEvent {
    CalendarEvent {
        uid: None,
        summary: summary.to_string(),
        start: EventStart::At(at),
    }
}

#[tokio::test]
async fn calendar_listing_is_sorted_and_capped_at_ten() {
    let base = Utc.with_ymd_and_hms(2025, 6, 23, 8, 0, 0).unwrap();
    // Present the events in reverse order to prove sorting.
    let events: Vec<CalendarEvent> = (0..12)
        .rev()
        .map(|i| timed_event(&format!("Termin {i}"), base + Duration::hours(i)))
        .collect();

    let fx = fixture_with(
        MockStorage::default(),
        MockCalendar {
            events,
            ..Default::default()
        },
    )
    .await;

    let result = fx
        .dispatcher
        .dispatch(classified(Intent::ShowCalendar, ExtractedFields::default()), &sender())
        .await;

    assert!(result.success);
    assert_eq!(result.details["event_count"], "12");
    assert!(result.message.contains("Termin 0"));
    assert!(result.message.contains("Termin 9"));
    assert!(!result.message.contains("Termin 10"));
    assert!(result.message.contains("2 weitere Termine"));
}

#[tokio::test]
async fn empty_calendar_and_query_error_are_distinct() {
    let empty = fixture().await;
    let ok = empty
        .dispatcher
        .dispatch(classified(Intent::ShowCalendar, ExtractedFields::default()), &sender())
        .await;
    assert!(ok.success);
    assert!(ok.message.contains("Keine Termine"));

    let failing = fixture_with(
        MockStorage::default(),
        MockCalendar {
            fail_list: true,
            ..Default::default()
        },
    )
    .await;
    let err = failing
        .dispatcher
        .dispatch(classified(Intent::ShowCalendar, ExtractedFields::default()), &sender())
        .await;
    assert!(!err.success);
    assert!(err.message.contains("Fehler beim Abrufen"));
}

#[tokio::test]
async fn created_event_defaults_to_an_hour_tomorrow_morning() {
    let fx = fixture().await;

    let fields = ExtractedFields {
        event_title: Some("Bauverhandlung".into()),
        ..Default::default()
    };
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::CreateCalendarEvent, fields), &sender())
        .await;

    assert!(result.success, "{}", result.message);
    let created = fx.calendar.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    let event = &created[0];
    assert_eq!(event.summary, "Bauverhandlung");
    assert_eq!(event.start.time(), chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    assert_eq!(event.end - event.start, Duration::hours(1));
    assert_eq!(event.timezone, "Europe/Vienna");
    assert!(result.message.contains("https://cal.example/evt-1"));
}

#[tokio::test]
async fn event_title_gets_a_project_prefix_when_the_reference_resolves() {
    let fx = fixture().await;
    seed_project(&fx.db, "25-004-Haus Pöltner", "25-004").await;

    let fields = ExtractedFields {
        event_title: Some("ÖBA Begehung".into()),
        project_identifier: Some("Pöltner".into()),
        duration_hours: Some(2.0),
        ..Default::default()
    };
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::CreateCalendarEvent, fields), &sender())
        .await;

    assert!(result.success);
    let created = fx.calendar.created.lock().unwrap();
    assert_eq!(created[0].summary, "[25-004-Haus Pöltner] ÖBA Begehung");
    assert_eq!(created[0].end - created[0].start, Duration::hours(2));
}

#[tokio::test]
async fn oversized_days_ahead_is_clamped_to_a_year() {
    let fx = fixture().await;

    // Extracted numbers come straight from the model; a runaway value
    // must not overflow the lookahead arithmetic.
    let fields = ExtractedFields {
        days_ahead: Some(i64::MAX),
        ..Default::default()
    };
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::ShowCalendar, fields), &sender())
        .await;

    assert!(result.success);
    assert!(result.message.contains("365 Tagen"), "{}", result.message);
}

#[tokio::test]
async fn oversized_event_duration_is_rejected() {
    let fx = fixture().await;

    let fields = ExtractedFields {
        event_title: Some("Bauverhandlung".into()),
        duration_hours: Some(1e30),
        ..Default::default()
    };
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::CreateCalendarEvent, fields), &sender())
        .await;

    assert!(!result.success);
    assert!(result.message.contains("Ungültige Termindauer"));
    assert!(fx.calendar.created.lock().unwrap().is_empty());
}

// ── routing ──────────────────────────────────────────────────────────

#[tokio::test]
async fn help_returns_the_capability_summary() {
    let fx = fixture().await;
    let result = fx
        .dispatcher
        .dispatch(classified(Intent::Help, ExtractedFields::default()), &sender())
        .await;
    assert!(result.success);
    assert!(result.message.contains("Verfügbare Befehle"));
}

#[tokio::test]
async fn unknown_intent_echoes_the_raw_label() {
    let fx = fixture().await;
    let result = fx
        .dispatcher
        .dispatch(
            ClassifiedIntent {
                intent: Intent::Unknown,
                raw_label: "MAKE_COFFEE".into(),
                confidence: None,
                fields: ExtractedFields::default(),
            },
            &sender(),
        )
        .await;
    assert!(!result.success);
    assert!(result.message.contains("MAKE_COFFEE"));
}
