use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use hockey_calendar::components::changes::EmailMessage;
use hockey_calendar::components::{CalendarEvent, EventSource, Notifier};
use hockey_calendar::config::{Config, MailConfig, ReportCatalog};
use hockey_calendar::error::{google_calendar_error, AppResult};
use hockey_calendar::startup::run_with;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

const CATALOG: &str = r#"
[calendars]
la = { id = "la@example.com", title = "Lanškroun" }

[[reports]]
slug = "hrdina-la"
title = "Ledy Hrdina"
calendar = "la"
keywords = ["hrdina"]
notify = true

[[reports]]
slug = "brusleni-la"
title = "Volné bruslení"
calendar = "la"
keywords = ["volné bruslení"]

[[availability]]
slug = "available-la"
title = "Volné termíny"
calendar = "la"
"#;

/// Calendar whose content can be swapped between runs
#[derive(Default)]
struct MockCalendar {
    events: Mutex<HashMap<String, Vec<CalendarEvent>>>,
    fail: Mutex<bool>,
}

impl MockCalendar {
    fn set(&self, calendar_id: &str, events: Vec<CalendarEvent>) {
        self.events
            .lock()
            .unwrap()
            .insert(calendar_id.to_string(), events);
    }

    fn fail(&self) {
        *self.fail.lock().unwrap() = true;
    }
}

#[async_trait]
impl EventSource for MockCalendar {
    async fn fetch_events(
        &self,
        calendar_id: &str,
        _time_min: DateTime<Utc>,
    ) -> AppResult<Vec<CalendarEvent>> {
        if *self.fail.lock().unwrap() {
            return Err(google_calendar_error("HTTP 503"));
        }
        Ok(self
            .events
            .lock()
            .unwrap()
            .get(calendar_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Keeps every message instead of sending it
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingNotifier {
    fn take_subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .drain(..)
            .map(|m| m.subject)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

fn config(dir: &Path, extra: &str) -> Arc<Config> {
    Arc::new(Config {
        google_api_key: String::new(),
        output_dir: dir.to_path_buf(),
        timezone: chrono_tz::Europe::Prague,
        locale: "en".to_string(),
        log_file: None,
        mail: MailConfig {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            recipients: vec![],
        },
        catalog: ReportCatalog::from_toml(&format!("{}\n{}", extra, CATALOG)).unwrap(),
    })
}

fn at(value: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(value).unwrap()
}

/// Starts at 18:00 on `day` of October 2099, last edited on `updated_day` of September
fn event(id: &str, name: &str, day: u32, updated_day: u32) -> CalendarEvent {
    let start = at(&format!("2099-10-{:02}T18:00:00+02:00", day));
    CalendarEvent::new(
        id,
        name,
        start,
        start + Duration::hours(1),
        at("2099-09-01T10:00:00+02:00"),
        at(&format!("2099-09-{:02}T10:00:00+02:00", updated_day)),
    )
}

async fn run(
    config: &Arc<Config>,
    calendar: &Arc<MockCalendar>,
    notifier: &Arc<RecordingNotifier>,
) -> AppResult<usize> {
    run_with(config.clone(), calendar.clone(), notifier.clone(), None).await
}

#[tokio::test]
async fn test_first_run_then_changes() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "");
    let calendar = Arc::new(MockCalendar::default());
    let notifier = Arc::new(RecordingNotifier::default());

    calendar.set(
        "la@example.com",
        vec![
            event("1", "Hrdina", 2, 1),
            event("2", "Volné bruslení", 3, 1),
            event("3", "Hrdina B", 4, 1),
        ],
    );
    assert_eq!(run(&config, &calendar, &notifier).await.unwrap(), 0);

    // every event of the tracked report is new on the first run
    assert_eq!(
        notifier.take_subjects(),
        vec![
            "Hockey Calendar Reader - New event",
            "Hockey Calendar Reader - New event"
        ]
    );
    assert!(dir.path().join("hrdina-la.txt").exists());
    assert!(dir.path().join("hrdina-la.html").exists());
    assert!(!dir.path().join("hrdina-la.txt.backup").exists());
    assert!(dir.path().join("available-la.txt").exists());

    let display = fs::read_to_string(dir.path().join("brusleni-la.txt")).unwrap();
    assert_eq!(display.lines().count(), 1);
    assert_eq!(display.trim_end().split(';').count(), 5);

    // same calendar again: nothing to report
    assert_eq!(run(&config, &calendar, &notifier).await.unwrap(), 0);
    assert!(notifier.take_subjects().is_empty());
    assert!(dir.path().join("hrdina-la.txt.backup").exists());

    // event 1 edited, event 3 removed before its start, event 4 added
    calendar.set(
        "la@example.com",
        vec![
            event("1", "Hrdina", 2, 5),
            event("2", "Volné bruslení", 3, 1),
            event("4", "Hrdina C", 5, 5),
        ],
    );
    assert_eq!(run(&config, &calendar, &notifier).await.unwrap(), 0);
    assert_eq!(
        notifier.take_subjects(),
        vec![
            "Hockey Calendar Reader - New event",
            "Hockey Calendar Reader - Event started",
            "Hockey Calendar Reader - Event updated",
        ]
    );
}

#[tokio::test]
async fn test_past_start_rule_reports_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "removal_rule = \"past_start_means_started\"");
    let calendar = Arc::new(MockCalendar::default());
    let notifier = Arc::new(RecordingNotifier::default());

    calendar.set("la@example.com", vec![event("1", "Hrdina", 2, 1)]);
    run(&config, &calendar, &notifier).await.unwrap();
    notifier.take_subjects();

    calendar.set("la@example.com", vec![]);
    run(&config, &calendar, &notifier).await.unwrap();
    assert_eq!(
        notifier.take_subjects(),
        vec!["Hockey Calendar Reader - Event cancelled"]
    );
}

#[tokio::test]
async fn test_first_run_notifications_can_be_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "skip_first_run_notifications = true");
    let calendar = Arc::new(MockCalendar::default());
    let notifier = Arc::new(RecordingNotifier::default());

    calendar.set("la@example.com", vec![event("1", "Hrdina", 2, 1)]);
    run(&config, &calendar, &notifier).await.unwrap();
    assert!(notifier.take_subjects().is_empty());

    calendar.set(
        "la@example.com",
        vec![event("1", "Hrdina", 2, 1), event("2", "Hrdina", 3, 5)],
    );
    run(&config, &calendar, &notifier).await.unwrap();
    assert_eq!(
        notifier.take_subjects(),
        vec!["Hockey Calendar Reader - New event"]
    );
}

#[tokio::test]
async fn test_fetch_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "");
    let calendar = Arc::new(MockCalendar::default());
    let notifier = Arc::new(RecordingNotifier::default());
    calendar.fail();

    assert!(run(&config, &calendar, &notifier).await.is_err());
    assert!(!dir.path().join("hrdina-la.txt").exists());
    assert!(notifier.take_subjects().is_empty());
}

#[tokio::test]
async fn test_corrupt_backup_fails_only_that_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "");
    let calendar = Arc::new(MockCalendar::default());
    let notifier = Arc::new(RecordingNotifier::default());

    calendar.set(
        "la@example.com",
        vec![event("1", "Hrdina", 2, 1), event("2", "Volné bruslení", 3, 1)],
    );
    fs::write(dir.path().join("hrdina-la.txt"), "not a snapshot\n").unwrap();

    let failures = run(&config, &calendar, &notifier).await.unwrap();

    assert_eq!(failures, 1);
    assert!(notifier.take_subjects().is_empty());
    // the other outputs are still produced
    assert!(dir.path().join("brusleni-la.html").exists());
    assert!(dir.path().join("available-la.html").exists());
}

#[tokio::test]
async fn test_page_failure_still_sends_changes() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "");
    let calendar = Arc::new(MockCalendar::default());
    let notifier = Arc::new(RecordingNotifier::default());

    calendar.set("la@example.com", vec![event("1", "Hrdina", 2, 1)]);
    run(&config, &calendar, &notifier).await.unwrap();
    notifier.take_subjects();

    // the page cannot be written while a directory sits at its path
    let page = dir.path().join("hrdina-la.html");
    fs::remove_file(&page).unwrap();
    fs::create_dir(&page).unwrap();

    calendar.set("la@example.com", vec![event("1", "Hrdina", 2, 5)]);
    assert_eq!(run(&config, &calendar, &notifier).await.unwrap(), 1);
    assert_eq!(
        notifier.take_subjects(),
        vec!["Hockey Calendar Reader - Event updated"]
    );

    fs::remove_dir(&page).unwrap();
    assert_eq!(run(&config, &calendar, &notifier).await.unwrap(), 0);
    assert!(notifier.take_subjects().is_empty());
    assert!(page.is_file());
}

#[tokio::test]
async fn test_unknown_component_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "");
    let calendar = Arc::new(MockCalendar::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let result = run_with(config, calendar, notifier, Some("weather")).await;
    assert!(result.is_err());
}
