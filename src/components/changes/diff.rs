//! Change detection between the backup and the current snapshot of a report.

use crate::components::google_calendar::CalendarEvent;
use crate::components::reports::snapshot::Snapshot;
use crate::error::AppResult;
use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// How an event that disappeared from the calendar is classified,
/// chosen per catalogue with `removal_rule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalRule {
    /// Removed before its start time: it began. Otherwise it was cancelled.
    #[default]
    FutureStartMeansStarted,
    /// Removed after its start time: it began. Otherwise it was cancelled.
    PastStartMeansStarted,
}

/// Rule used when the report catalogue does not choose one
pub const DEFAULT_REMOVAL_RULE: RemovalRule = RemovalRule::FutureStartMeansStarted;

impl RemovalRule {
    /// Whether a removed event starting at `start` counts as started at `now`
    pub fn counts_as_started(self, start: NaiveDateTime, now: NaiveDateTime) -> bool {
        match self {
            RemovalRule::FutureStartMeansStarted => start > now,
            RemovalRule::PastStartMeansStarted => start < now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Added,
    EventStarted,
    EventCancelled,
    Updated,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Added => write!(f, "ADDED"),
            NotificationKind::EventStarted => write!(f, "EVENT_STARTED"),
            NotificationKind::EventCancelled => write!(f, "EVENT_CANCELLED"),
            NotificationKind::Updated => write!(f, "UPDATED"),
        }
    }
}

/// One discrepancy between two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Added(CalendarEvent),
    Started(CalendarEvent),
    Cancelled(CalendarEvent),
    Updated { old: CalendarEvent, new: CalendarEvent },
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Added(_) => NotificationKind::Added,
            Notification::Started(_) => NotificationKind::EventStarted,
            Notification::Cancelled(_) => NotificationKind::EventCancelled,
            Notification::Updated { .. } => NotificationKind::Updated,
        }
    }

    /// The id both snapshots agree on
    pub fn event_id(&self) -> &str {
        match self {
            Notification::Added(event)
            | Notification::Started(event)
            | Notification::Cancelled(event) => &event.id,
            Notification::Updated { new, .. } => &new.id,
        }
    }
}

/// Compare `old` against `new` by event id.
///
/// Emits additions in `new` order, then removals in `old` order, then
/// updates in `new` order. An event counts as updated when its `updated`
/// timestamp differs, other fields are not looked at. Start times of
/// removed events are compared as wall-clock time in the timezone of `now`.
pub fn diff_snapshots(
    old: &Snapshot,
    new: &Snapshot,
    now: DateTime<Tz>,
    rule: RemovalRule,
) -> Vec<Notification> {
    let mut notifications = Vec::new();
    let tz = now.timezone();
    let local_now = now.naive_local();

    for event in new.events() {
        if !old.contains(&event.id) {
            notifications.push(Notification::Added(event.clone()));
        }
    }

    for event in old.events() {
        if new.contains(&event.id) {
            continue;
        }
        let start = event.start_time.with_timezone(&tz).naive_local();
        if rule.counts_as_started(start, local_now) {
            notifications.push(Notification::Started(event.clone()));
        } else {
            notifications.push(Notification::Cancelled(event.clone()));
        }
    }

    for event in new.events() {
        if let Some(previous) = old.get(&event.id) {
            if previous.updated != event.updated {
                notifications.push(Notification::Updated {
                    old: previous.clone(),
                    new: event.clone(),
                });
            }
        }
    }

    notifications
}

/// Diff two raw snapshot files.
///
/// Identical content short-circuits without parsing. A missing backup
/// compares as an empty snapshot.
pub fn diff_snapshot_files(
    old_raw: Option<&str>,
    new_raw: &str,
    old_path: &Path,
    new_path: &Path,
    now: DateTime<Tz>,
    rule: RemovalRule,
) -> AppResult<Vec<Notification>> {
    if old_raw == Some(new_raw) {
        return Ok(Vec::new());
    }

    let old = match old_raw {
        Some(content) => Snapshot::parse(content, old_path)?,
        None => Snapshot::empty(),
    };
    let new = Snapshot::parse(new_raw, new_path)?;

    Ok(diff_snapshots(&old, &new, now, rule))
}
