use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// One calendar occurrence as the rest of the application sees it.
///
/// Built once at ingest with every field present and never mutated
/// afterwards; two events with the same `id` are the same occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub name: String,
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub created: DateTime<FixedOffset>,
    pub updated: DateTime<FixedOffset>,
}

impl CalendarEvent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        start_time: DateTime<FixedOffset>,
        end_time: DateTime<FixedOffset>,
        created: DateTime<FixedOffset>,
        updated: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            start_time,
            end_time,
            created,
            updated,
        }
    }
}

/// Body of `GET calendars/{id}/events`
#[derive(Debug, Deserialize)]
pub struct EventsResponse {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
}

/// Raw event item, only the fields we read
#[derive(Debug, Deserialize)]
pub struct GoogleEvent {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: Option<GoogleEventTime>,
    #[serde(default)]
    pub end: Option<GoogleEventTime>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

/// Either `dateTime` for timed events or `date` for all-day events
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEventTime {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl GoogleEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}
