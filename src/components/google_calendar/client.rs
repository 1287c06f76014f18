use super::models::{CalendarEvent, EventsResponse, GoogleEvent};
use super::normalize::normalize_name;
use super::time::{parse_event_time, parse_timestamp};
use super::EventSource;
use crate::config::{Config, RenameRule};
use crate::error::{google_calendar_error, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars";

/// Upper bound the API accepts for one page
const MAX_RESULTS: u32 = 2500;

/// Reads public calendars with a static API key
#[derive(Clone)]
pub struct GoogleCalendarClient {
    client: Client,
    api_key: String,
    timezone: Tz,
    renames: Vec<RenameRule>,
}

impl GoogleCalendarClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.google_api_key.clone(),
            timezone: config.timezone,
            renames: config.catalog.renames.clone(),
        }
    }

    fn events_url(&self, calendar_id: &str, time_min: DateTime<Utc>) -> AppResult<Url> {
        let mut url = Url::parse(EVENTS_URL)
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| google_calendar_error("Calendar API URL cannot be a base"))?
            .push(calendar_id)
            .push("events");

        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("singleEvents", "true")
            .append_pair("timeMin", &time_min.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("orderBy", "startTime")
            .append_pair("maxResults", &MAX_RESULTS.to_string());

        Ok(url)
    }
}

#[async_trait]
impl EventSource for GoogleCalendarClient {
    async fn fetch_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
    ) -> AppResult<Vec<CalendarEvent>> {
        let url = self.events_url(calendar_id, time_min)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to fetch events: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(google_calendar_error(&format!(
                "Failed to fetch events: HTTP {} - {}",
                status, error_body
            )));
        }

        let body: EventsResponse = response
            .json()
            .await
            .map_err(|e| google_calendar_error(&format!("Failed to parse events response: {}", e)))?;

        let received = body.items.len();
        let events = convert_events(body.items, &self.timezone, &self.renames)?;
        info!(
            "Fetched {} events from {} ({} dropped)",
            events.len(),
            calendar_id,
            received - events.len()
        );

        Ok(events)
    }
}

/// Drop cancelled and untitled items and build immutable events from the rest
pub fn convert_events(
    items: Vec<GoogleEvent>,
    tz: &Tz,
    renames: &[RenameRule],
) -> AppResult<Vec<CalendarEvent>> {
    let mut events = Vec::with_capacity(items.len());

    for item in items {
        if item.is_cancelled() {
            debug!("Skipping cancelled event {}", item.id);
            continue;
        }
        let Some(summary) = item.summary.as_deref() else {
            debug!("Skipping event {} without summary", item.id);
            continue;
        };

        let start = item
            .start
            .as_ref()
            .ok_or_else(|| google_calendar_error(&format!("Event {} has no start", item.id)))?;
        let end = item
            .end
            .as_ref()
            .ok_or_else(|| google_calendar_error(&format!("Event {} has no end", item.id)))?;
        let created = item
            .created
            .as_deref()
            .ok_or_else(|| google_calendar_error(&format!("Event {} has no created time", item.id)))?;
        let updated = item
            .updated
            .as_deref()
            .ok_or_else(|| google_calendar_error(&format!("Event {} has no updated time", item.id)))?;

        events.push(CalendarEvent::new(
            item.id.clone(),
            normalize_name(summary, renames),
            parse_event_time(start, tz)?,
            parse_event_time(end, tz)?,
            parse_timestamp(created)?,
            parse_timestamp(updated)?,
        ));
    }

    Ok(events)
}
