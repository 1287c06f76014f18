mod client;
pub mod models;
pub mod normalize;
pub mod time;

pub use client::{convert_events, GoogleCalendarClient};
pub use models::CalendarEvent;

use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Anything that can list the events of one calendar
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Events starting at or after `time_min`, ordered by start time,
    /// with cancelled and untitled events already removed
    async fn fetch_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
    ) -> AppResult<Vec<CalendarEvent>>;
}
