//! Free ice time per venue: events marked as free and gaps between bookings.

use super::delimited;
use super::google_calendar::time::format_duration;
use super::{CalendarEvent, Component, RunContext};
use crate::components::reports::render::TablePage;
use crate::config::{AvailabilityDefinition, Config};
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, SecondsFormat, Utc};
use std::fs;
use tracing::{error, info};

/// Shorter breaks between two bookings are not worth offering
pub const MIN_GAP: Duration = Duration::minutes(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// An event whose name marks the ice as free
    Free,
    /// Unbooked time between two adjacent events
    Gap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub kind: SlotKind,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Slot {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Scan a start-ordered event list for free ice.
///
/// Every event starting after `now` is checked for the free keyword, and
/// the break up to the next event is offered when it exceeds [`MIN_GAP`].
pub fn find_slots(events: &[CalendarEvent], free_keyword: &str, now: DateTime<Utc>) -> Vec<Slot> {
    let keyword = free_keyword.to_lowercase();
    let mut slots = Vec::new();

    for (position, current) in events.iter().enumerate() {
        if current.start_time <= now {
            continue;
        }

        if current.name.to_lowercase().contains(&keyword) {
            slots.push(Slot {
                kind: SlotKind::Free,
                start: current.start_time,
                end: current.end_time,
            });
        }

        let Some(next) = events.get(position + 1) else {
            continue;
        };
        if next.start_time - current.end_time > MIN_GAP {
            slots.push(Slot {
                kind: SlotKind::Gap,
                start: current.end_time,
                end: next.start_time,
            });
        }
    }

    slots
}

/// `start;end;duration` lines, RFC 3339 timestamps
pub fn slots_to_text(slots: &[Slot]) -> AppResult<String> {
    let mut out = delimited::writer();
    for slot in slots {
        out.write_record([
            slot.start.to_rfc3339_opts(SecondsFormat::Secs, false),
            slot.end.to_rfc3339_opts(SecondsFormat::Secs, false),
            format_duration(slot.duration()),
        ])?;
    }
    delimited::finish(out)
}

/// Publishes `<slug>.txt` and `<slug>.html` for every configured venue
#[derive(Debug, Default)]
pub struct Availability;

impl Availability {
    pub fn new() -> Self {
        Self
    }

    fn publish(&self, ctx: &RunContext, definition: &AvailabilityDefinition) -> AppResult<()> {
        let events = ctx.events(&definition.calendar)?;
        let slots = find_slots(events, &definition.free_keyword, ctx.started_at);

        let dir = &ctx.config.output_dir;
        fs::create_dir_all(dir)?;
        fs::write(dir.join(format!("{}.txt", definition.slug)), slots_to_text(&slots)?)?;

        let display = &ctx.display;
        let headers = vec![
            display.label("column_start"),
            String::new(),
            display.label("column_end"),
            display.label("column_duration"),
            display.label("column_kind"),
        ];
        let rows = slots
            .iter()
            .map(|slot| {
                let kind = match slot.kind {
                    SlotKind::Free => display.label("slot_free"),
                    SlotKind::Gap => display.label("slot_gap"),
                };
                vec![
                    display.format(&slot.start),
                    "-".to_string(),
                    display.format(&slot.end),
                    format_duration(slot.duration()),
                    kind,
                ]
            })
            .collect();

        TablePage::new(&definition.title, display, headers, rows)
            .write_to(&dir.join(format!("{}.html", definition.slug)))?;

        info!("{}: {} free slot(s)", definition.slug, slots.len());
        Ok(())
    }
}

#[async_trait]
impl Component for Availability {
    fn name(&self) -> &'static str {
        "availability"
    }

    fn calendars(&self, config: &Config) -> Vec<String> {
        config
            .catalog
            .availability
            .iter()
            .map(|a| a.calendar.clone())
            .collect()
    }

    async fn run(&self, ctx: &RunContext) -> AppResult<()> {
        let mut first_error = None;
        for definition in &ctx.config.catalog.availability {
            if let Err(e) = self.publish(ctx, definition) {
                error!("Availability page {} failed: {}", definition.slug, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
