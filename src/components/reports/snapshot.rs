//! Delimited text snapshots of a filtered report.
//!
//! One event per line: `start;end;name;created;updated[;id]`, timestamps in
//! RFC 3339. Only snapshots that are compared between runs carry the id.

use crate::components::delimited;
use crate::components::google_calendar::time::parse_timestamp;
use crate::components::google_calendar::CalendarEvent;
use crate::error::{snapshot_error, AppResult, Error};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const BACKUP_EXTENSION: &str = "backup";

/// Whether the trailing id column is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// Compared between runs, ids included
    Tracked,
    /// Published for people only
    Display,
}

/// One parsed line; `id` is absent in display snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub name: String,
    pub created: DateTime<FixedOffset>,
    pub updated: DateTime<FixedOffset>,
    pub id: Option<String>,
}

/// Ordered events of one report at one run, unique by id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    events: Vec<CalendarEvent>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    /// Fails on a repeated id instead of dropping one of the copies
    pub fn new(events: Vec<CalendarEvent>) -> AppResult<Self> {
        let mut index = HashMap::with_capacity(events.len());
        for (position, event) in events.iter().enumerate() {
            if index.insert(event.id.clone(), position).is_some() {
                return Err(Error::DuplicateEventId(event.id.clone()));
            }
        }
        Ok(Self { events, index })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn get(&self, id: &str) -> Option<&CalendarEvent> {
        self.index.get(id).map(|&position| &self.events[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Parse a tracked snapshot, every line must carry an id
    pub fn parse(content: &str, path: &Path) -> AppResult<Self> {
        let mut events = Vec::new();
        for (line_no, record) in parse_records(content, path)? {
            let id = record
                .id
                .ok_or_else(|| snapshot_error(path, line_no, "missing id field"))?;
            events.push(CalendarEvent::new(
                id,
                record.name,
                record.start_time,
                record.end_time,
                record.created,
                record.updated,
            ));
        }
        Self::new(events)
    }
}

/// Serialize events in the given format, one line each
pub fn to_text(events: &[CalendarEvent], format: SnapshotFormat) -> AppResult<String> {
    let mut out = delimited::writer();
    for event in events {
        let mut fields = vec![
            stamp(&event.start_time),
            stamp(&event.end_time),
            event.name.clone(),
            stamp(&event.created),
            stamp(&event.updated),
        ];
        if format == SnapshotFormat::Tracked {
            fields.push(event.id.clone());
        }
        out.write_record(&fields)?;
    }
    delimited::finish(out)
}

// Sub-second digits are kept when the API sends them
fn stamp(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Fields of one line before the timestamps are checked
#[derive(Debug, Deserialize)]
struct RawRecord {
    start_time: String,
    end_time: String,
    name: String,
    created: String,
    updated: String,
    #[serde(default)]
    id: Option<String>,
}

/// Parse every non-empty line, paired with its 1-based line number
pub fn parse_records(content: &str, path: &Path) -> AppResult<Vec<(usize, SnapshotRecord)>> {
    let mut records = Vec::new();
    let mut reader = delimited::reader(content);

    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map_or(0, |p| p.line() as usize);
            snapshot_error(path, line, e.to_string())
        })?;
        let line_no = record.position().map_or(0, |p| p.line() as usize);
        if record.len() <= 1 && record.get(0).map_or(true, |f| f.trim().is_empty()) {
            continue;
        }

        if record.len() != 5 && record.len() != 6 {
            return Err(snapshot_error(
                path,
                line_no,
                format!("expected 5 or 6 fields, found {}", record.len()),
            ));
        }

        let raw: RawRecord = record
            .deserialize(None)
            .map_err(|e| snapshot_error(path, line_no, e.to_string()))?;

        let timestamp = |value: &str| {
            parse_timestamp(value).map_err(|e| snapshot_error(path, line_no, e.to_string()))
        };

        let id = match (record.len(), raw.id.as_deref().map(str::trim)) {
            (6, None) | (_, Some("")) => {
                return Err(snapshot_error(path, line_no, "empty id field"))
            }
            (_, id) => id.map(str::to_string),
        };

        records.push((
            line_no,
            SnapshotRecord {
                start_time: timestamp(&raw.start_time)?,
                end_time: timestamp(&raw.end_time)?,
                name: raw.name,
                created: timestamp(&raw.created)?,
                updated: timestamp(&raw.updated)?,
                id,
            },
        ));
    }

    Ok(records)
}

/// The `current` and `backup` slot of every report in one directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn current_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", slug))
    }

    pub fn backup_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.txt.{}", slug, BACKUP_EXTENSION))
    }

    /// Move the current snapshot into the backup slot.
    ///
    /// Returns `false` when there was nothing to move (first run).
    pub fn rotate(&self, slug: &str) -> AppResult<bool> {
        let current = self.current_path(slug);
        match fs::rename(&current, self.backup_path(slug)) {
            Ok(()) => {
                debug!("Rotated {} into backup", current.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the current snapshot; written to a temporary file first
    pub fn write(&self, slug: &str, content: &str) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.current_path(slug);
        let tmp = self.dir.join(format!(".{}.txt.tmp", slug));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(path)
    }

    pub fn read_current(&self, slug: &str) -> AppResult<Option<String>> {
        read_optional(&self.current_path(slug))
    }

    pub fn read_backup(&self, slug: &str) -> AppResult<Option<String>> {
        read_optional(&self.backup_path(slug))
    }
}

fn read_optional(path: &Path) -> AppResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
