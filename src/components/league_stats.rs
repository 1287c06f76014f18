//! Per-team league match statistics: weekdays, start hours and late minutes.

use super::delimited;
use super::reports::filter::filter_by_keywords;
use super::reports::render::{DisplayContext, TablePage};
use super::{CalendarEvent, Component, RunContext};
use crate::config::{Config, LeagueStatsDefinition};
use crate::error::{config_error, AppResult};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use chrono_tz::Tz;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// `... <round> <home> \ <away> <division>.liga`
const MATCH_PATTERN: &str = r".*\d+(.*)\\(.*)\d\.liga";

const STATS_FILE: &str = "teams_dates.txt";
const DAYS_PAGE: &str = "teams_dates.html";
const HOURS_PAGE: &str = "teams_hours.html";
const LATE_PAGE: &str = "teams_late_minutes.html";

/// Late play starts at this hour before a work day
const WORKDAY_BOUNDARY_HOUR: u32 = 22;
/// And at this hour before a weekend or holiday
const FREE_DAY_BOUNDARY_HOUR: u32 = 23;

/// Start hour buckets `6-10`, `10-12`, `12-20`, `20-22`, `22-`
pub const HOUR_BANDS: [&str; 5] = ["6-10h", "10-12h", "12-20h", "20-22h", "22h-"];

pub fn hour_band(hour: u32) -> usize {
    match hour {
        0..=9 => 0,
        10..=11 => 1,
        12..=19 => 2,
        20..=21 => 3,
        _ => 4,
    }
}

/// Minutes of a match played after the late boundary.
///
/// The boundary is 22:00 on the day the match ends, or 23:00 when the
/// following day is a weekend or a holiday. A match starting after the
/// boundary counts from its own start.
pub fn late_minutes(start: NaiveDateTime, end: NaiveDateTime, holidays: &[NaiveDate]) -> i64 {
    let day = end.date();
    let next_day = day + Duration::days(1);
    let day_off = matches!(next_day.weekday(), Weekday::Sat | Weekday::Sun)
        || holidays.contains(&next_day);

    let hour = if day_off {
        FREE_DAY_BOUNDARY_HOUR
    } else {
        WORKDAY_BOUNDARY_HOUR
    };
    let mut boundary = day.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN));
    if start > boundary {
        boundary = day.and_time(start.time());
    }

    if boundary >= end {
        0
    } else {
        (end - boundary).num_minutes()
    }
}

/// Turns event names into canonical team pairs
#[derive(Debug)]
pub struct TeamResolver {
    pattern: Regex,
    aliases: HashMap<String, String>,
    /// Longest prefix first
    prefix_aliases: Vec<(String, String)>,
}

impl TeamResolver {
    pub fn new(definition: &LeagueStatsDefinition) -> AppResult<Self> {
        let pattern = Regex::new(MATCH_PATTERN)
            .map_err(|e| config_error(&format!("Invalid match pattern: {}", e)))?;

        let mut prefix_aliases: Vec<(String, String)> = definition
            .prefix_aliases
            .iter()
            .map(|(prefix, team)| (prefix.clone(), team.clone()))
            .collect();
        prefix_aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Ok(Self {
            pattern,
            aliases: definition.aliases.clone(),
            prefix_aliases,
        })
    }

    /// Home and away team of a league match, `None` for any other event
    pub fn teams(&self, name: &str) -> Option<(String, String)> {
        let captures = self.pattern.captures(name)?;
        let home = self.resolve(captures.get(1)?.as_str());
        let away = self.resolve(captures.get(2)?.as_str());
        Some((home, away))
    }

    pub fn resolve(&self, raw: &str) -> String {
        let name = raw.replace('!', "");
        let name = name.trim();

        if let Some(alias) = self.aliases.get(name) {
            return alias.clone();
        }
        self.prefix_aliases
            .iter()
            .find(|(prefix, _)| name.starts_with(prefix.as_str()))
            .map(|(_, team)| team.clone())
            .unwrap_or_else(|| name.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamStats {
    pub name: String,
    pub matches: u32,
    /// Monday first
    pub days: [u32; 7],
    pub hours: [u32; 5],
    pub late_minutes: i64,
}

impl TeamStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            matches: 0,
            days: [0; 7],
            hours: [0; 5],
            late_minutes: 0,
        }
    }

    fn record(&mut self, start: NaiveDateTime, late: i64) {
        self.matches += 1;
        self.days[start.weekday().num_days_from_monday() as usize] += 1;
        self.hours[hour_band(start.hour())] += 1;
        self.late_minutes += late;
    }

    /// `name, matches, mon..sun, bands, late`
    pub fn to_record(&self) -> Vec<String> {
        let mut fields = vec![self.name.clone(), self.matches.to_string()];
        fields.extend(self.days.iter().map(u32::to_string));
        fields.extend(self.hours.iter().map(u32::to_string));
        fields.push(self.late_minutes.to_string());
        fields
    }
}

/// One semicolon separated line per team
pub fn stats_to_text(teams: &[TeamStats]) -> AppResult<String> {
    let mut out = delimited::writer();
    for team in teams {
        out.write_record(team.to_record())?;
    }
    delimited::finish(out)
}

/// Aggregate every league match; teams are listed in order of first appearance
pub fn collect_stats(
    events: &[CalendarEvent],
    resolver: &TeamResolver,
    tz: &Tz,
    holidays: &[NaiveDate],
) -> Vec<TeamStats> {
    let mut teams: Vec<TeamStats> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for event in events {
        let Some((home, away)) = resolver.teams(&event.name) else {
            debug!("Not a league match: {}", event.name);
            continue;
        };

        let start = event.start_time.with_timezone(tz).naive_local();
        let end = event.end_time.with_timezone(tz).naive_local();
        let late = late_minutes(start, end, holidays);

        for team in [home, away] {
            let position = *index.entry(team.clone()).or_insert_with(|| {
                teams.push(TeamStats::new(&team));
                teams.len() - 1
            });
            teams[position].record(start, late);
        }
    }

    teams
}

/// Publishes the season statistics of one league calendar
#[derive(Debug, Default)]
pub struct LeagueStats;

impl LeagueStats {
    pub fn new() -> Self {
        Self
    }

    fn write_pages(&self, dir: &Path, teams: &[TeamStats], display: &DisplayContext) -> AppResult<()> {
        fs::write(dir.join(STATS_FILE), stats_to_text(teams)?)?;

        let mut day_headers = vec![display.label("column_team"), display.label("column_matches")];
        day_headers.extend(
            [
                "day_monday",
                "day_tuesday",
                "day_wednesday",
                "day_thursday",
                "day_friday",
                "day_saturday",
                "day_sunday",
            ]
            .iter()
            .map(|key| display.label(key)),
        );
        let day_rows = teams
            .iter()
            .map(|t| {
                let mut row = vec![t.name.clone(), t.matches.to_string()];
                row.extend(t.days.iter().map(u32::to_string));
                row
            })
            .collect();
        TablePage::new(&display.label("stats_days_title"), display, day_headers, day_rows)
            .write_to(&dir.join(DAYS_PAGE))?;

        let mut hour_headers = vec![display.label("column_team"), display.label("column_matches")];
        hour_headers.extend(HOUR_BANDS.iter().map(|band| band.to_string()));
        let hour_rows = teams
            .iter()
            .map(|t| {
                let mut row = vec![t.name.clone(), t.matches.to_string()];
                row.extend(t.hours.iter().map(u32::to_string));
                row
            })
            .collect();
        TablePage::new(&display.label("stats_hours_title"), display, hour_headers, hour_rows)
            .write_to(&dir.join(HOURS_PAGE))?;

        let mut by_late: Vec<&TeamStats> = teams.iter().collect();
        by_late.sort_by(|a, b| b.late_minutes.cmp(&a.late_minutes));
        let late_rows = by_late
            .iter()
            .map(|t| vec![t.name.clone(), t.late_minutes.to_string()])
            .collect();
        TablePage::new(
            &display.label("stats_late_title"),
            display,
            vec![display.label("column_team"), display.label("column_late_minutes")],
            late_rows,
        )
        .with_width("50%")
        .write_to(&dir.join(LATE_PAGE))?;

        Ok(())
    }
}

#[async_trait]
impl Component for LeagueStats {
    fn name(&self) -> &'static str {
        "league_stats"
    }

    // Fetches its own window starting at the season start
    fn calendars(&self, _config: &Config) -> Vec<String> {
        Vec::new()
    }

    async fn run(&self, ctx: &RunContext) -> AppResult<()> {
        let definition = ctx
            .config
            .catalog
            .league_stats
            .as_ref()
            .ok_or_else(|| config_error("League statistics are enabled but not configured"))?;
        let calendar = ctx.config.calendar(&definition.calendar)?;

        let since = definition
            .since
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| config_error("Invalid season start"))?
            .and_utc();
        let events = ctx.source.fetch_events(&calendar.id, since).await?;
        let events = filter_by_keywords(&events, &definition.keywords);

        let resolver = TeamResolver::new(definition)?;
        let teams = collect_stats(&events, &resolver, &ctx.config.timezone, &definition.holidays);

        fs::create_dir_all(&ctx.config.output_dir)?;
        self.write_pages(&ctx.config.output_dir, &teams, &ctx.display)?;

        info!("League statistics written for {} team(s)", teams.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn naive(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M").unwrap()
    }

    fn definition() -> LeagueStatsDefinition {
        LeagueStatsDefinition {
            calendar: "la".to_string(),
            since: NaiveDate::from_ymd_opt(2019, 9, 1).unwrap(),
            keywords: vec!["LHL".to_string()],
            holidays: vec![NaiveDate::from_ymd_opt(2019, 10, 28).unwrap()],
            aliases: HashMap::from([
                ("Trnávka".to_string(), "Udánky".to_string()),
                ("Sloni".to_string(), "Sloni D. Morava".to_string()),
            ]),
            prefix_aliases: HashMap::from([("LDM".to_string(), "LDM".to_string())]),
        }
    }

    fn event(id: &str, name: &str, start: &str, end: &str) -> CalendarEvent {
        let at = |v: &str| DateTime::parse_from_rfc3339(v).unwrap();
        CalendarEvent::new(id, name, at(start), at(end), at(start), at(start))
    }

    #[test]
    fn test_hour_bands() {
        assert_eq!(hour_band(6), 0);
        assert_eq!(hour_band(9), 0);
        assert_eq!(hour_band(10), 1);
        assert_eq!(hour_band(12), 2);
        assert_eq!(hour_band(20), 3);
        assert_eq!(hour_band(22), 4);
        assert_eq!(hour_band(23), 4);
    }

    #[test]
    fn test_late_minutes_before_work_day() {
        // Tuesday evening
        let minutes = late_minutes(naive("2019-10-01 21:15"), naive("2019-10-01 22:30"), &[]);
        assert_eq!(minutes, 30);
    }

    #[test]
    fn test_late_minutes_before_weekend() {
        // Friday evening, boundary moves to 23:00
        assert_eq!(late_minutes(naive("2019-10-04 21:15"), naive("2019-10-04 22:30"), &[]), 0);
        assert_eq!(late_minutes(naive("2019-10-04 22:00"), naive("2019-10-04 23:15"), &[]), 15);
    }

    #[test]
    fn test_late_minutes_before_holiday() {
        let holidays = [NaiveDate::from_ymd_opt(2019, 10, 28).unwrap()];
        // Sunday evening before a Monday holiday
        assert_eq!(
            late_minutes(naive("2019-10-27 21:45"), naive("2019-10-27 23:00"), &holidays),
            0
        );
        assert_eq!(
            late_minutes(naive("2019-10-27 21:45"), naive("2019-10-27 23:00"), &[]),
            60
        );
    }

    #[test]
    fn test_late_start_counts_from_start() {
        let minutes = late_minutes(naive("2019-10-01 22:20"), naive("2019-10-01 23:30"), &[]);
        assert_eq!(minutes, 70);
    }

    #[test]
    fn test_team_resolution() {
        let resolver = TeamResolver::new(&definition()).unwrap();

        assert_eq!(
            resolver.teams("LHL č. 12 Trnávka! \\ LDM Lanškroun B 2.liga"),
            Some(("Udánky".to_string(), "LDM".to_string()))
        );
        assert_eq!(
            resolver.teams("LHL č. 3 Bystřec \\ Sloni 1.liga"),
            Some(("Bystřec".to_string(), "Sloni D. Morava".to_string()))
        );
        assert_eq!(resolver.teams("Veřejné bruslení"), None);
    }

    #[test]
    fn test_collect_stats() {
        let resolver = TeamResolver::new(&definition()).unwrap();
        let events = vec![
            event(
                "1",
                "LHL č. 1 Bystřec \\ Sloni 1.liga",
                "2019-10-01T21:15:00+02:00",
                "2019-10-01T22:30:00+02:00",
            ),
            event("2", "Hrdina", "2019-10-02T18:00:00+02:00", "2019-10-02T19:00:00+02:00"),
            event(
                "3",
                "LHL č. 2 Trnávka \\ Bystřec 1.liga",
                "2019-10-05T10:30:00+02:00",
                "2019-10-05T11:45:00+02:00",
            ),
        ];

        let teams = collect_stats(&events, &resolver, &chrono_tz::Europe::Prague, &[]);

        let names: Vec<&str> = teams.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Bystřec", "Sloni D. Morava", "Udánky"]);

        let bystrec = &teams[0];
        assert_eq!(bystrec.matches, 2);
        assert_eq!(bystrec.days, [0, 1, 0, 0, 0, 1, 0]);
        assert_eq!(bystrec.hours, [0, 1, 0, 1, 0]);
        assert_eq!(bystrec.late_minutes, 30);
        assert_eq!(
            stats_to_text(&teams[..1]).unwrap(),
            "Bystřec;2;0;1;0;0;0;1;0;0;1;0;1;0;30\n"
        );
    }

    #[test]
    fn test_write_pages() {
        let dir = tempfile::tempdir().unwrap();
        let display = DisplayContext {
            timezone: chrono_tz::Europe::Prague,
            locale: "en".to_string(),
        };
        let mut early = TeamStats::new("Early birds");
        early.late_minutes = 5;
        let mut night = TeamStats::new("Night owls");
        night.late_minutes = 120;

        LeagueStats::new()
            .write_pages(dir.path(), &[early, night], &display)
            .unwrap();

        let late = fs::read_to_string(dir.path().join(LATE_PAGE)).unwrap();
        assert!(late.contains("width: 50%"));
        assert!(late.find("Night owls").unwrap() < late.find("Early birds").unwrap());

        let days = fs::read_to_string(dir.path().join(DAYS_PAGE)).unwrap();
        assert!(days.contains("<th>Monday</th>"));
        assert!(dir.path().join(STATS_FILE).exists());
        assert!(dir.path().join(HOURS_PAGE).exists());
    }
}
