use crate::components::changes::RemovalRule;
use crate::error::{config_error, env_error, AppResult};
use chrono::NaiveDate;
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the report catalogue
pub const DEFAULT_REPORTS_CONFIG: &str = "config/reports.toml";

/// Default directory the reports are published to
pub const DEFAULT_OUTPUT_DIR: &str = "/var/www/my_web/hockey_events";

/// Main configuration structure, loaded once per run
#[derive(Debug, Clone)]
pub struct Config {
    /// Google Calendar API key (public calendars only)
    pub google_api_key: String,
    /// Directory where snapshots and HTML pages are written
    pub output_dir: PathBuf,
    /// Timezone used for all-day events and for display
    pub timezone: Tz,
    /// Locale of the generated pages and emails
    pub locale: String,
    /// Optional file the log is appended to
    pub log_file: Option<PathBuf>,
    /// Outgoing mail settings
    pub mail: MailConfig,
    /// Calendars, reports and component switches
    pub catalog: ReportCatalog,
}

/// SMTP relay and recipients
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub recipients: Vec<String>,
}

/// Everything read from the TOML report catalogue
#[derive(Debug, Clone, Deserialize)]
pub struct ReportCatalog {
    /// How removed events are classified
    #[serde(default)]
    pub removal_rule: RemovalRule,
    /// Compute but do not send notifications when no backup exists yet
    #[serde(default)]
    pub skip_first_run_notifications: bool,
    /// Calendar sources keyed by a short venue code
    #[serde(default)]
    pub calendars: HashMap<String, CalendarSource>,
    /// Component switches merged over the defaults
    #[serde(default)]
    pub components: HashMap<String, bool>,
    /// Name clean-up applied when events are ingested
    #[serde(default)]
    pub renames: Vec<RenameRule>,
    #[serde(default)]
    pub reports: Vec<ReportDefinition>,
    #[serde(default)]
    pub availability: Vec<AvailabilityDefinition>,
    pub league_stats: Option<LeagueStatsDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarSource {
    /// Google calendar id, e.g. `xyz@group.calendar.google.com`
    pub id: String,
    /// Human readable venue name
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameRule {
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportDefinition {
    /// File stem of the `.txt` snapshot and the `.html` page
    pub slug: String,
    pub title: String,
    /// Key into `calendars`
    pub calendar: String,
    pub keywords: Vec<String>,
    /// Keep a backup and email the differences
    #[serde(default)]
    pub notify: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityDefinition {
    pub slug: String,
    pub title: String,
    pub calendar: String,
    #[serde(default = "default_free_keyword")]
    pub free_keyword: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueStatsDefinition {
    pub calendar: String,
    /// First day of the season, matches before it are not fetched
    pub since: NaiveDate,
    /// Only events containing all of these take part, e.g. `["LHL"]`
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Days off that move the late boundary to 23:00 on the evening before
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    /// Exact team name corrections
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// Any team whose name starts with the key is reported under the value
    #[serde(default)]
    pub prefix_aliases: HashMap<String, String>,
}

fn default_free_keyword() -> String {
    "volno".to_string()
}

impl ReportCatalog {
    /// Parse a catalogue from TOML text
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let catalog: ReportCatalog = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Every report, availability page and statistic must name a known calendar,
    /// and no two pages may share a file name
    fn validate(&self) -> AppResult<()> {
        let mut slugs = HashSet::new();
        let all_slugs = self
            .reports
            .iter()
            .map(|r| &r.slug)
            .chain(self.availability.iter().map(|a| &a.slug));
        for slug in all_slugs {
            if !slugs.insert(slug) {
                return Err(config_error(&format!("Report '{}' is defined twice", slug)));
            }
        }

        let referenced = self
            .reports
            .iter()
            .map(|r| (&r.slug, &r.calendar))
            .chain(self.availability.iter().map(|a| (&a.slug, &a.calendar)));

        for (slug, calendar) in referenced {
            if !self.calendars.contains_key(calendar) {
                return Err(config_error(&format!(
                    "Report '{}' refers to unknown calendar '{}'",
                    slug, calendar
                )));
            }
        }

        if let Some(stats) = &self.league_stats {
            if !self.calendars.contains_key(&stats.calendar) {
                return Err(config_error(&format!(
                    "League statistics refer to unknown calendar '{}'",
                    stats.calendar
                )));
            }
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from environment and the report catalogue
    pub fn load(catalog_path: Option<&Path>) -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let google_api_key = env::var("GOOGLE_API_KEY").map_err(|_| env_error("GOOGLE_API_KEY"))?;

        let timezone_name = env::var("TIMEZONE").unwrap_or_else(|_| String::from("Europe/Prague"));
        let timezone = timezone_name
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Unknown timezone '{}'", timezone_name)))?;

        let locale = env::var("LOCALE").unwrap_or_else(|_| String::from("cs"));
        let output_dir = env::var("OUTPUT_DIR").unwrap_or_else(|_| String::from(DEFAULT_OUTPUT_DIR));
        let log_file = env::var("LOG_FILE").ok().map(PathBuf::from);

        let mail = MailConfig::from_env()?;

        let catalog_path = match catalog_path {
            Some(path) => path.to_path_buf(),
            None => env::var("REPORTS_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_REPORTS_CONFIG)),
        };
        let content = fs::read_to_string(&catalog_path).map_err(|e| {
            config_error(&format!(
                "Failed to read report catalogue at {}: {}",
                catalog_path.display(),
                e
            ))
        })?;
        let catalog = ReportCatalog::from_toml(&content)?;

        Ok(Config {
            google_api_key,
            output_dir: PathBuf::from(output_dir),
            timezone,
            locale,
            log_file,
            mail,
            catalog,
        })
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        if let Some(enabled) = self.catalog.components.get(name) {
            return *enabled;
        }
        // League statistics need a season definition, everything else runs by default
        match name {
            "league_stats" => self.catalog.league_stats.is_some(),
            _ => true,
        }
    }

    /// Look up a calendar source by its venue code
    pub fn calendar(&self, code: &str) -> AppResult<&CalendarSource> {
        self.catalog
            .calendars
            .get(code)
            .ok_or_else(|| config_error(&format!("Unknown calendar '{}'", code)))
    }
}

fn parse_port(value: &str) -> AppResult<u16> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| config_error(&format!("Invalid SMTP_PORT '{}'", value)))
}

impl MailConfig {
    fn from_env() -> AppResult<Self> {
        let username = env::var("SMTP_USERNAME").map_err(|_| env_error("SMTP_USERNAME"))?;
        let password = env::var("SMTP_PASSWORD").map_err(|_| env_error("SMTP_PASSWORD"))?;
        let host = env::var("SMTP_HOST").unwrap_or_else(|_| String::from("smtp.gmail.com"));
        let port = match env::var("SMTP_PORT") {
            Ok(port) => parse_port(&port)?,
            Err(_) => 587,
        };
        let from = env::var("MAIL_FROM").unwrap_or_else(|_| username.clone());
        let recipients = env::var("MAIL_TO")
            .map_err(|_| env_error("MAIL_TO"))?
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();

        if recipients.is_empty() {
            return Err(config_error("MAIL_TO does not contain any recipient"));
        }

        Ok(MailConfig {
            host,
            port,
            username,
            password,
            from,
            recipients,
        })
    }
}
