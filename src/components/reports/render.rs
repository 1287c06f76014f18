use super::snapshot::parse_records;
use crate::components::google_calendar::time::format_display;
use crate::config::Config;
use crate::error::AppResult;
use askama::Template;
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use rust_i18n::t;
use std::fs;
use std::path::Path;

/// Timezone and language every human readable string is produced in
#[derive(Debug, Clone)]
pub struct DisplayContext {
    pub timezone: Tz,
    pub locale: String,
}

impl DisplayContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timezone: config.timezone,
            locale: config.locale.clone(),
        }
    }

    pub fn format(&self, dt: &DateTime<FixedOffset>) -> String {
        format_display(dt, &self.timezone, &self.locale)
    }

    /// Generation time shown under the headline
    pub fn now_label(&self) -> String {
        let now = Utc::now().with_timezone(&self.timezone).fixed_offset();
        t!("page_updated", locale = self.locale.as_str(), time = self.format(&now)).to_string()
    }

    pub fn label(&self, key: &str) -> String {
        t!(key, locale = self.locale.as_str()).to_string()
    }
}

/// A titled table page; all report pages share this layout
#[derive(Template, Debug)]
#[template(path = "table.html")]
pub struct TablePage {
    pub headline: String,
    pub updated_label: String,
    pub empty_label: String,
    /// CSS width of the panel, e.g. `90%`
    pub width: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TablePage {
    pub fn new(headline: &str, ctx: &DisplayContext, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            headline: headline.to_string(),
            updated_label: ctx.now_label(),
            empty_label: ctx.label("page_empty"),
            width: "90%".to_string(),
            headers,
            rows,
        }
    }

    pub fn with_width(mut self, width: &str) -> Self {
        self.width = width.to_string();
        self
    }

    pub fn write_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render()?)?;
        Ok(())
    }
}

/// Render the HTML page of a report from its snapshot file
pub fn render_report_file(source: &Path, output: &Path, headline: &str, ctx: &DisplayContext) -> AppResult<()> {
    let content = fs::read_to_string(source)?;
    let records = parse_records(&content, source)?;

    let headers = vec![
        ctx.label("column_start"),
        String::new(),
        ctx.label("column_end"),
        ctx.label("column_name"),
        ctx.label("column_created"),
        ctx.label("column_updated"),
    ];
    let rows = records
        .into_iter()
        .map(|(_, record)| {
            vec![
                ctx.format(&record.start_time),
                "-".to_string(),
                ctx.format(&record.end_time),
                record.name,
                ctx.format(&record.created),
                ctx.format(&record.updated),
            ]
        })
        .collect();

    TablePage::new(headline, ctx, headers, rows).write_to(output)
}
