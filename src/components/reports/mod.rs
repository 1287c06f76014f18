pub mod filter;
pub mod render;
pub mod snapshot;

use self::filter::filter_by_keywords;
use self::render::render_report_file;
use self::snapshot::{to_text, Snapshot, SnapshotFormat, SnapshotStore};
use super::changes::{compose, diff_snapshot_files};
use super::notifier::send_all;
use super::{Component, RunContext};
use crate::config::{Config, ReportDefinition};
use crate::error::AppResult;
use async_trait::async_trait;
use tracing::{debug, error, info};

/// Keyword reports: snapshot, HTML page and, for tracked ones, change emails
#[derive(Debug, Default)]
pub struct Reports;

impl Reports {
    pub fn new() -> Self {
        Self
    }

    async fn publish(
        &self,
        ctx: &RunContext,
        store: &SnapshotStore,
        report: &ReportDefinition,
    ) -> AppResult<()> {
        let matched = filter_by_keywords(ctx.events(&report.calendar)?, &report.keywords);
        let html_path = store.dir().join(format!("{}.html", report.slug));

        if !report.notify {
            let path = store.write(&report.slug, &to_text(&matched, SnapshotFormat::Display)?)?;
            render_report_file(&path, &html_path, &report.title, &ctx.display)?;
            info!("{}: {} event(s)", report.slug, matched.len());
            return Ok(());
        }

        // Reject duplicate ids before the previous snapshot is rotated away
        let snapshot = Snapshot::new(matched)?;
        let text = to_text(snapshot.events(), SnapshotFormat::Tracked)?;

        let had_previous = store.rotate(&report.slug)?;
        let current = store.write(&report.slug, &text)?;

        // Once rotated, this run is the only chance to report the changes
        let notified = self.notify(ctx, store, report, had_previous, &text).await;
        render_report_file(&current, &html_path, &report.title, &ctx.display)?;
        notified
    }

    async fn notify(
        &self,
        ctx: &RunContext,
        store: &SnapshotStore,
        report: &ReportDefinition,
        had_previous: bool,
        text: &str,
    ) -> AppResult<()> {
        let previous = if had_previous {
            store.read_backup(&report.slug)?
        } else {
            None
        };
        let notifications = diff_snapshot_files(
            previous.as_deref(),
            text,
            &store.backup_path(&report.slug),
            &store.current_path(&report.slug),
            ctx.local_now(),
            ctx.config.catalog.removal_rule,
        )?;

        info!("{}: {} change(s)", report.slug, notifications.len());
        for notification in &notifications {
            debug!("{} {} {}", report.slug, notification.kind(), notification.event_id());
        }

        if notifications.is_empty() {
            return Ok(());
        }
        if !had_previous && ctx.config.catalog.skip_first_run_notifications {
            info!("{}: first run, not sending notifications", report.slug);
            return Ok(());
        }

        let messages = notifications
            .iter()
            .map(|n| compose(n, &report.title, &ctx.display))
            .collect::<AppResult<Vec<_>>>()?;
        let sent = send_all(ctx.notifier.as_ref(), &messages).await;
        info!("{}: sent {}/{} notification(s)", report.slug, sent, messages.len());

        Ok(())
    }
}

#[async_trait]
impl Component for Reports {
    fn name(&self) -> &'static str {
        "reports"
    }

    fn calendars(&self, config: &Config) -> Vec<String> {
        config
            .catalog
            .reports
            .iter()
            .map(|r| r.calendar.clone())
            .collect()
    }

    /// Every report is attempted; the first failure is returned afterwards
    async fn run(&self, ctx: &RunContext) -> AppResult<()> {
        let store = SnapshotStore::new(&ctx.config.output_dir);
        let mut first_error = None;

        for report in &ctx.config.catalog.reports {
            if let Err(e) = self.publish(ctx, &store, report).await {
                error!("Report {} failed: {}", report.slug, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
