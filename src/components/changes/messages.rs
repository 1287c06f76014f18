use super::diff::Notification;
use crate::components::google_calendar::CalendarEvent;
use crate::components::reports::render::DisplayContext;
use crate::error::AppResult;
use askama::Template;
use rust_i18n::t;

/// Subject and HTML body of one notification email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub html_body: String,
}

#[derive(Template)]
#[template(path = "notification.html")]
struct NotificationTemplate<'a> {
    heading: &'a str,
    report: &'a str,
    sections: Vec<Vec<(String, String)>>,
}

/// Build the email for one notification of the report titled `report`
pub fn compose(notification: &Notification, report: &str, ctx: &DisplayContext) -> AppResult<EmailMessage> {
    let locale = ctx.locale.as_str();

    let (subject_key, heading_key, sections) = match notification {
        Notification::Added(event) => {
            let mut lines = event_lines(event, ctx, "label_name", "label_from", "label_to");
            lines.push((
                t!("label_created", locale = locale).to_string(),
                ctx.format(&event.created),
            ));
            ("subject_added", "heading_added", vec![lines])
        }
        Notification::Started(event) => (
            "subject_started",
            "heading_started",
            vec![event_lines(event, ctx, "label_name", "label_from", "label_to")],
        ),
        Notification::Cancelled(event) => (
            "subject_cancelled",
            "heading_cancelled",
            vec![event_lines(event, ctx, "label_name", "label_from", "label_to")],
        ),
        Notification::Updated { old, new } => (
            "subject_updated",
            "heading_updated",
            vec![
                event_lines(new, ctx, "label_new_name", "label_new_from", "label_new_to"),
                event_lines(old, ctx, "label_old_name", "label_old_from", "label_old_to"),
            ],
        ),
    };

    let subject = format!(
        "{} - {}",
        t!("subject_prefix", locale = locale),
        t!(subject_key, locale = locale)
    );
    let heading = t!(heading_key, locale = locale);

    let html_body = NotificationTemplate {
        heading: &heading,
        report,
        sections,
    }
    .render()?;

    Ok(EmailMessage { subject, html_body })
}

fn event_lines(
    event: &CalendarEvent,
    ctx: &DisplayContext,
    name_key: &str,
    from_key: &str,
    to_key: &str,
) -> Vec<(String, String)> {
    let locale = ctx.locale.as_str();
    vec![
        (t!(name_key, locale = locale).to_string(), event.name.clone()),
        (t!(from_key, locale = locale).to_string(), ctx.format(&event.start_time)),
        (t!(to_key, locale = locale).to_string(), ctx.format(&event.end_time)),
    ]
}
