use crate::components::google_calendar::CalendarEvent;

/// Events whose name contains every keyword, ignoring case, in input order.
///
/// An empty keyword list selects everything.
pub fn filter_by_keywords(events: &[CalendarEvent], keywords: &[String]) -> Vec<CalendarEvent> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();

    events
        .iter()
        .filter(|event| matches_keywords(&event.name, &keywords))
        .cloned()
        .collect()
}

/// `keywords` must already be lower-cased
fn matches_keywords(name: &str, keywords: &[String]) -> bool {
    let name = name.to_lowercase();
    keywords.iter().all(|keyword| name.contains(keyword.as_str()))
}
