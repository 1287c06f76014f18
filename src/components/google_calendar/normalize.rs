use crate::config::RenameRule;

/// Clean an event title once at ingest.
///
/// Snapshot fields are separated by `;` and records by newlines, so neither
/// may survive in a name. Configured rename rules run afterwards in order.
pub fn normalize_name(raw: &str, renames: &[RenameRule]) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| match c {
            ';' => ',',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();

    for rule in renames {
        if !rule.pattern.is_empty() && name.contains(&rule.pattern) && !name.contains(&rule.replacement) {
            name = name.replace(&rule.pattern, &rule.replacement);
        }
    }

    name.split_whitespace().collect::<Vec<_>>().join(" ")
}
