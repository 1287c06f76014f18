use hockey_calendar::components::changes::RemovalRule;
use hockey_calendar::config::ReportCatalog;
use hockey_calendar::startup::build_components;
use std::fs;
use std::path::Path;

fn shipped_catalog() -> ReportCatalog {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/reports.toml");
    let content = fs::read_to_string(path).unwrap();
    ReportCatalog::from_toml(&content).unwrap()
}

/// The catalogue in config/ must always load
#[test]
fn test_shipped_catalog_loads() {
    let catalog = shipped_catalog();

    assert_eq!(catalog.removal_rule, RemovalRule::FutureStartMeansStarted);
    assert_eq!(catalog.calendars.len(), 2);
    assert_eq!(catalog.reports.len(), 11);
    assert_eq!(catalog.reports.iter().filter(|r| r.notify).count(), 5);
    assert_eq!(catalog.availability.len(), 2);

    let stats = catalog.league_stats.unwrap();
    assert_eq!(stats.holidays.len(), 7);
    assert_eq!(stats.aliases["Trnávka"], "Udánky");
}

#[test]
fn test_report_slugs_are_unique() {
    let catalog = shipped_catalog();
    let mut slugs: Vec<&str> = catalog
        .reports
        .iter()
        .map(|r| r.slug.as_str())
        .chain(catalog.availability.iter().map(|a| a.slug.as_str()))
        .collect();
    let total = slugs.len();
    slugs.sort();
    slugs.dedup();
    assert_eq!(slugs.len(), total);
}

#[test]
fn test_components_are_registered_in_order() {
    assert_eq!(
        build_components().names(),
        vec!["reports", "availability", "league_stats"]
    );
}
