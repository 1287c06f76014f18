use crate::components::notifier::{LogNotifier, SmtpNotifier};
use crate::components::reports::render::DisplayContext;
use crate::components::{
    google_calendar::GoogleCalendarClient, Availability, ComponentManager, EventSource,
    LeagueStats, Notifier, Reports, RunContext,
};
use crate::config::Config;
use crate::error::{config_error, AppResult, Error};
use crate::lock::acquire_lock;
use chrono::Utc;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Command line switches that change how one run behaves
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Log notifications instead of emailing them
    pub dry_run: bool,
    /// Run a single component
    pub only: Option<String>,
}

/// Initialize logging with environment-based configuration
pub fn init_logging(log_file: Option<&Path>) -> miette::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(Error::from)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        None => {
            let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    result.map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;
    Ok(())
}

/// Load and initialize the application config
pub fn load_config(catalog_path: Option<&Path>) -> miette::Result<Config> {
    match Config::load(catalog_path) {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Every component of a run, in execution order
pub fn build_components() -> ComponentManager {
    let mut component_manager = ComponentManager::new();
    component_manager.register(Reports::new());
    component_manager.register(Availability::new());
    component_manager.register(LeagueStats::new());
    component_manager
}

/// Run against the Google Calendar API and the configured SMTP relay.
///
/// Returns the number of failed components.
pub async fn run(config: Config, options: &RunOptions) -> AppResult<usize> {
    let source: Arc<dyn EventSource> = Arc::new(GoogleCalendarClient::new(&config));
    let notifier: Arc<dyn Notifier> = if options.dry_run {
        info!("Dry run, notifications are only logged");
        Arc::new(LogNotifier)
    } else {
        Arc::new(SmtpNotifier::new(&config.mail)?)
    };

    run_with(Arc::new(config), source, notifier, options.only.as_deref()).await
}

/// One complete run: lock, fetch every needed calendar, then run the components.
///
/// A fetch failure aborts before anything is written.
pub async fn run_with(
    config: Arc<Config>,
    source: Arc<dyn EventSource>,
    notifier: Arc<dyn Notifier>,
    only: Option<&str>,
) -> AppResult<usize> {
    let component_manager = build_components();
    if let Some(name) = only {
        if !component_manager.names().iter().any(|n| *n == name) {
            return Err(config_error(&format!(
                "Unknown component '{}', expected one of {:?}",
                name,
                component_manager.names()
            )));
        }
    }

    let lock = acquire_lock(&config.output_dir)?;
    info!("Acquired {}", lock.path().display());

    let started_at = Utc::now();
    let mut events = HashMap::new();
    for code in component_manager.required_calendars(&config, only) {
        let calendar = config.calendar(&code)?;
        info!("Fetching {} ({})", calendar.title, code);
        let fetched = source.fetch_events(&calendar.id, started_at).await?;
        events.insert(code, fetched);
    }

    let ctx = RunContext {
        display: DisplayContext::from_config(&config),
        config,
        events,
        source,
        notifier,
        started_at,
    };

    let failures = component_manager.run_all(&ctx, only).await;
    if failures > 0 {
        error!("{} component(s) failed", failures);
    } else {
        info!("Run finished");
    }

    Ok(failures)
}
