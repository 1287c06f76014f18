use crate::config::Config;
use crate::error::{component_error, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

// Export components
pub mod availability;
pub mod changes;
pub mod delimited;
pub mod google_calendar;
pub mod league_stats;
pub mod notifier;
pub mod reports;

pub use availability::Availability;
pub use google_calendar::{CalendarEvent, EventSource};
pub use league_stats::LeagueStats;
pub use notifier::Notifier;
pub use reports::Reports;

use reports::render::DisplayContext;

/// Everything one run works with, fetched and decided before any component starts
pub struct RunContext {
    pub config: Arc<Config>,
    /// Upcoming events per calendar code
    pub events: HashMap<String, Vec<CalendarEvent>>,
    /// Used by components that need a different time window
    pub source: Arc<dyn EventSource>,
    pub notifier: Arc<dyn Notifier>,
    pub display: DisplayContext,
    /// Instant the run started; every "now" comparison uses it
    pub started_at: DateTime<Utc>,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("calendars", &self.events.keys().collect::<Vec<_>>())
            .field("display", &self.display)
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl RunContext {
    /// Prefetched events of a calendar
    pub fn events(&self, calendar: &str) -> AppResult<&[CalendarEvent]> {
        self.events
            .get(calendar)
            .map(Vec::as_slice)
            .ok_or_else(|| component_error(&format!("Calendar '{}' was not fetched", calendar)))
    }

    /// Run start in the configured timezone
    pub fn local_now(&self) -> DateTime<Tz> {
        self.started_at.with_timezone(&self.config.timezone)
    }
}

/// Component trait that all components must implement
#[async_trait]
pub trait Component: Send + Sync {
    /// Get the name of the component
    fn name(&self) -> &'static str;

    /// Calendar codes this component reads from the prefetched events
    fn calendars(&self, config: &Config) -> Vec<String>;

    /// Produce the component's output for one run
    async fn run(&self, ctx: &RunContext) -> AppResult<()>;
}

/// Manager for all components
#[derive(Default)]
pub struct ComponentManager {
    components: Vec<Box<dyn Component>>,
}

impl fmt::Debug for ComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentManager")
            .field("components", &self.names())
            .finish()
    }
}

impl ComponentManager {
    /// Create a new component manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component
    pub fn register<T: Component + 'static>(&mut self, component: T) {
        info!("Registering component: {}", component.name());
        self.components.push(Box::new(component));
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Components that take part in this run
    pub fn selected<'a>(
        &'a self,
        config: &'a Config,
        only: Option<&'a str>,
    ) -> impl Iterator<Item = &'a dyn Component> + 'a {
        self.components
            .iter()
            .map(|c| c.as_ref())
            .filter(move |c| config.is_component_enabled(c.name()))
            .filter(move |c| only.map_or(true, |name| name == c.name()))
    }

    /// Calendar codes needed by the selected components, sorted and unique
    pub fn required_calendars(&self, config: &Config, only: Option<&str>) -> Vec<String> {
        let mut codes: Vec<String> = self
            .selected(config, only)
            .flat_map(|c| c.calendars(config))
            .collect();
        codes.sort();
        codes.dedup();
        codes
    }

    /// Run the selected components one after another.
    ///
    /// A failing component is logged and the rest still run; the number of
    /// failures is returned.
    pub async fn run_all(&self, ctx: &RunContext, only: Option<&str>) -> usize {
        let mut failures = 0;

        for component in self.selected(&ctx.config, only) {
            info!("Running component: {}", component.name());

            if let Err(e) = component.run(ctx).await {
                // Log error but continue with other components
                error!("Error running component {}: {:?}", component.name(), e);
                failures += 1;
            }
        }

        failures
    }
}
