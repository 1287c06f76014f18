use miette::{Diagnostic, Result};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Environment error: {0}")]
    #[diagnostic(code(hockey_calendar::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(hockey_calendar::config))]
    Config(String),

    #[error("Google Calendar API error: {0}")]
    #[diagnostic(code(hockey_calendar::google_calendar))]
    GoogleCalendar(String),

    #[error("Malformed snapshot {path}:{line}: {reason}")]
    #[diagnostic(
        code(hockey_calendar::snapshot_parse),
        help("the previous run wrote a file this version cannot read; delete the .backup file to start a fresh history")
    )]
    SnapshotParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Event id '{0}' appears more than once in one snapshot")]
    #[diagnostic(code(hockey_calendar::duplicate_event_id))]
    DuplicateEventId(String),

    #[error("Render error: {0}")]
    #[diagnostic(code(hockey_calendar::render))]
    Render(String),

    #[error("Email error: {0}")]
    #[diagnostic(code(hockey_calendar::email))]
    Email(String),

    #[error("Another instance is already running (lock held on {0})")]
    #[diagnostic(code(hockey_calendar::lock))]
    Lock(PathBuf),

    #[error("Component error: {0}")]
    #[diagnostic(code(hockey_calendar::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(hockey_calendar::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(hockey_calendar::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(hockey_calendar::other))]
    Other(String),
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<askama::Error> for Error {
    fn from(err: askama::Error) -> Self {
        Error::Render(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create Google Calendar errors
pub fn google_calendar_error(message: &str) -> Error {
    Error::GoogleCalendar(message.to_string())
}

/// Helper to create email errors
pub fn email_error(message: &str) -> Error {
    Error::Email(message.to_string())
}

/// Helper to create snapshot parse errors
pub fn snapshot_error(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Error {
    Error::SnapshotParse {
        path: path.into(),
        line,
        reason: reason.into(),
    }
}
