use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatcherError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Feed errors
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),

    #[error("Feed unavailable: {0}")]
    FeedUnavailable(String),

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Parsing errors
    #[error("Feed parsing failed: {0}")]
    FeedParse(String),

    // Notification errors
    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Email could not be built: {0}")]
    Email(#[from] lettre::error::Error),

    // State errors
    #[error("State file error: {0}")]
    State(String),

    #[error("State file is not valid JSON: {0}")]
    StateFormat(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The four failure categories a run distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Fetch,
    Delivery,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Fetch => "fetch",
            ErrorKind::Delivery => "delivery",
            ErrorKind::Persistence => "persistence",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl WatcherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WatcherError::Config(_) | WatcherError::MissingEnvVar(_) => ErrorKind::Config,
            WatcherError::InvalidUrl(_)
            | WatcherError::FeedUnavailable(_)
            | WatcherError::Http(_)
            | WatcherError::FeedParse(_) => ErrorKind::Fetch,
            WatcherError::Notification(_) | WatcherError::Smtp(_) | WatcherError::Email(_) => {
                ErrorKind::Delivery
            }
            WatcherError::State(_) | WatcherError::StateFormat(_) | WatcherError::Io(_) => {
                ErrorKind::Persistence
            }
        }
    }

    /// Process exit status for an error that reaches `main`.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::Config => 2,
            _ => 1,
        }
    }
}

pub type WatcherResult<T> = Result<T, WatcherError>;
