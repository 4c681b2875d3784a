use crate::errors::{ErrorKind, WatcherError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&WatcherError> for FeedError {
    fn from(err: &WatcherError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// What happened to one configured feed during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOutcome {
    pub feed_url: String,
    pub fetched_count: usize,
    pub new_count: usize,
    pub notified: bool,
    pub bootstrapped: bool,
    pub error: Option<FeedError>,
}

impl FeedOutcome {
    pub fn new(feed_url: &str) -> Self {
        Self {
            feed_url: feed_url.to_string(),
            fetched_count: 0,
            new_count: 0,
            notified: false,
            bootstrapped: false,
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<FeedOutcome>,
}

impl RunReport {
    pub fn total_new(&self) -> usize {
        self.outcomes.iter().map(|o| o.new_count).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FeedOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn outcome(&self, feed_url: &str) -> Option<&FeedOutcome> {
        self.outcomes.iter().find(|o| o.feed_url == feed_url)
    }
}
