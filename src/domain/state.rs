use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// Identifiers already processed for one feed, kept in the order they were
/// first recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SeenIds {
    order: Vec<String>,
    lookup: HashSet<String>,
}

impl SeenIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lookup.contains(id)
    }

    /// Returns false if the identifier was already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.lookup.contains(id) {
            return false;
        }
        self.lookup.insert(id.to_string());
        self.order.push(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Drop the oldest identifiers so that at most `max` remain.
    pub fn keep_newest(&mut self, max: usize) {
        if self.order.len() <= max {
            return;
        }
        let excess = self.order.len() - max;
        for id in self.order.drain(..excess) {
            self.lookup.remove(&id);
        }
    }
}

impl From<Vec<String>> for SeenIds {
    fn from(ids: Vec<String>) -> Self {
        let mut seen = SeenIds::new();
        for id in &ids {
            seen.insert(id);
        }
        seen
    }
}

impl From<SeenIds> for Vec<String> {
    fn from(seen: SeenIds) -> Self {
        seen.order
    }
}

impl<'a> FromIterator<&'a str> for SeenIds {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut seen = SeenIds::new();
        for id in iter {
            seen.insert(id);
        }
        seen
    }
}

/// What the store knows about a feed before it is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedHistory<'a> {
    /// No key for the feed: it has never been processed.
    Unknown,
    /// The feed has a key; the set may legitimately be empty.
    Seen(&'a SeenIds),
}

/// Persisted mapping from feed URL to its seen identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenState {
    feeds: BTreeMap<String, SeenIds>,
}

impl SeenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self, feed_url: &str) -> FeedHistory<'_> {
        match self.feeds.get(feed_url) {
            Some(seen) => FeedHistory::Seen(seen),
            None => FeedHistory::Unknown,
        }
    }

    pub fn get(&self, feed_url: &str) -> Option<&SeenIds> {
        self.feeds.get(feed_url)
    }

    pub fn record(&mut self, feed_url: &str, seen: SeenIds) {
        self.feeds.insert(feed_url.to_string(), seen);
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}
