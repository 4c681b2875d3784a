use std::time::Duration;

use chrono::Utc;
use feed_rs::model::{Link, Text};
use feed_rs::parser;
use reqwest::blocking::Client;
use tracing::debug;
use url::Url;

use crate::domain::FeedEntry;
use crate::errors::{WatcherError, WatcherResult};
use crate::sources::traits::FeedReader;

const USER_AGENT: &str = concat!("feedwatch/", env!("CARGO_PKG_VERSION"));

pub struct RssAtomReader {
    client: Client,
    max_items: Option<usize>,
}

impl RssAtomReader {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            max_items: None,
        }
    }

    /// Only consider the first `max_items` entries of each feed.
    pub fn with_max_items(mut self, max_items: Option<usize>) -> Self {
        self.max_items = max_items;
        self
    }

    fn fetch_bytes(&self, url: &str) -> WatcherResult<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|e| WatcherError::InvalidUrl(format!("{}: {}", url, e)))?;

        if parsed.scheme() == "file" {
            let path = parsed
                .to_file_path()
                .map_err(|_| WatcherError::InvalidUrl(url.to_string()))?;
            return std::fs::read(&path)
                .map_err(|e| WatcherError::FeedUnavailable(format!("{}: {}", path.display(), e)));
        }

        let response = self.client.get(parsed).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }

    fn entries_from_bytes(&self, bytes: &[u8]) -> WatcherResult<Vec<FeedEntry>> {
        let parsed = parser::Builder::new()
            .id_generator(missing_id)
            .build()
            .parse(bytes)
            .map_err(|e| WatcherError::FeedParse(e.to_string()))?;

        let limit = self.max_items.unwrap_or(usize::MAX);
        let entries = parsed
            .entries
            .into_iter()
            .take(limit)
            .map(|entry| {
                let title = entry.title.map(|t| t.content);
                let link = entry.links.into_iter().next().map(|l| l.href);
                let published = entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.with_timezone(&Utc));

                FeedEntry::from_parts(Some(entry.id.as_str()), title, link, published)
            })
            .collect();

        Ok(entries)
    }
}

/// Identifier for entries that carry no id or guid of their own.
fn missing_id(links: &[Link], title: &Option<Text>, _base_uri: Option<&str>) -> String {
    FeedEntry::from_parts(
        None,
        title.as_ref().map(|t| t.content.clone()),
        links.first().map(|l| l.href.clone()),
        None,
    )
    .id
}

impl Default for RssAtomReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedReader for RssAtomReader {
    fn fetch(&self, url: &str) -> WatcherResult<Vec<FeedEntry>> {
        let bytes = self.fetch_bytes(url)?;
        let entries = self.entries_from_bytes(&bytes)?;
        debug!(feed = url, entries = entries.len(), "parsed feed");
        Ok(entries)
    }
}
