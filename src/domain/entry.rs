use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

pub const UNTITLED: &str = "(no title)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
}

impl FeedEntry {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            link: String::new(),
            published: None,
        }
    }

    /// Build an entry whose identifier comes from the feed's own id/guid when it
    /// has one, or from a hash of link and title otherwise.
    pub fn from_parts(
        feed_id: Option<&str>,
        title: Option<String>,
        link: Option<String>,
        published: Option<DateTime<Utc>>,
    ) -> Self {
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());
        let link = link.map(|l| l.trim().to_string()).unwrap_or_default();

        let id = match feed_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => Self::fallback_id(&link, &title),
        };

        Self {
            id,
            title,
            link,
            published,
        }
    }

    pub fn fallback_id(link: &str, title: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(link.as_bytes());
        hasher.update(title.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    pub fn with_published(mut self, published: Option<DateTime<Utc>>) -> Self {
        self.published = published;
        self
    }
}
