use url::Url;

use super::FeedEntry;

/// The email sent for one feed's new entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub body: String,
}

impl Digest {
    pub fn for_new_entries(feed_url: &str, entries: &[FeedEntry]) -> Self {
        let host = feed_host(feed_url);

        let subject = match entries {
            [single] => format!("New entry detected ({}): {}", host, single.title),
            _ => format!("{} new entries detected ({})", entries.len(), host),
        };

        let mut lines = vec![format!("New entries found in {}:", feed_url), String::new()];
        for entry in entries {
            lines.push(format!("- {}", entry.title));
            if let Some(published) = entry.published {
                lines.push(format!("  Published: {}", published.to_rfc3339()));
            }
            lines.push(format!("  Link: {}", entry.link));
            lines.push(String::new());
        }

        let mut body = lines.join("\n").trim_end().to_string();
        body.push('\n');

        Self { subject, body }
    }
}

/// Host part of the feed URL, or the URL itself when it has none (e.g. `file://`).
fn feed_host(feed_url: &str) -> String {
    Url::parse(feed_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| feed_url.to_string())
}
