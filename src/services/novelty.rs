use crate::domain::{FeedEntry, FeedHistory, SeenIds};

/// Result of diffing one fetch against a feed's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Entries not seen before, in feed order, each identifier at most once.
    pub new_entries: Vec<FeedEntry>,
    /// The seen set to store for the feed after this fetch.
    pub seen: SeenIds,
    /// True when the feed had no history and its entries were absorbed silently.
    pub bootstrap: bool,
}

/// Decide which fetched entries are new for a feed.
///
/// A feed with no history is bootstrapped: everything fetched becomes seen and
/// nothing is reported. Otherwise entries whose identifier is not yet seen are
/// reported in the order the feed listed them, and the seen set grows by every
/// fetched identifier. An empty fetch leaves an existing seen set untouched.
pub fn detect(history: FeedHistory<'_>, entries: &[FeedEntry]) -> Detection {
    match history {
        FeedHistory::Unknown => Detection {
            new_entries: Vec::new(),
            seen: entries.iter().map(|e| e.id.as_str()).collect(),
            bootstrap: true,
        },
        FeedHistory::Seen(prior) => {
            let mut seen = prior.clone();
            // insert() is false for known ids and for repeats within this fetch
            let new_entries = entries
                .iter()
                .filter(|e| seen.insert(&e.id))
                .cloned()
                .collect();

            Detection {
                new_entries,
                seen,
                bootstrap: false,
            }
        }
    }
}
