use crate::domain::FeedEntry;
use crate::errors::WatcherResult;

#[cfg_attr(test, mockall::automock)]
pub trait FeedReader {
    /// Fetch and parse a feed into its entries, in feed order.
    fn fetch(&self, url: &str) -> WatcherResult<Vec<FeedEntry>>;
}
