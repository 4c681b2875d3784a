pub mod digest;
pub mod entry;
pub mod report;
pub mod state;

pub use entry::FeedEntry;
pub use digest::Digest;
pub use report::{FeedError, FeedOutcome, RunReport};
pub use state::{FeedHistory, SeenIds, SeenState};
