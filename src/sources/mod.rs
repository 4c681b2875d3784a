pub mod traits;
pub mod rss_atom;

pub use traits::FeedReader;
pub use rss_atom::RssAtomReader;
