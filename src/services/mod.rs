pub mod novelty;
pub mod watch_service;

pub use novelty::{detect, Detection};
pub use watch_service::{WatchOptions, WatchService};
