pub mod traits;
pub mod json_file;

pub use traits::StateStore;
pub use json_file::JsonStateStore;
