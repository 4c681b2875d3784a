use crate::domain::SeenState;
use crate::errors::WatcherResult;

#[cfg_attr(test, mockall::automock)]
pub trait StateStore {
    /// A store with nothing saved yet loads as an empty state.
    fn load(&self) -> WatcherResult<SeenState>;
    fn save(&self, state: &SeenState) -> WatcherResult<()>;
}
