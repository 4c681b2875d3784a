use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::SeenState;
use crate::errors::{WatcherError, WatcherResult};
use crate::storage::traits::StateStore;

/// Seen state kept in a single pretty-printed JSON document.
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state_error(&self, action: &str, err: impl std::fmt::Display) -> WatcherError {
        WatcherError::State(format!("cannot {} {}: {}", action, self.path.display(), err))
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> WatcherResult<SeenState> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file yet");
                return Ok(SeenState::new());
            }
            Err(e) => return Err(self.state_error("read", e)),
        };

        let state: SeenState = serde_json::from_str(&content)?;
        Ok(state)
    }

    fn save(&self, state: &SeenState) -> WatcherResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut json = serde_json::to_string_pretty(state)?;
        json.push('\n');

        // Write beside the target and rename over it so a crash never leaves a torn file
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.state_error("write", e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.state_error("write", e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.state_error("replace", e.error))?;

        debug!(path = %self.path.display(), feeds = state.len(), "saved state");
        Ok(())
    }
}
