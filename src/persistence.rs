//! Snapshot persistence. The panel hands whole `GameState` snapshots to a
//! store; loading never fails the caller, a bad snapshot just means a fresh
//! ship.

use crate::config::PanelConfig;
use crate::error::PersistenceError;
use crate::state::GameState;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub trait StateStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<GameState>, PersistenceError>;

    fn save(&self, state: &GameState) -> Result<(), PersistenceError>;

    fn clear(&self) -> Result<(), PersistenceError>;
}

/// Single JSON file. Writes go to a `.tmp` sibling first and are renamed
/// into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> Result<Option<GameState>, PersistenceError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state = serde_json::from_str(&raw)?;
        Ok(Some(state))
    }

    fn save(&self, state: &GameState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store holding the serialised snapshot. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with raw text, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            saved: Arc::new(Mutex::new(Some(raw.into()))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.saved.lock().map(|saved| saved.is_none()).unwrap_or(true)
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<GameState>, PersistenceError> {
        let saved = self.saved.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match saved.as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &GameState) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(state)?;
        let mut saved = self.saved.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *saved = Some(json);
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        let mut saved = self.saved.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *saved = None;
        Ok(())
    }
}

/// Stored snapshot merged over the initial state, or the initial state when
/// nothing usable is stored.
pub fn load_or_initial(store: &dyn StateStore, config: &PanelConfig, now: u64) -> GameState {
    match store.load() {
        Ok(Some(state)) => {
            info!(logs = state.logs.len(), "restored saved panel state");
            state
        }
        Ok(None) => GameState::initial(config, now),
        Err(e) => {
            warn!(error = %e, "saved panel state unreadable, starting fresh");
            GameState::initial(config, now)
        }
    }
}

/// Stamps `last_saved` and writes the snapshot. Failures are logged and
/// reported as `false`.
pub fn save_stamped(store: &dyn StateStore, state: &mut GameState, now: u64) -> bool {
    let previous = state.last_saved;
    state.last_saved = now;
    match store.save(state) {
        Ok(()) => true,
        Err(e) => {
            state.last_saved = previous;
            warn!(error = %e, "failed to save panel state");
            false
        }
    }
}
