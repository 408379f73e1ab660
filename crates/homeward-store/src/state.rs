//! Detector state persistence.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use homeward_core::DetectorState;

use crate::error::StoreError;

/// Load/save contract for [`DetectorState`].
///
/// `save_state` replaces the stored state wholesale; a failed save must leave
/// the previously stored state readable.
pub trait StateStore: Send + Sync {
    fn load_state(&self) -> Result<DetectorState, StoreError>;
    fn save_state(&self, state: &DetectorState) -> Result<(), StoreError>;
}

impl<T: StateStore + ?Sized> StateStore for &T {
    fn load_state(&self) -> Result<DetectorState, StoreError> {
        (**self).load_state()
    }

    fn save_state(&self, state: &DetectorState) -> Result<(), StoreError> {
        (**self).save_state(state)
    }
}

/// State kept as a flat JSON file.
///
/// A missing file reads as the default state. Writes go to a sibling
/// temporary file which is then renamed over the target.
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonStateStore {
    fn load_state(&self) -> Result<DetectorState, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no state at {}, starting fresh", self.path.display());
                return Ok(DetectorState::default());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        serde_json::from_str(&content).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn save_state(&self, state: &DetectorState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(state).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))
    }
}

/// In-process state store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<DetectorState>,
}

impl MemoryStateStore {
    pub fn new(state: DetectorState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn snapshot(&self) -> DetectorState {
        self.state
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl StateStore for MemoryStateStore {
    fn load_state(&self) -> Result<DetectorState, StoreError> {
        Ok(self.snapshot())
    }

    fn save_state(&self, state: &DetectorState) -> Result<(), StoreError> {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = state.clone();
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────
