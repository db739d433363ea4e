//! Where the device record lives between operations.
//!
//! `JsonFileStore` persists to a pretty-printed JSON file, replacing it
//! atomically on every save. `MemoryStore` keeps the record in process for
//! tests and throwaway simulations.

use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

use super::state::DeviceState;

/// Failures reading or writing the device record.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("device state not initialized at {path}; run `fwlab reset` first")]
    NotInitialized { path: String },

    #[error("failed to access device state at {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("device state at {path} is not valid JSON")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("device state at {path} violates an invariant: {reason}")]
    Invalid { path: String, reason: String },

    #[error("failed to encode device state")]
    Encode(#[source] serde_json::Error),
}

/// Backing storage for a single device record.
pub trait StateStore: Send + Sync {
    /// Short description for logs (file path or "memory").
    fn location(&self) -> String;

    /// Whether a record has been written yet.
    fn exists(&self) -> bool;

    /// Read the current record.
    fn load(&self) -> Result<DeviceState, StateError>;

    /// Replace the record wholesale.
    fn save(&self, state: &DeviceState) -> Result<(), StateError>;
}

// ── JSON file ───────────────────────────────────────────────────

/// File-backed store. Writes go to a temp file in the same directory and are
/// renamed over the target, so readers never see a half-written record.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.location(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn load(&self) -> Result<DeviceState, StateError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StateError::NotInitialized {
                    path: self.location(),
                })
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let state: DeviceState =
            serde_json::from_str(&raw).map_err(|source| StateError::Corrupt {
                path: self.location(),
                source,
            })?;
        state.validate().map_err(|reason| StateError::Invalid {
            path: self.location(),
            reason,
        })?;

        tracing::debug!(path = %self.path.display(), "Loaded device state");
        Ok(state)
    }

    fn save(&self, state: &DeviceState) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(state).map_err(StateError::Encode)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let write = |tmp: &mut tempfile::NamedTempFile| -> std::io::Result<()> {
            tmp.write_all(json.as_bytes())?;
            tmp.write_all(b"\n")?;
            tmp.as_file().sync_all()
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        write(&mut tmp).map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        tracing::debug!(path = %self.path.display(), "Saved device state");
        Ok(())
    }
}

// ── In-memory ───────────────────────────────────────────────────

/// In-process store. Starts empty, like a device that was never provisioned.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<DeviceState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn exists(&self) -> bool {
        self.state.lock().is_some()
    }

    fn load(&self) -> Result<DeviceState, StateError> {
        self.state
            .lock()
            .clone()
            .ok_or_else(|| StateError::NotInitialized {
                path: self.location(),
            })
    }

    fn save(&self, state: &DeviceState) -> Result<(), StateError> {
        *self.state.lock() = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_missing_file_is_not_initialized() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("device_state.json"));
        assert!(!store.exists());
        assert!(matches!(
            store.load().unwrap_err(),
            StateError::NotInitialized { .. }
        ));
    }

    #[test]
    fn file_store_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("nested").join("device_state.json"));

        let state = DeviceState::factory_default();
        store.save(&state).unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), state);
    }

    #[test]
    fn file_store_writes_readable_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("device_state.json");
        JsonFileStore::new(&path)
            .save(&DeviceState::factory_default())
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"firmware_version\": \"1.0.0-vulnerable\""));
        assert!(raw.contains("\"settings\": {"));
        assert!(raw.ends_with("}\n"));
    }

    #[test]
    fn file_store_save_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("device_state.json"));
        store.save(&DeviceState::factory_default()).unwrap();
        store.save(&DeviceState::factory_default()).unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn file_store_corrupt_json_is_reported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("device_state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StateError::Corrupt { .. }));
    }

    #[test]
    fn file_store_invariant_violation_is_reported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("device_state.json");
        let mut state = DeviceState::factory_default();
        state.firmware_version.clear();
        std::fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();

        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StateError::Invalid { .. }));
        assert!(err.to_string().contains("firmware_version"));
    }

    #[test]
    fn not_initialized_message_points_at_reset() {
        let err = MemoryStore::new().load().unwrap_err();
        assert!(err.to_string().contains("fwlab reset"));
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(!store.exists());
        store.save(&DeviceState::factory_default()).unwrap();
        assert!(store.exists());
        assert_eq!(store.load().unwrap(), DeviceState::factory_default());
    }
}
