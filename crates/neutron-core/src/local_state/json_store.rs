//! JSON-file backed local state.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{AuthState, EmulatorConfig, LocalLibrary, LocalStateStore};
use crate::error::{Error, Result};

const LIBRARY_FILE_NAME: &str = "local_library.json";
const EMULATORS_FILE_NAME: &str = "local_config.json";
const AUTH_FILE_NAME: &str = "auth.json";

/// Stores each map as a pretty-printed JSON file inside one data directory.
///
/// Missing files read as empty maps. Writes go to a sibling temp file and are
/// renamed into place so a crash never leaves a truncated file behind.
#[derive(Debug)]
pub struct JsonStateStore {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl JsonStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn library_path(&self) -> PathBuf {
        self.dir.join(LIBRARY_FILE_NAME)
    }

    pub fn emulators_path(&self) -> PathBuf {
        self.dir.join(EMULATORS_FILE_NAME)
    }

    pub fn auth_path(&self) -> PathBuf {
        self.dir.join(AUTH_FILE_NAME)
    }

    fn load<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T> {
        let _guard = self.lock.read();
        if !path.exists() {
            return Ok(T::default());
        }

        let raw = fs::read_to_string(path).map_err(|error| local_state_error(path, &error))?;
        if raw.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str::<T>(&raw).map_err(|error| local_state_error(path, &error))
    }

    fn save<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let _guard = self.lock.write();
        fs::create_dir_all(&self.dir).map_err(|error| local_state_error(&self.dir, &error))?;

        let serialized = serde_json::to_string_pretty(value)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized).map_err(|error| local_state_error(&tmp_path, &error))?;
        fs::rename(&tmp_path, path).map_err(|error| local_state_error(path, &error))
    }
}

fn local_state_error(path: &Path, error: &dyn std::fmt::Display) -> Error {
    Error::LocalState {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

impl LocalStateStore for JsonStateStore {
    fn load_library(&self) -> Result<LocalLibrary> {
        self.load(&self.library_path())
    }

    fn save_library(&self, library: &LocalLibrary) -> Result<()> {
        self.save(&self.library_path(), library)
    }

    fn load_emulators(&self) -> Result<EmulatorConfig> {
        self.load(&self.emulators_path())
    }

    fn save_emulators(&self, config: &EmulatorConfig) -> Result<()> {
        self.save(&self.emulators_path(), config)
    }

    fn load_auth(&self) -> Result<AuthState> {
        self.load(&self.auth_path())
    }

    fn save_auth(&self, auth: &AuthState) -> Result<()> {
        self.save(&self.auth_path(), auth)
    }
}
