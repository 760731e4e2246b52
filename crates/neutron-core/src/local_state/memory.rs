//! In-memory local state, used by tests and embedders that persist elsewhere.

use parking_lot::RwLock;

use super::{AuthState, EmulatorConfig, LocalLibrary, LocalStateStore};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    library: RwLock<LocalLibrary>,
    emulators: RwLock<EmulatorConfig>,
    auth: RwLock<AuthState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_library(self, library: LocalLibrary) -> Self {
        *self.library.write() = library;
        self
    }

    #[must_use]
    pub fn with_emulators(self, emulators: EmulatorConfig) -> Self {
        *self.emulators.write() = emulators;
        self
    }

    #[must_use]
    pub fn with_auth(self, auth: AuthState) -> Self {
        *self.auth.write() = auth;
        self
    }
}

impl LocalStateStore for MemoryStateStore {
    fn load_library(&self) -> Result<LocalLibrary> {
        Ok(self.library.read().clone())
    }

    fn save_library(&self, library: &LocalLibrary) -> Result<()> {
        *self.library.write() = library.clone();
        Ok(())
    }

    fn load_emulators(&self) -> Result<EmulatorConfig> {
        Ok(self.emulators.read().clone())
    }

    fn save_emulators(&self, config: &EmulatorConfig) -> Result<()> {
        *self.emulators.write() = config.clone();
        Ok(())
    }

    fn load_auth(&self) -> Result<AuthState> {
        Ok(self.auth.read().clone())
    }

    fn save_auth(&self, auth: &AuthState) -> Result<()> {
        *self.auth.write() = auth.clone();
        Ok(())
    }
}
