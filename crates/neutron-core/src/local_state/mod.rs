//! Client-resident persistence for install paths, emulator configuration and
//! auth state.
//!
//! Each map is loaded whole and saved whole; callers never hold a map open
//! across a play session. Sessions work from the values captured at launch.

mod json_store;
mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{GameId, PlatformId};
use crate::util::normalize_text_option;

pub use json_store::JsonStateStore;
pub use memory::MemoryStateStore;

/// Extension given to save files next to their ROM.
pub const SAVE_EXTENSION: &str = "sav";

/// Explicit load/save interface over the local state files.
pub trait LocalStateStore: Send + Sync {
    fn load_library(&self) -> Result<LocalLibrary>;
    fn save_library(&self, library: &LocalLibrary) -> Result<()>;
    fn load_emulators(&self) -> Result<EmulatorConfig>;
    fn save_emulators(&self, config: &EmulatorConfig) -> Result<()>;
    fn load_auth(&self) -> Result<AuthState>;
    fn save_auth(&self, auth: &AuthState) -> Result<()>;
}

/// Installed games: game id → absolute ROM path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalLibrary {
    entries: BTreeMap<String, String>,
}

impl LocalLibrary {
    pub fn rom_path(&self, game_id: GameId) -> Option<PathBuf> {
        normalize_text_option(self.entries.get(&game_id.as_key()).cloned()).map(PathBuf::from)
    }

    pub fn set(&mut self, game_id: GameId, rom_path: impl Into<PathBuf>) {
        let rom_path: PathBuf = rom_path.into();
        self.entries
            .insert(game_id.as_key(), rom_path.to_string_lossy().into_owned());
    }

    pub fn remove(&mut self, game_id: GameId) -> Option<PathBuf> {
        self.entries.remove(&game_id.as_key()).map(PathBuf::from)
    }

    /// Entries in key order; keys that are not numeric ids are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (GameId, PathBuf)> + '_ {
        self.entries.iter().filter_map(|(key, path)| {
            key.parse::<GameId>()
                .ok()
                .map(|game_id| (game_id, PathBuf::from(path)))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Emulator executables per platform plus the global fullscreen preference.
///
/// Stored as one flat JSON object: `{"fullscreen": true, "1": "/bin/snes9x"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmulatorConfig {
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(flatten)]
    emulators: BTreeMap<String, String>,
}

impl EmulatorConfig {
    pub fn emulator_path(&self, platform_id: PlatformId) -> Option<PathBuf> {
        normalize_text_option(self.emulators.get(&platform_id.as_key()).cloned())
            .map(PathBuf::from)
    }

    pub fn set(&mut self, platform_id: PlatformId, emulator_path: impl Into<PathBuf>) {
        let emulator_path: PathBuf = emulator_path.into();
        self.emulators.insert(
            platform_id.as_key(),
            emulator_path.to_string_lossy().trim().to_string(),
        );
    }

    pub fn remove(&mut self, platform_id: PlatformId) -> Option<PathBuf> {
        self.emulators
            .remove(&platform_id.as_key())
            .map(PathBuf::from)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlatformId, PathBuf)> + '_ {
        self.emulators.iter().filter_map(|(key, path)| {
            key.parse::<PlatformId>()
                .ok()
                .map(|platform_id| (platform_id, PathBuf::from(path)))
        })
    }
}

/// Persisted bearer credential. Token issuance happens elsewhere.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    #[serde(default)]
    pub access_token: Option<String>,
}

impl AuthState {
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            access_token: normalize_text_option(Some(token.into())),
        }
    }

    /// The bearer token, if one is stored and non-blank.
    pub fn bearer_token(&self) -> Option<String> {
        normalize_text_option(self.access_token.clone())
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthState")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Save file co-located with the ROM: same stem, `.sav` extension.
pub fn save_path_for_rom(rom_path: &Path) -> PathBuf {
    rom_path.with_extension(SAVE_EXTENSION)
}

/// Strip characters that are not allowed in file names on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn save_path_replaces_rom_extension() {
        assert_eq!(
            save_path_for_rom(Path::new("/games/mario.nes")),
            PathBuf::from("/games/mario.sav")
        );
        assert_eq!(
            save_path_for_rom(Path::new("/games/zelda")),
            PathBuf::from("/games/zelda.sav")
        );
    }

    #[test]
    fn sanitize_filename_strips_reserved_characters() {
        assert_eq!(sanitize_filename("Zelda: A Link <to> the Past?"), "Zelda A Link to the Past");
        assert_eq!(sanitize_filename("a/b\\c|d*e\"f"), "abcdef");
    }

    #[test]
    fn emulator_config_uses_flat_json_layout() {
        let raw = r#"{"fullscreen": true, "1": "/bin/snes9x", "2": "  "}"#;
        let config: EmulatorConfig = serde_json::from_str(raw).unwrap();

        assert!(config.fullscreen);
        assert_eq!(
            config.emulator_path(PlatformId::new(1)),
            Some(PathBuf::from("/bin/snes9x"))
        );
        assert_eq!(config.emulator_path(PlatformId::new(2)), None);
        assert_eq!(config.emulator_path(PlatformId::new(3)), None);

        let rendered = serde_json::to_value(&config).unwrap();
        assert_eq!(rendered["fullscreen"], serde_json::json!(true));
        assert_eq!(rendered["1"], serde_json::json!("/bin/snes9x"));
    }

    #[test]
    fn library_maps_string_keys_to_paths() {
        let raw = r#"{"7": "/games/mario.nes"}"#;
        let mut library: LocalLibrary = serde_json::from_str(raw).unwrap();
        assert_eq!(
            library.rom_path(GameId::new(7)),
            Some(PathBuf::from("/games/mario.nes"))
        );

        library.set(GameId::new(8), "/games/zelda.sfc");
        let ids = library.iter().map(|(id, _)| id.get()).collect::<Vec<_>>();
        assert_eq!(ids, vec![7, 8]);
        assert_eq!(
            library.remove(GameId::new(7)),
            Some(PathBuf::from("/games/mario.nes"))
        );
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn auth_state_debug_redacts_token() {
        let auth = AuthState::with_token("secret-token");
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("[REDACTED]"));
        assert_eq!(AuthState::with_token("  ").bearer_token(), None);
    }
}
