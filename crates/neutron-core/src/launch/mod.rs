//! Emulator session supervision.
//!
//! One launch request runs: resolve paths, pull the save, spawn the emulator,
//! then hand the child to a background task that pushes the save and reports
//! playtime after the emulator exits.

mod supervisor;

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::models::{GameId, PlatformId};
use crate::sync::{PlaytimeOutcome, PushOutcome};

pub use supervisor::{Supervisor, DEFAULT_SETTLE_DELAY};

/// Launch faults. Only the first two are expected in normal use.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No install record, or the recorded path (file or directory) no longer exists.
    #[error("ROM not found for game {game_id}{}", describe_path(.rom_path.as_ref()))]
    AssetMissing {
        game_id: GameId,
        rom_path: Option<PathBuf>,
    },
    #[error("Emulator not configured for platform {platform_id}{}", describe_path(.emulator_path.as_ref()))]
    EmulatorNotConfigured {
        platform_id: PlatformId,
        emulator_path: Option<PathBuf>,
    },
    #[error("Game {0} is already running")]
    AlreadyRunning(GameId),
    #[error("Failed to start emulator {}: {source}", .emulator_path.display())]
    Spawn {
        emulator_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    State(#[from] crate::Error),
}

fn describe_path(path: Option<&PathBuf>) -> String {
    path.map(|path| format!(" ({})", path.display()))
        .unwrap_or_default()
}

/// Structured result handed back to the launch caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchResult {
    pub success: bool,
    pub message: String,
}

impl LaunchResult {
    pub fn started() -> Self {
        Self {
            success: true,
            message: "Game launched; save sync active".to_string(),
        }
    }
}

impl From<LaunchError> for LaunchResult {
    fn from(error: LaunchError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
        }
    }
}

/// What happened after the emulator exited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub game_id: GameId,
    pub elapsed_secs: u64,
    /// Exit code, `None` when the process was killed by a signal or the wait failed
    pub exit_code: Option<i32>,
    pub push: PushOutcome,
    pub playtime: PlaytimeOutcome,
}
