use std::io;
use std::path::PathBuf;

use neutron_core::sync::RemoteError;
use neutron_core::GameId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] neutron_core::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Game {0} is not installed. Run `neutron library set --game {0} <ROM>` first.")]
    GameNotInstalled(GameId),
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Game title cannot be empty")]
    EmptyTitle,
    #[error("Token cannot be empty")]
    EmptyToken,
    #[error("Launch failed: {0}")]
    LaunchFailed(String),
}
