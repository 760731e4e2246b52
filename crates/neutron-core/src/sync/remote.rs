//! Client view of the save server.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{GameId, SaveVersionInfo};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid save server configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Save server request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Save server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Invalid save server payload: {0}")]
    InvalidPayload(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Outcome of a latest-version lookup that reached the server.
///
/// Transport faults travel in the `Err` side of [`RemoteResult`], so callers
/// can tell "no save yet" apart from "server unreachable".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatestSave {
    Found(SaveVersionInfo),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    pub save_id: i64,
}

/// Server-computed playtime after a report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaytimeTotal {
    pub seconds: i64,
}

/// Save server operations used by the sync engine.
///
/// Every call is attempted exactly once; retries are not part of the contract.
#[async_trait]
pub trait SaveRemote: Send + Sync {
    async fn latest_info(&self, game_id: GameId, token: Option<&str>) -> RemoteResult<LatestSave>;

    /// Bytes of the latest version, `None` when the game has no save.
    async fn latest_content(
        &self,
        game_id: GameId,
        token: Option<&str>,
    ) -> RemoteResult<Option<Vec<u8>>>;

    async fn upload_save(
        &self,
        game_id: GameId,
        bytes: Vec<u8>,
        token: Option<&str>,
    ) -> RemoteResult<UploadReceipt>;

    async fn add_playtime(
        &self,
        game_id: GameId,
        seconds: u64,
        token: &str,
    ) -> RemoteResult<PlaytimeTotal>;
}
