//! Pull-before-play and push-after-play.
//!
//! The server clock is the only clock consulted for staleness: a local save
//! is stale when the server's latest `created_at` is strictly later than the
//! local file's modification time. After a download the local mtime is reset
//! to "now", so the push that follows the session cannot mistake a freshly
//! pulled file for older data, and the next pull sees local >= server.

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::remote::{LatestSave, RemoteError, SaveRemote};
use crate::local_state::LocalStateStore;
use crate::models::{is_reportable_session, GameId};

#[derive(Debug, Error)]
enum SyncError {
    #[error(transparent)]
    Network(#[from] RemoteError),
    #[error("Local save I/O failed: {0}")]
    LocalIo(#[from] io::Error),
}

/// What `pull_if_newer` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PullOutcome {
    /// The server has no save for this game.
    NoRemoteSave,
    /// The local file is at least as new as the server's latest version.
    UpToDate { version_id: i64 },
    Downloaded { version_id: i64, bytes: usize },
    /// A network or disk fault was logged and absorbed.
    Skipped { reason: String },
}

/// What `push_new_version` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PushOutcome {
    /// No save file exists; nothing to upload.
    NoLocalSave,
    Uploaded { save_id: i64, bytes: usize },
    Skipped { reason: String },
}

/// What `report_playtime` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlaytimeOutcome {
    BelowThreshold { seconds: u64 },
    NoCredential,
    Reported { seconds: u64, total_seconds: i64 },
    Skipped { reason: String },
}

/// Best-effort save synchronization for one client.
///
/// None of the public operations fail: every fault is logged at `warn` and
/// reported through the outcome instead.
#[derive(Clone)]
pub struct SyncEngine {
    remote: Arc<dyn SaveRemote>,
    state: Arc<dyn LocalStateStore>,
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn SaveRemote>, state: Arc<dyn LocalStateStore>) -> Self {
        Self { remote, state }
    }

    /// Bring the local save up to date with the server's latest version.
    pub async fn pull_if_newer(&self, game_id: GameId, save_path: &Path) -> PullOutcome {
        match self.try_pull(game_id, save_path).await {
            Ok(outcome) => {
                tracing::info!(game_id = %game_id, outcome = ?outcome, "Pull finished");
                outcome
            }
            Err(error) => {
                tracing::warn!(game_id = %game_id, "Skipping save pull: {error}");
                PullOutcome::Skipped {
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Upload the current local save as a new server version.
    pub async fn push_new_version(&self, game_id: GameId, save_path: &Path) -> PushOutcome {
        match self.try_push(game_id, save_path).await {
            Ok(outcome) => {
                tracing::info!(game_id = %game_id, outcome = ?outcome, "Push finished");
                outcome
            }
            Err(error) => {
                tracing::warn!(game_id = %game_id, "Skipping save push: {error}");
                PushOutcome::Skipped {
                    reason: error.to_string(),
                }
            }
        }
    }

    /// Report a finished session. Sessions under the minimum length are dropped.
    pub async fn report_playtime(&self, game_id: GameId, elapsed: Duration) -> PlaytimeOutcome {
        let seconds = elapsed.as_secs();
        if !is_reportable_session(seconds) {
            tracing::debug!(game_id = %game_id, seconds, "Session too short to report");
            return PlaytimeOutcome::BelowThreshold { seconds };
        }

        let Some(token) = self.bearer_token() else {
            tracing::info!(game_id = %game_id, seconds, "No credential stored; playtime not reported");
            return PlaytimeOutcome::NoCredential;
        };

        match self.remote.add_playtime(game_id, seconds, &token).await {
            Ok(total) => {
                tracing::info!(
                    game_id = %game_id,
                    seconds,
                    total_seconds = total.seconds,
                    "Playtime reported"
                );
                PlaytimeOutcome::Reported {
                    seconds,
                    total_seconds: total.seconds,
                }
            }
            Err(error) => {
                tracing::warn!(game_id = %game_id, seconds, "Skipping playtime report: {error}");
                PlaytimeOutcome::Skipped {
                    reason: error.to_string(),
                }
            }
        }
    }

    async fn try_pull(&self, game_id: GameId, save_path: &Path) -> Result<PullOutcome, SyncError> {
        let token = self.bearer_token();
        let info = match self.remote.latest_info(game_id, token.as_deref()).await? {
            LatestSave::NotFound => return Ok(PullOutcome::NoRemoteSave),
            LatestSave::Found(info) => info,
        };

        if let Some(local_modified) = local_modified_at(save_path).await? {
            if info.created_at <= local_modified {
                tracing::debug!(
                    game_id = %game_id,
                    server = %info.created_at,
                    local = %local_modified,
                    "Local save is current"
                );
                return Ok(PullOutcome::UpToDate {
                    version_id: info.id,
                });
            }
        }

        let Some(bytes) = self
            .remote
            .latest_content(game_id, token.as_deref())
            .await?
        else {
            return Ok(PullOutcome::NoRemoteSave);
        };

        write_pulled_save(save_path, &bytes).await?;
        Ok(PullOutcome::Downloaded {
            version_id: info.id,
            bytes: bytes.len(),
        })
    }

    async fn try_push(&self, game_id: GameId, save_path: &Path) -> Result<PushOutcome, SyncError> {
        let bytes = match tokio::fs::read(save_path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Ok(PushOutcome::NoLocalSave);
            }
            Err(error) => return Err(error.into()),
        };

        let size = bytes.len();
        let token = self.bearer_token();
        let receipt = self
            .remote
            .upload_save(game_id, bytes, token.as_deref())
            .await?;
        Ok(PushOutcome::Uploaded {
            save_id: receipt.save_id,
            bytes: size,
        })
    }

    fn bearer_token(&self) -> Option<String> {
        match self.state.load_auth() {
            Ok(auth) => auth.bearer_token(),
            Err(error) => {
                tracing::warn!("Failed to load auth state: {error}");
                None
            }
        }
    }
}

async fn local_modified_at(path: &Path) -> io::Result<Option<DateTime<Utc>>> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok(Some(DateTime::<Utc>::from(metadata.modified()?))),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error),
    }
}

/// Replace the local save with downloaded bytes and stamp it with "now".
async fn write_pulled_save(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let partial = partial_path(path);
    if let Err(error) = replace_with_partial(&partial, path, bytes).await {
        if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
            if cleanup.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %partial.display(), "Failed to remove partial save: {cleanup}");
            }
        }
        return Err(error);
    }

    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)?
            .set_modified(SystemTime::now())
    })
    .await
    .map_err(io::Error::other)?
}

async fn replace_with_partial(partial: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    tokio::fs::write(partial, bytes).await?;
    tokio::fs::rename(partial, path).await
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
