//! In-memory `SaveRemote` for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::remote::{
    LatestSave, PlaytimeTotal, RemoteError, RemoteResult, SaveRemote, UploadReceipt,
};
use crate::models::{GameId, SaveVersionInfo};

#[derive(Debug, Clone)]
struct StoredVersion {
    game_id: GameId,
    info: SaveVersionInfo,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct FakeState {
    versions: Vec<StoredVersion>,
    playtime: Vec<(GameId, i64)>,
    info_calls: usize,
    downloads: usize,
    uploads: usize,
    playtime_calls: usize,
    tokens: Vec<Option<String>>,
    offline: bool,
}

/// Records every call and serves versions from memory.
#[derive(Debug, Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a transport-level error.
    pub fn offline() -> Self {
        let remote = Self::default();
        remote.state.lock().offline = true;
        remote
    }

    pub fn seed(&self, game_id: GameId, created_at: DateTime<Utc>, bytes: &[u8]) -> i64 {
        let mut state = self.state.lock();
        let id = i64::try_from(state.versions.len()).unwrap_or(i64::MAX) + 1;
        state.versions.push(StoredVersion {
            game_id,
            info: SaveVersionInfo { id, created_at },
            bytes: bytes.to_vec(),
        });
        id
    }

    pub fn info_calls(&self) -> usize {
        self.state.lock().info_calls
    }

    pub fn downloads(&self) -> usize {
        self.state.lock().downloads
    }

    pub fn uploads(&self) -> usize {
        self.state.lock().uploads
    }

    pub fn playtime_calls(&self) -> usize {
        self.state.lock().playtime_calls
    }

    pub fn uploaded_bytes(&self, game_id: GameId) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .versions
            .iter()
            .filter(|version| version.game_id == game_id)
            .map(|version| version.bytes.clone())
            .collect()
    }

    pub fn playtime_total(&self, game_id: GameId) -> i64 {
        self.state
            .lock()
            .playtime
            .iter()
            .filter(|(id, _)| *id == game_id)
            .map(|(_, seconds)| seconds)
            .sum()
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.state.lock().tokens.clone()
    }

    fn latest(state: &FakeState, game_id: GameId) -> Option<StoredVersion> {
        state
            .versions
            .iter()
            .filter(|version| version.game_id == game_id)
            .max_by_key(|version| (version.info.created_at, version.info.id))
            .cloned()
    }

    fn check_online(state: &FakeState) -> RemoteResult<()> {
        if state.offline {
            return Err(RemoteError::Status {
                status: 503,
                message: "offline".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SaveRemote for FakeRemote {
    async fn latest_info(&self, game_id: GameId, token: Option<&str>) -> RemoteResult<LatestSave> {
        let mut state = self.state.lock();
        state.info_calls += 1;
        state.tokens.push(token.map(ToString::to_string));
        Self::check_online(&state)?;
        Ok(Self::latest(&state, game_id).map_or(LatestSave::NotFound, |version| {
            LatestSave::Found(version.info)
        }))
    }

    async fn latest_content(
        &self,
        game_id: GameId,
        token: Option<&str>,
    ) -> RemoteResult<Option<Vec<u8>>> {
        let mut state = self.state.lock();
        state.downloads += 1;
        state.tokens.push(token.map(ToString::to_string));
        Self::check_online(&state)?;
        Ok(Self::latest(&state, game_id).map(|version| version.bytes))
    }

    async fn upload_save(
        &self,
        game_id: GameId,
        bytes: Vec<u8>,
        token: Option<&str>,
    ) -> RemoteResult<UploadReceipt> {
        {
            let mut state = self.state.lock();
            state.uploads += 1;
            state.tokens.push(token.map(ToString::to_string));
            Self::check_online(&state)?;
        }
        let save_id = self.seed(game_id, Utc::now(), &bytes);
        Ok(UploadReceipt { save_id })
    }

    async fn add_playtime(
        &self,
        game_id: GameId,
        seconds: u64,
        token: &str,
    ) -> RemoteResult<PlaytimeTotal> {
        let mut state = self.state.lock();
        state.playtime_calls += 1;
        state.tokens.push(Some(token.to_string()));
        Self::check_online(&state)?;
        state
            .playtime
            .push((game_id, i64::try_from(seconds).unwrap_or(i64::MAX)));
        let seconds = state
            .playtime
            .iter()
            .filter(|(id, _)| *id == game_id)
            .map(|(_, seconds)| seconds)
            .sum();
        Ok(PlaytimeTotal { seconds })
    }
}
