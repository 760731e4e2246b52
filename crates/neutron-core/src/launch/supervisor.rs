//! Session registry and the launch pipeline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::{LaunchError, LaunchResult, SessionReport};
use crate::local_state::{save_path_for_rom, LocalStateStore};
use crate::models::{GameId, PlatformId};
use crate::sync::SyncEngine;

/// Pause between emulator exit and the save push, giving the emulator's
/// final write time to land on disk.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

enum SessionSlot {
    /// Pull in progress; the emulator has not been spawned yet.
    Starting,
    Running(JoinHandle<SessionReport>),
}

impl SessionSlot {
    fn is_active(&self) -> bool {
        match self {
            Self::Starting => true,
            Self::Running(handle) => !handle.is_finished(),
        }
    }
}

type SessionMap = Arc<Mutex<HashMap<GameId, SessionSlot>>>;

/// Launches emulators and owns their background follow-up tasks.
///
/// At most one session per game is active at a time; a second launch for a
/// game whose session has not finished is rejected.
#[derive(Clone)]
pub struct Supervisor {
    state: Arc<dyn LocalStateStore>,
    engine: SyncEngine,
    sessions: SessionMap,
    settle_delay: Duration,
}

struct Launchable {
    rom_path: PathBuf,
    emulator_path: PathBuf,
    save_path: PathBuf,
}

impl Supervisor {
    pub fn new(state: Arc<dyn LocalStateStore>, engine: SyncEngine) -> Self {
        Self {
            state,
            engine,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    #[must_use]
    pub const fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Pull, spawn, and detach. Never fails; faults become an unsuccessful result.
    pub async fn launch(&self, game_id: GameId, platform_id: PlatformId) -> LaunchResult {
        match self.try_launch(game_id, platform_id).await {
            Ok(()) => LaunchResult::started(),
            Err(error) => {
                tracing::warn!(game_id = %game_id, platform_id = %platform_id, "Launch refused: {error}");
                error.into()
            }
        }
    }

    /// Whether a session for `game_id` is starting or its emulator is still running.
    pub fn is_running(&self, game_id: GameId) -> bool {
        self.sessions
            .lock()
            .get(&game_id)
            .is_some_and(SessionSlot::is_active)
    }

    /// Wait for the session of `game_id` to finish its follow-up work.
    ///
    /// Returns `None` when no session was launched for the game (or it was
    /// already collected).
    pub async fn wait(&self, game_id: GameId) -> Option<SessionReport> {
        let handle = {
            let mut sessions = self.sessions.lock();
            match sessions.remove(&game_id) {
                Some(SessionSlot::Running(handle)) => handle,
                Some(SessionSlot::Starting) => {
                    sessions.insert(game_id, SessionSlot::Starting);
                    return None;
                }
                None => return None,
            }
        };
        join_session(game_id, handle).await
    }

    /// Wait for every launched session, in game id order.
    pub async fn wait_all(&self) -> Vec<SessionReport> {
        let mut handles = {
            let mut sessions = self.sessions.lock();
            let running = sessions
                .iter()
                .filter(|(_, slot)| matches!(slot, SessionSlot::Running(_)))
                .map(|(game_id, _)| *game_id)
                .collect::<Vec<_>>();
            running
                .into_iter()
                .filter_map(|game_id| match sessions.remove(&game_id) {
                    Some(SessionSlot::Running(handle)) => Some((game_id, handle)),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        handles.sort_by_key(|(game_id, _)| *game_id);

        let mut reports = Vec::with_capacity(handles.len());
        for (game_id, handle) in handles {
            if let Some(report) = join_session(game_id, handle).await {
                reports.push(report);
            }
        }
        reports
    }

    async fn try_launch(&self, game_id: GameId, platform_id: PlatformId) -> Result<(), LaunchError> {
        let launchable = self.resolve(game_id, platform_id)?;
        let reservation = Reservation::acquire(&self.sessions, game_id)?;

        // Pull must finish before the emulator can touch the save file
        let pulled = self
            .engine
            .pull_if_newer(game_id, &launchable.save_path)
            .await;
        tracing::debug!(game_id = %game_id, outcome = ?pulled, "Pre-launch pull done");

        let child = spawn_emulator(&launchable.emulator_path, &launchable.rom_path)?;
        tracing::info!(
            game_id = %game_id,
            pid = child.id(),
            emulator = %launchable.emulator_path.display(),
            rom = %launchable.rom_path.display(),
            "Emulator started"
        );

        let handle = tokio::spawn(run_session(
            self.engine.clone(),
            game_id,
            launchable.save_path,
            child,
            Instant::now(),
            self.settle_delay,
        ));
        reservation.commit(handle);
        Ok(())
    }

    fn resolve(&self, game_id: GameId, platform_id: PlatformId) -> Result<Launchable, LaunchError> {
        let library = self.state.load_library()?;
        let rom_path = library
            .rom_path(game_id)
            .filter(|path| path.exists())
            .ok_or_else(|| LaunchError::AssetMissing {
                game_id,
                rom_path: library.rom_path(game_id),
            })?;

        let emulators = self.state.load_emulators()?;
        let emulator_path = emulators
            .emulator_path(platform_id)
            .filter(|path| path.exists())
            .ok_or_else(|| LaunchError::EmulatorNotConfigured {
                platform_id,
                emulator_path: emulators.emulator_path(platform_id),
            })?;

        let save_path = save_path_for_rom(&rom_path);
        Ok(Launchable {
            rom_path,
            emulator_path,
            save_path,
        })
    }
}

/// Holds a `Starting` slot; removes it again unless a session is committed.
struct Reservation {
    sessions: SessionMap,
    game_id: GameId,
    committed: bool,
}

impl Reservation {
    fn acquire(sessions: &SessionMap, game_id: GameId) -> Result<Self, LaunchError> {
        let mut map = sessions.lock();
        if map.get(&game_id).is_some_and(SessionSlot::is_active) {
            return Err(LaunchError::AlreadyRunning(game_id));
        }
        if map.insert(game_id, SessionSlot::Starting).is_some() {
            tracing::debug!(game_id = %game_id, "Dropping report of an uncollected finished session");
        }
        Ok(Self {
            sessions: Arc::clone(sessions),
            game_id,
            committed: false,
        })
    }

    fn commit(mut self, handle: JoinHandle<SessionReport>) {
        self.sessions
            .lock()
            .insert(self.game_id, SessionSlot::Running(handle));
        self.committed = true;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut map = self.sessions.lock();
        if matches!(map.get(&self.game_id), Some(SessionSlot::Starting)) {
            map.remove(&self.game_id);
        }
    }
}

fn spawn_emulator(emulator_path: &Path, rom_path: &Path) -> Result<Child, LaunchError> {
    Command::new(emulator_path)
        .arg(rom_path)
        .stdin(Stdio::null())
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            emulator_path: emulator_path.to_path_buf(),
            source,
        })
}

async fn run_session(
    engine: SyncEngine,
    game_id: GameId,
    save_path: PathBuf,
    mut child: Child,
    started: Instant,
    settle_delay: Duration,
) -> SessionReport {
    let exit_code = match child.wait().await {
        Ok(status) => status.code(),
        Err(error) => {
            tracing::warn!(game_id = %game_id, "Failed to wait for emulator: {error}");
            None
        }
    };
    let elapsed = started.elapsed();
    tracing::info!(
        game_id = %game_id,
        elapsed_secs = elapsed.as_secs(),
        exit_code,
        "Emulator exited"
    );

    if !settle_delay.is_zero() {
        tokio::time::sleep(settle_delay).await;
    }

    let push = engine.push_new_version(game_id, &save_path).await;
    let playtime = engine.report_playtime(game_id, elapsed).await;

    SessionReport {
        game_id,
        elapsed_secs: elapsed.as_secs(),
        exit_code,
        push,
        playtime,
    }
}

async fn join_session(game_id: GameId, handle: JoinHandle<SessionReport>) -> Option<SessionReport> {
    match handle.await {
        Ok(report) => Some(report),
        Err(error) => {
            tracing::error!(game_id = %game_id, "Session task failed: {error}");
            None
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;

    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::local_state::{AuthState, EmulatorConfig, LocalLibrary, MemoryStateStore};
    use crate::sync::fake::FakeRemote;
    use crate::sync::{PlaytimeOutcome, PushOutcome};

    const SHELL: &str = "/bin/sh";

    /// The "emulator" is `/bin/sh` and the "ROM" is a script it runs,
    /// so `$0` inside the script is the ROM path.
    struct Fixture {
        temp: TempDir,
        remote: Arc<FakeRemote>,
        supervisor: Supervisor,
    }

    impl Fixture {
        fn new(rom_script: Option<&str>, emulator: Option<&str>) -> Self {
            let temp = tempdir().unwrap();
            let rom_path = temp.path().join("mario.nes");
            if let Some(script) = rom_script {
                fs::write(&rom_path, script).unwrap();
            }

            let mut library = LocalLibrary::default();
            library.set(GameId::new(7), &rom_path);
            let mut emulators = EmulatorConfig::default();
            if let Some(emulator) = emulator {
                emulators.set(PlatformId::new(1), emulator);
            }

            let state = Arc::new(
                MemoryStateStore::new()
                    .with_library(library)
                    .with_emulators(emulators)
                    .with_auth(AuthState::with_token("tok")),
            );
            let remote = Arc::new(FakeRemote::new());
            let engine = SyncEngine::new(remote.clone(), state.clone());
            let supervisor = Supervisor::new(state, engine).with_settle_delay(Duration::ZERO);

            Self {
                temp,
                remote,
                supervisor,
            }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.temp.path().join(name)
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn launch_pulls_before_spawning_and_pushes_after_exit() {
        let fixture = Fixture::new(
            Some("cat \"${0%.*}.sav\" > \"$(dirname \"$0\")/seen.txt\"\nprintf played > \"${0%.*}.sav\"\n"),
            Some(SHELL),
        );
        fixture.remote.seed(
            GameId::new(7),
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            b"from-server",
        );

        let result = fixture
            .supervisor
            .launch(GameId::new(7), PlatformId::new(1))
            .await;
        assert_eq!(result, LaunchResult::started());

        let report = fixture.supervisor.wait(GameId::new(7)).await.unwrap();
        assert_eq!(fs::read(fixture.path("seen.txt")).unwrap(), b"from-server");
        assert_eq!(report.exit_code, Some(0));
        assert!(matches!(report.push, PushOutcome::Uploaded { bytes: 6, .. }));
        assert_eq!(
            fixture.remote.uploaded_bytes(GameId::new(7)).last(),
            Some(&b"played".to_vec())
        );
        assert_eq!(fixture.remote.downloads(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn short_session_pushes_but_skips_playtime() {
        let fixture = Fixture::new(Some("printf data > \"${0%.*}.sav\"\n"), Some(SHELL));

        let result = fixture
            .supervisor
            .launch(GameId::new(7), PlatformId::new(1))
            .await;
        assert!(result.success);

        let report = fixture.supervisor.wait(GameId::new(7)).await.unwrap();
        assert!(matches!(report.push, PushOutcome::Uploaded { .. }));
        assert!(matches!(
            report.playtime,
            PlaytimeOutcome::BelowThreshold { .. }
        ));
        assert_eq!(fixture.remote.playtime_calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn session_without_save_file_uploads_nothing() {
        let fixture = Fixture::new(Some("exit 3\n"), Some(SHELL));

        fixture
            .supervisor
            .launch(GameId::new(7), PlatformId::new(1))
            .await;
        let report = fixture.supervisor.wait(GameId::new(7)).await.unwrap();

        assert_eq!(report.exit_code, Some(3));
        assert_eq!(report.push, PushOutcome::NoLocalSave);
        assert_eq!(fixture.remote.uploads(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_rom_fails_without_network_or_spawn() {
        let fixture = Fixture::new(None, Some(SHELL));

        let result = fixture
            .supervisor
            .launch(GameId::new(7), PlatformId::new(1))
            .await;

        assert!(!result.success);
        assert!(result.message.starts_with("ROM not found for game 7"));
        assert_eq!(fixture.remote.info_calls(), 0);
        assert!(!fixture.supervisor.is_running(GameId::new(7)));
        assert_eq!(fixture.supervisor.wait(GameId::new(7)).await, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unconfigured_or_missing_emulator_fails() {
        let fixture = Fixture::new(Some("exit 0\n"), None);
        let result = fixture
            .supervisor
            .launch(GameId::new(7), PlatformId::new(1))
            .await;
        assert!(!result.success);
        assert_eq!(result.message, "Emulator not configured for platform 1");

        let fixture = Fixture::new(Some("exit 0\n"), Some("/nonexistent/emulator"));
        let result = fixture
            .supervisor
            .launch(GameId::new(7), PlatformId::new(1))
            .await;
        assert!(!result.success);
        assert!(result.message.contains("/nonexistent/emulator"));
        assert_eq!(fixture.remote.info_calls(), 0);
    }

    #[test]
    fn directory_rom_and_bundle_emulator_resolve() {
        let temp = tempdir().unwrap();
        let rom_dir = temp.path().join("doom.wad");
        let emulator_bundle = temp.path().join("Emu.app");
        fs::create_dir(&rom_dir).unwrap();
        fs::create_dir(&emulator_bundle).unwrap();

        let mut library = LocalLibrary::default();
        library.set(GameId::new(9), &rom_dir);
        let mut emulators = EmulatorConfig::default();
        emulators.set(PlatformId::new(3), &emulator_bundle);
        let state = Arc::new(
            MemoryStateStore::new()
                .with_library(library)
                .with_emulators(emulators),
        );
        let engine = SyncEngine::new(Arc::new(FakeRemote::new()), state.clone());
        let supervisor = Supervisor::new(state, engine);

        let launchable = supervisor
            .resolve(GameId::new(9), PlatformId::new(3))
            .unwrap();
        assert_eq!(launchable.rom_path, rom_dir);
        assert_eq!(launchable.emulator_path, emulator_bundle);
        assert_eq!(launchable.save_path, temp.path().join("doom.sav"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_launch_of_running_game_is_rejected() {
        let fixture = Fixture::new(Some("sleep 1\n"), Some(SHELL));

        let first = fixture
            .supervisor
            .launch(GameId::new(7), PlatformId::new(1))
            .await;
        assert!(first.success);
        assert!(fixture.supervisor.is_running(GameId::new(7)));

        let second = fixture
            .supervisor
            .launch(GameId::new(7), PlatformId::new(1))
            .await;
        assert!(!second.success);
        assert_eq!(second.message, "Game 7 is already running");

        let reports = fixture.supervisor.wait_all().await;
        assert_eq!(reports.len(), 1);
        assert!(!fixture.supervisor.is_running(GameId::new(7)));

        let third = fixture
            .supervisor
            .launch(GameId::new(7), PlatformId::new(1))
            .await;
        assert!(third.success);
        fixture.supervisor.wait(GameId::new(7)).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_server_does_not_block_launch() {
        let temp = tempdir().unwrap();
        let rom_path = temp.path().join("zelda.sfc");
        fs::write(&rom_path, "printf x > \"${0%.*}.sav\"\n").unwrap();

        let mut library = LocalLibrary::default();
        library.set(GameId::new(2), &rom_path);
        let mut emulators = EmulatorConfig::default();
        emulators.set(PlatformId::new(4), SHELL);
        let state = Arc::new(
            MemoryStateStore::new()
                .with_library(library)
                .with_emulators(emulators),
        );
        let remote = Arc::new(FakeRemote::offline());
        let engine = SyncEngine::new(remote.clone(), state.clone());
        let supervisor = Supervisor::new(state, engine).with_settle_delay(Duration::ZERO);

        let result = supervisor.launch(GameId::new(2), PlatformId::new(4)).await;
        assert!(result.success);

        let report = supervisor.wait(GameId::new(2)).await.unwrap();
        assert!(matches!(report.push, PushOutcome::Skipped { .. }));
        assert!(temp.path().join("zelda.sav").exists());
        assert_eq!(remote.info_calls(), 1);
    }
}
