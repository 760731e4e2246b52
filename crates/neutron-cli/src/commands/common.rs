use std::path::{Path, PathBuf};
use std::sync::Arc;

use neutron_core::config::{resolve_data_dir, ClientSettings};
use neutron_core::launch::SessionReport;
use neutron_core::local_state::{save_path_for_rom, JsonStateStore, LocalStateStore};
use neutron_core::sync::{
    HttpSaveRemote, PlaytimeOutcome, PullOutcome, PushOutcome, SyncEngine,
};
use neutron_core::GameId;

use crate::error::CliError;

/// Everything a command needs from the data directory.
pub struct CliContext {
    pub data_dir: PathBuf,
    pub state: Arc<JsonStateStore>,
    pub settings: ClientSettings,
}

impl CliContext {
    pub fn open(data_dir: Option<&Path>) -> Result<Self, CliError> {
        let data_dir = resolve_data_dir(data_dir)?;
        let settings = ClientSettings::load_from_dir(&data_dir)?;
        Ok(Self {
            state: Arc::new(JsonStateStore::new(&data_dir)),
            data_dir,
            settings,
        })
    }

    pub fn sync_engine(&self) -> Result<SyncEngine, CliError> {
        let base_url = self.settings.resolve_api_base_url()?;
        let remote = HttpSaveRemote::new(base_url)?;
        Ok(SyncEngine::new(Arc::new(remote), self.state.clone()))
    }

    /// Save file next to the installed ROM of `game_id`.
    pub fn save_path(&self, game_id: GameId) -> Result<PathBuf, CliError> {
        let rom_path = self
            .state
            .load_library()?
            .rom_path(game_id)
            .ok_or(CliError::GameNotInstalled(game_id))?;
        Ok(save_path_for_rom(&rom_path))
    }
}

/// Absolute form of a user-supplied path that must point at an existing file.
pub fn existing_file(path: &Path) -> Result<PathBuf, CliError> {
    if !path.is_file() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    Ok(std::path::absolute(path)?)
}

/// Like [`existing_file`], but directory ROMs and app bundles are accepted too.
pub fn existing_path(path: &Path) -> Result<PathBuf, CliError> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.to_path_buf()));
    }
    Ok(std::path::absolute(path)?)
}

pub fn describe_pull(outcome: &PullOutcome) -> String {
    match outcome {
        PullOutcome::NoRemoteSave => "No save on the server".to_string(),
        PullOutcome::UpToDate { version_id } => {
            format!("Local save is up to date (server version {version_id})")
        }
        PullOutcome::Downloaded { version_id, bytes } => {
            format!("Downloaded save version {version_id} ({bytes} bytes)")
        }
        PullOutcome::Skipped { reason } => format!("Pull skipped: {reason}"),
    }
}

pub fn describe_push(outcome: &PushOutcome) -> String {
    match outcome {
        PushOutcome::NoLocalSave => "No local save to upload".to_string(),
        PushOutcome::Uploaded { save_id, bytes } => {
            format!("Uploaded save version {save_id} ({bytes} bytes)")
        }
        PushOutcome::Skipped { reason } => format!("Push skipped: {reason}"),
    }
}

pub fn describe_playtime(outcome: &PlaytimeOutcome) -> String {
    match outcome {
        PlaytimeOutcome::BelowThreshold { seconds } => {
            format!("Session of {seconds}s too short to count as playtime")
        }
        PlaytimeOutcome::NoCredential => {
            "Playtime not reported: no bearer token stored (see `neutron auth set-token`)"
                .to_string()
        }
        PlaytimeOutcome::Reported {
            seconds,
            total_seconds,
        } => format!(
            "Reported {} of playtime (total {})",
            format_duration(*seconds),
            format_duration(u64::try_from(*total_seconds).unwrap_or(0))
        ),
        PlaytimeOutcome::Skipped { reason } => format!("Playtime report skipped: {reason}"),
    }
}

pub fn format_session_report(report: &SessionReport) -> Vec<String> {
    let exit = report
        .exit_code
        .map_or_else(|| "no exit code".to_string(), |code| format!("exit code {code}"));
    vec![
        format!(
            "Session for game {} ended after {} ({exit})",
            report.game_id,
            format_duration(report.elapsed_secs)
        ),
        describe_push(&report.push),
        describe_playtime(&report.playtime),
    ]
}

pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
