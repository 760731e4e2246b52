//! Playtime model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GameId;

/// Sessions shorter than this are treated as accidental launches and never
/// reported to the ledger.
pub const MIN_REPORTABLE_SESSION_SECS: u64 = 5;

/// Accumulated playtime for one (user, game) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaytimeRecord {
    pub user_id: String,
    pub game_id: GameId,
    /// Total seconds across all reported sessions
    pub seconds: i64,
    /// Time of the most recent report
    pub last_played: DateTime<Utc>,
}

/// Whether a session of `elapsed_secs` counts towards playtime.
#[must_use]
pub const fn is_reportable_session(elapsed_secs: u64) -> bool {
    elapsed_secs >= MIN_REPORTABLE_SESSION_SECS
}
