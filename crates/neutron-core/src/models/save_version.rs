//! Save version model

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::GameId;

/// One immutable, timestamped snapshot of a game's save data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveVersion {
    /// Server-assigned version identifier
    pub id: i64,
    /// Game this save belongs to
    pub game_id: GameId,
    /// Uploading user, when the upload was authenticated
    pub user_id: Option<String>,
    /// Blob reference relative to the save blob directory
    pub blob_path: String,
    /// Size of the stored blob in bytes
    pub size_bytes: i64,
    /// Server clock at row insertion (UTC)
    pub created_at: DateTime<Utc>,
}

impl SaveVersion {
    #[must_use]
    pub fn info(&self) -> SaveVersionInfo {
        SaveVersionInfo {
            id: self.id,
            created_at: self.created_at,
        }
    }
}

/// Metadata the client needs to decide whether to pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveVersionInfo {
    pub id: i64,
    pub created_at: DateTime<Utc>,
}

impl SaveVersionInfo {
    /// ISO-8601 UTC rendering used on the wire.
    #[must_use]
    pub fn created_at_iso(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn created_at_iso_is_utc_with_zulu_suffix() {
        let info = SaveVersionInfo {
            id: 3,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
        };
        assert_eq!(info.created_at_iso(), "2024-01-01T10:00:00.000000Z");
    }
}
