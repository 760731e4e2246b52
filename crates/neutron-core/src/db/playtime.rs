//! Playtime ledger

use chrono::Utc;
use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{GameId, PlaytimeRecord};
use crate::util::utc_from_micros;

/// Per (user, game) accumulated playtime (async)
#[allow(async_fn_in_trait)]
pub trait PlaytimeLedger {
    /// Add `delta_secs` to the record, creating it when absent
    async fn add_seconds(
        &self,
        user_id: &str,
        game_id: GameId,
        delta_secs: i64,
    ) -> Result<PlaytimeRecord>;

    async fn get(&self, user_id: &str, game_id: GameId) -> Result<Option<PlaytimeRecord>>;
}

/// libSQL implementation of `PlaytimeLedger`
pub struct LibSqlPlaytimeLedger<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlPlaytimeLedger<'a> {
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl PlaytimeLedger for LibSqlPlaytimeLedger<'_> {
    async fn add_seconds(
        &self,
        user_id: &str,
        game_id: GameId,
        delta_secs: i64,
    ) -> Result<PlaytimeRecord> {
        if delta_secs < 0 {
            return Err(Error::InvalidInput(
                "Playtime delta cannot be negative".to_string(),
            ));
        }
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(Error::InvalidInput(
                "Playtime user id cannot be empty".to_string(),
            ));
        }

        let now = Utc::now().timestamp_micros();
        // Single statement so concurrent reports for one pair never lose a delta
        self.conn
            .execute(
                "INSERT INTO playtimes (user_id, game_id, seconds, last_played)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, game_id) DO UPDATE SET
                    seconds = playtimes.seconds + excluded.seconds,
                    last_played = excluded.last_played",
                params![user_id.to_string(), game_id.get(), delta_secs, now],
            )
            .await?;

        self.get(user_id, game_id)
            .await?
            .ok_or_else(|| Error::Database(format!("Playtime row for game {game_id} vanished")))
    }

    async fn get(&self, user_id: &str, game_id: GameId) -> Result<Option<PlaytimeRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT user_id, game_id, seconds, last_played
                 FROM playtimes WHERE user_id = ?1 AND game_id = ?2",
                params![user_id.trim().to_string(), game_id.get()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(PlaytimeRecord {
                user_id: row.get(0)?,
                game_id: GameId::new(row.get(1)?),
                seconds: row.get(2)?,
                last_played: utc_from_micros(row.get(3)?),
            })),
            None => Ok(None),
        }
    }
}
