//! Versioned save store
//!
//! Append-only: every upload creates a new row and a new blob. Rows are
//! never updated or deleted here, so a version that was visible once stays
//! visible (and fetchable by id) forever.

use chrono::Utc;
use libsql::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::models::{GameId, SaveVersion, SaveVersionInfo};
use crate::storage::BlobStore;
use crate::util::utc_from_micros;

const SELECT_COLUMNS: &str = "SELECT id, game_id, user_id, blob_path, size_bytes, created_at
     FROM save_versions";

/// Server-side store of save versions (async)
#[allow(async_fn_in_trait)]
pub trait SaveStore {
    /// Store `bytes` as a new version of `game_id`, timestamped at commit
    async fn create(
        &self,
        game_id: GameId,
        user_id: Option<&str>,
        bytes: &[u8],
    ) -> Result<SaveVersion>;

    /// Metadata of the version with the greatest `created_at` (ties: greatest id)
    async fn latest_info(&self, game_id: GameId) -> Result<Option<SaveVersionInfo>>;

    /// Bytes of the latest version
    async fn latest_content(&self, game_id: GameId) -> Result<Option<Vec<u8>>>;

    /// One version of a game by id
    async fn get(&self, game_id: GameId, version_id: i64) -> Result<Option<SaveVersion>>;

    /// Bytes of one version of a game by id
    async fn content(&self, game_id: GameId, version_id: i64) -> Result<Option<Vec<u8>>>;

    /// All versions of a game, newest first
    async fn list(&self, game_id: GameId) -> Result<Vec<SaveVersion>>;
}

/// libSQL implementation of `SaveStore`, keeping blobs in a `BlobStore`
pub struct LibSqlSaveStore<'a> {
    conn: &'a Connection,
    blobs: &'a BlobStore,
}

impl<'a> LibSqlSaveStore<'a> {
    pub const fn new(conn: &'a Connection, blobs: &'a BlobStore) -> Self {
        Self { conn, blobs }
    }
}

impl SaveStore for LibSqlSaveStore<'_> {
    async fn create(
        &self,
        game_id: GameId,
        user_id: Option<&str>,
        bytes: &[u8],
    ) -> Result<SaveVersion> {
        let blob_path = self.blobs.write(bytes).await?;
        let size_bytes = i64::try_from(bytes.len())
            .map_err(|_| Error::InvalidInput("Save file is too large".to_string()))?;
        let user_id = user_id.map(ToString::to_string);
        // Timestamp taken after the blob is durable, immediately before the insert
        let created_at = Utc::now();

        let inserted = self
            .conn
            .execute(
                "INSERT INTO save_versions (game_id, user_id, blob_path, size_bytes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    game_id.get(),
                    user_id.clone(),
                    blob_path.clone(),
                    size_bytes,
                    created_at.timestamp_micros()
                ],
            )
            .await;

        if let Err(error) = inserted {
            if let Err(cleanup_error) = self.blobs.delete(&blob_path).await {
                tracing::warn!(
                    blob_path = %blob_path,
                    "Failed to remove orphaned save blob: {cleanup_error}"
                );
            }
            return Err(error.into());
        }

        let id = self.conn.last_insert_rowid();
        tracing::info!(game_id = %game_id, save_id = id, size_bytes, "Stored new save version");

        Ok(SaveVersion {
            id,
            game_id,
            user_id,
            blob_path,
            size_bytes,
            created_at: utc_from_micros(created_at.timestamp_micros()),
        })
    }

    async fn latest_info(&self, game_id: GameId) -> Result<Option<SaveVersionInfo>> {
        Ok(self.latest(game_id).await?.map(|version| version.info()))
    }

    async fn latest_content(&self, game_id: GameId) -> Result<Option<Vec<u8>>> {
        match self.latest(game_id).await? {
            Some(version) => Ok(Some(self.blobs.read(&version.blob_path).await?)),
            None => Ok(None),
        }
    }

    async fn get(&self, game_id: GameId, version_id: i64) -> Result<Option<SaveVersion>> {
        let sql = format!("{SELECT_COLUMNS} WHERE game_id = ?1 AND id = ?2");
        let mut rows = self
            .conn
            .query(&sql, params![game_id.get(), version_id])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_save_version(&row)?)),
            None => Ok(None),
        }
    }

    async fn content(&self, game_id: GameId, version_id: i64) -> Result<Option<Vec<u8>>> {
        match self.get(game_id, version_id).await? {
            Some(version) => Ok(Some(self.blobs.read(&version.blob_path).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self, game_id: GameId) -> Result<Vec<SaveVersion>> {
        let sql = format!("{SELECT_COLUMNS} WHERE game_id = ?1 ORDER BY created_at DESC, id DESC");
        let mut rows = self.conn.query(&sql, [game_id.get()]).await?;

        let mut versions = Vec::new();
        while let Some(row) = rows.next().await? {
            versions.push(row_to_save_version(&row)?);
        }
        Ok(versions)
    }
}

impl LibSqlSaveStore<'_> {
    async fn latest(&self, game_id: GameId) -> Result<Option<SaveVersion>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE game_id = ?1 ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let mut rows = self.conn.query(&sql, [game_id.get()]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_save_version(&row)?)),
            None => Ok(None),
        }
    }
}

fn row_to_save_version(row: &Row) -> Result<SaveVersion> {
    Ok(SaveVersion {
        id: row.get(0)?,
        game_id: GameId::new(row.get(1)?),
        user_id: row.get::<Option<String>>(2)?,
        blob_path: row.get(3)?,
        size_bytes: row.get(4)?,
        created_at: utc_from_micros(row.get(5)?),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::db::Database;

    async fn setup() -> (Database, BlobStore, TempDir) {
        let temp = tempdir().unwrap();
        let blobs = BlobStore::new(temp.path().join("saves"));
        let db = Database::open_in_memory().await.unwrap();
        (db, blobs, temp)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn latest_is_none_for_game_without_saves() {
        let (db, blobs, _temp) = setup().await;
        let store = LibSqlSaveStore::new(db.connection(), &blobs);

        assert_eq!(store.latest_info(GameId::new(7)).await.unwrap(), None);
        assert_eq!(store.latest_content(GameId::new(7)).await.unwrap(), None);
        assert!(store.list(GameId::new(7)).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn latest_tracks_most_recent_push_and_keeps_older_versions() {
        let (db, blobs, _temp) = setup().await;
        let store = LibSqlSaveStore::new(db.connection(), &blobs);
        let game = GameId::new(7);

        let mut created = Vec::new();
        for payload in [b"first".as_slice(), b"second", b"third"] {
            created.push(store.create(game, Some("user-1"), payload).await.unwrap());
        }

        let latest = store.latest_info(game).await.unwrap().unwrap();
        assert_eq!(latest.id, created[2].id);
        assert_eq!(
            store.latest_content(game).await.unwrap(),
            Some(b"third".to_vec())
        );

        assert_eq!(
            store.content(game, created[0].id).await.unwrap(),
            Some(b"first".to_vec())
        );
        assert_eq!(
            store.content(game, created[1].id).await.unwrap(),
            Some(b"second".to_vec())
        );

        let listed = store
            .list(game)
            .await
            .unwrap()
            .into_iter()
            .map(|version| version.id)
            .collect::<Vec<_>>();
        assert_eq!(
            listed,
            vec![created[2].id, created[1].id, created[0].id]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn equal_timestamps_break_ties_by_greatest_id() {
        let (db, blobs, _temp) = setup().await;
        let store = LibSqlSaveStore::new(db.connection(), &blobs);
        let game = GameId::new(3);

        let first = store.create(game, None, b"a").await.unwrap();
        let second = store.create(game, None, b"b").await.unwrap();
        db.connection()
            .execute(
                "UPDATE save_versions SET created_at = ?1",
                [first.created_at.timestamp_micros()],
            )
            .await
            .unwrap();

        let latest = store.latest_info(game).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn versions_are_scoped_to_their_game() {
        let (db, blobs, _temp) = setup().await;
        let store = LibSqlSaveStore::new(db.connection(), &blobs);

        let other = store.create(GameId::new(1), None, b"other").await.unwrap();
        assert_eq!(store.latest_info(GameId::new(2)).await.unwrap(), None);
        assert_eq!(store.get(GameId::new(2), other.id).await.unwrap(), None);

        let stored = store.get(GameId::new(1), other.id).await.unwrap().unwrap();
        assert_eq!(stored.user_id, None);
        assert_eq!(stored.size_bytes, 5);
        assert_eq!(stored.created_at, other.created_at);
    }
}
