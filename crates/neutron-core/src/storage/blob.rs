//! Filesystem blob store for uploaded save files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::{Error, Result};

const BLOB_EXTENSION: &str = "sav";

/// Stores opaque save blobs as flat files under one root directory.
///
/// Every write gets a fresh UUID name, so blobs are never overwritten and a
/// stored version keeps its bytes for as long as its row exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|error| storage_error("create_dir", &self.root, error))
    }

    /// Persist `bytes` under a new unique name and return that name.
    pub async fn write(&self, bytes: &[u8]) -> Result<String> {
        self.ensure_root().await?;

        let name = format!("{}.{BLOB_EXTENSION}", Uuid::now_v7());
        let path = self.root.join(&name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|error| storage_error("write", &path, error))?;
        Ok(name)
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Save blob {name}")))
            }
            Err(error) => Err(storage_error("read", &path, error)),
        }
    }

    /// Remove a blob. Removing a missing blob is not an error.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(storage_error("delete", &path, error)),
        }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(normalize_blob_name(name)?))
    }
}

fn storage_error(operation: &str, path: &Path, error: impl std::fmt::Display) -> Error {
    Error::Storage(format!(
        "Blob {operation} failed for {}: {error}",
        path.display()
    ))
}

/// Blob names are single path components; anything else would escape the root.
fn normalize_blob_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(Error::InvalidInput(format!("Invalid blob name: {name:?}")));
    }
    Ok(name.to_string())
}
