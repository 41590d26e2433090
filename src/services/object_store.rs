//! Destination object store.
//!
//! [`ObjectStore`] is the "put object" capability the pipeline uploads
//! through. [`LocalObjectStore`] keeps payloads on local disk under
//! `root/{key}` and serves them back for the public asset URLs.

use crate::services::storage_key::StorageKey;
use async_trait::async_trait;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
    #[error("object `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store everything readable from `body` under `key`. Returns the number
    /// of bytes written.
    async fn put(&self, key: &StorageKey, content_type: &str, body: File)
    -> ObjectStoreResult<u64>;

    /// Publicly reachable URL of the object stored under `key`.
    fn public_url(&self, key: &StorageKey) -> String;
}

const MAX_OBJECT_KEY_LEN: usize = 1024;

/// Filesystem-backed object store.
#[derive(Clone, Debug)]
pub struct LocalObjectStore {
    /// Base directory on disk where object payloads are stored.
    root: PathBuf,

    /// URL prefix the stored objects are served under.
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Rejects keys that begin with `/` or contain `..`.
    fn ensure_key_safe(key: &str) -> ObjectStoreResult<()> {
        let invalid = key.is_empty()
            || key.len() > MAX_OBJECT_KEY_LEN
            || key.starts_with('/')
            || key.contains("..")
            || key
                .bytes()
                .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
        if invalid {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Open a stored object for streaming out, along with its size.
    pub async fn open(&self, key: &str) -> ObjectStoreResult<(File, u64)> {
        Self::ensure_key_safe(key)?;
        let path = self.object_path(key);
        let file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                ObjectStoreError::NotFound(key.to_string())
            } else {
                ObjectStoreError::Io(err)
            }
        })?;
        let size = file.metadata().await?.len();
        Ok((file, size))
    }

    /// Copy `body` into `tmp_path`, flushing and syncing it to disk.
    async fn write_tmp(tmp_path: &Path, mut body: File) -> io::Result<u64> {
        let mut file = File::create(tmp_path).await?;
        let size = tokio::io::copy(&mut body, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(size)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    /// Writes to a hidden temporary sibling first and renames it into place,
    /// so readers never observe a partially written object.
    async fn put(
        &self,
        key: &StorageKey,
        content_type: &str,
        body: File,
    ) -> ObjectStoreResult<u64> {
        Self::ensure_key_safe(key.as_str())?;

        let file_path = self.object_path(key.as_str());
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            ObjectStoreError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let size = match Self::write_tmp(&tmp_path, body).await {
            Ok(size) => size,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ObjectStoreError::Io(err));
            }
        };

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(ObjectStoreError::Io(err));
        }

        info!(
            key = %key,
            content_type,
            size_bytes = size,
            "stored object"
        );
        debug!("object written to {}", file_path.display());
        Ok(size)
    }

    fn public_url(&self, key: &StorageKey) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
    }
}
