//! Local staging for uploads.
//!
//! Every temporary file is owned by a [`ScopedFile`] guard that removes it
//! when dropped, so success, early returns and unwinding all clean up.

use crate::errors::{IngestError, IngestResult};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Removes the file at `path` when dropped.
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
}

impl ScopedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        // Drop cannot await; a single unlink is run inline.
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("removed temporary file {}", self.path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                "failed to remove temporary file {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

/// Raw upload bytes drained to local disk. The write handle is closed once
/// staging finishes; later stages reopen the file by path.
#[derive(Debug)]
pub struct StagedFile {
    guard: ScopedFile,
    size: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        self.guard.path()
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Creates uniquely named staging files under one directory.
#[derive(Clone, Debug)]
pub struct TempStorage {
    dir: PathBuf,
    max_bytes: u64,
}

impl TempStorage {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Drain `stream` into a new staging file and close it.
    ///
    /// Fails with `PayloadTooLarge` as soon as more than `max_bytes` arrive;
    /// the partial file is removed on that and every other error.
    pub async fn stage<S>(&self, stream: S) -> IngestResult<StagedFile>
    where
        S: Stream<Item = IngestResult<Bytes>>,
    {
        fs::create_dir_all(&self.dir).await?;

        let guard = ScopedFile::new(self.dir.join(format!("upload-{}", Uuid::new_v4())));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(guard.path())
            .await?;

        let mut size: u64 = 0;
        pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            size += chunk.len() as u64;
            if size > self.max_bytes {
                debug!(
                    "upload exceeded {} bytes while staging to {}",
                    self.max_bytes,
                    guard.path().display()
                );
                return Err(IngestError::PayloadTooLarge {
                    limit: self.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        Ok(StagedFile { guard, size })
    }
}
