//! Temporary files under the storage root.
//!
//! Every file the engine creates is owned by a [`TempPath`], which removes
//! the file when dropped. A finished transcode is handed to the consumer as a
//! [`DeleteOnCloseFile`], which keeps that guarantee while exposing the bytes.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// A uniquely named path under the storage root, removed on drop.
#[derive(Debug)]
pub struct TempPath {
    path: PathBuf,
    armed: bool,
}

impl TempPath {
    /// Generates a fresh collision-resistant path under `root`.
    ///
    /// Nothing is created on disk.
    pub fn generate(root: &Path, extension: Option<&str>) -> Self {
        let name = match extension {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        Self {
            path: root.join(name),
            armed: true,
        }
    }

    /// The guarded path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file now. A file that was never created is not an error.
    pub async fn remove(mut self) -> io::Result<()> {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed temp file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for TempPath {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed temp file on drop"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove temp file"),
        }
    }
}

/// A read handle whose close also deletes the backing file.
///
/// Call [`close`](Self::close) exactly once after use. If the handle is
/// dropped instead (for example because the consumer went away) the file is
/// still removed.
#[derive(Debug)]
pub struct DeleteOnCloseFile {
    file: File,
    path: TempPath,
}

impl DeleteOnCloseFile {
    /// Opens the guarded file for reading and takes ownership of the guard.
    ///
    /// On failure the guard is dropped, so the file is removed.
    pub async fn open(path: TempPath) -> io::Result<Self> {
        let file = File::open(path.path()).await?;
        Ok(Self { file, path })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        self.path.path()
    }

    /// Size of the backing file in bytes.
    pub async fn size_bytes(&self) -> io::Result<u64> {
        Ok(self.file.metadata().await?.len())
    }

    /// Opens an independent handle to the same file, for uploads that need
    /// an owned stream. The file is still deleted by [`close`](Self::close).
    pub async fn try_clone_file(&self) -> io::Result<File> {
        self.file.try_clone().await
    }

    /// Closes the handle and deletes the backing file.
    pub async fn close(self) -> io::Result<()> {
        let Self { file, path } = self;
        drop(file);
        path.remove().await
    }
}

impl AsyncRead for DeleteOnCloseFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}
