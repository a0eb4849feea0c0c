//! The capability interface every filesystem backend implements
//!
//! Backends only provide single-entry primitives. Anything that walks a tree (recursive removal,
//! `mkdir -p`) is written once, generically, in [`crate::rm`] and [`crate::mkdir`].
//!
//! Paths are `/`-separated strings in the backend's own namespace, no matter what transport sits
//! underneath.

use async_trait::async_trait;

use crate::entry::{Entry, Status};
use crate::error::Result;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Fails with [`crate::ErrorKind::NotFound`] when `path` does not exist.
    async fn stat(&self, path: &str) -> Result<Entry>;

    /// Lists the children of `path`. An empty directory yields an empty vector, `.` and `..`
    /// are never included.
    async fn list_dir(&self, path: &str) -> Result<Vec<Entry>>;

    async fn remove_file(&self, path: &str) -> Result<()>;

    /// Fails with [`crate::ErrorKind::NotFound`] when the directory is already gone.
    async fn remove_dir(&self, path: &str) -> Result<()>;

    /// Creates exactly one directory level, the parent must already exist.
    async fn make_dir(&self, path: &str) -> Result<()>;

    async fn rename(&self, from: &str, to: &str) -> Result<()>;

    async fn read_file(&self, path: &str) -> Result<bytes::Bytes>;

    /// Creates or truncates `path`. Empty `data` creates an empty file.
    async fn save_file(&self, path: &str, data: bytes::Bytes) -> Result<()>;

    /// Checks the backend is reachable and usable by looking at a known path.
    async fn ping(&self, path: &str) -> Result<()> {
        self.stat(path).await.map(|_| ())
    }

    async fn probe(&self, path: &str) -> Result<Status> {
        match self.stat(path).await {
            Ok(entry) => Ok(entry.kind.into()),
            Err(error) if error.is_not_found() => Ok(Status::Absent),
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Box<B> {
    async fn stat(&self, path: &str) -> Result<Entry> {
        (**self).stat(path).await
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<Entry>> {
        (**self).list_dir(path).await
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        (**self).remove_file(path).await
    }

    async fn remove_dir(&self, path: &str) -> Result<()> {
        (**self).remove_dir(path).await
    }

    async fn make_dir(&self, path: &str) -> Result<()> {
        (**self).make_dir(path).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        (**self).rename(from, to).await
    }

    async fn read_file(&self, path: &str) -> Result<bytes::Bytes> {
        (**self).read_file(path).await
    }

    async fn save_file(&self, path: &str, data: bytes::Bytes) -> Result<()> {
        (**self).save_file(path, data).await
    }

    async fn ping(&self, path: &str) -> Result<()> {
        (**self).ping(path).await
    }

    async fn probe(&self, path: &str) -> Result<Status> {
        (**self).probe(path).await
    }
}
