//! Per-operation deadline for any backend
//!
//! The recursive algorithms never time anything out themselves; a caller that needs a bound on
//! a slow or hung transport wraps its backend in [`Timeout`].

use async_trait::async_trait;

use crate::backend::Backend;
use crate::entry::Entry;
use crate::error::{Error, Result};

#[derive(Debug)]
pub struct Timeout<B> {
    inner: B,
    limit: std::time::Duration,
}

impl<B: Backend> Timeout<B> {
    pub fn new(inner: B, limit: std::time::Duration) -> Self {
        Self { inner, limit }
    }

    pub fn into_inner(self) -> B {
        self.inner
    }

    async fn bounded<T>(
        &self,
        op: &str,
        path: &str,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(res) => res,
            Err(_) => Err(Error::other(anyhow::anyhow!(
                "{op} {path:?} timed out after {}",
                humantime::format_duration(self.limit)
            ))),
        }
    }
}

#[async_trait]
impl<B: Backend> Backend for Timeout<B> {
    async fn stat(&self, path: &str) -> Result<Entry> {
        self.bounded("stat", path, self.inner.stat(path)).await
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<Entry>> {
        self.bounded("list", path, self.inner.list_dir(path)).await
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        self.bounded("remove file", path, self.inner.remove_file(path))
            .await
    }

    async fn remove_dir(&self, path: &str) -> Result<()> {
        self.bounded("remove directory", path, self.inner.remove_dir(path))
            .await
    }

    async fn make_dir(&self, path: &str) -> Result<()> {
        self.bounded("create directory", path, self.inner.make_dir(path))
            .await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.bounded("rename", from, self.inner.rename(from, to))
            .await
    }

    async fn read_file(&self, path: &str) -> Result<bytes::Bytes> {
        self.bounded("read", path, self.inner.read_file(path)).await
    }

    async fn save_file(&self, path: &str, data: bytes::Bytes) -> Result<()> {
        self.bounded("write", path, self.inner.save_file(path, data))
            .await
    }

    async fn ping(&self, path: &str) -> Result<()> {
        self.bounded("ping", path, self.inner.ping(path)).await
    }
}
