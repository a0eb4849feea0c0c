//! Local disk backend

use async_trait::async_trait;
use tracing::instrument;

use crate::backend::Backend;
use crate::entry::{self, Entry, EntryKind};
use crate::error::{Error, Result};

fn kind_of(file_type: std::fs::FileType) -> EntryKind {
    // symlinks are never followed, not even to directories
    if file_type.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for LocalBackend {
    #[instrument]
    async fn stat(&self, path: &str) -> Result<Entry> {
        let metadata = tokio::fs::symlink_metadata(path)
            .await
            .map_err(|err| Error::from_io(err, "stat", path))?;
        Ok(Entry {
            name: entry::base_name(path).to_string(),
            kind: kind_of(metadata.file_type()),
        })
    }

    #[instrument]
    async fn list_dir(&self, path: &str) -> Result<Vec<Entry>> {
        let mut dir = tokio::fs::read_dir(path)
            .await
            .map_err(|err| Error::from_io(err, "read directory", path))?;
        let mut entries = vec![];
        while let Some(dir_entry) = dir
            .next_entry()
            .await
            .map_err(|err| Error::from_io(err, "read directory", path))?
        {
            let file_type = match dir_entry.file_type().await {
                Ok(file_type) => file_type,
                // removed since it was listed
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(Error::from_io(err, "stat", path)),
            };
            let name = match dir_entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!("skipping {:?} in {:?}: name is not valid UTF-8", raw, path);
                    continue;
                }
            };
            entries.push(Entry {
                name,
                kind: kind_of(file_type),
            });
        }
        Ok(entries)
    }

    #[instrument]
    async fn remove_file(&self, path: &str) -> Result<()> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|err| Error::from_io(err, "remove file", path))
    }

    #[instrument]
    async fn remove_dir(&self, path: &str) -> Result<()> {
        tokio::fs::remove_dir(path)
            .await
            .map_err(|err| Error::from_io(err, "remove directory", path))
    }

    #[instrument]
    async fn make_dir(&self, path: &str) -> Result<()> {
        tokio::fs::create_dir(path)
            .await
            .map_err(|err| Error::from_io(err, "create directory", path))
    }

    #[instrument]
    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        tokio::fs::rename(from, to)
            .await
            .map_err(|err| Error::from_io(err, &format!("rename to {to:?}"), from))
    }

    #[instrument]
    async fn read_file(&self, path: &str) -> Result<bytes::Bytes> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|err| Error::from_io(err, "read", path))?;
        Ok(bytes::Bytes::from(data))
    }

    #[instrument(skip(data))]
    async fn save_file(&self, path: &str, data: bytes::Bytes) -> Result<()> {
        tokio::fs::write(path, &data)
            .await
            .map_err(|err| Error::from_io(err, "write", path))
    }
}
