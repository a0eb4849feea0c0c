//! SFTP backend over an OpenSSH multiplexed session

use anyhow::Context;
use async_trait::async_trait;
use common::entry::{self, Entry, EntryKind};
use common::{Backend, Error, ErrorKind};
use futures::TryStreamExt;
use openssh_sftp_client::error::SftpErrorKind;
use tracing::instrument;

use crate::config::{AuthMethod, SftpConfig};

type Result<T> = common::error::Result<T>;

fn map_err(err: openssh_sftp_client::Error, op: &str, path: &str) -> Error {
    let kind = match &err {
        openssh_sftp_client::Error::SftpError(SftpErrorKind::NoSuchFile, _) => {
            ErrorKind::NotFound
        }
        _ => ErrorKind::Other,
    };
    Error::new(
        kind,
        anyhow::Error::from(err).context(format!("SFTP {op} {path:?} failed")),
    )
}

fn kind_of(file_type: Option<openssh_sftp_client::metadata::FileType>) -> EntryKind {
    match file_type {
        Some(file_type) if file_type.is_dir() => EntryKind::Directory,
        // links and special files are removed like plain files
        _ => EntryKind::File,
    }
}

pub struct SftpBackend {
    sftp: openssh_sftp_client::Sftp,
}

impl std::fmt::Debug for SftpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpBackend").finish_non_exhaustive()
    }
}

impl SftpBackend {
    #[instrument]
    pub async fn connect(config: &SftpConfig) -> anyhow::Result<Self> {
        config.validate().map_err(anyhow::Error::msg)?;
        let mut builder = openssh::SessionBuilder::default();
        builder
            .port(config.port())
            .known_hosts_check(config.known_hosts.into());
        if let Some(user) = &config.user {
            builder.user(user.clone());
        }
        if let AuthMethod::Key(path) = &config.auth {
            builder.keyfile(path);
        }
        if let Some(timeout) = config.timeout {
            builder.connect_timeout(timeout);
        }
        tracing::debug!("Connecting to SSH destination: {}", config.host);
        let session = builder
            .connect(&config.host)
            .await
            .with_context(|| format!("Failed to establish SSH connection to {}", config.host))?;
        let sftp = openssh_sftp_client::Sftp::from_session(session, Default::default())
            .await
            .context("Failed to start the SFTP subsystem")?;
        tracing::info!("SFTP session established with {}", config.host);
        Ok(Self { sftp })
    }
}

#[async_trait]
impl Backend for SftpBackend {
    #[instrument]
    async fn stat(&self, path: &str) -> Result<Entry> {
        let metadata = self
            .sftp
            .fs()
            .symlink_metadata(path)
            .await
            .map_err(|err| map_err(err, "stat", path))?;
        Ok(Entry {
            name: entry::base_name(path).to_string(),
            kind: kind_of(metadata.file_type()),
        })
    }

    #[instrument]
    async fn list_dir(&self, path: &str) -> Result<Vec<Entry>> {
        let dir = self
            .sftp
            .fs()
            .open_dir(path)
            .await
            .map_err(|err| map_err(err, "open directory", path))?;
        let listing: Vec<_> = dir
            .read_dir()
            .try_collect()
            .await
            .map_err(|err| map_err(err, "read directory", path))?;
        Ok(listing
            .into_iter()
            .filter_map(|dir_entry| {
                let Some(name) = dir_entry.filename().to_str() else {
                    tracing::warn!(
                        "skipping {:?} in {:?}: name is not valid UTF-8",
                        dir_entry.filename(),
                        path
                    );
                    return None;
                };
                if name == "." || name == ".." {
                    return None;
                }
                Some(Entry {
                    name: name.to_string(),
                    kind: kind_of(dir_entry.metadata().file_type()),
                })
            })
            .collect())
    }

    #[instrument]
    async fn remove_file(&self, path: &str) -> Result<()> {
        self.sftp
            .fs()
            .remove_file(path)
            .await
            .map_err(|err| map_err(err, "remove file", path))
    }

    #[instrument]
    async fn remove_dir(&self, path: &str) -> Result<()> {
        self.sftp
            .fs()
            .remove_dir(path)
            .await
            .map_err(|err| map_err(err, "remove directory", path))
    }

    #[instrument]
    async fn make_dir(&self, path: &str) -> Result<()> {
        self.sftp
            .fs()
            .create_dir(path)
            .await
            .map_err(|err| map_err(err, "create directory", path))
    }

    #[instrument]
    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.sftp
            .fs()
            .rename(from, to)
            .await
            .map_err(|err| map_err(err, &format!("rename to {to:?}"), from))
    }

    #[instrument]
    async fn read_file(&self, path: &str) -> Result<bytes::Bytes> {
        let data = self
            .sftp
            .fs()
            .read(path)
            .await
            .map_err(|err| map_err(err, "read", path))?;
        Ok(data.freeze())
    }

    #[instrument(skip(data))]
    async fn save_file(&self, path: &str, data: bytes::Bytes) -> Result<()> {
        self.sftp
            .fs()
            .write(path, &data)
            .await
            .map_err(|err| map_err(err, "write", path))
    }
}
