//! FTP backend
//!
//! The control connection is a blocking `suppaftp` stream owned behind a mutex; every command
//! runs on the blocking thread pool. FTP has no stat, so directories are detected by changing
//! into them and files by asking for their size.

use std::net::ToSocketAddrs;
use std::sync::{Arc, Mutex};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use common::entry::{self, Entry, EntryKind};
use common::{Backend, Error, ErrorKind};
use suppaftp::{FtpError, FtpStream, Status};
use tracing::instrument;

use crate::config::FtpConfig;

type Result<T> = common::error::Result<T>;

fn ftp_error(err: FtpError, op: &str, path: &str) -> Error {
    Error::other(anyhow::Error::from(err).context(format!("FTP {op} {path:?} failed")))
}

// 550 is also sent for "permission denied" and "directory not empty", only callers that know
// the path is being looked up may read it as "missing"
fn is_unavailable(err: &FtpError) -> bool {
    matches!(
        err,
        FtpError::UnexpectedResponse(response) if matches!(response.status, Status::FileUnavailable)
    )
}

fn lookup_error(err: FtpError, op: &str, path: &str) -> Error {
    if is_unavailable(&err) {
        Error::new(
            ErrorKind::NotFound,
            anyhow::Error::from(err).context(format!("FTP {op} {path:?} failed")),
        )
    } else {
        ftp_error(err, op, path)
    }
}

/// Parses `LIST` output, skipping lines that are not entries (e.g. `total 8`).
fn parse_listing(lines: &[String]) -> Vec<Entry> {
    lines
        .iter()
        .filter_map(|line| suppaftp::list::File::try_from(line.as_str()).ok())
        .filter(|file| !matches!(file.name(), "" | "." | ".."))
        .map(|file| Entry {
            name: file.name().to_string(),
            kind: if file.is_directory() {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
        })
        .collect()
}

fn stat_blocking(stream: &mut FtpStream, path: &str) -> Result<EntryKind> {
    let cwd = stream.pwd().map_err(|err| ftp_error(err, "pwd", path))?;
    if stream.cwd(path).is_ok() {
        stream
            .cwd(&cwd)
            .map_err(|err| ftp_error(err, "restore working directory", &cwd))?;
        return Ok(EntryKind::Directory);
    }
    stream
        .size(path)
        .map(|_| EntryKind::File)
        .map_err(|err| lookup_error(err, "size", path))
}

fn list_blocking(stream: &mut FtpStream, path: &str) -> Result<Vec<String>> {
    let cwd = stream.pwd().map_err(|err| ftp_error(err, "pwd", path))?;
    // listing from inside the directory guarantees a file is never listed as its own child
    stream
        .cwd(path)
        .map_err(|err| lookup_error(err, "change directory", path))?;
    let listing = stream.list(None);
    stream
        .cwd(&cwd)
        .map_err(|err| ftp_error(err, "restore working directory", &cwd))?;
    listing.map_err(|err| lookup_error(err, "list", path))
}

fn open(config: &FtpConfig) -> anyhow::Result<FtpStream> {
    let addresses: Vec<_> = (config.host.as_str(), config.port())
        .to_socket_addrs()
        .with_context(|| format!("Failed to resolve FTP host {}", config.host))?
        .collect();
    let mut last_error = anyhow!("FTP host {} resolved to no addresses", config.host);
    for address in addresses {
        tracing::debug!("Connecting to FTP server at {address}");
        let connected = match config.timeout {
            Some(timeout) => FtpStream::connect_timeout(address, timeout),
            None => FtpStream::connect(address),
        };
        let mut stream = match connected {
            Ok(stream) => stream,
            Err(err) => {
                last_error =
                    anyhow::Error::from(err).context(format!("Failed to connect to {address}"));
                continue;
            }
        };
        stream
            .login(config.user.as_str(), config.password.as_str())
            .with_context(|| format!("FTP login as {} failed", config.user))?;
        stream
            .transfer_type(suppaftp::types::FileType::Binary)
            .context("Failed to switch to binary transfer type")?;
        return Ok(stream);
    }
    Err(last_error)
}

pub struct FtpBackend {
    stream: Arc<Mutex<FtpStream>>,
}

impl std::fmt::Debug for FtpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpBackend").finish_non_exhaustive()
    }
}

impl FtpBackend {
    #[instrument(skip(config), fields(host = %config.host))]
    pub async fn connect(config: &FtpConfig) -> anyhow::Result<Self> {
        config.validate().map_err(anyhow::Error::msg)?;
        let config = config.clone();
        let stream = tokio::task::spawn_blocking(move || open(&config))
            .await
            .context("FTP connect task failed")??;
        tracing::info!("FTP session established");
        Ok(Self {
            stream: Arc::new(Mutex::new(stream)),
        })
    }

    async fn with_stream<T, F>(&self, func: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FtpStream) -> Result<T> + Send + 'static,
    {
        let stream = self.stream.clone();
        tokio::task::spawn_blocking(move || {
            let mut stream = stream
                .lock()
                .map_err(|_| Error::other(anyhow!("FTP control connection lock poisoned")))?;
            func(&mut *stream)
        })
        .await
        .map_err(|err| Error::other(anyhow::Error::from(err).context("FTP task failed")))?
    }
}

#[async_trait]
impl Backend for FtpBackend {
    #[instrument]
    async fn stat(&self, path: &str) -> Result<Entry> {
        let owned = path.to_string();
        let kind = self
            .with_stream(move |stream| stat_blocking(stream, &owned))
            .await?;
        Ok(Entry {
            name: entry::base_name(path).to_string(),
            kind,
        })
    }

    #[instrument]
    async fn list_dir(&self, path: &str) -> Result<Vec<Entry>> {
        let owned = path.to_string();
        let lines = self
            .with_stream(move |stream| list_blocking(stream, &owned))
            .await?;
        Ok(parse_listing(&lines))
    }

    #[instrument]
    async fn remove_file(&self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.with_stream(move |stream| {
            stream
                .rm(&path)
                .map_err(|err| ftp_error(err, "remove file", &path))
        })
        .await
    }

    #[instrument]
    async fn remove_dir(&self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.with_stream(move |stream| {
            stream
                .rmdir(&path)
                .map_err(|err| ftp_error(err, "remove directory", &path))
        })
        .await
    }

    #[instrument]
    async fn make_dir(&self, path: &str) -> Result<()> {
        let path = path.to_string();
        self.with_stream(move |stream| {
            stream
                .mkdir(&path)
                .map_err(|err| ftp_error(err, "create directory", &path))
        })
        .await
    }

    #[instrument]
    async fn rename(&self, from: &str, to: &str) -> Result<()> {
        let (from, to) = (from.to_string(), to.to_string());
        self.with_stream(move |stream| {
            stream
                .rename(&from, &to)
                .map_err(|err| lookup_error(err, &format!("rename to {to:?}"), &from))
        })
        .await
    }

    #[instrument]
    async fn read_file(&self, path: &str) -> Result<bytes::Bytes> {
        let path = path.to_string();
        self.with_stream(move |stream| {
            stream
                .retr_as_buffer(&path)
                .map(|cursor| bytes::Bytes::from(cursor.into_inner()))
                .map_err(|err| lookup_error(err, "read", &path))
        })
        .await
    }

    #[instrument(skip(data))]
    async fn save_file(&self, path: &str, data: bytes::Bytes) -> Result<()> {
        let path = path.to_string();
        self.with_stream(move |stream| {
            stream
                .put_file(&path, &mut std::io::Cursor::new(data))
                .map(|_| ())
                .map_err(|err| ftp_error(err, "write", &path))
        })
        .await
    }

    #[instrument]
    async fn ping(&self, path: &str) -> Result<()> {
        self.with_stream(|stream| stream.noop().map_err(|err| ftp_error(err, "noop", "")))
            .await?;
        self.stat(path).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|line| line.to_string()).collect()
    }

    #[test]
    fn unix_listing() {
        let entries = parse_listing(&lines(&[
            "total 8",
            "drwxr-xr-x    2 ftp      ftp          4096 Mar 01 12:00 sub",
            "-rw-r--r--    1 ftp      ftp            12 Mar 01 12:00 notes.txt",
        ]));
        assert_eq!(
            entries,
            vec![Entry::directory("sub"), Entry::file("notes.txt")]
        );
    }

    #[test]
    fn dot_entries_are_skipped() {
        let entries = parse_listing(&lines(&[
            "drwxr-xr-x    4 ftp      ftp          4096 Mar 01 12:00 .",
            "drwxr-xr-x    9 ftp      ftp          4096 Mar 01 12:00 ..",
            "-rw-r--r--    1 ftp      ftp             0 Mar 01 12:00 .hidden",
        ]));
        assert_eq!(entries, vec![Entry::file(".hidden")]);
    }

    #[test]
    fn garbage_is_ignored() {
        assert!(parse_listing(&lines(&["", "not a listing line"])).is_empty());
    }

    #[test]
    fn only_lookups_read_550_as_missing() {
        let unavailable = || {
            FtpError::UnexpectedResponse(suppaftp::types::Response::new(
                Status::FileUnavailable,
                b"550 No such file or directory".to_vec(),
            ))
        };
        assert!(lookup_error(unavailable(), "size", "/x").is_not_found());
        assert_eq!(
            ftp_error(unavailable(), "remove directory", "/x").kind(),
            ErrorKind::Other
        );
    }
}
