use async_recursion::async_recursion;
use tracing::instrument;

use crate::backend::Backend;
use crate::entry::Status;
use crate::error::{Error, Result};

/// Creates `path` along with any missing parents, like `mkdir -p`.
///
/// Succeeds without doing anything if `path` is already a directory and fails with
/// `NotADirectory` if it exists as something else.
#[instrument(skip(backend))]
#[async_recursion]
pub async fn make_dir_all<B: Backend + ?Sized>(backend: &B, path: &str) -> Result<()> {
    match backend.probe(path).await {
        Ok(Status::Directory) => return Ok(()),
        Ok(Status::File) => return Err(Error::not_a_directory(path)),
        Ok(Status::Absent) => {}
        Err(err) => tracing::debug!("cannot stat {:?}, trying to create it: {}", path, &err),
    }
    let bytes = path.as_bytes();
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] == b'/' {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && bytes[start - 1] != b'/' {
        start -= 1;
    }
    if start > 1 {
        make_dir_all(backend, &path[..start - 1]).await?;
    }
    if let Err(err) = backend.make_dir(path).await {
        // handles races with other creators and paths like "foo/."
        if let Ok(Status::Directory) = backend.probe(path).await {
            return Ok(());
        }
        return Err(err);
    }
    tracing::debug!("created {:?}", path);
    Ok(())
}
