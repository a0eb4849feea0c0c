use std::collections::HashSet;

use async_recursion::async_recursion;
use tracing::instrument;

use crate::backend::Backend;
use crate::entry::{self, EntryKind};
use crate::error::{self, ErrorKind};

/// Error type for [`remove_all`], carrying what was removed before the failure.
///
/// Display shows the full error chain of the first error encountered.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct Error {
    #[source]
    pub source: error::Error,
    pub summary: Summary,
    /// Set when the failing directory was already drained for as many passes as allowed, so
    /// retrying it from the parent cannot help
    exhausted: bool,
}

impl Error {
    #[must_use]
    pub fn new(source: error::Error, summary: Summary) -> Self {
        Error {
            source,
            summary,
            exhausted: false,
        }
    }

    fn exhausted(source: error::Error, summary: Summary) -> Self {
        Error {
            source,
            summary,
            exhausted: true,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct Settings {
    /// Number of consecutive listing passes in which no child could be removed before draining
    /// a directory is abandoned (values below 1 are treated as 1)
    pub max_stalled_passes: usize,
    /// Return on the first failed child instead of sweeping the rest of the tree
    pub fail_early: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_stalled_passes: 3,
            fail_early: false,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub files_removed: usize,
    pub directories_removed: usize,
}

impl Summary {
    fn record(&mut self, kind: EntryKind) {
        match kind {
            EntryKind::File => self.files_removed += 1,
            EntryKind::Directory => self.directories_removed += 1,
        }
    }
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            files_removed: self.files_removed + other.files_removed,
            directories_removed: self.directories_removed + other.directories_removed,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "files removed: {}\n\
            directories removed: {}\n",
            self.files_removed, self.directories_removed
        )
    }
}

/// Removes a file or an empty directory.
///
/// Failures are classified for [`remove_all`]: a missing path is `NotFound`, a directory that
/// could not be removed is `NotEmpty` (whatever the backend's reason), a file that could not be
/// removed is `Invalid`.
#[instrument(skip(backend))]
pub async fn remove_entry<B: Backend + ?Sized>(
    backend: &B,
    path: &str,
) -> Result<EntryKind, error::Error> {
    let entry = backend.stat(path).await?;
    match entry.kind {
        EntryKind::Directory => backend.remove_dir(path).await.map_err(|err| {
            if err.is_not_found() {
                err
            } else {
                err.reclassify(
                    ErrorKind::NotEmpty,
                    format!("{path:?}: directory not empty"),
                )
            }
        })?,
        EntryKind::File => backend.remove_file(path).await.map_err(|err| {
            if err.is_not_found() {
                err
            } else {
                err.reclassify(ErrorKind::Invalid, format!("failed removing {path:?}"))
            }
        })?,
    }
    Ok(entry.kind)
}

/// Removes `path` and everything beneath it.
///
/// Removal is best-effort: every entry that can be removed is removed and the first error
/// encountered is returned. A path that does not exist, or disappears while being walked, is not
/// an error. An empty path is a no-op.
///
/// Directories are drained by re-listing them until they are empty. A pass that removed
/// something, or found a different listing than the pass before, starts over from a fresh
/// listing; any other pass counts as stalled and draining is abandoned after
/// [`Settings::max_stalled_passes`] of them in a row. A child directory that was abandoned this
/// way is not retried by its parent.
#[instrument(skip(backend, settings))]
#[async_recursion]
pub async fn remove_all<B: Backend + ?Sized>(
    backend: &B,
    path: &str,
    settings: &Settings,
) -> Result<Summary, Error> {
    let mut summary = Summary::default();
    if path.is_empty() {
        return Ok(summary);
    }
    match remove_entry(backend, path).await {
        Ok(kind) => {
            summary.record(kind);
            return Ok(summary);
        }
        Err(err) if err.is_not_found() => return Ok(summary),
        Err(err) if err.kind() == ErrorKind::NotEmpty => {
            tracing::debug!("{:?} is not empty, removing its contents", path);
        }
        Err(err) => return Err(Error::new(err, summary)),
    }
    let mut first_error: Option<error::Error> = None;
    let mut given_up: HashSet<String> = HashSet::new();
    let mut previous_names: Option<Vec<String>> = None;
    let mut stalled_passes = 0;
    loop {
        let entries = match backend.list_dir(path).await {
            Ok(entries) => entries,
            Err(err) if err.is_not_found() => return Ok(summary),
            Err(err) => return Err(Error::new(first_error.unwrap_or(err), summary)),
        };
        let mut names: Vec<String> = entries
            .into_iter()
            .map(|entry| entry.name)
            .filter(|name| !matches!(name.as_str(), "" | "." | ".."))
            .collect();
        names.sort();
        if names.is_empty() || names.iter().all(|name| given_up.contains(name)) {
            break;
        }
        let before = summary;
        let mut failed = 0;
        for name in &names {
            if given_up.contains(name) {
                failed += 1;
                continue;
            }
            let child = entry::join(path, name);
            match remove_all(backend, &child, settings).await {
                Ok(child_summary) => summary = summary + child_summary,
                Err(err) => {
                    summary = summary + err.summary;
                    failed += 1;
                    if settings.fail_early {
                        return Err(Error::new(err.source, summary));
                    }
                    tracing::debug!("failed removing {:?}: {}", &child, &err);
                    if err.exhausted {
                        given_up.insert(name.clone());
                    }
                    if first_error.is_none() {
                        first_error = Some(err.source);
                    }
                }
            }
        }
        let listing_changed = previous_names
            .as_ref()
            .is_some_and(|previous| *previous != names);
        if summary != before || listing_changed {
            stalled_passes = 0;
        } else {
            stalled_passes += 1;
            if failed > 0 {
                tracing::warn!(
                    "none of the {} entries in {:?} could be removed (pass {})",
                    names.len(),
                    path,
                    stalled_passes
                );
            } else {
                tracing::debug!(
                    "listing of {:?} did not change (pass {})",
                    path,
                    stalled_passes
                );
            }
            if stalled_passes >= settings.max_stalled_passes.max(1) {
                break;
            }
        }
        previous_names = Some(names);
    }
    match remove_entry(backend, path).await {
        Ok(kind) => {
            summary.record(kind);
            Ok(summary)
        }
        Err(err) if err.is_not_found() => Ok(summary),
        Err(err) => Err(Error::exhausted(first_error.unwrap_or(err), summary)),
    }
}
