//! Stat and listing results

/// What a path is, as reported by `stat` or a directory listing.
///
/// Symbolic links are reported as [`EntryKind::File`]: they are removed, never followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A single stat or listing result. Built fresh on every call and never cached, the tree may
/// have changed by the time it is looked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

impl Entry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Result of probing a path: like `stat`, except that a missing path is a value rather than an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    File,
    Directory,
    Absent,
}

impl From<EntryKind> for Status {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::File => Status::File,
            EntryKind::Directory => Status::Directory,
        }
    }
}

/// Joins a child name onto a directory path using `/`, whatever the backend.
#[must_use]
pub fn join(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Last path component, ignoring trailing separators.
#[must_use]
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}
