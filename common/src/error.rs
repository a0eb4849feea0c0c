//! Error taxonomy shared by all backends and the recursive algorithms

/// Classification of a backend failure.
///
/// The recursive algorithms only ever branch on the kind, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The path (or one of its ancestors) does not exist
    NotFound,
    /// A directory could not be removed because it still has children
    NotEmpty,
    /// The path exists but is not a directory where one was required
    NotADirectory,
    /// The operation does not apply to what the path actually is
    Invalid,
    /// Any other backend failure (network, protocol, permissions, ...)
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::NotEmpty => "directory not empty",
            ErrorKind::NotADirectory => "not a directory",
            ErrorKind::Invalid => "invalid operation",
            ErrorKind::Other => "backend error",
        };
        write!(f, "{s}")
    }
}

/// Error returned by every backend primitive.
///
/// # Logging Convention
/// The Display implementation shows the full context chain, so logging with `{}` is enough:
/// ```ignore
/// tracing::error!("remove failed: {}", &error);
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{source:#}")]
pub struct Error {
    kind: ErrorKind,
    #[source]
    source: anyhow::Error,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, source: anyhow::Error) -> Self {
        Error { kind, source }
    }

    #[must_use]
    pub fn other(source: anyhow::Error) -> Self {
        Self::new(ErrorKind::Other, source)
    }

    #[must_use]
    pub fn not_found(path: &str) -> Self {
        Self::new(
            ErrorKind::NotFound,
            anyhow::anyhow!("{path:?}: no such file or directory"),
        )
    }

    #[must_use]
    pub fn not_a_directory(path: &str) -> Self {
        Self::new(
            ErrorKind::NotADirectory,
            anyhow::anyhow!("{path:?}: not a directory"),
        )
    }

    /// Maps a local I/O error, keeping the operation and path as context.
    #[must_use]
    pub fn from_io(error: std::io::Error, op: &str, path: &str) -> Self {
        let kind = match error.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::DirectoryNotEmpty => ErrorKind::NotEmpty,
            std::io::ErrorKind::NotADirectory => ErrorKind::NotADirectory,
            _ => ErrorKind::Other,
        };
        Self::new(
            kind,
            anyhow::Error::from(error).context(format!("{op} {path:?} failed")),
        )
    }

    /// Re-tags the error with a different kind, adding `context` on top of the original chain.
    #[must_use]
    pub fn reclassify(self, kind: ErrorKind, context: String) -> Self {
        Self::new(kind, self.source.context(context))
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    #[must_use]
    pub fn into_anyhow(self) -> anyhow::Error {
        self.source
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
