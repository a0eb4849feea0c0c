//! Common library for RFS tools - one filesystem interface over local disk, SFTP and FTP
//!
//! # Overview
//!
//! Backends implement [`Backend`], a small set of single-entry primitives (stat, list, remove a
//! file, remove an empty directory, create one directory level, rename, read, write). The
//! operations that walk a tree are implemented exactly once on top of those primitives:
//!
//! - [`remove_all`] removes a path and everything beneath it, best-effort, tolerating entries
//!   that vanish or fail transiently while the tree is walked
//! - [`make_dir_all`] creates a directory and all missing parents, like `mkdir -p`
//!
//! Both take the backend by reference and work the same for every implementation, including
//! `&dyn Backend` and `Box<dyn Backend>`.
//!
//! # Error Handling
//!
//! Every primitive returns [`Error`], classified by [`ErrorKind`]. The algorithms only branch on
//! the kind: `NotFound` is always absorbed during removal, `NotEmpty` means "keep draining",
//! anything else is recorded and reported.
//!
//! # Logging
//!
//! Operations log through `tracing`; binaries install a subscriber via [`run`], with the level
//! chosen by `-v` flags unless `RUST_LOG` is set.

pub mod backend;
pub mod config;
pub mod entry;
pub mod error;
pub mod local;
pub mod mkdir;
pub mod rm;
pub mod timeout;

#[cfg(test)]
pub(crate) mod testutils;

pub use backend::Backend;
pub use config::{OutputConfig, RuntimeConfig};
pub use entry::{Entry, EntryKind, Status};
pub use error::{Error, ErrorKind};
pub use local::LocalBackend;
pub use mkdir::make_dir_all;
pub use rm::remove_all;
pub use timeout::Timeout;

fn init_tracing(output: &OutputConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(output.log_level()));
    // a subscriber may already be installed, keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs an async main function on a freshly configured tokio runtime.
///
/// Returns the summary on success. On failure the error chain is printed to stderr (unless
/// `quiet`) and `None` is returned, binaries then exit with a non-zero status.
pub fn run<Fut, Summary, Error>(
    output: OutputConfig,
    runtime: RuntimeConfig,
    func: impl FnOnce() -> Fut,
) -> Option<Summary>
where
    Summary: std::fmt::Display,
    Error: std::fmt::Display,
    Fut: std::future::Future<Output = Result<Summary, Error>>,
{
    init_tracing(&output);
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    if runtime.max_blocking_threads > 0 {
        builder.max_blocking_threads(runtime.max_blocking_threads);
    }
    let runtime = match builder.build() {
        Ok(runtime) => runtime,
        Err(error) => {
            if !output.quiet {
                eprintln!("failed to start tokio runtime: {error}");
            }
            return None;
        }
    };
    match runtime.block_on(func()) {
        Ok(summary) => {
            if output.print_summary || output.verbose > 0 {
                println!("{summary}");
            }
            Some(summary)
        }
        Err(error) => {
            if !output.quiet {
                eprintln!("{error:#}");
            }
            None
        }
    }
}
