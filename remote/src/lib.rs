//! Remote backends for RFS tools
//!
//! Turns a command line location (`sftp://…`, `ftp://…` or a local path) into a connected
//! [`common::Backend`]. The recursive algorithms in `common` then run unchanged on top.

use common::{Backend, LocalBackend, Timeout};
use tracing::instrument;

pub mod cli;
pub mod config;
pub mod ftp;
pub mod location;
pub mod sftp;

pub use cli::ConnectionArgs;
pub use ftp::FtpBackend;
pub use location::{Endpoint, Location, Scheme, parse_location};
pub use sftp::SftpBackend;

pub fn sftp_config(endpoint: &Endpoint, args: &ConnectionArgs) -> config::SftpConfig {
    config::SftpConfig {
        host: endpoint.host.clone(),
        port: endpoint.port,
        user: endpoint.user.clone(),
        auth: match &args.ssh_key {
            Some(path) => config::AuthMethod::Key(path.clone()),
            None => config::AuthMethod::Agent,
        },
        known_hosts: args.known_hosts,
        timeout: args.timeout,
    }
}

pub fn ftp_config(endpoint: &Endpoint, args: &ConnectionArgs) -> config::FtpConfig {
    let defaults = config::FtpConfig::default();
    config::FtpConfig {
        host: endpoint.host.clone(),
        port: endpoint.port,
        user: endpoint.user.clone().unwrap_or(defaults.user),
        password: args.ftp_password.clone().unwrap_or(defaults.password),
        timeout: args.timeout,
    }
}

/// Opens a backend for `location`. Remote backends are bounded by `--timeout` per operation
/// when one is given.
#[instrument(skip(args))]
pub async fn connect(
    location: &Location,
    args: &ConnectionArgs,
) -> anyhow::Result<Box<dyn Backend>> {
    let endpoint = match location {
        Location::Local(_) => return Ok(Box::new(LocalBackend::new())),
        Location::Remote { endpoint, .. } => endpoint,
    };
    let backend: Box<dyn Backend> = match endpoint.scheme {
        Scheme::Sftp => Box::new(SftpBackend::connect(&sftp_config(endpoint, args)).await?),
        Scheme::Ftp => Box::new(FtpBackend::connect(&ftp_config(endpoint, args)).await?),
    };
    let backend: Box<dyn Backend> = match args.timeout {
        Some(limit) => Box::new(Timeout::new(backend, limit)),
        None => backend,
    };
    Ok(backend)
}
