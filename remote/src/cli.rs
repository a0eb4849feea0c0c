use crate::config::KnownHosts;

/// Connection options shared by every binary that accepts remote locations
#[derive(clap::Args, Clone, Default)]
pub struct ConnectionArgs {
    /// Private key used for SFTP locations (default: ssh-agent and ~/.ssh/config)
    #[arg(long, value_name = "PATH", help_heading = "Connection")]
    pub ssh_key: Option<std::path::PathBuf>,

    /// Host key verification for SFTP locations
    #[arg(
        long,
        value_enum,
        default_value_t = KnownHosts::Add,
        value_name = "POLICY",
        help_heading = "Connection"
    )]
    pub known_hosts: KnownHosts,

    /// Password for FTP locations; the user comes from the location, "anonymous" if absent
    #[arg(
        long,
        env = "RFS_FTP_PASSWORD",
        hide_env_values = true,
        value_name = "PASSWORD",
        help_heading = "Connection"
    )]
    pub ftp_password: Option<String>,

    /// Connect timeout and per-operation timeout for remote locations, e.g. "30s" or "2m"
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        value_name = "DURATION",
        help_heading = "Connection"
    )]
    pub timeout: Option<std::time::Duration>,
}

impl std::fmt::Debug for ConnectionArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionArgs")
            .field("ssh_key", &self.ssh_key)
            .field("known_hosts", &self.known_hosts)
            .field(
                "ftp_password",
                &self.ftp_password.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}
