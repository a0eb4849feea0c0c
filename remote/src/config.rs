//! Connection configuration for the SFTP and FTP backends
//!
//! Configs are validated before any connection attempt. Nothing is silently defaulted except
//! the well-known ports.

pub const DEFAULT_SFTP_PORT: u16 = 22;
pub const DEFAULT_FTP_PORT: u16 = 21;

/// How the SSH connection authenticates
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// Keys offered by ssh-agent or the user's ssh configuration
    #[default]
    Agent,
    /// A specific private key file
    Key(std::path::PathBuf),
}

/// Host key verification policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum KnownHosts {
    /// Only connect to hosts already in known_hosts
    Strict,
    /// Add unknown hosts to known_hosts, refuse changed keys
    #[default]
    Add,
    /// Accept any host key
    Accept,
}

impl From<KnownHosts> for openssh::KnownHosts {
    fn from(policy: KnownHosts) -> Self {
        match policy {
            KnownHosts::Strict => openssh::KnownHosts::Strict,
            KnownHosts::Add => openssh::KnownHosts::Add,
            KnownHosts::Accept => openssh::KnownHosts::Accept,
        }
    }
}

fn validate_host(host: &str, port: Option<u16>) -> Result<(), String> {
    if host.trim().is_empty() {
        return Err("host must not be empty".to_string());
    }
    if port == Some(0) {
        return Err(format!("invalid port 0 for host {host:?}"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct SftpConfig {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub auth: AuthMethod,
    pub known_hosts: KnownHosts,
    /// Connection timeout
    pub timeout: Option<std::time::Duration>,
}

impl SftpConfig {
    /// Validate configuration and return errors if invalid
    pub fn validate(&self) -> Result<(), String> {
        validate_host(&self.host, self.port)?;
        if self.user.as_deref() == Some("") {
            return Err("user must not be empty when specified".to_string());
        }
        match &self.auth {
            AuthMethod::Agent => {}
            AuthMethod::Key(path) => {
                if path.as_os_str().is_empty() {
                    return Err("private key path must not be empty".to_string());
                }
            }
        }
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SFTP_PORT)
    }
}

#[derive(Clone)]
pub struct FtpConfig {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    /// Connection timeout
    pub timeout: Option<std::time::Duration>,
}

impl std::fmt::Debug for FtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: None,
            user: "anonymous".to_string(),
            password: String::new(),
            timeout: None,
        }
    }
}

impl FtpConfig {
    /// Validate configuration and return errors if invalid
    pub fn validate(&self) -> Result<(), String> {
        validate_host(&self.host, self.port)?;
        if self.user.is_empty() {
            return Err("FTP user must not be empty".to_string());
        }
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_FTP_PORT)
    }
}
