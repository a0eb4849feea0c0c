use anyhow::{Context, anyhow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Sftp,
    Ftp,
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scheme::Sftp => write!(f, "sftp"),
            Scheme::Ftp => write!(f, "ftp"),
        }
    }
}

/// The server half of a remote location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub user: Option<String>,
    /// Host name or address, IPv6 addresses without brackets
    pub host: String,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(String),
    Remote { endpoint: Endpoint, path: String },
}

impl Location {
    pub fn path(&self) -> &str {
        match self {
            Location::Local(path) => path,
            Location::Remote { path, .. } => path,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{path}"),
            Location::Remote { endpoint, path } => {
                write!(f, "{}://", endpoint.scheme)?;
                if let Some(user) = &endpoint.user {
                    write!(f, "{user}@")?;
                }
                if endpoint.host.contains(':') {
                    write!(f, "[{}]", endpoint.host)?;
                } else {
                    write!(f, "{}", endpoint.host)?;
                }
                if let Some(port) = endpoint.port {
                    write!(f, ":{port}")?;
                }
                write!(f, "{path}")
            }
        }
    }
}

/// Parses `sftp://[user@]host[:port]/path` and `ftp://[user@]host[:port]/path`; anything without
/// one of those schemes is a local path and is returned untouched.
pub fn parse_location(location: &str) -> anyhow::Result<Location> {
    let scheme_re = regex::Regex::new(r"^(?i)(?P<scheme>sftp|ftp)://")
        .context("Failed to compile location scheme regex")?;
    let Some(scheme) = scheme_re.captures(location) else {
        return Ok(Location::Local(location.to_string()));
    };
    let scheme = match scheme["scheme"].to_ascii_lowercase().as_str() {
        "sftp" => Scheme::Sftp,
        _ => Scheme::Ftp,
    };
    let re = regex::Regex::new(
        r"^[A-Za-z]+://(?:(?P<user>[^@/]*)@)?(?P<host>\[[^\]/]*\]|[^:/\[\]@]*)(?::(?P<port>[^/]*))?(?P<path>/.*)?$",
    )
    .context("Failed to compile location regex")?;
    let captures = re
        .captures(location)
        .ok_or_else(|| anyhow!("Malformed location: {location:?}"))?;
    let user = match captures.name("user").map(|m| m.as_str()) {
        Some("") => return Err(anyhow!("Empty user name in location: {location:?}")),
        Some(user) => Some(user.to_string()),
        None => None,
    };
    let host = captures
        .name("host")
        .map(|m| m.as_str().trim_start_matches('[').trim_end_matches(']'))
        .unwrap_or_default();
    if host.is_empty() {
        return Err(anyhow!("Missing host in location: {location:?}"));
    }
    let port = captures
        .name("port")
        .map(|m| {
            m.as_str()
                .parse::<u16>()
                .with_context(|| format!("Invalid port {:?} in location: {location:?}", m.as_str()))
        })
        .transpose()?;
    let path = captures
        .name("path")
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| anyhow!("Missing path in location: {location:?}"))?;
    Ok(Location::Remote {
        endpoint: Endpoint {
            scheme,
            user,
            host: host.to_string(),
            port,
        },
        path,
    })
}
