use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, TransportError};
use crate::stream::SerialStream;

/// Where a link lives.
///
/// Written as `unix:<path>` for a Unix domain socket, or as a plain path for
/// a serial device or pseudo-terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    Device(PathBuf),
}

impl Endpoint {
    const UNIX_PREFIX: &'static str = "unix:";

    /// Open the endpoint from the controller side.
    ///
    /// Sockets are connected to; devices are opened in raw mode.
    #[cfg(unix)]
    pub fn connect(&self) -> Result<SerialStream> {
        match self {
            Endpoint::Unix(path) => crate::uds::UnixDomainSocket::connect(path),
            Endpoint::Device(path) => crate::device::open_device(path),
        }
    }

    /// The filesystem path behind the endpoint.
    pub fn path(&self) -> &Path {
        match self {
            Endpoint::Unix(path) | Endpoint::Device(path) => path,
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix(Self::UNIX_PREFIX) {
            if path.is_empty() {
                return Err(TransportError::InvalidEndpoint(s.to_string()));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if s.is_empty() {
            return Err(TransportError::InvalidEndpoint(s.to_string()));
        }
        Ok(Endpoint::Device(PathBuf::from(s)))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "{}{}", Self::UNIX_PREFIX, path.display()),
            Endpoint::Device(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unix_endpoint() {
        let endpoint: Endpoint = "unix:/tmp/epos.sock".parse().unwrap();
        assert_eq!(endpoint, Endpoint::Unix(PathBuf::from("/tmp/epos.sock")));
        assert_eq!(endpoint.to_string(), "unix:/tmp/epos.sock");
    }

    #[test]
    fn plain_path_is_a_device() {
        let endpoint: Endpoint = "/dev/ptywf".parse().unwrap();
        assert_eq!(endpoint, Endpoint::Device(PathBuf::from("/dev/ptywf")));
        assert_eq!(endpoint.path(), Path::new("/dev/ptywf"));
    }

    #[test]
    fn empty_endpoints_rejected() {
        assert!(matches!(
            "".parse::<Endpoint>(),
            Err(TransportError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            "unix:".parse::<Endpoint>(),
            Err(TransportError::InvalidEndpoint(_))
        ));
    }
}
