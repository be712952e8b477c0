//! Endpoint descriptors.
//!
//! Sockets bind and connect by descriptor string (`scheme://address`). A
//! Transport parses the string with [`Endpoint::parse`] and decides which
//! schemes it actually serves.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ErrorCode;

/// Parsed endpoint descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `tcp://host:port`
    Tcp(SocketAddr),
    /// `ipc:///path/to/socket`
    Ipc(PathBuf),
    /// `inproc://name`
    Inproc(String),
}

impl Endpoint {
    /// Parse an endpoint from a descriptor string.
    ///
    /// # Examples
    ///
    /// ```
    /// use plexus_core::endpoint::Endpoint;
    ///
    /// let endpoint = Endpoint::parse("inproc://workers").unwrap();
    /// assert!(endpoint.is_inproc());
    /// assert_eq!(endpoint.scheme(), "inproc");
    /// ```
    pub fn parse(s: &str) -> Result<Self, EndpointError> {
        s.parse()
    }

    /// Scheme part of the descriptor.
    pub fn scheme(&self) -> &'static str {
        match self {
            Endpoint::Tcp(_) => "tcp",
            Endpoint::Ipc(_) => "ipc",
            Endpoint::Inproc(_) => "inproc",
        }
    }

    pub fn is_inproc(&self) -> bool {
        matches!(self, Endpoint::Inproc(_))
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, address) = s
            .split_once("://")
            .ok_or_else(|| EndpointError::InvalidScheme(s.to_string()))?;

        match scheme {
            "tcp" => address
                .parse::<SocketAddr>()
                .map(Endpoint::Tcp)
                .map_err(|_| EndpointError::InvalidTcpAddress(address.to_string())),
            "ipc" if address.is_empty() => Err(EndpointError::EmptyAddress(s.to_string())),
            "ipc" => Ok(Endpoint::Ipc(PathBuf::from(address))),
            "inproc" if address.is_empty() => Err(EndpointError::EmptyAddress(s.to_string())),
            "inproc" => Ok(Endpoint::Inproc(address.to_string())),
            _ => Err(EndpointError::InvalidScheme(s.to_string())),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
            Endpoint::Ipc(path) => write!(f, "ipc://{}", path.display()),
            Endpoint::Inproc(name) => write!(f, "inproc://{name}"),
        }
    }
}

/// Errors that can occur when parsing endpoints.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Invalid scheme in endpoint: {0} (expected tcp://, ipc://, or inproc://)")]
    InvalidScheme(String),

    #[error("Invalid TCP address: {0}")]
    InvalidTcpAddress(String),

    #[error("Endpoint has an empty address: {0}")]
    EmptyAddress(String),
}

impl From<EndpointError> for ErrorCode {
    fn from(_: EndpointError) -> Self {
        ErrorCode::InvalidEndpoint
    }
}
