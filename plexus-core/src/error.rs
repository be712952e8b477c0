/// Plexus Error Types
///
/// Two layers: `ErrorCode` is what a Transport reports natively, and
/// `PlexusError` is what the socket and poller surface to callers.

use std::fmt;
use std::io;
use thiserror::Error;

use crate::options::{OptionKind, SocketOption};

/// Native error code reported by a Transport.
///
/// `WouldBlock` is kept distinct from every other failure so that callers
/// can tell backpressure apart from breakage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The operation cannot complete without blocking (EAGAIN)
    WouldBlock,
    /// Endpoint is already bound (EADDRINUSE)
    AddrInUse,
    /// Nothing is bound at the endpoint (ECONNREFUSED)
    ConnectionRefused,
    /// Endpoint descriptor could not be parsed (EINVAL)
    InvalidEndpoint,
    /// Endpoint scheme is not served by this Transport (EPROTONOSUPPORT)
    ProtocolNotSupported,
    /// Socket kinds cannot talk to each other
    Incompatible,
    /// Handle is null, closed, or unknown to the Transport (ENOTSOCK)
    NotSocket,
    /// Option key or value size is not valid (EINVAL)
    InvalidOption,
    /// Operation is not supported by this socket kind (ENOTSUP)
    NotSupported,
    /// Operation is not valid in the socket's current state (EFSM)
    FiniteState,
    /// Interrupted by a signal (EINTR)
    Interrupted,
    /// Operating-system failure while checking descriptors
    Io(io::ErrorKind),
}

impl ErrorCode {
    /// Errno-style numeric value of this code.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            Self::WouldBlock => 11,
            Self::AddrInUse => 98,
            Self::ConnectionRefused => 111,
            Self::InvalidEndpoint | Self::InvalidOption => 22,
            Self::ProtocolNotSupported => 93,
            Self::Incompatible => 71,
            Self::NotSocket => 88,
            Self::NotSupported => 95,
            Self::FiniteState => 156_384_763,
            Self::Interrupted => 4,
            Self::Io(_) => 5,
        }
    }

    /// Check if this code is the would-block condition.
    #[must_use]
    pub const fn is_would_block(&self) -> bool {
        matches!(self, Self::WouldBlock)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WouldBlock => f.write_str("resource temporarily unavailable"),
            Self::AddrInUse => f.write_str("address already in use"),
            Self::ConnectionRefused => f.write_str("connection refused"),
            Self::InvalidEndpoint => f.write_str("invalid endpoint"),
            Self::ProtocolNotSupported => f.write_str("protocol not supported"),
            Self::Incompatible => f.write_str("incompatible socket types"),
            Self::NotSocket => f.write_str("not a socket"),
            Self::InvalidOption => f.write_str("invalid option"),
            Self::NotSupported => f.write_str("operation not supported"),
            Self::FiniteState => {
                f.write_str("operation cannot be accomplished in current state")
            }
            Self::Interrupted => f.write_str("interrupted system call"),
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
        }
    }
}

impl From<io::Error> for ErrorCode {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock => Self::WouldBlock,
            io::ErrorKind::Interrupted => Self::Interrupted,
            kind => Self::Io(kind),
        }
    }
}

/// Main error type for socket and poller operations
#[derive(Error, Debug)]
pub enum PlexusError {
    /// Native Transport failure, fatal to the current call
    #[error("transport error ({}): {0}", .0.errno())]
    Transport(ErrorCode),

    /// Malformed call, e.g. sending an empty message
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Precondition violation, e.g. receiving into a non-empty message
    #[error("invalid state: {0}")]
    State(String),

    /// Option accessed through the accessor of another value category
    #[error("option {option} holds {expected} values, not {found}")]
    TypeMismatch {
        option: SocketOption,
        expected: OptionKind,
        found: OptionKind,
    },
}

/// Result type alias for plexus operations
pub type Result<T> = std::result::Result<T, PlexusError>;

impl From<ErrorCode> for PlexusError {
    fn from(code: ErrorCode) -> Self {
        Self::Transport(code)
    }
}

impl PlexusError {
    /// Create an invalid argument error with a message
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a state error with a message
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Native code carried by a Transport error, if any.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Transport(code) => Some(*code),
            _ => None,
        }
    }

    /// Check if this error wraps the Transport's would-block code.
    #[must_use]
    pub const fn is_would_block(&self) -> bool {
        matches!(self, Self::Transport(ErrorCode::WouldBlock))
    }

    /// Check if this error is a caller-contract violation (a programming
    /// error rather than a runtime failure).
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::State(_) | Self::TypeMismatch { .. }
        )
    }
}
