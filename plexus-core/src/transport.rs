//! The Transport capability.
//!
//! A Transport is the engine that actually moves frames: it owns endpoint
//! handles, binds and connects them, queues frames, stores options and
//! answers readiness queries. The socket layer above it only adds ownership
//! and framing discipline, so anything implementing [`Transport`] can sit
//! underneath a socket.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::error::ErrorCode;
use crate::flags::{Events, Flags};
use crate::socket_type::SocketType;

/// Raw OS descriptor as accepted by the readiness primitive.
#[cfg(unix)]
pub type Descriptor = std::os::unix::io::RawFd;

/// Raw OS descriptor as accepted by the readiness primitive.
#[cfg(not(unix))]
pub type Descriptor = i32;

/// Opaque Transport-level endpoint handle.
///
/// Handles are plain identifiers; owning one means being responsible for
/// closing it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketHandle(u64);

impl SocketHandle {
    /// Wrap a Transport-assigned identifier.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}

/// Identity of something the readiness primitive can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Watched {
    /// A Transport socket
    Socket(SocketHandle),
    /// A raw OS descriptor
    Descriptor(Descriptor),
}

impl Watched {
    /// Interest used when the caller does not name one.
    ///
    /// Descriptors can report out-of-band error conditions, sockets cannot.
    #[must_use]
    pub const fn default_events(&self) -> Events {
        match self {
            Watched::Socket(_) => Events::IN,
            Watched::Descriptor(_) => Events::IN.union(Events::ERROR),
        }
    }

    /// Events this kind of identity is able to report.
    #[must_use]
    pub const fn supported_events(&self) -> Events {
        match self {
            Watched::Socket(_) => Events::IN.union(Events::OUT),
            Watched::Descriptor(_) => Events::IN.union(Events::OUT).union(Events::ERROR),
        }
    }
}

impl fmt::Display for Watched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Watched::Socket(handle) => write!(f, "{handle}"),
            Watched::Descriptor(fd) => write!(f, "fd#{fd}"),
        }
    }
}

/// One row of a readiness query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollItem {
    /// What to watch
    pub watched: Watched,
    /// Interests to monitor
    pub events: Events,
    /// Observed events, filled in by [`Transport::poll`]
    pub revents: Events,
}

impl PollItem {
    #[must_use]
    pub const fn new(watched: Watched, events: Events) -> Self {
        Self {
            watched,
            events,
            revents: Events::NONE,
        }
    }
}

/// Engine capability underneath a socket.
///
/// Every method reports failures as a native [`ErrorCode`]; in particular a
/// transfer that cannot proceed without blocking reports
/// [`ErrorCode::WouldBlock`] and nothing else.
pub trait Transport: Send + Sync {
    /// Allocate an endpoint handle of the given kind.
    fn open(&self, kind: SocketType) -> Result<SocketHandle, ErrorCode>;

    /// Release a handle. The handle is invalid afterwards even on error.
    fn close(&self, handle: SocketHandle) -> Result<(), ErrorCode>;

    /// Bind the handle to an endpoint descriptor.
    fn bind(&self, handle: SocketHandle, endpoint: &str) -> Result<(), ErrorCode>;

    /// Connect the handle to an endpoint descriptor.
    fn connect(&self, handle: SocketHandle, endpoint: &str) -> Result<(), ErrorCode>;

    /// Send one frame. `SEND_MORE` marks that further frames of the same
    /// message follow; `DONT_WAIT` turns blocking into `WouldBlock`.
    ///
    /// Once the first frame of a message has been accepted, the remaining
    /// frames of that message must not block.
    fn send(&self, handle: SocketHandle, frame: Bytes, flags: Flags) -> Result<(), ErrorCode>;

    /// Receive one frame into `frame`, returning its size.
    fn recv(&self, handle: SocketHandle, frame: &mut Bytes, flags: Flags)
        -> Result<usize, ErrorCode>;

    /// Write an option from its native byte encoding.
    fn set_option(&self, handle: SocketHandle, option: i32, value: &[u8])
        -> Result<(), ErrorCode>;

    /// Read an option into `value`, returning the number of bytes written.
    fn get_option(&self, handle: SocketHandle, option: i32, value: &mut [u8])
        -> Result<usize, ErrorCode>;

    /// Wait until at least one item has an observed event matching its
    /// interest, or `timeout` elapses (`None` waits forever). Fills in every
    /// item's `revents` in one pass and returns how many items are ready.
    fn poll(&self, items: &mut [PollItem], timeout: Option<Duration>) -> Result<usize, ErrorCode>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_events() {
        let socket = Watched::Socket(SocketHandle::from_raw(1));
        let fd = Watched::Descriptor(0);
        assert_eq!(socket.default_events(), Events::IN);
        assert_eq!(fd.default_events(), Events::IN | Events::ERROR);
        assert!(!socket.supported_events().contains(Events::ERROR));
    }

    #[test]
    fn test_poll_item_starts_clear() {
        let item = PollItem::new(Watched::Descriptor(3), Events::OUT);
        assert_eq!(item.revents, Events::NONE);
        assert_eq!(item.watched.to_string(), "fd#3");
    }
}
