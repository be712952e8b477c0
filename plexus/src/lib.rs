//! # Plexus
//!
//! Move-only multipart message sockets and a poller that watches sockets
//! and raw OS descriptors together.
//!
//! ## Architecture
//!
//! - **`plexus-core`**: error taxonomy, flags, option tables, the
//!   `Transport` capability and an in-process engine implementing it
//! - **`plexus`**: the public API (this crate)
//!
//! Control flow is caller-driven. Nothing here spawns threads; the only
//! place a caller waits is [`Poller::poll`] or a blocking transfer.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use plexus::prelude::*;
//!
//! # fn main() -> plexus::Result<()> {
//! let ctx = Context::new();
//! let mut rep = Socket::new(&ctx, SocketType::Rep)?;
//! let mut req = Socket::new(&ctx, SocketType::Req)?;
//! rep.bind("inproc://echo")?;
//! req.connect("inproc://echo")?;
//!
//! let mut request = Message::new().push_str("ping");
//! req.send(&mut request, false)?;
//!
//! let mut poller = Poller::new(&ctx);
//! poller.watch(&rep)?;
//! if poller.poll(Some(Duration::from_secs(1)))? && poller.has_input(&rep)? {
//!     let mut incoming = Message::new();
//!     rep.receive(&mut incoming, true)?;
//!     rep.send(&mut incoming, true)?;
//! }
//!
//! let mut reply = Message::new();
//! req.receive(&mut reply, false)?;
//! assert_eq!(reply.get_str(0), Some("ping"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Would-block is never an error: non-blocking transfers report it as
//! `Ok(false)`. Everything else is a [`PlexusError`]; the `Transport` variant
//! carries the engine's native [`ErrorCode`].

#![warn(clippy::all)]

pub mod context;
pub mod dev_tracing;
pub mod poller;
pub mod socket;

// Re-export core types
pub use bytes::Bytes;
pub use context::Context;
pub use plexus_core::endpoint::Endpoint;
pub use plexus_core::error::{ErrorCode, PlexusError, Result};
pub use plexus_core::flags::{Events, Flags};
pub use plexus_core::inproc::InprocTransport;
pub use plexus_core::message::Message;
pub use plexus_core::options::{OptionKind, SocketOption, SocketOptions};
pub use plexus_core::socket_type::SocketType;
pub use plexus_core::transport::{Descriptor, PollItem, SocketHandle, Transport, Watched};
pub use poller::{Poller, Watchable, DEFAULT_FD_EVENTS, DEFAULT_SOCKET_EVENTS, WAIT_FOREVER};
pub use socket::Socket;

/// Commonly used types.
pub mod prelude {
    pub use crate::context::Context;
    pub use crate::poller::{Poller, Watchable, WAIT_FOREVER};
    pub use crate::socket::Socket;
    pub use plexus_core::error::{ErrorCode, PlexusError, Result};
    pub use plexus_core::flags::{Events, Flags};
    pub use plexus_core::message::Message;
    pub use plexus_core::options::{OptionKind, SocketOption};
    pub use plexus_core::socket_type::SocketType;
}
