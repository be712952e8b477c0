//! Plexus Core
//!
//! This crate contains the building blocks underneath the plexus sockets:
//! - Error types (`error`)
//! - Send / receive flags and readiness events (`flags`)
//! - Socket kinds and their compatibility table (`socket_type`)
//! - Typed option keys and the per-handle option table (`options`)
//! - Multipart messages (`message`)
//! - Endpoint descriptors (`endpoint`)
//! - The Transport capability and readiness items (`transport`)
//! - An in-process Transport (`inproc`)
//! - PUB/SUB prefix index (`pubsub`)

// Only descriptor polling talks to the OS directly
#![cfg_attr(not(test), deny(unsafe_code))]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::match_same_arms)]
pub mod endpoint;
pub mod error;
pub mod flags;
pub mod inproc;
pub mod message;
pub mod options;
pub mod socket_type;
pub mod transport;

pub mod pubsub {
    pub mod index;
}

// Keep it minimal to avoid API lock-in.
pub mod prelude {
    pub use crate::endpoint::Endpoint;
    pub use crate::error::{ErrorCode, PlexusError, Result};
    pub use crate::flags::{Events, Flags};
    pub use crate::inproc::InprocTransport;
    pub use crate::message::Message;
    pub use crate::options::{OptionKind, SocketOption, SocketOptions};
    pub use crate::socket_type::SocketType;
    pub use crate::transport::{Descriptor, PollItem, SocketHandle, Transport, Watched};
}
