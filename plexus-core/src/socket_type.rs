//! Socket kind tags.
//!
//! A socket's kind is fixed when the handle is opened and decides which
//! peers it may talk to and in which directions frames may flow.

use std::fmt;

/// Socket kinds.
///
/// Discriminants follow the classic native numbering so the value read
/// back through the `Type` option matches what other bindings report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SocketType {
    /// Exclusive bidirectional link with a single peer
    Pair = 0,

    /// Publisher, fans messages out to matching subscribers
    Pub = 1,

    /// Subscriber, receives messages matching its topic filters
    Sub = 2,

    /// Request side of a strict request/reply exchange
    Req = 3,

    /// Reply side of a strict request/reply exchange
    Rep = 4,

    /// Asynchronous request side, round-robin outbound
    Dealer = 5,

    /// Identity-addressed server side
    Router = 6,

    /// Pipeline sink
    Pull = 7,

    /// Pipeline source, round-robin outbound
    Push = 8,
}

impl SocketType {
    /// Get the socket type as a string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pair => "PAIR",
            Self::Pub => "PUB",
            Self::Sub => "SUB",
            Self::Req => "REQ",
            Self::Rep => "REP",
            Self::Dealer => "DEALER",
            Self::Router => "ROUTER",
            Self::Pull => "PULL",
            Self::Push => "PUSH",
        }
    }

    /// Numeric code of this kind.
    pub const fn code(&self) -> i32 {
        *self as i32
    }

    /// Look a kind up by its numeric code.
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Pair,
            1 => Self::Pub,
            2 => Self::Sub,
            3 => Self::Req,
            4 => Self::Rep,
            5 => Self::Dealer,
            6 => Self::Router,
            7 => Self::Pull,
            8 => Self::Push,
            _ => return None,
        })
    }

    /// Whether sockets of this kind may send frames.
    pub const fn can_send(&self) -> bool {
        !matches!(self, Self::Sub | Self::Pull)
    }

    /// Whether sockets of this kind may receive frames.
    pub const fn can_receive(&self) -> bool {
        !matches!(self, Self::Pub | Self::Push)
    }

    /// Check if this socket type is compatible with the given peer type.
    pub fn is_compatible(&self, peer: SocketType) -> bool {
        matches!(
            (self, peer),
            (Self::Pair, Self::Pair)
                | (Self::Pub, Self::Sub)
                | (Self::Sub, Self::Pub)
                | (Self::Req, Self::Rep)
                | (Self::Rep, Self::Req)
                | (Self::Req, Self::Router)
                | (Self::Router, Self::Req)
                | (Self::Dealer, Self::Rep)
                | (Self::Rep, Self::Dealer)
                | (Self::Dealer, Self::Router)
                | (Self::Router, Self::Dealer)
                | (Self::Dealer, Self::Dealer)
                | (Self::Router, Self::Router)
                | (Self::Push, Self::Pull)
                | (Self::Pull, Self::Push)
        )
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
