//! Socket options
//!
//! Native option tables are untyped: a key plus a byte buffer. This module
//! gives every key exactly one value category so the socket layer can reject
//! mismatched accesses before anything reaches the Transport, and provides
//! the `SocketOptions` table a Transport keeps per handle.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::error::ErrorCode;

/// Value category of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    /// Signed 32-bit integer
    Int,
    /// Boolean, carried natively as a 32-bit integer 0 / 1
    Bool,
    /// Unsigned 64-bit integer
    U64,
    /// Byte string
    String,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "integer",
            Self::Bool => "boolean",
            Self::U64 => "unsigned 64-bit integer",
            Self::String => "string",
        })
    }
}

/// Whether an option may be read, written, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Socket option keys.
///
/// Discriminants are the native numeric keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SocketOption {
    /// I/O thread affinity bitmap (ZMQ_AFFINITY)
    Affinity = 4,
    /// Socket identity used by ROUTER peers (ZMQ_IDENTITY)
    Identity = 5,
    /// Add a topic prefix filter (ZMQ_SUBSCRIBE)
    Subscribe = 6,
    /// Remove a topic prefix filter (ZMQ_UNSUBSCRIBE)
    Unsubscribe = 7,
    /// Multicast data rate in kbit/s (ZMQ_RATE)
    Rate = 8,
    /// Multicast recovery interval in ms (ZMQ_RECOVERY_IVL)
    RecoveryInterval = 9,
    /// Kernel send buffer size (ZMQ_SNDBUF)
    SendBufferSize = 11,
    /// Kernel receive buffer size (ZMQ_RCVBUF)
    ReceiveBufferSize = 12,
    /// More frames of the current message are pending (ZMQ_RCVMORE)
    ReceiveMore = 13,
    /// Current readiness as an event mask (ZMQ_EVENTS)
    Events = 15,
    /// Socket kind code (ZMQ_TYPE)
    Type = 16,
    /// Linger period in ms, -1 waits forever (ZMQ_LINGER)
    Linger = 17,
    /// Reconnection interval in ms (ZMQ_RECONNECT_IVL)
    ReconnectInterval = 18,
    /// Pending connection queue length (ZMQ_BACKLOG)
    Backlog = 19,
    /// Maximum reconnection interval in ms (ZMQ_RECONNECT_IVL_MAX)
    ReconnectIntervalMax = 21,
    /// Largest accepted inbound frame, -1 for no limit (ZMQ_MAXMSGSIZE)
    MaxMessageSize = 22,
    /// Outbound high water mark in messages (ZMQ_SNDHWM)
    SendHighWaterMark = 23,
    /// Inbound high water mark in messages (ZMQ_RCVHWM)
    ReceiveHighWaterMark = 24,
    /// Multicast hop limit (ZMQ_MULTICAST_HOPS)
    MulticastHops = 25,
    /// Receive timeout in ms, -1 blocks forever (ZMQ_RCVTIMEO)
    ReceiveTimeout = 27,
    /// Send timeout in ms, -1 blocks forever (ZMQ_SNDTIMEO)
    SendTimeout = 28,
    /// Restrict TCP to IPv4 (ZMQ_IPV4ONLY)
    Ipv4Only = 31,
}

impl SocketOption {
    /// Every known option.
    pub const ALL: [SocketOption; 22] = [
        Self::Affinity,
        Self::Identity,
        Self::Subscribe,
        Self::Unsubscribe,
        Self::Rate,
        Self::RecoveryInterval,
        Self::SendBufferSize,
        Self::ReceiveBufferSize,
        Self::ReceiveMore,
        Self::Events,
        Self::Type,
        Self::Linger,
        Self::ReconnectInterval,
        Self::Backlog,
        Self::ReconnectIntervalMax,
        Self::MaxMessageSize,
        Self::SendHighWaterMark,
        Self::ReceiveHighWaterMark,
        Self::MulticastHops,
        Self::ReceiveTimeout,
        Self::SendTimeout,
        Self::Ipv4Only,
    ];

    /// Native numeric key.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Look an option up by its native key.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|o| o.code() == code)
    }

    /// The single value category this option belongs to.
    pub const fn kind(self) -> OptionKind {
        match self {
            Self::Affinity => OptionKind::U64,
            Self::Identity | Self::Subscribe | Self::Unsubscribe => OptionKind::String,
            Self::ReceiveMore | Self::Ipv4Only => OptionKind::Bool,
            _ => OptionKind::Int,
        }
    }

    pub const fn access(self) -> Access {
        match self {
            Self::ReceiveMore | Self::Events | Self::Type => Access::ReadOnly,
            Self::Subscribe | Self::Unsubscribe => Access::WriteOnly,
            _ => Access::ReadWrite,
        }
    }

    pub const fn is_readable(self) -> bool {
        !matches!(self.access(), Access::WriteOnly)
    }

    pub const fn is_writable(self) -> bool {
        !matches!(self.access(), Access::ReadOnly)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Affinity => "affinity",
            Self::Identity => "identity",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Rate => "rate",
            Self::RecoveryInterval => "recovery_interval",
            Self::SendBufferSize => "send_buffer_size",
            Self::ReceiveBufferSize => "receive_buffer_size",
            Self::ReceiveMore => "receive_more",
            Self::Events => "events",
            Self::Type => "type",
            Self::Linger => "linger",
            Self::ReconnectInterval => "reconnect_interval",
            Self::Backlog => "backlog",
            Self::ReconnectIntervalMax => "reconnect_interval_max",
            Self::MaxMessageSize => "max_message_size",
            Self::SendHighWaterMark => "send_high_water_mark",
            Self::ReceiveHighWaterMark => "receive_high_water_mark",
            Self::MulticastHops => "multicast_hops",
            Self::ReceiveTimeout => "receive_timeout",
            Self::SendTimeout => "send_timeout",
            Self::Ipv4Only => "ipv4_only",
        }
    }
}

impl fmt::Display for SocketOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Largest buffer a string option read may fill.
pub const MAX_OPTION_BUFFER_SIZE: usize = 256;

/// A value that can be written through the typed option setter.
pub trait SetOptionValue {
    /// Category this value belongs to.
    const KIND: OptionKind;

    /// Native byte encoding handed to the Transport.
    fn encode(&self) -> Vec<u8>;
}

/// A value that can be read through the typed option getter.
pub trait GetOptionValue: Sized {
    /// Category this value belongs to.
    const KIND: OptionKind;

    /// Decode the Transport's native bytes; `None` on a size mismatch.
    fn decode(raw: &[u8]) -> Option<Self>;
}

impl SetOptionValue for i32 {
    const KIND: OptionKind = OptionKind::Int;

    fn encode(&self) -> Vec<u8> {
        self.to_ne_bytes().to_vec()
    }
}

impl GetOptionValue for i32 {
    const KIND: OptionKind = OptionKind::Int;

    fn decode(raw: &[u8]) -> Option<Self> {
        Some(i32::from_ne_bytes(raw.try_into().ok()?))
    }
}

impl SetOptionValue for bool {
    const KIND: OptionKind = OptionKind::Bool;

    fn encode(&self) -> Vec<u8> {
        i32::from(*self).to_ne_bytes().to_vec()
    }
}

impl GetOptionValue for bool {
    const KIND: OptionKind = OptionKind::Bool;

    fn decode(raw: &[u8]) -> Option<Self> {
        i32::decode(raw).map(|v| v == 1)
    }
}

impl SetOptionValue for u64 {
    const KIND: OptionKind = OptionKind::U64;

    fn encode(&self) -> Vec<u8> {
        self.to_ne_bytes().to_vec()
    }
}

impl GetOptionValue for u64 {
    const KIND: OptionKind = OptionKind::U64;

    fn decode(raw: &[u8]) -> Option<Self> {
        Some(u64::from_ne_bytes(raw.try_into().ok()?))
    }
}

impl SetOptionValue for &str {
    const KIND: OptionKind = OptionKind::String;

    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl SetOptionValue for String {
    const KIND: OptionKind = OptionKind::String;

    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl GetOptionValue for String {
    const KIND: OptionKind = OptionKind::String;

    fn decode(raw: &[u8]) -> Option<Self> {
        String::from_utf8(raw.to_vec()).ok()
    }
}

impl SetOptionValue for &[u8] {
    const KIND: OptionKind = OptionKind::String;

    fn encode(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl GetOptionValue for Vec<u8> {
    const KIND: OptionKind = OptionKind::String;

    fn decode(raw: &[u8]) -> Option<Self> {
        Some(raw.to_vec())
    }
}

/// Per-handle option table kept by a Transport.
///
/// Holds every stored option in its Rust form. Options whose value is
/// derived from live socket state (`Type`, `ReceiveMore`, `Events`) or that
/// act as commands (`Subscribe`, `Unsubscribe`) are not stored here.
///
/// # Examples
///
/// ```
/// use plexus_core::options::SocketOptions;
/// use std::time::Duration;
///
/// let opts = SocketOptions::default()
///     .with_recv_timeout(Duration::from_secs(5))
///     .with_send_hwm(10);
/// ```
#[derive(Debug, Clone)]
pub struct SocketOptions {
    /// I/O thread affinity bitmap
    pub affinity: u64,

    /// Socket identity presented to ROUTER peers.
    /// - `None`: the peer generates one (default)
    pub routing_id: Option<Bytes>,

    /// Multicast rate in kbit/s
    pub rate: i32,

    /// Multicast recovery interval
    pub recovery_ivl: Duration,

    /// Kernel send buffer size, 0 keeps the OS default
    pub sndbuf: i32,

    /// Kernel receive buffer size, 0 keeps the OS default
    pub rcvbuf: i32,

    /// Linger period on close.
    /// - `None`: wait forever (default)
    pub linger: Option<Duration>,

    /// Initial reconnection delay
    pub reconnect_ivl: Duration,

    /// Maximum reconnection delay, zero disables backoff
    pub reconnect_ivl_max: Duration,

    /// Pending connection queue length
    pub backlog: i32,

    /// Largest accepted inbound frame.
    /// - `None`: no limit (default)
    pub max_msg_size: Option<usize>,

    /// Outbound queue limit in messages, 0 for no limit
    pub send_hwm: usize,

    /// Inbound queue limit in messages, 0 for no limit
    pub recv_hwm: usize,

    /// Multicast hop limit
    pub multicast_hops: i32,

    /// Receive timeout.
    /// - `None`: block indefinitely (default)
    /// - `Some(Duration::ZERO)`: never block
    pub recv_timeout: Option<Duration>,

    /// Send timeout.
    /// - `None`: block indefinitely (default)
    /// - `Some(Duration::ZERO)`: never block
    pub send_timeout: Option<Duration>,

    /// Restrict TCP endpoints to IPv4
    pub ipv4_only: bool,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            affinity: 0,
            routing_id: None,
            rate: 100,
            recovery_ivl: Duration::from_secs(10),
            sndbuf: 0,
            rcvbuf: 0,
            linger: None,
            reconnect_ivl: Duration::from_millis(100),
            reconnect_ivl_max: Duration::ZERO,
            backlog: 100,
            max_msg_size: None,
            send_hwm: 1000,
            recv_hwm: 1000,
            multicast_hops: 1,
            recv_timeout: None,
            send_timeout: None,
            ipv4_only: true,
        }
    }
}

impl SocketOptions {
    /// Create new socket options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set receive timeout.
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout = Some(timeout);
        self
    }

    /// Set send timeout.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Set linger period.
    pub fn with_linger(mut self, linger: Option<Duration>) -> Self {
        self.linger = linger;
        self
    }

    /// Set receive high water mark.
    pub fn with_recv_hwm(mut self, hwm: usize) -> Self {
        self.recv_hwm = hwm;
        self
    }

    /// Set send high water mark.
    pub fn with_send_hwm(mut self, hwm: usize) -> Self {
        self.send_hwm = hwm;
        self
    }

    /// Set maximum inbound frame size.
    pub fn with_max_msg_size(mut self, size: Option<usize>) -> Self {
        self.max_msg_size = size;
        self
    }

    /// Set socket identity.
    pub fn with_routing_id(mut self, id: Bytes) -> Self {
        self.routing_id = Some(id);
        self
    }

    /// Validate a socket identity.
    ///
    /// Identities are at most 255 bytes and may not start with a null byte,
    /// which is reserved for generated identities.
    pub fn validate_routing_id(id: &[u8]) -> Result<(), ErrorCode> {
        if id.len() > 255 || id.first() == Some(&0x00) {
            return Err(ErrorCode::InvalidOption);
        }
        Ok(())
    }

    /// Store a natively encoded value.
    ///
    /// # Errors
    ///
    /// `InvalidOption` if the option is not stored in this table, the buffer
    /// has the wrong size, or the value is out of range.
    pub fn set_raw(&mut self, option: SocketOption, raw: &[u8]) -> Result<(), ErrorCode> {
        match option {
            SocketOption::Affinity => self.affinity = decode::<u64>(raw)?,
            SocketOption::Identity => {
                Self::validate_routing_id(raw)?;
                self.routing_id = (!raw.is_empty()).then(|| Bytes::copy_from_slice(raw));
            }
            SocketOption::Ipv4Only => {
                self.ipv4_only = match decode::<i32>(raw)? {
                    0 => false,
                    1 => true,
                    _ => return Err(ErrorCode::InvalidOption),
                }
            }
            SocketOption::Rate => self.rate = positive(decode(raw)?)?,
            SocketOption::RecoveryInterval => {
                self.recovery_ivl = millis(non_negative(decode(raw)?)?);
            }
            SocketOption::SendBufferSize => self.sndbuf = non_negative(decode(raw)?)?,
            SocketOption::ReceiveBufferSize => self.rcvbuf = non_negative(decode(raw)?)?,
            SocketOption::Linger => self.linger = optional_millis(decode(raw)?)?,
            SocketOption::ReconnectInterval => {
                self.reconnect_ivl = millis(non_negative(decode(raw)?)?);
            }
            SocketOption::ReconnectIntervalMax => {
                self.reconnect_ivl_max = millis(non_negative(decode(raw)?)?);
            }
            SocketOption::Backlog => self.backlog = non_negative(decode(raw)?)?,
            SocketOption::MaxMessageSize => {
                self.max_msg_size = match decode::<i32>(raw)? {
                    -1 => None,
                    v => Some(non_negative(v)? as usize),
                }
            }
            SocketOption::SendHighWaterMark => {
                self.send_hwm = non_negative(decode(raw)?)? as usize;
            }
            SocketOption::ReceiveHighWaterMark => {
                self.recv_hwm = non_negative(decode(raw)?)? as usize;
            }
            SocketOption::MulticastHops => self.multicast_hops = positive(decode(raw)?)?,
            SocketOption::ReceiveTimeout => self.recv_timeout = optional_millis(decode(raw)?)?,
            SocketOption::SendTimeout => self.send_timeout = optional_millis(decode(raw)?)?,
            SocketOption::Subscribe
            | SocketOption::Unsubscribe
            | SocketOption::ReceiveMore
            | SocketOption::Events
            | SocketOption::Type => return Err(ErrorCode::InvalidOption),
        }
        Ok(())
    }

    /// Read a stored value in its native encoding.
    ///
    /// # Errors
    ///
    /// `InvalidOption` if the option is not stored in this table.
    pub fn get_raw(&self, option: SocketOption) -> Result<Vec<u8>, ErrorCode> {
        let int = |v: i32| -> Result<Vec<u8>, ErrorCode> { Ok(v.to_ne_bytes().to_vec()) };
        match option {
            SocketOption::Affinity => Ok(self.affinity.to_ne_bytes().to_vec()),
            SocketOption::Identity => Ok(self
                .routing_id
                .as_ref()
                .map(|id| id.to_vec())
                .unwrap_or_default()),
            SocketOption::Ipv4Only => int(i32::from(self.ipv4_only)),
            SocketOption::Rate => int(self.rate),
            SocketOption::RecoveryInterval => int(as_millis(self.recovery_ivl)),
            SocketOption::SendBufferSize => int(self.sndbuf),
            SocketOption::ReceiveBufferSize => int(self.rcvbuf),
            SocketOption::Linger => int(self.linger.map_or(-1, as_millis)),
            SocketOption::ReconnectInterval => int(as_millis(self.reconnect_ivl)),
            SocketOption::ReconnectIntervalMax => int(as_millis(self.reconnect_ivl_max)),
            SocketOption::Backlog => int(self.backlog),
            SocketOption::MaxMessageSize => {
                int(self.max_msg_size.map_or(-1, |v| i32::try_from(v).unwrap_or(i32::MAX)))
            }
            SocketOption::SendHighWaterMark => int(saturating_i32(self.send_hwm)),
            SocketOption::ReceiveHighWaterMark => int(saturating_i32(self.recv_hwm)),
            SocketOption::MulticastHops => int(self.multicast_hops),
            SocketOption::ReceiveTimeout => int(self.recv_timeout.map_or(-1, as_millis)),
            SocketOption::SendTimeout => int(self.send_timeout.map_or(-1, as_millis)),
            SocketOption::Subscribe
            | SocketOption::Unsubscribe
            | SocketOption::ReceiveMore
            | SocketOption::Events
            | SocketOption::Type => Err(ErrorCode::InvalidOption),
        }
    }
}

fn decode<T: GetOptionValue>(raw: &[u8]) -> Result<T, ErrorCode> {
    T::decode(raw).ok_or(ErrorCode::InvalidOption)
}

fn non_negative(v: i32) -> Result<i32, ErrorCode> {
    if v < 0 {
        return Err(ErrorCode::InvalidOption);
    }
    Ok(v)
}

fn positive(v: i32) -> Result<i32, ErrorCode> {
    if v <= 0 {
        return Err(ErrorCode::InvalidOption);
    }
    Ok(v)
}

fn millis(v: i32) -> Duration {
    Duration::from_millis(v as u64)
}

/// -1 means "no limit"; any other negative value is rejected.
fn optional_millis(v: i32) -> Result<Option<Duration>, ErrorCode> {
    match v {
        -1 => Ok(None),
        v => Ok(Some(millis(non_negative(v)?))),
    }
}

fn as_millis(d: Duration) -> i32 {
    i32::try_from(d.as_millis()).unwrap_or(i32::MAX)
}

fn saturating_i32(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = SocketOptions::default();
        assert!(opts.recv_timeout.is_none());
        assert!(opts.send_timeout.is_none());
        assert_eq!(opts.reconnect_ivl, Duration::from_millis(100));
        assert_eq!(opts.recv_hwm, 1000);
        assert_eq!(opts.send_hwm, 1000);
    }

    #[test]
    fn test_builder_pattern() {
        let opts = SocketOptions::new()
            .with_recv_timeout(Duration::from_secs(5))
            .with_send_timeout(Duration::from_secs(10))
            .with_recv_hwm(2000);

        assert_eq!(opts.recv_timeout, Some(Duration::from_secs(5)));
        assert_eq!(opts.send_timeout, Some(Duration::from_secs(10)));
        assert_eq!(opts.recv_hwm, 2000);
    }

    #[test]
    fn test_every_option_has_one_kind() {
        for option in SocketOption::ALL {
            assert_eq!(SocketOption::from_code(option.code()), Some(option));
        }
        assert_eq!(SocketOption::Identity.kind(), OptionKind::String);
        assert_eq!(SocketOption::Affinity.kind(), OptionKind::U64);
        assert_eq!(SocketOption::ReceiveMore.kind(), OptionKind::Bool);
        assert_eq!(SocketOption::Linger.kind(), OptionKind::Int);
        assert_eq!(SocketOption::from_code(14), None);
    }

    #[test]
    fn test_access_modes() {
        assert!(!SocketOption::Type.is_writable());
        assert!(!SocketOption::Subscribe.is_readable());
        assert!(SocketOption::Linger.is_readable() && SocketOption::Linger.is_writable());
    }

    #[test]
    fn test_raw_round_trip() {
        let mut opts = SocketOptions::new();
        opts.set_raw(SocketOption::ReceiveTimeout, &250i32.encode()).unwrap();
        assert_eq!(opts.recv_timeout, Some(Duration::from_millis(250)));
        assert_eq!(
            i32::decode(&opts.get_raw(SocketOption::ReceiveTimeout).unwrap()),
            Some(250)
        );

        opts.set_raw(SocketOption::ReceiveTimeout, &(-1i32).encode()).unwrap();
        assert_eq!(opts.recv_timeout, None);

        opts.set_raw(SocketOption::Affinity, &3u64.encode()).unwrap();
        assert_eq!(opts.affinity, 3);
    }

    #[test]
    fn test_raw_rejects_bad_values() {
        let mut opts = SocketOptions::new();
        // wrong width
        assert_eq!(
            opts.set_raw(SocketOption::Linger, &7u64.encode()),
            Err(ErrorCode::InvalidOption)
        );
        assert_eq!(
            opts.set_raw(SocketOption::SendTimeout, &(-5i32).encode()),
            Err(ErrorCode::InvalidOption)
        );
        assert_eq!(
            opts.set_raw(SocketOption::Type, &1i32.encode()),
            Err(ErrorCode::InvalidOption)
        );
    }

    #[test]
    fn test_routing_id_validation() {
        assert!(SocketOptions::validate_routing_id(b"client-001").is_ok());
        assert!(SocketOptions::validate_routing_id(&[0x01; 255]).is_ok());
        assert!(SocketOptions::validate_routing_id(&[0x01; 256]).is_err());
        assert!(SocketOptions::validate_routing_id(b"\x00client").is_err());
    }

    #[test]
    fn test_bool_encoding() {
        assert_eq!(true.encode(), 1i32.to_ne_bytes().to_vec());
        assert_eq!(bool::decode(&0i32.to_ne_bytes()), Some(false));
        assert_eq!(bool::decode(&[1u8]), None);
    }
}
