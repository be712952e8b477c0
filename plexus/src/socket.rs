//! Message socket.
//!
//! A [`Socket`] owns exactly one Transport handle. It cannot be cloned;
//! ownership moves with the value, and [`Socket::take`] moves it out of a
//! place explicitly, leaving an invalid socket behind.

use std::fmt;
use std::mem;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, trace, warn};

use plexus_core::error::{ErrorCode, PlexusError, Result};
use plexus_core::flags::Flags;
use plexus_core::message::Message;
use plexus_core::options::{
    GetOptionValue, OptionKind, SetOptionValue, SocketOption, MAX_OPTION_BUFFER_SIZE,
};
use plexus_core::socket_type::SocketType;
use plexus_core::transport::{SocketHandle, Transport};

use crate::context::Context;

/// A move-only message socket.
///
/// Sockets send and receive multipart [`Message`]s. In non-blocking mode a
/// transfer that cannot start immediately returns `Ok(false)`; it is never
/// reported as an error.
///
/// ## Example
///
/// ```
/// use plexus::prelude::*;
///
/// # fn main() -> plexus::Result<()> {
/// let ctx = Context::new();
/// let mut server = Socket::new(&ctx, SocketType::Pair)?;
/// let mut client = Socket::new(&ctx, SocketType::Pair)?;
/// server.bind("inproc://doc-socket")?;
/// client.connect("inproc://doc-socket")?;
///
/// let mut request = Message::new().push_str("hello").push_str("world");
/// assert!(client.send(&mut request, false)?);
/// assert!(request.is_empty());
///
/// let mut reply = Message::new();
/// assert!(server.receive(&mut reply, false)?);
/// assert_eq!(reply.get_str(1), Some("world"));
/// # Ok(())
/// # }
/// ```
pub struct Socket {
    transport: Arc<dyn Transport>,
    handle: Option<SocketHandle>,
    kind: SocketType,
    /// Scratch buffer every receive lands in first.
    frame: Bytes,
}

impl Socket {
    /// Open a socket of `kind` on the context's Transport.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the engine cannot allocate a handle.
    pub fn new(context: &Context, kind: SocketType) -> Result<Self> {
        let transport = Arc::clone(context.transport());
        let handle = transport.open(kind)?;
        debug!("[SOCKET] opened {} as {}", kind, handle);

        Ok(Self {
            transport,
            handle: Some(handle),
            kind,
            frame: Bytes::new(),
        })
    }

    /// The kind this socket was created with.
    #[must_use]
    pub fn kind(&self) -> SocketType {
        self.kind
    }

    /// The Transport handle, `None` once closed or moved from.
    #[must_use]
    pub fn handle(&self) -> Option<SocketHandle> {
        self.handle
    }

    /// Whether the socket still owns a handle.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    fn live(&self) -> Result<SocketHandle> {
        self.handle
            .ok_or(PlexusError::Transport(ErrorCode::NotSocket))
    }

    /// Move the handle and the receive buffer into a new socket.
    ///
    /// `self` is left invalid: every later operation on it fails with
    /// `NotSocket`, and dropping it releases nothing.
    ///
    /// ```
    /// use plexus::prelude::*;
    ///
    /// let ctx = Context::new();
    /// let mut a = Socket::new(&ctx, SocketType::Push).unwrap();
    /// let handle = a.handle();
    ///
    /// let b = a.take();
    /// assert!(!a.is_valid());
    /// assert_eq!(b.handle(), handle);
    /// ```
    #[must_use]
    pub fn take(&mut self) -> Socket {
        Socket {
            transport: Arc::clone(&self.transport),
            handle: self.handle.take(),
            kind: self.kind,
            frame: mem::take(&mut self.frame),
        }
    }

    /// Bind to an endpoint descriptor such as `inproc://name`.
    ///
    /// # Errors
    ///
    /// Returns `Transport` with the engine's code, e.g. `AddrInUse` when the
    /// endpoint is taken or `InvalidEndpoint` when it cannot be parsed.
    pub fn bind(&mut self, endpoint: &str) -> Result<()> {
        let handle = self.live()?;
        self.transport.bind(handle, endpoint)?;
        debug!("[SOCKET] {} bound to {}", handle, endpoint);
        Ok(())
    }

    /// Connect to an endpoint descriptor.
    ///
    /// # Errors
    ///
    /// Returns `Transport` with the engine's code, e.g. `ConnectionRefused`
    /// when nothing is bound at the endpoint.
    pub fn connect(&mut self, endpoint: &str) -> Result<()> {
        let handle = self.live()?;
        self.transport.connect(handle, endpoint)?;
        debug!("[SOCKET] {} connected to {}", handle, endpoint);
        Ok(())
    }

    /// Connect to every endpoint in order, stopping at the first failure.
    pub fn connect_all<I, E>(&mut self, endpoints: I) -> Result<()>
    where
        I: IntoIterator<Item = E>,
        E: AsRef<str>,
    {
        for endpoint in endpoints {
            self.connect(endpoint.as_ref())?;
        }
        Ok(())
    }

    /// Release the handle now.
    ///
    /// The socket is invalid afterwards whether or not the Transport
    /// reported an error.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the engine fails to release the handle, or
    /// `NotSocket` if the socket was already invalid.
    pub fn close(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or(ErrorCode::NotSocket)?;
        self.transport.close(handle)?;
        debug!("[SOCKET] closed {}", handle);
        Ok(())
    }

    /// Send a multipart message.
    ///
    /// The message is swapped out before the first part is handed over, so
    /// `message` is empty when this returns, whatever the outcome. Every part
    /// but the last carries `SEND_MORE`.
    ///
    /// Returns `Ok(false)` when the first part would block (with
    /// `non_blocking`, or when a send timeout expires) and `Ok(true)` once all
    /// parts were handed over.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the message has no parts. Nothing is sent and
    ///   the message is left untouched.
    /// - `Transport` for any other engine failure, including a would-block
    ///   after the first part, which the engine must never report.
    pub fn send(&mut self, message: &mut Message, non_blocking: bool) -> Result<bool> {
        if message.is_empty() {
            return Err(PlexusError::invalid_argument(
                "sending requires a message with at least one part",
            ));
        }
        let handle = self.live()?;

        let parts = message.take().into_parts();
        let total = parts.len();
        let base = if non_blocking {
            Flags::DONT_WAIT
        } else {
            Flags::NORMAL
        };

        for (i, part) in parts.into_iter().enumerate() {
            let flags = if i + 1 < total {
                base | Flags::SEND_MORE
            } else {
                base
            };

            match self.transport.send(handle, part, flags) {
                Ok(()) => {}
                Err(code) if i == 0 && code.is_would_block() => {
                    trace!("[SOCKET] {} send would block", handle);
                    return Ok(false);
                }
                Err(code) => {
                    if i > 0 {
                        error!(
                            "[SOCKET] {} failed on part {} of {}: {}",
                            handle,
                            i + 1,
                            total,
                            code
                        );
                    }
                    return Err(code.into());
                }
            }
        }

        trace!("[SOCKET] {} sent {} parts", handle, total);
        Ok(true)
    }

    /// Receive a complete multipart message into an empty `message`.
    ///
    /// Frames land in the socket's scratch buffer and are moved into
    /// `message` one by one until the Transport reports no more parts.
    ///
    /// Returns `Ok(false)` if the first frame would block.
    ///
    /// # Errors
    ///
    /// - `State` if `message` is not empty. The Transport is not called.
    /// - `Transport` for any other engine failure. A failure after the first
    ///   frame leaves the frames received so far in `message`.
    pub fn receive(&mut self, message: &mut Message, non_blocking: bool) -> Result<bool> {
        if !message.is_empty() {
            return Err(PlexusError::state(
                "receiving can only be done into an empty message",
            ));
        }
        let handle = self.live()?;
        let flags = if non_blocking {
            Flags::DONT_WAIT
        } else {
            Flags::NORMAL
        };

        loop {
            if let Err(code) = self.transport.recv(handle, &mut self.frame, flags) {
                if message.is_empty() && code.is_would_block() {
                    return Ok(false);
                }
                if !message.is_empty() {
                    error!(
                        "[SOCKET] {} failed after {} parts: {}",
                        handle,
                        message.parts(),
                        code
                    );
                }
                return Err(code.into());
            }

            message.add(mem::take(&mut self.frame));
            if !self.has_more_parts()? {
                trace!("[SOCKET] {} received {} parts", handle, message.parts());
                return Ok(true);
            }
        }
    }

    /// Send one string frame with explicit flags.
    ///
    /// No multipart bookkeeping is done; pass `SEND_MORE` to frame manually.
    /// Returns `Ok(false)` if the frame would block.
    pub fn send_str(&mut self, text: &str, flags: Flags) -> Result<bool> {
        self.send_frame(Bytes::copy_from_slice(text.as_bytes()), flags)
    }

    /// Send one raw frame with explicit flags.
    pub fn send_raw(&mut self, data: &[u8], flags: Flags) -> Result<bool> {
        self.send_frame(Bytes::copy_from_slice(data), flags)
    }

    fn send_frame(&mut self, frame: Bytes, flags: Flags) -> Result<bool> {
        let handle = self.live()?;
        match self.transport.send(handle, frame, flags) {
            Ok(()) => Ok(true),
            Err(code) if code.is_would_block() => Ok(false),
            Err(code) => Err(code.into()),
        }
    }

    /// Receive one frame as a string, replacing the contents of `text`.
    ///
    /// Returns `Ok(false)` if no frame is available without blocking.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the frame is not valid UTF-8; the frame is
    /// consumed and `text` is left unchanged.
    pub fn receive_string(&mut self, text: &mut String, flags: Flags) -> Result<bool> {
        if !self.receive_frame(flags)? {
            return Ok(false);
        }
        let frame = mem::take(&mut self.frame);
        let decoded = std::str::from_utf8(&frame)
            .map_err(|e| PlexusError::invalid_argument(format!("frame is not UTF-8: {e}")))?;
        text.clear();
        text.push_str(decoded);
        Ok(true)
    }

    /// Receive one frame into a caller buffer.
    ///
    /// Returns the number of bytes copied, or `None` if no frame is
    /// available without blocking. A frame longer than `buf` is truncated
    /// silently; the excess is lost.
    pub fn receive_raw(&mut self, buf: &mut [u8], flags: Flags) -> Result<Option<usize>> {
        if !self.receive_frame(flags)? {
            return Ok(None);
        }
        let frame = mem::take(&mut self.frame);
        let copied = frame.len().min(buf.len());
        buf[..copied].copy_from_slice(&frame[..copied]);
        if copied < frame.len() {
            trace!("[SOCKET] truncated {} byte frame to {}", frame.len(), copied);
        }
        Ok(Some(copied))
    }

    fn receive_frame(&mut self, flags: Flags) -> Result<bool> {
        let handle = self.live()?;
        match self.transport.recv(handle, &mut self.frame, flags) {
            Ok(_) => Ok(true),
            Err(code) if code.is_would_block() => Ok(false),
            Err(code) => Err(code.into()),
        }
    }

    /// Add a topic prefix filter. Only SUB sockets act on it.
    pub fn subscribe(&mut self, topic: impl AsRef<[u8]>) -> Result<()> {
        self.set(SocketOption::Subscribe, topic.as_ref())
    }

    /// Remove a topic prefix filter.
    pub fn unsubscribe(&mut self, topic: impl AsRef<[u8]>) -> Result<()> {
        self.set(SocketOption::Unsubscribe, topic.as_ref())
    }

    /// Subscribe to every topic in `topics`, stopping at the first error.
    pub fn subscribe_all<I, T>(&mut self, topics: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        for topic in topics {
            self.subscribe(topic)?;
        }
        Ok(())
    }

    /// Drop every topic in `topics`, stopping at the first error.
    pub fn unsubscribe_all<I, T>(&mut self, topics: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        for topic in topics {
            self.unsubscribe(topic)?;
        }
        Ok(())
    }

    /// Whether the last received frame has more parts behind it.
    pub fn has_more_parts(&self) -> Result<bool> {
        self.get(SocketOption::ReceiveMore)
    }

    /// Write an option.
    ///
    /// The value type selects the category: `i32`, `bool`, `u64`, or a
    /// string (`&str`, `String`, `&[u8]`).
    ///
    /// ```
    /// use plexus::prelude::*;
    ///
    /// let ctx = Context::new();
    /// let mut socket = Socket::new(&ctx, SocketType::Dealer).unwrap();
    /// socket.set(SocketOption::Linger, 0).unwrap();
    /// socket.set(SocketOption::Identity, "worker-1").unwrap();
    ///
    /// let err = socket.set(SocketOption::Identity, 5).unwrap_err();
    /// assert!(matches!(err, PlexusError::TypeMismatch { .. }));
    /// ```
    ///
    /// # Errors
    ///
    /// - `TypeMismatch` if `option` belongs to another category.
    /// - `InvalidArgument` if `option` is read-only.
    /// - `Transport` if the engine rejects the value.
    pub fn set<V: SetOptionValue>(&mut self, option: SocketOption, value: V) -> Result<()> {
        check_kind(option, V::KIND)?;
        if !option.is_writable() {
            return Err(PlexusError::invalid_argument(format!(
                "option {option} is read-only"
            )));
        }
        let handle = self.live()?;
        self.transport
            .set_option(handle, option.code(), &value.encode())?;
        trace!("[SOCKET] {} set {}", handle, option);
        Ok(())
    }

    /// Read an option.
    ///
    /// # Errors
    ///
    /// - `TypeMismatch` if `option` belongs to another category than `V`.
    /// - `InvalidArgument` if `option` is write-only or the value cannot be
    ///   decoded as `V`.
    /// - `Transport` if the engine rejects the read.
    pub fn get<V: GetOptionValue>(&self, option: SocketOption) -> Result<V> {
        check_kind(option, V::KIND)?;
        if !option.is_readable() {
            return Err(PlexusError::invalid_argument(format!(
                "option {option} is write-only"
            )));
        }
        let handle = self.live()?;

        let mut buf = [0u8; MAX_OPTION_BUFFER_SIZE];
        let capacity = match V::KIND {
            OptionKind::Int | OptionKind::Bool => mem::size_of::<i32>(),
            OptionKind::U64 => mem::size_of::<u64>(),
            OptionKind::String => MAX_OPTION_BUFFER_SIZE,
        };
        let size = self
            .transport
            .get_option(handle, option.code(), &mut buf[..capacity])?;

        buf.get(..size)
            .and_then(V::decode)
            .ok_or_else(|| {
                PlexusError::invalid_argument(format!(
                    "option {option} could not be read as {}",
                    V::KIND
                ))
            })
    }
}

fn check_kind(option: SocketOption, found: OptionKind) -> Result<()> {
    let expected = option.kind();
    if expected != found {
        return Err(PlexusError::TypeMismatch {
            option,
            expected,
            found,
        });
    }
    Ok(())
}

impl Drop for Socket {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(code) = self.transport.close(handle) {
                warn!("[SOCKET] failed to close {} on drop: {}", handle, code);
            }
        }
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("kind", &self.kind)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
