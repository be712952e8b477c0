//! Readiness multiplexing over sockets and raw descriptors.
//!
//! A [`Poller`] keeps one flat table of watch entries and hands the whole
//! table to the Transport's readiness primitive in a single call. Two side
//! indices map a socket handle or a descriptor to its row.
//!
//! Entries are never removed. To stop watching something, set its interest
//! to [`Events::NONE`] with [`Poller::check_for`].

use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;
use tracing::{debug, trace};

use plexus_core::error::{ErrorCode, PlexusError, Result};
use plexus_core::flags::Events;
use plexus_core::transport::{Descriptor, PollItem, SocketHandle, Transport, Watched};

use crate::context::Context;
use crate::socket::Socket;

/// Timeout that makes [`Poller::poll`] wait until something is ready.
pub const WAIT_FOREVER: Option<Duration> = None;

/// Interest used by [`Poller::watch`] for sockets.
pub const DEFAULT_SOCKET_EVENTS: Events = Events::IN;

/// Interest used by [`Poller::watch`] for descriptors.
pub const DEFAULT_FD_EVENTS: Events = Events::IN.union(Events::ERROR);

/// Something a [`Poller`] can watch.
///
/// Implemented for `&Socket`, for raw descriptors and for [`Watched`]
/// itself. The poller only records the identity; it never owns what it
/// watches.
pub trait Watchable {
    /// Identity of the watched entity.
    ///
    /// # Errors
    ///
    /// `Transport(NotSocket)` for a socket that is closed or moved from.
    fn watched(&self) -> Result<Watched>;
}

impl Watchable for &Socket {
    fn watched(&self) -> Result<Watched> {
        self.handle()
            .map(Watched::Socket)
            .ok_or(PlexusError::Transport(ErrorCode::NotSocket))
    }
}

impl Watchable for Descriptor {
    fn watched(&self) -> Result<Watched> {
        Ok(Watched::Descriptor(*self))
    }
}

impl Watchable for Watched {
    fn watched(&self) -> Result<Watched> {
        Ok(*self)
    }
}

/// Mixed socket / descriptor poller.
///
/// ```
/// use std::time::Duration;
/// use plexus::prelude::*;
///
/// # fn main() -> plexus::Result<()> {
/// let ctx = Context::new();
/// let mut pull = Socket::new(&ctx, SocketType::Pull)?;
/// let mut push = Socket::new(&ctx, SocketType::Push)?;
/// pull.bind("inproc://doc-poller")?;
/// push.connect("inproc://doc-poller")?;
///
/// let mut poller = Poller::new(&ctx);
/// poller.add(&pull, Events::IN)?;
/// assert!(!poller.poll(Some(Duration::ZERO))?);
///
/// push.send_str("work", Flags::NORMAL)?;
/// assert!(poller.poll(WAIT_FOREVER)?);
/// assert!(poller.has_input(&pull)?);
/// # Ok(())
/// # }
/// ```
pub struct Poller {
    transport: Arc<dyn Transport>,
    items: Vec<PollItem>,
    index: HashMap<SocketHandle, usize>,
    fd_index: HashMap<Descriptor, usize>,
}

impl Poller {
    /// Create an empty poller on the context's Transport.
    #[must_use]
    pub fn new(context: &Context) -> Self {
        Self {
            transport: Arc::clone(context.transport()),
            items: Vec::new(),
            index: HashMap::new(),
            fd_index: HashMap::new(),
        }
    }

    /// Number of watch entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Start watching `target` for `events`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `target` is already watched, or if `events`
    ///   asks a socket for `ERROR`.
    /// - `Transport(NotSocket)` for an invalid socket.
    pub fn add<W: Watchable>(&mut self, target: W, events: Events) -> Result<()> {
        let watched = target.watched()?;
        check_interest(watched, events)?;
        if self.row(watched).is_some() {
            return Err(PlexusError::invalid_argument(format!(
                "{watched} is already being polled"
            )));
        }

        let row = self.items.len();
        match watched {
            Watched::Socket(handle) => {
                self.index.insert(handle, row);
            }
            Watched::Descriptor(fd) => {
                self.fd_index.insert(fd, row);
            }
        }
        self.items.push(PollItem::new(watched, events));

        debug!("[POLLER] watching {} for {}", watched, events);
        Ok(())
    }

    /// Start watching `target` with its default interest: `IN` for sockets,
    /// `IN | ERROR` for descriptors.
    pub fn watch<W: Watchable>(&mut self, target: W) -> Result<()> {
        let watched = target.watched()?;
        self.add(watched, watched.default_events())
    }

    /// Replace the interest of an entry that is already watched.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `target` is unknown or `events` is not supported
    /// for it.
    pub fn check_for<W: Watchable>(&mut self, target: W, events: Events) -> Result<()> {
        let watched = target.watched()?;
        check_interest(watched, events)?;
        let row = self.require(watched)?;
        self.items[row].events = events;
        trace!("[POLLER] {} now checks for {}", watched, events);
        Ok(())
    }

    /// Wait for readiness.
    ///
    /// Returns `Ok(true)` if at least one entry observed one of its
    /// interests, `Ok(false)` if `timeout` elapsed first. [`WAIT_FOREVER`]
    /// waits without limit; `Some(Duration::ZERO)` only checks.
    ///
    /// An interrupted wait reports `Ok(false)`.
    pub fn poll(&mut self, timeout: Option<Duration>) -> Result<bool> {
        for item in &mut self.items {
            item.revents = Events::NONE;
        }

        match self.transport.poll(&mut self.items, timeout) {
            Ok(_) => {}
            Err(ErrorCode::Interrupted) => {
                debug!("[POLLER] wait interrupted");
                for item in &mut self.items {
                    item.revents = Events::NONE;
                }
            }
            Err(code) => return Err(code.into()),
        }

        let mut ready = 0;
        for item in &mut self.items {
            item.revents = item.revents & item.events;
            if !item.revents.is_empty() {
                ready += 1;
            }
        }
        trace!("[POLLER] {} of {} entries ready", ready, self.items.len());
        Ok(ready > 0)
    }

    /// Events observed for `target` by the last [`poll`](Self::poll).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `target` is not watched.
    pub fn events<W: Watchable>(&self, target: W) -> Result<Events> {
        let row = self.require(target.watched()?)?;
        Ok(self.items[row].revents)
    }

    /// Whether `target` was readable at the last poll.
    pub fn has_input<W: Watchable>(&self, target: W) -> Result<bool> {
        Ok(self.events(target)?.contains(Events::IN))
    }

    /// Whether `target` was writable at the last poll.
    pub fn has_output<W: Watchable>(&self, target: W) -> Result<bool> {
        Ok(self.events(target)?.contains(Events::OUT))
    }

    /// Always `false` for sockets.
    pub fn has_error<W: Watchable>(&self, target: W) -> Result<bool> {
        Ok(self.events(target)?.contains(Events::ERROR))
    }

    fn row(&self, watched: Watched) -> Option<usize> {
        match watched {
            Watched::Socket(handle) => self.index.get(&handle).copied(),
            Watched::Descriptor(fd) => self.fd_index.get(&fd).copied(),
        }
    }

    fn require(&self, watched: Watched) -> Result<usize> {
        self.row(watched).ok_or_else(|| {
            PlexusError::invalid_argument(format!("{watched} is not being polled"))
        })
    }
}

fn check_interest(watched: Watched, events: Events) -> Result<()> {
    let unsupported = events.difference(watched.supported_events());
    if !unsupported.is_empty() {
        return Err(PlexusError::invalid_argument(format!(
            "{watched} cannot be polled for {unsupported}"
        )));
    }
    Ok(())
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("items", &self.items)
            .finish_non_exhaustive()
    }
}
