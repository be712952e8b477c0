//! In-process Transport.
//!
//! Moves frames between sockets of the same process through in-memory
//! queues. All sockets of one [`InprocTransport`] share a single registry
//! guarded by a mutex; every state change that could make a socket readable
//! or writable signals one condition variable, which blocking transfers and
//! `poll` wait on.
//!
//! Endpoints are scoped to the Transport instance, so two contexts never
//! see each other's `inproc://` names.
//!
//! # Delivery model
//!
//! - Frames written with `SEND_MORE` accumulate in the sender until the final
//!   frame, then the whole message lands in the receivers' queues at once.
//! - Queue capacity is only checked for the first frame of a message. Once a
//!   first frame is accepted the remaining frames never block.
//! - Capacity of a link is the sender's send high water mark plus the
//!   receiver's receive high water mark; 0 on either side means unlimited.

use std::collections::VecDeque;
use std::time::Instant;

use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex, MutexGuard};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::endpoint::Endpoint;
use crate::error::ErrorCode;
use crate::flags::{Events, Flags};
use crate::options::{SocketOption, SocketOptions};
use crate::pubsub::index::SubscriptionIndex;
use crate::socket_type::SocketType;
use crate::transport::{PollItem, SocketHandle, Transport, Watched};

/// How often descriptors are re-checked while `poll` waits on sockets.
const DESCRIPTOR_RECHECK: std::time::Duration = std::time::Duration::from_millis(5);

/// In-process message engine implementing [`Transport`].
///
/// # Example
///
/// ```
/// use plexus_core::flags::Flags;
/// use plexus_core::inproc::InprocTransport;
/// use plexus_core::socket_type::SocketType;
/// use plexus_core::transport::Transport;
///
/// let transport = InprocTransport::new();
/// let server = transport.open(SocketType::Pull).unwrap();
/// let client = transport.open(SocketType::Push).unwrap();
/// transport.bind(server, "inproc://jobs").unwrap();
/// transport.connect(client, "inproc://jobs").unwrap();
///
/// transport.send(client, "job-1".into(), Flags::NORMAL).unwrap();
/// let mut frame = bytes::Bytes::new();
/// transport.recv(server, &mut frame, Flags::DONT_WAIT).unwrap();
/// assert_eq!(&frame[..], b"job-1");
/// ```
pub struct InprocTransport {
    registry: Mutex<Registry>,
    signal: Condvar,
    defaults: SocketOptions,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    sockets: HashMap<u64, SocketState>,
    endpoints: HashMap<String, u64>,
}

/// One direction-agnostic link to a peer, as seen from one side.
struct Pipe {
    peer: u64,
    /// Identity under which this side knows the peer.
    identity: Bytes,
}

struct Inbound {
    routing_id: Bytes,
    from: u64,
    frames: Vec<Bytes>,
}

struct Outgoing {
    targets: SmallVec<[u64; 4]>,
    frames: Vec<Bytes>,
}

/// Strict alternation state of REQ / REP sockets.
#[derive(Debug, Default)]
enum Exchange {
    #[default]
    Ready,
    /// REQ sent a request to `peer` and waits for its reply.
    AwaitingReply { peer: u64 },
    /// REP read a request from `peer` and owes it a reply.
    Replying { peer: u64, envelope: Vec<Bytes> },
}

struct SocketState {
    kind: SocketType,
    options: SocketOptions,
    pipes: Vec<Pipe>,
    bound: Vec<String>,
    inbound: VecDeque<Inbound>,
    /// Remaining frames of the message being read.
    reading: VecDeque<Bytes>,
    more: bool,
    writing: Option<Outgoing>,
    cursor: usize,
    exchange: Exchange,
    /// SUB: own topic filters.
    subscriptions: Vec<Bytes>,
    /// PUB: filters of connected subscribers.
    index: SubscriptionIndex,
}

enum Route {
    Accept {
        targets: SmallVec<[u64; 4]>,
        prefix: Vec<Bytes>,
        consume_first: bool,
        pipe: Option<usize>,
    },
    Blocked,
}

impl SocketState {
    fn new(kind: SocketType, options: SocketOptions) -> Self {
        Self {
            kind,
            options,
            pipes: Vec::new(),
            bound: Vec::new(),
            inbound: VecDeque::new(),
            reading: VecDeque::new(),
            more: false,
            writing: None,
            cursor: 0,
            exchange: Exchange::Ready,
            subscriptions: Vec::new(),
            index: SubscriptionIndex::new(),
        }
    }

    fn is_linked(&self, peer: u64) -> bool {
        self.pipes.iter().any(|p| p.peer == peer)
    }

    /// Whether `msg` survives the kind's envelope rules right now.
    fn accepts(&self, msg: &Inbound) -> bool {
        if msg.frames.is_empty() {
            return false;
        }
        match self.kind {
            SocketType::Rep => msg
                .frames
                .iter()
                .position(Bytes::is_empty)
                .is_some_and(|split| split + 1 < msg.frames.len()),
            SocketType::Req => {
                matches!(self.exchange, Exchange::AwaitingReply { peer } if peer == msg.from)
                    && msg.frames.len() >= 2
                    && msg.frames[0].is_empty()
            }
            _ => true,
        }
    }

    /// Pull the next inbound message into `reading`, applying the socket
    /// kind's envelope rules. Malformed or unexpected messages are dropped.
    fn load_next(&mut self) -> bool {
        while let Some(msg) = self.inbound.pop_front() {
            if !self.accepts(&msg) {
                debug!(
                    "[INPROC] {} dropping unexpected message from socket#{}",
                    self.kind, msg.from
                );
                continue;
            }
            let Inbound {
                routing_id,
                from,
                mut frames,
            } = msg;

            match self.kind {
                SocketType::Router => {
                    frames.insert(0, routing_id);
                }
                SocketType::Rep => {
                    let Some(split) = frames.iter().position(Bytes::is_empty) else {
                        continue;
                    };
                    let body = frames.split_off(split + 1);
                    self.exchange = Exchange::Replying {
                        peer: from,
                        envelope: frames,
                    };
                    frames = body;
                }
                SocketType::Req => {
                    frames.remove(0);
                }
                _ => {}
            }

            self.reading = frames.into();
            return true;
        }
        false
    }
}

fn link_limit(send_hwm: usize, recv_hwm: usize) -> Option<usize> {
    if send_hwm == 0 || recv_hwm == 0 {
        None
    } else {
        Some(send_hwm + recv_hwm)
    }
}

fn generated_identity(id: u64) -> Bytes {
    let mut raw = Vec::with_capacity(5);
    raw.push(0);
    raw.extend_from_slice(&(id as u32).to_be_bytes());
    Bytes::from(raw)
}

impl Registry {
    fn socket(&self, id: u64) -> Result<&SocketState, ErrorCode> {
        self.sockets.get(&id).ok_or(ErrorCode::NotSocket)
    }

    fn socket_mut(&mut self, id: u64) -> Result<&mut SocketState, ErrorCode> {
        self.sockets.get_mut(&id).ok_or(ErrorCode::NotSocket)
    }

    fn identity_of(&self, id: u64) -> Bytes {
        self.sockets
            .get(&id)
            .and_then(|s| s.options.routing_id.clone())
            .unwrap_or_else(|| generated_identity(id))
    }

    fn has_room(&self, sender: &SocketState, peer: u64) -> bool {
        self.sockets.get(&peer).is_some_and(|receiver| {
            link_limit(sender.options.send_hwm, receiver.options.recv_hwm)
                .map_or(true, |limit| receiver.inbound.len() < limit)
        })
    }

    /// Round-robin pick of the next pipe whose peer has room.
    fn next_pipe(&self, sender: &SocketState) -> Option<usize> {
        let n = sender.pipes.len();
        (0..n)
            .map(|step| (sender.cursor + step) % n)
            .find(|&idx| self.has_room(sender, sender.pipes[idx].peer))
    }

    fn route(&self, id: u64, first: &Bytes) -> Result<Route, ErrorCode> {
        let sock = self.socket(id)?;
        let accept = |targets: SmallVec<[u64; 4]>, prefix: Vec<Bytes>, pipe: Option<usize>| {
            Route::Accept {
                targets,
                prefix,
                consume_first: false,
                pipe,
            }
        };

        let route = match sock.kind {
            SocketType::Sub | SocketType::Pull => return Err(ErrorCode::NotSupported),
            SocketType::Req => {
                if !matches!(sock.exchange, Exchange::Ready) {
                    return Err(ErrorCode::FiniteState);
                }
                match self.next_pipe(sock) {
                    Some(idx) => accept(
                        SmallVec::from_elem(sock.pipes[idx].peer, 1),
                        vec![Bytes::new()],
                        Some(idx),
                    ),
                    None => Route::Blocked,
                }
            }
            SocketType::Rep => match &sock.exchange {
                Exchange::Replying { peer, envelope } => {
                    let targets = if sock.is_linked(*peer) && self.has_room(sock, *peer) {
                        SmallVec::from_elem(*peer, 1)
                    } else {
                        SmallVec::new()
                    };
                    accept(targets, envelope.clone(), None)
                }
                _ => return Err(ErrorCode::FiniteState),
            },
            SocketType::Pair => match sock.pipes.first() {
                Some(pipe) if self.has_room(sock, pipe.peer) => {
                    accept(SmallVec::from_elem(pipe.peer, 1), Vec::new(), None)
                }
                _ => Route::Blocked,
            },
            SocketType::Push | SocketType::Dealer => match self.next_pipe(sock) {
                Some(idx) => accept(
                    SmallVec::from_elem(sock.pipes[idx].peer, 1),
                    Vec::new(),
                    Some(idx),
                ),
                None => Route::Blocked,
            },
            SocketType::Pub => {
                let targets = sock
                    .index
                    .match_topic(first)
                    .into_iter()
                    .filter(|peer| sock.is_linked(*peer) && self.has_room(sock, *peer))
                    .collect();
                accept(targets, Vec::new(), None)
            }
            SocketType::Router => {
                let targets = sock
                    .pipes
                    .iter()
                    .find(|p| p.identity == *first)
                    .filter(|p| self.has_room(sock, p.peer))
                    .map(|p| SmallVec::from_elem(p.peer, 1))
                    .unwrap_or_default();
                Route::Accept {
                    targets,
                    prefix: Vec::new(),
                    consume_first: true,
                    pipe: None,
                }
            }
        };
        Ok(route)
    }

    fn readiness(&self, id: u64) -> Result<Events, ErrorCode> {
        let sock = self.socket(id)?;
        let mut events = Events::NONE;

        // Queued messages that would be dropped on receive do not count.
        let readable = sock.kind.can_receive()
            && (!sock.reading.is_empty()
                || (!matches!(
                    (sock.kind, &sock.exchange),
                    (SocketType::Rep, Exchange::Replying { .. })
                ) && sock.inbound.iter().any(|msg| sock.accepts(msg))));
        if readable {
            events |= Events::IN;
        }

        let writable = match sock.kind {
            _ if sock.writing.is_some() => true,
            SocketType::Sub | SocketType::Pull => false,
            SocketType::Pub | SocketType::Router => true,
            SocketType::Req => {
                matches!(sock.exchange, Exchange::Ready) && self.next_pipe(sock).is_some()
            }
            SocketType::Rep => matches!(sock.exchange, Exchange::Replying { .. }),
            SocketType::Pair => sock
                .pipes
                .first()
                .is_some_and(|p| self.has_room(sock, p.peer)),
            SocketType::Push | SocketType::Dealer => self.next_pipe(sock).is_some(),
        };
        if writable {
            events |= Events::OUT;
        }
        Ok(events)
    }

    /// Hand the completed outgoing message of `id` to its receivers.
    fn finish_message(&mut self, id: u64) {
        let Some(sock) = self.sockets.get_mut(&id) else {
            return;
        };
        let Some(out) = sock.writing.take() else {
            return;
        };
        match sock.kind {
            SocketType::Req => {
                if let Some(&peer) = out.targets.first() {
                    sock.exchange = Exchange::AwaitingReply { peer };
                }
            }
            SocketType::Rep => sock.exchange = Exchange::Ready,
            _ => {}
        }

        if out.targets.is_empty() {
            trace!("[INPROC] socket#{} message dropped, no receiver", id);
            return;
        }
        // A ROUTER message made of the address frame alone carries nothing.
        if out.frames.is_empty() {
            trace!("[INPROC] socket#{} empty message dropped", id);
            return;
        }

        for target in out.targets {
            let Some(receiver) = self.sockets.get_mut(&target) else {
                continue;
            };
            if let Some(max) = receiver.options.max_msg_size {
                if out.frames.iter().any(|f| f.len() > max) {
                    debug!(
                        "[INPROC] socket#{} dropping message above {} bytes from socket#{}",
                        target, max, id
                    );
                    continue;
                }
            }
            let routing_id = receiver
                .pipes
                .iter()
                .find(|p| p.peer == id)
                .map(|p| p.identity.clone())
                .unwrap_or_default();
            trace!(
                "[INPROC] socket#{} -> socket#{}: {} frames",
                id,
                target,
                out.frames.len()
            );
            receiver.inbound.push_back(Inbound {
                routing_id,
                from: id,
                frames: out.frames.clone(),
            });
        }
    }

    /// Mirror SUB filters into PUB indexes across a new link.
    fn share_subscriptions(&mut self, a: u64, b: u64) {
        for (sub, publisher) in [(a, b), (b, a)] {
            let filters = match self.sockets.get(&sub) {
                Some(s) if s.kind == SocketType::Sub => s.subscriptions.clone(),
                _ => continue,
            };
            if let Some(p) = self.sockets.get_mut(&publisher) {
                if p.kind == SocketType::Pub {
                    for prefix in filters {
                        p.index.subscribe(sub, prefix);
                    }
                }
            }
        }
    }

    fn update_subscription(&mut self, id: u64, topic: &[u8], add: bool) -> Result<(), ErrorCode> {
        let sock = self.socket_mut(id)?;
        if sock.kind != SocketType::Sub {
            return Ok(());
        }
        let topic = Bytes::copy_from_slice(topic);
        if add {
            if !sock.subscriptions.contains(&topic) {
                sock.subscriptions.push(topic.clone());
            }
        } else {
            sock.subscriptions.retain(|t| *t != topic);
        }

        let peers: SmallVec<[u64; 4]> = sock.pipes.iter().map(|p| p.peer).collect();
        for peer in peers {
            if let Some(publisher) = self.sockets.get_mut(&peer) {
                if add {
                    publisher.index.subscribe(id, topic.clone());
                } else {
                    publisher.index.unsubscribe(id, &topic);
                }
            }
        }
        Ok(())
    }
}

impl InprocTransport {
    /// Create an engine whose sockets start with default options.
    pub fn new() -> Self {
        Self::with_defaults(SocketOptions::default())
    }

    /// Create an engine whose sockets start with `defaults`.
    pub fn with_defaults(defaults: SocketOptions) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            signal: Condvar::new(),
            defaults,
        }
    }

    /// Names currently bound, without the `inproc://` prefix.
    pub fn endpoints(&self) -> Vec<String> {
        self.registry.lock().endpoints.keys().cloned().collect()
    }

    /// Number of open handles.
    pub fn socket_count(&self) -> usize {
        self.registry.lock().sockets.len()
    }

    /// Block until signalled; `false` once `deadline` has passed.
    fn wait(&self, registry: &mut MutexGuard<'_, Registry>, deadline: Option<Instant>) -> bool {
        match deadline {
            None => {
                self.signal.wait(registry);
                true
            }
            Some(deadline) => {
                if Instant::now() >= deadline {
                    return false;
                }
                let _ = self.signal.wait_until(registry, deadline);
                true
            }
        }
    }

    fn inproc_name(endpoint: &str) -> Result<String, ErrorCode> {
        match Endpoint::parse(endpoint)? {
            Endpoint::Inproc(name) => Ok(name),
            other => {
                debug!("[INPROC] {} endpoints are not served here", other.scheme());
                Err(ErrorCode::ProtocolNotSupported)
            }
        }
    }
}

impl Default for InprocTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InprocTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("InprocTransport")
            .field("sockets", &registry.sockets.len())
            .field("endpoints", &registry.endpoints.len())
            .finish()
    }
}

impl Transport for InprocTransport {
    fn open(&self, kind: SocketType) -> Result<SocketHandle, ErrorCode> {
        let mut registry = self.registry.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .sockets
            .insert(id, SocketState::new(kind, self.defaults.clone()));
        debug!("[INPROC] opened {} socket#{}", kind, id);
        Ok(SocketHandle::from_raw(id))
    }

    fn close(&self, handle: SocketHandle) -> Result<(), ErrorCode> {
        let id = handle.as_raw();
        let mut registry = self.registry.lock();
        let sock = registry.sockets.remove(&id).ok_or(ErrorCode::NotSocket)?;

        for name in &sock.bound {
            registry.endpoints.remove(name);
        }
        for pipe in &sock.pipes {
            if let Some(peer) = registry.sockets.get_mut(&pipe.peer) {
                peer.pipes.retain(|p| p.peer != id);
                peer.index.remove_peer(id);
            }
        }
        drop(registry);
        self.signal.notify_all();

        debug!("[INPROC] closed {} socket#{}", sock.kind, id);
        Ok(())
    }

    fn bind(&self, handle: SocketHandle, endpoint: &str) -> Result<(), ErrorCode> {
        let id = handle.as_raw();
        let name = Self::inproc_name(endpoint)?;
        let mut registry = self.registry.lock();
        registry.socket(id)?;

        if registry.endpoints.contains_key(&name) {
            return Err(ErrorCode::AddrInUse);
        }
        registry.endpoints.insert(name.clone(), id);
        registry.socket_mut(id)?.bound.push(name);

        debug!("[INPROC] socket#{} bound to {}", id, endpoint);
        Ok(())
    }

    fn connect(&self, handle: SocketHandle, endpoint: &str) -> Result<(), ErrorCode> {
        let id = handle.as_raw();
        let name = Self::inproc_name(endpoint)?;
        let mut registry = self.registry.lock();

        let kind = registry.socket(id)?.kind;
        let peer = *registry
            .endpoints
            .get(&name)
            .ok_or(ErrorCode::ConnectionRefused)?;
        let peer_state = registry.socket(peer)?;

        if peer == id || !kind.is_compatible(peer_state.kind) {
            return Err(ErrorCode::Incompatible);
        }
        if peer_state.is_linked(id) {
            return Ok(());
        }
        if kind == SocketType::Pair
            && (!peer_state.pipes.is_empty() || !registry.socket(id)?.pipes.is_empty())
        {
            return Err(ErrorCode::AddrInUse);
        }

        let peer_identity = registry.identity_of(peer);
        let own_identity = registry.identity_of(id);
        registry.socket_mut(id)?.pipes.push(Pipe {
            peer,
            identity: peer_identity,
        });
        registry.socket_mut(peer)?.pipes.push(Pipe {
            peer: id,
            identity: own_identity,
        });
        registry.share_subscriptions(id, peer);
        drop(registry);
        self.signal.notify_all();

        debug!("[INPROC] socket#{} connected to {}", id, endpoint);
        Ok(())
    }

    fn send(&self, handle: SocketHandle, frame: Bytes, flags: Flags) -> Result<(), ErrorCode> {
        let id = handle.as_raw();
        let more = flags.is_send_more();
        let mut registry = self.registry.lock();

        // Continuation frames were admitted with the first one.
        if let Some(out) = registry.socket_mut(id)?.writing.as_mut() {
            out.frames.push(frame);
            if !more {
                registry.finish_message(id);
                drop(registry);
                self.signal.notify_all();
            }
            return Ok(());
        }

        let deadline = registry
            .socket(id)?
            .options
            .send_timeout
            .map(|t| Instant::now() + t);

        loop {
            match registry.route(id, &frame)? {
                Route::Accept {
                    targets,
                    prefix,
                    consume_first,
                    pipe,
                } => {
                    let sock = registry.socket_mut(id)?;
                    if let Some(idx) = pipe {
                        sock.cursor = idx + 1;
                    }
                    let mut frames = prefix;
                    if !consume_first {
                        frames.push(frame);
                    }
                    sock.writing = Some(Outgoing { targets, frames });

                    if !more {
                        registry.finish_message(id);
                        drop(registry);
                        self.signal.notify_all();
                    }
                    return Ok(());
                }
                Route::Blocked => {
                    if flags.is_dont_wait() || !self.wait(&mut registry, deadline) {
                        trace!("[INPROC] socket#{} send would block", id);
                        return Err(ErrorCode::WouldBlock);
                    }
                }
            }
        }
    }

    fn recv(&self, handle: SocketHandle, frame: &mut Bytes, flags: Flags) -> Result<usize, ErrorCode> {
        let id = handle.as_raw();
        let mut registry = self.registry.lock();

        let sock = registry.socket(id)?;
        if !sock.kind.can_receive() {
            return Err(ErrorCode::NotSupported);
        }
        let deadline = sock.options.recv_timeout.map(|t| Instant::now() + t);

        loop {
            let sock = registry.socket_mut(id)?;

            if let Some(next) = sock.reading.pop_front() {
                sock.more = !sock.reading.is_empty();
                if !sock.more && sock.kind == SocketType::Req {
                    sock.exchange = Exchange::Ready;
                }
                let size = next.len();
                *frame = next;
                return Ok(size);
            }

            match (&sock.kind, &sock.exchange) {
                (SocketType::Req, Exchange::AwaitingReply { .. }) => {}
                (SocketType::Req, _) | (SocketType::Rep, Exchange::Replying { .. }) => {
                    return Err(ErrorCode::FiniteState);
                }
                _ => {}
            }

            if sock.load_next() {
                // Queue space was freed.
                self.signal.notify_all();
                continue;
            }

            if flags.is_dont_wait() || !self.wait(&mut registry, deadline) {
                return Err(ErrorCode::WouldBlock);
            }
        }
    }

    fn set_option(&self, handle: SocketHandle, option: i32, value: &[u8]) -> Result<(), ErrorCode> {
        let id = handle.as_raw();
        let option = SocketOption::from_code(option).ok_or(ErrorCode::InvalidOption)?;
        let mut registry = self.registry.lock();

        match option {
            SocketOption::Subscribe => registry.update_subscription(id, value, true)?,
            SocketOption::Unsubscribe => registry.update_subscription(id, value, false)?,
            _ => registry.socket_mut(id)?.options.set_raw(option, value)?,
        }
        drop(registry);
        // High water marks may have changed writability.
        self.signal.notify_all();

        trace!("[INPROC] socket#{} set {}", id, option);
        Ok(())
    }

    fn get_option(&self, handle: SocketHandle, option: i32, value: &mut [u8]) -> Result<usize, ErrorCode> {
        let id = handle.as_raw();
        let option = SocketOption::from_code(option).ok_or(ErrorCode::InvalidOption)?;
        let registry = self.registry.lock();
        let sock = registry.socket(id)?;

        let raw = match option {
            SocketOption::Type => sock.kind.code().to_ne_bytes().to_vec(),
            SocketOption::ReceiveMore => i32::from(sock.more).to_ne_bytes().to_vec(),
            SocketOption::Events => i32::from(registry.readiness(id)?.bits())
                .to_ne_bytes()
                .to_vec(),
            _ => sock.options.get_raw(option)?,
        };

        let dest = value.get_mut(..raw.len()).ok_or(ErrorCode::InvalidOption)?;
        dest.copy_from_slice(&raw);
        Ok(raw.len())
    }

    fn poll(
        &self,
        items: &mut [PollItem],
        timeout: Option<std::time::Duration>,
    ) -> Result<usize, ErrorCode> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let watches_descriptors = items
            .iter()
            .any(|item| matches!(item.watched, Watched::Descriptor(_)));
        let mut registry = self.registry.lock();

        loop {
            for item in items.iter_mut() {
                item.revents = match item.watched {
                    Watched::Socket(handle) => {
                        registry.readiness(handle.as_raw())? & item.events
                    }
                    Watched::Descriptor(_) => Events::NONE,
                };
            }
            if watches_descriptors {
                descriptors::check(items)?;
            }

            let ready = items.iter().filter(|item| !item.revents.is_empty()).count();
            if ready > 0 {
                return Ok(ready);
            }

            let now = Instant::now();
            if deadline.is_some_and(|d| now >= d) {
                return Ok(0);
            }
            // Descriptors never signal the condition variable, so wake up
            // periodically to look at them again.
            let wake = match (deadline, watches_descriptors) {
                (Some(d), true) => Some(d.min(now + DESCRIPTOR_RECHECK)),
                (None, true) => Some(now + DESCRIPTOR_RECHECK),
                (d, false) => d,
            };
            match wake {
                Some(at) => {
                    let _ = self.signal.wait_until(&mut registry, at);
                }
                None => self.signal.wait(&mut registry),
            }
        }
    }
}

#[cfg(unix)]
mod descriptors {
    use crate::error::ErrorCode;
    use crate::flags::Events;
    use crate::transport::{PollItem, Watched};

    /// Fill `revents` of every descriptor item with one non-blocking
    /// `poll(2)` call.
    #[allow(unsafe_code)]
    pub(super) fn check(items: &mut [PollItem]) -> Result<(), ErrorCode> {
        let mut fds: Vec<libc::pollfd> = Vec::new();
        let mut rows: Vec<usize> = Vec::new();
        for (row, item) in items.iter().enumerate() {
            if let Watched::Descriptor(fd) = item.watched {
                let mut interest: libc::c_short = 0;
                if item.events.contains(Events::IN) {
                    interest |= libc::POLLIN;
                }
                if item.events.contains(Events::OUT) {
                    interest |= libc::POLLOUT;
                }
                fds.push(libc::pollfd {
                    fd,
                    events: interest,
                    revents: 0,
                });
                rows.push(row);
            }
        }

        // SAFETY: `fds` is a live, exclusively borrowed array of `fds.len()`
        // initialised pollfd structs for the duration of the call.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, 0) };
        if rc < 0 {
            return Err(std::io::Error::last_os_error().into());
        }

        for (pfd, row) in fds.iter().zip(rows) {
            let mut observed = Events::NONE;
            if pfd.revents & libc::POLLIN != 0 {
                observed |= Events::IN;
            }
            if pfd.revents & libc::POLLOUT != 0 {
                observed |= Events::OUT;
            }
            if pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
                observed |= Events::ERROR;
            }
            let item = &mut items[row];
            item.revents = observed & item.events;
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod descriptors {
    use crate::error::ErrorCode;
    use crate::transport::PollItem;

    pub(super) fn check(_items: &mut [PollItem]) -> Result<(), ErrorCode> {
        Err(ErrorCode::NotSupported)
    }
}
