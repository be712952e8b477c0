//! Socket contract tests against a scripted Transport.
//!
//! `ScriptedTransport` counts every call and replays queued results, which
//! lets the tests check exactly which calls a socket makes.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use plexus::{
    Context, ErrorCode, Events, Flags, Message, PlexusError, PollItem, Poller, Socket,
    SocketHandle, SocketOption, SocketType, Transport, WAIT_FOREVER,
};

#[derive(Default)]
struct Script {
    calls: usize,
    sends: Vec<(Bytes, Flags)>,
    send_results: VecDeque<Result<(), ErrorCode>>,
    frames: VecDeque<Result<(Bytes, bool), ErrorCode>>,
    more: bool,
    closes: usize,
}

#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    fn calls(&self) -> usize {
        self.script.lock().calls
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, _kind: SocketType) -> Result<SocketHandle, ErrorCode> {
        self.script.lock().calls += 1;
        Ok(SocketHandle::from_raw(1))
    }

    fn close(&self, _handle: SocketHandle) -> Result<(), ErrorCode> {
        let mut script = self.script.lock();
        script.calls += 1;
        script.closes += 1;
        Ok(())
    }

    fn bind(&self, _handle: SocketHandle, _endpoint: &str) -> Result<(), ErrorCode> {
        self.script.lock().calls += 1;
        Ok(())
    }

    fn connect(&self, _handle: SocketHandle, _endpoint: &str) -> Result<(), ErrorCode> {
        self.script.lock().calls += 1;
        Ok(())
    }

    fn send(&self, _handle: SocketHandle, frame: Bytes, flags: Flags) -> Result<(), ErrorCode> {
        let mut script = self.script.lock();
        script.calls += 1;
        script.sends.push((frame, flags));
        script.send_results.pop_front().unwrap_or(Ok(()))
    }

    fn recv(
        &self,
        _handle: SocketHandle,
        frame: &mut Bytes,
        _flags: Flags,
    ) -> Result<usize, ErrorCode> {
        let mut script = self.script.lock();
        script.calls += 1;
        let (next, more) = script.frames.pop_front().unwrap_or(Err(ErrorCode::WouldBlock))?;
        script.more = more;
        let size = next.len();
        *frame = next;
        Ok(size)
    }

    fn set_option(
        &self,
        _handle: SocketHandle,
        _option: i32,
        _value: &[u8],
    ) -> Result<(), ErrorCode> {
        self.script.lock().calls += 1;
        Ok(())
    }

    fn get_option(
        &self,
        _handle: SocketHandle,
        option: i32,
        value: &mut [u8],
    ) -> Result<usize, ErrorCode> {
        let mut script = self.script.lock();
        script.calls += 1;
        assert_eq!(option, SocketOption::ReceiveMore.code());
        value[..4].copy_from_slice(&i32::from(script.more).to_ne_bytes());
        Ok(4)
    }

    fn poll(&self, items: &mut [PollItem], _timeout: Option<Duration>) -> Result<usize, ErrorCode> {
        self.script.lock().calls += 1;
        // report everything, interested or not
        for item in items.iter_mut() {
            item.revents = Events::IN | Events::OUT;
        }
        Ok(items.len())
    }
}

fn scripted() -> (Arc<ScriptedTransport>, Context) {
    let transport = Arc::new(ScriptedTransport::default());
    let ctx = Context::with_transport(transport.clone());
    (transport, ctx)
}

#[test]
fn empty_send_makes_no_transport_call() {
    let (transport, ctx) = scripted();
    let mut socket = Socket::new(&ctx, SocketType::Push).unwrap();
    let before = transport.calls();

    let mut msg = Message::new();
    assert!(matches!(
        socket.send(&mut msg, false),
        Err(PlexusError::InvalidArgument(_))
    ));
    assert_eq!(transport.calls(), before);
}

#[test]
fn non_empty_receive_target_makes_no_transport_call() {
    let (transport, ctx) = scripted();
    let mut socket = Socket::new(&ctx, SocketType::Pull).unwrap();
    let before = transport.calls();

    let mut msg = Message::new().push_str("left over");
    assert!(matches!(
        socket.receive(&mut msg, false),
        Err(PlexusError::State(_))
    ));
    assert_eq!(transport.calls(), before);
    assert_eq!(msg.get_str(0), Some("left over"));
}

#[test]
fn option_type_mismatch_makes_no_transport_call() {
    let (transport, ctx) = scripted();
    let mut socket = Socket::new(&ctx, SocketType::Dealer).unwrap();
    let before = transport.calls();

    assert!(matches!(
        socket.set(SocketOption::Identity, 42),
        Err(PlexusError::TypeMismatch { .. })
    ));
    assert!(matches!(
        socket.get::<u64>(SocketOption::Linger),
        Err(PlexusError::TypeMismatch { .. })
    ));
    assert_eq!(transport.calls(), before);
}

#[test]
fn send_marks_all_but_last_part() {
    let (transport, ctx) = scripted();
    let mut socket = Socket::new(&ctx, SocketType::Dealer).unwrap();

    let mut msg = Message::new().push_str("A").push_str("B").push_str("C");
    assert!(socket.send(&mut msg, true).unwrap());
    assert!(msg.is_empty());

    let script = transport.script.lock();
    let flags: Vec<Flags> = script.sends.iter().map(|(_, f)| *f).collect();
    assert_eq!(
        flags,
        vec![
            Flags::DONT_WAIT | Flags::SEND_MORE,
            Flags::DONT_WAIT | Flags::SEND_MORE,
            Flags::DONT_WAIT,
        ]
    );
    assert_eq!(script.sends[2].0, Bytes::from_static(b"C"));
}

#[test]
fn first_part_would_block_returns_false_and_empties_message() {
    let (transport, ctx) = scripted();
    let mut socket = Socket::new(&ctx, SocketType::Push).unwrap();
    transport
        .script
        .lock()
        .send_results
        .push_back(Err(ErrorCode::WouldBlock));

    let mut msg = Message::new().push_str("A").push_str("B");
    assert!(!socket.send(&mut msg, true).unwrap());
    assert!(msg.is_empty());
    assert_eq!(transport.script.lock().sends.len(), 1);
}

#[test]
fn later_part_would_block_is_fatal() {
    let (transport, ctx) = scripted();
    let mut socket = Socket::new(&ctx, SocketType::Push).unwrap();
    {
        let mut script = transport.script.lock();
        script.send_results.push_back(Ok(()));
        script.send_results.push_back(Err(ErrorCode::WouldBlock));
    }

    let mut msg = Message::new().push_str("A").push_str("B").push_str("C");
    let err = socket.send(&mut msg, true).unwrap_err();
    assert!(err.is_would_block());
    assert!(msg.is_empty());
    assert_eq!(transport.script.lock().sends.len(), 2);
}

#[test]
fn first_part_hard_failure_is_fatal() {
    let (transport, ctx) = scripted();
    let mut socket = Socket::new(&ctx, SocketType::Push).unwrap();
    transport
        .script
        .lock()
        .send_results
        .push_back(Err(ErrorCode::FiniteState));

    let mut msg = Message::new().push_str("A");
    let err = socket.send(&mut msg, false).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::FiniteState));
    assert!(msg.is_empty());
}

#[test]
fn receive_assembles_until_no_more_parts() {
    let (transport, ctx) = scripted();
    let mut socket = Socket::new(&ctx, SocketType::Pull).unwrap();
    {
        let mut script = transport.script.lock();
        script.frames.push_back(Ok((Bytes::from_static(b"A"), true)));
        script.frames.push_back(Ok((Bytes::from_static(b"B"), true)));
        script.frames.push_back(Ok((Bytes::from_static(b"C"), false)));
        script.frames.push_back(Ok((Bytes::from_static(b"next"), false)));
    }

    let mut msg = Message::new();
    assert!(socket.receive(&mut msg, true).unwrap());
    assert_eq!(
        msg.frames(),
        &[
            Bytes::from_static(b"A"),
            Bytes::from_static(b"B"),
            Bytes::from_static(b"C"),
        ]
    );
    assert_eq!(transport.script.lock().frames.len(), 1);
}

#[test]
fn receive_failure_after_first_frame_is_fatal() {
    let (transport, ctx) = scripted();
    let mut socket = Socket::new(&ctx, SocketType::Pull).unwrap();
    {
        let mut script = transport.script.lock();
        script.frames.push_back(Ok((Bytes::from_static(b"A"), true)));
        script.frames.push_back(Err(ErrorCode::WouldBlock));
    }

    let mut msg = Message::new();
    assert!(socket.receive(&mut msg, true).unwrap_err().is_would_block());

    let mut empty = Message::new();
    assert!(!socket.receive(&mut empty, true).unwrap());
}

#[test]
fn moved_from_socket_is_released_once() {
    let (transport, ctx) = scripted();
    let mut original = Socket::new(&ctx, SocketType::Pair).unwrap();

    let moved = original.take();
    assert!(!original.is_valid());
    assert!(moved.is_valid());

    drop(original);
    assert_eq!(transport.script.lock().closes, 0);
    drop(moved);
    assert_eq!(transport.script.lock().closes, 1);
}

#[test]
fn poller_masks_unrequested_events() {
    let (_transport, ctx) = scripted();
    let socket = Socket::new(&ctx, SocketType::Pair).unwrap();

    let mut poller = Poller::new(&ctx);
    poller.add(&socket, Events::IN).unwrap();
    assert!(poller.poll(WAIT_FOREVER).unwrap());
    assert_eq!(poller.events(&socket).unwrap(), Events::IN);
    assert!(!poller.has_output(&socket).unwrap());
}

#[test]
fn poller_ignores_events_nobody_asked_for() {
    let (_transport, ctx) = scripted();
    let socket = Socket::new(&ctx, SocketType::Pair).unwrap();

    let mut poller = Poller::new(&ctx);
    poller.add(&socket, Events::NONE).unwrap();
    assert!(!poller.poll(Some(Duration::ZERO)).unwrap());
    assert_eq!(poller.events(&socket).unwrap(), Events::NONE);

    poller.check_for(&socket, Events::OUT).unwrap();
    assert!(poller.poll(Some(Duration::ZERO)).unwrap());
    assert!(poller.has_output(&socket).unwrap());
}
