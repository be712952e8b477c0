//! Messaging patterns over the in-process engine, driven through the
//! `Transport` trait only.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use plexus_core::error::ErrorCode;
use plexus_core::flags::{Events, Flags};
use plexus_core::inproc::InprocTransport;
use plexus_core::options::SocketOption;
use plexus_core::socket_type::SocketType;
use plexus_core::transport::{PollItem, SocketHandle, Transport, Watched};

fn recv_one(t: &InprocTransport, handle: SocketHandle) -> Option<Bytes> {
    let mut frame = Bytes::new();
    match t.recv(handle, &mut frame, Flags::DONT_WAIT) {
        Ok(_) => Some(frame),
        Err(ErrorCode::WouldBlock) => None,
        Err(e) => panic!("recv failed: {e}"),
    }
}

#[test]
fn push_round_robins_across_pullers() {
    let t = InprocTransport::new();
    let push = t.open(SocketType::Push).unwrap();
    let workers: Vec<_> = (0..3)
        .map(|i| {
            let pull = t.open(SocketType::Pull).unwrap();
            t.bind(pull, &format!("inproc://worker-{i}")).unwrap();
            t.connect(push, &format!("inproc://worker-{i}")).unwrap();
            pull
        })
        .collect();

    for n in 0..6 {
        t.send(push, Bytes::from(format!("job-{n}")), Flags::NORMAL)
            .unwrap();
    }

    for (i, worker) in workers.iter().enumerate() {
        assert_eq!(recv_one(&t, *worker).unwrap(), format!("job-{i}"));
        assert_eq!(recv_one(&t, *worker).unwrap(), format!("job-{}", i + 3));
        assert!(recv_one(&t, *worker).is_none());
    }
}

#[test]
fn publisher_fans_out_to_matching_subscribers() {
    let t = InprocTransport::new();
    let publisher = t.open(SocketType::Pub).unwrap();
    t.bind(publisher, "inproc://quotes").unwrap();

    let all = t.open(SocketType::Sub).unwrap();
    t.connect(all, "inproc://quotes").unwrap();
    t.set_option(all, SocketOption::Subscribe.code(), b"").unwrap();

    let eur = t.open(SocketType::Sub).unwrap();
    t.connect(eur, "inproc://quotes").unwrap();
    t.set_option(eur, SocketOption::Subscribe.code(), b"EUR").unwrap();

    let silent = t.open(SocketType::Sub).unwrap();
    t.connect(silent, "inproc://quotes").unwrap();

    t.send(publisher, "EUR/USD".into(), Flags::SEND_MORE).unwrap();
    t.send(publisher, "1.08".into(), Flags::NORMAL).unwrap();
    t.send(publisher, "GBP/USD".into(), Flags::NORMAL).unwrap();

    assert_eq!(recv_one(&t, all).unwrap(), "EUR/USD");
    assert_eq!(recv_one(&t, all).unwrap(), "1.08");
    assert_eq!(recv_one(&t, all).unwrap(), "GBP/USD");
    assert_eq!(recv_one(&t, eur).unwrap(), "EUR/USD");
    assert_eq!(recv_one(&t, eur).unwrap(), "1.08");
    assert!(recv_one(&t, eur).is_none());
    assert!(recv_one(&t, silent).is_none());
}

#[test]
fn req_through_router_keeps_envelope() {
    let t = InprocTransport::new();
    let router = t.open(SocketType::Router).unwrap();
    let req = t.open(SocketType::Req).unwrap();
    t.set_option(req, SocketOption::Identity.code(), b"client").unwrap();
    t.bind(router, "inproc://broker").unwrap();
    t.connect(req, "inproc://broker").unwrap();

    t.send(req, "hello".into(), Flags::NORMAL).unwrap();
    assert_eq!(recv_one(&t, router).unwrap(), "client");
    assert_eq!(recv_one(&t, router).unwrap(), "");
    assert_eq!(recv_one(&t, router).unwrap(), "hello");

    t.send(router, "client".into(), Flags::SEND_MORE).unwrap();
    t.send(router, Bytes::new(), Flags::SEND_MORE).unwrap();
    t.send(router, "world".into(), Flags::NORMAL).unwrap();
    assert_eq!(recv_one(&t, req).unwrap(), "world");
}

#[test]
fn generated_identity_is_null_prefixed() {
    let t = InprocTransport::new();
    let router = t.open(SocketType::Router).unwrap();
    let dealer = t.open(SocketType::Dealer).unwrap();
    t.bind(router, "inproc://anon").unwrap();
    t.connect(dealer, "inproc://anon").unwrap();

    t.send(dealer, "hi".into(), Flags::NORMAL).unwrap();
    let identity = recv_one(&t, router).unwrap();
    assert_eq!(identity.len(), 5);
    assert_eq!(identity[0], 0);

    t.send(router, identity, Flags::SEND_MORE).unwrap();
    t.send(router, "back".into(), Flags::NORMAL).unwrap();
    assert_eq!(recv_one(&t, dealer).unwrap(), "back");
}

#[test]
fn blocked_sender_resumes_when_receiver_drains() {
    let t = Arc::new(InprocTransport::new());
    let push = t.open(SocketType::Push).unwrap();
    let pull = t.open(SocketType::Pull).unwrap();
    t.set_option(push, SocketOption::SendHighWaterMark.code(), &1i32.to_ne_bytes())
        .unwrap();
    t.set_option(pull, SocketOption::ReceiveHighWaterMark.code(), &1i32.to_ne_bytes())
        .unwrap();
    t.bind(pull, "inproc://drain").unwrap();
    t.connect(push, "inproc://drain").unwrap();

    t.send(push, "1".into(), Flags::NORMAL).unwrap();
    t.send(push, "2".into(), Flags::NORMAL).unwrap();
    assert_eq!(
        t.send(push, "3".into(), Flags::DONT_WAIT),
        Err(ErrorCode::WouldBlock)
    );

    let sender = {
        let t = Arc::clone(&t);
        thread::spawn(move || t.send(push, "3".into(), Flags::NORMAL))
    };
    thread::sleep(Duration::from_millis(20));
    assert_eq!(recv_one(&t, pull).unwrap(), "1");
    sender.join().unwrap().unwrap();

    assert_eq!(recv_one(&t, pull).unwrap(), "2");
    assert_eq!(recv_one(&t, pull).unwrap(), "3");
}

#[test]
fn send_timeout_reports_would_block() {
    let t = InprocTransport::new();
    let pair = t.open(SocketType::Pair).unwrap();
    t.set_option(pair, SocketOption::SendTimeout.code(), &10i32.to_ne_bytes())
        .unwrap();
    assert_eq!(
        t.send(pair, "nobody".into(), Flags::NORMAL),
        Err(ErrorCode::WouldBlock)
    );
}

#[test]
fn events_option_matches_poll() {
    let t = InprocTransport::new();
    let a = t.open(SocketType::Pair).unwrap();
    let b = t.open(SocketType::Pair).unwrap();
    t.bind(a, "inproc://events").unwrap();
    t.connect(b, "inproc://events").unwrap();
    t.send(a, "x".into(), Flags::NORMAL).unwrap();

    let mut raw = [0u8; 4];
    t.get_option(b, SocketOption::Events.code(), &mut raw).unwrap();
    let events = Events::from_bits_truncate(i32::from_ne_bytes(raw) as u16);
    assert_eq!(events, Events::IN | Events::OUT);

    let mut items = [PollItem::new(Watched::Socket(b), Events::IN | Events::OUT)];
    assert_eq!(t.poll(&mut items, Some(Duration::ZERO)), Ok(1));
    assert_eq!(items[0].revents, events);
}

#[test]
fn unknown_handle_in_poll_is_not_a_socket() {
    let t = InprocTransport::new();
    let mut items = [PollItem::new(
        Watched::Socket(SocketHandle::from_raw(999)),
        Events::IN,
    )];
    assert_eq!(
        t.poll(&mut items, Some(Duration::ZERO)),
        Err(ErrorCode::NotSocket)
    );
}
