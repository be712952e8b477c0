//! In-process round-trip benchmarks
//!
//! Measures the socket layer on top of the in-process engine:
//! - multipart send + receive over a PAIR link
//! - the same exchange gated by a poller, as an event loop would do it

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use plexus::prelude::*;
use plexus::Bytes;
use std::time::Duration;

const MESSAGE_SIZES: &[usize] = &[64, 1024, 16384];
const PARTS: usize = 3;

fn connected_pair(ctx: &Context, name: &str) -> (Socket, Socket) {
    let mut a = Socket::new(ctx, SocketType::Pair).unwrap();
    let mut b = Socket::new(ctx, SocketType::Pair).unwrap();
    a.bind(name).unwrap();
    b.connect(name).unwrap();
    (a, b)
}

fn multipart_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("inproc/multipart");
    group.measurement_time(Duration::from_secs(5));

    for &size in MESSAGE_SIZES {
        let ctx = Context::new();
        let (mut a, mut b) = connected_pair(&ctx, &format!("inproc://bench-mp-{size}"));
        let payload = Bytes::from(vec![0u8; size]);
        group.throughput(Throughput::Bytes((size * PARTS) as u64));

        group.bench_with_input(BenchmarkId::new("send_receive", size), &size, |bench, _| {
            let mut inbox = Message::new();
            bench.iter(|| {
                let mut msg: Message = std::iter::repeat(payload.clone()).take(PARTS).collect();
                a.send(&mut msg, false).unwrap();
                b.receive(&mut inbox, false).unwrap();
                black_box(inbox.take());
            });
        });
    }
    group.finish();
}

fn polled_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("inproc/polled");
    group.measurement_time(Duration::from_secs(5));

    let ctx = Context::new();
    let (mut a, mut b) = connected_pair(&ctx, "inproc://bench-polled");
    let mut poller = Poller::new(&ctx);
    poller.watch(&b).unwrap();

    group.bench_function("poll_then_receive", |bench| {
        let mut frame = String::new();
        bench.iter(|| {
            a.send_str("tick", Flags::DONT_WAIT).unwrap();
            assert!(poller.poll(WAIT_FOREVER).unwrap());
            b.receive_string(&mut frame, Flags::DONT_WAIT).unwrap();
            black_box(&frame);
        });
    });
    group.finish();
}

criterion_group!(benches, multipart_round_trip, polled_round_trip);
criterion_main!(benches);
