//! Demonstration of a poll-driven pipeline.
//!
//! One PUSH ventilator feeds two PULL workers running in their own threads.
//! Each worker multiplexes its job queue and a control SUB socket with a
//! single poller, and stops when the ventilator publishes "stop".
//!
//! Run with `RUST_LOG=debug` to see the socket and engine logs.

use std::thread;
use std::time::Duration;

use plexus::prelude::*;
use tracing::info;

const WORKERS: usize = 2;
const JOBS: usize = 8;

fn worker(ctx: Context, id: usize) -> plexus::Result<usize> {
    let mut jobs = Socket::new(&ctx, SocketType::Pull)?;
    jobs.connect("inproc://jobs")?;

    let mut control = Socket::new(&ctx, SocketType::Sub)?;
    control.subscribe("stop")?;
    control.connect("inproc://control")?;

    let mut poller = Poller::new(&ctx);
    poller.watch(&jobs)?;
    poller.watch(&control)?;

    let mut done = 0;
    loop {
        if !poller.poll(Some(Duration::from_secs(5)))? {
            info!("[worker {id}] idle for too long, leaving");
            break;
        }

        if poller.has_input(&jobs)? {
            let mut job = Message::new();
            while jobs.receive(&mut job, true)? {
                info!("[worker {id}] {} ({} bytes)", job.get_str(0).unwrap_or("?"), job.size());
                done += 1;
                job.clear();
            }
        }

        if poller.has_input(&control)? {
            let mut command = String::new();
            control.receive_string(&mut command, Flags::DONT_WAIT)?;
            info!("[worker {id}] got {command:?}");
            break;
        }
    }
    Ok(done)
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    plexus::dev_tracing::init_tracing();
    println!("=== Poll-driven Pipeline Demo ===\n");

    let ctx = Context::new();
    let mut ventilator = Socket::new(&ctx, SocketType::Push)?;
    ventilator.bind("inproc://jobs")?;
    let mut control = Socket::new(&ctx, SocketType::Pub)?;
    control.bind("inproc://control")?;

    let handles: Vec<_> = (0..WORKERS)
        .map(|id| {
            let ctx = ctx.clone();
            thread::spawn(move || worker(ctx, id))
        })
        .collect();

    // Give the workers time to connect and subscribe.
    thread::sleep(Duration::from_millis(50));

    for n in 0..JOBS {
        let mut job = Message::new().push_str(&format!("job-{n}")).push_u64(n as u64);
        ventilator.send(&mut job, false)?;
    }
    println!("Dispatched {JOBS} jobs");

    thread::sleep(Duration::from_millis(50));
    control.send_str("stop", Flags::NORMAL)?;

    let mut total = 0;
    for (id, handle) in handles.into_iter().enumerate() {
        let done = handle.join().map_err(|_| "worker panicked")??;
        println!("Worker {id} handled {done} jobs");
        total += done;
    }
    println!("\nTotal: {total} of {JOBS}");
    Ok(())
}
