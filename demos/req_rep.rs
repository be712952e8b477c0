//! Demonstration of the strict REQ/REP exchange.
//!
//! The server answers with the request reversed. The client shows what
//! happens when it tries to send twice without reading the reply.

use std::thread;

use plexus::prelude::*;

const ENDPOINT: &str = "inproc://reverse";

fn serve(mut rep: Socket, requests: usize) -> plexus::Result<()> {
    for _ in 0..requests {
        let mut request = Message::new();
        rep.receive(&mut request, false)?;

        let reversed: String = request
            .get_str(0)
            .unwrap_or_default()
            .chars()
            .rev()
            .collect();
        let mut reply = Message::new().push_str(&reversed);
        rep.send(&mut reply, false)?;
    }
    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    plexus::dev_tracing::init_tracing();
    println!("=== REQ/REP Demo ===\n");

    let ctx = Context::new();
    let mut rep = Socket::new(&ctx, SocketType::Rep)?;
    rep.bind(ENDPOINT)?;

    let words = ["plexus", "socket", "poller"];
    let server = thread::spawn(move || serve(rep, words.len()));

    let mut req = Socket::new(&ctx, SocketType::Req)?;
    req.set(SocketOption::ReceiveTimeout, 2000)?;
    req.connect(ENDPOINT)?;

    for word in words {
        let mut request = Message::new().push_str(word);
        req.send(&mut request, false)?;

        // a second send before the reply violates the exchange
        let mut eager = Message::new().push_str("too soon");
        if let Err(e) = req.send(&mut eager, true) {
            println!("  rejected early send: {e}");
        }

        let mut reply = Message::new();
        if req.receive(&mut reply, false)? {
            println!("{word} -> {}", reply.get_str(0).unwrap_or("<binary>"));
        } else {
            println!("{word} -> timed out");
        }
    }

    server.join().map_err(|_| "server panicked")??;
    println!("\nIdentity: {:?}", req.get::<String>(SocketOption::Identity)?);
    Ok(())
}
