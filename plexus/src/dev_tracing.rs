//! Development helper: initialize a tracing subscriber when `RUST_LOG` is set.
//!
//! Demos, benches and tests call [`init_tracing`] to turn on the `[SOCKET]`,
//! `[POLLER]` and `[INPROC]` logs. This is a no-op when `RUST_LOG` is not set
//! or when a global subscriber is already installed.

/// Install a `fmt` subscriber filtered by `RUST_LOG`.
pub fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_some() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}
