//! Transport context shared by sockets and pollers.

use std::fmt;
use std::sync::Arc;

use plexus_core::inproc::InprocTransport;
use plexus_core::transport::Transport;

/// Cheap, clonable handle to a Transport.
///
/// Every socket and poller created from the same context (or a clone of
/// it) talks to the same engine, so they can reach each other's endpoints.
///
/// ```
/// use plexus::Context;
///
/// let ctx = Context::new();
/// let other = ctx.clone();
/// assert!(ctx.same_transport(&other));
/// ```
#[derive(Clone)]
pub struct Context {
    transport: Arc<dyn Transport>,
}

impl Context {
    /// Create a context backed by a fresh in-process engine.
    #[must_use]
    pub fn new() -> Self {
        Self::with_transport(Arc::new(InprocTransport::new()))
    }

    /// Create a context backed by any Transport implementation.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Whether both contexts share one engine.
    #[must_use]
    pub fn same_transport(&self, other: &Context) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.transport).cast::<()>(),
            Arc::as_ptr(&other.transport).cast::<()>(),
        )
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("references", &Arc::strong_count(&self.transport))
            .finish()
    }
}
