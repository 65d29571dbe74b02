use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

type Slot = Option<Box<dyn Transport>>;

/// Shared, replaceable holder for the active transport.
///
/// Sending and closing take the same lock, so a forced close from another
/// thread can never interleave with a half-written flush. Clones refer to the
/// same slot.
#[derive(Clone, Default)]
pub struct TransportSlot {
    inner: Arc<Mutex<Slot>>,
}

impl TransportSlot {
    /// An empty slot; sends fail with [`TransportError::Closed`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot holding `transport`.
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        let slot = Self::new();
        slot.replace(Box::new(transport));
        slot
    }

    /// Install a new transport, returning the previous one.
    pub fn replace(&self, transport: Box<dyn Transport>) -> Option<Box<dyn Transport>> {
        debug!(transport = transport.name(), "transport attached");
        self.lock().replace(transport)
    }

    /// Whether a transport is attached.
    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    /// Write `bytes` and flush, atomically with respect to `close_without_flush`.
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        let mut slot = self.lock();
        let transport = slot.as_mut().ok_or(TransportError::Closed)?;
        if !bytes.is_empty() {
            transport.write_all(bytes)?;
        }
        transport.flush()
    }

    /// Discard unflushed bytes and detach the transport.
    ///
    /// Safe to call from any thread and idempotent.
    pub fn close_without_flush(&self) -> Result<()> {
        let taken = self.lock().take();
        match taken {
            Some(mut transport) => {
                debug!(transport = transport.name(), "transport closed without flush");
                transport.close_without_flush()
            }
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for TransportSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSlot")
            .field("attached", &self.is_attached())
            .finish()
    }
}
