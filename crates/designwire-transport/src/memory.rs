use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

#[derive(Debug, Default)]
struct MemoryState {
    written: Vec<u8>,
    flushed_len: usize,
    flushes: usize,
    closed: bool,
}

/// In-memory transport. Clones share the same buffer.
///
/// Bytes written but not yet flushed are dropped by
/// [`Transport::close_without_flush`], which makes the type useful for
/// asserting what the engine would actually have received.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every byte written so far, flushed or not.
    pub fn contents(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Bytes that have been flushed.
    pub fn flushed(&self) -> Vec<u8> {
        let state = self.lock();
        state.written[..state.flushed_len].to_vec()
    }

    /// Number of successful flush calls.
    pub fn flush_count(&self) -> usize {
        self.lock().flushes
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MemoryTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.written.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.flushed_len = state.written.len();
        state.flushes += 1;
        Ok(())
    }

    fn close_without_flush(&mut self) -> Result<()> {
        let mut state = self.lock();
        let flushed = state.flushed_len;
        state.written.truncate(flushed);
        state.closed = true;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
