use bytes::Bytes;
use designwire_transport::{Transport, TransportSlot};
use tracing::{debug, trace};

use crate::amf::AmfWriter;
use crate::error::{FrameError, Result};

/// Initial capacity of the outgoing buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Framing state of a [`BlockWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No message in flight.
    Idle,
    /// A message is being written; `mark` is the rollback position.
    Open { mark: usize },
}

/// The bytes of an open frame, detached so other frames can be committed
/// before it. Dropping a suspended frame discards it.
#[derive(Debug)]
#[must_use = "a suspended frame is discarded unless resumed"]
pub struct SuspendedFrame {
    bytes: Bytes,
}

impl SuspendedFrame {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Transactional message framing over an [`AmfWriter`].
///
/// The buffer holds committed-but-unflushed messages followed by at most
/// one open message. `flush` hands the committed part to the transport.
pub struct BlockWriter {
    out: AmfWriter,
    state: FrameState,
    slot: TransportSlot,
}

impl BlockWriter {
    /// Create a writer sending to `slot`.
    pub fn new(slot: TransportSlot) -> Self {
        Self::with_capacity(slot, DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(slot: TransportSlot, capacity: usize) -> Self {
        Self {
            out: AmfWriter::with_capacity(capacity),
            state: FrameState::Idle,
            slot,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, FrameState::Open { .. })
    }

    /// Open a message, recording the current position as the rollback mark.
    pub fn begin(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(FrameError::AlreadyOpen);
        }
        self.state = FrameState::Open {
            mark: self.out.len(),
        };
        Ok(())
    }

    /// The primitive writer of the open message.
    pub fn frame(&mut self) -> Result<&mut AmfWriter> {
        if !self.is_open() {
            return Err(FrameError::NotOpen);
        }
        Ok(&mut self.out)
    }

    /// Commit the open message. Returns its length in bytes.
    pub fn end(&mut self) -> Result<usize> {
        let mark = self.open_mark()?;
        let len = self.out.len() - mark;
        self.state = FrameState::Idle;
        trace!(len, "frame committed");
        Ok(len)
    }

    /// Discard everything written since `begin`. Returns the discarded length.
    pub fn rollback(&mut self) -> Result<usize> {
        let mark = self.open_mark()?;
        let discarded = self.out.len() - mark;
        self.out.truncate(mark);
        self.state = FrameState::Idle;
        debug!(discarded, "frame rolled back");
        Ok(discarded)
    }

    /// Detach the open message so that other messages can be committed first.
    ///
    /// The writer returns to idle; [`resume`](Self::resume) re-opens the
    /// message at the current end of the buffer.
    pub fn suspend(&mut self) -> Result<SuspendedFrame> {
        let mark = self.open_mark()?;
        let bytes = self.out.split_off(mark);
        self.state = FrameState::Idle;
        trace!(len = bytes.len(), "frame suspended");
        Ok(SuspendedFrame { bytes })
    }

    /// Re-open a suspended message; it can then be extended, ended or rolled back.
    pub fn resume(&mut self, frame: SuspendedFrame) -> Result<()> {
        self.begin()?;
        self.out.write_bytes(&frame.bytes);
        Ok(())
    }

    /// Length of committed bytes waiting for `flush`.
    pub fn pending_len(&self) -> usize {
        match self.state {
            FrameState::Idle => self.out.len(),
            FrameState::Open { mark } => mark,
        }
    }

    /// Committed bytes waiting for `flush`.
    pub fn pending(&self) -> &[u8] {
        &self.out.as_bytes()[..self.pending_len()]
    }

    /// Send committed messages to the transport.
    ///
    /// An open message stays in the buffer. Committed bytes are kept if the
    /// transport fails.
    pub fn flush(&mut self) -> Result<()> {
        let pending = self.pending_len();
        self.slot.send(&self.out.as_bytes()[..pending])?;
        let sent = self.out.split_to(pending);
        if let FrameState::Open { mark } = self.state {
            self.state = FrameState::Open {
                mark: mark - sent.len(),
            };
        }
        trace!(len = sent.len(), "flushed");
        Ok(())
    }

    /// Drop every buffered byte, committed or not, and return to idle.
    pub fn reset(&mut self) {
        self.out.clear();
        self.state = FrameState::Idle;
    }

    /// Replace the transport.
    pub fn set_out(&mut self, transport: Box<dyn Transport>) {
        self.slot.replace(transport);
    }

    /// The shared transport slot; clones can close it from another thread.
    pub fn slot(&self) -> &TransportSlot {
        &self.slot
    }

    fn open_mark(&self) -> Result<usize> {
        match self.state {
            FrameState::Open { mark } => Ok(mark),
            FrameState::Idle => Err(FrameError::NotOpen),
        }
    }
}
