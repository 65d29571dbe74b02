use std::io::{ErrorKind, Write};

use crate::error::{Result, TransportError};

/// An output byte sink for committed protocol messages.
///
/// Implementations receive only complete, committed frames; they never see
/// bytes of a message that was later rolled back.
pub trait Transport: Send {
    /// Write every byte of `bytes` (blocking).
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Push buffered bytes to the peer.
    fn flush(&mut self) -> Result<()>;

    /// Discard anything not yet flushed and release the sink.
    ///
    /// After this call every write fails with [`TransportError::Closed`].
    fn close_without_flush(&mut self) -> Result<()>;

    /// Transport name for diagnostics.
    fn name(&self) -> &'static str {
        "stream"
    }
}

/// Adapts any `Write` into a [`Transport`].
pub struct StreamTransport<W> {
    inner: Option<W>,
}

impl<W: Write + Send> StreamTransport<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner: Some(inner) }
    }

    /// Borrow the underlying writer, if still open.
    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    /// Consume the transport and return the writer, if still open.
    pub fn into_inner(self) -> Option<W> {
        self.inner
    }

    fn inner_mut(&mut self) -> Result<&mut W> {
        self.inner.as_mut().ok_or(TransportError::Closed)
    }
}

impl<W: Write + Send> Transport for StreamTransport<W> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let inner = self.inner_mut()?;
        write_fully(inner, bytes)
    }

    fn flush(&mut self) -> Result<()> {
        let inner = self.inner_mut()?;
        flush_fully(inner)
    }

    fn close_without_flush(&mut self) -> Result<()> {
        self.inner = None;
        Ok(())
    }
}

/// Write all of `bytes`, retrying on `Interrupted` and `WouldBlock`.
pub(crate) fn write_fully<W: Write + ?Sized>(inner: &mut W, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match inner.write(&bytes[offset..]) {
            Ok(0) => return Err(TransportError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
    Ok(())
}

pub(crate) fn flush_fully<W: Write + ?Sized>(inner: &mut W) -> Result<()> {
    loop {
        match inner.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
}
