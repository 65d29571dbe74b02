use bytes::{Buf, Bytes};

use crate::amf::{AMF_ARRAY_MARKER, AMF_STRING_MARKER};
use crate::error::{FrameError, Result};

/// Reads the primitives written by [`AmfWriter`](crate::AmfWriter).
///
/// The engine side owns the real decoder; this reader exists for
/// diagnostics and for checking encoded messages.
#[derive(Debug, Clone)]
pub struct AmfReader {
    buf: Bytes,
}

impl AmfReader {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self { buf: bytes.into() }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_byte()? != 0)
    }

    pub fn read_short(&mut self) -> Result<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn read_int(&mut self) -> Result<i32> {
        self.need(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn read_u29(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..3 {
            let byte = self.read_byte()?;
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        let last = self.read_byte()?;
        Ok((value << 8) | u32::from(last))
    }

    pub fn read_utf(&mut self) -> Result<String> {
        let header = self.read_u29()?;
        let len = (header >> 1) as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub fn read_flag_array(&mut self, count: usize) -> Result<Vec<bool>> {
        let byte = self.read_byte()?;
        Ok((0..count.min(8)).map(|bit| byte & (1 << bit) != 0).collect())
    }

    pub fn read_string_array(&mut self) -> Result<Vec<String>> {
        self.expect_marker(AMF_ARRAY_MARKER)?;
        let len = (self.read_u29()? >> 1) as usize;
        self.read_byte()?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            self.expect_marker(AMF_STRING_MARKER)?;
            values.push(self.read_utf()?);
        }
        Ok(values)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.need(len)?;
        Ok(self.buf.split_to(len))
    }

    /// Everything not read yet.
    pub fn rest(&mut self) -> Bytes {
        self.buf.split_off(0)
    }

    fn expect_marker(&mut self, expected: u8) -> Result<()> {
        let found = self.read_byte()?;
        if found != expected {
            return Err(FrameError::UnexpectedMarker { expected, found });
        }
        Ok(())
    }

    fn need(&self, needed: usize) -> Result<()> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(FrameError::UnexpectedEof { needed, remaining });
        }
        Ok(())
    }
}
