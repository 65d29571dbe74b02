use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Largest value a U29 can carry.
pub const MAX_U29: u32 = 0x1FFF_FFFF;

/// Largest value transmitted as an unsigned short.
pub const MAX_SHORT: usize = u16::MAX as usize;

/// AMF3 string type marker.
pub const AMF_STRING_MARKER: u8 = 0x06;

/// AMF3 array type marker.
pub const AMF_ARRAY_MARKER: u8 = 0x09;

const EMPTY_ASSOCIATIVE_PART: u8 = 0x01;

/// Appends primitive values to an in-memory buffer.
///
/// Multi-byte integers are big-endian. Strings carry an AMF3-style U29
/// header of `(byte_len << 1) | 1`, so their first byte always has the low
/// bit set and a bare `0` byte can serve as an "absent" marker.
#[derive(Debug, Default)]
pub struct AmfWriter {
    buf: BytesMut,
}

impl AmfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn write_byte(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn write_short(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    /// Write a count, index or id as an unsigned short.
    ///
    /// `field` names the value in the overflow error.
    pub fn write_count(&mut self, field: &'static str, value: usize) -> Result<()> {
        let short =
            u16::try_from(value).map_err(|_| FrameError::ShortOverflow { field, value })?;
        self.write_short(short);
        Ok(())
    }

    pub fn write_int(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    /// Write an AMF3 variable-length 29-bit integer.
    pub fn write_u29(&mut self, value: usize) -> Result<()> {
        let v = u32::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_U29)
            .ok_or(FrameError::U29Overflow(value))?;

        if v < 0x80 {
            self.buf.put_u8(v as u8);
        } else if v < 0x4000 {
            self.buf.put_u8(((v >> 7) & 0x7F) as u8 | 0x80);
            self.buf.put_u8((v & 0x7F) as u8);
        } else if v < 0x20_0000 {
            self.buf.put_u8(((v >> 14) & 0x7F) as u8 | 0x80);
            self.buf.put_u8(((v >> 7) & 0x7F) as u8 | 0x80);
            self.buf.put_u8((v & 0x7F) as u8);
        } else {
            self.buf.put_u8(((v >> 22) & 0x7F) as u8 | 0x80);
            self.buf.put_u8(((v >> 15) & 0x7F) as u8 | 0x80);
            self.buf.put_u8(((v >> 8) & 0x7F) as u8 | 0x80);
            self.buf.put_u8((v & 0xFF) as u8);
        }
        Ok(())
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_utf(&mut self, value: &str) -> Result<()> {
        let len = value.len();
        let header = len
            .checked_mul(2)
            .map(|doubled| doubled | 1)
            .ok_or(FrameError::U29Overflow(len))?;
        self.write_u29(header)?;
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    /// Pack up to eight booleans into one byte, first flag in bit 0.
    pub fn write_flag_array(&mut self, flags: &[bool]) -> Result<()> {
        if flags.len() > 8 {
            return Err(FrameError::TooManyFlags(flags.len()));
        }
        let byte = flags
            .iter()
            .enumerate()
            .fold(0u8, |acc, (bit, set)| acc | (u8::from(*set) << bit));
        self.buf.put_u8(byte);
        Ok(())
    }

    /// Write a dense AMF3 array of strings.
    pub fn write_string_array<S: AsRef<str>>(&mut self, values: &[S]) -> Result<()> {
        self.buf.put_u8(AMF_ARRAY_MARKER);
        let header = values
            .len()
            .checked_mul(2)
            .map(|doubled| doubled | 1)
            .ok_or(FrameError::U29Overflow(values.len()))?;
        self.write_u29(header)?;
        self.buf.put_u8(EMPTY_ASSOCIATIVE_PART);
        for value in values {
            self.buf.put_u8(AMF_STRING_MARKER);
            self.write_utf(value.as_ref())?;
        }
        Ok(())
    }

    /// Append raw bytes (generated code, pre-encoded sub-payloads).
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Current write position.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take ownership of everything written so far.
    pub fn take(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    pub(crate) fn split_off(&mut self, at: usize) -> Bytes {
        self.buf.split_off(at).freeze()
    }

    pub(crate) fn split_to(&mut self, at: usize) -> Bytes {
        self.buf.split_to(at).freeze()
    }

    pub(crate) fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorts_are_big_endian() {
        let mut out = AmfWriter::new();
        out.write_short(0x0102);
        out.write_int(-2);
        assert_eq!(out.as_bytes(), &[0x01, 0x02, 0xFF, 0xFF, 0xFF, 0xFE]);
    }

    #[test]
    fn count_overflow_is_rejected() {
        let mut out = AmfWriter::new();
        out.write_count("imageCount", MAX_SHORT).unwrap();
        let err = out.write_count("imageCount", MAX_SHORT + 1).unwrap_err();
        assert!(matches!(
            err,
            FrameError::ShortOverflow {
                field: "imageCount",
                value: 65536
            }
        ));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn u29_uses_variable_width() {
        let cases: [(usize, &[u8]); 5] = [
            (0x7F, &[0x7F]),
            (0x80, &[0x81, 0x00]),
            (0x3FFF, &[0xFF, 0x7F]),
            (0x4000, &[0x81, 0x80, 0x00]),
            (0x20_0000, &[0x80, 0xC0, 0x80, 0x00]),
        ];
        for (value, expected) in cases {
            let mut out = AmfWriter::new();
            out.write_u29(value).unwrap();
            assert_eq!(out.as_bytes(), expected, "value {value:#x}");
        }

        let mut out = AmfWriter::new();
        assert!(matches!(
            out.write_u29(MAX_U29 as usize + 1),
            Err(FrameError::U29Overflow(_))
        ));
    }

    #[test]
    fn utf_header_has_low_bit_set() {
        let mut out = AmfWriter::new();
        out.write_utf("ls1").unwrap();
        out.write_utf("").unwrap();
        assert_eq!(out.as_bytes(), &[0x07, b'l', b's', b'1', 0x01]);
    }

    #[test]
    fn flag_array_packs_lsb_first() {
        let mut out = AmfWriter::new();
        out.write_flag_array(&[true, false]).unwrap();
        out.write_flag_array(&[false, true]).unwrap();
        out.write_flag_array(&[true, true]).unwrap();
        assert_eq!(out.as_bytes(), &[0b01, 0b10, 0b11]);
        assert!(matches!(
            out.write_flag_array(&[false; 9]),
            Err(FrameError::TooManyFlags(9))
        ));
    }

    #[test]
    fn string_array_layout() {
        let mut out = AmfWriter::new();
        out.write_string_array(&["a", "bc"]).unwrap();
        assert_eq!(
            out.as_bytes(),
            &[0x09, 0x05, 0x01, 0x06, 0x03, b'a', 0x06, 0x05, b'b', b'c']
        );
    }
}
