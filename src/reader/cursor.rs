//! Resettable cursor over an in-memory Avro payload.
//!
//! The cursor owns a copy of the payload so a long-lived session can keep a
//! single cursor and rebind it on every call; `reset` reuses the allocation.
//! Every read checks bounds before touching the buffer.

use crate::error::{DecodeError, ResourceError};
use crate::reader::varint::{decode_varint_with_offset, zigzag_decode};

/// Sequential reader over a byte buffer with an explicit position.
#[derive(Debug, Default, Clone)]
pub struct BinaryCursor {
    buf: Vec<u8>,
    pos: usize,
}

impl BinaryCursor {
    /// Create an empty cursor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cursor bound to `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut cursor = Self::new();
        cursor.reset(data);
        cursor
    }

    /// Rebind the cursor to `data` and rewind to position zero.
    pub fn reset(&mut self, data: &[u8]) {
        self.buf.clear();
        self.buf.extend_from_slice(data);
        self.pos = 0;
    }

    /// Rebind like [`reset`](Self::reset), reporting allocation failure
    /// instead of aborting.
    pub fn try_reset(&mut self, data: &[u8]) -> Result<(), ResourceError> {
        self.buf.clear();
        self.pos = 0;
        self.buf
            .try_reserve(data.len())
            .map_err(|_| ResourceError::AllocationFailed {
                requested: data.len(),
            })?;
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether every byte has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&[u8], DecodeError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(DecodeError::TruncatedInput {
                position: self.pos,
                needed: n,
                remaining,
            });
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf[start..self.pos])
    }

    /// Read an unsigned varint.
    #[inline]
    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let mut data = &self.buf[self.pos..];
        let mut offset = self.pos;
        let value = decode_varint_with_offset(&mut data, &mut offset)?;
        self.pos = offset;
        Ok(value)
    }

    /// Read a zigzag-encoded `long`.
    #[inline]
    pub fn read_zigzag_long(&mut self) -> Result<i64, DecodeError> {
        self.read_varint().map(zigzag_decode)
    }

    /// Read a zigzag-encoded `int`, rejecting values outside 32 bits.
    #[inline]
    pub fn read_int(&mut self) -> Result<i32, DecodeError> {
        let position = self.pos;
        let long = self.read_zigzag_long()?;
        i32::try_from(long).map_err(|_| {
            DecodeError::InvalidData(format!(
                "Integer overflow at position {}: {} does not fit in i32",
                position, long
            ))
        })
    }

    /// Read a boolean encoded as a single 0x00 or 0x01 byte.
    #[inline]
    pub fn read_boolean(&mut self) -> Result<bool, DecodeError> {
        let position = self.pos;
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(DecodeError::InvalidData(format!(
                "Invalid boolean value {} at position {}, expected 0 or 1",
                byte, position
            ))),
        }
    }

    /// Read a 32-bit IEEE 754 float (little-endian).
    #[inline]
    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(f32::from_le_bytes(bytes))
    }

    /// Read a 64-bit IEEE 754 double (little-endian).
    #[inline]
    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.take(8)?);
        Ok(f64::from_le_bytes(bytes))
    }

    /// Read a non-negative `long` used as a length or count.
    pub fn read_length(&mut self) -> Result<usize, DecodeError> {
        let position = self.pos;
        let len = self.read_zigzag_long()?;
        usize::try_from(len).map_err(|_| {
            DecodeError::InvalidData(format!("Negative length {} at position {}", len, position))
        })
    }

    /// Read a length-prefixed byte sequence without copying.
    #[inline]
    pub fn read_length_prefixed_bytes(&mut self) -> Result<&[u8], DecodeError> {
        let len = self.read_length()?;
        self.take(len)
    }

    /// Read a length-prefixed byte sequence into an owned buffer.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        self.read_length_prefixed_bytes().map(<[u8]>::to_vec)
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_length()?;
        let position = self.pos;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(String::from)
            .map_err(|e| DecodeError::InvalidUtf8 {
                position: position + e.valid_up_to(),
            })
    }

    /// Read exactly `size` bytes.
    #[inline]
    pub fn read_fixed(&mut self, size: usize) -> Result<&[u8], DecodeError> {
        self.take(size)
    }

    /// Advance past `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.take(n).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::varint::encode_zigzag;

    #[test]
    fn test_reset_rewinds_and_rebinds() {
        let mut cursor = BinaryCursor::from_slice(&[0x02, 0x04]);
        assert_eq!(cursor.read_zigzag_long().unwrap(), 1);
        assert_eq!(cursor.position(), 1);

        cursor.try_reset(&[0x06]).unwrap();
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.read_zigzag_long().unwrap(), 3);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn test_read_floats_little_endian() {
        let mut data = 1.5f32.to_le_bytes().to_vec();
        data.extend_from_slice(&(-2.25f64).to_le_bytes());
        let mut cursor = BinaryCursor::from_slice(&data);
        assert_eq!(cursor.read_float().unwrap(), 1.5);
        assert_eq!(cursor.read_double().unwrap(), -2.25);
    }

    #[test]
    fn test_truncated_reads_do_not_advance() {
        let mut cursor = BinaryCursor::from_slice(&[0x00, 0x00, 0x00]);
        assert_eq!(
            cursor.read_double(),
            Err(DecodeError::TruncatedInput {
                position: 0,
                needed: 8,
                remaining: 3
            })
        );
        assert_eq!(cursor.position(), 0);
        assert!(cursor.read_float().is_err());
    }

    #[test]
    fn test_length_prefixed() {
        let mut data = encode_zigzag(3);
        data.extend_from_slice(b"abc");
        data.extend_from_slice(&encode_zigzag(4));
        data.extend_from_slice(b"xy");
        let mut cursor = BinaryCursor::from_slice(&data);
        assert_eq!(cursor.read_string().unwrap(), "abc");
        assert!(matches!(
            cursor.read_length_prefixed_bytes(),
            Err(DecodeError::TruncatedInput {
                needed: 4,
                remaining: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_negative_length_is_invalid() {
        let mut cursor = BinaryCursor::from_slice(&encode_zigzag(-1));
        assert!(matches!(
            cursor.read_bytes(),
            Err(DecodeError::InvalidData(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_position() {
        let mut data = encode_zigzag(2);
        data.extend_from_slice(&[b'a', 0xFF]);
        let mut cursor = BinaryCursor::from_slice(&data);
        assert_eq!(
            cursor.read_string(),
            Err(DecodeError::InvalidUtf8 { position: 2 })
        );
    }

    #[test]
    fn test_boolean_and_int_range() {
        let mut cursor = BinaryCursor::from_slice(&[0x01, 0x02]);
        assert!(cursor.read_boolean().unwrap());
        assert!(matches!(
            cursor.read_boolean(),
            Err(DecodeError::InvalidData(_))
        ));

        let mut cursor = BinaryCursor::from_slice(&encode_zigzag(i64::from(i32::MAX) + 1));
        assert!(matches!(cursor.read_int(), Err(DecodeError::InvalidData(_))));
    }
}
