//! Low-level binary reader and writer.
//!
//! Converters never touch a stream directly: they go through [`BinaryWriter`]
//! and [`BinaryReader`], which fix the scalar encoding (see [`crate::format`])
//! and the string encoding selected in the options.
//!
//! The reader works on an in-memory slice. That is what makes the tolerant
//! version-header read possible: a failed attempt simply rewinds the cursor.

use std::io::{Cursor, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DataError, MapcodeError, Result};
use crate::format::WIRE_CONFIG;
use crate::options::StringEncoding;

/// Writes Mapcode primitives to a caller-supplied sink.
///
/// The writer borrows the sink; it never closes or flushes it on drop.
pub struct BinaryWriter<'a> {
    inner: &'a mut dyn Write,
    encoding: StringEncoding,
    written: u64,
}

impl std::fmt::Debug for BinaryWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryWriter")
            .field("encoding", &self.encoding)
            .field("written", &self.written)
            .finish()
    }
}

impl<'a> BinaryWriter<'a> {
    /// Wraps a sink.
    pub fn new(inner: &'a mut dyn Write, encoding: StringEncoding) -> Self {
        Self {
            inner,
            encoding,
            written: 0,
        }
    }

    /// The string encoding in effect.
    pub fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    /// Number of bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Writes any fixed-width scalar through the wire codec.
    pub fn write_value<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let n = bincode::serde::encode_into_std_write(value, &mut self.inner, WIRE_CONFIG)?;
        self.written += n as u64;
        Ok(())
    }

    /// Writes a presence / is-null flag (one byte).
    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_value(&value)
    }

    /// Writes an `i32`.
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_value(&value)
    }

    /// Writes an `f64`.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_value(&value)
    }

    /// Writes a count prefix. Fails if `len` does not fit in an `i32`.
    pub fn write_len(&mut self, len: usize) -> Result<()> {
        let len = i32::try_from(len).map_err(|_| DataError::LengthOverflow(len))?;
        self.write_i32(len)
    }

    /// Writes raw bytes with no prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Writes a length-prefixed byte array.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_len(bytes.len())?;
        self.write_raw(bytes)
    }

    /// Writes a string in the configured encoding, prefixed by its byte length.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        match self.encoding {
            StringEncoding::Utf8 => self.write_bytes(value.as_bytes()),
            StringEncoding::Utf16Le => {
                let bytes: Vec<u8> = value.encode_utf16().flat_map(u16::to_le_bytes).collect();
                self.write_bytes(&bytes)
            }
        }
    }
}

/// Reads Mapcode primitives from an in-memory payload.
#[derive(Debug)]
pub struct BinaryReader<'a> {
    cursor: Cursor<&'a [u8]>,
    encoding: StringEncoding,
}

impl<'a> BinaryReader<'a> {
    /// Wraps a payload.
    pub fn new(bytes: &'a [u8], encoding: StringEncoding) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            encoding,
        }
    }

    /// The string encoding in effect.
    pub fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    /// Current offset into the payload.
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Moves the cursor back (or forward) to `position`.
    pub fn rewind_to(&mut self, position: u64) {
        self.cursor.set_position(position);
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> u64 {
        (self.cursor.get_ref().len() as u64).saturating_sub(self.cursor.position())
    }

    /// Reads any fixed-width scalar through the wire codec.
    pub fn read_value<T: DeserializeOwned>(&mut self) -> Result<T> {
        Ok(bincode::serde::decode_from_std_read(
            &mut self.cursor,
            WIRE_CONFIG,
        )?)
    }

    /// Reads a presence / is-null flag.
    pub fn read_bool(&mut self) -> Result<bool> {
        self.read_value()
    }

    /// Reads an `i32`.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_value()
    }

    /// Reads an `f64`.
    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_value()
    }

    /// Reads a count prefix written by [`BinaryWriter::write_len`].
    ///
    /// `min_item_size` is the smallest number of bytes a single item can occupy;
    /// counts that could not possibly fit in the remaining input are rejected
    /// before anything is allocated.
    pub fn read_len(&mut self, min_item_size: u64) -> Result<usize> {
        let raw = self.read_i32()?;
        let remaining = self.remaining();
        let invalid = || DataError::InvalidLength {
            length: i64::from(raw),
            remaining,
        };
        let len = usize::try_from(raw).map_err(|_| invalid())?;
        if (len as u64).saturating_mul(min_item_size) > remaining {
            return Err(invalid().into());
        }
        Ok(len)
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_raw(&mut self, len: usize) -> Result<Vec<u8>> {
        if len as u64 > self.remaining() {
            return Err(DataError::InvalidLength {
                length: len as i64,
                remaining: self.remaining(),
            }
            .into());
        }
        let mut buf = vec![0u8; len];
        self.cursor.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads a length-prefixed byte array.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len(1)?;
        self.read_raw(len)
    }

    /// Reads a string written by [`BinaryWriter::write_string`].
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        match self.encoding {
            StringEncoding::Utf8 => String::from_utf8(bytes)
                .map_err(|e| MapcodeError::Data(DataError::InvalidString(e.to_string()))),
            StringEncoding::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return Err(DataError::InvalidString("odd UTF-16 byte count".into()).into());
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units)
                    .map_err(|e| MapcodeError::Data(DataError::InvalidString(e.to_string())))
            }
        }
    }
}
