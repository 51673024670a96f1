//! Growable byte buffer for building fixed-layout binary records.
//!
//! Little-endian unless switched with [`SerialWriter::big_endian`].  The
//! matching [`SerialReader`] walks a borrowed slice with bounds checks.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{BvpError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

// ── Writer ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SerialWriter {
    buffer: Vec<u8>,
    endian: Endian,
}

impl SerialWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buffer: Vec::with_capacity(capacity), endian: Endian::Little }
    }

    pub fn big_endian(mut self) -> Self {
        self.endian = Endian::Big;
        self
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        let mut bytes = [0u8; 2];
        match self.endian {
            Endian::Little => LittleEndian::write_u16(&mut bytes, value),
            Endian::Big    => BigEndian::write_u16(&mut bytes, value),
        }
        self.write_bytes(&bytes)
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        let mut bytes = [0u8; 4];
        match self.endian {
            Endian::Little => LittleEndian::write_u32(&mut bytes, value),
            Endian::Big    => BigEndian::write_u32(&mut bytes, value),
        }
        self.write_bytes(&bytes)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SerialReader<'a> {
    data:     &'a [u8],
    position: usize,
    endian:   Endian,
}

impl<'a> SerialReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0, endian: Endian::Little }
    }

    pub fn at(data: &'a [u8], position: usize) -> Self {
        Self { data, position, endian: Endian::Little }
    }

    pub fn big_endian(mut self) -> Self {
        self.endian = Endian::Big;
        self
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let endian = self.endian;
        let bytes = self.read_bytes(2)?;
        Ok(match endian {
            Endian::Little => LittleEndian::read_u16(bytes),
            Endian::Big    => BigEndian::read_u16(bytes),
        })
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let endian = self.endian;
        let bytes = self.read_bytes(4)?;
        Ok(match endian {
            Endian::Little => LittleEndian::read_u32(bytes),
            Endian::Big    => BigEndian::read_u32(bytes),
        })
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(BvpError::InvalidArchive(format!(
                "unexpected end of data: wanted {len} bytes at offset {}, {} available",
                self.position,
                self.remaining()
            )));
        }
        let slice = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_layout() {
        let mut w = SerialWriter::new();
        w.write_u32(0x0403_4B50).write_u16(20).write_u8(0xFF).write_bytes(b"ab");
        assert_eq!(w.as_bytes(), &[0x50, 0x4B, 0x03, 0x04, 20, 0, 0xFF, b'a', b'b']);
        assert_eq!(w.position(), 9);
    }

    #[test]
    fn big_endian_layout() {
        let mut w = SerialWriter::new().big_endian();
        w.write_u32(0x0102_0304).write_u16(0x0506);
        assert_eq!(w.into_bytes(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn big_endian_reads_back() {
        let mut w = SerialWriter::new().big_endian();
        w.write_u16(0xBEEF).write_u32(0xDEAD_0001);
        let mut r = SerialReader::new(w.as_bytes()).big_endian();
        assert_eq!(r.read_u16().unwrap(), 0xBEEF);
        assert_eq!(r.read_u32().unwrap(), 0xDEAD_0001);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut w = SerialWriter::with_capacity(4);
        for i in 0..1000u32 {
            w.write_u32(i);
        }
        assert_eq!(w.position(), 4000);
        let mut r = SerialReader::new(w.as_bytes());
        for i in 0..1000u32 {
            assert_eq!(r.read_u32().unwrap(), i);
        }
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn reader_rejects_overrun() {
        let data = [1u8, 2, 3];
        let mut r = SerialReader::new(&data);
        assert_eq!(r.read_u16().unwrap(), 0x0201);
        assert!(matches!(r.read_u16(), Err(BvpError::InvalidArchive(_))));
        assert_eq!(r.read_u8().unwrap(), 3);
    }
}
