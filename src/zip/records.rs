//! Fixed-layout ZIP structures (APPNOTE 4.3.7, 4.3.12, 4.3.16).

use crate::error::{BvpError, Result};
use crate::serial::{SerialReader, SerialWriter};

pub const LOCAL_FILE_HEADER_SIGNATURE:   u32 = 0x0403_4B50;
pub const CENTRAL_DIRECTORY_SIGNATURE:   u32 = 0x0201_4B50;
pub const END_OF_CENTRAL_DIR_SIGNATURE:  u32 = 0x0605_4B50;

/// Version needed to extract: 2.0, the baseline for stored entries.
pub const VERSION_NEEDED: u16 = 20;
pub const VERSION_MADE_BY: u16 = 0;
pub const METHOD_STORED: u16 = 0;

pub const LOCAL_FILE_HEADER_SIZE:  usize = 30;
pub const CENTRAL_DIRECTORY_SIZE:  usize = 46;
pub const END_OF_CENTRAL_DIR_SIZE: usize = 22;

fn expect_signature(reader: &mut SerialReader<'_>, expected: u32, what: &str) -> Result<()> {
    let at = reader.position();
    let found = reader.read_u32()?;
    if found != expected {
        return Err(BvpError::InvalidArchive(format!(
            "bad {what} signature {found:#010x} at offset {at}"
        )));
    }
    Ok(())
}

fn read_name(reader: &mut SerialReader<'_>, len: u16) -> Result<String> {
    let bytes = reader.read_bytes(len as usize)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| BvpError::InvalidArchive("entry name is not UTF-8".into()))
}

// ── Local file header ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags:          u16,
    pub method:         u16,
    pub mod_time:       u16,
    pub mod_date:       u16,
    pub crc32:          u32,
    pub compressed:     u32,
    pub uncompressed:   u32,
    pub name:           String,
}

impl LocalFileHeader {
    pub fn stored(name: &str, crc32: u32, size: u32) -> Self {
        Self {
            version_needed: VERSION_NEEDED,
            flags:          0,
            method:         METHOD_STORED,
            mod_time:       0,
            mod_date:       0,
            crc32,
            compressed:     size,
            uncompressed:   size,
            name:           name.to_owned(),
        }
    }

    pub fn encoded_len(&self) -> usize {
        LOCAL_FILE_HEADER_SIZE + self.name.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = SerialWriter::with_capacity(self.encoded_len());
        w.write_u32(LOCAL_FILE_HEADER_SIGNATURE)
            .write_u16(self.version_needed)
            .write_u16(self.flags)
            .write_u16(self.method)
            .write_u16(self.mod_time)
            .write_u16(self.mod_date)
            .write_u32(self.crc32)
            .write_u32(self.compressed)
            .write_u32(self.uncompressed)
            .write_u16(self.name.len() as u16)
            .write_u16(0) // extra field length
            .write_bytes(self.name.as_bytes());
        w.into_bytes()
    }

    /// Parse a header; the reader is left at the start of the entry data.
    pub fn read(reader: &mut SerialReader<'_>) -> Result<Self> {
        expect_signature(reader, LOCAL_FILE_HEADER_SIGNATURE, "local file header")?;
        let version_needed = reader.read_u16()?;
        let flags          = reader.read_u16()?;
        let method         = reader.read_u16()?;
        let mod_time       = reader.read_u16()?;
        let mod_date       = reader.read_u16()?;
        let crc32          = reader.read_u32()?;
        let compressed     = reader.read_u32()?;
        let uncompressed   = reader.read_u32()?;
        let name_len       = reader.read_u16()?;
        let extra_len      = reader.read_u16()?;
        let name           = read_name(reader, name_len)?;
        reader.read_bytes(extra_len as usize)?;
        Ok(Self {
            version_needed, flags, method, mod_time, mod_date,
            crc32, compressed, uncompressed, name,
        })
    }
}

// ── Central directory file header ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed:  u16,
    pub flags:           u16,
    pub method:          u16,
    pub mod_time:        u16,
    pub mod_date:        u16,
    pub crc32:           u32,
    pub compressed:      u32,
    pub uncompressed:    u32,
    pub disk_start:      u16,
    pub internal_attrs:  u16,
    pub external_attrs:  u32,
    pub local_offset:    u32,
    pub name:            String,
}

impl CentralDirectoryHeader {
    pub fn stored(name: &str, crc32: u32, size: u32, local_offset: u32) -> Self {
        Self {
            version_made_by: VERSION_MADE_BY,
            version_needed:  VERSION_NEEDED,
            flags:           0,
            method:          METHOD_STORED,
            mod_time:        0,
            mod_date:        0,
            crc32,
            compressed:      size,
            uncompressed:    size,
            disk_start:      0,
            internal_attrs:  0,
            external_attrs:  0,
            local_offset,
            name:            name.to_owned(),
        }
    }

    pub fn encoded_len(&self) -> usize {
        CENTRAL_DIRECTORY_SIZE + self.name.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = SerialWriter::with_capacity(self.encoded_len());
        w.write_u32(CENTRAL_DIRECTORY_SIGNATURE)
            .write_u16(self.version_made_by)
            .write_u16(self.version_needed)
            .write_u16(self.flags)
            .write_u16(self.method)
            .write_u16(self.mod_time)
            .write_u16(self.mod_date)
            .write_u32(self.crc32)
            .write_u32(self.compressed)
            .write_u32(self.uncompressed)
            .write_u16(self.name.len() as u16)
            .write_u16(0) // extra field length
            .write_u16(0) // file comment length
            .write_u16(self.disk_start)
            .write_u16(self.internal_attrs)
            .write_u32(self.external_attrs)
            .write_u32(self.local_offset)
            .write_bytes(self.name.as_bytes());
        w.into_bytes()
    }

    pub fn read(reader: &mut SerialReader<'_>) -> Result<Self> {
        expect_signature(reader, CENTRAL_DIRECTORY_SIGNATURE, "central directory")?;
        let version_made_by = reader.read_u16()?;
        let version_needed  = reader.read_u16()?;
        let flags           = reader.read_u16()?;
        let method          = reader.read_u16()?;
        let mod_time        = reader.read_u16()?;
        let mod_date        = reader.read_u16()?;
        let crc32           = reader.read_u32()?;
        let compressed      = reader.read_u32()?;
        let uncompressed    = reader.read_u32()?;
        let name_len        = reader.read_u16()?;
        let extra_len       = reader.read_u16()?;
        let comment_len     = reader.read_u16()?;
        let disk_start      = reader.read_u16()?;
        let internal_attrs  = reader.read_u16()?;
        let external_attrs  = reader.read_u32()?;
        let local_offset    = reader.read_u32()?;
        let name            = read_name(reader, name_len)?;
        reader.read_bytes(extra_len as usize + comment_len as usize)?;
        Ok(Self {
            version_made_by, version_needed, flags, method, mod_time, mod_date,
            crc32, compressed, uncompressed, disk_start, internal_attrs,
            external_attrs, local_offset, name,
        })
    }
}

// ── End of central directory ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number:     u16,
    pub cd_start_disk:   u16,
    pub entries_on_disk: u16,
    pub total_entries:   u16,
    pub cd_size:         u32,
    pub cd_offset:       u32,
    pub comment_len:     u16,
}

impl EndOfCentralDirectory {
    pub fn single_disk(entries: u16, cd_size: u32, cd_offset: u32) -> Self {
        Self {
            disk_number:     0,
            cd_start_disk:   0,
            entries_on_disk: entries,
            total_entries:   entries,
            cd_size,
            cd_offset,
            comment_len:     0,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = SerialWriter::with_capacity(END_OF_CENTRAL_DIR_SIZE);
        w.write_u32(END_OF_CENTRAL_DIR_SIGNATURE)
            .write_u16(self.disk_number)
            .write_u16(self.cd_start_disk)
            .write_u16(self.entries_on_disk)
            .write_u16(self.total_entries)
            .write_u32(self.cd_size)
            .write_u32(self.cd_offset)
            .write_u16(self.comment_len);
        w.into_bytes()
    }

    pub fn read(reader: &mut SerialReader<'_>) -> Result<Self> {
        expect_signature(reader, END_OF_CENTRAL_DIR_SIGNATURE, "end of central directory")?;
        Ok(Self {
            disk_number:     reader.read_u16()?,
            cd_start_disk:   reader.read_u16()?,
            entries_on_disk: reader.read_u16()?,
            total_entries:   reader.read_u16()?,
            cd_size:         reader.read_u32()?,
            cd_offset:       reader.read_u32()?,
            comment_len:     reader.read_u16()?,
        })
    }
}
