//! Strict reader for store-only archives.
//!
//! Locates the end-of-central-directory record by scanning backwards (as
//! general-purpose readers do), walks the central directory, and checks
//! each local header and payload CRC against it.

use crate::crc::crc32;
use crate::error::{BvpError, Result};
use crate::serial::SerialReader;
use crate::zip::records::{
    CentralDirectoryHeader, EndOfCentralDirectory, LocalFileHeader,
    END_OF_CENTRAL_DIR_SIGNATURE, END_OF_CENTRAL_DIR_SIZE, METHOD_STORED,
};

/// One entry resolved against the archive bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry<'a> {
    pub name:   String,
    pub crc:    u32,
    pub offset: u32,
    pub data:   &'a [u8],
}

#[derive(Debug, Clone)]
pub struct ZipArchive<'a> {
    pub eocd:        EndOfCentralDirectory,
    pub eocd_offset: usize,
    entries:         Vec<ZipEntry<'a>>,
}

fn invalid(msg: impl Into<String>) -> BvpError {
    BvpError::InvalidArchive(msg.into())
}

fn find_eocd(bytes: &[u8]) -> Result<usize> {
    if bytes.len() < END_OF_CENTRAL_DIR_SIZE {
        return Err(invalid("too short to hold an end of central directory record"));
    }
    let signature = END_OF_CENTRAL_DIR_SIGNATURE.to_le_bytes();
    let last = bytes.len() - END_OF_CENTRAL_DIR_SIZE;
    // The archive comment is at most u16::MAX bytes.
    let first = last.saturating_sub(u16::MAX as usize);
    (first..=last)
        .rev()
        .find(|&pos| bytes[pos..pos + 4] == signature)
        .ok_or_else(|| invalid("end of central directory record not found"))
}

impl<'a> ZipArchive<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let eocd_offset = find_eocd(bytes)?;
        let eocd = EndOfCentralDirectory::read(&mut SerialReader::at(bytes, eocd_offset))?;

        if eocd.disk_number != 0 || eocd.cd_start_disk != 0 || eocd.entries_on_disk != eocd.total_entries {
            return Err(invalid("multi-disk archives are not supported"));
        }
        let cd_start = eocd.cd_offset as usize;
        let cd_end = cd_start + eocd.cd_size as usize;
        if cd_end != eocd_offset {
            return Err(invalid(format!(
                "central directory spans {cd_start}..{cd_end} but EOCD sits at {eocd_offset}"
            )));
        }

        let mut cd = SerialReader::at(bytes, cd_start);
        let mut entries = Vec::with_capacity(eocd.total_entries as usize);
        for _ in 0..eocd.total_entries {
            let central = CentralDirectoryHeader::read(&mut cd)?;
            entries.push(resolve_entry(bytes, &central)?);
        }
        if cd.position() != cd_end {
            return Err(invalid(format!(
                "central directory headers end at {} but size field says {cd_end}",
                cd.position()
            )));
        }

        Ok(Self { eocd, eocd_offset, entries })
    }

    pub fn entries(&self) -> &[ZipEntry<'a>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<&ZipEntry<'a>> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn read(&self, name: &str) -> Result<&'a [u8]> {
        self.by_name(name)
            .map(|e| e.data)
            .ok_or_else(|| invalid(format!("entry not found: {name}")))
    }
}

fn resolve_entry<'a>(bytes: &'a [u8], central: &CentralDirectoryHeader) -> Result<ZipEntry<'a>> {
    if central.method != METHOD_STORED {
        return Err(invalid(format!("{}: compression method {} unsupported", central.name, central.method)));
    }
    if central.compressed != central.uncompressed {
        return Err(invalid(format!("{}: stored entry sizes differ", central.name)));
    }

    let mut reader = SerialReader::at(bytes, central.local_offset as usize);
    let local = LocalFileHeader::read(&mut reader)?;
    if local.name != central.name
        || local.crc32 != central.crc32
        || local.compressed != central.compressed
        || local.method != central.method
    {
        return Err(invalid(format!(
            "local header at {} disagrees with central directory for {}",
            central.local_offset, central.name
        )));
    }

    let data = reader.read_bytes(central.compressed as usize)?;
    let actual = crc32(data);
    if actual != central.crc32 {
        return Err(invalid(format!(
            "{}: CRC mismatch (stored {:#010x}, computed {actual:#010x})",
            central.name, central.crc32
        )));
    }

    Ok(ZipEntry {
        name:   central.name.clone(),
        crc:    central.crc32,
        offset: central.local_offset,
        data,
    })
}
