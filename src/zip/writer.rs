//! Single-pass ZIP writer.

use std::io::Write;

use crate::crc::crc32;
use crate::error::{BvpError, Result};
use crate::zip::entry::{flatten, ArchiveEntry, ArchiveNode, EntryRecord};
use crate::zip::records::{CentralDirectoryHeader, EndOfCentralDirectory, LocalFileHeader};

/// Most entries a non-ZIP64 archive can list.
pub const MAX_ENTRIES: usize = u16::MAX as usize;

/// Byte accounting of a finished archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub entries:   Vec<EntryRecord>,
    pub cd_offset: u32,
    pub cd_size:   u32,
    /// Total bytes written, central directory and EOCD included.
    pub total_len: u64,
}

/// Writes entries to `sink` in the order given.
///
/// `offset` always equals the number of bytes handed to `sink` so far;
/// every recorded header offset is taken from it.
pub struct ZipWriter<W: Write> {
    sink:    W,
    offset:  u64,
    entries: Vec<EntryRecord>,
}

impl<W: Write> ZipWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, offset: 0, entries: Vec::new() }
    }

    /// Bytes written so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn entries(&self) -> &[EntryRecord] {
        &self.entries
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    fn offset_u32(&self) -> Result<u32> {
        u32::try_from(self.offset).map_err(|_| {
            BvpError::InvalidArchive(format!(
                "archive offset {} exceeds the 4 GiB limit of non-ZIP64 archives",
                self.offset
            ))
        })
    }

    /// Write one stored entry: local header, then the payload verbatim.
    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> Result<&EntryRecord> {
        if name.len() > u16::MAX as usize {
            return Err(BvpError::InvalidArchive(format!("entry name too long: {} bytes", name.len())));
        }
        // The EOCD entry counts are u16.
        if self.entries.len() >= MAX_ENTRIES {
            return Err(BvpError::InvalidArchive(format!(
                "more than {MAX_ENTRIES} entries need a ZIP64 archive"
            )));
        }
        let size = u32::try_from(data.len()).map_err(|_| {
            BvpError::InvalidArchive(format!("entry {name} is larger than 4 GiB"))
        })?;

        log::debug!("storing {name} ({size} bytes)");
        let crc = crc32(data);
        let offset = self.offset_u32()?;
        let header = LocalFileHeader::stored(name, crc, size);
        self.emit(&header.to_bytes())?;
        self.emit(data)?;

        self.entries.push(EntryRecord { name: name.to_owned(), crc, size, offset });
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Write an empty directory entry; a trailing `/` is added if missing.
    pub fn add_directory(&mut self, name: &str) -> Result<&EntryRecord> {
        if name.ends_with('/') {
            self.add_entry(name, &[])
        } else {
            self.add_entry(&format!("{name}/"), &[])
        }
    }

    /// Write the central directory and EOCD record, then flush the sink.
    pub fn finish(mut self) -> Result<(W, ArchiveSummary)> {
        let cd_offset = self.offset_u32()?;
        let records = std::mem::take(&mut self.entries);
        for record in &records {
            log::debug!("writing central directory header for {}", record.name);
            let header = CentralDirectoryHeader::stored(&record.name, record.crc, record.size, record.offset);
            self.emit(&header.to_bytes())?;
        }
        let cd_end = self.offset_u32()?;
        let cd_size = cd_end - cd_offset;

        log::debug!("writing end of central directory ({} entries)", records.len());
        let eocd = EndOfCentralDirectory::single_disk(records.len() as u16, cd_size, cd_offset);
        self.emit(&eocd.to_bytes())?;
        self.sink.flush()?;

        let summary = ArchiveSummary {
            entries: records,
            cd_offset,
            cd_size,
            total_len: self.offset,
        };
        Ok((self.sink, summary))
    }
}

/// Flatten `nodes` and write them as one archive.
pub fn write_archive<W: Write>(nodes: Vec<ArchiveNode>, sink: W) -> Result<(W, ArchiveSummary)> {
    write_entries(flatten(nodes), sink)
}

/// Write already-flat entries as one archive.
pub fn write_entries<W: Write>(entries: Vec<ArchiveEntry>, sink: W) -> Result<(W, ArchiveSummary)> {
    let mut zip = ZipWriter::new(sink);
    for entry in &entries {
        zip.add_entry(&entry.name, &entry.data)?;
    }
    zip.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::records::{END_OF_CENTRAL_DIR_SIZE, LOCAL_FILE_HEADER_SIZE};

    #[test]
    fn offsets_track_stream_position() {
        let mut zip = ZipWriter::new(Vec::new());
        assert_eq!(zip.add_entry("a.txt", b"hi").unwrap().offset, 0);
        let second = zip.add_entry("b.txt", b"").unwrap().offset;
        assert_eq!(second as usize, LOCAL_FILE_HEADER_SIZE + 5 + 2);
        let (bytes, summary) = zip.finish().unwrap();

        assert_eq!(summary.cd_offset as usize, 2 * (LOCAL_FILE_HEADER_SIZE + 5) + 2);
        assert_eq!(summary.cd_size as usize, 2 * (46 + 5));
        assert_eq!(summary.total_len as usize, bytes.len());
        assert_eq!(
            bytes.len(),
            summary.cd_offset as usize + summary.cd_size as usize + END_OF_CENTRAL_DIR_SIZE
        );
    }

    #[test]
    fn empty_archive_is_just_eocd() {
        let (bytes, summary) = write_entries(Vec::new(), Vec::new()).unwrap();
        assert_eq!(bytes.len(), END_OF_CENTRAL_DIR_SIZE);
        assert_eq!(summary.cd_offset, 0);
        assert_eq!(summary.cd_size, 0);
    }

    #[test]
    fn directory_gets_trailing_slash() {
        let mut zip = ZipWriter::new(Vec::new());
        assert_eq!(zip.add_directory("blocks").unwrap().name, "blocks/");
        assert_eq!(zip.add_directory("x/").unwrap().name, "x/");
    }

    #[test]
    fn entry_count_limit() {
        let mut zip = ZipWriter::new(std::io::sink());
        for i in 0..MAX_ENTRIES {
            zip.add_entry(&format!("{i}"), &[]).unwrap();
        }
        assert!(matches!(zip.add_entry("one-more", &[]), Err(BvpError::InvalidArchive(_))));
        let (_, summary) = zip.finish().unwrap();
        assert_eq!(summary.entries.len(), 65535);
    }

    #[test]
    fn crc_is_recorded() {
        let (_, summary) = write_entries(vec![ArchiveEntry::new("n", b"123456789".to_vec())], Vec::new()).unwrap();
        assert_eq!(summary.entries[0].crc, 0xCBF4_3926);
        assert_eq!(summary.entries[0].size, 9);
    }
}
