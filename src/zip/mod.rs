//! Store-only ZIP container.
//!
//! Layout of an archive, all integers little-endian:
//!
//! ```text
//! [local header | name | data] × N
//! [central directory header | name] × N
//! [end of central directory]
//! ```
//!
//! No compression, no ZIP64, no data descriptors.  Timestamps and
//! attributes are zero so output is deterministic.  The writer makes a
//! single forward pass over its sink and never seeks.

pub mod entry;
pub mod reader;
pub mod records;
pub mod writer;

pub use entry::{flatten, ArchiveEntry, ArchiveNode, EntryRecord};
pub use reader::{ZipArchive, ZipEntry};
pub use writer::{write_archive, write_entries, ArchiveSummary, ZipWriter};
