#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// GMA header magic.
pub const IDENT: [u8; 4] = *b"GMAD";

/// Highest format version this codec reads. Also the version written by default.
pub const MAX_VERSION: u8 = 3;

/// Steam app id the format belongs to.
pub const APP_ID: u32 = 4000;

/// Part of the format contract; the codec never emits or checks it.
pub const COMPRESSION_SIGNATURE: u32 = 0xBEEF_CACE;

/// Archive header as stored on the wire, minus the magic.
///
/// The offset of the data block is derived while parsing and lives on the
/// reader, not here, so two headers compare equal regardless of where their
/// payloads start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub steam_id: u64,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub name: String,
    pub description: String,
    pub author: String,
    pub addon_version: i32,
}

impl Header {
    /// Header for a new archive: current format version, stamped now.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: MAX_VERSION,
            steam_id: 0,
            timestamp: unix_now(),
            name: name.into(),
            description: String::new(),
            author: String::new(),
            addon_version: 1,
        }
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Where the payload of an entry comes from when an archive is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    /// Stored in an existing archive; fetched through a [`PayloadSource`](crate::gma::PayloadSource).
    Archive,
    /// Read from this file at write time.
    Disk(PathBuf),
}

/// One directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Forward-slash virtual path, e.g. `materials/foo/bar.vtf`.
    pub name: String,
    pub size: i64,
    /// Carried as-is, never checked unless [`verify`](crate::gma::verify) is asked to.
    pub crc: u32,
    /// 1-indexed position in the directory.
    pub number: u32,
    /// Offset relative to the start of the data block.
    pub offset: i64,
    pub source: EntrySource,
}

impl Entry {
    /// Entry backed by a file on disk. Numbering and offset are assigned on write.
    pub fn from_disk(name: impl Into<String>, path: impl Into<PathBuf>, size: i64) -> Self {
        Self {
            name: name.into(),
            size,
            crc: 0,
            number: 0,
            offset: 0,
            source: EntrySource::Disk(path.into()),
        }
    }

    pub fn is_from_archive(&self) -> bool {
        matches!(self.source, EntrySource::Archive)
    }
}

/// Public view of an entry (for listings, front-ends, etc.).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub number: u32,
    pub name: String,
    pub size: i64,
    pub offset: i64,
    pub crc: u32,
}

impl From<&Entry> for EntryInfo {
    fn from(e: &Entry) -> Self {
        Self {
            number: e.number,
            name: e.name.clone(),
            size: e.size,
            offset: e.offset,
            crc: e.crc,
        }
    }
}
