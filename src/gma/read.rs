#![forbid(unsafe_code)]

use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::gma::error::{FormatError, FormatResult};
use crate::gma::format::{Entry, EntrySource, Header, IDENT, MAX_VERSION};
use crate::gma::io::{
    eof_as_truncated, read_cstr, read_exact, read_i32, read_i64, read_u32, read_u64, read_u8,
};
use crate::gma::write::PayloadSource;

/// A parsed archive: header, directory, and the stream the payloads live in.
///
/// The stream is owned for the reader's lifetime. Payload fetches lock it, so
/// a `Reader` can be shared between threads; fetches are serialized.
pub struct Reader<R> {
    stream: Mutex<R>,
    header: Header,
    entries: Vec<Entry>,
    file_block_offset: u64,
}

impl Reader<BufReader<File>> {
    /// Opens and parses the archive at `path`.
    pub fn open(path: &Path) -> FormatResult<Self> {
        let file = File::open(path)?;
        Self::parse(BufReader::new(file))
    }
}

impl<R: Read + Seek> Reader<R> {
    /// Parses the header and directory starting at the stream's current position.
    ///
    /// Reading is strictly forward. On return the stream sits at the start of
    /// the data block; payloads are only read on demand.
    pub fn parse(mut stream: R) -> FormatResult<Self> {
        let header = read_header(&mut stream)?;
        let entries = read_directory(&mut stream)?;
        if entries.is_empty() {
            return Err(FormatError::Empty);
        }
        let file_block_offset = stream.stream_position()?;

        info!(
            name = %header.name,
            version = header.version,
            entries = entries.len(),
            "parsed archive"
        );

        Ok(Self {
            stream: Mutex::new(stream),
            header,
            entries,
            file_block_offset,
        })
    }

    /// Copies the payload of `entry` into `out` without buffering it whole.
    pub fn copy_entry(&self, entry: &Entry, out: &mut dyn Write) -> FormatResult<u64> {
        let (start, len) = self.payload_span(entry)?;

        let mut stream = self.stream.lock();
        stream.seek(SeekFrom::Start(start))?;
        let copied = std::io::copy(&mut Read::by_ref(&mut *stream).take(len), out)?;
        if copied != len {
            return Err(FormatError::Truncated("entry payload"));
        }
        Ok(copied)
    }

    /// Raw payload of `entry`.
    pub fn entry_bytes(&self, entry: &Entry) -> FormatResult<Vec<u8>> {
        let (start, len) = self.payload_span(entry)?;
        let len = usize::try_from(len).map_err(|_| FormatError::TooLarge {
            name: entry.name.clone(),
            size: entry.size,
        })?;

        let mut buf = vec![0u8; len];
        let mut stream = self.stream.lock();
        stream.seek(SeekFrom::Start(start))?;
        stream
            .read_exact(&mut buf)
            .map_err(|e| eof_as_truncated(e, "entry payload"))?;
        Ok(buf)
    }

    /// Raw payload of the `number`th entry, counting from 1.
    pub fn entry_bytes_by_number(&self, number: usize) -> FormatResult<Vec<u8>> {
        let entry = self.entry(number)?;
        self.entry_bytes(entry)
    }

    fn payload_span(&self, entry: &Entry) -> FormatResult<(u64, u64)> {
        let len = u64::try_from(entry.size).map_err(|_| FormatError::NegativeSize {
            name: entry.name.clone(),
            size: entry.size,
        })?;
        let start = u64::try_from(entry.offset)
            .ok()
            .and_then(|off| self.file_block_offset.checked_add(off))
            .ok_or_else(|| FormatError::TooLarge {
                name: entry.name.clone(),
                size: entry.size,
            })?;
        Ok((start, len))
    }
}

impl<R> Reader<R> {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// The `number`th entry, counting from 1.
    pub fn entry(&self, number: usize) -> FormatResult<&Entry> {
        number
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .ok_or(FormatError::OutOfRange {
                index: number,
                count: self.entries.len(),
            })
    }

    /// Absolute stream offset of the first payload byte.
    pub fn file_block_offset(&self) -> u64 {
        self.file_block_offset
    }

    pub fn into_parts(self) -> (Header, Vec<Entry>) {
        (self.header, self.entries)
    }
}

impl<R> std::fmt::Debug for Reader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("header", &self.header)
            .field("entries", &self.entries.len())
            .field("file_block_offset", &self.file_block_offset)
            .finish_non_exhaustive()
    }
}

impl<R: Read + Seek> PayloadSource for Reader<R> {
    fn copy_payload(&self, entry: &Entry, out: &mut dyn Write) -> FormatResult<u64> {
        self.copy_entry(entry, out)
    }
}

fn read_header(r: &mut dyn Read) -> FormatResult<Header> {
    let ident = read_exact::<4>(r, "ident")?;
    if ident != IDENT {
        return Err(FormatError::BadIdent { got: ident });
    }

    let version = read_u8(r, "format version")?;
    if version > MAX_VERSION {
        return Err(FormatError::UnsupportedVersion {
            got: version,
            max: MAX_VERSION,
        });
    }

    let steam_id = read_u64(r, "steam id")?;
    let timestamp = read_u64(r, "timestamp")?;

    if version > 1 {
        let mut skipped = 0usize;
        while !read_cstr(r, "required content")?.is_empty() {
            skipped += 1;
        }
        if skipped > 0 {
            debug!(skipped, "discarded required content strings");
        }
    }

    let name = read_cstr(r, "addon name")?;
    let description = read_cstr(r, "addon description")?;
    let author = read_cstr(r, "addon author")?;
    let addon_version = read_i32(r, "addon version")?;

    Ok(Header {
        version,
        steam_id,
        timestamp,
        name,
        description,
        author,
        addon_version,
    })
}

fn read_directory(r: &mut dyn Read) -> FormatResult<Vec<Entry>> {
    let mut entries = Vec::new();
    let mut offset: i64 = 0;
    let mut number: u32 = 1;

    loop {
        let marker = read_u32(r, "entry marker")?;
        if marker == 0 {
            break;
        }
        if marker != number {
            warn!(marker, expected = number, "entry marker does not match its position");
        }

        let name = read_cstr(r, "entry name")?;
        let size = read_i64(r, "entry size")?;
        let crc = read_u32(r, "entry crc")?;

        if size < 0 {
            return Err(FormatError::NegativeSize { name, size });
        }

        debug!(number, name = %name, size, offset, "entry");

        let next = offset
            .checked_add(size)
            .ok_or_else(|| FormatError::TooLarge {
                name: name.clone(),
                size,
            })?;

        entries.push(Entry {
            name,
            size,
            crc,
            number,
            offset,
            source: EntrySource::Archive,
        });

        offset = next;
        number = number.wrapping_add(1);
    }

    Ok(entries)
}
