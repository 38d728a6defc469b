#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::gma::error::{FormatResult, WriteError, WriteResult};
use crate::gma::format::{Entry, EntrySource, Header, IDENT};
use crate::gma::io::{write_cstr, write_i32, write_i64, write_u32, write_u64};

/// Produces the payload bytes of an entry that lives in an existing archive.
pub trait PayloadSource {
    /// Copies the payload of `entry` into `out`, returning the number of bytes copied.
    fn copy_payload(&self, entry: &Entry, out: &mut dyn Write) -> FormatResult<u64>;
}

/// GMA layout:
/// - [IDENT 4]["GMAD"]
/// - [u8 format_version]
/// - [u64 steam_id][u64 timestamp]
/// - required content: NUL-terminated strings ended by an empty one
///   (version > 1 only; always written empty)
/// - [cstr name][cstr description][cstr author][i32 addon_version]
/// - directory, per entry:
///   - [u32 number (1-based, non-zero)]
///   - [cstr name]
///   - [i64 size]
///   - [u32 crc]
/// - [u32 0] directory terminator
/// - payloads, concatenated in directory order
///
/// Returns the number of bytes written. Entries are numbered by their
/// position in `entries`; any `number`/`offset` they carry is ignored.
/// Nothing is written if an archive-sourced entry has no `source`.
pub fn write(
    out: &mut dyn Write,
    header: &Header,
    entries: &[Entry],
    source: Option<&dyn PayloadSource>,
) -> WriteResult<u64> {
    if source.is_none() {
        if let Some(e) = entries.iter().find(|e| e.is_from_archive()) {
            return Err(WriteError::MissingSourceReader {
                name: e.name.clone(),
            });
        }
    }
    if u32::try_from(entries.len()).is_err() {
        return Err(WriteError::TooManyEntries(entries.len()));
    }

    let mut out = CountingWriter { inner: out, written: 0 };

    out.write_all(&IDENT)?;
    out.write_all(&[header.version])?;
    write_u64(&mut out, header.steam_id)?;
    write_u64(&mut out, header.timestamp)?;
    out.write_all(&[0])?;
    write_cstr(&mut out, &header.name)?;
    write_cstr(&mut out, &header.description)?;
    write_cstr(&mut out, &header.author)?;
    write_i32(&mut out, header.addon_version)?;

    for (number, e) in (1u32..).zip(entries) {
        write_u32(&mut out, number)?;
        write_cstr(&mut out, &e.name)?;
        write_i64(&mut out, e.size)?;
        write_u32(&mut out, e.crc)?;
    }
    write_u32(&mut out, 0)?;

    for e in entries {
        let copied = match (&e.source, source) {
            (EntrySource::Disk(path), _) => {
                let mut f = File::open(path).map_err(|err| WriteError::Source {
                    path: path.clone(),
                    source: err,
                })?;
                std::io::copy(&mut f, &mut out)?
            }
            (EntrySource::Archive, Some(src)) => src.copy_payload(e, &mut out)?,
            (EntrySource::Archive, None) => {
                return Err(WriteError::MissingSourceReader {
                    name: e.name.clone(),
                })
            }
        };

        if i64::try_from(copied).ok() != Some(e.size) {
            warn!(
                name = %e.name,
                declared = e.size,
                actual = copied,
                "payload length differs from declared size"
            );
        }
        debug!(name = %e.name, size = copied, "wrote payload");
    }

    out.flush()?;
    Ok(out.written)
}

/// Writes an archive to `path`, replacing it only once the whole archive is written.
///
/// The archive is assembled in a temporary file next to `path` and renamed over
/// it on success, so a failure never leaves a truncated archive behind. `path`
/// may be the archive `source` reads from.
pub fn write_to_path(
    path: &Path,
    header: &Header,
    entries: &[Entry],
    source: Option<&dyn PayloadSource>,
) -> WriteResult<u64> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir)?;

    let mut buf = BufWriter::new(tmp);
    let written = write(&mut buf, header, entries, source)?;
    let tmp = buf.into_inner().map_err(|e| WriteError::Io(e.into_error()))?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    info!(
        path = %path.display(),
        entries = entries.len(),
        bytes = written,
        "wrote archive"
    );
    Ok(written)
}

struct CountingWriter<'a> {
    inner: &'a mut dyn Write,
    written: u64,
}

impl Write for CountingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
