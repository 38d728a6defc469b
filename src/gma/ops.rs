#![forbid(unsafe_code)]

use crc32fast::Hasher;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::gma::error::{FormatError, GmaError, GmaResult};
use crate::gma::filter::is_included;
use crate::gma::format::{unix_now, Entry, EntryInfo, EntrySource, Header, MAX_VERSION};
use crate::gma::path::{normalize_rel_path, output_path};
use crate::gma::read::Reader;
use crate::gma::write::{write_to_path, PayloadSource};

/// An archive opened from disk.
pub type FileReader = Reader<BufReader<File>>;

/// Header fields for a freshly built archive.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub name: String,
    pub description: String,
    pub author: String,
    pub steam_id: u64,
    pub addon_version: i32,
    /// Seconds since the Unix epoch; `None` stamps the current time.
    pub timestamp: Option<u64>,
    /// Fill in CRC32 of every packed file. Off by default; the format never requires it.
    pub compute_crc: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            author: String::new(),
            steam_id: 0,
            addon_version: 1,
            timestamp: None,
            compute_crc: false,
        }
    }
}

impl BuildOptions {
    pub fn header(&self) -> Header {
        Header {
            version: MAX_VERSION,
            steam_id: self.steam_id,
            timestamp: self.timestamp.unwrap_or_else(unix_now),
            name: self.name.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            addon_version: self.addon_version,
        }
    }
}

/// Parse the archive at `path`.
pub fn open(path: &Path) -> GmaResult<FileReader> {
    Reader::open(path).map_err(|source| GmaError::Archive {
        path: path.to_path_buf(),
        source,
    })
}

/// Read archive directory entries (without extracting payloads).
pub fn entries(path: &Path) -> GmaResult<Vec<EntryInfo>> {
    let reader = open(path)?;
    Ok(reader.entries().iter().map(EntryInfo::from).collect())
}

pub fn info(path: &Path) -> GmaResult<()> {
    let reader = open(path)?;
    let h = reader.header();
    let total: i64 = reader.entries().iter().map(|e| e.size).sum();
    println!("name          : {}", h.name);
    println!("author        : {}", h.author);
    println!("description   : {}", h.description);
    println!("format version: {}", h.version);
    println!("addon version : {}", h.addon_version);
    println!("steam id      : {}", h.steam_id);
    println!("timestamp     : {}", h.timestamp);
    println!("entries       : {}", reader.entry_count());
    println!("payload bytes : {total}");
    Ok(())
}

pub fn list(path: &Path, verbose: bool) -> GmaResult<()> {
    for e in entries(path)? {
        if verbose {
            println!(
                "{:>5}  {}  size={} off={} crc={:08x}",
                e.number, e.name, e.size, e.offset, e.crc
            );
        } else {
            println!("{}", e.name);
        }
    }
    Ok(())
}

/// Writes the payload of `entry` to its virtual path under `output`.
pub fn extract_entry<R>(reader: &Reader<R>, entry: &Entry, output: &Path) -> GmaResult<PathBuf>
where
    R: std::io::Read + std::io::Seek,
{
    let out_path = output_path(output, &entry.name)?;
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut out = BufWriter::new(File::create(&out_path)?);
    reader.copy_entry(entry, &mut out)?;
    out.flush()?;

    debug!(name = %entry.name, path = %out_path.display(), "extracted");
    Ok(out_path)
}

/// Extract every entry (or those whose name contains one of `filter`) under `output`.
pub fn extract(path: &Path, output: &Path, filter: &[String]) -> GmaResult<usize> {
    let reader = open(path)?;
    std::fs::create_dir_all(output)?;

    let mut count = 0;
    for e in reader.entries() {
        if !filter.is_empty() && !filter.iter().any(|s| e.name.contains(s.as_str())) {
            continue;
        }
        extract_entry(&reader, e, output)?;
        count += 1;
    }

    info!(archive = %path.display(), count, "extracted entries");
    Ok(count)
}

/// Files under `root` that may be packed, as disk-sourced entries sorted by name.
///
/// Paths are normalized to forward slashes here, before the inclusion filter sees them.
/// Sizes come from file metadata; CRCs are left at zero.
pub fn scan_directory(root: &Path) -> GmaResult<Vec<Entry>> {
    let mut out = Vec::new();
    let mut skipped = 0usize;

    for ent in WalkDir::new(root).follow_links(false) {
        let ent = ent?;
        if !ent.file_type().is_file() {
            continue;
        }

        let name = normalize_rel_path(root, ent.path())?;
        if !is_included(&name) {
            debug!(name = %name, "not allowed in an addon, skipping");
            skipped += 1;
            continue;
        }

        let size = i64::try_from(ent.metadata()?.len())
            .map_err(|_| GmaError::Outside(name.clone()))?;
        out.push(Entry::from_disk(name, ent.path(), size));
    }

    out.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    info!(root = %root.display(), files = out.len(), skipped, "scanned directory");
    Ok(out)
}

/// Fill in the CRC32 of every disk-sourced entry.
pub fn compute_crcs(entries: &mut [Entry]) -> GmaResult<()> {
    for e in entries.iter_mut() {
        if let EntrySource::Disk(path) = &e.source {
            let mut crc = CrcWriter::default();
            std::io::copy(&mut File::open(path)?, &mut crc)?;
            e.crc = crc.finish();
        }
    }
    Ok(())
}

/// Writes `entries` under `header` to `output`.
pub fn build_archive(
    output: &Path,
    header: &Header,
    entries: &[Entry],
    source: Option<&dyn PayloadSource>,
) -> GmaResult<u64> {
    Ok(write_to_path(output, header, entries, source)?)
}

/// Build an archive at `output` from the allowed files under `input`.
pub fn build(input: &Path, output: &Path, opts: &BuildOptions) -> GmaResult<usize> {
    let mut files = scan_directory(input)?;
    if files.is_empty() {
        return Err(GmaError::Format(FormatError::Empty));
    }
    if opts.compute_crc {
        compute_crcs(&mut files)?;
    }

    build_archive(output, &opts.header(), &files, None)?;
    Ok(files.len())
}

/// Rewrites `archive` to `output` with entries removed and/or files added.
///
/// Entries whose name contains any of `remove` are dropped. Files scanned from
/// `add` replace existing entries of the same name, or are appended. `output`
/// may be `archive` itself.
pub fn amend(
    archive: &Path,
    output: &Path,
    add: Option<&Path>,
    remove: &[String],
    compute_crc: bool,
) -> GmaResult<usize> {
    let reader = open(archive)?;

    let mut entries: Vec<Entry> = reader
        .entries()
        .iter()
        .filter(|e| !remove.iter().any(|r| !r.is_empty() && e.name.contains(r.as_str())))
        .cloned()
        .collect();

    if let Some(dir) = add {
        let mut added = scan_directory(dir)?;
        if compute_crc {
            compute_crcs(&mut added)?;
        }
        for new in added {
            match entries.iter_mut().find(|e| e.name == new.name) {
                Some(existing) => *existing = new,
                None => entries.push(new),
            }
        }
    }

    if entries.is_empty() {
        return Err(GmaError::Format(FormatError::Empty));
    }

    build_archive(output, reader.header(), &entries, Some(&reader))?;
    Ok(entries.len())
}

/// Check every payload is present and, where a CRC is recorded, matches it.
pub fn verify(path: &Path) -> GmaResult<usize> {
    let reader = open(path)?;
    let file_len = std::fs::metadata(path)?.len();

    for e in reader.entries() {
        let end = reader
            .file_block_offset()
            .checked_add(e.offset as u64)
            .and_then(|v| v.checked_add(e.size as u64));
        if end.map_or(true, |end| end > file_len) {
            return Err(GmaError::Archive {
                path: path.to_path_buf(),
                source: FormatError::Truncated("entry payload"),
            });
        }

        if e.crc == 0 {
            continue;
        }
        let mut crc = CrcWriter::default();
        reader.copy_entry(e, &mut crc)?;
        let actual = crc.finish();
        if actual != e.crc {
            return Err(GmaError::Verify {
                name: e.name.clone(),
                expected: e.crc,
                actual,
            });
        }
    }

    Ok(reader.entry_count())
}

#[derive(Default)]
struct CrcWriter {
    hasher: Hasher,
}

impl CrcWriter {
    fn finish(self) -> u32 {
        self.hasher.finalize()
    }
}

impl Write for CrcWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.hasher.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
