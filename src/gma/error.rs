#![forbid(unsafe_code)]

use std::path::PathBuf;
use thiserror::Error;

/// Failure while parsing an archive or fetching a payload from it.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a GMA archive: expected ident \"GMAD\", got {got:?}")]
    BadIdent { got: [u8; 4] },

    #[error("unsupported format version {got} (newest supported is {max})")]
    UnsupportedVersion { got: u8, max: u8 },

    #[error("archive contains no entries")]
    Empty,

    #[error("unexpected end of data while reading {0}")]
    Truncated(&'static str),

    #[error("{0} is not valid utf-8")]
    InvalidUtf8(&'static str),

    #[error("entry {name} declares negative size {size}")]
    NegativeSize { name: String, size: i64 },

    #[error("entry {name} is too large to read into memory ({size} bytes)")]
    TooLarge { name: String, size: i64 },

    #[error("entry index {index} out of range 1..={count}")]
    OutOfRange { index: usize, count: usize },
}

pub type FormatResult<T> = Result<T, FormatError>;

/// Failure while serializing an archive.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("entry {name} comes from an existing archive, but no source reader was given")]
    MissingSourceReader { name: String },

    #[error("cannot read source file {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reading payload from source archive: {0}")]
    Archive(#[from] FormatError),

    #[error("too many entries for a GMA directory: {0}")]
    TooManyEntries(usize),

    #[error("cannot move finished archive into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type WriteResult<T> = Result<T, WriteError>;

/// Error type of the high level archive operations (open, build, extract, ...).
#[derive(Debug, Error)]
pub enum GmaError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("{0}")]
    Format(#[from] FormatError),

    #[error("write: {0}")]
    Write(#[from] WriteError),

    #[error("walk: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("path is outside its root: {0}")]
    Outside(String),

    #[error("crc mismatch for {name}: stored {expected:08x}, payload {actual:08x}")]
    Verify {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("input: {0}")]
    Prompt(String),
}

pub type GmaResult<T> = Result<T, GmaError>;
