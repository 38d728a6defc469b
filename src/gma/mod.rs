#![forbid(unsafe_code)]

mod error;
mod filter;
mod format;
mod io;
mod ops;
mod path;
mod read;
mod write;

pub use error::{FormatError, FormatResult, GmaError, GmaResult, WriteError, WriteResult};
pub use filter::is_included;
pub use format::{
    Entry, EntryInfo, EntrySource, Header, APP_ID, COMPRESSION_SIGNATURE, IDENT, MAX_VERSION,
};
pub use read::Reader;
pub use write::{write, write_to_path, PayloadSource};

pub use ops::{
    amend, build, build_archive, compute_crcs, entries, extract, extract_entry, info, list, open,
    scan_directory, verify, BuildOptions, FileReader,
};
