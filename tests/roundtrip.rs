//! Write-then-parse properties of the GMA codec.

use gmad::gma::{self, Entry, EntrySource, FormatError, Header, Reader, WriteError, MAX_VERSION};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tempfile::tempdir;

fn header_strategy() -> impl Strategy<Value = Header> {
    (
        2..=MAX_VERSION,
        any::<u64>(),
        any::<u64>(),
        r"[^\x00]{0,24}",
        r"[^\x00]{0,64}",
        r"[^\x00]{0,16}",
        any::<i32>(),
    )
        .prop_map(
            |(version, steam_id, timestamp, name, description, author, addon_version)| Header {
                version,
                steam_id,
                timestamp,
                name,
                description,
                author,
                addon_version,
            },
        )
}

fn payloads() -> impl Strategy<Value = Vec<(u32, Vec<u8>)>> {
    prop::collection::vec((any::<u32>(), prop::collection::vec(any::<u8>(), 0..512)), 1..12)
}

fn disk_entries(root: &Path, files: &[(u32, Vec<u8>)]) -> Vec<Entry> {
    files
        .iter()
        .enumerate()
        .map(|(i, (crc, data))| {
            let path = root.join(format!("f{i}.bin"));
            std::fs::write(&path, data).unwrap();
            let mut e = Entry::from_disk(format!("materials/dir{i}/f{i}.vtf"), path, data.len() as i64);
            e.crc = *crc;
            e
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn write_then_parse_preserves_header_and_directory(
        header in header_strategy(),
        files in payloads(),
    ) {
        let dir = tempdir().unwrap();
        let entries = disk_entries(dir.path(), &files);

        let mut bytes = Vec::new();
        gma::write(&mut bytes, &header, &entries, None).unwrap();
        let reader = Reader::parse(Cursor::new(bytes)).unwrap();

        prop_assert_eq!(reader.header(), &header);
        prop_assert_eq!(reader.entry_count(), entries.len());

        let mut expected_offset = 0i64;
        for (i, (got, want)) in reader.entries().iter().zip(&entries).enumerate() {
            prop_assert_eq!(&got.name, &want.name);
            prop_assert_eq!(got.size, want.size);
            prop_assert_eq!(got.crc, want.crc);
            prop_assert_eq!(got.number as usize, i + 1);
            prop_assert_eq!(got.offset, expected_offset);
            prop_assert_eq!(&got.source, &EntrySource::Archive);
            expected_offset += got.size;
        }

        for (e, (_, data)) in reader.entries().iter().zip(&files) {
            prop_assert_eq!(&reader.entry_bytes(e).unwrap(), data);
        }
    }

    #[test]
    fn any_other_ident_is_rejected(ident in prop::array::uniform4(any::<u8>())
        .prop_filter("not GMAD", |m| m != b"GMAD"))
    {
        let mut bytes = ident.to_vec();
        bytes.extend_from_slice(&[3; 64]);
        let is_bad_ident = matches!(
            Reader::parse(Cursor::new(bytes)),
            Err(FormatError::BadIdent { .. })
        );
        prop_assert!(is_bad_ident);
    }

    #[test]
    fn newer_versions_are_rejected(version in (MAX_VERSION + 1)..=u8::MAX) {
        let mut bytes = b"GMAD".to_vec();
        bytes.push(version);
        bytes.extend_from_slice(&[0; 64]);
        let is_unsupported = matches!(
            Reader::parse(Cursor::new(bytes)),
            Err(FormatError::UnsupportedVersion { .. })
        );
        prop_assert!(is_unsupported);
    }
}

#[test]
fn valid_header_without_entries_is_rejected() {
    let header = Header::new("empty");
    let mut bytes = Vec::new();
    gma::write(&mut bytes, &header, &[], None).unwrap();
    assert!(matches!(
        Reader::parse(Cursor::new(bytes)),
        Err(FormatError::Empty)
    ));
}

#[test]
fn byte_layout_matches_the_format() {
    let dir = tempdir().unwrap();
    let p = dir.path().join("x");
    std::fs::write(&p, b"AB").unwrap();

    let header = Header {
        version: 3,
        steam_id: 1,
        timestamp: 2,
        name: "n".into(),
        description: "d".into(),
        author: "a".into(),
        addon_version: 5,
    };
    let mut entry = Entry::from_disk("lua/x.lua", &p, 2);
    entry.crc = 9;

    let mut bytes = Vec::new();
    gma::write(&mut bytes, &header, &[entry], None).unwrap();

    let mut want = Vec::new();
    want.extend_from_slice(b"GMAD");
    want.push(3);
    want.extend_from_slice(&1u64.to_le_bytes());
    want.extend_from_slice(&2u64.to_le_bytes());
    want.push(0);
    want.extend_from_slice(b"n\0d\0a\0");
    want.extend_from_slice(&5i32.to_le_bytes());
    want.extend_from_slice(&1u32.to_le_bytes());
    want.extend_from_slice(b"lua/x.lua\0");
    want.extend_from_slice(&2i64.to_le_bytes());
    want.extend_from_slice(&9u32.to_le_bytes());
    want.extend_from_slice(&0u32.to_le_bytes());
    want.extend_from_slice(b"AB");
    assert_eq!(bytes, want);
}

#[test]
fn archive_entry_without_reader_is_refused() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.gma");
    let entry = Entry {
        name: "lua/x.lua".into(),
        size: 1,
        crc: 0,
        number: 1,
        offset: 0,
        source: EntrySource::Archive,
    };
    let err = gma::write_to_path(&dest, &Header::new("x"), &[entry], None).unwrap_err();
    assert!(matches!(err, WriteError::MissingSourceReader { .. }));
    assert!(!dest.exists());
}

#[test]
fn reader_is_shareable_across_threads() {
    let dir = tempdir().unwrap();
    let files: Vec<(u32, Vec<u8>)> = (0..8u8).map(|i| (0, vec![i; 100 + i as usize])).collect();
    let entries = disk_entries(dir.path(), &files);
    let dest = dir.path().join("t.gma");
    gma::write_to_path(&dest, &Header::new("threads"), &entries, None).unwrap();

    let reader = Reader::open(&dest).unwrap();
    std::thread::scope(|s| {
        for (e, (_, data)) in reader.entries().iter().zip(&files) {
            let reader = &reader;
            s.spawn(move || {
                for _ in 0..20 {
                    assert_eq!(&reader.entry_bytes(e).unwrap(), data);
                }
            });
        }
    });
}
