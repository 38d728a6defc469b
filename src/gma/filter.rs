#![forbid(unsafe_code)]

use regex::{RegexSet, RegexSetBuilder};
use std::sync::OnceLock;

/// Files the game accepts inside an addon, by top-level directory.
/// Patterns are matched against the whole forward-slash relative path.
const RULES: &[&str] = &[
    r"^maps/.*\.bsp$",
    r"^maps/.*\.png$",
    r"^maps/.*\.nav$",
    r"^maps/.*\.ain$",
    r"^sound/.*\.wav$",
    r"^sound/.*\.mp3$",
    r"^lua/.*\.lua$",
    r"^materials/.*\.vmt$",
    r"^materials/.*\.vtf$",
    r"^materials/.*\.png$",
    r"^models/.*\.mdl$",
    r"^models/.*\.vtx$",
    r"^models/.*\.phy$",
    r"^models/.*\.ani$",
    r"^models/.*\.vvd$",
    r"^gamemodes/.*\.txt$",
    r"^gamemodes/.*\.lua$",
    r"^scenes/.*\.vcd$",
    r"^particles/.*\.pcf$",
    r"^gamemodes/.*/backgrounds/.*\.jpg$",
    r"^gamemodes/.*/icon24\.png$",
    r"^gamemodes/.*/logo\.png$",
    r"^scripts/vehicles/.*\.txt$",
    r"^resource/fonts/.*\.ttf$",
];

fn rules() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| {
        RegexSetBuilder::new(RULES)
            .case_insensitive(true)
            .build()
            .unwrap_or_else(|e| unreachable!("inclusion rules are constant: {e}"))
    })
}

/// Whether a file at `path` may be packed into an archive.
///
/// `path` must already use forward slashes and be relative to the addon root;
/// normalization happens where the filesystem is scanned, not here.
pub fn is_included(path: &str) -> bool {
    rules().is_match(path)
}
