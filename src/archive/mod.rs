//! Archive codecs consumed by `create_archive` / `unarchive` operations
//! (§6). Deliberately out of the engine's hard-part scope, but shipped
//! here so the crate is usable end to end — built the same way the
//! teacher builds its compression backends in `file_util.rs` (`tar` +
//! `flate2` for gzip tarballs, the `zip` crate for zip archives).

mod tar_gz;
mod zip_codec;

pub use tar_gz::TarGzCodec;
pub use zip_codec::ZipCodec;

use crate::error::Result;
use crate::item::ArchiveFormat;

/// `(relative_name, content, mode)` triples, the unit the codecs pack
/// from and unpack into.
pub type ArchiveEntry = (String, Vec<u8>, u32);

pub trait ArchiveCodec {
    fn format(&self) -> ArchiveFormat;
    fn pack(&self, sources: &[ArchiveEntry]) -> Result<Vec<u8>>;
    fn list_entries(&self, archive: &[u8]) -> Result<Vec<String>>;
    fn unpack(&self, archive: &[u8], patterns: &[String]) -> Result<Vec<ArchiveEntry>>;
}

pub fn codec_for(format: &ArchiveFormat) -> Box<dyn ArchiveCodec> {
    match format {
        ArchiveFormat::TarGz => Box::new(TarGzCodec),
        ArchiveFormat::Zip => Box::new(ZipCodec),
    }
}

/// Glob-style match over `*` (any run of characters) and `?` (any single
/// character), the shape of filter the teacher's `make_filter`/ignore-list
/// handling needs generalized from a path-prefix test to a full pattern
/// match since `unarchive`'s `patterns` filters archive entry names, not
/// filesystem paths.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    // Classic two-pointer glob match: `star`/`star_name` remember the most
    // recent `*` so we can backtrack and grow its match by one character
    // instead of searching every possible split.
    let (mut p, mut n) = (0, 0);
    let mut star: Option<usize> = None;
    let mut star_name = 0;

    while n < name.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == name[n]) {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            star_name = n;
            p += 1;
        } else if let Some(s) = star {
            p = s + 1;
            star_name += 1;
            n = star_name;
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

pub fn matches_any(patterns: &[String], name: &str) -> bool {
    if patterns.is_empty() {
        return true;
    }
    patterns.iter().any(|p| glob_match(p, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_star_matches_prefix() {
        assert!(glob_match("src/*", "src/lib.rs"));
        assert!(!glob_match("src/*", "tests/lib.rs"));
    }

    #[test]
    fn leading_star_matches_suffix() {
        assert!(glob_match("*.rs", "main.rs"));
        assert!(!glob_match("*.rs", "main.toml"));
    }

    #[test]
    fn star_in_the_middle_matches_both_ends() {
        assert!(glob_match("src/*.rs", "src/lib.rs"));
        assert!(!glob_match("src/*.rs", "tests/lib.rs"));
        assert!(!glob_match("src/*.rs", "src/lib.toml"));
    }

    #[test]
    fn question_mark_matches_exactly_one_char() {
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(!glob_match("a?c", "abbc"));
    }

    #[test]
    fn matches_any_is_vacuously_true_with_no_patterns() {
        assert!(matches_any(&[], "anything"));
    }
}
