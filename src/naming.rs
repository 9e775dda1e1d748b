//! Synthetic directory convention for flat object keys.
//!
//! The store has no native directories. A "directory" is an ordinary object
//! whose key ends with a reserved marker suffix, e.g. `art/0000posters-`. Keys
//! may also carry a sort-padding token at the start of a path segment
//! (`0000` above) so that directory markers sort ahead of regular files in
//! lexicographic listings.
//!
//! ## Display paths
//!
//! The marker and the padding token are storage artifacts, never shown:
//!
//! | Raw key | Kind | Display path | Name |
//! |---|---|---|---|
//! | `art/0000posters-` | directory | `art/posters` | `posters` |
//! | `art/posters/riot.png` | file | `art/posters/riot.png` | `riot.png` |
//! | `art/` | (excluded) | | |
//!
//! Keys that end with the path separator are prefix-only artifacts of
//! delimiter listing and are not entries at all; [`Naming::classify`] returns
//! `None` for them.

use crate::types::EntryKind;

/// Path separator used for delimiter listing.
pub const SEPARATOR: char = '/';
pub const DELIMITER: &str = "/";

/// Marker and padding tokens of the directory convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    marker: String,
    padding: String,
}

impl Default for Naming {
    fn default() -> Self {
        Self::new("-", "0000")
    }
}

impl Naming {
    pub fn new(marker: impl Into<String>, padding: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            padding: padding.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Classify a raw key. `None` means the key is a separator-terminated
    /// prefix artifact and must not surface as an entry.
    pub fn classify(&self, key: &str) -> Option<EntryKind> {
        if key.is_empty() || key.ends_with(SEPARATOR) {
            return None;
        }
        if !self.marker.is_empty() && key.ends_with(self.marker.as_str()) {
            Some(EntryKind::Directory)
        } else {
            Some(EntryKind::File)
        }
    }

    /// Strip the directory marker and any leading padding token from every
    /// segment.
    pub fn display_path(&self, key: &str) -> String {
        let key = if !self.marker.is_empty() {
            key.strip_suffix(self.marker.as_str()).unwrap_or(key)
        } else {
            key
        };

        key.split(SEPARATOR)
            .map(|segment| self.strip_padding(segment))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Last segment of the display path.
    pub fn display_name(&self, key: &str) -> String {
        let path = self.display_path(key);
        match path.rfind(SEPARATOR) {
            Some(pos) => path[pos + 1..].to_string(),
            None => path,
        }
    }

    fn strip_padding<'a>(&self, segment: &'a str) -> &'a str {
        if self.padding.is_empty() {
            return segment;
        }
        let mut rest = segment;
        while let Some(stripped) = rest.strip_prefix(self.padding.as_str()) {
            rest = stripped;
        }
        rest
    }
}

/// Normalize a user-supplied prefix into a listing prefix: empty for the
/// root, otherwise guaranteed to end with the separator.
pub fn directory_prefix(path: &str) -> String {
    let trimmed = path.trim_start_matches(SEPARATOR);
    if trimmed.is_empty() || trimmed.ends_with(SEPARATOR) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{SEPARATOR}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // classify
    // =========================================================================

    #[test]
    fn marker_suffix_is_directory() {
        let n = Naming::default();
        assert_eq!(n.classify("art/0000posters-"), Some(EntryKind::Directory));
        assert_eq!(n.classify("posters-"), Some(EntryKind::Directory));
    }

    #[test]
    fn regular_key_is_file() {
        let n = Naming::default();
        assert_eq!(n.classify("art/posters/riot.png"), Some(EntryKind::File));
        assert_eq!(n.classify("no-extension"), Some(EntryKind::File));
    }

    #[test]
    fn separator_terminated_key_is_excluded() {
        let n = Naming::default();
        assert_eq!(n.classify("art/"), None);
        assert_eq!(n.classify("/"), None);
        assert_eq!(n.classify(""), None);
    }

    #[test]
    fn custom_marker() {
        let n = Naming::new("@dir", "~");
        assert_eq!(n.classify("a/b@dir"), Some(EntryKind::Directory));
        assert_eq!(n.classify("a/b-"), Some(EntryKind::File));
    }

    // =========================================================================
    // display_path / display_name
    // =========================================================================

    #[test]
    fn directory_display_strips_marker_and_padding() {
        let n = Naming::default();
        assert_eq!(n.display_path("art/0000posters-"), "art/posters");
        assert_eq!(n.display_name("art/0000posters-"), "posters");
    }

    #[test]
    fn file_display_is_unchanged_without_tokens() {
        let n = Naming::default();
        assert_eq!(n.display_path("art/riot.png"), "art/riot.png");
        assert_eq!(n.display_name("art/riot.png"), "riot.png");
    }

    #[test]
    fn padding_only_stripped_at_segment_start() {
        let n = Naming::default();
        assert_eq!(n.display_path("scan00001.png"), "scan00001.png");
        assert_eq!(n.display_path("00000000a/0000b-"), "a/b");
    }

    #[test]
    fn top_level_directory_name() {
        let n = Naming::default();
        assert_eq!(n.display_name("0000stickers-"), "stickers");
    }

    // =========================================================================
    // directory_prefix
    // =========================================================================

    #[test]
    fn directory_prefix_normalizes() {
        assert_eq!(directory_prefix(""), "");
        assert_eq!(directory_prefix("/"), "");
        assert_eq!(directory_prefix("art"), "art/");
        assert_eq!(directory_prefix("art/"), "art/");
        assert_eq!(directory_prefix("/art/posters"), "art/posters/");
    }
}
