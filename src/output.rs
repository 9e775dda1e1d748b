//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity leads with its positional index and display name. Raw store
//! keys are secondary context on indented `Key:` lines, so the output reads
//! as a gallery inventory while still letting users trace items back to
//! bucket objects.
//!
//! # Output Format
//!
//! ## ls
//!
//! ```text
//! 001 posters/
//!     Key: art/0000posters-
//!     Open: bucketgal ls art/posters
//! 002 The Night Riot
//!     Key: art/riot.png
//!     Type: image/png
//!     Tags: acab, riot
//!
//! Next page: eyJwcmVmaXgiOi...
//! ```
//!
//! ## index / search
//!
//! ```text
//! Tags
//! 001 acab (2)
//! 002 untagged (4)
//!
//! Tagged "acab"
//! 001 art/riot.png (file)
//!
//! Results for "riot"
//! 001 art/riot.png (file, score 2)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::browse::{BrowsePage, PageItem};
use crate::index::{IndexPage, SearchHit};
use crate::types::IndexEntry;
use crate::metadata::Metadata;
use crate::pregen::GenerateStats;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

fn join_tags(meta: &Metadata) -> String {
    meta.tags.iter().cloned().collect::<Vec<_>>().join(", ")
}

// ============================================================================
// ls
// ============================================================================

/// Format one directory page.
pub fn format_page(page: &BrowsePage) -> Vec<String> {
    let mut lines = Vec::new();
    let ctx = indent(1);

    for (i, item) in page.items.iter().enumerate() {
        match item {
            PageItem::Directory {
                path,
                display_path,
                name,
            } => {
                lines.push(format!("{} {}/", format_index(i + 1), name));
                lines.push(format!("{ctx}Key: {path}"));
                lines.push(format!("{ctx}Open: bucketgal ls {display_path}"));
            }
            PageItem::File {
                path,
                name,
                mime,
                metadata,
            } => {
                let title = if metadata.title.is_empty() {
                    format!("({name})")
                } else {
                    metadata.title.clone()
                };
                lines.push(format!("{} {}", format_index(i + 1), title));
                lines.push(format!("{ctx}Key: {path}"));
                lines.push(format!("{ctx}Type: {mime}"));
                if !metadata.tags.is_empty() {
                    lines.push(format!("{ctx}Tags: {}", join_tags(metadata)));
                }
            }
        }
    }

    if page.items.is_empty() {
        lines.push("(empty)".to_string());
    }
    if let Some(token) = &page.next_page_token {
        lines.push(String::new());
        lines.push(format!("Next page: {token}"));
    }
    lines
}

pub fn print_page(page: &BrowsePage) {
    for line in format_page(page) {
        println!("{}", line);
    }
}

// ============================================================================
// meta
// ============================================================================

/// Format resolved metadata for one object.
pub fn format_metadata(path: &str, meta: &Metadata) -> Vec<String> {
    let ctx = indent(1);
    let mut lines = vec![meta.title.clone(), format!("{ctx}Key: {path}")];
    lines.push(format!("{ctx}Alt: {}", truncate(&meta.alt, 80)));
    if let Some(author) = &meta.author {
        lines.push(format!("{ctx}Author: {author}"));
    }
    if !meta.tags.is_empty() {
        lines.push(format!("{ctx}Tags: {}", join_tags(meta)));
    }
    let mut flags = Vec::new();
    if meta.blur {
        flags.push("blur");
    }
    if meta.not_ours {
        flags.push("not ours");
    }
    if !flags.is_empty() {
        lines.push(format!("{ctx}Flags: {}", flags.join(", ")));
    }
    lines.push(format!("{ctx}Created: {}", meta.created_at.to_rfc3339()));
    lines
}

pub fn print_metadata(path: &str, meta: &Metadata) {
    for line in format_metadata(path, meta) {
        println!("{}", line);
    }
}

// ============================================================================
// index / search
// ============================================================================

/// Format the tag list with entry counts.
pub fn format_tag_groups(groups: &[(String, usize)]) -> Vec<String> {
    let mut lines = vec!["Tags".to_string()];
    for (i, (tag, count)) in groups.iter().enumerate() {
        lines.push(format!("{} {} ({})", format_index(i + 1), tag, count));
    }
    lines
}

pub fn print_tag_groups(groups: &[(String, usize)]) {
    for line in format_tag_groups(groups) {
        println!("{}", line);
    }
}

/// Format one page of a tag's entries. Positions continue across pages.
pub fn format_tag_page(tag: &str, page: &IndexPage<IndexEntry>, offset: usize) -> Vec<String> {
    let mut lines = vec![format!("Tagged \"{tag}\"")];
    for (i, entry) in page.items.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(offset + i + 1),
            entry.path,
            entry.kind.as_str()
        ));
    }
    if page.items.is_empty() {
        lines.push(format!("{}No entries", indent(1)));
    }
    if let Some(next) = page.next_offset {
        lines.push(String::new());
        lines.push(format!("More entries: --offset {next}"));
    }
    lines
}

pub fn print_tag_page(tag: &str, page: &IndexPage<IndexEntry>, offset: usize) {
    for line in format_tag_page(tag, page, offset) {
        println!("{}", line);
    }
}

/// Format one page of search hits. Positions continue across pages.
pub fn format_search(query: &str, page: &IndexPage<SearchHit>, offset: usize) -> Vec<String> {
    let mut lines = vec![format!("Results for \"{query}\"")];
    for (i, hit) in page.items.iter().enumerate() {
        lines.push(format!(
            "{} {} ({}, score {})",
            format_index(offset + i + 1),
            hit.entry.path,
            hit.entry.kind.as_str(),
            hit.score
        ));
    }
    if page.items.is_empty() {
        lines.push(format!("{}No matches", indent(1)));
    }
    if let Some(next) = page.next_offset {
        lines.push(String::new());
        lines.push(format!("More results: --offset {next}"));
    }
    lines
}

pub fn print_search(query: &str, page: &IndexPage<SearchHit>, offset: usize) {
    for line in format_search(query, page, offset) {
        println!("{}", line);
    }
}

// ============================================================================
// render / pregen
// ============================================================================

pub fn format_render(path: &str, output: &str, width: u32, height: u32, etag: &str) -> Vec<String> {
    vec![
        format!("{path} → {output}"),
        format!("{}{width}x{height} png, etag {}", indent(1), truncate(etag, 12)),
    ]
}

pub fn print_render(path: &str, output: &str, width: u32, height: u32, etag: &str) {
    for line in format_render(path, output, width, height, etag) {
        println!("{}", line);
    }
}

pub fn format_pregen(stats: &GenerateStats) -> Vec<String> {
    vec![format!(
        "Checked {} files: {} written, {} up to date or skipped, {} failed",
        stats.checked, stats.written, stats.skipped, stats.failed
    )]
}

pub fn print_pregen(stats: &GenerateStats) {
    for line in format_pregen(stats) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SearchHit;
    use crate::store::RawMetadata;
    use crate::types::EntryKind;

    fn meta(fields: &[(&str, &str)]) -> Metadata {
        let raw = RawMetadata {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            created: None,
        };
        crate::metadata::normalize("art/riot.png", &raw)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }

    // =========================================================================
    // ls
    // =========================================================================

    #[test]
    fn page_lists_directories_then_files() {
        let page = BrowsePage {
            items: vec![
                PageItem::Directory {
                    path: "art/0000posters-".into(),
                    display_path: "art/posters".into(),
                    name: "posters".into(),
                },
                PageItem::File {
                    path: "art/riot.png".into(),
                    name: "riot.png".into(),
                    mime: "image/png",
                    metadata: meta(&[("title", "The Night Riot"), ("tags", "riot,acab")]),
                },
            ],
            next_page_token: Some("tok".into()),
        };
        assert_eq!(
            format_page(&page),
            vec![
                "001 posters/",
                "    Key: art/0000posters-",
                "    Open: bucketgal ls art/posters",
                "002 The Night Riot",
                "    Key: art/riot.png",
                "    Type: image/png",
                "    Tags: acab, riot",
                "",
                "Next page: tok",
            ]
        );
    }

    #[test]
    fn empty_page() {
        let page = BrowsePage {
            items: vec![],
            next_page_token: None,
        };
        assert_eq!(format_page(&page), vec!["(empty)"]);
    }

    // =========================================================================
    // meta
    // =========================================================================

    #[test]
    fn metadata_shows_flags_and_author() {
        let lines = format_metadata(
            "art/riot.png",
            &meta(&[("author", "LaserBloc"), ("blur", "true")]),
        );
        assert_eq!(lines[0], "riot");
        assert!(lines.contains(&"    Author: LaserBloc".to_string()));
        assert!(lines.contains(&"    Flags: blur".to_string()));
        assert!(lines.contains(&"    Alt: No alt text found".to_string()));
    }

    // =========================================================================
    // index / search
    // =========================================================================

    #[test]
    fn tag_groups_with_counts() {
        let groups = vec![("acab".to_string(), 2), ("untagged".to_string(), 4)];
        assert_eq!(
            format_tag_groups(&groups),
            vec!["Tags", "001 acab (2)", "002 untagged (4)"]
        );
    }

    #[test]
    fn tag_page_positions_continue_from_offset() {
        let page = IndexPage {
            items: vec![
                IndexEntry {
                    kind: EntryKind::Directory,
                    path: "art/posters".into(),
                },
                IndexEntry {
                    kind: EntryKind::File,
                    path: "art/riot.png".into(),
                },
            ],
            next_offset: Some(7),
        };
        assert_eq!(
            format_tag_page("acab", &page, 5),
            vec![
                "Tagged \"acab\"",
                "006 art/posters (directory)",
                "007 art/riot.png (file)",
                "",
                "More entries: --offset 7",
            ]
        );
    }

    #[test]
    fn empty_tag_page() {
        let page: IndexPage<IndexEntry> = IndexPage {
            items: vec![],
            next_offset: None,
        };
        assert_eq!(
            format_tag_page("zzz", &page, 0),
            vec!["Tagged \"zzz\"", "    No entries"]
        );
    }

    #[test]
    fn search_positions_continue_from_offset() {
        let page = IndexPage {
            items: vec![SearchHit {
                entry: IndexEntry {
                    kind: EntryKind::File,
                    path: "art/riot.png".into(),
                },
                score: 2,
            }],
            next_offset: Some(11),
        };
        assert_eq!(
            format_search("riot", &page, 10),
            vec![
                "Results for \"riot\"",
                "011 art/riot.png (file, score 2)",
                "",
                "More results: --offset 11",
            ]
        );
    }

    #[test]
    fn search_without_matches() {
        let page: IndexPage<SearchHit> = IndexPage {
            items: vec![],
            next_offset: None,
        };
        assert_eq!(
            format_search("zzz", &page, 0),
            vec!["Results for \"zzz\"", "    No matches"]
        );
    }

    // =========================================================================
    // render / pregen
    // =========================================================================

    #[test]
    fn render_line_shortens_etag() {
        let lines = format_render("a.png", "out.png", 1200, 600, "0123456789abcdef");
        assert_eq!(lines[0], "a.png → out.png");
        assert_eq!(lines[1], "    1200x600 png, etag 0123456789ab...");
    }

    #[test]
    fn pregen_summary() {
        let stats = GenerateStats {
            checked: 5,
            written: 2,
            skipped: 2,
            failed: 1,
        };
        assert_eq!(
            format_pregen(&stats),
            vec!["Checked 5 files: 2 written, 2 up to date or skipped, 1 failed"]
        );
    }
}
