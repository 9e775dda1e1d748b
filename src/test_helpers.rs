//! Shared test utilities for the bucketgal test suite.
//!
//! Provides synthetic image encoders and a small in-memory bucket that
//! exercises every part of the naming convention.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let store = fixture_store();
//! let paths = listed_paths(&store, "art/");
//! assert_eq!(paths, vec!["art/0000posters-", "art/logo.svg", "art/riot.png"]);
//! ```

use crate::listing::{ListingSettings, Paginator};
use crate::naming::Naming;
use crate::store::MemoryStore;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

// =========================================================================
// Image encoders
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// A gradient PNG of the given size.
pub fn encode_png(width: u32, height: u32) -> Vec<u8> {
    png_from(&gradient(width, height))
}

/// A single-color PNG of the given size.
pub fn encode_solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    png_from(&RgbImage::from_pixel(width, height, image::Rgb(color)))
}

fn png_from(img: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// A gradient JPEG of the given size.
pub fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// A 10x5 red rectangle.
pub const RED_SVG: &[u8] = br##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="5">
    <rect width="10" height="5" fill="#ff0000"/>
</svg>"##;

// =========================================================================
// Fixture bucket
// =========================================================================

/// A small bucket:
///
/// ```text
/// 0000art-                   title "Art", tags "print"
/// art/                       placeholder
/// art/0000posters-           directory, no tags
/// art/logo.svg               tags "ACAB, logo", author "LaserBloc"
/// art/riot.png               tags "acab,riot", title "The Night Riot"
/// art/posters/strike.jpg     no metadata fields
/// notes.txt                  metadata fetch fails
/// ```
pub fn fixture_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.put("0000art-", Vec::new(), &[("title", "Art"), ("tags", "print")]);
    store.put("art/", Vec::new(), &[]);
    store.put("art/0000posters-", Vec::new(), &[]);
    store.put(
        "art/logo.svg",
        RED_SVG.to_vec(),
        &[("tags", "ACAB, logo"), ("author", "LaserBloc")],
    );
    store.put(
        "art/riot.png",
        encode_png(40, 20),
        &[
            ("tags", "acab,riot"),
            ("title", "The Night Riot"),
            ("alt", "A crowd at night"),
        ],
    );
    store.put("art/posters/strike.jpg", encode_jpeg(16, 16), &[]);
    store.put("notes.txt", b"hello".to_vec(), &[]);
    store.break_metadata("notes.txt");
    store
}

// =========================================================================
// Listing helpers
// =========================================================================

/// Walk every page of `prefix` and return raw entry paths in order.
pub fn listed_paths(store: &MemoryStore, prefix: &str) -> Vec<String> {
    let naming = Naming::default();
    let paginator = Paginator::new(store, &naming, ListingSettings::default());
    let mut paths = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = paginator.list(prefix, token.as_deref()).unwrap();
        paths.extend(page.entries.into_iter().map(|e| e.path));
        match page.next_page_token {
            Some(t) => token = Some(t),
            None => return paths,
        }
    }
}
