//! A local directory treated as a bucket.
//!
//! Keys are `/`-joined paths relative to the root. Every directory on disk
//! additionally yields a `dir/` placeholder key, matching what bucket consoles
//! create for folders; the paginator filters those out.
//!
//! Custom metadata lives in a sidecar JSON file next to the object:
//!
//! ```text
//! root/
//! ├── 0000posters-                  # directory marker object
//! ├── 0000posters-.meta.json        # {"title": "Posters", "tags": "print"}
//! └── posters/
//!     ├── riot.png
//!     └── riot.png.meta.json        # {"alt": "...", "tags": "acab, riot"}
//! ```
//!
//! Sidecars are never listed as objects. The creation time reported for an
//! object is its file modification time.

use super::{ListQuery, ListResponse, ObjectStore, RawMetadata, StoreError, StoreObject};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Suffix of metadata sidecar files.
pub const SIDECAR_SUFFIX: &str = ".meta.json";

pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path under the root, refusing anything that could
    /// escape it.
    fn resolve(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn walk(&self) -> Result<Vec<StoreObject>, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "store root {} is not a directory",
                self.root.display()
            )));
        }

        let mut objects = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(|e| StoreError::Io(io::Error::other(e)))?;
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let mut key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let metadata = entry.metadata().map_err(|e| StoreError::Io(io::Error::other(e)))?;
            if entry.file_type().is_dir() {
                key.push('/');
            } else if key.ends_with(SIDECAR_SUFFIX) {
                continue;
            }

            objects.push(StoreObject {
                key,
                size: if metadata.is_file() { metadata.len() } else { 0 },
                created: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

fn not_found_or_io(key: &str, err: io::Error) -> StoreError {
    if err.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound(key.to_string())
    } else {
        StoreError::Io(err)
    }
}

impl ObjectStore for FsStore {
    fn list(&self, query: &ListQuery) -> Result<ListResponse, StoreError> {
        let objects = self.walk()?;
        Ok(super::select_page(&objects, query, query.max_results))
    }

    fn list_all(&self) -> Result<Vec<StoreObject>, StoreError> {
        self.walk()
    }

    fn get_bytes(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let file = self.resolve(path)?;
        if file.is_dir() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        std::fs::read(&file).map_err(|e| not_found_or_io(path, e))
    }

    fn get_metadata(&self, path: &str) -> Result<RawMetadata, StoreError> {
        let file = self.resolve(path)?;
        let stat = std::fs::metadata(&file).map_err(|e| not_found_or_io(path, e))?;

        let sidecar = PathBuf::from(format!("{}{}", file.display(), SIDECAR_SUFFIX));
        let fields: BTreeMap<String, String> = match std::fs::read_to_string(&sidecar) {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                StoreError::Unavailable(format!(
                    "unreadable metadata sidecar {}: {e}",
                    sidecar.display()
                ))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        Ok(RawMetadata {
            fields,
            created: stat.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("posters")).unwrap();
        fs::write(root.join("0000posters-"), b"").unwrap();
        fs::write(
            root.join("0000posters-.meta.json"),
            r#"{"title": "Posters", "tags": "Print"}"#,
        )
        .unwrap();
        fs::write(root.join("posters/riot.png"), b"png bytes").unwrap();
        fs::write(
            root.join("posters/riot.png.meta.json"),
            r#"{"alt": "A riot", "tags": "acab, riot"}"#,
        )
        .unwrap();
        fs::write(root.join("readme.txt"), b"hello").unwrap();
        tmp
    }

    fn keys(objects: &[StoreObject]) -> Vec<&str> {
        objects.iter().map(|o| o.key.as_str()).collect()
    }

    #[test]
    fn list_all_hides_sidecars_and_adds_dir_placeholders() {
        let tmp = setup();
        let store = FsStore::new(tmp.path());
        let all = store.list_all().unwrap();
        assert_eq!(
            keys(&all),
            vec!["0000posters-", "posters/", "posters/riot.png", "readme.txt"]
        );
    }

    #[test]
    fn list_root_with_delimiter() {
        let tmp = setup();
        let store = FsStore::new(tmp.path());
        let resp = store.list(&ListQuery::new("", Some("/"), 10)).unwrap();
        assert_eq!(keys(&resp.objects), vec!["0000posters-", "readme.txt"]);
    }

    #[test]
    fn list_subdirectory_includes_placeholder() {
        let tmp = setup();
        let store = FsStore::new(tmp.path());
        let resp = store
            .list(&ListQuery::new("posters/", Some("/"), 10))
            .unwrap();
        assert_eq!(keys(&resp.objects), vec!["posters/", "posters/riot.png"]);
    }

    #[test]
    fn metadata_from_sidecar() {
        let tmp = setup();
        let store = FsStore::new(tmp.path());
        let meta = store.get_metadata("posters/riot.png").unwrap();
        assert_eq!(meta.get("alt"), Some("A riot"));
        assert!(meta.created.is_some());
    }

    #[test]
    fn metadata_without_sidecar_is_empty() {
        let tmp = setup();
        let store = FsStore::new(tmp.path());
        let meta = store.get_metadata("readme.txt").unwrap();
        assert!(meta.fields.is_empty());
    }

    #[test]
    fn missing_object_is_not_found() {
        let tmp = setup();
        let store = FsStore::new(tmp.path());
        assert!(matches!(
            store.get_bytes("nope.png"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.get_metadata("nope.png"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn traversal_is_refused() {
        let tmp = setup();
        let store = FsStore::new(tmp.path().join("posters"));
        assert!(matches!(
            store.get_bytes("../readme.txt"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn missing_root_is_unavailable() {
        let store = FsStore::new("/nonexistent/bucketgal-root");
        assert!(matches!(store.list_all(), Err(StoreError::Unavailable(_))));
    }
}
