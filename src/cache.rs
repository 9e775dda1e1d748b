//! Time-bounded memoization for previews and resolved metadata.
//!
//! Rendering a preview can mean rasterizing a PDF page at 10x, so repeated
//! requests for the same object within a few minutes are served from memory.
//!
//! # Semantics
//!
//! - Every entry carries its own TTL, measured from insertion. Reads never
//!   extend it (no idle timer, no touch-refresh).
//! - A miss, an expiry, or a capacity eviction is never an error; the caller
//!   simply recomputes.
//! - Failed computations are not cached.
//! - Concurrent misses on the same key may compute twice. Computations are
//!   idempotent, so the last insert wins with an equivalent value.
//!
//! ## Keys
//!
//! Previews and metadata share one key space per cache instance, so keys are
//! namespaced: [`preview_key`] prefixes the render mode (`og:art/riot.png`,
//! `browse:art/riot.png`) and [`metadata_key`] prefixes `meta:`.
//!
//! ## Storage
//!
//! Backed by a [`moka::sync::Cache`] with a per-entry [`Expiry`] policy and a
//! bounded entry count.

use crate::imaging::PreviewMode;
use moka::Expiry;
use moka::sync::Cache;
use std::time::{Duration, Instant};
use tracing::trace;

/// Cached value plus the TTL it was inserted with.
#[derive(Clone)]
struct Timed<V> {
    value: V,
    ttl: Duration,
}

/// Expire each entry `ttl` after it was created or last replaced.
struct PerEntryTtl;

impl<V> Expiry<String, Timed<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Timed<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Timed<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Thread-safe TTL cache keyed by string.
pub struct TtlCache<V> {
    inner: Cache<String, Timed<V>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(max_entries: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Return the cached value for `key`, or run `compute`, cache its
    /// success for `ttl`, and return it. Errors pass through uncached.
    pub fn get_or_compute<E>(
        &self,
        key: &str,
        ttl: Duration,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(hit) = self.get(key) {
            trace!(key, "Cache hit");
            return Ok(hit);
        }
        let value = compute()?;
        self.insert(key, value.clone(), ttl);
        Ok(value)
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for computations that
    /// signal failure with `None`.
    pub fn get_or_compute_some(
        &self,
        key: &str,
        ttl: Duration,
        compute: impl FnOnce() -> Option<V>,
    ) -> Option<V> {
        self.get_or_compute(key, ttl, || compute().ok_or(())).ok()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).map(|t| t.value)
    }

    /// Whether a live (unexpired) entry exists.
    pub fn has(&self, key: &str) -> bool {
        self.inner.get(key).is_some()
    }

    pub fn insert(&self, key: &str, value: V, ttl: Duration) {
        self.inner.insert(key.to_string(), Timed { value, ttl });
    }

    pub fn invalidate(&self, key: &str) {
        self.inner.invalidate(key);
    }

    /// Approximate number of live entries. Runs pending maintenance first.
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

/// Cache key for a rendered preview.
pub fn preview_key(path: &str, mode: PreviewMode) -> String {
    format!("{}:{}", mode.as_str(), path)
}

/// Cache key for resolved metadata.
pub fn metadata_key(path: &str) -> String {
    format!("meta:{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::sleep;

    const LONG: Duration = Duration::from_secs(300);

    // =========================================================================
    // get_or_compute
    // =========================================================================

    #[test]
    fn computes_once_then_hits() {
        let cache = TtlCache::new(100);
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(42)
        };

        assert_eq!(cache.get_or_compute("k", LONG, compute), Ok(42));
        assert_eq!(cache.get_or_compute("k", LONG, compute), Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new(100);
        let r: Result<u32, &str> = cache.get_or_compute("k", LONG, || Err("boom"));
        assert_eq!(r, Err("boom"));
        assert!(!cache.has("k"));

        let r: Result<u32, &str> = cache.get_or_compute("k", LONG, || Ok(7));
        assert_eq!(r, Ok(7));
        assert!(cache.has("k"));
    }

    #[test]
    fn none_is_not_cached() {
        let cache: TtlCache<String> = TtlCache::new(100);
        assert_eq!(cache.get_or_compute_some("k", LONG, || None), None);
        assert!(!cache.has("k"));
        assert_eq!(
            cache.get_or_compute_some("k", LONG, || Some("v".to_string())),
            Some("v".to_string())
        );
        assert!(cache.has("k"));
    }

    // =========================================================================
    // Expiry
    // =========================================================================

    #[test]
    fn entry_expires_after_ttl() {
        let cache = TtlCache::new(100);
        cache.insert("k", 1u32, Duration::from_millis(100));
        assert!(cache.has("k"));

        sleep(Duration::from_millis(300));
        assert!(!cache.has("k"));

        let calls = AtomicUsize::new(0);
        let v = cache.get_or_compute("k", LONG, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(2)
        });
        assert_eq!(v, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reads_do_not_extend_ttl() {
        let cache = TtlCache::new(100);
        cache.insert("k", 1u32, Duration::from_millis(250));
        for _ in 0..4 {
            sleep(Duration::from_millis(50));
            assert!(cache.has("k"));
        }
        sleep(Duration::from_millis(250));
        assert!(!cache.has("k"));
    }

    #[test]
    fn ttl_is_per_entry() {
        let cache = TtlCache::new(100);
        cache.insert("short", 1u32, Duration::from_millis(100));
        cache.insert("long", 2u32, LONG);
        sleep(Duration::from_millis(300));
        assert!(!cache.has("short"));
        assert_eq!(cache.get("long"), Some(2));
    }

    #[test]
    fn replacing_resets_ttl() {
        let cache = TtlCache::new(100);
        cache.insert("k", 1u32, Duration::from_millis(100));
        cache.insert("k", 2u32, LONG);
        sleep(Duration::from_millis(300));
        assert_eq!(cache.get("k"), Some(2));
    }

    // =========================================================================
    // Capacity and keys
    // =========================================================================

    #[test]
    fn capacity_is_bounded() {
        let cache = TtlCache::new(10);
        for i in 0..200u32 {
            cache.insert(&format!("k{i}"), i, LONG);
        }
        assert!(cache.entry_count() <= 10);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = TtlCache::new(10);
        cache.insert("k", 1u32, LONG);
        cache.invalidate("k");
        assert!(!cache.has("k"));
    }

    #[test]
    fn keys_do_not_collide_across_modes() {
        let og = preview_key("art/riot.png", PreviewMode::PadToCanvas);
        let browse = preview_key("art/riot.png", PreviewMode::ShrinkToCeiling);
        let meta = metadata_key("art/riot.png");
        assert_eq!(og, "og:art/riot.png");
        assert_eq!(browse, "browse:art/riot.png");
        assert_eq!(meta, "meta:art/riot.png");
        assert_ne!(og, browse);
    }
}
