//! Per-template cache of extracted catalogs and blueprints.
//!
//! Entries are keyed by the MD5 of the template bytes, extended with the
//! extraction options for parsed entries so that callers with different
//! options never share a blueprint. Lookups take a shared
//! lock; a miss inserts a per-key slot and builds under that slot's own lock,
//! so concurrent requests for the same template wait for one build instead of
//! repeating it. A failed build leaves nothing behind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::Serialize;

use crate::error::Result;
use crate::model::{Blueprint, StyleCatalog};
use crate::package::Package;
use crate::parser::{ExtractOptions, Template, TemplateParser};

/// Everything the pipeline needs from a template, built once.
#[derive(Debug, Clone)]
pub struct CachedTemplate {
    /// The template container
    pub package: Package,
    /// Named styles
    pub catalog: StyleCatalog,
    /// Structural blueprint, shared with fill requests
    pub blueprint: Arc<Blueprint>,
    /// When the entry was built
    pub built_at: DateTime<Utc>,
}

impl From<Template> for CachedTemplate {
    fn from(template: Template) -> Self {
        Self {
            package: template.package,
            catalog: template.catalog,
            blueprint: Arc::new(template.blueprint),
            built_at: Utc::now(),
        }
    }
}

impl CachedTemplate {
    /// Parse template bytes into a cache entry.
    pub fn parse(bytes: &[u8], options: &ExtractOptions) -> Result<Self> {
        let template = TemplateParser::from_bytes_with_options(bytes, options.clone())?.parse()?;
        Ok(template.into())
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that had to build
    pub misses: u64,
    /// Entries currently held, including builds in flight
    pub entries: usize,
}

type Slot = Arc<Mutex<Option<Arc<CachedTemplate>>>>;

/// Get-or-build cache with single-flight builds per template.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<String, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache key of a template: lowercase hex MD5 of its bytes.
pub fn template_key(bytes: &[u8]) -> String {
    let digest = Md5::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Key of a parsed entry: the template key plus the options it was parsed with.
fn options_key(template_key: &str, options: &ExtractOptions) -> String {
    format!("{}:{}:{}", template_key, options.max_slots, options.hint_len)
}

impl TemplateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry for `bytes`, building it with `build` on a miss.
    ///
    /// Callers racing on the same key block until the first build finishes
    /// and then share its result. If the build fails the error is returned
    /// and the key is left empty for the next caller.
    ///
    /// The key covers the bytes only; `build` must produce the same entry
    /// for the same bytes. Use [`get_or_parse`](Self::get_or_parse) when the
    /// entry depends on extraction options.
    pub fn get_or_build<F>(&self, bytes: &[u8], build: F) -> Result<Arc<CachedTemplate>>
    where
        F: FnOnce() -> Result<CachedTemplate>,
    {
        self.get_or_build_keyed(template_key(bytes), build)
    }

    /// Return the entry for `bytes` parsed with `options`, parsing on a miss.
    pub fn get_or_parse(&self, bytes: &[u8], options: &ExtractOptions) -> Result<Arc<CachedTemplate>> {
        let key = options_key(&template_key(bytes), options);
        self.get_or_build_keyed(key, || CachedTemplate::parse(bytes, options))
    }

    fn get_or_build_keyed<F>(&self, key: String, build: F) -> Result<Arc<CachedTemplate>>
    where
        F: FnOnce() -> Result<CachedTemplate>,
    {
        let slot = self.slot(&key);

        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Template cache hit: {}", key);
            return Ok(Arc::clone(cached));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("Template cache miss: {}", key);
        match build() {
            Ok(template) => {
                let template = Arc::new(template);
                *guard = Some(Arc::clone(&template));
                Ok(template)
            }
            Err(e) => {
                drop(guard);
                self.discard(&key, &slot);
                Err(e)
            }
        }
    }

    /// Look up an entry stored by [`get_or_build`](Self::get_or_build).
    pub fn get(&self, bytes: &[u8]) -> Option<Arc<CachedTemplate>> {
        self.get_keyed(&template_key(bytes))
    }

    /// Look up an entry stored by [`get_or_parse`](Self::get_or_parse).
    pub fn get_parsed(&self, bytes: &[u8], options: &ExtractOptions) -> Option<Arc<CachedTemplate>> {
        self.get_keyed(&options_key(&template_key(bytes), options))
    }

    fn get_keyed(&self, key: &str) -> Option<Arc<CachedTemplate>> {
        let slot = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()?;
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Drop every entry for `bytes`, whatever the options. Returns whether
    /// one existed.
    pub fn invalidate(&self, bytes: &[u8]) -> bool {
        let key = template_key(bytes);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|k, _| k.split(':').next() != Some(key.as_str()));
        entries.len() < before
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of entries, including builds in flight.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hit and miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn slot(&self, key: &str) -> Slot {
        if let Some(slot) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Arc::clone(slot);
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key.to_string()).or_default())
    }

    /// Remove a slot whose build failed, unless it was replaced meanwhile.
    fn discard(&self, key: &str, slot: &Slot) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // a slot locked by another caller is being rebuilt; leave it
        let empty = slot
            .try_lock()
            .map(|guard| guard.is_none())
            .unwrap_or(false);
        if empty && entries.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            entries.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    fn entry() -> Result<CachedTemplate> {
        let package = Package::blank()?;
        let template = TemplateParser::from_package(package, ExtractOptions::default()).parse()?;
        Ok(template.into())
    }

    #[test]
    fn test_key_is_md5_hex() {
        assert_eq!(template_key(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(template_key(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_hit_after_miss() {
        let cache = TemplateCache::new();
        let a = cache.get_or_build(b"template", entry).unwrap();
        let b = cache.get_or_build(b"template", || panic!("must not rebuild")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
        assert!(cache.get(b"template").is_some());
        assert!(cache.get(b"other").is_none());
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let cache = TemplateCache::new();
        let result = cache.get_or_build(b"broken", || Err(Error::TemplateInvalid("bad".into())));
        assert!(matches!(result, Err(Error::TemplateInvalid(_))));
        assert!(cache.is_empty());
        assert!(cache.get_or_build(b"broken", entry).is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = TemplateCache::new();
        cache.get_or_build(b"a", entry).unwrap();
        cache.get_or_build(b"b", entry).unwrap();
        assert!(cache.invalidate(b"a"));
        assert!(!cache.invalidate(b"a"));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_parsed_entries_are_keyed_by_options() {
        let bytes = Package::blank().unwrap().to_bytes().unwrap();
        let cache = TemplateCache::new();
        let defaults = ExtractOptions::default();
        let limited = ExtractOptions::new().with_max_slots(1);

        let a = cache.get_or_parse(&bytes, &defaults).unwrap();
        let b = cache.get_or_parse(&bytes, &limited).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().misses, 2);

        let again = cache.get_or_parse(&bytes, &limited).unwrap();
        assert!(Arc::ptr_eq(&b, &again));
        assert!(cache.get_parsed(&bytes, &defaults).is_some());
        assert!(cache.get(&bytes).is_none());

        assert!(cache.invalidate(&bytes));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_builds_are_single_flight() {
        let cache = Arc::new(TemplateCache::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let builds = Arc::clone(&builds);
                thread::spawn(move || {
                    cache
                        .get_or_build(b"shared", || {
                            builds.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            entry()
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<Arc<CachedTemplate>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 7);
    }
}
