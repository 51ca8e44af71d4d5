//! The runtime owning all shared render state.
//!
//! Caches, configuration, the clock, and mount tracking are dependency-
//! injected through one explicitly constructed object instead of living in
//! module-level globals; tests get isolation from `reset`. Everything is
//! single-threaded: a `Runtime` hands out weak [`RuntimeHandle`]s the same
//! way nodes and cache entries expect to hold them.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Instant;

use crate::cache::{CacheEntry, ElementCache, StyleCache};
use crate::host::{MountTracker, NoopMountTracker};
use crate::signature::hash_text;
use crate::value::PropMap;

/// Provides timing for cache ages and the cleanup debounce.
pub trait Clock {
    fn now_millis(&self) -> u64;
}

/// Wall clock measured from runtime construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Whether this render path is an interactive client or a one-shot static
/// (server) pass. Static renders compute no keys and cache nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Interactive,
    Static,
}

/// Tunables for the caches and eviction policies.
#[derive(Clone, Copy, Debug)]
pub struct CacheConfig {
    /// Style cache size ceiling before a batch eviction runs.
    pub style_cache_ceiling: usize,
    /// Entries removed per style-cache eviction pass.
    pub style_evict_batch: usize,
    /// Idle age before an unmounted element-cache entry becomes evictable.
    pub max_idle_millis: u64,
    /// Emergency eviction score threshold.
    pub emergency_score_threshold: f64,
    /// Debounce window coalescing rapid cleanup triggers.
    pub cleanup_debounce_millis: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            style_cache_ceiling: 512,
            style_evict_batch: 64,
            max_idle_millis: 10 * 60 * 1000,
            emergency_score_threshold: 10_000.0,
            cleanup_debounce_millis: 100,
        }
    }
}

struct RuntimeInner {
    mode: RenderMode,
    config: CacheConfig,
    clock: Rc<dyn Clock>,
    mounts: Rc<dyn MountTracker>,
    element_cache: RefCell<ElementCache>,
    style_cache: RefCell<StyleCache>,
    func_hashes: RefCell<HashMap<u64, Rc<str>, ahash::RandomState>>,
    next_instance_id: Cell<u64>,
    cleanup_deadline: Cell<Option<u64>>,
}

impl RuntimeInner {
    fn new(
        mode: RenderMode,
        config: CacheConfig,
        clock: Rc<dyn Clock>,
        mounts: Rc<dyn MountTracker>,
    ) -> Self {
        Self {
            mode,
            clock,
            mounts,
            element_cache: RefCell::new(ElementCache::new()),
            style_cache: RefCell::new(StyleCache::new(
                config.style_cache_ceiling,
                config.style_evict_batch,
            )),
            func_hashes: RefCell::new(HashMap::default()),
            next_instance_id: Cell::new(1),
            cleanup_deadline: Cell::new(None),
            config,
        }
    }
}

#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(mode: RenderMode) -> Self {
        Self::with_options(
            mode,
            CacheConfig::default(),
            Rc::new(SystemClock::new()),
            Rc::new(NoopMountTracker),
        )
    }

    pub fn with_options(
        mode: RenderMode,
        config: CacheConfig,
        clock: Rc<dyn Clock>,
        mounts: Rc<dyn MountTracker>,
    ) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(mode, config, clock, mounts)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn mode(&self) -> RenderMode {
        self.inner.mode
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.config
    }

    pub fn now_millis(&self) -> u64 {
        self.inner.clock.now_millis()
    }

    pub fn mounts(&self) -> Rc<dyn MountTracker> {
        self.inner.mounts.clone()
    }

    pub fn cache_len(&self) -> usize {
        self.inner.element_cache.borrow().len()
    }

    pub fn style_cache_len(&self) -> usize {
        self.inner.style_cache.borrow().len()
    }

    /// Request a debounced safe-cleanup pass. Rapid repeated triggers (e.g.
    /// rapid navigation) coalesce: each call resets the deadline.
    pub fn schedule_cleanup(&self) {
        let deadline = self.now_millis() + self.inner.config.cleanup_debounce_millis;
        self.inner.cleanup_deadline.set(Some(deadline));
    }

    pub fn has_pending_cleanup(&self) -> bool {
        self.inner.cleanup_deadline.get().is_some()
    }

    /// Run the scheduled cleanup if its deadline has passed. Returns the
    /// number of entries removed, or `None` when nothing was due.
    pub fn flush_pending_cleanup(&self) -> Option<usize> {
        let deadline = self.inner.cleanup_deadline.get()?;
        if self.now_millis() < deadline {
            return None;
        }
        self.inner.cleanup_deadline.set(None);
        Some(self.cleanup_safe())
    }

    /// Drop cache entries that are unmounted or whose owner is gone.
    pub fn cleanup_safe(&self) -> usize {
        self.inner
            .element_cache
            .borrow_mut()
            .cleanup_safe(self.inner.mounts.as_ref())
    }

    /// Drop unmounted entries idle longer than the configured threshold.
    pub fn cleanup_old_unmounted(&self) -> usize {
        let now = self.now_millis();
        self.inner.element_cache.borrow_mut().cleanup_old_unmounted(
            self.inner.mounts.as_ref(),
            now,
            self.inner.config.max_idle_millis,
        )
    }

    /// Memory-pressure eviction of large, rarely reused unmounted entries.
    pub fn cleanup_emergency(&self) -> usize {
        self.inner.element_cache.borrow_mut().cleanup_emergency(
            self.inner.mounts.as_ref(),
            self.inner.config.emergency_score_threshold,
        )
    }

    /// Clear every cache. For test isolation and hot-reload paths.
    pub fn clear_caches(&self) {
        self.inner.element_cache.borrow_mut().clear();
        self.inner.style_cache.borrow_mut().clear();
        self.inner.func_hashes.borrow_mut().clear();
        self.inner.cleanup_deadline.set(None);
    }

    /// Full reset: caches plus the instance counter.
    pub fn reset(&self) {
        self.clear_caches();
        self.inner.next_instance_id.set(1);
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("mode", &self.inner.mode)
            .field("cache_len", &self.cache_len())
            .finish()
    }
}

/// Weak handle carried by nodes and teardown wrappers. Operations degrade to
/// no-ops when the runtime is gone.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }

    pub fn is_interactive(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.mode == RenderMode::Interactive)
            .unwrap_or(false)
    }

    pub fn next_instance_id(&self) -> u64 {
        match self.0.upgrade() {
            Some(inner) => {
                let id = inner.next_instance_id.get();
                inner.next_instance_id.set(id + 1);
                id
            }
            None => 0,
        }
    }

    pub fn now_millis(&self) -> u64 {
        self.0
            .upgrade()
            .map(|inner| inner.clock.now_millis())
            .unwrap_or(0)
    }

    /// Hash for a function prop, cached per function identity so repeated
    /// signings are O(1).
    pub fn func_hash(&self, id: u64) -> Rc<str> {
        match self.0.upgrade() {
            Some(inner) => {
                let mut hashes = inner.func_hashes.borrow_mut();
                hashes
                    .entry(id)
                    .or_insert_with(|| Rc::from(hash_text(&format!("fn#{id}")).as_str()))
                    .clone()
            }
            None => Rc::from(hash_text(&format!("fn#{id}")).as_str()),
        }
    }

    pub fn style_cache_get(&self, key: &str) -> Option<Rc<PropMap>> {
        self.0.upgrade()?.style_cache.borrow().get(key)
    }

    pub fn style_cache_insert(&self, key: Rc<str>, props: Rc<PropMap>) {
        if let Some(inner) = self.0.upgrade() {
            let now = inner.clock.now_millis();
            inner.style_cache.borrow_mut().insert(key, props, now);
        }
    }

    pub(crate) fn with_element_cache<R>(&self, f: impl FnOnce(&mut ElementCache) -> R) -> Option<R> {
        self.0
            .upgrade()
            .map(|inner| f(&mut inner.element_cache.borrow_mut()))
    }

    pub(crate) fn cache_entry_output(&self, key: &str, now: u64) -> Option<crate::host::HostOutput> {
        self.with_element_cache(|cache| {
            cache.get(key).map(|entry| {
                entry.touch(now);
                entry.output.clone()
            })
        })
        .flatten()
    }

    pub(crate) fn cache_previous_deps(&self, key: &str) -> Option<Option<Vec<crate::value::PropValue>>> {
        self.with_element_cache(|cache| cache.get(key).map(|entry| entry.previous_deps.clone()))
            .flatten()
    }

    pub(crate) fn cache_upsert(&self, key: Rc<str>, entry: CacheEntry) {
        self.with_element_cache(|cache| cache.upsert(key, entry));
    }

    pub fn dispose_entry(&self, key: &str, instance_id: u64) -> bool {
        self.with_element_cache(|cache| cache.dispose(key, instance_id))
            .unwrap_or(false)
    }

    pub fn track_mount(&self, key: &str) {
        if let Some(inner) = self.0.upgrade() {
            inner.mounts.track(key);
        }
    }

    pub fn untrack_mount(&self, key: &str) {
        if let Some(inner) = self.0.upgrade() {
            inner.mounts.untrack(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock(Cell<u64>);

    impl Clock for ManualClock {
        fn now_millis(&self) -> u64 {
            self.0.get()
        }
    }

    #[test]
    fn handle_degrades_when_runtime_drops() {
        let handle = Runtime::new(RenderMode::Interactive).handle();
        assert!(!handle.is_interactive());
        assert_eq!(handle.next_instance_id(), 0);
        assert!(!handle.dispose_entry("x", 1));
    }

    #[test]
    fn instance_ids_are_monotonic() {
        let rt = Runtime::new(RenderMode::Interactive);
        let handle = rt.handle();
        let a = handle.next_instance_id();
        let b = handle.next_instance_id();
        assert!(b > a);
    }

    #[test]
    fn cleanup_debounce_resets_on_retrigger() {
        let clock = Rc::new(ManualClock(Cell::new(0)));
        let rt = Runtime::with_options(
            RenderMode::Interactive,
            CacheConfig {
                cleanup_debounce_millis: 100,
                ..CacheConfig::default()
            },
            clock.clone(),
            Rc::new(NoopMountTracker),
        );
        rt.schedule_cleanup();
        clock.0.set(80);
        rt.schedule_cleanup(); // resets the deadline to 180
        clock.0.set(150);
        assert!(rt.flush_pending_cleanup().is_none(), "deadline was pushed out");
        clock.0.set(200);
        assert_eq!(rt.flush_pending_cleanup(), Some(0));
        assert!(!rt.has_pending_cleanup());
    }

    #[test]
    fn func_hashes_are_cached_per_identity() {
        let rt = Runtime::new(RenderMode::Interactive);
        let handle = rt.handle();
        let a = handle.func_hash(7);
        let b = handle.func_hash(7);
        assert!(Rc::ptr_eq(&a, &b));
        assert_ne!(handle.func_hash(8), a);
    }

    #[test]
    fn reset_clears_caches_and_counter() {
        let rt = Runtime::new(RenderMode::Interactive);
        let handle = rt.handle();
        handle.style_cache_insert(Rc::from("sig"), Rc::new(PropMap::new()));
        handle.next_instance_id();
        rt.reset();
        assert_eq!(rt.style_cache_len(), 0);
        assert_eq!(handle.next_instance_id(), 1);
    }
}
