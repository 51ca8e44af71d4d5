//! The element cache and its eviction policies.
//!
//! Rendered subtrees are keyed by stable key. Eviction is never automatic
//! per-entry: explicit disposal (driven by the teardown wrapper) is the
//! primary release path, with the cleanup passes below handling everything
//! the teardown path missed. A secondary bounded style cache memoizes style
//! extraction for repeated identical cacheable-prop combinations.

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::rc::Rc;

use tracing::trace;

use crate::host::{HostOutput, MountTracker};
use crate::node::WeakNode;
use crate::value::{PropMap, PropValue};

type Map<K, V> = HashMap<K, V, ahash::RandomState>;

/// A previously rendered subtree.
pub struct CacheEntry {
    pub output: HostOutput,
    pub previous_deps: Option<Vec<PropValue>>,
    /// Back-reference to the owning node; never keeps it alive.
    pub owner: WeakNode,
    /// Guards against a slot having been overwritten by a newer instance
    /// reusing the same key.
    pub instance_id: u64,
    pub created_at: u64,
    pub last_access: Cell<u64>,
    pub access_count: Cell<u64>,
    pub estimated_size: usize,
}

impl CacheEntry {
    pub fn touch(&self, now: u64) {
        self.last_access.set(now);
        self.access_count.set(self.access_count.get() + 1);
    }

    fn emergency_score(&self) -> f64 {
        self.estimated_size as f64 * (1000.0 / (self.access_count.get() as f64 + 1.0))
    }
}

#[derive(Default)]
pub struct ElementCache {
    entries: Map<Rc<str>, CacheEntry>,
}

impl ElementCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Create or refresh the entry for `key`. Last write wins.
    pub fn upsert(&mut self, key: Rc<str>, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }

    /// Remove the entry for `key` if it is still owned by `instance_id`.
    /// Returns whether an entry was removed.
    pub fn dispose(&mut self, key: &str, instance_id: u64) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.instance_id == instance_id => {
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Drop entries that are not currently mounted, plus entries whose owning
    /// node is gone.
    pub fn cleanup_safe(&mut self, mounts: &dyn MountTracker) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key, entry| mounts.is_mounted(key) && !entry.owner.is_dead());
        let removed = before - self.entries.len();
        trace!(removed, remaining = self.entries.len(), "safe cache cleanup");
        removed
    }

    /// Like [`cleanup_safe`](Self::cleanup_safe), but tolerates transient
    /// unmounts: an unmounted entry survives until it has been idle longer
    /// than `max_idle_millis`.
    pub fn cleanup_old_unmounted(
        &mut self,
        mounts: &dyn MountTracker,
        now: u64,
        max_idle_millis: u64,
    ) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            if mounts.is_mounted(key) && !entry.owner.is_dead() {
                return true;
            }
            now.saturating_sub(entry.last_access.get()) <= max_idle_millis
        });
        let removed = before - self.entries.len();
        trace!(removed, remaining = self.entries.len(), "old-unmounted cache cleanup");
        removed
    }

    /// Memory-pressure eviction: drop unmounted entries scoring above the
    /// threshold, preferring large and rarely reused subtrees.
    pub fn cleanup_emergency(&mut self, mounts: &dyn MountTracker, score_threshold: f64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            mounts.is_mounted(key) || entry.emergency_score() <= score_threshold
        });
        let removed = before - self.entries.len();
        trace!(removed, remaining = self.entries.len(), "emergency cache cleanup");
        removed
    }

    pub fn clear(&mut self) {
        // Dropping the entries detaches every owner back-reference before
        // the map is reused; the instance-id guard in `dispose` keeps any
        // still-pending teardown from touching a successor entry.
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct StyleEntry {
    props: Rc<PropMap>,
    inserted_at: u64,
    hits: Cell<u64>,
}

impl StyleEntry {
    /// Weighted 30% recency / 70% frequency; higher means more evictable.
    fn eviction_score(&self, now: u64) -> f64 {
        let age_secs = now.saturating_sub(self.inserted_at) as f64 / 1000.0;
        age_secs * 0.3 + 1000.0 / (self.hits.get() as f64 + 1.0) * 0.7
    }
}

struct Scored {
    score: f64,
    key: Rc<str>,
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.score.total_cmp(&other.score) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score)
    }
}

/// Bounded memo of resolved style props keyed by prop signature.
pub struct StyleCache {
    entries: Map<Rc<str>, StyleEntry>,
    ceiling: usize,
    batch: usize,
}

impl StyleCache {
    pub fn new(ceiling: usize, batch: usize) -> Self {
        Self {
            entries: Map::default(),
            ceiling,
            batch,
        }
    }

    pub fn get(&self, key: &str) -> Option<Rc<PropMap>> {
        self.entries.get(key).map(|entry| {
            entry.hits.set(entry.hits.get() + 1);
            entry.props.clone()
        })
    }

    pub fn insert(&mut self, key: Rc<str>, props: Rc<PropMap>, now: u64) {
        self.entries.insert(
            key,
            StyleEntry {
                props,
                inserted_at: now,
                hits: Cell::new(0),
            },
        );
        if self.entries.len() > self.ceiling {
            self.evict_batch(now);
        }
    }

    /// Evict a fixed batch of the most evictable entries. Heap selection
    /// keeps churn cheap compared to sorting the whole map.
    pub fn evict_batch(&mut self, now: u64) -> usize {
        let mut heap: BinaryHeap<Scored> = self
            .entries
            .iter()
            .map(|(key, entry)| Scored {
                score: entry.eviction_score(now),
                key: key.clone(),
            })
            .collect();
        let mut removed = 0;
        for _ in 0..self.batch {
            let Some(scored) = heap.pop() else { break };
            self.entries.remove(&scored.key);
            removed += 1;
        }
        trace!(removed, remaining = self.entries.len(), "style cache batch eviction");
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::node::Node;
    use crate::runtime::{RenderMode, Runtime};
    use crate::value::PropMap;
    use std::cell::RefCell;
    use std::collections::HashSet;

    struct FixedMounts(RefCell<HashSet<String>>);

    impl FixedMounts {
        fn new(keys: &[&str]) -> Self {
            Self(RefCell::new(keys.iter().map(|k| k.to_string()).collect()))
        }
    }

    impl MountTracker for FixedMounts {
        fn is_mounted(&self, key: &str) -> bool {
            self.0.borrow().contains(key)
        }
        fn track(&self, key: &str) {
            self.0.borrow_mut().insert(key.to_string());
        }
        fn untrack(&self, key: &str) {
            self.0.borrow_mut().remove(key);
        }
    }

    fn entry_for(node: &Node, size: usize, accesses: u64, last_access: u64) -> CacheEntry {
        CacheEntry {
            output: HostOutput::new(()),
            previous_deps: Some(Vec::new()),
            owner: node.downgrade(),
            instance_id: node.instance_id(),
            created_at: 0,
            last_access: Cell::new(last_access),
            access_count: Cell::new(accesses),
            estimated_size: size,
        }
    }

    fn node(rt: &Runtime) -> Node {
        Node::new(&rt.handle(), Element::tag("div"), PropMap::new()).unwrap()
    }

    #[test]
    fn dispose_requires_matching_instance() {
        let rt = Runtime::new(RenderMode::Interactive);
        let owner = node(&rt);
        let mut cache = ElementCache::new();
        cache.upsert(Rc::from("k"), entry_for(&owner, 1, 0, 0));
        assert!(!cache.dispose("k", owner.instance_id() + 1));
        assert_eq!(cache.len(), 1);
        assert!(cache.dispose("k", owner.instance_id()));
        assert!(cache.is_empty());
    }

    #[test]
    fn safe_cleanup_drops_unmounted_and_dead_owners() {
        let rt = Runtime::new(RenderMode::Interactive);
        let mounted = node(&rt);
        let unmounted = node(&rt);
        let mut cache = ElementCache::new();
        cache.upsert(Rc::from("mounted"), entry_for(&mounted, 1, 0, 0));
        cache.upsert(Rc::from("unmounted"), entry_for(&unmounted, 1, 0, 0));
        {
            let dead = node(&rt);
            cache.upsert(Rc::from("dead"), entry_for(&dead, 1, 0, 0));
        }
        let mounts = FixedMounts::new(&["mounted", "dead"]);
        let removed = cache.cleanup_safe(&mounts);
        assert_eq!(removed, 2);
        assert!(cache.get("mounted").is_some());
        assert!(cache.get("unmounted").is_none());
        assert!(cache.get("dead").is_none());
    }

    #[test]
    fn old_unmounted_requires_idle_age() {
        let rt = Runtime::new(RenderMode::Interactive);
        let fresh = node(&rt);
        let stale = node(&rt);
        let mut cache = ElementCache::new();
        cache.upsert(Rc::from("fresh"), entry_for(&fresh, 1, 0, 1_000));
        cache.upsert(Rc::from("stale"), entry_for(&stale, 1, 0, 0));
        let mounts = FixedMounts::new(&[]);
        let removed = cache.cleanup_old_unmounted(&mounts, 700_000, 600_000);
        assert_eq!(removed, 1, "only the idle-past-threshold entry goes");
        assert!(cache.get("fresh").is_some());
        assert!(cache.get("stale").is_none());
    }

    #[test]
    fn emergency_prefers_large_rarely_used() {
        let rt = Runtime::new(RenderMode::Interactive);
        let big_cold = node(&rt);
        let big_hot = node(&rt);
        let small_cold = node(&rt);
        let mut cache = ElementCache::new();
        // score = size * 1000/(accesses+1)
        cache.upsert(Rc::from("big-cold"), entry_for(&big_cold, 100, 0, 0)); // 100_000
        cache.upsert(Rc::from("big-hot"), entry_for(&big_hot, 100, 999, 0)); // 100
        cache.upsert(Rc::from("small-cold"), entry_for(&small_cold, 1, 0, 0)); // 1_000
        let mounts = FixedMounts::new(&[]);
        let removed = cache.cleanup_emergency(&mounts, 50_000.0);
        assert_eq!(removed, 1);
        assert!(cache.get("big-cold").is_none());
        assert!(cache.get("big-hot").is_some());
        assert!(cache.get("small-cold").is_some());
    }

    #[test]
    fn style_batch_eviction_follows_weighted_score() {
        let mut cache = StyleCache::new(16, 1);
        let props = Rc::new(PropMap::new());
        cache.insert(Rc::from("old-infrequent"), props.clone(), 0);
        cache.insert(Rc::from("old-frequent"), props.clone(), 0);
        cache.insert(Rc::from("recent-frequent"), props.clone(), 90_000);
        for _ in 0..50 {
            cache.get("old-frequent");
            cache.get("recent-frequent");
        }
        let removed = cache.evict_batch(100_000);
        assert_eq!(removed, 1);
        assert!(cache.get("old-infrequent").is_none());
        assert!(cache.get("old-frequent").is_some());
        assert!(cache.get("recent-frequent").is_some());
    }

    #[test]
    fn style_cache_enforces_ceiling() {
        let mut cache = StyleCache::new(2, 2);
        let props = Rc::new(PropMap::new());
        cache.insert(Rc::from("a"), props.clone(), 0);
        cache.insert(Rc::from("b"), props.clone(), 1_000);
        assert_eq!(cache.len(), 2);
        cache.insert(Rc::from("c"), props, 2_000);
        assert_eq!(cache.len(), 1, "over the ceiling a batch of two is evicted");
    }
}
