use std::cell::RefCell;
use std::collections::HashSet;

use veneer_core::MountTracker;

/// Mount tracker backed by a plain set. Renders track into it, teardown
/// untracks, and tests can mutate it directly to simulate host unmounts.
#[derive(Debug, Default)]
pub struct TestMounts(RefCell<HashSet<String>>);

impl TestMounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mounted_count(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.borrow().contains(key)
    }
}

impl MountTracker for TestMounts {
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
