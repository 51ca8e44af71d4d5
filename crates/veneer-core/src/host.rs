//! Boundary contracts.
//!
//! The core never inspects host output internals; it stores and passes them
//! through. Styling, mount detection, and output construction are all
//! delegated to collaborators behind these traits.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use crate::element::Element;
use crate::node::WeakNode;
use crate::props::FinalProps;
use crate::runtime::RuntimeHandle;

/// Opaque host-renderable output.
#[derive(Clone)]
pub struct HostOutput(Rc<dyn Any>);

impl HostOutput {
    pub fn new<T: 'static>(value: T) -> Self {
        Self(Rc::new(value))
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &HostOutput) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for HostOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HostOutput")
    }
}

/// Produces host output for an element with finalized props and children.
pub trait RenderHost {
    fn create_output(
        &mut self,
        element: &Element,
        props: &FinalProps,
        children: Vec<HostOutput>,
    ) -> HostOutput;

    /// Host output for a primitive text child.
    fn create_text(&mut self, text: &str) -> HostOutput;
}

/// Applies computed styles to an already-created output, e.g. by injecting
/// stylesheet rules and wrapping the element.
pub trait StyleHost {
    fn apply_styles(
        &mut self,
        element: &Element,
        props: &FinalProps,
        output: HostOutput,
    ) -> HostOutput;
}

/// External mount bookkeeping consulted by the eviction policies. The core
/// never detects mounts itself.
pub trait MountTracker {
    fn is_mounted(&self, key: &str) -> bool;
    fn track(&self, key: &str);
    fn untrack(&self, key: &str);
}

/// Tracker that reports nothing mounted and records nothing. The default for
/// runtimes whose callers drive eviction manually.
#[derive(Debug, Default)]
pub struct NoopMountTracker;

impl MountTracker for NoopMountTracker {
    fn is_mounted(&self, _key: &str) -> bool {
        false
    }

    fn track(&self, _key: &str) {}

    fn untrack(&self, _key: &str) {}
}

/// Explicit teardown for one interactive render.
///
/// Disposal is the primary release path for cache entries: it runs when the
/// host unmounts the wrapped subtree, not when a collector gets around to it.
/// Dropping the handle without calling [`dispose`](Self::dispose) releases
/// nothing beyond making the owning nodes collectible.
pub struct TeardownHandle {
    runtime: RuntimeHandle,
    entries: Vec<(Rc<str>, u64)>,
    root: WeakNode,
    disposed: Cell<bool>,
}

impl TeardownHandle {
    pub(crate) fn new(runtime: RuntimeHandle, entries: Vec<(Rc<str>, u64)>, root: WeakNode) -> Self {
        Self {
            runtime,
            entries,
            root,
            disposed: Cell::new(false),
        }
    }

    /// Number of cache entries this render claimed.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Release the cache entries written by this render and clear retained
    /// prop references on the owning subtree. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        for (key, instance_id) in &self.entries {
            if !self.runtime.dispose_entry(key, *instance_id) {
                // Slot was already overwritten by a newer instance reusing
                // the key; leave it alone.
                debug!(key = %key, "stale teardown skipped");
            }
            self.runtime.untrack_mount(key);
        }
        if let Some(root) = self.root.upgrade() {
            root.clear_retained();
        }
    }
}

impl std::fmt::Debug for TeardownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeardownHandle")
            .field("entries", &self.entries.len())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}
