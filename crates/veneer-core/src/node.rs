//! The node entity.
//!
//! A node wraps an element identity and the caller's raw props. Its stable
//! key is computed once at construction (interactive renders only) and serves
//! both as the external reconciliation key and the internal cache key. Final
//! props are computed lazily, at most once per instance.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::children::{Child, ChildFn};
use crate::element::Element;
use crate::error::RenderError;
use crate::props::{process_props, FinalProps};
use crate::runtime::RuntimeHandle;
use crate::signature::prop_signature;
use crate::theme::Theme;
use crate::value::{PropMap, PropValue};

pub(crate) struct NodeInner {
    element: Element,
    raw_props: PropMap,
    raw_children: Vec<Child>,
    dependencies: Option<Vec<PropValue>>,
    stable_key: Option<Rc<str>>,
    list_key: Option<Rc<str>>,
    instance_id: u64,
    disable_styles: bool,
    runtime: RuntimeHandle,
    final_props: RefCell<Option<Rc<FinalProps>>>,
}

/// Cheap-to-clone handle to a node instance.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeInner>,
}

impl Node {
    pub fn new(
        handle: &RuntimeHandle,
        element: Element,
        props: PropMap,
    ) -> Result<Self, RenderError> {
        Self::with_parts(handle, element, props, Vec::new(), None, None, false)
    }

    /// Full constructor. `list_key` overrides a `key` entry in `props`;
    /// `disable_styles` is OR-ed with a `disableEmotion` prop.
    pub fn with_parts(
        handle: &RuntimeHandle,
        element: Element,
        props: PropMap,
        children: Vec<Child>,
        dependencies: Option<Vec<PropValue>>,
        list_key: Option<Rc<str>>,
        disable_styles: bool,
    ) -> Result<Self, RenderError> {
        element.validate()?;
        if handle.upgrade().is_none() {
            return Err(RenderError::RuntimeGone);
        }
        let list_key = list_key.or_else(|| {
            props.get("key").and_then(|v| match v {
                PropValue::Str(s) => Some(s.clone()),
                PropValue::Num(n) => Some(Rc::from(crate::value::format_num(*n).as_str())),
                _ => None,
            })
        });
        let disable_styles = disable_styles
            || props
                .get("disableEmotion")
                .map(PropValue::truthy)
                .unwrap_or(false);
        let stable_key = prop_signature(handle, &element, &props).map(|sig| match &list_key {
            Some(key) => Rc::from(format!("{key}/{sig}").as_str()),
            None => sig,
        });
        Ok(Self {
            inner: Rc::new(NodeInner {
                element,
                raw_props: props,
                raw_children: children,
                dependencies,
                stable_key,
                list_key,
                instance_id: handle.next_instance_id(),
                disable_styles,
                runtime: handle.clone(),
                final_props: RefCell::new(None),
            }),
        })
    }

    /// Internal node wrapping a render-prop function. Never cached: a render
    /// function must run on every render.
    pub(crate) fn fn_renderer(
        handle: &RuntimeHandle,
        f: ChildFn,
        disable_styles: bool,
    ) -> Result<Self, RenderError> {
        Self::with_parts(
            handle,
            Element::FnRenderer(f),
            PropMap::new(),
            Vec::new(),
            None,
            None,
            disable_styles,
        )
    }

    /// Clone this node with a positional prefix on the internal cache key
    /// and/or a propagated style-disable flag. The external list key is left
    /// untouched; only the cache identity shifts.
    pub fn rekeyed(&self, prefix: Option<String>, disable_styles: bool) -> Self {
        let inner = &self.inner;
        let stable_key = match (&prefix, &inner.stable_key) {
            (Some(p), Some(orig)) => Some(Rc::from(format!("{p}/{orig}").as_str())),
            (None, orig) => orig.clone(),
            (Some(_), None) => None,
        };
        Self {
            inner: Rc::new(NodeInner {
                element: inner.element.clone(),
                raw_props: inner.raw_props.clone(),
                raw_children: inner.raw_children.clone(),
                dependencies: inner.dependencies.clone(),
                stable_key,
                list_key: inner.list_key.clone(),
                instance_id: inner.runtime.next_instance_id(),
                disable_styles: disable_styles || inner.disable_styles,
                runtime: inner.runtime.clone(),
                final_props: RefCell::new(None),
            }),
        }
    }

    pub fn element(&self) -> &Element {
        &self.inner.element
    }

    pub fn raw_props(&self) -> &PropMap {
        &self.inner.raw_props
    }

    pub fn raw_children(&self) -> &[Child] {
        &self.inner.raw_children
    }

    pub fn dependencies(&self) -> Option<&[PropValue]> {
        self.inner.dependencies.as_deref()
    }

    pub fn stable_key(&self) -> Option<Rc<str>> {
        self.inner.stable_key.clone()
    }

    pub fn list_key(&self) -> Option<Rc<str>> {
        self.inner.list_key.clone()
    }

    pub fn instance_id(&self) -> u64 {
        self.inner.instance_id
    }

    pub fn styles_disabled(&self) -> bool {
        self.inner.disable_styles
    }

    pub(crate) fn runtime(&self) -> &RuntimeHandle {
        &self.inner.runtime
    }

    /// Normalized props, computed at most once per instance.
    pub fn final_props(&self, theme: &Theme) -> Rc<FinalProps> {
        if let Some(existing) = self.inner.final_props.borrow().as_ref() {
            return existing.clone();
        }
        let computed = Rc::new(process_props(
            &self.inner.runtime,
            &self.inner.element,
            &self.inner.raw_props,
            &self.inner.raw_children,
            theme,
            self.inner.disable_styles,
        ));
        *self.inner.final_props.borrow_mut() = Some(computed.clone());
        computed
    }

    /// Drop the memoized final props. Invoked by the teardown path so a
    /// disposed subtree stops retaining normalized children.
    pub(crate) fn clear_retained(&self) {
        self.inner.final_props.borrow_mut().take();
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.inner))
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("element", &self.inner.element)
            .field("instance_id", &self.inner.instance_id)
            .field("stable_key", &self.inner.stable_key)
            .finish()
    }
}

/// Weak back-reference held by cache entries: never keeps a node alive.
#[derive(Clone)]
pub struct WeakNode(Weak<NodeInner>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(|inner| Node { inner })
    }

    pub fn is_dead(&self) -> bool {
        self.0.strong_count() == 0
    }
}
