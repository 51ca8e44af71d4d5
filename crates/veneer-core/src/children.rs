//! Child normalization.
//!
//! Callers hand in children in many shapes: primitives, node instances,
//! plain element-like values, render-prop functions, component types, and
//! already-instantiated object components. Everything is converted into the
//! canonical forms the tree renderer understands: primitives and nodes.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::element::{Element, Render};
use crate::error::RenderPropError;
use crate::node::Node;
use crate::runtime::RuntimeHandle;
use crate::value::{PropMap, PropValue};

static NEXT_CHILD_FN_ID: AtomicU64 = AtomicU64::new(1);

/// A function-as-child render prop. Invoked at render time; a failure maps to
/// an empty child rather than propagating.
#[derive(Clone)]
pub struct ChildFn {
    id: u64,
    f: Rc<dyn Fn() -> Result<Child, RenderPropError>>,
}

impl ChildFn {
    pub fn new(f: impl Fn() -> Result<Child, RenderPropError> + 'static) -> Self {
        Self {
            id: NEXT_CHILD_FN_ID.fetch_add(1, Ordering::Relaxed),
            f: Rc::new(f),
        }
    }

    /// Wrap an infallible producer.
    pub fn infallible(f: impl Fn() -> Child + 'static) -> Self {
        Self::new(move || Ok(f()))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn call(&self) -> Result<Child, RenderPropError> {
        (self.f)()
    }
}

impl std::fmt::Debug for ChildFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChildFn(#{})", self.id)
    }
}

/// A duck-shaped element value: a recognizable element identity plus a prop
/// bag, not yet wrapped in a node.
#[derive(Clone, Debug)]
pub struct PlainElement {
    pub element: Element,
    pub props: PropMap,
    pub children: Vec<Child>,
    pub key: Option<Rc<str>>,
}

/// Any accepted child shape.
#[derive(Clone)]
pub enum Child {
    Null,
    Bool(bool),
    Num(f64),
    Text(Rc<str>),
    Node(Node),
    /// A plain element-like value; unwrapped into a node.
    Element(Box<PlainElement>),
    /// A bare render-prop function.
    RenderFn(ChildFn),
    /// A component type supplied directly as a child.
    Component(Element),
    /// An instantiated object component; its `render()` output is used.
    Instance(Rc<dyn Render>),
    List(Vec<Child>),
}

impl std::fmt::Debug for Child {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Child::Null => write!(f, "Null"),
            Child::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Child::Num(v) => f.debug_tuple("Num").field(v).finish(),
            Child::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Child::Node(v) => f.debug_tuple("Node").field(v).finish(),
            Child::Element(v) => f.debug_tuple("Element").field(v).finish(),
            Child::RenderFn(v) => f.debug_tuple("RenderFn").field(v).finish(),
            Child::Component(v) => f.debug_tuple("Component").field(v).finish(),
            Child::Instance(v) => write!(f, "Instance({})", v.name()),
            Child::List(v) => f.debug_tuple("List").field(v).finish(),
        }
    }
}

impl Child {
    pub fn text(value: impl Into<Rc<str>>) -> Self {
        Child::Text(value.into())
    }

    fn is_canonical_leaf(&self) -> bool {
        matches!(
            self,
            Child::Null | Child::Bool(_) | Child::Num(_) | Child::Text(_)
        )
    }

    /// Display name used for derived positional keys.
    fn derived_name(&self) -> String {
        match self {
            Child::Node(node) => node.element().display_name(),
            Child::Element(plain) => plain.element.display_name(),
            Child::Component(element) => element.display_name(),
            Child::Instance(instance) => instance.name().to_string(),
            // Lookup failure: fall back to a safe generic name.
            _ => "element".to_string(),
        }
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(Rc::from(value))
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(Rc::from(value.as_str()))
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Child::Num(value)
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Child::Num(f64::from(value))
    }
}

impl From<Node> for Child {
    fn from(value: Node) -> Self {
        Child::Node(value)
    }
}

/// Normalize a declared child list. List members lacking an explicit key get
/// a positional `{name}-{index}` cache-key suffix so identity survives
/// reorderings without caller-specified keys.
pub fn normalize_children(handle: &RuntimeHandle, children: &[Child], disable: bool) -> Vec<Child> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Child::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    let positional = if item.is_canonical_leaf() || has_explicit_key(item) {
                        None
                    } else {
                        Some(format!("{}-{}", item.derived_name(), index))
                    };
                    out.push(normalize_child(handle, item, disable, positional));
                }
            }
            other => out.push(normalize_child(handle, other, disable, None)),
        }
    }
    out
}

fn has_explicit_key(child: &Child) -> bool {
    match child {
        Child::Node(node) => node.list_key().is_some(),
        Child::Element(plain) => plain.key.is_some(),
        _ => false,
    }
}

/// Convert one child into canonical form. `positional_key` augments only the
/// internal cache key, never the externally visible list key.
pub fn normalize_child(
    handle: &RuntimeHandle,
    child: &Child,
    disable: bool,
    positional_key: Option<String>,
) -> Child {
    match child {
        Child::Null | Child::Bool(_) | Child::Num(_) | Child::Text(_) => child.clone(),
        Child::Node(node) => {
            let needs_disable = disable && !node.styles_disabled();
            if positional_key.is_none() && !needs_disable {
                // Reference reuse: nothing to augment or propagate.
                return child.clone();
            }
            Child::Node(node.rekeyed(positional_key, disable))
        }
        Child::RenderFn(f) => match Node::fn_renderer(handle, f.clone(), disable) {
            Ok(node) => Child::Node(node),
            Err(err) => {
                debug!(error = %err, "dropping render-prop child");
                Child::Null
            }
        },
        Child::Element(plain) => {
            let mut props = plain.props.clone();
            // Flatten a nested inline-style sub-object into the top-level
            // bag; explicit top-level declarations win.
            if let Some(PropValue::Map(style)) = props.shift_remove("style") {
                for (k, v) in style.iter() {
                    if !props.contains_key(k.as_ref()) {
                        props.insert(k.clone(), v.clone());
                    }
                }
            }
            let key = plain.key.clone();
            match Node::with_parts(
                handle,
                plain.element.clone(),
                props,
                plain.children.clone(),
                None,
                key,
                disable,
            ) {
                Ok(node) => {
                    let node = match positional_key {
                        Some(prefix) => node.rekeyed(Some(prefix), disable),
                        None => node,
                    };
                    Child::Node(node)
                }
                Err(err) => {
                    debug!(error = %err, "dropping malformed element child");
                    Child::Null
                }
            }
        }
        Child::Component(element) => {
            match Node::with_parts(
                handle,
                element.clone(),
                PropMap::new(),
                Vec::new(),
                None,
                None,
                disable,
            ) {
                Ok(node) => {
                    let node = match positional_key {
                        Some(prefix) => node.rekeyed(Some(prefix), disable),
                        None => node,
                    };
                    Child::Node(node)
                }
                Err(err) => {
                    debug!(error = %err, "dropping invalid component child");
                    Child::Null
                }
            }
        }
        Child::Instance(instance) => {
            let rendered = instance.render();
            normalize_child(handle, &rendered, disable, positional_key)
        }
        Child::List(items) => {
            let normalized = normalize_children(handle, &[Child::List(items.clone())], disable);
            Child::List(normalized)
        }
    }
}
