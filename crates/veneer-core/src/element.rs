//! Element identities.
//!
//! The dynamic host distinguished tags, function components, memo wrappers,
//! ref-forwarding wrappers, and class instances by runtime shape at every
//! normalization call. Here the distinction is a closed enum constructed once
//! at the boundary where a caller supplies an element.

use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;

use crate::children::{Child, ChildFn};
use crate::error::RenderError;
use crate::value::PropMap;

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// An object-shaped component: anything carrying a `render()` method.
pub trait Render {
    fn render(&self) -> Child;

    fn name(&self) -> &str {
        "Instance"
    }
}

/// A named function component.
#[derive(Clone)]
pub struct ComponentFn {
    id: u64,
    name: Rc<str>,
    f: Rc<dyn Fn(&PropMap) -> Child>,
}

impl ComponentFn {
    pub fn new(name: impl Into<Rc<str>>, f: impl Fn(&PropMap) -> Child + 'static) -> Self {
        Self {
            id: NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            f: Rc::new(f),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, props: &PropMap) -> Child {
        (self.f)(props)
    }
}

impl std::fmt::Debug for ComponentFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentFn")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// The thing a node wraps.
#[derive(Clone)]
pub enum Element {
    /// A primitive tag identity, e.g. `div`.
    Tag(Rc<str>),
    /// A function component.
    Component(ComponentFn),
    /// A memoized wrapper around another element.
    Memo(Rc<Element>),
    /// A ref-forwarding wrapper around another element.
    ForwardRef(Rc<Element>),
    /// An instantiated object component; its `render()` output is rendered.
    Instance(Rc<dyn Render>),
    /// Internal: renders a function-as-child render prop at traversal time.
    FnRenderer(ChildFn),
}

impl Element {
    pub fn tag(name: impl Into<Rc<str>>) -> Self {
        Element::Tag(name.into())
    }

    pub fn component(name: impl Into<Rc<str>>, f: impl Fn(&PropMap) -> Child + 'static) -> Self {
        Element::Component(ComponentFn::new(name, f))
    }

    pub fn memo(inner: Element) -> Self {
        Element::Memo(Rc::new(inner))
    }

    pub fn forward_ref(inner: Element) -> Self {
        Element::ForwardRef(Rc::new(inner))
    }

    /// Unwrap memo/ref-forwarding layers to the underlying element.
    pub fn unwrap_base(&self) -> &Element {
        match self {
            Element::Memo(inner) | Element::ForwardRef(inner) => inner.unwrap_base(),
            other => other,
        }
    }

    /// Stable display name, resolved through wrapper layers.
    pub fn display_name(&self) -> String {
        match self.unwrap_base() {
            Element::Tag(tag) => tag.to_string(),
            Element::Component(c) => c.name().to_string(),
            Element::Instance(r) => r.name().to_string(),
            Element::FnRenderer(_) => "fn".to_string(),
            // unwrap_base never returns a wrapper
            Element::Memo(_) | Element::ForwardRef(_) => unreachable!(),
        }
    }

    /// Identity token folded into the signature ahead of any props, so two
    /// different elements never collide even under identical prop text.
    pub fn identity_token(&self) -> String {
        match self.unwrap_base() {
            Element::Tag(tag) => format!("t:{tag}"),
            Element::Component(c) => format!("c:{}#{}", c.name(), c.id()),
            Element::Instance(r) => format!("i:{}", r.name()),
            Element::FnRenderer(f) => format!("f:#{}", f.id()),
            Element::Memo(_) | Element::ForwardRef(_) => unreachable!(),
        }
    }

    /// Construction-time validation. An unrecognizable element identity is a
    /// caller bug and fails immediately rather than rendering garbage later.
    pub fn validate(&self) -> Result<(), RenderError> {
        match self.unwrap_base() {
            Element::Tag(tag) => {
                if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                    return Err(RenderError::InvalidElement(format!(
                        "tag name {tag:?} is not a valid element identity"
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Tags that never receive implicit styling from the style collaborator.
    pub fn is_unstyled_tag(&self) -> bool {
        match self.unwrap_base() {
            Element::Tag(tag) => NO_IMPLICIT_STYLE_TAGS.contains(tag.as_ref()),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Element({})", self.identity_token())
    }
}

static NO_IMPLICIT_STYLE_TAGS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "html", "head", "meta", "link", "script", "style", "noscript", "template", "slot",
        "base", "param", "source", "track", "wbr", "embed", "object", "iframe", "frame",
        "frameset", "applet", "bgsound", "noembed", "noframes",
    ]
    .into_iter()
    .collect()
});
