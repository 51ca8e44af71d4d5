//! Tag factory shorthands.
//!
//! One builder-returning function per common tag, so call sites read as
//! markup without string literals at every node.

use crate::builder::NodeBuilder;
use crate::children::Child;
use crate::element::Element;
use crate::runtime::RuntimeHandle;

/// Builder for an arbitrary tag.
pub fn tag(handle: &RuntimeHandle, name: &str) -> NodeBuilder {
    NodeBuilder::new(handle, Element::tag(name))
}

/// A plain text child.
pub fn text(value: impl Into<std::rc::Rc<str>>) -> Child {
    Child::Text(value.into())
}

macro_rules! tag_fns {
    ($($name:ident)*) => {
        $(
            pub fn $name(handle: &RuntimeHandle) -> NodeBuilder {
                NodeBuilder::new(handle, Element::tag(stringify!($name)))
            }
        )*
    };
}

tag_fns! {
    div span p a ul ol li button input label img
    section header footer nav main article
    h1 h2 h3 h4 table tr td th form
}
