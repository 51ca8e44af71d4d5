//! Fluent node construction.
//!
//! The builder is the caller-facing way to declare a node without assembling
//! prop maps by hand. Everything funnels into [`Node::with_parts`], so the
//! same validation and keying applies regardless of construction style.

use std::rc::Rc;

use crate::children::Child;
use crate::element::Element;
use crate::error::RenderError;
use crate::node::Node;
use crate::runtime::RuntimeHandle;
use crate::value::{PropMap, PropValue};

#[derive(Clone)]
pub struct NodeBuilder {
    handle: RuntimeHandle,
    element: Element,
    props: PropMap,
    children: Vec<Child>,
    dependencies: Option<Vec<PropValue>>,
    key: Option<Rc<str>>,
    disable_styles: bool,
}

impl NodeBuilder {
    pub fn new(handle: &RuntimeHandle, element: Element) -> Self {
        Self {
            handle: handle.clone(),
            element,
            props: PropMap::new(),
            children: Vec::new(),
            dependencies: None,
            key: None,
            disable_styles: false,
        }
    }

    pub fn prop(mut self, name: impl Into<Rc<str>>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Merge a whole prop bag; later entries win.
    pub fn props(mut self, props: PropMap) -> Self {
        self.props.extend(props);
        self
    }

    /// Explicit style declarations. Entries here override same-named
    /// top-level style props during normalization.
    pub fn css(mut self, styles: PropMap) -> Self {
        self.props
            .insert(Rc::from("css"), PropValue::map(styles));
        self
    }

    /// Props passed through to the host untouched, overriding computed ones.
    pub fn native(mut self, props: PropMap) -> Self {
        self.props
            .insert(Rc::from("nativeProps"), PropValue::map(props));
        self
    }

    /// External list key, also prefixed onto the cache key.
    pub fn key(mut self, key: impl Into<Rc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Declare the memoization dependency list. Without one the node
    /// recomputes on every render.
    pub fn deps(mut self, deps: impl IntoIterator<Item = PropValue>) -> Self {
        self.dependencies = Some(deps.into_iter().collect());
        self
    }

    /// Opt this node and its subtree out of the style collaborator.
    pub fn no_styles(mut self) -> Self {
        self.disable_styles = true;
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append a keyed-list slot; members get positional keys when they lack
    /// explicit ones.
    pub fn children(mut self, children: impl IntoIterator<Item = Child>) -> Self {
        self.children
            .push(Child::List(children.into_iter().collect()));
        self
    }

    pub fn build(self) -> Result<Node, RenderError> {
        Node::with_parts(
            &self.handle,
            self.element,
            self.props,
            self.children,
            self.dependencies,
            self.key,
            self.disable_styles,
        )
    }
}

impl std::fmt::Debug for NodeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeBuilder")
            .field("element", &self.element)
            .field("props", &self.props.len())
            .field("children", &self.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{RenderMode, Runtime};
    use crate::value::prop_map;

    #[test]
    fn builds_a_node_with_props_and_key() {
        let rt = Runtime::new(RenderMode::Interactive);
        let node = NodeBuilder::new(&rt.handle(), Element::tag("div"))
            .prop("title", "hi")
            .key("row-1")
            .deps([PropValue::Num(1.0)])
            .build()
            .unwrap();
        assert_eq!(node.list_key().as_deref(), Some("row-1"));
        assert!(node.stable_key().unwrap().starts_with("row-1/"));
        assert_eq!(node.dependencies().map(<[_]>::len), Some(1));
    }

    #[test]
    fn css_lands_under_the_css_prop() {
        let rt = Runtime::new(RenderMode::Interactive);
        let node = NodeBuilder::new(&rt.handle(), Element::tag("div"))
            .css(prop_map([("color", "red")]))
            .build()
            .unwrap();
        let css = node.raw_props().get("css").and_then(PropValue::as_map);
        assert_eq!(
            css.unwrap().get("color").and_then(|v| v.as_str()),
            Some("red")
        );
    }

    #[test]
    fn no_styles_disables_the_subtree() {
        let rt = Runtime::new(RenderMode::Interactive);
        let node = NodeBuilder::new(&rt.handle(), Element::tag("div"))
            .no_styles()
            .build()
            .unwrap();
        assert!(node.styles_disabled());
    }

    #[test]
    fn invalid_elements_fail_at_build() {
        let rt = Runtime::new(RenderMode::Interactive);
        let result = NodeBuilder::new(&rt.handle(), Element::tag("bad tag")).build();
        assert!(result.is_err());
    }
}
