#![doc = r"A fluent factory layer over a component rendering host.

Callers declare trees of nodes through builders instead of markup. The
runtime normalizes props, resolves theme tokens, memoizes subtrees by
dependency identity, and renders iteratively to a pluggable host."]

pub mod builder;
pub mod cache;
pub mod children;
pub mod element;
pub mod error;
pub mod host;
pub mod node;
pub mod props;
pub mod render;
pub mod runtime;
pub mod signature;
pub mod tags;
pub mod theme;
pub mod value;

pub use builder::NodeBuilder;
pub use children::{Child, ChildFn, PlainElement};
pub use element::{ComponentFn, Element, Render};
pub use error::{RenderError, RenderPropError};
pub use host::{
    HostOutput, MountTracker, NoopMountTracker, RenderHost, StyleHost, TeardownHandle,
};
pub use node::{Node, WeakNode};
pub use props::FinalProps;
pub use render::{render_tree, RenderedTree};
pub use runtime::{CacheConfig, Clock, RenderMode, Runtime, RuntimeHandle, SystemClock};
pub use theme::{ResolveOptions, Theme};
pub use value::{deps_equal, prop_map, same_identity, PropFunc, PropMap, PropValue};
