//! Iterative tree rendering.
//!
//! The traversal runs two phases per node on an explicit stack, begin
//! (descend) and complete (assemble), instead of language recursion, so tree
//! depth is bounded by the heap rather than the call stack. At every node the
//! element cache and the dependency policy decide whether a previously
//! rendered subtree can be adopted outright.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use crate::cache::CacheEntry;
use crate::children::Child;
use crate::element::Element;
use crate::error::RenderError;
use crate::host::{HostOutput, RenderHost, StyleHost, TeardownHandle};
use crate::node::Node;
use crate::runtime::{Runtime, RuntimeHandle};
use crate::theme::Theme;
use crate::value::{deps_equal, format_num};

/// Output of one render call. On interactive paths the teardown handle
/// releases this render's cache claims when the host unmounts the subtree.
#[derive(Debug)]
pub struct RenderedTree {
    pub output: HostOutput,
    pub teardown: Option<TeardownHandle>,
}

struct WorkItem {
    node: Node,
    processed: bool,
    /// An ancestor decided not to update; descendants never diverge from
    /// cache even if their own dependency lists would allow it.
    blocked: bool,
    children: Vec<Child>,
}

/// The dependency policy.
///
/// `None` dependencies mean "always recompute". A provided list (even empty)
/// means "recompute only when a member differs by shallow identity from the
/// previous render", unless an ancestor already blocked the subtree.
fn should_update(handle: &RuntimeHandle, node: &Node, parent_blocked: bool) -> bool {
    if parent_blocked {
        return false;
    }
    let Some(current) = node.dependencies() else {
        return true;
    };
    let Some(key) = node.stable_key() else {
        return true;
    };
    match handle.cache_previous_deps(&key) {
        Some(Some(previous)) => !deps_equal(&previous, current),
        // No entry yet, or an entry without recorded deps: must compute.
        _ => true,
    }
}

fn cache_eligible(handle: &RuntimeHandle, node: &Node) -> bool {
    handle.is_interactive() && node.stable_key().is_some() && node.dependencies().is_some()
}

/// Resolve the children to walk for a node. Render-prop nodes invoke their
/// function here; a failure degrades to an empty slot.
fn resolve_children(handle: &RuntimeHandle, node: &Node, theme: &Theme) -> Vec<Child> {
    if let Element::FnRenderer(f) = node.element() {
        return match f.call() {
            Ok(child) => {
                crate::children::normalize_children(handle, &[child], node.styles_disabled())
            }
            Err(err) => {
                debug!(error = %err, "render prop failed; substituting empty output");
                Vec::new()
            }
        };
    }
    node.final_props(theme).children.clone()
}

fn visit_nodes<'a>(children: &'a [Child], f: &mut impl FnMut(&'a Node)) {
    for child in children {
        match child {
            Child::Node(node) => f(node),
            Child::List(items) => visit_nodes(items, f),
            _ => {}
        }
    }
}

fn collect_outputs(
    children: &[Child],
    outputs: &ahash::HashMap<u64, HostOutput>,
    host: &mut dyn RenderHost,
    acc: &mut Vec<HostOutput>,
) -> Result<(), RenderError> {
    for child in children {
        match child {
            Child::Node(node) => {
                let output = outputs.get(&node.instance_id()).cloned().ok_or_else(|| {
                    RenderError::MissingChildOutput {
                        instance_id: node.instance_id(),
                        name: node.element().display_name(),
                    }
                })?;
                acc.push(output);
            }
            Child::Text(text) => acc.push(host.create_text(text)),
            Child::Num(n) => acc.push(host.create_text(&format_num(*n))),
            Child::List(items) => collect_outputs(items, outputs, host, acc)?,
            // Null and booleans render nothing.
            _ => {}
        }
    }
    Ok(())
}

/// Render a node tree to host output.
pub fn render_tree(
    runtime: &Runtime,
    root: &Node,
    host: &mut dyn RenderHost,
    styles: &mut dyn StyleHost,
    theme: &Theme,
) -> Result<RenderedTree, RenderError> {
    let handle = runtime.handle();
    let mut outputs: ahash::HashMap<u64, HostOutput> = ahash::HashMap::default();
    let mut written: Vec<(Rc<str>, u64)> = Vec::new();
    let mut stack = vec![WorkItem {
        node: root.clone(),
        processed: false,
        blocked: false,
        children: Vec::new(),
    }];

    while let Some(mut item) = stack.pop() {
        if !item.processed {
            // Begin phase: try to adopt a cached subtree before descending.
            let update = should_update(&handle, &item.node, item.blocked);
            if !update {
                if let Some(key) = item.node.stable_key() {
                    if let Some(output) = handle.cache_entry_output(&key, runtime.now_millis()) {
                        outputs.insert(item.node.instance_id(), output);
                        continue;
                    }
                }
            }
            let children = resolve_children(&handle, &item.node, theme);
            let parent_blocked = item.blocked;
            item.processed = true;
            item.children = children;

            let mut pending: Vec<WorkItem> = Vec::new();
            visit_nodes(&item.children, &mut |child| {
                let child_update = should_update(&handle, child, parent_blocked);
                if !child_update {
                    if let Some(key) = child.stable_key() {
                        if let Some(output) = handle.cache_entry_output(&key, runtime.now_millis())
                        {
                            outputs.insert(child.instance_id(), output);
                            return;
                        }
                    }
                }
                pending.push(WorkItem {
                    node: child.clone(),
                    processed: false,
                    blocked: parent_blocked || !child_update,
                    children: Vec::new(),
                });
            });
            stack.push(item);
            stack.extend(pending);
        } else {
            // Complete phase: every pushed child has finished by now.
            let mut child_outputs = Vec::new();
            collect_outputs(&item.children, &outputs, host, &mut child_outputs)?;
            let child_count = child_outputs.len();
            let final_props = item.node.final_props(theme);
            let mut output = host.create_output(item.node.element(), &final_props, child_outputs);
            let skip_styles = final_props.disable_styles
                || item.node.element().is_unstyled_tag()
                || matches!(item.node.element(), Element::FnRenderer(_));
            if !skip_styles {
                output = styles.apply_styles(item.node.element(), &final_props, output);
            }
            outputs.insert(item.node.instance_id(), output.clone());

            let is_root = item.node.instance_id() == root.instance_id();
            if !is_root && cache_eligible(&handle, &item.node) {
                let key = item.node.stable_key().expect("eligibility implies a key");
                let now = runtime.now_millis();
                let estimated_size =
                    final_props.styles.len() + final_props.native.len() + child_count * 8 + 1;
                handle.cache_upsert(
                    key.clone(),
                    CacheEntry {
                        output,
                        previous_deps: item.node.dependencies().map(|deps| deps.to_vec()),
                        owner: item.node.downgrade(),
                        instance_id: item.node.instance_id(),
                        created_at: now,
                        last_access: Cell::new(now),
                        access_count: Cell::new(0),
                        estimated_size,
                    },
                );
                handle.track_mount(&key);
                written.push((key, item.node.instance_id()));
            }
        }
    }

    let output = outputs
        .get(&root.instance_id())
        .cloned()
        .ok_or_else(|| RenderError::MissingChildOutput {
            instance_id: root.instance_id(),
            name: root.element().display_name(),
        })?;
    let teardown = handle
        .is_interactive()
        .then(|| TeardownHandle::new(handle.clone(), written, root.downgrade()));
    Ok(RenderedTree { output, teardown })
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
