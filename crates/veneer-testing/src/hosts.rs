use std::cell::RefCell;
use std::collections::HashMap;

use veneer_core::{Element, FinalProps, HostOutput, PropValue, RenderHost, StyleHost};

/// Plain value tree produced by [`RecordingHost`]. Assertions walk this
/// instead of poking at opaque host output.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueTree {
    Text(String),
    Elem {
        name: String,
        native: Vec<(String, String)>,
        styles: Vec<(String, String)>,
        styled: bool,
        children: Vec<ValueTree>,
    },
}

impl ValueTree {
    pub fn name(&self) -> &str {
        match self {
            ValueTree::Text(_) => "#text",
            ValueTree::Elem { name, .. } => name,
        }
    }

    /// Depth-first search by element name.
    pub fn find(&self, wanted: &str) -> Option<&ValueTree> {
        match self {
            ValueTree::Elem { name, children, .. } => {
                if name == wanted {
                    return Some(self);
                }
                children.iter().find_map(|c| c.find(wanted))
            }
            ValueTree::Text(_) => None,
        }
    }

    /// Concatenated text of this subtree.
    pub fn text_content(&self) -> String {
        match self {
            ValueTree::Text(t) => t.clone(),
            ValueTree::Elem { children, .. } => {
                children.iter().map(ValueTree::text_content).collect()
            }
        }
    }

    pub fn style(&self, key: &str) -> Option<&str> {
        match self {
            ValueTree::Elem { styles, .. } => styles
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            ValueTree::Text(_) => None,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            ValueTree::Elem { native, .. } => native
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            ValueTree::Text(_) => None,
        }
    }

    pub fn was_styled(&self) -> bool {
        matches!(self, ValueTree::Elem { styled: true, .. })
    }
}

fn render_value(value: &PropValue) -> String {
    value.literal().unwrap_or_else(|| "<non-primitive>".into())
}

fn pairs(map: &veneer_core::PropMap) -> Vec<(String, String)> {
    map.iter()
        .map(|(k, v)| (k.to_string(), render_value(v)))
        .collect()
}

/// Host building [`ValueTree`]s and counting creations per element name, so
/// tests can assert which subtrees were recomputed versus adopted from cache.
#[derive(Debug, Default)]
pub struct RecordingHost {
    creates: RefCell<HashMap<String, usize>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times an element with this name was created.
    pub fn count(&self, name: &str) -> usize {
        self.creates.borrow().get(name).copied().unwrap_or(0)
    }

    pub fn total_creates(&self) -> usize {
        self.creates.borrow().values().sum()
    }

    pub fn tree(output: &HostOutput) -> ValueTree {
        output
            .downcast_ref::<ValueTree>()
            .cloned()
            .expect("output produced by RecordingHost")
    }
}

impl RenderHost for RecordingHost {
    fn create_output(
        &mut self,
        element: &Element,
        props: &FinalProps,
        children: Vec<HostOutput>,
    ) -> HostOutput {
        let name = element.display_name();
        *self.creates.borrow_mut().entry(name.clone()).or_default() += 1;
        let children = children
            .iter()
            .filter_map(|c| c.downcast_ref::<ValueTree>().cloned())
            .collect();
        HostOutput::new(ValueTree::Elem {
            name,
            native: pairs(&props.native),
            styles: Vec::new(),
            styled: false,
            children,
        })
    }

    fn create_text(&mut self, text: &str) -> HostOutput {
        HostOutput::new(ValueTree::Text(text.to_string()))
    }
}

/// Style collaborator copying resolved style props onto the value tree and
/// marking the node as styled.
#[derive(Debug, Default)]
pub struct RecordingStyler {
    applications: usize,
}

impl RecordingStyler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applications(&self) -> usize {
        self.applications
    }
}

impl StyleHost for RecordingStyler {
    fn apply_styles(
        &mut self,
        _element: &Element,
        props: &FinalProps,
        output: HostOutput,
    ) -> HostOutput {
        self.applications += 1;
        let mut tree = output
            .downcast_ref::<ValueTree>()
            .cloned()
            .expect("output produced by RecordingHost");
        if let ValueTree::Elem { styles, styled, .. } = &mut tree {
            *styles = pairs(&props.styles);
            *styled = true;
        }
        HostOutput::new(tree)
    }
}
