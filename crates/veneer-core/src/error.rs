use thiserror::Error;

/// Errors surfaced by node construction and tree rendering.
///
/// User-input-shaped problems (a render prop that fails, malformed children)
/// never appear here; they degrade to an empty child instead. These variants
/// are either caller mistakes caught at construction or internal traversal
/// invariants that must never be patched over silently.
#[derive(Debug, Error)]
pub enum RenderError {
    /// An element identity that cannot be rendered, e.g. an empty tag name.
    #[error("invalid element: {0}")]
    InvalidElement(String),

    /// A child node was pushed for processing but its output is missing from
    /// the rendered-output map at assembly time. Indicates a traversal bug.
    #[error("missing rendered output for child node {instance_id} ({name})")]
    MissingChildOutput { instance_id: u64, name: String },

    /// The runtime backing a node was dropped before the operation ran.
    #[error("runtime dropped")]
    RuntimeGone,
}

/// Failure returned by a function-as-child render prop.
///
/// The child normalizer maps this to an empty child rather than propagating,
/// so a misbehaving render prop yields a visibly empty slot instead of
/// crashing the whole tree.
#[derive(Debug, Clone, Error)]
#[error("render prop failed: {0}")]
pub struct RenderPropError(pub String);

impl RenderPropError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
