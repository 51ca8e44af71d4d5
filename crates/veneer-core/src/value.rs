//! Dynamic property values.
//!
//! Raw props arrive as an insertion-ordered map of [`PropValue`]s. Containers
//! are `Rc`-shared so the theme resolver's smart merge and the dependency
//! comparison can rely on reference identity surviving across renders.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use crate::node::Node;
use crate::theme::Theme;

/// Insertion-ordered property bag.
pub type PropMap = IndexMap<Rc<str>, PropValue>;

static NEXT_FUNC_ID: AtomicU64 = AtomicU64::new(1);

fn next_func_id() -> u64 {
    NEXT_FUNC_ID.fetch_add(1, Ordering::Relaxed)
}

/// A theme-dependent property function.
///
/// Carries a monotonic id so signature hashing and identity comparison stay
/// O(1) per function; closures have no inspectable content to hash.
#[derive(Clone)]
pub struct PropFunc {
    id: u64,
    name: Option<Rc<str>>,
    f: Rc<dyn Fn(&Theme) -> PropValue>,
}

impl PropFunc {
    pub fn new(f: impl Fn(&Theme) -> PropValue + 'static) -> Self {
        Self {
            id: next_func_id(),
            name: None,
            f: Rc::new(f),
        }
    }

    pub fn named(name: impl Into<Rc<str>>, f: impl Fn(&Theme) -> PropValue + 'static) -> Self {
        Self {
            id: next_func_id(),
            name: Some(name.into()),
            f: Rc::new(f),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn call(&self, theme: &Theme) -> PropValue {
        (self.f)(theme)
    }
}

impl std::fmt::Debug for PropFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropFunc")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// A single property value.
#[derive(Clone, Debug)]
pub enum PropValue {
    Null,
    Bool(bool),
    Num(f64),
    Str(Rc<str>),
    List(Rc<Vec<PropValue>>),
    Map(Rc<PropMap>),
    Func(PropFunc),
    Node(Node),
}

impl PropValue {
    pub fn str(value: impl Into<Rc<str>>) -> Self {
        PropValue::Str(value.into())
    }

    pub fn list(values: Vec<PropValue>) -> Self {
        PropValue::List(Rc::new(values))
    }

    pub fn map(map: PropMap) -> Self {
        PropValue::Map(Rc::new(map))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Null)
    }

    /// Primitive values can act as cache keys directly; containers and
    /// functions cannot, since their identity says nothing about content.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            PropValue::Null | PropValue::Bool(_) | PropValue::Num(_) | PropValue::Str(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Rc<PropMap>> {
        match self {
            PropValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            PropValue::Null => false,
            PropValue::Bool(b) => *b,
            PropValue::Num(n) => *n != 0.0,
            PropValue::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Render a primitive as literal text for signature fragments.
    pub fn literal(&self) -> Option<String> {
        match self {
            PropValue::Null => Some("null".into()),
            PropValue::Bool(b) => Some(b.to_string()),
            PropValue::Num(n) => Some(format_num(*n)),
            PropValue::Str(s) => Some(s.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(Rc::from(value.as_str()))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Num(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Num(value as f64)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Num(value as f64)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<Node> for PropValue {
    fn from(value: Node) -> Self {
        PropValue::Node(value)
    }
}

/// Format a number the way it appears in signatures and substituted strings:
/// integral values drop the trailing `.0`.
pub fn format_num(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Shallow identity comparison used by the dependency policy.
///
/// Primitives compare by value, containers and functions by reference, nodes
/// by instance. `NaN != NaN`, matching host-language identity semantics.
pub fn same_identity(a: &PropValue, b: &PropValue) -> bool {
    match (a, b) {
        (PropValue::Null, PropValue::Null) => true,
        (PropValue::Bool(x), PropValue::Bool(y)) => x == y,
        (PropValue::Num(x), PropValue::Num(y)) => x == y,
        (PropValue::Str(x), PropValue::Str(y)) => x == y,
        (PropValue::List(x), PropValue::List(y)) => Rc::ptr_eq(x, y),
        (PropValue::Map(x), PropValue::Map(y)) => Rc::ptr_eq(x, y),
        (PropValue::Func(x), PropValue::Func(y)) => x.id == y.id,
        (PropValue::Node(x), PropValue::Node(y)) => x.instance_id() == y.instance_id(),
        _ => false,
    }
}

/// Compare two dependency lists member-wise by shallow identity.
pub fn deps_equal(previous: &[PropValue], current: &[PropValue]) -> bool {
    previous.len() == current.len()
        && previous
            .iter()
            .zip(current.iter())
            .all(|(p, c)| same_identity(p, c))
}

/// Build a [`PropMap`] from `(key, value)` pairs.
pub fn prop_map<K, V, I>(entries: I) -> PropMap
where
    K: Into<Rc<str>>,
    V: Into<PropValue>,
    I: IntoIterator<Item = (K, V)>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
