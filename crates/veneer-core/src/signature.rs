//! Stable identity signatures.
//!
//! A node's cache key is derived from its element identity and its raw props
//! (children and ref excluded). Full deep serialization of arbitrary prop
//! graphs is too slow to run on every construction, so fragments are bounded
//! approximations biased toward false cache misses over false cache hits.

use std::rc::Rc;

use crate::element::Element;
use crate::runtime::RuntimeHandle;
use crate::value::{PropMap, PropValue};

/// Keys excluded from signatures: children shift per render and refs carry no
/// render-relevant content.
const EXCLUDED_KEYS: [&str; 2] = ["children", "ref"];

fn fnv1a(input: &str) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for byte in input.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

fn djb2(input: &str) -> u32 {
    let mut hash: u32 = 5381;
    for byte in input.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(u32::from(byte));
    }
    hash
}

fn base36(mut value: u32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}

/// Combine two independent rolling hashes over the same input. Either alone
/// collides too readily on short prop strings; the concatenation keeps the
/// key short while shrinking the collision probability.
pub fn hash_text(input: &str) -> String {
    format!("{}{}", base36(fnv1a(input)), base36(djb2(input)))
}

/// Weight of a value inside the sampled css hash. Only lengths are folded in;
/// content differences beyond length are accepted as collision risk.
fn value_weight(value: &PropValue) -> u32 {
    match value {
        PropValue::Null => 0,
        PropValue::Bool(_) => 1,
        PropValue::Num(_) => 8,
        PropValue::Str(s) => s.len() as u32,
        PropValue::List(items) => items.len() as u32,
        PropValue::Map(map) => map.len() as u32,
        PropValue::Func(_) => 13,
        PropValue::Node(_) => 17,
    }
}

/// Fast structural hash of a style descriptor: samples only the first ten
/// entries, folding key length and value weight into a rolling integer.
pub fn css_quick_hash(map: &PropMap) -> String {
    let mut hash: u32 = 7;
    for (key, value) in map.iter().take(10) {
        hash = hash
            .wrapping_mul(31)
            .wrapping_add(key.len() as u32)
            .wrapping_mul(7)
            .wrapping_add(value_weight(value));
    }
    hash = hash.wrapping_mul(31).wrapping_add(map.len() as u32);
    format!("css:{}", base36(hash))
}

fn fragment(handle: &RuntimeHandle, key: &str, value: &PropValue) -> String {
    match value {
        PropValue::Null => "null".to_string(),
        PropValue::Bool(b) => b.to_string(),
        PropValue::Num(n) => crate::value::format_num(*n),
        PropValue::Str(s) => s.to_string(),
        PropValue::Map(map) if key == "css" => css_quick_hash(map),
        PropValue::Map(map) => {
            // Structure only: sorted key list, never values.
            let mut keys: Vec<&str> = map.keys().map(|k| k.as_ref()).collect();
            keys.sort_unstable();
            format!("{{{}}}", keys.join(","))
        }
        PropValue::List(items) => {
            if items.iter().all(PropValue::is_primitive) {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| item.literal().unwrap_or_default())
                    .collect();
                parts.join(",")
            } else {
                format!("len:{}", items.len())
            }
        }
        PropValue::Node(node) => node
            .stable_key()
            .map(|k| k.to_string())
            .unwrap_or_else(|| format!("node#{}", node.instance_id())),
        PropValue::Func(f) => handle.func_hash(f.id()).to_string(),
    }
}

/// Compute the stable prop signature for `(element, props)`.
///
/// Returns `None` on a non-interactive render path: identity-based caching is
/// purely a client-side repeated-render optimization, so nothing is keyed on
/// the server.
pub fn prop_signature(
    handle: &RuntimeHandle,
    element: &Element,
    props: &PropMap,
) -> Option<Rc<str>> {
    if !handle.is_interactive() {
        return None;
    }
    let mut keys: Vec<&Rc<str>> = props
        .keys()
        .filter(|k| !EXCLUDED_KEYS.contains(&k.as_ref()))
        .collect();
    keys.sort_unstable();

    let mut text = element.identity_token();
    for key in keys {
        let value = &props[key.as_ref()];
        text.push('|');
        text.push_str(key);
        text.push('=');
        text.push_str(&fragment(handle, key, value));
    }
    Some(Rc::from(hash_text(&text).as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{RenderMode, Runtime};
    use crate::value::prop_map;

    fn interactive() -> Runtime {
        Runtime::new(RenderMode::Interactive)
    }

    #[test]
    fn signature_is_idempotent() {
        let rt = interactive();
        let element = Element::tag("div");
        let props = prop_map([("color", "red"), ("margin", "4")]);
        let a = prop_signature(&rt.handle(), &element, &props).unwrap();
        let b = prop_signature(&rt.handle(), &element, &props).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn signature_is_order_independent() {
        let rt = interactive();
        let element = Element::tag("div");
        let a = prop_signature(&rt.handle(), &element, &prop_map([("a", "1"), ("b", "2")]));
        let b = prop_signature(&rt.handle(), &element, &prop_map([("b", "2"), ("a", "1")]));
        assert_eq!(a, b);
    }

    #[test]
    fn changing_a_primitive_changes_the_signature() {
        let rt = interactive();
        let element = Element::tag("div");
        let a = prop_signature(&rt.handle(), &element, &prop_map([("color", "red")]));
        let b = prop_signature(&rt.handle(), &element, &prop_map([("color", "blue")]));
        assert_ne!(a, b);
    }

    #[test]
    fn element_identity_is_folded_in_first() {
        let rt = interactive();
        let props = prop_map([("color", "red")]);
        let div = prop_signature(&rt.handle(), &Element::tag("div"), &props);
        let span = prop_signature(&rt.handle(), &Element::tag("span"), &props);
        assert_ne!(div, span);
    }

    #[test]
    fn static_mode_produces_no_signature() {
        let rt = Runtime::new(RenderMode::Static);
        let sig = prop_signature(&rt.handle(), &Element::tag("div"), &PropMap::new());
        assert!(sig.is_none());
    }

    #[test]
    fn children_and_ref_are_excluded() {
        let rt = interactive();
        let element = Element::tag("div");
        let mut with_ref = prop_map([("color", "red")]);
        with_ref.insert(Rc::from("ref"), PropValue::from("anything"));
        let a = prop_signature(&rt.handle(), &element, &prop_map([("color", "red")]));
        let b = prop_signature(&rt.handle(), &element, &with_ref);
        assert_eq!(a, b);
    }

    #[test]
    fn mixed_lists_fingerprint_by_length_only() {
        let rt = interactive();
        let element = Element::tag("div");
        let nested = PropValue::list(vec![PropValue::map(PropMap::new()), PropValue::Num(1.0)]);
        let nested_other =
            PropValue::list(vec![PropValue::map(PropMap::new()), PropValue::Num(2.0)]);
        let a = prop_signature(&rt.handle(), &element, &prop_map([("items", nested)]));
        let b = prop_signature(&rt.handle(), &element, &prop_map([("items", nested_other)]));
        assert_eq!(a, b, "non-primitive lists hash structure, not values");
    }

    #[test]
    fn function_props_hash_stably_per_identity() {
        let rt = interactive();
        let element = Element::tag("div");
        let f = PropValue::Func(crate::value::PropFunc::new(|_| PropValue::Null));
        let a = prop_signature(&rt.handle(), &element, &prop_map([("on", f.clone())]));
        let b = prop_signature(&rt.handle(), &element, &prop_map([("on", f)]));
        assert_eq!(a, b);
    }

    #[test]
    fn combined_hash_differs_from_parts() {
        let a = hash_text("color=red");
        let b = hash_text("color=blue");
        assert_ne!(a, b);
        assert!(a.len() >= 2);
    }
}
