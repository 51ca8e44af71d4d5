//! Theme-variable resolution.
//!
//! Style values may embed `theme.path.to.value` tokens that resolve against a
//! read-only theme object. Resolution is a raw substitution pass: no unit
//! coercion happens here, that belongs to the style-application collaborator.
//!
//! The walk performs a "smart merge": a container is shallow-copied only when
//! at least one direct member actually changed, so untouched branches keep
//! their original allocation and downstream reference-equality fast paths
//! keep working.

use std::rc::Rc;

use crate::value::{format_num, PropMap, PropValue};

/// Read-only theme consumed by the resolver: a mode name plus a nested tree
/// of token values under `system`.
#[derive(Clone, Debug)]
pub struct Theme {
    pub mode: Rc<str>,
    pub system: PropValue,
}

impl Theme {
    pub fn new(mode: impl Into<Rc<str>>, system: PropValue) -> Self {
        Self {
            mode: mode.into(),
            system,
        }
    }

    /// Walk a dotted path rooted at the theme object. `mode` resolves to the
    /// mode string; everything else walks under `system`.
    pub fn lookup(&self, path: &str) -> Option<PropValue> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = match first {
            "mode" => {
                if segments.next().is_some() {
                    return None;
                }
                return Some(PropValue::Str(self.mode.clone()));
            }
            "system" => self.system.clone(),
            _ => return None,
        };
        for segment in segments {
            match current {
                PropValue::Map(map) => {
                    current = map.get(segment)?.clone();
                }
                _ => return None,
            }
        }
        // An object carrying a `default` sub-entry resolves to that entry.
        if let PropValue::Map(map) = &current {
            if let Some(default) = map.get("default") {
                return Some(default.clone());
            }
        }
        Some(current)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ResolveOptions {
    /// When set, function-valued entries are invoked with the theme and their
    /// result recursively resolved. Otherwise functions pass through.
    pub resolve_functions: bool,
}

const TOKEN_PREFIX: &str = "theme.";

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// Substitute every `theme.*` token in `input`. A string that is exactly one
/// token adopts the resolved value's type; embedded tokens stringify
/// primitives in place. Failed lookups leave the token untouched.
fn resolve_str(input: &str, theme: &Theme) -> Option<PropValue> {
    if !input.contains(TOKEN_PREFIX) {
        return None;
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut changed = false;
    let mut sole_value: Option<PropValue> = None;
    while let Some(start) = rest.find(TOKEN_PREFIX) {
        out.push_str(&rest[..start]);
        let token_area = &rest[start..];
        let body = &token_area[TOKEN_PREFIX.len()..];
        let end = body.find(|c| !is_path_char(c)).unwrap_or(body.len());
        let path = body[..end].trim_end_matches('.');
        let token_len = TOKEN_PREFIX.len() + path.len();
        let token = &token_area[..token_len];
        match theme.lookup(path) {
            Some(value) if value.is_primitive() && !value.is_null() => {
                if token_len == input.len() {
                    sole_value = Some(value.clone());
                }
                match value {
                    PropValue::Str(s) => out.push_str(&s),
                    PropValue::Num(n) => out.push_str(&format_num(n)),
                    PropValue::Bool(b) => out.push_str(if b { "true" } else { "false" }),
                    _ => out.push_str(token),
                }
                changed = true;
            }
            // Unresolvable or non-primitive: leave the literal token.
            _ => out.push_str(token),
        }
        rest = &token_area[token_len..];
    }
    out.push_str(rest);
    if !changed {
        return None;
    }
    if let Some(value) = sole_value {
        return Some(value);
    }
    Some(PropValue::Str(Rc::from(out.as_str())))
}

fn container_addr(value: &PropValue) -> Option<usize> {
    match value {
        PropValue::Map(map) => Some(Rc::as_ptr(map) as *const () as usize),
        PropValue::List(list) => Some(Rc::as_ptr(list) as *const () as usize),
        _ => None,
    }
}

fn resolve_inner(
    value: &PropValue,
    theme: &Theme,
    opts: ResolveOptions,
    visited: &mut Vec<usize>,
) -> PropValue {
    match value {
        PropValue::Str(s) => resolve_str(s, theme).unwrap_or_else(|| value.clone()),
        PropValue::Map(map) => {
            let addr = container_addr(value).expect("map has an address");
            if visited.contains(&addr) {
                // Cyclic reference: return as-is, no further processing.
                return value.clone();
            }
            visited.push(addr);
            let mut changed = false;
            let mut next = PropMap::with_capacity(map.len());
            for (key, entry) in map.iter() {
                let resolved = resolve_inner(entry, theme, opts, visited);
                if !crate::value::same_identity(entry, &resolved) {
                    changed = true;
                }
                next.insert(key.clone(), resolved);
            }
            visited.pop();
            if changed {
                PropValue::Map(Rc::new(next))
            } else {
                value.clone()
            }
        }
        PropValue::List(list) => {
            let addr = container_addr(value).expect("list has an address");
            if visited.contains(&addr) {
                return value.clone();
            }
            visited.push(addr);
            let mut changed = false;
            let mut next = Vec::with_capacity(list.len());
            for entry in list.iter() {
                let resolved = resolve_inner(entry, theme, opts, visited);
                if !crate::value::same_identity(entry, &resolved) {
                    changed = true;
                }
                next.push(resolved);
            }
            visited.pop();
            if changed {
                PropValue::List(Rc::new(next))
            } else {
                value.clone()
            }
        }
        PropValue::Func(f) => {
            if opts.resolve_functions {
                let produced = f.call(theme);
                resolve_inner(&produced, theme, opts, visited)
            } else {
                value.clone()
            }
        }
        // Nodes and remaining primitives are opaque to theme resolution.
        _ => value.clone(),
    }
}

/// Resolve one value against the theme.
pub fn resolve_value(value: &PropValue, theme: &Theme, opts: ResolveOptions) -> PropValue {
    let mut visited = Vec::new();
    resolve_inner(value, theme, opts, &mut visited)
}

/// Resolve every entry of a map, preserving the input reference when nothing
/// changed.
pub fn resolve_map(map: &Rc<PropMap>, theme: &Theme, opts: ResolveOptions) -> Rc<PropMap> {
    match resolve_value(&PropValue::Map(map.clone()), theme, opts) {
        PropValue::Map(resolved) => resolved,
        _ => map.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::prop_map;

    fn theme() -> Theme {
        let colors = prop_map([
            ("primary", "#08c"),
            ("danger", "#c00"),
        ]);
        let mut spacing = prop_map([("small", PropValue::Num(4.0))]);
        spacing.insert(
            Rc::from("gutter"),
            PropValue::map(prop_map([("default", "16px"), ("wide", "24px")])),
        );
        let system = prop_map([
            ("colors", PropValue::map(colors)),
            ("spacing", PropValue::map(spacing)),
        ]);
        Theme::new("light", PropValue::map(system))
    }

    #[test]
    fn whole_token_adopts_value_type() {
        let resolved = resolve_value(
            &PropValue::from("theme.system.spacing.small"),
            &theme(),
            ResolveOptions::default(),
        );
        assert!(matches!(resolved, PropValue::Num(n) if n == 4.0));
    }

    #[test]
    fn embedded_tokens_substitute_into_strings() {
        let resolved = resolve_value(
            &PropValue::from("1px solid theme.system.colors.primary"),
            &theme(),
            ResolveOptions::default(),
        );
        assert_eq!(resolved.as_str(), Some("1px solid #08c"));
    }

    #[test]
    fn default_sub_key_is_preferred() {
        let resolved = resolve_value(
            &PropValue::from("theme.system.spacing.gutter"),
            &theme(),
            ResolveOptions::default(),
        );
        assert_eq!(resolved.as_str(), Some("16px"));
    }

    #[test]
    fn failed_lookup_leaves_token_unchanged() {
        let original = PropValue::from("theme.system.colors.missing");
        let resolved = resolve_value(&original, &theme(), ResolveOptions::default());
        assert_eq!(resolved.as_str(), Some("theme.system.colors.missing"));
    }

    #[test]
    fn mode_resolves_from_theme_root() {
        let resolved = resolve_value(
            &PropValue::from("theme.mode"),
            &theme(),
            ResolveOptions::default(),
        );
        assert_eq!(resolved.as_str(), Some("light"));
    }

    #[test]
    fn unchanged_branches_keep_reference_identity() {
        let untouched = Rc::new(prop_map([("width", "100%")]));
        let mut outer = prop_map([("color", "theme.system.colors.primary")]);
        outer.insert(Rc::from("inner"), PropValue::Map(untouched.clone()));
        let outer = Rc::new(outer);

        let resolved = resolve_map(&outer, &theme(), ResolveOptions::default());
        assert!(!Rc::ptr_eq(&resolved, &outer), "outer changed");
        match resolved.get("inner") {
            Some(PropValue::Map(inner)) => {
                assert!(Rc::ptr_eq(inner, &untouched), "inner branch must be reused")
            }
            other => panic!("unexpected inner: {other:?}"),
        }
    }

    #[test]
    fn resolution_is_idempotent_and_identity_preserving() {
        let map = Rc::new(prop_map([("color", "theme.system.colors.danger")]));
        let once = resolve_map(&map, &theme(), ResolveOptions::default());
        let twice = resolve_map(&once, &theme(), ResolveOptions::default());
        assert!(Rc::ptr_eq(&once, &twice), "already-resolved map is returned as-is");
    }

    #[test]
    fn functions_skipped_unless_enabled() {
        let f = PropValue::Func(crate::value::PropFunc::new(|theme| {
            theme.lookup("system.colors.primary").unwrap_or(PropValue::Null)
        }));
        let skipped = resolve_value(&f, &theme(), ResolveOptions::default());
        assert!(matches!(skipped, PropValue::Func(_)));

        let invoked = resolve_value(
            &f,
            &theme(),
            ResolveOptions {
                resolve_functions: true,
            },
        );
        assert_eq!(invoked.as_str(), Some("#08c"));
    }

    #[test]
    fn non_plain_values_pass_through() {
        let f = PropValue::Func(crate::value::PropFunc::new(|_| PropValue::Null));
        let resolved = resolve_value(&f, &theme(), ResolveOptions::default());
        assert!(crate::value::same_identity(&f, &resolved));
    }
}
