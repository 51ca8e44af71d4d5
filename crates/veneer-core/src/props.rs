//! Prop normalization.
//!
//! Raw props are split into style-like props, native attributes, ref, key,
//! children, the explicit `css` descriptor, a `nativeProps` override bag, and
//! the `disableEmotion` flag. Style-like values run through the theme
//! resolver; primitive-valued ("cacheable") style combinations are memoized
//! in the runtime's style cache keyed by their own signature, since their
//! identity is trustworthy. Object/function-valued style props are recomputed
//! every call.

use std::collections::HashSet;
use std::rc::Rc;

use once_cell::sync::Lazy;

use crate::children::{normalize_children, Child};
use crate::element::Element;
use crate::runtime::RuntimeHandle;
use crate::signature::hash_text;
use crate::theme::{resolve_value, ResolveOptions, Theme};
use crate::value::{PropMap, PropValue};

/// Normalized output of the prop processor. Computed at most once per node.
#[derive(Clone, Debug, Default)]
pub struct FinalProps {
    /// Resolved style declarations, explicit `css` entries last.
    pub styles: PropMap,
    /// Native/DOM attributes, `nativeProps` overrides applied.
    pub native: PropMap,
    /// Canonical children.
    pub children: Vec<Child>,
    /// Pass-through ref value, never inspected by the core.
    pub ref_prop: Option<PropValue>,
    /// Externally supplied list key.
    pub key: Option<Rc<str>>,
    /// Suppress the style-application collaborator for this node and, by
    /// propagation, its descendants.
    pub disable_styles: bool,
}

const RESERVED_KEYS: [&str; 6] = ["children", "ref", "key", "css", "nativeProps", "disableEmotion"];

/// Split, resolve, and reassemble raw props.
pub fn process_props(
    handle: &RuntimeHandle,
    _element: &Element,
    raw: &PropMap,
    raw_children: &[Child],
    theme: &Theme,
    inherited_disable: bool,
) -> FinalProps {
    let ref_prop = raw.get("ref").cloned();
    let key = raw.get("key").and_then(|v| match v {
        PropValue::Str(s) => Some(s.clone()),
        PropValue::Num(n) => Some(Rc::from(crate::value::format_num(*n).as_str())),
        _ => None,
    });
    let css = raw.get("css").and_then(PropValue::as_map).cloned();
    let native_overrides = raw.get("nativeProps").and_then(PropValue::as_map).cloned();
    let disable_styles = inherited_disable
        || raw
            .get("disableEmotion")
            .map(PropValue::truthy)
            .unwrap_or(false);

    let remainder: Vec<(&Rc<str>, &PropValue)> = raw
        .iter()
        .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_ref()))
        .collect();

    let children = normalize_children(handle, raw_children, disable_styles);

    // Fast path: nothing beyond children to process and no css descriptor.
    if remainder.is_empty() && css.is_none() {
        let mut native = PropMap::new();
        if let Some(overrides) = &native_overrides {
            merge_stripping_null(&mut native, overrides);
        }
        return FinalProps {
            styles: PropMap::new(),
            native,
            children,
            ref_prop,
            key,
            disable_styles,
        };
    }

    let mut cacheable_styles = PropMap::new();
    let mut volatile_styles = PropMap::new();
    let mut native = PropMap::new();
    for (k, v) in remainder {
        if v.is_null() {
            continue;
        }
        if is_css_property(k) {
            if v.is_primitive() {
                cacheable_styles.insert(k.clone(), v.clone());
            } else {
                volatile_styles.insert(k.clone(), v.clone());
            }
        } else {
            native.insert(k.clone(), v.clone());
        }
    }

    let mut styles = PropMap::new();
    if !cacheable_styles.is_empty() {
        let resolved = resolve_cacheable_styles(handle, &cacheable_styles, theme);
        for (k, v) in resolved.iter() {
            styles.insert(k.clone(), v.clone());
        }
    }
    // Identity of object/function values cannot be trusted as a cache key;
    // recompute them on every call.
    let volatile_opts = ResolveOptions {
        resolve_functions: true,
    };
    for (k, v) in volatile_styles.iter() {
        let resolved = resolve_value(v, theme, volatile_opts);
        if !resolved.is_null() {
            styles.insert(k.clone(), resolved);
        }
    }
    if let Some(css) = css {
        for (k, v) in css.iter() {
            let resolved = resolve_value(v, theme, volatile_opts);
            if !resolved.is_null() {
                // Explicit css declarations win over computed style props.
                styles.insert(k.clone(), resolved);
            }
        }
    }

    if let Some(overrides) = &native_overrides {
        merge_stripping_null(&mut native, overrides);
    }

    FinalProps {
        styles,
        native,
        children,
        ref_prop,
        key,
        disable_styles,
    }
}

fn merge_stripping_null(target: &mut PropMap, source: &PropMap) {
    for (k, v) in source.iter() {
        if v.is_null() {
            target.shift_remove(k.as_ref());
        } else {
            target.insert(k.clone(), v.clone());
        }
    }
}

/// Resolve a primitive-valued style subset through the runtime style cache.
/// The cache key folds in the theme mode: the same literal props resolve
/// differently under a different theme.
fn resolve_cacheable_styles(
    handle: &RuntimeHandle,
    styles: &PropMap,
    theme: &Theme,
) -> Rc<PropMap> {
    let mut keys: Vec<&Rc<str>> = styles.keys().collect();
    keys.sort_unstable();
    let mut text = format!("m:{}", theme.mode);
    for key in keys {
        text.push('|');
        text.push_str(key);
        text.push('=');
        text.push_str(&styles[key.as_ref()].literal().unwrap_or_default());
    }
    let sig: Rc<str> = Rc::from(hash_text(&text).as_str());

    if let Some(cached) = handle.style_cache_get(&sig) {
        return cached;
    }
    let mut resolved = PropMap::with_capacity(styles.len());
    for (k, v) in styles.iter() {
        let value = resolve_value(v, theme, ResolveOptions::default());
        if !value.is_null() {
            resolved.insert(k.clone(), value);
        }
    }
    let resolved = Rc::new(resolved);
    handle.style_cache_insert(sig, resolved.clone());
    resolved
}

/// Known CSS property names (camelCase, the shape callers supply them in).
/// Prop keys in this set are treated as style declarations; everything else
/// is a native attribute.
pub fn is_css_property(name: &str) -> bool {
    CSS_PROPERTIES.contains(name)
}

static CSS_PROPERTIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "alignContent", "alignItems", "alignSelf", "animation", "appearance", "aspectRatio",
        "backdropFilter", "background", "backgroundColor", "backgroundImage",
        "backgroundPosition", "backgroundRepeat", "backgroundSize", "border", "borderBottom",
        "borderBottomColor", "borderBottomLeftRadius", "borderBottomRightRadius",
        "borderBottomStyle", "borderBottomWidth", "borderCollapse", "borderColor", "borderLeft",
        "borderLeftColor", "borderLeftStyle", "borderLeftWidth", "borderRadius", "borderRight",
        "borderRightColor", "borderRightStyle", "borderRightWidth", "borderSpacing",
        "borderStyle", "borderTop", "borderTopColor", "borderTopLeftRadius",
        "borderTopRightRadius", "borderTopStyle", "borderTopWidth", "borderWidth", "bottom",
        "boxShadow", "boxSizing", "clear", "clip", "clipPath", "color", "columnGap", "content",
        "cursor", "direction", "display", "fill", "filter", "flex", "flexBasis",
        "flexDirection", "flexFlow", "flexGrow", "flexShrink", "flexWrap", "float", "font",
        "fontFamily", "fontSize", "fontStyle", "fontVariant", "fontWeight", "gap", "grid",
        "gridArea", "gridAutoColumns", "gridAutoFlow", "gridAutoRows", "gridColumn",
        "gridColumnEnd", "gridColumnGap", "gridColumnStart", "gridGap", "gridRow", "gridRowEnd",
        "gridRowGap", "gridRowStart", "gridTemplate", "gridTemplateAreas",
        "gridTemplateColumns", "gridTemplateRows", "height", "inset", "justifyContent",
        "justifyItems", "justifySelf", "left", "letterSpacing", "lineHeight", "listStyle",
        "listStyleType", "margin", "marginBottom", "marginLeft", "marginRight", "marginTop",
        "maxHeight", "maxWidth", "minHeight", "minWidth", "objectFit", "objectPosition",
        "opacity", "order", "outline", "outlineColor", "outlineOffset", "outlineStyle",
        "outlineWidth", "overflow", "overflowX", "overflowY", "padding", "paddingBottom",
        "paddingLeft", "paddingRight", "paddingTop", "perspective", "placeContent",
        "placeItems", "placeSelf", "pointerEvents", "position", "resize", "right", "rowGap",
        "scrollBehavior", "stroke", "strokeWidth", "tabSize", "tableLayout", "textAlign",
        "textDecoration", "textIndent", "textOverflow", "textShadow", "textTransform", "top",
        "touchAction", "transform", "transformOrigin", "transition", "transitionDelay",
        "transitionDuration", "transitionProperty", "transitionTimingFunction",
        "userSelect", "verticalAlign", "visibility", "whiteSpace", "width", "willChange",
        "wordBreak", "wordSpacing", "wordWrap", "zIndex", "zoom",
    ]
    .into_iter()
    .collect()
});
