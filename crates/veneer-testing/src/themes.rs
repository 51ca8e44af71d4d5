use veneer_core::{prop_map, PropMap, PropValue, Theme};

/// A small theme with the token shapes renders typically touch: nested
/// colors with a `default` sub-key, numeric spacing, and a mode string.
pub fn sample_theme() -> Theme {
    let text = prop_map([("default", "#222"), ("muted", "#777")]);
    let mut colors = prop_map([("primary", "#0b6"), ("danger", "#c22")]);
    colors.insert("text".into(), PropValue::map(text));
    let spacing = prop_map([("sm", 4.0), ("md", 8.0), ("lg", 16.0)]);
    let mut system = PropMap::new();
    system.insert("colors".into(), PropValue::map(colors));
    system.insert("spacing".into(), PropValue::map(spacing));
    Theme::new("light", PropValue::map(system))
}
