use veneer_core::{
    prop_map, render_tree, tags, Child, PropValue, RenderMode, Runtime,
};
use veneer_testing::prelude::*;

#[test]
fn builder_tree_renders_with_theme_tokens() {
    let rt = Runtime::new(RenderMode::Interactive);
    let h = rt.handle();
    let root = tags::div(&h)
        .css(prop_map([
            ("color", "theme.system.colors.primary"),
            ("padding", "theme.system.spacing.md"),
        ]))
        .prop("title", "greeting")
        .child(
            tags::span(&h)
                .child(tags::text("hello"))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let mut host = RecordingHost::new();
    let mut styler = RecordingStyler::new();
    let out = render_tree(&rt, &root, &mut host, &mut styler, &sample_theme()).unwrap();
    let tree = RecordingHost::tree(&out.output);
    assert_eq!(tree.style("color"), Some("#0b6"));
    assert_eq!(tree.style("padding"), Some("8"));
    assert_eq!(tree.attr("title"), Some("greeting"));
    assert!(tree.was_styled());
    assert_eq!(tree.find("span").unwrap().text_content(), "hello");
}

#[test]
fn nested_color_tokens_resolve_through_default() {
    let rt = Runtime::new(RenderMode::Interactive);
    let h = rt.handle();
    let root = tags::p(&h)
        .prop("color", "theme.system.colors.text")
        .build()
        .unwrap();
    let mut host = RecordingHost::new();
    let mut styler = RecordingStyler::new();
    let out = render_tree(&rt, &root, &mut host, &mut styler, &sample_theme()).unwrap();
    let tree = RecordingHost::tree(&out.output);
    assert_eq!(tree.style("color"), Some("#222"));
}

#[test]
fn memoized_subtree_is_adopted_across_renders() {
    let rt = Runtime::new(RenderMode::Interactive);
    let h = rt.handle();
    let mut host = RecordingHost::new();
    let mut styler = RecordingStyler::new();
    let theme = sample_theme();
    for _ in 0..2 {
        let card = tags::span(&h)
            .key("card")
            .deps([PropValue::Num(7.0)])
            .child(tags::text("cached"))
            .build()
            .unwrap();
        let root = tags::div(&h).child(card).build().unwrap();
        let out = render_tree(&rt, &root, &mut host, &mut styler, &theme).unwrap();
        let tree = RecordingHost::tree(&out.output);
        assert_eq!(tree.find("span").unwrap().text_content(), "cached");
    }
    assert_eq!(host.count("div"), 2, "the root always recomputes");
    assert_eq!(host.count("span"), 1, "the keyed subtree is adopted");
}

#[test]
fn sibling_toggle_does_not_recompute_memoized_subtree() {
    let rt = Runtime::new(RenderMode::Interactive);
    let h = rt.handle();
    let mut host = RecordingHost::new();
    let mut styler = RecordingStyler::new();
    let theme = sample_theme();
    let user_id = 42.0;
    for toggle in ["off", "on"] {
        let profile = tags::span(&h)
            .key("profile")
            .deps([PropValue::Num(user_id)])
            .child(tags::text("user-42"))
            .build()
            .unwrap();
        let sibling = tags::p(&h).child(tags::text(toggle)).build().unwrap();
        let root = tags::div(&h).child(profile).child(sibling).build().unwrap();
        let out = render_tree(&rt, &root, &mut host, &mut styler, &theme).unwrap();
        let tree = RecordingHost::tree(&out.output);
        assert_eq!(tree.find("p").unwrap().text_content(), toggle);
        assert_eq!(tree.find("span").unwrap().text_content(), "user-42");
    }
    assert_eq!(host.count("span"), 1, "the memoized subtree never recomputes");
    assert_eq!(host.count("p"), 2, "the sibling reflects its toggle each pass");
}

#[test]
fn changed_dependency_invalidates_the_subtree() {
    let rt = Runtime::new(RenderMode::Interactive);
    let h = rt.handle();
    let mut host = RecordingHost::new();
    let mut styler = RecordingStyler::new();
    let theme = sample_theme();
    for label in ["first", "second"] {
        let card = tags::span(&h)
            .key("card")
            .deps([PropValue::from(label)])
            .child(tags::text(label))
            .build()
            .unwrap();
        let root = tags::div(&h).child(card).build().unwrap();
        let out = render_tree(&rt, &root, &mut host, &mut styler, &theme).unwrap();
        let tree = RecordingHost::tree(&out.output);
        assert_eq!(tree.find("span").unwrap().text_content(), label);
    }
    assert_eq!(host.count("span"), 2);
}

#[test]
fn shared_list_key_across_elements_does_not_collide() {
    let rt = Runtime::new(RenderMode::Interactive);
    let h = rt.handle();
    let mut host = RecordingHost::new();
    let mut styler = RecordingStyler::new();
    let theme = sample_theme();
    for _ in 0..2 {
        let a = tags::div(&h)
            .key("shared")
            .deps([PropValue::Num(1.0)])
            .build()
            .unwrap();
        let b = tags::span(&h)
            .key("shared")
            .deps([PropValue::Num(1.0)])
            .build()
            .unwrap();
        let root = tags::section(&h).child(a).child(b).build().unwrap();
        render_tree(&rt, &root, &mut host, &mut styler, &theme).unwrap();
    }
    assert_eq!(rt.cache_len(), 2, "element identity keeps the keys apart");
    assert_eq!(host.count("div"), 1);
    assert_eq!(host.count("span"), 1);
}

#[test]
fn unkeyed_list_members_keep_identity_by_position() {
    let rt = Runtime::new(RenderMode::Interactive);
    let h = rt.handle();
    let mut host = RecordingHost::new();
    let mut styler = RecordingStyler::new();
    let theme = sample_theme();
    let labels = ["a", "b", "c"];
    for _ in 0..2 {
        let items: Vec<Child> = labels
            .iter()
            .map(|label| {
                Child::Node(
                    tags::li(&h)
                        .deps([PropValue::from(*label)])
                        .child(tags::text(*label))
                        .build()
                        .unwrap(),
                )
            })
            .collect();
        let root = tags::ul(&h).children(items).build().unwrap();
        let out = render_tree(&rt, &root, &mut host, &mut styler, &theme).unwrap();
        let tree = RecordingHost::tree(&out.output);
        assert_eq!(tree.text_content(), "abc");
    }
    assert_eq!(host.count("li"), 3, "every slot is adopted on the second pass");
    assert_eq!(host.count("ul"), 2);
}

#[test]
fn native_props_override_computed_attributes() {
    let rt = Runtime::new(RenderMode::Interactive);
    let h = rt.handle();
    let root = tags::input(&h)
        .prop("placeholder", "from-prop")
        .native(prop_map([("placeholder", "from-native")]))
        .build()
        .unwrap();
    let mut host = RecordingHost::new();
    let mut styler = RecordingStyler::new();
    let out = render_tree(&rt, &root, &mut host, &mut styler, &sample_theme()).unwrap();
    let tree = RecordingHost::tree(&out.output);
    assert_eq!(tree.attr("placeholder"), Some("from-native"));
}

#[test]
fn no_styles_subtree_skips_the_styler() {
    let rt = Runtime::new(RenderMode::Interactive);
    let h = rt.handle();
    let root = tags::div(&h)
        .no_styles()
        .prop("color", "red")
        .child(tags::span(&h).build().unwrap())
        .build()
        .unwrap();
    let mut host = RecordingHost::new();
    let mut styler = RecordingStyler::new();
    let out = render_tree(&rt, &root, &mut host, &mut styler, &sample_theme()).unwrap();
    assert_eq!(styler.applications(), 0);
    let tree = RecordingHost::tree(&out.output);
    assert!(!tree.was_styled());
    assert!(!tree.find("span").unwrap().was_styled(), "the flag propagates");
}
