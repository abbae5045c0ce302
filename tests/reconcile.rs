//! Scenario tests: mount, flush, rows, routes, hydration and lifecycle
//! against the in-memory host.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use forest_reconcile::{
    BlockKind, BlockKindTag, Cleanup, Diagnostic, Draft, ElementDraft, Env, ForestError, HostMutation,
    HostSurface, LeafId, MemoryHost, MountEvent, Namespace, NodeId, OpKey, Root, RootConfig, TemplateId,
    TemplateSet, Values,
};
use pretty_assertions::assert_eq;
use spark_signals::signal;

// =============================================================================
// HELPERS
// =============================================================================

fn setup(templates: TemplateSet) -> (Root<MemoryHost>, NodeId) {
    setup_with(templates, RootConfig::default())
}

fn setup_with(templates: TemplateSet, config: RootConfig) -> (Root<MemoryHost>, NodeId) {
    let mut host = MemoryHost::new();
    let container = host.create_container();
    (Root::with_config(host, Rc::new(templates), config), container)
}

fn child(root: &Root<MemoryHost>, leaf: LeafId, index: usize) -> LeafId {
    root.leaf(leaf).unwrap().children[index]
}

fn row(name: &str) -> Values {
    Values::from([("name".to_string(), name.to_string())])
}

fn last_child(root: &Root<MemoryHost>, list: LeafId) -> Option<forest_reconcile::BlockId> {
    let block = root.leaf_block(list).unwrap();
    match &root.block(block).unwrap().kind {
        BlockKind::List { last_child, .. } => *last_child,
        other => panic!("not a list block: {other:?}"),
    }
}

/// `<ul>` holding a list whose row body is `<li>{name}</li>`.
fn list_templates() -> (TemplateSet, TemplateId) {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    let ul = set.add(Some(app), ElementDraft::new("ul").into());
    let list = set.add(Some(ul), Draft::List);
    let li = set.add(Some(list), ElementDraft::new("li").into());
    set.add(Some(li), Draft::text_field("name"));
    (set, app)
}

// =============================================================================
// MOUNT ORDER
// =============================================================================

#[test]
fn test_siblings_attach_in_registration_order() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    let children: Vec<_> = ["one", "two", "three"]
        .into_iter()
        .map(|text| set.add(Some(app), ElementDraft::new("p").text(text).into()))
        .collect();
    let indices: Vec<_> = children.iter().map(|&id| set[id].in_parent_index()).collect();
    assert_eq!(indices, vec![Some(0), Some(1), Some(2)]);

    let (mut root, container) = setup(set);
    root.mount(app, container).unwrap();
    assert_eq!(root.host().inner_markup(container), "");

    assert_eq!(root.flush(), 3);
    assert_eq!(root.host().inner_markup(container), "<p>one</p><p>two</p><p>three</p>");
}

#[test]
fn test_single_element_template_mounts_into_slot_zero() {
    let mut set = TemplateSet::new();
    let card = set.add(None, ElementDraft::new("section").attr("class", "card").into());
    set.add(Some(card), Draft::text("body"));

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(card, container).unwrap();
    root.flush();

    assert_eq!(root.host().inner_markup(container), "<section class=\"card\">body</section>");
    let section = child(&root, root_leaf, 0);
    assert_eq!(root.block(root.leaf_block(section).unwrap()).unwrap().index, Some(0));
}

#[test]
fn test_unknown_draft_is_skipped_with_one_warning() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    set.add(Some(app), ElementDraft::new("header").into());
    set.add(Some(app), Draft::Unknown("widget".into()));
    set.add(Some(app), ElementDraft::new("footer").into());

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    root.flush();

    assert_eq!(root.host().inner_markup(container), "<header></header><footer></footer>");
    assert_eq!(root.diagnostics(), &[Diagnostic::UnknownDraft { name: "widget".into() }]);
    assert_eq!(root.leaf(root_leaf).unwrap().children.len(), 2);
}

#[test]
fn test_nested_using_keeps_registration_order() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    let div = set.add(Some(app), ElementDraft::new("div").into());
    set.add(Some(div), ElementDraft::new("span").into());
    let using = set.add(Some(div), Draft::Using);
    set.add(Some(using), ElementDraft::new("b").into());
    set.add(Some(div), ElementDraft::new("i").into());

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<div><span></span><b></b><i></i></div>");

    let div_leaf = child(&root, root_leaf, 0);
    let using_leaf = child(&root, div_leaf, 1);
    let using_block = root.leaf_block(using_leaf).unwrap();
    assert_eq!(root.block(using_block).unwrap().kind, BlockKind::Fragment);
    assert_eq!(root.block(using_block).unwrap().index, Some(1));

    // Re-attaching either side still anchors across the passthrough
    let (b, i) = (child(&root, using_leaf, 0), child(&root, div_leaf, 2));
    root.set_visible(b, false).unwrap();
    root.set_visible(i, false).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<div><span></span></div>");

    root.set_visible(i, true).unwrap();
    root.flush();
    root.set_visible(b, true).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<div><span></span><b></b><i></i></div>");
}

#[test]
fn test_list_block_is_not_a_fragment_parent() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    let list = set.add(Some(app), Draft::List);
    let li = set.add(Some(list), ElementDraft::new("li").into());

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    let list_leaf = child(&root, root_leaf, 0);
    let list_block = root.leaf_block(list_leaf).unwrap();

    let err = root.mount_child(list_block, list_leaf, container, li).unwrap_err();
    assert!(matches!(err, ForestError::Structure(BlockKindTag::List)));
}

// =============================================================================
// OP ORDERING AND IDEMPOTENCE
// =============================================================================

#[test]
fn test_structural_ops_commit_before_value_ops() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    let p = set.add(Some(app), ElementDraft::new("p").into());
    set.add(Some(p), Draft::text("hello"));

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    root.flush();
    let p_leaf = child(&root, root_leaf, 0);
    let text_leaf = child(&root, p_leaf, 0);
    let (p_node, text_node) = (root.leaf_node(p_leaf).unwrap(), root.leaf_node(text_leaf).unwrap());
    root.host_mut().take_mutations();

    // Value op staged first
    root.set_text(text_leaf, "bye").unwrap();
    root.set_visible(p_leaf, false).unwrap();
    root.flush();

    assert_eq!(
        root.host_mut().take_mutations(),
        vec![
            HostMutation::Remove { node: p_node },
            HostMutation::SetText { node: text_node, text: "bye".into() },
        ]
    );
}

#[test]
fn test_unchanged_value_applies_once() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    let p = set.add(Some(app), ElementDraft::new("p").into());
    set.add(Some(p), Draft::text("a"));

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    root.flush();
    let text_leaf = child(&root, child(&root, root_leaf, 0), 0);
    root.host_mut().take_mutations();

    root.set_text(text_leaf, "b").unwrap();
    root.set_text(text_leaf, "b").unwrap();
    assert_eq!(root.flush(), 1);
    root.set_text(text_leaf, "b").unwrap();
    assert_eq!(root.flush(), 0);
    root.set_text(text_leaf, "b").unwrap();
    root.set_visible(child(&root, root_leaf, 0), true).unwrap();
    assert_eq!(root.flush(), 0);

    let writes = root.host_mut().take_mutations();
    assert_eq!(writes.len(), 1);
    assert_eq!(root.host().inner_markup(container), "<p>b</p>");
}

// =============================================================================
// ROUTES
// =============================================================================

#[test]
fn test_route_toggle() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    set.add(Some(app), ElementDraft::new("h1").text("title").into());
    let route = set.add(Some(app), Draft::Route);
    set.add(Some(route), ElementDraft::new("p").text("inside").into());
    set.add(Some(app), ElementDraft::new("footer").into());

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    root.flush();
    let route_leaf = child(&root, root_leaf, 1);
    let route_block = root.leaf_block(route_leaf).unwrap();
    assert_eq!(root.host().inner_markup(container), "<h1>title</h1><footer></footer>");
    assert!(!root.block(route_block).unwrap().visible);

    root.show_route(route_leaf).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<h1>title</h1><p>inside</p><footer></footer>");
    assert_eq!(
        root.block(route_block).unwrap().kind,
        BlockKind::Route { initialized: true, pending_init: false }
    );
    let leaves_after_init = root.leaf_count();

    root.hide_route(route_leaf).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<h1>title</h1><footer></footer>");
    assert!(!root.block(route_block).unwrap().visible);

    root.show_route(route_leaf).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<h1>title</h1><p>inside</p><footer></footer>");
    assert_eq!(root.leaf_count(), leaves_after_init);
}

#[test]
fn test_hidden_element_stays_hidden_when_route_shows_again() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    let route = set.add(Some(app), Draft::Route);
    set.add(Some(route), ElementDraft::new("a").into());
    set.add(Some(route), ElementDraft::new("b").into());

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    let route_leaf = child(&root, root_leaf, 0);
    root.show_route(route_leaf).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<a></a><b></b>");

    root.hide_route(route_leaf).unwrap();
    root.flush();
    let a = child(&root, route_leaf, 0);
    root.set_visible(a, false).unwrap();
    root.flush();

    root.show_route(route_leaf).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<b></b>");

    root.set_visible(a, true).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<a></a><b></b>");
}

#[test]
fn test_route_ops_reject_other_leaves() {
    let (set, app) = list_templates();
    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    let ul = child(&root, root_leaf, 0);

    assert!(matches!(root.show_route(ul), Err(ForestError::NotARoute(_))));
    assert!(matches!(root.push_row(ul, row("x")), Err(ForestError::NotAList(_))));
    assert!(matches!(root.remove_row(ul), Err(ForestError::NotARow(_))));
}

// =============================================================================
// LISTS
// =============================================================================

#[test]
fn test_rows_render_in_record_order() {
    let (set, app) = list_templates();
    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    let list = child(&root, child(&root, root_leaf, 0), 0);

    root.push_row(list, row("a")).unwrap();
    root.push_row(list, row("c")).unwrap();
    root.insert_row(list, 1, row("b")).unwrap();
    root.flush();

    assert_eq!(
        root.host().inner_markup(container),
        "<ul><li>a</li><li>b</li><li>c</li></ul>"
    );
}

#[test]
fn test_last_child_follows_visible_rows() {
    let (set, app) = list_templates();
    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    let list = child(&root, child(&root, root_leaf, 0), 0);
    assert_eq!(last_child(&root, list), None);

    let a = root.push_row(list, row("a")).unwrap();
    let b = root.push_row(list, row("b")).unwrap();
    let c = root.push_row(list, row("c")).unwrap();
    root.flush();
    assert_eq!(last_child(&root, list), Some(root.leaf_block(c).unwrap()));

    root.remove_row(b).unwrap();
    assert_eq!(last_child(&root, list), Some(root.leaf_block(c).unwrap()));
    root.remove_row(c).unwrap();
    assert_eq!(last_child(&root, list), Some(root.leaf_block(a).unwrap()));
    root.remove_row(a).unwrap();
    assert_eq!(last_child(&root, list), None);
    assert!(root.rows(list).unwrap().is_empty());

    root.flush();
    assert_eq!(root.host().inner_markup(container), "<ul></ul>");
}

#[test]
fn test_reconcile_rows_by_key() {
    let (set, app) = list_templates();
    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    let list = child(&root, child(&root, root_leaf, 0), 0);

    let keyed = |items: &[(&str, &str)]| -> Vec<(String, Values)> {
        items.iter().map(|(key, name)| (key.to_string(), row(name))).collect()
    };

    root.reconcile_rows(list, keyed(&[("a", "a"), ("b", "b"), ("c", "c")])).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<ul><li>a</li><li>b</li><li>c</li></ul>");
    let before = root.rows(list).unwrap();

    root.reconcile_rows(list, keyed(&[("c", "c"), ("a", "A"), ("d", "d"), ("a", "dup")])).unwrap();
    root.flush();

    assert_eq!(root.host().inner_markup(container), "<ul><li>c</li><li>A</li><li>d</li></ul>");
    assert_eq!(root.diagnostics(), &[Diagnostic::DuplicateKey { key: "a".into() }]);
    let after = root.rows(list).unwrap();
    assert_eq!(after[0], before[2]);
    assert_eq!(after[1], before[0]);
    assert!(root.leaf(before[1]).is_none());
}

#[test]
fn test_stale_row_handle_does_not_resolve_after_reuse() {
    let (set, app) = list_templates();
    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    let list = child(&root, child(&root, root_leaf, 0), 0);

    let a = root.push_row(list, row("a")).unwrap();
    let b = root.push_row(list, row("b")).unwrap();
    root.flush();
    root.remove_row(a).unwrap();
    let c = root.push_row(list, row("c")).unwrap();
    root.flush();

    assert!(root.leaf(a).is_none());
    assert_ne!(a, c);
    assert!(matches!(root.set_visible(a, true), Err(ForestError::StaleLeaf(_))));
    assert_eq!(root.rows(list).unwrap(), vec![b, c]);
    assert_eq!(root.host().inner_markup(container), "<ul><li>b</li><li>c</li></ul>");
}

#[test]
fn test_update_row_restages_bound_fields() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    let nav = set.add(Some(app), ElementDraft::new("nav").into());
    let list = set.add(Some(nav), Draft::List);
    let link = set.add(Some(list), ElementDraft::new("a").bind_attr("href", "url").into());
    set.add(Some(link), Draft::text_field("name"));

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    let list = child(&root, child(&root, root_leaf, 0), 0);
    let mut values = row("Home");
    values.insert("url".into(), "/".into());
    let home = root.push_row(list, values).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<nav><a href=\"/\">Home</a></nav>");

    let mut values = row("Docs");
    values.insert("url".into(), "/docs".into());
    root.update_row(home, values).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<nav><a href=\"/docs\">Docs</a></nav>");

    let anchor = child(&root, home, 0);
    root.set_attr(anchor, "href", None).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<nav><a>Docs</a></nav>");
}

// =============================================================================
// REUSABLE BODIES
// =============================================================================

#[test]
fn test_rec_renders_nested_tree() {
    let mut set = TemplateSet::new();
    let rec = set.add(None, Draft::Rec);
    let li = set.add(Some(rec), ElementDraft::new("li").into());
    set.add(Some(li), Draft::text_field("name"));
    let inner_ul = set.add(Some(li), ElementDraft::new("ul").into());
    let inner_list = set.add(Some(inner_ul), Draft::List);
    set.add(Some(inner_list), Draft::RecItem { rec });

    let app = set.add(None, Draft::Using);
    let ul = set.add(Some(app), ElementDraft::new("ul").into());
    let list = set.add(Some(ul), Draft::List);
    set.add(Some(list), Draft::RecItem { rec });

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    let list = child(&root, child(&root, root_leaf, 0), 0);
    let top = root.push_row(list, row("root")).unwrap();

    // row → recItem → rec → li → [text, ul → list]
    let li_leaf = child(&root, child(&root, child(&root, top, 0), 0), 0);
    let nested_list = child(&root, child(&root, li_leaf, 1), 0);
    root.push_row(nested_list, row("child")).unwrap();
    root.flush();

    assert_eq!(
        root.host().inner_markup(container),
        "<ul><li>root<ul><li>child<ul></ul></li></ul></li></ul>"
    );
}

#[test]
fn test_block_item_mounts_shared_body() {
    let mut set = TemplateSet::new();
    let badge = set.add(None, Draft::Block);
    set.add(Some(badge), ElementDraft::new("span").text("new").into());

    let app = set.add(None, Draft::Using);
    set.add(Some(app), ElementDraft::new("h2").into());
    set.add(Some(app), Draft::BlockItem { block: badge });
    set.add(Some(app), Draft::BlockItem { block: badge });

    let (mut root, container) = setup(set);
    root.mount(app, container).unwrap();
    root.flush();

    assert_eq!(root.host().inner_markup(container), "<h2></h2><span>new</span><span>new</span>");
}

// =============================================================================
// NAMESPACES AND STENCILS
// =============================================================================

#[test]
fn test_namespace_follows_nearest_declaring_ancestor() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    let svg = set.add(Some(app), ElementDraft::new("svg").into());
    set.add(Some(svg), ElementDraft::new("circle").into());
    let foreign = set.add(Some(svg), ElementDraft::new("foreignObject").into());
    set.add(Some(foreign), ElementDraft::new("div").into());
    let icons = set.add(Some(app), Draft::Block);
    set.set_env(icons, Env { namespace: Namespace::Svg });
    set.add(Some(icons), ElementDraft::new("path").into());
    set.add(Some(app), ElementDraft::new("div").into());

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    root.flush();

    let ns = |leaf: LeafId| root.host().namespace(root.leaf_node(leaf).unwrap());
    let svg_leaf = child(&root, root_leaf, 0);
    let circle = child(&root, svg_leaf, 0);
    let foreign_leaf = child(&root, svg_leaf, 1);
    let inner_div = child(&root, foreign_leaf, 0);
    let path = child(&root, child(&root, root_leaf, 1), 0);
    let outer_div = child(&root, root_leaf, 2);

    assert_eq!(ns(svg_leaf), Some(Namespace::Svg));
    assert_eq!(ns(circle), Some(Namespace::Svg));
    assert_eq!(ns(foreign_leaf), Some(Namespace::Svg));
    assert_eq!(ns(inner_div), Some(Namespace::Html));
    assert_eq!(ns(path), Some(Namespace::Svg));
    assert_eq!(ns(outer_div), Some(Namespace::Html));
}

#[test]
fn test_default_namespace_from_config() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    set.add(Some(app), ElementDraft::new("g").into());

    let config = RootConfig::default().with_default_namespace(Namespace::Svg);
    let (mut root, container) = setup_with(set, config);
    let root_leaf = root.mount(app, container).unwrap();

    let g = root.leaf_node(child(&root, root_leaf, 0)).unwrap();
    assert_eq!(root.host().namespace(g), Some(Namespace::Svg));
}

#[test]
fn test_stencils_clone_instead_of_create() {
    let count = |mutations: &[HostMutation]| {
        let created = mutations
            .iter()
            .filter(|m| matches!(m, HostMutation::CreateElement { tag, .. } if tag == "li"))
            .count();
        let cloned = mutations.iter().filter(|m| matches!(m, HostMutation::Clone { .. })).count();
        (created, cloned)
    };

    for (stencils, expected) in [(true, (1, 3)), (false, (3, 0))] {
        let (set, app) = list_templates();
        let (mut root, container) = setup_with(set, RootConfig::default().with_stencils(stencils));
        let root_leaf = root.mount(app, container).unwrap();
        let list = child(&root, child(&root, root_leaf, 0), 0);
        root.host_mut().take_mutations();

        for name in ["a", "b", "c"] {
            root.push_row(list, row(name)).unwrap();
        }
        root.flush();

        assert_eq!(count(root.host().mutations()), expected);
        assert_eq!(root.host().inner_markup(container), "<ul><li>a</li><li>b</li><li>c</li></ul>");
    }
}

// =============================================================================
// HYDRATION
// =============================================================================

#[test]
fn test_hydrate_adopts_matching_nodes() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    let h1 = set.add(Some(app), ElementDraft::new("h1").into());
    set.add(Some(h1), Draft::text("fresh"));
    set.add(Some(app), ElementDraft::new("p").into());

    let (mut root, container) = setup(set);
    let host = root.host_mut();
    let server_h1 = host.create_element("h1", Namespace::Html);
    let server_text = host.create_text("stale");
    let server_p = host.create_element("p", Namespace::Html);
    host.append(container, server_h1);
    host.append(server_h1, server_text);
    host.append(container, server_p);
    host.take_mutations();

    let root_leaf = root.hydrate(app, container).unwrap();
    root.flush();

    assert_eq!(root.leaf_node(child(&root, root_leaf, 0)).unwrap(), server_h1);
    assert_eq!(root.leaf_node(child(&root, root_leaf, 1)).unwrap(), server_p);
    assert_eq!(
        root.host_mut().take_mutations(),
        vec![HostMutation::SetText { node: server_text, text: "fresh".into() }]
    );
    assert_eq!(root.host().inner_markup(container), "<h1>fresh</h1><p></p>");
    assert!(root.diagnostics().is_empty());
}

#[test]
fn test_hydrate_mismatch_creates_fresh_node() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    set.add(Some(app), ElementDraft::new("h1").into());

    let (mut root, container) = setup(set);
    let host = root.host_mut();
    let span = host.create_element("span", Namespace::Html);
    host.append(container, span);

    root.hydrate(app, container).unwrap();
    root.flush();

    assert_eq!(root.diagnostics(), &[Diagnostic::HydrationMismatch { expected: "<h1>".into() }]);
    assert_eq!(root.host().inner_markup(container), "<h1></h1><span></span>");
}

#[test]
fn test_rows_pushed_after_hydration_create_fresh_nodes() {
    let (set, app) = list_templates();
    let (mut root, container) = setup(set);
    let host = root.host_mut();
    let server_ul = host.create_element("ul", Namespace::Html);
    host.append(container, server_ul);

    let root_leaf = root.hydrate(app, container).unwrap();
    root.flush();
    let ul = child(&root, root_leaf, 0);
    assert!(root.leaf(ul).unwrap().hydration);
    assert_eq!(root.leaf_node(ul).unwrap(), server_ul);

    let list = child(&root, ul, 0);
    let a = root.push_row(list, row("a")).unwrap();
    root.flush();

    assert_eq!(root.host().inner_markup(container), "<ul><li>a</li></ul>");
    assert!(root.diagnostics().is_empty());
    assert!(!root.leaf(a).unwrap().hydration);
    assert!(!root.leaf(child(&root, a, 0)).unwrap().hydration);
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[test]
fn test_mount_callbacks_run_once_after_flush() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let torn_down = Rc::new(Cell::new(0));
    let events = Rc::new(Cell::new(0));

    let (calls_cb, torn_cb) = (calls.clone(), torn_down.clone());
    let canvas = ElementDraft::new("canvas").on_mount(move |node| {
        calls_cb.borrow_mut().push(node);
        let torn = torn_cb.clone();
        Some(Box::new(move || torn.set(torn.get() + 1)) as Cleanup)
    });

    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    set.add(Some(app), canvas.into());

    let (mut root, container) = setup(set);
    let events_cb = events.clone();
    root.on_mount().watch(move |_: &MountEvent| events_cb.set(events_cb.get() + 1));

    let root_leaf = root.mount(app, container).unwrap();
    let canvas_leaf = child(&root, root_leaf, 0);
    assert!(calls.borrow().is_empty());

    root.flush();
    let node = root.leaf_node(canvas_leaf).unwrap();
    assert_eq!(*calls.borrow(), vec![node]);
    assert_eq!(events.get(), 1);

    root.set_visible(canvas_leaf, false).unwrap();
    root.flush();
    root.set_visible(canvas_leaf, true).unwrap();
    root.flush();
    assert_eq!(calls.borrow().len(), 1);
    assert_eq!(torn_down.get(), 0);

    root.unmount(root_leaf).unwrap();
    assert_eq!(torn_down.get(), 1);
    assert_eq!(root.leaf_count(), 0);
    assert_eq!(root.host().inner_markup(container), "");
}

#[test]
fn test_mount_watchers_see_events_after_element_callbacks() {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::new(RefCell::new(Vec::new()));

    let calls_cb = calls.clone();
    let img = ElementDraft::new("img").on_mount(move |_| {
        calls_cb.set(calls_cb.get() + 1);
        None
    });

    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    set.add(Some(app), img.into());

    let (mut root, container) = setup(set);
    let (calls_seen, seen_cb) = (calls.clone(), seen.clone());
    root.on_mount()
        .watch(move |event: &MountEvent| seen_cb.borrow_mut().push((event.element, calls_seen.get())));

    let root_leaf = root.mount(app, container).unwrap();
    root.flush();

    let node = root.leaf_node(child(&root, root_leaf, 0)).unwrap();
    assert_eq!(*seen.borrow(), vec![(node, 1)]);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_destroy_drops_staged_ops() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    set.add(Some(app), ElementDraft::new("kept").into());
    let gone = set.add(Some(app), ElementDraft::new("gone").into());
    set.add(Some(gone), Draft::text("never"));

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    let gone_leaf = child(&root, root_leaf, 1);
    let visible_op = root.op(gone_leaf, OpKey::Visible).unwrap();
    let gone_node = root.leaf_node(gone_leaf).unwrap();

    root.destroy_leaf(gone_leaf).unwrap();
    root.flush();

    assert_eq!(root.host().inner_markup(container), "<kept></kept>");
    assert!(!root
        .host()
        .mutations()
        .iter()
        .any(|m| matches!(m, HostMutation::Insert { node, .. } if *node == gone_node)));
    assert!(matches!(root.set_op(visible_op, true), Err(ForestError::StaleOp(_))));
    assert!(matches!(root.set_visible(gone_leaf, true), Err(ForestError::StaleLeaf(_))));
    assert_eq!(root.leaf(root_leaf).unwrap().children.len(), 1);
}

// =============================================================================
// SIGNALS
// =============================================================================

#[test]
fn test_signal_binding_stages_into_flush() {
    let mut set = TemplateSet::new();
    let app = set.add(None, Draft::Using);
    let p = set.add(Some(app), ElementDraft::new("p").into());
    set.add(Some(p), Draft::text("initial"));

    let (mut root, container) = setup(set);
    let root_leaf = root.mount(app, container).unwrap();
    let p_leaf = child(&root, root_leaf, 0);
    let text_leaf = child(&root, p_leaf, 0);

    let label = signal("bound".to_string());
    let op = root.op(text_leaf, OpKey::Content).unwrap();
    root.bind_signal(op, label.clone()).unwrap();
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<p>bound</p>");

    label.set("next".to_string());
    assert_eq!(root.host().inner_markup(container), "<p>bound</p>");
    root.flush();
    assert_eq!(root.host().inner_markup(container), "<p>next</p>");

    root.destroy_leaf(p_leaf).unwrap();
    label.set("after".to_string());
    assert_eq!(root.flush(), 0);
    assert_eq!(root.host().inner_markup(container), "");
}
