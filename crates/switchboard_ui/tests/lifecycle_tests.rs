//! # Lifecycle Tests
//!
//! End-to-end behavior of the element tree and the bus together:
//!
//! 1. **Teardown**: destroyed nodes never receive another message
//! 2. **Structure**: the tree stays acyclic with consistent depths
//! 3. **Geometry**: absolute rects follow the current parent chain
//! 4. **Messaging**: GET / RESET round trips through the pump
//!
//! Run with: cargo test -p switchboard_ui --test lifecycle_tests

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use switchboard_bus::{Address, Message, ResponseKind};
use switchboard_ui::{
    ElementBuilder, ElementTree, InputEvent, Metadata, NodeId, Rect, ToolkitConfig, UiError, UiResult,
};

type Inbox = Rc<RefCell<Vec<(String, ResponseKind)>>>;

fn tree() -> ElementTree {
    ElementTree::new(&ToolkitConfig::default())
}

/// Attaches a node under `parent` that records what it receives before
/// handling it the default way.
fn recording(tree: &mut ElementTree, parent: NodeId, name: &str, inbox: &Inbox) -> NodeId {
    let log = Rc::clone(inbox);
    let label = name.to_owned();
    let id = tree.create(ElementBuilder::new(name).handler(Rc::new(
        move |tree: &mut ElementTree, node: NodeId, message: &Message| -> UiResult<()> {
            log.borrow_mut().push((label.clone(), message.kind()));
            tree.handle_default(node, message)
        },
    )));
    tree.attach(parent, id).unwrap();
    id
}

fn received(inbox: &Inbox, name: &str) -> Vec<ResponseKind> {
    inbox
        .borrow()
        .iter()
        .filter(|(who, _)| who == name)
        .map(|(_, kind)| *kind)
        .collect()
}

/// Walks the whole tree and checks parent/child links and depths agree.
fn assert_consistent(tree: &ElementTree) {
    for node in tree.descendants(tree.root()) {
        let depth = tree.depth(node).unwrap();
        for child in tree.children(node) {
            assert_eq!(tree.parent(*child), Some(node));
            assert_eq!(tree.depth(*child), Some(depth + 1));
        }
        assert!(tree.parent(node).map_or(true, |parent| tree.children(parent).contains(&node)));
    }
}

// ============================================================================
// TEARDOWN
// ============================================================================

#[test]
fn destroyed_node_receives_nothing_after_destroy() {
    let mut tree = tree();
    let root = tree.root();
    let inbox = Inbox::default();
    let doomed = recording(&mut tree, root, "doomed", &inbox);
    let speaker = tree.create(ElementBuilder::new("speaker"));
    tree.attach(root, speaker).unwrap();

    // Queued before the destroy; the destroy's own priority pump delivers it
    // once the node is unregistered.
    tree.broadcast(speaker, ResponseKind::Reset, None, false);
    assert!(tree.destroy(doomed));
    tree.broadcast(speaker, ResponseKind::Clear, None, false);
    tree.pump();

    assert!(received(&inbox, "doomed").is_empty());
}

#[test]
fn destroy_during_broadcast_skips_only_the_destroyed() {
    let mut tree = tree();
    let root = tree.root();
    let inbox = Inbox::default();

    // Addresses follow attach order, so the killer sees the broadcast before
    // its target does.
    let target: Rc<Cell<Option<NodeId>>> = Rc::default();
    let aim = Rc::clone(&target);
    let killer = tree.create(ElementBuilder::new("killer").handler(Rc::new(
        move |tree: &mut ElementTree, _: NodeId, message: &Message| -> UiResult<()> {
            if let (ResponseKind::Ok, Some(victim)) = (message.kind(), aim.get()) {
                tree.destroy(victim);
            }
            Ok(())
        },
    )));
    tree.attach(root, killer).unwrap();
    let victim = recording(&mut tree, root, "victim", &inbox);
    let last = recording(&mut tree, root, "last", &inbox);
    let speaker = tree.create(ElementBuilder::new("speaker"));
    tree.attach(root, speaker).unwrap();
    target.set(Some(victim));
    assert!(tree.address(killer) < tree.address(victim));
    assert!(tree.address(victim) < tree.address(last));

    tree.broadcast(speaker, ResponseKind::Ok, None, false);
    tree.pump();

    assert!(!tree.contains(victim));
    assert!(received(&inbox, "victim").is_empty());
    // The victim's DISPOSED goes out (priority) while the broadcast is still
    // being delivered; the broadcast itself still reaches everyone else.
    assert_eq!(
        received(&inbox, "last"),
        vec![ResponseKind::Disposed, ResponseKind::Ok]
    );
    assert!(tree.contains(last));
}

#[test]
fn destroy_is_idempotent() {
    let mut tree = tree();
    let root = tree.root();
    let inbox = Inbox::default();
    recording(&mut tree, root, "observer", &inbox);
    let node = tree.create(ElementBuilder::new("node"));
    tree.attach(root, node).unwrap();

    assert!(tree.destroy(node));
    assert!(!tree.destroy(node));
    assert!(!tree.destroy(node));

    assert_eq!(received(&inbox, "observer"), vec![ResponseKind::Disposed]);
}

#[test]
fn stale_registrations_are_swept() {
    let config = ToolkitConfig::from_toml_str("[bus]\ncleanup_threshold = 2").unwrap();
    let mut tree = ElementTree::new(&config);
    let root = tree.root();
    let loose = tree.create(ElementBuilder::new("loose"));
    let speaker = tree.create(ElementBuilder::new("speaker"));
    tree.attach(root, loose).unwrap();
    tree.attach(root, speaker).unwrap();

    // Destroyed while detached: the registry keeps a dead handle.
    tree.detach(root, loose).unwrap();
    tree.destroy(loose);
    assert_eq!(tree.bus().unwrap().stats().registered, 3);

    tree.broadcast(speaker, ResponseKind::Ok, None, false);
    tree.pump();

    let stats = tree.bus().unwrap().stats();
    assert_eq!(stats.registered, 2);
    assert_eq!(stats.cleanups, 1);
}

// ============================================================================
// STRUCTURE
// ============================================================================

#[test]
fn tree_stays_acyclic_with_consistent_depths() {
    let mut tree = tree();
    let root = tree.root();
    let nodes: Vec<NodeId> = (0..6)
        .map(|i| tree.create(ElementBuilder::new(format!("n{i}"))))
        .collect();

    // A chain root -> n0 -> n1 -> n2, plus n3..n5 under root.
    tree.attach(root, nodes[0]).unwrap();
    tree.attach(nodes[0], nodes[1]).unwrap();
    tree.attach(nodes[1], nodes[2]).unwrap();
    for node in &nodes[3..] {
        tree.attach(root, *node).unwrap();
    }
    assert_consistent(&tree);

    // Moving a subtree keeps depths right below the new parent.
    tree.attach(nodes[5], nodes[0]).unwrap();
    assert_eq!(tree.depth(nodes[2]), Some(4));
    assert_consistent(&tree);

    // Cycles are refused and leave everything in place.
    assert!(matches!(
        tree.attach(nodes[2], nodes[5]),
        Err(UiError::CycleDetected { .. })
    ));
    assert!(matches!(tree.attach(nodes[0], root), Err(UiError::CycleDetected { .. })));
    assert_eq!(tree.parent(nodes[5]), Some(root));
    assert_consistent(&tree);

    // Destroying a middle node removes its branch only.
    tree.destroy(nodes[1]);
    assert!(!tree.contains(nodes[2]));
    assert!(tree.children(nodes[0]).is_empty());
    assert_consistent(&tree);
}

#[test]
fn activation_is_exclusive() {
    let mut tree = tree();
    let root = tree.root();
    let siblings: Vec<NodeId> = (0..3)
        .map(|i| {
            let id = tree.create(ElementBuilder::new(format!("s{i}")).rect(i * 20, 0, 10, 10));
            tree.attach(root, id).unwrap();
            id
        })
        .collect();

    for (i, target) in siblings.iter().enumerate() {
        let x = i32::try_from(i).unwrap() * 20 + 5;
        tree.handle_event(root, &InputEvent::click(x, 5));
        let active: Vec<_> = siblings
            .iter()
            .filter(|id| tree.get(**id).unwrap().is_active())
            .collect();
        assert_eq!(active, vec![target]);
    }

    // Clicking empty space blurs the active one.
    tree.handle_event(root, &InputEvent::click(500, 500));
    assert!(siblings.iter().all(|id| !tree.get(*id).unwrap().is_active()));
}

// ============================================================================
// GEOMETRY
// ============================================================================

#[test]
fn absolute_rect_follows_new_parent() {
    let mut tree = tree();
    let root = tree.root();
    let left = tree.create(ElementBuilder::new("left").rect(10, 10, 100, 100));
    let right = tree.create(ElementBuilder::new("right").rect(400, 200, 100, 100));
    let child = tree.create(ElementBuilder::new("child").rect(5, 5, 20, 20));
    tree.attach(root, left).unwrap();
    tree.attach(root, right).unwrap();
    tree.attach(left, child).unwrap();

    assert_eq!(tree.absolute_rect(child), Some(Rect::new(15, 15, 20, 20)));

    tree.attach(right, child).unwrap();
    assert_eq!(tree.absolute_rect(child), Some(Rect::new(405, 205, 20, 20)));

    tree.detach(right, child).unwrap();
    assert_eq!(tree.absolute_rect(child), Some(Rect::new(5, 5, 20, 20)));
}

#[test]
fn degenerate_sizes_are_clamped() {
    let mut tree = tree();
    let node = tree.create(ElementBuilder::new("flat").rect(0, 0, 0, 0));
    assert_eq!(tree.rect(node).map(|rect| rect.size()), Some((1, 1)));

    tree.set_size(node, 40, -3).unwrap();
    assert_eq!(tree.rect(node).map(|rect| rect.size()), Some((40, 1)));
}

// ============================================================================
// MESSAGING
// ============================================================================

#[test]
fn get_produces_exactly_one_data_reply() {
    let mut tree = tree();
    let root = tree.root();
    let asker = tree.create(ElementBuilder::new("asker"));
    tree.attach(root, asker).unwrap();

    let root_address = Address::new(1).unwrap();
    let asker_address = Address::new(2).unwrap();
    assert_eq!(tree.address(root), Some(root_address));
    assert_eq!(tree.address(asker), Some(asker_address));

    tree.post(asker, root_address, ResponseKind::Get, None, false);
    assert_eq!(tree.pump(), 1);

    let replies = tree.bus().unwrap().drain();
    assert_eq!(replies.len(), 1);
    let reply = &replies[0];
    assert_eq!(reply.kind(), ResponseKind::Data);
    assert_eq!(reply.receiver(), asker_address);
    assert_eq!(reply.sender(), root_address);
    let metadata = reply.payload_as::<Metadata>().unwrap();
    assert_eq!(metadata.address, Some(root_address));
    assert_eq!(metadata.children, vec![Some(asker_address)]);
}

#[test]
fn reset_broadcast_clears_every_cache() {
    let mut tree = tree();
    let root = tree.root();
    let nodes: Vec<NodeId> = (0..3)
        .map(|i| {
            let id = tree.create(ElementBuilder::new(format!("n{i}")).rect(i * 10, 0, 5, 5));
            tree.attach(root, id).unwrap();
            id
        })
        .collect();
    for node in &nodes {
        assert!(tree.absolute_rect(*node).is_some());
        assert!(tree.get(*node).unwrap().has_cached_rect());
    }

    tree.broadcast(root, ResponseKind::Reset, None, true);

    for node in &nodes {
        assert!(!tree.get(*node).unwrap().has_cached_rect());
    }
    assert_eq!(tree.absolute_rect(nodes[2]), Some(Rect::new(20, 0, 5, 5)));
}

#[test]
fn handler_failures_do_not_stop_the_pump() {
    let mut tree = tree();
    let root = tree.root();
    let inbox = Inbox::default();
    let failing = tree.create(ElementBuilder::new("failing").handler(Rc::new(
        |_: &mut ElementTree, _: NodeId, message: &Message| -> UiResult<()> {
            Err(UiError::UnexpectedPayload { kind: message.kind() })
        },
    )));
    let panicking = tree.create(ElementBuilder::new("panicking").handler(Rc::new(
        |_: &mut ElementTree, _: NodeId, _: &Message| -> UiResult<()> { panic!("handler bug") },
    )));
    tree.attach(root, failing).unwrap();
    tree.attach(root, panicking).unwrap();
    recording(&mut tree, root, "healthy", &inbox);

    tree.broadcast(root, ResponseKind::Ok, None, true);

    assert_eq!(received(&inbox, "healthy"), vec![ResponseKind::Ok]);
    let stats = tree.bus().unwrap().stats();
    assert_eq!(stats.failed, 2);
    assert!(tree.contains(panicking));
}
