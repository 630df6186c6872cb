//! # Structure Properties
//!
//! Random attach / detach / destroy sequences over a small pool of nodes.
//! After every step the tree must still be a forest with consistent links,
//! depths within the configured maximum, and one registration per connected
//! node.
//!
//! Run with: cargo test -p switchboard_ui --test structure_properties

use proptest::prelude::*;
use switchboard_ui::{ElementBuilder, ElementTree, NodeId, ToolkitConfig};

const POOL: usize = 8;
const MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy)]
enum Op {
    /// Attach pool node `.1` under `.0` (index 0 is the root).
    Attach(usize, usize),
    /// Detach pool node from whatever parent it has.
    Detach(usize),
    Destroy(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..=POOL, 1..=POOL).prop_map(|(parent, child)| Op::Attach(parent, child)),
        2 => (1..=POOL).prop_map(Op::Detach),
        1 => (1..=POOL).prop_map(Op::Destroy),
    ]
}

fn setup() -> (ElementTree, Vec<NodeId>) {
    let config = ToolkitConfig::from_toml_str(&format!("[tree]\nmax_depth = {MAX_DEPTH}")).unwrap();
    let mut tree = ElementTree::new(&config);
    let mut ids = vec![tree.root()];
    ids.extend((1..=POOL).map(|i| tree.create(ElementBuilder::new(format!("n{i}")))));
    (tree, ids)
}

fn apply(tree: &mut ElementTree, ids: &[NodeId], op: Op) {
    match op {
        Op::Attach(parent, child) => {
            // Refusals (cycles, depth, stale ids) are part of the property.
            let _ = tree.attach(ids[parent], ids[child]);
        }
        Op::Detach(child) => {
            if let Some(parent) = tree.parent(ids[child]) {
                tree.detach(parent, ids[child]).unwrap();
            }
        }
        Op::Destroy(child) => {
            tree.destroy(ids[child]);
        }
    }
}

fn check(tree: &ElementTree, ids: &[NodeId]) -> Result<(), TestCaseError> {
    let bus = tree.bus().unwrap();
    for &id in ids.iter().filter(|id| tree.contains(**id)) {
        prop_assert!(!tree.is_disposed(id));
        let depth = tree.depth(id).unwrap();
        prop_assert!(depth <= MAX_DEPTH, "{id} at depth {depth}");

        match tree.parent(id) {
            Some(parent) => {
                prop_assert!(tree.contains(parent));
                prop_assert_eq!(tree.depth(parent).map(|d| d + 1), Some(depth));
                prop_assert_eq!(
                    tree.children(parent).iter().filter(|c| **c == id).count(),
                    1
                );
            }
            None => prop_assert_eq!(depth, 0),
        }
        for child in tree.children(id) {
            prop_assert_eq!(tree.parent(*child), Some(id));
        }

        // Walking up always ends, within the depth bound.
        let mut steps = 0;
        let mut node = id;
        while let Some(parent) = tree.parent(node) {
            node = parent;
            steps += 1;
            prop_assert!(steps <= MAX_DEPTH);
        }

        if tree.is_connected(id) {
            let address = tree.address(id);
            prop_assert!(address.is_some_and(|address| bus.is_registered(address)));
            prop_assert_eq!(address.and_then(|address| tree.find_by_address(address)), Some(id));
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn random_edits_keep_the_tree_consistent(ops in prop::collection::vec(op(), 0..48)) {
        let (mut tree, ids) = setup();
        for op in ops {
            apply(&mut tree, &ids, op);
            check(&tree, &ids)?;
        }
        prop_assert!(tree.contains(tree.root()));
    }

    #[test]
    fn destroyed_nodes_stay_gone(
        ops in prop::collection::vec(op(), 0..32),
        victim in 1..=POOL,
    ) {
        let (mut tree, ids) = setup();
        tree.destroy(ids[victim]);
        for op in ops {
            apply(&mut tree, &ids, op);
        }
        prop_assert!(!tree.contains(ids[victim]));
        prop_assert!(tree.is_disposed(ids[victim]));
        prop_assert!(!tree.descendants(tree.root()).contains(&ids[victim]));
        check(&tree, &ids)?;
    }
}
