// SPDX-License-Identifier: GPL-3.0-only

//! Display reductions: collapsing deep linear runs and capping sibling lists.

use crate::forest::{Forest, Node, NodeKind};

/// Collapse linear runs that reach past `depth` levels.
///
/// A run starts at a non-root node deeper than `depth` with at most one
/// child and extends down through single-child nodes. It is replaced by one
/// [`NodeKind::Folded`] node that carries the deepest member's key, record,
/// label and reachability, and adopts that member's children. A node with
/// more than one child is never part of a run.
pub fn fold<K>(mut forest: Forest<K>, depth: usize) -> Forest<K> {
    let mut stack: Vec<(&mut Node<K>, usize)> =
        forest.roots.iter_mut().map(|root| (root, 1)).collect();
    while let Some((node, level)) = stack.pop() {
        if level > 1 && level > depth && foldable(node) {
            collapse_run(node);
        }
        stack.extend(node.children.iter_mut().map(|child| (child, level + 1)));
    }
    forest
}

fn weight<K>(node: &Node<K>) -> usize {
    match node.kind {
        NodeKind::Folded { elided } => elided,
        _ => 1,
    }
}

fn foldable<K>(node: &Node<K>) -> bool {
    node.children.len() <= 1 && !matches!(node.kind, NodeKind::Truncated { .. })
}

/// Replace `node` by the deepest member of the single-child run it starts.
fn collapse_run<K>(node: &mut Node<K>) {
    let mut elided = weight(node);
    while node.children.len() == 1 && foldable(&node.children[0]) {
        let Some(child) = node.children.pop() else {
            break;
        };
        elided += weight(&child);
        *node = child;
    }
    if elided > 1 {
        node.kind = NodeKind::Folded { elided };
    }
}

/// Keep at most `max` children under every node.
///
/// The surplus is replaced by a [`NodeKind::Truncated`] marker reading
/// "And N more...". A surplus of exactly one is shown as-is. Roots are
/// never limited.
pub fn limit_children<K: Clone>(mut forest: Forest<K>, max: usize) -> Forest<K> {
    let mut stack: Vec<&mut Node<K>> = forest.roots.iter_mut().collect();
    while let Some(node) = stack.pop() {
        limit_list(&mut node.children, max);
        stack.extend(node.children.iter_mut());
    }
    forest
}

fn limit_list<K: Clone>(children: &mut Vec<Node<K>>, max: usize) {
    let hidden = children.len().saturating_sub(max);
    if hidden <= 1 {
        return;
    }

    let first_hidden = children[max].key.clone();
    children.truncate(max);
    children.push(Node {
        key: first_hidden,
        kind: NodeKind::Truncated { hidden },
        record: None,
        label: format!("And {hidden} more..."),
        reachability: None,
        children: Vec::new(),
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use btrview_types::{Property, SubvolumeRecord};
    use uuid::Uuid;

    use super::*;

    fn node(id: u64, children: Vec<Node<u64>>) -> Node<u64> {
        let record = SubvolumeRecord::new(id, Uuid::from_u128(id as u128), format!("n{id}"));
        Node::subvolume(id, Arc::new(record), children)
    }

    fn chain(ids: &[u64]) -> Node<u64> {
        let mut iter = ids.iter().rev();
        let mut current = node(*iter.next().expect("non-empty chain"), Vec::new());
        for id in iter {
            current = node(*id, vec![current]);
        }
        current
    }

    #[test]
    fn folds_deep_chain_into_summary() {
        let forest = Forest::new(vec![chain(&[1, 2, 3, 4, 5])], Property::Id);
        let folded = fold(forest, 2);

        let root = &folded.roots[0];
        assert_eq!(root.key, 1);
        let second = &root.children[0];
        assert_eq!(second.key, 2);
        let summary = &second.children[0];
        assert_eq!(summary.kind, NodeKind::Folded { elided: 3 });
        assert_eq!(summary.key, 5);
        assert_eq!(summary.label, "n5");
        assert_eq!(summary.record().map(|r| r.id), Some(5));
        assert!(summary.children.is_empty());
        assert_eq!(folded.max_depth(), 3);
    }

    #[test]
    fn branching_nodes_stop_a_run() {
        // 1 -> 2 -> 3 -> 4 -> {5, 6}
        let branch = node(4, vec![node(5, Vec::new()), node(6, Vec::new())]);
        let tree = node(1, vec![node(2, vec![node(3, vec![branch])])]);
        let folded = fold(Forest::new(vec![tree], Property::Id), 1);

        let summary = &folded.roots[0].children[0];
        assert_eq!(summary.kind, NodeKind::Folded { elided: 2 });
        assert_eq!(summary.key, 3);

        let kept = &summary.children[0];
        assert_eq!(kept.key, 4);
        assert_eq!(kept.kind, NodeKind::Subvolume);
        assert_eq!(kept.children.len(), 2);
    }

    #[test]
    fn shallow_trees_and_roots_are_untouched() {
        let forest = Forest::new(vec![chain(&[1, 2]), chain(&[7])], Property::Id);
        let folded = fold(forest.clone(), 0);

        assert_eq!(folded.keys(), forest.keys());
        assert_eq!(folded.roots[0].kind, NodeKind::Subvolume);
        assert_eq!(folded.roots[0].children[0].kind, NodeKind::Subvolume);
    }

    #[test]
    fn folding_twice_keeps_elided_total() {
        let forest = Forest::new(vec![chain(&[1, 2, 3, 4, 5, 6])], Property::Id);
        let once = fold(forest, 3);
        let twice = fold(once, 2);

        let summary = &twice.roots[0].children[0].children[0];
        assert_eq!(summary.kind, NodeKind::Folded { elided: 4 });
        assert_eq!(summary.key, 6);
    }

    #[test]
    fn limits_children_with_marker() {
        let children = (10..15).map(|id| node(id, Vec::new())).collect();
        let forest = Forest::new(vec![node(1, children)], Property::Id);
        let limited = limit_children(forest, 2);

        let kept: Vec<u64> = limited.roots[0].children.iter().map(|n| n.key).collect();
        assert_eq!(kept, vec![10, 11, 12]);
        let marker = &limited.roots[0].children[2];
        assert_eq!(marker.kind, NodeKind::Truncated { hidden: 3 });
        assert_eq!(marker.label, "And 3 more...");
        assert!(marker.record.is_none());
    }

    #[test]
    fn single_surplus_child_is_shown() {
        let children = (10..13).map(|id| node(id, Vec::new())).collect();
        let forest = Forest::new(vec![node(1, children)], Property::Id);
        let limited = limit_children(forest, 2);

        assert_eq!(limited.roots[0].children.len(), 3);
        assert!(
            limited.roots[0]
                .children
                .iter()
                .all(|n| n.kind == NodeKind::Subvolume)
        );
    }
}
