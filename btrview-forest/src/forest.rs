// SPDX-License-Identifier: GPL-3.0-only

//! Forest construction from flat subvolume records.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use btrview_types::{Property, SubvolumeRecord};

use crate::error::{ForestError, Result};
use crate::index::IdentityIndex;
use crate::reachability::Reachability;
use crate::relation::Relation;
use crate::sort::SortOrder;

/// What a [`Node`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An enumerated subvolume or snapshot.
    Subvolume,
    /// A parent that is referenced but was never enumerated (deleted,
    /// on another filesystem, or outside the listing).
    Placeholder,
    /// A linear run of `elided` nodes collapsed into its deepest member.
    Folded { elided: usize },
    /// `hidden` trailing siblings left out by a breadth limit.
    Truncated { hidden: usize },
}

#[derive(Debug, Clone)]
pub struct Node<K> {
    pub key: K,
    pub kind: NodeKind,
    /// Backing record; the terminal record for folded nodes, `None` for
    /// placeholders and truncation markers.
    pub record: Option<Arc<SubvolumeRecord>>,
    pub label: String,
    /// Set by [`annotate`](crate::annotate).
    pub reachability: Option<Reachability>,
    pub children: Vec<Node<K>>,
}

impl<K> Node<K> {
    pub fn subvolume(key: K, record: Arc<SubvolumeRecord>, children: Vec<Node<K>>) -> Self {
        Self {
            key,
            kind: NodeKind::Subvolume,
            label: record.display_name(),
            record: Some(record),
            reachability: None,
            children,
        }
    }

    pub fn placeholder(key: K, children: Vec<Node<K>>) -> Self
    where
        K: fmt::Display,
    {
        Self {
            label: key.to_string(),
            key,
            kind: NodeKind::Placeholder,
            record: None,
            reachability: None,
            children,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind == NodeKind::Placeholder
    }

    pub fn record(&self) -> Option<&SubvolumeRecord> {
        self.record.as_deref()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(&node.children);
        }
        count
    }

    /// Number of levels in this subtree; a leaf has height 1.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, level)) = stack.pop() {
            height = height.max(level);
            stack.extend(node.children.iter().map(|child| (child, level + 1)));
        }
        height
    }

    /// Pre-order walk; `depth` is 1 for `self`.
    pub fn visit<'a>(&'a self, depth: usize, f: &mut impl FnMut(&'a Node<K>, usize)) {
        let mut stack = vec![(self, depth)];
        while let Some((node, depth)) = stack.pop() {
            f(node, depth);
            stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
    }

    /// Pre-order walk; `f` sees a node before its children.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Node<K>)) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            f(node);
            stack.extend(node.children.iter_mut().rev());
        }
    }
}

// Trees can be as deep as a snapshot chain is long; unlink them level by
// level instead of letting drop glue recurse.
impl<K> Drop for Node<K> {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// A parent key that matched no record, and the records pointing at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference<K> {
    pub key: K,
    pub referenced_by: Vec<K>,
}

/// A snapshot whose `parent_uuid` and `received_uuid` both resolved, to
/// different records. The `parent_uuid` link wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousParent<K> {
    pub child: K,
    pub chosen: K,
    pub alternative: K,
}

/// Ordered root nodes of one relation over one record set.
#[derive(Debug, Clone)]
pub struct Forest<K> {
    pub roots: Vec<Node<K>>,
    /// Record attribute the keys come from (`id` or `uuid`).
    pub key_property: Property,
    pub unresolved: Vec<UnresolvedReference<K>>,
    pub ambiguous: Vec<AmbiguousParent<K>>,
}

impl<K> Forest<K> {
    pub fn new(roots: Vec<Node<K>>, key_property: Property) -> Self {
        Self {
            roots,
            key_property,
            unresolved: Vec::new(),
            ambiguous: Vec::new(),
        }
    }

    /// Total number of nodes across all trees.
    pub fn len(&self) -> usize {
        self.roots.iter().map(Node::size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Levels in the deepest tree; 0 for an empty forest.
    pub fn max_depth(&self) -> usize {
        self.roots.iter().map(Node::height).max().unwrap_or(0)
    }

    pub fn visit<'a>(&'a self, mut f: impl FnMut(&'a Node<K>, usize)) {
        for root in &self.roots {
            root.visit(1, &mut f);
        }
    }

    pub fn visit_mut(&mut self, mut f: impl FnMut(&mut Node<K>)) {
        for root in &mut self.roots {
            root.visit_mut(&mut f);
        }
    }

    /// Keys of every node in pre-order.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        let mut keys = Vec::with_capacity(self.len());
        self.visit(|node, _| keys.push(node.key.clone()));
        keys
    }
}

enum Link<K> {
    Root,
    Parent(usize),
    Unresolved(K),
}

/// Build the forest of `relation` over every record in `index`.
///
/// Records whose parent resolves are attached beneath it. Records with no
/// parent become roots. Records whose parent key matches nothing are
/// grouped, by the value of that key, under one placeholder root each.
/// Siblings come out in creation order.
pub fn build_forest<R: Relation>(index: &IdentityIndex, relation: &R) -> Result<Forest<R::Key>> {
    let records = index.records();
    let mut links = Vec::with_capacity(records.len());
    let mut ambiguous = Vec::new();

    for record in records {
        let candidates = relation.parent_candidates(record);
        let resolved: Vec<(usize, usize)> = candidates
            .iter()
            .enumerate()
            .filter_map(|(rank, key)| relation.lookup(index, key).map(|slot| (rank, slot)))
            .collect();

        let link = match resolved.first() {
            Some(&(_, parent)) => {
                if let Some(&(rank, other)) = resolved.iter().find(|(_, slot)| *slot != parent) {
                    let child = relation.key_of(record);
                    let chosen = relation.key_of(&records[parent]);
                    tracing::warn!(
                        child = %child,
                        chosen = %chosen,
                        alternative = %candidates[rank],
                        "snapshot parent and received parent resolve to different subvolumes"
                    );
                    ambiguous.push(AmbiguousParent {
                        child,
                        chosen,
                        alternative: relation.key_of(&records[other]),
                    });
                }
                Link::Parent(parent)
            }
            None => match candidates.into_iter().next() {
                Some(key) => Link::Unresolved(key),
                None => Link::Root,
            },
        };
        links.push(link);
    }

    check_acyclic(index, relation, &links)?;

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut root_slots = Vec::new();
    let mut placeholders: BTreeMap<R::Key, Vec<usize>> = BTreeMap::new();
    for (slot, link) in links.into_iter().enumerate() {
        match link {
            Link::Root => root_slots.push(slot),
            Link::Parent(parent) => children[parent].push(slot),
            Link::Unresolved(key) => placeholders.entry(key).or_default().push(slot),
        }
    }

    let mut tops = root_slots.clone();
    for slots in placeholders.values() {
        tops.extend(slots);
    }
    let mut built = materialize(&tops, index, relation, &children).into_iter();

    let mut roots: Vec<Node<R::Key>> = built.by_ref().take(root_slots.len()).collect();
    let mut unresolved = Vec::with_capacity(placeholders.len());
    for (key, slots) in placeholders {
        let grouped: Vec<Node<R::Key>> = built.by_ref().take(slots.len()).collect();
        tracing::debug!(
            key = %key,
            children = grouped.len(),
            "parent not in record set, grouping under placeholder"
        );
        unresolved.push(UnresolvedReference {
            key: key.clone(),
            referenced_by: grouped.iter().map(|node| node.key.clone()).collect(),
        });
        roots.push(Node::placeholder(key, grouped));
    }

    let mut forest = Forest {
        roots,
        key_property: R::KEY_PROPERTY,
        unresolved,
        ambiguous,
    };
    forest.sort(SortOrder::Creation, false);
    Ok(forest)
}

/// Assemble the subtrees hanging from `tops`, in the order given.
///
/// Slots are laid out in pre-order first and then built in reverse, so every
/// child exists before its parent needs it.
fn materialize<R: Relation>(
    tops: &[usize],
    index: &IdentityIndex,
    relation: &R,
    children: &[Vec<usize>],
) -> Vec<Node<R::Key>> {
    let records = index.records();
    let mut order = Vec::with_capacity(records.len());
    let mut stack = tops.to_vec();
    while let Some(slot) = stack.pop() {
        order.push(slot);
        stack.extend(&children[slot]);
    }

    let mut built: Vec<Option<Node<R::Key>>> = Vec::new();
    built.resize_with(records.len(), || None);
    for &slot in order.iter().rev() {
        let nested = children[slot]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        let record = Arc::clone(&records[slot]);
        built[slot] = Some(Node::subvolume(relation.key_of(&record), record, nested));
    }

    tops.iter().filter_map(|&slot| built[slot].take()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unseen,
    Walking,
    Done,
}

/// Walk every parent chain once; a chain that re-enters itself is reported
/// with the keys along the loop.
fn check_acyclic<R: Relation>(
    index: &IdentityIndex,
    relation: &R,
    links: &[Link<R::Key>],
) -> Result<()> {
    let records = index.records();
    let mut marks = vec![Mark::Unseen; links.len()];

    for start in 0..links.len() {
        if marks[start] != Mark::Unseen {
            continue;
        }

        let mut path: Vec<usize> = Vec::new();
        let mut current = start;
        loop {
            match marks[current] {
                Mark::Done => break,
                Mark::Walking => {
                    let begin = path.iter().position(|&slot| slot == current).unwrap_or(0);
                    let mut chain: Vec<String> = path[begin..]
                        .iter()
                        .map(|&slot| relation.key_of(&records[slot]).to_string())
                        .collect();
                    chain.push(relation.key_of(&records[current]).to_string());
                    tracing::error!(chain = ?chain, "parent chain loops back on itself");
                    return Err(ForestError::CyclicLineage { chain });
                }
                Mark::Unseen => {
                    marks[current] = Mark::Walking;
                    path.push(current);
                    match links[current] {
                        Link::Parent(parent) => current = parent,
                        Link::Root | Link::Unresolved(_) => break,
                    }
                }
            }
        }

        for slot in path {
            marks[slot] = Mark::Done;
        }
    }

    Ok(())
}
