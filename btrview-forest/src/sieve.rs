// SPDX-License-Identifier: GPL-3.0-only

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use btrview_types::{MountTable, SubvolumeRecord};
use serde::{Deserialize, Serialize};

use crate::forest::{Forest, Node, NodeKind};

/// A class of nodes that can be removed from a finished forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sieve {
    /// Deleted subvolumes and placeholders for parents that no longer exist.
    Deleted,
    /// The top-level subvolume (ID 5).
    Root,
    Snapshot,
    /// Live subvolumes not visible under any mount.
    Unreachable,
    /// Everything that is not itself a mount.
    NonMounts,
}

impl Sieve {
    pub const ALL: [Sieve; 5] = [
        Sieve::Deleted,
        Sieve::Root,
        Sieve::Snapshot,
        Sieve::Unreachable,
        Sieve::NonMounts,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Sieve::Deleted => "deleted",
            Sieve::Root => "root",
            Sieve::Snapshot => "snapshot",
            Sieve::Unreachable => "unreachable",
            Sieve::NonMounts => "non-mounts",
        }
    }

    /// `accessible` tells whether a live record is visible under any mount
    /// of its filesystem.
    pub fn matches<K>(
        self,
        node: &Node<K>,
        accessible: &dyn Fn(&SubvolumeRecord) -> bool,
    ) -> bool {
        if let NodeKind::Truncated { .. } = node.kind {
            return false;
        }

        let Some(record) = node.record() else {
            return matches!(self, Sieve::Deleted | Sieve::NonMounts);
        };

        match self {
            Sieve::Deleted => record.deleted,
            Sieve::Root => record.is_root_subvolume(),
            Sieve::Snapshot => record.is_snapshot() && !record.is_root_subvolume(),
            Sieve::Unreachable => !record.deleted && !accessible(record),
            Sieve::NonMounts => record.mountpoints.is_empty(),
        }
    }
}

impl fmt::Display for Sieve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sieve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "deleted" => Ok(Sieve::Deleted),
            "root" => Ok(Sieve::Root),
            "snapshot" | "snapshots" => Ok(Sieve::Snapshot),
            "unreachable" => Ok(Sieve::Unreachable),
            "non-mounts" | "nonmounts" => Ok(Sieve::NonMounts),
            other => Err(format!(
                "unknown sieve '{other}' (expected one of: deleted, root, snapshot, unreachable, non-mounts)"
            )),
        }
    }
}

/// Remove every node matched by any of `sieves`.
///
/// A removed node's children take its place among its siblings, so the
/// remaining nodes keep their ancestry. Sibling order is not restored;
/// sort afterwards.
pub fn prune<K>(forest: Forest<K>, sieves: &[Sieve], mounts: &MountTable) -> Forest<K> {
    prune_with(forest, sieves, &|record: &SubvolumeRecord| {
        record
            .path
            .as_deref()
            .is_some_and(|path| !mounts.accessible_paths(path).is_empty())
    })
}

/// [`prune`] with a caller-supplied accessibility test, for forests whose
/// records come from more than one filesystem.
pub fn prune_with<K>(
    mut forest: Forest<K>,
    sieves: &[Sieve],
    accessible: &dyn Fn(&SubvolumeRecord) -> bool,
) -> Forest<K> {
    if sieves.is_empty() {
        return forest;
    }

    let removed = prune_list(&mut forest.roots, sieves, accessible);
    tracing::debug!(removed, ?sieves, "pruned forest");
    forest
}

/// Filter every sibling list top-down. A removed node's children are spliced
/// in where it stood and judged in turn.
fn prune_list<K>(
    nodes: &mut Vec<Node<K>>,
    sieves: &[Sieve],
    accessible: &dyn Fn(&SubvolumeRecord) -> bool,
) -> usize {
    let mut removed = 0;
    let mut stack = vec![nodes];
    while let Some(siblings) = stack.pop() {
        let mut pending: VecDeque<Node<K>> = std::mem::take(siblings).into();
        while let Some(mut node) = pending.pop_front() {
            if sieves.iter().any(|sieve| sieve.matches(&node, accessible)) {
                removed += 1;
                for child in std::mem::take(&mut node.children).into_iter().rev() {
                    pending.push_front(child);
                }
            } else {
                siblings.push(node);
            }
        }
        stack.extend(siblings.iter_mut().map(|node| &mut node.children));
    }
    removed
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use btrview_types::{Mount, Property};
    use uuid::Uuid;

    use super::*;

    fn node(record: SubvolumeRecord, children: Vec<Node<u64>>) -> Node<u64> {
        Node::subvolume(record.id, Arc::new(record), children)
    }

    fn sample_mounts() -> MountTable {
        MountTable::new([Mount::new("/@", "/"), Mount::new("/@home", "/home")])
    }

    // 5 -> { @ (mounted) -> snap, @home (mounted) -> @home/sub, @detached }
    fn sample_forest() -> Forest<u64> {
        let mut root_fs = SubvolumeRecord::new(256, Uuid::from_u128(1), "@").with_parent_id(5);
        root_fs.mountpoints = vec![PathBuf::from("/")];
        let mut home = SubvolumeRecord::new(257, Uuid::from_u128(2), "@home").with_parent_id(5);
        home.mountpoints = vec![PathBuf::from("/home")];
        let snap = SubvolumeRecord::new(258, Uuid::from_u128(3), "@/.snap")
            .with_parent_id(256)
            .with_parent_uuid(Uuid::from_u128(1));
        let sub = SubvolumeRecord::new(259, Uuid::from_u128(4), "@home/sub").with_parent_id(257);
        let detached = SubvolumeRecord::new(260, Uuid::from_u128(5), "@detached").with_parent_id(5);

        let top = node(
            SubvolumeRecord::new(5, Uuid::from_u128(10), "/"),
            vec![
                node(root_fs, vec![node(snap, Vec::new())]),
                node(home, vec![node(sub, Vec::new())]),
                node(detached, Vec::new()),
            ],
        );
        Forest::new(vec![top], Property::Id)
    }

    fn root_keys(forest: &Forest<u64>) -> Vec<u64> {
        forest.roots.iter().map(|n| n.key).collect()
    }

    #[test]
    fn removing_root_lifts_children() {
        let pruned = prune(sample_forest(), &[Sieve::Root], &sample_mounts());
        assert_eq!(root_keys(&pruned), vec![256, 257, 260]);
        assert_eq!(pruned.len(), 5);
    }

    #[test]
    fn unreachable_and_snapshot_sieves() {
        let pruned = prune(
            sample_forest(),
            &[Sieve::Unreachable, Sieve::Snapshot],
            &sample_mounts(),
        );
        // The top level and @detached are not under any mount.
        assert_eq!(root_keys(&pruned), vec![256, 257]);
        assert!(pruned.roots[0].children.is_empty());
        assert_eq!(pruned.roots[1].children[0].key, 259);
    }

    #[test]
    fn non_mounts_keeps_only_mounted() {
        let pruned = prune(sample_forest(), &[Sieve::NonMounts], &sample_mounts());
        assert_eq!(pruned.keys(), vec![256, 257]);
    }

    #[test]
    fn deleted_matches_placeholders() {
        let child = node(
            SubvolumeRecord::new(300, Uuid::from_u128(7), "orphan").with_parent_id(42),
            Vec::new(),
        );
        let forest = Forest::new(vec![Node::placeholder(42, vec![child])], Property::Id);
        let pruned = prune(forest, &[Sieve::Deleted], &MountTable::default());

        assert_eq!(root_keys(&pruned), vec![300]);
    }

    #[test]
    fn parses_sieve_names() {
        assert_eq!("non-mounts".parse::<Sieve>(), Ok(Sieve::NonMounts));
        assert_eq!("non_mounts".parse::<Sieve>(), Ok(Sieve::NonMounts));
        assert_eq!(" Root ".parse::<Sieve>(), Ok(Sieve::Root));
        assert!("mounted".parse::<Sieve>().is_err());
    }
}
