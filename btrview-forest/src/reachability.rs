// SPDX-License-Identifier: GPL-3.0-only

use std::fmt;

use btrview_types::{MountTable, SubvolumeRecord};
use serde::{Deserialize, Serialize};

use crate::forest::Forest;

/// Whether a node can be reached on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reachability {
    /// Mounted at one or more host paths.
    Mounted,
    /// Enumerated with a path, but not itself a mount.
    Present,
    /// Placeholder or deleted subvolume.
    Absent,
}

impl Reachability {
    pub fn of(record: Option<&SubvolumeRecord>) -> Self {
        match record {
            None => Reachability::Absent,
            Some(record) if record.deleted => Reachability::Absent,
            Some(record) if !record.mountpoints.is_empty() => Reachability::Mounted,
            Some(record) if record.path.is_some() => Reachability::Present,
            Some(_) => Reachability::Absent,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Reachability::Mounted => "mounted",
            Reachability::Present => "present",
            Reachability::Absent => "absent",
        }
    }
}

impl fmt::Display for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fill in `mountpoints` for every record the table mounts directly.
pub fn attach_mounts(records: &mut [SubvolumeRecord], mounts: &MountTable) {
    for record in records.iter_mut() {
        if let Some(path) = &record.path {
            record.mountpoints = mounts.mountpoints_of(path);
        }
    }
}

/// Tag every node with its [`Reachability`]. Only the status changes; the
/// shape of the forest is left alone.
pub fn annotate<K>(forest: &mut Forest<K>) {
    forest.visit_mut(|node| node.reachability = Some(Reachability::of(node.record())));
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use btrview_types::{Mount, Property};
    use uuid::Uuid;

    use super::*;
    use crate::forest::Node;

    #[test]
    fn classifies_records() {
        let mut mounted = SubvolumeRecord::new(256, Uuid::from_u128(1), "@");
        mounted.mountpoints = vec![PathBuf::from("/")];
        let present = SubvolumeRecord::new(257, Uuid::from_u128(2), "@snap");
        let deleted = SubvolumeRecord::new_deleted(258, Uuid::from_u128(3));

        assert_eq!(Reachability::of(Some(&mounted)), Reachability::Mounted);
        assert_eq!(Reachability::of(Some(&present)), Reachability::Present);
        assert_eq!(Reachability::of(Some(&deleted)), Reachability::Absent);
        assert_eq!(Reachability::of(None), Reachability::Absent);
    }

    #[test]
    fn attach_mounts_sets_direct_mountpoints_only() {
        let mut records = vec![
            SubvolumeRecord::new(256, Uuid::from_u128(1), "@home"),
            SubvolumeRecord::new(257, Uuid::from_u128(2), "@home/.snapshots"),
            SubvolumeRecord::new_deleted(258, Uuid::from_u128(3)),
        ];
        let table = MountTable::new([Mount::new("/@home", "/home")]);
        attach_mounts(&mut records, &table);

        assert_eq!(records[0].mountpoints, vec![PathBuf::from("/home")]);
        assert!(records[1].mountpoints.is_empty());
        assert!(records[2].mountpoints.is_empty());
    }

    #[test]
    fn annotate_keeps_shape() {
        let mut home = SubvolumeRecord::new(256, Uuid::from_u128(1), "@home");
        home.mountpoints = vec![PathBuf::from("/home")];
        let child = Node::subvolume(256, Arc::new(home), Vec::new());
        let mut forest = Forest::new(vec![Node::placeholder(5, vec![child])], Property::Id);

        annotate(&mut forest);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest.roots[0].reachability, Some(Reachability::Absent));
        assert_eq!(
            forest.roots[0].children[0].reachability,
            Some(Reachability::Mounted)
        );
    }
}
