// SPDX-License-Identifier: GPL-3.0-only

//! Parent-resolution strategies for [`build_forest`](crate::build_forest).

use std::fmt;
use std::hash::Hash;

use btrview_types::{Property, SubvolumeRecord};
use uuid::Uuid;

use crate::index::{IdentityIndex, IndexScope};

/// How records are keyed and linked to their parents.
pub trait Relation {
    type Key: Clone + Eq + Hash + Ord + fmt::Display + fmt::Debug + Send + Sync;

    /// Record attribute the key is drawn from. Placeholder nodes answer
    /// projections of this property with their key.
    const KEY_PROPERTY: Property;

    /// Uniqueness an index must enforce for this relation alone.
    const SCOPE: IndexScope;

    fn key_of(&self, record: &SubvolumeRecord) -> Self::Key;

    /// Parent keys in order of preference. Empty when the record is
    /// parentless under this relation.
    fn parent_candidates(&self, record: &SubvolumeRecord) -> Vec<Self::Key>;

    /// Index slot of the record carrying `key`, if it was enumerated.
    fn lookup(&self, index: &IdentityIndex, key: &Self::Key) -> Option<usize>;
}

/// Structural nesting: `id` / `parent_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Containment;

impl Relation for Containment {
    type Key = u64;

    const KEY_PROPERTY: Property = Property::Id;
    const SCOPE: IndexScope = IndexScope::Ids;

    fn key_of(&self, record: &SubvolumeRecord) -> u64 {
        record.id
    }

    fn parent_candidates(&self, record: &SubvolumeRecord) -> Vec<u64> {
        record.parent_id.into_iter().collect()
    }

    fn lookup(&self, index: &IdentityIndex, key: &u64) -> Option<usize> {
        index.slot_by_id(*key)
    }
}

/// Snapshot ancestry: `uuid` / `parent_uuid`, falling back to
/// `received_uuid` when the snapshot parent does not resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lineage;

impl Relation for Lineage {
    type Key = Uuid;

    const KEY_PROPERTY: Property = Property::Uuid;
    const SCOPE: IndexScope = IndexScope::Uuids;

    fn key_of(&self, record: &SubvolumeRecord) -> Uuid {
        record.uuid
    }

    fn parent_candidates(&self, record: &SubvolumeRecord) -> Vec<Uuid> {
        let mut candidates = Vec::with_capacity(2);
        candidates.extend(record.parent_uuid);
        if let Some(received) = record.received_uuid
            && !candidates.contains(&received)
        {
            candidates.push(received);
        }
        candidates
    }

    fn lookup(&self, index: &IdentityIndex, key: &Uuid) -> Option<usize> {
        index.slot_by_uuid(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lineage_prefers_parent_uuid() {
        let record = SubvolumeRecord::new(300, Uuid::from_u128(3), "snap")
            .with_parent_uuid(Uuid::from_u128(1))
            .with_received_uuid(Uuid::from_u128(2));

        assert_eq!(
            Lineage.parent_candidates(&record),
            vec![Uuid::from_u128(1), Uuid::from_u128(2)]
        );
    }

    #[test]
    fn lineage_uses_received_uuid_alone() {
        let record = SubvolumeRecord::new(300, Uuid::from_u128(3), "recv")
            .with_received_uuid(Uuid::from_u128(2));

        assert_eq!(Lineage.parent_candidates(&record), vec![Uuid::from_u128(2)]);
    }

    #[test]
    fn containment_has_at_most_one_parent() {
        let top = SubvolumeRecord::new(5, Uuid::from_u128(5), "/");
        let nested = SubvolumeRecord::new(256, Uuid::from_u128(6), "@").with_parent_id(5);

        assert!(Containment.parent_candidates(&top).is_empty());
        assert_eq!(Containment.parent_candidates(&nested), vec![5]);
    }
}
