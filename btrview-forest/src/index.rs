// SPDX-License-Identifier: GPL-3.0-only

use std::collections::HashMap;
use std::sync::Arc;

use btrview_types::SubvolumeRecord;
use uuid::Uuid;

use crate::error::{ForestError, Result};

/// Which keys an [`IdentityIndex`] must keep unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexScope {
    /// Records of one filesystem: both `id` and `uuid` are unique.
    Filesystem,
    /// Only `id` is unique; what the containment tree needs.
    Ids,
    /// Only `uuid` is unique; what a lineage forest needs, including one
    /// pooled from several filesystems whose IDs repeat.
    Uuids,
}

impl IndexScope {
    fn checks_ids(self) -> bool {
        self != IndexScope::Uuids
    }

    fn checks_uuids(self) -> bool {
        self != IndexScope::Ids
    }
}

/// Constant-time lookup of records by `id` and by `uuid`
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    records: Vec<Arc<SubvolumeRecord>>,
    by_id: HashMap<u64, usize>,
    by_uuid: HashMap<Uuid, usize>,
}

impl IdentityIndex {
    /// Index `records` in one pass.
    ///
    /// A record repeated with the same payload is indexed once. Two records
    /// sharing a key but disagreeing on identity or parentage fail with
    /// [`ForestError::DuplicateIdentity`].
    pub fn build(records: &[Arc<SubvolumeRecord>], scope: IndexScope) -> Result<Self> {
        let mut index = Self::default();

        for record in records {
            if scope.checks_uuids()
                && let Some(&slot) = index.by_uuid.get(&record.uuid)
            {
                let known = &index.records[slot];
                if materially_equal(known, record) {
                    tracing::debug!(uuid = %record.uuid, "skipping repeated subvolume record");
                    continue;
                }
                return Err(duplicate("uuid", record.uuid.to_string(), known, record));
            }

            if scope.checks_ids()
                && let Some(&slot) = index.by_id.get(&record.id)
            {
                let known = &index.records[slot];
                if materially_equal(known, record) {
                    tracing::debug!(id = record.id, "skipping repeated subvolume record");
                    continue;
                }
                return Err(duplicate("id", record.id.to_string(), known, record));
            }

            let slot = index.records.len();
            index.records.push(Arc::clone(record));
            if scope.checks_uuids() {
                index.by_uuid.insert(record.uuid, slot);
            }
            if scope.checks_ids() {
                index.by_id.insert(record.id, slot);
            }
        }

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Arc<SubvolumeRecord>] {
        &self.records
    }

    pub fn record(&self, slot: usize) -> Option<&Arc<SubvolumeRecord>> {
        self.records.get(slot)
    }

    pub fn slot_by_id(&self, id: u64) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn slot_by_uuid(&self, uuid: &Uuid) -> Option<usize> {
        self.by_uuid.get(uuid).copied()
    }

    pub fn get_by_id(&self, id: u64) -> Option<&Arc<SubvolumeRecord>> {
        self.slot_by_id(id).map(|slot| &self.records[slot])
    }

    pub fn get_by_uuid(&self, uuid: &Uuid) -> Option<&Arc<SubvolumeRecord>> {
        self.slot_by_uuid(uuid).map(|slot| &self.records[slot])
    }
}

/// Identity and parentage agree. Mount state and display name may differ
/// between two sightings of the same subvolume.
fn materially_equal(a: &SubvolumeRecord, b: &SubvolumeRecord) -> bool {
    a.id == b.id
        && a.uuid == b.uuid
        && a.parent_id == b.parent_id
        && a.parent_uuid == b.parent_uuid
        && a.received_uuid == b.received_uuid
        && a.path == b.path
        && a.deleted == b.deleted
        && a.generation == b.generation
}

fn describe(record: &SubvolumeRecord) -> String {
    match &record.path {
        Some(path) => format!("id {} uuid {} path {}", record.id, record.uuid, path),
        None => format!("id {} uuid {} (deleted)", record.id, record.uuid),
    }
}

fn duplicate(
    field: &'static str,
    key: String,
    known: &SubvolumeRecord,
    record: &SubvolumeRecord,
) -> ForestError {
    ForestError::DuplicateIdentity {
        field,
        key,
        first: describe(known),
        second: describe(record),
    }
}
